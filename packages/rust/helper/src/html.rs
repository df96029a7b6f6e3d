//! Pure HTML scraping over document content.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose boundaries become line breaks in plain text.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "table",
    "blockquote", "pre", "section", "article", "header", "footer",
];

/// Elements whose text never reaches the output.
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// The `id` of the last `<li>` of the last list (`<ul>` or `<ol>`) in document order.
///
/// `None` when there is no list, the last list has no direct items, or the
/// item carries no id.
pub fn last_list_item_id(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let list_sel = Selector::parse("ul, ol").expect("valid selector");

    let last_list = doc.select(&list_sel).last()?;
    let last_item = last_list
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "li")
        .last()?;

    last_item.value().attr("id").map(str::to_string)
}

/// Strip markup, keeping one line per block element.
///
/// Whitespace inside a line collapses to single spaces; blank lines are dropped.
pub fn html_to_text(html: &str) -> String {
    let doc = Html::parse_fragment(html);
    let mut raw = String::new();
    collect_text(doc.root_element(), false, &mut raw);

    static WS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[ \t\r\f\x{A0}]+").expect("valid regex"));

    raw.lines()
        .map(|line| WS_RE.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Line breaks in text nodes survive only under `<pre>`.
fn collect_text(el: ElementRef<'_>, in_pre: bool, out: &mut String) {
    let name = el.value().name();
    if SKIPPED_TAGS.contains(&name) {
        return;
    }
    let in_pre = in_pre || name == "pre";

    let is_block = BLOCK_TAGS.contains(&name);
    if is_block {
        out.push('\n');
    }

    for child in el.children() {
        match child.value() {
            Node::Text(text) if in_pre => out.push_str(text),
            Node::Text(text) => out.push_str(&text.replace('\n', " ")),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, in_pre, out);
                }
            }
            _ => {}
        }
    }

    if is_block {
        out.push('\n');
    }
}
