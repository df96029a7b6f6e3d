//! Typed request options, one struct per endpoint that takes more than an id.
//!
//! Each `to_args` maps the Rust field names onto the API's snake_case fields.

use crate::form::FormArgs;

/// Content format for documents and edits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Html,
    Markdown,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Markdown => "markdown",
        }
    }
}

/// Where an edit lands relative to the document or a section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Operation {
    #[default]
    Append,
    Prepend,
    AfterSection,
    BeforeSection,
    ReplaceSection,
    DeleteSection,
}

impl Operation {
    pub fn code(&self) -> i64 {
        match self {
            Self::Append => 0,
            Self::Prepend => 1,
            Self::AfterSection => 2,
            Self::BeforeSection => 3,
            Self::ReplaceSection => 4,
            Self::DeleteSection => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FolderColor {
    #[default]
    Manila,
    Red,
    Orange,
    Green,
    Blue,
}

impl FolderColor {
    pub fn code(&self) -> i64 {
        match self {
            Self::Manila => 0,
            Self::Red => 1,
            Self::Orange => 2,
            Self::Green => 3,
            Self::Blue => 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Folders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct NewFolder {
    pub title: String,
    pub parent_id: Option<String>,
    pub color: Option<FolderColor>,
    pub member_ids: Vec<String>,
}

impl NewFolder {
    pub(crate) fn to_args(&self) -> FormArgs {
        FormArgs::new()
            .text("title", Some(self.title.as_str()))
            .text("parent_id", self.parent_id.as_deref())
            .number("color", self.color.map(|c| c.code()))
            .ids("member_ids", &self.member_ids)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateFolder {
    pub folder_id: String,
    pub title: Option<String>,
    pub color: Option<FolderColor>,
}

impl UpdateFolder {
    pub(crate) fn to_args(&self) -> FormArgs {
        FormArgs::new()
            .text("folder_id", Some(self.folder_id.as_str()))
            .text("title", self.title.as_deref())
            .number("color", self.color.map(|c| c.code()))
    }
}

// ---------------------------------------------------------------------------
// Threads and documents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct RecentThreads {
    pub count: Option<i64>,
    pub max_updated_usec: Option<i64>,
}

impl RecentThreads {
    pub(crate) fn to_args(&self) -> FormArgs {
        FormArgs::new()
            .number("count", self.count)
            .number("max_updated_usec", self.max_updated_usec)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchThreads {
    pub query: String,
    pub count: Option<i64>,
    /// Restrict matching to document titles.
    pub only_match_titles: bool,
}

impl SearchThreads {
    pub(crate) fn to_args(&self) -> FormArgs {
        FormArgs::new()
            .text("query", Some(self.query.as_str()))
            .number("count", self.count)
            .flag("only_match_titles", self.only_match_titles)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewDocument {
    pub content: String,
    pub format: Option<Format>,
    pub title: Option<String>,
    pub member_ids: Vec<String>,
}

impl NewDocument {
    pub(crate) fn to_args(&self) -> FormArgs {
        FormArgs::new()
            .text("content", Some(self.content.as_str()))
            .text("format", self.format.map(|f| f.as_str()))
            .text("title", self.title.as_deref())
            .ids("member_ids", &self.member_ids)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EditDocument {
    pub thread_id: String,
    pub content: String,
    pub operation: Option<Operation>,
    pub format: Option<Format>,
    /// Anchor section for the `*Section` operations.
    pub section_id: Option<String>,
}

impl EditDocument {
    pub(crate) fn to_args(&self) -> FormArgs {
        FormArgs::new()
            .text("thread_id", Some(self.thread_id.as_str()))
            .text("content", Some(self.content.as_str()))
            .number("operation", self.operation.map(|o| o.code()))
            .text("format", self.format.map(|f| f.as_str()))
            .text("section_id", self.section_id.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MessageQuery {
    pub thread_id: String,
    pub max_created_usec: Option<i64>,
    pub count: Option<i64>,
}

impl MessageQuery {
    /// Query-string part only; the thread id goes into the path.
    pub(crate) fn to_args(&self) -> FormArgs {
        FormArgs::new()
            .number("max_created_usec", self.max_created_usec)
            .number("count", self.count)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewMessage {
    pub thread_id: String,
    pub content: String,
    /// Post without notifying thread members.
    pub silent: bool,
}

impl NewMessage {
    pub(crate) fn to_args(&self) -> FormArgs {
        FormArgs::new()
            .text("thread_id", Some(self.thread_id.as_str()))
            .text("content", Some(self.content.as_str()))
            .flag("silent", self.silent)
    }
}
