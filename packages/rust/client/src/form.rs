//! Optional-field serialization for request arguments.
//!
//! Only meaningful values are transmitted: empty strings, zero, `false`,
//! `None` and empty id lists never reach the wire. Each kept field appears
//! once, under the remote API's snake_case name.

use url::form_urlencoded;

/// Ordered `name=value` pairs for a query string or form body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormArgs {
    fields: Vec<(&'static str, String)>,
}

impl FormArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// String field; omitted when `None` or empty.
    pub fn text(mut self, name: &'static str, value: Option<&str>) -> Self {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            self.fields.push((name, v.to_string()));
        }
        self
    }

    /// Integer field; omitted when `None` or zero.
    pub fn number(mut self, name: &'static str, value: Option<i64>) -> Self {
        if let Some(v) = value.filter(|v| *v != 0) {
            self.fields.push((name, v.to_string()));
        }
        self
    }

    /// Boolean field; only `true` is sent.
    pub fn flag(mut self, name: &'static str, value: bool) -> Self {
        if value {
            self.fields.push((name, "true".to_string()));
        }
        self
    }

    /// Comma-joined id list; omitted when empty.
    pub fn ids(self, name: &'static str, ids: &[String]) -> Self {
        let joined = ids.join(",");
        self.text(name, Some(&joined))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.fields
    }

    /// URL-encoded `a=1&b=2`, without a leading `?`.
    pub fn to_query(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.fields {
            serializer.append_pair(name, value);
        }
        serializer.finish()
    }

    /// Append the encoded fields to `path` as its query string.
    pub fn to_path(&self, path: &str) -> String {
        if self.is_empty() {
            path.to_string()
        } else {
            format!("{path}?{}", self.to_query())
        }
    }
}
