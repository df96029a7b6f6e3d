//! Document lookup and editing on top of [`docbot_client::Client`].
//!
//! Each operation awaits its API calls in sequence and reports failures as
//! [`ClientError`]. Outcomes such as "no document" are ordinary values, so
//! callers can tell a miss apart from a transport, decode or API failure.

pub mod html;

use std::fmt;

use docbot_client::{Client, ClientError, EditDocument, Format, Operation, SearchThreads};
use serde_json::Value;
use tracing::{info, instrument, warn};

pub use html::{html_to_text, last_list_item_id};

/// Reply text when a lookup finds nothing readable.
pub const NOT_FOUND_TEXT: &str = "Could not find that document";

/// Reply text when there is nothing to edit.
pub const NO_RESULTS_TEXT: &str = "No Results Found";

const SEARCH_PATH: &str = "threads/search";

/// Outcome of [`DocumentHelper::find_and_edit_document`].
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// The edit went through; holds the API's response.
    Edited(Value),
    /// No title match, or the first match had no content.
    NoEditableDocument,
}

impl fmt::Display for EditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Edited(response) => {
                let title = response
                    .pointer("/thread/title")
                    .and_then(Value::as_str)
                    .unwrap_or("document");
                write!(f, "Updated {title}")
            }
            Self::NoEditableDocument => f.write_str(NO_RESULTS_TEXT),
        }
    }
}

/// Title-based document operations.
#[derive(Debug, Clone)]
pub struct DocumentHelper {
    client: Client,
}

impl DocumentHelper {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Search with title-only matching. A response that is not an array is a
    /// [`ClientError::Decode`].
    #[instrument(skip(self))]
    pub async fn find_document_by_title(&self, title: &str) -> Result<Vec<Value>, ClientError> {
        let query = SearchThreads {
            query: title.to_string(),
            count: None,
            only_match_titles: true,
        };
        let response = self
            .client
            .search_threads(&query)
            .await
            .inspect_err(|e| warn!(error = %e, "title search failed"))?;

        match response {
            Value::Array(results) => Ok(results),
            other => {
                warn!("title search returned a non-array body");
                Err(malformed_search(&other))
            }
        }
    }

    /// Rendered HTML of a thread; empty when the thread has none.
    #[instrument(skip(self))]
    pub async fn get_document_contents(&self, thread_id: &str) -> Result<String, ClientError> {
        let thread = self
            .client
            .thread(thread_id)
            .await
            .inspect_err(|e| warn!(error = %e, "fetching document failed"))?;

        Ok(thread
            .get("html")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    /// Insert `new_content` right after the last item of the last list in
    /// `current_html`. Without such an item the content is appended to the
    /// end of the document.
    #[instrument(skip(self, current_html, new_content))]
    pub async fn edit_document(
        &self,
        thread_id: &str,
        current_html: &str,
        new_content: &str,
    ) -> Result<Value, ClientError> {
        let section_id = last_list_item_id(current_html);
        let operation = match section_id {
            Some(_) => Operation::AfterSection,
            None => Operation::Append,
        };

        let edit = EditDocument {
            thread_id: thread_id.to_string(),
            content: new_content.to_string(),
            operation: Some(operation),
            format: Some(Format::Html),
            section_id,
        };

        self.client
            .edit_document(&edit)
            .await
            .inspect_err(|e| warn!(error = %e, "document edit failed"))
    }

    /// Find the first document titled `title` and append `new_content` after
    /// its last list item.
    #[instrument(skip(self, new_content))]
    pub async fn find_and_edit_document(
        &self,
        title: &str,
        new_content: &str,
    ) -> Result<EditOutcome, ClientError> {
        let Some(thread_id) = self.first_match(title).await? else {
            info!("no document matches title");
            return Ok(EditOutcome::NoEditableDocument);
        };

        let contents = self.get_document_contents(&thread_id).await?;
        if contents.is_empty() {
            info!(%thread_id, "document has no content to edit");
            return Ok(EditOutcome::NoEditableDocument);
        }

        let response = self.edit_document(&thread_id, &contents, new_content).await?;
        info!(%thread_id, "document edited");
        Ok(EditOutcome::Edited(response))
    }

    /// Plain text of the first document titled `title`, or [`NOT_FOUND_TEXT`].
    #[instrument(skip(self))]
    pub async fn get_contents_by_title(&self, title: &str) -> Result<String, ClientError> {
        let Some(thread_id) = self.first_match(title).await? else {
            return Ok(NOT_FOUND_TEXT.to_string());
        };

        let contents = self.get_document_contents(&thread_id).await?;
        let text = html_to_text(&contents);
        if text.is_empty() {
            return Ok(NOT_FOUND_TEXT.to_string());
        }

        info!(%thread_id, chars = text.len(), "document text extracted");
        Ok(text)
    }

    /// Thread id of the first title match; `None` only when nothing matched.
    async fn first_match(&self, title: &str) -> Result<Option<String>, ClientError> {
        let results = self.find_document_by_title(title).await?;
        let Some(first) = results.first() else {
            return Ok(None);
        };

        match first.pointer("/thread/id").and_then(Value::as_str) {
            Some(id) => Ok(Some(id.to_string())),
            None => {
                warn!("first search result has no thread id");
                Err(malformed_search(first))
            }
        }
    }
}

fn malformed_search(body: &Value) -> ClientError {
    ClientError::Decode {
        path: SEARCH_PATH.to_string(),
        body: body.to_string(),
    }
}
