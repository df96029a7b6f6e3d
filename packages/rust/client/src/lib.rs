//! Typed client for the document-collaboration REST API.
//!
//! Layers, leaves first:
//! - [`FormArgs`] — optional-field serializer for query strings and form bodies
//! - [`Transport`] — one HTTP call, normalized into JSON or a [`ClientError`]
//! - [`Client`] — one method per remote resource (users, folders, threads,
//!   messages, documents, blobs, websockets, OAuth)

mod client;
mod error;
mod form;
mod options;
mod transport;
mod websocket;

pub use client::{AccessToken, Client, Credentials};
pub use error::{ClientError, Result};
pub use form::FormArgs;
pub use options::{
    EditDocument, FolderColor, Format, MessageQuery, NewDocument, NewFolder, NewMessage,
    Operation, RecentThreads, SearchThreads, UpdateFolder,
};
pub use transport::Transport;
pub use websocket::WebSocket;

/// Frames read from a [`WebSocket`].
pub use tokio_tungstenite::tungstenite::Message;
