//! Resource-level API methods.
//!
//! Every method only builds a path and arguments, then hands off to
//! [`Transport`]. Nothing is validated locally: a missing or malformed field
//! comes back as the server's own [`ClientError::Api`].

use std::path::Path;

use reqwest::Body;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, instrument};
use url::Url;

use docbot_shared::ApiConfig;

use crate::error::{ClientError, Result};
use crate::form::FormArgs;
use crate::options::{
    EditDocument, MessageQuery, NewDocument, NewFolder, NewMessage, RecentThreads, SearchThreads,
    UpdateFolder,
};
use crate::transport::Transport;
use crate::websocket::{self, WebSocket};

/// Multipart field name for blob uploads.
const BLOB_FIELD: &str = "blob";

/// How the client authenticates. Exactly one mode per client.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Bearer token sent on every request.
    Token(String),
    /// OAuth application credentials, used to build authorize URLs and
    /// exchange codes. No bearer header is sent.
    OAuth {
        client_id: String,
        client_secret: String,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token(_) => f.debug_tuple("Token").field(&"[REDACTED]").finish(),
            Self::OAuth { client_id, .. } => f
                .debug_struct("OAuth")
                .field("client_id", client_id)
                .field("client_secret", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Result of an OAuth code or refresh-token exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Client for the document API. Immutable after construction; clone freely.
#[derive(Debug, Clone)]
pub struct Client {
    transport: Transport,
    credentials: Credentials,
}

impl Client {
    pub fn new(api: &ApiConfig, credentials: Credentials) -> Result<Self> {
        let token = match &credentials {
            Credentials::Token(token) => Some(token.clone()),
            Credentials::OAuth { .. } => None,
        };
        Ok(Self {
            transport: Transport::new(api, token)?,
            credentials,
        })
    }

    /// Shorthand for a bearer-token client.
    pub fn with_token(api: &ApiConfig, token: impl Into<String>) -> Result<Self> {
        Self::new(api, Credentials::Token(token.into()))
    }

    fn oauth(&self) -> Result<(&str, &str)> {
        match &self.credentials {
            Credentials::OAuth {
                client_id,
                client_secret,
            } => Ok((client_id.as_str(), client_secret.as_str())),
            Credentials::Token(_) => Err(ClientError::MissingOAuth),
        }
    }

    // -----------------------------------------------------------------------
    // OAuth
    // -----------------------------------------------------------------------

    /// URL to send the user to for authorization. No network call.
    pub fn authorization_url(&self, redirect_uri: &str, state: Option<&str>) -> Result<Url> {
        let (client_id, _) = self.oauth()?;
        let path = FormArgs::new()
            .text("redirect_uri", Some(redirect_uri))
            .text("state", state)
            .text("response_type", Some("code"))
            .text("client_id", Some(client_id))
            .to_path("oauth/login");
        Ok(Url::parse(&self.transport.url_for(&path))?)
    }

    /// Exchange an authorization code. `redirect_uri` must match the one
    /// used to obtain `code`.
    #[instrument(skip_all)]
    pub async fn access_token(&self, redirect_uri: &str, code: &str) -> Result<AccessToken> {
        let (client_id, client_secret) = self.oauth()?;
        let path = FormArgs::new()
            .text("redirect_uri", Some(redirect_uri))
            .text("code", Some(code))
            .text("grant_type", Some("authorization_code"))
            .text("client_id", Some(client_id))
            .text("client_secret", Some(client_secret))
            .to_path("oauth/access_token");
        let value = self.transport.get(&path).await?;
        decode_token("oauth/access_token", value)
    }

    #[instrument(skip_all)]
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<AccessToken> {
        let (client_id, client_secret) = self.oauth()?;
        let path = FormArgs::new()
            .text("refresh_token", Some(refresh_token))
            .text("grant_type", Some("refresh_token"))
            .text("client_id", Some(client_id))
            .text("client_secret", Some(client_secret))
            .to_path("oauth/access_token");
        let value = self.transport.get(&path).await?;
        decode_token("oauth/access_token", value)
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    pub async fn authenticated_user(&self) -> Result<Value> {
        self.transport.get("users/current").await
    }

    /// Single-user sugar over [`Client::users`]. `None` when the id is not
    /// in the response.
    pub async fn user(&self, id: &str) -> Result<Option<Value>> {
        let mut users = self.users(&[id.to_string()]).await?;
        Ok(users.remove(id))
    }

    /// Users keyed by id.
    pub async fn users(&self, ids: &[String]) -> Result<Map<String, Value>> {
        let path = FormArgs::new().ids("ids", ids).to_path("users/");
        let value = self.transport.get(&path).await?;
        into_object("users/", value)
    }

    pub async fn contacts(&self) -> Result<Value> {
        self.transport.get("users/contacts").await
    }

    // -----------------------------------------------------------------------
    // Folders
    // -----------------------------------------------------------------------

    pub async fn folder(&self, id: &str) -> Result<Value> {
        self.transport.get(&format!("folders/{id}")).await
    }

    pub async fn folders(&self, ids: &[String]) -> Result<Map<String, Value>> {
        let path = FormArgs::new().ids("ids", ids).to_path("folders/");
        let value = self.transport.get(&path).await?;
        into_object("folders/", value)
    }

    pub async fn new_folder(&self, folder: &NewFolder) -> Result<Value> {
        self.transport
            .post_form("folders/new", &folder.to_args())
            .await
    }

    pub async fn update_folder(&self, update: &UpdateFolder) -> Result<Value> {
        self.transport
            .post_form("folders/update", &update.to_args())
            .await
    }

    pub async fn add_folder_members(&self, folder_id: &str, member_ids: &[String]) -> Result<Value> {
        let args = membership_args("folder_id", folder_id, member_ids);
        self.transport.post_form("folders/add-members", &args).await
    }

    pub async fn remove_folder_members(
        &self,
        folder_id: &str,
        member_ids: &[String],
    ) -> Result<Value> {
        let args = membership_args("folder_id", folder_id, member_ids);
        self.transport
            .post_form("folders/remove-members", &args)
            .await
    }

    // -----------------------------------------------------------------------
    // Threads and documents
    // -----------------------------------------------------------------------

    pub async fn thread(&self, id: &str) -> Result<Value> {
        self.transport.get(&format!("threads/{id}")).await
    }

    pub async fn threads(&self, ids: &[String]) -> Result<Map<String, Value>> {
        let path = FormArgs::new().ids("ids", ids).to_path("threads/");
        let value = self.transport.get(&path).await?;
        into_object("threads/", value)
    }

    pub async fn recent_threads(&self, query: &RecentThreads) -> Result<Value> {
        let path = query.to_args().to_path("threads/recent");
        self.transport.get(&path).await
    }

    pub async fn search_threads(&self, query: &SearchThreads) -> Result<Value> {
        let path = query.to_args().to_path("threads/search");
        self.transport.get(&path).await
    }

    pub async fn new_document(&self, doc: &NewDocument) -> Result<Value> {
        self.transport
            .post_form("threads/new-document", &doc.to_args())
            .await
    }

    pub async fn edit_document(&self, edit: &EditDocument) -> Result<Value> {
        self.transport
            .post_form("threads/edit-document", &edit.to_args())
            .await
    }

    pub async fn add_thread_members(&self, thread_id: &str, member_ids: &[String]) -> Result<Value> {
        let args = membership_args("thread_id", thread_id, member_ids);
        self.transport.post_form("threads/add-members", &args).await
    }

    pub async fn remove_thread_members(
        &self,
        thread_id: &str,
        member_ids: &[String],
    ) -> Result<Value> {
        let args = membership_args("thread_id", thread_id, member_ids);
        self.transport
            .post_form("threads/remove-members", &args)
            .await
    }

    // -----------------------------------------------------------------------
    // Messages
    // -----------------------------------------------------------------------

    pub async fn messages(&self, query: &MessageQuery) -> Result<Value> {
        let path = query
            .to_args()
            .to_path(&format!("messages/{}", query.thread_id));
        self.transport.get(&path).await
    }

    pub async fn new_message(&self, message: &NewMessage) -> Result<Value> {
        self.transport
            .post_form("messages/new", &message.to_args())
            .await
    }

    // -----------------------------------------------------------------------
    // Blobs
    // -----------------------------------------------------------------------

    /// Stream the body of `url` into a blob attached to `thread_id`.
    #[instrument(skip_all, fields(thread_id = %thread_id))]
    pub async fn add_blob_from_url(&self, thread_id: &str, url: &str) -> Result<Value> {
        let source = Url::parse(url)?;
        let response = self
            .transport
            .http()
            .get(source.clone())
            .send()
            .await?
            .error_for_status()?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut part = Part::stream(Body::wrap_stream(response.bytes_stream()))
            .file_name(file_name_from_url(&source));
        if let Some(mime) = content_type {
            part = part.mime_str(&mime)?;
        }

        debug!("streaming remote blob");
        self.upload_blob(thread_id, part).await
    }

    /// Stream a local file into a blob attached to `thread_id`.
    #[instrument(skip_all, fields(thread_id = %thread_id))]
    pub async fn add_blob_from_path(
        &self,
        thread_id: &str,
        path: impl AsRef<Path>,
    ) -> Result<Value> {
        let path = path.as_ref();
        let io_err = |source: std::io::Error| ClientError::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = tokio::fs::File::open(path).await.map_err(io_err)?;
        let len = file.metadata().await.map_err(io_err)?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| BLOB_FIELD.to_string());

        let part = Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), len)
            .file_name(name);

        debug!(bytes = len, "streaming local blob");
        self.upload_blob(thread_id, part).await
    }

    async fn upload_blob(&self, thread_id: &str, part: Part) -> Result<Value> {
        let form = Form::new().part(BLOB_FIELD, part);
        self.transport
            .post_multipart(&format!("blob/{thread_id}"), form)
            .await
    }

    // -----------------------------------------------------------------------
    // Websockets
    // -----------------------------------------------------------------------

    /// Ask the API for a short-lived websocket URL.
    pub async fn websocket_grant(&self) -> Result<Value> {
        self.transport.get("websockets/new").await
    }

    /// Request a websocket URL and open a connection to it.
    #[instrument(skip_all)]
    pub async fn connect_websocket(&self) -> Result<WebSocket> {
        let grant = self.websocket_grant().await?;
        let socket = websocket::connect(&grant).await?;
        info!("websocket connected");
        Ok(socket)
    }
}

fn membership_args(id_field: &'static str, id: &str, member_ids: &[String]) -> FormArgs {
    FormArgs::new()
        .text(id_field, Some(id))
        .ids("member_ids", member_ids)
}

fn into_object(path: &str, value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ClientError::Decode {
            path: path.to_string(),
            body: other.to_string(),
        }),
    }
}

fn decode_token(path: &str, value: Value) -> Result<AccessToken> {
    let body = value.to_string();
    serde_json::from_value(value).map_err(|_| ClientError::Decode {
        path: path.to_string(),
        body,
    })
}

fn file_name_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .unwrap_or(BLOB_FIELD)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn oauth_client(api: &ApiConfig) -> Client {
        Client::new(
            api,
            Credentials::OAuth {
                client_id: "abc".into(),
                client_secret: "shh".into(),
            },
        )
        .unwrap()
    }

    async fn token_client(server: &MockServer) -> Client {
        let api = ApiConfig::from_url(&server.uri()).unwrap();
        Client::with_token(&api, "tok").unwrap()
    }

    /// Decode the form body of the single request the server saw.
    async fn sole_form_body(server: &MockServer) -> HashMap<String, String> {
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        url::form_urlencoded::parse(&requests[0].body)
            .into_owned()
            .collect()
    }

    #[test]
    fn authorization_url_has_exact_query() {
        let api = ApiConfig::production();
        let client = oauth_client(&api);
        let url = client
            .authorization_url("https://app/callback", Some("s1"))
            .unwrap();

        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("platform.quip.com"));
        assert_eq!(url.port_or_known_default(), Some(443));
        assert_eq!(url.path(), "/1/oauth/login");

        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
        let expected: HashMap<String, String> = [
            ("redirect_uri", "https://app/callback"),
            ("state", "s1"),
            ("response_type", "code"),
            ("client_id", "abc"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(query, expected);
    }

    #[test]
    fn authorization_url_follows_environment() {
        let client = oauth_client(&ApiConfig::development());
        let url = client.authorization_url("https://app/cb", None).unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host_str(), Some("platform.docker.qa"));
        assert_eq!(url.port(), Some(10000));
        assert!(!url.query_pairs().any(|(k, _)| k == "state"));
    }

    #[test]
    fn oauth_calls_require_oauth_credentials() {
        let client = Client::with_token(&ApiConfig::production(), "tok").unwrap();
        let err = client.authorization_url("https://app/cb", None).unwrap_err();
        assert!(matches!(err, ClientError::MissingOAuth));
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let creds = Credentials::OAuth {
            client_id: "abc".into(),
            client_secret: "topsecret".into(),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("abc"));
        assert!(!debug.contains("topsecret"));
        assert_eq!(
            format!("{:?}", Credentials::Token("tok".into())),
            "Token(\"[REDACTED]\")"
        );
    }

    #[tokio::test]
    async fn access_token_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1/oauth/access_token"))
            .and(query_param("code", "c0de"))
            .and(query_param("redirect_uri", "https://app/cb"))
            .and(query_param("grant_type", "authorization_code"))
            .and(query_param("client_id", "abc"))
            .and(query_param("client_secret", "shh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "at",
                "refresh_token": "rt",
                "expires_in": 2592000,
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let client = oauth_client(&ApiConfig::from_url(&server.uri()).unwrap());
        let token = client.access_token("https://app/cb", "c0de").await.unwrap();
        assert_eq!(token.access_token, "at");
        assert_eq!(token.refresh_token.as_deref(), Some("rt"));
    }

    #[tokio::test]
    async fn access_token_without_token_field_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let client = oauth_client(&ApiConfig::from_url(&server.uri()).unwrap());
        let err = client.refresh_access_token("rt").await.unwrap_err();
        assert!(matches!(err, ClientError::Decode { .. }));
    }

    #[tokio::test]
    async fn user_present_in_batch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1/users/"))
            .and(query_param("ids", "u1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"u1": {"id": "u1", "name": "Ada"}})),
            )
            .mount(&server)
            .await;

        let client = token_client(&server).await;
        let user = client.user("u1").await.unwrap().unwrap();
        assert_eq!(user["name"], "Ada");
    }

    #[tokio::test]
    async fn user_absent_from_batch_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1/users/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"other": {}})))
            .mount(&server)
            .await;

        let client = token_client(&server).await;
        assert!(client.user("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn batch_ids_are_comma_joined() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1/threads/"))
            .and(query_param("ids", "t1,t2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"t1": {}, "t2": {}})))
            .mount(&server)
            .await;

        let client = token_client(&server).await;
        let threads = client
            .threads(&["t1".to_string(), "t2".to_string()])
            .await
            .unwrap();
        assert_eq!(threads.len(), 2);
    }

    #[tokio::test]
    async fn new_folder_drops_falsy_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/folders/new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"folder": {}})))
            .mount(&server)
            .await;

        let client = token_client(&server).await;
        client
            .new_folder(&NewFolder {
                title: "Plans".into(),
                parent_id: Some(String::new()),
                color: Some(crate::FolderColor::Manila),
                member_ids: vec![],
            })
            .await
            .unwrap();

        let body = sole_form_body(&server).await;
        assert_eq!(body.len(), 1);
        assert_eq!(body["title"], "Plans");
    }

    #[tokio::test]
    async fn edit_document_posts_section_anchor() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/threads/edit-document"))
            .and(body_string_contains("section_id=s3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"thread": {"id": "t1"}})))
            .mount(&server)
            .await;

        let client = token_client(&server).await;
        client
            .edit_document(&EditDocument {
                thread_id: "t1".into(),
                content: "<p>hi</p>".into(),
                operation: Some(crate::Operation::AfterSection),
                format: Some(crate::Format::Html),
                section_id: Some("s3".into()),
            })
            .await
            .unwrap();

        let body = sole_form_body(&server).await;
        assert_eq!(body["thread_id"], "t1");
        assert_eq!(body["content"], "<p>hi</p>");
        assert_eq!(body["operation"], "2");
        assert_eq!(body["format"], "html");
    }

    #[tokio::test]
    async fn thread_members_mutation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/threads/remove-members"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = token_client(&server).await;
        client
            .remove_thread_members("t1", &["u1".into(), "u2".into()])
            .await
            .unwrap();

        let body = sole_form_body(&server).await;
        assert_eq!(body["thread_id"], "t1");
        assert_eq!(body["member_ids"], "u1,u2");
    }

    #[tokio::test]
    async fn messages_put_thread_in_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1/messages/t1"))
            .and(query_param("count", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = token_client(&server).await;
        let messages = client
            .messages(&MessageQuery {
                thread_id: "t1".into(),
                count: Some(10),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(messages.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_sends_title_only_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1/threads/search"))
            .and(query_param("query", "Roadmap"))
            .and(query_param("only_match_titles", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = token_client(&server).await;
        client
            .search_threads(&SearchThreads {
                query: "Roadmap".into(),
                count: None,
                only_match_titles: true,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn blob_from_path_is_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/blob/t1"))
            .and(body_string_contains("name=\"blob\""))
            .and(body_string_contains("hello blob"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "b1", "url": "/blob/t1/b1"})),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("note.txt");
        std::fs::write(&file, "hello blob").unwrap();

        let client = token_client(&server).await;
        let blob = client.add_blob_from_path("t1", &file).await.unwrap();
        assert_eq!(blob["id"], "b1");
    }

    #[tokio::test]
    async fn blob_from_missing_path_is_io_error() {
        let server = MockServer::start().await;
        let client = token_client(&server).await;
        let err = client
            .add_blob_from_path("t1", "/nonexistent/docbot/file.png")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Io { .. }));
    }

    #[tokio::test]
    async fn blob_from_url_streams_remote_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/assets/logo.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(b"PNGDATA".to_vec()),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/1/blob/t1"))
            .and(body_string_contains("filename=\"logo.png\""))
            .and(body_string_contains("PNGDATA"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "b2"})))
            .mount(&server)
            .await;

        let client = token_client(&server).await;
        let source = format!("{}/assets/logo.png", server.uri());
        let blob = client.add_blob_from_url("t1", &source).await.unwrap();
        assert_eq!(blob["id"], "b2");
    }

    #[test]
    fn file_name_falls_back_for_bare_urls() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(file_name_from_url(&url), "blob");
        let url = Url::parse("https://example.com/a/b.jpg").unwrap();
        assert_eq!(file_name_from_url(&url), "b.jpg");
    }
}
