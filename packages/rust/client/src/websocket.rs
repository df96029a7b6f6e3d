//! Websocket connection to a server-granted URL.

use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::ORIGIN;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

use crate::error::{ClientError, Result, server_message};

/// An open websocket to the API's event stream.
pub type WebSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Message used when the grant has neither a URL nor an error description.
const GENERIC_GRANT_FAILURE: &str = "failed to obtain a websocket URL";

/// Connect to the URL in a `websockets/new` response.
pub(crate) async fn connect(grant: &Value) -> Result<WebSocket> {
    let url = granted_url(grant)?;
    let origin = origin_of(&url);

    let mut request = url.as_str().into_client_request()?;
    let origin_header = HeaderValue::from_str(&origin)
        .map_err(|e| ClientError::WebsocketGrant(format!("invalid origin '{origin}': {e}")))?;
    request.headers_mut().insert(ORIGIN, origin_header);

    debug!(%origin, "opening websocket");
    let (socket, _response) = tokio_tungstenite::connect_async(request).await?;
    Ok(socket)
}

/// The granted URL, or the server's explanation for not granting one.
fn granted_url(grant: &Value) -> Result<Url> {
    match grant.get("url").and_then(Value::as_str) {
        Some(url) if !url.is_empty() => Ok(Url::parse(url)?),
        _ => Err(ClientError::WebsocketGrant(
            server_message(grant)
                .unwrap_or(GENERIC_GRANT_FAILURE)
                .to_string(),
        )),
    }
}

/// `scheme://host[:port]` of the granted URL; the handshake declares it as `Origin`.
fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use docbot_shared::ApiConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn origin_is_scheme_and_host() {
        let url = Url::parse("wss://ws.example.com/events?token=abc").unwrap();
        assert_eq!(origin_of(&url), "wss://ws.example.com");

        let url = Url::parse("ws://127.0.0.1:9000/socket").unwrap();
        assert_eq!(origin_of(&url), "ws://127.0.0.1:9000");
    }

    #[test]
    fn missing_url_surfaces_server_message() {
        let err = granted_url(&json!({"error": "forbidden", "error_description": "Rate limited"}))
            .unwrap_err();
        assert_eq!(err.to_string(), "websocket grant failed: Rate limited");
    }

    #[test]
    fn missing_url_without_message_is_generic() {
        let err = granted_url(&json!({})).unwrap_err();
        assert!(matches!(&err, ClientError::WebsocketGrant(msg) if msg == GENERIC_GRANT_FAILURE));
    }

    #[test]
    fn granted_url_parses() {
        let url = granted_url(&json!({"url": "wss://ws.example.com/x", "user_id": "u1"})).unwrap();
        assert_eq!(url.host_str(), Some("ws.example.com"));
    }

    #[tokio::test]
    async fn handshake_sends_origin_of_granted_url() {
        use tokio::net::TcpListener;
        use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let ws_server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut origin = None;
            let _socket = tokio_tungstenite::accept_hdr_async(
                stream,
                |req: &Request, resp: Response| {
                    origin = req
                        .headers()
                        .get("origin")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    Ok::<_, ErrorResponse>(resp)
                },
            )
            .await
            .unwrap();
            origin
        });

        let api_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1/websockets/new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "url": format!("ws://127.0.0.1:{port}/events?token=abc"),
                "user_id": "u1",
            })))
            .mount(&api_server)
            .await;

        let api = ApiConfig::from_url(&api_server.uri()).unwrap();
        let client = Client::with_token(&api, "tok").unwrap();
        let _socket = client.connect_websocket().await.unwrap();

        let origin = ws_server.await.unwrap();
        assert_eq!(origin, Some(format!("ws://127.0.0.1:{port}")));
    }

    #[tokio::test]
    async fn connect_fails_before_dialing_when_grant_lacks_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1/websockets/new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "disabled"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiConfig::from_url(&server.uri()).unwrap();
        let client = Client::with_token(&api, "tok").unwrap();
        let err = client.connect_websocket().await.unwrap_err();
        assert!(matches!(&err, ClientError::WebsocketGrant(msg) if msg == "disabled"));
    }
}
