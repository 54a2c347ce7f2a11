//! HTTP side of the backend: auth, conversation list, history and send.

use std::fmt;

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::{ChatError, ChatMessage, Conversation, UserProfile};

/// Pull side of the backend used by the controller.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, ChatError>;

    async fn fetch_history(&self, chat_id: &str) -> Result<Vec<ChatMessage>, ChatError>;

    /// The acknowledgement body is ignored.
    async fn send_message(&self, chat_id: &str, content: &str) -> Result<(), ChatError>;
}

#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("mobile", &self.mobile)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<Value>,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    chat_id: &'a str,
    content: &'a str,
}

pub struct HttpChatApi {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpChatApi {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    pub async fn login(base_url: &str, request: &LoginRequest) -> Result<String, ChatError> {
        log::info!("Logging in as {}", request.email);
        request_token(base_url, "/auth/login", request).await
    }

    pub async fn register(base_url: &str, request: &RegisterRequest) -> Result<String, ChatError> {
        log::info!("Registering {}", request.email);
        request_token(base_url, "/auth/register", request).await
    }

    pub async fn me(&self) -> Result<UserProfile, ChatError> {
        self.get_json(&["me"]).await
    }

    /// Appends `segments` to the base url, percent-encoding each one.
    fn endpoint_url(&self, segments: &[&str]) -> Result<Url, ChatError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| ChatError::Config(format!("invalid backend url {}: {err}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| ChatError::Config(format!("backend url {} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ChatError> {
        let endpoint = format!("GET /{}", segments.join("/"));
        let url = self.endpoint_url(segments)?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|err| ChatError::fetch(&endpoint, None, err.to_string()))?;
        read_json(&endpoint, response).await
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, ChatError> {
        self.get_json(&["chats"]).await
    }

    async fn fetch_history(&self, chat_id: &str) -> Result<Vec<ChatMessage>, ChatError> {
        self.get_json(&["chats", chat_id, "messages"]).await
    }

    async fn send_message(&self, chat_id: &str, content: &str) -> Result<(), ChatError> {
        let endpoint = "POST /messages";
        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .bearer_auth(&self.token)
            .json(&SendRequest { chat_id, content })
            .send()
            .await
            .map_err(|err| ChatError::fetch(endpoint, None, err.to_string()))?;
        ensure_success(endpoint, response).await?;
        Ok(())
    }
}

async fn request_token<B: Serialize + ?Sized>(
    base_url: &str,
    path: &str,
    body: &B,
) -> Result<String, ChatError> {
    let endpoint = format!("POST {path}");
    let response = reqwest::Client::new()
        .post(format!("{base_url}{path}"))
        .json(body)
        .send()
        .await
        .map_err(|err| ChatError::fetch(&endpoint, None, err.to_string()))?;
    let token: TokenResponse = read_json(&endpoint, response).await?;
    token
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ChatError::fetch(&endpoint, None, "unexpected response: no access_token"))
}

async fn read_json<T: DeserializeOwned>(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<T, ChatError> {
    let response = ensure_success(endpoint, response).await?;
    response
        .json::<T>()
        .await
        .map_err(|err| ChatError::fetch(endpoint, None, format!("invalid response body: {err}")))
}

async fn ensure_success(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ChatError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let detail = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.detail)
        .map(|detail| match detail {
            Value::String(text) => text,
            other => other.to_string(),
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    Err(ChatError::fetch(endpoint, Some(status.as_u16()), detail))
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;

    /// Serves one canned HTTP response and returns the raw request it saw.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let read = stream.read(&mut buf).await.unwrap();
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..read]);
                if request_complete(&request) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });

        (format!("http://{addr}"), server)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        raw.len() >= header_end + 4 + content_length
    }

    #[tokio::test]
    async fn lists_conversations_with_bearer_token() {
        let (base, server) =
            serve_once("200 OK", r#"[{"_id":"c1","participant_ids":["u1","u2"]}]"#).await;
        let api = HttpChatApi::new(base, "secret-token");

        let chats = api.list_conversations().await.unwrap();
        let request = server.await.unwrap();

        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].id, "c1");
        assert!(request.starts_with("GET /chats HTTP/1.1"));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer secret-token"));
    }

    #[tokio::test]
    async fn non_success_status_surfaces_detail() {
        let (base, _server) = serve_once("404 Not Found", r#"{"detail":"Chat not found"}"#).await;
        let api = HttpChatApi::new(base, "t");

        let err = api.fetch_history("missing").await.unwrap_err();

        match err {
            ChatError::Fetch {
                endpoint,
                status,
                detail,
            } => {
                assert_eq!(endpoint, "GET /chats/missing/messages");
                assert_eq!(status, Some(404));
                assert_eq!(detail, "Chat not found");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn history_path_escapes_the_chat_id() {
        let (base, server) = serve_once("200 OK", "[]").await;
        let api = HttpChatApi::new(format!("{base}/"), "t");

        let history = api.fetch_history("a/b?c").await.unwrap();
        let request = server.await.unwrap();

        assert!(history.is_empty());
        assert!(request.starts_with("GET /chats/a%2Fb%3Fc/messages HTTP/1.1"));
    }

    #[tokio::test]
    async fn send_posts_chat_id_and_content() {
        let (base, server) = serve_once("200 OK", r#"{"ok":true}"#).await;
        let api = HttpChatApi::new(base, "t");

        api.send_message("c1", "hello").await.unwrap();
        let request = server.await.unwrap();

        assert!(request.starts_with("POST /messages HTTP/1.1"));
        let body = request.split("\r\n\r\n").nth(1).unwrap();
        let json: Value = serde_json::from_str(body).unwrap();
        assert_eq!(json["chat_id"], "c1");
        assert_eq!(json["content"], "hello");
    }

    #[tokio::test]
    async fn login_without_token_is_an_error() {
        let (base, _server) = serve_once("200 OK", r#"{}"#).await;
        let request = LoginRequest {
            email: "a@b.c".to_string(),
            password: "pw".to_string(),
        };

        let err = HttpChatApi::login(&base, &request).await.unwrap_err();

        assert!(err.is_fetch());
        assert!(!format!("{request:?}").contains("pw"));
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_fetch_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = HttpChatApi::new(format!("http://{addr}"), "t");
        let err = api.list_conversations().await.unwrap_err();

        assert!(matches!(err, ChatError::Fetch { status: None, .. }));
    }
}
