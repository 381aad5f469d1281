pub mod error;

pub use error::Error;

use crate::api::{self, TokenPair};
use crate::storage::{CredentialStore, Kind};
use anyhow::{anyhow, Result};
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// # Errors
/// Returns an error if `url` cannot be parsed, has no host, or uses an unsupported scheme.
pub fn origin_url(url: &str) -> Result<String> {
    let url = Url::parse(url)?;

    let scheme = url.scheme();

    let host = url
        .host()
        .ok_or_else(|| anyhow!("Error parsing URL: no host specified"))?
        .to_owned();

    let port = match url.port() {
        Some(p) => p,
        None => match scheme {
            "http" => 80,
            "https" => 443,
            _ => return Err(anyhow!("Error parsing URL: unsupported scheme {scheme}")),
        },
    };

    let origin = format!("{scheme}://{host}:{port}");

    debug!("API origin: {}", origin);

    Ok(origin)
}

/// Single-retry marker for one logical request. `Replay` is terminal: a
/// request is never re-issued twice no matter how many 401s come back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    Replay,
}

#[derive(Debug)]
struct PendingRequest {
    method: Method,
    url: String,
    body: Option<Value>,
}

/// HTTP client for the image-randomizer API.
///
/// Every authenticated request carries `Authorization: Bearer <access>` read
/// fresh from the credential store. A 401 triggers one refresh against
/// `/token/refresh` (presenting the refresh token) followed by a single
/// replay of the original request; a second 401, or a rejected refresh
/// token, wipes the stored credentials and ends the session.
pub struct ApiClient {
    pub(crate) http: Client,
    origin: String,
    store: Arc<CredentialStore>,
}

impl ApiClient {
    /// # Errors
    /// Returns an error if `base_url` is not a valid http(s) URL or the HTTP client cannot be built.
    pub fn new(base_url: &str, store: Arc<CredentialStore>) -> Result<Self> {
        let origin = origin_url(base_url)?;
        let http = Client::builder().user_agent(APP_USER_AGENT).build()?;

        Ok(Self {
            http,
            origin,
            store,
        })
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    #[must_use]
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.origin, path)
    }

    /// Issues an authenticated request, running the refresh-and-retry
    /// protocol when the access token is rejected.
    pub(crate) async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, Error> {
        let pending = PendingRequest {
            method,
            url: self.endpoint(path),
            body,
        };
        let mut attempt = Attempt::First;

        loop {
            let response = self.issue(&pending).await?;

            if response.status() != StatusCode::UNAUTHORIZED {
                return unwrap_envelope(response).await;
            }

            let original = backend_error(response).await;

            if attempt == Attempt::Replay {
                // Second 401 for the same logical request: the session is gone.
                self.store.clear()?;
                return Err(terminal(original));
            }
            attempt = Attempt::Replay;

            debug!("access token rejected, refreshing");

            match self.refresh_access_token().await {
                Ok(access) => self.store.save(Kind::Access, &access)?,
                Err(err) => {
                    warn!("token refresh failed: {}", err);
                    self.store.clear()?;

                    // A rejected refresh token ends the session; any other
                    // refresh failure surfaces the original request's error.
                    return if err.status() == Some(StatusCode::UNAUTHORIZED.as_u16()) {
                        Err(terminal(original))
                    } else {
                        Err(original)
                    };
                }
            }
        }
    }

    async fn issue(&self, pending: &PendingRequest) -> Result<Response, Error> {
        // The access token is read per dispatch, so a replay picks up the
        // token the refresh just stored.
        let mut request = self
            .http
            .request(pending.method.clone(), &pending.url)
            .bearer_auth(self.store.get(Kind::Access));

        if let Some(body) = &pending.body {
            request = request.json(body);
        }

        Ok(request.send().await?)
    }

    #[instrument(skip(self))]
    async fn refresh_access_token(&self) -> Result<String, Error> {
        let response = self
            .http
            .post(self.endpoint("/token/refresh"))
            .bearer_auth(self.store.get(Kind::Refresh))
            .send()
            .await?;

        let body = unwrap_envelope(response).await?;
        let pair: TokenPair = api::parse_data(body)?;

        Ok(pair.access_token)
    }
}

pub(crate) async fn unwrap_envelope(response: Response) -> Result<Value, Error> {
    if response.status().is_success() {
        Ok(response.json().await?)
    } else {
        Err(backend_error(response).await)
    }
}

/// Folds a non-success response into a `Backend` error, pulling the
/// service's message out of the envelope when there is one.
async fn backend_error(response: Response) -> Error {
    let status = response.status().as_u16();
    let body: Value = response.json().await.unwrap_or_default();
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    Error::Backend { status, message }
}

fn terminal(original: Error) -> Error {
    match original {
        Error::Backend { status, message } | Error::AuthTerminal { status, message } => {
            Error::AuthTerminal { status, message }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use serde_json::json;
    use std::net::TcpListener;
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn test_client(uri: &str, dir: &TempDir) -> Result<(ApiClient, Arc<CredentialStore>)> {
        let store = Arc::new(CredentialStore::open(dir.path().join("credentials.json")));
        let client = ApiClient::new(uri, Arc::clone(&store))?;
        Ok((client, store))
    }

    fn envelope(status: u16, message: &str, data: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(status).set_body_json(json!({
            "status": status,
            "message": message,
            "data": data,
        }))
    }

    #[test]
    fn origin_url_defaults_http_port() -> Result<()> {
        let url = origin_url("http://example.com")?;
        assert_eq!(url, "http://example.com:80");
        Ok(())
    }

    #[test]
    fn origin_url_defaults_https_port() -> Result<()> {
        let url = origin_url("https://example.com")?;
        assert_eq!(url, "https://example.com:443");
        Ok(())
    }

    #[test]
    fn origin_url_rejects_unsupported_scheme() -> Result<()> {
        let err = origin_url("ftp://example.com")
            .err()
            .ok_or_else(|| anyhow!("expected error"))?;
        assert!(err.to_string().contains("unsupported scheme"));
        Ok(())
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_request_replayed() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        let dir = TempDir::new()?;
        let (client, store) = test_client(&server.uri(), &dir)?;
        store.save_tokens("A1", "R1")?;

        Mock::given(method("GET"))
            .and(path("/images"))
            .and(header("authorization", "Bearer A1"))
            .respond_with(envelope(401, "token expired", json!(null)))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/token/refresh"))
            .and(header("authorization", "Bearer R1"))
            .respond_with(envelope(
                200,
                "ok",
                json!({"access_token": "A2", "refresh_token": "R1"}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/images"))
            .and(header("authorization", "Bearer A2"))
            .respond_with(envelope(
                200,
                "ok",
                json!([{"id": 1, "user_id": 7, "image": "https://img.tld/1.jpg"}]),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let images = client.images().await?;
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].image, "https://img.tld/1.jpg");
        assert_eq!(store.get(Kind::Access), "A2");
        assert_eq!(store.get(Kind::Refresh), "R1");
        Ok(())
    }

    #[tokio::test]
    async fn next_request_after_refresh_carries_new_token() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        let dir = TempDir::new()?;
        let (client, store) = test_client(&server.uri(), &dir)?;
        store.save_tokens("A1", "R1")?;

        Mock::given(method("GET"))
            .and(path("/images"))
            .and(header("authorization", "Bearer A1"))
            .respond_with(envelope(401, "token expired", json!(null)))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/token/refresh"))
            .respond_with(envelope(
                200,
                "ok",
                json!({"access_token": "A2", "refresh_token": "R1"}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/images"))
            .and(header("authorization", "Bearer A2"))
            .respond_with(envelope(200, "ok", json!([])))
            .mount(&server)
            .await;

        // Only matches when the fresh token is presented.
        Mock::given(method("POST"))
            .and(path("/token/check"))
            .and(header("authorization", "Bearer A2"))
            .respond_with(envelope(200, "ok", json!(null)))
            .expect(1)
            .mount(&server)
            .await;

        client.images().await?;
        client.token_check().await?;
        Ok(())
    }

    #[tokio::test]
    async fn second_unauthorized_is_terminal_after_a_single_refresh() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        let dir = TempDir::new()?;
        let (client, store) = test_client(&server.uri(), &dir)?;
        store.save_tokens("A1", "R1")?;

        Mock::given(method("GET"))
            .and(path("/images"))
            .respond_with(envelope(401, "token expired", json!(null)))
            .expect(2)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/token/refresh"))
            .respond_with(envelope(
                200,
                "ok",
                json!({"access_token": "A2", "refresh_token": "R1"}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let err = client
            .images()
            .await
            .err()
            .ok_or_else(|| anyhow!("expected error"))?;
        assert!(err.is_auth_terminal());
        assert_eq!(err.status(), Some(401));
        assert!(err.to_string().contains("token expired"));
        assert_eq!(store.get(Kind::Access), "");
        assert_eq!(store.get(Kind::Refresh), "");
        Ok(())
    }

    #[tokio::test]
    async fn rejected_refresh_token_ends_session_with_original_error() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        let dir = TempDir::new()?;
        let (client, store) = test_client(&server.uri(), &dir)?;
        store.save_tokens("A1", "R1")?;

        Mock::given(method("GET"))
            .and(path("/images"))
            .respond_with(envelope(401, "token expired", json!(null)))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/token/refresh"))
            .respond_with(envelope(401, "invalid refresh token", json!(null)))
            .expect(1)
            .mount(&server)
            .await;

        let err = client
            .images()
            .await
            .err()
            .ok_or_else(|| anyhow!("expected error"))?;
        assert!(err.is_auth_terminal());
        // The caller sees the original request's error, not the refresh one.
        assert!(err.to_string().contains("token expired"));
        assert_eq!(store.get(Kind::Access), "");
        assert_eq!(store.get(Kind::Refresh), "");
        Ok(())
    }

    #[tokio::test]
    async fn failed_refresh_clears_credentials_but_is_not_terminal() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        let dir = TempDir::new()?;
        let (client, store) = test_client(&server.uri(), &dir)?;
        store.save_tokens("A1", "R1")?;

        Mock::given(method("GET"))
            .and(path("/images"))
            .respond_with(envelope(401, "token expired", json!(null)))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/token/refresh"))
            .respond_with(envelope(500, "boom", json!(null)))
            .expect(1)
            .mount(&server)
            .await;

        let err = client
            .images()
            .await
            .err()
            .ok_or_else(|| anyhow!("expected error"))?;
        assert!(!err.is_auth_terminal());
        assert_eq!(err.status(), Some(401));
        assert!(err.to_string().contains("token expired"));
        assert_eq!(store.get(Kind::Access), "");
        Ok(())
    }

    #[tokio::test]
    async fn non_auth_failures_pass_through_without_refresh() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        let dir = TempDir::new()?;
        let (client, store) = test_client(&server.uri(), &dir)?;
        store.save_tokens("A1", "R1")?;

        Mock::given(method("GET"))
            .and(path("/images"))
            .respond_with(envelope(500, "database gone", json!(null)))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/token/refresh"))
            .respond_with(envelope(200, "ok", json!(null)))
            .expect(0)
            .mount(&server)
            .await;

        let err = client
            .images()
            .await
            .err()
            .ok_or_else(|| anyhow!("expected error"))?;
        assert_eq!(err.status(), Some(500));
        assert!(err.to_string().contains("database gone"));
        // Credentials survive non-auth failures.
        assert_eq!(store.get(Kind::Access), "A1");
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() -> Result<()> {
        let dir = TempDir::new()?;
        let (client, _store) = test_client("http://127.0.0.1:1", &dir)?;

        let err = client
            .images()
            .await
            .err()
            .ok_or_else(|| anyhow!("expected error"))?;
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(err.status(), None);
        Ok(())
    }
}
