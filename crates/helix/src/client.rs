use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::{debug, trace};
use url::Url;

use crate::error::HelixError;
use crate::models::{ErrorResponse, RateLimit, StreamsParams, StreamsResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.twitch.tv/helix/";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Client for the subset of the Helix API needed to poll stream status.
///
/// Cloning is cheap; clones share the HTTP connection pool and the
/// last observed rate-limit state.
#[derive(Debug, Clone)]
pub struct HelixClient {
    client: Client,
    base_url: Url,
    client_id: String,
    access_token: String,
    last_rate_limit: Arc<Mutex<Option<RateLimit>>>,
}

impl HelixClient {
    /// Create a client from an application client ID and a user access token.
    ///
    /// Only the client ID is validated here; a bad token surfaces as a 401
    /// on the first request.
    pub fn new(
        client_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, HelixError> {
        let client_id = client_id.into();
        if client_id.trim().is_empty() {
            return Err(HelixError::Config(
                "a client ID was not provided but is required".to_string(),
            ));
        }

        install_rustls_provider();
        let client = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: Url::parse(DEFAULT_BASE_URL)?,
            client_id,
            access_token: access_token.into(),
            last_rate_limit: Arc::new(Mutex::new(None)),
        })
    }

    /// Point the client at a different API root (e.g. the Twitch CLI mock server).
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, HelixError> {
        let mut url = Url::parse(base_url)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        self.base_url = url;
        Ok(self)
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Rate-limit state from the most recent response, if any was received.
    pub fn last_rate_limit(&self) -> Option<RateLimit> {
        *self.last_rate_limit.lock()
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&self.client_id) {
            headers.insert("client-id", value);
        }
        if !self.access_token.is_empty() {
            let bearer = format!("Bearer {}", self.access_token.trim_start_matches("oauth:"));
            if let Ok(value) = HeaderValue::from_str(&bearer) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        headers
    }

    /// `GET /streams`. Returns only streams that are currently broadcasting.
    pub async fn get_streams(&self, params: &StreamsParams) -> Result<StreamsResponse, HelixError> {
        let url = self.base_url.join("streams")?;
        debug!(
            user_ids = params.user_ids.len(),
            stream_type = params.stream_type.as_str(),
            "requesting helix streams"
        );

        let response = self
            .client
            .get(url)
            .headers(self.headers())
            .query(&params.to_query())
            .send()
            .await?;

        if let Some(limit) = RateLimit::from_headers(response.headers()) {
            trace!(
                remaining = limit.remaining,
                reset = limit.reset,
                "helix rate limit"
            );
            *self.last_rate_limit.lock() = Some(limit);
        }

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(err) if !err.message.is_empty() => err.message,
                Ok(err) if !err.error.is_empty() => err.error,
                _ => status.canonical_reason().unwrap_or("unknown error").to_string(),
            };
            return Err(HelixError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answers one request with a canned response and yields the raw request.
    async fn serve_once(
        status: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/helix", listener.local_addr().unwrap());

        let mut response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n",
            body.len()
        );
        for (name, value) in headers {
            response.push_str(&format!("{name}: {value}\r\n"));
        }
        response.push_str("\r\n");
        response.push_str(body);

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request: Vec<u8> = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&request).into_owned()
        });

        (base_url, handle)
    }

    fn local_client(base_url: &str, token: &str) -> HelixClient {
        let client = HelixClient::new("abc", token)
            .unwrap()
            .with_base_url(base_url)
            .unwrap();
        // Keep test traffic off any proxy configured in the environment.
        HelixClient {
            client: Client::builder().no_proxy().build().unwrap(),
            ..client
        }
    }

    fn rate_limit_headers(remaining: &'static str) -> [(&'static str, &'static str); 3] {
        [
            ("ratelimit-limit", "800"),
            ("ratelimit-remaining", remaining),
            ("ratelimit-reset", "1617224280"),
        ]
    }

    #[tokio::test]
    async fn test_get_streams_request_and_response() {
        let body = r#"{
            "data": [{
                "id": "40952121085",
                "user_id": "71092938",
                "user_login": "xqc",
                "user_name": "xQc",
                "type": "live",
                "started_at": "2021-03-31T20:57:26Z"
            }],
            "pagination": {}
        }"#;
        let (base_url, server) = serve_once("200 OK", &rate_limit_headers("799"), body).await;
        let client = local_client(&base_url, "oauth:xyz");

        let params = StreamsParams::live_for(vec!["71092938".to_string(), "12345".to_string()]);
        let response = client.get_streams(&params).await.unwrap();

        assert_eq!(response.data.len(), 1);
        assert_eq!(response.data[0].user_name, "xQc");
        assert_eq!(
            client.last_rate_limit(),
            Some(RateLimit {
                limit: 800,
                remaining: 799,
                reset: 1617224280,
            })
        );

        let request = server.await.unwrap().to_lowercase();
        let request_line = request.lines().next().unwrap();
        assert!(request_line.starts_with("get /helix/streams?"));
        assert!(request_line.contains("first=100"));
        assert!(request_line.contains("type=live"));
        assert!(request_line.contains("user_id=71092938&user_id=12345"));
        assert!(request.contains("\r\nclient-id: abc\r\n"));
        assert!(request.contains("\r\nauthorization: bearer xyz\r\n"));
    }

    #[tokio::test]
    async fn test_get_streams_unauthorized_records_rate_limit() {
        let body = r#"{"error":"Unauthorized","status":401,"message":"Invalid OAuth token"}"#;
        let (base_url, server) =
            serve_once("401 Unauthorized", &rate_limit_headers("0"), body).await;
        let client = local_client(&base_url, "bad-token");

        let err = client
            .get_streams(&StreamsParams::live_for(vec!["1".to_string()]))
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert!(matches!(
            &err,
            HelixError::Api { status: 401, message } if message == "Invalid OAuth token"
        ));
        let limit = client.last_rate_limit().unwrap();
        assert!(limit.is_exhausted());
        assert_eq!(limit.reset, 1617224280);

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_get_streams_error_without_json_body() {
        let (base_url, server) = serve_once("500 Internal Server Error", &[], "oops").await;
        let client = local_client(&base_url, "token");

        let err = client
            .get_streams(&StreamsParams::live_for(vec!["1".to_string()]))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert!(matches!(
            &err,
            HelixError::Api { message, .. } if message == "Internal Server Error"
        ));
        assert!(client.last_rate_limit().is_none());

        server.await.unwrap();
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn test_new_requires_client_id(#[case] client_id: &str) {
        let err = HelixClient::new(client_id, "token").unwrap_err();
        assert!(matches!(err, HelixError::Config(_)));
    }

    #[test]
    fn test_new_does_not_validate_token() {
        let client = HelixClient::new("client-id", "").unwrap();
        assert_eq!(client.client_id(), "client-id");
        assert!(client.last_rate_limit().is_none());
        assert!(client.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_headers() {
        let client = HelixClient::new("abc", "oauth:xyz").unwrap();
        let headers = client.headers();
        assert_eq!(headers.get("client-id").unwrap(), "abc");
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer xyz");
    }

    #[test]
    fn test_with_base_url_appends_slash() {
        let client = HelixClient::new("abc", "xyz")
            .unwrap()
            .with_base_url("http://localhost:8080/mock")
            .unwrap();
        assert_eq!(
            client.base_url().join("streams").unwrap().as_str(),
            "http://localhost:8080/mock/streams"
        );
    }

    #[test]
    fn test_with_invalid_base_url() {
        let result = HelixClient::new("abc", "xyz").unwrap().with_base_url("not a url");
        assert!(matches!(result, Err(HelixError::InvalidUrl(_))));
    }
}
