//! HTTP plumbing for the Lynx REST API
//!
//! Builds URLs, attaches credentials, encodes JSON bodies and maps error
//! statuses to [`LynxError::Api`].

use crate::auth::Auth;
use crate::error::{status_text, ApiErrorBody, LynxError, LynxResult};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Content type sent with JSON bodies
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// HTTP client for the Lynx API
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    auth: Auth,
}

impl HttpClient {
    /// Create a new HTTP client
    ///
    /// `h2c://` bases talk cleartext HTTP/2 and `h2://` bases HTTP/2 over
    /// TLS, both with prior knowledge.
    pub fn new(base_url: &str, timeout: Duration, auth: Auth) -> LynxResult<Self> {
        let (base_url, http2) = resolve_base_url(base_url)?;

        let mut builder = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(format!("lynx-client/{}", env!("CARGO_PKG_VERSION")))
            .gzip(true);
        if http2 {
            builder = builder.http2_prior_knowledge();
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
            auth,
        })
    }

    /// Wrap an existing reqwest client
    pub fn with_client(client: Client, base_url: &str, auth: Auth) -> LynxResult<Self> {
        let (base_url, _) = resolve_base_url(base_url)?;
        Ok(Self {
            client,
            base_url,
            auth,
        })
    }

    /// API base without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Start an authenticated request
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!("{} {}", method, path);
        self.auth.apply(self.client.request(method, self.url(path)))
    }

    /// Start an authenticated request with a JSON body
    pub fn request_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> RequestBuilder {
        self.request(method, path)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .json(body)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> LynxResult<T> {
        self.execute(self.request(Method::GET, path)).await
    }

    pub async fn get_query<T, Q>(&self, path: &str, query: &Q) -> LynxResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let request = self.request(Method::GET, path).query(query);
        self.execute(request).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> LynxResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.request_json(Method::POST, path, body);
        self.execute(request).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> LynxResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.request_json(Method::PUT, path, body);
        self.execute(request).await
    }

    pub async fn delete(&self, path: &str) -> LynxResult<()> {
        let request = self.request(Method::DELETE, path);
        self.execute_empty(request).await
    }

    /// Send a request and decode the JSON response
    pub async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> LynxResult<T> {
        let response = self.send(request).await?;
        Ok(response.json::<T>().await?)
    }

    /// Send a request and ignore the response body
    pub async fn execute_empty(&self, request: RequestBuilder) -> LynxResult<()> {
        self.send(request).await?;
        Ok(())
    }

    /// Send a request and return the raw response body
    pub async fn execute_bytes(&self, request: RequestBuilder) -> LynxResult<Vec<u8>> {
        let response = self.send(request).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn send(&self, request: RequestBuilder) -> LynxResult<Response> {
        let response = request.send().await?;
        check_status(response).await
    }
}

/// Pass successful responses through, turn the rest into API errors
async fn check_status(response: Response) -> LynxResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let code = status.as_u16();
    let message = if status == StatusCode::URI_TOO_LONG {
        // Proxies answer 414 with HTML, not the API error body
        status_text(code).to_string()
    } else {
        parse_error(response)
            .await
            .map(|body| body.message)
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| status_text(code).to_string())
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            warn!("Authentication failed: {}", message);
        }
        _ if status.is_server_error() => {
            error!("Server error {}: {}", status, message);
        }
        _ => {
            debug!("Request failed {}: {}", status, message);
        }
    }

    Err(LynxError::api(code, message))
}

async fn parse_error(response: Response) -> Option<ApiErrorBody> {
    let body = response.text().await.ok()?;
    serde_json::from_str(&body).ok()
}

/// Normalize the API base, returning it and whether HTTP/2 is forced
fn resolve_base_url(base_url: &str) -> LynxResult<(String, bool)> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let (resolved, http2) = if let Some(rest) = trimmed.strip_prefix("h2c://") {
        (format!("http://{rest}"), true)
    } else if let Some(rest) = trimmed.strip_prefix("h2://") {
        (format!("https://{rest}"), true)
    } else {
        (trimmed.to_string(), false)
    };
    url::Url::parse(&resolved)?;
    Ok((resolved, http2))
}
