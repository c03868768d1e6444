use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart::Form;
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://api.metafold3d.com";

const USER_AGENT: &str = concat!("metafold-rs/", env!("CARGO_PKG_VERSION"));

/// Total timeout for API calls other than multipart uploads.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Authenticated HTTP session against the Metafold API.
///
/// Every request carries the bearer token and `Accept: application/json`;
/// paths are resolved against the base URL. Cloning is cheap and clones share
/// the same connection pool.
///
/// JSON calls are bounded by the request timeout. Multipart uploads and
/// signed-link downloads only get the connect timeout, since their duration
/// grows with the file size.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    // Signed links carry their own credentials, so they are fetched without
    // the bearer header.
    links: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl Client {
    pub fn new(access_token: &str) -> Result<Self, ApiError> {
        Self::with_base_url(access_token, DEFAULT_BASE_URL)
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(access_token: &str, base_url: &str) -> Result<Self, ApiError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {access_token}"))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        let links = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            links,
            base_url: Url::parse(base_url)?,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Override the total timeout of JSON calls.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve a path or absolute URL against the base URL.
    pub fn resolve(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Response, ApiError> {
        let request = self.request(Method::GET, path)?.query(query);
        Self::send(request).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response, ApiError> {
        Self::send(self.request(Method::POST, path)?.json(body)).await
    }

    pub async fn post_multipart(&self, path: &str, form: Form) -> Result<Response, ApiError> {
        Self::send(self.upload(Method::POST, path)?.multipart(form)).await
    }

    pub async fn patch_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response, ApiError> {
        Self::send(self.request(Method::PATCH, path)?.json(body)).await
    }

    pub async fn patch_multipart(&self, path: &str, form: Form) -> Result<Response, ApiError> {
        Self::send(self.upload(Method::PATCH, path)?.multipart(form)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Response, ApiError> {
        Self::send(self.request(Method::DELETE, path)?).await
    }

    /// GET a signed link (e.g. an asset download URL) without API credentials.
    pub async fn fetch_link(&self, link: &str) -> Result<Response, ApiError> {
        let url = self.resolve(link)?;
        Self::send(self.links.get(url)).await
    }

    /// Decode a successful response body.
    pub async fn json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        Ok(self.upload(method, path)?.timeout(self.timeout))
    }

    fn upload(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.resolve(path)?;
        Ok(self.http.request(method, url))
    }

    async fn send(request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "API response");

        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(ApiError::from_body(status, &body));
        }
        Ok(response)
    }
}

/// Query pairs for list endpoints, omitting absent parameters. Values are
/// passed through verbatim.
pub fn list_query<'q>(sort: Option<&'q str>, q: Option<&'q str>) -> Vec<(&'static str, &'q str)> {
    [("sort", sort), ("q", q)]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect()
}
