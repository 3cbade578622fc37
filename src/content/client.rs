//! Generic cached content client
//!
//! Every provider is one `ContentClient` configured by a `ProviderSpec`
//! (base URL and auth scheme). A provider operation describes its request as
//! a `Call` carrying the endpoint's TTL and hands a normalizer to
//! [`ContentClient::fetch`], which runs the cache-then-fetch sequence:
//!
//! lookup → hit: return cached projection
//!        → miss: one HTTP request → decode wire type → normalize → cache write → return

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{CacheManager, CacheStats};

pub const HOUR: Duration = Duration::from_secs(60 * 60);
pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);
pub const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const MONTH: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Errors that can occur while fetching content
///
/// These never leave a provider's public operations; they are logged and
/// collapsed into an empty result there.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ContentError {
    /// Connection, DNS or TLS failure
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// No response within the configured timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Non-2xx status other than 404
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// The provider answered but had nothing matching
    #[error("no content found")]
    NotFound,

    /// Response body did not have the expected shape
    #[error("failed to parse API response: {0}")]
    Parse(String),

    /// Operation needs credentials the provider was not given
    #[error("no API credentials configured")]
    MissingCredentials,
}

impl From<serde_json::Error> for ContentError {
    fn from(error: serde_json::Error) -> Self {
        ContentError::Parse(error.to_string())
    }
}

/// How a provider authenticates requests
#[derive(Clone, PartialEq, Eq)]
pub enum AuthScheme {
    /// Anonymous access
    None,
    /// API key sent as a query parameter (e.g. `api_key=...`)
    QueryKey { param: &'static str, key: String },
    /// API key sent as request headers
    Headers(Vec<(&'static str, String)>),
}

// Keys stay out of logs.
impl fmt::Debug for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthScheme::None => write!(f, "None"),
            AuthScheme::QueryKey { param, .. } => write!(f, "QueryKey({param}=***)"),
            AuthScheme::Headers(headers) => {
                let names: Vec<_> = headers.iter().map(|(name, _)| *name).collect();
                write!(f, "Headers({names:?})")
            }
        }
    }
}

/// Static description of one external API
#[derive(Debug, Clone)]
pub struct ProviderSpec {
    /// Short identifier, also the cache subdirectory name
    pub id: &'static str,
    /// Base URL that operation paths are appended to
    pub base_url: String,
    pub auth: AuthScheme,
}

/// A named endpoint and how long its responses stay fresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub name: &'static str,
    pub ttl: Duration,
}

impl Endpoint {
    pub const fn new(name: &'static str, ttl: Duration) -> Self {
        Self { name, ttl }
    }
}

/// A fully built outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    /// Returns the value of a query parameter, if present
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// One provider operation's request description
#[derive(Debug, Clone)]
pub struct Call<'a> {
    endpoint: &'a Endpoint,
    path: String,
    segments: Vec<String>,
    params: Vec<(&'static str, String)>,
    key_parts: Vec<(&'static str, String)>,
    singleton: Option<&'static str>,
}

impl<'a> Call<'a> {
    pub fn new(endpoint: &'a Endpoint, path: impl Into<String>) -> Self {
        Self {
            endpoint,
            path: path.into(),
            segments: Vec::new(),
            params: Vec::new(),
            key_parts: Vec::new(),
            singleton: None,
        }
    }

    /// Appends a caller-supplied path segment
    ///
    /// The segment is percent-encoded when the URL is built, so `?`, `#` and
    /// `/` stay part of the segment.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Adds a query parameter; it also feeds the cache key
    pub fn param(mut self, name: &'static str, value: impl ToString) -> Self {
        self.params.push((name, value.to_string()));
        self
    }

    /// Adds a query parameter only when `value` is present
    pub fn param_opt<V: ToString>(self, name: &'static str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    /// Distinguishes cache entries without being sent to the provider
    pub fn key_part(mut self, name: &'static str, value: impl ToString) -> Self {
        self.key_parts.push((name, value.to_string()));
        self
    }

    /// Stores the result under a fixed file name instead of a hashed key
    pub fn singleton(mut self, name: &'static str) -> Self {
        self.singleton = Some(name);
        self
    }

    pub fn ttl(&self) -> Duration {
        self.endpoint.ttl
    }

    /// Deterministic cache key for this call
    ///
    /// `<endpoint>_<hash>` where the hash covers the path, its segments and
    /// every parameter sorted by name. Credentials are added later and never contribute.
    pub fn cache_key(&self) -> String {
        if let Some(name) = self.singleton {
            return name.to_string();
        }

        let mut parts: Vec<(&str, &str)> = self
            .params
            .iter()
            .chain(self.key_parts.iter())
            .map(|(k, v)| (*k, v.as_str()))
            .collect();
        parts.sort();

        let mut hasher = Sha256::new();
        hasher.update(self.endpoint.name.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.path.as_bytes());
        for segment in &self.segments {
            hasher.update(b"\0");
            hasher.update(segment.as_bytes());
        }
        for (k, v) in parts {
            hasher.update(b"\n");
            hasher.update(k.as_bytes());
            hasher.update(b"=");
            hasher.update(v.as_bytes());
        }
        let digest = hasher.finalize();
        format!("{}_{}", self.endpoint.name, hex::encode(&digest[..12]))
    }
}

/// Sends a request and returns the decoded JSON body
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, request: &ApiRequest) -> Result<Value, ContentError>;
}

/// reqwest-backed transport with a per-request timeout
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, ContentError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ContentError::Transport(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    fn map_error(&self, error: reqwest::Error) -> ContentError {
        if error.is_timeout() {
            ContentError::Timeout(self.timeout)
        } else if error.is_decode() {
            ContentError::Parse(error.to_string())
        } else {
            ContentError::Transport(error.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, request: &ApiRequest) -> Result<Value, ContentError> {
        let mut builder = self.client.get(&request.url).query(&request.query);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ContentError::NotFound);
        }
        if !status.is_success() {
            return Err(ContentError::Status(status.as_u16()));
        }

        response.json::<Value>().await.map_err(|e| self.map_error(e))
    }
}

/// Cached client for one provider
#[derive(Clone)]
pub struct ContentClient {
    spec: Arc<ProviderSpec>,
    transport: Arc<dyn Transport>,
    cache: CacheManager,
}

impl fmt::Debug for ContentClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentClient")
            .field("spec", &self.spec)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl ContentClient {
    pub fn new(spec: ProviderSpec, transport: Arc<dyn Transport>, cache: CacheManager) -> Self {
        Self {
            spec: Arc::new(spec),
            transport,
            cache,
        }
    }

    pub fn id(&self) -> &'static str {
        self.spec.id
    }

    pub fn spec(&self) -> &ProviderSpec {
        &self.spec
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn has_credentials(&self) -> bool {
        !matches!(self.spec.auth, AuthScheme::None)
    }

    /// Builds the outbound request for a call, adding credentials
    pub fn build_request(&self, call: &Call<'_>) -> Result<ApiRequest, ContentError> {
        let mut query: Vec<(String, String)> = call
            .params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let mut headers = Vec::new();

        match &self.spec.auth {
            AuthScheme::None => {}
            AuthScheme::QueryKey { param, key } => query.push((param.to_string(), key.clone())),
            AuthScheme::Headers(pairs) => {
                headers.extend(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())));
            }
        }

        Ok(ApiRequest {
            url: self.url_for(call)?.into(),
            query,
            headers,
        })
    }

    fn url_for(&self, call: &Call<'_>) -> Result<Url, ContentError> {
        let invalid = |reason: String| {
            ContentError::Transport(format!("invalid base URL {}: {}", self.spec.base_url, reason))
        };
        let mut url = Url::parse(&self.spec.base_url).map_err(|e| invalid(e.to_string()))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| invalid("cannot hold a path".to_string()))?;
            path.pop_if_empty()
                .extend(call.path.split('/').filter(|part| !part.is_empty()))
                .extend(&call.segments);
        }
        Ok(url)
    }

    /// Returns the cached projection for `call`, fetching and caching it on a miss
    ///
    /// The body is decoded into the provider's wire type `W` and handed to
    /// `normalize`. The normalized value is what gets cached, so a hit returns
    /// exactly what the first fetch returned. A body that does not decode, or
    /// a failing normalizer, leaves the cache untouched.
    pub async fn fetch<W, T, F>(&self, call: Call<'_>, normalize: F) -> Result<T, ContentError>
    where
        W: DeserializeOwned,
        T: Serialize + DeserializeOwned,
        F: FnOnce(W) -> Result<T, ContentError>,
    {
        let key = call.cache_key();
        if let Some(cached) = self.cache.read::<T>(&key, call.ttl()) {
            debug!(provider = self.spec.id, key = %key, age_secs = cached.age.as_secs(), "cache hit");
            return Ok(cached.data);
        }

        debug!(provider = self.spec.id, key = %key, "cache miss, fetching");
        let request = self.build_request(&call)?;
        let raw = self.transport.get_json(&request).await?;
        let data = normalize(serde_json::from_value::<W>(raw)?)?;

        if let Err(e) = self.cache.write(&key, &data) {
            warn!(provider = self.spec.id, key = %key, error = %e, "failed to write cache entry");
        }
        Ok(data)
    }

    /// Collapses an internal result into the value handed to callers
    ///
    /// "Nothing found" and "provider unreachable" look the same from the
    /// outside; they are told apart only in the log.
    pub fn settle<T>(&self, operation: &str, result: Result<T, ContentError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(ContentError::NotFound) => {
                debug!(provider = self.spec.id, operation, "no content found");
                None
            }
            Err(error) => {
                warn!(provider = self.spec.id, operation, %error, "content fetch failed, returning empty");
                None
            }
        }
    }

    pub fn clear_cache(&self) -> std::io::Result<usize> {
        let removed = self.cache.clear()?;
        info!(provider = self.spec.id, removed, "cache cleared");
        Ok(removed)
    }

    pub fn cache_stats(&self) -> std::io::Result<CacheStats> {
        self.cache.stats()
    }
}
