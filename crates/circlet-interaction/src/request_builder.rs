//! Pure construction of authenticated request descriptors.
//!
//! Nothing here performs I/O. A [`RequestDescriptor`] is handed to an
//! [`HttpGateway`](crate::gateway::HttpGateway) for execution.

use circlet_core::{CircletError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Static client credential used only for the login exchange.
pub const BOOTSTRAP_BASIC_AUTH: &str = "Basic OWE5MDc4YTcxMjRkNjFkYjc1NGNjNzI4NjY2OTRkNWYwNDk2ODY2NDA6NjA2Nzk3MzkwODViYmMxZWY2ZjQyZjlmMDc3YjIwNTA=";

pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_DEVICE_ID: &str = "X-Device-ID";

/// Headers sent on every request. The remote service authorizes partly on
/// this fingerprint, so the values mimic its own web client.
pub const FIXED_HEADERS: [(&str, &str); 5] = [
    ("Content-Type", "application/json"),
    ("Accept", "application/json"),
    ("Cache-Control", "no-cache"),
    ("Origin", "https://app.life360.com"),
    ("Referer", "https://app.life360.com/"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = CircletError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(CircletError::precondition(format!(
                "unsupported HTTP method '{other}'"
            ))),
        }
    }
}

/// Every option a request can be built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    pub method: HttpMethod,
    /// Relative path against the API base, or an absolute `http(s)://` URL.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default = "default_use_auth")]
    pub use_bearer_auth: bool,
    /// Applied after the fixed headers, in order.
    #[serde(default)]
    pub extra_headers: Vec<(String, String)>,
}

fn default_use_auth() -> bool {
    true
}

impl RequestOptions {
    /// A bearer-authenticated request without body or extra headers.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            use_bearer_auth: true,
            extra_headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Uses the bootstrap basic credential instead of the bearer token.
    pub fn with_basic_auth(mut self) -> Self {
        self.use_bearer_auth = false;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }
}

/// Credential material read from the session at build time.
#[derive(Debug, Clone, Copy, Default)]
pub struct Credentials<'a> {
    pub access_token: Option<&'a str>,
    pub device_id: Option<&'a str>,
}

/// A fully resolved request, ready to be sent.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Serialized JSON body.
    pub body: Option<String>,
}

impl RequestDescriptor {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

// Authorization values never reach the logs.
impl std::fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(k, v)| {
                if k.eq_ignore_ascii_case(HEADER_AUTHORIZATION) {
                    (k.as_str(), "<redacted>")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect();
        f.debug_struct("RequestDescriptor")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &headers)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    match headers
        .iter_mut()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
    {
        Some(entry) => entry.1 = value.to_string(),
        None => headers.push((name.to_string(), value.to_string())),
    }
}

/// Joins a relative path onto the base with exactly one `/` between them.
/// Absolute URLs pass through unchanged.
pub fn resolve_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Builds request descriptors against one API origin.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: String,
    basic_auth: String,
}

impl RequestBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            basic_auth: BOOTSTRAP_BASIC_AUTH.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolves auth, headers, URL and body into a descriptor.
    ///
    /// Fails with `NoCredentials` when bearer auth is requested without a
    /// token; such a request never reaches the wire.
    pub fn build(
        &self,
        options: &RequestOptions,
        credentials: Credentials<'_>,
    ) -> Result<RequestDescriptor> {
        let authorization = if options.use_bearer_auth {
            let token = credentials
                .access_token
                .filter(|t| !t.is_empty())
                .ok_or(CircletError::NoCredentials)?;
            format!("Bearer {token}")
        } else {
            self.basic_auth.clone()
        };

        let mut headers: Vec<(String, String)> = FIXED_HEADERS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        if let Some(device_id) = credentials.device_id.filter(|d| !d.is_empty()) {
            set_header(&mut headers, HEADER_DEVICE_ID, device_id);
        }

        for (name, value) in &options.extra_headers {
            if name.eq_ignore_ascii_case(HEADER_AUTHORIZATION) {
                continue;
            }
            set_header(&mut headers, name, value);
        }

        set_header(&mut headers, HEADER_AUTHORIZATION, &authorization);

        let body = options
            .body
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        Ok(RequestDescriptor {
            method: options.method,
            url: resolve_url(&self.base_url, &options.path),
            headers,
            body,
        })
    }
}
