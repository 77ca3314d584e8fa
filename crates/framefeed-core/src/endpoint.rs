//! Stream endpoint addresses.
//!
//! Endpoint format: `scheme://authority/path`
//!
//! Accepted schemes:
//! - `ws://` and `wss://` - used as-is
//! - `http://` and `https://` - rewritten to `ws://` and `wss://`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A WebSocket endpoint serving encoded frames.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint {
    secure: bool,
    authority: String,
    path: String,
}

impl Endpoint {
    /// Create a plain `ws://` endpoint.
    pub fn ws(authority: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(false, authority, path)
    }

    /// Create a TLS `wss://` endpoint.
    pub fn wss(authority: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(true, authority, path)
    }

    fn new(secure: bool, authority: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        Self {
            secure,
            authority: authority.into(),
            path,
        }
    }

    /// The `host[:port]` part.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// The request path, always starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the endpoint uses TLS.
    pub fn is_secure(&self) -> bool {
        self.secure
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.secure { "wss" } else { "ws" };
        write!(f, "{}://{}{}", scheme, self.authority, self.path)
    }
}

impl FromStr for Endpoint {
    type Err = EndpointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| EndpointParseError::UnsupportedScheme(s.to_string()))?;

        let secure = match scheme.to_ascii_lowercase().as_str() {
            "ws" | "http" => false,
            "wss" | "https" => true,
            _ => return Err(EndpointParseError::UnsupportedScheme(s.to_string())),
        };

        let (authority, path) = match rest.find(['/', '?']) {
            Some(i) => rest.split_at(i),
            None => (rest, "/"),
        };

        if authority.is_empty() {
            return Err(EndpointParseError::EmptyHost);
        }

        Ok(Self::new(secure, authority, path))
    }
}

impl TryFrom<String> for Endpoint {
    type Error = EndpointParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.to_string()
    }
}

/// Error parsing an endpoint string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointParseError {
    #[error("endpoint must use ws://, wss://, http:// or https://, got: {0}")]
    UnsupportedScheme(String),
    #[error("endpoint host cannot be empty")]
    EmptyHost,
}
