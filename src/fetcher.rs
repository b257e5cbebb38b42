//! Kubelet stats endpoint client.
//!
//! One [`Fetcher::fetch`] call performs exactly one authenticated GET against
//! `/stats/summary`. The bearer token is re-read from disk on every call so a
//! rotated service account token is picked up without a restart. The kubelet's
//! serving certificate is not verified; the node is trusted by network
//! placement.

use reqwest::blocking::Client;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Default kubelet read-only-with-auth port.
pub const DEFAULT_KUBELET_PORT: u16 = 10250;

/// Path of the stats summary endpoint on the kubelet.
pub const SUMMARY_PATH: &str = "/stats/summary";

/// Failure classes reported through the error counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    Request,
    Status,
    ReadBody,
    ParseBody,
}

impl FailureClass {
    pub const ALL: [FailureClass; 4] = [
        FailureClass::Request,
        FailureClass::Status,
        FailureClass::ReadBody,
        FailureClass::ParseBody,
    ];

    /// Value of the `type` label on the error counter.
    pub fn as_label(&self) -> &'static str {
        match self {
            FailureClass::Request => "request error",
            FailureClass::Status => "status error",
            FailureClass::ReadBody => "read body error",
            FailureClass::ParseBody => "parse body error",
        }
    }
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Errors from a single fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build request: {0}")]
    BuildRequest(#[source] reqwest::Error),

    #[error("token from {path} is not a valid header value")]
    InvalidToken { path: PathBuf },

    #[error("unable to load token from {path}: {source}")]
    Token {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("request to stats/summary failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected status for stats/summary: {0}")]
    Status(StatusCode),

    #[error("failed to read stats/summary body: {0}")]
    Body(#[source] reqwest::Error),
}

impl FetchError {
    /// Failure class for the error counter. Request construction problems and
    /// token failures are not counted.
    pub fn class(&self) -> Option<FailureClass> {
        match self {
            FetchError::Transport(_) => Some(FailureClass::Request),
            FetchError::Status(_) => Some(FailureClass::Status),
            FetchError::Body(_) => Some(FailureClass::ReadBody),
            FetchError::BuildRequest(_)
            | FetchError::InvalidToken { .. }
            | FetchError::Token { .. } => None,
        }
    }

    /// A token that cannot be read leaves the exporter without an identity.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::Token { .. })
    }
}

/// Source of raw stats summary bodies.
pub trait SummarySource: Send + Sync {
    fn fetch(&self) -> Result<Vec<u8>, FetchError>;
}

/// Blocking HTTPS client for the kubelet stats summary endpoint.
pub struct Fetcher {
    client: Client,
    url: String,
    token_path: PathBuf,
}

impl Fetcher {
    /// Creates a fetcher for an explicit endpoint URL.
    pub fn new(
        url: impl Into<String>,
        token_path: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(FetchError::BuildRequest)?;

        Ok(Self {
            client,
            url: url.into(),
            token_path: token_path.into(),
        })
    }

    /// Creates a fetcher for `https://<address>:<port>/stats/summary`.
    pub fn for_node(
        address: &str,
        port: u16,
        token_path: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        Self::new(summary_url(address, port), token_path, timeout)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    fn bearer(&self) -> Result<HeaderValue, FetchError> {
        let raw = fs::read(&self.token_path).map_err(|source| FetchError::Token {
            path: self.token_path.clone(),
            source,
        })?;

        // Unreadable file is fatal, unusable content only fails this pull.
        let invalid = || FetchError::InvalidToken {
            path: self.token_path.clone(),
        };
        let token = std::str::from_utf8(&raw).map_err(|_| invalid())?;
        let mut value =
            HeaderValue::from_str(&format!("Bearer {}", token.trim())).map_err(|_| invalid())?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl SummarySource for Fetcher {
    fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        let mut request = self
            .client
            .get(&self.url)
            .build()
            .map_err(FetchError::BuildRequest)?;

        let bearer = self.bearer()?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        debug!("Fetching {}", self.url);
        let response = self.client.execute(request).map_err(FetchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.bytes().map_err(FetchError::Body)?;
        debug!("Fetched {} bytes from {}", body.len(), self.url);
        Ok(body.to_vec())
    }
}

/// Builds the stats summary URL for a node address. IPv6 literals are bracketed.
pub fn summary_url(address: &str, port: u16) -> String {
    if address.contains(':') && !address.starts_with('[') {
        format!("https://[{}]:{}{}", address, port, SUMMARY_PATH)
    } else {
        format!("https://{}:{}{}", address, port, SUMMARY_PATH)
    }
}
