use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a failed page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FetchErrorKind {
    Network,
    Timeout,
    Unauthorized,
    NotFound,
    RateLimited,
    Backend,
    Unknown,
}

impl FetchErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Unauthorized => "AUTH_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::RateLimited => "RATE_LIMITED",
            Self::Backend => "BACKEND_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Hint for callers deciding whether to offer "try again". The cache
    /// itself never retries.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::RateLimited | Self::Backend
        )
    }
}

/// The only failure the list cache recognizes: the injected source rejected.
///
/// Displays as the bare message so it can be shown as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct FetchError {
    kind: FetchErrorKind,
    message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Timeout, message)
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Backend, message)
    }

    #[must_use]
    pub const fn kind(&self) -> FetchErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<String> for FetchError {
    fn from(message: String) -> Self {
        Self::new(FetchErrorKind::Unknown, message)
    }
}

impl From<&str> for FetchError {
    fn from(message: &str) -> Self {
        Self::new(FetchErrorKind::Unknown, message)
    }
}
