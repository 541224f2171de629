//! Provider call results shared by the research and prediction ports.

use thiserror::Error;

/// Errors a research or prediction provider can report
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout")]
    Timeout,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Short tag recorded as the cause of a tolerated failure
    pub fn cause_name(&self) -> &'static str {
        match self {
            ProviderError::RequestFailed(_) => "RequestFailed",
            ProviderError::Timeout => "ProviderTimeout",
            ProviderError::InvalidResponse(_) => "InvalidResponse",
            ProviderError::Unsupported(_) => "Unsupported",
            ProviderError::Other(_) => "ProviderError",
        }
    }
}

/// A provider response together with the tokens it actually consumed.
///
/// `tokens_used` is `None` when the provider does not report usage; the
/// quota gate then settles the call at its estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct Metered<T> {
    pub value: T,
    pub tokens_used: Option<u64>,
}

impl<T> Metered<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            tokens_used: None,
        }
    }

    pub fn with_usage(mut self, tokens_used: u64) -> Self {
        self.tokens_used = Some(tokens_used);
        self
    }
}

impl<T> From<T> for Metered<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}
