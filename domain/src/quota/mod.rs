//! Provider quota configuration
//!
//! A model identity declares four numbers to the quota gate: how many
//! requests fit in a request window, how many tokens fit in a token window,
//! the lengths of those windows, and how long a caller may wait for
//! admission.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Characters per token assumed by [`estimate_tokens`].
pub const CHARS_PER_TOKEN: usize = 4;

/// Completion allowance added by [`estimate_tokens`] on top of the prompt.
pub const COMPLETION_TOKEN_ALLOWANCE: u64 = 1_000;

/// Static per-model quota (Value Object)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Maximum admitted requests per request window
    pub requests_per_period: u64,
    /// Length of the request window
    #[serde(with = "duration_secs")]
    pub request_period: Duration,
    /// Maximum tokens per token window
    pub tokens_per_period: u64,
    /// Length of the token window
    #[serde(with = "duration_secs")]
    pub token_period: Duration,
    /// How long a caller may wait for admission
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

impl Default for QuotaConfig {
    /// Conservative fallback for models that publish no quota
    fn default() -> Self {
        Self {
            requests_per_period: 60,
            request_period: Duration::from_secs(60),
            tokens_per_period: 200_000,
            token_period: Duration::from_secs(60),
            timeout: Duration::from_secs(60),
        }
    }
}

impl QuotaConfig {
    /// Same window length for requests and tokens
    pub fn new(
        requests_per_period: u64,
        tokens_per_period: u64,
        period: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            requests_per_period,
            request_period: period,
            tokens_per_period,
            token_period: period,
            timeout,
        }
    }

    /// Validate and return the quota
    pub fn try_new(
        requests_per_period: u64,
        request_period: Duration,
        tokens_per_period: u64,
        token_period: Duration,
        timeout: Duration,
    ) -> Result<Self, Vec<DomainError>> {
        let quota = Self {
            requests_per_period,
            request_period,
            tokens_per_period,
            token_period,
            timeout,
        };
        quota.validate().map(|_| quota)
    }

    /// Every limit and duration must be positive
    pub fn validate(&self) -> Result<(), Vec<DomainError>> {
        let mut errors = Vec::new();
        if self.requests_per_period == 0 {
            errors.push(DomainError::InvalidQuota(
                "requests_per_period must be > 0".to_string(),
            ));
        }
        if self.tokens_per_period == 0 {
            errors.push(DomainError::InvalidQuota(
                "tokens_per_period must be > 0".to_string(),
            ));
        }
        if self.request_period.is_zero() {
            errors.push(DomainError::InvalidQuota(
                "request_period must be > 0".to_string(),
            ));
        }
        if self.token_period.is_zero() {
            errors.push(DomainError::InvalidQuota(
                "token_period must be > 0".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            errors.push(DomainError::InvalidQuota("timeout must be > 0".to_string()));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Rough token estimate for a prompt: prompt length plus a completion allowance.
pub fn estimate_tokens(prompt: &str) -> u64 {
    let prompt_tokens = prompt.chars().count().div_ceil(CHARS_PER_TOKEN) as u64;
    prompt_tokens + COMPLETION_TOKEN_ALLOWANCE
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
