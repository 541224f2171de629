//! Model value object representing a provider model identity

use crate::quota::QuotaConfig;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

/// Model identities known to the bot (Value Object)
///
/// Every provider call is scoped to one model identity, and each identity
/// owns its own quota window. Unknown identifiers are kept as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Model {
    // OpenAI models
    O3Mini,
    Gpt4o,
    Gpt4oMini,
    // Anthropic models
    Claude35Sonnet,
    // Research models
    PerplexitySonarPro,
    // Custom
    Custom(String),
}

impl Model {
    /// Get the string identifier for this model
    pub fn as_str(&self) -> &str {
        match self {
            Model::O3Mini => "o3-mini",
            Model::Gpt4o => "gpt-4o",
            Model::Gpt4oMini => "gpt-4o-mini",
            Model::Claude35Sonnet => "claude-3-5-sonnet-latest",
            Model::PerplexitySonarPro => "perplexity/sonar-pro",
            Model::Custom(s) => s,
        }
    }

    /// All built-in model identities
    pub fn known_models() -> Vec<Model> {
        vec![
            Model::O3Mini,
            Model::Gpt4o,
            Model::Gpt4oMini,
            Model::Claude35Sonnet,
            Model::PerplexitySonarPro,
        ]
    }

    /// Quota the provider publishes for this model, if it is a built-in one.
    ///
    /// Limits mirror the account dashboard values at the time they were
    /// recorded; override them in config when an account tier differs.
    pub fn builtin_quota(&self) -> Option<QuotaConfig> {
        let (requests, request_secs, tokens, token_secs, timeout_secs) = match self {
            Model::O3Mini => (10_000, 30, 1_000_000, 30, 30),
            Model::Gpt4o => (10_000, 60, 2_000_000, 60, 40),
            Model::Gpt4oMini => (10_000, 60, 10_000_000, 60, 40),
            Model::Claude35Sonnet => (4_000, 60, 400_000, 60, 60),
            Model::PerplexitySonarPro => (50, 60, 1_000_000, 60, 120),
            Model::Custom(_) => return None,
        };
        Some(QuotaConfig {
            requests_per_period: requests,
            request_period: Duration::from_secs(request_secs),
            tokens_per_period: tokens,
            token_period: Duration::from_secs(token_secs),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl Default for Model {
    /// Returns the default model (o3-mini)
    fn default() -> Self {
        Model::O3Mini
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "o3-mini" => Model::O3Mini,
            "gpt-4o" => Model::Gpt4o,
            "gpt-4o-mini" => Model::Gpt4oMini,
            "claude-3-5-sonnet-latest" => Model::Claude35Sonnet,
            "perplexity/sonar-pro" => Model::PerplexitySonarPro,
            other => Model::Custom(other.to_string()),
        })
    }
}

impl From<&str> for Model {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(model) => model,
            Err(never) => match never {},
        }
    }
}

impl Serialize for Model {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Model {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Model::from(s.as_str()))
    }
}
