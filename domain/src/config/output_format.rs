//! Output format value object

use serde::{Deserialize, Serialize};

/// How saved forecast reports are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Research, individual predictions and errors per question
    Full,
    /// One line per question with the final prediction (default)
    #[default]
    Summary,
    /// JSON output
    Json,
}
