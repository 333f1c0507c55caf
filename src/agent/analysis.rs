//! Analysis kinds supported over a stored conversation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::conversation::ConversationError;

/// What an analysis extracts from a transcript.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    /// Overall tone and emotional context.
    Sentiment,
    /// Key points discussed.
    Summary,
    /// Main topics as bullet points.
    Topics,
}

impl AnalysisType {
    /// Stable string form used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sentiment => "sentiment",
            Self::Summary => "summary",
            Self::Topics => "topics",
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisType {
    type Err = ConversationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "sentiment" => Ok(Self::Sentiment),
            "summary" => Ok(Self::Summary),
            "topics" => Ok(Self::Topics),
            other => Err(ConversationError::Validation(format!(
                "Unknown analysis type: {other}"
            ))),
        }
    }
}
