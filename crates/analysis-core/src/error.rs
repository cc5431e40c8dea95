use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Malformed input for article {article_id}: {reason}")]
    MalformedInput {
        article_id: String,
        reason: MalformedReason,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No qualifying articles for ticker {0}")]
    EmptyAggregationSet(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Batch of {size} articles exceeds limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },
}

/// Why an article degraded to a neutral, zero-confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum MalformedReason {
    /// Upstream produced no tokens for the article
    NoTokens,
    /// The categorized keyword structure is missing entirely
    MissingKeywords,
}

impl MalformedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MalformedReason::NoTokens => "no tokens",
            MalformedReason::MissingKeywords => "missing keyword sets",
        }
    }
}

impl std::fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
