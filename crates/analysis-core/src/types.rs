use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MalformedReason;

/// Reference entry for a tracked ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TickerRecord {
    pub symbol: String,
    pub company_name: String,
    #[serde(default)]
    pub sector: Option<String>,
    /// Extra names the company is known by (e.g. "Google" for GOOGL)
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Higher wins when two records claim the same name fragment
    #[serde(default = "default_priority")]
    pub priority: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_priority() -> f64 {
    1.0
}

fn default_active() -> bool {
    true
}

impl TickerRecord {
    pub fn new(symbol: impl Into<String>, company_name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            company_name: company_name.into(),
            sector: None,
            aliases: Vec::new(),
            priority: default_priority(),
            active: true,
        }
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Financial keywords matched upstream, grouped by polarity.
/// Duplicates are kept on purpose: each entry counts once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct KeywordSets {
    #[serde(default)]
    pub positive: Vec<String>,
    #[serde(default)]
    pub negative: Vec<String>,
    #[serde(default)]
    pub neutral: Vec<String>,
}

impl KeywordSets {
    pub fn is_empty(&self) -> bool {
        self.positive.is_empty() && self.negative.is_empty() && self.neutral.is_empty()
    }
}

/// Preprocessed article as delivered by the upstream cleaning pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ArticleInput {
    pub article_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub tokens: Vec<String>,
    /// `None` when upstream failed to produce a keyword structure at all
    #[serde(default)]
    pub keywords: Option<KeywordSets>,
    /// Optional compound score from a general-purpose lexicon, in [-1, 1]
    #[serde(default)]
    pub general_signal: Option<f64>,
}

impl ArticleInput {
    /// Title and body joined by a newline. All mention offsets refer to this text.
    pub fn full_text(&self) -> String {
        match (self.title.is_empty(), self.body.is_empty()) {
            (true, _) => self.body.clone(),
            (false, true) => self.title.clone(),
            (false, false) => format!("{}\n{}", self.title, self.body),
        }
    }
}

/// How a ticker mention was recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// `$AAPL`
    Cashtag,
    /// Bare `AAPL` as a standalone word
    SymbolToken,
    /// Full company name, its suffix-stripped form, or an alias
    CompanyName,
    /// A distinctive fragment of the company name, e.g. "nvidia"
    PartialName,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::Cashtag => "cashtag",
            MatchMethod::SymbolToken => "symbol_token",
            MatchMethod::CompanyName => "company_name",
            MatchMethod::PartialName => "partial_name",
        }
    }
}

/// One recognized reference to a ticker inside an article's full text.
/// `start..end` are byte offsets on char boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TickerMention {
    pub symbol: String,
    pub confidence: f64,
    pub method: MatchMethod,
    pub start: usize,
    pub end: usize,
}

/// Sentiment of one article attributed to one ticker it mentions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ArticleScore {
    pub article_id: String,
    pub ticker: String,
    pub score: f64,      // -1.0 to 1.0
    pub confidence: f64, // 0.0 to 1.0
    pub published_at: DateTime<Utc>,
}

/// Three-way trading recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Recommendation {
    Buy,
    Hold,
    Sell,
}

impl Recommendation {
    /// Bullishness rank: Sell < Hold < Buy
    pub fn rank(&self) -> i8 {
        match self {
            Recommendation::Buy => 1,
            Recommendation::Hold => 0,
            Recommendation::Sell => -1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Buy => "Buy",
            Recommendation::Hold => "Hold",
            Recommendation::Sell => "Sell",
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Published-time range covered by an aggregate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct WindowBounds {
    pub oldest: DateTime<Utc>,
    pub newest: DateTime<Utc>,
}

/// Per-ticker recommendation built from its most recent article scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TickerAggregate {
    pub ticker: String,
    pub score: f64,      // -1.0 to 1.0
    pub confidence: f64, // 0.0 to 1.0
    pub recommendation: Recommendation,
    pub article_count: usize,
    pub window: WindowBounds,
    pub as_of: DateTime<Utc>,
}

/// Per-(article, ticker) output handed to storage/API layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ArticleSignal {
    pub article_id: String,
    pub ticker: String,
    pub mention_confidence: f64,
    pub match_method: MatchMethod,
    pub contexts: Vec<String>,
    pub sentiment_score: f64,
    pub sentiment_confidence: f64,
    pub recommendation: Recommendation,
    pub published_at: DateTime<Utc>,
}

impl ArticleSignal {
    pub fn to_score(&self) -> ArticleScore {
        ArticleScore {
            article_id: self.article_id.clone(),
            ticker: self.ticker.clone(),
            score: self.sentiment_score,
            confidence: self.sentiment_confidence,
            published_at: self.published_at,
        }
    }
}

/// Audit record for an article that degraded to a neutral score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MalformedArticle {
    pub article_id: String,
    pub reason: MalformedReason,
}

/// An article that could not be processed at all
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ArticleFailure {
    pub article_id: String,
    pub reason: String,
}
