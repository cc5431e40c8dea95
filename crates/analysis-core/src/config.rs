use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::AnalysisError;

/// Size of the text window returned around each ticker mention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "size", rename_all = "snake_case")]
pub enum ContextWindow {
    /// Up to N characters on each side
    Chars(usize),
    /// Up to N whitespace-separated tokens on each side
    Tokens(usize),
}

impl ContextWindow {
    pub fn size(&self) -> usize {
        match self {
            ContextWindow::Chars(n) | ContextWindow::Tokens(n) => *n,
        }
    }
}

/// Shape of the recency weighting applied over an aggregation window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum RecencyDecay {
    /// Weight falls linearly to zero at `horizon_hours` of age. The horizon is
    /// stretched past the oldest selected article so every weight stays positive.
    Linear { horizon_hours: f64 },
    /// Weight halves every `half_life_hours`
    Exponential { half_life_hours: f64 },
}

impl RecencyDecay {
    pub fn hours(&self) -> f64 {
        match self {
            RecencyDecay::Linear { horizon_hours } => *horizon_hours,
            RecencyDecay::Exponential { half_life_hours } => *half_life_hours,
        }
    }
}

/// Every tunable of the detection and scoring engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    // Ticker matching
    pub min_mention_confidence: f64, // 0.3

    // Context extraction
    pub context_window: ContextWindow, // 150 chars

    // Article scoring
    pub general_signal_weight: f64, // 0.7, keyword part gets the rest
    pub confidence_saturation: f64, // K = 5 keyword hits for full confidence

    // Aggregation
    pub window_size: usize,        // 50 most recent articles
    pub recency_decay: RecencyDecay,
    pub volume_saturation: usize,  // 10 articles for full volume confidence

    // Recommendation bands
    pub threshold_buy: f64,  // 0.25
    pub threshold_sell: f64, // -0.25

    // Caller-imposed bound on one batch
    pub max_batch_size: usize, // 5000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_mention_confidence: 0.3,
            context_window: ContextWindow::Chars(150),
            general_signal_weight: 0.7,
            confidence_saturation: 5.0,
            window_size: 50,
            recency_decay: RecencyDecay::Linear { horizon_hours: 168.0 },
            volume_saturation: 10,
            threshold_buy: 0.25,
            threshold_sell: -0.25,
            max_batch_size: 5000,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, AnalysisError>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AnalysisError::Configuration(format!("{key}={raw:?}: {e}"))),
        Err(_) => Ok(default),
    }
}

impl EngineConfig {
    /// Read overrides from the environment, falling back to defaults, then validate.
    pub fn from_env() -> Result<Self, AnalysisError> {
        let defaults = Self::default();

        let context_window = match (env::var("CONTEXT_WINDOW_TOKENS"), env::var("CONTEXT_WINDOW_CHARS")) {
            (Ok(_), Ok(_)) => {
                return Err(AnalysisError::Configuration(
                    "set only one of CONTEXT_WINDOW_TOKENS and CONTEXT_WINDOW_CHARS".to_string(),
                ))
            }
            (Ok(_), Err(_)) => ContextWindow::Tokens(env_or("CONTEXT_WINDOW_TOKENS", 10)?),
            (Err(_), _) => ContextWindow::Chars(env_or("CONTEXT_WINDOW_CHARS", defaults.context_window.size())?),
        };

        let decay_shape: String = env_or("RECENCY_DECAY", "linear".to_string())?;
        let recency_decay = match decay_shape.to_ascii_lowercase().as_str() {
            "linear" => RecencyDecay::Linear {
                horizon_hours: env_or("RECENCY_DECAY_HOURS", defaults.recency_decay.hours())?,
            },
            "exponential" => RecencyDecay::Exponential {
                half_life_hours: env_or("RECENCY_DECAY_HOURS", 48.0)?,
            },
            other => {
                return Err(AnalysisError::Configuration(format!(
                    "RECENCY_DECAY must be 'linear' or 'exponential', got {other:?}"
                )))
            }
        };

        let config = Self {
            min_mention_confidence: env_or("MIN_MENTION_CONFIDENCE", defaults.min_mention_confidence)?,
            context_window,
            general_signal_weight: env_or("GENERAL_SIGNAL_WEIGHT", defaults.general_signal_weight)?,
            confidence_saturation: env_or("CONFIDENCE_SATURATION", defaults.confidence_saturation)?,
            window_size: env_or("AGGREGATION_WINDOW", defaults.window_size)?,
            recency_decay,
            volume_saturation: env_or("AGGREGATE_VOLUME_SATURATION", defaults.volume_saturation)?,
            threshold_buy: env_or("THRESHOLD_BUY", defaults.threshold_buy)?,
            threshold_sell: env_or("THRESHOLD_SELL", defaults.threshold_sell)?,
            max_batch_size: env_or("MAX_BATCH_SIZE", defaults.max_batch_size)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject out-of-range values before any article is processed.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        fn check(ok: bool, msg: impl FnOnce() -> String) -> Result<(), AnalysisError> {
            if ok {
                Ok(())
            } else {
                Err(AnalysisError::Configuration(msg()))
            }
        }

        check((0.0..=1.0).contains(&self.min_mention_confidence), || {
            format!("min_mention_confidence must be in [0, 1] (got {})", self.min_mention_confidence)
        })?;
        check(self.context_window.size() >= 1, || "context window must be at least 1".to_string())?;
        check((0.0..=1.0).contains(&self.general_signal_weight), || {
            format!("general_signal_weight must be in [0, 1] (got {})", self.general_signal_weight)
        })?;
        check(self.confidence_saturation.is_finite() && self.confidence_saturation > 0.0, || {
            format!("confidence_saturation must be positive (got {})", self.confidence_saturation)
        })?;
        check(self.window_size >= 1, || "window_size must be at least 1".to_string())?;
        let hours = self.recency_decay.hours();
        check(hours.is_finite() && hours > 0.0, || {
            format!("recency decay hours must be positive (got {hours})")
        })?;
        check(self.volume_saturation >= 1, || "volume_saturation must be at least 1".to_string())?;
        check((-1.0..=1.0).contains(&self.threshold_buy), || {
            format!("threshold_buy must be in [-1, 1] (got {})", self.threshold_buy)
        })?;
        check((-1.0..=1.0).contains(&self.threshold_sell), || {
            format!("threshold_sell must be in [-1, 1] (got {})", self.threshold_sell)
        })?;
        check(self.threshold_sell <= self.threshold_buy, || {
            format!(
                "threshold_sell ({}) must not exceed threshold_buy ({})",
                self.threshold_sell, self.threshold_buy
            )
        })?;
        check(self.max_batch_size >= 1, || "max_batch_size must be at least 1".to_string())?;

        tracing::debug!(config = ?self, "engine configuration validated");
        Ok(())
    }
}
