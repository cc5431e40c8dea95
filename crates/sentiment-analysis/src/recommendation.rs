use analysis_core::{AnalysisError, EngineConfig, Recommendation};

/// Maps a score in [-1, 1] to Buy / Hold / Sell. A score sitting exactly on a
/// threshold takes the action, not Hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommendationMapper {
    threshold_buy: f64,
    threshold_sell: f64,
}

impl RecommendationMapper {
    pub fn new(threshold_buy: f64, threshold_sell: f64) -> Result<Self, AnalysisError> {
        for (name, value) in [("threshold_buy", threshold_buy), ("threshold_sell", threshold_sell)] {
            if !(-1.0..=1.0).contains(&value) {
                return Err(AnalysisError::Configuration(format!(
                    "{name} must be in [-1, 1] (got {value})"
                )));
            }
        }
        if threshold_sell > threshold_buy {
            return Err(AnalysisError::Configuration(format!(
                "threshold_sell ({threshold_sell}) must not exceed threshold_buy ({threshold_buy})"
            )));
        }
        Ok(Self {
            threshold_buy,
            threshold_sell,
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, AnalysisError> {
        Self::new(config.threshold_buy, config.threshold_sell)
    }

    pub fn threshold_buy(&self) -> f64 {
        self.threshold_buy
    }

    pub fn threshold_sell(&self) -> f64 {
        self.threshold_sell
    }

    pub fn map(&self, score: f64) -> Recommendation {
        // NaN compares false on both sides and falls through to Hold
        if score >= self.threshold_buy {
            Recommendation::Buy
        } else if score <= self.threshold_sell {
            Recommendation::Sell
        } else {
            Recommendation::Hold
        }
    }
}

impl Default for RecommendationMapper {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            threshold_buy: config.threshold_buy,
            threshold_sell: config.threshold_sell,
        }
    }
}
