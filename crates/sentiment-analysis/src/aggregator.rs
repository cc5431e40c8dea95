use analysis_core::stats::{clamp_finite, normalize, weighted_mean, weighted_std_dev};
use analysis_core::{
    AnalysisError, ArticleScore, EngineConfig, RecencyDecay, TickerAggregate, WindowBounds,
};
use chrono::{DateTime, Utc};

use crate::recommendation::RecommendationMapper;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Rolls the most recent article scores for one ticker into a single
/// recency-weighted score, confidence and recommendation.
#[derive(Debug, Clone)]
pub struct TickerAggregator {
    window_size: usize,
    decay: RecencyDecay,
    volume_saturation: usize,
    mapper: RecommendationMapper,
}

impl TickerAggregator {
    pub fn new(
        window_size: usize,
        decay: RecencyDecay,
        volume_saturation: usize,
        mapper: RecommendationMapper,
    ) -> Result<Self, AnalysisError> {
        if window_size == 0 {
            return Err(AnalysisError::Configuration("window_size must be at least 1".to_string()));
        }
        if volume_saturation == 0 {
            return Err(AnalysisError::Configuration(
                "volume_saturation must be at least 1".to_string(),
            ));
        }
        let hours = decay.hours();
        if !(hours.is_finite() && hours > 0.0) {
            return Err(AnalysisError::Configuration(format!(
                "recency decay hours must be positive (got {hours})"
            )));
        }
        Ok(Self {
            window_size,
            decay,
            volume_saturation,
            mapper,
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, AnalysisError> {
        Self::new(
            config.window_size,
            config.recency_decay,
            config.volume_saturation,
            RecommendationMapper::from_config(config)?,
        )
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Normalized recency weights for articles of the given ages (hours).
    ///
    /// Weights never increase with age and sum to 1. Linear decay stretches its
    /// horizon past the oldest age so that every weight stays positive.
    /// Exponential decay is measured from the newest age, which keeps the
    /// freshest article at raw weight 1 however old the window is.
    pub fn recency_weights(&self, ages_hours: &[f64]) -> Vec<f64> {
        let raw: Vec<f64> = match self.decay {
            RecencyDecay::Linear { horizon_hours } => {
                let oldest = ages_hours.iter().copied().fold(0.0_f64, f64::max);
                let horizon = horizon_hours.max(oldest + 1.0);
                ages_hours.iter().map(|age| 1.0 - age / horizon).collect()
            }
            RecencyDecay::Exponential { half_life_hours } => {
                let newest = ages_hours.iter().copied().fold(f64::INFINITY, f64::min);
                ages_hours
                    .iter()
                    .map(|age| 0.5_f64.powf((age - newest) / half_life_hours))
                    .collect()
            }
        };
        normalize(&raw)
    }

    /// Aggregate every score for `ticker`. Returns `EmptyAggregationSet` when
    /// there is nothing to aggregate, so callers can emit no record at all.
    pub fn aggregate(
        &self,
        ticker: &str,
        scores: &[ArticleScore],
        now: DateTime<Utc>,
    ) -> Result<TickerAggregate, AnalysisError> {
        if let Some(stray) = scores.iter().find(|s| s.ticker != ticker) {
            return Err(AnalysisError::InvalidData(format!(
                "score for {} (article {}) passed to the {} aggregate",
                stray.ticker, stray.article_id, ticker
            )));
        }
        if scores.is_empty() {
            return Err(AnalysisError::EmptyAggregationSet(ticker.to_string()));
        }

        // Newest first, fully ordered so input order never matters
        let mut selected: Vec<&ArticleScore> = scores.iter().collect();
        selected.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| a.article_id.cmp(&b.article_id))
                .then_with(|| a.score.total_cmp(&b.score))
                .then_with(|| a.confidence.total_cmp(&b.confidence))
        });
        selected.truncate(self.window_size);

        let ages: Vec<f64> = selected
            .iter()
            .map(|s| ((now - s.published_at).num_milliseconds() as f64 / MS_PER_HOUR).max(0.0))
            .collect();
        let recency = self.recency_weights(&ages);

        let values: Vec<f64> = selected.iter().map(|s| clamp_finite(s.score, -1.0, 1.0)).collect();
        let confidences: Vec<f64> = selected
            .iter()
            .map(|s| clamp_finite(s.confidence, 0.0, 1.0))
            .collect();
        let weights: Vec<f64> = recency.iter().zip(&confidences).map(|(r, c)| r * c).collect();

        // Recency weights sum to 1, so this is the recency-weighted mean confidence
        let evidence: f64 = weights.iter().sum();

        let (score, confidence) = match weighted_mean(&values, &weights) {
            Some(score) => {
                let spread = weighted_std_dev(&values, &weights).unwrap_or(0.0).min(1.0);
                let volume = (selected.len() as f64 / self.volume_saturation as f64).min(1.0);
                let confidence = evidence * (0.5 * volume + 0.5 * (1.0 - spread));
                (clamp_finite(score, -1.0, 1.0), clamp_finite(confidence, 0.0, 1.0))
            }
            None => (0.0, 0.0),
        };

        let window = WindowBounds {
            oldest: selected.last().map_or(now, |s| s.published_at),
            newest: selected.first().map_or(now, |s| s.published_at),
        };

        tracing::debug!(
            ticker,
            articles = selected.len(),
            score,
            confidence,
            "aggregated ticker sentiment"
        );

        Ok(TickerAggregate {
            ticker: ticker.to_string(),
            score,
            confidence,
            recommendation: self.mapper.map(score),
            article_count: selected.len(),
            window,
            as_of: now,
        })
    }
}
