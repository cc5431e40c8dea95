use analysis_core::stats::clamp_finite;
use analysis_core::{AnalysisError, ArticleInput, EngineConfig, GeneralSentimentSource, MalformedReason};
use serde::Serialize;
use std::sync::Arc;

/// Smoothed keyword polarity: `(p - n) / (p + n + 1)`.
///
/// The `+1` keeps a single positive hit from reading as maximally positive.
pub fn keyword_score(positive: usize, negative: usize) -> f64 {
    let (p, n) = (positive as f64, negative as f64);
    (p - n) / (p + n + 1.0)
}

/// Evidence-volume confidence: `min(1, (p + n) / saturation)`.
pub fn evidence_confidence(positive: usize, negative: usize, saturation: f64) -> f64 {
    if saturation <= 0.0 {
        return 0.0;
    }
    ((positive + negative) as f64 / saturation).min(1.0)
}

/// Result of scoring one article, with the intermediate counts kept for audit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreOutcome {
    pub score: f64,      // -1.0 to 1.0
    pub confidence: f64, // 0.0 to 1.0
    pub positive_count: usize,
    pub negative_count: usize,
    pub neutral_count: usize,
    pub keyword_score: f64,
    /// General signal actually blended in, after clamping
    pub general_signal: Option<f64>,
    /// Set when the article degraded to a neutral score
    pub malformed: Option<MalformedReason>,
}

impl ScoreOutcome {
    fn neutral(malformed: Option<MalformedReason>) -> Self {
        Self {
            score: 0.0,
            confidence: 0.0,
            positive_count: 0,
            negative_count: 0,
            neutral_count: 0,
            keyword_score: 0.0,
            general_signal: None,
            malformed,
        }
    }
}

/// Turns an article's categorized keywords, plus an optional general-purpose
/// signal, into a sentiment score and a confidence.
#[derive(Clone)]
pub struct ArticleScorer {
    general_weight: f64,
    saturation: f64,
    general_source: Option<Arc<dyn GeneralSentimentSource>>,
}

impl std::fmt::Debug for ArticleScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArticleScorer")
            .field("general_weight", &self.general_weight)
            .field("saturation", &self.saturation)
            .field("general_source", &self.general_source.as_ref().map(|s| s.name().to_string()))
            .finish()
    }
}

impl ArticleScorer {
    pub fn new(general_weight: f64, saturation: f64) -> Result<Self, AnalysisError> {
        if !(0.0..=1.0).contains(&general_weight) {
            return Err(AnalysisError::Configuration(format!(
                "general_signal_weight must be in [0, 1] (got {general_weight})"
            )));
        }
        if !(saturation.is_finite() && saturation > 0.0) {
            return Err(AnalysisError::Configuration(format!(
                "confidence_saturation must be positive (got {saturation})"
            )));
        }
        Ok(Self {
            general_weight,
            saturation,
            general_source: None,
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, AnalysisError> {
        Self::new(config.general_signal_weight, config.confidence_saturation)
    }

    /// Plug in a general sentiment capability. Without one, scores are keyword-only.
    pub fn with_general_source(mut self, source: Arc<dyn GeneralSentimentSource>) -> Self {
        self.general_source = Some(source);
        self
    }

    pub fn general_source_name(&self) -> Option<&str> {
        self.general_source.as_ref().map(|s| s.name())
    }

    pub fn score(&self, article: &ArticleInput) -> ScoreOutcome {
        if article.tokens.is_empty() {
            return ScoreOutcome::neutral(Some(MalformedReason::NoTokens));
        }
        let Some(keywords) = article.keywords.as_ref() else {
            return ScoreOutcome::neutral(Some(MalformedReason::MissingKeywords));
        };
        if keywords.is_empty() {
            return ScoreOutcome::neutral(None);
        }

        let positive_count = keywords.positive.len();
        let negative_count = keywords.negative.len();
        let keyword = keyword_score(positive_count, negative_count);

        let general_signal = self.general_signal(article);
        let score = match general_signal {
            Some(general) => self.general_weight * general + (1.0 - self.general_weight) * keyword,
            None => keyword,
        };

        ScoreOutcome {
            score: clamp_finite(score, -1.0, 1.0),
            confidence: evidence_confidence(positive_count, negative_count, self.saturation),
            positive_count,
            negative_count,
            neutral_count: keywords.neutral.len(),
            keyword_score: keyword,
            general_signal,
            malformed: None,
        }
    }

    fn general_signal(&self, article: &ArticleInput) -> Option<f64> {
        let source = self.general_source.as_ref()?;
        match source.compound(article) {
            Some(value) if value.is_finite() => Some(value.clamp(-1.0, 1.0)),
            Some(value) => {
                tracing::debug!(
                    article_id = %article.article_id,
                    source = source.name(),
                    "ignoring non-finite general signal {}",
                    value
                );
                None
            }
            None => None,
        }
    }
}

/// Uses the compound score the upstream pipeline stored on the article.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrecomputedSignal;

impl GeneralSentimentSource for PrecomputedSignal {
    fn name(&self) -> &str {
        "precomputed"
    }

    fn compound(&self, article: &ArticleInput) -> Option<f64> {
        article.general_signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::KeywordSets;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    fn words(n: usize, word: &str) -> Vec<String> {
        vec![word.to_string(); n]
    }

    fn article(positive: usize, negative: usize, neutral: usize) -> ArticleInput {
        ArticleInput {
            article_id: "a1".to_string(),
            title: "Title".to_string(),
            body: "Body".to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            tokens: vec!["token".to_string()],
            keywords: Some(KeywordSets {
                positive: words(positive, "beat"),
                negative: words(negative, "miss"),
                neutral: words(neutral, "quarter"),
            }),
            general_signal: None,
        }
    }

    fn scorer() -> ArticleScorer {
        ArticleScorer::from_config(&EngineConfig::default()).unwrap()
    }

    struct Fixed(f64);

    impl GeneralSentimentSource for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn compound(&self, _article: &ArticleInput) -> Option<f64> {
            Some(self.0)
        }
    }

    #[test]
    fn test_four_positive_one_negative() {
        let outcome = scorer().score(&article(4, 1, 0));
        assert_relative_eq!(outcome.keyword_score, 0.5);
        assert_relative_eq!(outcome.score, 0.5);
        assert_relative_eq!(outcome.confidence, 1.0);
        assert!(outcome.malformed.is_none());
    }

    #[test]
    fn test_single_hit_is_damped() {
        let outcome = scorer().score(&article(1, 0, 0));
        assert_relative_eq!(outcome.score, 0.5);
        assert_relative_eq!(outcome.confidence, 0.2);
    }

    #[test]
    fn test_balanced_counts_score_zero() {
        for n in 0..20 {
            assert_relative_eq!(keyword_score(n, n), 0.0);
        }
    }

    #[test]
    fn test_ranges_hold_for_all_counts() {
        for p in 0..30 {
            for n in 0..30 {
                let s = keyword_score(p, n);
                assert!((-1.0..=1.0).contains(&s), "score {s} for p={p} n={n}");
                let c = evidence_confidence(p, n, 5.0);
                assert!((0.0..=1.0).contains(&c), "confidence {c} for p={p} n={n}");
            }
        }
    }

    #[test]
    fn test_no_tokens_is_flagged_neutral() {
        let mut input = article(3, 0, 0);
        input.tokens.clear();
        let outcome = scorer().score(&input);
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.confidence, 0.0);
        assert_eq!(outcome.malformed, Some(MalformedReason::NoTokens));
    }

    #[test]
    fn test_missing_keywords_is_flagged_neutral() {
        let mut input = article(0, 0, 0);
        input.keywords = None;
        let outcome = scorer().score(&input);
        assert_eq!((outcome.score, outcome.confidence), (0.0, 0.0));
        assert_eq!(outcome.malformed, Some(MalformedReason::MissingKeywords));
    }

    #[test]
    fn test_empty_keyword_sets_are_neutral_but_not_malformed() {
        let outcome = scorer().score(&article(0, 0, 0));
        assert_eq!((outcome.score, outcome.confidence), (0.0, 0.0));
        assert!(outcome.malformed.is_none());
    }

    #[test]
    fn test_neutral_only_has_zero_confidence() {
        let outcome = scorer().score(&article(0, 0, 6));
        assert_eq!(outcome.neutral_count, 6);
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.confidence, 0.0);
    }

    #[test]
    fn test_general_signal_blend() {
        let scorer = scorer().with_general_source(Arc::new(Fixed(-0.4)));
        let outcome = scorer.score(&article(4, 1, 0));
        // 0.7 * -0.4 + 0.3 * 0.5
        assert_relative_eq!(outcome.score, -0.13, epsilon = 1e-12);
        assert_eq!(outcome.general_signal, Some(-0.4));
        assert_eq!(scorer.general_source_name(), Some("fixed"));
    }

    #[test]
    fn test_blend_weight_is_configurable() {
        let scorer = ArticleScorer::new(0.5, 5.0)
            .unwrap()
            .with_general_source(Arc::new(Fixed(1.0)));
        let outcome = scorer.score(&article(4, 1, 0));
        assert_relative_eq!(outcome.score, 0.75);
    }

    #[test]
    fn test_general_signal_is_clamped_and_nan_ignored() {
        let wild = scorer().with_general_source(Arc::new(Fixed(3.0)));
        let outcome = wild.score(&article(0, 1, 0));
        assert_eq!(outcome.general_signal, Some(1.0));
        assert!((-1.0..=1.0).contains(&outcome.score));

        let nan = scorer().with_general_source(Arc::new(Fixed(f64::NAN)));
        let outcome = nan.score(&article(4, 1, 0));
        assert!(outcome.general_signal.is_none());
        assert_relative_eq!(outcome.score, 0.5);
    }

    #[test]
    fn test_precomputed_signal_reads_article() {
        let scorer = scorer().with_general_source(Arc::new(PrecomputedSignal));
        let mut input = article(4, 1, 0);
        assert_relative_eq!(scorer.score(&input).score, 0.5);

        input.general_signal = Some(0.5);
        assert_relative_eq!(scorer.score(&input).score, 0.5);
        input.general_signal = Some(-1.0);
        assert_relative_eq!(scorer.score(&input).score, -0.55, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        assert!(ArticleScorer::new(1.1, 5.0).is_err());
        assert!(ArticleScorer::new(0.7, 0.0).is_err());
        assert!(ArticleScorer::new(0.7, f64::INFINITY).is_err());
    }
}
