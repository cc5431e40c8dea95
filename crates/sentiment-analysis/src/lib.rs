//! Article-level sentiment scoring, per-ticker aggregation and the mapping
//! from aggregate score to a trading recommendation.

pub mod aggregator;
pub mod lexicon;
pub mod recommendation;
pub mod scorer;

pub use aggregator::TickerAggregator;
pub use lexicon::LexiconSignal;
pub use recommendation::RecommendationMapper;
pub use scorer::{evidence_confidence, keyword_score, ArticleScorer, PrecomputedSignal, ScoreOutcome};
