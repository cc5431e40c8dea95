use analysis_core::{
    AnalysisError, ArticleFailure, ArticleInput, ArticleScore, ArticleSignal, EngineConfig,
    GeneralSentimentSource, MalformedArticle, TickerAggregate, TickerMention,
};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use sentiment_analysis::{ArticleScorer, RecommendationMapper, ScoreOutcome, TickerAggregator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use ticker_detection::{ContextExtractor, TickerMatcher, TickerTable};

pub mod evaluation;
pub use evaluation::{
    evaluate_detection, evaluate_recommendations, ConfusionCounts, EvaluationMetrics,
    SentimentLabel,
};

/// Everything derived from one article
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleAnalysis {
    pub article_id: String,
    pub mentions: Vec<TickerMention>,
    pub outcome: ScoreOutcome,
    /// One entry per mentioned ticker, sharing the article's score
    pub signals: Vec<ArticleSignal>,
}

/// Output of one batch run, ready for a storage or API layer to serialize
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub per_article: Vec<ArticleSignal>,
    pub per_ticker: Vec<TickerAggregate>,
    pub malformed: Vec<MalformedArticle>,
    pub failures: Vec<ArticleFailure>,
}

impl BatchReport {
    pub fn aggregate_for(&self, ticker: &str) -> Option<&TickerAggregate> {
        self.per_ticker.iter().find(|a| a.ticker == ticker)
    }

    pub fn signals_for<'a>(&'a self, ticker: &'a str) -> impl Iterator<Item = &'a ArticleSignal> + 'a {
        self.per_article.iter().filter(move |s| s.ticker == ticker)
    }
}

/// Detect, score, fan out and aggregate a batch of preprocessed articles.
///
/// Holds only read-only state, so one pipeline can serve many batches and
/// every stage runs in parallel without locks.
#[derive(Debug, Clone)]
pub struct SignalPipeline {
    matcher: TickerMatcher,
    extractor: ContextExtractor,
    scorer: ArticleScorer,
    aggregator: TickerAggregator,
    mapper: RecommendationMapper,
    max_batch_size: usize,
}

impl SignalPipeline {
    pub fn new(table: Arc<TickerTable>, config: &EngineConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self {
            matcher: TickerMatcher::from_config(table, config)?,
            extractor: ContextExtractor::from_config(config),
            scorer: ArticleScorer::from_config(config)?,
            aggregator: TickerAggregator::from_config(config)?,
            mapper: RecommendationMapper::from_config(config)?,
            max_batch_size: config.max_batch_size,
        })
    }

    pub fn with_general_source(mut self, source: Arc<dyn GeneralSentimentSource>) -> Self {
        tracing::info!("Using general sentiment source: {}", source.name());
        self.scorer = self.scorer.with_general_source(source);
        self
    }

    pub fn matcher(&self) -> &TickerMatcher {
        &self.matcher
    }

    /// Score one article and fan it out to every ticker it mentions.
    pub fn analyze_article(&self, article: &ArticleInput) -> Result<ArticleAnalysis, AnalysisError> {
        if article.article_id.trim().is_empty() {
            return Err(AnalysisError::InvalidData("article has an empty id".to_string()));
        }

        let text = article.full_text();
        let hits = self.matcher.detect(&text);
        let outcome = self.scorer.score(article);
        let recommendation = self.mapper.map(outcome.score);

        let signals: Vec<ArticleSignal> = hits
            .iter()
            .map(|hit| ArticleSignal {
                article_id: article.article_id.clone(),
                ticker: hit.symbol.clone(),
                mention_confidence: hit.confidence,
                match_method: hit.method,
                contexts: hit.mentions.iter().map(|m| self.extractor.extract(&text, m)).collect(),
                sentiment_score: outcome.score,
                sentiment_confidence: outcome.confidence,
                recommendation,
                published_at: article.published_at,
            })
            .collect();

        tracing::debug!(
            article_id = %article.article_id,
            tickers = signals.len(),
            score = outcome.score,
            confidence = outcome.confidence,
            "article analyzed"
        );

        Ok(ArticleAnalysis {
            article_id: article.article_id.clone(),
            mentions: hits.into_iter().flat_map(|h| h.mentions).collect(),
            outcome,
            signals,
        })
    }

    /// Aggregate per-ticker scores. Tickers with no scores produce no record.
    pub fn aggregate_scores(&self, scores: &[ArticleScore], now: DateTime<Utc>) -> Vec<TickerAggregate> {
        let mut by_ticker: BTreeMap<&str, Vec<ArticleScore>> = BTreeMap::new();
        for score in scores {
            by_ticker.entry(score.ticker.as_str()).or_default().push(score.clone());
        }

        by_ticker
            .into_iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .filter_map(|(ticker, scores)| match self.aggregator.aggregate(ticker, &scores, now) {
                Ok(aggregate) => Some(aggregate),
                Err(AnalysisError::EmptyAggregationSet(_)) => None,
                Err(e) => {
                    tracing::warn!("Skipping aggregate for {}: {}", ticker, e);
                    None
                }
            })
            .collect()
    }

    pub fn run(&self, articles: &[ArticleInput], now: DateTime<Utc>) -> Result<BatchReport, AnalysisError> {
        if articles.len() > self.max_batch_size {
            return Err(AnalysisError::BatchTooLarge {
                size: articles.len(),
                limit: self.max_batch_size,
            });
        }
        tracing::info!("Running signal pipeline over {} articles", articles.len());

        let results: Vec<Result<ArticleAnalysis, ArticleFailure>> = articles
            .par_iter()
            .map(|article| {
                self.analyze_article(article).map_err(|e| ArticleFailure {
                    article_id: article.article_id.clone(),
                    reason: e.to_string(),
                })
            })
            .collect();

        let mut per_article = Vec::new();
        let mut malformed = Vec::new();
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(analysis) => {
                    if let Some(reason) = analysis.outcome.malformed {
                        tracing::warn!(
                            article_id = %analysis.article_id,
                            "{}",
                            AnalysisError::MalformedInput {
                                article_id: analysis.article_id.clone(),
                                reason,
                            }
                        );
                        malformed.push(MalformedArticle {
                            article_id: analysis.article_id.clone(),
                            reason,
                        });
                    }
                    per_article.extend(analysis.signals);
                }
                Err(failure) => {
                    tracing::warn!("Article {:?} failed: {}", failure.article_id, failure.reason);
                    failures.push(failure);
                }
            }
        }

        let scores: Vec<ArticleScore> = per_article.iter().map(ArticleSignal::to_score).collect();
        let per_ticker = self.aggregate_scores(&scores, now);

        tracing::info!(
            "Batch complete: {} article signals, {} tickers, {} malformed, {} failed",
            per_article.len(),
            per_ticker.len(),
            malformed.len(),
            failures.len()
        );

        Ok(BatchReport {
            generated_at: now,
            per_article,
            per_ticker,
            malformed,
            failures,
        })
    }
}
