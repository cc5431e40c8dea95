use crate::ArticleInput;

/// Optional general-purpose sentiment signal (e.g. a lexicon compound score).
///
/// Implementations must be pure and cheap; the scoring pass calls them once per
/// article from worker threads. Returning `None` means no signal is available
/// for that article and the keyword score is used alone.
pub trait GeneralSentimentSource: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Compound score in [-1, 1]
    fn compound(&self, article: &ArticleInput) -> Option<f64>;
}
