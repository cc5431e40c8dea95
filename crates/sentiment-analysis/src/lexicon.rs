use analysis_core::{ArticleInput, GeneralSentimentSource};
use std::collections::HashSet;

const POSITIVE_WORDS: &[&str] = &[
    "bullish", "rally", "surge", "gain", "profit", "growth", "beat", "upgrade", "outperform",
    "strong", "positive", "rise", "increase", "breakthrough", "innovation", "success", "exceed",
    "momentum", "optimistic", "record", "advance",
    // Financial-specific terms
    "dividend", "buyback", "repurchase", "accretive", "upside", "recovery", "rebound",
    "expansion", "robust", "accelerating", "overweight", "raised", "upgraded", "outpacing",
    "tailwind",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bearish", "decline", "loss", "fall", "plunge", "crash", "miss", "downgrade",
    "underperform", "weak", "negative", "drop", "decrease", "concern", "fail", "disappoint",
    "slump", "warning", "pessimistic", "retreat", "fear", "trouble",
    // Financial-specific terms
    "dilution", "dilutive", "headwind", "lawsuit", "litigation", "recall", "investigation",
    "probe", "default", "bankruptcy", "restructuring", "layoff", "downside", "overvalued",
    "bubble", "underweight", "lowered", "suspended",
];

const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "don't", "doesn't", "didn't", "isn't", "aren't", "wasn't", "weren't",
    "won't", "wouldn't", "couldn't", "shouldn't", "hardly", "barely", "neither", "nor",
    "without",
];

/// How many words back a negation flips polarity
const NEGATION_WINDOW: usize = 3;

/// Squashing constant for the raw hit sum, `x / sqrt(x^2 + alpha)`
const NORMALIZATION_ALPHA: f64 = 15.0;

/// Built-in word-list compound score, usable as the general sentiment signal
/// when upstream supplies none.
///
/// Works only on the article's upstream tokens, which already cover the title.
#[derive(Debug, Clone)]
pub struct LexiconSignal {
    positive: HashSet<&'static str>,
    negative: HashSet<&'static str>,
    negation: HashSet<&'static str>,
}

impl LexiconSignal {
    pub fn new() -> Self {
        Self {
            positive: POSITIVE_WORDS.iter().copied().collect(),
            negative: NEGATIVE_WORDS.iter().copied().collect(),
            negation: NEGATION_WORDS.iter().copied().collect(),
        }
    }

    /// Signed hit count with negation flips
    fn raw_score<'a, I>(&self, words: I) -> f64
    where
        I: IntoIterator<Item = &'a str>,
    {
        let words: Vec<String> = words.into_iter().map(|w| w.to_lowercase()).collect();

        let negation_positions: Vec<usize> = words
            .iter()
            .enumerate()
            .filter(|(_, w)| self.negation.contains(w.as_str()))
            .map(|(i, _)| i)
            .collect();

        let mut score: i32 = 0;
        for (i, word) in words.iter().enumerate() {
            let is_positive = self.positive.contains(word.as_str());
            let is_negative = self.negative.contains(word.as_str());
            if !is_positive && !is_negative {
                continue;
            }

            let negated = negation_positions
                .iter()
                .any(|&neg| neg < i && i - neg <= NEGATION_WINDOW);

            score += match (is_positive, negated) {
                (true, false) | (false, true) => 1,
                _ => -1,
            };
        }
        score as f64
    }

    /// Compound score in (-1, 1), `None` when no lexicon word appears.
    pub fn score_words<'a, I>(&self, words: I) -> Option<f64>
    where
        I: IntoIterator<Item = &'a str>,
    {
        squash(self.raw_score(words))
    }
}

fn squash(raw: f64) -> Option<f64> {
    if raw == 0.0 {
        return None;
    }
    Some(raw / (raw * raw + NORMALIZATION_ALPHA).sqrt())
}

impl Default for LexiconSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneralSentimentSource for LexiconSignal {
    fn name(&self) -> &str {
        "lexicon"
    }

    fn compound(&self, article: &ArticleInput) -> Option<f64> {
        self.score_words(article.tokens.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Utc;

    fn tokens(text: &str) -> Vec<&str> {
        text.split_whitespace().collect()
    }

    #[test]
    fn test_positive_and_negative_words() {
        let lexicon = LexiconSignal::new();
        assert!(lexicon.score_words(tokens("strong growth rally")).unwrap() > 0.0);
        assert!(lexicon.score_words(tokens("plunge after lawsuit")).unwrap() < 0.0);
        assert!(lexicon.score_words(tokens("quarterly meeting scheduled")).is_none());
    }

    #[test]
    fn test_negation_flips_polarity() {
        let lexicon = LexiconSignal::new();
        let plain = lexicon.score_words(tokens("results were strong")).unwrap();
        let negated = lexicon.score_words(tokens("results were not strong")).unwrap();
        assert_relative_eq!(plain, -negated);

        // Too far back to apply
        let distant = lexicon.score_words(tokens("not that the quarter was strong")).unwrap();
        assert!(distant > 0.0);
    }

    #[test]
    fn test_compound_is_bounded() {
        let lexicon = LexiconSignal::new();
        let many = vec!["surge"; 500];
        let score = lexicon.score_words(many).unwrap();
        assert!(score < 1.0 && score > 0.99);
        assert_relative_eq!(lexicon.score_words(["gain"]).unwrap(), 0.25);
    }

    #[test]
    fn test_compound_reads_tokens_not_raw_text() {
        let lexicon = LexiconSignal::new();
        let article = ArticleInput {
            article_id: "a".to_string(),
            title: "Shares surge! Rally! Gain!".to_string(),
            body: "Record growth".to_string(),
            published_at: Utc::now(),
            tokens: vec!["shares".to_string(), "decline".to_string()],
            keywords: None,
            general_signal: None,
        };
        assert_relative_eq!(lexicon.compound(&article).unwrap(), -0.25);

        let untokenized = ArticleInput { tokens: Vec::new(), ..article };
        assert!(lexicon.compound(&untokenized).is_none());
        assert_eq!(lexicon.name(), "lexicon");
    }
}
