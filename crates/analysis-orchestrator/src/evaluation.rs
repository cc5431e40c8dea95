//! Offline quality checks against hand-labelled samples.

use analysis_core::Recommendation;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Human label for an article's tone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl From<Recommendation> for SentimentLabel {
    fn from(rec: Recommendation) -> Self {
        match rec {
            Recommendation::Buy => SentimentLabel::Positive,
            Recommendation::Sell => SentimentLabel::Negative,
            Recommendation::Hold => SentimentLabel::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_negatives: usize,
}

impl ConfusionCounts {
    pub fn record(&mut self, predicted: bool, actual: bool) {
        match (predicted, actual) {
            (true, true) => self.true_positives += 1,
            (true, false) => self.false_positives += 1,
            (false, true) => self.false_negatives += 1,
            (false, false) => self.true_negatives += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.false_negatives + self.true_negatives
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r > 0.0 {
            2.0 * p * r / (p + r)
        } else {
            0.0
        }
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    pub fn metrics(&self) -> EvaluationMetrics {
        EvaluationMetrics {
            counts: *self,
            precision: self.precision(),
            recall: self.recall(),
            f1: self.f1(),
            accuracy: self.accuracy(),
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub counts: ConfusionCounts,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub accuracy: f64,
}

/// Score recommendations against labels with Positive as the positive class:
/// a Buy on a Positive article is a true positive, anything else on a
/// Positive article a false negative.
pub fn evaluate_recommendations(pairs: &[(Recommendation, SentimentLabel)]) -> EvaluationMetrics {
    let mut counts = ConfusionCounts::default();
    for &(recommendation, label) in pairs {
        counts.record(
            SentimentLabel::from(recommendation) == SentimentLabel::Positive,
            label == SentimentLabel::Positive,
        );
    }
    counts.metrics()
}

/// Micro-averaged ticker detection quality over `(detected, expected)` pairs.
/// A text where nothing was expected and nothing was found is a true negative.
pub fn evaluate_detection<S: AsRef<str>>(cases: &[(Vec<S>, Vec<S>)]) -> EvaluationMetrics {
    let mut counts = ConfusionCounts::default();
    for (detected, expected) in cases {
        let detected: HashSet<String> = detected.iter().map(|s| s.as_ref().to_ascii_uppercase()).collect();
        let expected: HashSet<String> = expected.iter().map(|s| s.as_ref().to_ascii_uppercase()).collect();

        if detected.is_empty() && expected.is_empty() {
            counts.true_negatives += 1;
            continue;
        }
        counts.true_positives += detected.intersection(&expected).count();
        counts.false_positives += detected.difference(&expected).count();
        counts.false_negatives += expected.difference(&detected).count();
    }
    counts.metrics()
}
