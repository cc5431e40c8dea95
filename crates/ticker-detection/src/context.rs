use analysis_core::{ContextWindow, EngineConfig, TickerMention};
use std::collections::BTreeMap;
use std::ops::Range;

use crate::text;

/// Cuts a bounded window of text around each ticker mention, staying inside
/// the sentence that holds the mention.
#[derive(Debug, Clone, Copy)]
pub struct ContextExtractor {
    window: ContextWindow,
}

impl ContextExtractor {
    pub fn new(window: ContextWindow) -> Self {
        Self { window }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.context_window)
    }

    pub fn window(&self) -> ContextWindow {
        self.window
    }

    /// Context for a single mention. Offsets outside `text` yield an empty string.
    pub fn extract(&self, text: &str, mention: &TickerMention) -> String {
        let start = text::floor_char_boundary(text, mention.start);
        let end = text::ceil_char_boundary(text, mention.end.max(start));
        if start >= text.len() {
            return String::new();
        }

        let spans = text::sentence_spans(text);
        let sentence = text::sentence_containing(&spans, start, text.len());
        // A mention never gets cut, even if it runs past the sentence end
        let bounds = sentence.start.min(start)..sentence.end.max(end);

        let range = match self.window {
            ContextWindow::Chars(n) => char_window(text, &bounds, start..end, n),
            ContextWindow::Tokens(n) => token_window(text, &bounds, start..end, n),
        };
        text[range].trim().to_string()
    }

    /// One context per mention of `symbol`, in text order. Repeats are kept.
    pub fn extract_for_ticker(&self, text: &str, mentions: &[TickerMention], symbol: &str) -> Vec<String> {
        let mut own: Vec<&TickerMention> = mentions.iter().filter(|m| m.symbol == symbol).collect();
        own.sort_by_key(|m| m.start);
        own.into_iter().map(|m| self.extract(text, m)).collect()
    }

    /// Contexts for every mentioned ticker.
    pub fn extract_all(&self, text: &str, mentions: &[TickerMention]) -> BTreeMap<String, Vec<String>> {
        let mut ordered: Vec<&TickerMention> = mentions.iter().collect();
        ordered.sort_by_key(|m| m.start);

        let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for mention in ordered {
            out.entry(mention.symbol.clone())
                .or_default()
                .push(self.extract(text, mention));
        }
        out
    }
}

fn is_space_at(text: &str, offset: usize) -> bool {
    text[offset..].chars().next().map_or(true, char::is_whitespace)
}

fn is_space_before(text: &str, offset: usize) -> bool {
    text[..offset].chars().next_back().map_or(true, char::is_whitespace)
}

/// Up to `n` characters each side, snapped outward-in to whitespace so words
/// are not cut in half.
fn char_window(text: &str, bounds: &Range<usize>, mention: Range<usize>, n: usize) -> Range<usize> {
    let mut lo = match n {
        0 => mention.start,
        _ => text[bounds.start..mention.start]
            .char_indices()
            .rev()
            .nth(n - 1)
            .map_or(bounds.start, |(i, _)| bounds.start + i),
    };
    let mut hi = text[mention.end..bounds.end]
        .char_indices()
        .nth(n)
        .map_or(bounds.end, |(i, _)| mention.end + i);

    if lo > bounds.start && !is_space_before(text, lo) && !is_space_at(text, lo) {
        lo = text[lo..mention.start]
            .find(char::is_whitespace)
            .map_or(mention.start, |i| lo + i);
    }
    if hi < bounds.end && !is_space_before(text, hi) && !is_space_at(text, hi) {
        hi = text[mention.end..hi]
            .rfind(char::is_whitespace)
            .map_or(mention.end, |i| mention.end + i);
    }
    lo..hi
}

/// Up to `n` whitespace-separated tokens each side of the tokens the mention touches.
fn token_window(text: &str, bounds: &Range<usize>, mention: Range<usize>, n: usize) -> Range<usize> {
    let sentence = &text[bounds.clone()];
    let tokens: Vec<Range<usize>> = sentence
        .split_whitespace()
        .map(|tok| {
            // split_whitespace yields subslices, so the pointer offset is exact
            let offset = tok.as_ptr() as usize - sentence.as_ptr() as usize;
            bounds.start + offset..bounds.start + offset + tok.len()
        })
        .collect();

    let touching: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| t.start < mention.end && mention.start < t.end)
        .map(|(i, _)| i)
        .collect();
    let (Some(&first), Some(&last)) = (touching.first(), touching.last()) else {
        return mention;
    };

    let from = first.saturating_sub(n);
    let to = (last + n).min(tokens.len() - 1);
    tokens[from].start..tokens[to].end
}

fn lexicon_hits(context: &str, terms: &[String]) -> usize {
    let lower = context.to_ascii_lowercase();
    terms
        .iter()
        .map(|term| term.trim().to_ascii_lowercase())
        .filter(|term| !term.is_empty())
        .map(|term| text::word_occurrences(&lower, &term).count())
        .sum()
}

/// The context carrying the most positive plus negative lexicon terms. The
/// earliest context wins ties, so with no hits at all the first is returned.
pub fn most_relevant_context<'a>(
    contexts: &'a [String],
    positive: &[String],
    negative: &[String],
) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for context in contexts {
        let hits = lexicon_hits(context, positive) + lexicon_hits(context, negative);
        if best.map_or(true, |(_, top)| hits > top) {
            best = Some((context.as_str(), hits));
        }
    }
    best.map(|(context, _)| context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::MatchMethod;

    fn mention(text: &str, needle: &str, symbol: &str) -> TickerMention {
        let start = text.find(needle).unwrap();
        TickerMention {
            symbol: symbol.to_string(),
            confidence: 0.6,
            method: MatchMethod::CompanyName,
            start,
            end: start + needle.len(),
        }
    }

    #[test]
    fn test_stays_inside_sentence() {
        let text = "Apple rose. Tesla fell sharply on Monday after weak deliveries. Nvidia was flat.";
        let extractor = ContextExtractor::new(ContextWindow::Chars(150));
        let context = extractor.extract(text, &mention(text, "Tesla", "TSLA"));
        assert_eq!(context, "Tesla fell sharply on Monday after weak deliveries.");
    }

    #[test]
    fn test_char_window_snaps_to_words() {
        let text = "one two three Tesla four five six";
        let extractor = ContextExtractor::new(ContextWindow::Chars(8));
        let context = extractor.extract(text, &mention(text, "Tesla", "TSLA"));
        assert_eq!(context, "three Tesla four");
    }

    #[test]
    fn test_char_window_counts_characters_not_bytes() {
        let text = "Société Générale and Tesla both rallied";
        let extractor = ContextExtractor::new(ContextWindow::Chars(13));
        let context = extractor.extract(text, &mention(text, "Tesla", "TSLA"));
        assert_eq!(context, "Générale and Tesla both rallied");
    }

    #[test]
    fn test_token_window() {
        let text = "Shares of Microsoft Corporation jumped after the earnings call. Other news.";
        let extractor = ContextExtractor::new(ContextWindow::Tokens(2));
        let context = extractor.extract(text, &mention(text, "Microsoft Corporation", "MSFT"));
        assert_eq!(context, "Shares of Microsoft Corporation jumped after");
    }

    #[test]
    fn test_token_window_respects_sentence_end() {
        let text = "Markets closed. Tesla fell. Then more news followed.";
        let extractor = ContextExtractor::new(ContextWindow::Tokens(5));
        let context = extractor.extract(text, &mention(text, "Tesla", "TSLA"));
        assert_eq!(context, "Tesla fell.");
    }

    #[test]
    fn test_each_mention_gets_a_context() {
        let text = "Tesla beat estimates. Analysts cheered. Tesla beat estimates.";
        let first = mention(text, "Tesla", "TSLA");
        let second_start = text.rfind("Tesla").unwrap();
        let second = TickerMention {
            start: second_start,
            end: second_start + 5,
            ..first.clone()
        };
        let other = mention(text, "Analysts", "XYZ");

        let extractor = ContextExtractor::new(ContextWindow::Chars(150));
        let mentions = vec![second, other, first];
        let contexts = extractor.extract_for_ticker(text, &mentions, "TSLA");
        assert_eq!(contexts, vec!["Tesla beat estimates.", "Tesla beat estimates."]);

        let all = extractor.extract_all(text, &mentions);
        assert_eq!(all.len(), 2);
        assert_eq!(all["TSLA"].len(), 2);
        assert_eq!(all["XYZ"], vec!["Analysts cheered."]);
    }

    #[test]
    fn test_out_of_range_mention() {
        let extractor = ContextExtractor::new(ContextWindow::Chars(10));
        let bogus = TickerMention {
            symbol: "AAPL".to_string(),
            confidence: 1.0,
            method: MatchMethod::Cashtag,
            start: 50,
            end: 55,
        };
        assert_eq!(extractor.extract("short", &bogus), "");
    }

    #[test]
    fn test_most_relevant_context() {
        let contexts = vec![
            "Tesla opened the new plant".to_string(),
            "Tesla stock surged on strong profit growth".to_string(),
            "Tesla faced a loss".to_string(),
        ];
        let positive = vec!["surged".to_string(), "strong".to_string(), "growth".to_string()];
        let negative = vec!["loss".to_string()];

        assert_eq!(
            most_relevant_context(&contexts, &positive, &negative),
            Some("Tesla stock surged on strong profit growth")
        );
        assert_eq!(most_relevant_context(&contexts, &[], &[]), Some("Tesla opened the new plant"));
        assert_eq!(most_relevant_context(&[], &positive, &negative), None);
    }
}
