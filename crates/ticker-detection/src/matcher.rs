use analysis_core::{AnalysisError, EngineConfig, MatchMethod, TickerMention};
use regex::Regex;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::Arc;

use crate::reference::TickerTable;
use crate::text;

pub const CASHTAG_CONFIDENCE: f64 = 1.0;
pub const SYMBOL_TOKEN_CONFIDENCE: f64 = 0.8;
pub const COMPANY_NAME_CONFIDENCE: f64 = 0.6;
/// Ambiguous company word with no financial wording nearby
pub const AMBIGUOUS_NAME_CONFIDENCE: f64 = 0.25;

/// Bare symbols shorter than this must appear exactly as written (upper case)
const CASE_INSENSITIVE_MIN_LEN: usize = 4;
/// Bytes searched on each side of an ambiguous name for financial wording
const FINANCIAL_CONTEXT_RADIUS: usize = 100;

const FINANCIAL_CONTEXT_WORDS: &[&str] = &[
    "stock", "stocks", "share", "shares", "shareholders", "trading", "traded", "market",
    "markets", "price", "nasdaq", "nyse", "dow", "s&p", "earnings", "revenue", "investor",
    "investors", "wall street", "analyst", "analysts", "ticker", "dividend", "quarter",
    "quarterly", "guidance", "valuation", "ipo",
];

const CASHTAG_PATTERN: &str = r"\$([A-Z]{1,5}(?:\.[A-Z])?)\b";
const WORD_PATTERN: &str = r"\b[A-Za-z][A-Za-z0-9]*(?:\.[A-Z]\b)?";

/// Finds ticker mentions in cleaned article text.
///
/// Strategies run in priority order (cashtag, company name, bare symbol),
/// their hits are unioned and de-duplicated per `(symbol, start)` keeping the
/// most confident method, and anything under the confidence floor is dropped.
#[derive(Debug, Clone)]
pub struct TickerMatcher {
    table: Arc<TickerTable>,
    min_confidence: f64,
    cashtag_re: Regex,
    word_re: Regex,
    /// One case-insensitive pattern per table fragment, same order
    name_res: Vec<Regex>,
}

/// All mentions of one ticker in one article
#[derive(Debug, Clone, PartialEq)]
pub struct TickerHits {
    pub symbol: String,
    /// Highest mention confidence
    pub confidence: f64,
    /// Method that produced the highest confidence
    pub method: MatchMethod,
    /// Mentions in text order
    pub mentions: Vec<TickerMention>,
}

struct WordToken {
    range: Range<usize>,
    after_dollar: bool,
}

impl TickerMatcher {
    pub fn new(table: Arc<TickerTable>, min_confidence: f64) -> Result<Self, AnalysisError> {
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(AnalysisError::Configuration(format!(
                "min_mention_confidence must be in [0, 1] (got {min_confidence})"
            )));
        }
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| AnalysisError::Configuration(format!("bad pattern {pattern}: {e}")))
        };
        let name_res = table
            .fragments()
            .iter()
            .map(|fragment| compile(&fragment_pattern(&fragment.text)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            table,
            min_confidence,
            cashtag_re: compile(CASHTAG_PATTERN)?,
            word_re: compile(WORD_PATTERN)?,
            name_res,
        })
    }

    pub fn from_config(table: Arc<TickerTable>, config: &EngineConfig) -> Result<Self, AnalysisError> {
        Self::new(table, config.min_mention_confidence)
    }

    pub fn table(&self) -> &TickerTable {
        &self.table
    }

    /// Every mention at or above the confidence floor, ordered by descending
    /// confidence, then symbol, then position.
    pub fn find_mentions(&self, text: &str) -> Vec<TickerMention> {
        if text.is_empty() {
            return Vec::new();
        }
        let sentences = text::sentence_spans(text);

        let cashtags = self.match_cashtags(text);
        let names = self.match_company_names(text);
        let symbols = self.match_symbol_tokens(text, &sentences, &cashtags, &names);

        let mut best: HashMap<(String, usize), TickerMention> = HashMap::new();
        for mention in cashtags.into_iter().chain(names).chain(symbols) {
            let key = (mention.symbol.clone(), mention.start);
            match best.get(&key) {
                Some(existing) if !outranks(&mention, existing) => {}
                _ => {
                    best.insert(key, mention);
                }
            }
        }

        let mut mentions: Vec<TickerMention> = best
            .into_values()
            .filter(|m| m.confidence >= self.min_confidence)
            .collect();
        mentions.sort_by(mention_order);

        tracing::debug!(mentions = mentions.len(), "ticker matching complete");
        mentions
    }

    /// Mentions grouped per ticker, ordered like `find_mentions`.
    pub fn detect(&self, text: &str) -> Vec<TickerHits> {
        summarize_mentions(self.find_mentions(text))
    }

    fn match_cashtags(&self, text: &str) -> Vec<TickerMention> {
        self.cashtag_re
            .captures_iter(text)
            .filter_map(|cap| {
                let whole = cap.get(0)?;
                let record = self.table.get(cap.get(1)?.as_str())?;
                Some(TickerMention {
                    symbol: record.symbol.clone(),
                    confidence: CASHTAG_CONFIDENCE,
                    method: MatchMethod::Cashtag,
                    start: whole.start(),
                    end: whole.end(),
                })
            })
            .collect()
    }

    /// Company-name fragments, case-insensitive and on word boundaries. Where
    /// fragments overlap, the longest one wins.
    fn match_company_names(&self, text: &str) -> Vec<TickerMention> {
        // ASCII lowering keeps byte offsets identical to `text`
        let lower = text.to_ascii_lowercase();

        // Fragments are stored longest first, so a stable sort by length keeps
        // that order and overlapping shorter hits lose.
        let mut hits: Vec<(usize, usize, usize)> = Vec::new(); // (fragment idx, start, end)
        for (idx, re) in self.name_res.iter().enumerate() {
            hits.extend(
                re.find_iter(text)
                    .filter(|m| text::is_word_bounded(text, m.start(), m.end()))
                    .map(|m| (idx, m.start(), m.end())),
            );
        }
        hits.sort_by(|a, b| (b.2 - b.1).cmp(&(a.2 - a.1)).then(a.1.cmp(&b.1)));

        let mut taken: Vec<Range<usize>> = Vec::new();
        let mut mentions = Vec::new();
        for (idx, start, end) in hits {
            if taken.iter().any(|r| r.start < end && start < r.end) {
                continue;
            }
            taken.push(start..end);

            let fragment = &self.table.fragments()[idx];
            let confidence = if self.table.is_ambiguous_name(&fragment.text)
                && !has_financial_context(&lower, start, end)
            {
                AMBIGUOUS_NAME_CONFIDENCE
            } else {
                COMPANY_NAME_CONFIDENCE
            };
            mentions.push(TickerMention {
                symbol: fragment.symbol.clone(),
                confidence,
                method: fragment.method,
                start,
                end,
            });
        }
        mentions
    }

    fn match_symbol_tokens(
        &self,
        text: &str,
        sentences: &[Range<usize>],
        cashtags: &[TickerMention],
        names: &[TickerMention],
    ) -> Vec<TickerMention> {
        let bytes = text.as_bytes();
        let tokens: Vec<WordToken> = self
            .word_re
            .find_iter(text)
            .map(|m| WordToken {
                range: m.range(),
                after_dollar: m.start() > 0 && bytes[m.start() - 1] == b'$',
            })
            .collect();
        // Cashtag spans start at the '$', the word token one byte later
        let cashtag_words: HashSet<usize> = cashtags.iter().map(|m| m.start + 1).collect();

        let mut mentions = Vec::new();
        for (i, token) in tokens.iter().enumerate() {
            if token.after_dollar {
                continue;
            }
            let word = &text[token.range.clone()];
            let Some(record) = self.table.get(word) else {
                continue;
            };
            let symbol = record.symbol.as_str();
            let exact = word == symbol;

            if symbol.len() < CASE_INSENSITIVE_MIN_LEN && !exact {
                continue;
            }

            if self.table.is_collision_word(symbol) {
                let sentence = text::sentence_containing(sentences, token.range.start, text.len());
                let in_sentence = |t: &WordToken| sentence.contains(&t.range.start);
                let next_to_cashtag = [i.checked_sub(1), i.checked_add(1)]
                    .into_iter()
                    .flatten()
                    .filter_map(|j| tokens.get(j))
                    .any(|t| in_sentence(t) && cashtag_words.contains(&t.range.start));
                let named_in_sentence = names.iter().any(|m| {
                    m.symbol == symbol
                        && m.confidence >= COMPANY_NAME_CONFIDENCE
                        && sentence.contains(&m.start)
                });

                if !exact || !(next_to_cashtag || named_in_sentence) {
                    tracing::trace!(symbol, offset = token.range.start, "skipping collision word");
                    continue;
                }
            }

            mentions.push(TickerMention {
                symbol: symbol.to_string(),
                confidence: SYMBOL_TOKEN_CONFIDENCE,
                method: MatchMethod::SymbolToken,
                start: token.range.start,
                end: token.range.end,
            });
        }
        mentions
    }
}

/// Unicode case-insensitive, any run of whitespace between words
fn fragment_pattern(fragment: &str) -> String {
    let words: Vec<String> = fragment.split_whitespace().map(regex::escape).collect();
    format!("(?i){}", words.join(r"\s+"))
}

fn has_financial_context(lower: &str, start: usize, end: usize) -> bool {
    let from = text::floor_char_boundary(lower, start.saturating_sub(FINANCIAL_CONTEXT_RADIUS));
    let to = text::ceil_char_boundary(lower, end + FINANCIAL_CONTEXT_RADIUS);
    let window = &lower[from..to];
    FINANCIAL_CONTEXT_WORDS
        .iter()
        .any(|word| text::word_occurrences(window, word).next().is_some())
}

/// `a` replaces `b` for the same (symbol, start) key
fn outranks(a: &TickerMention, b: &TickerMention) -> bool {
    match a.confidence.partial_cmp(&b.confidence) {
        Some(Ordering::Greater) => true,
        Some(Ordering::Equal) => a.method < b.method,
        _ => false,
    }
}

fn mention_order(a: &TickerMention, b: &TickerMention) -> Ordering {
    b.confidence
        .partial_cmp(&a.confidence)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.symbol.cmp(&b.symbol))
        .then_with(|| a.start.cmp(&b.start))
}

/// Group mentions per ticker. Groups are ordered by descending best
/// confidence, then symbol.
pub fn summarize_mentions(mentions: Vec<TickerMention>) -> Vec<TickerHits> {
    let mut groups: HashMap<String, Vec<TickerMention>> = HashMap::new();
    for mention in mentions {
        groups.entry(mention.symbol.clone()).or_default().push(mention);
    }

    let mut hits: Vec<TickerHits> = groups
        .into_iter()
        .filter_map(|(symbol, mut mentions)| {
            let top = mentions.iter().min_by(|a, b| mention_order(a, b))?.clone();
            mentions.sort_by_key(|m| m.start);
            Some(TickerHits {
                symbol,
                confidence: top.confidence,
                method: top.method,
                mentions,
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    hits
}
