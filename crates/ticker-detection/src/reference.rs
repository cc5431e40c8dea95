use analysis_core::{AnalysisError, MatchMethod, TickerRecord};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Tickers that are also ordinary words or single letters. A bare occurrence
/// of one of these only counts when written in capitals next to a cashtag or
/// in a sentence that also names the company.
pub const DEFAULT_COLLISION_WORDS: &[&str] = &[
    "A", "C", "D", "F", "J", "K", "L", "O", "T", "V",
    "ALL", "AN", "ARE", "BE", "BIG", "CAN", "CAT", "DO", "EAT", "FOR", "FUN", "GO", "HAS",
    "IT", "KEY", "LOW", "MAN", "NEW", "NOW", "ON", "ONE", "OR", "OUT", "PEAK", "REAL",
    "SEE", "SO", "TECH", "TWO", "UP", "WELL", "YOU", "BALL", "CASH", "GOOD", "LIFE",
];

/// Company-name fragments that are everyday words. They need financial wording
/// nearby before they count as a confident company mention.
pub const DEFAULT_AMBIGUOUS_NAMES: &[&str] = &[
    "target", "apple", "amazon", "gap", "best", "oracle", "meta", "block", "ball", "visa",
    "progressive", "southern", "general", "discover", "match", "ford", "shell", "square",
    "snap", "zoom", "crown", "corning",
];

/// First words too generic to identify a company on their own
const GENERIC_FIRST_WORDS: &[&str] = &[
    "general", "block", "american", "united", "first", "national", "international",
    "global", "the", "new", "southern", "northern", "western", "eastern", "royal",
];

const CORPORATE_SUFFIXES: &[&str] = &[
    "inc.", "inc", "incorporated", "corporation", "corp.", "corp", "company", "co.", "co",
    "ltd.", "ltd", "limited", "plc", "n.v.", "s.a.", "ag", "se", "llc", "l.p.", "lp",
];

const MIN_FRAGMENT_LEN: usize = 3;
const MIN_FIRST_WORD_LEN: usize = 4;

/// A lowercase name fragment that identifies exactly one ticker
#[derive(Debug, Clone, PartialEq)]
pub struct NameFragment {
    pub text: String,
    pub symbol: String,
    pub method: MatchMethod,
}

/// Read-only reference data for one matching pass.
#[derive(Debug, Clone)]
pub struct TickerTable {
    records: Vec<TickerRecord>,
    by_symbol: HashMap<String, usize>,
    fragments: Vec<NameFragment>,
    collision_words: HashSet<String>,
    ambiguous_names: HashSet<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TableFile {
    Records(Vec<TickerRecord>),
    CompanyMap(BTreeMap<String, String>),
}

impl TickerTable {
    pub fn from_records(records: Vec<TickerRecord>) -> Result<Self, AnalysisError> {
        let mut by_symbol = HashMap::with_capacity(records.len());
        let mut cleaned = Vec::with_capacity(records.len());

        for mut record in records {
            record.symbol = record.symbol.trim().to_ascii_uppercase();
            record.company_name = record.company_name.trim().to_string();
            if record.symbol.is_empty() {
                return Err(AnalysisError::InvalidData(format!(
                    "ticker record for {:?} has an empty symbol",
                    record.company_name
                )));
            }
            if !record.priority.is_finite() {
                return Err(AnalysisError::InvalidData(format!(
                    "ticker {} has a non-finite priority",
                    record.symbol
                )));
            }
            if by_symbol.contains_key(&record.symbol) {
                return Err(AnalysisError::InvalidData(format!(
                    "duplicate ticker symbol {}",
                    record.symbol
                )));
            }
            by_symbol.insert(record.symbol.clone(), cleaned.len());
            cleaned.push(record);
        }

        let fragments = resolve_fragments(&cleaned);
        tracing::info!(
            "Loaded {} tickers ({} active) with {} name fragments",
            cleaned.len(),
            cleaned.iter().filter(|r| r.active).count(),
            fragments.len()
        );

        Ok(Self {
            records: cleaned,
            by_symbol,
            fragments,
            collision_words: DEFAULT_COLLISION_WORDS.iter().map(|w| w.to_string()).collect(),
            ambiguous_names: DEFAULT_AMBIGUOUS_NAMES.iter().map(|w| w.to_string()).collect(),
        })
    }

    /// Build from a plain `symbol -> company name` map.
    pub fn from_company_map<I, S, N>(map: I) -> Result<Self, AnalysisError>
    where
        I: IntoIterator<Item = (S, N)>,
        S: Into<String>,
        N: Into<String>,
    {
        Self::from_records(
            map.into_iter()
                .map(|(symbol, name)| TickerRecord::new(symbol, name))
                .collect(),
        )
    }

    /// Parse either a JSON array of records or a `{"AAPL": "Apple Inc.", ...}` object.
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        let file: TableFile = serde_json::from_str(json)
            .map_err(|e| AnalysisError::InvalidData(format!("ticker table: {e}")))?;
        match file {
            TableFile::Records(records) => Self::from_records(records),
            TableFile::CompanyMap(map) => Self::from_company_map(map),
        }
    }

    /// Replace the collision word list. Words are compared in upper case.
    pub fn with_collision_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.collision_words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_ascii_uppercase())
            .collect();
        self
    }

    /// Replace the ambiguous company word list. Words are compared in lower case.
    pub fn with_ambiguous_names<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ambiguous_names = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_ascii_lowercase())
            .collect();
        self
    }

    /// Active record for `symbol` (case-insensitive)
    pub fn get(&self, symbol: &str) -> Option<&TickerRecord> {
        let idx = *self.by_symbol.get(&symbol.to_ascii_uppercase())?;
        self.records.get(idx).filter(|r| r.active)
    }

    pub fn is_collision_word(&self, symbol: &str) -> bool {
        self.collision_words.contains(symbol)
    }

    pub fn is_ambiguous_name(&self, fragment: &str) -> bool {
        self.ambiguous_names.contains(fragment)
    }

    pub fn fragments(&self) -> &[NameFragment] {
        &self.fragments
    }

    pub fn records(&self) -> &[TickerRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_parentheticals(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut depth = 0usize;
    for c in s.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// "Amazon.com Inc." -> "amazon", "Block, Inc." -> "block", "Alphabet Inc. (Class A)" -> "alphabet"
fn strip_corporate_suffixes(name_lower: &str) -> String {
    let without_parens = strip_parentheticals(name_lower);
    let mut words: Vec<&str> = without_parens
        .split_whitespace()
        .map(|w| w.trim_end_matches(','))
        .filter(|w| !w.is_empty())
        .collect();
    while words.len() > 1 && words.last().is_some_and(|w| CORPORATE_SUFFIXES.contains(w)) {
        words.pop();
    }
    let joined = words.join(" ");
    joined.strip_suffix(".com").unwrap_or(&joined).to_string()
}

/// Candidate fragments for one record, longest first
fn name_variants(record: &TickerRecord) -> Vec<(String, MatchMethod)> {
    let mut variants = Vec::new();
    let full = collapse_whitespace(&record.company_name.to_lowercase());
    variants.push((full.clone(), MatchMethod::CompanyName));

    let stripped = strip_corporate_suffixes(&full);
    if stripped != full {
        variants.push((stripped.clone(), MatchMethod::CompanyName));
    }

    if let Some(first) = stripped.split_whitespace().next() {
        let first = first.trim_end_matches(|c: char| !c.is_alphanumeric());
        if first != stripped
            && first.chars().count() >= MIN_FIRST_WORD_LEN
            && !GENERIC_FIRST_WORDS.contains(&first)
        {
            variants.push((first.to_string(), MatchMethod::PartialName));
        }
    }

    for alias in &record.aliases {
        let alias = collapse_whitespace(&alias.to_lowercase());
        if !alias.is_empty() {
            variants.push((alias, MatchMethod::CompanyName));
        }
    }

    variants
        .into_iter()
        .filter(|(text, _)| text.chars().count() >= MIN_FRAGMENT_LEN)
        .collect()
}

/// Give every fragment exactly one owner. A fragment claimed by several
/// tickers goes to the strictly highest priority record or to nobody.
fn resolve_fragments(records: &[TickerRecord]) -> Vec<NameFragment> {
    let mut claims: BTreeMap<String, Vec<(usize, MatchMethod)>> = BTreeMap::new();
    for (idx, record) in records.iter().enumerate().filter(|(_, r)| r.active) {
        for (text, method) in name_variants(record) {
            let owners = claims.entry(text).or_default();
            match owners.iter_mut().find(|(owner, _)| *owner == idx) {
                Some(existing) => existing.1 = existing.1.min(method),
                None => owners.push((idx, method)),
            }
        }
    }

    let mut fragments = Vec::with_capacity(claims.len());
    for (text, owners) in claims {
        let best = owners
            .iter()
            .map(|&(idx, _)| records[idx].priority)
            .fold(f64::NEG_INFINITY, f64::max);
        let top: Vec<_> = owners
            .iter()
            .filter(|&&(idx, _)| records[idx].priority == best)
            .collect();

        match top.as_slice() {
            [(idx, method)] => fragments.push(NameFragment {
                text,
                symbol: records[*idx].symbol.clone(),
                method: *method,
            }),
            _ => tracing::debug!(
                fragment = %text,
                claimants = top.len(),
                "dropping name fragment shared by equal-priority tickers"
            ),
        }
    }

    // Longest first so overlapping matches can prefer the longer fragment
    fragments.sort_by(|a, b| b.text.len().cmp(&a.text.len()).then_with(|| a.text.cmp(&b.text)));
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment_texts(table: &TickerTable, symbol: &str) -> Vec<String> {
        let mut texts: Vec<String> = table
            .fragments()
            .iter()
            .filter(|f| f.symbol == symbol)
            .map(|f| f.text.clone())
            .collect();
        texts.sort();
        texts
    }

    #[test]
    fn test_suffix_stripping() {
        assert_eq!(strip_corporate_suffixes("apple inc."), "apple");
        assert_eq!(strip_corporate_suffixes("amazon.com inc."), "amazon");
        assert_eq!(strip_corporate_suffixes("block, inc."), "block");
        assert_eq!(strip_corporate_suffixes("alphabet inc. (class a)"), "alphabet");
        assert_eq!(strip_corporate_suffixes("johnson & johnson"), "johnson & johnson");
        assert_eq!(strip_corporate_suffixes("campbell's company (the)"), "campbell's");
    }

    #[test]
    fn test_name_variants() {
        let table = TickerTable::from_records(vec![
            TickerRecord::new("NVDA", "NVIDIA Corporation"),
            TickerRecord::new("AXP", "American Express"),
            TickerRecord::new("GOOGL", "Alphabet Inc.").with_alias("Google"),
        ])
        .unwrap();

        assert_eq!(fragment_texts(&table, "NVDA"), vec!["nvidia", "nvidia corporation"]);
        // "american" is too generic to stand alone
        assert_eq!(fragment_texts(&table, "AXP"), vec!["american express"]);
        assert_eq!(
            fragment_texts(&table, "GOOGL"),
            vec!["alphabet", "alphabet inc.", "google"]
        );

        let nvidia = table.fragments().iter().find(|f| f.text == "nvidia").unwrap();
        assert_eq!(nvidia.method, MatchMethod::CompanyName);
    }

    #[test]
    fn test_first_word_is_partial_match() {
        let table = TickerTable::from_records(vec![TickerRecord::new(
            "MSFT",
            "Microsoft Corporation",
        )])
        .unwrap();
        assert_eq!(fragment_texts(&table, "MSFT"), vec!["microsoft", "microsoft corporation"]);

        let table = TickerTable::from_records(vec![TickerRecord::new("BKNG", "Booking Holdings")])
            .unwrap();
        let booking = table.fragments().iter().find(|f| f.text == "booking").unwrap();
        assert_eq!(booking.method, MatchMethod::PartialName);
    }

    #[test]
    fn test_shared_fragment_goes_to_higher_priority() {
        let table = TickerTable::from_records(vec![
            TickerRecord::new("GOOGL", "Alphabet Inc. (Class A)").with_priority(2.0),
            TickerRecord::new("GOOG", "Alphabet Inc. (Class C)"),
        ])
        .unwrap();
        let alphabet = table.fragments().iter().find(|f| f.text == "alphabet").unwrap();
        assert_eq!(alphabet.symbol, "GOOGL");
    }

    #[test]
    fn test_shared_fragment_with_equal_priority_is_dropped() {
        let table = TickerTable::from_records(vec![
            TickerRecord::new("GOOGL", "Alphabet Inc. (Class A)"),
            TickerRecord::new("GOOG", "Alphabet Inc. (Class C)"),
        ])
        .unwrap();
        assert!(table.fragments().iter().all(|f| f.text != "alphabet"));
    }

    #[test]
    fn test_inactive_records_are_not_looked_up() {
        let table = TickerTable::from_records(vec![
            TickerRecord::new("AAPL", "Apple Inc."),
            TickerRecord::new("TWTR", "Twitter").inactive(),
        ])
        .unwrap();
        assert!(table.get("aapl").is_some());
        assert!(table.get("TWTR").is_none());
        assert!(fragment_texts(&table, "TWTR").is_empty());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_duplicate_and_empty_symbols_rejected() {
        let dup = TickerTable::from_records(vec![
            TickerRecord::new("AAPL", "Apple Inc."),
            TickerRecord::new("aapl", "Apple"),
        ]);
        assert!(matches!(dup, Err(AnalysisError::InvalidData(_))));

        let empty = TickerTable::from_records(vec![TickerRecord::new(" ", "Nothing")]);
        assert!(empty.is_err());
    }

    #[test]
    fn test_from_json_accepts_both_layouts() {
        let records = TickerTable::from_json(
            r#"[{"symbol":"AAPL","company_name":"Apple Inc.","aliases":["iPhone maker"]}]"#,
        )
        .unwrap();
        assert!(records.get("AAPL").is_some());
        assert_eq!(fragment_texts(&records, "AAPL"), vec!["apple", "apple inc.", "iphone maker"]);

        let map = TickerTable::from_json(r#"{"TSLA":"Tesla Inc.","MSFT":"Microsoft"}"#).unwrap();
        assert_eq!(map.len(), 2);
        assert!(map.get("TSLA").is_some());

        assert!(TickerTable::from_json("42").is_err());
    }

    #[test]
    fn test_collision_word_override() {
        let table = TickerTable::from_records(vec![TickerRecord::new("IT", "Gartner")])
            .unwrap();
        assert!(table.is_collision_word("IT"));
        let table = table.with_collision_words(["now"]);
        assert!(!table.is_collision_word("IT"));
        assert!(table.is_collision_word("NOW"));
    }
}
