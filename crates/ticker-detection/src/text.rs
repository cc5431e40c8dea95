//! Sentence segmentation and word-boundary helpers shared by the matcher and
//! the context extractor. All ranges are byte offsets on char boundaries.

use std::ops::Range;

/// Words that end with a period without ending the sentence
const ABBREVIATIONS: &[&str] = &[
    "inc", "corp", "co", "ltd", "plc", "bros", "mr", "mrs", "ms", "dr", "st", "jr", "sr",
    "vs", "no", "u.s", "u.k", "e.g", "i.e", "jan", "feb", "mar", "apr", "jun", "jul", "aug",
    "sep", "sept", "oct", "nov", "dec",
];

fn is_abbreviation(preceding: &str) -> bool {
    let word = preceding
        .rsplit(|c: char| c.is_whitespace() || c == '(' || c == '"')
        .next()
        .unwrap_or("");
    let mut chars = word.chars();
    match (chars.next(), chars.next()) {
        (None, _) => false,
        // Initials: "Arthur J. Gallagher", "A. O. Smith"
        (Some(c), None) => c.is_alphabetic(),
        _ => ABBREVIATIONS.contains(&word.to_ascii_lowercase().as_str()),
    }
}

fn push_trimmed(spans: &mut Vec<Range<usize>>, text: &str, start: usize, end: usize) {
    let segment = &text[start..end];
    let lead = segment.len() - segment.trim_start().len();
    let trail = segment.len() - segment.trim_end().len();
    if lead + trail < segment.len() {
        spans.push(start + lead..end - trail);
    }
}

/// Split `text` into sentence ranges. A sentence ends at a line break or at
/// `.`/`!`/`?` followed by whitespace, except after a known abbreviation.
pub fn sentence_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let end = match c {
            '\n' | '\r' => Some(i),
            '.' | '!' | '?' => {
                let at_break = chars.peek().map_or(true, |&(_, next)| next.is_whitespace());
                if at_break && !(c == '.' && is_abbreviation(&text[start..i])) {
                    Some(i + 1)
                } else {
                    None
                }
            }
            _ => None,
        };

        if let Some(end) = end {
            push_trimmed(&mut spans, text, start, end);
            start = i + c.len_utf8();
        }
    }
    push_trimmed(&mut spans, text, start, text.len());
    spans
}

/// The sentence holding `offset`, or the whole text when it falls between sentences.
pub fn sentence_containing(spans: &[Range<usize>], offset: usize, text_len: usize) -> Range<usize> {
    let idx = spans.partition_point(|s| s.end <= offset);
    match spans.get(idx) {
        Some(span) if span.start <= offset => span.clone(),
        _ => 0..text_len,
    }
}

/// True when `text[start..end]` is not glued to a letter or digit on either side.
pub fn is_word_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

/// Byte offsets of every whole-word occurrence of `needle` in `haystack`.
pub fn word_occurrences<'a>(haystack: &'a str, needle: &'a str) -> impl Iterator<Item = usize> + 'a {
    haystack
        .match_indices(needle)
        .map(|(pos, _)| pos)
        .filter(move |&pos| is_word_bounded(haystack, pos, pos + needle.len()))
}

/// Move `offset` down to the nearest char boundary.
pub fn floor_char_boundary(text: &str, mut offset: usize) -> usize {
    offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Move `offset` up to the nearest char boundary.
pub fn ceil_char_boundary(text: &str, mut offset: usize) -> usize {
    offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset += 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentences(text: &str) -> Vec<&str> {
        sentence_spans(text).into_iter().map(|r| &text[r]).collect()
    }

    #[test]
    fn test_splits_on_terminators_and_newlines() {
        let text = "Apple rose. Tesla fell!\nIs Nvidia next? Maybe";
        assert_eq!(
            sentences(text),
            vec!["Apple rose.", "Tesla fell!", "Is Nvidia next?", "Maybe"]
        );
    }

    #[test]
    fn test_abbreviations_do_not_split() {
        let text = "Apple Inc. shares rose. Arthur J. Gallagher & Co. was flat.";
        assert_eq!(
            sentences(text),
            vec!["Apple Inc. shares rose.", "Arthur J. Gallagher & Co. was flat."]
        );
    }

    #[test]
    fn test_decimal_points_do_not_split() {
        assert_eq!(sentences("Revenue grew 5.5% to $3.2B. Guidance held."), vec![
            "Revenue grew 5.5% to $3.2B.",
            "Guidance held."
        ]);
    }

    #[test]
    fn test_sentence_containing_offset() {
        let text = "First one. Second one.";
        let spans = sentence_spans(text);
        let second = text.find("Second").unwrap();
        assert_eq!(&text[sentence_containing(&spans, second, text.len())], "Second one.");
        // The gap between sentences falls back to the whole text
        assert_eq!(sentence_containing(&spans, 10, text.len()), 0..text.len());
    }

    #[test]
    fn test_word_boundaries() {
        let text = "targets target's Target";
        let hits: Vec<usize> = word_occurrences(&text.to_ascii_lowercase(), "target")
            .collect::<Vec<_>>();
        assert_eq!(hits, vec![8, 17]);
    }

    #[test]
    fn test_char_boundary_helpers() {
        let text = "né";
        assert_eq!(floor_char_boundary(text, 2), 1);
        assert_eq!(ceil_char_boundary(text, 2), 3);
        assert_eq!(ceil_char_boundary(text, 10), 3);
    }
}
