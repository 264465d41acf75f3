//! Query-focused extraction: keep the sentences of a long text that best
//! match the query, within a character budget.

use super::keywords::extract_keywords;
use once_cell::sync::Lazy;
use regex::Regex;

static SENTENCE_END_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+\s+").expect("valid sentence pattern"));

/// Marker appended to truncated text.
pub const ELLIPSIS: &str = "...";

/// Sentences this short or shorter are noise (list bullets, initials).
const MIN_SENTENCE_LEN: usize = 10;

struct ScoredSentence<'a> {
    text: &'a str,
    score: f64,
}

/// Reduce `text` to at most `max_chars` bytes, favouring sentences that
/// mention the query's keywords.
///
/// Text already within budget is returned unchanged. Without usable
/// keywords, or when the selected sentences cover less than a third of the
/// budget, the text is word-truncated instead.
pub fn extract_relevant(text: &str, query: &str, max_chars: usize) -> String {
    if text.len() <= max_chars {
        return text.to_string();
    }

    let keywords = extract_keywords(query);
    if keywords.is_empty() {
        return truncate_words(text, max_chars);
    }

    let mut scored: Vec<ScoredSentence<'_>> = split_sentences(text)
        .into_iter()
        .map(|sentence| ScoredSentence {
            text: sentence,
            score: score_sentence(sentence, &keywords),
        })
        .collect();

    // Stable: equal scores keep document order
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut result = String::with_capacity(max_chars);
    let mut total = 0;
    for sentence in &scored {
        let len = sentence.text.len();
        if total + len + 2 <= max_chars {
            result.push_str(sentence.text);
            result.push(' ');
            total += len + 1;
        }
    }

    let extracted = result.trim();
    if extracted.len() < max_chars / 3 {
        return truncate_words(text, max_chars);
    }

    extracted.to_string()
}

/// Split on runs of `.`, `!` or `?` followed by whitespace, dropping
/// fragments of ten characters or fewer.
pub fn split_sentences(text: &str) -> Vec<&str> {
    SENTENCE_END_RE
        .split(text)
        .map(str::trim)
        .filter(|s| s.len() > MIN_SENTENCE_LEN)
        .collect()
}

/// Occurrences plus a presence bonus per keyword, per 100 characters.
fn score_sentence(sentence: &str, keywords: &[String]) -> f64 {
    let lower = sentence.to_lowercase();
    let mut score = 0.0;

    for keyword in keywords {
        let count = lower.matches(keyword.as_str()).count();
        score += count as f64;
        if count > 0 {
            score += 0.5;
        }
    }

    if !sentence.is_empty() {
        score /= sentence.len() as f64 / 100.0;
    }

    score
}

/// Cut `text` to at most `max_chars` bytes, ending with [`ELLIPSIS`].
///
/// The ellipsis is counted inside the budget. The cut backs up to the last
/// space when that space lies past the middle of the budget; otherwise the
/// word is cut. Budgets too small to hold any text plus the ellipsis get a
/// plain cut. Cuts never split a UTF-8 character.
pub fn truncate_words(text: &str, max_chars: usize) -> String {
    if text.len() <= max_chars {
        return text.to_string();
    }

    if max_chars <= ELLIPSIS.len() {
        return text[..floor_char_boundary(text, max_chars)].to_string();
    }

    let budget = max_chars - ELLIPSIS.len();
    let truncated = &text[..floor_char_boundary(text, budget)];

    match truncated.rfind(' ') {
        Some(last_space) if last_space > budget / 2 => {
            format!("{}{}", &truncated[..last_space], ELLIPSIS)
        }
        _ => format!("{}{}", truncated, ELLIPSIS),
    }
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    let mut boundary = index;
    while !text.is_char_boundary(boundary) {
        boundary -= 1;
    }
    boundary
}
