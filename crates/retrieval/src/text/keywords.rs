//! Query keyword extraction, shared by the sentence extractor and the ranker.

/// Words that never count as keywords.
pub const STOP_WORDS: [&str; 36] = [
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did", "will",
    "would", "could", "should", "what", "when", "where", "who", "why", "how",
];

/// Extract keywords from a query.
///
/// Lowercases, splits on whitespace, strips everything but word characters
/// and keeps words longer than two characters that are not stop words.
/// Order and duplicates are preserved.
pub fn extract_keywords(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric() || *c == '_')
                .collect::<String>()
        })
        .filter(|word| word.chars().count() > 2 && !STOP_WORDS.contains(&word.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_keywords() {
        assert_eq!(
            extract_keywords("What is the deployment process?"),
            vec!["deployment", "process"]
        );
    }

    #[test]
    fn test_strips_punctuation_and_short_words() {
        assert_eq!(
            extract_keywords("Q3 budget: (final) numbers, ok?"),
            vec!["budget", "final", "numbers"]
        );
    }

    #[test]
    fn test_only_stop_words() {
        assert!(extract_keywords("how do I do it?").is_empty());
        assert!(extract_keywords("").is_empty());
    }

    #[test]
    fn test_duplicates_kept() {
        assert_eq!(extract_keywords("deploy DEPLOY"), vec!["deploy", "deploy"]);
    }
}
