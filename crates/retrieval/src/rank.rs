//! Keyword reranking of search candidates.
//!
//! Scores are length-normalized keyword densities: a title hit counts twice,
//! a content hit once, and each keyword present anywhere adds a half point.
//! The sum is divided by the length of `"{title} {content}"` in hundreds of
//! characters, so short focused documents beat long ones that mention the
//! same terms in passing.

use crate::text::extract_keywords;
use crate::types::Candidate;

/// A candidate with its relevance score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f64,
}

/// Score one candidate against pre-extracted keywords.
pub fn score_candidate(candidate: &Candidate, keywords: &[String]) -> f64 {
    let title = candidate.title.to_lowercase();
    let content = candidate.content.to_lowercase();
    let combined = format!("{} {}", title, content);

    let mut score = 0.0;
    for keyword in keywords {
        let keyword = keyword.as_str();
        score += title.matches(keyword).count() as f64 * 2.0;
        score += content.matches(keyword).count() as f64;
        if combined.contains(keyword) {
            score += 0.5;
        }
    }

    if !combined.is_empty() {
        score /= combined.len() as f64 / 100.0;
    }

    score
}

/// Score all candidates and sort by descending score.
///
/// The sort is stable, so ties keep their original order.
pub fn score_candidates(query: &str, candidates: Vec<Candidate>) -> Vec<ScoredCandidate> {
    let keywords = extract_keywords(query);

    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|candidate| ScoredCandidate {
            score: score_candidate(&candidate, &keywords),
            candidate,
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored
}

/// Keep the `top_k` most relevant candidates, best first.
pub fn rerank(query: &str, candidates: Vec<Candidate>, top_k: usize) -> Vec<Candidate> {
    if candidates.is_empty() {
        return candidates;
    }

    let mut scored = score_candidates(query, candidates);
    scored.truncate(top_k);

    if let Some(best) = scored.first() {
        tracing::debug!(
            "Reranked to {} candidates (top score {:.3})",
            scored.len(),
            best.score
        );
    }

    scored.into_iter().map(|s| s.candidate).collect()
}
