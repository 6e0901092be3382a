//! Q&A candidate scoring and ordering

pub mod fuzzy;

use std::collections::HashSet;
use std::sync::Arc;

use crate::text;

/// Similarity in `[0, 1]` between two pieces of text, 1 meaning identical.
/// Behind a trait so the metric can change without touching the ranker.
pub trait Similarity: Send + Sync {
    fn similarity(&self, a: &str, b: &str) -> f64;
}

/// Levenshtein-based similarity over ASCII-transliterated text. Inputs are
/// capped at `prefix_chars` characters before the distance computation so
/// pathological strings stay cheap; the denominator uses the full
/// transliterated lengths.
#[derive(Debug, Clone)]
pub struct EditDistance {
    prefix_chars: usize,
}

impl EditDistance {
    pub fn new(prefix_chars: usize) -> Self {
        Self { prefix_chars }
    }
}

impl Similarity for EditDistance {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        let ta = text::transliterate(a);
        let tb = text::transliterate(b);
        let max_len = ta.chars().count().max(tb.chars().count()).max(1);
        let distance = strsim::levenshtein(
            text::char_prefix(&ta, self.prefix_chars),
            text::char_prefix(&tb, self.prefix_chars),
        );
        1.0 - distance as f64 / max_len as f64
    }
}

/// A curated question/answer row eligible for ranking.
#[derive(Debug, Clone)]
pub struct QaCandidate {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub tags: Vec<String>,
    pub rank_score: f64,
}

/// A candidate with its composite score attached.
#[derive(Debug, Clone)]
pub struct RankedQa {
    pub candidate: QaCandidate,
    pub score: f64,
}

/// Composite scorer: token overlap, whole-string similarity, tag hits and
/// the feedback-learned rank score, each with its own weight.
pub struct QaRanker {
    similarity: Arc<dyn Similarity>,
    overlap_weight: f64,
    similarity_weight: f64,
    tag_bonus: f64,
}

impl QaRanker {
    pub fn new(
        similarity: Arc<dyn Similarity>,
        overlap_weight: f64,
        similarity_weight: f64,
        tag_bonus: f64,
    ) -> Self {
        Self {
            similarity,
            overlap_weight,
            similarity_weight,
            tag_bonus,
        }
    }

    /// Score and sort candidates against a normalized query, best first.
    /// Ties keep their input order (sort is stable), so storage-layer
    /// ordering remains the secondary key.
    pub fn rank(&self, candidates: Vec<QaCandidate>, normalized_query: &str) -> Vec<RankedQa> {
        let query_tokens: HashSet<&str> =
            text::tokenize(normalized_query).into_iter().collect();

        let mut ranked: Vec<RankedQa> = candidates
            .into_iter()
            .map(|candidate| {
                let score = self.score(&candidate, normalized_query, &query_tokens);
                RankedQa { candidate, score }
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
    }

    fn score(
        &self,
        candidate: &QaCandidate,
        normalized_query: &str,
        query_tokens: &HashSet<&str>,
    ) -> f64 {
        let question_norm = text::normalize(&candidate.question);

        // Duplicate question tokens count again: a question that repeats a
        // query word really is about it.
        let overlap = text::tokenize(&question_norm)
            .into_iter()
            .filter(|t| query_tokens.contains(t))
            .count() as f64;

        let similarity = self
            .similarity
            .similarity(&candidate.question, normalized_query)
            .max(0.0);

        let tag_hits = candidate
            .tags
            .iter()
            .filter(|tag| query_tokens.contains(text::normalize(tag).as_str()))
            .count() as f64;

        overlap * self.overlap_weight
            + similarity * self.similarity_weight
            + tag_hits * self.tag_bonus
            + candidate.rank_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranker() -> QaRanker {
        QaRanker::new(Arc::new(EditDistance::new(200)), 2.0, 2.5, 0.8)
    }

    fn candidate(id: i64, question: &str, tags: &[&str], rank_score: f64) -> QaCandidate {
        QaCandidate {
            id,
            question: question.to_string(),
            answer: format!("answer {id}"),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            rank_score,
        }
    }

    #[test]
    fn test_identical_question_scores_highest() {
        let ranked = ranker().rank(
            vec![
                candidate(1, "library timings", &[], 0.0),
                candidate(2, "what is the fee structure", &[], 0.0),
            ],
            "what is the fee structure",
        );
        assert_eq!(ranked[0].candidate.id, 2);
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn test_tag_bonus_applies() {
        let ranked = ranker().rank(
            vec![
                candidate(1, "campus facilities", &[], 0.0),
                candidate(2, "campus facilities", &["hostel"], 0.0),
            ],
            "hostel facilities",
        );
        assert_eq!(ranked[0].candidate.id, 2);
        assert!((ranked[0].score - ranked[1].score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_rank_score_breaks_near_ties() {
        let ranked = ranker().rank(
            vec![
                candidate(1, "hostel fees", &[], 0.0),
                candidate(2, "hostel fees", &[], 3.0),
            ],
            "hostel fees",
        );
        assert_eq!(ranked[0].candidate.id, 2);
    }

    #[test]
    fn test_stable_order_for_exact_ties() {
        let ranked = ranker().rank(
            vec![
                candidate(7, "hostel fees", &[], 1.0),
                candidate(8, "hostel fees", &[], 1.0),
            ],
            "hostel fees",
        );
        assert_eq!(ranked[0].candidate.id, 7);
    }

    #[test]
    fn test_edit_distance_bounds() {
        let sim = EditDistance::new(200);
        assert!((sim.similarity("fees", "fees") - 1.0).abs() < 1e-9);
        let s = sim.similarity("fees", "library");
        assert!((0.0..1.0).contains(&s));
        // Empty transliteration degrades to zero overlap, not a panic.
        let s = sim.similarity("नमस्ते", "fees");
        assert!(s.is_finite());
    }
}
