//! Weighted keyword extraction
//!
//! Unigrams weigh 1 per occurrence, adjacent-pair bigrams weigh 2, so a
//! phrase the user typed twice outranks a word mentioned once. Ordering is
//! deterministic: weight descending, then first appearance in the input.

use std::collections::HashMap;

use crate::lexicon::Lexicon;
use crate::text;

const UNIGRAM_WEIGHT: u32 = 1;
const BIGRAM_WEIGHT: u32 = 2;

#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    min_token_len: usize,
    top_k: usize,
}

impl KeywordExtractor {
    pub fn new(min_token_len: usize, top_k: usize) -> Self {
        Self {
            min_token_len,
            top_k,
        }
    }

    /// Extract up to `top_k` keywords from raw query text.
    ///
    /// The query is normalized and stripped of conversational lead-ins
    /// first; stopwords and short tokens never become keywords, alone or
    /// inside a bigram.
    pub fn extract(&self, raw_query: &str, lexicon: &Lexicon) -> Vec<String> {
        let normalized = text::normalize(raw_query);
        let stripped = text::strip_lead_in(&normalized);
        let tokens = text::tokenize(stripped);

        let eligible: Vec<&str> = tokens
            .iter()
            .copied()
            .filter(|t| self.is_eligible(t, lexicon))
            .collect();

        // weight + first-seen position, insertion order preserved for ties
        let mut weights: HashMap<String, (u32, usize)> = HashMap::new();
        let mut next_pos = 0usize;
        let mut bump = |term: String, weight: u32, weights: &mut HashMap<String, (u32, usize)>| {
            let entry = weights.entry(term).or_insert_with(|| {
                let pos = next_pos;
                next_pos += 1;
                (0, pos)
            });
            entry.0 += weight;
        };

        for token in &eligible {
            bump(token.to_string(), UNIGRAM_WEIGHT, &mut weights);
        }

        // Bigrams come from the original token stream so "fee structure"
        // survives even when a stopword-free gap would otherwise join
        // unrelated words.
        for pair in tokens.windows(2) {
            if self.is_eligible(pair[0], lexicon) && self.is_eligible(pair[1], lexicon) {
                bump(format!("{} {}", pair[0], pair[1]), BIGRAM_WEIGHT, &mut weights);
            }
        }

        let mut ranked: Vec<(String, u32, usize)> = weights
            .into_iter()
            .map(|(term, (weight, pos))| (term, weight, pos))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        ranked.truncate(self.top_k);
        ranked.into_iter().map(|(term, _, _)| term).collect()
    }

    fn is_eligible(&self, token: &str, lexicon: &Lexicon) -> bool {
        token.chars().count() >= self.min_token_len && !lexicon.is_stopword(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> KeywordExtractor {
        KeywordExtractor::new(2, 10)
    }

    #[test]
    fn test_stopwords_and_short_tokens_excluded() {
        let kws = extractor().extract("what is the fee for a B Tech", &Lexicon::default());
        assert!(kws.contains(&"fee".to_string()));
        assert!(kws.contains(&"tech".to_string()));
        assert!(!kws.iter().any(|k| k == "the" || k == "is" || k == "a" || k == "b"));
    }

    #[test]
    fn test_bigram_outweighs_unigram() {
        let kws = extractor().extract("fee structure details", &Lexicon::default());
        // "fee structure" and "structure details" carry weight 2 each,
        // ahead of the weight-1 unigrams.
        assert_eq!(kws[0], "fee structure");
        assert_eq!(kws[1], "structure details");
        assert!(kws.contains(&"fee".to_string()));
    }

    #[test]
    fn test_repeated_term_gains_weight() {
        let kws = extractor().extract("hostel hostel hostel library", &Lexicon::default());
        assert_eq!(kws[0], "hostel");
    }

    #[test]
    fn test_ties_broken_by_input_order() {
        let kws = extractor().extract("placement library hostel", &Lexicon::default());
        let unigrams: Vec<&str> = kws
            .iter()
            .filter(|k| !k.contains(' '))
            .map(String::as_str)
            .collect();
        assert_eq!(unigrams, vec!["placement", "library", "hostel"]);
    }

    #[test]
    fn test_all_stopwords_yields_empty() {
        let kws = extractor().extract("what is the and of", &Lexicon::default());
        assert!(kws.is_empty());
    }

    #[test]
    fn test_top_k_cap() {
        let extractor = KeywordExtractor::new(2, 3);
        let kws = extractor.extract(
            "placement library hostel transport scholarship exam",
            &Lexicon::default(),
        );
        assert_eq!(kws.len(), 3);
    }

    #[test]
    fn test_lead_in_stripped_before_extraction() {
        let a = extractor().extract("tell me about hostel fees", &Lexicon::default());
        let b = extractor().extract("hostel fees", &Lexicon::default());
        assert_eq!(a, b);
    }
}
