//! "Did you mean" matching against a catalog of entity names

use crate::text;

/// Best fuzzy match for a query within a name catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct NameMatch {
    pub name: String,
    /// Dissimilarity in `[0, 1]`; 0 for an exact match.
    pub ratio: f64,
}

/// Edit-distance name matcher. A candidate is accepted when its ratio
/// (distance divided by the longer transliterated length) does not exceed
/// the threshold.
#[derive(Debug, Clone)]
pub struct NameMatcher {
    threshold: f64,
    prefix_chars: usize,
}

impl NameMatcher {
    pub fn new(threshold: f64, prefix_chars: usize) -> Self {
        Self {
            threshold,
            prefix_chars,
        }
    }

    /// Lowest-ratio accepted match over `names`, or `None` when the catalog
    /// is empty or nothing clears the threshold. Ties keep the first
    /// catalog entry.
    pub fn best_match(&self, query: &str, names: &[String]) -> Option<NameMatch> {
        let query_translit = text::transliterate(&text::normalize(query));
        let query_capped = text::char_prefix(&query_translit, self.prefix_chars);

        let mut best: Option<NameMatch> = None;
        for name in names {
            let name_translit = text::transliterate(&text::normalize(name));
            let max_len = name_translit
                .chars()
                .count()
                .max(query_translit.chars().count())
                .max(1);
            let distance = strsim::levenshtein(
                text::char_prefix(&name_translit, self.prefix_chars),
                query_capped,
            );
            let ratio = distance as f64 / max_len as f64;
            if ratio <= self.threshold
                && best.as_ref().map_or(true, |b| ratio < b.ratio)
            {
                best = Some(NameMatch {
                    name: name.clone(),
                    ratio,
                });
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> NameMatcher {
        NameMatcher::new(0.65, 200)
    }

    #[test]
    fn test_exact_match_ratio_zero() {
        let names = vec!["Merit Scholarship".to_string()];
        let m = matcher().best_match("merit scholarship", &names).unwrap();
        assert_eq!(m.name, "Merit Scholarship");
        assert!(m.ratio.abs() < 1e-9);
    }

    #[test]
    fn test_typo_accepted() {
        let names = vec![
            "Scholarship".to_string(),
            "Hostel Rules".to_string(),
        ];
        let m = matcher().best_match("skolarship", &names).unwrap();
        assert_eq!(m.name, "Scholarship");
        assert!(m.ratio <= 0.65);
    }

    #[test]
    fn test_disjoint_equal_length_rejected() {
        // Fully disjoint strings of equal length have ratio 1.0.
        let names = vec!["aaaa".to_string()];
        assert!(matcher().best_match("zzzz", &names).is_none());
        assert!(NameMatcher::new(1.0, 200)
            .best_match("zzzz", &names)
            .is_some_and(|m| (m.ratio - 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_unrelated_rejected() {
        let names = vec!["Campus Transport Timetable".to_string()];
        assert!(matcher().best_match("zzz", &names).is_none());
    }

    #[test]
    fn test_empty_catalog() {
        assert!(matcher().best_match("anything", &[]).is_none());
    }

    #[test]
    fn test_picks_lowest_ratio() {
        let names = vec![
            "Admission Process".to_string(),
            "Admission".to_string(),
        ];
        let m = matcher().best_match("admision", &names).unwrap();
        assert_eq!(m.name, "Admission");
    }
}
