//! Search expression builders
//!
//! Two tiers share one rule: user text never reaches SQL as anything but a
//! bound parameter or a sanitized full-text term.

/// Characters with operator meaning in a full-text match expression.
const FT_SPECIALS: &[char] = &['+', '-', '>', '<', '(', ')', '~', '*', '"', '@'];

/// Build a full-text match expression from extracted keywords: operator
/// characters are stripped, every remaining word part becomes a prefix
/// term, and terms are joined by the engine's implicit AND.
///
/// `["fee structure", "hostel"]` becomes `fee* structure* hostel*`.
/// Returns an empty string when nothing survives sanitization.
pub fn fulltext_expression(keywords: &[String]) -> String {
    let mut terms: Vec<String> = Vec::with_capacity(keywords.len());
    for keyword in keywords {
        let cleaned: String = keyword
            .chars()
            .map(|c| if FT_SPECIALS.contains(&c) { ' ' } else { c })
            .collect();
        for part in cleaned.split_whitespace() {
            terms.push(format!("{part}*"));
        }
    }
    terms.join(" ")
}

/// A `(... OR ...)` fragment with its bound parameters, ready to append to
/// a WHERE clause.
#[derive(Debug, Clone)]
pub struct LikeClause {
    pub sql: String,
    pub params: Vec<String>,
}

/// Build an OR-of-LIKEs over `keywords` x `columns`, one bound `%kw%`
/// parameter per pair. At most `max_keywords` keywords participate so a
/// long query cannot explode the clause. Returns `None` when there are no
/// keywords to match.
pub fn like_clause(keywords: &[String], columns: &[&str], max_keywords: usize) -> Option<LikeClause> {
    let keywords: Vec<&String> = keywords.iter().take(max_keywords).collect();
    if keywords.is_empty() || columns.is_empty() {
        return None;
    }

    let mut predicates = Vec::with_capacity(keywords.len() * columns.len());
    let mut params = Vec::with_capacity(keywords.len() * columns.len());
    for keyword in keywords {
        for column in columns {
            predicates.push(format!("{column} LIKE ?"));
            params.push(format!("%{keyword}%"));
        }
    }

    Some(LikeClause {
        sql: format!("({})", predicates.join(" OR ")),
        params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fulltext_expression_prefix_terms() {
        let expr = fulltext_expression(&["fee structure".into(), "hostel".into()]);
        assert_eq!(expr, "fee* structure* hostel*");
    }

    #[test]
    fn test_fulltext_expression_strips_operators() {
        let expr = fulltext_expression(&["c++ (advanced)".into(), "\"quoted\"".into()]);
        assert!(!expr.contains(['+', '(', ')', '"']));
        assert_eq!(expr, "c* advanced* quoted*");
    }

    #[test]
    fn test_fulltext_expression_empty() {
        assert_eq!(fulltext_expression(&[]), "");
        assert_eq!(fulltext_expression(&["+-*".into()]), "");
    }

    #[test]
    fn test_like_clause_shape() {
        let clause = like_clause(
            &["fees".into(), "hostel".into()],
            &["search_text", "keywords"],
            8,
        )
        .unwrap();
        assert_eq!(clause.params.len(), 4);
        assert_eq!(clause.sql.matches("LIKE ?").count(), 4);
        assert!(clause.sql.starts_with('(') && clause.sql.ends_with(')'));
        assert_eq!(clause.params[0], "%fees%");
    }

    #[test]
    fn test_like_clause_keyword_cap() {
        let keywords: Vec<String> = (0..20).map(|i| format!("kw{i}")).collect();
        let clause = like_clause(&keywords, &["search_text"], 8).unwrap();
        assert_eq!(clause.params.len(), 8);
    }

    #[test]
    fn test_like_clause_no_keywords() {
        assert!(like_clause(&[], &["search_text"], 8).is_none());
    }
}
