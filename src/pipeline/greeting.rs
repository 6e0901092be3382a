//! Greeting fast-path
//!
//! Small talk short-circuits the whole search pipeline. Three match modes,
//! cheapest first: exact token, synonym-canonicalized token, then phrase
//! substring. Responses are never cached; they are cheaper than the cache.

use crate::lexicon::Lexicon;
use crate::text;

pub struct GreetingMatcher<'a> {
    lexicon: &'a Lexicon,
}

impl<'a> GreetingMatcher<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        Self { lexicon }
    }

    /// Canned response for a normalized query, or `None` when the query is
    /// not a greeting. First matching phrase wins, in lexicon order.
    pub fn match_greeting(&self, normalized_query: &str) -> Option<&'a str> {
        if normalized_query.is_empty() {
            return None;
        }
        let tokens = text::tokenize(normalized_query);

        for (phrase, response) in self.lexicon.greetings() {
            let token_hit = tokens.iter().any(|t| {
                *t == phrase.as_str() || self.lexicon.canonical(t) == Some(phrase.as_str())
            });
            // Substring only for multi-word phrases: "good morning" inside
            // "good morning everyone". Single words must match a whole
            // token or "hi" would fire inside "this".
            let phrase_hit =
                phrase.contains(' ') && normalized_query.contains(phrase.as_str());
            if token_hit || phrase_hit {
                return Some(response.as_str());
            }
        }
        None
    }
}
