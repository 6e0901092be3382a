//! Stopword, synonym and greeting lexicon
//!
//! Built-in defaults cover a college-information deployment out of the box;
//! rows in the `lexicon_*` tables overlay them so operators can extend the
//! vocabulary without a release. Overlay failures are swallowed at DEBUG:
//! a missing or broken lexicon table must never take down a request.

use std::collections::{HashMap, HashSet};

use crate::storage::Database;
use crate::text;

const DEFAULT_STOPWORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "of",
    "for", "in", "on", "at", "to", "from", "by", "with", "about", "as", "into",
    "and", "or", "but", "not", "no", "do", "does", "did", "can", "could",
    "will", "would", "shall", "should", "may", "might", "must", "have", "has",
    "had", "i", "me", "my", "we", "our", "you", "your", "it", "its", "this",
    "that", "these", "those", "there", "here", "what", "which", "who", "whom",
    "when", "where", "why", "how", "please", "tell", "know", "want", "give",
];

/// (canonical keyword, variants). The canonical form is what search data is
/// tagged with; variants map inbound tokens onto it.
const DEFAULT_SYNONYMS: &[(&str, &[&str])] = &[
    ("fees", &["fee", "cost", "charges", "tuition", "price"]),
    ("admission", &["admissions", "apply", "application", "enroll", "enrollment"]),
    ("placement", &["placements", "job", "jobs", "recruitment", "career"]),
    ("hostel", &["hostels", "accommodation", "dormitory", "lodging"]),
    ("course", &["courses", "program", "programs", "degree", "branch"]),
    ("scholarship", &["scholarships", "stipend", "financial aid"]),
    ("exam", &["exams", "examination", "test", "tests"]),
    ("faculty", &["professor", "professors", "teacher", "teachers", "staff"]),
    ("library", &["books", "reading room"]),
    ("transport", &["bus", "buses", "shuttle"]),
];

/// (greeting phrase, canned response), checked in order.
const DEFAULT_GREETINGS: &[(&str, &str)] = &[
    ("hello", "Hello! Ask me anything about courses, fees, admissions or placements."),
    ("hi", "Hi there! How can I help you with college information today?"),
    ("hey", "Hey! Ask me about courses, fees, hostels or placements."),
    ("good morning", "Good morning! What would you like to know about the college?"),
    ("good afternoon", "Good afternoon! What would you like to know about the college?"),
    ("good evening", "Good evening! What would you like to know about the college?"),
    ("namaste", "Namaste! Ask me anything about courses, fees, admissions or placements."),
    ("thanks", "You're welcome! Anything else you'd like to know?"),
    ("thank you", "You're welcome! Anything else you'd like to know?"),
    ("bye", "Goodbye! Come back any time you have questions."),
];

/// Immutable vocabulary snapshot used for one request.
#[derive(Debug, Clone)]
pub struct Lexicon {
    stopwords: HashSet<String>,
    /// variant (normalized) -> canonical keyword (normalized)
    synonyms: HashMap<String, String>,
    /// (normalized phrase, response), in match-priority order
    greetings: Vec<(String, String)>,
}

impl Default for Lexicon {
    fn default() -> Self {
        let stopwords = DEFAULT_STOPWORDS.iter().map(|s| s.to_string()).collect();

        let mut synonyms = HashMap::new();
        for (canonical, variants) in DEFAULT_SYNONYMS {
            let canonical = text::normalize(canonical);
            // The canonical form maps to itself so tag matching is uniform.
            synonyms.insert(canonical.clone(), canonical.clone());
            for variant in *variants {
                synonyms.insert(text::normalize(variant), canonical.clone());
            }
        }

        let greetings = DEFAULT_GREETINGS
            .iter()
            .map(|(phrase, response)| (text::normalize(phrase), response.to_string()))
            .collect();

        Self {
            stopwords,
            synonyms,
            greetings,
        }
    }
}

impl Lexicon {
    /// Defaults overlaid with any active rows from the lexicon tables.
    /// Database problems leave the defaults in place.
    pub fn load(db: &Database) -> Self {
        let mut lexicon = Self::default();
        if let Err(e) = lexicon.apply_overlays(db) {
            tracing::debug!("lexicon overlay unavailable, using defaults: {e}");
        }
        lexicon
    }

    fn apply_overlays(&mut self, db: &Database) -> crate::Result<()> {
        for word in db.lexicon_stopwords()? {
            self.stopwords.insert(text::normalize(&word));
        }
        for (keyword, synonym) in db.lexicon_synonyms()? {
            let canonical = text::normalize(&keyword);
            self.synonyms.insert(canonical.clone(), canonical.clone());
            self.synonyms.insert(text::normalize(&synonym), canonical);
        }
        for (phrase, response) in db.lexicon_greetings()? {
            self.greetings.push((text::normalize(&phrase), response));
        }
        Ok(())
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    /// Canonical keyword for a token, if the token is a known variant.
    pub fn canonical(&self, token: &str) -> Option<&str> {
        self.synonyms.get(token).map(String::as_str)
    }

    pub fn greetings(&self) -> &[(String, String)] {
        &self.greetings
    }
}
