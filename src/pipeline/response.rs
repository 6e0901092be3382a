//! Response contract types and snippet rendering
//!
//! Everything here serializes to the wire contract; field names are part
//! of the public API and must not change casually.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CollegiumError, ErrorStatus};
use crate::storage::{RecordRow, Tenant};

/// Snippet window size in characters.
const SNIPPET_WINDOW: usize = 200;
/// Characters of context shown before the first keyword hit.
const SNIPPET_LEAD: usize = 80;
/// Fallback snippet length when no keyword matches.
const SNIPPET_FALLBACK: usize = 220;

/// College identity block echoed in every search response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TenantInfo {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
}

impl From<&Tenant> for TenantInfo {
    fn from(tenant: &Tenant) -> Self {
        Self {
            id: tenant.id.clone(),
            name: tenant.name.clone(),
            contact_email: tenant.contact_email.clone(),
            contact_phone: tenant.contact_phone.clone(),
        }
    }
}

/// One search result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordHit {
    pub id: i64,
    pub data_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    pub snippet: String,
    pub score: f64,
}

/// One ranked Q&A suggestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QaHit {
    pub id: i64,
    pub question: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
    pub score: f64,
}

/// Search response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    pub status: String,
    pub college: TenantInfo,
    pub query: String,
    pub normalized_query: String,
    pub extracted_keywords: Vec<String>,
    pub results_count: usize,
    pub results: Vec<RecordHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub greeting: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub nearest_qa: Vec<QaHit>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_query: Option<String>,
}

/// Feedback acknowledgement body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackResponse {
    pub status: String,
    pub message: String,
    pub target_id: i64,
    pub action: String,
}

/// Any successful response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ApiResponse {
    Search(Box<SearchResponse>),
    Feedback(FeedbackResponse),
}

/// Error envelope for the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn from_error(error: &CollegiumError) -> Self {
        let status = match error.status() {
            ErrorStatus::BadInput => "bad_input",
            ErrorStatus::Unauthorized => "unauthorized",
            ErrorStatus::RateLimited => "rate_limited",
            ErrorStatus::ServerError => "server_error",
        };
        Self {
            status: status.to_string(),
            message: error.public_message(),
        }
    }
}

/// Render a record into a hit with a type-appropriate snippet.
pub fn record_hit(record: RecordRow, keywords: &[String]) -> RecordHit {
    let snippet = typed_snippet(&record, keywords);
    RecordHit {
        id: record.id,
        data_type: record.data_type,
        title: record.title,
        payload: record.payload,
        snippet,
        score: record.score,
    }
}

/// Structured payloads render a purpose-built summary; anything else (or a
/// payload missing the expected fields) falls back to a keyword snippet of
/// the search text.
fn typed_snippet(record: &RecordRow, keywords: &[String]) -> String {
    let structured = record.payload.as_ref().and_then(|payload| {
        match record.data_type.as_str() {
            "DEPARTMENTS" => departments_snippet(payload),
            "COURSES" => courses_snippet(payload),
            "FEES" => fees_snippet(payload),
            "LOCATIONS" => locations_snippet(payload),
            "BASIC" => basic_snippet(payload),
            _ => None,
        }
    });
    structured.unwrap_or_else(|| keyword_snippet(&record.search_text, keywords))
}

fn name_list(payload: &Value, key: &str) -> Option<Vec<String>> {
    let items = payload.get(key)?.as_array()?;
    let names: Vec<String> = items
        .iter()
        .filter_map(|item| {
            item.get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .collect();
    (!names.is_empty()).then_some(names)
}

fn departments_snippet(payload: &Value) -> Option<String> {
    let names = name_list(payload, "departments")?;
    Some(format!("Departments: {}", names.join(", ")))
}

fn courses_snippet(payload: &Value) -> Option<String> {
    let items = payload.get("courses")?.as_array()?;
    let rendered: Vec<String> = items
        .iter()
        .filter_map(|course| {
            let name = course.get("name")?.as_str()?;
            match course.get("duration").and_then(Value::as_str) {
                Some(duration) => Some(format!("{name} ({duration})")),
                None => Some(name.to_string()),
            }
        })
        .collect();
    (!rendered.is_empty()).then(|| format!("Courses: {}", rendered.join(", ")))
}

fn fees_snippet(payload: &Value) -> Option<String> {
    let items = payload.get("fees")?.as_array()?;
    let rendered: Vec<String> = items
        .iter()
        .filter_map(|fee| {
            let course = fee.get("course")?.as_str()?;
            let amount = fee.get("amount")?;
            let amount = match amount {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some(format!("{course}: {amount}"))
        })
        .collect();
    (!rendered.is_empty()).then(|| format!("Fees: {}", rendered.join("; ")))
}

fn locations_snippet(payload: &Value) -> Option<String> {
    let parts: Vec<&str> = ["address", "city", "state", "pincode"]
        .iter()
        .filter_map(|key| payload.get(key).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

fn basic_snippet(payload: &Value) -> Option<String> {
    payload
        .get("about")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Follow-up suggestions carried by BASIC payloads among the results,
/// deduplicated in first-seen order.
pub fn payload_suggestions(results: &[RecordHit]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for hit in results {
        if hit.data_type != "BASIC" {
            continue;
        }
        let Some(items) = hit
            .payload
            .as_ref()
            .and_then(|p| p.get("suggestions"))
            .and_then(Value::as_array)
        else {
            continue;
        };
        for item in items {
            if let Some(s) = item.as_str() {
                if seen.insert(s.to_string()) {
                    out.push(s.to_string());
                }
            }
        }
    }
    out
}

/// Window of text around the first keyword occurrence: up to
/// `SNIPPET_LEAD` chars of context before the hit, `SNIPPET_WINDOW` chars
/// total, ellipses marking truncation. No hit takes the first
/// `SNIPPET_FALLBACK` chars. All arithmetic is char-based.
pub fn keyword_snippet(body: &str, keywords: &[String]) -> String {
    // Lowercasing can emit more chars than it consumes ('İ' becomes two),
    // so positions found in the lowered text are mapped back to the
    // originating char of `body` rather than used directly.
    let mut body_lower = String::with_capacity(body.len());
    let mut origin = Vec::with_capacity(body.len());
    for (char_pos, c) in body.chars().enumerate() {
        for lc in c.to_lowercase() {
            body_lower.push(lc);
            origin.push(char_pos);
        }
    }

    let hit_char_pos = keywords.iter().find_map(|keyword| {
        let needle = keyword.to_lowercase();
        if needle.is_empty() {
            return None;
        }
        body_lower
            .find(&needle)
            .map(|byte_pos| origin[body_lower[..byte_pos].chars().count()])
    });

    let chars: Vec<char> = body.chars().collect();
    match hit_char_pos {
        Some(pos) => {
            let start = pos.saturating_sub(SNIPPET_LEAD);
            let end = (start + SNIPPET_WINDOW).min(chars.len());
            let mut snippet = String::new();
            if start > 0 {
                snippet.push_str("...");
            }
            snippet.extend(&chars[start..end]);
            if end < chars.len() {
                snippet.push_str("...");
            }
            snippet
        }
        None => {
            if chars.len() <= SNIPPET_FALLBACK {
                body.to_string()
            } else {
                let mut snippet: String = chars[..SNIPPET_FALLBACK].iter().collect();
                snippet.push_str("...");
                snippet
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(data_type: &str, payload: Option<Value>, search_text: &str) -> RecordRow {
        RecordRow {
            id: 1,
            data_type: data_type.to_string(),
            title: None,
            payload,
            keywords: None,
            search_text: search_text.to_string(),
            score: 0.0,
        }
    }

    #[test]
    fn test_keyword_snippet_windows_around_hit() {
        let body = format!("{}placement cell details{}", "x".repeat(300), "y".repeat(300));
        let snippet = keyword_snippet(&body, &["placement".to_string()]);
        assert!(snippet.starts_with("..."));
        assert!(snippet.ends_with("..."));
        assert!(snippet.contains("placement"));
        // 200-char window plus two ellipsis markers.
        assert_eq!(snippet.chars().count(), SNIPPET_WINDOW + 6);
    }

    #[test]
    fn test_keyword_snippet_expanding_lowercase() {
        // 'İ' lowercases to two chars, shifting positions in the lowered
        // text ahead of those in the original.
        let body = format!("{}placement details", "İ".repeat(100));
        let snippet = keyword_snippet(&body, &["placement".to_string()]);
        assert!(snippet.contains("placement details"));

        let tail = format!("{}{}", "x".repeat(300), "İ hostel rules");
        let snippet = keyword_snippet(&tail, &["hostel".to_string()]);
        assert!(snippet.contains("hostel rules"));
    }

    #[test]
    fn test_keyword_snippet_case_insensitive() {
        let snippet = keyword_snippet("The Placement cell is active.", &["placement".to_string()]);
        assert!(snippet.contains("Placement"));
        assert!(!snippet.starts_with("..."));
    }

    #[test]
    fn test_keyword_snippet_no_hit_fallback() {
        let body = "z".repeat(500);
        let snippet = keyword_snippet(&body, &["missing".to_string()]);
        assert_eq!(snippet.chars().count(), SNIPPET_FALLBACK + 3);
        assert!(snippet.ends_with("..."));

        let short = keyword_snippet("short text", &["missing".to_string()]);
        assert_eq!(short, "short text");
    }

    #[test]
    fn test_departments_snippet() {
        let payload = serde_json::json!({
            "departments": [{"name": "CSE", "hod": "Dr. Rao"}, {"name": "ECE"}]
        });
        let hit = record_hit(record("DEPARTMENTS", Some(payload), "fallback"), &[]);
        assert_eq!(hit.snippet, "Departments: CSE, ECE");
    }

    #[test]
    fn test_courses_snippet_with_duration() {
        let payload = serde_json::json!({
            "courses": [{"name": "B.Tech CSE", "duration": "4 years"}, {"name": "MBA"}]
        });
        let hit = record_hit(record("COURSES", Some(payload), "fallback"), &[]);
        assert_eq!(hit.snippet, "Courses: B.Tech CSE (4 years), MBA");
    }

    #[test]
    fn test_fees_snippet() {
        let payload = serde_json::json!({
            "fees": [{"course": "B.Tech", "amount": "95000/yr"}, {"course": "MBA", "amount": 120000}]
        });
        let hit = record_hit(record("FEES", Some(payload), "fallback"), &[]);
        assert_eq!(hit.snippet, "Fees: B.Tech: 95000/yr; MBA: 120000");
    }

    #[test]
    fn test_locations_snippet() {
        let payload = serde_json::json!({
            "address": "12 College Road", "city": "Pune", "state": "MH", "pincode": "411001"
        });
        let hit = record_hit(record("LOCATIONS", Some(payload), "fallback"), &[]);
        assert_eq!(hit.snippet, "12 College Road, Pune, MH, 411001");
    }

    #[test]
    fn test_malformed_payload_falls_back() {
        let payload = serde_json::json!({"unexpected": true});
        let hit = record_hit(
            record("FEES", Some(payload), "fee schedule for all courses"),
            &["fee".to_string()],
        );
        assert!(hit.snippet.contains("fee schedule"));
    }

    #[test]
    fn test_payload_suggestions_dedup() {
        let payload = serde_json::json!({
            "about": "x",
            "suggestions": ["Ask about fees", "Ask about hostel"]
        });
        let hits = vec![
            record_hit(record("BASIC", Some(payload.clone()), "a"), &[]),
            record_hit(record("BASIC", Some(payload), "b"), &[]),
            record_hit(record("COURSES", None, "c"), &[]),
        ];
        let suggestions = payload_suggestions(&hits);
        assert_eq!(
            suggestions,
            vec!["Ask about fees".to_string(), "Ask about hostel".to_string()]
        );
    }

    #[test]
    fn test_error_response_mapping() {
        let err = CollegiumError::RateLimited("per-minute limit reached".to_string());
        let resp = ErrorResponse::from_error(&err);
        assert_eq!(resp.status, "rate_limited");
        assert!(resp.message.contains("per-minute"));

        let err = CollegiumError::Storage("pool exhausted".to_string());
        let resp = ErrorResponse::from_error(&err);
        assert_eq!(resp.status, "server_error");
        assert_eq!(resp.message, "server error");
    }

    #[test]
    fn test_search_response_serde_roundtrip() {
        let response = SearchResponse {
            status: "ok".to_string(),
            college: TenantInfo {
                id: "abc".into(),
                name: "ABC College".into(),
                contact_email: None,
                contact_phone: None,
            },
            query: "fees".into(),
            normalized_query: "fees".into(),
            extracted_keywords: vec!["fees".into()],
            results_count: 0,
            results: vec![],
            greeting: None,
            nearest_qa: vec![],
            suggestions: vec!["Ask about placements".into()],
            suggested_name: None,
            corrected_query: None,
        };
        let raw = serde_json::to_string(&response).unwrap();
        let back: SearchResponse = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, response);
    }
}
