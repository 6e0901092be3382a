//! Typed queries over the collegium schema
//!
//! Every query is tenant-scoped and every piece of user-supplied text is a
//! bound parameter. Full-text relevance is the negated bm25 rank so higher
//! is better everywhere in the crate.

use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::Result;
use crate::query::{like_clause, LikeClause};
use crate::ranking::QaCandidate;
use crate::storage::Database;

/// Columns the record LIKE fallback scans
const RECORD_LIKE_COLUMNS: &[&str] = &["r.search_text", "r.keywords", "r.title"];
/// Columns the Q&A LIKE fallback scans
const QA_LIKE_COLUMNS: &[&str] = &["q.question", "q.answer", "q.tags"];

/// An active college resolved from an auth token.
#[derive(Debug, Clone)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

/// A searchable record with its relevance score (0 outside the full-text
/// tier).
#[derive(Debug, Clone)]
pub struct RecordRow {
    pub id: i64,
    pub data_type: String,
    pub title: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub keywords: Option<serde_json::Value>,
    pub search_text: String,
    pub score: f64,
}

/// Seed input for a tenant row.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTenant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    pub auth_token: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Seed input for a record row.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRecord {
    pub tenant_id: String,
    pub data_type: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    pub search_text: String,
    #[serde(default)]
    pub keywords: Option<serde_json::Value>,
    #[serde(default = "default_status")]
    pub status: String,
}

/// Seed input for a Q&A row.
#[derive(Debug, Clone, Deserialize)]
pub struct NewQa {
    pub tenant_id: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub rank_score: f64,
}

fn default_true() -> bool {
    true
}

fn default_status() -> String {
    "PUBLISHED".to_string()
}

fn parse_json_column(raw: Option<String>) -> Option<serde_json::Value> {
    // Malformed stored JSON degrades to absent, it must not fail a search.
    raw.and_then(|s| serde_json::from_str(&s).ok())
}

fn record_from_row(row: &rusqlite::Row<'_>, score: f64) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        id: row.get(0)?,
        data_type: row.get(1)?,
        title: row.get(2)?,
        payload: parse_json_column(row.get(3)?),
        keywords: parse_json_column(row.get(4)?),
        search_text: row.get(5)?,
        score,
    })
}

fn qa_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<QaCandidate> {
    let tags: Option<String> = row.get(3)?;
    let tags = tags
        .and_then(|s| serde_json::from_str::<Vec<String>>(&s).ok())
        .unwrap_or_default();
    Ok(QaCandidate {
        id: row.get(0)?,
        question: row.get(1)?,
        answer: row.get(2)?,
        tags,
        rank_score: row.get(4)?,
    })
}

impl Database {
    /// Resolve an auth token to its active tenant.
    pub fn resolve_token(&self, token: &str) -> Result<Option<Tenant>> {
        let conn = self.get_conn()?;
        let tenant = conn
            .query_row(
                "SELECT id, name, contact_email, contact_phone
                 FROM tenants WHERE auth_token = ?1 AND is_active = 1",
                params![token],
                |row| {
                    Ok(Tenant {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        contact_email: row.get(2)?,
                        contact_phone: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(tenant)
    }

    /// Tier-1 search: full-text match over published records, most relevant
    /// first.
    pub fn search_records_fts(
        &self,
        tenant_id: &str,
        match_expr: &str,
        limit: usize,
    ) -> Result<Vec<RecordRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT r.id, r.data_type, r.title, r.payload, r.keywords, r.search_text,
                    -bm25(records_fts) AS score
             FROM records_fts
             JOIN records r ON r.id = records_fts.rowid
             WHERE records_fts MATCH ?1 AND r.tenant_id = ?2 AND r.status = 'PUBLISHED'
             ORDER BY bm25(records_fts)
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![match_expr, tenant_id, limit as i64], |row| {
            let score: f64 = row.get(6)?;
            record_from_row(row, score)
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Tier-2 search: substring match over published records, newest first.
    pub fn search_records_like(
        &self,
        tenant_id: &str,
        keywords: &[String],
        limit: usize,
        max_keywords: usize,
    ) -> Result<Vec<RecordRow>> {
        let Some(LikeClause { sql, params: like_params }) =
            like_clause(keywords, RECORD_LIKE_COLUMNS, max_keywords)
        else {
            return Ok(Vec::new());
        };

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT r.id, r.data_type, r.title, r.payload, r.keywords, r.search_text
             FROM records r
             WHERE r.tenant_id = ? AND r.status = 'PUBLISHED' AND {sql}
             ORDER BY r.added_on DESC
             LIMIT ?"
        ))?;

        let mut bind: Vec<Value> = Vec::with_capacity(like_params.len() + 2);
        bind.push(Value::Text(tenant_id.to_string()));
        bind.extend(like_params.into_iter().map(Value::Text));
        bind.push(Value::Integer(limit as i64));

        let rows = stmt.query_map(params_from_iter(bind), |row| {
            record_from_row(row, 0.0)
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Browse path for keyword-less queries: newest published records.
    pub fn recent_records(&self, tenant_id: &str, limit: usize) -> Result<Vec<RecordRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT r.id, r.data_type, r.title, r.payload, r.keywords, r.search_text
             FROM records r
             WHERE r.tenant_id = ?1 AND r.status = 'PUBLISHED'
             ORDER BY r.added_on DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![tenant_id, limit as i64], |row| {
            record_from_row(row, 0.0)
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Q&A candidates from the full-text index.
    pub fn qa_candidates_fts(
        &self,
        tenant_id: &str,
        match_expr: &str,
        limit: usize,
    ) -> Result<Vec<QaCandidate>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT q.id, q.question, q.answer, q.tags, q.rank_score
             FROM qa_fts
             JOIN qa_suggestions q ON q.id = qa_fts.rowid
             WHERE qa_fts MATCH ?1 AND q.tenant_id = ?2 AND q.is_active = 1
             ORDER BY bm25(qa_fts)
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![match_expr, tenant_id, limit as i64], qa_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Q&A candidates via substring match, for queries the full-text tier
    /// cannot serve.
    pub fn qa_candidates_like(
        &self,
        tenant_id: &str,
        keywords: &[String],
        limit: usize,
        max_keywords: usize,
    ) -> Result<Vec<QaCandidate>> {
        let Some(LikeClause { sql, params: like_params }) =
            like_clause(keywords, QA_LIKE_COLUMNS, max_keywords)
        else {
            return Ok(Vec::new());
        };

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT q.id, q.question, q.answer, q.tags, q.rank_score
             FROM qa_suggestions q
             WHERE q.tenant_id = ? AND q.is_active = 1 AND {sql}
             ORDER BY q.rank_score DESC, q.id
             LIMIT ?"
        ))?;

        let mut bind: Vec<Value> = Vec::with_capacity(like_params.len() + 2);
        bind.push(Value::Text(tenant_id.to_string()));
        bind.extend(like_params.into_iter().map(Value::Text));
        bind.push(Value::Integer(limit as i64));

        let rows = stmt.query_map(params_from_iter(bind), qa_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Distinct titles of published records, the fuzzy matcher's catalog.
    pub fn catalog_titles(&self, tenant_id: &str, limit: usize) -> Result<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT title FROM records
             WHERE tenant_id = ?1 AND status = 'PUBLISHED'
               AND title IS NOT NULL AND title != ''
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![tenant_id, limit as i64], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// First published BASIC record's follow-up suggestions, if any.
    pub fn basic_suggestions(&self, tenant_id: &str) -> Result<Vec<String>> {
        let conn = self.get_conn()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM records
                 WHERE tenant_id = ?1 AND data_type = 'BASIC' AND status = 'PUBLISHED'
                 ORDER BY added_on DESC LIMIT 1",
                params![tenant_id],
                |row| row.get(0),
            )
            .optional()?;

        let suggestions = parse_json_column(payload)
            .and_then(|v| {
                v.get("suggestions").and_then(|s| {
                    serde_json::from_value::<Vec<String>>(s.clone()).ok()
                })
            })
            .unwrap_or_default();
        Ok(suggestions)
    }

    /// Atomically add `delta` to a Q&A row's rank score, optionally clamped.
    /// Returns the number of rows updated (0 means the id does not belong
    /// to this tenant).
    pub fn apply_feedback_delta(
        &self,
        tenant_id: &str,
        qa_id: i64,
        delta: f64,
        clamp: Option<(f64, f64)>,
    ) -> Result<usize> {
        let conn = self.get_conn()?;
        let updated = match clamp {
            Some((min, max)) => conn.execute(
                "UPDATE qa_suggestions
                 SET rank_score = MIN(MAX(rank_score + ?1, ?2), ?3)
                 WHERE id = ?4 AND tenant_id = ?5",
                params![delta, min, max, qa_id, tenant_id],
            )?,
            None => conn.execute(
                "UPDATE qa_suggestions
                 SET rank_score = rank_score + ?1
                 WHERE id = ?2 AND tenant_id = ?3",
                params![delta, qa_id, tenant_id],
            )?,
        };
        Ok(updated)
    }

    /// Current rank score of a Q&A row.
    pub fn qa_rank_score(&self, tenant_id: &str, qa_id: i64) -> Result<Option<f64>> {
        let conn = self.get_conn()?;
        let score = conn
            .query_row(
                "SELECT rank_score FROM qa_suggestions WHERE id = ?1 AND tenant_id = ?2",
                params![qa_id, tenant_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(score)
    }

    /// Append an interaction log row.
    pub fn log_interaction(
        &self,
        tenant_id: &str,
        item_id: i64,
        action: &str,
        ip_addr: &str,
        user_agent: Option<&str>,
        meta: Option<&serde_json::Value>,
    ) -> Result<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO interaction_logs
             (id, tenant_id, item_type, item_id, action, ip_addr, user_agent, meta, created_on)
             VALUES (?1, ?2, 'qa_suggestion', ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                Uuid::new_v4().to_string(),
                tenant_id,
                item_id,
                action,
                ip_addr,
                user_agent,
                meta.map(|m| m.to_string()),
                Utc::now().timestamp(),
            ],
        )?;
        Ok(())
    }

    /// Active stopword overlays.
    pub fn lexicon_stopwords(&self) -> Result<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT word FROM lexicon_stopwords WHERE is_active = 1")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Active synonym overlays as (canonical keyword, variant) pairs.
    pub fn lexicon_synonyms(&self) -> Result<Vec<(String, String)>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT keyword, synonym FROM lexicon_synonyms WHERE is_active = 1")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Active greeting overlays as (phrase, response) pairs.
    pub fn lexicon_greetings(&self) -> Result<Vec<(String, String)>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT phrase, response FROM lexicon_greetings WHERE is_active = 1")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Insert a tenant (seed/admin path).
    pub fn insert_tenant(&self, tenant: &NewTenant) -> Result<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO tenants (id, name, contact_email, contact_phone, auth_token, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                tenant.id,
                tenant.name,
                tenant.contact_email,
                tenant.contact_phone,
                tenant.auth_token,
                tenant.is_active,
            ],
        )?;
        Ok(())
    }

    /// Insert a record (seed/admin path). Returns the new row id.
    pub fn insert_record(&self, record: &NewRecord) -> Result<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO records
             (tenant_id, data_type, title, payload, search_text, keywords, status, added_on)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.tenant_id,
                record.data_type,
                record.title,
                record.payload.as_ref().map(|p| p.to_string()),
                record.search_text,
                record.keywords.as_ref().map(|k| k.to_string()),
                record.status,
                Utc::now().timestamp(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert a Q&A suggestion (seed/admin path). Returns the new row id.
    pub fn insert_qa(&self, qa: &NewQa) -> Result<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO qa_suggestions (tenant_id, question, answer, tags, rank_score)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                qa.tenant_id,
                qa.question,
                qa.answer,
                serde_json::to_string(&qa.tags).unwrap_or_else(|_| "[]".to_string()),
                qa.rank_score,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}
