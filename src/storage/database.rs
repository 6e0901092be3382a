//! SQLite database management with migrations
//!
//! Structured storage for tenants, searchable records, curated Q&A rows
//! and interaction logs. Full-text search runs on FTS5 shadow tables kept
//! in sync by triggers, so writers never touch the index directly.

use crate::error::{CollegiumError, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Database manager with migration support
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create a new database connection
    pub fn new(db_path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CollegiumError::Io {
                source: e,
                context: format!("Failed to create database directory: {:?}", parent),
            })?;
        }

        // foreign_keys is per-connection, so every pooled connection gets
        // the same pragma set.
        let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA foreign_keys = ON;
                PRAGMA busy_timeout = 5000;
                ",
            )
        });

        let pool = Pool::builder()
            .max_size(16)
            .build(manager)
            .map_err(|e| CollegiumError::Storage(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };

        db.migrate()?;

        Ok(db)
    }

    /// Get a connection from the pool
    pub fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| CollegiumError::Storage(format!("Failed to get connection: {}", e)))
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.get_conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM _migrations",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        for (version, migration) in MIGRATIONS.iter().enumerate() {
            let version = version as i32 + 1;

            if version > current_version {
                tracing::info!("Applying migration {}", version);

                conn.execute_batch(migration)?;

                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, datetime('now'))",
                    params![version],
                )?;
            }
        }

        Ok(())
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let conn = self.get_conn()?;

        let tenant_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM tenants", [], |row| row.get(0))?;

        let record_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;

        let qa_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM qa_suggestions", [], |row| row.get(0))?;

        let log_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM interaction_logs", [], |row| {
                row.get(0)
            })?;

        Ok(DbStats {
            tenant_count: tenant_count as usize,
            record_count: record_count as usize,
            qa_count: qa_count as usize,
            log_count: log_count as usize,
        })
    }
}

/// Database statistics
#[derive(Debug)]
pub struct DbStats {
    pub tenant_count: usize,
    pub record_count: usize,
    pub qa_count: usize,
    pub log_count: usize,
}

/// Database migrations (each string is one migration)
const MIGRATIONS: &[&str] = &[
    // Migration 1: Initial schema
    r#"
    -- Tenants (colleges) identified by an opaque auth token
    CREATE TABLE tenants (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        contact_email TEXT,
        contact_phone TEXT,
        auth_token TEXT NOT NULL UNIQUE,
        is_active INTEGER NOT NULL DEFAULT 1
    );

    CREATE INDEX idx_tenants_token ON tenants(auth_token);

    -- Searchable content records, one row per publishable unit
    CREATE TABLE records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tenant_id TEXT NOT NULL,
        data_type TEXT NOT NULL,
        title TEXT,
        payload TEXT,          -- JSON, shape depends on data_type
        search_text TEXT NOT NULL DEFAULT '',
        keywords TEXT,         -- JSON array of curated keywords
        status TEXT NOT NULL DEFAULT 'PUBLISHED',
        added_on INTEGER NOT NULL,
        FOREIGN KEY (tenant_id) REFERENCES tenants(id) ON DELETE CASCADE
    );

    CREATE INDEX idx_records_tenant ON records(tenant_id);
    CREATE INDEX idx_records_status ON records(status);
    CREATE INDEX idx_records_added_on ON records(added_on);

    CREATE VIRTUAL TABLE records_fts USING fts5(
        search_text,
        keywords,
        content='records',
        content_rowid='id'
    );

    CREATE TRIGGER records_ai AFTER INSERT ON records BEGIN
        INSERT INTO records_fts(rowid, search_text, keywords)
        VALUES (new.id, new.search_text, new.keywords);
    END;

    CREATE TRIGGER records_ad AFTER DELETE ON records BEGIN
        INSERT INTO records_fts(records_fts, rowid, search_text, keywords)
        VALUES ('delete', old.id, old.search_text, old.keywords);
    END;

    CREATE TRIGGER records_au AFTER UPDATE ON records BEGIN
        INSERT INTO records_fts(records_fts, rowid, search_text, keywords)
        VALUES ('delete', old.id, old.search_text, old.keywords);
        INSERT INTO records_fts(rowid, search_text, keywords)
        VALUES (new.id, new.search_text, new.keywords);
    END;

    -- Curated question/answer suggestions with a feedback-learned score
    CREATE TABLE qa_suggestions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tenant_id TEXT NOT NULL,
        question TEXT NOT NULL,
        answer TEXT NOT NULL,
        tags TEXT,             -- JSON array
        rank_score REAL NOT NULL DEFAULT 0,
        is_active INTEGER NOT NULL DEFAULT 1,
        FOREIGN KEY (tenant_id) REFERENCES tenants(id) ON DELETE CASCADE
    );

    CREATE INDEX idx_qa_tenant ON qa_suggestions(tenant_id);

    CREATE VIRTUAL TABLE qa_fts USING fts5(
        question,
        answer,
        content='qa_suggestions',
        content_rowid='id'
    );

    CREATE TRIGGER qa_ai AFTER INSERT ON qa_suggestions BEGIN
        INSERT INTO qa_fts(rowid, question, answer)
        VALUES (new.id, new.question, new.answer);
    END;

    CREATE TRIGGER qa_ad AFTER DELETE ON qa_suggestions BEGIN
        INSERT INTO qa_fts(qa_fts, rowid, question, answer)
        VALUES ('delete', old.id, old.question, old.answer);
    END;

    CREATE TRIGGER qa_au AFTER UPDATE ON qa_suggestions BEGIN
        INSERT INTO qa_fts(qa_fts, rowid, question, answer)
        VALUES ('delete', old.id, old.question, old.answer);
        INSERT INTO qa_fts(rowid, question, answer)
        VALUES (new.id, new.question, new.answer);
    END;

    -- Feedback audit trail, best-effort
    CREATE TABLE interaction_logs (
        id TEXT PRIMARY KEY,
        tenant_id TEXT NOT NULL,
        item_type TEXT NOT NULL,
        item_id INTEGER NOT NULL,
        action TEXT NOT NULL,
        ip_addr TEXT,
        user_agent TEXT,
        meta TEXT,             -- JSON
        created_on INTEGER NOT NULL,
        FOREIGN KEY (tenant_id) REFERENCES tenants(id) ON DELETE CASCADE
    );

    CREATE INDEX idx_logs_tenant ON interaction_logs(tenant_id);
    CREATE INDEX idx_logs_created_on ON interaction_logs(created_on);

    -- Operator-extensible vocabulary overlays
    CREATE TABLE lexicon_stopwords (
        word TEXT PRIMARY KEY,
        is_active INTEGER NOT NULL DEFAULT 1
    );

    CREATE TABLE lexicon_synonyms (
        keyword TEXT NOT NULL,
        synonym TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        PRIMARY KEY (keyword, synonym)
    );

    CREATE TABLE lexicon_greetings (
        phrase TEXT PRIMARY KEY,
        response TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1
    );
    "#,
];
