//! Storage layer: SQLite schema, migrations and typed queries

pub mod database;
pub mod queries;

pub use database::{Database, DbPool, DbStats};
pub use queries::{NewQa, NewRecord, NewTenant, RecordRow, Tenant};
