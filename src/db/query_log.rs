//! Per-request query log.

use crate::db::Db;
use crate::error::{AiblockError, Result};
use chrono::Utc;
use rusqlite::params;
use serde::Serialize;

/// One served pipeline request
#[derive(Debug, Clone)]
pub struct QueryLogEntry {
    pub request_id: String,
    pub endpoint: String,
    pub query: String,
    pub success: bool,
    pub failed_stage: Option<String>,
    pub latency_ms: u64,
    pub result_count: usize,
}

/// Aggregate counts over the query log
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct QueryLogSummary {
    pub total: u64,
    pub failed: u64,
    pub avg_latency_ms: Option<f64>,
}

/// Append an entry to the query log.
pub async fn log_query(db: &Db, entry: QueryLogEntry) -> Result<()> {
    let timestamp = Utc::now().to_rfc3339();

    db.with_connection(move |conn| {
        conn.execute(
            r#"
            INSERT INTO query_logs (
                request_id, timestamp, endpoint, query,
                success, failed_stage, latency_ms, result_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                entry.request_id,
                timestamp,
                entry.endpoint,
                entry.query,
                entry.success,
                entry.failed_stage,
                entry.latency_ms as i64,
                entry.result_count as i64
            ],
        )?;
        Ok::<(), AiblockError>(())
    })
    .await
}

/// Summarize every logged request
pub async fn summarize(db: &Db) -> Result<QueryLogSummary> {
    db.with_connection(|conn| {
        let summary = conn.query_row(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN success = 0 THEN 1 ELSE 0 END), 0),
                AVG(latency_ms)
            FROM query_logs
            "#,
            [],
            |row| {
                Ok(QueryLogSummary {
                    total: row.get::<_, i64>(0)? as u64,
                    failed: row.get::<_, i64>(1)? as u64,
                    avg_latency_ms: row.get::<_, Option<f64>>(2)?,
                })
            },
        )?;
        Ok(summary)
    })
    .await
}
