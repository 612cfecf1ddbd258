// ==========================================
// 业务报表导入系统 - 批次 Repository 实现
// ==========================================
// 存储: SQLite load_batch 表
// 说明: 周期日期以 ISO 文本（YYYY-MM-DD）存储，区间比较可直接按字典序
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::batch::{Batch, ValidationReport};
use crate::domain::types::{BatchState, PeriodKind, PeriodRange};
use crate::repository::batch_repo::{BatchRepository, BatchSummary};
use crate::repository::error::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// BatchRepositoryImpl
// ==========================================
pub struct BatchRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

/// load_batch 行的中间结构（枚举解析在锁外完成）
struct RawBatchRow {
    batch_id: String,
    report_code: String,
    period_kind: String,
    period_start: Option<NaiveDate>,
    period_end: Option<NaiveDate>,
    row_count: i32,
    error_rows: i32,
    source_file: Option<String>,
    submitted_by: String,
    state: String,
    validation_json: Option<String>,
    submitted_at: DateTime<Utc>,
    approved_at: Option<DateTime<Utc>>,
    approved_by: Option<String>,
    notes: Option<String>,
}

const BATCH_COLUMNS: &str = "batch_id, report_code, period_kind, period_start, period_end, \
     row_count, error_rows, source_file, submitted_by, state, validation_json, \
     submitted_at, approved_at, approved_by, notes";

fn read_raw_batch(row: &Row<'_>) -> rusqlite::Result<RawBatchRow> {
    Ok(RawBatchRow {
        batch_id: row.get(0)?,
        report_code: row.get(1)?,
        period_kind: row.get(2)?,
        period_start: row.get(3)?,
        period_end: row.get(4)?,
        row_count: row.get(5)?,
        error_rows: row.get(6)?,
        source_file: row.get(7)?,
        submitted_by: row.get(8)?,
        state: row.get(9)?,
        validation_json: row.get(10)?,
        submitted_at: row.get(11)?,
        approved_at: row.get(12)?,
        approved_by: row.get(13)?,
        notes: row.get(14)?,
    })
}

impl RawBatchRow {
    fn into_batch(self) -> Result<Batch, RepositoryError> {
        let period_kind =
            PeriodKind::parse(&self.period_kind).ok_or_else(|| RepositoryError::FieldValueError {
                field: "period_kind".to_string(),
                message: format!("无法识别的周期类型: {}", self.period_kind),
            })?;
        let state =
            BatchState::parse(&self.state).ok_or_else(|| RepositoryError::FieldValueError {
                field: "state".to_string(),
                message: format!("无法识别的批次状态: {}", self.state),
            })?;
        let validation_json = match self.validation_json {
            Some(raw) => Some(serde_json::from_str(&raw)?),
            None => None,
        };

        Ok(Batch {
            batch_id: self.batch_id,
            report_code: self.report_code,
            period_kind,
            period_start: self.period_start,
            period_end: self.period_end,
            row_count: self.row_count,
            error_rows: self.error_rows,
            source_file: self.source_file,
            submitted_by: self.submitted_by,
            state,
            validation_json,
            submitted_at: self.submitted_at,
            approved_at: self.approved_at,
            approved_by: self.approved_by,
            notes: self.notes,
        })
    }
}

impl BatchRepositoryImpl {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, RepositoryError> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（多个 Repository 共享同一连接时使用）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, RepositoryError> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

#[async_trait]
impl BatchRepository for BatchRepositoryImpl {
    async fn insert(&self, batch: &Batch) -> Result<(), RepositoryError> {
        let validation_json = batch
            .validation_json
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO load_batch (
                batch_id, report_code, period_kind, period_start, period_end,
                row_count, error_rows, source_file, submitted_by, state,
                validation_json, submitted_at, approved_at, approved_by, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                batch.batch_id,
                batch.report_code,
                batch.period_kind.as_str(),
                batch.period_start,
                batch.period_end,
                batch.row_count,
                batch.error_rows,
                batch.source_file,
                batch.submitted_by,
                batch.state.as_str(),
                validation_json,
                batch.submitted_at,
                batch.approved_at,
                batch.approved_by,
                batch.notes,
            ],
        )?;
        Ok(())
    }

    async fn find_by_id(&self, batch_id: &str) -> Result<Option<Batch>, RepositoryError> {
        let raw = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM load_batch WHERE batch_id = ?1",
                BATCH_COLUMNS
            ))?;
            let mut rows = stmt.query_map(params![batch_id], read_raw_batch)?;
            match rows.next() {
                Some(row) => Some(row?),
                None => None,
            }
        };

        raw.map(RawBatchRow::into_batch).transpose()
    }

    async fn find_overlapping(
        &self,
        report_code: &str,
        candidate: PeriodRange,
        excluding_batch_id: Option<&str>,
        states: &[BatchState],
    ) -> Result<Vec<String>, RepositoryError> {
        if states.is_empty() {
            return Ok(Vec::new());
        }
        // 状态值来自受控枚举的 as_str()，可直接拼入 SQL
        let state_list = states
            .iter()
            .map(|s| format!("'{}'", s.as_str()))
            .collect::<Vec<_>>()
            .join(", ");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT batch_id FROM load_batch
            WHERE report_code = ?1
              AND state IN ({state_list})
              AND (?2 IS NULL OR batch_id != ?2)
              AND period_start IS NOT NULL
              AND period_end IS NOT NULL
              AND period_start <= ?4
              AND period_end >= ?3
            ORDER BY submitted_at ASC
            "#
        ))?;

        let ids = stmt
            .query_map(
                params![report_code, excluding_batch_id, candidate.start, candidate.end],
                |row| row.get::<_, String>(0),
            )?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(ids)
    }

    async fn record_validation(
        &self,
        batch_id: &str,
        state: BatchState,
        report: &ValidationReport,
    ) -> Result<(), RepositoryError> {
        let report_json = serde_json::to_string(report)?;

        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE load_batch SET state = ?1, validation_json = ?2 WHERE batch_id = ?3",
            params![state.as_str(), report_json, batch_id],
        )?;

        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: "load_batch".to_string(),
                id: batch_id.to_string(),
            });
        }
        Ok(())
    }

    async fn mark_approved(
        &self,
        batch_id: &str,
        actor: &str,
        notes: Option<&str>,
        error_rows: i32,
    ) -> Result<(), RepositoryError> {
        let conn = self.lock()?;
        let updated = conn.execute(
            r#"
            UPDATE load_batch
            SET state = 'APPROVED',
                approved_at = ?1,
                approved_by = ?2,
                notes = COALESCE(?3, notes),
                error_rows = ?4
            WHERE batch_id = ?5
            "#,
            params![Utc::now(), actor, notes, error_rows, batch_id],
        )?;

        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: "load_batch".to_string(),
                id: batch_id.to_string(),
            });
        }
        Ok(())
    }

    async fn mark_rejected(&self, batch_id: &str, reason: &str) -> Result<(), RepositoryError> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE load_batch SET state = 'REJECTED', notes = ?1 WHERE batch_id = ?2",
            params![reason, batch_id],
        )?;

        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: "load_batch".to_string(),
                id: batch_id.to_string(),
            });
        }
        Ok(())
    }

    async fn list_by_report(&self, report_code: &str) -> Result<Vec<Batch>, RepositoryError> {
        let raws = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM load_batch WHERE report_code = ?1 ORDER BY submitted_at DESC",
                BATCH_COLUMNS
            ))?;
            // 先收集成自有 Vec 再离开锁作用域（查询游标借用 stmt/conn）
            let collected = stmt
                .query_map(params![report_code], read_raw_batch)?
                .collect::<rusqlite::Result<Vec<RawBatchRow>>>()?;
            collected
        };

        raws.into_iter().map(RawBatchRow::into_batch).collect()
    }

    async fn summarize(&self, batch_id: &str) -> Result<Option<BatchSummary>, RepositoryError> {
        let result = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(&format!(
                r#"
                SELECT {},
                    (SELECT COUNT(*) FROM staged_row WHERE batch_id = b.batch_id),
                    (SELECT COUNT(*) FROM accepted_row WHERE batch_id = b.batch_id)
                FROM load_batch b WHERE batch_id = ?1
                "#,
                BATCH_COLUMNS
            ))?;
            let mut rows = stmt.query_map(params![batch_id], |row| {
                let raw = read_raw_batch(row)?;
                let staged: i64 = row.get(15)?;
                let accepted: i64 = row.get(16)?;
                Ok((raw, staged, accepted))
            })?;
            match rows.next() {
                Some(row) => Some(row?),
                None => None,
            }
        };

        let Some((raw, staged, accepted)) = result else {
            return Ok(None);
        };
        let batch = raw.into_batch()?;

        Ok(Some(BatchSummary {
            batch_id: batch.batch_id,
            report_code: batch.report_code,
            state: batch.state,
            period_start: batch.period_start,
            period_end: batch.period_end,
            row_count: batch.row_count,
            error_rows: batch.error_rows,
            source_file: batch.source_file,
            submitted_by: batch.submitted_by,
            submitted_at: batch.submitted_at,
            approved_at: batch.approved_at,
            approved_by: batch.approved_by,
            staged_pending: staged as usize,
            accepted_count: accepted as usize,
        }))
    }
}
