// ==========================================
// 业务报表导入系统 - 暂存区 Repository 实现
// ==========================================
// 存储: SQLite staged_row 表
// 说明: payload 与行级错误以 JSON 文本列存储
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::batch::{RowError, StagedRow};
use crate::repository::error::RepositoryError;
use crate::repository::staging_repo::StagingRepository;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// StagingRepositoryImpl
// ==========================================
pub struct StagingRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl StagingRepositoryImpl {
    /// 创建新的 Repository 实例
    pub fn new(db_path: &str) -> Result<Self, RepositoryError> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建
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
impl StagingRepository for StagingRepositoryImpl {
    async fn insert_rows(&self, rows: &[StagedRow]) -> Result<usize, RepositoryError> {
        // 序列化在事务外完成，避免持锁期间失败
        let mut serialized = Vec::with_capacity(rows.len());
        for row in rows {
            let payload = serde_json::to_string(&row.payload)?;
            let errors = serde_json::to_string(&row.errors)?;
            serialized.push((row, payload, errors));
        }

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO staged_row (
                    batch_id, report_code, payload_json, row_number,
                    extracted_date, period_start, period_end, errors_json, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )?;

            for (row, payload, errors) in &serialized {
                stmt.execute(params![
                    row.batch_id,
                    row.report_code,
                    payload,
                    row.row_number as i64,
                    row.extracted_date,
                    row.period_start,
                    row.period_end,
                    errors,
                    row.created_at,
                ])?;
                count += 1;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        Ok(count)
    }

    async fn list_by_batch(&self, batch_id: &str) -> Result<Vec<StagedRow>, RepositoryError> {
        let raws = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(
                r#"
                SELECT batch_id, report_code, payload_json, row_number,
                       extracted_date, period_start, period_end, errors_json, created_at
                FROM staged_row
                WHERE batch_id = ?1
                ORDER BY row_number ASC
                "#,
            )?;

            // 先收集成自有 Vec 再离开锁作用域（查询游标借用 stmt/conn）
            let collected = stmt
                .query_map(params![batch_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<NaiveDate>>(4)?,
                        row.get::<_, Option<NaiveDate>>(5)?,
                        row.get::<_, Option<NaiveDate>>(6)?,
                        row.get::<_, String>(7)?,
                        row.get::<_, DateTime<Utc>>(8)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            collected
        };

        let mut staged = Vec::with_capacity(raws.len());
        for (
            batch_id,
            report_code,
            payload_json,
            row_number,
            extracted_date,
            period_start,
            period_end,
            errors_json,
            created_at,
        ) in raws
        {
            let payload = serde_json::from_str(&payload_json)?;
            let errors: Vec<RowError> = serde_json::from_str(&errors_json)?;
            staged.push(StagedRow {
                batch_id,
                report_code,
                payload,
                row_number: row_number as usize,
                extracted_date,
                period_start,
                period_end,
                errors,
                created_at,
            });
        }

        Ok(staged)
    }

    async fn discard_batch(&self, batch_id: &str) -> Result<usize, RepositoryError> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM staged_row WHERE batch_id = ?1",
            params![batch_id],
        )?;
        Ok(deleted)
    }

    async fn count_by_batch(&self, batch_id: &str) -> Result<usize, RepositoryError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM staged_row WHERE batch_id = ?1",
            params![batch_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
