// ==========================================
// 业务报表导入系统 - 正式数据 Repository 实现
// ==========================================
// 存储: SQLite accepted_row 表
// 说明: payload 字段过滤使用 json_extract
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::batch::AcceptedRow;
use crate::repository::error::RepositoryError;
use crate::repository::report_data_repo::{ReportDataRepository, ReportDataStats};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// ReportDataRepositoryImpl
// ==========================================
pub struct ReportDataRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl ReportDataRepositoryImpl {
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

    /// JSON 标量 → SQL 绑定值
    fn json_scalar_to_sql(value: &JsonValue) -> SqlValue {
        match value {
            JsonValue::Null => SqlValue::Null,
            JsonValue::Bool(b) => SqlValue::Integer(*b as i64),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::Integer(i)
                } else {
                    SqlValue::Real(n.as_f64().unwrap_or(0.0))
                }
            }
            JsonValue::String(s) => SqlValue::Text(s.clone()),
            // 复合值按 JSON 文本比较
            other => SqlValue::Text(other.to_string()),
        }
    }
}

#[async_trait]
impl ReportDataRepository for ReportDataRepositoryImpl {
    async fn insert_many(&self, rows: &[AcceptedRow]) -> Result<Vec<String>, RepositoryError> {
        let mut serialized = Vec::with_capacity(rows.len());
        for row in rows {
            serialized.push((row, serde_json::to_string(&row.payload)?));
        }

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut ids = Vec::with_capacity(rows.len());
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO accepted_row (
                    row_id, report_code, payload_json, batch_id, accepted_at, accepted_by
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;

            for (row, payload) in &serialized {
                stmt.execute(params![
                    row.row_id,
                    row.report_code,
                    payload,
                    row.batch_id,
                    row.accepted_at,
                    row.accepted_by,
                ])?;
                ids.push(row.row_id.clone());
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        Ok(ids)
    }

    async fn query(
        &self,
        report_code: &str,
        filters: Option<&JsonMap<String, JsonValue>>,
        limit: usize,
    ) -> Result<Vec<AcceptedRow>, RepositoryError> {
        let mut sql = String::from(
            "SELECT row_id, report_code, payload_json, batch_id, accepted_at, accepted_by \
             FROM accepted_row WHERE report_code = ?",
        );
        let mut bind_values: Vec<SqlValue> = vec![SqlValue::Text(report_code.to_string())];

        if let Some(filters) = filters {
            for (field, value) in filters {
                sql.push_str(" AND json_extract(payload_json, ?) = ?");
                bind_values.push(SqlValue::Text(format!("$.{}", field)));
                bind_values.push(Self::json_scalar_to_sql(value));
            }
        }

        sql.push_str(" ORDER BY accepted_at DESC LIMIT ?");
        bind_values.push(SqlValue::Integer(limit as i64));

        let raws = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(&sql)?;
            // 先收集成自有 Vec 再离开锁作用域（查询游标借用 stmt/conn）
            let collected = stmt
                .query_map(params_from_iter(bind_values), |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, DateTime<Utc>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            collected
        };

        let mut results = Vec::with_capacity(raws.len());
        for (row_id, report_code, payload_json, batch_id, accepted_at, accepted_by) in raws {
            results.push(AcceptedRow {
                row_id,
                report_code,
                payload: serde_json::from_str(&payload_json)?,
                batch_id,
                accepted_at,
                accepted_by,
            });
        }

        Ok(results)
    }

    async fn ids_by_batch(&self, batch_id: &str) -> Result<Vec<String>, RepositoryError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT row_id FROM accepted_row WHERE batch_id = ?1 ORDER BY rowid ASC",
        )?;
        let ids = stmt
            .query_map(params![batch_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }

    async fn count_by_batch(&self, batch_id: &str) -> Result<usize, RepositoryError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM accepted_row WHERE batch_id = ?1",
            params![batch_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    async fn stats(&self, report_code: &str) -> Result<ReportDataStats, RepositoryError> {
        let conn = self.lock()?;
        let (total, first_accepted, last_accepted) = conn.query_row(
            "SELECT COUNT(*), MIN(accepted_at), MAX(accepted_at) \
             FROM accepted_row WHERE report_code = ?1",
            params![report_code],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<DateTime<Utc>>>(1)?,
                    row.get::<_, Option<DateTime<Utc>>>(2)?,
                ))
            },
        )?;

        Ok(ReportDataStats {
            total_rows: total as usize,
            first_accepted,
            last_accepted,
        })
    }
}
