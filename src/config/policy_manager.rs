// ==========================================
// 业务报表导入系统 - 周期策略管理器
// ==========================================
// 职责: 周期策略与导入配置的加载、查询、覆写
// 存储: report_config 表 + config_kv 表 (key-value + scope)
// ==========================================

use crate::config::ingest_config_trait::{ConfigError, IngestConfigReader};
use crate::db::open_sqlite_connection;
use crate::domain::policy::ReportPeriodPolicy;
use crate::domain::types::PeriodKind;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

/// 批次最小行数下限（config_kv 键）
pub const KEY_MIN_BATCH_ROWS: &str = "ingest.min_batch_rows";
/// 行级错误容忍上限（config_kv 键）
pub const KEY_MAX_ROW_ERRORS: &str = "ingest.max_row_errors";

/// 默认批次最小行数
pub const DEFAULT_MIN_BATCH_ROWS: usize = 2;
/// 默认行级错误容忍上限
pub const DEFAULT_MAX_ROW_ERRORS: usize = 0;

// ==========================================
// PolicyManager - 周期策略管理器
// ==========================================
pub struct PolicyManager {
    conn: Arc<Mutex<Connection>>,
}

impl PolicyManager {
    /// 创建新的 PolicyManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, ConfigError> {
        let conn =
            open_sqlite_connection(db_path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ConfigError> {
        self.conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let conn = self.lock()?;

        conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| ConfigError::ReadError(e.to_string()))
    }

    /// 读取 usize 型配置值（缺省回退到默认值）
    fn get_usize_config(&self, key: &str, default: usize) -> Result<usize, ConfigError> {
        match self.get_config_value(key)? {
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| ConfigError::ValueError {
                key: key.to_string(),
                value: raw.clone(),
                message: e.to_string(),
            }),
            None => Ok(default),
        }
    }

    /// 写入 config_kv 配置值（scope_id='global'，覆写）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
            ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value
            "#,
            params![key, value],
        )
        .map_err(|e| ConfigError::ReadError(e.to_string()))?;
        Ok(())
    }

    /// 写入/覆写报表周期策略
    ///
    /// 说明: 已有数据的报表变更策略属于显式迁移场景，由调用方把关
    pub fn upsert_period_policy(&self, policy: &ReportPeriodPolicy) -> Result<(), ConfigError> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO report_config (report_code, period_kind, date_field, requires_period, updated_at)
            VALUES (?1, ?2, ?3, ?4, datetime('now'))
            ON CONFLICT(report_code) DO UPDATE SET
                period_kind = excluded.period_kind,
                date_field = excluded.date_field,
                requires_period = excluded.requires_period,
                updated_at = excluded.updated_at
            "#,
            params![
                policy.report_code,
                policy.period_kind.as_str(),
                policy.date_field,
                policy.requires_period as i64,
            ],
        )
        .map_err(|e| ConfigError::ReadError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl IngestConfigReader for PolicyManager {
    async fn get_period_policy(
        &self,
        report_code: &str,
    ) -> Result<Option<ReportPeriodPolicy>, ConfigError> {
        let raw = {
            let conn = self.lock()?;
            conn.query_row(
                "SELECT period_kind, date_field, requires_period \
                 FROM report_config WHERE report_code = ?1",
                params![report_code],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| ConfigError::ReadError(e.to_string()))?
        };

        let Some((kind_raw, date_field, requires_period)) = raw else {
            return Ok(None);
        };

        let period_kind =
            PeriodKind::parse(&kind_raw).ok_or_else(|| ConfigError::InvalidPeriodKind {
                report_code: report_code.to_string(),
                value: kind_raw,
            })?;

        Ok(Some(ReportPeriodPolicy {
            report_code: report_code.to_string(),
            period_kind,
            date_field,
            requires_period: requires_period != 0,
        }))
    }

    async fn get_min_batch_rows(&self) -> Result<usize, ConfigError> {
        self.get_usize_config(KEY_MIN_BATCH_ROWS, DEFAULT_MIN_BATCH_ROWS)
    }

    async fn get_max_row_errors(&self) -> Result<usize, ConfigError> {
        self.get_usize_config(KEY_MAX_ROW_ERRORS, DEFAULT_MAX_ROW_ERRORS)
    }
}
