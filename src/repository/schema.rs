// ==========================================
// 业务报表导入系统 - 数据库 Schema
// ==========================================
// 逻辑表: report_config / load_batch / staged_row / accepted_row
// 关系: staged_row.batch_id → load_batch（级联删除，暂存行随批次销毁）
//       accepted_row.batch_id → load_batch（审计引用，不级联）
// ==========================================

use crate::db::CURRENT_SCHEMA_VERSION;
use crate::repository::error::RepositoryError;
use rusqlite::Connection;

/// 初始化全部表与索引（幂等）
pub fn init_schema(conn: &Connection) -> Result<(), RepositoryError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- 报表配置（周期策略）
        CREATE TABLE IF NOT EXISTS report_config (
            report_code     TEXT PRIMARY KEY,
            report_name     TEXT,
            period_kind     TEXT NOT NULL DEFAULT 'FREE',
            date_field      TEXT,
            requires_period INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- 导入批次（生命周期: PENDING/VALIDATED/APPROVED/REJECTED）
        CREATE TABLE IF NOT EXISTS load_batch (
            batch_id        TEXT PRIMARY KEY,
            report_code     TEXT NOT NULL REFERENCES report_config(report_code) ON DELETE CASCADE,
            period_kind     TEXT NOT NULL,
            period_start    TEXT,
            period_end      TEXT,
            row_count       INTEGER NOT NULL DEFAULT 0,
            error_rows      INTEGER NOT NULL DEFAULT 0,
            source_file     TEXT,
            submitted_by    TEXT NOT NULL,
            state           TEXT NOT NULL DEFAULT 'PENDING',
            validation_json TEXT,
            submitted_at    TEXT NOT NULL,
            approved_at     TEXT,
            approved_by     TEXT,
            notes           TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_batch_report ON load_batch(report_code);
        CREATE INDEX IF NOT EXISTS idx_batch_state ON load_batch(state);
        CREATE INDEX IF NOT EXISTS idx_batch_period ON load_batch(period_start, period_end);

        -- 暂存行（审批前的临时持有区）
        CREATE TABLE IF NOT EXISTS staged_row (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id       TEXT NOT NULL REFERENCES load_batch(batch_id) ON DELETE CASCADE,
            report_code    TEXT NOT NULL,
            payload_json   TEXT NOT NULL,
            row_number     INTEGER NOT NULL,
            extracted_date TEXT,
            period_start   TEXT,
            period_end     TEXT,
            errors_json    TEXT NOT NULL DEFAULT '[]',
            created_at     TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_staged_batch ON staged_row(batch_id);
        CREATE INDEX IF NOT EXISTS idx_staged_period ON staged_row(period_start, period_end);

        -- 正式行（只增，订正走新批次）
        CREATE TABLE IF NOT EXISTS accepted_row (
            row_id       TEXT PRIMARY KEY,
            report_code  TEXT NOT NULL,
            payload_json TEXT NOT NULL,
            batch_id     TEXT NOT NULL REFERENCES load_batch(batch_id),
            accepted_at  TEXT NOT NULL,
            accepted_by  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_accepted_report ON accepted_row(report_code);
        CREATE INDEX IF NOT EXISTS idx_accepted_batch ON accepted_row(batch_id);

        -- 全局配置（key-value + scope）
        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key      TEXT NOT NULL,
            value    TEXT NOT NULL,
            PRIMARY KEY (scope_id, key)
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}
