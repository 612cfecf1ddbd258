// ==========================================
// 业务报表导入系统 - SQLite 连接初始化
// ==========================================
// 约束:
// - 各仓储持独立连接并发读写同一库文件（审批与查询并行），
//   需要 WAL + busy_timeout 兜底写竞争
// - staged_row 依赖级联删除，foreign_keys 必须每连接开启
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;
use tracing::warn;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
///
/// 版本号只用于提示/告警（不做自动迁移），避免静默在旧库上运行
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// foreign_keys 与 busy_timeout 都是连接级设置，每个连接单独生效
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    // journal_mode 返回结果行，不能走 execute
    conn.query_row("PRAGMA journal_mode = WAL", [], |_row| Ok(()))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
///
/// 库已初始化但版本与代码不符时告警（新库尚无 schema_version 表，跳过）
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;

    if let Some(version) = read_schema_version(&conn)? {
        if version != CURRENT_SCHEMA_VERSION {
            warn!(
                found = version,
                expected = CURRENT_SCHEMA_VERSION,
                "schema_version 与代码期望不一致，继续运行可能产生隐性错误"
            );
        }
    }
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
