// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、策略播种、请求构造等功能
// ==========================================

use report_ingest::config::{PolicyManager, KEY_MAX_ROW_ERRORS, KEY_MIN_BATCH_ROWS};
use report_ingest::domain::policy::ReportPeriodPolicy;
use report_ingest::domain::types::PeriodKind;
use report_ingest::repository::{
    init_schema, BatchRepositoryImpl, ReportDataRepositoryImpl, StagingRepositoryImpl,
};
use report_ingest::{BatchLifecycleImpl, SubmitRequest};
use rusqlite::Connection;
use serde_json::{json, Map as JsonMap, Value as JsonValue};
use std::error::Error;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// 测试用生命周期类型（全部生产实现拼装）
pub type TestLifecycle = BatchLifecycleImpl<
    BatchRepositoryImpl,
    StagingRepositoryImpl,
    ReportDataRepositoryImpl,
    PolicyManager,
>;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = Connection::open(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 拼装完整的批次生命周期（各仓储独立连接同一数据库文件）
pub fn create_lifecycle(db_path: &str) -> TestLifecycle {
    let batch_repo = Arc::new(BatchRepositoryImpl::new(db_path).expect("创建批次仓储失败"));
    let staging_repo = Arc::new(StagingRepositoryImpl::new(db_path).expect("创建暂存仓储失败"));
    let data_repo = Arc::new(ReportDataRepositoryImpl::new(db_path).expect("创建正式仓储失败"));
    let config = PolicyManager::new(db_path).expect("创建配置读取器失败");

    BatchLifecycleImpl::new(batch_repo, staging_repo, data_repo, config)
}

/// 播种一个月度周期策略（字段 fecha，强制周期）
pub fn seed_monthly_policy(db_path: &str, report_code: &str) {
    let manager = PolicyManager::new(db_path).expect("创建 PolicyManager 失败");
    manager
        .upsert_period_policy(&ReportPeriodPolicy {
            report_code: report_code.to_string(),
            period_kind: PeriodKind::Monthly,
            date_field: Some("fecha".to_string()),
            requires_period: true,
        })
        .expect("播种月度策略失败");
}

/// 播种一个 FREE（自由周期）策略
pub fn seed_free_policy(db_path: &str, report_code: &str) {
    let manager = PolicyManager::new(db_path).expect("创建 PolicyManager 失败");
    manager
        .upsert_period_policy(&ReportPeriodPolicy::free(report_code))
        .expect("播种 FREE 策略失败");
}

/// 覆写行级错误容忍上限
pub fn set_max_row_errors(db_path: &str, max: usize) {
    let manager = PolicyManager::new(db_path).expect("创建 PolicyManager 失败");
    manager
        .set_config_value(KEY_MAX_ROW_ERRORS, &max.to_string())
        .expect("覆写 max_row_errors 失败");
}

/// 覆写批次最小行数下限
pub fn set_min_batch_rows(db_path: &str, min: usize) {
    let manager = PolicyManager::new(db_path).expect("创建 PolicyManager 失败");
    manager
        .set_config_value(KEY_MIN_BATCH_ROWS, &min.to_string())
        .expect("覆写 min_batch_rows 失败");
}

/// 构造带 fecha/monto 字段的输入行
pub fn rows_with_dates(dates: &[&str]) -> Vec<JsonMap<String, JsonValue>> {
    dates
        .iter()
        .enumerate()
        .map(|(idx, date)| {
            let mut row = JsonMap::new();
            row.insert("fecha".to_string(), json!(date));
            row.insert("monto".to_string(), json!((idx as i64 + 1) * 100));
            row
        })
        .collect()
}

/// 构造没有日期字段的输入行
pub fn rows_without_dates(count: usize) -> Vec<JsonMap<String, JsonValue>> {
    (0..count)
        .map(|idx| {
            let mut row = JsonMap::new();
            row.insert("monto".to_string(), json!((idx as i64 + 1) * 10));
            row
        })
        .collect()
}

/// 构造标准提交请求
pub fn submit_request(report_code: &str, rows: Vec<JsonMap<String, JsonValue>>) -> SubmitRequest {
    SubmitRequest {
        report_code: report_code.to_string(),
        rows,
        source_file: Some("ventas_enero.xlsx".to_string()),
        submitted_by: "analista".to_string(),
        manual_period: None,
    }
}
