// ==========================================
// 业务报表导入系统 - 日志系统初始化
// ==========================================
// 使用 tracing 和 tracing-subscriber
// 说明: 生命周期操作都挂 #[instrument]，批次 ID / 报表代码
//       作为结构化字段输出，便于按批次串起整条导入链路
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

fn env_filter() -> EnvFilter {
    // 默认只放行本库的 info 级别
    // 例如: RUST_LOG=report_ingest=debug 或 RUST_LOG=report_ingest::lifecycle=trace
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("report_ingest=info"))
}

/// 初始化日志系统（人读格式）
pub fn init() {
    fmt().with_env_filter(env_filter()).with_target(true).init();
}

/// 初始化日志系统（JSON 行格式，供日志采集管道消费）
pub fn init_json() {
    fmt().json().with_env_filter(env_filter()).init();
}

/// 初始化测试环境的日志系统
///
/// 输出走 test writer，重复初始化静默忽略
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("report_ingest=debug"))
        .with_test_writer()
        .try_init();
}
