// ==========================================
// 业务报表导入系统 - 配置层
// ==========================================
// 职责: 周期策略与导入配置的读取接口与实现
// ==========================================

pub mod ingest_config_trait;
pub mod policy_manager;

// 重导出
pub use ingest_config_trait::{ConfigError, IngestConfigReader};
pub use policy_manager::{
    PolicyManager, DEFAULT_MAX_ROW_ERRORS, DEFAULT_MIN_BATCH_ROWS, KEY_MAX_ROW_ERRORS,
    KEY_MIN_BATCH_ROWS,
};
