// ==========================================
// 业务报表导入系统 - 生命周期层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 传播策略: 行级错误不在此处 —— 它们累积进校验报告；
//           此处只承载整批中止条件（空输入、坏策略、重叠、非法转换）
// ==========================================

use crate::config::ingest_config_trait::ConfigError;
use crate::domain::types::BatchState;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 生命周期层错误类型
#[derive(Error, Debug)]
pub enum IngestError {
    // ===== 提交期错误（批次未进入 PENDING）=====
    #[error("空批次: 没有任何输入行")]
    EmptyBatch,

    #[error("批次行数不足: 收到 {got} 行，至少需要 {min} 行")]
    BelowMinimumRows { got: usize, min: usize },

    // ===== 配置错误 =====
    #[error("报表不存在: {0}")]
    ReportNotFound(String),

    #[error("无法识别的周期类型: {0}")]
    InvalidPeriodKind(String),

    #[error("配置读取失败: {0}")]
    ConfigReadError(String),

    // ===== 审批期错误 =====
    #[error("审批时发现周期冲突，冲突批次: {conflicting:?}")]
    ConflictAtApproval { conflicting: Vec<String> },

    // ===== 状态机错误 =====
    #[error("无效的状态转换: batch={batch_id} from={from} to={to}")]
    InvalidStateTransition {
        batch_id: String,
        from: BatchState,
        to: BatchState,
    },

    #[error("批次未找到: {0}")]
    BatchNotFound(String),

    // ===== 下层透传 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ConfigError> for IngestError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::InvalidPeriodKind { value, .. } => IngestError::InvalidPeriodKind(value),
            other => IngestError::ConfigReadError(other.to_string()),
        }
    }
}
