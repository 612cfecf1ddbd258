// ==========================================
// 业务报表导入系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、周期策略
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod batch;
pub mod policy;
pub mod types;

// 重导出核心类型
pub use batch::{
    AcceptedRow, ApproveOutcome, Batch, BatchSnapshot, RowError, StagedRow, SubmitRequest,
    ValidationFinding, ValidationReport,
};
pub use policy::ReportPeriodPolicy;
pub use types::{BatchState, FindingKind, PeriodKind, PeriodRange};
