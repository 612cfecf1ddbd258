// ==========================================
// 业务报表导入系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 周期感知的报表数据导入管道
// 红线: 每一行输入只有两种去向 —— 迁入正式表或计入错误统计，不允许静默丢弃
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 周期计算与重叠校验
pub mod engine;

// 生命周期层 - 批次状态机编排
pub mod lifecycle;

// 配置层 - 周期策略与导入配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{BatchState, FindingKind, PeriodKind, PeriodRange};

// 领域实体
pub use domain::{
    AcceptedRow, ApproveOutcome, Batch, BatchSnapshot, ReportPeriodPolicy, RowError, StagedRow,
    SubmitRequest, ValidationFinding, ValidationReport,
};

// 引擎
pub use engine::{compute_period, OverlapCheck, OverlapValidator};

// 生命周期
pub use lifecycle::{
    BatchLifecycle, BatchLifecycleImpl, BatchTransition, CollectingListener, IngestError,
    NoopListener, ReportLockRegistry, StagingService, TransitionListener,
};

// 配置
pub use config::{IngestConfigReader, PolicyManager};

// 仓储
pub use repository::{
    BatchRepository, BatchRepositoryImpl, BatchSummary, ReportDataRepository,
    ReportDataRepositoryImpl, ReportDataStats, RepositoryError, StagingRepository,
    StagingRepositoryImpl,
};
