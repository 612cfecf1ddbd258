// ==========================================
// 业务报表导入系统 - 生命周期层模块
// ==========================================
// 职责: 批次状态机编排（提交/校验/审批/驳回）与暂存服务
// ==========================================

pub mod batch_lifecycle;
pub mod batch_lifecycle_impl;
pub mod error;
pub mod events;
pub mod locks;
pub mod staging;

pub use batch_lifecycle::BatchLifecycle;
pub use batch_lifecycle_impl::BatchLifecycleImpl;
pub use error::IngestError;
pub use events::{BatchTransition, CollectingListener, NoopListener, TransitionListener};
pub use locks::ReportLockRegistry;
pub use staging::StagingService;
