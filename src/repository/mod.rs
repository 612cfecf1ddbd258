// ==========================================
// 业务报表导入系统 - 数据仓储层
// ==========================================
// 职责: 批次/暂存行/正式行的数据访问
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

pub mod batch_repo;
pub mod batch_repo_impl;
pub mod error;
pub mod report_data_repo;
pub mod report_data_repo_impl;
pub mod schema;
pub mod staging_repo;
pub mod staging_repo_impl;

// 重导出
pub use batch_repo::{BatchRepository, BatchSummary};
pub use batch_repo_impl::BatchRepositoryImpl;
pub use error::RepositoryError;
pub use report_data_repo::{ReportDataRepository, ReportDataStats};
pub use report_data_repo_impl::ReportDataRepositoryImpl;
pub use schema::init_schema;
pub use staging_repo::StagingRepository;
pub use staging_repo_impl::StagingRepositoryImpl;
