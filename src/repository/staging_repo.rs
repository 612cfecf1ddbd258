// ==========================================
// 业务报表导入系统 - 暂存区 Repository Trait
// ==========================================
// 职责: 暂存行的事务化写入、有序读取、幂等丢弃
// 红线: Repository 不含业务规则（周期提取在生命周期层完成）
// ==========================================

use crate::domain::batch::StagedRow;
use crate::repository::error::RepositoryError;
use async_trait::async_trait;

// ==========================================
// StagingRepository Trait
// ==========================================
// 实现者: StagingRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait StagingRepository: Send + Sync {
    /// 批量插入暂存行（整个事务，失败全部回滚）
    ///
    /// # 返回
    /// - Ok(usize): 成功插入的行数（恒等于输入行数 —— 不允许静默丢行）
    async fn insert_rows(&self, rows: &[StagedRow]) -> Result<usize, RepositoryError>;

    /// 查询批次的全部暂存行（按 row_number 升序，保证错误报告顺序确定）
    async fn list_by_batch(&self, batch_id: &str) -> Result<Vec<StagedRow>, RepositoryError>;

    /// 丢弃批次的全部暂存行（驳回/迁移后清理，幂等）
    ///
    /// # 返回
    /// - Ok(usize): 删除的行数（重复调用返回 0）
    async fn discard_batch(&self, batch_id: &str) -> Result<usize, RepositoryError>;

    /// 批次暂存行计数
    async fn count_by_batch(&self, batch_id: &str) -> Result<usize, RepositoryError>;
}
