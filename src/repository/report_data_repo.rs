// ==========================================
// 业务报表导入系统 - 正式数据 Repository Trait
// ==========================================
// 职责: 正式行的只增写入、溯源查询、统计
// 红线: 本子系统不暴露更新/删除（订正走新批次）
//       每一行必须携带非空的来源批次引用（可回答"这行来自哪个批次"）
// ==========================================

use crate::domain::batch::AcceptedRow;
use crate::repository::error::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

// ==========================================
// ReportDataStats - 报表数据统计
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDataStats {
    pub total_rows: usize,                     // 总行数
    pub first_accepted: Option<DateTime<Utc>>, // 首次入账时间
    pub last_accepted: Option<DateTime<Utc>>,  // 最近入账时间
}

// ==========================================
// ReportDataRepository Trait
// ==========================================
// 实现者: ReportDataRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait ReportDataRepository: Send + Sync {
    /// 批量插入正式行（整个事务，失败全部回滚）
    ///
    /// # 返回
    /// - Ok(Vec<String>): 新建行 ID 列表（与输入顺序一致）
    async fn insert_many(&self, rows: &[AcceptedRow]) -> Result<Vec<String>, RepositoryError>;

    /// 查询报表正式数据（按入账时间倒序）
    ///
    /// # 参数
    /// - filters: 按 payload 字段等值过滤（JSON 字段）
    /// - limit: 返回行数上限
    async fn query(
        &self,
        report_code: &str,
        filters: Option<&JsonMap<String, JsonValue>>,
        limit: usize,
    ) -> Result<Vec<AcceptedRow>, RepositoryError>;

    /// 查询批次产生的全部正式行 ID（溯源 + 审批幂等重放）
    async fn ids_by_batch(&self, batch_id: &str) -> Result<Vec<String>, RepositoryError>;

    /// 批次产生的正式行计数
    async fn count_by_batch(&self, batch_id: &str) -> Result<usize, RepositoryError>;

    /// 报表数据统计
    async fn stats(&self, report_code: &str) -> Result<ReportDataStats, RepositoryError>;
}
