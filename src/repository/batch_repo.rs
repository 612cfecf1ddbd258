// ==========================================
// 业务报表导入系统 - 批次 Repository Trait
// ==========================================
// 职责: 定义批次相关数据访问接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::batch::{Batch, ValidationReport};
use crate::domain::types::{BatchState, PeriodRange};
use crate::repository::error::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// BatchSummary - 批次概览
// ==========================================
// 用途: 批次历史视图（含暂存/正式行计数）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: String,
    pub report_code: String,
    pub state: BatchState,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub row_count: i32,
    pub error_rows: i32,
    pub source_file: Option<String>,
    pub submitted_by: String,
    pub submitted_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub staged_pending: usize,  // 仍在暂存区的行数
    pub accepted_count: usize,  // 已迁入正式表的行数
}

// ==========================================
// BatchRepository Trait
// ==========================================
// 实现者: BatchRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait BatchRepository: Send + Sync {
    /// 插入新批次（状态 PENDING）
    async fn insert(&self, batch: &Batch) -> Result<(), RepositoryError>;

    /// 按 ID 查询批次
    async fn find_by_id(&self, batch_id: &str) -> Result<Option<Batch>, RepositoryError>;

    /// 查询同报表下周期与候选区间相交的批次 ID
    ///
    /// 扫描范围: states 指定的状态集合（校验期 VALIDATED+APPROVED，
    ///           审批复查只看 APPROVED），可排除指定批次（编辑场景）
    /// 判定条件: 闭区间相交（candidate.start <= existing.end AND candidate.end >= existing.start）
    ///
    /// # 返回
    /// - 全部冲突批次 ID（不只第一个），按提交时间排序
    async fn find_overlapping(
        &self,
        report_code: &str,
        candidate: PeriodRange,
        excluding_batch_id: Option<&str>,
        states: &[BatchState],
    ) -> Result<Vec<String>, RepositoryError>;

    /// 记录校验结果
    ///
    /// 校验通过 → state=VALIDATED；未通过 → state 保持 PENDING
    /// 两种情况都落盘校验报告（审计要求）
    async fn record_validation(
        &self,
        batch_id: &str,
        state: BatchState,
        report: &ValidationReport,
    ) -> Result<(), RepositoryError>;

    /// 批次封账（审批通过）
    ///
    /// 记录审批人/时间/备注与行级错误落账
    async fn mark_approved(
        &self,
        batch_id: &str,
        actor: &str,
        notes: Option<&str>,
        error_rows: i32,
    ) -> Result<(), RepositoryError>;

    /// 批次驳回（终态）
    ///
    /// reason 写入 notes 字段；操作人随状态转换事件对外发布
    async fn mark_rejected(&self, batch_id: &str, reason: &str) -> Result<(), RepositoryError>;

    /// 查询报表下全部批次（按提交时间倒序）
    async fn list_by_report(&self, report_code: &str) -> Result<Vec<Batch>, RepositoryError>;

    /// 批次概览（含暂存/正式行计数）
    async fn summarize(&self, batch_id: &str) -> Result<Option<BatchSummary>, RepositoryError>;
}
