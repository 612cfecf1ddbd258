// ==========================================
// 业务报表导入系统 - 批次生命周期 Trait
// ==========================================
// 职责: 定义批次状态机的对外操作接口
// 生命周期: PENDING → VALIDATED → APPROVED（终态，触发迁移）
//           PENDING|VALIDATED → REJECTED（终态，丢弃暂存）
// 失败策略: 所有操作对各自终态幂等（重放 approve 返回原结果而非报错，
//           以容忍上游 HTTP 层的请求重试）
// ==========================================

use crate::domain::batch::{ApproveOutcome, BatchSnapshot, SubmitRequest};
use crate::lifecycle::error::IngestError;
use async_trait::async_trait;

// ==========================================
// BatchLifecycle Trait
// ==========================================
// 实现者: BatchLifecycleImpl
#[async_trait]
pub trait BatchLifecycle: Send + Sync {
    /// 提交批次
    ///
    /// 创建 PENDING 批次并暂存全部行；批次候选周期取首条带周期的行
    /// （人工指定周期的提交通过 request.manual_period 覆盖）
    ///
    /// # 错误
    /// - EmptyBatch / BelowMinimumRows: 行数不足，批次不会创建
    /// - ReportNotFound: 报表未配置
    /// - InvalidPeriodKind: 策略中的周期类型无法识别
    async fn submit(&self, request: SubmitRequest) -> Result<BatchSnapshot, IngestError>;

    /// 校验批次
    ///
    /// 聚合行级错误 + 周期重叠检查；通过 → VALIDATED，
    /// 未通过 → 保持 PENDING 并把发现返回给调用方修正（不自动驳回）。
    /// 校验报告无论通过与否都会落盘（审计）
    async fn validate(&self, batch_id: &str) -> Result<BatchSnapshot, IngestError>;

    /// 审批批次（终态）
    ///
    /// 在报表级互斥区内复查重叠（封堵并发校验竞态），
    /// 把无行级错误的暂存行迁入正式表，出错行计入错误统计
    ///
    /// # 错误
    /// - ConflictAtApproval: 复查发现新的周期冲突
    /// - InvalidStateTransition: 批次不在 VALIDATED（已 APPROVED 除外，幂等返回）
    async fn approve(
        &self,
        batch_id: &str,
        actor: &str,
        notes: Option<String>,
    ) -> Result<ApproveOutcome, IngestError>;

    /// 驳回批次（终态，不可逆）
    ///
    /// 丢弃全部暂存行并记录原因；重复驳回幂等
    async fn reject(
        &self,
        batch_id: &str,
        actor: &str,
        reason: &str,
    ) -> Result<BatchSnapshot, IngestError>;
}
