// ==========================================
// 业务报表导入系统 - 批次生命周期实现
// ==========================================
// 职责: 编排 提交 → 暂存 → 校验 → 审批/驳回 全流程
// 流程: 构造暂存行 → 确定候选周期 → 建批次 → 落库暂存 →
//       校验（行级错误 + 重叠）→ 审批（锁内复查 + 迁移）
// 红线: 审批必须在报表级互斥区内复查重叠 ——
//       两个并发审批不得同时写入相交周期
// ==========================================

use crate::config::ingest_config_trait::IngestConfigReader;
use crate::domain::batch::{
    AcceptedRow, ApproveOutcome, Batch, BatchSnapshot, SubmitRequest, ValidationFinding,
    ValidationReport,
};
use crate::domain::policy::ReportPeriodPolicy;
use crate::domain::types::{BatchState, FindingKind};
use crate::engine::overlap::OverlapValidator;
use crate::lifecycle::batch_lifecycle::BatchLifecycle;
use crate::lifecycle::error::IngestError;
use crate::lifecycle::events::{BatchTransition, NoopListener, TransitionListener};
use crate::lifecycle::locks::ReportLockRegistry;
use crate::lifecycle::staging::StagingService;
use crate::repository::batch_repo::BatchRepository;
use crate::repository::report_data_repo::ReportDataRepository;
use crate::repository::staging_repo::StagingRepository;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// 系统内部操作（校验）的审计标识
const SYSTEM_ACTOR: &str = "system";

// ==========================================
// BatchLifecycleImpl - 批次生命周期实现
// ==========================================
pub struct BatchLifecycleImpl<B, S, D, C>
where
    B: BatchRepository,
    S: StagingRepository,
    D: ReportDataRepository,
    C: IngestConfigReader,
{
    // 数据访问层
    batch_repo: Arc<B>,
    data_repo: Arc<D>,

    // 暂存服务
    staging: StagingService<S>,

    // 配置读取器
    config: C,

    // 重叠校验器（与审批复查共用一条读路径）
    overlap: OverlapValidator<B>,

    // 报表级互斥锁（审批竞态防护）
    locks: ReportLockRegistry,

    // 状态转换监听（外围审计/通知）
    listener: Arc<dyn TransitionListener>,
}

impl<B, S, D, C> BatchLifecycleImpl<B, S, D, C>
where
    B: BatchRepository,
    S: StagingRepository,
    D: ReportDataRepository,
    C: IngestConfigReader,
{
    /// 创建新的 BatchLifecycle 实例
    ///
    /// # 参数
    /// - batch_repo: 批次仓储
    /// - staging_repo: 暂存区仓储
    /// - data_repo: 正式数据仓储
    /// - config: 配置读取器
    pub fn new(batch_repo: Arc<B>, staging_repo: Arc<S>, data_repo: Arc<D>, config: C) -> Self {
        let overlap = OverlapValidator::new(batch_repo.clone());
        Self {
            batch_repo,
            data_repo,
            staging: StagingService::new(staging_repo),
            config,
            overlap,
            locks: ReportLockRegistry::new(),
            listener: Arc::new(NoopListener),
        }
    }

    /// 注入状态转换监听器
    pub fn with_listener(mut self, listener: Arc<dyn TransitionListener>) -> Self {
        self.listener = listener;
        self
    }

    /// 加载批次（不存在 → BatchNotFound）
    async fn load_batch(&self, batch_id: &str) -> Result<Batch, IngestError> {
        self.batch_repo
            .find_by_id(batch_id)
            .await?
            .ok_or_else(|| IngestError::BatchNotFound(batch_id.to_string()))
    }

    /// 加载报表周期策略（报表不存在 → ReportNotFound）
    async fn load_policy(&self, report_code: &str) -> Result<ReportPeriodPolicy, IngestError> {
        self.config
            .get_period_policy(report_code)
            .await?
            .ok_or_else(|| IngestError::ReportNotFound(report_code.to_string()))
    }

    /// 发布状态转换事件
    fn publish(
        &self,
        batch: &Batch,
        old_state: Option<BatchState>,
        new_state: BatchState,
        actor: &str,
    ) {
        let event =
            BatchTransition::new(&batch.batch_id, &batch.report_code, old_state, new_state, actor);
        self.listener.on_transition(&event);
    }

    /// 已审批批次的幂等重放（返回原结果，不产生新正式行）
    async fn replay_approved(&self, batch: &Batch) -> Result<ApproveOutcome, IngestError> {
        let ids = self.data_repo.ids_by_batch(&batch.batch_id).await?;
        debug!(
            batch_id = %batch.batch_id,
            accepted = ids.len(),
            "批次已审批，幂等返回原结果"
        );
        Ok(ApproveOutcome {
            snapshot: batch.snapshot(),
            migrated: ids.len(),
            dropped_error_rows: batch.error_rows as usize,
            accepted_row_ids: ids,
        })
    }
}

#[async_trait::async_trait]
impl<B, S, D, C> BatchLifecycle for BatchLifecycleImpl<B, S, D, C>
where
    B: BatchRepository + Send + Sync,
    S: StagingRepository + Send + Sync,
    D: ReportDataRepository + Send + Sync,
    C: IngestConfigReader + Send + Sync,
{
    #[instrument(skip(self, request), fields(report_code = %request.report_code))]
    async fn submit(&self, request: SubmitRequest) -> Result<BatchSnapshot, IngestError> {
        // === 步骤 1: 行数下限检查（不达标不建批次）===
        if request.rows.is_empty() {
            return Err(IngestError::EmptyBatch);
        }
        let min_rows = self.config.get_min_batch_rows().await?;
        if request.rows.len() < min_rows {
            return Err(IngestError::BelowMinimumRows {
                got: request.rows.len(),
                min: min_rows,
            });
        }

        // === 步骤 2: 加载周期策略 ===
        let policy = self.load_policy(&request.report_code).await?;

        let batch_id = Uuid::new_v4().to_string();
        let row_count = request.rows.len();
        info!(
            batch_id = %batch_id,
            rows = row_count,
            period_kind = %policy.period_kind,
            "开始提交批次"
        );

        // === 步骤 3: 构造暂存行（周期标注 + 行级错误）===
        let staged_rows = self.staging.prepare(&batch_id, &policy, request.rows);

        // === 步骤 4: 确定批次候选周期 ===
        // 人工指定优先；否则取首条带周期的行（周期是派生值，非用户直填）
        let period = request
            .manual_period
            .or_else(|| StagingService::<S>::candidate_period(&staged_rows));

        // === 步骤 5: 创建 PENDING 批次 ===
        let batch = Batch {
            batch_id: batch_id.clone(),
            report_code: request.report_code.clone(),
            period_kind: policy.period_kind,
            period_start: period.map(|p| p.start),
            period_end: period.map(|p| p.end),
            row_count: row_count as i32,
            error_rows: 0,
            source_file: request.source_file,
            submitted_by: request.submitted_by.clone(),
            state: BatchState::Pending,
            validation_json: None,
            submitted_at: Utc::now(),
            approved_at: None,
            approved_by: None,
            notes: None,
        };
        self.batch_repo.insert(&batch).await?;

        // === 步骤 6: 落库暂存行 ===
        let staged = self.staging.stage(&staged_rows).await?;
        info!(
            batch_id = %batch_id,
            staged = staged,
            period = ?period,
            "批次提交完成"
        );

        self.publish(&batch, None, BatchState::Pending, &request.submitted_by);
        Ok(batch.snapshot())
    }

    #[instrument(skip(self))]
    async fn validate(&self, batch_id: &str) -> Result<BatchSnapshot, IngestError> {
        let mut batch = self.load_batch(batch_id).await?;

        match batch.state {
            BatchState::Pending => {}
            // 重复校验视为无操作，返回已落盘的结果
            BatchState::Validated => {
                debug!(batch_id = %batch_id, "批次已校验，返回已有结果");
                return Ok(batch.snapshot());
            }
            from @ (BatchState::Approved | BatchState::Rejected) => {
                return Err(IngestError::InvalidStateTransition {
                    batch_id: batch_id.to_string(),
                    from,
                    to: BatchState::Validated,
                });
            }
        }

        let policy = self.load_policy(&batch.report_code).await?;
        let max_row_errors = self.config.get_max_row_errors().await?;

        // === 步骤 1: 聚合行级错误 ===
        let staged = self.staging.list_rows(batch_id).await?;
        let mut findings: Vec<ValidationFinding> = Vec::new();
        for row in &staged {
            for error in &row.errors {
                findings.push(ValidationFinding {
                    kind: error.kind,
                    row_number: Some(row.row_number),
                    field: error.field.clone(),
                    message: error.message.clone(),
                });
            }
        }
        let row_error_count = staged.iter().filter(|r| !r.is_clean()).count();

        // === 步骤 2: 周期存在性（强制周期策略下缺周期是硬失败）===
        let period = batch.period();
        let period_ok = !policy.requires_period || period.is_some();
        if !period_ok {
            findings.push(ValidationFinding {
                kind: FindingKind::MissingPeriodField,
                row_number: None,
                field: policy.date_field.clone(),
                message: "无法确定批次周期: 没有任何行携带可用的周期日期".to_string(),
            });
        }

        // === 步骤 3: 周期重叠检查 ===
        let mut conflicting: Vec<String> = Vec::new();
        if let Some(period) = period {
            let check = self
                .overlap
                .check(&batch.report_code, batch.period_kind, period, Some(batch_id))
                .await?;
            if !check.valid {
                findings.push(ValidationFinding {
                    kind: FindingKind::PeriodOverlap,
                    row_number: None,
                    field: None,
                    message: format!(
                        "周期 {} 与已有批次重叠: {}",
                        period,
                        check.conflicting_batch_ids.join(", ")
                    ),
                });
                conflicting = check.conflicting_batch_ids;
            }
        }

        // === 步骤 4: 汇总并落盘校验报告（通过与否都记录）===
        let passed = period_ok && conflicting.is_empty() && row_error_count <= max_row_errors;
        let report = ValidationReport {
            checked_at: Utc::now(),
            period_start: period.map(|p| p.start),
            period_end: period.map(|p| p.end),
            row_error_count,
            findings,
            conflicting_batch_ids: conflicting,
            passed,
        };

        let new_state = if passed {
            BatchState::Validated
        } else {
            BatchState::Pending // 不自动驳回，调用方决定修正或放弃
        };
        self.batch_repo
            .record_validation(batch_id, new_state, &report)
            .await?;

        if passed {
            info!(batch_id = %batch_id, "批次校验通过");
            self.publish(&batch, Some(BatchState::Pending), BatchState::Validated, SYSTEM_ACTOR);
        } else {
            warn!(
                batch_id = %batch_id,
                findings = report.findings.len(),
                row_errors = report.row_error_count,
                "批次校验未通过，保持 PENDING"
            );
        }

        batch.state = new_state;
        batch.validation_json = Some(serde_json::to_value(&report).map_err(anyhow::Error::from)?);
        Ok(batch.snapshot())
    }

    #[instrument(skip(self, notes))]
    async fn approve(
        &self,
        batch_id: &str,
        actor: &str,
        notes: Option<String>,
    ) -> Result<ApproveOutcome, IngestError> {
        let batch = self.load_batch(batch_id).await?;

        // 幂等: 已审批直接重放原结果
        if batch.state == BatchState::Approved {
            return self.replay_approved(&batch).await;
        }
        if batch.state != BatchState::Validated {
            return Err(IngestError::InvalidStateTransition {
                batch_id: batch_id.to_string(),
                from: batch.state,
                to: BatchState::Approved,
            });
        }

        // === 步骤 1: 进入报表级互斥区 ===
        let lock = self.locks.lock_for(&batch.report_code);
        let _guard = lock.lock().await;

        // 锁内重读状态（并发审批可能已完成）
        let batch = self.load_batch(batch_id).await?;
        if batch.state == BatchState::Approved {
            return self.replay_approved(&batch).await;
        }
        if batch.state != BatchState::Validated {
            return Err(IngestError::InvalidStateTransition {
                batch_id: batch_id.to_string(),
                from: batch.state,
                to: BatchState::Approved,
            });
        }

        // === 步骤 2: 锁内复查重叠（封堵并发校验竞态）===
        // 只有已落账批次阻塞: 竞争者若仍是 VALIDATED，拦它会让双方互相卡死
        if let Some(period) = batch.period() {
            let check = self
                .overlap
                .check_committed(&batch.report_code, batch.period_kind, period, Some(batch_id))
                .await?;
            if !check.valid {
                warn!(
                    batch_id = %batch_id,
                    conflicts = ?check.conflicting_batch_ids,
                    "审批时发现新的周期冲突"
                );
                return Err(IngestError::ConflictAtApproval {
                    conflicting: check.conflicting_batch_ids,
                });
            }
        }

        // === 步骤 3: 迁移无错暂存行，出错行计入错误统计 ===
        let staged = self.staging.list_rows(batch_id).await?;
        let now = Utc::now();
        let mut accepted = Vec::new();
        let mut dropped_error_rows = 0usize;
        for row in staged {
            if row.is_clean() {
                accepted.push(AcceptedRow {
                    row_id: Uuid::new_v4().to_string(),
                    report_code: row.report_code,
                    payload: row.payload,
                    batch_id: batch_id.to_string(),
                    accepted_at: now,
                    accepted_by: actor.to_string(),
                });
            } else {
                dropped_error_rows += 1;
            }
        }

        let accepted_row_ids = self.data_repo.insert_many(&accepted).await?;

        // === 步骤 4: 清理暂存区并封账 ===
        self.staging.discard(batch_id).await?;
        self.batch_repo
            .mark_approved(batch_id, actor, notes.as_deref(), dropped_error_rows as i32)
            .await?;

        info!(
            batch_id = %batch_id,
            migrated = accepted_row_ids.len(),
            dropped = dropped_error_rows,
            "批次审批完成"
        );
        self.publish(&batch, Some(BatchState::Validated), BatchState::Approved, actor);

        let sealed = self.load_batch(batch_id).await?;
        Ok(ApproveOutcome {
            snapshot: sealed.snapshot(),
            migrated: accepted_row_ids.len(),
            dropped_error_rows,
            accepted_row_ids,
        })
    }

    #[instrument(skip(self, reason))]
    async fn reject(
        &self,
        batch_id: &str,
        actor: &str,
        reason: &str,
    ) -> Result<BatchSnapshot, IngestError> {
        let batch = self.load_batch(batch_id).await?;

        match batch.state {
            // 幂等: 已驳回直接返回
            BatchState::Rejected => {
                debug!(batch_id = %batch_id, "批次已驳回，幂等返回");
                return Ok(batch.snapshot());
            }
            BatchState::Pending | BatchState::Validated => {}
            from @ BatchState::Approved => {
                return Err(IngestError::InvalidStateTransition {
                    batch_id: batch_id.to_string(),
                    from,
                    to: BatchState::Rejected,
                });
            }
        }

        self.batch_repo.mark_rejected(batch_id, reason).await?;
        let discarded = self.staging.discard(batch_id).await?;
        info!(
            batch_id = %batch_id,
            discarded = discarded,
            "批次已驳回，暂存行已丢弃"
        );
        self.publish(&batch, Some(batch.state), BatchState::Rejected, actor);

        let rejected = self.load_batch(batch_id).await?;
        Ok(rejected.snapshot())
    }
}
