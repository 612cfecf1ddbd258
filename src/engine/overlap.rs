// ==========================================
// 业务报表导入系统 - 周期重叠校验引擎
// ==========================================
// 职责: 判定候选周期区间是否与同报表已生效批次冲突
// 口径: 校验期 VALIDATED/APPROVED 都阻塞（尽早暴露潜在冲突）；
//       审批复查只有 APPROVED 阻塞 —— 审批本身在报表级互斥区内串行，
//       把仍处 VALIDATED 的竞争者也算冲突会让双方互相阻塞、谁都无法落账
// 红线: FREE 类型豁免
// ==========================================

use crate::domain::types::{BatchState, PeriodKind, PeriodRange};
use crate::repository::batch_repo::BatchRepository;
use crate::repository::error::RepositoryError;
use std::sync::Arc;
use tracing::debug;

// ==========================================
// OverlapCheck - 重叠校验结果
// ==========================================
#[derive(Debug, Clone)]
pub struct OverlapCheck {
    pub valid: bool,                        // 是否无冲突
    pub conflicting_batch_ids: Vec<String>, // 全部冲突批次 ID（供调用方完整报告）
}

impl OverlapCheck {
    /// 无冲突结果
    pub fn valid() -> Self {
        Self {
            valid: true,
            conflicting_batch_ids: Vec::new(),
        }
    }
}

// ==========================================
// OverlapValidator - 重叠校验器
// ==========================================
pub struct OverlapValidator<B: BatchRepository> {
    batch_repo: Arc<B>,
}

impl<B: BatchRepository> OverlapValidator<B> {
    pub fn new(batch_repo: Arc<B>) -> Self {
        Self { batch_repo }
    }

    /// 校验期检查: VALIDATED/APPROVED 都视为冲突
    ///
    /// # 参数
    /// - report_code: 报表代码
    /// - kind: 周期类型（FREE 直接通过）
    /// - candidate: 候选周期闭区间
    /// - excluding_batch_id: 被排除的批次（校验自身/编辑场景）
    ///
    /// # 返回
    /// - OverlapCheck: valid=false 时携带全部冲突批次 ID
    pub async fn check(
        &self,
        report_code: &str,
        kind: PeriodKind,
        candidate: PeriodRange,
        excluding_batch_id: Option<&str>,
    ) -> Result<OverlapCheck, RepositoryError> {
        self.check_states(
            report_code,
            kind,
            candidate,
            excluding_batch_id,
            &[BatchState::Validated, BatchState::Approved],
        )
        .await
    }

    /// 审批复查: 只有已落账（APPROVED）的批次阻塞
    ///
    /// 竞争者若仍停留在 VALIDATED，只说明它的校验已过期，
    /// 由它自己的审批复查拦截
    pub async fn check_committed(
        &self,
        report_code: &str,
        kind: PeriodKind,
        candidate: PeriodRange,
        excluding_batch_id: Option<&str>,
    ) -> Result<OverlapCheck, RepositoryError> {
        self.check_states(
            report_code,
            kind,
            candidate,
            excluding_batch_id,
            &[BatchState::Approved],
        )
        .await
    }

    async fn check_states(
        &self,
        report_code: &str,
        kind: PeriodKind,
        candidate: PeriodRange,
        excluding_batch_id: Option<&str>,
        blocking_states: &[BatchState],
    ) -> Result<OverlapCheck, RepositoryError> {
        if kind.is_overlap_exempt() {
            debug!(report_code = %report_code, "FREE 类型豁免重叠校验");
            return Ok(OverlapCheck::valid());
        }

        let conflicting = self
            .batch_repo
            .find_overlapping(report_code, candidate, excluding_batch_id, blocking_states)
            .await?;

        if conflicting.is_empty() {
            Ok(OverlapCheck::valid())
        } else {
            debug!(
                report_code = %report_code,
                candidate = %candidate,
                conflicts = conflicting.len(),
                "检测到周期重叠"
            );
            Ok(OverlapCheck {
                valid: false,
                conflicting_batch_ids: conflicting,
            })
        }
    }
}
