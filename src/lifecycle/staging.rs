// ==========================================
// 业务报表导入系统 - 暂存服务
// ==========================================
// 职责: 把输入行变成带周期标注与行级错误的暂存行
// 红线: 每一行输入必须产出恰好一条暂存行（带错误与否都不丢行）
// 说明: 行构造（纯计算）与落库拆开 —— 暂存行外键指向批次，
//       调用方需要先用构造结果确定批次周期、插入批次，再落库暂存行
// ==========================================

use crate::domain::batch::{RowError, StagedRow};
use crate::domain::policy::ReportPeriodPolicy;
use crate::domain::types::{FindingKind, PeriodRange};
use crate::engine::period::compute_period;
use crate::lifecycle::error::IngestError;
use crate::repository::staging_repo::StagingRepository;
use chrono::{NaiveDate, Utc};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::Arc;
use tracing::debug;

/// 接受的日期写法（上游解析层产出的文本）
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// 解析行内日期值
fn parse_row_date(value: &JsonValue) -> Option<NaiveDate> {
    let text = value.as_str()?;
    let trimmed = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

// ==========================================
// StagingService - 暂存服务
// ==========================================
pub struct StagingService<S: StagingRepository> {
    repo: Arc<S>,
}

impl<S: StagingRepository> StagingService<S> {
    pub fn new(repo: Arc<S>) -> Self {
        Self { repo }
    }

    /// 构造暂存行（纯计算，不落库）
    ///
    /// 规则:
    /// - 行号从 1 起，按输入顺序（错误报告顺序确定性）
    /// - 策略提取周期时: 提取日期字段 → 解析 → 计算行周期
    /// - requires_period=false 时不产生行级错误，周期尽力提取
    /// - 任何输入行都产出一条暂存行，错误只做标注
    pub fn prepare(
        &self,
        batch_id: &str,
        policy: &ReportPeriodPolicy,
        rows: Vec<JsonMap<String, JsonValue>>,
    ) -> Vec<StagedRow> {
        let now = Utc::now();
        rows.into_iter()
            .enumerate()
            .map(|(idx, payload)| {
                let row_number = idx + 1;
                let mut errors: Vec<RowError> = Vec::new();
                let mut extracted_date = None;
                let mut period: Option<PeriodRange> = None;

                if policy.extracts_period() {
                    // extracts_period() 已保证 date_field 存在
                    let field = policy.date_field.as_deref().unwrap_or_default();
                    match payload.get(field) {
                        None | Some(JsonValue::Null) => {
                            if policy.requires_period {
                                errors.push(RowError {
                                    kind: FindingKind::MissingPeriodField,
                                    field: Some(field.to_string()),
                                    message: format!("行 {} 缺少周期日期字段 {}", row_number, field),
                                });
                            }
                        }
                        Some(value) => match parse_row_date(value) {
                            Some(date) => {
                                extracted_date = Some(date);
                                period = Some(compute_period(policy.period_kind, date));
                            }
                            None => {
                                if policy.requires_period {
                                    errors.push(RowError {
                                        kind: FindingKind::UnparseableDate,
                                        field: Some(field.to_string()),
                                        message: format!(
                                            "行 {} 日期无法解析: {}",
                                            row_number, value
                                        ),
                                    });
                                }
                            }
                        },
                    }
                }

                StagedRow {
                    batch_id: batch_id.to_string(),
                    report_code: policy.report_code.clone(),
                    payload,
                    row_number,
                    extracted_date,
                    period_start: period.map(|p| p.start),
                    period_end: period.map(|p| p.end),
                    errors,
                    created_at: now,
                }
            })
            .collect()
    }

    /// 批次候选周期: 第一条带周期的暂存行
    ///
    /// 说明: 首行本身可能正是出错的那行，取第一条可用周期保持确定性
    pub fn candidate_period(rows: &[StagedRow]) -> Option<PeriodRange> {
        rows.iter().find_map(|row| {
            match (row.period_start, row.period_end) {
                (Some(start), Some(end)) => Some(PeriodRange::new(start, end)),
                _ => None,
            }
        })
    }

    /// 落库暂存行
    ///
    /// # 返回
    /// - Ok(usize): 暂存行数（恒等于输入行数）
    pub async fn stage(&self, rows: &[StagedRow]) -> Result<usize, IngestError> {
        let staged = self.repo.insert_rows(rows).await?;
        debug!(staged = staged, "暂存行已落库");
        Ok(staged)
    }

    /// 读取批次的全部暂存行（按行号升序）
    pub async fn list_rows(&self, batch_id: &str) -> Result<Vec<StagedRow>, IngestError> {
        Ok(self.repo.list_by_batch(batch_id).await?)
    }

    /// 丢弃批次的全部暂存行（幂等）
    pub async fn discard(&self, batch_id: &str) -> Result<usize, IngestError> {
        Ok(self.repo.discard_batch(batch_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::PeriodKind;
    use async_trait::async_trait;
    use serde_json::json;

    /// 不落库的空仓储（prepare 为纯计算，不需要数据库）
    struct NullStagingRepo;

    #[async_trait]
    impl StagingRepository for NullStagingRepo {
        async fn insert_rows(
            &self,
            rows: &[StagedRow],
        ) -> Result<usize, crate::repository::error::RepositoryError> {
            Ok(rows.len())
        }

        async fn list_by_batch(
            &self,
            _batch_id: &str,
        ) -> Result<Vec<StagedRow>, crate::repository::error::RepositoryError> {
            Ok(Vec::new())
        }

        async fn discard_batch(
            &self,
            _batch_id: &str,
        ) -> Result<usize, crate::repository::error::RepositoryError> {
            Ok(0)
        }

        async fn count_by_batch(
            &self,
            _batch_id: &str,
        ) -> Result<usize, crate::repository::error::RepositoryError> {
            Ok(0)
        }
    }

    fn monthly_policy() -> ReportPeriodPolicy {
        ReportPeriodPolicy {
            report_code: "ventas".to_string(),
            period_kind: PeriodKind::Monthly,
            date_field: Some("fecha".to_string()),
            requires_period: true,
        }
    }

    fn row(entries: &[(&str, JsonValue)]) -> JsonMap<String, JsonValue> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_prepare_tags_period_and_preserves_order() {
        let service = StagingService::new(Arc::new(NullStagingRepo));
        let rows = vec![
            row(&[("fecha", json!("2024-01-15")), ("monto", json!(100))]),
            row(&[("fecha", json!("2024-01-20")), ("monto", json!(200))]),
        ];

        let staged = service.prepare("b1", &monthly_policy(), rows);
        assert_eq!(staged.len(), 2);
        assert_eq!(staged[0].row_number, 1);
        assert_eq!(staged[1].row_number, 2);
        assert!(staged.iter().all(|r| r.is_clean()));
        assert_eq!(
            staged[0].period_start,
            Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        );
        assert_eq!(
            staged[0].period_end,
            Some(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())
        );
    }

    #[test]
    fn test_prepare_never_drops_rows_on_errors() {
        let service = StagingService::new(Arc::new(NullStagingRepo));
        let rows = vec![
            row(&[("monto", json!(1))]),                       // 缺字段
            row(&[("fecha", json!("no-es-fecha"))]),           // 无法解析
            row(&[("fecha", json!("2024-01-10"))]),            // 正常
        ];

        let staged = service.prepare("b1", &monthly_policy(), rows);
        assert_eq!(staged.len(), 3, "出错行也必须保留");
        assert_eq!(staged[0].errors[0].kind, FindingKind::MissingPeriodField);
        assert_eq!(staged[1].errors[0].kind, FindingKind::UnparseableDate);
        assert!(staged[2].is_clean());

        // 候选周期来自第一条可用行（前两行无周期）
        let candidate = StagingService::<NullStagingRepo>::candidate_period(&staged).unwrap();
        assert_eq!(candidate.start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_prepare_without_period_requirement_skips_errors() {
        let service = StagingService::new(Arc::new(NullStagingRepo));
        let mut policy = monthly_policy();
        policy.requires_period = false;

        let staged = service.prepare(
            "b1",
            &policy,
            vec![row(&[("monto", json!(1))]), row(&[("fecha", json!("xx"))])],
        );
        assert!(staged.iter().all(|r| r.is_clean()), "宽松策略不产生行级错误");
    }

    #[test]
    fn test_prepare_free_policy_records_bookkeeping_period() {
        let service = StagingService::new(Arc::new(NullStagingRepo));
        let policy = ReportPeriodPolicy {
            report_code: "notas".to_string(),
            period_kind: PeriodKind::Free,
            date_field: Some("fecha".to_string()),
            requires_period: false,
        };

        let staged = service.prepare(
            "b1",
            &policy,
            vec![
                row(&[("fecha", json!("2024-05-01"))]),
                row(&[("monto", json!(1))]), // 缺字段，宽松策略不报错
            ],
        );
        // FREE 周期退化为单日区间，仅作记录
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(staged[0].extracted_date, Some(day));
        assert_eq!(staged[0].period_start, Some(day));
        assert_eq!(staged[0].period_end, Some(day));
        assert!(staged.iter().all(|r| r.is_clean()));
        assert_eq!(staged[1].period_start, None);
    }

    #[test]
    fn test_prepare_accepts_multiple_date_formats() {
        let service = StagingService::new(Arc::new(NullStagingRepo));
        let staged = service.prepare(
            "b1",
            &monthly_policy(),
            vec![
                row(&[("fecha", json!("2024-03-05"))]),
                row(&[("fecha", json!("2024/03/05"))]),
                row(&[("fecha", json!("20240305"))]),
            ],
        );
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        for staged_row in &staged {
            assert_eq!(staged_row.extracted_date, Some(expected));
        }
    }
}
