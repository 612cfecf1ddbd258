// ==========================================
// 业务报表导入系统 - 周期策略领域模型
// ==========================================
// 用途: 每个报表声明其周期粒度、日期字段与是否强制周期控制
// 红线: 策略由报表配置层拥有，导入管道只读
// ==========================================

use crate::domain::types::PeriodKind;
use serde::{Deserialize, Serialize};

// ==========================================
// ReportPeriodPolicy - 报表周期策略
// ==========================================
// 对齐: report_config 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPeriodPolicy {
    pub report_code: String,        // 报表代码（主键）
    pub period_kind: PeriodKind,    // 周期类型
    pub date_field: Option<String>, // 行数据中承载周期日期的字段名
    pub requires_period: bool,      // 是否强制周期控制
}

impl ReportPeriodPolicy {
    /// FREE 策略（不做周期控制）
    pub fn free(report_code: &str) -> Self {
        Self {
            report_code: report_code.to_string(),
            period_kind: PeriodKind::Free,
            date_field: None,
            requires_period: false,
        }
    }

    /// 是否需要对行做周期提取
    ///
    /// 配置了日期字段即提取；FREE 类型提取到的 [日期, 日期]
    /// 仅作记录，不参与重叠校验
    pub fn extracts_period(&self) -> bool {
        self.date_field.is_some()
    }
}
