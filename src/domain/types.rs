// ==========================================
// 业务报表导入系统 - 领域类型定义
// ==========================================
// 红线: 批次状态是显式枚举 + 受控转换表，不依赖数据库触发器
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 周期类型 (Period Kind)
// ==========================================
// 说明: FREE 类型不参与重叠校验，周期仅作记录
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodKind {
    Free,      // 自由（不做周期控制）
    Daily,     // 按日
    Weekly,    // 按 ISO 周（周一起始）
    Biweekly,  // 按半月（1-15 / 16-月末）
    Monthly,   // 按月
    Quarterly, // 按季度
    Yearly,    // 按年
}

impl PeriodKind {
    /// 转换为数据库存储字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodKind::Free => "FREE",
            PeriodKind::Daily => "DAILY",
            PeriodKind::Weekly => "WEEKLY",
            PeriodKind::Biweekly => "BIWEEKLY",
            PeriodKind::Monthly => "MONTHLY",
            PeriodKind::Quarterly => "QUARTERLY",
            PeriodKind::Yearly => "YEARLY",
        }
    }

    /// 从字符串解析周期类型
    ///
    /// # 返回
    /// - None: 无法识别的周期类型（调用方应报 InvalidPeriodKind）
    pub fn parse(raw: &str) -> Option<PeriodKind> {
        // 兼容带引号的 JSON 字符串写法
        let normalized = raw.trim().trim_matches('"').to_ascii_uppercase();
        match normalized.as_str() {
            "FREE" => Some(PeriodKind::Free),
            "DAILY" => Some(PeriodKind::Daily),
            "WEEKLY" => Some(PeriodKind::Weekly),
            "BIWEEKLY" => Some(PeriodKind::Biweekly),
            "MONTHLY" => Some(PeriodKind::Monthly),
            "QUARTERLY" => Some(PeriodKind::Quarterly),
            "YEARLY" => Some(PeriodKind::Yearly),
            _ => None,
        }
    }

    /// FREE 类型豁免重叠校验
    pub fn is_overlap_exempt(&self) -> bool {
        matches!(self, PeriodKind::Free)
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 批次状态 (Batch State)
// ==========================================
// 生命周期: PENDING → VALIDATED → APPROVED（终态，触发迁移）
//           PENDING|VALIDATED → REJECTED（终态，丢弃暂存）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchState {
    Pending,   // 待校验
    Validated, // 校验通过，等待审批
    Approved,  // 已审批（终态）
    Rejected,  // 已驳回（终态）
}

impl BatchState {
    /// 转换为数据库存储字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchState::Pending => "PENDING",
            BatchState::Validated => "VALIDATED",
            BatchState::Approved => "APPROVED",
            BatchState::Rejected => "REJECTED",
        }
    }

    /// 从字符串解析批次状态
    pub fn parse(raw: &str) -> Option<BatchState> {
        match raw.trim().trim_matches('"').to_ascii_uppercase().as_str() {
            "PENDING" => Some(BatchState::Pending),
            "VALIDATED" => Some(BatchState::Validated),
            "APPROVED" => Some(BatchState::Approved),
            "REJECTED" => Some(BatchState::Rejected),
            _ => None,
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchState::Approved | BatchState::Rejected)
    }

    /// 状态转换表
    ///
    /// 合法转换:
    /// - PENDING → VALIDATED | REJECTED
    /// - VALIDATED → APPROVED | REJECTED
    pub fn can_transition_to(&self, target: BatchState) -> bool {
        matches!(
            (self, target),
            (BatchState::Pending, BatchState::Validated)
                | (BatchState::Pending, BatchState::Rejected)
                | (BatchState::Validated, BatchState::Approved)
                | (BatchState::Validated, BatchState::Rejected)
        )
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 校验发现类型 (Finding Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingKind {
    MissingPeriodField, // 缺少周期日期字段
    UnparseableDate,    // 日期无法解析
    PeriodOverlap,      // 周期与已有批次重叠
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::MissingPeriodField => "MISSING_PERIOD_FIELD",
            FindingKind::UnparseableDate => "UNPARSEABLE_DATE",
            FindingKind::PeriodOverlap => "PERIOD_OVERLAP",
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 周期区间 (Period Range)
// ==========================================
// 不变式: start <= end（闭区间，两端含）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRange {
    pub start: NaiveDate, // 周期开始日期
    pub end: NaiveDate,   // 周期结束日期
}

impl PeriodRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// 闭区间相交判定
    ///
    /// 判定条件: self.start <= other.end AND self.end >= other.start
    pub fn intersects(&self, other: &PeriodRange) -> bool {
        self.start <= other.end && self.end >= other.start
    }
}

impl fmt::Display for PeriodRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_kind_parse_roundtrip() {
        let kinds = [
            PeriodKind::Free,
            PeriodKind::Daily,
            PeriodKind::Weekly,
            PeriodKind::Biweekly,
            PeriodKind::Monthly,
            PeriodKind::Quarterly,
            PeriodKind::Yearly,
        ];
        for kind in kinds {
            assert_eq!(PeriodKind::parse(kind.as_str()), Some(kind));
        }
        // 小写与带引号的历史格式也应兼容
        assert_eq!(PeriodKind::parse("monthly"), Some(PeriodKind::Monthly));
        assert_eq!(PeriodKind::parse("\"WEEKLY\""), Some(PeriodKind::Weekly));
        assert_eq!(PeriodKind::parse("fortnightly"), None);
    }

    #[test]
    fn test_batch_state_transition_table() {
        use BatchState::*;

        assert!(Pending.can_transition_to(Validated));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Validated.can_transition_to(Approved));
        assert!(Validated.can_transition_to(Rejected));

        // 非法转换
        assert!(!Pending.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Validated));
        assert!(!Approved.can_transition_to(Pending));
    }

    #[test]
    fn test_period_range_intersects_closed_interval() {
        let jan = PeriodRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        );
        let feb = PeriodRange::new(
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
        );
        // 相邻月份不相交
        assert!(!jan.intersects(&feb));
        assert!(!feb.intersects(&jan));

        // 闭区间: 端点相接即相交
        let jan_end = PeriodRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(),
        );
        assert!(jan.intersects(&jan_end));

        // 完全包含
        let mid_jan = PeriodRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
        );
        assert!(jan.intersects(&mid_jan));
        assert!(mid_jan.intersects(&jan));
    }
}
