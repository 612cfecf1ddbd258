// ==========================================
// 业务报表导入系统 - 周期计算引擎
// ==========================================
// 职责: (周期类型, 参考日期) → [开始, 结束] 闭区间
// 红线: 纯函数、确定性、无副作用 —— 重叠判定的全部基础
//       两处实现如有漂移会静默破坏重叠检测，必须穷尽边界测试
// ==========================================

use crate::domain::types::{PeriodKind, PeriodRange};
use chrono::{Datelike, Duration, NaiveDate};

/// 计算周期区间
///
/// 边界规则:
/// - DAILY: start = end = 参考日期
/// - WEEKLY: start = 参考日期所在 ISO 周的周一, end = start + 6 天
/// - BIWEEKLY: 日 <= 15 → [月初, 15 日]; 否则 → [16 日, 月末]
/// - MONTHLY: [月初, 月末]
/// - QUARTERLY: [季度首日, 季度末日]
/// - YEARLY: [1 月 1 日, 12 月 31 日]
/// - FREE: start = end = 参考日期（仅作记录，不参与重叠校验）
pub fn compute_period(kind: PeriodKind, reference: NaiveDate) -> PeriodRange {
    match kind {
        PeriodKind::Free | PeriodKind::Daily => PeriodRange::new(reference, reference),
        PeriodKind::Weekly => {
            let monday =
                reference - Duration::days(reference.weekday().num_days_from_monday() as i64);
            PeriodRange::new(monday, monday + Duration::days(6))
        }
        PeriodKind::Biweekly => {
            let first = month_start(reference);
            if reference.day() <= 15 {
                PeriodRange::new(first, first + Duration::days(14))
            } else {
                PeriodRange::new(first + Duration::days(15), month_end(reference))
            }
        }
        PeriodKind::Monthly => PeriodRange::new(month_start(reference), month_end(reference)),
        PeriodKind::Quarterly => {
            let quarter_first_month = ((reference.month() - 1) / 3) * 3 + 1;
            let start = date(reference.year(), quarter_first_month, 1);
            let end = month_end(date(reference.year(), quarter_first_month + 2, 1));
            PeriodRange::new(start, end)
        }
        PeriodKind::Yearly => PeriodRange::new(
            date(reference.year(), 1, 1),
            date(reference.year(), 12, 31),
        ),
    }
}

/// 所在月份的第一天
fn month_start(d: NaiveDate) -> NaiveDate {
    date(d.year(), d.month(), 1)
}

/// 所在月份的最后一天（下月首日减一天）
fn month_end(d: NaiveDate) -> NaiveDate {
    let (year, month) = if d.month() == 12 {
        (d.year() + 1, 1)
    } else {
        (d.year(), d.month() + 1)
    };
    date(year, month, 1) - Duration::days(1)
}

// 仅用于由合法分量构造日期；月初/1 日组合不会越界
fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or_else(|| panic!("非法日期分量: {}-{}-{}", year, month, day))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn assert_period(kind: PeriodKind, reference: NaiveDate, start: NaiveDate, end: NaiveDate) {
        let range = compute_period(kind, reference);
        assert_eq!(range.start, start, "{} @ {} 开始日期错误", kind, reference);
        assert_eq!(range.end, end, "{} @ {} 结束日期错误", kind, reference);
    }

    #[test]
    fn test_daily_and_free_equal_reference() {
        let reference = d(2024, 1, 15);
        assert_period(PeriodKind::Daily, reference, reference, reference);
        assert_period(PeriodKind::Free, reference, reference, reference);
    }

    #[test]
    fn test_weekly_iso_monday_start() {
        // 2024-01-15 是周一
        assert_period(PeriodKind::Weekly, d(2024, 1, 15), d(2024, 1, 15), d(2024, 1, 21));
        // 2024-01-21 是周日 → 同一周
        assert_period(PeriodKind::Weekly, d(2024, 1, 21), d(2024, 1, 15), d(2024, 1, 21));
        // 跨年 ISO 周: 2021-01-01 是周五 → 周一为 2020-12-28
        assert_period(PeriodKind::Weekly, d(2021, 1, 1), d(2020, 12, 28), d(2021, 1, 3));
        // 跨年 ISO 周: 2024-12-31 是周二 → 周一为 2024-12-30，周日落在 2025
        assert_period(PeriodKind::Weekly, d(2024, 12, 31), d(2024, 12, 30), d(2025, 1, 5));
    }

    #[test]
    fn test_biweekly_split_at_fifteenth() {
        // 上半月: 1-15 日
        assert_period(PeriodKind::Biweekly, d(2024, 3, 1), d(2024, 3, 1), d(2024, 3, 15));
        assert_period(PeriodKind::Biweekly, d(2024, 3, 15), d(2024, 3, 1), d(2024, 3, 15));
        // 下半月: 16-月末
        assert_period(PeriodKind::Biweekly, d(2024, 3, 16), d(2024, 3, 16), d(2024, 3, 31));
        assert_period(PeriodKind::Biweekly, d(2024, 3, 31), d(2024, 3, 16), d(2024, 3, 31));
        // 闰年 2 月下半月末日为 29 日
        assert_period(PeriodKind::Biweekly, d(2024, 2, 20), d(2024, 2, 16), d(2024, 2, 29));
        // 平年 2 月
        assert_period(PeriodKind::Biweekly, d(2023, 2, 28), d(2023, 2, 16), d(2023, 2, 28));
    }

    #[test]
    fn test_monthly_boundaries() {
        assert_period(PeriodKind::Monthly, d(2024, 1, 15), d(2024, 1, 1), d(2024, 1, 31));
        // 月初与月末本身
        assert_period(PeriodKind::Monthly, d(2024, 4, 1), d(2024, 4, 1), d(2024, 4, 30));
        assert_period(PeriodKind::Monthly, d(2024, 4, 30), d(2024, 4, 1), d(2024, 4, 30));
        // 闰年 2 月
        assert_period(PeriodKind::Monthly, d(2024, 2, 29), d(2024, 2, 1), d(2024, 2, 29));
        assert_period(PeriodKind::Monthly, d(2023, 2, 10), d(2023, 2, 1), d(2023, 2, 28));
        // 12 月（month_end 跨年分支）
        assert_period(PeriodKind::Monthly, d(2024, 12, 5), d(2024, 12, 1), d(2024, 12, 31));
    }

    #[test]
    fn test_quarterly_boundaries() {
        assert_period(PeriodKind::Quarterly, d(2024, 1, 1), d(2024, 1, 1), d(2024, 3, 31));
        assert_period(PeriodKind::Quarterly, d(2024, 3, 31), d(2024, 1, 1), d(2024, 3, 31));
        assert_period(PeriodKind::Quarterly, d(2024, 4, 1), d(2024, 4, 1), d(2024, 6, 30));
        assert_period(PeriodKind::Quarterly, d(2024, 8, 15), d(2024, 7, 1), d(2024, 9, 30));
        // Q4 末月为 12 月（month_end 跨年分支）
        assert_period(PeriodKind::Quarterly, d(2024, 10, 1), d(2024, 10, 1), d(2024, 12, 31));
        assert_period(PeriodKind::Quarterly, d(2024, 12, 31), d(2024, 10, 1), d(2024, 12, 31));
    }

    #[test]
    fn test_yearly_boundaries() {
        assert_period(PeriodKind::Yearly, d(2024, 6, 15), d(2024, 1, 1), d(2024, 12, 31));
        assert_period(PeriodKind::Yearly, d(2024, 1, 1), d(2024, 1, 1), d(2024, 12, 31));
        assert_period(PeriodKind::Yearly, d(2024, 12, 31), d(2024, 1, 1), d(2024, 12, 31));
    }

    #[test]
    fn test_start_never_after_end_across_kinds_and_dates() {
        // 对所有周期类型扫一年（含闰日），验证 start <= end 且参考日期落在区间内
        let kinds = [
            PeriodKind::Free,
            PeriodKind::Daily,
            PeriodKind::Weekly,
            PeriodKind::Biweekly,
            PeriodKind::Monthly,
            PeriodKind::Quarterly,
            PeriodKind::Yearly,
        ];
        let mut day = d(2024, 1, 1);
        let last = d(2024, 12, 31);
        while day <= last {
            for kind in kinds {
                let range = compute_period(kind, day);
                assert!(range.start <= range.end, "{} @ {}: start > end", kind, day);
                assert!(
                    range.start <= day && day <= range.end,
                    "{} @ {}: 参考日期不在区间内",
                    kind,
                    day
                );
            }
            day += Duration::days(1);
        }
    }

    #[test]
    fn test_determinism() {
        let reference = d(2024, 7, 17);
        for kind in [PeriodKind::Weekly, PeriodKind::Biweekly, PeriodKind::Quarterly] {
            assert_eq!(compute_period(kind, reference), compute_period(kind, reference));
        }
    }
}
