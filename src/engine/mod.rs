// ==========================================
// 业务报表导入系统 - 引擎层
// ==========================================
// 职责: 纯计算与校验规则（周期计算、重叠判定）
// 红线: 周期计算必须是纯函数，可脱离存储引擎独立测试
// ==========================================

pub mod overlap;
pub mod period;

// 重导出
pub use overlap::{OverlapCheck, OverlapValidator};
pub use period::compute_period;
