// ==========================================
// 业务报表导入系统 - 批次领域模型
// ==========================================
// 用途: 批次、暂存行、正式行的实体定义
// 所有权: Batch 独占其 StagedRow（随批次级联删除）
//         AcceptedRow 仅持有指向来源批次的审计引用
// ==========================================

use crate::domain::types::{BatchState, FindingKind, PeriodKind, PeriodRange};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

// ==========================================
// Batch - 导入批次
// ==========================================
// 不变式: 同一报表下任意两个 VALIDATED/APPROVED 批次的周期区间不得相交
//         （FREE 类型豁免）
// 对齐: load_batch 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: String,                   // 批次 ID（UUID）
    pub report_code: String,                // 所属报表代码
    pub period_kind: PeriodKind,            // 提交时的周期类型快照
    pub period_start: Option<NaiveDate>,    // 计算出的周期开始（派生，非用户直填）
    pub period_end: Option<NaiveDate>,      // 计算出的周期结束
    pub row_count: i32,                     // 总行数
    pub error_rows: i32,                    // 行级错误数（审批时落账）
    pub source_file: Option<String>,        // 源文件名
    pub submitted_by: String,               // 提交人
    pub state: BatchState,                  // 生命周期状态
    pub validation_json: Option<JsonValue>, // 最近一次校验报告（结构化）
    pub submitted_at: DateTime<Utc>,        // 提交时间
    pub approved_at: Option<DateTime<Utc>>, // 审批时间
    pub approved_by: Option<String>,        // 审批人
    pub notes: Option<String>,              // 备注/驳回原因
}

impl Batch {
    /// 批次周期区间（start/end 同时存在才视为已计算）
    pub fn period(&self) -> Option<PeriodRange> {
        match (self.period_start, self.period_end) {
            (Some(start), Some(end)) => Some(PeriodRange::new(start, end)),
            _ => None,
        }
    }

    /// 转换为调用方可见的快照
    pub fn snapshot(&self) -> BatchSnapshot {
        let findings = self
            .validation_json
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok());

        BatchSnapshot {
            batch_id: self.batch_id.clone(),
            report_code: self.report_code.clone(),
            state: self.state,
            period_start: self.period_start,
            period_end: self.period_end,
            row_count: self.row_count,
            error_rows: self.error_rows,
            findings,
        }
    }
}

// ==========================================
// BatchSnapshot - 批次快照（对外输出）
// ==========================================
// 用途: 每个操作结束后返回给调用方
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSnapshot {
    pub batch_id: String,
    pub report_code: String,
    pub state: BatchState,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub row_count: i32,
    pub error_rows: i32,
    pub findings: Option<ValidationReport>,
}

// ==========================================
// SubmitRequest - 批次提交请求
// ==========================================
// 说明: rows 由上游文件解析层产出（字符串键 → 标量值）
//       manual_period 用于人工指定周期的提交（FREE 策略的周期即批次自身边界）
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub report_code: String,
    pub rows: Vec<JsonMap<String, JsonValue>>,
    pub source_file: Option<String>,
    pub submitted_by: String,
    pub manual_period: Option<PeriodRange>,
}

// ==========================================
// StagedRow - 暂存行
// ==========================================
// 生命周期: 批次提交时创建；审批（迁移）或驳回（丢弃）时销毁
// 红线: 暂存行不得比其批次存活更久
// 对齐: staged_row 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedRow {
    pub batch_id: String,                   // 关联批次（FK，级联删除）
    pub report_code: String,                // 所属报表代码
    pub payload: JsonMap<String, JsonValue>, // 原始字段值映射
    pub row_number: usize,                  // 批次内行号（1 起，用于错误报告）
    pub extracted_date: Option<NaiveDate>,  // 提取出的周期日期（FREE/缺字段时为空）
    pub period_start: Option<NaiveDate>,    // 行周期开始
    pub period_end: Option<NaiveDate>,      // 行周期结束
    pub errors: Vec<RowError>,              // 行级结构化错误
    pub created_at: DateTime<Utc>,          // 创建时间
}

impl StagedRow {
    /// 行是否干净（可迁移）
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

// ==========================================
// RowError - 行级错误
// ==========================================
// 传播策略: 行级错误只累积报告，不中断同批次其他行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowError {
    pub kind: FindingKind,     // 错误类型
    pub field: Option<String>, // 相关字段
    pub message: String,       // 错误描述
}

// ==========================================
// AcceptedRow - 正式行
// ==========================================
// 红线: 仅通过批次审批创建，创建后不可变（订正走新批次）
// 对齐: accepted_row 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedRow {
    pub row_id: String,                      // 行 ID（UUID）
    pub report_code: String,                 // 所属报表代码
    pub payload: JsonMap<String, JsonValue>, // 字段值映射
    pub batch_id: String,                    // 来源批次（审计引用，非空）
    pub accepted_at: DateTime<Utc>,          // 入账时间
    pub accepted_by: String,                 // 提交审批的操作人
}

// ==========================================
// ValidationFinding - 校验发现
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationFinding {
    pub kind: FindingKind,         // 发现类型
    pub row_number: Option<usize>, // 相关行号（批次级发现为空）
    pub field: Option<String>,     // 相关字段
    pub message: String,           // 描述
}

// ==========================================
// ValidationReport - 校验报告
// ==========================================
// 说明: 校验通过与否都会落盘（即使为空，也记录"检查过什么"供审计）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub checked_at: DateTime<Utc>,          // 校验时间
    pub period_start: Option<NaiveDate>,    // 本次校验使用的周期
    pub period_end: Option<NaiveDate>,
    pub row_error_count: usize,             // 行级错误数
    pub findings: Vec<ValidationFinding>,   // 全部发现
    pub conflicting_batch_ids: Vec<String>, // 重叠冲突的批次 ID（完整列表）
    pub passed: bool,                       // 是否通过
}

impl ValidationReport {
    /// 空报告（校验通过、无任何发现）
    pub fn clean(period: Option<PeriodRange>) -> Self {
        Self {
            checked_at: Utc::now(),
            period_start: period.map(|p| p.start),
            period_end: period.map(|p| p.end),
            row_error_count: 0,
            findings: Vec::new(),
            conflicting_batch_ids: Vec::new(),
            passed: true,
        }
    }
}

// ==========================================
// ApproveOutcome - 审批结果
// ==========================================
// 用途: approve 接口返回值（含新建正式行 ID 列表）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveOutcome {
    pub snapshot: BatchSnapshot,        // 审批后的批次快照
    pub accepted_row_ids: Vec<String>,  // 新建正式行 ID
    pub migrated: usize,                // 迁移行数
    pub dropped_error_rows: usize,      // 因行级错误未迁移的行数（计入 error_rows）
}
