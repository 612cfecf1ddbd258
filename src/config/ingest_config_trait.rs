// ==========================================
// 业务报表导入系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入管道所需的配置读取接口（不包含实现）
// 红线: 不包含业务逻辑；策略写入仅用于管理/测试入口
// ==========================================

use crate::domain::policy::ReportPeriodPolicy;
use async_trait::async_trait;
use thiserror::Error;

/// 配置层错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("无法识别的周期类型 (report={report_code}): {value}")]
    InvalidPeriodKind { report_code: String, value: String },

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ValueError {
        key: String,
        value: String,
        message: String,
    },

    #[error("配置读取失败: {0}")]
    ReadError(String),

    #[error("配置锁获取失败: {0}")]
    LockError(String),
}

// ==========================================
// IngestConfigReader Trait
// ==========================================
// 用途: 导入管道所需的配置读取接口
// 实现者: PolicyManager（从 report_config / config_kv 表读取）
#[async_trait]
pub trait IngestConfigReader: Send + Sync {
    /// 获取报表的周期策略
    ///
    /// # 返回
    /// - Some(policy): 报表已配置
    /// - None: 报表不存在
    /// - Err(InvalidPeriodKind): 配置中的周期类型无法识别
    async fn get_period_policy(
        &self,
        report_code: &str,
    ) -> Result<Option<ReportPeriodPolicy>, ConfigError>;

    /// 获取批次最小行数下限
    ///
    /// # 默认值
    /// - 2（单行提交视为调用方错误）
    async fn get_min_batch_rows(&self) -> Result<usize, ConfigError>;

    /// 获取校验可容忍的行级错误数上限
    ///
    /// # 默认值
    /// - 0（任何行级错误都阻止批次进入 VALIDATED）
    async fn get_max_row_errors(&self) -> Result<usize, ConfigError>;
}
