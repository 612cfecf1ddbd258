// ==========================================
// 业务报表导入系统 - 批次状态转换事件
// ==========================================
// 职责: 定义状态转换事件与监听 trait，实现依赖倒置
// 说明: 生命周期层定义 trait，外围系统（通知/审计）实现适配器
//       本核心只发布事件，不负责投递通知
// ==========================================

use crate::domain::types::BatchState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

// ==========================================
// BatchTransition - 状态转换事件
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchTransition {
    pub batch_id: String,           // 批次 ID
    pub report_code: String,        // 报表代码
    pub old_state: Option<BatchState>, // 原状态（提交事件为 None）
    pub new_state: BatchState,      // 新状态
    pub actor: String,              // 操作人
    pub occurred_at: DateTime<Utc>, // 发生时间
}

impl BatchTransition {
    pub fn new(
        batch_id: &str,
        report_code: &str,
        old_state: Option<BatchState>,
        new_state: BatchState,
        actor: &str,
    ) -> Self {
        Self {
            batch_id: batch_id.to_string(),
            report_code: report_code.to_string(),
            old_state,
            new_state,
            actor: actor.to_string(),
            occurred_at: Utc::now(),
        }
    }
}

// ==========================================
// TransitionListener Trait
// ==========================================
// 用途: 外围系统订阅状态转换（审计/通知）
pub trait TransitionListener: Send + Sync {
    fn on_transition(&self, event: &BatchTransition);
}

// ==========================================
// NoopListener - 默认空实现
// ==========================================
pub struct NoopListener;

impl TransitionListener for NoopListener {
    fn on_transition(&self, _event: &BatchTransition) {}
}

// ==========================================
// CollectingListener - 收集实现（测试/审计回放用）
// ==========================================
#[derive(Default)]
pub struct CollectingListener {
    events: Mutex<Vec<BatchTransition>>,
}

impl CollectingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取出已收集事件的副本
    pub fn events(&self) -> Vec<BatchTransition> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl TransitionListener for CollectingListener {
    fn on_transition(&self, event: &BatchTransition) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event.clone());
        }
    }
}
