// ==========================================
// 业务报表导入系统 - 报表级互斥锁注册表
// ==========================================
// 职责: 为重叠校验提供报表粒度的互斥区
// 红线: 锁只按报表代码划分，不允许全局锁（不同报表吞吐互不影响）
// ==========================================

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

// ==========================================
// ReportLockRegistry
// ==========================================
// 说明: 注册表本身的锁只在查找/插入瞬间持有；
//       审批流程持有的是报表对应的异步互斥锁
#[derive(Default)]
pub struct ReportLockRegistry {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ReportLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取报表对应的互斥锁（首次访问时创建）
    pub fn lock_for(&self, report_code: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            // 持锁代码不会 panic；即使中毒也以内层数据继续
            Err(poisoned) => poisoned.into_inner(),
        };

        locks
            .entry(report_code.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_report_shares_lock() {
        let registry = ReportLockRegistry::new();
        let a = registry.lock_for("ventas");
        let b = registry.lock_for("ventas");
        assert!(Arc::ptr_eq(&a, &b), "同一报表应返回同一把锁");
    }

    #[tokio::test]
    async fn test_distinct_reports_do_not_block_each_other() {
        let registry = ReportLockRegistry::new();
        let a = registry.lock_for("ventas");
        let b = registry.lock_for("compras");
        assert!(!Arc::ptr_eq(&a, &b));

        // 持有 a 的情况下 b 仍可立即获取
        let _guard_a = a.lock().await;
        let guard_b = b.try_lock();
        assert!(guard_b.is_ok(), "不同报表不得互相阻塞");
    }
}
