// ==========================================
// 并发审批控制测试
// ==========================================
// 测试目标: 两个周期相交的批次同时审批时，只允许一个落账
// 说明: 用仓储直写把两个批次都置为 VALIDATED，
//       模拟"两次校验并发通过、彼此都没看见对方"的竞态窗口
// ==========================================

mod test_helpers;

use futures::future::join_all;
use report_ingest::domain::types::BatchState;
use report_ingest::lifecycle::{BatchLifecycle, IngestError};
use report_ingest::logging;
use report_ingest::repository::{
    BatchRepository, BatchRepositoryImpl, ReportDataRepository, ReportDataRepositoryImpl,
};
use report_ingest::ValidationReport;
use std::sync::Arc;
use test_helpers::*;

/// 把批次强制置为 VALIDATED（模拟并发校验竞态窗口）
async fn force_validated(db_path: &str, batch_id: &str) {
    let repo = BatchRepositoryImpl::new(db_path).expect("创建批次仓储失败");
    let batch = repo
        .find_by_id(batch_id)
        .await
        .expect("查询批次失败")
        .expect("批次必须存在");
    repo.record_validation(batch_id, BatchState::Validated, &ValidationReport::clean(batch.period()))
        .await
        .expect("强制置 VALIDATED 失败");
}

#[tokio::test]
async fn test_concurrent_approves_of_overlapping_batches_admit_exactly_one() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("创建测试库失败");
    seed_monthly_policy(&db_path, "ventas");
    let lifecycle = Arc::new(create_lifecycle(&db_path));

    // 两个批次都落在 2024-01，且都处于 VALIDATED（竞态窗口）
    let first = lifecycle
        .submit(submit_request("ventas", rows_with_dates(&["2024-01-10", "2024-01-11"])))
        .await
        .expect("提交第一个批次失败");
    let second = lifecycle
        .submit(submit_request("ventas", rows_with_dates(&["2024-01-20", "2024-01-21"])))
        .await
        .expect("提交第二个批次失败");
    force_validated(&db_path, &first.batch_id).await;
    force_validated(&db_path, &second.batch_id).await;

    // 并发审批
    let tasks = [first.batch_id.clone(), second.batch_id.clone()]
        .into_iter()
        .map(|batch_id| {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.approve(&batch_id, "supervisor", None).await })
        });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("审批任务 panic"))
        .collect();

    let approved: Vec<_> = results.iter().filter(|r| r.is_ok()).collect();
    assert_eq!(approved.len(), 1, "恰好一个批次审批成功");

    let conflict = results
        .iter()
        .find_map(|r| r.as_ref().err())
        .expect("另一个批次必须因冲突失败");
    let winner_id = &approved[0].as_ref().unwrap().snapshot.batch_id;
    match conflict {
        IngestError::ConflictAtApproval { conflicting } => {
            assert_eq!(conflicting, &vec![winner_id.clone()], "冲突必须指名已落账的批次");
        }
        other => panic!("期望 ConflictAtApproval，实际: {other}"),
    }

    // 只有赢家的行进了正式表
    let data_repo = ReportDataRepositoryImpl::new(&db_path).expect("打开正式仓储失败");
    let loser_id = if winner_id == &first.batch_id {
        &second.batch_id
    } else {
        &first.batch_id
    };
    assert_eq!(data_repo.count_by_batch(winner_id).await.unwrap(), 2);
    assert_eq!(data_repo.count_by_batch(loser_id).await.unwrap(), 0, "输家不得留下正式行");
}

#[tokio::test]
async fn test_sequential_approve_recheck_catches_stale_validation() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("创建测试库失败");
    seed_monthly_policy(&db_path, "ventas");
    let lifecycle = create_lifecycle(&db_path);

    let first = lifecycle
        .submit(submit_request("ventas", rows_with_dates(&["2024-02-05", "2024-02-06"])))
        .await
        .expect("提交第一个批次失败");
    let second = lifecycle
        .submit(submit_request("ventas", rows_with_dates(&["2024-02-15", "2024-02-16"])))
        .await
        .expect("提交第二个批次失败");
    force_validated(&db_path, &first.batch_id).await;
    force_validated(&db_path, &second.batch_id).await;

    lifecycle
        .approve(&first.batch_id, "supervisor", None)
        .await
        .expect("第一个批次审批失败");

    // 第二个批次的校验已过期 —— 审批复查必须拦下
    let err = lifecycle
        .approve(&second.batch_id, "supervisor", None)
        .await
        .expect_err("过期校验必须被审批复查拦截");
    assert!(matches!(
        err,
        IngestError::ConflictAtApproval { ref conflicting } if conflicting == &vec![first.batch_id.clone()]
    ));

    // 被拦下的批次仍是 VALIDATED，可驳回收场
    let batch_repo = BatchRepositoryImpl::new(&db_path).expect("创建批次仓储失败");
    let stale = batch_repo.find_by_id(&second.batch_id).await.unwrap().unwrap();
    assert_eq!(stale.state, BatchState::Validated, "拦截不改变批次状态");
}

#[tokio::test]
async fn test_concurrent_replays_of_same_approval_stay_idempotent() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("创建测试库失败");
    seed_monthly_policy(&db_path, "ventas");
    let lifecycle = Arc::new(create_lifecycle(&db_path));

    let snapshot = lifecycle
        .submit(submit_request("ventas", rows_with_dates(&["2024-03-01", "2024-03-02"])))
        .await
        .expect("提交失败");
    lifecycle.validate(&snapshot.batch_id).await.expect("校验失败");

    // 同一批次的三个并发审批（上游重试风暴）
    let tasks = (0..3).map(|_| {
        let lifecycle = lifecycle.clone();
        let batch_id = snapshot.batch_id.clone();
        tokio::spawn(async move { lifecycle.approve(&batch_id, "supervisor", None).await })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("审批任务 panic"))
        .collect();

    for result in &results {
        let outcome = result.as_ref().expect("重试必须全部成功");
        assert_eq!(outcome.migrated, 2);
        assert_eq!(outcome.snapshot.state, BatchState::Approved);
    }

    let data_repo = ReportDataRepositoryImpl::new(&db_path).expect("打开正式仓储失败");
    assert_eq!(
        data_repo.count_by_batch(&snapshot.batch_id).await.unwrap(),
        2,
        "重试风暴不得产生重复正式行"
    );
}
