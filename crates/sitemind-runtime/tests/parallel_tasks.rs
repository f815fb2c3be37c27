//! Parallel task isolation.

mod common;

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::json;

use common::*;
use sitemind_protocols::PageType;
use sitemind_runtime::{ParallelTask, TaskExecutorConfig};

#[tokio::test]
async fn test_one_failing_task_does_not_affect_others() {
    let h = harness().await;
    let broken = "https://offline.example.com/";
    h.driver.make_unreachable(broken);

    let results = h
        .executor
        .run_parallel(vec![
            ParallelTask::new(ORDERS),
            ParallelTask::new(broken),
            ParallelTask::new(HELP),
        ])
        .await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].url, ORDERS);
    assert_eq!(results[1].url, broken);
    assert_eq!(results[2].url, HELP);

    assert!(results[0].success);
    assert_eq!(results[0].page.as_ref().unwrap().page_type, PageType::Listing);
    assert_eq!(results[0].output, json!({ "latest_order": "A-100", "order_count": 3 }));

    assert!(!results[1].success);
    assert!(results[1].error.as_deref().unwrap().contains("unreachable"));
    assert!(results[1].page.is_none());

    assert!(results[2].success);
    assert!(!results[2].output.as_object().unwrap().is_empty());
}

#[tokio::test]
async fn test_every_task_session_is_closed() {
    let h = harness().await;
    h.driver.make_unreachable(DASHBOARD);

    let results = h
        .executor
        .run_parallel(vec![ParallelTask::new(LOGIN), ParallelTask::new(DASHBOARD)])
        .await;

    assert_eq!(results.iter().filter(|r| r.success).count(), 1);
    assert_eq!(h.driver.open_sessions(), 0);
    assert_eq!(h.driver.destroyed().len(), 2);
    assert!(h.executor.session_ids().is_empty());
}

#[tokio::test]
async fn test_panicking_task_is_captured() {
    let h = harness().await;
    let crashing = "https://crash.example.com/";
    h.driver.panic_on(crashing);

    let results = h
        .executor
        .run_parallel(vec![ParallelTask::new(crashing), ParallelTask::new(ORDERS)])
        .await;

    assert!(!results[0].success);
    assert!(results[0].error.as_deref().unwrap().contains("Task aborted"));
    assert!(results[1].success);
    assert_eq!(h.driver.open_sessions(), 0);
}

#[tokio::test]
async fn test_task_with_schema_extracts() {
    let h = harness().await;
    let schema = BTreeMap::from([
        ("orders".to_string(), "count of orders".to_string()),
        ("missing".to_string(), "gift card balance".to_string()),
    ]);

    let results = h
        .executor
        .run_parallel(vec![ParallelTask::new(ORDERS).with_schema(schema)])
        .await;

    assert!(results[0].success);
    assert_eq!(results[0].output, json!({ "orders": 3, "missing": null }));
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let driver = FakeDriver::new().with_delay(Duration::from_millis(20));
    let h = harness_with(
        driver,
        TaskExecutorConfig {
            settle_delay: Duration::ZERO,
            max_parallel_tasks: 2,
        },
    )
    .await;

    let tasks = (0..6).map(|_| ParallelTask::new(ORDERS)).collect();
    let results = h.executor.run_parallel(tasks).await;

    assert!(results.iter().all(|r| r.success));
    assert!(h.driver.max_open() <= 2);
    assert_eq!(h.driver.destroyed().len(), 6);
}

#[tokio::test]
async fn test_empty_batch() {
    let h = harness().await;
    assert!(h.executor.run_parallel(Vec::new()).await.is_empty());
}
