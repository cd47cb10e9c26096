mod common;

use std::sync::Arc;

use common::{fixture_transactions, ids, loaded_ledger, make_pending};
use finance_ledger::backend::{FinanceBackend, StubBackend, StubFailure};
use finance_ledger::error::LedgerError;
use finance_ledger::filter::FilterCriteria;
use finance_ledger::models::{FinanceStats, PaymentMode, TransactionStatus};
use finance_ledger::TransactionViewModel;
use rust_decimal_macros::dec;
use serde_json::Value;

#[tokio::test]
async fn test_load_excludes_records_without_student() {
    let ledger = loaded_ledger(fixture_transactions()).await;

    let all = ledger.all_transactions().await;
    assert_eq!(ids(&all), vec!["t1", "t2", "t3", "t6"]);
}

#[tokio::test]
async fn test_load_failure_keeps_previous_list() {
    let ledger = loaded_ledger(fixture_transactions()).await;
    let before = ledger.all_transactions().await;

    ledger.backend().fail_next(StubFailure::Transport);
    let result = ledger.load().await;

    assert!(matches!(result, Err(LedgerError::Transport(_))));
    assert!(Arc::ptr_eq(&before, &ledger.all_transactions().await));
}

#[tokio::test]
async fn test_first_load_failure_leaves_ledger_empty() {
    let ledger = TransactionViewModel::new(StubBackend::new(fixture_transactions()));
    ledger.backend().fail_next(StubFailure::PermissionDenied);

    assert!(matches!(ledger.load().await, Err(LedgerError::PermissionDenied(_))));
    assert!(ledger.all_transactions().await.is_empty());
}

#[tokio::test]
async fn test_set_status_reloads_server_copy() {
    let ledger = loaded_ledger(fixture_transactions()).await;
    assert!(ledger.get("t2").await.unwrap().paid_date.is_none());

    ledger.set_status("t2", TransactionStatus::Completed).await.unwrap();

    // paid_date only exists on the server copy, so seeing it proves the reload
    let t2 = ledger.get("t2").await.unwrap();
    assert_eq!(t2.status, TransactionStatus::Completed);
    assert!(t2.paid_date.is_some());
    assert!(t2.is_receipt_eligible());
    assert!(!ledger.is_in_flight("t2").await);
}

#[tokio::test]
async fn test_set_status_failure_restores_snapshot() {
    let ledger = loaded_ledger(fixture_transactions()).await;
    let before = ledger.all_transactions().await;

    ledger
        .backend()
        .fail_next(StubFailure::Rejected("Status change not allowed".to_string()));
    let result = ledger.set_status("t2", TransactionStatus::Cancelled).await;

    match result {
        Err(LedgerError::Rejected(message)) => assert_eq!(message, "Status change not allowed"),
        other => panic!("expected rejection, got {other:?}"),
    }
    let after = ledger.all_transactions().await;
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(*before, *after);
    assert!(!ledger.is_in_flight("t2").await);
}

#[tokio::test]
async fn test_set_status_failure_sends_no_reload() {
    let ledger = loaded_ledger(fixture_transactions()).await;
    let requests = ledger.backend().request_count();

    ledger.backend().fail_next(StubFailure::Transport);
    let _ = ledger.set_status("t2", TransactionStatus::Completed).await;

    // Just the failed update; no automatic retry and no reload
    assert_eq!(ledger.backend().request_count(), requests + 1);
}

#[tokio::test]
async fn test_set_payment_method_keeps_amount_and_status() {
    let ledger = loaded_ledger(fixture_transactions()).await;
    let before = ledger.get("t2").await.unwrap();
    assert_eq!(before.payment_mode(), PaymentMode::Cash);

    ledger.set_payment_method("t2", " cheque ").await.unwrap();

    let after = ledger.get("t2").await.unwrap();
    assert_eq!(after.payment_method, "cheque");
    assert_eq!(after.payment_mode(), PaymentMode::Cheque);
    assert_eq!(after.amount, before.amount);
    assert_eq!(after.status, before.status);

    let server = ledger.backend().records();
    let server_t2 = server.iter().find(|tx| tx.id == "t2").unwrap();
    assert_eq!(server_t2.status, TransactionStatus::Pending);
    assert_eq!(server_t2.payment_method, "cheque");
}

#[tokio::test]
async fn test_set_payment_method_failure_rolls_back() {
    let ledger = loaded_ledger(fixture_transactions()).await;
    let before = ledger.all_transactions().await;

    ledger.backend().fail_next(StubFailure::PermissionDenied);
    let result = ledger.set_payment_method("t1", "cash").await;

    assert!(matches!(result, Err(LedgerError::PermissionDenied(_))));
    assert!(Arc::ptr_eq(&before, &ledger.all_transactions().await));
    assert_eq!(ledger.get("t1").await.unwrap().payment_method, "razorpay");
}

#[tokio::test]
async fn test_delete_removes_after_confirmation() {
    let ledger = loaded_ledger(fixture_transactions()).await;

    ledger.delete_transaction("t3").await.unwrap();

    assert_eq!(ids(&ledger.all_transactions().await), vec!["t1", "t2", "t6"]);
    assert!(ledger.backend().records().iter().all(|tx| tx.id != "t3"));
}

#[tokio::test]
async fn test_delete_failure_puts_record_back() {
    let ledger = loaded_ledger(fixture_transactions()).await;
    let before = ledger.all_transactions().await;

    ledger.backend().fail_next(StubFailure::Transport);
    let result = ledger.delete_transaction("t3").await;

    assert!(matches!(result, Err(LedgerError::Transport(_))));
    let after = ledger.all_transactions().await;
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(ids(&after), vec!["t1", "t2", "t3", "t6"]);
}

#[tokio::test]
async fn test_record_deleted_elsewhere_forces_reload() {
    let ledger = loaded_ledger(fixture_transactions()).await;

    // Another console deletes t2 behind our back
    let remaining: Vec<_> = ledger
        .backend()
        .records()
        .into_iter()
        .filter(|tx| tx.id != "t2")
        .collect();
    ledger.backend().set_records(remaining);

    let result = ledger.set_status("t2", TransactionStatus::Completed).await;

    let err = result.unwrap_err();
    assert!(err.is_record_gone());
    assert!(ledger.get("t2").await.is_none());
    assert_eq!(ids(&ledger.all_transactions().await), vec!["t1", "t3", "t6"]);
}

#[tokio::test]
async fn test_unknown_transaction_sends_nothing() {
    let ledger = loaded_ledger(fixture_transactions()).await;
    let requests = ledger.backend().request_count();

    let result = ledger.delete_transaction("missing").await;

    assert!(matches!(result, Err(LedgerError::UnknownTransaction(id)) if id == "missing"));
    assert_eq!(ledger.backend().request_count(), requests);
}

#[tokio::test]
async fn test_corrupt_record_cannot_be_mutated() {
    let ledger = loaded_ledger(fixture_transactions()).await;

    // t4 exists on the server but has no student, so it never enters the ledger
    let result = ledger.set_status("t4", TransactionStatus::Completed).await;
    assert!(matches!(result, Err(LedgerError::UnknownTransaction(_))));
}

#[tokio::test]
async fn test_visible_is_filtered_and_newest_first() {
    let ledger = loaded_ledger(fixture_transactions()).await;

    let all = ledger.visible(&FilterCriteria::new()).await;
    assert_eq!(ids(&all), vec!["t6", "t3", "t2", "t1"]);

    let academic = ledger
        .visible(&FilterCriteria::new().with_payment_type("academic"))
        .await;
    assert_eq!(ids(&academic), vec!["t3", "t1"]);

    let searched = ledger
        .apply_filters(&FilterCriteria::new().with_text("RCPT-2024"))
        .await;
    assert_eq!(ids(&searched), vec!["t1", "t6"]);
}

#[tokio::test]
async fn test_visible_page_and_summary() {
    let ledger = loaded_ledger(fixture_transactions()).await;

    let page = ledger.visible_page(&FilterCriteria::new(), 2, 3).await;
    assert_eq!(ids(&page.items), vec!["t1"]);
    assert_eq!(page.total_items, 4);
    assert_eq!(page.total_pages, 2);

    let summary = ledger.summary(&FilterCriteria::new()).await;
    assert_eq!(summary.overall.count, 4);
    assert_eq!(summary.overall.amount, dec!(43500.75));
    assert_eq!(summary.receipt_eligible, 1);
}

#[tokio::test]
async fn test_export_follows_visible_order() {
    let ledger = loaded_ledger(fixture_transactions()).await;

    let rows = ledger
        .export(&FilterCriteria::new().with_status(TransactionStatus::Failed))
        .await;

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].student_name, "Meena Iyer");
    assert_eq!(rows[0].branch, "N/A");
    assert_eq!(rows[0].department, "SCI");
}

#[tokio::test]
async fn test_stats_pass_through() {
    let mut figures = std::collections::BTreeMap::new();
    figures.insert("totalCollected".to_string(), Value::from(25100));
    figures.insert("pendingCount".to_string(), Value::from(2));
    let backend = StubBackend::new(fixture_transactions()).with_stats(FinanceStats(figures));
    let ledger = TransactionViewModel::new(backend);

    let (transactions, stats) = ledger.refresh().await.unwrap();

    assert_eq!(transactions.len(), 4);
    assert_eq!(stats.get("totalCollected"), Some(&Value::from(25100)));
    assert_eq!(stats.get("pendingCount"), Some(&Value::from(2)));
}

#[tokio::test]
async fn test_stub_backend_counts_requests() {
    let backend = StubBackend::new(vec![make_pending("t1", "Asha", "R1", dec!(100))]);

    backend.fetch_transactions().await.unwrap();
    backend.fetch_stats().await.unwrap();
    assert!(backend.delete_transaction("nope").await.is_err());

    assert_eq!(backend.request_count(), 3);
}
