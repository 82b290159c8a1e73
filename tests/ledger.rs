//! Ledger behaviour against the in-memory store

use std::sync::Arc;

use chrono::Utc;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use toolshed_server::{
    config::LedgerConfig,
    error::AppError,
    models::{
        enums::{LoanStatus, ToolStatus},
        loan::BorrowLine,
        tool::Tool,
    },
    repository::memory::MemoryLedgerStore,
    services::ledger::LedgerService,
};

struct Fixture {
    store: Arc<MemoryLedgerStore>,
    ledger: LedgerService,
    user: Uuid,
}

async fn fixture() -> Fixture {
    let store = Arc::new(MemoryLedgerStore::new());
    let user = Uuid::new_v4();
    store.insert_user(user).await;
    let ledger = LedgerService::new(
        store.clone(),
        LedgerConfig {
            retry_on_conflict: true,
            retry_backoff_ms: 1,
        },
    );
    Fixture { store, ledger, user }
}

async fn add_tool(store: &MemoryLedgerStore, quantity: i32) -> Uuid {
    let tool = Tool::new("Taladro", format!("TOOL-{}", Uuid::new_v4()), quantity, Utc::now());
    let id = tool.id;
    store.insert_tool(tool).await;
    id
}

async fn available(store: &MemoryLedgerStore, tool_id: Uuid) -> i32 {
    store.tool(tool_id).await.unwrap().available_quantity
}

#[tokio::test]
async fn borrow_then_return_restores_availability() {
    let f = fixture().await;
    let tool = add_tool(&f.store, 5).await;

    let loan = assert_ok!(f.ledger.borrow(tool, f.user, 3, None).await);
    assert_eq!(loan.status, LoanStatus::Active);
    assert_eq!(available(&f.store, tool).await, 2);

    let loan = assert_ok!(f.ledger.return_loan(loan.id, 3).await);
    assert_eq!(loan.status, LoanStatus::Returned);
    assert_eq!(available(&f.store, tool).await, 5);
}

#[tokio::test]
async fn second_borrow_beyond_stock_leaves_state_unchanged() {
    let f = fixture().await;
    let tool = add_tool(&f.store, 10).await;

    f.ledger.borrow(tool, f.user, 4, None).await.unwrap();
    assert_eq!(available(&f.store, tool).await, 6);

    let err = assert_err!(f.ledger.borrow(tool, f.user, 7, None).await);
    assert!(matches!(err, AppError::InsufficientStock(_)));
    assert_eq!(available(&f.store, tool).await, 6);
    assert_eq!(f.store.loans_for_tool(tool).await.len(), 1);
}

#[tokio::test]
async fn borrowing_last_units_marks_tool_borrowed() {
    let f = fixture().await;
    let tool = add_tool(&f.store, 2).await;

    f.ledger.borrow(tool, f.user, 2, None).await.unwrap();
    let t = f.store.tool(tool).await.unwrap();
    assert_eq!(t.available_quantity, 0);
    assert_eq!(t.status, ToolStatus::Borrowed);
}

#[tokio::test]
async fn borrow_unknown_tool_or_user_is_not_found() {
    let f = fixture().await;
    let tool = add_tool(&f.store, 2).await;

    let err = f.ledger.borrow(Uuid::new_v4(), f.user, 1, None).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = f.ledger.borrow(tool, Uuid::new_v4(), 1, None).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(available(&f.store, tool).await, 2);
}

#[tokio::test]
async fn borrow_tool_in_maintenance_is_rejected() {
    let f = fixture().await;
    let mut tool = Tool::new("Sierra", "TOOL-SIERRA", 3, Utc::now());
    tool.maintenance = true;
    let id = tool.id;
    f.store.insert_tool(tool).await;

    let err = f.ledger.borrow(id, f.user, 1, None).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
    assert_eq!(available(&f.store, id).await, 3);
}

#[tokio::test]
async fn partial_return_keeps_loan_active() {
    let f = fixture().await;
    let tool = add_tool(&f.store, 8).await;
    let loan = f.ledger.borrow(tool, f.user, 5, None).await.unwrap();
    assert_eq!(available(&f.store, tool).await, 3);

    let loan = f.ledger.return_loan(loan.id, 2).await.unwrap();
    assert_eq!(loan.quantity, 3);
    assert_eq!(loan.status, LoanStatus::Active);
    assert_eq!(available(&f.store, tool).await, 5);
}

#[tokio::test]
async fn full_return_closes_loan() {
    let f = fixture().await;
    let tool = add_tool(&f.store, 1).await;
    let loan = f.ledger.borrow(tool, f.user, 1, None).await.unwrap();
    assert_eq!(f.store.tool(tool).await.unwrap().status, ToolStatus::Borrowed);

    let loan = f.ledger.return_loan(loan.id, 1).await.unwrap();
    assert_eq!(loan.status, LoanStatus::Returned);
    assert_eq!(loan.quantity, 0);
    assert!(loan.returned_at.is_some());

    let t = f.store.tool(tool).await.unwrap();
    assert_eq!(t.available_quantity, 1);
    assert_eq!(t.status, ToolStatus::Available);
}

#[tokio::test]
async fn return_beyond_outstanding_is_rejected() {
    let f = fixture().await;
    let tool = add_tool(&f.store, 5).await;
    let loan = f.ledger.borrow(tool, f.user, 2, None).await.unwrap();

    let err = f.ledger.return_loan(loan.id, 3).await.unwrap_err();
    assert!(matches!(err, AppError::QuantityExceeded(_)));
    assert_eq!(f.store.loan(loan.id).await.unwrap().quantity, 2);
    assert_eq!(available(&f.store, tool).await, 3);
}

#[tokio::test]
async fn double_return_is_invalid_state() {
    let f = fixture().await;
    let tool = add_tool(&f.store, 2).await;
    let loan = f.ledger.borrow(tool, f.user, 2, None).await.unwrap();
    f.ledger.return_loan(loan.id, 2).await.unwrap();

    let err = f.ledger.return_loan(loan.id, 1).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
    assert_eq!(available(&f.store, tool).await, 2);
}

#[tokio::test]
async fn return_unknown_loan_is_not_found() {
    let f = fixture().await;
    let err = f.ledger.return_loan(Uuid::new_v4(), 1).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn bulk_borrow_is_all_or_nothing() {
    let f = fixture().await;
    let drill = add_tool(&f.store, 5).await;
    let saw = add_tool(&f.store, 1).await;

    let err = f
        .ledger
        .bulk_borrow(
            f.user,
            vec![
                BorrowLine { tool_id: drill, quantity: 2 },
                BorrowLine { tool_id: saw, quantity: 2 },
            ],
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock(_)));
    assert_eq!(available(&f.store, drill).await, 5);
    assert_eq!(available(&f.store, saw).await, 1);
    assert!(f.store.loans_for_tool(drill).await.is_empty());

    let loans = f
        .ledger
        .bulk_borrow(
            f.user,
            vec![
                BorrowLine { tool_id: drill, quantity: 2 },
                BorrowLine { tool_id: saw, quantity: 1 },
            ],
            Some("Taller de robótica".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(loans.len(), 2);
    assert_eq!(available(&f.store, drill).await, 3);
    assert_eq!(available(&f.store, saw).await, 0);
}

#[tokio::test]
async fn bulk_borrow_checks_repeated_tools_together() {
    let f = fixture().await;
    let tool = add_tool(&f.store, 3).await;

    let err = f
        .ledger
        .bulk_borrow(
            f.user,
            vec![
                BorrowLine { tool_id: tool, quantity: 2 },
                BorrowLine { tool_id: tool, quantity: 2 },
            ],
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock(_)));
    assert_eq!(available(&f.store, tool).await, 3);
}

#[tokio::test]
async fn bulk_borrow_empty_is_invalid_range() {
    let f = fixture().await;
    let err = f.ledger.bulk_borrow(f.user, vec![], None).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidRange(_)));
}

#[tokio::test]
async fn adjust_stock_cannot_drop_below_units_on_loan() {
    let f = fixture().await;
    let tool = add_tool(&f.store, 10).await;
    f.ledger.borrow(tool, f.user, 4, None).await.unwrap();

    let err = f.ledger.adjust_stock(tool, 3, 0).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidRange(_)));

    let err = f.ledger.adjust_stock(tool, 5, 6).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidRange(_)));

    let t = f.ledger.adjust_stock(tool, 12, 8).await.unwrap();
    assert_eq!(t.quantity, 12);
    assert_eq!(t.available_quantity, 8);
}

#[tokio::test]
async fn concurrent_borrows_of_last_unit_succeed_once() {
    let f = fixture().await;
    let tool = add_tool(&f.store, 1).await;

    let (a, b) = tokio::join!(
        f.ledger.borrow(tool, f.user, 1, None),
        f.ledger.borrow(tool, f.user, 1, None),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1);
    assert_eq!(available(&f.store, tool).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_borrows_never_oversell() {
    let f = fixture().await;
    let tool = add_tool(&f.store, 20).await;
    let ledger = Arc::new(f.ledger);

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let ledger = ledger.clone();
            let user = f.user;
            tokio::spawn(async move { ledger.borrow(tool, user, 1, None).await })
        })
        .collect();

    let mut granted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => granted += 1,
            Err(err) => assert!(matches!(err, AppError::InsufficientStock(_))),
        }
    }

    assert_eq!(granted, 20);
    let t = f.store.tool(tool).await.unwrap();
    assert_eq!(t.available_quantity, 0);
    assert!(t.available_quantity <= t.quantity);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_borrows_and_returns_balance_out() {
    let f = fixture().await;
    let tool = add_tool(&f.store, 5).await;
    let ledger = Arc::new(f.ledger);

    let handles: Vec<_> = (0..25)
        .map(|_| {
            let ledger = ledger.clone();
            let user = f.user;
            tokio::spawn(async move {
                if let Ok(loan) = ledger.borrow(tool, user, 1, None).await {
                    ledger.return_loan(loan.id, 1).await.unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(available(&f.store, tool).await, 5);
    assert!(f
        .store
        .loans_for_tool(tool)
        .await
        .iter()
        .all(|l| l.status == LoanStatus::Returned));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_full_returns_close_loan_once() {
    let f = fixture().await;
    let tool = add_tool(&f.store, 3).await;
    let loan = f.ledger.borrow(tool, f.user, 2, None).await.unwrap();
    let ledger = Arc::new(f.ledger);

    let first = {
        let ledger = ledger.clone();
        tokio::spawn(async move { ledger.return_loan(loan.id, 2).await })
    };
    let second = {
        let ledger = ledger.clone();
        tokio::spawn(async move { ledger.return_loan(loan.id, 2).await })
    };
    let (a, b) = tokio::join!(first, second);
    let results = [a.unwrap(), b.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(AppError::InvalidState(_)))));
    assert_eq!(available(&f.store, tool).await, 3);
    assert_eq!(
        f.store.loan(loan.id).await.unwrap().status,
        LoanStatus::Returned
    );
}
