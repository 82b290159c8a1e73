//! Inventory ledger: borrow, return and stock adjustment.
//!
//! Every operation runs as one atomic unit in the backing [`LedgerStore`]:
//! the store locks the tool (and loan) rows it touches, checks the
//! preconditions against the locked values and writes all changes or none.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    config::LedgerConfig,
    error::{AppError, AppResult},
    models::{
        loan::{aggregate_lines, BorrowLine, Loan},
        tool::{validate_stock_range, Tool},
    },
};

/// Persistence seam for ledger operations.
///
/// Implementations must apply each call atomically and serialize
/// conflicting writers on the same tool or loan.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Create one active loan per line, or none if any line fails
    async fn borrow(
        &self,
        user_id: Uuid,
        lines: Vec<BorrowLine>,
        notes: Option<String>,
    ) -> AppResult<Vec<Loan>>;

    /// Return units of an active loan and put them back in stock
    async fn return_loan(&self, loan_id: Uuid, quantity: i32) -> AppResult<Loan>;

    /// Overwrite the stock counters of a tool
    async fn adjust_stock(
        &self,
        tool_id: Uuid,
        quantity: i32,
        available_quantity: i32,
    ) -> AppResult<Tool>;
}

#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    config: LedgerConfig,
}

impl LedgerService {
    pub fn new(store: Arc<dyn LedgerStore>, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    /// Borrow `quantity` units of a tool for a user
    pub async fn borrow(
        &self,
        tool_id: Uuid,
        user_id: Uuid,
        quantity: i32,
        notes: Option<String>,
    ) -> AppResult<Loan> {
        check_quantity(quantity)?;
        let lines = vec![BorrowLine { tool_id, quantity }];

        let mut loans = self
            .with_retry("borrow", || {
                self.store.borrow(user_id, lines.clone(), notes.clone())
            })
            .await?;

        let loan = loans
            .pop()
            .ok_or_else(|| AppError::Internal("Borrow produced no loan".to_string()))?;

        tracing::info!(
            loan_id = %loan.id,
            tool_id = %tool_id,
            user_id = %user_id,
            quantity,
            "Tool borrowed"
        );
        Ok(loan)
    }

    /// Borrow several tools at once; either every loan is created or none
    pub async fn bulk_borrow(
        &self,
        user_id: Uuid,
        lines: Vec<BorrowLine>,
        notes: Option<String>,
    ) -> AppResult<Vec<Loan>> {
        if lines.is_empty() {
            return Err(AppError::InvalidRange(
                "Bulk borrow requires at least one tool".to_string(),
            ));
        }
        for line in &lines {
            check_quantity(line.quantity)?;
        }
        let lines = aggregate_lines(&lines);

        let loans = self
            .with_retry("bulk_borrow", || {
                self.store.borrow(user_id, lines.clone(), notes.clone())
            })
            .await?;

        tracing::info!(user_id = %user_id, loans = loans.len(), "Bulk borrow completed");
        Ok(loans)
    }

    /// Return units of a loan (partial or full)
    pub async fn return_loan(&self, loan_id: Uuid, quantity: i32) -> AppResult<Loan> {
        if quantity < 1 {
            return Err(AppError::InvalidRange(format!(
                "Returned quantity must be at least 1 (got {})",
                quantity
            )));
        }

        let loan = self
            .with_retry("return", || self.store.return_loan(loan_id, quantity))
            .await?;

        tracing::info!(
            loan_id = %loan_id,
            tool_id = %loan.tool_id,
            returned = quantity,
            remaining = loan.quantity,
            status = %loan.status,
            "Loan returned"
        );
        Ok(loan)
    }

    /// Administrative override of a tool's stock counters
    pub async fn adjust_stock(
        &self,
        tool_id: Uuid,
        quantity: i32,
        available_quantity: i32,
    ) -> AppResult<Tool> {
        validate_stock_range(quantity, available_quantity)?;

        let tool = self
            .with_retry("adjust_stock", || {
                self.store.adjust_stock(tool_id, quantity, available_quantity)
            })
            .await?;

        tracing::info!(tool_id = %tool_id, quantity, available_quantity, "Stock adjusted");
        Ok(tool)
    }

    /// Run `op`, retrying once after a short backoff when it reports a conflict
    async fn with_retry<T, F, Fut>(&self, name: &str, op: F) -> AppResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        match op().await {
            Err(err) if err.is_conflict() && self.config.retry_on_conflict => {
                tracing::warn!(operation = name, error = %err, "Ledger conflict, retrying once");
                tokio::time::sleep(Duration::from_millis(self.config.retry_backoff_ms)).await;
                op().await
            }
            Err(err) => {
                tracing::debug!(operation = name, error = %err, "Ledger operation rejected");
                Err(err)
            }
            ok => ok,
        }
    }
}

fn check_quantity(quantity: i32) -> AppResult<()> {
    if quantity < 1 {
        return Err(AppError::InvalidRange(format!(
            "Borrow quantity must be at least 1 (got {})",
            quantity
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn service(store: MockLedgerStore, retry: bool) -> LedgerService {
        LedgerService::new(
            Arc::new(store),
            LedgerConfig {
                retry_on_conflict: retry,
                retry_backoff_ms: 1,
            },
        )
    }

    #[tokio::test]
    async fn test_conflict_retried_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut store = MockLedgerStore::new();
        store
            .expect_borrow()
            .times(2)
            .returning(move |user_id, lines, notes| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(AppError::Conflict("busy".to_string()))
                } else {
                    let line = &lines[0];
                    Ok(vec![Loan::open(line.tool_id, user_id, line.quantity, notes, Utc::now())])
                }
            });

        let loan = service(store, true)
            .borrow(Uuid::new_v4(), Uuid::new_v4(), 2, None)
            .await
            .unwrap();
        assert_eq!(loan.quantity, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_second_conflict_reported() {
        let mut store = MockLedgerStore::new();
        store
            .expect_return_loan()
            .times(2)
            .returning(|_, _| Err(AppError::Conflict("busy".to_string())));

        let err = service(store, true)
            .return_loan(Uuid::new_v4(), 1)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_no_retry_when_disabled() {
        let mut store = MockLedgerStore::new();
        store
            .expect_adjust_stock()
            .times(1)
            .returning(|_, _, _| Err(AppError::Conflict("busy".to_string())));

        let err = service(store, false)
            .adjust_stock(Uuid::new_v4(), 5, 5)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_business_errors_not_retried() {
        let mut store = MockLedgerStore::new();
        store
            .expect_borrow()
            .times(1)
            .returning(|_, _, _| Err(AppError::InsufficientStock("none left".to_string())));

        let err = service(store, true)
            .borrow(Uuid::new_v4(), Uuid::new_v4(), 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock(_)));
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_store() {
        // No expectations: any store call would panic
        let svc = service(MockLedgerStore::new(), true);

        assert!(matches!(
            svc.borrow(Uuid::new_v4(), Uuid::new_v4(), 0, None).await,
            Err(AppError::InvalidRange(_))
        ));
        assert!(matches!(
            svc.return_loan(Uuid::new_v4(), 0).await,
            Err(AppError::InvalidRange(_))
        ));
        assert!(matches!(
            svc.adjust_stock(Uuid::new_v4(), 3, 4).await,
            Err(AppError::InvalidRange(_))
        ));
        assert!(matches!(
            svc.bulk_borrow(Uuid::new_v4(), vec![], None).await,
            Err(AppError::InvalidRange(_))
        ));
    }

    #[tokio::test]
    async fn test_bulk_borrow_merges_duplicate_tools() {
        let tool = Uuid::new_v4();
        let mut store = MockLedgerStore::new();
        store
            .expect_borrow()
            .withf(move |_, lines, _| lines.len() == 1 && lines[0].tool_id == tool && lines[0].quantity == 3)
            .times(1)
            .returning(|user_id, lines, notes| {
                Ok(lines
                    .iter()
                    .map(|l| Loan::open(l.tool_id, user_id, l.quantity, notes.clone(), Utc::now()))
                    .collect())
            });

        let loans = service(store, true)
            .bulk_borrow(
                Uuid::new_v4(),
                vec![
                    BorrowLine { tool_id: tool, quantity: 1 },
                    BorrowLine { tool_id: tool, quantity: 2 },
                ],
                None,
            )
            .await
            .unwrap();
        assert_eq!(loans.len(), 1);
    }
}
