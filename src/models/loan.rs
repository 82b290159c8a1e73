//! Loan model and related types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::enums::{LoanStatus, Role};
use super::tool::ToolShort;
use super::user::UserShort;
use crate::error::{AppError, AppResult};

/// Loan model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: Uuid,
    pub tool_id: Uuid,
    pub user_id: Uuid,
    /// Units still held by this loan
    pub quantity: i32,
    pub status: LoanStatus,
    pub borrowed_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl Loan {
    /// New active loan
    pub fn open(
        tool_id: Uuid,
        user_id: Uuid,
        quantity: i32,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tool_id,
            user_id,
            quantity,
            status: LoanStatus::Active,
            borrowed_at: now,
            returned_at: None,
            notes,
        }
    }

    /// Whether the loan still holds units against the tool's stock
    pub fn is_open(&self) -> bool {
        self.status != LoanStatus::Returned
    }

    /// Give back `quantity` units. The loan closes when nothing is left.
    pub fn apply_return(&mut self, quantity: i32, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != LoanStatus::Active {
            return Err(AppError::InvalidState(format!(
                "Loan {} is not active ({})",
                self.id, self.status
            )));
        }
        if quantity < 1 {
            return Err(AppError::InvalidRange(format!(
                "Returned quantity must be at least 1 (got {})",
                quantity
            )));
        }
        if quantity > self.quantity {
            return Err(AppError::QuantityExceeded(format!(
                "Returned quantity {} exceeds the {} units on loan",
                quantity, self.quantity
            )));
        }

        self.quantity -= quantity;
        self.returned_at = Some(now);
        if self.quantity == 0 {
            self.status = LoanStatus::Returned;
        }
        Ok(())
    }

    /// Whether an open loan has been out longer than `max_loan_days`
    pub fn is_overdue(&self, max_loan_days: i32, now: DateTime<Utc>) -> bool {
        self.status == LoanStatus::Overdue
            || (self.status == LoanStatus::Active
                && self.borrowed_at + Duration::days(max_loan_days as i64) < now)
    }
}

/// Internal row structure for joined loan queries
#[derive(Debug, Clone, FromRow)]
pub struct LoanDetailsRow {
    pub id: Uuid,
    pub tool_id: Uuid,
    pub user_id: Uuid,
    pub quantity: i32,
    pub status: LoanStatus,
    pub borrowed_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub tool_name: String,
    pub tool_qr_code: String,
    pub tool_category: Option<String>,
    pub user_name: String,
    pub user_last_name: Option<String>,
    pub user_email: String,
    pub user_role: Role,
}

impl LoanDetailsRow {
    pub fn into_details(self, max_loan_days: i32, now: DateTime<Utc>) -> LoanDetails {
        let loan = Loan {
            id: self.id,
            tool_id: self.tool_id,
            user_id: self.user_id,
            quantity: self.quantity,
            status: self.status,
            borrowed_at: self.borrowed_at,
            returned_at: self.returned_at,
            notes: self.notes,
        };
        LoanDetails {
            is_overdue: loan.is_overdue(max_loan_days, now),
            id: loan.id,
            quantity: loan.quantity,
            status: loan.status,
            borrowed_at: loan.borrowed_at,
            returned_at: loan.returned_at,
            notes: loan.notes,
            tool: ToolShort {
                id: self.tool_id,
                name: self.tool_name,
                qr_code: self.tool_qr_code,
                category: self.tool_category,
            },
            user: UserShort {
                id: self.user_id,
                name: self.user_name,
                last_name: self.user_last_name,
                email: self.user_email,
                role: self.user_role,
            },
        }
    }
}

/// Loan with tool and user for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoanDetails {
    pub id: Uuid,
    pub quantity: i32,
    pub status: LoanStatus,
    pub borrowed_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub tool: ToolShort,
    pub user: UserShort,
    /// Computed from the configured maximum loan duration
    pub is_overdue: bool,
}

/// Loan list filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanFilter {
    Active,
    Returned,
    Overdue,
}

/// Loan query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LoanQuery {
    pub status: Option<LoanFilter>,
    pub user_id: Option<Uuid>,
    pub tool_id: Option<Uuid>,
}

/// Borrow request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    pub tool_id: Uuid,
    /// Borrower; defaults to the authenticated user
    pub user_id: Option<Uuid>,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(length(max = 1000, message = "Notes are limited to 1000 characters"))]
    pub notes: Option<String>,
}

/// One line of a bulk borrow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowLine {
    pub tool_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

/// Bulk borrow request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkBorrowRequest {
    pub user_id: Option<Uuid>,
    #[validate(length(min = 1, message = "At least one tool is required"), nested)]
    pub items: Vec<BorrowLine>,
    #[validate(length(max = 1000, message = "Notes are limited to 1000 characters"))]
    pub notes: Option<String>,
}

/// Return request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    #[validate(range(min = 1, message = "Returned quantity must be at least 1"))]
    pub returned_quantity: i32,
}

/// Sum the requested quantity per tool, keeping first-seen order
pub fn aggregate_lines(lines: &[BorrowLine]) -> Vec<BorrowLine> {
    let mut merged: Vec<BorrowLine> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged.iter_mut().find(|l| l.tool_id == line.tool_id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => merged.push(line.clone()),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loan(quantity: i32) -> Loan {
        Loan::open(Uuid::new_v4(), Uuid::new_v4(), quantity, None, Utc::now())
    }

    #[test]
    fn test_partial_then_full_return() {
        let mut l = loan(5);
        l.apply_return(2, Utc::now()).unwrap();
        assert_eq!(l.quantity, 3);
        assert_eq!(l.status, LoanStatus::Active);
        assert!(l.returned_at.is_some());

        l.apply_return(3, Utc::now()).unwrap();
        assert_eq!(l.quantity, 0);
        assert_eq!(l.status, LoanStatus::Returned);
    }

    #[test]
    fn test_return_errors_leave_loan_untouched() {
        let mut l = loan(2);
        assert!(matches!(l.apply_return(3, Utc::now()), Err(AppError::QuantityExceeded(_))));
        assert!(matches!(l.apply_return(0, Utc::now()), Err(AppError::InvalidRange(_))));
        assert_eq!(l.quantity, 2);
        assert_eq!(l.status, LoanStatus::Active);
        assert!(l.returned_at.is_none());

        l.apply_return(2, Utc::now()).unwrap();
        assert!(matches!(l.apply_return(1, Utc::now()), Err(AppError::InvalidState(_))));
    }

    #[test]
    fn test_overdue_flag() {
        let now = Utc::now();
        let mut l = loan(1);
        l.borrowed_at = now - Duration::days(31);
        assert!(l.is_overdue(30, now));
        assert!(!l.is_overdue(45, now));

        l.status = LoanStatus::Returned;
        assert!(!l.is_overdue(30, now));
    }

    #[test]
    fn test_aggregate_lines() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let lines = vec![
            BorrowLine { tool_id: a, quantity: 1 },
            BorrowLine { tool_id: b, quantity: 2 },
            BorrowLine { tool_id: a, quantity: 3 },
        ];
        let merged = aggregate_lines(&lines);
        assert_eq!(
            merged,
            vec![
                BorrowLine { tool_id: a, quantity: 4 },
                BorrowLine { tool_id: b, quantity: 2 },
            ]
        );
    }
}
