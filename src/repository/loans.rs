//! Loans repository for read queries.
//!
//! Loan writes go through the ledger store.

use chrono::Utc;
use sqlx::{Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::loan::{LoanDetails, LoanDetailsRow, LoanFilter, LoanQuery},
};

const DETAILS_SELECT: &str = r#"
    SELECT l.id, l.tool_id, l.user_id, l.quantity, l.status, l.borrowed_at, l.returned_at, l.notes,
           t.name AS tool_name, t.qr_code AS tool_qr_code, t.category AS tool_category,
           u.name AS user_name, u.last_name AS user_last_name, u.email AS user_email, u.role AS user_role
    FROM loans l
    JOIN tools t ON t.id = l.tool_id
    JOIN users u ON u.id = l.user_id
    WHERE TRUE
"#;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List loans with tool and user details
    pub async fn list(&self, query: &LoanQuery, max_loan_days: i32) -> AppResult<Vec<LoanDetails>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(DETAILS_SELECT);

        if let Some(user_id) = query.user_id {
            builder.push(" AND l.user_id = ").push_bind(user_id);
        }
        if let Some(tool_id) = query.tool_id {
            builder.push(" AND l.tool_id = ").push_bind(tool_id);
        }
        match query.status {
            Some(LoanFilter::Active) => {
                builder.push(" AND l.status <> 'RETURNED'");
            }
            Some(LoanFilter::Returned) => {
                builder.push(" AND l.status = 'RETURNED'");
            }
            Some(LoanFilter::Overdue) => {
                builder
                    .push(" AND (l.status = 'OVERDUE' OR (l.status = 'ACTIVE' AND l.borrowed_at + make_interval(days => ")
                    .push_bind(max_loan_days)
                    .push(") < NOW()))");
            }
            None => {}
        }
        builder.push(" ORDER BY l.borrowed_at DESC");

        let now = Utc::now();
        let rows = builder
            .build_query_as::<LoanDetailsRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.into_details(max_loan_days, now))
            .collect())
    }

    /// Get one loan with details
    pub async fn get_details(&self, id: Uuid, max_loan_days: i32) -> AppResult<LoanDetails> {
        let query = format!("{} AND l.id = $1", DETAILS_SELECT);
        sqlx::query_as::<_, LoanDetailsRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| row.into_details(max_loan_days, Utc::now()))
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Count loans still holding units
    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE status <> 'RETURNED'")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Count overdue loans
    pub async fn count_overdue(&self, max_loan_days: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM loans
            WHERE status = 'OVERDUE'
               OR (status = 'ACTIVE' AND borrowed_at + make_interval(days => $1) < NOW())
            "#,
        )
        .bind(max_loan_days)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
