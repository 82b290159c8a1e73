//! PostgreSQL ledger store.
//!
//! Each operation is a single transaction. Tool and loan rows are locked with
//! `SELECT ... FOR UPDATE` before their counters are checked, so concurrent
//! borrowers of the same tool queue behind each other instead of both passing
//! the availability check against a stale value.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::{BorrowLine, Loan},
        tool::{Tool, ToolRow},
    },
    services::ledger::LedgerStore,
};

#[derive(Clone)]
pub struct PgLedgerStore {
    pool: Pool<Postgres>,
}

impl PgLedgerStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn db_error(err: sqlx::Error) -> AppError {
    AppError::from_db(err, "Duplicate ledger record")
}

async fn lock_tool(conn: &mut PgConnection, tool_id: Uuid) -> AppResult<Tool> {
    sqlx::query_as::<_, ToolRow>("SELECT * FROM tools WHERE id = $1 FOR UPDATE")
        .bind(tool_id)
        .fetch_optional(conn)
        .await
        .map_err(db_error)?
        .map(Tool::from)
        .ok_or_else(|| AppError::NotFound(format!("Tool with id {} not found", tool_id)))
}

async fn lock_loan(conn: &mut PgConnection, loan_id: Uuid) -> AppResult<Loan> {
    sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
        .bind(loan_id)
        .fetch_optional(conn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))
}

async fn write_tool_stock(conn: &mut PgConnection, tool: &Tool) -> AppResult<()> {
    sqlx::query(
        "UPDATE tools SET quantity = $2, available_quantity = $3, updated_at = $4 WHERE id = $1",
    )
    .bind(tool.id)
    .bind(tool.quantity)
    .bind(tool.available_quantity)
    .bind(tool.updated_at)
    .execute(conn)
    .await
    .map_err(db_error)?;
    Ok(())
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn borrow(
        &self,
        user_id: Uuid,
        lines: Vec<BorrowLine>,
        notes: Option<String>,
    ) -> AppResult<Vec<Loan>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let user_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;
        if !user_exists {
            return Err(AppError::NotFound(format!("User with id {} not found", user_id)));
        }

        // Lock in id order so multi-tool borrows cannot deadlock each other
        let mut tool_ids: Vec<Uuid> = lines.iter().map(|l| l.tool_id).collect();
        tool_ids.sort();
        tool_ids.dedup();

        let mut tools: HashMap<Uuid, Tool> = HashMap::with_capacity(tool_ids.len());
        for tool_id in tool_ids {
            let tool = lock_tool(&mut tx, tool_id).await?;
            tools.insert(tool_id, tool);
        }

        for line in &lines {
            let tool = tools
                .get_mut(&line.tool_id)
                .ok_or_else(|| AppError::Internal("Locked tool missing".to_string()))?;
            // Dropping `tx` on error rolls everything back
            tool.take(line.quantity, now)?;
        }

        for tool in tools.values() {
            write_tool_stock(&mut tx, tool).await?;
        }

        let mut loans = Vec::with_capacity(lines.len());
        for line in &lines {
            let loan = Loan::open(line.tool_id, user_id, line.quantity, notes.clone(), now);
            let stored = sqlx::query_as::<_, Loan>(
                r#"
                INSERT INTO loans (id, tool_id, user_id, quantity, status, borrowed_at, returned_at, notes)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
                "#,
            )
            .bind(loan.id)
            .bind(loan.tool_id)
            .bind(loan.user_id)
            .bind(loan.quantity)
            .bind(loan.status)
            .bind(loan.borrowed_at)
            .bind(loan.returned_at)
            .bind(&loan.notes)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;
            loans.push(stored);
        }

        tx.commit().await.map_err(db_error)?;
        Ok(loans)
    }

    async fn return_loan(&self, loan_id: Uuid, quantity: i32) -> AppResult<Loan> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Loan first, then tool: the same order for every return
        let mut loan = lock_loan(&mut tx, loan_id).await?;
        loan.apply_return(quantity, now)?;

        let mut tool = lock_tool(&mut tx, loan.tool_id).await?;
        tool.restock(quantity, now);

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET quantity = $2, status = $3, returned_at = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(loan.id)
        .bind(loan.quantity)
        .bind(loan.status)
        .bind(loan.returned_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        write_tool_stock(&mut tx, &tool).await?;

        tx.commit().await.map_err(db_error)?;
        Ok(loan)
    }

    async fn adjust_stock(
        &self,
        tool_id: Uuid,
        quantity: i32,
        available_quantity: i32,
    ) -> AppResult<Tool> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let mut tool = lock_tool(&mut tx, tool_id).await?;

        let outstanding: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0)::bigint FROM loans WHERE tool_id = $1 AND status <> 'RETURNED'",
        )
        .bind(tool_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        tool.set_stock(quantity, available_quantity, outstanding, now)?;
        write_tool_stock(&mut tx, &tool).await?;

        tx.commit().await.map_err(db_error)?;
        Ok(tool)
    }
}
