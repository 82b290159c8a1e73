//! In-memory ledger store.
//!
//! Intended for tests and local experiments. A single async mutex guards the
//! whole state, so every operation is trivially atomic and serialized.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::{BorrowLine, Loan},
        tool::Tool,
    },
    services::ledger::LedgerStore,
};

#[derive(Debug, Default)]
struct MemoryState {
    tools: HashMap<Uuid, Tool>,
    users: HashSet<Uuid>,
    loans: HashMap<Uuid, Loan>,
}

#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    state: Mutex<MemoryState>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_tool(&self, tool: Tool) {
        self.state.lock().await.tools.insert(tool.id, tool);
    }

    pub async fn insert_user(&self, user_id: Uuid) {
        self.state.lock().await.users.insert(user_id);
    }

    pub async fn tool(&self, tool_id: Uuid) -> Option<Tool> {
        self.state.lock().await.tools.get(&tool_id).cloned()
    }

    pub async fn loan(&self, loan_id: Uuid) -> Option<Loan> {
        self.state.lock().await.loans.get(&loan_id).cloned()
    }

    /// All loans of a tool, open or closed
    pub async fn loans_for_tool(&self, tool_id: Uuid) -> Vec<Loan> {
        self.state
            .lock()
            .await
            .loans
            .values()
            .filter(|l| l.tool_id == tool_id)
            .cloned()
            .collect()
    }
}

fn outstanding(loans: &HashMap<Uuid, Loan>, tool_id: Uuid) -> i64 {
    loans
        .values()
        .filter(|l| l.tool_id == tool_id && l.is_open())
        .map(|l| l.quantity as i64)
        .sum()
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn borrow(
        &self,
        user_id: Uuid,
        lines: Vec<BorrowLine>,
        notes: Option<String>,
    ) -> AppResult<Vec<Loan>> {
        let now = Utc::now();
        let mut state = self.state.lock().await;

        if !state.users.contains(&user_id) {
            return Err(AppError::NotFound(format!("User with id {} not found", user_id)));
        }

        // Work on copies; nothing is written back unless every line fits
        let mut staged: HashMap<Uuid, Tool> = HashMap::new();
        for line in &lines {
            if !staged.contains_key(&line.tool_id) {
                let tool = state.tools.get(&line.tool_id).cloned().ok_or_else(|| {
                    AppError::NotFound(format!("Tool with id {} not found", line.tool_id))
                })?;
                staged.insert(line.tool_id, tool);
            }
            if let Some(tool) = staged.get_mut(&line.tool_id) {
                tool.take(line.quantity, now)?;
            }
        }

        state.tools.extend(staged);

        let loans: Vec<Loan> = lines
            .iter()
            .map(|l| Loan::open(l.tool_id, user_id, l.quantity, notes.clone(), now))
            .collect();
        for loan in &loans {
            state.loans.insert(loan.id, loan.clone());
        }
        Ok(loans)
    }

    async fn return_loan(&self, loan_id: Uuid, quantity: i32) -> AppResult<Loan> {
        let now = Utc::now();
        let mut state = self.state.lock().await;

        let mut loan = state
            .loans
            .get(&loan_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;
        loan.apply_return(quantity, now)?;

        let tool = state
            .tools
            .get_mut(&loan.tool_id)
            .ok_or_else(|| AppError::NotFound(format!("Tool with id {} not found", loan.tool_id)))?;
        tool.restock(quantity, now);

        state.loans.insert(loan.id, loan.clone());
        Ok(loan)
    }

    async fn adjust_stock(
        &self,
        tool_id: Uuid,
        quantity: i32,
        available_quantity: i32,
    ) -> AppResult<Tool> {
        let now = Utc::now();
        let mut state = self.state.lock().await;

        let held = outstanding(&state.loans, tool_id);
        let tool = state
            .tools
            .get_mut(&tool_id)
            .ok_or_else(|| AppError::NotFound(format!("Tool with id {} not found", tool_id)))?;
        tool.set_stock(quantity, available_quantity, held, now)?;
        Ok(tool.clone())
    }
}
