//! Loan queries. Mutations go through the ledger.

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::loan::{LoanDetails, LoanQuery},
    repository::Repository,
};

use super::settings::SettingsService;

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    settings: SettingsService,
}

impl LoansService {
    pub fn new(repository: Repository, settings: SettingsService) -> Self {
        Self { repository, settings }
    }

    pub async fn list(&self, query: &LoanQuery) -> AppResult<Vec<LoanDetails>> {
        let max_days = self.settings.max_loan_days().await;
        self.repository.loans.list(query, max_days).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<LoanDetails> {
        let max_days = self.settings.max_loan_days().await;
        self.repository.loans.get_details(id, max_days).await
    }

    /// Loans of one user, newest first
    pub async fn for_user(&self, user_id: Uuid, query: LoanQuery) -> AppResult<Vec<LoanDetails>> {
        self.list(&LoanQuery {
            user_id: Some(user_id),
            ..query
        })
        .await
    }
}
