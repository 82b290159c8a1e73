//! Loan endpoints: listing, borrowing and returns

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::loan::{BorrowRequest, BulkBorrowRequest, Loan, LoanDetails, LoanQuery, ReturnRequest},
    AppState,
};

use super::{AuthenticatedUser, ValidJson};

/// List loans. Non-admin users only see their own.
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(LoanQuery),
    responses(
        (status = 200, description = "List of loans", body = Vec<LoanDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(mut query): Query<LoanQuery>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    if !claims.is_admin() {
        query.user_id = Some(claims.user_id);
    }

    let loans = state.services.loans.list(&query).await?;
    Ok(Json(loans))
}

/// Get loan details
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 403, description = "Loan belongs to another user"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.get(id).await?;
    claims.require_self_or_admin(loan.user.id)?;
    Ok(Json(loan))
}

/// Get loans for a specific user
#[utoipa::path(
    get,
    path = "/users/{id}/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "User ID"),
        LoanQuery
    ),
    responses(
        (status = 200, description = "User's loans", body = Vec<LoanDetails>),
        (status = 403, description = "Not allowed to view these loans")
    )
)]
pub async fn get_user_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<Uuid>,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    claims.require_self_or_admin(user_id)?;

    let loans = state.services.loans.for_user(user_id, query).await?;
    Ok(Json(loans))
}

/// Borrow units of a tool
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Loan created", body = Loan),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Tool or user not found"),
        (status = 409, description = "Insufficient stock, tool in maintenance or concurrent update")
    )
)]
pub async fn borrow(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidJson(request): ValidJson<BorrowRequest>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    let user_id = request.user_id.unwrap_or(claims.user_id);
    claims.require_self_or_admin(user_id)?;

    let loan = state
        .services
        .ledger
        .borrow(request.tool_id, user_id, request.quantity, request.notes)
        .await?;

    Ok((StatusCode::CREATED, Json(loan)))
}

/// Borrow several tools at once, all or nothing
#[utoipa::path(
    post,
    path = "/loans/bulk",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = BulkBorrowRequest,
    responses(
        (status = 201, description = "Loans created", body = Vec<Loan>),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Tool or user not found"),
        (status = 409, description = "A line could not be satisfied, nothing was borrowed")
    )
)]
pub async fn bulk_borrow(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidJson(request): ValidJson<BulkBorrowRequest>,
) -> AppResult<(StatusCode, Json<Vec<Loan>>)> {
    let user_id = request.user_id.unwrap_or(claims.user_id);
    claims.require_self_or_admin(user_id)?;

    let loans = state
        .services
        .ledger
        .bulk_borrow(user_id, request.items, request.notes)
        .await?;

    Ok((StatusCode::CREATED, Json(loans)))
}

/// Return units of a loan
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Loan ID")),
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Loan updated", body = Loan),
        (status = 403, description = "Loan belongs to another user"),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan already returned"),
        (status = 422, description = "Returned quantity exceeds the loan")
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    ValidJson(request): ValidJson<ReturnRequest>,
) -> AppResult<Json<Loan>> {
    if !claims.is_admin() {
        let loan = state.services.loans.get(id).await?;
        claims.require_self_or_admin(loan.user.id)?;
    }

    let loan = state
        .services
        .ledger
        .return_loan(id, request.returned_quantity)
        .await?;
    Ok(Json(loan))
}
