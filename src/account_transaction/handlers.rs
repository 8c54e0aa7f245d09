use actix_web::{delete, patch, web, HttpResponse};
use validator::Validate;

use crate::errors::{AppError, ErrorResponse};
use crate::extractors::OwnerId;

use super::models::{
    AccountTransactionIdPath, AccountTransactionResponse, UpdateAccountTransactionDto,
};
use super::service::AccountTransactionMutator;

/// PATCH /account-transactions/{id} - Update an account transaction,
/// re-deriving the balance and propagating to the linked budget row
#[utoipa::path(
    patch,
    path = "/account-transactions/{id}",
    tag = "Account Transactions",
    params(AccountTransactionIdPath),
    request_body = UpdateAccountTransactionDto,
    responses(
        (status = 200, description = "Account transaction updated", body = AccountTransactionResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Account transaction not found", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Partial write or consistency warning", body = ErrorResponse)
    )
)]
#[patch("/account-transactions/{id}")]
pub async fn update_account_transaction(
    mutator: web::Data<AccountTransactionMutator>,
    owner: OwnerId,
    path: web::Path<AccountTransactionIdPath>,
    body: web::Json<UpdateAccountTransactionDto>,
) -> Result<HttpResponse, AppError> {
    body.validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;
    body.validate_amount()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let updated = mutator
        .update(owner.owner_id, path.id, body.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(AccountTransactionResponse::from(updated)))
}

/// DELETE /account-transactions/{id} - Delete an account transaction,
/// reversing its balance contribution and removing the linked budget row
#[utoipa::path(
    delete,
    path = "/account-transactions/{id}",
    tag = "Account Transactions",
    params(AccountTransactionIdPath),
    responses(
        (status = 204, description = "Account transaction deleted"),
        (status = 404, description = "Account transaction not found", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Consistency warning", body = ErrorResponse)
    )
)]
#[delete("/account-transactions/{id}")]
pub async fn delete_account_transaction(
    mutator: web::Data<AccountTransactionMutator>,
    owner: OwnerId,
    path: web::Path<AccountTransactionIdPath>,
) -> Result<HttpResponse, AppError> {
    mutator.delete(owner.owner_id, path.id).await?;

    Ok(HttpResponse::NoContent().finish())
}
