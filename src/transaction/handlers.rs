use actix_web::{post, web, HttpResponse};
use validator::Validate;

use crate::errors::{AppError, ErrorResponse};
use crate::extractors::OwnerId;

use super::models::{CreateUnifiedDto, TransactionResponse, UnifiedTransactionResponse};
use super::service::TransactionWriter;

/// POST /transactions - Record one economic event on the budget side and,
/// when an account resolves, the account side as a linked pair
#[utoipa::path(
    post,
    path = "/transactions",
    tag = "Transactions",
    request_body = CreateUnifiedDto,
    responses(
        (status = 201, description = "Transaction created", body = UnifiedTransactionResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Category or account not found", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Partial write or consistency warning", body = ErrorResponse)
    )
)]
#[post("/transactions")]
pub async fn create_transaction(
    writer: web::Data<TransactionWriter>,
    owner: OwnerId,
    body: web::Json<CreateUnifiedDto>,
) -> Result<HttpResponse, AppError> {
    body.validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let outcome = writer
        .create_unified(owner.owner_id, body.into_inner())
        .await?;

    Ok(HttpResponse::Created().json(UnifiedTransactionResponse {
        transaction: TransactionResponse::from(outcome.transaction),
        account_transaction: outcome.account_transaction.map(Into::into),
    }))
}
