use actix_web::{get, web, HttpResponse};

use crate::errors::{AppError, ErrorResponse};
use crate::extractors::OwnerId;

use super::models::{CategoryIdPath, SuggestedAccountResponse};
use super::service::SuggestionService;

/// GET /categories/{category_id}/suggested-account - Resolve the settlement
/// account a category suggests
#[utoipa::path(
    get,
    path = "/categories/{category_id}/suggested-account",
    tag = "Suggestions",
    params(CategoryIdPath),
    responses(
        (status = 200, description = "Resolved suggestion", body = SuggestedAccountResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[get("/categories/{category_id}/suggested-account")]
pub async fn get_suggested_account(
    service: web::Data<SuggestionService>,
    owner: OwnerId,
    path: web::Path<CategoryIdPath>,
) -> Result<HttpResponse, AppError> {
    let suggestion = service
        .suggest_account(owner.owner_id, path.category_id)
        .await?;

    Ok(HttpResponse::Ok().json(SuggestedAccountResponse::from(suggestion)))
}
