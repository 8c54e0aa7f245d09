use actix_web::{get, web, HttpResponse};

use crate::errors::{AppError, ErrorResponse};
use crate::extractors::OwnerId;
use crate::store::models::PeriodFilter;

use super::models::{BudgetOverview, OverviewQuery};
use super::service::CategorySummaryService;

/// GET /budget/overview - Authoritative category summaries plus portfolio
/// totals; the refetch target of the client reconciliation loop
#[utoipa::path(
    get,
    path = "/budget/overview",
    tag = "Budget",
    params(OverviewQuery),
    responses(
        (status = 200, description = "Category and portfolio aggregates", body = BudgetOverview),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[get("/budget/overview")]
pub async fn get_budget_overview(
    service: web::Data<CategorySummaryService>,
    owner: OwnerId,
    query: web::Query<OverviewQuery>,
) -> Result<HttpResponse, AppError> {
    let period = PeriodFilter {
        start: query.start_date,
        end: query.end_date,
    };

    let overview = service.overview(owner.owner_id, period).await?;

    Ok(HttpResponse::Ok().json(overview))
}
