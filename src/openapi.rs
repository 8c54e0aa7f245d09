use utoipa::OpenApi;

use crate::account_transaction::models::{AccountTransactionResponse, UpdateAccountTransactionDto};
use crate::category::models::{BudgetOverview, CategorySummary};
use crate::errors::ErrorResponse;
use crate::store::models::{AccountTransactionKind, EntryType};
use crate::suggestion::models::{SuggestedAccountResponse, SuggestionReason};
use crate::transaction::models::{
    CreateUnifiedDto, TransactionResponse, UnifiedTransactionResponse,
};

/// OpenAPI documentation configuration
#[derive(OpenApi)]
#[openapi(
    info(
        title = "LedgerFlow API",
        version = "1.0.0",
        description = "Consistency subsystem of a personal-finance tracker: unified \
                       transaction writes, account transaction mutations, and the \
                       aggregates the client reconciles against",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development server")
    ),
    paths(
        crate::transaction::handlers::create_transaction,
        crate::account_transaction::handlers::update_account_transaction,
        crate::account_transaction::handlers::delete_account_transaction,
        crate::suggestion::handlers::get_suggested_account,
        crate::category::handlers::get_budget_overview,
    ),
    components(schemas(
        CreateUnifiedDto,
        TransactionResponse,
        UnifiedTransactionResponse,
        UpdateAccountTransactionDto,
        AccountTransactionResponse,
        SuggestedAccountResponse,
        SuggestionReason,
        CategorySummary,
        BudgetOverview,
        EntryType,
        AccountTransactionKind,
        ErrorResponse,
    )),
    tags(
        (name = "Transactions", description = "Unified transaction writes"),
        (name = "Account Transactions", description = "Account-side mutations"),
        (name = "Suggestions", description = "Category account suggestions"),
        (name = "Budget", description = "Authoritative aggregates")
    )
)]
pub struct ApiDoc;
