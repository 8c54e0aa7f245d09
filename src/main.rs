use std::env;
use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{get, http::header, web, App, HttpResponse, HttpServer, Responder};
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_actix_web::TracingLogger;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use ledgerflow::account_transaction::{self, service::AccountTransactionMutator};
use ledgerflow::category::{self, service::CategorySummaryService};
use ledgerflow::notify::ChangeFeed;
use ledgerflow::openapi;
use ledgerflow::store::postgres::PgLedgerStore;
use ledgerflow::store::LedgerStore;
use ledgerflow::suggestion::{self, service::SuggestionService};
use ledgerflow::transaction::{self, service::TransactionWriter};

/// Health check endpoint that verifies database connectivity
#[get("/health")]
async fn health_check(pool: web::Data<PgPool>) -> impl Responder {
    match sqlx::query("SELECT 1").execute(pool.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "healthy",
            "database": "connected"
        })),
        Err(_) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "database": "disconnected"
        })),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    // Initialize tracing subscriber for structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    // Get allowed origins from environment (comma-separated), default to localhost
    let allowed_origins =
        env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "http://localhost:3000".to_string());

    // Configure connection pool with production-ready settings
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&database_url)
        .await
        .expect("Failed to create pool");

    // One store client and one notification feed, injected into every
    // service at construction.
    let store: Arc<dyn LedgerStore> = Arc::new(PgLedgerStore::new(pool.clone()));
    let feed = ChangeFeed::default();

    let writer = TransactionWriter::new(store.clone(), feed.clone());
    let mutator = AccountTransactionMutator::new(store.clone(), feed.clone());
    let suggestions = SuggestionService::new(store.clone());
    let summaries = CategorySummaryService::new(store);

    info!("Starting server at http://{bind_addr}");

    HttpServer::new(move || {
        // Clone allowed_origins for this closure invocation
        let allowed_origins = allowed_origins.clone();

        // Configure CORS
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                let origin_str = origin.to_str().unwrap_or("");
                allowed_origins
                    .split(',')
                    .any(|allowed| allowed.trim() == origin_str)
            })
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
            .allowed_header("X-Owner-Id")
            .max_age(3600);

        App::new()
            // Middleware (order matters: outer to inner)
            .wrap(TracingLogger::default())
            .wrap(cors)
            // Shared state
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(feed.clone()))
            .app_data(web::Data::new(writer.clone()))
            .app_data(web::Data::new(mutator.clone()))
            .app_data(web::Data::new(suggestions.clone()))
            .app_data(web::Data::new(summaries.clone()))
            // Swagger UI
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
            )
            // Health endpoint
            .service(health_check)
            // Budget aggregates
            .service(category::get_budget_overview)
            // Suggestion lookup
            .service(suggestion::get_suggested_account)
            // Unified transaction writes
            .service(transaction::create_transaction)
            // Account transaction mutations
            .service(account_transaction::update_account_transaction)
            .service(account_transaction::delete_account_transaction)
    })
    .bind(bind_addr)?
    .run()
    .await
}
