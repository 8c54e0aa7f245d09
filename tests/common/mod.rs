use actix_web::{test, web, App};
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use ledgerflow::account_transaction::{self, service::AccountTransactionMutator};
use ledgerflow::category::{self, service::CategorySummaryService};
use ledgerflow::notify::ChangeFeed;
use ledgerflow::store::memory::MemoryLedgerStore;
use ledgerflow::store::LedgerStore;
use ledgerflow::suggestion::{self, service::SuggestionService};
use ledgerflow::transaction::{self, service::TransactionWriter};

/// Test harness over the in-memory store. Each instance is one isolated
/// ledger with one owner; requests carry the owner header the way the
/// upstream gateway would stamp it.
pub struct TestApp {
    pub store: Arc<MemoryLedgerStore>,
    pub feed: ChangeFeed,
    pub owner_id: Uuid,
}

pub struct TestResponse {
    status: u16,
    body: bytes::Bytes,
}

impl TestResponse {
    pub fn status(&self) -> u16 {
        self.status
    }

    pub async fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON response")
    }
}

impl TestApp {
    pub fn new() -> Self {
        TestApp {
            store: Arc::new(MemoryLedgerStore::new()),
            feed: ChangeFeed::default(),
            owner_id: Uuid::new_v4(),
        }
    }

    async fn request(&self, req: test::TestRequest) -> TestResponse {
        let store: Arc<dyn LedgerStore> = self.store.clone();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(TransactionWriter::new(
                    store.clone(),
                    self.feed.clone(),
                )))
                .app_data(web::Data::new(AccountTransactionMutator::new(
                    store.clone(),
                    self.feed.clone(),
                )))
                .app_data(web::Data::new(SuggestionService::new(store.clone())))
                .app_data(web::Data::new(CategorySummaryService::new(store)))
                .service(transaction::create_transaction)
                .service(account_transaction::update_account_transaction)
                .service(account_transaction::delete_account_transaction)
                .service(suggestion::get_suggested_account)
                .service(category::get_budget_overview),
        )
        .await;

        let req = req
            .insert_header(("X-Owner-Id", self.owner_id.to_string()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        let status = resp.status().as_u16();
        let body = test::read_body(resp).await;

        TestResponse { status, body }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(test::TestRequest::get().uri(path)).await
    }

    /// GET without the owner header, for the 401 contract.
    pub async fn get_unauthenticated(&self, path: &str) -> TestResponse {
        let store: Arc<dyn LedgerStore> = self.store.clone();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(CategorySummaryService::new(store)))
                .service(category::get_budget_overview),
        )
        .await;

        let req = test::TestRequest::get().uri(path).to_request();
        let resp = test::call_service(&app, req).await;

        let status = resp.status().as_u16();
        let body = test::read_body(resp).await;

        TestResponse { status, body }
    }

    pub async fn post(&self, path: &str, payload: &Value) -> TestResponse {
        self.request(test::TestRequest::post().uri(path).set_json(payload))
            .await
    }

    pub async fn patch(&self, path: &str, payload: &Value) -> TestResponse {
        self.request(test::TestRequest::patch().uri(path).set_json(payload))
            .await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request(test::TestRequest::delete().uri(path)).await
    }
}

/// Read a decimal field regardless of whether it was serialized as a JSON
/// number or a string.
pub fn decimal_field(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        other => other.to_string().parse().expect("decimal number"),
    }
}
