#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, Response, StatusCode},
    Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pos_sales_api::{
    auth::{AuthConfig, Claims, TokenVerifier},
    clients::inventory::{HttpInventoryClient, InventoryApi},
    config::AppConfig,
    db,
    events::{self, EventSender},
    handlers::AppServices,
    AppState,
};

pub const TEST_JWT_SECRET: &str = "integration_test_secret_0123456789_abcdefghijklmnop";

/// Helper harness spinning up the full application router against a fresh
/// SQLite database and a wiremock stand-in for the inventory service.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub inventory_server: MockServer,
    token: String,
    db_file: PathBuf,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let inventory_server = MockServer::start().await;

        // Consumption/credit notifications succeed unless a test overrides them.
        Mock::given(method("POST"))
            .and(path("/inventory/commit"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&inventory_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/inventory/credit"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&inventory_server)
            .await;

        let db_file = std::env::temp_dir().join(format!("pos_sales_test_{}.db", Uuid::new_v4()));
        let _ = std::fs::remove_file(&db_file);

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_file.display()),
            TEST_JWT_SECRET,
            inventory_server.uri(),
            "127.0.0.1",
            0,
            "test",
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db_arc = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let inventory: Arc<dyn InventoryApi> = Arc::new(
            HttpInventoryClient::new(inventory_server.uri(), Duration::from_secs(5))
                .expect("failed to build inventory client"),
        );

        let services = AppServices::new(db_arc.clone(), inventory, event_sender.clone(), &cfg);

        let state = AppState {
            db: db_arc,
            config: cfg.clone(),
            event_sender,
            services,
        };

        let verifier = Arc::new(TokenVerifier::new(AuthConfig {
            jwt_secret: cfg.jwt_secret.clone(),
            jwt_issuer: cfg.jwt_issuer.clone(),
            jwt_audience: cfg.jwt_audience.clone(),
        }));

        let router = pos_sales_api::app_router(state.clone(), verifier);
        let token = mint_token(&cfg, vec!["admin".into()], vec![]);

        Self {
            router,
            state,
            inventory_server,
            token,
            db_file,
            _event_task: event_task,
        }
    }

    /// Registers a stocked, enabled product on the inventory stub.
    pub async fn stock_product(&self, product_id: &str, name: &str, unit_price: Decimal) {
        self.mock_check(
            product_id,
            json!({
                "name": name,
                "unitPrice": unit_price.to_string(),
                "inStock": true,
                "state": true
            }),
        )
        .await;
    }

    /// Registers a product whose requested quantity exceeds availability.
    pub async fn out_of_stock_product(&self, product_id: &str, name: &str, unit_price: Decimal) {
        self.mock_check(
            product_id,
            json!({
                "name": name,
                "unitPrice": unit_price.to_string(),
                "inStock": false,
                "state": true
            }),
        )
        .await;
    }

    /// Registers an administratively disabled product.
    pub async fn disabled_product(&self, product_id: &str, name: &str, unit_price: Decimal) {
        self.mock_check(
            product_id,
            json!({
                "name": name,
                "unitPrice": unit_price.to_string(),
                "inStock": true,
                "state": false
            }),
        )
        .await;
    }

    /// Makes the stock check answer 404 for the given product.
    pub async fn unknown_product(&self, product_id: &str) {
        Mock::given(method("POST"))
            .and(path("/inventory/check"))
            .and(body_partial_json(json!({ "productId": product_id })))
            .respond_with(ResponseTemplate::new(404))
            .mount(&self.inventory_server)
            .await;
    }

    /// Makes the stock check fail with a server error for the given product.
    pub async fn failing_inventory(&self, product_id: &str) {
        Mock::given(method("POST"))
            .and(path("/inventory/check"))
            .and(body_partial_json(json!({ "productId": product_id })))
            .respond_with(ResponseTemplate::new(500))
            .mount(&self.inventory_server)
            .await;
    }

    async fn mock_check(&self, product_id: &str, body: Value) {
        Mock::given(method("POST"))
            .and(path("/inventory/check"))
            .and(body_partial_json(json!({ "productId": product_id })))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.inventory_server)
            .await;
    }

    /// Issues a request with the default admin token.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
        let token = self.token.clone();
        self.request_with_token(method, uri, body, Some(&token))
            .await
    }

    /// Issues a request with an explicit (or no) bearer token.
    pub async fn request_with_token(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(value) => builder
                .header("content-type", "application/json")
                .body(Body::from(value.to_string()))
                .expect("request build"),
            None => builder.body(Body::empty()).expect("request build"),
        };
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router call")
    }

    /// Creates a campaign through the API and returns its id.
    pub async fn seed_campaign(&self, payload: Value) -> Uuid {
        let response = self
            .request(Method::POST, "/api/v1/campaigns", Some(payload))
            .await;
        assert_eq!(response.status(), StatusCode::OK, "campaign seed failed");
        let body = response_json(response).await;
        body["data"]["id"]
            .as_str()
            .and_then(|id| Uuid::parse_str(id).ok())
            .expect("campaign id")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_file);
    }
}

/// Mints a capability token the way the auth service would.
pub fn mint_token(cfg: &AppConfig, roles: Vec<String>, permissions: Vec<String>) -> String {
    let now = Utc::now();
    let claims = Claims {
        sub: "test-cashier".into(),
        name: Some("Test Cashier".into()),
        roles,
        permissions,
        jti: Uuid::new_v4().to_string(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::hours(1)).timestamp(),
        iss: cfg.jwt_issuer.clone(),
        aud: cfg.jwt_audience.clone(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
    )
    .expect("token mint")
}

/// Convenience: a token carrying exactly one permission.
pub fn token_with_permission(cfg: &AppConfig, permission: &str) -> String {
    mint_token(cfg, vec!["cashier".into()], vec![permission.to_string()])
}

pub async fn response_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
