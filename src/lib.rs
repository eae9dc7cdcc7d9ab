//! POS Sales API Library
//!
//! Sales service of the point-of-sale back-end: sale capture with campaign
//! discounts, inventory orchestration and return processing.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod clients;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod health;
pub mod migrator;
pub mod openapi;
pub mod request_context;
pub mod services;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::consts as perm;
use crate::auth::{AuthRouterExt, TokenVerifier};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: request_context::current_request_context().map(|ctx| ctx.request_id),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Versioned API routes with permission gating per route group.
pub fn api_v1_routes() -> Router<AppState> {
    let sales_read = Router::new()
        .route("/sales", get(handlers::sales::list_sales))
        .route("/sales/:id", get(handlers::sales::get_sale))
        .with_permission(perm::SALES_READ);

    let sales_create = Router::new()
        .route("/sales", post(handlers::sales::create_sale))
        .with_permission(perm::SALES_CREATE);

    let sales_delete = Router::new()
        .route("/sales/:id", delete(handlers::sales::delete_sale))
        .with_permission(perm::SALES_DELETE);

    let returns_write = Router::new()
        .route("/returns", post(handlers::returns::process_returns))
        .with_permission(perm::RETURNS_CREATE);

    let campaigns_read = Router::new()
        .route("/campaigns", get(handlers::campaigns::list_campaigns))
        .route("/campaigns/:id", get(handlers::campaigns::get_campaign))
        .with_permission(perm::CAMPAIGNS_READ);

    let campaigns_manage = Router::new()
        .route("/campaigns", post(handlers::campaigns::create_campaign))
        .route("/campaigns/:id", put(handlers::campaigns::update_campaign))
        .route("/campaigns/:id", delete(handlers::campaigns::delete_campaign))
        .with_permission(perm::CAMPAIGNS_MANAGE);

    Router::new()
        .merge(sales_read)
        .merge(sales_create)
        .merge(sales_delete)
        .merge(returns_write)
        .merge(campaigns_read)
        .merge(campaigns_manage)
}

/// Assembles the application router: versioned API behind token auth, health
/// endpoints, Swagger UI and the request-context middleware.
pub fn app_router(state: AppState, verifier: Arc<TokenVerifier>) -> Router {
    let api = api_v1_routes().layer(axum::middleware::from_fn_with_state(
        verifier,
        auth::auth_middleware,
    ));

    Router::new()
        .route("/", get(|| async { "pos-sales-api up" }))
        .nest("/api/v1", api)
        .merge(health::health_routes())
        .merge(openapi::swagger_ui())
        .layer(request_context::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            request_context::request_context_middleware,
        ))
        .with_state(state)
}
