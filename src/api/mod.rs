use std::sync::Arc;

use actix_web::{web, App, HttpResponse, HttpServer, Responder, ResponseError};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;

use crate::config::Config;
use crate::domain::order::{OrderError, OrderOrchestrator};
use crate::metrics::Metrics;
use crate::models::RequestedItem;

// ============================================================================
// HTTP Surface
// ============================================================================
//
// Thin JSON handlers over the orchestrator plus the /health and /metrics
// endpoints. No business logic lives here; handlers translate requests and
// map the order error taxonomy onto HTTP statuses.
//
// ============================================================================

pub struct AppState {
    pub orchestrator: Arc<OrderOrchestrator>,
    pub metrics: Arc<Metrics>,
}

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub account_id: String,
    pub products: Vec<RequestedItem>,
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] OrderError);

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        tracing::debug!(kind = self.0.kind(), error = %self.0, "request failed");
        match &self.0 {
            OrderError::AccountNotFound(id) => HttpResponse::NotFound()
                .json(serde_json::json!({"error": format!("account not found: {}", id)})),
            OrderError::CatalogUnavailable(_) => HttpResponse::ServiceUnavailable()
                .json(serde_json::json!({"error": "catalog unavailable, retry later"})),
            OrderError::PersistenceFailed(_) => HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": "order was not committed"})),
            OrderError::ReconstructionInconsistency(_) => HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": "internal inconsistency"})),
        }
    }
}

async fn place_order(
    state: web::Data<AppState>,
    request: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = request.into_inner();
    let order = state
        .orchestrator
        .place_order(&request.account_id, request.products)
        .await?;
    Ok(HttpResponse::Created().json(order))
}

async fn list_orders(
    state: web::Data<AppState>,
    account_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let orders = state
        .orchestrator
        .list_orders_for_account(&account_id)
        .await?;
    Ok(HttpResponse::Ok().json(orders))
}

async fn metrics_handler(state: web::Data<AppState>) -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics.registry().gather();

    let mut buffer = Vec::new();
    if let Err(error) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %error, "failed to encode metrics");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

async fn health_handler() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "order-service"
    }))
}

/// Serve the order API until shutdown.
pub async fn run_server(config: &Config, state: AppState) -> std::io::Result<()> {
    let data = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .route("/orders", web::post().to(place_order))
            .route("/accounts/{account_id}/orders", web::get().to(list_orders))
            .route("/metrics", web::get().to(metrics_handler))
            .route("/health", web::get().to(health_handler))
    })
    .bind((config.bind_addr.as_str(), config.bind_port))?
    .run()
    .await
}
