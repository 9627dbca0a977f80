use crate::errors::ApiError;
use crate::metrics::METRICS;
use crate::models::{ReviewWithdrawalRequest, RunSettlementRequest, RunSettlementResponse, WithdrawalRequest};
use crate::services::{AdminService, WithdrawalService};
use actix_web::{web, HttpResponse};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Health check endpoint
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "platform-api",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Manually trigger today's settlement run
pub async fn run_settlement(
    service: web::Data<Arc<AdminService>>,
    request: web::Json<RunSettlementRequest>,
) -> Result<HttpResponse, ApiError> {
    let report = service.run_settlement(request.force).await?;
    Ok(HttpResponse::Ok().json(RunSettlementResponse { report }))
}

/// Last settled date and next scheduled run
pub async fn settlement_status(
    service: web::Data<Arc<AdminService>>,
) -> Result<HttpResponse, ApiError> {
    let status = service.status().await?;
    Ok(HttpResponse::Ok().json(status))
}

/// Request a withdrawal
pub async fn request_withdrawal(
    service: web::Data<Arc<WithdrawalService>>,
    request: web::Json<WithdrawalRequest>,
) -> Result<HttpResponse, ApiError> {
    let response = service.request_withdrawal(request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Approve or reject a pending withdrawal
pub async fn review_withdrawal(
    service: web::Data<Arc<WithdrawalService>>,
    transaction_id: web::Path<Uuid>,
    request: web::Json<ReviewWithdrawalRequest>,
) -> Result<HttpResponse, ApiError> {
    let response = service
        .review_withdrawal(*transaction_id, request.action)
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Balance plus today's withdrawal headroom
pub async fn get_balance(
    service: web::Data<Arc<WithdrawalService>>,
    user_id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let response = service.balance(*user_id).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Prometheus metrics endpoint
pub async fn metrics_endpoint() -> HttpResponse {
    match METRICS.export() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "error": "Failed to gather metrics",
            "details": e.to_string()
        })),
    }
}

/// Configure routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/admin/settlement/run", web::post().to(run_settlement))
            .route("/admin/settlement/status", web::get().to(settlement_status))
            .route("/withdrawals", web::post().to(request_withdrawal))
            .route("/withdrawals/{id}/review", web::post().to(review_withdrawal))
            .route("/users/{id}/balance", web::get().to(get_balance)),
    )
    .route("/metrics", web::get().to(metrics_endpoint))
    .route("/health", web::get().to(health_check));
}
