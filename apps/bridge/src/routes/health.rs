use actix_web::{web, HttpResponse};
use serde::Serialize;
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    backend: &'static str,
}

async fn health(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    if let Err(e) = app_state.db.ping().await {
        warn!(error = %e, "health=db_unreachable");
        return Err(AppError::db_unavailable(format!("store ping failed: {e}")));
    }

    Ok(HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        backend: app_state.status.driver_kind().as_str(),
    }))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health));
}
