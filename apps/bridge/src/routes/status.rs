use actix_web::{web, HttpResponse};

use crate::error::AppError;
use crate::state::AppState;

/// Redacted description of the active store, why a fallback happened (if it
/// did) and what reconciliation changed.
async fn db_status(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(app_state.status.snapshot()))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/db/status", web::get().to(db_status));
}
