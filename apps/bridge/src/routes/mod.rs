use actix_web::web;

pub mod health;
pub mod status;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(health::configure_routes)
            .configure(status::configure_routes),
    );
}
