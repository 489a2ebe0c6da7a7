use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use bridge::{routes, telemetry, AppState};
use store_infra::{bootstrap_store, DbEnv};
use tracing::{info, warn};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // A missing .env is fine; the runtime environment may set everything.
    let dotenv = dotenvy::dotenv();

    telemetry::init_tracing();

    if let Err(e) = &dotenv {
        if !e.not_found() {
            warn!(error = %e, "env_file=unreadable");
        }
    }

    let host = std::env::var("BRIDGE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("BRIDGE_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse::<u16>()
        .unwrap_or_else(|_| {
            eprintln!("❌ BRIDGE_PORT must be a valid port number");
            std::process::exit(1);
        });

    let env = match DbEnv::from_env() {
        Ok(env) => env,
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };
    let ready = match bootstrap_store(&env).await {
        Ok(ready) => ready,
        Err(e) => {
            eprintln!("❌ Session store unavailable: {e}");
            std::process::exit(1);
        }
    };

    let info = ready.status.connection_info();
    match ready.status.remote_failure() {
        Some(reason) => println!("⚠️  Using local session store ({reason})"),
        None => println!("✅ Session store connected ({})", ready.status.driver_kind()),
    }
    info!(connection = ?info, "store=active");

    let data = web::Data::new(AppState::from(ready));
    let db = data.db.clone();

    println!("🚀 Starting bridge on http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(data.clone())
            .configure(routes::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    if let Err(e) = db.close().await {
        warn!(error = %e, "store close returned error");
    }
    Ok(())
}
