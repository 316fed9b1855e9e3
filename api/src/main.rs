pub mod routes;
pub mod types;
pub mod warmup;

use log::{error, info};
use std::env;
use std::net::SocketAddr;
use ub_core::config::{resolve_log_file, resolve_log_level, BackendMode, Backends};
use ub_core::constants::USER_COUNT;
use ub_core::generate::generate_users;
use ub_core::loader::seed_backends;

fn resolve_api_bind_addr() -> String {
    env::var("API_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string())
}

fn resolve_api_port() -> u16 {
    env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3000)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let log_level = resolve_log_level();
    let log_file = resolve_log_file();
    ub_core::initialize_logger(log_level, log_file.as_deref())?;

    info!(
        "API starting (level={}, logfile={})",
        log_level,
        log_file.as_deref().unwrap_or("none")
    );

    let (mode, backends) = match Backends::from_env() {
        Ok(value) => value,
        Err(err) => {
            error!("Failed to configure backends: {err:#}");
            std::process::exit(1);
        }
    };

    if mode == BackendMode::Memory {
        // Nothing else fills in-memory backends, so give the routes data to scan.
        let users = generate_users(USER_COUNT);
        seed_backends(backends.tree.as_ref(), backends.table.as_ref(), &users).await?;
        info!("Seeded in-memory backends with {} users", users.len());
    }

    let app = routes::router(routes::AppState::new(&backends));

    let bind_address = format!("{}:{}", resolve_api_bind_addr(), resolve_api_port());
    let addr: SocketAddr = bind_address
        .parse()
        .map_err(|e| format!("Invalid bind address: {e}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running on port {}", addr.port());

    // Not awaited: the listener serves requests while the warm-up runs.
    let _warm_up = warmup::spawn_warm_up(backends.table.clone());

    axum::serve(listener, app).await?;

    info!("Server shutdown");
    Ok(())
}
