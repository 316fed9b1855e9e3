//! Seeding tool: generate synthetic users and write them to both backends.
//!
//! Usage:
//!   cargo run -p seeder --release
//!
//! Backends come from the environment (a `.env` file is honoured):
//! `FIREBASE_DATABASE_URL`, `FIREBASE_SERVICE_ACCOUNT`, `SUPABASE_URL`,
//! `SUPABASE_KEY`. Set `USERBENCH_BACKEND=memory` for a dry run that never
//! leaves the process.
//!
//! Firebase is loaded in full before Supabase starts. Running the tool twice
//! overwrites the Firebase children but appends a second copy of every row to
//! Supabase.

use anyhow::Result;
use log::{error, info};
use std::time::Instant;
use ub_core::config::{resolve_log_file, resolve_log_level, Backends};
use ub_core::constants::USER_COUNT;
use ub_core::generate::generate_users;
use ub_core::loader::seed_backends;

async fn generate_and_write(backends: &Backends) -> Result<()> {
    info!("Starting data generation and writing process...");

    let start = Instant::now();
    let users = generate_users(USER_COUNT);
    info!(
        "Generated {} users in {}ms",
        users.len(),
        start.elapsed().as_millis()
    );

    let (tree, table) =
        seed_backends(backends.tree.as_ref(), backends.table.as_ref(), &users).await?;
    info!(
        "Firebase: {} records in {} chunks; Supabase: {} records in {} chunks",
        tree.records, tree.chunks, table.records, table.chunks
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let log_level = resolve_log_level();
    let log_file = resolve_log_file();
    if let Err(err) = ub_core::initialize_logger(log_level, log_file.as_deref()) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }

    let (mode, backends) = match Backends::from_env() {
        Ok(value) => value,
        Err(err) => {
            error!("Failed to configure backends: {err:#}");
            std::process::exit(1);
        }
    };
    info!("Seeding {:?} backends", mode);

    let start = Instant::now();
    let outcome = generate_and_write(&backends).await;

    match &outcome {
        Ok(()) => info!(
            "Data generation and writing process completed successfully. ({}ms)",
            start.elapsed().as_millis()
        ),
        Err(err) => error!("Error during data generation and writing: {err:#}"),
    }

    backends.tree.release().await;

    if outcome.is_err() {
        std::process::exit(1);
    }
}
