//! Environment-driven configuration shared by the seeder and the server.

use anyhow::{Context, Result};
use log::LevelFilter;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use crate::backends::firebase::FirebaseClient;
use crate::backends::memory::{MemoryTable, MemoryTree};
use crate::backends::supabase::SupabaseClient;
use crate::backends::{RelationalBackend, TreeBackend};

pub fn parse_log_level(value: &str) -> Option<LevelFilter> {
    match value.to_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

pub fn resolve_log_level() -> LevelFilter {
    env::var("USERBENCH_LOG_LEVEL")
        .ok()
        .as_deref()
        .and_then(parse_log_level)
        .unwrap_or(LevelFilter::Info)
}

fn parse_log_file(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn resolve_log_file() -> Option<String> {
    env::var("USERBENCH_LOG_FILE")
        .ok()
        .as_deref()
        .and_then(parse_log_file)
}

fn required(name: &str) -> Result<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .with_context(|| format!("Environment variable {name} is not set"))
}

/// Which pair of backends the binaries talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// Firebase and Supabase over the network.
    Remote,
    /// In-process backends; nothing leaves the process.
    Memory,
}

impl BackendMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "remote" => Some(BackendMode::Remote),
            "memory" => Some(BackendMode::Memory),
            _ => None,
        }
    }
}

pub fn resolve_backend_mode() -> Result<BackendMode> {
    match env::var("USERBENCH_BACKEND") {
        Ok(value) => BackendMode::parse(&value)
            .with_context(|| format!("Unknown USERBENCH_BACKEND value: {value}")),
        Err(_) => Ok(BackendMode::Remote),
    }
}

/// Connection parameters for the relational backend.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub key: String,
}

impl SupabaseConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            url: required("SUPABASE_URL")?,
            key: required("SUPABASE_KEY")?,
        })
    }
}

/// Connection parameters for the tree backend.
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub database_url: String,
    pub service_account_path: PathBuf,
}

impl FirebaseConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: required("FIREBASE_DATABASE_URL")?,
            service_account_path: env::var("FIREBASE_SERVICE_ACCOUNT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("service-account-key.json")),
        })
    }
}

/// Backend handles built once at startup and shared with whoever needs them.
#[derive(Clone)]
pub struct Backends {
    pub tree: Arc<dyn TreeBackend>,
    pub table: Arc<dyn RelationalBackend>,
}

impl Backends {
    pub fn in_memory() -> Self {
        Self {
            tree: Arc::new(MemoryTree::new()),
            table: Arc::new(MemoryTable::new()),
        }
    }

    pub fn remote(firebase: &FirebaseConfig, supabase: &SupabaseConfig) -> Result<Self> {
        let tree = FirebaseClient::from_key_file(
            &firebase.database_url,
            &firebase.service_account_path,
        )?;
        let table = SupabaseClient::new(&supabase.url, &supabase.key)?;
        Ok(Self {
            tree: Arc::new(tree),
            table: Arc::new(table),
        })
    }

    /// Builds the backends selected by `USERBENCH_BACKEND`.
    pub fn from_env() -> Result<(BackendMode, Self)> {
        let mode = resolve_backend_mode()?;
        let backends = match mode {
            BackendMode::Memory => Self::in_memory(),
            BackendMode::Remote => {
                Self::remote(&FirebaseConfig::from_env()?, &SupabaseConfig::from_env()?)?
            }
        };
        Ok((mode, backends))
    }
}
