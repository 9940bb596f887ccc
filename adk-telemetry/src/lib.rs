//! # adk-telemetry
//!
//! Tracing setup for ADK-Rust knowledge assistants.
//!
//! - [`init_telemetry`]: human-readable logs filtered by `RUST_LOG`
//! - [`init_json`]: one JSON object per line, for log shippers
//! - [`init_with_storage`]: human-readable logs plus in-memory span capture
//!   keyed by `request.id`, for inspecting per-request pipeline stages
//!
//! ```rust,ignore
//! let storage = Arc::new(adk_telemetry::SharedTraceStorage::new());
//! adk_telemetry::init_with_storage("kb-assistant", storage.clone())?;
//! ```

pub mod memory;

use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

pub use memory::{InMemoryTraceLayer, REQUEST_ID, SharedTraceStorage, SpanData};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a global subscriber writing human-readable logs.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_telemetry(service_name: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(false))
        .try_init()?;
    tracing::info!(service = service_name, "telemetry initialized");
    Ok(())
}

/// Install a global subscriber writing JSON lines.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_json(service_name: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json().with_current_span(true))
        .try_init()?;
    tracing::info!(service = service_name, "telemetry initialized");
    Ok(())
}

/// Install a global subscriber that logs and also captures spans in `storage`.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_with_storage(
    service_name: &str,
    storage: Arc<SharedTraceStorage>,
) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(false))
        .with(InMemoryTraceLayer::new(storage))
        .try_init()?;
    tracing::info!(service = service_name, "telemetry initialized with span capture");
    Ok(())
}
