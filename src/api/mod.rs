//! REST API serving a completed feasibility report.
//!
//! Provides two GET endpoints:
//! - `/report`: configuration and the full report
//! - `/cashflow`: yearly cash-flow rows with optional year-range filtering

mod handlers;
mod types;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tracing::info;

use crate::config::FeasibilityConfig;
use crate::runner::FeasibilityReport;

pub use types::{CashFlowQuery, CashFlowRecord, ErrorResponse, ReportResponse};

/// Immutable application state shared across all request handlers.
///
/// Constructed once after the analysis completes and wrapped in `Arc`; no
/// locks are needed since all data is read-only.
pub struct AppState {
    /// Configuration the report was computed from.
    pub config: FeasibilityConfig,
    pub report: FeasibilityReport,
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/report", get(handlers::get_report))
        .route("/cashflow", get(handlers::get_cashflow))
        .with_state(state)
}

/// Binds to the given address and serves the API until the server stops.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
