//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::AppState;
use super::types::{CashFlowQuery, CashFlowRecord, ErrorResponse, ReportResponse};

/// Returns the configuration and the full report.
///
/// `GET /report` → 200 + `ReportResponse` JSON
pub async fn get_report(State(state): State<Arc<AppState>>) -> Json<ReportResponse> {
    Json(ReportResponse {
        config: state.config.clone(),
        report: state.report.clone(),
    })
}

/// Returns cash-flow rows, optionally filtered by year range.
///
/// `GET /cashflow` → 200 + `Vec<CashFlowRecord>` JSON
/// `GET /cashflow?from=N&to=M` → filtered range (inclusive)
/// `GET /cashflow?from=10&to=5` → 400 + `ErrorResponse`
pub async fn get_cashflow(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CashFlowQuery>,
) -> impl IntoResponse {
    let from = query.from.unwrap_or(0);
    let to = query.to.unwrap_or(u32::MAX);

    if from > to {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("`from` ({from}) must be <= `to` ({to})"),
            }),
        ));
    }

    let records: Vec<CashFlowRecord> = CashFlowRecord::from_series(&state.report.cashflow)
        .into_iter()
        .filter(|r| r.year >= from && r.year <= to)
        .collect();

    Ok(Json(records))
}
