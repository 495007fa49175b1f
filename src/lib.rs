//! Feasibility engine for grid-tied residential photovoltaic systems in Ecuador.
//!
//! The pipeline samples irradiance at a site, profiles a household's billing
//! history, sizes a PV array for a coverage target, projects yearly cash flows
//! and evaluates NPV, IRR and payback. [`runner::run_feasibility`] drives the
//! whole pipeline from a [`config::FeasibilityConfig`].

#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod consumption;
/// Sizing, cash-flow projection, coverage and financial indicators.
pub mod engine;
pub mod error;
pub mod io;
pub mod irradiance;
pub mod observability;
pub mod runner;

pub use error::{FeasibilityError, Result};

/// Days per billing month used to turn daily figures into monthly ones.
pub const DAYS_PER_MONTH: f64 = 30.0;
