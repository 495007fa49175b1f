//! pv-feasibility entry point: CLI wiring and config-driven analysis.

mod cli;

use std::process;

use pv_feasibility::config::FeasibilityConfig;
use pv_feasibility::io::export::{export_cashflow_csv, export_monthly_csv};
use pv_feasibility::observability::init_tracing;
use pv_feasibility::runner::run_feasibility;

fn main() {
    init_tracing();

    let opts = match cli::parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("error: {e}");
            cli::print_usage();
            process::exit(2);
        }
    };

    // Load config: --scenario takes priority, then --preset
    let loaded = match (&opts.scenario, &opts.preset) {
        (Some(path), _) => FeasibilityConfig::from_toml_file(path),
        (None, Some(name)) => FeasibilityConfig::from_preset(name),
        (None, None) => Ok(FeasibilityConfig::demo()),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    // Apply overrides
    if let Some(pct) = opts.coverage_pct {
        config.sizing.coverage_target_pct = pct;
    }
    if let Some(pct) = opts.losses_pct {
        config.sizing.losses_pct = pct;
    }
    if let Some(rate) = opts.discount_rate {
        config.economics.discount_rate = rate;
    }
    if let Some(years) = opts.horizon_years {
        config.economics.horizon_years = years;
    }

    // Validate
    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let report = run_feasibility(&config).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });

    println!("{report}");

    if let Some(ref path) = opts.cashflow_out {
        if let Err(e) = export_cashflow_csv(&report.cashflow, path) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Cash flow written to {}", path.display());
    }
    if let Some(ref path) = opts.monthly_out {
        if let Err(e) = export_monthly_csv(&report.irradiance, &report.sizing, path) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Monthly profile written to {}", path.display());
    }

    if opts.serve {
        serve(config, report, opts.port);
    }
}

#[cfg(feature = "api")]
fn serve(config: FeasibilityConfig, report: pv_feasibility::runner::FeasibilityReport, port: u16) {
    use std::net::SocketAddr;
    use std::sync::Arc;

    let state = Arc::new(pv_feasibility::api::AppState { config, report });
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("error: failed to create tokio runtime: {e}");
        process::exit(1);
    });
    if let Err(e) = rt.block_on(pv_feasibility::api::serve(state, addr)) {
        eprintln!("error: API server failed: {e}");
        process::exit(1);
    }
}

#[cfg(not(feature = "api"))]
fn serve(
    _config: FeasibilityConfig,
    _report: pv_feasibility::runner::FeasibilityReport,
    _port: u16,
) {
    eprintln!("error: --serve requires building with `--features api`");
    process::exit(1);
}
