use std::env;
use std::path::PathBuf;

/// Default port of the `--serve` API.
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug)]
pub struct CliOptions {
    pub scenario: Option<PathBuf>,
    pub preset: Option<String>,
    /// Coverage target override (percent).
    pub coverage_pct: Option<f64>,
    /// Losses override (percent).
    pub losses_pct: Option<f64>,
    pub discount_rate: Option<f64>,
    pub horizon_years: Option<u32>,
    pub cashflow_out: Option<PathBuf>,
    pub monthly_out: Option<PathBuf>,
    pub serve: bool,
    pub port: u16,
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(args)
}

fn parse_args_from(args: Vec<String>) -> Result<CliOptions, String> {
    if args.len() == 1 && (args[0] == "--help" || args[0] == "-h") {
        print_usage();
        std::process::exit(0);
    }
    parse_options(&args)
}

fn parse_options(args: &[String]) -> Result<CliOptions, String> {
    let mut i = 0usize;
    let mut opts = CliOptions {
        scenario: None,
        preset: None,
        coverage_pct: None,
        losses_pct: None,
        discount_rate: None,
        horizon_years: None,
        cashflow_out: None,
        monthly_out: None,
        serve: false,
        port: DEFAULT_PORT,
    };

    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--scenario" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --scenario (expected a TOML file path)",
                )?;
                if opts.scenario.replace(PathBuf::from(path)).is_some() {
                    return Err("--scenario provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name =
                    args.next_or_err(i, "missing value for --preset (expected a preset name)")?;
                if opts.preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--coverage" => {
                i += 1;
                opts.coverage_pct = Some(parse_value(args, i, flag, "a percentage")?);
            }
            "--losses" => {
                i += 1;
                opts.losses_pct = Some(parse_value(args, i, flag, "a percentage")?);
            }
            "--discount-rate" => {
                i += 1;
                opts.discount_rate = Some(parse_value(args, i, flag, "a rate such as 0.08")?);
            }
            "--horizon" => {
                i += 1;
                opts.horizon_years = Some(parse_value(args, i, flag, "a number of years")?);
            }
            "--cashflow-out" => {
                i += 1;
                let path =
                    args.next_or_err(i, "missing value for --cashflow-out (expected a file path)")?;
                if opts.cashflow_out.replace(PathBuf::from(path)).is_some() {
                    return Err("--cashflow-out provided more than once".to_string());
                }
            }
            "--monthly-out" => {
                i += 1;
                let path =
                    args.next_or_err(i, "missing value for --monthly-out (expected a file path)")?;
                if opts.monthly_out.replace(PathBuf::from(path)).is_some() {
                    return Err("--monthly-out provided more than once".to_string());
                }
            }
            "--serve" => opts.serve = true,
            "--port" => {
                i += 1;
                opts.port = parse_value(args, i, flag, "a u16 port")?;
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if opts.scenario.is_some() && opts.preset.is_some() {
        return Err(
            "arguments `--scenario` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
        );
    }

    if opts.scenario.is_none() && opts.preset.is_none() {
        opts.preset = Some("demo".to_string());
    }

    Ok(opts)
}

fn parse_value<T: std::str::FromStr>(
    args: &[String],
    index: usize,
    flag: &str,
    expected: &str,
) -> Result<T, String> {
    let raw = args.next_or_err(index, &format!("missing value for {flag} (expected {expected})"))?;
    raw.parse()
        .map_err(|_| format!("{flag} value \"{raw}\" is not {expected}"))
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("pv-feasibility: grid-tied PV sizing and investment analysis");
    eprintln!();
    eprintln!("Usage: pv-feasibility [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load configuration from a TOML file");
    eprintln!("  --preset <name>          Use a built-in preset (demo, appliances)");
    eprintln!("  --coverage <pct>         Override the coverage target (0-100)");
    eprintln!("  --losses <pct>           Override the system losses (0-100)");
    eprintln!("  --discount-rate <r>      Override the discount rate (e.g. 0.08)");
    eprintln!("  --horizon <years>        Override the financial horizon");
    eprintln!("  --cashflow-out <path>    Export the yearly cash flow to CSV");
    eprintln!("  --monthly-out <path>     Export the monthly production profile to CSV");
    eprintln!("  --serve                  Serve the report over HTTP (feature `api`)");
    eprintln!("  --port <u16>             API server port (default: {DEFAULT_PORT})");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the demo preset is used.");
}
