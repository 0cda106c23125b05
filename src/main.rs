#![allow(non_snake_case)]
use RustedCalc::Utils::logger::init_logger;
use RustedCalc::engine::calc_engine::CalcEngine;
use RustedCalc::engine::config::EngineConfig;
use RustedCalc::engine::operations::{Bounds, LimitInput};
use RustedCalc::engine::results::PlotRequest;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "RustedCalc",
    version = env!("CARGO_PKG_VERSION"),
    about = "Evaluate, integrate, solve and sample mathematical expressions",
    after_help = r#"
Examples:
  RustedCalc eval diff "x^2*sin(x)"
  RustedCalc eval definite_int "exp(-x)" x 0 oo
  RustedCalc eval solve "x^2 = 2*x"
  RustedCalc plot "sin(x)" --xmin -3.14 --xmax 3.14 --points 50
  RustedCalc --config calc.conf plot "x^2 + y^2" --ymin -1 --ymax 1 --ypoints 20

Results are printed as JSON on stdout; failures as {"ok": false, "error": ..., "status": ...}.
"#
)]
struct Cli {
    /// Configuration file (`key value` sections)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level, overrides the configuration file (debug, info, warn, error, off)
    #[arg(long)]
    log_level: Option<String>,

    /// Also write the log to log_<date>_<time>.txt
    #[arg(long)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply an operation to an expression
    Eval {
        /// simplify, diff, partial_diff, integrate, indefinite_int, definite_int,
        /// double_int, triple_int or solve
        operation: String,

        #[arg(allow_hyphen_values = true)]
        expression: String,

        /// Variable of the operation
        #[arg(default_value = "x")]
        variable: String,

        /// Lower bound: a number, `pi`, `e`, `oo` or an expression such as `1 - y`
        #[arg(allow_hyphen_values = true, requires = "upper")]
        lower: Option<String>,

        /// Upper bound, same forms as the lower one
        #[arg(allow_hyphen_values = true)]
        upper: Option<String>,
    },

    /// Sample an expression in x (and y) on a grid
    Plot {
        #[arg(allow_hyphen_values = true)]
        expression: String,

        #[arg(long, allow_negative_numbers = true, requires = "xmax")]
        xmin: Option<f64>,

        #[arg(long, allow_negative_numbers = true, requires = "xmin")]
        xmax: Option<f64>,

        /// Samples along x
        #[arg(long)]
        points: Option<usize>,

        #[arg(long, allow_negative_numbers = true, requires_all = ["ymax", "ypoints"])]
        ymin: Option<f64>,

        #[arg(long, allow_negative_numbers = true, requires = "ymin")]
        ymax: Option<f64>,

        /// Samples along y
        #[arg(long, requires = "ymin")]
        ypoints: Option<usize>,
    },
}

/// numbers stay numbers, anything else (`pi`, `-oo`, `1 - y`) is passed on as text
fn limit_input(arg: &str) -> LimitInput {
    match arg.trim().parse::<f64>() {
        Ok(value) => LimitInput::Number(value),
        Err(_) => LimitInput::Text(arg.to_string()),
    }
}

fn plot_request(
    x_range: Option<(f64, f64)>,
    points: Option<usize>,
    y_grid: Option<((f64, f64), usize)>,
) -> PlotRequest {
    let mut request = PlotRequest::default();
    if let Some(range) = x_range {
        request.x_range = range;
    }
    if let Some(points) = points {
        request.x_points = points;
    }
    if let Some((range, points)) = y_grid {
        request.y_range = Some(range);
        request.y_points = Some(points);
    }
    request
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("cannot serialize the result: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_error(message: String, status: u16) -> ExitCode {
    print_json(&json!({"ok": false, "error": message, "status": status}));
    ExitCode::FAILURE
}

fn run(cli: Cli) -> ExitCode {
    let config = match &cli.config {
        Some(path) => match EngineConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };
    // informational records would mix with the JSON on stdout
    let loglevel = cli
        .log_level
        .or_else(|| config.loglevel.clone())
        .unwrap_or_else(|| "warn".to_string());
    if let Err(e) = init_logger(Some(&loglevel), cli.log_file) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }
    let engine = CalcEngine::new(config);

    match cli.command {
        Command::Eval {
            operation,
            expression,
            variable,
            lower,
            upper,
        } => {
            let bounds = lower
                .zip(upper)
                .map(|(lower, upper)| Bounds::interval(limit_input(&lower), limit_input(&upper)));
            match engine.evaluate_text(&expression, &operation, &variable, bounds) {
                Ok(result) => print_json(&result),
                Err(e) => print_error(e.to_string(), e.status_hint()),
            }
        }
        Command::Plot {
            expression,
            xmin,
            xmax,
            points,
            ymin,
            ymax,
            ypoints,
        } => {
            let y_grid = ymin.zip(ymax).zip(ypoints);
            let request = plot_request(xmin.zip(xmax), points, y_grid);
            match engine.sample_text(&expression, &request) {
                Ok(grid) => print_json(&grid),
                Err(e) => print_error(e.to_string(), e.status_hint()),
            }
        }
    }
}

fn main() -> ExitCode {
    run(Cli::parse())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_arguments() {
        let cli = Cli::try_parse_from(["RustedCalc", "eval", "definite_int", "exp(-x)", "x", "0", "oo"]).unwrap();
        let Command::Eval { operation, variable, lower, upper, .. } = cli.command else {
            panic!("expected eval");
        };
        assert_eq!(operation, "definite_int");
        assert_eq!(variable, "x");
        assert_eq!(lower.as_deref(), Some("0"));
        assert_eq!(upper.as_deref(), Some("oo"));

        let cli = Cli::try_parse_from(["RustedCalc", "eval", "diff", "-x^2"]).unwrap();
        let Command::Eval { expression, variable, lower, .. } = cli.command else {
            panic!("expected eval");
        };
        assert_eq!(expression, "-x^2");
        assert_eq!(variable, "x");
        assert_eq!(lower, None);
    }

    #[test]
    fn test_eval_negative_bounds() {
        let cli = Cli::try_parse_from(["RustedCalc", "eval", "definite_int", "1/x", "x", "-2", "-1"]).unwrap();
        let Command::Eval { lower, upper, .. } = cli.command else {
            panic!("expected eval");
        };
        assert_eq!(lower.as_deref(), Some("-2"));
        assert_eq!(upper.as_deref(), Some("-1"));
        assert!(matches!(limit_input("-2"), LimitInput::Number(v) if v == -2.0));
        assert!(matches!(limit_input("-oo"), LimitInput::Text(ref t) if t == "-oo"));
    }

    #[test]
    fn test_lower_bound_needs_upper() {
        assert!(Cli::try_parse_from(["RustedCalc", "eval", "definite_int", "x", "x", "0"]).is_err());
        assert!(Cli::try_parse_from(["RustedCalc", "frobnicate", "x"]).is_err());
    }

    #[test]
    fn test_plot_arguments() {
        let cli = Cli::try_parse_from([
            "RustedCalc", "--config", "calc.conf", "plot", "x^2 + y", "--xmin", "-1", "--xmax", "1",
            "--points", "5", "--ymin", "0", "--ymax", "2", "--ypoints", "3",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("calc.conf")));
        let Command::Plot { xmin, xmax, points, ymin, ymax, ypoints, .. } = cli.command else {
            panic!("expected plot");
        };
        let request = plot_request(xmin.zip(xmax), points, ymin.zip(ymax).zip(ypoints));
        assert_eq!(request.x_range, (-1.0, 1.0));
        assert_eq!(request.x_points, 5);
        assert_eq!(request.y_range, Some((0.0, 2.0)));
        assert_eq!(request.y_points, Some(3));
    }

    #[test]
    fn test_plot_defaults() {
        let cli = Cli::try_parse_from(["RustedCalc", "plot", "sin(x)"]).unwrap();
        let Command::Plot { xmin, xmax, points, ymin, ymax, ypoints, .. } = cli.command else {
            panic!("expected plot");
        };
        let request = plot_request(xmin.zip(xmax), points, ymin.zip(ymax).zip(ypoints));
        assert_eq!(request, PlotRequest::default());
        // a y range needs both ends and a point count
        assert!(Cli::try_parse_from(["RustedCalc", "plot", "x*y", "--ymin", "0"]).is_err());
    }
}
