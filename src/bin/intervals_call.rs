//! intervals-call: run one operation against the Intervals.icu API and print
//! the normalized result as JSON.
//!
//! Usage:
//!   intervals-call [--config <file.yaml>] [--stats] <operation> [<params-json>]
//!   intervals-call list                      List routable operations
//!   intervals-call validate <op> [<json>]    Validate parameters without sending

use anyhow::{bail, Context, Result};
use intervals_dispatch::logging::init_tracing;
use intervals_dispatch::{DispatchConfig, Dispatcher, Operation, Validator};
use serde_json::Value;

struct Args {
    config: Option<String>,
    stats: bool,
    positional: Vec<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: None,
        stats: false,
        positional: Vec::new(),
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                args.config = Some(it.next().context("--config needs a file path")?);
            }
            "--stats" => args.stats = true,
            "help" | "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            _ => args.positional.push(arg),
        }
    }
    Ok(args)
}

fn print_usage() {
    println!(
        r#"intervals-call: dispatch one Intervals.icu operation

USAGE:
    intervals-call [--config <file>] [--stats] <operation> [<params-json>]
    intervals-call list
    intervals-call validate <operation> [<params-json>]

ENVIRONMENT:
    API_KEY / INTERVALS_API_KEY    API token
    ATHLETE_ID                     Default athlete id
    INTERVALS_API_BASE_URL         Override the API base URL
    RUST_LOG                       Log filter (default: info)"#
    );
}

fn load_config(path: Option<&str>) -> Result<DispatchConfig> {
    match path {
        Some(p) => DispatchConfig::from_yaml_file(p)
            .with_context(|| format!("failed to load config from {}", p)),
        None => Ok(DispatchConfig::from_env()),
    }
}

fn parse_params(raw: Option<&String>) -> Result<Value> {
    match raw {
        Some(s) => serde_json::from_str(s).context("params must be a JSON object"),
        None => Ok(Value::Null),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = parse_args()?;

    let Some(command) = args.positional.first() else {
        print_usage();
        std::process::exit(1);
    };

    match command.as_str() {
        "list" => {
            for op in Operation::ALL {
                let route = op.route();
                println!("{:<24} {:<6} {}", op.name(), route.method.as_str(), route.path);
            }
            Ok(())
        }
        "validate" => {
            let operation = args.positional.get(1).context("missing operation name")?;
            let params = parse_params(args.positional.get(2))?;
            let athlete = std::env::var("ATHLETE_ID").ok();
            match Validator::new(athlete).validate(operation, &params) {
                Ok(spec) => {
                    println!(
                        "{} {}{}",
                        spec.method,
                        spec.display_path(),
                        spec.body
                            .as_ref()
                            .map(|b| format!("\n{}", b))
                            .unwrap_or_default()
                    );
                    Ok(())
                }
                Err(e) => bail!(e),
            }
        }
        operation => {
            let config = load_config(args.config.as_deref())?;
            let dispatcher = Dispatcher::from_config(&config)?;
            let params = parse_params(args.positional.get(1))?;

            let spec = dispatcher.validator().validate(operation, &params)?;
            let (result, stats) = dispatcher.dispatch_with_stats(&spec).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if args.stats {
                eprintln!("{}", serde_json::to_string_pretty(&stats)?);
            }
            dispatcher.shutdown();

            if result.is_success() {
                Ok(())
            } else {
                std::process::exit(2);
            }
        }
    }
}
