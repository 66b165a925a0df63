//! batching-config: checks gateway batching configuration files.
//!
//! Usage:
//!   batching-config validate <file> [--strict]   Validate and report clamped options
//!   batching-config resolve <file> [--strict]    Print resolved per-upstream batching config as JSON

use anyhow::{bail, Context};
use serde_json::json;
use subgraph_batching::config::{resolve_config_with_report, GatewayConfig};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let outcome = match args[1].as_str() {
        "validate" => cmd_validate(&args[2..]),
        "resolve" => cmd_resolve(&args[2..]),
        "version" | "--version" | "-V" => {
            println!("batching-config {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = outcome {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"batching-config: gateway batching configuration checker

USAGE:
    batching-config <COMMAND> <FILE> [--strict]

COMMANDS:
    validate    Validate the file and list every clamped option
    resolve     Print the resolved batching configuration per upstream
    version     Print version
    help        Print this message

OPTIONS:
    --strict    Treat out-of-range batching options as errors"#
    );
}

fn load(args: &[String]) -> anyhow::Result<GatewayConfig> {
    let Some(path) = args.iter().find(|a| !a.starts_with("--")) else {
        bail!("missing configuration file argument");
    };
    let mut config =
        GatewayConfig::from_file(path).with_context(|| format!("loading {}", path))?;
    if args.iter().any(|a| a == "--strict") {
        config.strict_batching = true;
    }
    Ok(config)
}

fn cmd_validate(args: &[String]) -> anyhow::Result<()> {
    let config = load(args)?;
    let mut failures = 0;

    for upstream in &config.upstreams {
        let Some(options) = upstream.batching.as_ref() else {
            println!("{}: unbatched", upstream.name);
            continue;
        };
        let (_, adjustments) = resolve_config_with_report(options);
        match config.resolve_batching(upstream) {
            Ok(_) if adjustments.is_empty() => println!("{}: ok", upstream.name),
            Ok(_) => {
                println!("{}: ok with adjustments", upstream.name);
                for adj in &adjustments {
                    println!("    {}", adj);
                }
            }
            Err(e) => {
                failures += 1;
                println!("{}: {}", upstream.name, e);
            }
        }
        if options.strategy.requires_opt_in() {
            println!("    note: indiscriminate batching mixes callers' headers in one upstream call");
        }
    }

    if failures > 0 {
        bail!("{} upstream(s) failed validation", failures);
    }
    Ok(())
}

fn cmd_resolve(args: &[String]) -> anyhow::Result<()> {
    let config = load(args)?;
    let mut upstreams = Vec::with_capacity(config.upstreams.len());
    for upstream in &config.upstreams {
        let resolved = config.resolve_batching(upstream)?;
        let adjustments = upstream
            .batching
            .as_ref()
            .map(|o| resolve_config_with_report(o).1)
            .unwrap_or_default();
        upstreams.push(json!({
            "name": upstream.name,
            "url": upstream.url,
            "timeout_ms": upstream.timeout_ms,
            "batching": resolved,
            "adjustments": adjustments,
        }));
    }
    let out = json!({
        "deadline_padding_ms": config.deadline_padding_ms,
        "strict_batching": config.strict_batching,
        "upstreams": upstreams,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
