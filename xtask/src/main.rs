//! xtask - Test automation for the Tactility concurrency core
//!
//! Usage:
//!   cargo xtask test      # Unit, integration and doc tests
//!   cargo xtask stress    # Release-mode tests with more iterations
//!   cargo xtask help      # Show this help
//!
//! The stress run passes `TACTILITY_STRESS_ITERATIONS` to the test binaries;
//! the multi-producer tests scale their loops by it.

use anyhow::{bail, Context, Result};
use std::process::Command;

/// Environment variable read by the stress tests.
const STRESS_ENV: &str = "TACTILITY_STRESS_ITERATIONS";

/// Iterations per producer when `STRESS_ITERATIONS` is unset.
const DEFAULT_STRESS_ITERATIONS: u32 = 20_000;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(|s| s.as_str()).unwrap_or("help");

    match cmd {
        "test" => host_test()?,
        "stress" => stress_test()?,
        "help" | "--help" | "-h" => print_help(),
        _ => {
            log::error!("Unknown command: {}", cmd);
            print_help();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_help() {
    eprintln!(
        r#"xtask - Tactility core test automation

USAGE:
    cargo xtask <command>

COMMANDS:
    test     Run unit, integration and doc tests (including compile-fail doctests)
    stress   Run the test suite in release mode with raised iteration counts
    help     Show this help

ENVIRONMENT:
    STRESS_ITERATIONS   Iterations per producer for `stress` (default: {DEFAULT_STRESS_ITERATIONS})
    RUST_LOG            xtask log filter (default: info)

EXAMPLES:
    cargo xtask test
    STRESS_ITERATIONS=100000 cargo xtask stress
"#
    );
}

/// Run `cargo` with `args` and fail when it does not succeed.
fn cargo(args: &[&str], envs: &[(&str, String)]) -> Result<()> {
    log::debug!("cargo {}", args.join(" "));
    let status = Command::new(std::env::var("CARGO").unwrap_or_else(|_| "cargo".into()))
        .args(args)
        .envs(envs.iter().map(|(key, value)| (*key, value.as_str())))
        .status()
        .context("Failed to run cargo")?;

    if !status.success() {
        bail!("cargo {} failed with status: {}", args.join(" "), status);
    }
    Ok(())
}

/// Run the whole test suite on the host.
fn host_test() -> Result<()> {
    log::info!("Running host tests...");
    cargo(&["test", "-p", "tactility-core"], &[])?;
    log::info!("Host tests PASSED");
    Ok(())
}

/// Run the tests in release mode with the stress iteration count raised.
fn stress_test() -> Result<()> {
    let iterations = match std::env::var("STRESS_ITERATIONS") {
        Ok(value) => value
            .parse::<u32>()
            .with_context(|| format!("STRESS_ITERATIONS is not a number: {value}"))?,
        Err(_) => DEFAULT_STRESS_ITERATIONS,
    };
    log::info!("Running stress tests ({} iterations per producer)...", iterations);

    cargo(
        &["test", "--release", "-p", "tactility-core", "--tests"],
        &[(STRESS_ENV, iterations.to_string())],
    )?;

    log::info!("Stress tests PASSED");
    Ok(())
}
