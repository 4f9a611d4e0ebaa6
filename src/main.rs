//! galen-runner - parallel Galen layout-test runner
//!
//! Resolves test files, provisions the `gl.js` shim and its configuration,
//! spawns one Galen process per test file (or per merged suite) and turns
//! their combined output into a pass/fail verdict.
//!
//! ## Usage
//!
//! ```bash
//! # Run every test file with the options in ./galen.yaml
//! galen-runner run
//!
//! # Run selected files against a local server, merged into one process
//! galen-runner run 'test/**/*.test.js' --url http://127.0.0.1:3000 --concat
//!
//! # Check the runner installation
//! galen-runner check
//!
//! # Write an example options file
//! galen-runner config init
//! ```

use anyhow::{bail, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, info};

mod artifact;
mod classify;
mod cli;
mod config;
mod error;
mod executor;
mod finalize;
mod models;
mod output;
mod pipeline;
mod runner;
mod suite;
mod utils;

use cli::Args;
use config::{EnvConfig, OptionsFile, RunOptions, DEFAULT_FALLBACK};
use error::PipelineError;
use output::{OutputFormat, ReportFormatter};
use pipeline::Pipeline;
use runner::{RunnerResolver, RunnerStatus};
use utils::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let env = EnvConfig::load();

    let level = LogLevel::from_str(&args.log_level)
        .unwrap_or(LogLevel::Info)
        .or_verbose(args.verbose || env.verbose.unwrap_or(false));
    init_logger(level);

    match args.command {
        cli::Command::Run(run_args) => run_tests(run_args, &env).await,
        cli::Command::Check(check_args) => check_runner(check_args, &env).await,
        cli::Command::Config(config_args) => {
            manage_config(config_args, &env)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// `--config`, then `GALEN_RUNNER_CONFIG`, then the standard locations
fn load_options(config: Option<&Path>, env: &EnvConfig) -> Result<OptionsFile> {
    let path = config
        .map(Path::to_path_buf)
        .or_else(|| env.config_file.as_ref().map(PathBuf::from))
        .or_else(OptionsFile::find);

    match path {
        Some(path) => {
            info!("Loading options from {}", path.display());
            OptionsFile::load(&path)
        }
        None => {
            debug!("No options file found, using command-line values only");
            Ok(OptionsFile::default())
        }
    }
}

async fn run_tests(args: cli::RunArgs, env: &EnvConfig) -> Result<ExitCode> {
    let format = OutputFormat::from_str(&args.format)
        .ok_or_else(|| anyhow::anyhow!("Unknown format: {}", args.format))?;

    let mut raw = load_options(args.config.as_deref(), env)?;
    if env.has_any() {
        debug!("Environment overrides: {:?}", env);
    }
    env.apply(&mut raw);
    args.apply(&mut raw);

    let patterns = raw.src.clone();
    let options = RunOptions::from_file(raw)?;
    let units = suite::resolve_suite(&options.cwd, &patterns)?;

    info!(
        "Testing {} file(s) against {} on {} device(s)",
        units.len(),
        options.url,
        options.devices.len()
    );
    for device in options.devices.values() {
        match device.viewport() {
            Some((width, height)) => {
                debug!("Device {}: {} {}x{}", device.name, device.browser, width, height)
            }
            None => debug!("Device {}: {} on the grid", device.name, device.browser),
        }
    }

    let mut formatter = ReportFormatter::new(format);
    let mut stdout = std::io::stdout();
    if !stdout.is_terminal() {
        formatter = formatter.no_color();
    }

    let (report, verdict) = Pipeline::new(options)
        .execute(units, &formatter, &mut stdout)
        .await
        .inspect_err(|e| {
            if let Some(err) = e.downcast_ref::<PipelineError>() {
                if err.is_pre_spawn() {
                    error!("Aborted before any runner process started");
                }
            }
        })?;

    if let Some(path) = &args.save {
        output::export(&report, path)?;
    }

    Ok(finalize::exit_code(verdict))
}

async fn check_runner(args: cli::CheckArgs, env: &EnvConfig) -> Result<ExitCode> {
    let mut raw = load_options(args.config.as_deref(), env)?;
    env.apply(&mut raw);
    if let Some(runner) = args.runner {
        raw.runner = Some(runner);
    }

    let program = raw.runner.unwrap_or_else(|| "galen".to_string());
    let fallback = raw
        .fallback
        .unwrap_or_else(|| DEFAULT_FALLBACK.iter().map(|s| s.to_string()).collect());

    let fallback_prefix = fallback.join(" ");

    let cwd = raw.cwd.unwrap_or_else(|| PathBuf::from("."));
    let mut resolver = RunnerResolver::new(&program, fallback).cwd(cwd);
    if let Some(version) = raw.runner_version {
        resolver = resolver.required_version(version);
    }

    let status = resolver.check().await;
    match &status {
        RunnerStatus::Available { version } => {
            println!("✓ {program}: {} ({version})", status.as_str());
        }
        RunnerStatus::Missing(reason) => {
            println!("✗ {program}: {}", status.as_str());
            println!("  {reason}");
        }
        RunnerStatus::VersionMismatch { expected, found } => {
            println!("✗ {program}: {}", status.as_str());
            println!("  expected {expected}, found '{found}'");
        }
    }

    if status.is_available() {
        return Ok(ExitCode::SUCCESS);
    }

    println!("  runs would use the fallback: {fallback_prefix}");
    Ok(ExitCode::FAILURE)
}

fn manage_config(args: cli::ConfigArgs, env: &EnvConfig) -> Result<()> {
    match args.action {
        cli::ConfigAction::Init { output, force } => {
            let path = Path::new(&output);
            if path.exists() && !force {
                bail!("Options file already exists: {output}. Use --force to overwrite.");
            }

            OptionsFile::example().save(path)?;
            println!("✓ Options file created: {output}");
            println!("\nEdit the devices and url, then run: galen-runner run");
        }

        cli::ConfigAction::Show { env: show_env, format } => {
            if show_env {
                env.print_summary();
                println!();
                config::print_env_help();
            } else {
                let options = OptionsFile::load_default()?;
                let output = if format == "json" {
                    serde_json::to_string_pretty(&options)?
                } else {
                    serde_yaml::to_string(&options)?
                };
                println!("{output}");
            }
        }

        cli::ConfigAction::Validate { file } => {
            let path = file
                .map(PathBuf::from)
                .or_else(OptionsFile::find)
                .unwrap_or_else(|| PathBuf::from("./galen.yaml"));

            let checked = OptionsFile::load(&path)
                .and_then(|raw| RunOptions::from_file(raw).map_err(anyhow::Error::from));
            match checked {
                Ok(options) => {
                    println!("✓ Options file is valid: {}", path.display());
                    println!(
                        "  {} device(s), url {}",
                        options.devices.len(),
                        options.url
                    );
                }
                Err(e) => {
                    println!("✗ Options file is invalid: {}", path.display());
                    println!("  Error: {e:#}");
                    return Err(e);
                }
            }
        }
    }

    Ok(())
}
