//! CLI argument parsing
//!
//! Defines the command-line interface using clap. Flags given here override
//! the options file and the environment.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::OptionsFile;

/// Parallel Galen layout-test runner
#[derive(Parser, Debug)]
#[command(name = "galen-runner")]
#[command(version)]
#[command(about = "Run Galen layout tests in parallel and report the outcome")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run test files through the Galen runner
    Run(RunArgs),

    /// Check that the Galen runner is available
    Check(CheckArgs),

    /// Manage the options file
    Config(ConfigArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Test file glob patterns (default: `src` from the options file)
    pub patterns: Vec<String>,

    /// Options file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Target base URL
    #[arg(short, long)]
    pub url: Option<String>,

    /// Working directory for the runner and generated files
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Merge all test files into one suite
    #[arg(long)]
    pub concat: bool,

    /// Do not provision or load gl.js
    #[arg(long)]
    pub no_shim: bool,

    /// Print the full runner log before the summary
    #[arg(short, long)]
    pub output: bool,

    /// Ask the runner for an HTML report
    #[arg(long)]
    pub html_report: bool,

    /// HTML report directory
    #[arg(long, requires = "html_report")]
    pub html_report_dest: Option<String>,

    /// Cap on concurrent runner processes
    #[arg(short = 'j', long)]
    pub max_concurrent: Option<usize>,

    /// Per-process timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Runner program (default: galen)
    #[arg(long)]
    pub runner: Option<String>,

    /// Drop remote grid settings and size-less profiles
    #[arg(long)]
    pub skip_grid: bool,

    /// Report format (table, json, json-pretty, csv)
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Save the report to a file (.json or .csv)
    #[arg(long)]
    pub save: Option<PathBuf>,
}

impl RunArgs {
    /// Overlay command-line values onto raw options
    pub fn apply(&self, raw: &mut OptionsFile) {
        if !self.patterns.is_empty() {
            raw.src = self.patterns.clone();
        }
        if let Some(url) = &self.url {
            raw.url = Some(url.clone());
        }
        if let Some(cwd) = &self.cwd {
            raw.cwd = Some(cwd.clone());
        }
        if self.concat {
            raw.concat = Some(true);
        }
        if self.no_shim {
            raw.use_shim = Some(false);
        }
        if self.output {
            raw.output = Some(true);
        }
        if self.html_report {
            raw.html_report = Some(true);
        }
        if let Some(dest) = &self.html_report_dest {
            raw.html_report_dest = Some(dest.clone());
        }
        if let Some(max) = self.max_concurrent {
            raw.max_concurrent = Some(max);
        }
        if let Some(timeout) = self.timeout {
            raw.timeout_secs = Some(timeout);
        }
        if let Some(runner) = &self.runner {
            raw.runner = Some(runner.clone());
        }
        if self.skip_grid {
            raw.skip_grid = Some(true);
        }
    }
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Options file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Runner program (default: galen)
    #[arg(long)]
    pub runner: Option<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write an example options file
    Init {
        /// Output file path
        #[arg(short, long, default_value = "galen.yaml")]
        output: String,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the loaded options or the environment overrides
    Show {
        /// Show environment variables instead
        #[arg(short, long)]
        env: bool,

        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Validate an options file
    Validate {
        /// Options file (default: the first one found)
        file: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args() {
        let args = Args::parse_from([
            "galen-runner",
            "run",
            "test/*.test.js",
            "test/extra.js",
            "--concat",
            "--no-shim",
            "-j",
            "4",
            "--format",
            "json",
        ]);
        match args.command {
            Command::Run(run) => {
                assert_eq!(run.patterns, vec!["test/*.test.js", "test/extra.js"]);
                assert!(run.concat);
                assert!(run.no_shim);
                assert_eq!(run.max_concurrent, Some(4));
                assert_eq!(run.format, "json");
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_html_report_dest_requires_flag() {
        let result = Args::try_parse_from([
            "galen-runner",
            "run",
            "--html-report-dest",
            "out",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_verbose() {
        let args = Args::parse_from(["galen-runner", "check", "--verbose"]);
        assert!(args.verbose);
        assert!(matches!(args.command, Command::Check(_)));
    }

    #[test]
    fn test_apply_overrides_file() {
        let mut raw = OptionsFile {
            src: vec!["old/*.js".to_string()],
            url: Some("http://file".to_string()),
            concat: Some(false),
            ..Default::default()
        };

        let run = RunArgs {
            url: Some("http://cli".to_string()),
            concat: true,
            timeout: Some(60),
            ..Default::default()
        };
        run.apply(&mut raw);

        assert_eq!(raw.src, vec!["old/*.js"]);
        assert_eq!(raw.url.as_deref(), Some("http://cli"));
        assert_eq!(raw.concat, Some(true));
        assert_eq!(raw.timeout_secs, Some(60));
        assert_eq!(raw.use_shim, None);
    }

    #[test]
    fn test_config_args() {
        let args = Args::parse_from(["galen-runner", "config", "init", "--force"]);
        match args.command {
            Command::Config(ConfigArgs {
                action: ConfigAction::Init { output, force },
            }) => {
                assert_eq!(output, "galen.yaml");
                assert!(force);
            }
            _ => panic!("Expected Config init command"),
        }
    }
}
