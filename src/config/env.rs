//! Environment variable configuration
//!
//! Environment overrides are read once, before any runner process spawns.

use std::env;
use std::path::PathBuf;

use super::OptionsFile;

/// Environment variable prefix
const ENV_PREFIX: &str = "GALEN_RUNNER";

/// Configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Skip remote/grid profiles, from GALEN_RUNNER_SKIP_GRID
    pub skip_grid: Option<bool>,
    /// Runner program, from GALEN_RUNNER_RUNNER
    pub runner: Option<String>,
    /// Concurrency cap, from GALEN_RUNNER_MAX_CONCURRENT
    pub max_concurrent: Option<usize>,
    /// Per-process timeout, from GALEN_RUNNER_TIMEOUT
    pub timeout: Option<u64>,
    /// Verbose logging, from GALEN_RUNNER_VERBOSE
    pub verbose: Option<bool>,
    /// Options file, from GALEN_RUNNER_CONFIG
    pub config_file: Option<String>,
    /// Working directory, from GALEN_RUNNER_CWD
    pub cwd: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            skip_grid: get_env_bool("SKIP_GRID"),
            runner: get_env("RUNNER"),
            max_concurrent: get_env_parse("MAX_CONCURRENT"),
            timeout: get_env_parse("TIMEOUT"),
            verbose: get_env_bool("VERBOSE"),
            config_file: get_env("CONFIG"),
            cwd: get_env("CWD"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.skip_grid.is_some()
            || self.runner.is_some()
            || self.max_concurrent.is_some()
            || self.timeout.is_some()
            || self.verbose.is_some()
            || self.config_file.is_some()
            || self.cwd.is_some()
    }

    /// Overlay environment values onto raw options
    pub fn apply(&self, raw: &mut OptionsFile) {
        if let Some(skip) = self.skip_grid {
            raw.skip_grid = Some(skip);
        }
        if let Some(runner) = &self.runner {
            raw.runner = Some(runner.clone());
        }
        if let Some(max) = self.max_concurrent {
            raw.max_concurrent = Some(max);
        }
        if let Some(timeout) = self.timeout {
            raw.timeout_secs = Some(timeout);
        }
        if let Some(cwd) = &self.cwd {
            raw.cwd = Some(PathBuf::from(cwd));
        }
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_SKIP_GRID:      {:?}", ENV_PREFIX, self.skip_grid);
        println!("  {}_RUNNER:         {:?}", ENV_PREFIX, self.runner);
        println!("  {}_MAX_CONCURRENT: {:?}", ENV_PREFIX, self.max_concurrent);
        println!("  {}_TIMEOUT:        {:?}", ENV_PREFIX, self.timeout);
        println!("  {}_VERBOSE:        {:?}", ENV_PREFIX, self.verbose);
        println!("  {}_CONFIG:         {:?}", ENV_PREFIX, self.config_file);
        println!("  {}_CWD:            {:?}", ENV_PREFIX, self.cwd);
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| parse_bool(&v))
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on" | "enabled"
    )
}

/// Print all GALEN_RUNNER environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_SKIP_GRID       Skip remote/grid device profiles (true/false)");
    println!("  {ENV_PREFIX}_RUNNER          Runner program (default: galen)");
    println!("  {ENV_PREFIX}_MAX_CONCURRENT  Cap on concurrent runner processes");
    println!("  {ENV_PREFIX}_TIMEOUT         Per-process timeout in seconds");
    println!("  {ENV_PREFIX}_VERBOSE         Enable debug logging (true/false)");
    println!("  {ENV_PREFIX}_CONFIG          Path to options file");
    println!("  {ENV_PREFIX}_CWD             Working directory");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_SKIP_GRID=1");
    println!("  galen-runner run 'test/**/*.test.js'");
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sets variables and restores them on drop
    struct EnvGuard {
        previous: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn set(vars: &[(&str, &str)]) -> Self {
            let previous = vars
                .iter()
                .map(|(k, _)| {
                    let key = format!("{ENV_PREFIX}_{k}");
                    let old = env::var(&key).ok();
                    (key, old)
                })
                .collect();
            for (k, v) in vars {
                env::set_var(format!("{ENV_PREFIX}_{k}"), v);
            }
            Self { previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in &self.previous {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }

    #[test]
    fn test_env_config_default() {
        let config = EnvConfig::default();
        assert!(!config.has_any());
        assert!(config.skip_grid.is_none());
    }

    #[test]
    fn test_env_load_and_apply() {
        let _guard = EnvGuard::set(&[("SKIP_GRID", "yes"), ("TIMEOUT", "90")]);

        let config = EnvConfig::load();
        assert_eq!(config.skip_grid, Some(true));
        assert_eq!(config.timeout, Some(90));
        assert!(config.has_any());

        let mut raw = OptionsFile::default();
        config.apply(&mut raw);
        assert_eq!(raw.skip_grid, Some(true));
        assert_eq!(raw.timeout_secs, Some(90));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("1"));
        assert!(parse_bool("TRUE"));
        assert!(parse_bool(" on "));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("nope"));
    }
}
