// Ledger configuration
//
// Loaded from a TOML file (`PARISH_LEDGER_CONFIG`, default
// `parish-ledger.toml`). A missing file means defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "PARISH_LEDGER_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "parish-ledger.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub receipt: ReceiptConfig,
}

/// Mock API behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Lower bound of simulated network latency
    #[serde(default = "default_latency_min")]
    pub latency_min_ms: u64,

    /// Upper bound of simulated network latency
    #[serde(default = "default_latency_max")]
    pub latency_max_ms: u64,

    /// Start with demo records
    #[serde(default = "default_true")]
    pub seed: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            latency_min_ms: default_latency_min(),
            latency_max_ms: default_latency_max(),
            seed: true,
        }
    }
}

impl ApiConfig {
    pub fn latency(&self) -> Latency {
        Latency::between(self.latency_min_ms, self.latency_max_ms)
    }
}

fn default_latency_min() -> u64 { 300 }
fn default_latency_max() -> u64 { 800 }
fn default_true() -> bool { true }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// SQLite file holding the persisted auth slice
    #[serde(default = "default_session_path")]
    pub path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { path: default_session_path() }
    }
}

fn default_session_path() -> PathBuf {
    PathBuf::from("ledger-session.db")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { addr: default_addr() }
    }
}

fn default_addr() -> String {
    "0.0.0.0:3000".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptConfig {
    /// Where saved (and fallback) receipts are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self { output_dir: default_output_dir() }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Config {
    /// Load from the file named by `PARISH_LEDGER_CONFIG`, or defaults
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        Ok(config)
    }
}

// ============================================================================
// LATENCY
// ============================================================================

/// Simulated network delay, drawn uniformly from [min, max]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Latency {
    min: Duration,
    max: Duration,
}

impl Latency {
    pub fn between(min_ms: u64, max_ms: u64) -> Self {
        let (lo, hi) = if min_ms <= max_ms { (min_ms, max_ms) } else { (max_ms, min_ms) };
        Latency {
            min: Duration::from_millis(lo),
            max: Duration::from_millis(hi),
        }
    }

    /// No delay at all (tests)
    pub fn none() -> Self {
        Latency::between(0, 0)
    }

    pub fn is_zero(&self) -> bool {
        self.max.is_zero()
    }

    pub fn sample(&self) -> Duration {
        use rand::Rng;

        if self.min == self.max {
            return self.min;
        }
        let lo = self.min.as_millis() as u64;
        let hi = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
    }
}

impl Default for Latency {
    fn default() -> Self {
        Latency::between(default_latency_min(), default_latency_max())
    }
}

// ============================================================================
// LOGGING
// ============================================================================

/// Initialize tracing for binaries; RUST_LOG overrides the default directive
pub fn init_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("parish_ledger=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.latency_min_ms, 300);
        assert_eq!(config.api.latency_max_ms, 800);
        assert!(config.api.seed);
        assert_eq!(config.server.addr, "0.0.0.0:3000");
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [api]
            latency_min_ms = 0
            latency_max_ms = 0
            "#,
        )
        .unwrap();

        assert!(config.api.latency().is_zero());
        assert!(config.api.seed);
        assert_eq!(config.session.path, PathBuf::from("ledger-session.db"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load_from(Path::new("/definitely/not/here.toml")).unwrap();
        assert_eq!(config.api.latency_max_ms, 800);
    }

    #[test]
    fn test_latency_sample_in_range() {
        let latency = Latency::between(300, 800);
        for _ in 0..50 {
            let d = latency.sample();
            assert!(d >= Duration::from_millis(300) && d <= Duration::from_millis(800));
        }
        // Reversed bounds are normalized
        assert_eq!(Latency::between(10, 5), Latency::between(5, 10));
    }
}
