use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

/// Runtime configuration, loaded from the environment (a `.env` file is
/// honored when present).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Override for the bulletin endpoint base URL.
    pub api_url: Option<String>,
    /// Write logs to daily files instead of stdout.
    pub log_to_file: bool,
    /// Directory for log files when `log_to_file` is set.
    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let api_url = env::var("CVRF_BULLETIN__API_URL").ok();

        let log_to_file = env::var("CVRF_BULLETIN__LOG_TO_FILE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let log_dir =
            env::var("CVRF_BULLETIN__LOG_DIR").unwrap_or_else(|_| "logs".to_string());

        Ok(Self {
            api_url,
            log_to_file,
            log_dir,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            log_to_file: false,
            log_dir: "logs".to_string(),
        }
    }
}
