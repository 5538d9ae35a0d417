use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, validate_positive_number, Validate};
use clap::Parser;
use std::path::PathBuf;

/// 在單一 process 內部署 knots，並把一份 Document 送過處理鏈
#[derive(Parser, Debug, Clone)]
#[command(name = "knotbus", version, about)]
pub struct CliConfig {
    #[arg(long, short = 'c', default_value = "knotbus.toml")]
    pub config: PathBuf,

    #[arg(long, short = 'i', help = "Document JSON to process")]
    pub input: PathBuf,

    #[arg(long, short = 'o', help = "Where to write the processed Document (stdout if omitted)")]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Override [bus].request_timeout_ms")]
    pub timeout_ms: Option<u64>,

    #[arg(long, short = 'v', help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(long, help = "Log process CPU and memory around the chain")]
    pub monitor: bool,
}

impl CliConfig {
    pub fn timeout_or(&self, configured: u64) -> u64 {
        self.timeout_ms.unwrap_or(configured)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("config", &self.config.to_string_lossy())?;
        validate_non_empty_string("input", &self.input.to_string_lossy())?;
        if let Some(timeout) = self.timeout_ms {
            validate_positive_number("timeout_ms", timeout as usize, 1)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let config = CliConfig::parse_from([
            "knotbus",
            "--config",
            "runner.toml",
            "--input",
            "page.json",
            "--timeout-ms",
            "250",
            "--json-logs",
        ]);

        assert_eq!(config.config, PathBuf::from("runner.toml"));
        assert_eq!(config.input, PathBuf::from("page.json"));
        assert_eq!(config.output, None);
        assert_eq!(config.timeout_or(crate::config::DEFAULT_TIMEOUT_MILLIS), 250);
        assert!(config.json_logs);
        assert!(!config.monitor);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_is_invalid() {
        let config = CliConfig::parse_from(["knotbus", "-i", "page.json", "--timeout-ms", "0"]);

        assert_eq!(config.config, PathBuf::from("knotbus.toml"));
        assert!(config.validate().is_err());
    }
}
