#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::{KnotDeployment, KnotKind, RunnerConfig};

use crate::utils::error::{KnotError, Result};
use crate::utils::validation::{validate_address, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// 與 event bus 預設的 request timeout 相同
pub const DEFAULT_TIMEOUT_MILLIS: u64 = 30_000;

/// 每個 knot 至少需要的設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnotOptions {
    pub address: String,
}

impl KnotOptions {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// 從原始 JSON 設定取出並驗證 `address`
    pub fn from_config(config: &serde_json::Value) -> Result<Self> {
        let address = match config.get("address") {
            None | Some(serde_json::Value::Null) => {
                return Err(KnotError::MissingConfigError {
                    field: "address".to_string(),
                })
            }
            Some(serde_json::Value::String(address)) => address.clone(),
            Some(other) => {
                return Err(KnotError::InvalidConfigValueError {
                    field: "address".to_string(),
                    value: other.to_string(),
                    reason: "Address must be a string".to_string(),
                })
            }
        };

        let options = Self { address };
        options.validate()?;
        Ok(options)
    }
}

impl Validate for KnotOptions {
    fn validate(&self) -> Result<()> {
        validate_address("address", &self.address)
    }
}

/// Options handed to the transport unmodified on every proxy call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOptions {
    #[serde(default = "default_timeout_millis")]
    pub timeout_millis: u64,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_timeout_millis() -> u64 {
    DEFAULT_TIMEOUT_MILLIS
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        Self {
            timeout_millis: DEFAULT_TIMEOUT_MILLIS,
            headers: BTreeMap::new(),
        }
    }
}

impl DeliveryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout_ms(mut self, timeout_millis: u64) -> Self {
        self.timeout_millis = timeout_millis;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_millis)
    }
}
