use crate::config::{DeliveryOptions, KnotOptions, DEFAULT_TIMEOUT_MILLIS};
use crate::core::bus::DEFAULT_QUEUE_CAPACITY;
use crate::utils::error::{KnotError, Result};
use crate::utils::validation::{validate_address, validate_positive_number, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

/// CLI host 的設定檔：bus 預設值、要部署的 knots、以及處理鏈
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub knots: Vec<KnotDeployment>,
    pub chain: ChainConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MILLIS
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnotKind {
    Service,
}

/// 一種 knot 的部署設定；`config` 原封不動交給 `init_configuration`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnotDeployment {
    pub kind: KnotKind,
    #[serde(default = "default_instances")]
    pub instances: usize,
    #[serde(default = "empty_config")]
    pub config: serde_json::Value,
}

fn default_instances() -> usize {
    1
}

fn empty_config() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl KnotDeployment {
    pub fn address(&self) -> Option<&str> {
        self.config.get("address").and_then(|a| a.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub addresses: Vec<String>,
}

impl RunnerConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content);

        toml::from_str(&processed_content)
            .map_err(|e| KnotError::config(format!("TOML parsing error: {}", e)))
    }

    pub fn delivery_options(&self) -> DeliveryOptions {
        DeliveryOptions::new().with_timeout_ms(self.bus.request_timeout_ms)
    }
}

/// 替換環境變數 (例如 ${SERVICE_HOST})，找不到的變數保持原樣
fn substitute_env_vars(content: &str) -> String {
    static ENV_VAR: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = ENV_VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").ok()) else {
        return content.to_string();
    };

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    })
    .into_owned()
}

impl Validate for RunnerConfig {
    fn validate(&self) -> Result<()> {
        validate_positive_number("bus.request_timeout_ms", self.bus.request_timeout_ms as usize, 1)?;
        validate_positive_number("bus.queue_capacity", self.bus.queue_capacity, 1)?;

        let mut deployed = Vec::with_capacity(self.knots.len());
        for (i, knot) in self.knots.iter().enumerate() {
            validate_positive_number(&format!("knots[{}].instances", i), knot.instances, 1)?;
            let options = KnotOptions::from_config(&knot.config).map_err(|e| match e {
                KnotError::MissingConfigError { field } => KnotError::MissingConfigError {
                    field: format!("knots[{}].config.{}", i, field),
                },
                other => other,
            })?;
            if deployed.contains(&options.address) {
                return Err(KnotError::InvalidConfigValueError {
                    field: format!("knots[{}].config.address", i),
                    value: options.address,
                    reason: "Address is already used by another [[knots]] entry; use instances to scale one knot".to_string(),
                });
            }
            deployed.push(options.address);
        }

        if self.chain.addresses.is_empty() {
            return Err(KnotError::MissingConfigError {
                field: "chain.addresses".to_string(),
            });
        }
        for address in &self.chain.addresses {
            validate_address("chain.addresses", address)?;
            if !deployed.contains(address) {
                return Err(KnotError::InvalidConfigValueError {
                    field: "chain.addresses".to_string(),
                    value: address.clone(),
                    reason: "No knot in [[knots]] is deployed on this address".to_string(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[bus]
request_timeout_ms = 2000

[[knots]]
kind = "service"
instances = 2

[knots.config]
address = "knot.service"
supported_identifiers = ["services"]

[[knots.config.services]]
path = "/service/.*"
domain = "localhost"
port = 3000

[chain]
addresses = ["knot.service"]
"#;

    #[test]
    fn test_parse_runner_config() {
        let config = RunnerConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.bus.request_timeout_ms, 2000);
        assert_eq!(config.bus.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.knots.len(), 1);
        assert_eq!(config.knots[0].kind, KnotKind::Service);
        assert_eq!(config.knots[0].instances, 2);
        assert_eq!(config.knots[0].address(), Some("knot.service"));
        assert_eq!(config.knots[0].config["services"][0]["port"], 3000);
        assert_eq!(config.delivery_options().timeout_millis, 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("KNOTBUS_TEST_SERVICE_HOST", "service.internal");

        let content = BASIC.replace("\"localhost\"", "\"${KNOTBUS_TEST_SERVICE_HOST}\"");
        let config = RunnerConfig::from_toml_str(&content).unwrap();
        assert_eq!(
            config.knots[0].config["services"][0]["domain"],
            "service.internal"
        );

        std::env::remove_var("KNOTBUS_TEST_SERVICE_HOST");
    }

    #[test]
    fn test_unknown_env_var_is_kept() {
        assert_eq!(
            substitute_env_vars("domain = \"${KNOTBUS_TEST_UNSET_VAR}\""),
            "domain = \"${KNOTBUS_TEST_UNSET_VAR}\""
        );
    }

    #[test]
    fn test_chain_must_reference_deployed_knot() {
        let content = BASIC.replace("addresses = [\"knot.service\"]", "addresses = [\"knot.missing\"]");
        let config = RunnerConfig::from_toml_str(&content).unwrap();

        match config.validate() {
            Err(KnotError::InvalidConfigValueError { value, .. }) => assert_eq!(value, "knot.missing"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_address_shared_by_two_deployments_is_rejected() {
        let content = r#"
[[knots]]
kind = "service"

[knots.config]
address = "knot.shared"
supported_identifiers = ["a"]

[[knots]]
kind = "service"

[knots.config]
address = "knot.shared"
supported_identifiers = ["b"]

[chain]
addresses = ["knot.shared"]
"#;
        let config = RunnerConfig::from_toml_str(content).unwrap();

        match config.validate() {
            Err(KnotError::InvalidConfigValueError { field, value, .. }) => {
                assert_eq!(field, "knots[1].config.address");
                assert_eq!(value, "knot.shared");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_knot_without_address_is_rejected() {
        let content = r#"
[[knots]]
kind = "service"

[chain]
addresses = ["knot.service"]
"#;
        let config = RunnerConfig::from_toml_str(content).unwrap();

        match config.validate() {
            Err(KnotError::MissingConfigError { field }) => {
                assert_eq!(field, "knots[0].config.address")
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_unknown_kind_is_a_parse_error() {
        let content = BASIC.replace("kind = \"service\"", "kind = \"templating\"");
        assert!(RunnerConfig::from_toml_str(&content).is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = RunnerConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.chain.addresses, vec!["knot.service"]);
    }
}
