use crate::adapters::HttpServiceClient;
use crate::config::KnotOptions;
use crate::core::enrichment::{collect_entries, fan_out, fetch_distinct, EntryOutcome};
use crate::core::routing::{fragment_matches, supports_any};
use crate::domain::model::Document;
use crate::domain::ports::{Knot, ServiceClient};
use crate::domain::service_entry::{ServiceEntry, ServiceLocation};
use crate::utils::error::{KnotError, Result};
use crate::utils::validation::{validate_positive_number, validate_regex, validate_service_domain};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

pub const SERVICE_KNOT_NAME: &str = "service-knot";

/// Service knot 的專屬設定（`address` 之外）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceKnotConfig {
    pub address: String,
    #[serde(default = "default_supported_identifiers")]
    pub supported_identifiers: Vec<String>,
    #[serde(default = "default_attribute_prefix")]
    pub attribute_prefix: String,
    #[serde(default)]
    pub services: Vec<ServiceMetadata>,
    #[serde(default = "default_client_timeout_ms")]
    pub client_timeout_ms: u64,
}

/// uri 符合 `path`（完整比對的正規表示式）時，呼叫 `domain:port`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceMetadata {
    pub path: String,
    pub domain: String,
    pub port: u16,
}

fn default_supported_identifiers() -> Vec<String> {
    vec!["services".to_string()]
}

fn default_attribute_prefix() -> String {
    "data-service-".to_string()
}

fn default_client_timeout_ms() -> u64 {
    5_000
}

struct ServiceRoute {
    pattern: Regex,
    location: ServiceLocation,
}

/// 依片段上的 `data-service-*` 屬性呼叫外部服務，把結果放進片段的 context
pub struct ServiceKnot {
    supported: Vec<String>,
    attribute_prefix: String,
    routes: Vec<ServiceRoute>,
    client: Option<Arc<dyn ServiceClient>>,
}

impl Default for ServiceKnot {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceKnot {
    /// The HTTP client is created from the configuration in `init_configuration`.
    pub fn new() -> Self {
        Self {
            supported: default_supported_identifiers(),
            attribute_prefix: default_attribute_prefix(),
            routes: Vec::new(),
            client: None,
        }
    }

    pub fn with_client(client: Arc<dyn ServiceClient>) -> Self {
        Self {
            client: Some(client),
            ..Self::new()
        }
    }

    fn locate(&self, entry: ServiceEntry) -> ServiceEntry {
        match self
            .routes
            .iter()
            .find(|route| route.pattern.is_match(entry.service_uri()))
        {
            Some(route) => entry.with_location(route.location.clone()),
            None => entry,
        }
    }
}

#[async_trait]
impl Knot for ServiceKnot {
    fn name(&self) -> &str {
        SERVICE_KNOT_NAME
    }

    fn init_configuration(&mut self, config: &serde_json::Value) -> Result<KnotOptions> {
        let options = KnotOptions::from_config(config)?;
        let config: ServiceKnotConfig = serde_json::from_value(config.clone())
            .map_err(|e| KnotError::config(format!("Invalid service knot configuration: {}", e)))?;

        validate_positive_number("client_timeout_ms", config.client_timeout_ms as usize, 1)?;
        if config.supported_identifiers.iter().all(|id| id.is_empty()) {
            return Err(KnotError::InvalidConfigValueError {
                field: "supported_identifiers".to_string(),
                value: format!("{:?}", config.supported_identifiers),
                reason: "At least one non-empty identifier is required".to_string(),
            });
        }

        let mut routes = Vec::with_capacity(config.services.len());
        for (i, service) in config.services.iter().enumerate() {
            let field = format!("services[{}]", i);
            let pattern = validate_regex(&format!("{}.path", field), &format!("^(?:{})$", service.path))?;
            validate_service_domain(&field, &service.domain, service.port)?;
            routes.push(ServiceRoute {
                pattern,
                location: ServiceLocation {
                    domain: service.domain.clone(),
                    port: service.port,
                },
            });
        }

        if self.client.is_none() {
            let client = HttpServiceClient::new(Duration::from_millis(config.client_timeout_ms))?;
            self.client = Some(Arc::new(client));
        }

        self.supported = config.supported_identifiers;
        self.attribute_prefix = config.attribute_prefix;
        self.routes = routes;
        Ok(options)
    }

    fn should_process(&self, identifiers: &HashSet<String>) -> bool {
        supports_any(identifiers, &self.supported)
    }

    async fn process(&self, mut document: Document) -> Result<Document> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| KnotError::processing(self.name(), "service client is not initialised"))?;

        let bindings: Vec<(usize, Vec<ServiceEntry>)> = document
            .fragments()
            .unwrap_or_default()
            .iter()
            .enumerate()
            .filter(|(_, fragment)| fragment_matches(fragment, &self.supported))
            .map(|(index, fragment)| {
                let entries = collect_entries(fragment, &self.attribute_prefix)
                    .into_iter()
                    .map(|entry| self.locate(entry))
                    .collect::<Vec<_>>();
                (index, entries)
            })
            .filter(|(_, entries)| !entries.is_empty())
            .collect();

        if bindings.is_empty() {
            return Ok(document);
        }

        let all_entries: Vec<ServiceEntry> = bindings
            .iter()
            .flat_map(|(_, entries)| entries.iter().cloned())
            .collect();
        let responses = fetch_distinct(client.as_ref(), &all_entries).await;

        let mut failures: Vec<String> = Vec::new();
        if let Some(fragments) = document.fragments.as_mut() {
            for (index, entries) in bindings {
                let fragment = &mut fragments[index];
                for outcome in fan_out(entries, &responses)? {
                    match outcome {
                        EntryOutcome::Fetched(entry) => {
                            let result = entry.result().cloned().unwrap_or_default();
                            fragment.context.insert(
                                entry.related_identifier().to_string(),
                                serde_json::Value::Object(result),
                            );
                        }
                        EntryOutcome::Failed { entry, reason } => {
                            tracing::warn!(
                                "Service {} for '{}' failed: {}",
                                entry.service_uri(),
                                entry.related_identifier(),
                                reason
                            );
                            if !failures.contains(&reason) {
                                failures.push(reason);
                            }
                        }
                    }
                }
            }
        }

        if !failures.is_empty() {
            document.mark_failed(self.name(), failures.join("; "));
        }
        Ok(document)
    }

    fn process_error(&self, mut document: Document, error: &KnotError) -> Document {
        document.mark_failed(self.name(), error.to_string());
        document.client_response.status_code = Some(500);
        document
    }
}
