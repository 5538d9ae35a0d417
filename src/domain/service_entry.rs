use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLocation {
    pub domain: String,
    pub port: u16,
}

/// 把片段上的 service 屬性綁定到外部資料來源
///
/// 兩個 entry 相等只看 `service_uri`，所以共用同一個 uri 的片段只需抓取一次。
#[derive(Debug, Clone)]
pub struct ServiceEntry {
    related_identifier: String,
    service_uri: String,
    location: Option<ServiceLocation>,
    result: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ServiceEntry {
    pub fn of(related_identifier: impl Into<String>, service_uri: impl Into<String>) -> Self {
        Self {
            related_identifier: related_identifier.into(),
            service_uri: service_uri.into(),
            location: None,
            result: None,
        }
    }

    pub fn with_location(mut self, location: ServiceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn set_result(mut self, result: serde_json::Map<String, serde_json::Value>) -> Self {
        self.result = Some(result);
        self
    }

    pub fn related_identifier(&self) -> &str {
        &self.related_identifier
    }

    pub fn service_uri(&self) -> &str {
        &self.service_uri
    }

    pub fn location(&self) -> Option<&ServiceLocation> {
        self.location.as_ref()
    }

    pub fn domain(&self) -> Option<&str> {
        self.location.as_ref().map(|l| l.domain.as_str())
    }

    pub fn port(&self) -> Option<u16> {
        self.location.as_ref().map(|l| l.port)
    }

    pub fn result(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.result.as_ref()
    }
}

impl PartialEq for ServiceEntry {
    fn eq(&self, other: &Self) -> bool {
        self.service_uri == other.service_uri
    }
}

impl Eq for ServiceEntry {}

impl Hash for ServiceEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.service_uri.hash(state);
    }
}
