use crate::domain::envelope::ServiceResponse;
use crate::domain::model::Fragment;
use crate::domain::ports::ServiceClient;
use crate::domain::service_entry::ServiceEntry;
use crate::utils::error::{KnotError, Result};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub enum EntryOutcome {
    Fetched(ServiceEntry),
    Failed { entry: ServiceEntry, reason: String },
}

impl EntryOutcome {
    pub fn entry(&self) -> &ServiceEntry {
        match self {
            Self::Fetched(entry) | Self::Failed { entry, .. } => entry,
        }
    }
}

/// 從片段屬性建立 ServiceEntry，例如 `data-service-news="/news.json"` 會變成 `news -> /news.json`
pub fn collect_entries(fragment: &Fragment, attribute_prefix: &str) -> Vec<ServiceEntry> {
    fragment
        .attributes
        .iter()
        .filter_map(|(key, uri)| {
            let name = key.strip_prefix(attribute_prefix)?;
            if name.is_empty() || uri.trim().is_empty() {
                return None;
            }
            Some(ServiceEntry::of(name, uri.trim()))
        })
        .collect()
}

/// 每個不同的 service uri 只呼叫一次，並行執行
pub async fn fetch_distinct<C>(client: &C, entries: &[ServiceEntry]) -> HashMap<String, ServiceResponse>
where
    C: ServiceClient + ?Sized,
{
    let distinct: HashSet<&ServiceEntry> = entries.iter().collect();
    tracing::debug!(
        "Fetching {} distinct services for {} entries",
        distinct.len(),
        entries.len()
    );

    let fetches = distinct.into_iter().map(|entry| async move {
        let response = client.fetch(entry).await;
        (entry.service_uri().to_string(), response)
    });

    futures::future::join_all(fetches).await.into_iter().collect()
}

/// 把每個 uri 的結果分給所有綁定該 uri 的 entry
///
/// A success envelope whose data is not a JSON object is an unexpected
/// failure and returns `Err`; a failure envelope is a business outcome.
pub fn fan_out(
    entries: Vec<ServiceEntry>,
    responses: &HashMap<String, ServiceResponse>,
) -> Result<Vec<EntryOutcome>> {
    entries
        .into_iter()
        .map(|entry| match responses.get(entry.service_uri()) {
            Some(response) if response.is_success() => {
                let result = parse_result(entry.service_uri(), response.data().unwrap_or_default())?;
                Ok(EntryOutcome::Fetched(entry.set_result(result)))
            }
            Some(response) => {
                let reason = response.reason().unwrap_or_default().to_string();
                Ok(EntryOutcome::Failed { entry, reason })
            }
            None => {
                let reason = format!("No response for service {}", entry.service_uri());
                Ok(EntryOutcome::Failed { entry, reason })
            }
        })
        .collect()
}

fn parse_result(uri: &str, data: &str) -> Result<serde_json::Map<String, serde_json::Value>> {
    serde_json::from_str(data).map_err(|e| KnotError::ServiceError {
        uri: uri.to_string(),
        reason: format!("response is not a JSON object: {}", e),
    })
}
