use crate::domain::envelope::ServiceResponse;
use crate::domain::ports::ServiceClient;
use crate::domain::service_entry::ServiceEntry;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// 以 HTTP GET 呼叫外部服務，所有結果都包成 ServiceResponse
#[derive(Debug, Clone)]
pub struct HttpServiceClient {
    client: Client,
}

impl HttpServiceClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    fn url_for(entry: &ServiceEntry) -> Option<String> {
        let location = entry.location()?;
        let uri = entry.service_uri();
        let separator = if uri.starts_with('/') { "" } else { "/" };
        Some(format!(
            "http://{}:{}{}{}",
            location.domain, location.port, separator, uri
        ))
    }
}

#[async_trait]
impl ServiceClient for HttpServiceClient {
    async fn fetch(&self, entry: &ServiceEntry) -> ServiceResponse {
        let uri = entry.service_uri();
        let Some(url) = Self::url_for(entry) else {
            return ServiceResponse::error(format_args!(
                "No service location configured for {}",
                uri
            ));
        };

        tracing::debug!("Calling service: {}", url);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Service {} call failed: {}", uri, e);
                return ServiceResponse::error(format_args!("Service {} call failed: {}", uri, e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return ServiceResponse::error(format_args!(
                "Service {} responded with status {}",
                uri,
                status.as_u16()
            ));
        }

        match response.text().await {
            Ok(body) => ServiceResponse::success(body),
            Err(e) => ServiceResponse::error(format_args!(
                "Service {} body could not be read: {}",
                uri, e
            )),
        }
    }
}
