use crate::config::DeliveryOptions;
use crate::core::bus::EventBus;
use crate::domain::model::Document;
use crate::utils::error::TransportFault;
use async_trait::async_trait;

/// 從 pipeline 其他位置呼叫 knot 的 client 介面
///
/// `Err` means the knot never produced a reply. A knot that answered with an
/// error state still yields `Ok`, with the state inside the document.
#[async_trait]
pub trait KnotProxy: Send + Sync {
    async fn process(&self, document: Document) -> std::result::Result<Document, TransportFault>;
}

/// 透過 EventBus 位址呼叫 knot
#[derive(Clone)]
pub struct EventBusKnotProxy {
    bus: EventBus,
    address: String,
    options: DeliveryOptions,
}

impl EventBusKnotProxy {
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn options(&self) -> &DeliveryOptions {
        &self.options
    }
}

pub fn create_proxy(bus: &EventBus, address: impl Into<String>) -> EventBusKnotProxy {
    create_proxy_with_options(bus, address, DeliveryOptions::default())
}

pub fn create_proxy_with_options(
    bus: &EventBus,
    address: impl Into<String>,
    options: DeliveryOptions,
) -> EventBusKnotProxy {
    EventBusKnotProxy {
        bus: bus.clone(),
        address: address.into(),
        options,
    }
}

#[async_trait]
impl KnotProxy for EventBusKnotProxy {
    async fn process(&self, document: Document) -> std::result::Result<Document, TransportFault> {
        let body = serde_json::to_string(&document).map_err(|e| TransportFault::Codec {
            message: format!("Cannot encode document for <{}>: {}", self.address, e),
        })?;

        let reply = self.bus.request(&self.address, body, &self.options).await?;

        serde_json::from_str(&reply).map_err(|e| TransportFault::Codec {
            message: format!("Cannot decode reply from <{}>: {}", self.address, e),
        })
    }
}
