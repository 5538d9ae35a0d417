use crate::app::knots::ServiceKnot;
use crate::config::{DeliveryOptions, KnotDeployment, KnotKind, RunnerConfig};
use crate::core::bus::EventBus;
use crate::core::proxy::{create_proxy_with_options, EventBusKnotProxy, KnotProxy};
use crate::core::runtime::{deploy_instances, KnotHandle};
use crate::domain::model::Document;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use crate::utils::validation::Validate;

/// 依 RunnerConfig 部署 knots，並依序把 Document 送過處理鏈
pub struct KnotRunner {
    bus: EventBus,
    handles: Vec<KnotHandle>,
    chain: Vec<EventBusKnotProxy>,
    monitor: SystemMonitor,
}

impl KnotRunner {
    pub fn start(config: &RunnerConfig) -> Result<Self> {
        Self::start_with_options(config, config.delivery_options(), false)
    }

    pub fn start_with_options(
        config: &RunnerConfig,
        options: DeliveryOptions,
        monitor_enabled: bool,
    ) -> Result<Self> {
        config.validate()?;

        let bus = EventBus::with_capacity(config.bus.queue_capacity);
        let mut handles = Vec::new();
        for deployment in &config.knots {
            handles.extend(deploy(&bus, deployment)?);
        }
        tracing::info!("🚀 Deployed {} knot instances", handles.len());

        let chain = config
            .chain
            .addresses
            .iter()
            .map(|address| create_proxy_with_options(&bus, address.clone(), options.clone()))
            .collect();

        Ok(Self {
            bus,
            handles,
            chain,
            monitor: SystemMonitor::new(monitor_enabled),
        })
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn handles(&self) -> &[KnotHandle] {
        &self.handles
    }

    /// A transport fault stops the chain; the document is not passed further.
    pub async fn run(&self, document: Document) -> Result<Document> {
        self.monitor.log_stats("before chain");

        let mut document = document;
        for proxy in &self.chain {
            tracing::debug!("Sending document to {}", proxy.address());
            document = proxy.process(document).await?;
            if let Some(error) = &document.error {
                tracing::warn!("⚠️ {} reported: {}", error.source, error.message);
            }
        }

        self.monitor.log_stats("after chain");
        Ok(document)
    }

    pub async fn shutdown(self) {
        for handle in self.handles {
            handle.stop().await;
        }
    }
}

fn deploy(bus: &EventBus, deployment: &KnotDeployment) -> Result<Vec<KnotHandle>> {
    match deployment.kind {
        KnotKind::Service => {
            deploy_instances(bus, deployment.instances, &deployment.config, ServiceKnot::new)
        }
    }
}
