pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::{knots::ServiceKnot, KnotRunner};
pub use config::{DeliveryOptions, KnotOptions, RunnerConfig};
pub use core::bus::EventBus;
pub use core::proxy::{create_proxy, create_proxy_with_options, EventBusKnotProxy, KnotProxy};
pub use core::runtime::{deploy, deploy_instances, KnotHandle};
pub use domain::envelope::ServiceResponse;
pub use domain::model::{ClientRequest, ClientResponse, Document, DocumentError, Fragment};
pub use domain::ports::{Knot, ServiceClient};
pub use domain::service_entry::{ServiceEntry, ServiceLocation};
pub use utils::error::{KnotError, Result, TransportFault};
