pub mod service_knot;

pub use service_knot::{ServiceKnot, ServiceKnotConfig, ServiceMetadata, SERVICE_KNOT_NAME};
