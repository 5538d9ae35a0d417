// Domain layer: the routed document, service envelopes and the ports knots plug into.

pub mod envelope;
pub mod model;
pub mod ports;
pub mod service_entry;
