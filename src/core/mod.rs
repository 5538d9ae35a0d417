pub mod bus;
pub mod enrichment;
pub mod proxy;
pub mod routing;
pub mod runtime;

pub use crate::domain::model::{Document, Fragment};
pub use crate::domain::ports::{Knot, ServiceClient};
pub use crate::utils::error::Result;
