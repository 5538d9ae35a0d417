// Application layer: concrete knots and the runner that wires them onto a bus.

pub mod knots;
pub mod runner;

pub use runner::KnotRunner;
