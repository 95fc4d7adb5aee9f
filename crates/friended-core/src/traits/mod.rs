//! Ports implemented by the infrastructure crates

mod repositories;

pub use repositories::*;
