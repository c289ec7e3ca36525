//! Shared test utilities for hydrofabric.

pub mod fixtures;
pub mod logging;

pub use fixtures::{synthetic_hydrofabric, HydrofabricFixture};
pub use logging::init_test_tracing;
