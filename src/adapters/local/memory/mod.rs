//! Single-process adapters, used when no Redis is configured and in tests.

pub mod bus;
pub mod registry;

pub use bus::InMemoryBus;
pub use registry::InMemoryRegistry;
