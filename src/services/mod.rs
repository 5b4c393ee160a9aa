//! Services layer for the relay
//!
//! ## Services
//!
//! - **Telemetry**: best-effort analytics event storage
//! - **Licensing**: installation license registry
//! - **Vision**: upstream chat-completion client
//! - **Memory**: in-process store backing both registries

pub mod licensing;
pub mod memory;
pub mod telemetry;
pub mod vision;

pub use licensing::{LicenseStore, MongoLicenseStore, Registration};
pub use memory::MemoryStore;
pub use telemetry::{EventStore, MongoEventStore};
pub use vision::{VisionClient, VisionRequest};
