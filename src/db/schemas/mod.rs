//! Database schemas for the relay
//!
//! Defines MongoDB document structures for analytics events and licenses.

mod analytics_event;
mod license;

pub use analytics_event::{AnalyticsEventDoc, ANALYTICS_COLLECTION};
pub use license::{LicenseDoc, LICENSE_COLLECTION};
