//! HTTP routes for the relay

pub mod gate;
pub mod health;
pub mod proxy;
pub mod record_event;
pub mod schema;
pub mod verify;

#[cfg(test)]
pub(crate) mod test_support;

pub use gate::{error_response, json_response, not_found_response, preflight_response};
pub use health::health_check;
pub use proxy::handle_proxy;
pub use record_event::handle_record_event;
pub use verify::handle_verify;
