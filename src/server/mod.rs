//! HTTP server for the relay

pub mod http;

pub use http::{route, run, AppState};
