//! Snap Solve relay - backend for the Snap Solve browser extension
//!
//! The extension never talks to the vision model or the database directly;
//! it goes through three POST endpoints served here:
//!
//! - **Event Recorder** (`/api/analytics`): best-effort usage events
//! - **Vision Proxy** (`/api/proxy`): attaches the upstream API key and relays
//!   the model's answer
//! - **Identity Verifier** (`/api/verify`): registers installations and
//!   answers whether they are licensed
//!
//! Storage is MongoDB behind a lazily connected, process-wide handle, or an
//! in-memory store for local runs.

pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{RelayError, Result};
