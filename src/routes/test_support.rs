//! Request builders and state fixtures for handler tests

use bytes::Bytes;
use clap::Parser;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, Response};
use std::sync::Arc;

use crate::config::Args;
use crate::server::AppState;
use crate::services::MemoryStore;

/// Parse CLI args on top of the binary name
pub fn args(extra: &[&str]) -> Args {
    let mut argv = vec!["snapsolve-relay"];
    argv.extend_from_slice(extra);
    Args::parse_from(argv)
}

/// State backed by the given memory store
pub fn state_with(args: Args, store: Arc<MemoryStore>) -> Arc<AppState> {
    Arc::new(AppState::with_stores(args, store.clone(), store))
}

pub fn json_request(method: Method, path: &str, body: &str) -> Request<Full<Bytes>> {
    Request::builder()
        .method(method)
        .uri(path)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

pub fn post_json(path: &str, body: serde_json::Value) -> Request<Full<Bytes>> {
    json_request(Method::POST, path, &body.to_string())
}

pub fn empty_request(method: Method, path: &str) -> Request<Full<Bytes>> {
    Request::builder()
        .method(method)
        .uri(path)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

pub async fn read_json(response: Response<Full<Bytes>>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
