//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Each connection runs on
//! its own task; handlers share nothing but `AppState`.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::Args;
use crate::db::SharedMongo;
use crate::routes;
use crate::services::{
    EventStore, LicenseStore, MemoryStore, MongoEventStore, MongoLicenseStore, VisionClient,
};
use crate::types::RelayError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Lazily connected MongoDB handle (None when running on the memory store)
    pub mongo: Option<Arc<SharedMongo>>,
    /// Analytics event sink
    pub events: Arc<dyn EventStore>,
    /// License registry
    pub licenses: Arc<dyn LicenseStore>,
    /// Upstream vision API client
    pub vision: VisionClient,
    pub started_at: Instant,
}

impl AppState {
    /// Create AppState from configuration
    ///
    /// Nothing connects here; MongoDB is reached on the first request that
    /// needs it.
    pub fn new(args: Args) -> Self {
        if args.memory_store {
            let store = Arc::new(MemoryStore::new());
            return Self::with_stores(args, store.clone(), store);
        }

        let mongo = Arc::new(SharedMongo::new(&args.mongodb_uri, &args.mongodb_db));
        let events = Arc::new(MongoEventStore::new(Arc::clone(&mongo)));
        let licenses = Arc::new(MongoLicenseStore::new(Arc::clone(&mongo)));

        let mut state = Self::with_stores(args, events, licenses);
        state.mongo = Some(mongo);
        state
    }

    /// Create AppState around explicit stores
    pub fn with_stores(
        args: Args,
        events: Arc<dyn EventStore>,
        licenses: Arc<dyn LicenseStore>,
    ) -> Self {
        let vision = VisionClient::from_args(&args);
        Self {
            args,
            mongo: None,
            events,
            licenses,
            vision,
            started_at: Instant::now(),
        }
    }

    /// Name of the active storage backend
    pub fn storage_kind(&self) -> &'static str {
        if self.mongo.is_some() {
            "mongodb"
        } else {
            "memory"
        }
    }

    /// Whether the storage backend currently holds a live connection
    pub fn storage_connected(&self) -> bool {
        self.mongo.as_ref().map(|m| m.is_connected()).unwrap_or(true)
    }

    /// Release process-wide resources
    pub async fn shutdown(&self) {
        if let Some(ref mongo) = self.mongo {
            mongo.shutdown().await;
        }
    }
}

/// Start the HTTP server; returns once a shutdown signal arrives
pub async fn run(state: Arc<AppState>) -> Result<(), RelayError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Relay listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode() {
        warn!("Development mode enabled - extension allow-list bypassed");
    }

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let state = Arc::clone(&state);
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);

                        let service = service_fn(move |req| {
                            let state = Arc::clone(&state);
                            async move { handle_request(state, addr, req).await }
                        });

                        if let Err(err) = http1::Builder::new()
                            .serve_connection(io, service)
                            .await
                        {
                            error!("Error serving connection from {}: {:?}", addr, err);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {:?}", e);
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    Ok(())
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    Ok(route(state, req, &method, &path).await)
}

/// Dispatch by path; each API handler applies the ingress gate itself
pub async fn route<B>(
    state: Arc<AppState>,
    req: Request<B>,
    method: &Method,
    path: &str,
) -> Response<Full<Bytes>>
where
    B: hyper::body::Body,
    B::Error: std::fmt::Display,
{
    match path {
        "/api/analytics" | "/api/record-event" => routes::handle_record_event(req, state).await,
        "/api/proxy" => routes::handle_proxy(req, state).await,
        "/api/verify" => routes::handle_verify(req, state).await,
        "/health" | "/healthz" if *method == Method::GET => routes::health_check(&state),
        _ => routes::not_found_response(path),
    }
}
