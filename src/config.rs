//! Configuration for the relay
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

use crate::types::{RelayError, Result};

/// Default upstream chat-completion endpoint
pub const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Snap Solve relay - vision proxy, usage events and installation licenses
#[derive(Parser, Debug, Clone)]
#[command(name = "snapsolve-relay")]
#[command(about = "Backend relay for the Snap Solve browser extension")]
pub struct Args {
    /// Unique node identifier for this relay instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "snap_solve")]
    pub mongodb_db: String,

    /// Keep events and licenses in process memory instead of MongoDB
    #[arg(long, env = "MEMORY_STORE", default_value = "false")]
    pub memory_store: bool,

    /// API key for the upstream vision API
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub openrouter_api_key: Option<String>,

    /// Upstream chat-completion URL
    #[arg(long, env = "OPENROUTER_URL", default_value = DEFAULT_OPENROUTER_URL)]
    pub openrouter_url: String,

    /// Value of the HTTP-Referer attribution header sent upstream
    #[arg(
        long,
        env = "OPENROUTER_REFERER",
        default_value = "https://github.com/OpenRouterTeam/openrouter"
    )]
    pub openrouter_referer: String,

    /// Value of the X-Title attribution header sent upstream
    #[arg(long, env = "OPENROUTER_TITLE", default_value = "Snap Solve")]
    pub openrouter_title: String,

    /// Runtime mode; "development" accepts any extension ID
    #[arg(long, env = "NODE_ENV", default_value = "production")]
    pub node_env: String,

    /// Comma-separated list of extension IDs allowed to verify installations
    #[arg(long, env = "ALLOWED_EXTENSION_IDS", default_value = "")]
    pub allowed_extension_ids: String,

    /// Require a known X-Extension-ID header on proxy requests
    #[arg(long, env = "PROXY_REQUIRE_EXTENSION_ID", default_value = "false")]
    pub proxy_require_extension_id: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format (pretty, json)
    #[arg(long, env = "LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

impl Args {
    /// Whether the deployment runs in development mode
    pub fn dev_mode(&self) -> bool {
        self.node_env == "development"
    }

    /// Get the extension allow-list
    pub fn extension_allow_list(&self) -> Vec<String> {
        self.allowed_extension_ids
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Check whether an extension may use the licensing endpoints
    pub fn is_allowed_extension(&self, extension_id: &str) -> bool {
        self.dev_mode()
            || self
                .extension_allow_list()
                .iter()
                .any(|allowed| allowed == extension_id)
    }

    /// Upstream API key, ignoring blank values
    pub fn vision_api_key(&self) -> Option<&str> {
        self.openrouter_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Whether logs should be emitted as JSON lines
    pub fn json_logs(&self) -> bool {
        self.log_format == "json"
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.log_format != "pretty" && self.log_format != "json" {
            return Err(RelayError::Config(format!(
                "LOG_FORMAT must be 'pretty' or 'json', got '{}'",
                self.log_format
            )));
        }

        if self.mongodb_db.trim().is_empty() && !self.memory_store {
            return Err(RelayError::Config("MONGODB_DB must not be empty".to_string()));
        }

        Ok(())
    }
}
