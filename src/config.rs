//! Configuration for the coworker-graph core
//!
//! Clap arguments with environment fallbacks, designed to be
//! `#[command(flatten)]`-ed into the embedding service's CLI.

use clap::Parser;

/// Coworker-graph core configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "crewline-core")]
pub struct CoreArgs {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "crewline")]
    pub mongodb_db: String,

    /// Secret for signing invite capability tokens (required in production)
    #[arg(long, env = "INVITE_SECRET")]
    pub invite_secret: Option<String>,

    /// Invite token expiry in seconds (default 14 days)
    #[arg(long, env = "INVITE_TTL_SECONDS", default_value = "1209600")]
    pub invite_ttl_seconds: i64,

    /// Enable development mode (in-memory stores, insecure default secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl CoreArgs {
    /// Effective invite secret (uses an insecure default in dev mode)
    pub fn invite_secret(&self) -> String {
        if self.dev_mode {
            self.invite_secret
                .clone()
                .unwrap_or_else(|| "dev-only-insecure-secret".to_string())
        } else {
            self.invite_secret
                .clone()
                .expect("INVITE_SECRET is required in production mode")
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.dev_mode && self.invite_secret.is_none() {
            return Err("INVITE_SECRET is required in production mode".to_string());
        }

        if self.invite_ttl_seconds <= 0 {
            return Err("INVITE_TTL_SECONDS must be positive".to_string());
        }

        Ok(())
    }
}
