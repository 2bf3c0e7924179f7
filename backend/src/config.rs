//! Application settings loaded via OrthoConfig.
//!
//! Values come from `FAULTLINE_*` environment variables, matching command
//! line flags, or an optional configuration file.

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::inbound::http::ErrorMode;

const DEFAULT_HOST: &str = "0.0.0.0";

/// Runtime settings for the service.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "FAULTLINE")]
pub struct AppSettings {
    /// Deployment environment: `development` or `production`.
    pub environment: Option<String>,
    /// Interface the HTTP server binds to.
    pub host: Option<String>,
    /// Port the HTTP server binds to.
    #[ortho_config(default = 8080)]
    pub port: u16,
    /// HMAC secret used to verify bearer tokens.
    pub jwt_secret: Option<String>,
}

impl AppSettings {
    /// Failure output mode for the configured environment.
    ///
    /// Resolved once at startup; unknown names fall back to production.
    #[must_use]
    pub fn error_mode(&self) -> ErrorMode {
        ErrorMode::from_environment(self.environment.as_deref())
    }

    /// Bind host, defaulting to all interfaces.
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    /// Bind port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Token secret, if one was configured.
    pub fn jwt_secret(&self) -> Option<&str> {
        self.jwt_secret.as_deref().filter(|secret| !secret.is_empty())
    }
}
