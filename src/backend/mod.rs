//! Backend abstraction for HTTP engine implementations

pub mod types;

#[cfg(feature = "backend-reqwest")]
pub mod reqwest;

use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use types::{BackendRequest, BackendResponse, Transport};

/// Configuration for backend creation
#[derive(Clone, Debug, Default)]
pub struct BackendConfig {
    /// Timeout for a single exchange
    pub timeout: Option<Duration>,
    /// User agent string
    pub user_agent: Option<String>,
}

/// HTTP engine implementations
#[derive(Clone)]
pub enum Backend {
    /// Cross-platform implementation using reqwest
    #[cfg(feature = "backend-reqwest")]
    Reqwest(reqwest::ReqwestBackend),

    /// Any other engine
    Custom(Arc<dyn Transport>),
}

impl Backend {
    /// Explicitly use reqwest backend
    #[cfg(feature = "backend-reqwest")]
    pub fn reqwest() -> Result<Self> {
        Ok(Backend::Reqwest(reqwest::ReqwestBackend::new()?))
    }

    /// Use reqwest backend with configuration
    #[cfg(feature = "backend-reqwest")]
    pub fn reqwest_with_config(config: BackendConfig) -> Result<Self> {
        Ok(Backend::Reqwest(reqwest::ReqwestBackend::with_config(
            config,
        )?))
    }

    /// Use a custom engine
    pub fn custom(transport: impl Transport) -> Self {
        Backend::Custom(Arc::new(transport))
    }

    /// Execute an HTTP request
    pub async fn execute(&self, request: BackendRequest) -> Result<BackendResponse> {
        match self {
            #[cfg(feature = "backend-reqwest")]
            Backend::Reqwest(r) => r.execute(request).await,

            Backend::Custom(transport) => transport.execute(request).await,
        }
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "backend-reqwest")]
            Backend::Reqwest(_) => f.write_str("Backend::Reqwest"),
            Backend::Custom(_) => f.write_str("Backend::Custom"),
        }
    }
}
