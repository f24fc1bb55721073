//! Dependency Probe Adapters
//!
//! Implements the `DependencyProbe` port for the three protocol kinds the
//! health monitor checks: HTTP request/response, WebSocket handshake and
//! pooled connection validation. Every probe is bounded by a timeout and
//! reports any transport problem as unavailable.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::{Client, Method};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tracing::debug;

use crate::domain::ports::{ConnectionPool, DependencyProbe};
use crate::error::{Error, Result};

// =============================================================================
// HTTP
// =============================================================================

/// Request/response probe. Available when the endpoint answers 2xx.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    method: Method,
    url: String,
}

impl HttpProbe {
    /// POST with an empty body. Redirects are not followed, so a 3xx reply
    /// counts as unavailable.
    pub fn post(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout, Policy::none())?,
            method: Method::POST,
            url: url.into(),
        })
    }

    /// GET, following redirects to the final response.
    pub fn get(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout, Policy::default())?,
            method: Method::GET,
            url: url.into(),
        })
    }

    async fn request(&self) -> Result<reqwest::StatusCode> {
        let mut request = self.client.request(self.method.clone(), &self.url);
        if self.method == Method::POST {
            request = request.body("");
        }
        let response = request.send().await.map_err(Error::Http)?;
        Ok(response.status())
    }
}

#[async_trait]
impl DependencyProbe for HttpProbe {
    fn protocol(&self) -> &'static str {
        "http"
    }

    async fn probe(&self) -> bool {
        match self.request().await {
            Ok(status) if status.is_success() => true,
            Ok(status) => {
                debug!("{} {} answered {}", self.method, self.url, status);
                false
            }
            Err(e) => {
                debug!("{} {} failed: {}", self.method, self.url, e);
                false
            }
        }
    }
}

fn http_client(timeout: Duration, redirect: Policy) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .redirect(redirect)
        .build()
        .map_err(Error::Http)
}

// =============================================================================
// WebSocket
// =============================================================================

/// Handshake probe. Available when a WebSocket upgrade completes within the
/// timeout; the connection is then closed in the background.
#[derive(Debug, Clone)]
pub struct WebSocketProbe {
    url: String,
    timeout: Duration,
}

impl WebSocketProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    async fn handshake(&self) -> Result<()> {
        let (mut stream, _) = timeout(self.timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| Error::timeout("websocket handshake", self.timeout))??;

        tokio::spawn(async move {
            if let Err(e) = stream.close(None).await {
                debug!("WebSocket close after probe failed: {}", e);
            }
        });
        Ok(())
    }
}

#[async_trait]
impl DependencyProbe for WebSocketProbe {
    fn protocol(&self) -> &'static str {
        "websocket"
    }

    async fn probe(&self) -> bool {
        match self.handshake().await {
            Ok(()) => true,
            Err(e) => {
                debug!("Handshake with {} failed: {}", self.url, e);
                false
            }
        }
    }
}

// =============================================================================
// Connection Pool
// =============================================================================

/// Pool probe. Leases one connection, asks whether it is open, and releases
/// the lease whatever the outcome.
#[derive(Clone)]
pub struct PoolProbe {
    pool: Arc<dyn ConnectionPool>,
    timeout: Duration,
}

impl PoolProbe {
    pub fn new(pool: Arc<dyn ConnectionPool>, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn validate(&self) -> Result<bool> {
        timeout(self.timeout, async {
            let mut connection = self.pool.acquire().await?;
            connection.is_open().await
        })
        .await
        .map_err(|_| Error::timeout("connection validation", self.timeout))?
    }
}

impl std::fmt::Debug for PoolProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolProbe")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl DependencyProbe for PoolProbe {
    fn protocol(&self) -> &'static str {
        "pool"
    }

    async fn probe(&self) -> bool {
        match self.validate().await {
            Ok(open) => open,
            Err(e) => {
                debug!("Connection validation failed: {}", e);
                false
            }
        }
    }
}
