//! Test server management

use lambdastub_invoke::{FunctionRegistry, IdentifierResolver, InvokeService, InvokeState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

/// Region the test server resolves bare names in
pub const TEST_REGION: &str = "us-east-1";

/// An in-process lambdastub server bound to an ephemeral port
///
/// The serving task is aborted when the server is dropped.
pub struct TestServer {
    handle: JoinHandle<()>,
    addr: SocketAddr,
    base_url: String,
}

impl TestServer {
    /// Start serving `registry` on `127.0.0.1:0`
    pub async fn start(registry: FunctionRegistry) -> Result<Self, TestError> {
        let service =
            InvokeService::new(registry).with_resolver(IdentifierResolver::new(TEST_REGION));
        Self::start_with_service(service).await
    }

    /// Start serving a preconfigured service
    pub async fn start_with_service(service: InvokeService) -> Result<Self, TestError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = lambdastub_invoke::router(Arc::new(InvokeState::new(service)));

        info!(port = addr.port(), "Starting lambdastub test server");

        // The listener is already bound, so requests queue up until the
        // task gets polled.
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "lambdastub test server stopped");
            }
        });

        Ok(Self {
            handle,
            addr,
            base_url: format!("http://{}", addr),
        })
    }

    /// Get the base URL
    pub fn url(&self) -> &str {
        &self.base_url
    }

    /// Get the port
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Get a client bound to this server
    pub fn client(&self) -> crate::StubClient {
        crate::StubClient::new(self.base_url.clone())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Errors that can occur with the test server
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    #[error("Failed to bind test server: {0}")]
    Bind(#[from] std::io::Error),
}
