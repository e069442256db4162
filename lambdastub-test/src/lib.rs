//! Test utilities for lambdastub
//!
//! Runs the invoke endpoint in-process on an ephemeral port and talks to it
//! over plain HTTP, so tests can see the exact status codes and headers.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lambdastub_invoke::{FunctionRegistry, Handler};
//! use lambdastub_test::TestServer;
//! use std::convert::Infallible;
//!
//! #[tokio::test]
//! async fn test_greeter() {
//!     let registry = FunctionRegistry::builder()
//!         .register("Greeter", Handler::no_input(|| async { Ok::<_, Infallible>("hi") }))
//!         .build()
//!         .unwrap();
//!     let server = TestServer::start(registry).await.unwrap();
//!
//!     let response = server.client().invoke("Greeter").send().await.unwrap();
//!     assert_eq!(response.status, 200);
//! }
//! ```

pub mod client;
pub mod server;

pub use client::{ClientError, InvokeCall, InvokeResponse, StubClient};
pub use server::{TestError, TestServer};

/// API version segment used by the SDKs
pub const API_VERSION: &str = "2015-03-31";
