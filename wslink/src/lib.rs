//!
//! [<img alt="github" src="https://img.shields.io/badge/github-workflow--rs-8da0cb?style=for-the-badge&labelColor=555555&color=8da0cb&logo=github" height="20">](https://github.com/workflow-rs/workflow-rs)
//! <img alt="license" src="https://img.shields.io/crates/l/wslink.svg?maxAge=2592000&color=6ac&style=for-the-badge&logoColor=fff" height="20">
//! <img src="https://img.shields.io/badge/platform- native-informational?style=for-the-badge&color=50a0f0" height="20">
//!
//! `wslink` is a bidirectional JSON-RPC-style messaging protocol layered
//! over WebSocket, with out-of-band binary attachment streaming,
//! server-initiated publish/subscribe, and a timeout-driven server
//! lifecycle.
//!
//! A consumer implements [`registry::Protocol`] on their own type,
//! registers RPC methods in [`registry::Protocol::register`], and hands
//! an `Arc` of it to [`server::WslinkServer::build`]:
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use wslink::argument::Argument;
//! use wslink::registry::{MethodRegistry, Protocol};
//! use wslink::server::{ServerConfig, WslinkServer};
//!
//! struct Echo;
//!
//! impl Protocol for Echo {
//!     fn secret(&self) -> String {
//!         "secret".to_string()
//!     }
//!
//!     fn register(self: Arc<Self>, registry: &mut MethodRegistry) {
//!         registry.method("echo.blob", |mut args, _kwargs| {
//!             Box::pin(async move { Ok(args.pop().unwrap_or(Argument::Null)) })
//!         });
//!     }
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::new("127.0.0.1", 8765, Duration::from_secs(30), "secret");
//! let server = WslinkServer::build(Arc::new(Echo), config);
//! server.start().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Out of scope (external collaborators, per spec §1): HTTP route
//! mounting and static file serving, TLS termination, process
//! launcher/CLI, logging configuration, signal handling.

pub mod argument;
pub mod attachments;
pub mod error;
pub mod handler;
pub mod id;
pub mod messages;
pub mod publish;
pub mod registry;
pub mod server;
pub mod session;

pub use error::{Error, ErrorCode, MethodError, Result};
pub use handler::WslinkHandler;
pub use id::ClientId;
pub use messages::WireMessage;
pub use registry::{HandlerContext, MethodRegistry, Protocol};
pub use server::{ServerConfig, WslinkServer};
