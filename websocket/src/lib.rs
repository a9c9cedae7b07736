//!
//! [<img alt="github" src="https://img.shields.io/badge/github-workflow--rs/workflow--websocket-8da0cb?style=for-the-badge&labelColor=555555&color=8da0cb&logo=github" height="20">](https://github.com/workflow-rs/workflow-websocket)
//! [<img alt="crates.io" src="https://img.shields.io/crates/v/workflow-websocket.svg?maxAge=2592000&style=for-the-badge&color=fc8d62&logo=rust" height="20">](https://crates.io/crates/workflow-websocket)
//! [<img alt="docs.rs" src="https://img.shields.io/badge/docs.rs-workflow--websocket-56c2a5?maxAge=2592000&style=for-the-badge&logo=rust" height="20">](https://docs.rs/workflow-websocket)
//! <img alt="license" src="https://img.shields.io/crates/l/workflow-websocket.svg?maxAge=2592000&color=6ac&style=for-the-badge&logoColor=fff" height="20">
//!
//! <img src="https://img.shields.io/badge/server -native-informational?style=for-the-badge&color=50a0f0" height="20">
//!
//! [`workflow-websocket`](self) crate provides the async, tokio/tungstenite-backed
//! server half of the original client+server `workflow-websocket` package: a
//! transport-only [`server::WebSocketServer`] that accepts connections and
//! shuttles frames between the network and a handler trait, with no opinion
//! on message content. Higher-level protocols (request/response framing,
//! pub/sub, attachment streaming) are layered on top by their own crates.
//!
//! - [`server::WebSocketServer`] operates on native/tokio only.

pub mod server;
