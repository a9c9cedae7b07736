//!
//! [`enum@Error`] and [`ErrorCode`] declarations used throughout the crate.
//!
//! Mirrors the `workflow-rpc` split between transport-level failures
//! (this [`enum@Error`]) and the protocol-level error taxonomy carried
//! on the wire ([`ErrorCode`]).
//!

use thiserror::Error;

/// Transport and framing failures. These never reach the wire directly;
/// they either abort a connection or are logged and swallowed.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    WebSocket(#[from] workflow_websocket::server::Error),

    #[error("channel send error")]
    ChannelSend,

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for Error {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Error::ChannelSend
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Stable integer error codes carried in the wire `error.code` field
/// (spec §7). Values are an implementation choice but must not change
/// once published, since clients key off of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode(pub i64);

impl ErrorCode {
    pub const AUTHENTICATION_ERROR: ErrorCode = ErrorCode(1);
    pub const METHOD_NOT_FOUND: ErrorCode = ErrorCode(2);
    pub const EXCEPTION_ERROR: ErrorCode = ErrorCode(3);
    pub const RESULT_SERIALIZE_ERROR: ErrorCode = ErrorCode(4);
}

/// Failure returned by a user-supplied RPC method (spec §4.5: "On
/// invocation failure, reply `EXCEPTION_ERROR`"). Never propagated as a
/// panic out of the read loop — the dispatch boundary in `handler`
/// folds this into a wire-level error reply.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct MethodError {
    pub message: String,
}

impl MethodError {
    pub fn new(message: impl Into<String>) -> Self {
        MethodError {
            message: message.into(),
        }
    }
}

impl From<String> for MethodError {
    fn from(message: String) -> Self {
        MethodError { message }
    }
}

impl From<&str> for MethodError {
    fn from(message: &str) -> Self {
        MethodError::new(message)
    }
}
