// LTM Gateway - Error Kinds
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Two disjoint channels. GatewayError is domain-level: caught at the tool
// dispatcher and returned as a success:false envelope. ProtocolError is
// protocol-level: aborts one JSON-RPC request with a code.

use thiserror::Error;

/// Lifecycle preconditions a tool call can violate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Operation needs an awake session
    Awake,
    /// Operation needs an in-progress conversation
    ActiveConversation,
}

impl std::fmt::Display for Precondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Precondition::Awake => f.write_str("System must be awakened first"),
            Precondition::ActiveConversation => f.write_str("No active conversation to end"),
        }
    }
}

/// Domain-level failure. Always recoverable by the caller.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    PreconditionFailed(Precondition),

    #[error("{0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}

impl GatewayError {
    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::PreconditionFailed(_) => "precondition_failed",
            GatewayError::InvalidArgument(_) => "invalid_argument",
            GatewayError::Engine(_) => "engine",
        }
    }
}

/// Protocol-level failure for a single request
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    MethodNotFound(String),

    #[error("{0}")]
    InvalidParams(String),

    #[error("{0}")]
    Internal(String),

    #[error("{0}")]
    Parse(String),
}

impl ProtocolError {
    /// JSON-RPC error code
    pub fn code(&self) -> i64 {
        match self {
            ProtocolError::NotFound(_) => -32002,
            ProtocolError::InvalidRequest(_) => -32600,
            ProtocolError::MethodNotFound(_) => -32601,
            ProtocolError::InvalidParams(_) => -32602,
            ProtocolError::Internal(_) => -32603,
            ProtocolError::Parse(_) => -32700,
        }
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
