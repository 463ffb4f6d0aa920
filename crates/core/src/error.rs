//! Error types for the collector domain layer.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`DomainError`] - Message classification/decoding errors
//! - [`ChainError`] - Upstream query API errors
//! - [`CollectorError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Domain Errors
// =============================================================================

/// Message classification and payload decoding failures.
///
/// These are always recoverable: the collector logs them and moves on
/// to the next message. They never abort a transaction or a block.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Payload decoding failed for a recognized message type.
    #[error("Decoding error for message type '{type_url}': {message}")]
    Decoding {
        /// Type tag of the message that failed to decode.
        type_url: String,
        /// Decoder error details.
        message: String,
    },
}

// =============================================================================
// Chain Errors
// =============================================================================

/// Upstream query API failures.
///
/// These errors occur when talking to the tx indexer's GraphQL
/// endpoint over HTTP.
#[derive(Debug, Error)]
pub enum ChainError {
    /// HTTP transport failed (connect, timeout, non-2xx status).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The endpoint answered with GraphQL-level errors.
    #[error("Query error: {0}")]
    Query(String),

    /// The response body did not match the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

// =============================================================================
// Collector Errors
// =============================================================================

/// Top-level collector orchestration errors.
///
/// This is the main error type returned by
/// [`crate::services::CollectorService`].
#[derive(Debug, Error)]
pub enum CollectorError {
    /// The initial height query failed.
    ///
    /// Without an initial height the catch-up phase cannot bound itself,
    /// so this is the one fatal runtime failure. Every later fetch
    /// failure is absorbed and retried.
    #[error("Failed to fetch initial block height: {source}")]
    InitialHeight {
        /// The underlying transport failure.
        #[source]
        source: ChainError,
    },

    /// Upstream query error.
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    /// Message decoding error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Graceful shutdown was requested.
    ///
    /// This is not really an error but uses the error type for control flow.
    #[error("Collector shutdown requested")]
    ShutdownRequested,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for collector operations.
pub type CollectorResult<T> = Result<T, CollectorError>;

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Result type for upstream query operations.
pub type ChainResult<T> = Result<T, ChainError>;
