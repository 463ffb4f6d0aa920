//! GraphQL infrastructure adapter for Metronome.
//!
//! Implements the core's [`metronome_core::ports::TransactionSource`]
//! port against a gno.land tx indexer's GraphQL query endpoint.

mod client;

pub use client::{GnoClientConfig, GnoIndexerClient};
