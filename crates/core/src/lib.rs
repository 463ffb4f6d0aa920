//! Core domain layer for the Metronome collector.
//!
//! This crate contains the domain models, port traits (interfaces), and
//! business logic services for the gno.land chain metrics collector. It
//! follows hexagonal architecture principles - this is the innermost
//! layer with no dependencies on infrastructure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    metronome (binary)                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   metronome-graphql                         │
//! │               (upstream query client)                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   metronome-core  ← YOU ARE HERE            │
//! │             (models, ports, services, metrics)              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Domain models (Transaction, TransactionMessage, Cursor)
//! - [`ports`] - Interface traits for adapters to implement
//! - [`services`] - Core business logic (CollectorService, classifier)
//! - [`error`] - Domain error types
//! - [`metrics`] - Prometheus metric definitions
//!
//! # Key Concepts
//!
//! ## Ports
//!
//! Ports define interfaces that external adapters must implement:
//!
//! - [`ports::TransactionSource`] - Query the chain's transaction stream
//! - [`ports::MetricSink`] - Counter/gauge registry the collector folds
//!   events into
//!
//! ## Collector Lifecycle
//!
//! 1. Fetch the chain's current height (fatal if unreachable)
//! 2. Catch up: replay every historical block up to that height
//! 3. Tail: poll for new blocks on a fixed interval, forever
//!
//! Each block's transactions are classified and folded into the metric
//! sink; the cursor advances only after a block is fully processed.

pub mod error;
pub mod metrics;
pub mod models;
pub mod ports;
pub mod services;
