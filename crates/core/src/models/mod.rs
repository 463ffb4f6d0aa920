//! Domain models for the gno.land transaction stream.
//!
//! These models mirror the shapes served by the tx indexer's GraphQL
//! API and are storage-agnostic. Transactions are immutable once
//! fetched; the success flag is trusted verbatim.

use serde::{Deserialize, Serialize};

// =============================================================================
// Cursor
// =============================================================================

/// Highest block height fully folded into the metric sink.
///
/// Owned exclusively by the collector service and advanced only after a
/// block's transactions have all been processed. Monotonically
/// non-decreasing. Never persisted: a restart resets it to genesis and
/// reprocesses history into a fresh in-memory sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor(u64);

impl Cursor {
    /// Cursor at process start, before any block has been processed.
    pub const fn genesis() -> Self {
        Self(0)
    }

    /// Highest fully processed height (0 at genesis).
    pub fn height(&self) -> u64 {
        self.0
    }

    /// First height not yet processed.
    pub fn next(&self) -> u64 {
        self.0 + 1
    }

    /// Advance to `height`. The cursor never moves backwards.
    pub fn advance(&mut self, height: u64) {
        self.0 = self.0.max(height);
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Transactions
// =============================================================================

/// A transaction as served by the tx indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction hash (base64, as served upstream).
    pub hash: String,
    /// Height of the block containing this transaction.
    pub block_height: u64,
    /// Whether execution succeeded.
    pub success: bool,
    /// Messages in execution order.
    #[serde(default)]
    pub messages: Vec<TransactionMessage>,
}

/// One message inside a transaction.
///
/// The payload stays raw until the type tag has been inspected;
/// decoding into a typed variant is the classifier's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionMessage {
    /// Message type tag (e.g. "send", "add_package").
    #[serde(rename = "typeUrl")]
    pub type_url: String,
    /// Routing key (e.g. "bank", "vm").
    #[serde(default)]
    pub route: String,
    /// Variant-dependent payload, decoded lazily by the classifier.
    #[serde(default)]
    pub value: serde_json::Value,
}

// =============================================================================
// Typed Message Payloads
// =============================================================================

/// Payload of a `send` bank message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankMsgSend {
    /// Sender address.
    pub from_address: String,
    /// Recipient address.
    pub to_address: String,
}

/// Payload of an `add_package` VM message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsgAddPackage {
    /// Address that deployed the package.
    pub creator: String,
    /// The deployed package.
    pub package: MemPackage,
}

/// Package descriptor inside [`MsgAddPackage`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemPackage {
    /// Package path (e.g. "gno.land/p/demo").
    pub path: String,
    /// Package name.
    pub name: String,
}

// =============================================================================
// Tests
// =============================================================================
