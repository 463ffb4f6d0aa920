//! Port trait for the upstream transaction data source.
//!
//! This trait defines the interface for querying the chain's current
//! height and its transaction stream. Implementations live in the
//! infrastructure layer (e.g., `metronome-graphql`).

use async_trait::async_trait;

use crate::error::ChainResult;
use crate::models::Transaction;

/// Port trait for the chain's transaction stream.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Latest block height known to the upstream indexer.
    async fn latest_block_height(&self) -> ChainResult<u64>;

    /// Transactions in an index window over the upstream's flat
    /// transaction list.
    ///
    /// The window is an index range, not a height range: the upstream
    /// query cannot filter by height, so callers over-fetch and filter
    /// client-side.
    async fn transactions_in_window(
        &self,
        from_index: u64,
        to_index: u64,
    ) -> ChainResult<Vec<Transaction>>;
}
