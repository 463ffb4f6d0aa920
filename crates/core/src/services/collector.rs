//! Collector service - orchestrates block ingestion.
//!
//! The collector runs two sequential phases:
//!
//! 1. **Catch-up**: replay every block from the cursor up to the chain
//!    height captured at startup.
//! 2. **Tail**: re-query the height on a fixed interval and replay any
//!    newly produced blocks. This phase runs for the process lifetime.
//!
//! Both phases share the same per-block procedure: fetch a transaction
//! window, filter it to the block's height, fold each transaction into
//! the metric sink, then advance the cursor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{CollectorError, CollectorResult};
use crate::metrics;
use crate::models::{Cursor, Transaction};
use crate::ports::{MetricSink, TransactionSource};
use crate::services::classifier::{classify, MessageEvent};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the collector service.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Interval between height polls in the tail phase.
    pub poll_interval: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
        }
    }
}

// The upstream query cannot filter transactions by height, so every
// block fetch pulls one oversized index window off the flat transaction
// list and filters client-side. Known inefficiency, kept as-is rather
// than assuming a better upstream capability exists.
const WINDOW_FROM_INDEX: u64 = 0;
const WINDOW_TO_INDEX: u64 = 99_999;

// =============================================================================
// CollectorService
// =============================================================================

/// Main collector service.
///
/// # Flow
///
/// 1. Fetch the chain's current height (fatal if unreachable)
/// 2. Catch up: process every historical block up to that height
/// 3. Tail: poll for new blocks and process them as they appear
///
/// The cursor advances after a block's transactions have been folded
/// into the sink, never before, so a scrape cannot observe a height the
/// metrics do not cover yet.
pub struct CollectorService<S: TransactionSource, M: MetricSink> {
    config: CollectorConfig,
    source: Arc<S>,
    sink: Arc<M>,
    cursor: Cursor,
}

impl<S: TransactionSource, M: MetricSink> CollectorService<S, M> {
    pub fn new(config: CollectorConfig, source: Arc<S>, sink: Arc<M>) -> Self {
        Self {
            config,
            source,
            sink,
            cursor: Cursor::genesis(),
        }
    }

    /// Highest fully processed block height.
    pub fn last_processed_height(&self) -> u64 {
        self.cursor.height()
    }

    /// Run the collector until shutdown.
    ///
    /// Returns an error only for the fatal initial height fetch or a
    /// requested shutdown; every later failure is absorbed and logged.
    #[instrument(skip_all)]
    pub async fn run(&mut self, mut shutdown_rx: watch::Receiver<bool>) -> CollectorResult<()> {
        let latest = self
            .source
            .latest_block_height()
            .await
            .map_err(|source| CollectorError::InitialHeight { source })?;

        info!(height = latest, "⛓️  Chain head detected");

        self.catch_up(latest, &mut shutdown_rx).await?;
        self.tail(&mut shutdown_rx).await
    }

    /// Replay every block from the cursor up to `target`.
    ///
    /// A `target` at or below the cursor means there is no historical
    /// work; the collector proceeds straight to the tail phase.
    #[instrument(skip(self, shutdown_rx))]
    async fn catch_up(
        &mut self,
        target: u64,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> CollectorResult<()> {
        if self.cursor.height() >= target {
            debug!("No historical blocks to process");
            return Ok(());
        }

        info!(
            from = self.cursor.next(),
            to = target,
            "Processing historical blocks"
        );

        for height in self.cursor.next()..=target {
            if *shutdown_rx.borrow() {
                debug!("Shutdown requested");
                return Err(CollectorError::ShutdownRequested);
            }
            self.process_block(height).await;
        }

        info!(height = target, "✅ Finished processing historical blocks");
        Ok(())
    }

    /// Poll for new blocks until shutdown.
    ///
    /// This phase has no terminal state: a failed height query is
    /// logged and retried on the next tick, never escalated.
    #[instrument(skip_all)]
    async fn tail(&mut self, shutdown_rx: &mut watch::Receiver<bool>) -> CollectorResult<()> {
        info!(
            interval_ms = self.config.poll_interval.as_millis() as u64,
            "📡 Tailing new blocks"
        );

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        // A slow block burst must not be followed by a tick burst.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown_rx.changed() => {}
            }

            if *shutdown_rx.borrow() {
                debug!("Shutdown requested");
                return Err(CollectorError::ShutdownRequested);
            }

            self.drain_new_blocks(shutdown_rx).await?;
        }
    }

    /// One tail pass: re-query the head and process anything new.
    async fn drain_new_blocks(
        &mut self,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> CollectorResult<()> {
        let latest = match self.source.latest_block_height().await {
            Ok(latest) => latest,
            Err(e) => {
                warn!(error = %e, "⚠️  Failed to fetch latest block height, retrying next tick");
                return Ok(());
            }
        };

        for height in self.cursor.next()..=latest {
            if *shutdown_rx.borrow() {
                debug!("Shutdown requested");
                return Err(CollectorError::ShutdownRequested);
            }
            self.process_block(height).await;
            info!(height, "Processed new block");
        }

        Ok(())
    }

    /// Process a single block's transactions and advance the cursor.
    ///
    /// The cursor and progress metrics advance even when the window
    /// fetch fails: the pipeline keeps no per-block retry state, so a
    /// failed window is logged and the stream moves on.
    #[instrument(skip(self))]
    async fn process_block(&mut self, height: u64) {
        match self
            .source
            .transactions_in_window(WINDOW_FROM_INDEX, WINDOW_TO_INDEX)
            .await
        {
            Ok(transactions) => {
                let block_txs: Vec<&Transaction> = transactions
                    .iter()
                    .filter(|tx| tx.block_height == height)
                    .collect();

                trace!(count = block_txs.len(), "Transactions found in block");

                for tx in block_txs {
                    self.process_transaction(tx);
                }
            }
            Err(e) => {
                warn!(error = %e, "⚠️  Failed to query transactions, skipping block");
            }
        }

        self.cursor.advance(height);
        self.sink.increment_counter(metrics::BLOCKS_PROCESSED_TOTAL);
        self.sink
            .set_gauge(metrics::LATEST_PROCESSED_HEIGHT, height as f64);
        debug!("Block processed");
    }

    /// Fold one transaction into the sink.
    ///
    /// Order matters: the total counter first, then exactly one of the
    /// success/failure counters, then each message in sequence order.
    /// A message that fails to decode never blocks the ones after it.
    fn process_transaction(&self, tx: &Transaction) {
        self.sink.increment_counter(metrics::TRANSACTIONS_TOTAL);

        if tx.success {
            self.sink
                .increment_counter(metrics::TRANSACTIONS_SUCCESS_TOTAL);
        } else {
            self.sink
                .increment_counter(metrics::TRANSACTIONS_FAILED_TOTAL);
        }

        trace!(
            hash = %tx.hash,
            success = tx.success,
            messages = tx.messages.len(),
            "Processing transaction"
        );

        for message in &tx.messages {
            match classify(message) {
                Ok(MessageEvent::Send { from }) => {
                    self.sink.increment_labeled(
                        metrics::SENDER_ACTIVITY_TOTAL,
                        metrics::LABEL_ADDRESS,
                        &from,
                    );
                }
                Ok(MessageEvent::AddPackage {
                    creator,
                    package_path,
                }) => {
                    self.sink.increment_labeled(
                        metrics::SENDER_ACTIVITY_TOTAL,
                        metrics::LABEL_ADDRESS,
                        &creator,
                    );
                    self.sink.increment_labeled(
                        metrics::PACKAGE_ACTIVITY_TOTAL,
                        metrics::LABEL_PACKAGE_PATH,
                        &package_path,
                    );
                }
                Ok(MessageEvent::Unknown) => {
                    debug!(type_url = %message.type_url, "Unknown message type");
                }
                Err(e) => {
                    warn!(hash = %tx.hash, error = %e, "Failed to decode message, skipping");
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ChainError, ChainResult};
    use crate::models::TransactionMessage;

    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Scripted source: a fixed flat transaction list plus a queue of
    /// height responses (the last entry repeats once drained).
    struct ScriptedSource {
        heights: Mutex<VecDeque<Result<u64, &'static str>>>,
        transactions: Vec<Transaction>,
        fail_window: bool,
    }

    impl ScriptedSource {
        fn new(heights: Vec<Result<u64, &'static str>>, transactions: Vec<Transaction>) -> Self {
            Self {
                heights: Mutex::new(heights.into()),
                transactions,
                fail_window: false,
            }
        }

        fn with_failing_window(mut self) -> Self {
            self.fail_window = true;
            self
        }
    }

    #[async_trait]
    impl TransactionSource for ScriptedSource {
        async fn latest_block_height(&self) -> ChainResult<u64> {
            let mut queue = self.heights.lock().unwrap();
            let entry = if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                *queue.front().expect("height script exhausted")
            };
            entry.map_err(|msg| ChainError::Http(msg.to_string()))
        }

        async fn transactions_in_window(
            &self,
            _from_index: u64,
            _to_index: u64,
        ) -> ChainResult<Vec<Transaction>> {
            if self.fail_window {
                return Err(ChainError::Http("window fetch failed".into()));
            }
            Ok(self.transactions.clone())
        }
    }

    /// In-memory sink recording every update for assertions.
    #[derive(Default)]
    struct RecordingSink {
        counters: Mutex<HashMap<String, u64>>,
        labeled: Mutex<HashMap<(String, String, String), u64>>,
        gauges: Mutex<HashMap<String, f64>>,
    }

    impl RecordingSink {
        fn counter(&self, name: &str) -> u64 {
            *self.counters.lock().unwrap().get(name).unwrap_or(&0)
        }

        fn labeled(&self, name: &str, label: &str, value: &str) -> u64 {
            *self
                .labeled
                .lock()
                .unwrap()
                .get(&(name.into(), label.into(), value.into()))
                .unwrap_or(&0)
        }

        fn labeled_count(&self, name: &str) -> usize {
            self.labeled
                .lock()
                .unwrap()
                .keys()
                .filter(|(n, _, _)| n == name)
                .count()
        }

        fn gauge(&self, name: &str) -> Option<f64> {
            self.gauges.lock().unwrap().get(name).copied()
        }

        fn snapshot(&self) -> (HashMap<String, u64>, HashMap<(String, String, String), u64>) {
            (
                self.counters.lock().unwrap().clone(),
                self.labeled.lock().unwrap().clone(),
            )
        }
    }

    impl MetricSink for RecordingSink {
        fn increment_counter(&self, name: &'static str) {
            *self.counters.lock().unwrap().entry(name.into()).or_insert(0) += 1;
        }

        fn increment_labeled(&self, name: &'static str, label: &'static str, value: &str) {
            *self
                .labeled
                .lock()
                .unwrap()
                .entry((name.into(), label.into(), value.into()))
                .or_insert(0) += 1;
        }

        fn set_gauge(&self, name: &'static str, value: f64) {
            self.gauges.lock().unwrap().insert(name.into(), value);
        }
    }

    fn send_message(from: &str) -> TransactionMessage {
        TransactionMessage {
            type_url: "send".into(),
            route: "bank".into(),
            value: json!({ "from_address": from, "to_address": "g1recv" }),
        }
    }

    fn add_package_message(creator: &str, path: &str) -> TransactionMessage {
        TransactionMessage {
            type_url: "add_package".into(),
            route: "vm".into(),
            value: json!({ "creator": creator, "package": { "path": path, "name": "demo" } }),
        }
    }

    fn tx(height: u64, success: bool, messages: Vec<TransactionMessage>) -> Transaction {
        Transaction {
            hash: format!("tx-{height}-{}", messages.len()),
            block_height: height,
            success,
            messages,
        }
    }

    /// The 3-block scenario: heights 1-3 with 2, 0, 1 transactions, all
    /// successful, one send from addr1 in block 1, one add_package by
    /// addr2 at gno.land/p/demo in block 3.
    fn scenario_transactions() -> Vec<Transaction> {
        vec![
            tx(1, true, vec![send_message("addr1")]),
            tx(1, true, vec![]),
            tx(3, true, vec![add_package_message("addr2", "gno.land/p/demo")]),
        ]
    }

    fn service(
        heights: Vec<Result<u64, &'static str>>,
        transactions: Vec<Transaction>,
    ) -> (
        CollectorService<ScriptedSource, RecordingSink>,
        Arc<RecordingSink>,
    ) {
        let sink = Arc::new(RecordingSink::default());
        let svc = CollectorService::new(
            CollectorConfig::default(),
            Arc::new(ScriptedSource::new(heights, transactions)),
            sink.clone(),
        );
        (svc, sink)
    }

    // borrow() keeps answering after the sender drops, which is all the
    // catch-up path looks at
    fn idle_shutdown() -> watch::Receiver<bool> {
        let (_tx, rx) = watch::channel(false);
        rx
    }

    #[tokio::test]
    async fn catch_up_folds_historical_blocks() {
        let (mut svc, sink) = service(vec![Ok(3)], scenario_transactions());
        let mut shutdown = idle_shutdown();

        svc.catch_up(3, &mut shutdown).await.unwrap();

        assert_eq!(sink.counter(metrics::TRANSACTIONS_TOTAL), 3);
        assert_eq!(sink.counter(metrics::TRANSACTIONS_SUCCESS_TOTAL), 3);
        assert_eq!(sink.counter(metrics::TRANSACTIONS_FAILED_TOTAL), 0);
        assert_eq!(sink.counter(metrics::BLOCKS_PROCESSED_TOTAL), 3);
        assert_eq!(sink.gauge(metrics::LATEST_PROCESSED_HEIGHT), Some(3.0));
        assert_eq!(
            sink.labeled(metrics::SENDER_ACTIVITY_TOTAL, "address", "addr1"),
            1
        );
        assert_eq!(
            sink.labeled(metrics::SENDER_ACTIVITY_TOTAL, "address", "addr2"),
            1
        );
        assert_eq!(
            sink.labeled(
                metrics::PACKAGE_ACTIVITY_TOTAL,
                "package_path",
                "gno.land/p/demo"
            ),
            1
        );
        assert_eq!(svc.last_processed_height(), 3);
    }

    #[tokio::test]
    async fn catch_up_with_zero_target_is_a_noop() {
        let (mut svc, sink) = service(vec![Ok(0)], vec![]);
        let mut shutdown = idle_shutdown();

        svc.catch_up(0, &mut shutdown).await.unwrap();

        assert_eq!(sink.counter(metrics::BLOCKS_PROCESSED_TOTAL), 0);
        assert_eq!(sink.gauge(metrics::LATEST_PROCESSED_HEIGHT), None);
        assert_eq!(svc.last_processed_height(), 0);
    }

    #[tokio::test]
    async fn empty_block_still_advances_cursor() {
        // Transactions only at height 1; height 2 is empty
        let (mut svc, sink) = service(vec![Ok(2)], vec![tx(1, true, vec![])]);
        let mut shutdown = idle_shutdown();

        svc.catch_up(2, &mut shutdown).await.unwrap();

        assert_eq!(sink.counter(metrics::TRANSACTIONS_TOTAL), 1);
        assert_eq!(sink.counter(metrics::BLOCKS_PROCESSED_TOTAL), 2);
        assert_eq!(sink.gauge(metrics::LATEST_PROCESSED_HEIGHT), Some(2.0));
        assert_eq!(svc.last_processed_height(), 2);
    }

    #[tokio::test]
    async fn success_and_failure_counters_are_exclusive() {
        let txs = vec![tx(1, true, vec![]), tx(1, false, vec![])];
        let (mut svc, sink) = service(vec![Ok(1)], txs);
        let mut shutdown = idle_shutdown();

        svc.catch_up(1, &mut shutdown).await.unwrap();

        assert_eq!(sink.counter(metrics::TRANSACTIONS_TOTAL), 2);
        assert_eq!(sink.counter(metrics::TRANSACTIONS_SUCCESS_TOTAL), 1);
        assert_eq!(sink.counter(metrics::TRANSACTIONS_FAILED_TOTAL), 1);
    }

    #[tokio::test]
    async fn unknown_message_type_is_a_noop() {
        let unknown = TransactionMessage {
            type_url: "exec".into(),
            route: "vm".into(),
            value: json!({ "caller": "g1someone" }),
        };
        let (mut svc, sink) = service(vec![Ok(1)], vec![tx(1, true, vec![unknown])]);
        let mut shutdown = idle_shutdown();

        svc.catch_up(1, &mut shutdown).await.unwrap();

        assert_eq!(sink.counter(metrics::TRANSACTIONS_TOTAL), 1);
        assert_eq!(sink.labeled_count(metrics::SENDER_ACTIVITY_TOTAL), 0);
        assert_eq!(sink.labeled_count(metrics::PACKAGE_ACTIVITY_TOTAL), 0);
    }

    #[tokio::test]
    async fn malformed_payload_skips_that_message_only() {
        let malformed = TransactionMessage {
            type_url: "send".into(),
            route: "bank".into(),
            value: json!(42),
        };
        let txs = vec![tx(1, true, vec![malformed, send_message("addr-ok")])];
        let (mut svc, sink) = service(vec![Ok(1)], txs);
        let mut shutdown = idle_shutdown();

        svc.catch_up(1, &mut shutdown).await.unwrap();

        // The transaction itself still counts, and the good message
        // after the malformed one is processed.
        assert_eq!(sink.counter(metrics::TRANSACTIONS_TOTAL), 1);
        assert_eq!(sink.labeled_count(metrics::SENDER_ACTIVITY_TOTAL), 1);
        assert_eq!(
            sink.labeled(metrics::SENDER_ACTIVITY_TOTAL, "address", "addr-ok"),
            1
        );
    }

    #[tokio::test]
    async fn catch_up_is_deterministic_over_identical_input() {
        let (mut first, first_sink) = service(vec![Ok(3)], scenario_transactions());
        let (mut second, second_sink) = service(vec![Ok(3)], scenario_transactions());
        let mut shutdown = idle_shutdown();

        first.catch_up(3, &mut shutdown).await.unwrap();
        second.catch_up(3, &mut shutdown).await.unwrap();

        assert_eq!(first_sink.snapshot(), second_sink.snapshot());
    }

    #[tokio::test]
    async fn tail_pass_processes_only_new_blocks() {
        // Head advances from 3 to 5 between ticks
        let (mut svc, sink) = service(vec![Ok(5)], vec![]);
        let mut shutdown = idle_shutdown();

        svc.catch_up(3, &mut shutdown).await.unwrap();
        assert_eq!(sink.counter(metrics::BLOCKS_PROCESSED_TOTAL), 3);

        // First pass: exactly blocks 4 and 5
        svc.drain_new_blocks(&mut shutdown).await.unwrap();
        assert_eq!(sink.counter(metrics::BLOCKS_PROCESSED_TOTAL), 5);
        assert_eq!(svc.last_processed_height(), 5);

        // Second pass at the same head: nothing to do
        svc.drain_new_blocks(&mut shutdown).await.unwrap();
        assert_eq!(sink.counter(metrics::BLOCKS_PROCESSED_TOTAL), 5);
        assert_eq!(svc.last_processed_height(), 5);
    }

    #[tokio::test]
    async fn tail_pass_survives_height_query_failure() {
        let (mut svc, sink) = service(vec![Err("boom"), Ok(4)], vec![]);
        let mut shutdown = idle_shutdown();

        svc.catch_up(3, &mut shutdown).await.unwrap();

        // Failed height query: logged, cursor untouched
        svc.drain_new_blocks(&mut shutdown).await.unwrap();
        assert_eq!(svc.last_processed_height(), 3);
        assert_eq!(sink.counter(metrics::BLOCKS_PROCESSED_TOTAL), 3);

        // Next tick recovers
        svc.drain_new_blocks(&mut shutdown).await.unwrap();
        assert_eq!(svc.last_processed_height(), 4);
        assert_eq!(sink.counter(metrics::BLOCKS_PROCESSED_TOTAL), 4);
    }

    #[tokio::test]
    async fn window_fetch_failure_still_advances_cursor() {
        let sink = Arc::new(RecordingSink::default());
        let source = ScriptedSource::new(vec![Ok(2)], scenario_transactions());
        let mut svc = CollectorService::new(
            CollectorConfig::default(),
            Arc::new(source.with_failing_window()),
            sink.clone(),
        );
        let mut shutdown = idle_shutdown();

        svc.catch_up(2, &mut shutdown).await.unwrap();

        // No transactions folded, but progress still recorded
        assert_eq!(sink.counter(metrics::TRANSACTIONS_TOTAL), 0);
        assert_eq!(sink.counter(metrics::BLOCKS_PROCESSED_TOTAL), 2);
        assert_eq!(svc.last_processed_height(), 2);
    }

    #[tokio::test]
    async fn run_fails_fast_without_initial_height() {
        let (mut svc, sink) = service(vec![Err("unreachable")], vec![]);
        let (_tx, rx) = watch::channel(false);

        let err = svc.run(rx).await.unwrap_err();
        assert!(matches!(err, CollectorError::InitialHeight { .. }));
        assert_eq!(sink.counter(metrics::BLOCKS_PROCESSED_TOTAL), 0);
    }

    #[tokio::test]
    async fn catch_up_stops_on_shutdown() {
        let (mut svc, sink) = service(vec![Ok(3)], scenario_transactions());
        let (tx, mut rx) = watch::channel(true);

        let err = svc.catch_up(3, &mut rx).await.unwrap_err();
        assert!(matches!(err, CollectorError::ShutdownRequested));
        assert_eq!(sink.counter(metrics::BLOCKS_PROCESSED_TOTAL), 0);
        drop(tx);
    }
}
