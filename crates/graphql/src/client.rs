//! GraphQL query client backed by `reqwest`.
//!
//! A thin adapter: each call POSTs one query document plus variables
//! and unwraps the `{data, errors}` response envelope. Reliability is
//! the collector's concern - failed calls surface as [`ChainError`]s
//! and the collector decides whether they are fatal.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, trace};

use metronome_core::error::{ChainError, ChainResult};
use metronome_core::models::Transaction;
use metronome_core::ports::TransactionSource;

/// Query for the chain's latest block height.
const LATEST_HEIGHT_QUERY: &str = r#"
    query {
        latestBlockHeight
    }
"#;

/// Windowed transaction query with per-variant payload fragments.
///
/// The filter is an index range over the upstream's flat transaction
/// list; there is no height filter upstream.
const TRANSACTIONS_QUERY: &str = r#"
    query GetTransactions($fromIndex: Int!, $toIndex: Int!) {
        transactions(filter: {
            from_index: $fromIndex,
            to_index: $toIndex
        }) {
            hash
            block_height
            success
            messages {
                typeUrl
                route
                value {
                    ... on BankMsgSend {
                        from_address
                        to_address
                    }
                    ... on MsgAddPackage {
                        creator
                        package {
                            path
                            name
                        }
                    }
                }
            }
        }
    }
"#;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for [`GnoIndexerClient`].
#[derive(Debug, Clone)]
pub struct GnoClientConfig {
    /// GraphQL endpoint URL.
    pub endpoint: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for GnoClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8546/graphql/query".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

// =============================================================================
// Response envelope
// =============================================================================

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

/// One entry of the `errors` array.
#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct LatestHeightData {
    #[serde(rename = "latestBlockHeight")]
    latest_block_height: u64,
}

#[derive(Debug, Deserialize)]
struct TransactionsData {
    #[serde(default)]
    transactions: Vec<Transaction>,
}

/// Split the `{data, errors}` envelope into a result.
fn unwrap_envelope<T>(envelope: GraphQlResponse<T>) -> ChainResult<T> {
    if !envelope.errors.is_empty() {
        let joined = envelope
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ChainError::Query(joined));
    }

    envelope
        .data
        .ok_or_else(|| ChainError::InvalidResponse("response contained no data".to_string()))
}

// =============================================================================
// Client
// =============================================================================

/// Client adapter implementing the [`TransactionSource`] port.
pub struct GnoIndexerClient {
    endpoint: String,
    http: reqwest::Client,
}

impl GnoIndexerClient {
    /// Build a client for the configured endpoint.
    #[instrument(skip_all, fields(endpoint = %config.endpoint))]
    pub fn new(config: GnoClientConfig) -> ChainResult<Self> {
        debug!("Building indexer client");

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ChainError::Http(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint,
            http,
        })
    }

    /// Execute one query and unwrap its response envelope.
    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> ChainResult<T> {
        let body = json!({ "query": query, "variables": variables });

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ChainError::Http(format!("HTTP {status}: {body}")));
        }

        let envelope: GraphQlResponse<T> = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;

        unwrap_envelope(envelope)
    }
}

#[async_trait]
impl TransactionSource for GnoIndexerClient {
    #[instrument(skip(self))]
    async fn latest_block_height(&self) -> ChainResult<u64> {
        let data: LatestHeightData = self.execute(LATEST_HEIGHT_QUERY, json!({})).await?;
        trace!(height = data.latest_block_height, "Latest block height fetched");
        Ok(data.latest_block_height)
    }

    #[instrument(skip(self))]
    async fn transactions_in_window(
        &self,
        from_index: u64,
        to_index: u64,
    ) -> ChainResult<Vec<Transaction>> {
        let variables = json!({ "fromIndex": from_index, "toIndex": to_index });
        let data: TransactionsData = self.execute(TRANSACTIONS_QUERY, variables).await?;
        trace!(count = data.transactions.len(), "Transactions fetched");
        Ok(data.transactions)
    }
}
