use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::consensus::Transaction as TxFields;
use alloy::network::TransactionResponse;
use alloy::primitives::B256;
use alloy::providers::{DynProvider, Provider};
use alloy::rpc::types::{Filter, Log};
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use chainwatch_common::types::{LogEntry, TransactionEvent};
use chainwatch_engine::{BalanceFetcher, MonitorSet, TransactionReport};

/// Block poller that feeds every transaction of each new block to the monitors.
pub struct BlockPoller {
    provider: DynProvider,
    monitors: Arc<MonitorSet>,
    /// Caches emptied after each block so "latest" balances do not go stale.
    fetchers: Vec<Arc<BalanceFetcher>>,
    poll_interval: Duration,
    max_concurrent_txs: usize,
    start_block: Option<u64>,
}

impl BlockPoller {
    pub fn new(
        provider: DynProvider,
        monitors: Arc<MonitorSet>,
        poll_interval_ms: u64,
        max_concurrent_txs: usize,
    ) -> Self {
        Self {
            provider,
            monitors,
            fetchers: Vec::new(),
            poll_interval: Duration::from_millis(poll_interval_ms),
            max_concurrent_txs: max_concurrent_txs.max(1),
            start_block: None,
        }
    }

    pub fn with_fetchers(mut self, fetchers: Vec<Arc<BalanceFetcher>>) -> Self {
        self.fetchers = fetchers;
        self
    }

    pub fn with_start_block(mut self, start_block: Option<u64>) -> Self {
        self.start_block = start_block;
        self
    }

    /// Start the polling loop. Runs indefinitely until the task is cancelled.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let mut current_block = match self.start_block {
            Some(block) => block,
            None => {
                let latest = self.provider.get_block_number().await?;
                tracing::info!(block = latest, "No start block configured, starting from latest");
                latest
            }
        };

        tracing::info!(
            start_block = current_block,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            monitors = ?self.monitors.names(),
            "Block poller started"
        );

        loop {
            match self.poll_block(current_block).await {
                Ok(Some(transactions)) => {
                    let reports = evaluate_block(
                        self.monitors.clone(),
                        transactions,
                        self.max_concurrent_txs,
                    )
                    .await;
                    emit(current_block, &reports);

                    for fetcher in &self.fetchers {
                        fetcher.clear();
                    }
                    current_block += 1;
                }
                Ok(None) => {
                    tracing::debug!(block = current_block, "Block not yet available, waiting...");
                    tokio::time::sleep(self.poll_interval).await;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        block = current_block,
                        error = %e,
                        "Failed to fetch block, retrying"
                    );
                    tokio::time::sleep(self.poll_interval).await;
                    continue;
                }
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Fetch a block with its transactions and logs.
    ///
    /// `Ok(None)` means the block has not been produced yet.
    pub async fn poll_block(
        &self,
        block_number: u64,
    ) -> anyhow::Result<Option<Vec<TransactionEvent>>> {
        let Some(block) = self
            .provider
            .get_block_by_number(block_number.into())
            .full()
            .await?
        else {
            return Ok(None);
        };

        let block_timestamp = block_time(block.header.timestamp);

        let filter = Filter::new().from_block(block_number).to_block(block_number);
        let mut logs = group_logs(&self.provider.get_logs(&filter).await?);

        let transactions: Vec<TransactionEvent> = block
            .transactions
            .txns()
            .map(|tx| {
                let hash = TransactionResponse::tx_hash(tx);
                let to = TxFields::to(tx);
                let mut event =
                    TransactionEvent::new(hash, block_number, TransactionResponse::from(tx), to);
                event.block_timestamp = block_timestamp;
                event.logs = logs.remove(&hash).unwrap_or_default();
                // Top-level call only; internal calls need tracing support.
                if let Some(to) = to {
                    event = event.with_call(to, TxFields::input(tx).clone());
                }
                event
            })
            .collect();

        tracing::debug!(
            block = block_number,
            transactions = transactions.len(),
            "Fetched block"
        );

        Ok(Some(transactions))
    }
}

/// Group a block's logs by transaction, keeping log order.
pub fn group_logs(logs: &[Log]) -> HashMap<B256, Vec<LogEntry>> {
    let mut grouped: HashMap<B256, Vec<LogEntry>> = HashMap::new();
    for log in logs {
        let Some(tx_hash) = log.transaction_hash else {
            continue;
        };
        grouped.entry(tx_hash).or_default().push(LogEntry {
            address: log.inner.address,
            topics: log.inner.data.topics().to_vec(),
            data: log.inner.data.data.clone(),
            log_index: log.log_index,
        });
    }
    for entries in grouped.values_mut() {
        entries.sort_by_key(|entry| entry.log_index);
    }
    grouped
}

/// Evaluate a block's transactions, at most `limit` at a time.
///
/// Reports come back in transaction order regardless of completion order.
pub async fn evaluate_block(
    monitors: Arc<MonitorSet>,
    transactions: Vec<TransactionEvent>,
    limit: usize,
) -> Vec<(TransactionEvent, TransactionReport)> {
    let permits = Arc::new(Semaphore::new(limit.max(1)));
    let mut tasks = JoinSet::new();

    for (position, tx) in transactions.into_iter().enumerate() {
        let monitors = monitors.clone();
        let permits = permits.clone();
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await.ok();
            let report = monitors.handle_transaction(&tx).await;
            (position, tx, report)
        });
    }

    let mut results = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(e) => tracing::error!(error = %e, "Transaction evaluation task failed"),
        }
    }

    results.sort_by_key(|(position, _, _)| *position);
    results
        .into_iter()
        .map(|(_, tx, report)| (tx, report))
        .collect()
}

/// Write every finding of a block as a structured log line.
fn emit(block_number: u64, reports: &[(TransactionEvent, TransactionReport)]) {
    let mut findings = 0;
    for (tx, report) in reports {
        for finding in &report.findings {
            let json = serde_json::to_string(finding).unwrap_or_default();
            tracing::info!(
                block = block_number,
                tx_hash = %tx.hash,
                alert_id = %finding.alert_id,
                severity = %finding.severity,
                finding = %json,
                "Finding"
            );
            findings += 1;
        }
    }

    if findings > 0 {
        tracing::info!(block = block_number, findings, "Block evaluated");
    }
}

/// Timestamp for a block header, falling back to now for out-of-range values.
pub fn block_time(timestamp: u64) -> DateTime<Utc> {
    Utc.timestamp_opt(timestamp as i64, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    use alloy::providers::ProviderBuilder;
    use alloy::transports::mock::Asserter;

    fn mocked_poller(asserter: Asserter) -> BlockPoller {
        let provider = ProviderBuilder::new()
            .connect_mocked_client(asserter)
            .erased();
        BlockPoller::new(provider, Arc::new(MonitorSet::default()), 10, 1)
    }

    #[tokio::test]
    async fn test_missing_block_is_not_an_error() {
        let asserter = Asserter::new();
        asserter.push_success(&serde_json::Value::Null);

        let polled = mocked_poller(asserter).poll_block(42).await.unwrap();
        assert!(polled.is_none());
    }

    #[tokio::test]
    async fn test_provider_failure_is_an_error() {
        let asserter = Asserter::new();
        asserter.push_failure_msg("upstream unavailable");

        assert!(mocked_poller(asserter).poll_block(42).await.is_err());
    }
}
