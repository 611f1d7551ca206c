use std::sync::Arc;

use chainwatch_common::config::AppConfig;
use chainwatch_engine::monitors;
use chainwatch_engine::{BalanceFetcher, ChainConfig, Monitor, MonitorSet, NetworkManager};
use chainwatch_runner::poller::BlockPoller;
use chainwatch_runner::rpc::RpcChainReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chainwatch_runner=info,chainwatch_engine=info".into()),
        )
        .json()
        .init();

    tracing::info!("Chainwatch starting...");

    let config = AppConfig::from_env()?;
    let reader = RpcChainReader::connect(&config.rpc_url)?;

    // Pin the network configuration; an unknown chain stops the process here
    let networks = NetworkManager::new(monitors::networks());
    let chain = networks.initialize(&reader).await.inspect_err(|e| {
        tracing::error!(error = %e, "Network initialization failed");
    })?;

    let (monitor_set, fetchers) = bind_monitors(&config, &chain, &reader)?;
    if monitor_set.is_empty() {
        anyhow::bail!("no monitors enabled for {} ({})", chain.name, chain.chain_id);
    }

    let mut poller = BlockPoller::new(
        reader.provider().clone(),
        Arc::new(monitor_set),
        config.poll_interval_ms,
        config.max_concurrent_txs,
    )
    .with_fetchers(fetchers)
    .with_start_block(config.start_block);

    tokio::select! {
        result = poller.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Block poller exited with error");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping gracefully...");
        }
    }

    tracing::info!("Chainwatch stopped.");
    Ok(())
}

/// Bind every enabled monitor that is deployed on `chain`.
///
/// Monitors that read balances get their own cache over the token they watch.
fn bind_monitors(
    config: &AppConfig,
    chain: &Arc<ChainConfig>,
    reader: &RpcChainReader,
) -> anyhow::Result<(MonitorSet, Vec<Arc<BalanceFetcher>>)> {
    let specs = monitors::all()?;

    for requested in &config.monitors {
        if !specs.iter().any(|spec| spec.name == requested.as_str()) {
            tracing::warn!(monitor = %requested, "Unknown monitor requested, ignoring");
        }
    }

    let mut bound = Vec::new();
    let mut fetchers = Vec::new();

    for spec in specs {
        if !config.monitor_enabled(spec.name) {
            continue;
        }
        if !spec.target.is_deployed_on(chain) {
            tracing::info!(
                monitor = spec.name,
                network = %chain.name,
                "Monitor not deployed on this network, skipping"
            );
            continue;
        }

        let fetcher = if spec.needs_fetcher() {
            let token = spec
                .target
                .resolve(chain)?
                .first()
                .copied()
                .ok_or_else(|| anyhow::anyhow!("monitor `{}` has no token", spec.name))?;
            let fetcher = Arc::new(BalanceFetcher::new(Arc::new(reader.token_balances(token))));
            fetchers.push(fetcher.clone());
            Some(fetcher)
        } else {
            None
        };

        bound.push(Monitor::bind(spec, chain.clone(), fetcher)?);
    }

    let monitor_set = MonitorSet::new(bound);
    tracing::info!(
        network = %chain.name,
        chain_id = chain.chain_id,
        monitors = ?monitor_set.names(),
        "Monitors ready"
    );

    Ok((monitor_set, fetchers))
}
