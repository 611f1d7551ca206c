use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// JSON-RPC endpoint of the chain being monitored
    pub rpc_url: String,

    /// Block polling interval in milliseconds (default: 1500)
    pub poll_interval_ms: u64,

    /// Block to start from; latest block when unset
    pub start_block: Option<u64>,

    /// Names of the monitors to run; every monitor configured for the chain when empty
    pub monitors: Vec<String>,

    /// Maximum number of transactions of one block evaluated concurrently (default: 16)
    pub max_concurrent_txs: usize,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            rpc_url: std::env::var("RPC_URL")
                .map_err(|_| anyhow::anyhow!("RPC_URL environment variable is required"))?,
            poll_interval_ms: std::env::var("POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "1500".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("POLL_INTERVAL_MS must be a valid u64"))?,
            start_block: std::env::var("START_BLOCK")
                .ok()
                .map(|v| v.parse::<u64>())
                .transpose()
                .map_err(|_| anyhow::anyhow!("START_BLOCK must be a valid u64"))?,
            monitors: std::env::var("MONITORS")
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
            max_concurrent_txs: std::env::var("MAX_CONCURRENT_TXS")
                .unwrap_or_else(|_| "16".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("MAX_CONCURRENT_TXS must be a valid usize"))?,
        })
    }

    /// Whether the named monitor is enabled by this configuration.
    pub fn monitor_enabled(&self, name: &str) -> bool {
        self.monitors.is_empty() || self.monitors.iter().any(|m| m == name)
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
