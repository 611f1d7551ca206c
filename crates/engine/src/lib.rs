pub mod fetcher;
pub mod finding;
pub mod monitor;
pub mod monitors;
pub mod network;
pub mod rules;

pub use fetcher::{BalanceFetcher, BalanceKey, CachedFetcher, ChainReader};
pub use monitor::{Failure, Monitor, MonitorSet, MonitorSpec, MonitorTarget, TransactionReport};
pub use network::{ChainConfig, ChainIdProvider, NetworkManager};
