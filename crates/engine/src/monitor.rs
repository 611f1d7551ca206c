//! Monitor pipeline.
//!
//! For each transaction:
//! 1. Decode the logs and calls that target the monitor's contracts
//! 2. Evaluate the monitor's rules against each decoded record
//! 3. Render a finding for every rule that fired
//!
//! Findings keep record order, then rule order, so identical input always
//! yields identical output. A record that fails to decode is reported and
//! skipped; the rest of the transaction is still evaluated.

use std::sync::Arc;

use alloy::primitives::Address;

use chainwatch_common::error::{MonitorError, Result};
use chainwatch_common::types::{Finding, TransactionEvent};
use chainwatch_decoders::InterfaceSet;

use crate::fetcher::BalanceFetcher;
use crate::network::ChainConfig;
use crate::rules::{self, Rule};

/// The contracts a monitor is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorTarget {
    /// Addresses that are the same on every chain.
    Fixed(Vec<Address>),
    /// Contract names looked up in the chain configuration.
    Contracts(Vec<&'static str>),
}

impl MonitorTarget {
    pub fn contract(name: &'static str) -> Self {
        MonitorTarget::Contracts(vec![name])
    }

    /// Resolve to concrete addresses on `chain`.
    pub fn resolve(&self, chain: &ChainConfig) -> Result<Vec<Address>> {
        let targets = match self {
            MonitorTarget::Fixed(addresses) => addresses.clone(),
            MonitorTarget::Contracts(names) => names
                .iter()
                .map(|name| chain.require_address(name))
                .collect::<Result<Vec<_>>>()?,
        };
        if targets.is_empty() {
            return Err(MonitorError::Config("monitor has no target address".to_string()));
        }
        Ok(targets)
    }

    /// Whether every contract this target names is configured on `chain`.
    pub fn is_deployed_on(&self, chain: &ChainConfig) -> bool {
        match self {
            MonitorTarget::Fixed(_) => true,
            MonitorTarget::Contracts(names) => names.iter().all(|n| chain.address(n).is_some()),
        }
    }
}

/// Static definition of a monitor.
#[derive(Debug, Clone)]
pub struct MonitorSpec {
    pub name: &'static str,
    pub target: MonitorTarget,
    pub interfaces: InterfaceSet,
    pub rules: Vec<Rule>,
}

impl MonitorSpec {
    /// Whether any rule reads on-chain state through a fetcher.
    pub fn needs_fetcher(&self) -> bool {
        self.rules.iter().any(Rule::needs_fetcher)
    }
}

/// What went wrong while evaluating part of a transaction.
#[derive(Debug, Clone)]
pub enum Failure {
    /// A record matched an interface but could not be decoded.
    Decode(MonitorError),
    /// A rule could not be evaluated for a record.
    Rule { rule: &'static str, error: MonitorError },
    /// A fired rule could not be rendered.
    Build { rule: &'static str, error: MonitorError },
}

/// Findings for one transaction plus anything that was skipped.
#[derive(Debug, Default)]
pub struct TransactionReport {
    pub findings: Vec<Finding>,
    pub failures: Vec<Failure>,
}

impl TransactionReport {
    pub fn extend(&mut self, other: TransactionReport) {
        self.findings.extend(other.findings);
        self.failures.extend(other.failures);
    }
}

/// A monitor bound to a chain: targets resolved and rules validated.
pub struct Monitor {
    spec: MonitorSpec,
    chain: Arc<ChainConfig>,
    targets: Vec<Address>,
    fetcher: Option<Arc<BalanceFetcher>>,
}

impl Monitor {
    /// Bind a monitor definition to a chain.
    ///
    /// Fails if a target contract is not configured on the chain or if any
    /// rule references something the monitor does not provide.
    pub fn bind(
        spec: MonitorSpec,
        chain: Arc<ChainConfig>,
        fetcher: Option<Arc<BalanceFetcher>>,
    ) -> Result<Self> {
        if spec.interfaces.is_empty() {
            return Err(MonitorError::Config(format!(
                "monitor `{}` declares no interfaces",
                spec.name
            )));
        }

        let targets = spec.target.resolve(&chain)?;

        for rule in &spec.rules {
            rule.validate(&spec.interfaces, &chain, fetcher.is_some())
                .map_err(|e| MonitorError::Config(format!("monitor `{}`: {e}", spec.name)))?;
        }

        tracing::info!(
            monitor = spec.name,
            network = %chain.name,
            targets = ?targets,
            rules = spec.rules.len(),
            "Monitor bound"
        );

        Ok(Self {
            spec,
            chain,
            targets,
            fetcher,
        })
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn targets(&self) -> &[Address] {
        &self.targets
    }

    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    /// Evaluate one transaction.
    pub async fn handle_transaction(&self, tx: &TransactionEvent) -> TransactionReport {
        let mut report = TransactionReport::default();

        for decoded in self.spec.interfaces.decode_transaction(tx, &self.targets) {
            let decoded = match decoded {
                Ok(decoded) => decoded,
                Err(error) => {
                    tracing::warn!(
                        monitor = self.spec.name,
                        tx_hash = %tx.hash,
                        error = %error,
                        "Record decode failed — skipping record"
                    );
                    report.failures.push(Failure::Decode(error));
                    continue;
                }
            };

            let evaluation =
                rules::evaluate(&self.spec.rules, &decoded, &self.chain, self.fetcher.as_deref())
                    .await;

            for skipped in evaluation.skipped {
                report.failures.push(Failure::Rule {
                    rule: skipped.rule,
                    error: skipped.error,
                });
            }

            for matched in evaluation.matches {
                match matched.rule.finding.build(&decoded, matched.fetched) {
                    Ok(finding) => {
                        tracing::debug!(
                            monitor = self.spec.name,
                            alert_id = %finding.alert_id,
                            tx_hash = %tx.hash,
                            "Rule fired"
                        );
                        report.findings.push(finding);
                    }
                    Err(error) => {
                        tracing::warn!(
                            monitor = self.spec.name,
                            rule = matched.rule.name(),
                            error = %error,
                            "Finding could not be built"
                        );
                        report.failures.push(Failure::Build {
                            rule: matched.rule.name(),
                            error,
                        });
                    }
                }
            }
        }

        report
    }
}

/// All monitors running against one chain, evaluated in a fixed order.
#[derive(Default)]
pub struct MonitorSet {
    monitors: Vec<Monitor>,
}

impl MonitorSet {
    pub fn new(monitors: Vec<Monitor>) -> Self {
        Self { monitors }
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.monitors.iter().map(Monitor::name).collect()
    }

    /// Evaluate one transaction with every monitor, concatenating reports in
    /// monitor order.
    pub async fn handle_transaction(&self, tx: &TransactionEvent) -> TransactionReport {
        let mut report = TransactionReport::default();
        for monitor in &self.monitors {
            report.extend(monitor.handle_transaction(tx).await);
        }
        report
    }
}
