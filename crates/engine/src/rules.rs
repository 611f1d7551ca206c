//! Alert rules: named conditions evaluated against decoded records.
//!
//! A monitor declares an ordered list of rules. For each decoded record every
//! rule scoped to the record's interface is evaluated on its own:
//! - rules never short-circuit each other, so one record can fire several
//! - matches come back in declaration order
//! - a rule whose external read fails is skipped; the others still run
//!
//! Thresholds are strict (`>`) unless the rule says otherwise, and compare
//! full-width 256-bit integers.

use alloy::dyn_abi::DynSolType;
use alloy::primitives::U256;

use chainwatch_common::error::{MonitorError, Result};
use chainwatch_decoders::{DecodedRecord, InterfaceSet, InterfaceSpec, Value};

use crate::fetcher::{BalanceFetcher, BalanceKey};
use crate::finding::FindingTemplate;
use crate::network::ChainConfig;

/// A numeric bound, either constant or taken from the chain configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Threshold {
    Fixed(U256),
    ChainParam(&'static str),
}

impl Threshold {
    pub fn resolve(&self, chain: &ChainConfig) -> Result<U256> {
        match self {
            Threshold::Fixed(value) => Ok(*value),
            Threshold::ChainParam(name) => chain.require_param(name),
        }
    }
}

/// The predicate part of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Fires for every matching record.
    Always,
    /// `field > threshold`
    GreaterThan {
        field: &'static str,
        threshold: Threshold,
    },
    /// `field >= threshold`
    AtLeast {
        field: &'static str,
        threshold: Threshold,
    },
    /// `field == 0`
    IsZero { field: &'static str },
    /// `field == value`
    Equals { field: &'static str, value: Value },
    /// Byte, string or array field with at least one element.
    NonEmpty { field: &'static str },
    /// Token balance of the address in `account` is `> threshold`.
    ///
    /// With `at_block` the balance is read at the record's block, otherwise
    /// at the latest block.
    BalanceAbove {
        account: &'static str,
        threshold: Threshold,
        at_block: bool,
    },
}

impl Condition {
    fn needs_fetcher(&self) -> bool {
        matches!(self, Condition::BalanceAbove { .. })
    }

    /// Fields read by this condition and the type each one must have.
    fn requirements(&self) -> Vec<(&'static str, FieldKind)> {
        match self {
            Condition::Always => vec![],
            Condition::GreaterThan { field, .. }
            | Condition::AtLeast { field, .. }
            | Condition::IsZero { field } => vec![(*field, FieldKind::Uint)],
            Condition::Equals { field, .. } => vec![(*field, FieldKind::Any)],
            Condition::NonEmpty { field } => vec![(*field, FieldKind::Sized)],
            Condition::BalanceAbove { account, .. } => vec![(*account, FieldKind::Address)],
        }
    }

    fn threshold(&self) -> Option<&Threshold> {
        match self {
            Condition::GreaterThan { threshold, .. }
            | Condition::AtLeast { threshold, .. }
            | Condition::BalanceAbove { threshold, .. } => Some(threshold),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Any,
    Uint,
    Address,
    Sized,
}

impl FieldKind {
    fn accepts(self, ty: &DynSolType) -> bool {
        match self {
            FieldKind::Any => true,
            FieldKind::Uint => matches!(ty, DynSolType::Uint(_)),
            FieldKind::Address => matches!(ty, DynSolType::Address),
            FieldKind::Sized => matches!(
                ty,
                DynSolType::Bytes | DynSolType::String | DynSolType::Array(_)
            ),
        }
    }
}

/// A named condition plus the finding it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Name of the interface whose records this rule looks at.
    pub interface: &'static str,
    pub condition: Condition,
    pub finding: FindingTemplate,
}

impl Rule {
    pub fn new(interface: &'static str, condition: Condition, finding: FindingTemplate) -> Self {
        Self {
            interface,
            condition,
            finding,
        }
    }

    pub fn name(&self) -> &'static str {
        self.finding.name
    }

    pub fn needs_fetcher(&self) -> bool {
        self.condition.needs_fetcher()
    }

    /// Check the rule against the monitor's interfaces and chain.
    ///
    /// Every reference a rule makes must resolve here, so that a running
    /// monitor never discovers a missing field or parameter.
    pub fn validate(
        &self,
        interfaces: &InterfaceSet,
        chain: &ChainConfig,
        has_fetcher: bool,
    ) -> Result<()> {
        let interface = interfaces.get(self.interface).ok_or_else(|| {
            MonitorError::Config(format!(
                "rule `{}` targets unknown interface `{}`",
                self.name(),
                self.interface
            ))
        })?;

        for (field, kind) in self.condition.requirements() {
            check_field(self.name(), interface, field, kind)?;
        }

        if let Some(threshold) = self.condition.threshold() {
            threshold.resolve(chain)?;
        }

        if self.needs_fetcher() && !has_fetcher {
            return Err(MonitorError::Config(format!(
                "rule `{}` reads balances but the monitor has no fetcher",
                self.name()
            )));
        }

        if self.finding.uses_fetched() && !self.needs_fetcher() {
            return Err(MonitorError::Config(format!(
                "rule `{}` reports a fetched value but fetches nothing",
                self.name()
            )));
        }

        self.finding.validate(interface)
    }

    /// Evaluate the condition for one record.
    ///
    /// Returns `Ok(None)` when the condition does not hold, and the fetched
    /// value (if any) alongside `Some` when it does.
    pub async fn check(
        &self,
        decoded: &DecodedRecord,
        chain: &ChainConfig,
        fetcher: Option<&BalanceFetcher>,
    ) -> Result<Option<Fired>> {
        let fired = match &self.condition {
            Condition::Always => Some(None),
            Condition::GreaterThan { field, threshold } => {
                (uint_field(decoded, field)? > threshold.resolve(chain)?).then_some(None)
            }
            Condition::AtLeast { field, threshold } => {
                (uint_field(decoded, field)? >= threshold.resolve(chain)?).then_some(None)
            }
            Condition::IsZero { field } => uint_field(decoded, field)?.is_zero().then_some(None),
            Condition::Equals { field, value } => {
                (field_value(decoded, field)? == value).then_some(None)
            }
            Condition::NonEmpty { field } => {
                let len = field_value(decoded, field)?.len().ok_or_else(|| {
                    MonitorError::Config(format!("`{field}` of {} has no length", decoded.interface))
                })?;
                (len > 0).then_some(None)
            }
            Condition::BalanceAbove {
                account,
                threshold,
                at_block,
            } => {
                let fetcher = fetcher.ok_or_else(|| {
                    MonitorError::Config(format!("rule `{}` has no fetcher", self.name()))
                })?;
                let account = decoded.address(account).ok_or_else(|| {
                    MonitorError::Config(format!(
                        "`{account}` of {} is not an address",
                        decoded.interface
                    ))
                })?;
                let key = if *at_block {
                    BalanceKey::at_block(account, decoded.block_number)
                } else {
                    BalanceKey::latest(account)
                };
                let balance = fetcher.get(&key).await?;
                (balance > threshold.resolve(chain)?).then_some(Some(balance))
            }
        };

        Ok(fired.map(|fetched| Fired { fetched }))
    }
}

/// Result of a rule whose condition held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    pub fetched: Option<U256>,
}

/// A rule that fired for a record, with the value it fetched.
#[derive(Debug, Clone, Copy)]
pub struct RuleMatch<'a> {
    pub rule: &'a Rule,
    pub fetched: Option<U256>,
}

/// A rule that could not be evaluated for a record.
#[derive(Debug, Clone)]
pub struct SkippedRule {
    pub rule: &'static str,
    pub error: MonitorError,
}

/// Outcome of running a rule list over one record.
#[derive(Debug, Default)]
pub struct Evaluation<'a> {
    pub matches: Vec<RuleMatch<'a>>,
    pub skipped: Vec<SkippedRule>,
}

/// Run every applicable rule against `decoded`, in declaration order.
pub async fn evaluate<'a>(
    rules: &'a [Rule],
    decoded: &DecodedRecord,
    chain: &ChainConfig,
    fetcher: Option<&BalanceFetcher>,
) -> Evaluation<'a> {
    let mut evaluation = Evaluation::default();

    for rule in rules.iter().filter(|r| r.interface == decoded.interface) {
        match rule.check(decoded, chain, fetcher).await {
            Ok(Some(fired)) => evaluation.matches.push(RuleMatch {
                rule,
                fetched: fired.fetched,
            }),
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(
                    rule = rule.name(),
                    tx_hash = %decoded.tx_hash,
                    error = %error,
                    "Rule skipped, could not be evaluated"
                );
                evaluation.skipped.push(SkippedRule {
                    rule: rule.name(),
                    error,
                });
            }
        }
    }

    evaluation
}

fn check_field(
    rule: &str,
    interface: &InterfaceSpec,
    field: &str,
    kind: FieldKind,
) -> Result<()> {
    let param = interface.param(field).ok_or_else(|| {
        MonitorError::Config(format!(
            "rule `{rule}`: `{field}` is not a parameter of {}",
            interface.signature()
        ))
    })?;
    if !kind.accepts(&param.ty) {
        return Err(MonitorError::Config(format!(
            "rule `{rule}`: `{field}` has type {} which the condition cannot use",
            param.ty.sol_type_name()
        )));
    }
    Ok(())
}

fn field_value<'r>(decoded: &'r DecodedRecord, field: &str) -> Result<&'r Value> {
    decoded.get(field).ok_or_else(|| {
        MonitorError::Config(format!("`{field}` missing from decoded {}", decoded.interface))
    })
}

fn uint_field(decoded: &DecodedRecord, field: &str) -> Result<U256> {
    field_value(decoded, field)?.as_uint().ok_or_else(|| {
        MonitorError::Config(format!("`{field}` of {} is not a uint", decoded.interface))
    })
}
