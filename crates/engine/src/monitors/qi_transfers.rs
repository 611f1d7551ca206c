//! Large QI token movements.
//!
//! Reports transfers above a per-chain amount, and recipients whose balance
//! after the transfer exceeds a per-chain threshold. Balances are read through
//! the shared cache, so a recipient seen twice in a block is read once.

use chainwatch_common::error::Result;
use chainwatch_common::types::{FindingType, Severity};
use chainwatch_decoders::{InterfaceSet, InterfaceSpec};

use crate::finding::FindingTemplate;
use crate::monitor::{MonitorSpec, MonitorTarget};
use crate::rules::{Condition, Rule, Threshold};

pub const NAME: &str = "qi-transfers";

pub const QI_TOKEN: &str = "qiToken";
pub const TRANSFER_THRESHOLD: &str = "qiTransferThreshold";
pub const BALANCE_THRESHOLD: &str = "qiBalanceThreshold";

pub const TRANSFER_EVENT: &str =
    "event Transfer(address indexed from, address indexed to, uint256 amount)";

pub fn spec() -> Result<MonitorSpec> {
    spec_for(MonitorTarget::contract(QI_TOKEN))
}

pub fn spec_for(target: MonitorTarget) -> Result<MonitorSpec> {
    Ok(MonitorSpec {
        name: NAME,
        target,
        interfaces: InterfaceSet::new(vec![InterfaceSpec::event(TRANSFER_EVENT)?]),
        rules: vec![
            Rule::new(
                "Transfer",
                Condition::GreaterThan {
                    field: "amount",
                    threshold: Threshold::ChainParam(TRANSFER_THRESHOLD),
                },
                FindingTemplate::new(
                    "Large QI Transfer",
                    "{amount} QI (base units) transferred from {from} to {to}",
                    "BENQI-2-1",
                )
                .severity(Severity::Info)
                .finding_type(FindingType::Info)
                .field("from", "from")
                .field("to", "to")
                .field("amount", "amount"),
            ),
            Rule::new(
                "Transfer",
                Condition::BalanceAbove {
                    account: "to",
                    threshold: Threshold::ChainParam(BALANCE_THRESHOLD),
                    at_block: false,
                },
                FindingTemplate::new(
                    "Large QI Balance",
                    "{account} holds {balance} QI (base units)",
                    "BENQI-2-2",
                )
                .severity(Severity::Info)
                .finding_type(FindingType::Info)
                .field("account", "to")
                .fetched("balance"),
            ),
        ],
    })
}
