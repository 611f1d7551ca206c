//! Flash swaps on the QI/AVAX Pangolin pair.
//!
//! A `swap` call with a non-empty `data` payload makes the pair call back into
//! the recipient before repayment, i.e. a flash swap.

use chainwatch_common::error::Result;
use chainwatch_common::types::{FindingType, Severity};
use chainwatch_decoders::{InterfaceSet, InterfaceSpec};

use crate::finding::FindingTemplate;
use crate::monitor::{MonitorSpec, MonitorTarget};
use crate::rules::{Condition, Rule};

pub const NAME: &str = "flash-swap";

pub const QI_AVAX_PGL: &str = "qiAvaxPgl";

pub const SWAP_FUNCTION: &str =
    "function swap(uint256 amount0Out, uint256 amount1Out, address to, bytes data)";

pub fn spec() -> Result<MonitorSpec> {
    spec_for(MonitorTarget::contract(QI_AVAX_PGL))
}

pub fn spec_for(target: MonitorTarget) -> Result<MonitorSpec> {
    Ok(MonitorSpec {
        name: NAME,
        target,
        interfaces: InterfaceSet::new(vec![InterfaceSpec::function(SWAP_FUNCTION)?]),
        rules: vec![Rule::new(
            "swap",
            Condition::NonEmpty { field: "data" },
            FindingTemplate::new(
                "Flash Swap Detected",
                "Flash swap on the QI/AVAX PGL pair sent to {to}",
                "BENQI-7",
            )
            .severity(Severity::Info)
            .finding_type(FindingType::Info)
            .field("amount0Out", "amount0Out")
            .field("amount1Out", "amount1Out")
            .field("to", "to"),
        )],
    })
}
