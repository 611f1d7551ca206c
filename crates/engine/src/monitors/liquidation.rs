//! Vault liquidations.
//!
//! Every `Kill` emitted by a watched vault is reported. A liquidation that
//! leaves nothing for the position owner (`left == 0`) is also reported as bad
//! debt, with the same metadata.

use chainwatch_common::error::Result;
use chainwatch_common::types::{FindingType, Severity};
use chainwatch_decoders::{InterfaceSet, InterfaceSpec};

use crate::finding::FindingTemplate;
use crate::monitor::{MonitorSpec, MonitorTarget};
use crate::rules::{Condition, Rule};

pub const NAME: &str = "liquidation-alert";

pub const VAULT_IB_BNB: &str = "alpacaVaultIbBNB";
pub const VAULT_IB_BUSD: &str = "alpacaVaultIbBUSD";
pub const VAULT_IB_ETH: &str = "alpacaVaultIbETH";
pub const VAULT_IB_ALPACA: &str = "alpacaVaultIbALPACA";
pub const VAULT_IB_USDT: &str = "alpacaVaultIbUSDT";
pub const VAULT_IB_BTCB: &str = "alpacaVaultIbBTCB";

pub const KILL_EVENT: &str = "event Kill(uint256 indexed id, address indexed killer, address owner, uint256 posVal, uint256 debt, uint256 prize, uint256 left)";

/// Monitor over the configured vaults.
pub fn spec() -> Result<MonitorSpec> {
    spec_for(MonitorTarget::Contracts(vec![
        VAULT_IB_BNB,
        VAULT_IB_BUSD,
        VAULT_IB_ETH,
        VAULT_IB_ALPACA,
        VAULT_IB_USDT,
        VAULT_IB_BTCB,
    ]))
}

/// Monitor over an explicit set of vaults.
pub fn spec_for(target: MonitorTarget) -> Result<MonitorSpec> {
    Ok(MonitorSpec {
        name: NAME,
        target,
        interfaces: InterfaceSet::new(vec![InterfaceSpec::event(KILL_EVENT)?]),
        rules: vec![
            Rule::new(
                "Kill",
                Condition::Always,
                kill_metadata(FindingTemplate::new(
                    "Liquidation Event",
                    "Liquidation Has Occurred",
                    "ALPACA-3",
                )),
            ),
            Rule::new(
                "Kill",
                Condition::IsZero { field: "left" },
                kill_metadata(FindingTemplate::new(
                    "Bad Debt Event",
                    "Target position has 0 'left'",
                    "ALPACA-4",
                )),
            ),
        ],
    })
}

fn kill_metadata(template: FindingTemplate) -> FindingTemplate {
    template
        .severity(Severity::Info)
        .finding_type(FindingType::Info)
        .field("positionId", "id")
        .field("positionkiller", "killer")
        .field("positionOwner", "owner")
        .field("positionValue", "posVal")
        .field("debt", "debt")
        .field("prize", "prize")
        .field("left", "left")
        .address("vault")
}
