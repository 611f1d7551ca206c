//! MasterChef configuration changes.
//!
//! The MasterChef address differs between BSC mainnet and testnet and is
//! taken from the chain configuration. Each owner-only setter gets its own
//! finding.

use chainwatch_common::error::Result;
use chainwatch_common::types::{FindingType, Severity};
use chainwatch_decoders::{InterfaceSet, InterfaceSpec};

use crate::finding::FindingTemplate;
use crate::monitor::{MonitorSpec, MonitorTarget};
use crate::rules::{Condition, Rule};

pub const NAME: &str = "masterchef-settings";

pub const MASTER_CHEF: &str = "masterChef";

const ADD: &str = "function add(uint256 _allocPoint, address _lpToken, bool _withUpdate)";
const SET: &str = "function set(uint256 _pid, uint256 _allocPoint, bool _withUpdate)";
const UPDATE_MULTIPLIER: &str = "function updateMultiplier(uint256 multiplierNumber)";
const SET_MIGRATOR: &str = "function setMigrator(address _migrator)";
const DEV: &str = "function dev(address _devaddr)";

pub fn spec() -> Result<MonitorSpec> {
    spec_for(MonitorTarget::contract(MASTER_CHEF))
}

pub fn spec_for(target: MonitorTarget) -> Result<MonitorSpec> {
    Ok(MonitorSpec {
        name: NAME,
        target,
        interfaces: InterfaceSet::new(vec![
            InterfaceSpec::function(ADD)?,
            InterfaceSpec::function(SET)?,
            InterfaceSpec::function(UPDATE_MULTIPLIER)?,
            InterfaceSpec::function(SET_MIGRATOR)?,
            InterfaceSpec::function(DEV)?,
        ]),
        rules: vec![
            Rule::new(
                "add",
                Condition::Always,
                settings(
                    "MasterChef Pool Added",
                    "New pool {lpToken} added with {allocPoint} allocation points",
                    "CAKE-1-1",
                    "add",
                )
                .field("allocPoint", "_allocPoint")
                .field("lpToken", "_lpToken")
                .field("withUpdate", "_withUpdate"),
            ),
            Rule::new(
                "set",
                Condition::Always,
                settings(
                    "MasterChef Pool Updated",
                    "Pool {pid} allocation points set to {allocPoint}",
                    "CAKE-1-2",
                    "set",
                )
                .field("pid", "_pid")
                .field("allocPoint", "_allocPoint")
                .field("withUpdate", "_withUpdate"),
            ),
            Rule::new(
                "updateMultiplier",
                Condition::Always,
                settings(
                    "MasterChef Multiplier Updated",
                    "Reward multiplier set to {multiplier}",
                    "CAKE-1-3",
                    "updateMultiplier",
                )
                .field("multiplier", "multiplierNumber"),
            ),
            Rule::new(
                "setMigrator",
                Condition::Always,
                settings(
                    "MasterChef Migrator Set",
                    "Migrator set to {migrator}",
                    "CAKE-1-4",
                    "setMigrator",
                )
                .severity(Severity::High)
                .field("migrator", "_migrator"),
            ),
            Rule::new(
                "dev",
                Condition::Always,
                settings(
                    "MasterChef Dev Address Changed",
                    "Dev address changed to {devAddress}",
                    "CAKE-1-5",
                    "dev",
                )
                .field("devAddress", "_devaddr"),
            ),
        ],
    })
}

fn settings(
    name: &'static str,
    description: &'static str,
    alert_id: &'static str,
    function: &'static str,
) -> FindingTemplate {
    FindingTemplate::new(name, description, alert_id)
        .severity(Severity::Info)
        .finding_type(FindingType::Info)
        .literal("function", function)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use alloy::primitives::{Address, B256, U256, keccak256};
    use alloy::sol_types::SolValue;

    use chainwatch_common::types::TransactionEvent;

    use super::*;
    use crate::monitor::Monitor;
    use crate::monitors::{BSC_TESTNET, networks};

    fn testnet_monitor() -> (Monitor, Address) {
        let chain = networks()
            .into_iter()
            .find(|c| c.chain_id == BSC_TESTNET)
            .unwrap();
        let master_chef = chain.address(MASTER_CHEF).unwrap();
        (Monitor::bind(spec().unwrap(), Arc::new(chain), None).unwrap(), master_chef)
    }

    fn call(signature: &str, args: Vec<u8>) -> Vec<u8> {
        let mut input = keccak256(signature)[..4].to_vec();
        input.extend(args);
        input
    }

    #[tokio::test]
    async fn test_add_pool_is_reported() {
        let (monitor, master_chef) = testnet_monitor();
        let lp = Address::repeat_byte(0x4c);
        let tx = TransactionEvent::new(B256::repeat_byte(1), 1, Address::ZERO, Some(master_chef))
            .with_call(
                master_chef,
                call(
                    "add(uint256,address,bool)",
                    (U256::from(400u64), lp, true).abi_encode_params(),
                ),
            );

        let report = monitor.handle_transaction(&tx).await;

        assert_eq!(report.findings.len(), 1);
        let finding = &report.findings[0];
        assert_eq!(finding.alert_id, "CAKE-1-1");
        assert_eq!(finding.metadata["allocPoint"], "400");
        assert_eq!(finding.metadata["lpToken"], format!("{lp:#x}"));
        assert_eq!(finding.metadata["withUpdate"], "true");
        assert_eq!(finding.metadata["function"], "add");
    }

    #[tokio::test]
    async fn test_unrelated_call_is_ignored() {
        let (monitor, master_chef) = testnet_monitor();
        let args = (U256::from(1u64), U256::from(5u64)).abi_encode_params();
        let tx = TransactionEvent::new(B256::repeat_byte(2), 1, Address::ZERO, Some(master_chef))
            .with_call(master_chef, call("deposit(uint256,uint256)", args));

        assert!(monitor.handle_transaction(&tx).await.findings.is_empty());
    }
}
