//! Built-in monitors and the chain table they are configured from.
//!
//! | monitor               | chains           | records                         |
//! |-----------------------|------------------|---------------------------------|
//! | `liquidation-alert`   | BSC              | vault `Kill` events             |
//! | `qi-transfers`        | Avalanche        | QI `Transfer` events + balances |
//! | `flash-swap`          | Avalanche        | PGL pair `swap` calls           |
//! | `masterchef-settings` | BSC, BSC testnet | MasterChef admin calls          |

pub mod flash_swap;
pub mod liquidation;
pub mod masterchef;
pub mod qi_transfers;

use alloy::primitives::{U256, address};

use chainwatch_common::error::Result;

use crate::monitor::MonitorSpec;
use crate::network::ChainConfig;

pub const BSC: u64 = 56;
pub const BSC_TESTNET: u64 = 97;
pub const AVALANCHE: u64 = 43114;

/// `amount` whole tokens in 18-decimal base units.
pub fn tokens(amount: u64) -> U256 {
    U256::from(amount) * U256::from(10u64).pow(U256::from(18u64))
}

/// Static chain id → configuration table for the built-in monitors.
pub fn networks() -> Vec<ChainConfig> {
    vec![
        ChainConfig::new(BSC, "bsc")
            .with_address(
                masterchef::MASTER_CHEF,
                address!("0x73feaa1eE314F8c655E354234017bE2193C9E24E"),
            )
            .with_address(
                liquidation::VAULT_IB_BNB,
                address!("0xd7D069493685A581d27824Fc46EdA46B7EfC0063"),
            )
            .with_address(
                liquidation::VAULT_IB_BUSD,
                address!("0x7C9e73d4C71dae564d41F78d56439bB4ba87592f"),
            )
            .with_address(
                liquidation::VAULT_IB_ETH,
                address!("0xbfF4a34A4644a113E8200D7F1D79b3555f723AfE"),
            )
            .with_address(
                liquidation::VAULT_IB_ALPACA,
                address!("0xf1bE8ecC990cBcb90e166b71E368299f0116d421"),
            )
            .with_address(
                liquidation::VAULT_IB_USDT,
                address!("0x158Da805682BdC8ee32d52833aD41E74bb951E59"),
            )
            .with_address(
                liquidation::VAULT_IB_BTCB,
                address!("0x08FC9Ba2cAc74742177e0afC3dC8Aed6961c24e7"),
            ),
        ChainConfig::new(BSC_TESTNET, "bsc-testnet").with_address(
            masterchef::MASTER_CHEF,
            address!("0xbD315DA028B586f7cD93903498e671fA3efeF506"),
        ),
        ChainConfig::new(AVALANCHE, "avalanche")
            .with_address(
                qi_transfers::QI_TOKEN,
                address!("0x8729438EB15e2C8B576fCc6AeCdA6A148776C0F5"),
            )
            .with_address(
                flash_swap::QI_AVAX_PGL,
                address!("0xE530dC2095Ef5653205CF5ea79F8979a7028065c"),
            )
            .with_param(qi_transfers::TRANSFER_THRESHOLD, tokens(1_000_000))
            .with_param(qi_transfers::BALANCE_THRESHOLD, tokens(10_000_000)),
    ]
}

/// Every built-in monitor definition.
pub fn all() -> Result<Vec<MonitorSpec>> {
    Ok(vec![
        liquidation::spec()?,
        qi_transfers::spec()?,
        flash_swap::spec()?,
        masterchef::spec()?,
    ])
}
