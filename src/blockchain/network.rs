//! Filecoin Calibration network constants and display helpers.

use alloy::primitives::utils::format_ether;
use alloy::primitives::U256;
use serde::Serialize;

pub const NETWORK_NAME: &str = "Filecoin Calibration Testnet";
pub const CALIBRATION_CHAIN_ID: u64 = 314159;
pub const CURRENCY: &str = "tFIL";
pub const BLOCK_TIME_SECS: u64 = 30;
pub const FAUCET_URL: &str = "https://faucet.calibration.fildev.network/";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NetworkInfo {
    pub name: String,
    pub chain_id: u64,
    pub currency: String,
    pub block_time_secs: u64,
    pub explorer: String,
    pub faucet: String,
}

impl NetworkInfo {
    pub fn calibration(chain_id: u64, explorer: &str) -> Self {
        Self {
            name: NETWORK_NAME.to_string(),
            chain_id,
            currency: CURRENCY.to_string(),
            block_time_secs: BLOCK_TIME_SECS,
            explorer: explorer.trim_end_matches('/').to_string(),
            faucet: FAUCET_URL.to_string(),
        }
    }

    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer, tx_hash)
    }

    pub fn address_url(&self, address: &str) -> String {
        format!("{}/address/{}", self.explorer, address)
    }
}

/// Wei to whole tFIL, for display only.
pub fn wei_to_fil(wei: U256) -> f64 {
    format_ether(wei).parse().unwrap_or(0.0)
}

pub fn format_currency(amount: f64, decimals: usize) -> String {
    format!("{:.*} {}", decimals, amount, CURRENCY)
}

pub fn format_gas(gas: u64) -> String {
    if gas >= 1_000_000 {
        format!("{:.2}M gas", gas as f64 / 1_000_000.0)
    } else if gas >= 1_000 {
        format!("{:.1}K gas", gas as f64 / 1_000.0)
    } else {
        format!("{} gas", gas)
    }
}

/// Human readable age of a unix timestamp relative to `now`.
pub fn time_ago(timestamp: u64, now: u64) -> String {
    let diff = now.saturating_sub(timestamp);
    match diff {
        d if d < 60 => format!("{}s ago", d),
        d if d < 3_600 => format!("{}m ago", d / 60),
        d if d < 86_400 => format!("{}h ago", d / 3_600),
        d => format!("{}d ago", d / 86_400),
    }
}
