//! Catalog of on-chain trigger kinds and the chains they are supported on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chain ids notification triggers can be created on.
pub mod chains {
    pub const ETHEREUM: &str = "1";
    pub const OPTIMISM: &str = "10";
    pub const BSC: &str = "56";
    pub const POLYGON: &str = "137";
    pub const ARBITRUM: &str = "42161";
    pub const AVALANCHE: &str = "43114";
    pub const LINEA: &str = "59144";
}

const TRANSFER_CHAINS: &[&str] = &[
    chains::ETHEREUM,
    chains::OPTIMISM,
    chains::BSC,
    chains::POLYGON,
    chains::ARBITRUM,
    chains::AVALANCHE,
    chains::LINEA,
];
const NFT_CHAINS: &[&str] = &[chains::ETHEREUM, chains::POLYGON];
const SWAP_CHAINS: &[&str] = &[
    chains::ETHEREUM,
    chains::OPTIMISM,
    chains::BSC,
    chains::POLYGON,
    chains::ARBITRUM,
    chains::AVALANCHE,
];
const STAKING_CHAINS: &[&str] = &[chains::ETHEREUM];

/// Kind of on-chain event a trigger subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Erc20Sent,
    Erc20Received,
    EthSent,
    EthReceived,
    Erc721Sent,
    Erc721Received,
    Erc1155Sent,
    Erc1155Received,
    MetamaskSwapCompleted,
    RocketpoolStakeCompleted,
    RocketpoolUnstakeCompleted,
    LidoStakeCompleted,
    LidoWithdrawalRequested,
    LidoWithdrawalCompleted,
    LidoStakeReadyToBeWithdrawn,
}

/// Coarse grouping used by notification settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerGroup {
    Received,
    Sent,
    Defi,
}

impl TriggerGroup {
    pub const ALL: [TriggerGroup; 3] = [TriggerGroup::Received, TriggerGroup::Sent, TriggerGroup::Defi];
}

impl TriggerKind {
    pub const ALL: [TriggerKind; 15] = [
        TriggerKind::Erc20Sent,
        TriggerKind::Erc20Received,
        TriggerKind::EthSent,
        TriggerKind::EthReceived,
        TriggerKind::Erc721Sent,
        TriggerKind::Erc721Received,
        TriggerKind::Erc1155Sent,
        TriggerKind::Erc1155Received,
        TriggerKind::MetamaskSwapCompleted,
        TriggerKind::RocketpoolStakeCompleted,
        TriggerKind::RocketpoolUnstakeCompleted,
        TriggerKind::LidoStakeCompleted,
        TriggerKind::LidoWithdrawalRequested,
        TriggerKind::LidoWithdrawalCompleted,
        TriggerKind::LidoStakeReadyToBeWithdrawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Erc20Sent => "erc20_sent",
            TriggerKind::Erc20Received => "erc20_received",
            TriggerKind::EthSent => "eth_sent",
            TriggerKind::EthReceived => "eth_received",
            TriggerKind::Erc721Sent => "erc721_sent",
            TriggerKind::Erc721Received => "erc721_received",
            TriggerKind::Erc1155Sent => "erc1155_sent",
            TriggerKind::Erc1155Received => "erc1155_received",
            TriggerKind::MetamaskSwapCompleted => "metamask_swap_completed",
            TriggerKind::RocketpoolStakeCompleted => "rocketpool_stake_completed",
            TriggerKind::RocketpoolUnstakeCompleted => "rocketpool_unstake_completed",
            TriggerKind::LidoStakeCompleted => "lido_stake_completed",
            TriggerKind::LidoWithdrawalRequested => "lido_withdrawal_requested",
            TriggerKind::LidoWithdrawalCompleted => "lido_withdrawal_completed",
            TriggerKind::LidoStakeReadyToBeWithdrawn => "lido_stake_ready_to_be_withdrawn",
        }
    }

    /// Chain ids this kind can be subscribed to on.
    pub fn supported_chains(&self) -> &'static [&'static str] {
        match self {
            TriggerKind::Erc20Sent
            | TriggerKind::Erc20Received
            | TriggerKind::EthSent
            | TriggerKind::EthReceived => TRANSFER_CHAINS,
            TriggerKind::Erc721Sent
            | TriggerKind::Erc721Received
            | TriggerKind::Erc1155Sent
            | TriggerKind::Erc1155Received => NFT_CHAINS,
            TriggerKind::MetamaskSwapCompleted => SWAP_CHAINS,
            TriggerKind::RocketpoolStakeCompleted
            | TriggerKind::RocketpoolUnstakeCompleted
            | TriggerKind::LidoStakeCompleted
            | TriggerKind::LidoWithdrawalRequested
            | TriggerKind::LidoWithdrawalCompleted
            | TriggerKind::LidoStakeReadyToBeWithdrawn => STAKING_CHAINS,
        }
    }

    pub fn group(&self) -> TriggerGroup {
        match self {
            TriggerKind::Erc20Received
            | TriggerKind::EthReceived
            | TriggerKind::Erc721Received
            | TriggerKind::Erc1155Received => TriggerGroup::Received,
            TriggerKind::Erc20Sent
            | TriggerKind::EthSent
            | TriggerKind::Erc721Sent
            | TriggerKind::Erc1155Sent => TriggerGroup::Sent,
            _ => TriggerGroup::Defi,
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TriggerKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("Unknown trigger kind: {}", s))
    }
}
