//! Events emitted by committed aggregator operations.

use alloy::primitives::{Address, I256, U256};
use std::fmt::{self, Display};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregatorEvent {
    DepositAdded {
        deposit: Address,
        weight: U256,
    },
    DepositRemoved {
        deposit: Address,
    },
    DepositWeightUpdate {
        deposit: Address,
        old_weight: U256,
        new_weight: U256,
    },
    BufferWeightUpdate {
        old_weight: U256,
        new_weight: U256,
    },
    /// Idle surplus pushed to under-target deposits.
    AggregatorDeposit {
        distributed: U256,
    },
    AggregatorWithdrawal {
        to: Address,
        amount: U256,
    },
    Rebalanced {
        total_balance: U256,
    },
    RebalancedSingle {
        deposit: Address,
        distance: I256,
    },
    AggregatorUpdate {
        old_aggregator: Address,
        new_aggregator: Address,
    },
    AssetManagerUpdate {
        old_asset_manager: Address,
        new_asset_manager: Address,
    },
    Paused {
        by: Address,
    },
    Unpaused {
        by: Address,
    },
}

impl Display for AggregatorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DepositAdded { deposit, weight } => {
                write!(f, "deposit {deposit} added with weight {weight}")
            }
            Self::DepositRemoved { deposit } => write!(f, "deposit {deposit} removed"),
            Self::DepositWeightUpdate {
                deposit,
                old_weight,
                new_weight,
            } => write!(
                f,
                "deposit {deposit} weight {old_weight} -> {new_weight}"
            ),
            Self::BufferWeightUpdate {
                old_weight,
                new_weight,
            } => write!(f, "buffer weight {old_weight} -> {new_weight}"),
            Self::AggregatorDeposit { distributed } => {
                write!(f, "distributed {distributed} to under-target deposits")
            }
            Self::AggregatorWithdrawal { to, amount } => write!(f, "withdrew {amount} to {to}"),
            Self::Rebalanced { total_balance } => {
                write!(f, "rebalanced total balance {total_balance}")
            }
            Self::RebalancedSingle { deposit, distance } => {
                write!(f, "rebalanced deposit {deposit} by {distance}")
            }
            Self::AggregatorUpdate {
                old_aggregator,
                new_aggregator,
            } => write!(f, "migrated {old_aggregator} -> {new_aggregator}"),
            Self::AssetManagerUpdate {
                old_asset_manager,
                new_asset_manager,
            } => write!(
                f,
                "asset manager {old_asset_manager} -> {new_asset_manager}"
            ),
            Self::Paused { by } => write!(f, "paused by {by}"),
            Self::Unpaused { by } => write!(f, "unpaused by {by}"),
        }
    }
}
