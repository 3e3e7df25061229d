//! Failures surfaced by aggregator operations.
//!
//! Every variant aborts the whole operation: staged transfers, registry
//! changes and events are discarded before the error reaches the caller.

use alloy::primitives::{Address, U256};
use pcv_deposit::{DepositError, LedgerError};

use crate::access::Operation;
use crate::amount::{ArithmeticError, RatioError};
use crate::asset_manager::AssetManagerError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregatorError {
    #[error("deposit {0} is already registered")]
    DuplicateDeposit(Address),
    #[error("deposit {0} is not registered")]
    UnknownDeposit(Address),
    #[error("deposit {0} is already at its target balance")]
    NoRebalanceNeeded(Address),
    #[error(
        "aggregator holds {available} but deposit {deposit} needs {needed}; \
         rebalance an over-funded deposit first"
    )]
    InsufficientAggregatorLiquidity {
        deposit: Address,
        needed: U256,
        available: U256,
    },
    #[error("requested {requested} but only {available} is held in total")]
    InsufficientTotalBalance { requested: U256, available: U256 },
    #[error("{caller} is not authorized to {operation}")]
    Unauthorized { caller: Address, operation: Operation },
    #[error("{deposits} deposits given with {weights} weights")]
    LengthMismatch { deposits: usize, weights: usize },
    #[error("aggregator is paused")]
    Paused,
    #[error("no venue is deployed at {0}")]
    VenueNotFound(Address),
    #[error("expected token {expected} but got {actual}")]
    TokenMismatch { expected: Address, actual: Address },
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
    #[error(transparent)]
    Ratio(#[from] RatioError),
    #[error(transparent)]
    Deposit(#[from] DepositError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    AssetManager(#[from] AssetManagerError),
}
