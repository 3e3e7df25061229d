//! Weighted allocation of protocol-controlled value across PCV deposits.
//!
//! A [`PcvAggregator`] keeps an ordered registry of deposits and weights
//! plus a buffer weight for funds it holds idle. It reads live balances
//! from a shared [`PcvEnvironment`] and moves funds so that every deposit
//! converges toward `total_balance * weight / total_weight`.

pub mod access;
pub mod aggregator;
mod amount;
pub mod asset_manager;
pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod events;
pub mod persistence;

#[cfg(test)]
pub(crate) mod test_utils;

pub use access::{AccessControl, Operation, Role, RoleTable};
pub use aggregator::registry::{DepositRegistry, DepositWeight};
pub use aggregator::snapshot::{BalanceSnapshot, DepositBalance};
pub use aggregator::targets::DepositTarget;
pub use aggregator::{AggregatorSetup, PcvAggregator};
pub use amount::{ArithmeticError, RatioError};
pub use asset_manager::{AssetManagerError, LocalAssetManager, RewardsAssetManager};
pub use config::{ConfigError, Ctx, LogLevel, setup_tracing};
pub use environment::{EnvironmentError, PcvEnvironment};
pub use error::AggregatorError;
pub use events::AggregatorEvent;
pub use persistence::{
    EnvironmentRecord, LendingPosition, PersistenceError, RegistryPersistence, RegistryRecord,
    SavedRegistry, SqliteRegistryPersistence,
};

pub use pcv_deposit::{
    DepositError, DepositVenue, HoldingDeposit, LedgerError, LendingDeposit, PcvDeposit,
    TokenLedger,
};
