//! Venue-facing side of the PCV aggregator.
//!
//! A PCV deposit is any venue that can report how much of the token it
//! holds, account for tokens pushed to it, and send tokens back out. The
//! aggregator only ever talks to venues through [`PcvDeposit`]; concrete
//! venues are chosen at configuration time and resolved by address
//! through the [`DepositVenue`] tagged union.

use alloy::primitives::{Address, U256};

pub mod holding;
pub mod ledger;
pub mod lending;
mod venue;

pub use holding::HoldingDeposit;
pub use ledger::{LedgerError, TokenLedger};
pub use lending::LendingDeposit;
pub use venue::DepositVenue;

/// Capability every sub-deposit exposes to the aggregator.
pub trait PcvDeposit {
    /// Stable identity the aggregator registers the venue under.
    fn address(&self) -> Address;

    /// Token the venue's balance is denominated in.
    fn balance_reported_in(&self) -> Address;

    /// Amount of the token currently held by the venue.
    fn balance(&self, ledger: &TokenLedger) -> U256;

    /// Pulls any tokens already transferred to the venue into its own
    /// accounting.
    fn deposit(&mut self, ledger: &mut TokenLedger) -> Result<(), DepositError>;

    /// Sends `amount` out of the venue to `to`.
    fn withdraw(
        &mut self,
        ledger: &mut TokenLedger,
        to: Address,
        amount: U256,
    ) -> Result<(), DepositError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DepositError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("deposit {deposit} reports in {reported_in} but the ledger holds {ledger_token}")]
    TokenMismatch {
        deposit: Address,
        reported_in: Address,
        ledger_token: Address,
    },
    #[error("deposit {deposit} holds {balance}, cannot withdraw {requested}")]
    InsufficientBalance {
        deposit: Address,
        requested: U256,
        balance: U256,
    },
    #[error("market behind deposit {deposit} can only release {available}, requested {requested}")]
    InsufficientLiquidity {
        deposit: Address,
        requested: U256,
        available: U256,
    },
    #[error("supplied balance overflow in deposit {deposit}")]
    Overflow { deposit: Address },
}

pub(crate) fn ensure_token(
    deposit: Address,
    reported_in: Address,
    ledger: &TokenLedger,
) -> Result<(), DepositError> {
    if ledger.token() != reported_in {
        return Err(DepositError::TokenMismatch {
            deposit,
            reported_in,
            ledger_token: ledger.token(),
        });
    }

    Ok(())
}
