//! Venue that simply holds tokens at its own address.

use alloy::primitives::{Address, U256};
use tracing::debug;

use crate::{DepositError, PcvDeposit, TokenLedger, ensure_token};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldingDeposit {
    address: Address,
    token: Address,
}

impl HoldingDeposit {
    pub fn new(address: Address, token: Address) -> Self {
        Self { address, token }
    }
}

impl PcvDeposit for HoldingDeposit {
    fn address(&self) -> Address {
        self.address
    }

    fn balance_reported_in(&self) -> Address {
        self.token
    }

    fn balance(&self, ledger: &TokenLedger) -> U256 {
        ledger.balance_of(self.address)
    }

    fn deposit(&mut self, ledger: &mut TokenLedger) -> Result<(), DepositError> {
        ensure_token(self.address, self.token, ledger)?;
        debug!(deposit = %self.address, "Holding deposit already accounts for idle tokens");
        Ok(())
    }

    fn withdraw(
        &mut self,
        ledger: &mut TokenLedger,
        to: Address,
        amount: U256,
    ) -> Result<(), DepositError> {
        ensure_token(self.address, self.token, ledger)?;

        let balance = ledger.balance_of(self.address);
        if balance < amount {
            return Err(DepositError::InsufficientBalance {
                deposit: self.address,
                requested: amount,
                balance,
            });
        }

        ledger.transfer(self.address, to, amount)?;
        debug!(deposit = %self.address, %to, %amount, "Withdrew from holding deposit");

        Ok(())
    }
}
