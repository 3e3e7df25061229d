use alloy::primitives::{Address, U256};

use crate::{DepositError, HoldingDeposit, LendingDeposit, PcvDeposit, TokenLedger};

/// Concrete venue variants, selected when the environment is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositVenue {
    Holding(HoldingDeposit),
    Lending(LendingDeposit),
}

impl DepositVenue {
    fn as_deposit(&self) -> &dyn PcvDeposit {
        match self {
            Self::Holding(holding) => holding,
            Self::Lending(lending) => lending,
        }
    }

    fn as_deposit_mut(&mut self) -> &mut dyn PcvDeposit {
        match self {
            Self::Holding(holding) => holding,
            Self::Lending(lending) => lending,
        }
    }
}

impl From<HoldingDeposit> for DepositVenue {
    fn from(holding: HoldingDeposit) -> Self {
        Self::Holding(holding)
    }
}

impl From<LendingDeposit> for DepositVenue {
    fn from(lending: LendingDeposit) -> Self {
        Self::Lending(lending)
    }
}

impl PcvDeposit for DepositVenue {
    fn address(&self) -> Address {
        self.as_deposit().address()
    }

    fn balance_reported_in(&self) -> Address {
        self.as_deposit().balance_reported_in()
    }

    fn balance(&self, ledger: &TokenLedger) -> U256 {
        self.as_deposit().balance(ledger)
    }

    fn deposit(&mut self, ledger: &mut TokenLedger) -> Result<(), DepositError> {
        self.as_deposit_mut().deposit(ledger)
    }

    fn withdraw(
        &mut self,
        ledger: &mut TokenLedger,
        to: Address,
        amount: U256,
    ) -> Result<(), DepositError> {
        self.as_deposit_mut().withdraw(ledger, to, amount)
    }
}
