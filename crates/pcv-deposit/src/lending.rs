//! Venue modelling a position in a lending market.
//!
//! Tokens pushed to the deposit sit idle at its address until
//! [`PcvDeposit::deposit`] supplies them to the market. Only supplied
//! tokens count towards the reported balance. Withdrawals can be bounded
//! by the market's available liquidity, which is the usual way such a
//! venue fails in practice.

use alloy::primitives::{Address, U256};
use tracing::{debug, warn};

use crate::{DepositError, PcvDeposit, TokenLedger, ensure_token};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LendingDeposit {
    address: Address,
    token: Address,
    /// Ledger account holding the tokens supplied to the market.
    market: Address,
    supplied: U256,
    /// Liquidity the market can currently release. `None` means unbounded.
    available_liquidity: Option<U256>,
}

impl LendingDeposit {
    pub fn new(address: Address, token: Address, market: Address) -> Self {
        Self {
            address,
            token,
            market,
            supplied: U256::ZERO,
            available_liquidity: None,
        }
    }

    #[must_use]
    pub fn with_available_liquidity(mut self, available_liquidity: U256) -> Self {
        self.available_liquidity = Some(available_liquidity);
        self
    }

    pub fn supplied(&self) -> U256 {
        self.supplied
    }

    pub fn available_liquidity(&self) -> Option<U256> {
        self.available_liquidity
    }

    pub fn set_available_liquidity(&mut self, available_liquidity: Option<U256>) {
        self.available_liquidity = available_liquidity;
    }

    /// Reinstates a saved position. The market account's tokens are
    /// restored separately through the ledger.
    pub fn restore_position(&mut self, supplied: U256, available_liquidity: Option<U256>) {
        self.supplied = supplied;
        self.available_liquidity = available_liquidity;
    }
}

impl PcvDeposit for LendingDeposit {
    fn address(&self) -> Address {
        self.address
    }

    fn balance_reported_in(&self) -> Address {
        self.token
    }

    fn balance(&self, _ledger: &TokenLedger) -> U256 {
        self.supplied
    }

    fn deposit(&mut self, ledger: &mut TokenLedger) -> Result<(), DepositError> {
        ensure_token(self.address, self.token, ledger)?;

        let idle = ledger.balance_of(self.address);
        if idle.is_zero() {
            return Ok(());
        }

        let supplied = self
            .supplied
            .checked_add(idle)
            .ok_or(DepositError::Overflow {
                deposit: self.address,
            })?;

        ledger.transfer(self.address, self.market, idle)?;
        self.supplied = supplied;

        debug!(deposit = %self.address, %idle, supplied = %self.supplied, "Supplied idle tokens to market");
        Ok(())
    }

    fn withdraw(
        &mut self,
        ledger: &mut TokenLedger,
        to: Address,
        amount: U256,
    ) -> Result<(), DepositError> {
        ensure_token(self.address, self.token, ledger)?;

        if self.supplied < amount {
            return Err(DepositError::InsufficientBalance {
                deposit: self.address,
                requested: amount,
                balance: self.supplied,
            });
        }

        if let Some(available) = self.available_liquidity
            && available < amount
        {
            warn!(deposit = %self.address, %amount, %available, "Market liquidity too low for withdrawal");
            return Err(DepositError::InsufficientLiquidity {
                deposit: self.address,
                requested: amount,
                available,
            });
        }

        ledger.transfer(self.market, to, amount)?;
        self.supplied -= amount;
        if let Some(available) = self.available_liquidity.as_mut() {
            *available -= amount;
        }

        debug!(deposit = %self.address, %to, %amount, "Withdrew from lending market");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;
    use tracing_test::traced_test;

    use super::*;

    const TOKEN: Address = address!("0x956f47f50a910163d8bf957cf5846d573e7f87ca");
    const DEPOSIT: Address = address!("0xd000000000000000000000000000000000000002");
    const MARKET: Address = address!("0x3d9819210a31b4961b30ef54be2aed79b9c9cd3b");
    const RECIPIENT: Address = address!("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");

    fn funded(amount: u64) -> (TokenLedger, LendingDeposit) {
        let mut ledger = TokenLedger::new(TOKEN);
        let mut lending = LendingDeposit::new(DEPOSIT, TOKEN, MARKET);
        ledger.mint(DEPOSIT, U256::from(amount)).unwrap();
        lending.deposit(&mut ledger).unwrap();
        (ledger, lending)
    }

    #[test]
    fn idle_tokens_do_not_count_until_supplied() {
        let mut ledger = TokenLedger::new(TOKEN);
        let mut lending = LendingDeposit::new(DEPOSIT, TOKEN, MARKET);
        ledger.mint(DEPOSIT, U256::from(100)).unwrap();

        assert_eq!(lending.balance(&ledger), U256::ZERO);

        lending.deposit(&mut ledger).unwrap();

        assert_eq!(lending.balance(&ledger), U256::from(100));
        assert_eq!(ledger.balance_of(DEPOSIT), U256::ZERO);
        assert_eq!(ledger.balance_of(MARKET), U256::from(100));
    }

    #[test]
    fn deposit_without_idle_tokens_is_noop() {
        let (mut ledger, mut lending) = funded(10);

        lending.deposit(&mut ledger).unwrap();

        assert_eq!(lending.supplied(), U256::from(10));
    }

    #[test]
    fn withdraw_pays_out_of_market() {
        let (mut ledger, mut lending) = funded(100);

        lending
            .withdraw(&mut ledger, RECIPIENT, U256::from(30))
            .unwrap();

        assert_eq!(lending.balance(&ledger), U256::from(70));
        assert_eq!(ledger.balance_of(MARKET), U256::from(70));
        assert_eq!(ledger.balance_of(RECIPIENT), U256::from(30));
    }

    #[test]
    fn withdraw_beyond_supplied_fails() {
        let (mut ledger, mut lending) = funded(100);

        let error = lending
            .withdraw(&mut ledger, RECIPIENT, U256::from(101))
            .unwrap_err();

        assert_eq!(
            error,
            DepositError::InsufficientBalance {
                deposit: DEPOSIT,
                requested: U256::from(101),
                balance: U256::from(100),
            }
        );
    }

    #[traced_test]
    #[test]
    fn withdraw_beyond_market_liquidity_fails() {
        let (mut ledger, lending) = funded(100);
        let mut lending = lending.with_available_liquidity(U256::from(20));

        let error = lending
            .withdraw(&mut ledger, RECIPIENT, U256::from(21))
            .unwrap_err();

        assert_eq!(
            error,
            DepositError::InsufficientLiquidity {
                deposit: DEPOSIT,
                requested: U256::from(21),
                available: U256::from(20),
            }
        );
        assert_eq!(lending.supplied(), U256::from(100));
        assert!(logs_contain("Market liquidity too low for withdrawal"));
    }

    #[test]
    fn withdraw_consumes_market_liquidity() {
        let (mut ledger, lending) = funded(100);
        let mut lending = lending.with_available_liquidity(U256::from(50));

        lending
            .withdraw(&mut ledger, RECIPIENT, U256::from(20))
            .unwrap();

        assert_eq!(lending.available_liquidity(), Some(U256::from(30)));
    }

    #[test]
    fn restored_position_pays_out_of_market() {
        let mut ledger = TokenLedger::new(TOKEN);
        ledger.mint(MARKET, U256::from(80)).unwrap();
        let mut lending = LendingDeposit::new(DEPOSIT, TOKEN, MARKET);

        lending.restore_position(U256::from(80), Some(U256::from(10)));

        assert_eq!(lending.balance(&ledger), U256::from(80));
        lending
            .withdraw(&mut ledger, RECIPIENT, U256::from(10))
            .unwrap();
        assert_eq!(ledger.balance_of(RECIPIENT), U256::from(10));
        assert_eq!(lending.available_liquidity(), Some(U256::ZERO));
    }
}
