//! Fund movements that close the distances computed from the registry.

use alloy::primitives::{Address, U256};
use tracing::{debug, info};

use super::PcvAggregator;
use super::targets::{DepositTarget, compute_targets, ideal_balance};
use crate::access::Operation;
use crate::amount::{checked_add, checked_sub, checked_sum, mul_div};
use crate::environment::PcvEnvironment;
use crate::error::AggregatorError;
use crate::events::AggregatorEvent;

impl PcvAggregator {
    /// Moves every deposit to its ideal balance.
    ///
    /// All withdrawals run before any deposit, so the second phase never
    /// needs more idle funds than the first phase freed.
    #[tracing::instrument(skip_all, fields(aggregator = %self.address), level = tracing::Level::INFO)]
    pub fn rebalance(&mut self, env: &mut PcvEnvironment) -> Result<(), AggregatorError> {
        self.atomically(env, |aggregator, env| {
            aggregator.ensure_not_paused()?;
            aggregator.rebalance_all(env)
        })
    }

    pub(super) fn rebalance_all(&mut self, env: &mut PcvEnvironment) -> Result<(), AggregatorError> {
        let snapshot = self.snapshot(env)?;
        let total_balance = snapshot.total()?;
        let targets = compute_targets(&snapshot, &self.registry)?;

        for target in targets.iter().filter(|target| target.distance.is_negative()) {
            env.pull_from_venue(target.deposit, self.address, target.excess())?;
        }

        for target in targets.iter().filter(|target| target.distance.is_positive()) {
            env.push_to_venue(self.address, target.deposit, target.shortfall())?;
        }

        self.emit(AggregatorEvent::Rebalanced { total_balance });
        Ok(())
    }

    /// Moves one deposit to its ideal balance.
    ///
    /// An under-target deposit is only topped up from idle funds; when the
    /// aggregator holds too little, rebalance an over-target deposit first.
    #[tracing::instrument(skip(self, env), fields(aggregator = %self.address), level = tracing::Level::INFO)]
    pub fn rebalance_single(
        &mut self,
        deposit: Address,
        env: &mut PcvEnvironment,
    ) -> Result<(), AggregatorError> {
        self.atomically(env, |aggregator, env| {
            aggregator.ensure_not_paused()?;
            aggregator.rebalance_single_unchecked(deposit, env)
        })
    }

    pub(super) fn rebalance_single_unchecked(
        &mut self,
        deposit: Address,
        env: &mut PcvEnvironment,
    ) -> Result<(), AggregatorError> {
        if !self.registry.contains(deposit) {
            return Err(AggregatorError::UnknownDeposit(deposit));
        }

        let snapshot = self.snapshot(env)?;
        let target = compute_targets(&snapshot, &self.registry)?
            .into_iter()
            .find(|target| target.deposit == deposit)
            .ok_or(AggregatorError::UnknownDeposit(deposit))?;

        if target.distance.is_zero() {
            return Err(AggregatorError::NoRebalanceNeeded(deposit));
        }

        if target.distance.is_negative() {
            env.pull_from_venue(deposit, self.address, target.excess())?;
        } else {
            let needed = target.shortfall();
            if snapshot.aggregator < needed {
                return Err(AggregatorError::InsufficientAggregatorLiquidity {
                    deposit,
                    needed,
                    available: snapshot.aggregator,
                });
            }

            env.push_to_venue(self.address, deposit, needed)?;
        }

        self.emit(AggregatorEvent::RebalancedSingle {
            deposit,
            distance: target.distance,
        });
        Ok(())
    }

    /// Pushes idle funds above the buffer target to under-target deposits,
    /// in proportion to how far each is below its ideal.
    ///
    /// Nothing moves while idle funds are at or below the buffer target.
    #[tracing::instrument(skip_all, fields(aggregator = %self.address), level = tracing::Level::INFO)]
    pub fn deposit(&mut self, env: &mut PcvEnvironment) -> Result<(), AggregatorError> {
        self.atomically(env, |aggregator, env| {
            aggregator.ensure_not_paused()?;
            aggregator.distribute_surplus(env)
        })
    }

    fn distribute_surplus(&mut self, env: &mut PcvEnvironment) -> Result<(), AggregatorError> {
        let snapshot = self.snapshot(env)?;
        let total_balance = snapshot.total()?;
        let ideal_idle = ideal_balance(
            total_balance,
            self.registry.buffer_weight(),
            self.registry.total_weight(),
        )?;

        if snapshot.aggregator <= ideal_idle {
            debug!(idle = %snapshot.aggregator, %ideal_idle, "Buffer not above target, nothing to distribute");
            return Ok(());
        }

        let surplus = snapshot.aggregator - ideal_idle;
        let targets = compute_targets(&snapshot, &self.registry)?;
        let total_need = checked_sum(targets.iter().map(DepositTarget::shortfall))?;
        // Rounding dust in the ideals can leave the surplus above the total need.
        let distributable = surplus.min(total_need);

        let mut distributed = U256::ZERO;
        for target in &targets {
            let amount = mul_div(distributable, target.shortfall(), total_need)?;
            if amount.is_zero() {
                continue;
            }

            env.push_to_venue(self.address, target.deposit, amount)?;
            distributed = checked_add(distributed, amount)?;
        }

        info!(%surplus, %distributed, "Distributed idle surplus");
        self.emit(AggregatorEvent::AggregatorDeposit { distributed });
        Ok(())
    }

    /// Sends `amount` to `to`.
    ///
    /// Idle funds are used when they suffice. Otherwise only deposits
    /// holding more than their ideal share of the remaining underlying
    /// balance are drawn down, which moves the set toward its targets.
    #[tracing::instrument(skip(self, env), fields(aggregator = %self.address), level = tracing::Level::INFO)]
    pub fn withdraw(
        &mut self,
        caller: Address,
        to: Address,
        amount: U256,
        env: &mut PcvEnvironment,
    ) -> Result<(), AggregatorError> {
        self.atomically(env, |aggregator, env| {
            aggregator.authorize(caller, Operation::Withdraw)?;
            aggregator.ensure_not_paused()?;
            aggregator.withdraw_unchecked(to, amount, env)
        })
    }

    fn withdraw_unchecked(
        &mut self,
        to: Address,
        amount: U256,
        env: &mut PcvEnvironment,
    ) -> Result<(), AggregatorError> {
        let snapshot = self.snapshot(env)?;

        if amount > snapshot.aggregator {
            let total_balance = snapshot.total()?;
            if total_balance < amount {
                return Err(AggregatorError::InsufficientTotalBalance {
                    requested: amount,
                    available: total_balance,
                });
            }

            let needed = amount - snapshot.aggregator;
            let underlying_after = checked_sub(snapshot.underlying, needed)?;

            for (entry, held) in self.registry.entries().iter().zip(&snapshot.deposits) {
                let ideal_after =
                    mul_div(underlying_after, entry.weight, self.registry.total_weight())?;

                if held.balance > ideal_after {
                    env.pull_from_venue(entry.deposit, self.address, held.balance - ideal_after)?;
                }
            }
        }

        env.transfer(self.address, to, amount)?;
        self.emit(AggregatorEvent::AggregatorWithdrawal { to, amount });
        Ok(())
    }
}
