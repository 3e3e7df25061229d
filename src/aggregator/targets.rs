//! Ideal balances and signed distances from them.
//!
//! `ideal = total * weight / total_weight`, truncated. The truncation
//! leaves a little dust in the buffer, which is accepted. A positive
//! distance means the deposit is under target and needs funds; a negative
//! one means it holds too much.

use alloy::primitives::{Address, I256, U256};

use super::registry::DepositRegistry;
use super::snapshot::BalanceSnapshot;
use crate::amount::{mul_div, signed_difference};
use crate::error::AggregatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositTarget {
    pub deposit: Address,
    pub weight: U256,
    pub actual: U256,
    pub ideal: U256,
    pub distance: I256,
}

impl DepositTarget {
    /// Amount the deposit is short of its ideal, zero when at or above it.
    pub fn shortfall(&self) -> U256 {
        if self.distance.is_positive() {
            self.distance.unsigned_abs()
        } else {
            U256::ZERO
        }
    }

    /// Amount the deposit holds above its ideal, zero when at or below it.
    pub fn excess(&self) -> U256 {
        if self.distance.is_negative() {
            self.distance.unsigned_abs()
        } else {
            U256::ZERO
        }
    }
}

pub(crate) fn ideal_balance(
    total_balance: U256,
    weight: U256,
    total_weight: U256,
) -> Result<U256, AggregatorError> {
    Ok(mul_div(total_balance, weight, total_weight)?)
}

/// Targets for every registered deposit, in registry order.
pub(crate) fn compute_targets(
    snapshot: &BalanceSnapshot,
    registry: &DepositRegistry,
) -> Result<Vec<DepositTarget>, AggregatorError> {
    let total_balance = snapshot.total()?;

    registry
        .entries()
        .iter()
        .zip(&snapshot.deposits)
        .map(|(entry, held)| {
            let ideal = ideal_balance(total_balance, entry.weight, registry.total_weight())?;

            Ok(DepositTarget {
                deposit: entry.deposit,
                weight: entry.weight,
                actual: held.balance,
                ideal,
                distance: signed_difference(ideal, held.balance)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;
    use crate::aggregator::snapshot::DepositBalance;

    const FIRST: Address = address!("0xd000000000000000000000000000000000000001");
    const SECOND: Address = address!("0xd000000000000000000000000000000000000002");
    const THIRD: Address = address!("0xd000000000000000000000000000000000000003");

    fn signed(value: i64) -> I256 {
        I256::try_from(value).unwrap()
    }

    fn snapshot(aggregator: u64, balances: &[(Address, u64)]) -> BalanceSnapshot {
        let deposits: Vec<_> = balances
            .iter()
            .map(|(deposit, balance)| DepositBalance {
                deposit: *deposit,
                balance: U256::from(*balance),
            })
            .collect();
        let underlying = deposits.iter().map(|deposit| deposit.balance).sum();

        BalanceSnapshot {
            aggregator: U256::from(aggregator),
            deposits,
            underlying,
        }
    }

    fn registry(buffer: u64, weights: &[(Address, u64)]) -> DepositRegistry {
        let mut registry = DepositRegistry::new(U256::from(buffer));
        for (deposit, weight) in weights {
            registry.insert(*deposit, U256::from(*weight)).unwrap();
        }
        registry
    }

    #[test]
    fn distances_point_toward_weighted_targets() {
        let registry = registry(0, &[(FIRST, 1), (SECOND, 1), (THIRD, 2)]);
        let snapshot = snapshot(0, &[(FIRST, 200), (SECOND, 0), (THIRD, 200)]);

        let targets = compute_targets(&snapshot, &registry).unwrap();

        let ideals: Vec<_> = targets.iter().map(|target| target.ideal).collect();
        assert_eq!(
            ideals,
            vec![U256::from(100), U256::from(100), U256::from(200)]
        );
        let distances: Vec<_> = targets.iter().map(|target| target.distance).collect();
        assert_eq!(distances, vec![signed(-100), signed(100), signed(0)]);
    }

    #[test]
    fn idle_balance_counts_toward_total() {
        let registry = registry(1, &[(FIRST, 1)]);
        let snapshot = snapshot(100, &[(FIRST, 0)]);

        let targets = compute_targets(&snapshot, &registry).unwrap();

        assert_eq!(targets[0].ideal, U256::from(50));
        assert_eq!(targets[0].shortfall(), U256::from(50));
        assert_eq!(targets[0].excess(), U256::ZERO);
    }

    #[test]
    fn ideal_truncates_toward_zero() {
        let registry = registry(0, &[(FIRST, 1), (SECOND, 1), (THIRD, 1)]);
        let snapshot = snapshot(100, &[(FIRST, 0), (SECOND, 0), (THIRD, 0)]);

        let targets = compute_targets(&snapshot, &registry).unwrap();

        assert!(targets.iter().all(|target| target.ideal == U256::from(33)));
    }

    #[test]
    fn zero_total_weight_targets_nothing() {
        let registry = registry(0, &[(FIRST, 0)]);
        let snapshot = snapshot(0, &[(FIRST, 70)]);

        let targets = compute_targets(&snapshot, &registry).unwrap();

        assert_eq!(targets[0].ideal, U256::ZERO);
        assert_eq!(targets[0].excess(), U256::from(70));
    }
}
