//! Ordered deposit membership with weights.
//!
//! Invariant: `total_weight == buffer_weight + Σ weight`. Every mutation
//! computes the new total before touching any field, so a failed mutation
//! leaves the registry unchanged.

use alloy::primitives::{Address, U256};

use crate::amount::{ArithmeticError, checked_add, checked_sub, checked_sum};
use crate::error::AggregatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositWeight {
    pub deposit: Address,
    pub weight: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositRegistry {
    entries: Vec<DepositWeight>,
    buffer_weight: U256,
    total_weight: U256,
}

impl DepositRegistry {
    pub(crate) fn new(buffer_weight: U256) -> Self {
        Self {
            entries: Vec::new(),
            buffer_weight,
            total_weight: buffer_weight,
        }
    }

    pub fn entries(&self) -> &[DepositWeight] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, deposit: Address) -> bool {
        self.position(deposit).is_some()
    }

    pub fn weight(&self, deposit: Address) -> Option<U256> {
        self.position(deposit).map(|index| self.entries[index].weight)
    }

    pub fn buffer_weight(&self) -> U256 {
        self.buffer_weight
    }

    pub fn total_weight(&self) -> U256 {
        self.total_weight
    }

    /// Sums the weights from scratch.
    pub fn recomputed_total_weight(&self) -> Result<U256, ArithmeticError> {
        checked_sum(
            std::iter::once(self.buffer_weight).chain(self.entries.iter().map(|entry| entry.weight)),
        )
    }

    pub(crate) fn insert(&mut self, deposit: Address, weight: U256) -> Result<(), AggregatorError> {
        if self.contains(deposit) {
            return Err(AggregatorError::DuplicateDeposit(deposit));
        }

        let total_weight = checked_add(self.total_weight, weight)?;

        self.entries.push(DepositWeight { deposit, weight });
        self.total_weight = total_weight;

        Ok(())
    }

    /// Drops the entry and its weight, returning the weight it had.
    pub(crate) fn remove(&mut self, deposit: Address) -> Result<U256, AggregatorError> {
        let index = self
            .position(deposit)
            .ok_or(AggregatorError::UnknownDeposit(deposit))?;

        let weight = self.entries[index].weight;
        let total_weight = checked_sub(self.total_weight, weight)?;

        self.entries.remove(index);
        self.total_weight = total_weight;

        Ok(weight)
    }

    /// Returns the previous weight.
    pub(crate) fn set_weight(
        &mut self,
        deposit: Address,
        weight: U256,
    ) -> Result<U256, AggregatorError> {
        let index = self
            .position(deposit)
            .ok_or(AggregatorError::UnknownDeposit(deposit))?;

        let old_weight = self.entries[index].weight;
        let total_weight = rebase_total(self.total_weight, old_weight, weight)?;

        self.entries[index].weight = weight;
        self.total_weight = total_weight;

        Ok(old_weight)
    }

    /// Returns the previous buffer weight.
    pub(crate) fn set_buffer_weight(&mut self, weight: U256) -> Result<U256, AggregatorError> {
        let old_weight = self.buffer_weight;
        let total_weight = rebase_total(self.total_weight, old_weight, weight)?;

        self.buffer_weight = weight;
        self.total_weight = total_weight;

        Ok(old_weight)
    }

    fn position(&self, deposit: Address) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.deposit == deposit)
    }
}

fn rebase_total(total: U256, old_weight: U256, new_weight: U256) -> Result<U256, ArithmeticError> {
    checked_add(checked_sub(total, old_weight)?, new_weight)
}
