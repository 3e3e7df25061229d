//! Weighted allocation of one token across a set of PCV deposits.
//!
//! [`PcvAggregator`] owns the deposit registry and acts on a shared
//! [`PcvEnvironment`]. Balances are read fresh from the environment on
//! every call. Every public mutating operation runs through
//! [`PcvAggregator::atomically`], so it either commits all of its
//! transfers, registry changes and events or none of them.

mod migration;
mod rebalance;
pub mod registry;
pub mod snapshot;
pub mod targets;

use alloy::primitives::{Address, I256, U256};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use pcv_deposit::PcvDeposit;

use crate::access::{AccessControl, Operation};
use crate::amount::{checked_add, ratio};
use crate::asset_manager::RewardsAssetManager;
use crate::environment::PcvEnvironment;
use crate::error::AggregatorError;
use crate::events::AggregatorEvent;
use crate::persistence::RegistryRecord;
use registry::{DepositRegistry, DepositWeight};
use snapshot::BalanceSnapshot;
use targets::{DepositTarget, compute_targets};

/// Constructor arguments. `deposits` and `weights` are parallel lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorSetup {
    pub address: Address,
    pub token: Address,
    pub buffer_weight: U256,
    pub deposits: Vec<Address>,
    pub weights: Vec<U256>,
}

#[derive(Debug, Clone)]
pub struct PcvAggregator {
    address: Address,
    token: Address,
    registry: DepositRegistry,
    paused: bool,
    access: Arc<dyn AccessControl>,
    asset_manager: Arc<dyn RewardsAssetManager>,
    events: Vec<AggregatorEvent>,
}

impl PcvAggregator {
    pub fn new(
        setup: AggregatorSetup,
        access: Arc<dyn AccessControl>,
        asset_manager: Arc<dyn RewardsAssetManager>,
        env: &PcvEnvironment,
    ) -> Result<Self, AggregatorError> {
        if setup.deposits.len() != setup.weights.len() {
            return Err(AggregatorError::LengthMismatch {
                deposits: setup.deposits.len(),
                weights: setup.weights.len(),
            });
        }

        let mut aggregator = Self::empty(
            setup.address,
            setup.token,
            setup.buffer_weight,
            access,
            asset_manager,
            env,
        )?;

        for (deposit, weight) in setup.deposits.into_iter().zip(setup.weights) {
            aggregator.ensure_venue(deposit, env)?;
            aggregator.registry.insert(deposit, weight)?;
            aggregator.emit(AggregatorEvent::DepositAdded { deposit, weight });
        }

        info!(
            aggregator = %aggregator.address,
            deposits = aggregator.registry.len(),
            total_weight = %aggregator.registry.total_weight(),
            "Aggregator created"
        );

        Ok(aggregator)
    }

    /// Rebuilds an aggregator from persisted registry state without
    /// emitting events.
    pub fn restore(
        record: &RegistryRecord,
        access: Arc<dyn AccessControl>,
        asset_manager: Arc<dyn RewardsAssetManager>,
        env: &PcvEnvironment,
    ) -> Result<Self, AggregatorError> {
        let mut aggregator = Self::empty(
            record.address,
            record.token,
            record.buffer_weight,
            access,
            asset_manager,
            env,
        )?;

        for entry in &record.deposits {
            aggregator.ensure_venue(entry.deposit, env)?;
            aggregator.registry.insert(entry.deposit, entry.weight)?;
        }
        aggregator.paused = record.paused;

        Ok(aggregator)
    }

    fn empty(
        address: Address,
        token: Address,
        buffer_weight: U256,
        access: Arc<dyn AccessControl>,
        asset_manager: Arc<dyn RewardsAssetManager>,
        env: &PcvEnvironment,
    ) -> Result<Self, AggregatorError> {
        if token != env.token() {
            return Err(AggregatorError::TokenMismatch {
                expected: env.token(),
                actual: token,
            });
        }

        Ok(Self {
            address,
            token,
            registry: DepositRegistry::new(buffer_weight),
            paused: false,
            access,
            asset_manager,
            events: Vec::new(),
        })
    }

    pub fn record(&self) -> RegistryRecord {
        RegistryRecord {
            address: self.address,
            token: self.token,
            buffer_weight: self.registry.buffer_weight(),
            paused: self.paused,
            asset_manager: self.asset_manager.address(),
            deposits: self.registry.entries().to_vec(),
        }
    }

    /// Runs `operation` against staged copies of the aggregator and the
    /// environment, committing both only if it succeeds.
    pub(crate) fn atomically<T>(
        &mut self,
        env: &mut PcvEnvironment,
        operation: impl FnOnce(&mut Self, &mut PcvEnvironment) -> Result<T, AggregatorError>,
    ) -> Result<T, AggregatorError> {
        let mut staged = self.clone();
        let mut staged_env = env.clone();

        match operation(&mut staged, &mut staged_env) {
            Ok(value) => {
                staged.log_events_since(self.events.len());
                *self = staged;
                *env = staged_env;
                Ok(value)
            }
            Err(error) => {
                warn!(aggregator = %self.address, %error, "Operation rolled back");
                Err(error)
            }
        }
    }

    fn authorize(&self, caller: Address, operation: Operation) -> Result<(), AggregatorError> {
        if self.access.is_authorized(caller, operation) {
            Ok(())
        } else {
            Err(AggregatorError::Unauthorized { caller, operation })
        }
    }

    fn ensure_not_paused(&self) -> Result<(), AggregatorError> {
        if self.paused {
            Err(AggregatorError::Paused)
        } else {
            Ok(())
        }
    }

    fn ensure_venue(&self, deposit: Address, env: &PcvEnvironment) -> Result<(), AggregatorError> {
        let venue = env
            .venue(deposit)
            .ok_or(AggregatorError::VenueNotFound(deposit))?;

        let reported_in = venue.balance_reported_in();
        if reported_in != self.token {
            return Err(AggregatorError::TokenMismatch {
                expected: self.token,
                actual: reported_in,
            });
        }

        Ok(())
    }

    fn emit(&mut self, event: AggregatorEvent) {
        self.events.push(event);
    }

    /// Logs events emitted after the first `committed` ones.
    fn log_events_since(&self, committed: usize) {
        for event in self.events.get(committed..).unwrap_or_default() {
            info!(aggregator = %self.address, %event, "Aggregator event");
        }
    }

    fn snapshot(&self, env: &PcvEnvironment) -> Result<BalanceSnapshot, AggregatorError> {
        BalanceSnapshot::take(self.address, &self.registry, env)
    }

    pub fn events(&self) -> &[AggregatorEvent] {
        &self.events
    }

    /// Hands over the committed events, leaving the log empty.
    pub fn drain_events(&mut self) -> Vec<AggregatorEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn add_pcv_deposit(
        &mut self,
        caller: Address,
        deposit: Address,
        weight: U256,
        env: &PcvEnvironment,
    ) -> Result<(), AggregatorError> {
        self.authorize(caller, Operation::AddDeposit)?;
        if self.registry.contains(deposit) {
            return Err(AggregatorError::DuplicateDeposit(deposit));
        }
        self.ensure_venue(deposit, env)?;

        self.registry.insert(deposit, weight)?;
        self.emit(AggregatorEvent::DepositAdded { deposit, weight });

        info!(aggregator = %self.address, %deposit, %weight, "Deposit added");
        Ok(())
    }

    /// Drains the deposit back into the aggregator, then unregisters it.
    ///
    /// A deposit with zero weight and zero balance is dropped directly.
    /// Otherwise its weight goes to zero first and a single-deposit
    /// rebalance pulls its whole balance out; a deposit that already
    /// holds nothing needs no rebalance.
    pub fn remove_pcv_deposit(
        &mut self,
        caller: Address,
        deposit: Address,
        env: &mut PcvEnvironment,
    ) -> Result<(), AggregatorError> {
        self.atomically(env, |aggregator, env| {
            aggregator.authorize(caller, Operation::RemoveDeposit)?;

            let weight = aggregator
                .registry
                .weight(deposit)
                .ok_or(AggregatorError::UnknownDeposit(deposit))?;
            let balance = env.venue_balance(deposit)?;

            if weight.is_zero() && balance.is_zero() {
                aggregator.registry.remove(deposit)?;
                aggregator.emit(AggregatorEvent::DepositRemoved { deposit });
                return Ok(());
            }

            let old_weight = aggregator.registry.set_weight(deposit, U256::ZERO)?;
            aggregator.emit(AggregatorEvent::DepositWeightUpdate {
                deposit,
                old_weight,
                new_weight: U256::ZERO,
            });

            match aggregator.rebalance_single_unchecked(deposit, env) {
                Ok(()) | Err(AggregatorError::NoRebalanceNeeded(_)) => {}
                Err(error) => return Err(error),
            }

            aggregator.registry.remove(deposit)?;
            aggregator.emit(AggregatorEvent::DepositRemoved { deposit });
            Ok(())
        })
    }

    pub fn set_pcv_deposit_weight(
        &mut self,
        caller: Address,
        deposit: Address,
        weight: U256,
    ) -> Result<(), AggregatorError> {
        self.authorize(caller, Operation::SetDepositWeight)?;

        let old_weight = self.registry.set_weight(deposit, weight)?;
        self.emit(AggregatorEvent::DepositWeightUpdate {
            deposit,
            old_weight,
            new_weight: weight,
        });

        info!(aggregator = %self.address, %deposit, %old_weight, new_weight = %weight, "Deposit weight updated");
        Ok(())
    }

    pub fn set_buffer_weight(&mut self, caller: Address, weight: U256) -> Result<(), AggregatorError> {
        self.authorize(caller, Operation::SetBufferWeight)?;

        let old_weight = self.registry.set_buffer_weight(weight)?;
        self.emit(AggregatorEvent::BufferWeightUpdate {
            old_weight,
            new_weight: weight,
        });

        info!(aggregator = %self.address, %old_weight, new_weight = %weight, "Buffer weight updated");
        Ok(())
    }

    pub fn set_asset_manager(
        &mut self,
        caller: Address,
        asset_manager: Arc<dyn RewardsAssetManager>,
    ) -> Result<(), AggregatorError> {
        self.authorize(caller, Operation::SetAssetManager)?;

        let old_asset_manager = self.asset_manager.address();
        let new_asset_manager = asset_manager.address();
        self.asset_manager = asset_manager;
        self.emit(AggregatorEvent::AssetManagerUpdate {
            old_asset_manager,
            new_asset_manager,
        });

        Ok(())
    }

    /// Blocks fund movements. Pausing an already paused aggregator is a
    /// no-op.
    pub fn pause(&mut self, caller: Address) -> Result<(), AggregatorError> {
        self.authorize(caller, Operation::Pause)?;

        if !self.paused {
            self.paused = true;
            self.emit(AggregatorEvent::Paused { by: caller });
        }

        Ok(())
    }

    pub fn unpause(&mut self, caller: Address) -> Result<(), AggregatorError> {
        self.authorize(caller, Operation::Unpause)?;

        if self.paused {
            self.paused = false;
            self.emit(AggregatorEvent::Unpaused { by: caller });
        }

        Ok(())
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Token every registered deposit reports its balance in.
    pub fn balance_reported_in(&self) -> Address {
        self.token
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn registry(&self) -> &DepositRegistry {
        &self.registry
    }

    pub fn buffer_weight(&self) -> U256 {
        self.registry.buffer_weight()
    }

    pub fn total_weight(&self) -> U256 {
        self.registry.total_weight()
    }

    pub fn asset_manager(&self) -> Address {
        self.asset_manager.address()
    }

    pub fn pcv_deposits(&self) -> &[DepositWeight] {
        self.registry.entries()
    }

    pub fn has_pcv_deposit(&self, deposit: Address) -> bool {
        self.registry.contains(deposit)
    }

    pub fn idle_balance(&self, env: &PcvEnvironment) -> U256 {
        env.balance_of(self.address)
    }

    /// Idle funds plus everything the registered deposits report.
    pub fn get_total_balance(&self, env: &PcvEnvironment) -> Result<U256, AggregatorError> {
        self.snapshot(env)?.total()
    }

    /// Signed distance of `deposit` from its ideal balance.
    pub fn amount_from_target(
        &self,
        deposit: Address,
        env: &PcvEnvironment,
    ) -> Result<I256, AggregatorError> {
        if !self.registry.contains(deposit) {
            return Err(AggregatorError::UnknownDeposit(deposit));
        }

        self.get_all_amounts_from_targets(env)?
            .into_iter()
            .find(|target| target.deposit == deposit)
            .map(|target| target.distance)
            .ok_or(AggregatorError::UnknownDeposit(deposit))
    }

    pub fn get_all_amounts_from_targets(
        &self,
        env: &PcvEnvironment,
    ) -> Result<Vec<DepositTarget>, AggregatorError> {
        compute_targets(&self.snapshot(env)?, &self.registry)
    }

    /// `weight / total_weight`.
    pub fn normalized_target_weight(&self, deposit: Address) -> Result<Decimal, AggregatorError> {
        let weight = self
            .registry
            .weight(deposit)
            .ok_or(AggregatorError::UnknownDeposit(deposit))?;

        Ok(ratio(weight, self.registry.total_weight())?)
    }

    /// Share of the total balance `deposit` would hold after receiving
    /// `hypothetical_deposit` more.
    pub fn percent_held(
        &self,
        deposit: Address,
        hypothetical_deposit: U256,
        env: &PcvEnvironment,
    ) -> Result<Decimal, AggregatorError> {
        if !self.registry.contains(deposit) {
            return Err(AggregatorError::UnknownDeposit(deposit));
        }

        let snapshot = self.snapshot(env)?;
        let held = snapshot
            .balance_of(deposit)
            .ok_or(AggregatorError::UnknownDeposit(deposit))?;

        Ok(ratio(
            checked_add(held, hypothetical_deposit)?,
            checked_add(snapshot.total()?, hypothetical_deposit)?,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use tracing_test::traced_test;

    use super::*;
    use crate::access::{Role, RoleTable};
    use crate::amount::RatioError;
    use crate::asset_manager::LocalAssetManager;
    use crate::test_utils::{
        AGGREGATOR, ASSET_MANAGER, FIRST, GOVERNOR, GUARDIAN, OUTSIDER, SECOND, THIRD, TOKEN,
        aggregator_with, environment, setup,
    };

    fn amount(value: u64) -> U256 {
        U256::from(value)
    }

    #[test]
    fn new_rejects_mismatched_argument_lengths() {
        let env = environment();
        let mut setup = setup(0, &[(FIRST, 1), (SECOND, 1)]);
        setup.weights.pop();

        let error = PcvAggregator::new(
            setup,
            Arc::new(RoleTable::default()),
            Arc::new(LocalAssetManager::new(ASSET_MANAGER)),
            &env,
        )
        .unwrap_err();

        assert_eq!(
            error,
            AggregatorError::LengthMismatch {
                deposits: 2,
                weights: 1
            }
        );
    }

    #[test]
    fn new_rejects_duplicate_deposits() {
        let env = environment();

        let error = PcvAggregator::new(
            setup(0, &[(FIRST, 1), (FIRST, 2)]),
            Arc::new(RoleTable::default()),
            Arc::new(LocalAssetManager::new(ASSET_MANAGER)),
            &env,
        )
        .unwrap_err();

        assert_eq!(error, AggregatorError::DuplicateDeposit(FIRST));
    }

    #[test]
    fn new_rejects_foreign_token() {
        let env = environment();
        let mut setup = setup(0, &[]);
        setup.token = OUTSIDER;

        let error = PcvAggregator::new(
            setup,
            Arc::new(RoleTable::default()),
            Arc::new(LocalAssetManager::new(ASSET_MANAGER)),
            &env,
        )
        .unwrap_err();

        assert_eq!(
            error,
            AggregatorError::TokenMismatch {
                expected: TOKEN,
                actual: OUTSIDER
            }
        );
    }

    #[test]
    fn new_emits_deposit_added_in_order() {
        let env = environment();
        let aggregator = aggregator_with(&env, 1, &[(FIRST, 2), (SECOND, 3)]);

        assert_eq!(aggregator.total_weight(), amount(6));
        assert_eq!(
            aggregator.events(),
            &[
                AggregatorEvent::DepositAdded {
                    deposit: FIRST,
                    weight: amount(2)
                },
                AggregatorEvent::DepositAdded {
                    deposit: SECOND,
                    weight: amount(3)
                },
            ]
        );
    }

    #[test]
    fn add_pcv_deposit_requires_governor() {
        let env = environment();
        let mut aggregator = aggregator_with(&env, 0, &[]);

        let error = aggregator
            .add_pcv_deposit(GUARDIAN, FIRST, amount(1), &env)
            .unwrap_err();

        assert_eq!(
            error,
            AggregatorError::Unauthorized {
                caller: GUARDIAN,
                operation: Operation::AddDeposit
            }
        );
        assert!(!aggregator.has_pcv_deposit(FIRST));
    }

    #[test]
    fn add_pcv_deposit_rejects_duplicates_and_missing_venues() {
        let env = environment();
        let mut aggregator = aggregator_with(&env, 0, &[(FIRST, 1)]);

        assert_eq!(
            aggregator
                .add_pcv_deposit(GOVERNOR, FIRST, amount(1), &env)
                .unwrap_err(),
            AggregatorError::DuplicateDeposit(FIRST)
        );
        assert_eq!(
            aggregator
                .add_pcv_deposit(GOVERNOR, OUTSIDER, amount(1), &env)
                .unwrap_err(),
            AggregatorError::VenueNotFound(OUTSIDER)
        );
        assert_eq!(aggregator.total_weight(), amount(1));
    }

    #[test]
    fn weight_mutations_keep_total_consistent() {
        let env = environment();
        let mut aggregator = aggregator_with(&env, 2, &[(FIRST, 3)]);

        aggregator
            .add_pcv_deposit(GOVERNOR, SECOND, amount(5), &env)
            .unwrap();
        aggregator
            .set_pcv_deposit_weight(GUARDIAN, FIRST, amount(1))
            .unwrap();
        aggregator.set_buffer_weight(GUARDIAN, amount(4)).unwrap();

        assert_eq!(aggregator.total_weight(), amount(10));
        assert_eq!(
            aggregator.registry().recomputed_total_weight().unwrap(),
            amount(10)
        );
        assert_eq!(
            aggregator.events().last(),
            Some(&AggregatorEvent::BufferWeightUpdate {
                old_weight: amount(2),
                new_weight: amount(4)
            })
        );
    }

    #[test]
    fn set_weight_of_unknown_deposit_fails() {
        let env = environment();
        let mut aggregator = aggregator_with(&env, 0, &[]);

        assert_eq!(
            aggregator
                .set_pcv_deposit_weight(GOVERNOR, FIRST, amount(1))
                .unwrap_err(),
            AggregatorError::UnknownDeposit(FIRST)
        );
    }

    #[test]
    fn remove_empty_zero_weight_deposit_skips_rebalance() {
        let mut env = environment();
        let mut aggregator = aggregator_with(&env, 0, &[(FIRST, 0), (SECOND, 1)]);
        aggregator.drain_events();

        aggregator
            .remove_pcv_deposit(GOVERNOR, FIRST, &mut env)
            .unwrap();

        assert!(!aggregator.has_pcv_deposit(FIRST));
        assert_eq!(
            aggregator.events(),
            &[AggregatorEvent::DepositRemoved { deposit: FIRST }]
        );
    }

    #[test]
    fn remove_weighted_empty_deposit_tolerates_no_rebalance_needed() {
        let mut env = environment();
        let mut aggregator = aggregator_with(&env, 0, &[(FIRST, 3), (SECOND, 1)]);
        aggregator.drain_events();

        aggregator
            .remove_pcv_deposit(GOVERNOR, FIRST, &mut env)
            .unwrap();

        assert!(!aggregator.has_pcv_deposit(FIRST));
        assert_eq!(aggregator.total_weight(), amount(1));
        assert_eq!(
            aggregator.events(),
            &[
                AggregatorEvent::DepositWeightUpdate {
                    deposit: FIRST,
                    old_weight: amount(3),
                    new_weight: U256::ZERO
                },
                AggregatorEvent::DepositRemoved { deposit: FIRST },
            ]
        );
    }

    #[test]
    fn remove_unknown_deposit_fails() {
        let mut env = environment();
        let mut aggregator = aggregator_with(&env, 0, &[]);

        assert_eq!(
            aggregator
                .remove_pcv_deposit(GOVERNOR, FIRST, &mut env)
                .unwrap_err(),
            AggregatorError::UnknownDeposit(FIRST)
        );
    }

    #[test]
    fn pause_is_guarded_and_idempotent() {
        let env = environment();
        let mut aggregator = aggregator_with(&env, 0, &[]);
        aggregator.drain_events();

        assert!(matches!(
            aggregator.pause(OUTSIDER).unwrap_err(),
            AggregatorError::Unauthorized { .. }
        ));

        aggregator.pause(GUARDIAN).unwrap();
        aggregator.pause(GOVERNOR).unwrap();
        assert!(aggregator.is_paused());

        aggregator.unpause(GOVERNOR).unwrap();
        assert!(!aggregator.is_paused());
        assert_eq!(
            aggregator.drain_events(),
            vec![
                AggregatorEvent::Paused { by: GUARDIAN },
                AggregatorEvent::Unpaused { by: GOVERNOR },
            ]
        );
    }

    #[test]
    fn set_asset_manager_swaps_collaborator() {
        let env = environment();
        let mut aggregator = aggregator_with(&env, 0, &[]);
        let replacement = Address::with_last_byte(0x77);

        aggregator
            .set_asset_manager(GOVERNOR, Arc::new(LocalAssetManager::new(replacement)))
            .unwrap();

        assert_eq!(aggregator.asset_manager(), replacement);
        assert_eq!(
            aggregator.events().last(),
            Some(&AggregatorEvent::AssetManagerUpdate {
                old_asset_manager: ASSET_MANAGER,
                new_asset_manager: replacement
            })
        );
    }

    #[test]
    fn views_report_weights_and_holdings() {
        let mut env = environment();
        env.mint(AGGREGATOR, amount(100)).unwrap();
        env.mint(FIRST, amount(300)).unwrap();
        let aggregator = aggregator_with(&env, 1, &[(FIRST, 1), (SECOND, 2)]);

        assert_eq!(aggregator.get_total_balance(&env).unwrap(), amount(400));
        assert_eq!(
            aggregator.normalized_target_weight(SECOND).unwrap(),
            dec!(0.5)
        );
        assert_eq!(
            aggregator.percent_held(FIRST, U256::ZERO, &env).unwrap(),
            dec!(0.75)
        );
        assert_eq!(
            aggregator.percent_held(SECOND, amount(100), &env).unwrap(),
            dec!(0.2)
        );
        assert_eq!(
            aggregator.amount_from_target(FIRST, &env).unwrap(),
            I256::try_from(-200).unwrap()
        );
        assert_eq!(aggregator.balance_reported_in(), TOKEN);
    }

    #[test]
    fn ratio_views_reject_empty_denominators() {
        let env = environment();
        let aggregator = aggregator_with(&env, 0, &[(FIRST, 0)]);

        assert_eq!(
            aggregator.normalized_target_weight(FIRST).unwrap_err(),
            AggregatorError::Ratio(RatioError::DivisionByZero)
        );
        assert_eq!(
            aggregator.percent_held(FIRST, U256::ZERO, &env).unwrap_err(),
            AggregatorError::Ratio(RatioError::DivisionByZero)
        );
        assert_eq!(
            aggregator.percent_held(THIRD, U256::ZERO, &env).unwrap_err(),
            AggregatorError::UnknownDeposit(THIRD)
        );
    }

    #[test]
    fn record_round_trips_through_restore() {
        let env = environment();
        let mut aggregator = aggregator_with(&env, 2, &[(SECOND, 1), (FIRST, 4)]);
        aggregator.pause(GOVERNOR).unwrap();

        let record = aggregator.record();
        let restored = PcvAggregator::restore(
            &record,
            Arc::new(RoleTable::default().with_role(Role::Governor, GOVERNOR)),
            Arc::new(LocalAssetManager::new(record.asset_manager)),
            &env,
        )
        .unwrap();

        assert_eq!(restored.pcv_deposits(), aggregator.pcv_deposits());
        assert_eq!(restored.total_weight(), amount(7));
        assert!(restored.is_paused());
        assert!(restored.events().is_empty());
    }

    #[traced_test]
    #[test]
    fn failed_operation_rolls_back_and_logs() {
        let mut env = environment();
        let mut aggregator = aggregator_with(&env, 0, &[(FIRST, 1)]);
        let before = aggregator.events().len();

        let error = aggregator
            .atomically(&mut env, |aggregator, env| {
                env.mint(aggregator.address(), amount(10))?;
                aggregator.emit(AggregatorEvent::Paused { by: GOVERNOR });
                Err::<(), _>(AggregatorError::Paused)
            })
            .unwrap_err();

        assert_eq!(error, AggregatorError::Paused);
        assert_eq!(aggregator.events().len(), before);
        assert_eq!(aggregator.idle_balance(&env), U256::ZERO);
        assert!(logs_contain("Operation rolled back"));
    }
}
