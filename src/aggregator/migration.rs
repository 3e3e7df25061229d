//! Hand-over of the registry and idle funds to a replacement aggregator.

use alloy::primitives::Address;
use tracing::info;

use super::PcvAggregator;
use crate::access::Operation;
use crate::environment::PcvEnvironment;
use crate::error::AggregatorError;
use crate::events::AggregatorEvent;

impl PcvAggregator {
    /// Moves to `destination`: copies the entries it lacks, sends it every
    /// idle token, rebalances it and repoints the rewards asset manager.
    ///
    /// Entries are added through the destination's own
    /// [`PcvAggregator::add_pcv_deposit`] with this aggregator as the
    /// caller, so the destination's access control must admit it. Source
    /// entries are left in place.
    #[tracing::instrument(skip_all, fields(aggregator = %self.address, destination = %destination.address), level = tracing::Level::INFO)]
    pub fn set_new_aggregator(
        &mut self,
        caller: Address,
        destination: &mut PcvAggregator,
        env: &mut PcvEnvironment,
    ) -> Result<(), AggregatorError> {
        self.atomically(env, |source, env| {
            source.authorize(caller, Operation::Migrate)?;

            if destination.token != source.token {
                return Err(AggregatorError::TokenMismatch {
                    expected: source.token,
                    actual: destination.token,
                });
            }

            let mut staged_destination = destination.clone();

            for entry in source.registry.entries() {
                if staged_destination.has_pcv_deposit(entry.deposit) {
                    continue;
                }

                staged_destination.add_pcv_deposit(source.address, entry.deposit, entry.weight, env)?;
            }

            let idle = env.balance_of(source.address);
            env.transfer(source.address, staged_destination.address, idle)?;

            staged_destination.ensure_not_paused()?;
            staged_destination.rebalance_all(env)?;

            source
                .asset_manager
                .set_new_aggregator(staged_destination.address)?;

            source.emit(AggregatorEvent::AggregatorUpdate {
                old_aggregator: source.address,
                new_aggregator: staged_destination.address,
            });

            info!(%idle, deposits = staged_destination.registry.len(), "Migrated to new aggregator");
            staged_destination.log_events_since(destination.events.len());
            *destination = staged_destination;
            Ok(())
        })
    }
}
