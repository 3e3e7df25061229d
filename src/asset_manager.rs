//! Rewards asset manager collaborator.
//!
//! The asset manager claims rewards on behalf of whichever aggregator it
//! points at; migration repoints it as its final step.

use alloy::primitives::Address;
use std::fmt::Debug;
use std::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetManagerError {
    #[error("asset manager {0} refused to change aggregator")]
    Refused(Address),
}

pub trait RewardsAssetManager: Debug + Send + Sync {
    fn address(&self) -> Address;

    fn set_new_aggregator(&self, aggregator: Address) -> Result<(), AssetManagerError>;
}

/// In-process asset manager that records the aggregator it points at.
#[derive(Debug)]
pub struct LocalAssetManager {
    address: Address,
    aggregator: Mutex<Option<Address>>,
    refuse_updates: bool,
}

impl LocalAssetManager {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            aggregator: Mutex::new(None),
            refuse_updates: false,
        }
    }

    /// Asset manager that rejects every repoint.
    pub fn refusing(address: Address) -> Self {
        Self {
            refuse_updates: true,
            ..Self::new(address)
        }
    }

    pub fn aggregator(&self) -> Option<Address> {
        *self
            .aggregator
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl RewardsAssetManager for LocalAssetManager {
    fn address(&self) -> Address {
        self.address
    }

    fn set_new_aggregator(&self, aggregator: Address) -> Result<(), AssetManagerError> {
        if self.refuse_updates {
            return Err(AssetManagerError::Refused(self.address));
        }

        let mut current = self
            .aggregator
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *current = Some(aggregator);

        info!(asset_manager = %self.address, %aggregator, "Asset manager now points at new aggregator");
        Ok(())
    }
}
