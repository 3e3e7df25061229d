//! Token ledger plus the venues deployed against it.
//!
//! The environment is the world aggregators act on. Several aggregators
//! can share one environment, which is what makes migration between them
//! possible. Cloning it is how an aggregator operation stages its
//! transfers before committing them.

use alloy::primitives::{Address, U256};
use std::collections::BTreeMap;
use tracing::debug;

use pcv_deposit::{DepositError, DepositVenue, LedgerError, PcvDeposit, TokenLedger};

use crate::error::AggregatorError;
use crate::persistence::{EnvironmentRecord, LendingPosition};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvironmentError {
    #[error("a venue is already deployed at {0}")]
    DuplicateVenue(Address),
    #[error("venue {venue} reports in {reported_in} but the environment holds {token}")]
    TokenMismatch {
        venue: Address,
        reported_in: Address,
        token: Address,
    },
    #[error("saved state is for token {saved}, but the environment holds {token}")]
    ForeignState { saved: Address, token: Address },
    #[error("saved lending position for {0}, which is not a deployed lending venue")]
    NotLendingVenue(Address),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Deposit(#[from] DepositError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcvEnvironment {
    ledger: TokenLedger,
    venues: BTreeMap<Address, DepositVenue>,
}

impl PcvEnvironment {
    pub fn new(token: Address) -> Self {
        Self {
            ledger: TokenLedger::new(token),
            venues: BTreeMap::new(),
        }
    }

    pub fn token(&self) -> Address {
        self.ledger.token()
    }

    pub fn deploy_venue(&mut self, venue: impl Into<DepositVenue>) -> Result<(), EnvironmentError> {
        let venue = venue.into();
        let address = venue.address();

        if self.venues.contains_key(&address) {
            return Err(EnvironmentError::DuplicateVenue(address));
        }

        if venue.balance_reported_in() != self.token() {
            return Err(EnvironmentError::TokenMismatch {
                venue: address,
                reported_in: venue.balance_reported_in(),
                token: self.token(),
            });
        }

        self.venues.insert(address, venue);
        Ok(())
    }

    pub fn venue(&self, address: Address) -> Option<&DepositVenue> {
        self.venues.get(&address)
    }

    pub fn balance_of(&self, holder: Address) -> U256 {
        self.ledger.balance_of(holder)
    }

    /// Balance a venue reports to the aggregator.
    pub fn venue_balance(&self, address: Address) -> Result<U256, AggregatorError> {
        self.venues
            .get(&address)
            .map(|venue| venue.balance(&self.ledger))
            .ok_or(AggregatorError::VenueNotFound(address))
    }

    pub fn mint(&mut self, to: Address, amount: U256) -> Result<(), LedgerError> {
        self.ledger.mint(to, amount)
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), LedgerError> {
        self.ledger.transfer(from, to, amount)
    }

    /// Lets a venue account for tokens that were sent to it directly.
    pub fn sync_venue(&mut self, address: Address) -> Result<(), AggregatorError> {
        let venue = self
            .venues
            .get_mut(&address)
            .ok_or(AggregatorError::VenueNotFound(address))?;

        venue.deposit(&mut self.ledger)?;
        Ok(())
    }

    /// Runs [`PcvDeposit::deposit`] on every venue.
    pub fn sync_all_venues(&mut self) -> Result<(), DepositError> {
        for venue in self.venues.values_mut() {
            venue.deposit(&mut self.ledger)?;
        }

        Ok(())
    }

    pub fn record(&self) -> EnvironmentRecord {
        let lending = self
            .venues
            .values()
            .filter_map(|venue| match venue {
                DepositVenue::Lending(lending) => Some(LendingPosition {
                    venue: lending.address(),
                    supplied: lending.supplied(),
                    available_liquidity: lending.available_liquidity(),
                }),
                DepositVenue::Holding(_) => None,
            })
            .collect();

        EnvironmentRecord {
            token: self.token(),
            balances: self.ledger.balances().collect(),
            lending,
        }
    }

    /// Replaces holder balances and lending positions with saved ones.
    /// Deployed venues stay as they are; a lending venue missing from the
    /// record keeps its current position.
    pub fn restore(&mut self, record: &EnvironmentRecord) -> Result<(), EnvironmentError> {
        if record.token != self.token() {
            return Err(EnvironmentError::ForeignState {
                saved: record.token,
                token: self.token(),
            });
        }

        let ledger = TokenLedger::from_balances(self.token(), record.balances.iter().copied())?;
        let mut venues = self.venues.clone();

        for position in &record.lending {
            let Some(DepositVenue::Lending(lending)) = venues.get_mut(&position.venue) else {
                return Err(EnvironmentError::NotLendingVenue(position.venue));
            };

            lending.restore_position(position.supplied, position.available_liquidity);
        }

        self.ledger = ledger;
        self.venues = venues;

        debug!(
            holders = record.balances.len(),
            lending = record.lending.len(),
            "Restored environment state"
        );
        Ok(())
    }

    /// Transfers `amount` from `from` to the venue and lets it account for it.
    pub(crate) fn push_to_venue(
        &mut self,
        from: Address,
        venue: Address,
        amount: U256,
    ) -> Result<(), AggregatorError> {
        let target = self
            .venues
            .get_mut(&venue)
            .ok_or(AggregatorError::VenueNotFound(venue))?;

        self.ledger.transfer(from, venue, amount)?;
        target.deposit(&mut self.ledger)?;

        debug!(%from, %venue, %amount, "Pushed funds to venue");
        Ok(())
    }

    pub(crate) fn pull_from_venue(
        &mut self,
        venue: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), AggregatorError> {
        let source = self
            .venues
            .get_mut(&venue)
            .ok_or(AggregatorError::VenueNotFound(venue))?;

        source.withdraw(&mut self.ledger, to, amount)?;

        debug!(%venue, %to, %amount, "Pulled funds from venue");
        Ok(())
    }
}
