//! Durable aggregator state.
//!
//! Two things are stored: the registry (membership order, weights, the
//! buffer weight, the paused flag and the asset manager) and the
//! environment's token balances and lending positions. Both are written in
//! one transaction so a run never leaves them out of step.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::str::FromStr;
use tracing::debug;

use crate::aggregator::registry::DepositWeight;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryRecord {
    pub address: Address,
    pub token: Address,
    pub buffer_weight: U256,
    pub paused: bool,
    pub asset_manager: Address,
    /// Registry entries in iteration order.
    pub deposits: Vec<DepositWeight>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedRegistry {
    pub record: RegistryRecord,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LendingPosition {
    pub venue: Address,
    pub supplied: U256,
    pub available_liquidity: Option<U256>,
}

/// Token balances by holder plus every lending venue's position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentRecord {
    pub token: Address,
    pub balances: Vec<(Address, U256)>,
    pub lending: Vec<LendingPosition>,
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Invalid {column} value stored: {value}")]
    InvalidColumn { column: &'static str, value: String },
    #[error("Deposit position {0} does not fit in a database integer")]
    PositionOverflow(usize),
}

#[async_trait]
pub trait RegistryPersistence: Send + Sync {
    /// Replaces any stored state for `registry.address` and for
    /// `environment.token`.
    async fn save(
        &self,
        registry: &RegistryRecord,
        environment: &EnvironmentRecord,
    ) -> Result<(), PersistenceError>;

    async fn load(&self, aggregator: Address) -> Result<Option<SavedRegistry>, PersistenceError>;

    async fn load_environment(
        &self,
        token: Address,
    ) -> Result<Option<EnvironmentRecord>, PersistenceError>;
}

#[derive(Debug, Clone)]
pub struct SqliteRegistryPersistence {
    pool: SqlitePool,
}

impl SqliteRegistryPersistence {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegistryPersistence for SqliteRegistryPersistence {
    async fn save(
        &self,
        registry: &RegistryRecord,
        environment: &EnvironmentRecord,
    ) -> Result<(), PersistenceError> {
        let saved_at = Utc::now();
        let mut tx = self.pool.begin().await?;

        save_registry(&mut *tx, registry, saved_at).await?;
        save_environment(&mut *tx, environment, saved_at).await?;

        tx.commit().await?;

        debug!(
            aggregator = %registry.address,
            deposits = registry.deposits.len(),
            holders = environment.balances.len(),
            "Saved registry and balances"
        );
        Ok(())
    }

    async fn load(&self, aggregator: Address) -> Result<Option<SavedRegistry>, PersistenceError> {
        let key = aggregator.to_string();

        let Some(row) = sqlx::query(
            "SELECT token, buffer_weight, paused, asset_manager, saved_at
             FROM pcv_aggregators WHERE address = ?1",
        )
        .bind(&key)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let deposits = sqlx::query(
            "SELECT deposit, weight FROM pcv_deposit_weights
             WHERE aggregator = ?1 ORDER BY position ASC",
        )
        .bind(&key)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| -> Result<DepositWeight, PersistenceError> {
            Ok(DepositWeight {
                deposit: parse_column("deposit", row.try_get("deposit")?)?,
                weight: parse_column("weight", row.try_get("weight")?)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

        let record = RegistryRecord {
            address: aggregator,
            token: parse_column("token", row.try_get("token")?)?,
            buffer_weight: parse_column("buffer_weight", row.try_get("buffer_weight")?)?,
            paused: row.try_get("paused")?,
            asset_manager: parse_column("asset_manager", row.try_get("asset_manager")?)?,
            deposits,
        };

        Ok(Some(SavedRegistry {
            record,
            saved_at: row.try_get("saved_at")?,
        }))
    }

    async fn load_environment(
        &self,
        token: Address,
    ) -> Result<Option<EnvironmentRecord>, PersistenceError> {
        let key = token.to_string();

        let saved = sqlx::query("SELECT saved_at FROM pcv_environments WHERE token = ?1")
            .bind(&key)
            .fetch_optional(&self.pool)
            .await?;
        if saved.is_none() {
            return Ok(None);
        }

        let mut balances = sqlx::query(
            "SELECT holder, balance FROM pcv_ledger_balances WHERE token = ?1",
        )
        .bind(&key)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| -> Result<(Address, U256), PersistenceError> {
            Ok((
                parse_column("holder", row.try_get("holder")?)?,
                parse_column("balance", row.try_get("balance")?)?,
            ))
        })
        .collect::<Result<Vec<_>, _>>()?;

        let mut lending = sqlx::query(
            "SELECT venue, supplied, available_liquidity FROM pcv_lending_positions
             WHERE token = ?1",
        )
        .bind(&key)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| -> Result<LendingPosition, PersistenceError> {
            let available_liquidity: Option<String> = row.try_get("available_liquidity")?;

            Ok(LendingPosition {
                venue: parse_column("venue", row.try_get("venue")?)?,
                supplied: parse_column("supplied", row.try_get("supplied")?)?,
                available_liquidity: available_liquidity
                    .map(|value| parse_column("available_liquidity", value))
                    .transpose()?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

        // Stored addresses are checksummed text, so order by value here.
        balances.sort_by_key(|(holder, _)| *holder);
        lending.sort_by_key(|position| position.venue);

        Ok(Some(EnvironmentRecord {
            token,
            balances,
            lending,
        }))
    }
}

async fn save_registry(
    conn: &mut SqliteConnection,
    record: &RegistryRecord,
    saved_at: DateTime<Utc>,
) -> Result<(), PersistenceError> {
    let aggregator = record.address.to_string();

    sqlx::query(
        "INSERT INTO pcv_aggregators (
            address,
            token,
            buffer_weight,
            paused,
            asset_manager,
            saved_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(address) DO UPDATE SET
            token = excluded.token,
            buffer_weight = excluded.buffer_weight,
            paused = excluded.paused,
            asset_manager = excluded.asset_manager,
            saved_at = excluded.saved_at",
    )
    .bind(&aggregator)
    .bind(record.token.to_string())
    .bind(record.buffer_weight.to_string())
    .bind(record.paused)
    .bind(record.asset_manager.to_string())
    .bind(saved_at)
    .execute(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM pcv_deposit_weights WHERE aggregator = ?1")
        .bind(&aggregator)
        .execute(&mut *conn)
        .await?;

    for (position, entry) in record.deposits.iter().enumerate() {
        let position =
            i64::try_from(position).map_err(|_| PersistenceError::PositionOverflow(position))?;

        sqlx::query(
            "INSERT INTO pcv_deposit_weights (aggregator, deposit, weight, position)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&aggregator)
        .bind(entry.deposit.to_string())
        .bind(entry.weight.to_string())
        .bind(position)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

async fn save_environment(
    conn: &mut SqliteConnection,
    record: &EnvironmentRecord,
    saved_at: DateTime<Utc>,
) -> Result<(), PersistenceError> {
    let token = record.token.to_string();

    sqlx::query(
        "INSERT INTO pcv_environments (token, saved_at) VALUES (?1, ?2)
         ON CONFLICT(token) DO UPDATE SET saved_at = excluded.saved_at",
    )
    .bind(&token)
    .bind(saved_at)
    .execute(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM pcv_ledger_balances WHERE token = ?1")
        .bind(&token)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM pcv_lending_positions WHERE token = ?1")
        .bind(&token)
        .execute(&mut *conn)
        .await?;

    for (holder, balance) in &record.balances {
        sqlx::query(
            "INSERT INTO pcv_ledger_balances (token, holder, balance) VALUES (?1, ?2, ?3)",
        )
        .bind(&token)
        .bind(holder.to_string())
        .bind(balance.to_string())
        .execute(&mut *conn)
        .await?;
    }

    for position in &record.lending {
        sqlx::query(
            "INSERT INTO pcv_lending_positions (token, venue, supplied, available_liquidity)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&token)
        .bind(position.venue.to_string())
        .bind(position.supplied.to_string())
        .bind(position.available_liquidity.map(|value| value.to_string()))
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

fn parse_column<T: FromStr>(column: &'static str, value: String) -> Result<T, PersistenceError> {
    value
        .parse()
        .map_err(|_| PersistenceError::InvalidColumn { column, value })
}
