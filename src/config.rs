use alloy::primitives::{Address, U256};
use clap::Parser;
use serde::Deserialize;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::Level;

use pcv_deposit::{DepositError, HoldingDeposit, LedgerError, LendingDeposit};

use crate::access::{Role, RoleTable};
use crate::aggregator::AggregatorSetup;
use crate::aggregator::registry::DepositWeight;
use crate::environment::{EnvironmentError, PcvEnvironment};

#[derive(Parser, Debug)]
pub struct Env {
    /// Path to TOML configuration file
    #[clap(long)]
    pub config: PathBuf,
}

/// Settings deserialized from the config TOML. Amounts and weights are
/// strings so they can exceed the TOML integer range.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    database_url: String,
    log_level: Option<LogLevel>,
    token: Address,
    aggregator: AggregatorConfig,
    #[serde(default)]
    venues: Vec<VenueConfig>,
    #[serde(default)]
    balances: Vec<BalanceConfig>,
    #[serde(default)]
    roles: Vec<RoleConfig>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AggregatorConfig {
    address: Address,
    buffer_weight: String,
    asset_manager: Address,
    #[serde(default)]
    deposits: Vec<DepositConfig>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DepositConfig {
    deposit: Address,
    weight: String,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum VenueConfig {
    Holding {
        address: Address,
    },
    Lending {
        address: Address,
        market: Address,
        available_liquidity: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BalanceConfig {
    holder: Address,
    amount: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RoleConfig {
    role: Role,
    member: Address,
}

// ===== Runtime types (assembled from Config) =====

#[derive(Debug, Clone)]
pub struct Ctx {
    pub(crate) database_url: String,
    pub log_level: LogLevel,
    pub(crate) token: Address,
    pub(crate) aggregator: AggregatorCtx,
    pub(crate) venues: Vec<VenueCtx>,
    pub(crate) balances: Vec<(Address, U256)>,
    pub(crate) roles: RoleTable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AggregatorCtx {
    pub(crate) address: Address,
    pub(crate) buffer_weight: U256,
    pub(crate) asset_manager: Address,
    pub(crate) deposits: Vec<DepositWeight>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum VenueCtx {
    Holding {
        address: Address,
    },
    Lending {
        address: Address,
        market: Address,
        available_liquidity: Option<U256>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<&LogLevel> for Level {
    fn from(log_level: &LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

pub(crate) async fn configure_sqlite_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let pool = SqlitePool::connect(database_url).await?;

    // WAL lets readers proceed while one CLI invocation writes.
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    // Wait up to 10 seconds for a concurrent writer instead of failing
    // immediately with "database is locked".
    sqlx::query("PRAGMA busy_timeout = 10000")
        .execute(&pool)
        .await?;

    Ok(pool)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML")]
    Toml(#[from] toml::de::Error),
    #[error("invalid amount for {field}: {value}")]
    InvalidAmount { field: &'static str, value: String },
    #[error(transparent)]
    Environment(#[from] EnvironmentError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Deposit(#[from] DepositError),
}

impl Ctx {
    pub fn load_file(config: &Path) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(config)?;
        Self::from_toml(&config_str)
    }

    pub fn from_toml(config_toml: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(config_toml)?;

        let deposits = config
            .aggregator
            .deposits
            .into_iter()
            .map(|entry| {
                Ok(DepositWeight {
                    deposit: entry.deposit,
                    weight: parse_amount("aggregator.deposits.weight", &entry.weight)?,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let aggregator = AggregatorCtx {
            address: config.aggregator.address,
            buffer_weight: parse_amount("aggregator.buffer_weight", &config.aggregator.buffer_weight)?,
            asset_manager: config.aggregator.asset_manager,
            deposits,
        };

        let venues = config
            .venues
            .into_iter()
            .map(assemble_venue)
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let balances = config
            .balances
            .into_iter()
            .map(|balance| Ok((balance.holder, parse_amount("balances.amount", &balance.amount)?)))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let roles = config
            .roles
            .into_iter()
            .fold(RoleTable::default(), |roles, entry| {
                roles.with_role(entry.role, entry.member)
            });

        Ok(Self {
            database_url: config.database_url,
            log_level: config.log_level.unwrap_or_default(),
            token: config.token,
            aggregator,
            venues,
            balances,
            roles,
        })
    }

    pub async fn get_sqlite_pool(&self) -> Result<SqlitePool, sqlx::Error> {
        configure_sqlite_pool(&self.database_url).await
    }

    /// Deploys the configured venues, seeds the ledger and lets every venue
    /// account for its seeded tokens.
    pub fn build_environment(&self) -> Result<PcvEnvironment, ConfigError> {
        let mut env = self.deploy_venues()?;

        for (holder, amount) in &self.balances {
            env.mint(*holder, *amount)?;
        }

        env.sync_all_venues()?;
        Ok(env)
    }

    /// Environment with the configured venues and an empty ledger, ready
    /// for saved balances.
    pub fn deploy_venues(&self) -> Result<PcvEnvironment, ConfigError> {
        let mut env = PcvEnvironment::new(self.token);

        for venue in &self.venues {
            match *venue {
                VenueCtx::Holding { address } => {
                    env.deploy_venue(HoldingDeposit::new(address, self.token))?;
                }
                VenueCtx::Lending {
                    address,
                    market,
                    available_liquidity,
                } => {
                    let mut lending = LendingDeposit::new(address, self.token, market);
                    lending.set_available_liquidity(available_liquidity);
                    env.deploy_venue(lending)?;
                }
            }
        }

        Ok(env)
    }

    pub fn aggregator_setup(&self) -> AggregatorSetup {
        AggregatorSetup {
            address: self.aggregator.address,
            token: self.token,
            buffer_weight: self.aggregator.buffer_weight,
            deposits: self
                .aggregator
                .deposits
                .iter()
                .map(|entry| entry.deposit)
                .collect(),
            weights: self
                .aggregator
                .deposits
                .iter()
                .map(|entry| entry.weight)
                .collect(),
        }
    }
}

fn assemble_venue(venue: VenueConfig) -> Result<VenueCtx, ConfigError> {
    Ok(match venue {
        VenueConfig::Holding { address } => VenueCtx::Holding { address },
        VenueConfig::Lending {
            address,
            market,
            available_liquidity,
        } => VenueCtx::Lending {
            address,
            market,
            available_liquidity: available_liquidity
                .map(|value| parse_amount("venues.available_liquidity", &value))
                .transpose()?,
        },
    })
}

/// Decimal or `0x`-prefixed hex.
fn parse_amount(field: &'static str, value: &str) -> Result<U256, ConfigError> {
    U256::from_str(value.trim()).map_err(|_| ConfigError::InvalidAmount {
        field,
        value: value.to_string(),
    })
}

pub fn setup_tracing(log_level: &LogLevel) {
    let level: Level = log_level.into();
    let default_filter = format!("pcv_aggregator={level},pcv_deposit={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}
