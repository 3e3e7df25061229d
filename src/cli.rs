use alloy::primitives::{Address, U256};
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::aggregator::PcvAggregator;
use crate::asset_manager::LocalAssetManager;
use crate::config::{ConfigError, Ctx, Env};
use crate::environment::{EnvironmentError, PcvEnvironment};
use crate::error::AggregatorError;
use crate::persistence::{PersistenceError, RegistryPersistence, SqliteRegistryPersistence};

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Aggregator(#[from] AggregatorError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Environment(#[from] EnvironmentError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("failed to write output")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Parser)]
#[command(name = "pcv-aggregator")]
#[command(about = "Distribute PCV across weighted deposits")]
#[command(version)]
pub struct CliEnv {
    #[clap(flatten)]
    env: Env,
    #[command(subcommand)]
    pub command: Commands,
}

impl CliEnv {
    /// Parse CLI arguments and load the referenced config file
    pub fn parse_and_load() -> anyhow::Result<(Ctx, Commands)> {
        let cli_env = Self::parse();
        let ctx = Ctx::load_file(&cli_env.env.config)?;
        Ok((ctx, cli_env.command))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Print balances and each deposit's distance from its target
    Targets,
    /// Move every deposit to its target balance
    Rebalance,
    /// Move one deposit to its target balance
    RebalanceSingle {
        #[arg(long)]
        deposit: Address,
    },
    /// Push idle funds above the buffer target to under-target deposits
    Deposit,
    /// Send funds out of the aggregator
    Withdraw {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        to: Address,
        /// Decimal or 0x-prefixed amount
        #[arg(long, value_parser = parse_u256)]
        amount: U256,
    },
    /// Register a deposit with a weight
    AddDeposit {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        deposit: Address,
        #[arg(long, value_parser = parse_u256)]
        weight: U256,
    },
    /// Drain a deposit and unregister it
    RemoveDeposit {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        deposit: Address,
    },
    /// Change the weight of a registered deposit
    SetDepositWeight {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        deposit: Address,
        #[arg(long, value_parser = parse_u256)]
        weight: U256,
    },
    /// Change the weight of the aggregator's idle buffer
    SetBufferWeight {
        #[arg(long)]
        caller: Address,
        #[arg(long, value_parser = parse_u256)]
        weight: U256,
    },
    /// Block deposits, withdrawals and rebalances
    Pause {
        #[arg(long)]
        caller: Address,
    },
    /// Allow deposits, withdrawals and rebalances again
    Unpause {
        #[arg(long)]
        caller: Address,
    },
}

fn parse_u256(value: &str) -> Result<U256, String> {
    U256::from_str(value).map_err(|error| format!("invalid amount {value}: {error}"))
}

pub async fn run_command(ctx: Ctx, command: Commands) -> anyhow::Result<()> {
    let pool = ctx.get_sqlite_pool().await?;
    sqlx::migrate!().run(&pool).await?;

    run_command_with_writers(&ctx, command, &pool, &mut std::io::stdout()).await?;
    Ok(())
}

/// Loads the aggregator and its environment (persisted state first,
/// config otherwise), executes `command`, reports to `stdout` and persists
/// the registry together with the balances.
///
/// Config balances only seed the first run against a database.
pub(crate) async fn run_command_with_writers<W: Write>(
    ctx: &Ctx,
    command: Commands,
    pool: &SqlitePool,
    stdout: &mut W,
) -> Result<(), CliError> {
    let persistence = SqliteRegistryPersistence::new(pool.clone());
    let mut env = load_environment(ctx, &persistence).await?;
    let mut aggregator = load_aggregator(ctx, &persistence, &env).await?;

    info!(?command, aggregator = %aggregator.address(), "Executing command");
    execute(&mut aggregator, &mut env, command)?;

    for event in aggregator.drain_events() {
        writeln!(stdout, "event: {event}")?;
    }
    write_report(&aggregator, &env, stdout)?;

    persistence.save(&aggregator.record(), &env.record()).await?;
    Ok(())
}

async fn load_environment(
    ctx: &Ctx,
    persistence: &impl RegistryPersistence,
) -> Result<PcvEnvironment, CliError> {
    let Some(saved) = persistence.load_environment(ctx.token).await? else {
        return Ok(ctx.build_environment()?);
    };

    info!(holders = saved.balances.len(), "Restoring persisted balances");
    let mut env = ctx.deploy_venues()?;
    env.restore(&saved)?;
    Ok(env)
}

async fn load_aggregator(
    ctx: &Ctx,
    persistence: &impl RegistryPersistence,
    env: &PcvEnvironment,
) -> Result<PcvAggregator, CliError> {
    let access = Arc::new(ctx.roles.clone());

    if let Some(saved) = persistence.load(ctx.aggregator.address).await? {
        info!(saved_at = %saved.saved_at, "Restoring persisted registry");
        let asset_manager = Arc::new(LocalAssetManager::new(saved.record.asset_manager));
        return Ok(PcvAggregator::restore(
            &saved.record,
            access,
            asset_manager,
            env,
        )?);
    }

    let asset_manager = Arc::new(LocalAssetManager::new(ctx.aggregator.asset_manager));
    Ok(PcvAggregator::new(
        ctx.aggregator_setup(),
        access,
        asset_manager,
        env,
    )?)
}

fn execute(
    aggregator: &mut PcvAggregator,
    env: &mut PcvEnvironment,
    command: Commands,
) -> Result<(), AggregatorError> {
    match command {
        Commands::Targets => Ok(()),
        Commands::Rebalance => aggregator.rebalance(env),
        Commands::RebalanceSingle { deposit } => aggregator.rebalance_single(deposit, env),
        Commands::Deposit => aggregator.deposit(env),
        Commands::Withdraw { caller, to, amount } => aggregator.withdraw(caller, to, amount, env),
        Commands::AddDeposit {
            caller,
            deposit,
            weight,
        } => aggregator.add_pcv_deposit(caller, deposit, weight, env),
        Commands::RemoveDeposit { caller, deposit } => {
            aggregator.remove_pcv_deposit(caller, deposit, env)
        }
        Commands::SetDepositWeight {
            caller,
            deposit,
            weight,
        } => aggregator.set_pcv_deposit_weight(caller, deposit, weight),
        Commands::SetBufferWeight { caller, weight } => aggregator.set_buffer_weight(caller, weight),
        Commands::Pause { caller } => aggregator.pause(caller),
        Commands::Unpause { caller } => aggregator.unpause(caller),
    }
}

fn write_report<W: Write>(
    aggregator: &PcvAggregator,
    env: &PcvEnvironment,
    stdout: &mut W,
) -> Result<(), CliError> {
    writeln!(
        stdout,
        "aggregator {} paused={}",
        aggregator.address(),
        aggregator.is_paused()
    )?;
    writeln!(
        stdout,
        "idle {} total {} buffer_weight {} total_weight {}",
        aggregator.idle_balance(env),
        aggregator.get_total_balance(env)?,
        aggregator.buffer_weight(),
        aggregator.total_weight()
    )?;

    for target in aggregator.get_all_amounts_from_targets(env)? {
        writeln!(
            stdout,
            "deposit {} weight {} balance {} ideal {} distance {}",
            target.deposit, target.weight, target.actual, target.ideal, target.distance
        )?;
    }

    Ok(())
}
