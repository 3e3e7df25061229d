//! Shared test fixtures: well-known addresses, an environment with three
//! holding venues, and aggregator builders with a standard role table.

use alloy::primitives::{Address, U256, address};
use sqlx::SqlitePool;
use std::sync::Arc;

use pcv_deposit::HoldingDeposit;

use crate::access::{Role, RoleTable};
use crate::aggregator::{AggregatorSetup, PcvAggregator};
use crate::asset_manager::{LocalAssetManager, RewardsAssetManager};
use crate::environment::PcvEnvironment;

pub(crate) const TOKEN: Address = address!("0x956f47f50a910163d8bf957cf5846d573e7f87ca");
pub(crate) const AGGREGATOR: Address = address!("0x0000000000000000000000000000000000a99e6a");
pub(crate) const ASSET_MANAGER: Address = address!("0x5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a");

pub(crate) const FIRST: Address = address!("0xd000000000000000000000000000000000000001");
pub(crate) const SECOND: Address = address!("0xd000000000000000000000000000000000000002");
pub(crate) const THIRD: Address = address!("0xd000000000000000000000000000000000000003");
/// Not deployed by [`environment`]; tests deploy their own lending venue here.
pub(crate) const LENDING: Address = address!("0xd000000000000000000000000000000000000004");
pub(crate) const MARKET: Address = address!("0x3d9819210a31b4961b30ef54be2aed79b9c9cd3b");

pub(crate) const GOVERNOR: Address = address!("0x8d5ed43dca8c2f7dfb20cf7b53cc7e593635d7b9");
pub(crate) const GUARDIAN: Address = address!("0xb8f482539f2d3ae2c9ea6076894df36d1f632775");
pub(crate) const CONTROLLER: Address = address!("0x2a188f9eb761f70ecea083ba6c2a40145078dfc2");
pub(crate) const RECIPIENT: Address = address!("0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");
pub(crate) const OUTSIDER: Address = address!("0xfefefefefefefefefefefefefefefefefefefefe");

/// Environment with holding venues at [`FIRST`], [`SECOND`] and [`THIRD`].
pub(crate) fn environment() -> PcvEnvironment {
    let mut env = PcvEnvironment::new(TOKEN);

    for venue in [FIRST, SECOND, THIRD] {
        env.deploy_venue(HoldingDeposit::new(venue, TOKEN))
            .expect("fresh environment accepts holding venues");
    }

    env
}

pub(crate) fn roles() -> RoleTable {
    RoleTable::default()
        .with_role(Role::Governor, GOVERNOR)
        .with_role(Role::Guardian, GUARDIAN)
        .with_role(Role::PcvController, CONTROLLER)
}

pub(crate) fn setup(buffer_weight: u64, weights: &[(Address, u64)]) -> AggregatorSetup {
    AggregatorSetup {
        address: AGGREGATOR,
        token: TOKEN,
        buffer_weight: U256::from(buffer_weight),
        deposits: weights.iter().map(|(deposit, _)| *deposit).collect(),
        weights: weights.iter().map(|(_, weight)| U256::from(*weight)).collect(),
    }
}

pub(crate) fn aggregator_with(
    env: &PcvEnvironment,
    buffer_weight: u64,
    weights: &[(Address, u64)],
) -> PcvAggregator {
    aggregator_with_manager(
        env,
        buffer_weight,
        weights,
        Arc::new(LocalAssetManager::new(ASSET_MANAGER)),
    )
}

pub(crate) fn aggregator_with_manager(
    env: &PcvEnvironment,
    buffer_weight: u64,
    weights: &[(Address, u64)],
    asset_manager: Arc<dyn RewardsAssetManager>,
) -> PcvAggregator {
    PcvAggregator::new(
        setup(buffer_weight, weights),
        Arc::new(roles()),
        asset_manager,
        env,
    )
    .expect("valid aggregator setup")
}

/// In-memory SQLite pool with all migrations applied.
pub(crate) async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::migrate!().run(&pool).await.unwrap();
    pool
}
