//! Access-control gate for privileged aggregator operations.
//!
//! Rebalancing and the deposit top-up only move funds toward declared
//! targets and never out of the system, so they are permissionless and
//! never consult the gate.

use alloy::primitives::Address;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Debug, Display};

/// Privileged operations guarded by [`AccessControl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    AddDeposit,
    RemoveDeposit,
    SetDepositWeight,
    SetBufferWeight,
    Withdraw,
    Migrate,
    SetAssetManager,
    Pause,
    Unpause,
}

impl Operation {
    /// Roles allowed to perform the operation.
    pub fn permitted_roles(self) -> &'static [Role] {
        match self {
            Self::AddDeposit | Self::RemoveDeposit | Self::Migrate | Self::SetAssetManager => {
                &[Role::Governor]
            }
            Self::SetDepositWeight | Self::SetBufferWeight | Self::Pause | Self::Unpause => {
                &[Role::Governor, Role::Guardian]
            }
            Self::Withdraw => &[Role::PcvController],
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AddDeposit => "add a deposit",
            Self::RemoveDeposit => "remove a deposit",
            Self::SetDepositWeight => "set a deposit weight",
            Self::SetBufferWeight => "set the buffer weight",
            Self::Withdraw => "withdraw",
            Self::Migrate => "migrate to a new aggregator",
            Self::SetAssetManager => "set the asset manager",
            Self::Pause => "pause",
            Self::Unpause => "unpause",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Governor,
    Guardian,
    PcvController,
}

pub trait AccessControl: Debug + Send + Sync {
    fn is_authorized(&self, caller: Address, operation: Operation) -> bool;
}

/// Static role assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleTable {
    members: BTreeMap<Role, BTreeSet<Address>>,
}

impl RoleTable {
    #[must_use]
    pub fn with_role(mut self, role: Role, member: Address) -> Self {
        self.grant(role, member);
        self
    }

    pub fn grant(&mut self, role: Role, member: Address) {
        self.members.entry(role).or_default().insert(member);
    }

    pub fn has_role(&self, role: Role, member: Address) -> bool {
        self.members
            .get(&role)
            .is_some_and(|members| members.contains(&member))
    }
}

impl AccessControl for RoleTable {
    fn is_authorized(&self, caller: Address, operation: Operation) -> bool {
        operation
            .permitted_roles()
            .iter()
            .any(|role| self.has_role(*role, caller))
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    const GOVERNOR: Address = address!("0x8d5ed43dca8c2f7dfb20cf7b53cc7e593635d7b9");
    const GUARDIAN: Address = address!("0xb8f482539f2d3ae2c9ea6076894df36d1f632775");
    const CONTROLLER: Address = address!("0x2a188f9eb761f70ecea083ba6c2a40145078dfc2");

    fn roles() -> RoleTable {
        RoleTable::default()
            .with_role(Role::Governor, GOVERNOR)
            .with_role(Role::Guardian, GUARDIAN)
            .with_role(Role::PcvController, CONTROLLER)
    }

    #[test]
    fn governor_manages_membership() {
        let roles = roles();

        assert!(roles.is_authorized(GOVERNOR, Operation::AddDeposit));
        assert!(roles.is_authorized(GOVERNOR, Operation::RemoveDeposit));
        assert!(roles.is_authorized(GOVERNOR, Operation::Migrate));
        assert!(!roles.is_authorized(GUARDIAN, Operation::AddDeposit));
        assert!(!roles.is_authorized(CONTROLLER, Operation::AddDeposit));
    }

    #[test]
    fn guardian_can_adjust_weights_and_pause() {
        let roles = roles();

        assert!(roles.is_authorized(GUARDIAN, Operation::SetBufferWeight));
        assert!(roles.is_authorized(GUARDIAN, Operation::SetDepositWeight));
        assert!(roles.is_authorized(GUARDIAN, Operation::Pause));
        assert!(!roles.is_authorized(GUARDIAN, Operation::Withdraw));
    }

    #[test]
    fn only_pcv_controller_withdraws() {
        let roles = roles();

        assert!(roles.is_authorized(CONTROLLER, Operation::Withdraw));
        assert!(!roles.is_authorized(GOVERNOR, Operation::Withdraw));
    }

    #[test]
    fn operation_display_reads_as_sentence_fragment() {
        assert_eq!(Operation::SetBufferWeight.to_string(), "set the buffer weight");
    }
}
