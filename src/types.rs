//! Core multisig types
//!
//! Members, permissions, proposal statuses and the configuration actions a
//! config proposal carries. Borsh layouts (including enum variant order) match
//! the Squads v4 program.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Permission flags for multisig members
///
/// - `Initiate`: can create proposals
/// - `Vote`: can approve proposals
/// - `Execute`: can execute approved proposals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    Initiate = 1 << 0,
    Vote = 1 << 1,
    Execute = 1 << 2,
}

/// Permissions bitmask for a member
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct Permissions {
    pub mask: u8,
}

impl Permissions {
    /// Create permissions from a list of Permission flags
    pub fn from_vec(permissions: &[Permission]) -> Self {
        let mask = permissions.iter().fold(0u8, |mask, p| mask | *p as u8);
        Self { mask }
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.mask & (permission as u8) != 0
    }

    pub fn has_initiate(&self) -> bool {
        self.has(Permission::Initiate)
    }

    pub fn has_vote(&self) -> bool {
        self.has(Permission::Vote)
    }

    pub fn has_execute(&self) -> bool {
        self.has(Permission::Execute)
    }

    /// Initiate, vote and execute
    pub fn full() -> Self {
        Self::from_vec(&[Permission::Initiate, Permission::Vote, Permission::Execute])
    }

    /// Names of the granted permissions, for display
    pub fn labels(&self) -> Vec<&'static str> {
        [
            (Permission::Initiate, "Initiate"),
            (Permission::Vote, "Vote"),
            (Permission::Execute, "Execute"),
        ]
        .into_iter()
        .filter(|(p, _)| self.has(*p))
        .map(|(_, label)| label)
        .collect()
    }
}

/// A member of a multisig
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Member {
    pub key: Pubkey,
    pub permissions: Permissions,
}

impl Member {
    /// Create a new member with full permissions
    pub fn new(key: Pubkey) -> Self {
        Self {
            key,
            permissions: Permissions::full(),
        }
    }

    /// Create a new member with specific permissions
    pub fn with_permissions(key: Pubkey, permissions: Permissions) -> Self {
        Self { key, permissions }
    }
}

/// Status of a proposal, each carrying the unix timestamp it was set at
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum ProposalStatus {
    Draft { timestamp: i64 },
    Active { timestamp: i64 },
    Rejected { timestamp: i64 },
    Approved { timestamp: i64 },
    /// Deprecated by the program, kept so the following tags decode
    Executing,
    Executed { timestamp: i64 },
    Cancelled { timestamp: i64 },
}

impl ProposalStatus {
    pub fn is_approved(&self) -> bool {
        matches!(self, ProposalStatus::Approved { .. })
    }

    pub fn is_executed(&self) -> bool {
        matches!(self, ProposalStatus::Executed { .. })
    }
}

/// Structural changes a config proposal applies when executed
///
/// Only the variants this tooling builds are modelled; they occupy the first
/// positions of the program's enum so their borsh tags line up.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum ConfigAction {
    AddMember { new_member: Member },
    RemoveMember { old_member: Pubkey },
    ChangeThreshold { new_threshold: u16 },
    SetTimeLock { new_time_lock: u32 },
}

impl ConfigAction {
    /// Remove-then-add pair that replaces a member's permissions
    pub fn replace_permissions(member: Pubkey, permissions: Permissions) -> [ConfigAction; 2] {
        [
            ConfigAction::RemoveMember { old_member: member },
            ConfigAction::AddMember {
                new_member: Member::with_permissions(member, permissions),
            },
        ]
    }
}
