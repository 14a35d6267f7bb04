//! On-chain account structures of the Squads v4 program
//!
//! Accounts are Anchor accounts: an 8-byte discriminator followed by the borsh
//! encoded struct. Some accounts are allocated larger than their content
//! (the multisig reserves room for future members), so decoding reads the
//! fields it knows and ignores trailing bytes.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::{hash::hash, instruction::AccountMeta, pubkey::Pubkey};

use crate::error::{SquadsError, SquadsResult};
use crate::message::TransactionMessage;
use crate::types::{Member, ProposalStatus};

/// Length of the Anchor account discriminator
pub const DISCRIMINATOR_LEN: usize = 8;

/// Anchor account discriminator: first 8 bytes of SHA256("account:<Name>")
pub fn account_discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let digest = hash(format!("account:{}", name).as_bytes());
    let mut discriminator = [0u8; DISCRIMINATOR_LEN];
    discriminator.copy_from_slice(&digest.to_bytes()[..DISCRIMINATOR_LEN]);
    discriminator
}

/// An Anchor account that can be decoded from raw account data
pub trait AnchorAccount: BorshDeserialize + BorshSerialize + Sized {
    /// Struct name used for the discriminator
    const NAME: &'static str;

    /// Decode from raw account data, discriminator included
    fn try_from_account_data(data: &[u8]) -> SquadsResult<Self> {
        if data.len() < DISCRIMINATOR_LEN {
            return Err(SquadsError::InvalidAccountData(format!(
                "{} account data too short",
                Self::NAME
            )));
        }
        if data[..DISCRIMINATOR_LEN] != account_discriminator(Self::NAME) {
            return Err(SquadsError::InvalidAccountData(format!(
                "not a {} account",
                Self::NAME
            )));
        }
        // `deserialize` (unlike `try_from_slice`) tolerates trailing padding
        Self::deserialize(&mut &data[DISCRIMINATOR_LEN..])
            .map_err(|_| SquadsError::DeserializationError)
    }

    /// Encode as raw account data, discriminator included
    fn to_account_data(&self) -> SquadsResult<Vec<u8>> {
        let mut data = account_discriminator(Self::NAME).to_vec();
        self.serialize(&mut data)?;
        Ok(data)
    }
}

/// The multisig account: configuration and transaction counter
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Multisig {
    /// Key that is used to seed the multisig PDA
    pub create_key: Pubkey,
    /// `Pubkey::default()` for autonomous multisigs (changes go through votes)
    pub config_authority: Pubkey,
    /// Number of approvals a proposal needs
    pub threshold: u16,
    /// Seconds between approval and execution
    pub time_lock: u32,
    /// Last transaction index (0 means no transactions created)
    pub transaction_index: u64,
    /// Transactions up to this index are stale (bumped by config changes)
    pub stale_transaction_index: u64,
    pub rent_collector: Option<Pubkey>,
    pub bump: u8,
    pub members: Vec<Member>,
}

impl AnchorAccount for Multisig {
    const NAME: &'static str = "Multisig";
}

impl Multisig {
    /// Number of members with voting permission
    pub fn num_voters(&self) -> usize {
        self.members
            .iter()
            .filter(|m| m.permissions.has_vote())
            .count()
    }

    pub fn is_member(&self, pubkey: &Pubkey) -> bool {
        self.member(pubkey).is_some()
    }

    pub fn member(&self, pubkey: &Pubkey) -> Option<&Member> {
        self.members.iter().find(|m| &m.key == pubkey)
    }

    /// The index the next created transaction must use
    pub fn next_transaction_index(&self) -> u64 {
        self.transaction_index + 1
    }
}

/// Proposal account that tracks voting status for a transaction
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Proposal {
    pub multisig: Pubkey,
    pub transaction_index: u64,
    pub status: ProposalStatus,
    pub bump: u8,
    pub approved: Vec<Pubkey>,
    pub rejected: Vec<Pubkey>,
    /// Only used once the status is Approved
    pub cancelled: Vec<Pubkey>,
}

impl AnchorAccount for Proposal {
    const NAME: &'static str = "Proposal";
}

impl Proposal {
    pub fn has_approved(&self, member: &Pubkey) -> bool {
        self.approved.contains(member)
    }

    pub fn approvals(&self) -> usize {
        self.approved.len()
    }
}

/// Vault transaction account
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct VaultTransaction {
    pub multisig: Pubkey,
    pub creator: Pubkey,
    pub index: u64,
    pub bump: u8,
    pub vault_index: u8,
    pub vault_bump: u8,
    pub ephemeral_signer_bumps: Vec<u8>,
    pub message: VaultTransactionMessage,
}

impl AnchorAccount for VaultTransaction {
    const NAME: &'static str = "VaultTransaction";
}

/// The stored form of a vault message (plain `u32` length prefixes)
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Default)]
pub struct VaultTransactionMessage {
    pub num_signers: u8,
    pub num_writable_signers: u8,
    pub num_writable_non_signers: u8,
    pub account_keys: Vec<Pubkey>,
    pub instructions: Vec<StoredInstruction>,
    pub address_table_lookups: Vec<StoredAddressTableLookup>,
}

impl VaultTransactionMessage {
    /// Whether a static account key is writable
    pub fn is_static_writable_index(&self, key_index: usize) -> bool {
        let num_signers = usize::from(self.num_signers);

        if key_index >= self.account_keys.len() {
            return false;
        }
        if key_index < usize::from(self.num_writable_signers) {
            return true;
        }
        if key_index >= num_signers {
            return key_index - num_signers < usize::from(self.num_writable_non_signers);
        }
        false
    }

    /// Remaining accounts `vault_transaction_execute` needs for this message
    ///
    /// Signers are the vault and ephemeral PDAs, which the program signs for
    /// itself, so nothing is marked as signer here.
    pub fn execution_account_metas(&self) -> SquadsResult<Vec<AccountMeta>> {
        if !self.address_table_lookups.is_empty() {
            return Err(SquadsError::UnsupportedLookupTables);
        }

        Ok(self
            .account_keys
            .iter()
            .enumerate()
            .map(|(index, key)| {
                if self.is_static_writable_index(index) {
                    AccountMeta::new(*key, false)
                } else {
                    AccountMeta::new_readonly(*key, false)
                }
            })
            .collect())
    }
}

impl From<TransactionMessage> for VaultTransactionMessage {
    fn from(message: TransactionMessage) -> Self {
        Self {
            num_signers: message.num_signers,
            num_writable_signers: message.num_writable_signers,
            num_writable_non_signers: message.num_writable_non_signers,
            account_keys: message.account_keys.into_inner(),
            instructions: message
                .instructions
                .into_inner()
                .into_iter()
                .map(|ix| StoredInstruction {
                    program_id_index: ix.program_id_index,
                    account_indexes: ix.account_indexes.into_inner(),
                    data: ix.data.into_inner(),
                })
                .collect(),
            address_table_lookups: message
                .address_table_lookups
                .into_inner()
                .into_iter()
                .map(|lookup| StoredAddressTableLookup {
                    account_key: lookup.account_key,
                    writable_indexes: lookup.writable_indexes.into_inner(),
                    readonly_indexes: lookup.readonly_indexes.into_inner(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct StoredInstruction {
    pub program_id_index: u8,
    pub account_indexes: Vec<u8>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct StoredAddressTableLookup {
    pub account_key: Pubkey,
    pub writable_indexes: Vec<u8>,
    pub readonly_indexes: Vec<u8>,
}

/// Config transaction account
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ConfigTransaction {
    pub multisig: Pubkey,
    pub creator: Pubkey,
    pub index: u64,
    pub bump: u8,
    pub actions: Vec<crate::types::ConfigAction>,
}

impl AnchorAccount for ConfigTransaction {
    const NAME: &'static str = "ConfigTransaction";
}

/// Global program configuration
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ProgramConfig {
    pub authority: Pubkey,
    /// Lamports charged for creating a multisig
    pub multisig_creation_fee: u64,
    /// Receives the creation fee
    pub treasury: Pubkey,
}

impl AnchorAccount for ProgramConfig {
    const NAME: &'static str = "ProgramConfig";
}
