//! # Squad Treasury
//!
//! Tooling for running a treasury through a Squads v4 multisig on Solana.
//! The crate drives a wallet and its proposals through their whole life
//! (create, propose, approve, execute) and uses that wallet's vault to hold a
//! BuddyLink referral membership whose rewards are claimed through proposals.
//!
//! ## Layout
//!
//! - [`pda`], [`instructions`], [`accounts`], [`message`], [`types`]: the
//!   Squads v4 wire model (addresses, instruction builders, account decoders)
//! - [`rpc`]: the network boundary, implemented for the nonblocking `RpcClient`
//! - [`compute`], [`optimizer`], [`confirm`]: priority fees, compute budgets and
//!   confirmation
//! - [`client`]: the proposal lifecycle orchestrator ([`SquadsClient`])
//! - [`referral`]: the BuddyLink membership/treasury façade
//! - [`flows`]: the bootstrap and reward-claim flows used by the binary
//!
//! ## Usage
//!
//! ```rust
//! use squad_treasury::pda;
//! use solana_sdk::pubkey::Pubkey;
//!
//! // Derive a multisig PDA and its default vault
//! let create_key = Pubkey::new_unique();
//! let (multisig_pda, _bump) = pda::get_multisig_pda(&create_key, None);
//! let (vault_pda, _bump) = pda::get_vault_pda(&multisig_pda, 0, None);
//! assert_ne!(multisig_pda, vault_pda);
//! ```

pub mod accounts;
pub mod client;
pub mod compute;
pub mod config;
pub mod confirm;
pub mod error;
pub mod flows;
pub mod instructions;
pub mod logging;
pub mod message;
pub mod optimizer;
pub mod pda;
pub mod referral;
pub mod rpc;
pub mod settings;
pub mod types;

// Re-export commonly used types
pub use client::{CreatedWallet, ProposalReceipt, SquadsClient};
pub use error::{SquadsError, SquadsResult};
pub use message::TransactionMessage;
pub use rpc::SolanaRpc;
pub use types::{ConfigAction, Member, Permission, Permissions};

use solana_sdk::pubkey::Pubkey;

/// The canonical Squads v4 program ID on mainnet-beta
pub const SQUADS_PROGRAM_ID: Pubkey =
    Pubkey::from_str_const("SQDS4ep65T869zMMBKyuUq6aD6EgTu8psMjkvj52pCf");

/// Seed constants for PDA derivation
pub mod seeds {
    pub const SEED_PREFIX: &[u8] = b"multisig";
    pub const SEED_PROGRAM_CONFIG: &[u8] = b"program_config";
    pub const SEED_MULTISIG: &[u8] = b"multisig";
    pub const SEED_VAULT: &[u8] = b"vault";
    pub const SEED_TRANSACTION: &[u8] = b"transaction";
    pub const SEED_PROPOSAL: &[u8] = b"proposal";
}

/// Returns the canonical Squads v4 program ID
pub fn program_id() -> Pubkey {
    SQUADS_PROGRAM_ID
}
