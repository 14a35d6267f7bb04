//! Program Derived Address (PDA) utilities for the Squads v4 program
//!
//! Every helper takes an optional program id so a locally deployed copy of
//! the program can be targeted; `None` means the canonical deployment.

use solana_sdk::pubkey::Pubkey;

use crate::seeds::*;

fn program_or_default(program_id: Option<&Pubkey>) -> Pubkey {
    program_id.copied().unwrap_or_else(crate::program_id)
}

/// Get the program config PDA (holds the creation fee treasury)
pub fn get_program_config_pda(program_id: Option<&Pubkey>) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[SEED_PREFIX, SEED_PROGRAM_CONFIG],
        &program_or_default(program_id),
    )
}

/// Get the multisig PDA for a given create key
pub fn get_multisig_pda(create_key: &Pubkey, program_id: Option<&Pubkey>) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[SEED_PREFIX, SEED_MULTISIG, create_key.as_ref()],
        &program_or_default(program_id),
    )
}

/// Get the vault PDA for a multisig
///
/// # Arguments
/// * `multisig_pda` - The multisig account public key
/// * `vault_index` - The index of the vault (0 for default vault)
/// * `program_id` - Optional custom program ID (uses canonical ID if None)
pub fn get_vault_pda(
    multisig_pda: &Pubkey,
    vault_index: u8,
    program_id: Option<&Pubkey>,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[SEED_PREFIX, multisig_pda.as_ref(), SEED_VAULT, &[vault_index]],
        &program_or_default(program_id),
    )
}

/// Get the transaction PDA (vault or config transaction) at an index
pub fn get_transaction_pda(
    multisig_pda: &Pubkey,
    transaction_index: u64,
    program_id: Option<&Pubkey>,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            SEED_PREFIX,
            multisig_pda.as_ref(),
            SEED_TRANSACTION,
            &transaction_index.to_le_bytes(),
        ],
        &program_or_default(program_id),
    )
}

/// Get the proposal PDA for the transaction at an index
pub fn get_proposal_pda(
    multisig_pda: &Pubkey,
    transaction_index: u64,
    program_id: Option<&Pubkey>,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            SEED_PREFIX,
            multisig_pda.as_ref(),
            SEED_TRANSACTION,
            &transaction_index.to_le_bytes(),
            SEED_PROPOSAL,
        ],
        &program_or_default(program_id),
    )
}
