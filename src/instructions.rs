//! Instruction builders for the Squads v4 program
//!
//! Each builder lays out the accounts in the order the program expects and
//! prefixes the borsh encoded arguments with the Anchor discriminator.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::{
    hash::hash,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use solana_sdk_ids::system_program;

use crate::error::SquadsResult;
use crate::types::{ConfigAction, Member};

/// Anchor instruction discriminator: first 8 bytes of SHA256("global:<name>")
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    let digest = hash(format!("global:{}", name).as_bytes());
    let mut discriminator = [0u8; 8];
    discriminator.copy_from_slice(&digest.to_bytes()[..8]);
    discriminator
}

fn instruction_data<T: BorshSerialize>(name: &str, args: Option<&T>) -> SquadsResult<Vec<u8>> {
    let mut data = instruction_discriminator(name).to_vec();
    if let Some(args) = args {
        args.serialize(&mut data)?;
    }
    Ok(data)
}

/// `multisig_create_v2` arguments
#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub struct MultisigCreateArgsV2 {
    /// `None` lets config changes go through proposals only
    pub config_authority: Option<Pubkey>,
    pub threshold: u16,
    pub members: Vec<Member>,
    /// Seconds between approval and execution
    pub time_lock: u32,
    /// Account closed transactions refund rent to, if any
    pub rent_collector: Option<Pubkey>,
    pub memo: Option<String>,
}

/// `multisig_create_v2`
///
/// `treasury` is read from the program config and receives the creation fee.
/// Both `create_key` (the multisig PDA seed) and `creator` sign; the creator
/// pays for the account.
pub fn multisig_create_v2(
    program_config: Pubkey,
    treasury: Pubkey,
    multisig: Pubkey,
    create_key: Pubkey,
    creator: Pubkey,
    args: MultisigCreateArgsV2,
    program_id: Option<Pubkey>,
) -> SquadsResult<Instruction> {
    let accounts = vec![
        AccountMeta::new_readonly(program_config, false),
        AccountMeta::new(treasury, false),
        AccountMeta::new(multisig, false),
        AccountMeta::new_readonly(create_key, true),
        AccountMeta::new(creator, true),
        AccountMeta::new_readonly(system_program::ID, false),
    ];

    Ok(Instruction {
        program_id: program_id.unwrap_or_else(crate::program_id),
        accounts,
        data: instruction_data("multisig_create_v2", Some(&args))?,
    })
}

/// `proposal_create` arguments
#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub struct ProposalCreateArgs {
    pub transaction_index: u64,
    /// Drafts must be activated before they can be voted on
    pub draft: bool,
}

/// Create the proposal for an existing transaction
pub fn proposal_create(
    multisig: Pubkey,
    proposal: Pubkey,
    creator: Pubkey,
    rent_payer: Pubkey,
    args: ProposalCreateArgs,
    program_id: Option<Pubkey>,
) -> SquadsResult<Instruction> {
    let accounts = vec![
        AccountMeta::new_readonly(multisig, false),
        AccountMeta::new(proposal, false),
        AccountMeta::new_readonly(creator, true),
        AccountMeta::new(rent_payer, true),
        AccountMeta::new_readonly(system_program::ID, false),
    ];

    Ok(Instruction {
        program_id: program_id.unwrap_or_else(crate::program_id),
        accounts,
        data: instruction_data("proposal_create", Some(&args))?,
    })
}

#[derive(Debug, Clone, Default, BorshSerialize, BorshDeserialize)]
pub struct ProposalVoteArgs {
    pub memo: Option<String>,
}

/// Approve a proposal (member needs the Vote permission)
pub fn proposal_approve(
    multisig: Pubkey,
    proposal: Pubkey,
    member: Pubkey,
    args: ProposalVoteArgs,
    program_id: Option<Pubkey>,
) -> SquadsResult<Instruction> {
    let accounts = vec![
        AccountMeta::new_readonly(multisig, false),
        AccountMeta::new(member, true),
        AccountMeta::new(proposal, false),
    ];

    Ok(Instruction {
        program_id: program_id.unwrap_or_else(crate::program_id),
        accounts,
        data: instruction_data("proposal_approve", Some(&args))?,
    })
}

/// `vault_transaction_create` arguments
#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub struct VaultTransactionCreateArgs {
    pub vault_index: u8,
    pub ephemeral_signers: u8,
    /// Borsh encoded [`crate::message::TransactionMessage`]
    pub transaction_message: Vec<u8>,
    pub memo: Option<String>,
}

/// Store a vault message at the multisig's next transaction index
///
/// `creator` needs the Initiate permission.
pub fn vault_transaction_create(
    multisig: Pubkey,
    transaction: Pubkey,
    creator: Pubkey,
    rent_payer: Pubkey,
    args: VaultTransactionCreateArgs,
    program_id: Option<Pubkey>,
) -> SquadsResult<Instruction> {
    let accounts = vec![
        AccountMeta::new(multisig, false),
        AccountMeta::new(transaction, false),
        AccountMeta::new_readonly(creator, true),
        AccountMeta::new(rent_payer, true),
        AccountMeta::new_readonly(system_program::ID, false),
    ];

    Ok(Instruction {
        program_id: program_id.unwrap_or_else(crate::program_id),
        accounts,
        data: instruction_data("vault_transaction_create", Some(&args))?,
    })
}

/// Execute an approved vault transaction
///
/// `remaining_accounts` are the accounts of the stored message, see
/// [`crate::accounts::VaultTransactionMessage::execution_account_metas`].
pub fn vault_transaction_execute(
    multisig: Pubkey,
    proposal: Pubkey,
    transaction: Pubkey,
    member: Pubkey,
    remaining_accounts: Vec<AccountMeta>,
    program_id: Option<Pubkey>,
) -> SquadsResult<Instruction> {
    let mut accounts = vec![
        AccountMeta::new_readonly(multisig, false),
        AccountMeta::new(proposal, false),
        AccountMeta::new_readonly(transaction, false),
        AccountMeta::new_readonly(member, true),
    ];
    accounts.extend(remaining_accounts);

    Ok(Instruction {
        program_id: program_id.unwrap_or_else(crate::program_id),
        accounts,
        data: instruction_data::<()>("vault_transaction_execute", None)?,
    })
}

#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub struct ConfigTransactionCreateArgs {
    pub actions: Vec<ConfigAction>,
    pub memo: Option<String>,
}

/// Store config actions at the multisig's next transaction index
pub fn config_transaction_create(
    multisig: Pubkey,
    transaction: Pubkey,
    creator: Pubkey,
    rent_payer: Pubkey,
    args: ConfigTransactionCreateArgs,
    program_id: Option<Pubkey>,
) -> SquadsResult<Instruction> {
    let accounts = vec![
        AccountMeta::new(multisig, false),
        AccountMeta::new(transaction, false),
        AccountMeta::new_readonly(creator, true),
        AccountMeta::new(rent_payer, true),
        AccountMeta::new_readonly(system_program::ID, false),
    ];

    Ok(Instruction {
        program_id: program_id.unwrap_or_else(crate::program_id),
        accounts,
        data: instruction_data("config_transaction_create", Some(&args))?,
    })
}

/// Execute an approved config transaction
///
/// The rent payer covers a reallocation of the multisig when members are
/// added; without one the program id stands in for the optional account.
pub fn config_transaction_execute(
    multisig: Pubkey,
    proposal: Pubkey,
    transaction: Pubkey,
    member: Pubkey,
    rent_payer: Option<Pubkey>,
    program_id: Option<Pubkey>,
) -> SquadsResult<Instruction> {
    let program_id = program_id.unwrap_or_else(crate::program_id);

    let mut accounts = vec![
        AccountMeta::new(multisig, false),
        AccountMeta::new_readonly(member, true),
        AccountMeta::new(proposal, false),
        AccountMeta::new(transaction, false),
    ];
    accounts.push(match rent_payer {
        Some(rent_payer) => AccountMeta::new(rent_payer, true),
        None => AccountMeta::new_readonly(program_id, false),
    });
    accounts.push(AccountMeta::new_readonly(system_program::ID, false));

    Ok(Instruction {
        program_id,
        accounts,
        data: instruction_data::<()>("config_transaction_execute", None)?,
    })
}
