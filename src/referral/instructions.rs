//! Instruction builders for the referral program
//!
//! Instruction names, argument layouts and account orders follow the
//! modelled accounts in [`super::accounts`]; they are not taken from the
//! deployed program's IDL.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use solana_sdk_ids::system_program;

use crate::error::SquadsResult;
use crate::instructions::instruction_discriminator;

use super::{ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_PROGRAM_ID};

fn instruction_data<T: BorshSerialize>(name: &str, args: &T) -> SquadsResult<Vec<u8>> {
    let mut data = instruction_discriminator(name).to_vec();
    args.serialize(&mut data)?;
    Ok(data)
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct CreateMemberWithRewardsArgs {
    pub member_name: String,
    pub profile_name: String,
    /// Member that referred this one, if any
    pub referrer: Option<Pubkey>,
}

/// Accounts of [`create_member_with_rewards`]
#[derive(Debug, Clone, Copy)]
pub struct CreateMemberAccounts {
    /// Owner and rent payer of the new accounts
    pub authority: Pubkey,
    pub organization: Pubkey,
    pub profile: Pubkey,
    pub member: Pubkey,
    pub treasury: Pubkey,
    pub reward_mint: Pubkey,
}

/// Create the profile, the member and its reward treasury
pub fn create_member_with_rewards(
    accounts: CreateMemberAccounts,
    args: CreateMemberWithRewardsArgs,
    program_id: &Pubkey,
) -> SquadsResult<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(accounts.authority, true),
            AccountMeta::new_readonly(accounts.organization, false),
            AccountMeta::new(accounts.profile, false),
            AccountMeta::new(accounts.member, false),
            AccountMeta::new(accounts.treasury, false),
            AccountMeta::new_readonly(accounts.reward_mint, false),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
        data: instruction_data("create_member_with_rewards", &args)?,
    })
}

pub fn create_member_statistics(
    authority: Pubkey,
    member: Pubkey,
    statistics: Pubkey,
    program_id: &Pubkey,
) -> SquadsResult<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(authority, true),
            AccountMeta::new_readonly(member, false),
            AccountMeta::new(statistics, false),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
        data: instruction_data("create_member_statistics", &())?,
    })
}

/// Accounts of [`claim_treasury`]
#[derive(Debug, Clone, Copy)]
pub struct ClaimTreasuryAccounts {
    pub authority: Pubkey,
    pub profile: Pubkey,
    pub treasury: Pubkey,
    pub treasury_token_account: Pubkey,
    pub mint: Pubkey,
    /// Receives the balance, created when missing
    pub destination_token_account: Pubkey,
}

/// Move a treasury's whole token balance to the authority
pub fn claim_treasury(
    accounts: ClaimTreasuryAccounts,
    program_id: &Pubkey,
) -> SquadsResult<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(accounts.authority, true),
            AccountMeta::new_readonly(accounts.profile, false),
            AccountMeta::new(accounts.treasury, false),
            AccountMeta::new(accounts.treasury_token_account, false),
            AccountMeta::new_readonly(accounts.mint, false),
            AccountMeta::new(accounts.destination_token_account, false),
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
            AccountMeta::new_readonly(ASSOCIATED_TOKEN_PROGRAM_ID, false),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
        data: instruction_data("claim_treasury", &())?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ClaimReferralRewardArgs {
    pub amount: u64,
}

/// Claim `amount` golden tickets earned by a member's referred volume
pub fn claim_referral_reward(
    authority: Pubkey,
    member: Pubkey,
    statistics: Pubkey,
    amount: u64,
    program_id: &Pubkey,
) -> SquadsResult<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(authority, true),
            AccountMeta::new_readonly(member, false),
            AccountMeta::new(statistics, false),
        ],
        data: instruction_data("claim_referral_reward", &ClaimReferralRewardArgs { amount })?,
    })
}
