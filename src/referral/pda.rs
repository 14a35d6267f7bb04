//! Addresses of the referral program accounts

use solana_sdk::pubkey::Pubkey;

use crate::error::{SquadsError, SquadsResult};

use super::{ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_PROGRAM_ID};

pub const SEED_ORGANIZATION: &[u8] = b"organization";
pub const SEED_MEMBER: &[u8] = b"member";
pub const SEED_MEMBER_STATISTICS: &[u8] = b"member_statistics";
pub const SEED_PROFILE: &[u8] = b"buddy_profile";
pub const SEED_TREASURY: &[u8] = b"treasury";

/// Longest name usable as a seed
pub const MAX_NAME_LEN: usize = 32;

fn name_seed(name: &str) -> SquadsResult<&[u8]> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(SquadsError::InvalidName(name.to_string()));
    }
    Ok(name.as_bytes())
}

pub fn get_organization_pda(org_name: &str, program_id: &Pubkey) -> SquadsResult<(Pubkey, u8)> {
    Ok(Pubkey::find_program_address(
        &[SEED_ORGANIZATION, name_seed(org_name)?],
        program_id,
    ))
}

pub fn get_member_pda(
    organization: &Pubkey,
    member_name: &str,
    program_id: &Pubkey,
) -> SquadsResult<(Pubkey, u8)> {
    Ok(Pubkey::find_program_address(
        &[SEED_MEMBER, organization.as_ref(), name_seed(member_name)?],
        program_id,
    ))
}

pub fn get_member_statistics_pda(member: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[SEED_MEMBER_STATISTICS, member.as_ref()], program_id)
}

/// Profile owned by a wallet (for a multisig, its vault)
pub fn get_profile_pda(authority: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[SEED_PROFILE, authority.as_ref()], program_id)
}

/// Reward treasury of a profile for one mint
pub fn get_treasury_pda(profile: &Pubkey, mint: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[SEED_TREASURY, profile.as_ref(), mint.as_ref()], program_id)
}

/// Associated token account of `owner` for `mint`
pub fn get_associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[owner.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .0
}
