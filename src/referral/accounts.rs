//! Referral program accounts
//!
//! These layouts are a model of the BuddyLink accounts, not the deployed
//! program's published ABI. Fixed-size fields come first so memcmp filters
//! can address them; names are stored last.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::pubkey::Pubkey;

use crate::accounts::{AnchorAccount, DISCRIMINATOR_LEN};
use crate::error::{SquadsError, SquadsResult};

/// Volume in USDC base units that earns one golden ticket (500 USDC)
pub const TICKET_VOLUME_RATIO: u64 = 500_000_000;

/// Offset of `ReferralMember::referrer_treasury` (option tag) in account data
pub const MEMBER_REFERRER_TREASURY_OFFSET: usize = DISCRIMINATOR_LEN + 64;

/// Offset of `Treasury::owner_profile` in account data
pub const TREASURY_OWNER_OFFSET: usize = DISCRIMINATOR_LEN;

/// Offset of the `amount` field in an SPL token account
pub const TOKEN_ACCOUNT_AMOUNT_OFFSET: usize = 64;

/// A registered referral participant of an organization
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ReferralMember {
    pub organization: Pubkey,
    /// Wallet that owns the membership (the vault for a multisig)
    pub owner: Pubkey,
    /// Treasury credited when this member's referees trade
    pub referrer_treasury: Option<Pubkey>,
    pub bump: u8,
    pub name: String,
}

impl AnchorAccount for ReferralMember {
    const NAME: &'static str = "Member";
}

/// Accumulated referral activity of a member
#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct MemberStatistics {
    pub member: Pubkey,
    /// Volume traded by referees, USDC base units
    pub total_referrer_volume: u64,
    pub number_of_claimed_rewards: u64,
    /// Volume already converted into claimed tickets
    pub number_of_claimed_rewards_in_volume: u64,
    /// Unix timestamp of the last claim, 0 when never claimed
    pub last_claimed: i64,
}

impl AnchorAccount for MemberStatistics {
    const NAME: &'static str = "MemberStatistics";
}

impl MemberStatistics {
    /// Tickets not claimed yet: whole multiples of [`TICKET_VOLUME_RATIO`]
    /// in the unclaimed volume
    pub fn claimable_tickets(&self) -> u64 {
        self.total_referrer_volume
            .saturating_sub(self.number_of_claimed_rewards_in_volume)
            / TICKET_VOLUME_RATIO
    }
}

/// Referral identity of a wallet
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Profile {
    pub authority: Pubkey,
    pub bump: u8,
    pub name: String,
}

impl AnchorAccount for Profile {
    const NAME: &'static str = "BuddyProfile";
}

/// Reward pool of a profile for one mint
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Treasury {
    pub owner_profile: Pubkey,
    pub mint: Pubkey,
    pub bump: u8,
}

impl AnchorAccount for Treasury {
    const NAME: &'static str = "Treasury";
}

/// Read the amount held by an SPL token account
pub fn token_account_amount(data: &[u8]) -> SquadsResult<u64> {
    let bytes = data
        .get(TOKEN_ACCOUNT_AMOUNT_OFFSET..TOKEN_ACCOUNT_AMOUNT_OFFSET + 8)
        .ok_or_else(|| SquadsError::InvalidAccountData("token account too short".to_string()))?;
    let mut amount = [0u8; 8];
    amount.copy_from_slice(bytes);
    Ok(u64::from_le_bytes(amount))
}
