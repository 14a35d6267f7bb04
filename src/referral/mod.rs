//! Referral (BuddyLink) membership and treasury façade
//!
//! [`ReferralService`] looks up memberships, profiles and reward treasuries
//! and builds the instructions a multisig vault proposes to register a
//! membership or claim its rewards. Which program deployment is used depends
//! on the [`Environment`].

pub mod accounts;
pub mod instructions;
pub mod pda;

use std::sync::Arc;

use solana_sdk::{instruction::Instruction, pubkey::Pubkey};

use crate::accounts::{account_discriminator, AnchorAccount};
use crate::config::Environment;
use crate::error::{SquadsError, SquadsResult};
use crate::rpc::{AccountFilter, SolanaRpc};

use self::accounts::{
    token_account_amount, MemberStatistics, Profile, ReferralMember, Treasury,
    MEMBER_REFERRER_TREASURY_OFFSET, TREASURY_OWNER_OFFSET,
};

pub const REFERRAL_PROGRAM_ID: Pubkey =
    Pubkey::from_str_const("BUDDYtQp7Di1xfojiCSVDksiYLQx511DPdj2nbtG9Yu5");

pub const REFERRAL_PROGRAM_ID_DEVNET: Pubkey =
    Pubkey::from_str_const("9zE4EQ5tJbEeMYwtS2w8KrSHTtTW4UPqwfbBSEkUrNCA");

pub const TOKEN_PROGRAM_ID: Pubkey =
    Pubkey::from_str_const("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");

pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey =
    Pubkey::from_str_const("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

pub const USDC_MINT: Pubkey =
    Pubkey::from_str_const("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");

pub const ATLAS_MINT: Pubkey =
    Pubkey::from_str_const("ATLASXmbPQxBUYbxPsV97usA3fPQYEqzQBUHgiFCUsXx");

/// Mint new memberships collect their rewards in
pub const REWARD_MINT: Pubkey = ATLAS_MINT;

/// Link referees use to sign up under a member
pub const REFERRAL_LINK_BASE: &str = "https://play.staratlas.com/?r=";

/// Referral program deployment for an environment
///
/// The local validator runs a clone of the mainnet program.
pub fn referral_program_id(environment: Environment) -> Pubkey {
    match environment {
        Environment::Development => REFERRAL_PROGRAM_ID_DEVNET,
        Environment::Production | Environment::Local => REFERRAL_PROGRAM_ID,
    }
}

/// Tokens a treasury can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardToken {
    Usdc,
    Atlas,
}

impl RewardToken {
    pub fn from_mint(mint: &Pubkey) -> Option<Self> {
        [RewardToken::Usdc, RewardToken::Atlas]
            .into_iter()
            .find(|token| token.mint() == *mint)
    }

    pub fn mint(&self) -> Pubkey {
        match self {
            RewardToken::Usdc => USDC_MINT,
            RewardToken::Atlas => ATLAS_MINT,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            RewardToken::Usdc => "USDC",
            RewardToken::Atlas => "ATLAS",
        }
    }

    pub fn decimals(&self) -> u32 {
        match self {
            RewardToken::Usdc => 6,
            RewardToken::Atlas => 8,
        }
    }

    /// Base units as a decimal amount, e.g. `1_500_000` USDC is `1.5`
    pub fn ui_amount(&self, base_units: u64) -> f64 {
        base_units as f64 / 10f64.powi(self.decimals() as i32)
    }
}

/// A decoded account and its address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramAccount<T> {
    pub address: Pubkey,
    pub account: T,
}

/// Referral program access for one environment
pub struct ReferralService<R: ?Sized> {
    rpc: Arc<R>,
    environment: Environment,
    program_id: Pubkey,
}

impl<R: SolanaRpc + ?Sized> ReferralService<R> {
    pub fn new(rpc: Arc<R>, environment: Environment) -> Self {
        Self {
            rpc,
            environment,
            program_id: referral_program_id(environment),
        }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    async fn fetch<T: AnchorAccount>(&self, address: &Pubkey) -> SquadsResult<Option<T>> {
        match self.rpc.get_account_data(address).await? {
            Some(data) => Ok(Some(T::try_from_account_data(&data)?)),
            None => Ok(None),
        }
    }

    /// Program accounts of type `T` matching an extra filter
    async fn scan<T: AnchorAccount>(
        &self,
        filter: AccountFilter,
    ) -> SquadsResult<Vec<ProgramAccount<T>>> {
        let discriminator = AccountFilter {
            offset: 0,
            bytes: account_discriminator(T::NAME).to_vec(),
        };
        let accounts = self
            .rpc
            .get_program_accounts(&self.program_id, vec![discriminator, filter])
            .await?;

        accounts
            .into_iter()
            .map(|(address, data)| {
                Ok(ProgramAccount {
                    address,
                    account: T::try_from_account_data(&data)?,
                })
            })
            .collect()
    }

    fn member_address(&self, org_name: &str, member_name: &str) -> SquadsResult<Pubkey> {
        let (organization, _) = pda::get_organization_pda(org_name, &self.program_id)?;
        Ok(pda::get_member_pda(&organization, member_name, &self.program_id)?.0)
    }

    pub async fn is_member_available(
        &self,
        org_name: &str,
        member_name: &str,
    ) -> SquadsResult<bool> {
        let member = self.member_address(org_name, member_name)?;
        Ok(self.rpc.get_account_data(&member).await?.is_none())
    }

    /// Instructions registering `member_name` for `signer`
    ///
    /// Creates the signer's profile, the membership with a reward treasury in
    /// [`REWARD_MINT`], then the membership statistics.
    ///
    /// # Errors
    /// [`SquadsError::NameUnavailable`] when the name is registered already.
    pub async fn check_and_build_membership_creation(
        &self,
        signer: &Pubkey,
        org_name: &str,
        member_name: &str,
    ) -> SquadsResult<Vec<Instruction>> {
        if !self.is_member_available(org_name, member_name).await? {
            return Err(SquadsError::NameUnavailable(member_name.to_string()));
        }

        let (organization, _) = pda::get_organization_pda(org_name, &self.program_id)?;
        let (member, _) = pda::get_member_pda(&organization, member_name, &self.program_id)?;
        let (profile, _) = pda::get_profile_pda(signer, &self.program_id);
        let (treasury, _) = pda::get_treasury_pda(&profile, &REWARD_MINT, &self.program_id);
        let (statistics, _) = pda::get_member_statistics_pda(&member, &self.program_id);

        let create_member = instructions::create_member_with_rewards(
            instructions::CreateMemberAccounts {
                authority: *signer,
                organization,
                profile,
                member,
                treasury,
                reward_mint: REWARD_MINT,
            },
            instructions::CreateMemberWithRewardsArgs {
                member_name: member_name.to_string(),
                profile_name: profile_name(signer),
                referrer: None,
            },
            &self.program_id,
        )?;
        let create_statistics =
            instructions::create_member_statistics(*signer, member, statistics, &self.program_id)?;

        Ok(vec![create_member, create_statistics])
    }

    pub async fn get_member(
        &self,
        org_name: &str,
        member_name: &str,
    ) -> SquadsResult<Option<ProgramAccount<ReferralMember>>> {
        let address = self.member_address(org_name, member_name)?;
        Ok(self
            .fetch(&address)
            .await?
            .map(|account| ProgramAccount { address, account }))
    }

    pub async fn get_member_statistics(
        &self,
        member: &Pubkey,
    ) -> SquadsResult<Option<MemberStatistics>> {
        let (statistics, _) = pda::get_member_statistics_pda(member, &self.program_id);
        self.fetch(&statistics).await
    }

    pub async fn get_profile(
        &self,
        authority: &Pubkey,
    ) -> SquadsResult<Option<ProgramAccount<Profile>>> {
        let (address, _) = pda::get_profile_pda(authority, &self.program_id);
        Ok(self
            .fetch(&address)
            .await?
            .map(|account| ProgramAccount { address, account }))
    }

    /// Treasuries of the profile owned by `authority`, empty without profile
    pub async fn get_treasuries(
        &self,
        authority: &Pubkey,
    ) -> SquadsResult<Vec<ProgramAccount<Treasury>>> {
        let Some(profile) = self.get_profile(authority).await? else {
            return Ok(Vec::new());
        };
        self.scan(AccountFilter::pubkey_at(TREASURY_OWNER_OFFSET, &profile.address))
            .await
    }

    /// Members that were referred through `treasury`
    pub async fn get_treasury_contributors(
        &self,
        treasury: &Pubkey,
    ) -> SquadsResult<Vec<ProgramAccount<ReferralMember>>> {
        let mut bytes = vec![1u8];
        bytes.extend_from_slice(treasury.as_ref());
        self.scan(AccountFilter {
            offset: MEMBER_REFERRER_TREASURY_OFFSET,
            bytes,
        })
        .await
    }

    /// Token balance held for the treasury, 0 when its token account is missing
    pub async fn get_claimable_balance(
        &self,
        treasury: &ProgramAccount<Treasury>,
    ) -> SquadsResult<u64> {
        let token_account =
            pda::get_associated_token_address(&treasury.address, &treasury.account.mint);
        match self.rpc.get_account_data(&token_account).await? {
            Some(data) => token_account_amount(&data),
            None => Ok(0),
        }
    }

    /// Golden tickets the member can claim
    pub fn get_claimable_tickets(&self, statistics: &MemberStatistics) -> u64 {
        statistics.claimable_tickets()
    }

    /// Instructions moving a treasury's balance to `authority`
    pub fn build_claim_treasury_instructions(
        &self,
        treasury: &ProgramAccount<Treasury>,
        authority: &Pubkey,
    ) -> SquadsResult<Vec<Instruction>> {
        let mint = treasury.account.mint;
        let claim = instructions::claim_treasury(
            instructions::ClaimTreasuryAccounts {
                authority: *authority,
                profile: treasury.account.owner_profile,
                treasury: treasury.address,
                treasury_token_account: pda::get_associated_token_address(
                    &treasury.address,
                    &mint,
                ),
                mint,
                destination_token_account: pda::get_associated_token_address(authority, &mint),
            },
            &self.program_id,
        )?;
        Ok(vec![claim])
    }

    /// Instructions claiming `amount` golden tickets
    pub fn build_claim_ticket_instructions(
        &self,
        member: &ProgramAccount<ReferralMember>,
        authority: &Pubkey,
        amount: u64,
    ) -> SquadsResult<Vec<Instruction>> {
        if amount == 0 {
            return Err(SquadsError::ClaimUnavailable(
                "golden tickets (nothing to claim)".to_string(),
            ));
        }
        let (statistics, _) = pda::get_member_statistics_pda(&member.address, &self.program_id);
        let claim = instructions::claim_referral_reward(
            *authority,
            member.address,
            statistics,
            amount,
            &self.program_id,
        )?;
        Ok(vec![claim])
    }
}

/// Profile name for a wallet: the first 16 characters of its address
pub fn profile_name(authority: &Pubkey) -> String {
    authority.to_string().chars().take(16).collect()
}
