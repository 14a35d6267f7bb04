//! Referral reward overview and claim proposals
//!
//! Lookups that fail are reported and shown as missing; building and
//! submitting a claim proposal aborts the flow on error.

use std::collections::BTreeSet;

use chrono::DateTime;
use solana_sdk::{pubkey::Pubkey, signature::Keypair};

use crate::{
    client::SquadsClient,
    config::BuddyLinkConfig,
    error::{SquadsError, SquadsResult},
    logging::{report, LogKind},
    referral::{
        accounts::{MemberStatistics, ReferralMember, Treasury, TICKET_VOLUME_RATIO},
        ProgramAccount, ReferralService, RewardToken, REFERRAL_LINK_BASE,
    },
    rpc::SolanaRpc,
    settings::Settings,
};

/// What a pending reward is paid from
#[derive(Debug, Clone, PartialEq)]
pub enum RewardSource {
    Treasury {
        token: RewardToken,
        treasury: ProgramAccount<Treasury>,
    },
    GoldenTickets,
}

/// A reward that can be claimed through a proposal
#[derive(Debug, Clone, PartialEq)]
pub struct PendingReward {
    pub source: RewardSource,
    /// Base units for tokens, a count for tickets
    pub balance: u64,
}

impl PendingReward {
    pub fn symbol(&self) -> &'static str {
        match &self.source {
            RewardSource::Treasury { token, .. } => token.symbol(),
            RewardSource::GoldenTickets => "GoldenTickets",
        }
    }

    pub fn label(&self) -> String {
        match &self.source {
            RewardSource::Treasury { token, .. } => {
                format!("{} ({})", token.symbol(), token.ui_amount(self.balance))
            }
            RewardSource::GoldenTickets => format!("Golden Tickets ({})", self.balance),
        }
    }
}

/// Picks the next reward to claim
pub trait RewardPrompt {
    /// Index into `rewards`, `None` to stop
    fn choose(&mut self, rewards: &[PendingReward]) -> Option<usize>;
}

/// Interactive single-choice prompt on the terminal
#[derive(Debug, Default)]
pub struct DialoguerPrompt;

impl RewardPrompt for DialoguerPrompt {
    fn choose(&mut self, rewards: &[PendingReward]) -> Option<usize> {
        let mut items = vec!["None at this time".to_string()];
        items.extend(rewards.iter().map(PendingReward::label));

        let selection = dialoguer::Select::new()
            .with_prompt("For which claimable reward do you want to create a \"Claim\"-proposal?")
            .items(&items)
            .default(0)
            .interact();

        match selection {
            Ok(0) => None,
            Ok(index) => Some(index - 1),
            Err(err) => {
                report(LogKind::Error, err);
                None
            }
        }
    }
}

/// State of the membership shown to the operator
#[derive(Debug, Clone, Default)]
pub struct ReferralOverview {
    pub member: Option<ProgramAccount<ReferralMember>>,
    pub statistics: Option<MemberStatistics>,
    pub treasuries: Vec<ProgramAccount<Treasury>>,
    pub referees: usize,
    pub pending_rewards: Vec<PendingReward>,
}

/// Show the membership and create claim proposals until the operator stops
pub async fn manage_referral_rewards<R: SolanaRpc + ?Sized>(
    squads: &SquadsClient<R>,
    referral: &ReferralService<R>,
    creator: &Keypair,
    settings: &Settings,
    buddy_link: &BuddyLinkConfig,
    prompt: &mut dyn RewardPrompt,
) -> SquadsResult<()> {
    let multisig = settings.multisig()?;
    let vault = settings.vault()?;

    let overview = show_referral_data(referral, &vault, buddy_link).await;
    let ReferralOverview {
        member,
        mut pending_rewards,
        ..
    } = overview;

    while !pending_rewards.is_empty() {
        let Some(index) = prompt.choose(&pending_rewards) else {
            return Ok(());
        };
        let Some(reward) = pending_rewards.get(index).cloned() else {
            return Ok(());
        };

        claim_pending_reward(squads, referral, creator, &multisig, &vault, &reward, member.as_ref())
            .await?;
        pending_rewards.remove(index);
    }

    report(
        LogKind::Details,
        "There are no (more) pending rewards outstanding!",
    );
    Ok(())
}

fn or_absent<T>(result: SquadsResult<T>, what: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            report(
                LogKind::Error,
                format!("An error occurred while fetching the {}!", what),
            );
            report(LogKind::Normal, err);
            None
        }
    }
}

/// Report the membership, its treasuries and tickets; collect what is claimable
pub async fn show_referral_data<R: SolanaRpc + ?Sized>(
    referral: &ReferralService<R>,
    vault: &Pubkey,
    buddy_link: &BuddyLinkConfig,
) -> ReferralOverview {
    let mut overview = ReferralOverview::default();

    report(LogKind::Highlight, "Referral:");
    overview.member = or_absent(
        referral
            .get_member(&buddy_link.org_name, &buddy_link.member_name)
            .await,
        "referral member",
    )
    .flatten();
    match &overview.member {
        Some(member) => report(
            LogKind::Spotlight,
            format!("{}{}", REFERRAL_LINK_BASE, member.account.name),
        ),
        None => report(LogKind::Error, "Referral member does not exist!"),
    }

    let profile = or_absent(referral.get_profile(vault).await, "referral profile").flatten();
    match &profile {
        Some(profile) => report(
            LogKind::Details,
            format!("Authority: {}", profile.account.authority),
        ),
        None => report(LogKind::Error, "Referral profile does not exist!"),
    }

    if let Some(member) = &overview.member {
        overview.statistics = or_absent(
            referral.get_member_statistics(&member.address).await,
            "referral member statistics",
        )
        .flatten();
    }
    if let Some(statistics) = &overview.statistics {
        report(
            LogKind::Details,
            format!(
                "Total referred volume: {} USDC",
                RewardToken::Usdc.ui_amount(statistics.total_referrer_volume)
            ),
        );
    }

    overview.treasuries =
        or_absent(referral.get_treasuries(vault).await, "treasuries").unwrap_or_default();

    let mut referees = BTreeSet::new();
    for treasury in &overview.treasuries {
        let contributors = or_absent(
            referral.get_treasury_contributors(&treasury.address).await,
            "treasury contributors",
        )
        .unwrap_or_default();
        referees.extend(contributors.into_iter().map(|member| member.account.owner));
    }
    overview.referees = referees.len();
    report(LogKind::Details, format!("Referees: {}", overview.referees));

    report(
        LogKind::Highlight,
        format!("Treasuries ({}):", overview.treasuries.len()),
    );
    for treasury in &overview.treasuries {
        let Some(token) = RewardToken::from_mint(&treasury.account.mint) else {
            report(
                LogKind::Details,
                format!("Skipping treasury for unknown mint {}", treasury.account.mint),
            );
            continue;
        };
        let balance = or_absent(
            referral.get_claimable_balance(treasury).await,
            "treasury balance",
        )
        .unwrap_or_default();
        if balance == 0 {
            continue;
        }

        report(
            LogKind::Details,
            format!("{}: {}", token.symbol(), token.ui_amount(balance)),
        );
        overview.pending_rewards.push(PendingReward {
            source: RewardSource::Treasury {
                token,
                treasury: treasury.clone(),
            },
            balance,
        });
    }
    if overview.treasuries.is_empty() {
        report(LogKind::Error, "No treasuries could be found!");
    } else if overview.pending_rewards.is_empty() {
        report(LogKind::Details, "No claimable balances");
    }

    if overview.member.is_some() {
        let tickets = overview
            .statistics
            .as_ref()
            .map(|statistics| referral.get_claimable_tickets(statistics))
            .unwrap_or_default();

        report(LogKind::Highlight, "Golden Tickets:");
        report(
            LogKind::Details,
            format!(
                "Claimable tickets: {} (one per {} USDC referred)",
                tickets,
                RewardToken::Usdc.ui_amount(TICKET_VOLUME_RATIO)
            ),
        );
        if let Some(statistics) = &overview.statistics {
            report(
                LogKind::Details,
                format!("Claimed tickets: {}", statistics.number_of_claimed_rewards),
            );
            report(
                LogKind::Details,
                format!("Last claimed: {}", format_last_claimed(statistics.last_claimed)),
            );
        }
        if tickets > 0 {
            overview.pending_rewards.push(PendingReward {
                source: RewardSource::GoldenTickets,
                balance: tickets,
            });
        }
    }

    overview
}

fn format_last_claimed(timestamp: i64) -> String {
    if timestamp <= 0 {
        return "never".to_string();
    }
    DateTime::from_timestamp(timestamp, 0)
        .map(|time| time.to_rfc3339())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Create the proposal claiming one reward to the vault
pub async fn claim_pending_reward<R: SolanaRpc + ?Sized>(
    squads: &SquadsClient<R>,
    referral: &ReferralService<R>,
    creator: &Keypair,
    multisig: &Pubkey,
    vault: &Pubkey,
    reward: &PendingReward,
    member: Option<&ProgramAccount<ReferralMember>>,
) -> SquadsResult<()> {
    let instructions = match (&reward.source, member) {
        (RewardSource::Treasury { treasury, .. }, _) => {
            referral.build_claim_treasury_instructions(treasury, vault)
        }
        (RewardSource::GoldenTickets, Some(member)) => {
            referral.build_claim_ticket_instructions(member, vault, reward.balance)
        }
        (RewardSource::GoldenTickets, None) => Ok(Vec::new()),
    };
    let instructions = match instructions {
        Ok(instructions) if !instructions.is_empty() => instructions,
        Ok(_) => return Err(SquadsError::ClaimUnavailable(reward.symbol().to_string())),
        Err(err) => {
            report(LogKind::Error, &err);
            return Err(SquadsError::ClaimUnavailable(reward.symbol().to_string()));
        }
    };

    let receipt = squads
        .propose(
            multisig,
            &instructions,
            creator,
            Some(format!("Claim referral {} reward", reward.symbol())),
        )
        .await?;
    report(
        LogKind::Highlight,
        format!("Transaction & Proposal created to claim {}!", reward.symbol()),
    );
    report(LogKind::Signature, receipt.signature);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_labels() {
        let tickets = PendingReward {
            source: RewardSource::GoldenTickets,
            balance: 3,
        };
        assert_eq!(tickets.symbol(), "GoldenTickets");
        assert_eq!(tickets.label(), "Golden Tickets (3)");

        let usdc = PendingReward {
            source: RewardSource::Treasury {
                token: RewardToken::Usdc,
                treasury: ProgramAccount {
                    address: Pubkey::new_unique(),
                    account: Treasury {
                        owner_profile: Pubkey::new_unique(),
                        mint: RewardToken::Usdc.mint(),
                        bump: 255,
                    },
                },
            },
            balance: 2_500_000,
        };
        assert_eq!(usdc.symbol(), "USDC");
        assert_eq!(usdc.label(), "USDC (2.5)");
    }

    #[test]
    fn test_last_claimed_format() {
        assert_eq!(format_last_claimed(0), "never");
        assert_eq!(format_last_claimed(86_400), "1970-01-02T00:00:00+00:00");
    }
}
