//! Operator flows run by the binary
//!
//! [`bootstrap`] creates the multisig and registers its referral membership;
//! [`rewards`] shows the membership's rewards and proposes claims. [`run`]
//! picks one of them from the saved settings.

pub mod bootstrap;
pub mod rewards;

use solana_sdk::signature::Keypair;

use crate::{
    client::SquadsClient,
    config::{BuddyLinkConfig, SquadConfig},
    error::SquadsResult,
    logging::{report, LogKind},
    referral::ReferralService,
    rpc::SolanaRpc,
    settings::{Settings, SettingsStore},
};

pub use bootstrap::create_squad_with_referral;
pub use rewards::{manage_referral_rewards, DialoguerPrompt, RewardPrompt};

/// What a run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A multisig was created and its settings saved
    Bootstrapped(Settings),
    /// Saved settings were found and the rewards flow ran
    ManagedRewards(Settings),
}

/// Bootstrap when no settings are saved, otherwise manage rewards
pub async fn run<R: SolanaRpc + ?Sized>(
    squads: &SquadsClient<R>,
    referral: &ReferralService<R>,
    creator: &Keypair,
    squad_config: &SquadConfig,
    buddy_link: &BuddyLinkConfig,
    store: &dyn SettingsStore,
    prompt: &mut dyn RewardPrompt,
) -> SquadsResult<RunOutcome> {
    match store.load()? {
        None => {
            let settings =
                create_squad_with_referral(squads, referral, creator, squad_config, buddy_link)
                    .await?;
            store.save(&settings)?;
            Ok(RunOutcome::Bootstrapped(settings))
        }
        Some(settings) => {
            report(
                LogKind::Details,
                format!("Using multisig {}", settings.multisig_pda),
            );
            manage_referral_rewards(squads, referral, creator, &settings, buddy_link, prompt)
                .await?;
            Ok(RunOutcome::ManagedRewards(settings))
        }
    }
}
