//! Multisig bootstrap
//!
//! The multisig is created with threshold 1 so the creator can set it up
//! alone: the referral membership is proposed, approved and executed, then
//! a last config proposal raises the threshold (optionally downgrading the
//! creator to initiate-only). Steps are not rolled back when a later one
//! fails.

use solana_sdk::{pubkey::Pubkey, signature::Keypair, signer::Signer};

use crate::{
    client::SquadsClient,
    compute::DEFAULT_PRIORITY_FEE,
    config::{BuddyLinkConfig, SquadConfig},
    error::{SquadsError, SquadsResult},
    logging::{report, LogKind},
    referral::ReferralService,
    rpc::SolanaRpc,
    settings::Settings,
    types::{Permission, Permissions},
};

/// Threshold the multisig is created with
pub const BOOTSTRAP_THRESHOLD: u16 = 1;

/// Compute units executing the membership creation takes
pub const MEMBER_CREATION_COMPUTE_LIMIT: u32 = 300_000;

/// Create the multisig, register its referral membership and lock it down
pub async fn create_squad_with_referral<R: SolanaRpc + ?Sized>(
    squads: &SquadsClient<R>,
    referral: &ReferralService<R>,
    creator: &Keypair,
    squad_config: &SquadConfig,
    buddy_link: &BuddyLinkConfig,
) -> SquadsResult<Settings> {
    let members = squad_config.member_keys()?;
    let create_key = squad_config.create_keypair()?;
    validate_final_threshold(creator, &members, squad_config)?;

    report(
        LogKind::Details,
        format!("Creator & fee payer: {}", creator.pubkey()),
    );
    let wallet = squads
        .create_wallet(creator, &members, BOOTSTRAP_THRESHOLD, create_key.as_ref())
        .await?;
    report(LogKind::Highlight, format!("Multisig created: {}", wallet.multisig));
    report(LogKind::Signature, wallet.signature);
    report(LogKind::Details, format!("Vault: {}", wallet.vault));

    create_referral_membership(
        squads,
        referral,
        creator,
        &wallet.multisig,
        &wallet.vault,
        squad_config.vault_funding_lamports,
        buddy_link,
    )
    .await?;

    finalize_configuration(squads, creator, &wallet.multisig, squad_config).await?;

    Ok(Settings::new(&wallet.create_key, &wallet.multisig, &wallet.vault))
}

/// The configured threshold must be reachable by the members that can vote
/// once the bootstrap is done
fn validate_final_threshold(
    creator: &Keypair,
    members: &[Pubkey],
    squad_config: &SquadConfig,
) -> SquadsResult<()> {
    let others = members
        .iter()
        .filter(|key| **key != creator.pubkey())
        .count();
    let voters = if squad_config.downgrade_creator {
        others
    } else {
        others + 1
    };

    if voters == 0 {
        return Err(SquadsError::NoVotingMembers);
    }
    if squad_config.threshold == 0 || usize::from(squad_config.threshold) > voters {
        return Err(SquadsError::InvalidThreshold);
    }
    Ok(())
}

/// Propose, approve and execute the membership creation from the vault
///
/// An unavailable name is reported and skipped before anything is proposed.
pub async fn create_referral_membership<R: SolanaRpc + ?Sized>(
    squads: &SquadsClient<R>,
    referral: &ReferralService<R>,
    creator: &Keypair,
    multisig: &Pubkey,
    vault: &Pubkey,
    vault_funding_lamports: u64,
    buddy_link: &BuddyLinkConfig,
) -> SquadsResult<()> {
    let instructions = match referral
        .check_and_build_membership_creation(vault, &buddy_link.org_name, &buddy_link.member_name)
        .await
    {
        Ok(instructions) => instructions,
        Err(err @ (SquadsError::NameUnavailable(_) | SquadsError::InvalidName(_))) => {
            report(LogKind::Error, err);
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    let receipt = squads
        .propose(
            multisig,
            &instructions,
            creator,
            Some(format!("Create referral member {}", buddy_link.member_name)),
        )
        .await?;
    report(LogKind::Normal, "Referral - Proposal created");
    report(LogKind::Signature, receipt.signature);

    let signature = squads
        .approve(multisig, receipt.transaction_index, creator)
        .await?;
    report(LogKind::Normal, "Referral - Proposal approved");
    report(LogKind::Signature, signature);

    let signature = squads
        .transfer_lamports(creator, vault, vault_funding_lamports)
        .await?;
    report(LogKind::Normal, "Referral - Vault funded");
    report(LogKind::Signature, signature);

    let signature = squads
        .execute_with_compute_limit(
            multisig,
            receipt.transaction_index,
            creator,
            MEMBER_CREATION_COMPUTE_LIMIT,
            DEFAULT_PRIORITY_FEE,
        )
        .await?;
    report(LogKind::Normal, "Referral - Proposal executed");
    report(LogKind::Signature, signature);
    Ok(())
}

/// Raise the threshold to its configured value, in the same proposal
/// downgrading the creator when configured
pub async fn finalize_configuration<R: SolanaRpc + ?Sized>(
    squads: &SquadsClient<R>,
    creator: &Keypair,
    multisig: &Pubkey,
    squad_config: &SquadConfig,
) -> SquadsResult<()> {
    let receipt = if squad_config.downgrade_creator {
        let permissions = Permissions::from_vec(&[Permission::Initiate]);
        report(
            LogKind::Details,
            format!("Creator keeps: {}", permissions.labels().join(", ")),
        );
        squads
            .propose_permission_and_threshold_change(
                multisig,
                creator,
                creator.pubkey(),
                permissions,
                squad_config.threshold,
            )
            .await?
    } else {
        squads
            .propose_threshold_change(multisig, creator, squad_config.threshold)
            .await?
    };
    report(LogKind::Normal, "Threshold Update - Proposal created");
    report(LogKind::Signature, receipt.signature);

    let signature = squads
        .approve(multisig, receipt.transaction_index, creator)
        .await?;
    report(LogKind::Normal, "Threshold Update - Proposal approved");
    report(LogKind::Signature, signature);

    let signature = squads
        .execute_config(multisig, receipt.transaction_index, creator)
        .await?;
    report(LogKind::Normal, "Threshold Update - Proposal executed");
    report(LogKind::Signature, signature);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squad_config(members: usize, threshold: u16, downgrade_creator: bool) -> SquadConfig {
        SquadConfig {
            create_key: None,
            members: (0..members)
                .map(|_| Pubkey::new_unique().to_string())
                .collect(),
            threshold,
            downgrade_creator,
            vault_funding_lamports: 0,
        }
    }

    #[test]
    fn test_final_threshold_counts_creator() {
        let creator = Keypair::new();
        let config = squad_config(3, 4, false);
        let members = config.member_keys().unwrap();
        assert!(validate_final_threshold(&creator, &members, &config).is_ok());

        let config = squad_config(3, 5, false);
        let members = config.member_keys().unwrap();
        assert!(matches!(
            validate_final_threshold(&creator, &members, &config),
            Err(SquadsError::InvalidThreshold)
        ));
    }

    #[test]
    fn test_downgraded_creator_does_not_vote() {
        let creator = Keypair::new();
        let config = squad_config(3, 4, true);
        let members = config.member_keys().unwrap();
        assert!(validate_final_threshold(&creator, &members, &config).is_err());

        let config = squad_config(3, 3, true);
        let members = config.member_keys().unwrap();
        assert!(validate_final_threshold(&creator, &members, &config).is_ok());
    }

    #[test]
    fn test_downgrade_without_other_voters() {
        let creator = Keypair::new();
        let config = squad_config(0, 1, true);
        assert!(matches!(
            validate_final_threshold(&creator, &[], &config),
            Err(SquadsError::NoVotingMembers)
        ));
    }

    #[test]
    fn test_zero_threshold() {
        let creator = Keypair::new();
        let config = squad_config(2, 0, false);
        let members = config.member_keys().unwrap();
        assert!(validate_final_threshold(&creator, &members, &config).is_err());
    }
}
