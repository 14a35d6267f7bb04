use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use solana_sdk::signer::Signer;

use squad_treasury::{
    config::Configuration,
    confirm::{confirm_transaction, DEFAULT_POLL_INTERVAL},
    flows::{self, DialoguerPrompt, RunOutcome},
    logging::{self, report, LogKind},
    referral::ReferralService,
    rpc::{new_rpc_client, SolanaRpc},
    settings::JsonSettingsStore,
    SquadsClient,
};

/// Lamports airdropped to the creator on a local validator
const LOCAL_AIRDROP_LAMPORTS: u64 = 1_000_000_000;

/// Bootstrap a Squads multisig with a referral membership, or manage its rewards
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Configuration file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Settings file written after bootstrap
    #[arg(long, default_value = "settings.json")]
    settings: PathBuf,
}

#[tokio::main]
async fn main() {
    logging::init();

    if let Err(err) = run(Args::parse()).await {
        report(LogKind::Error, format!("{:#}", err));
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = Configuration::load(&args.config)?;
    let store = JsonSettingsStore::new(&args.settings);
    report(
        LogKind::Details,
        format!("Running against {:?} ({})", config.mode, config.rpc_url()),
    );

    let rpc = Arc::new(new_rpc_client(config.rpc_url()));
    let squads = SquadsClient::new(Arc::clone(&rpc));
    let referral = ReferralService::new(Arc::clone(&rpc), config.mode);
    let creator = config.creator_keypair()?;

    if config.mode.is_local() {
        let signature =
            SolanaRpc::request_airdrop(rpc.as_ref(), &creator.pubkey(), LOCAL_AIRDROP_LAMPORTS)
                .await
                .context("airdrop to the creator failed")?;
        let (blockhash, _) = SolanaRpc::get_latest_blockhash(rpc.as_ref()).await?;
        confirm_transaction(rpc.as_ref(), &signature, &blockhash, DEFAULT_POLL_INTERVAL).await?;
        report(LogKind::Details, format!("Airdropped 1 SOL to {}", creator.pubkey()));
    }

    let outcome = flows::run(
        &squads,
        &referral,
        &creator,
        &config.squads,
        &config.buddy_link,
        &store,
        &mut DialoguerPrompt,
    )
    .await?;
    if let RunOutcome::Bootstrapped(settings) = outcome {
        report(
            LogKind::Highlight,
            format!("Multisig {} saved to {}", settings.multisig_pda, store.path().display()),
        );
    }

    Ok(())
}
