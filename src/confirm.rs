//! Waiting for submitted transactions to land

use std::time::Duration;

use solana_sdk::{hash::Hash, signature::Signature};

use crate::error::{SquadsError, SquadsResult};
use crate::rpc::{SignatureStatus, SolanaRpc};

/// Delay between two signature status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Poll until `signature` is confirmed, fails, or `blockhash` expires
///
/// Failures are logged before they are returned.
pub async fn confirm_transaction<R: SolanaRpc + ?Sized>(
    rpc: &R,
    signature: &Signature,
    blockhash: &Hash,
    poll_interval: Duration,
) -> SquadsResult<Signature> {
    let result = poll_signature(rpc, signature, blockhash, poll_interval).await;
    if let Err(err) = &result {
        tracing::error!(
            signature = %signature,
            error = %err,
            "The following error occurred while trying to confirm the transaction"
        );
    }
    result
}

async fn poll_signature<R: SolanaRpc + ?Sized>(
    rpc: &R,
    signature: &Signature,
    blockhash: &Hash,
    poll_interval: Duration,
) -> SquadsResult<Signature> {
    loop {
        match rpc.get_signature_status(signature).await? {
            SignatureStatus::Confirmed => {
                tracing::debug!(signature = %signature, "Transaction confirmed");
                return Ok(*signature);
            }
            SignatureStatus::Failed(reason) => {
                return Err(SquadsError::TransactionFailed {
                    signature: *signature,
                    reason,
                });
            }
            SignatureStatus::Pending => {
                // One more status check happens after expiry in case it landed late
                if !rpc.is_blockhash_valid(blockhash).await? {
                    return match rpc.get_signature_status(signature).await? {
                        SignatureStatus::Confirmed => Ok(*signature),
                        SignatureStatus::Failed(reason) => Err(SquadsError::TransactionFailed {
                            signature: *signature,
                            reason,
                        }),
                        SignatureStatus::Pending => {
                            Err(SquadsError::ConfirmationTimeout(*signature))
                        }
                    };
                }
            }
        }

        tokio::time::sleep(poll_interval).await;
    }
}
