//! Network boundary
//!
//! Every remote call the tooling makes goes through [`SolanaRpc`]. The
//! production implementation is the nonblocking `RpcClient`; tests drive the
//! same code against an in-memory cluster.

use async_trait::async_trait;
use solana_client::{
    nonblocking::rpc_client::RpcClient,
    rpc_config::{
        RpcAccountInfoConfig, RpcProgramAccountsConfig, RpcSendTransactionConfig,
        RpcSimulateTransactionConfig,
    },
    rpc_filter::{Memcmp, RpcFilterType},
};
use solana_commitment_config::CommitmentConfig;
use solana_sdk::{
    hash::Hash, pubkey::Pubkey, signature::Signature, transaction::VersionedTransaction,
};

use crate::error::{translate_client_error, SquadsResult};

/// One entry of the network's recent prioritization fee history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSample {
    pub slot: u64,
    /// Micro-lamports per compute unit
    pub fee: u64,
}

/// Outcome of a landed (or still pending) signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureStatus {
    Pending,
    Confirmed,
    Failed(String),
}

/// Byte filter for program account scans
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountFilter {
    pub offset: usize,
    pub bytes: Vec<u8>,
}

impl AccountFilter {
    pub fn pubkey_at(offset: usize, key: &Pubkey) -> Self {
        Self {
            offset,
            bytes: key.to_bytes().to_vec(),
        }
    }
}

/// Remote procedure calls used by the orchestrator, optimizer and façade
#[async_trait]
pub trait SolanaRpc: Send + Sync {
    /// Raw account data, `None` when the account does not exist
    async fn get_account_data(&self, address: &Pubkey) -> SquadsResult<Option<Vec<u8>>>;

    /// Accounts owned by `program` matching every filter
    async fn get_program_accounts(
        &self,
        program: &Pubkey,
        filters: Vec<AccountFilter>,
    ) -> SquadsResult<Vec<(Pubkey, Vec<u8>)>>;

    /// Latest blockhash and the last block height it is valid for
    async fn get_latest_blockhash(&self) -> SquadsResult<(Hash, u64)>;

    async fn is_blockhash_valid(&self, blockhash: &Hash) -> SquadsResult<bool>;

    /// Recent prioritization fees paid by transactions touching `addresses`
    async fn get_recent_prioritization_fees(
        &self,
        addresses: &[Pubkey],
    ) -> SquadsResult<Vec<FeeSample>>;

    /// Compute units the transaction consumed in simulation, `None` if it failed
    async fn simulate_compute_units(
        &self,
        transaction: &VersionedTransaction,
    ) -> SquadsResult<Option<u64>>;

    /// Submit a signed transaction; `max_retries` is forwarded to the node
    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
        max_retries: Option<usize>,
    ) -> SquadsResult<Signature>;

    async fn get_signature_status(&self, signature: &Signature) -> SquadsResult<SignatureStatus>;

    async fn request_airdrop(&self, to: &Pubkey, lamports: u64) -> SquadsResult<Signature>;
}

#[async_trait]
impl SolanaRpc for RpcClient {
    async fn get_account_data(&self, address: &Pubkey) -> SquadsResult<Option<Vec<u8>>> {
        let response = self
            .get_account_with_commitment(address, self.commitment())
            .await?;
        Ok(response.value.map(|account| account.data))
    }

    async fn get_program_accounts(
        &self,
        program: &Pubkey,
        filters: Vec<AccountFilter>,
    ) -> SquadsResult<Vec<(Pubkey, Vec<u8>)>> {
        let filters = filters
            .into_iter()
            .map(|f| RpcFilterType::Memcmp(Memcmp::new_raw_bytes(f.offset, f.bytes)))
            .collect();
        let config = RpcProgramAccountsConfig {
            filters: Some(filters),
            account_config: RpcAccountInfoConfig {
                commitment: Some(self.commitment()),
                ..Default::default()
            },
            ..Default::default()
        };

        let accounts = self.get_program_accounts_with_config(program, config).await?;
        Ok(accounts
            .into_iter()
            .map(|(address, account)| (address, account.data))
            .collect())
    }

    async fn get_latest_blockhash(&self) -> SquadsResult<(Hash, u64)> {
        Ok(self
            .get_latest_blockhash_with_commitment(self.commitment())
            .await?)
    }

    async fn is_blockhash_valid(&self, blockhash: &Hash) -> SquadsResult<bool> {
        Ok(RpcClient::is_blockhash_valid(self, blockhash, self.commitment()).await?)
    }

    async fn get_recent_prioritization_fees(
        &self,
        addresses: &[Pubkey],
    ) -> SquadsResult<Vec<FeeSample>> {
        let fees = RpcClient::get_recent_prioritization_fees(self, addresses).await?;
        Ok(fees
            .into_iter()
            .map(|f| FeeSample {
                slot: f.slot,
                fee: f.prioritization_fee,
            })
            .collect())
    }

    async fn simulate_compute_units(
        &self,
        transaction: &VersionedTransaction,
    ) -> SquadsResult<Option<u64>> {
        let config = RpcSimulateTransactionConfig {
            sig_verify: false,
            replace_recent_blockhash: true,
            commitment: Some(self.commitment()),
            ..Default::default()
        };

        let result = self
            .simulate_transaction_with_config(transaction, config)
            .await?
            .value;
        if result.err.is_some() {
            return Ok(None);
        }
        Ok(result.units_consumed)
    }

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
        max_retries: Option<usize>,
    ) -> SquadsResult<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight: false,
            preflight_commitment: Some(CommitmentConfig::confirmed().commitment),
            max_retries,
            ..Default::default()
        };

        self.send_transaction_with_config(transaction, config)
            .await
            .map_err(translate_client_error)
    }

    async fn get_signature_status(&self, signature: &Signature) -> SquadsResult<SignatureStatus> {
        let status = self
            .get_signature_status_with_commitment(signature, self.commitment())
            .await?;
        Ok(match status {
            None => SignatureStatus::Pending,
            Some(Ok(())) => SignatureStatus::Confirmed,
            Some(Err(err)) => SignatureStatus::Failed(err.to_string()),
        })
    }

    async fn request_airdrop(&self, to: &Pubkey, lamports: u64) -> SquadsResult<Signature> {
        Ok(RpcClient::request_airdrop(self, to, lamports).await?)
    }
}

/// A nonblocking client with `confirmed` commitment
pub fn new_rpc_client(url: &str) -> RpcClient {
    RpcClient::new_with_commitment(url.to_string(), CommitmentConfig::confirmed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pubkey_filter() {
        let key = Pubkey::new_unique();
        let filter = AccountFilter::pubkey_at(8, &key);
        assert_eq!(filter.offset, 8);
        assert_eq!(filter.bytes, key.to_bytes().to_vec());
    }

    #[test]
    fn test_client_uses_confirmed_commitment() {
        let client = new_rpc_client("http://127.0.0.1:8899");
        assert_eq!(client.commitment(), CommitmentConfig::confirmed());
    }
}
