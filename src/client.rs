//! Proposal lifecycle orchestration
//!
//! [`SquadsClient`] drives a multisig and its proposals through create,
//! propose, approve and execute. Every step is submitted and then confirmed
//! before the call returns, so a flow is a plain sequence of awaits.
//!
//! The next transaction index is read from the multisig right before a
//! proposal is submitted. Another writer advancing the index in between makes
//! the submission fail with [`SquadsError::StaleIndex`]; nothing retries it.

use std::sync::Arc;
use std::time::Duration;

use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::VersionedTransaction,
};

use crate::{
    accounts::{
        AnchorAccount, ConfigTransaction, Multisig, ProgramConfig, Proposal, VaultTransaction,
    },
    compute::with_compute_budget,
    confirm::{confirm_transaction, DEFAULT_POLL_INTERVAL},
    error::{SquadsError, SquadsResult},
    instructions,
    message::TransactionMessage,
    optimizer::{build_optimized_transaction, OptimizeParams},
    pda,
    rpc::SolanaRpc,
    types::{ConfigAction, Member, Permissions},
};

/// Node-side retries for the proposal creation submission
///
/// Approvals and executions are sent without retries.
pub const PROPOSAL_SUBMIT_RETRIES: usize = 5;

/// Vault every proposal acts for
pub const DEFAULT_VAULT_INDEX: u8 = 0;

/// Addresses of a freshly created multisig
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedWallet {
    pub create_key: Pubkey,
    pub multisig: Pubkey,
    pub vault: Pubkey,
    pub signature: Signature,
}

/// Result of a proposal submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposalReceipt {
    pub signature: Signature,
    /// Index to pass to [`SquadsClient::approve`] and the execute calls
    pub transaction_index: u64,
}

/// High-level async client for the Squads v4 proposal lifecycle
pub struct SquadsClient<R: ?Sized> {
    rpc: Arc<R>,
    program_id: Pubkey,
    poll_interval: Duration,
}

impl<R: SolanaRpc + ?Sized> SquadsClient<R> {
    /// Create a client for the canonical Squads deployment
    pub fn new(rpc: Arc<R>) -> Self {
        Self {
            rpc,
            program_id: crate::program_id(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Target another deployment of the program (e.g. on a local validator)
    pub fn with_program_id(mut self, program_id: Pubkey) -> Self {
        self.program_id = program_id;
        self
    }

    /// Delay between confirmation polls
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn rpc(&self) -> &Arc<R> {
        &self.rpc
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    /// Default vault of a multisig
    pub fn vault_pda(&self, multisig: &Pubkey) -> Pubkey {
        pda::get_vault_pda(multisig, DEFAULT_VAULT_INDEX, Some(&self.program_id)).0
    }

    pub fn multisig_pda(&self, create_key: &Pubkey) -> Pubkey {
        pda::get_multisig_pda(create_key, Some(&self.program_id)).0
    }

    async fn fetch<T: AnchorAccount>(&self, address: &Pubkey) -> SquadsResult<T> {
        let data = self
            .rpc
            .get_account_data(address)
            .await?
            .ok_or_else(|| SquadsError::AccountNotFound(format!("{} {}", T::NAME, address)))?;
        T::try_from_account_data(&data)
    }

    pub async fn get_multisig(&self, multisig: &Pubkey) -> SquadsResult<Multisig> {
        self.fetch(multisig).await
    }

    pub async fn get_proposal(
        &self,
        multisig: &Pubkey,
        transaction_index: u64,
    ) -> SquadsResult<Proposal> {
        let (proposal, _) =
            pda::get_proposal_pda(multisig, transaction_index, Some(&self.program_id));
        self.fetch(&proposal).await
    }

    pub async fn get_vault_transaction(
        &self,
        multisig: &Pubkey,
        transaction_index: u64,
    ) -> SquadsResult<VaultTransaction> {
        let (transaction, _) =
            pda::get_transaction_pda(multisig, transaction_index, Some(&self.program_id));
        self.fetch(&transaction).await
    }

    pub async fn get_config_transaction(
        &self,
        multisig: &Pubkey,
        transaction_index: u64,
    ) -> SquadsResult<ConfigTransaction> {
        let (transaction, _) =
            pda::get_transaction_pda(multisig, transaction_index, Some(&self.program_id));
        self.fetch(&transaction).await
    }

    /// Index of the most recently created transaction (0 when none)
    pub async fn last_transaction_index(&self, multisig: &Pubkey) -> SquadsResult<u64> {
        Ok(self.get_multisig(multisig).await?.transaction_index)
    }

    pub async fn next_transaction_index(&self, multisig: &Pubkey) -> SquadsResult<u64> {
        Ok(self.get_multisig(multisig).await?.next_transaction_index())
    }

    /// Create a multisig where every member has full permissions
    ///
    /// The creator is prepended to `members` and pays for the account. There
    /// is no time lock, no config authority (changes go through config
    /// proposals) and no rent collector. A create key is generated when none
    /// is given; it has to sign the creation.
    ///
    /// # Errors
    /// * [`SquadsError::InvalidThreshold`] when `threshold` is 0 or exceeds
    ///   the member count, before anything is sent
    /// * [`SquadsError::AccountAlreadyExists`] when the create key was used
    pub async fn create_wallet(
        &self,
        creator: &Keypair,
        members: &[Pubkey],
        threshold: u16,
        create_key: Option<&Keypair>,
    ) -> SquadsResult<CreatedWallet> {
        let mut keys = vec![creator.pubkey()];
        keys.extend(members.iter().filter(|key| **key != creator.pubkey()));

        if threshold == 0 || usize::from(threshold) > keys.len() {
            return Err(SquadsError::InvalidThreshold);
        }

        let generated;
        let create_key = match create_key {
            Some(key) => key,
            None => {
                generated = Keypair::new();
                &generated
            }
        };

        let multisig = self.multisig_pda(&create_key.pubkey());
        if self.rpc.get_account_data(&multisig).await?.is_some() {
            return Err(SquadsError::AccountAlreadyExists(multisig));
        }

        let (program_config_pda, _) = pda::get_program_config_pda(Some(&self.program_id));
        let program_config: ProgramConfig = self.fetch(&program_config_pda).await?;

        let args = instructions::MultisigCreateArgsV2 {
            config_authority: None,
            threshold,
            members: keys.into_iter().map(Member::new).collect(),
            time_lock: 0,
            rent_collector: None,
            memo: None,
        };
        let ix = instructions::multisig_create_v2(
            program_config_pda,
            program_config.treasury,
            multisig,
            create_key.pubkey(),
            creator.pubkey(),
            args,
            Some(self.program_id),
        )?;

        let signature = self
            .send_and_confirm(&[ix], &[creator, create_key])
            .await?;
        tracing::info!(multisig = %multisig, signature = %signature, "Multisig created");

        Ok(CreatedWallet {
            create_key: create_key.pubkey(),
            multisig,
            vault: self.vault_pda(&multisig),
            signature,
        })
    }

    /// Propose instructions to be executed by the vault
    ///
    /// The vault transaction and its proposal are created in one
    /// fee-optimized transaction at the next free index.
    pub async fn propose(
        &self,
        multisig: &Pubkey,
        instructions: &[Instruction],
        proposer: &Keypair,
        memo: Option<String>,
    ) -> SquadsResult<ProposalReceipt> {
        let transaction_index = self.next_transaction_index(multisig).await?;
        let vault = self.vault_pda(multisig);
        let message = TransactionMessage::try_compile(&vault, instructions)?;

        let (transaction, _) =
            pda::get_transaction_pda(multisig, transaction_index, Some(&self.program_id));
        let args = instructions::VaultTransactionCreateArgs {
            vault_index: DEFAULT_VAULT_INDEX,
            ephemeral_signers: 0,
            transaction_message: message.to_bytes()?,
            memo,
        };
        let create = instructions::vault_transaction_create(
            *multisig,
            transaction,
            proposer.pubkey(),
            proposer.pubkey(),
            args,
            Some(self.program_id),
        )?;

        self.submit_proposal(multisig, transaction_index, create, proposer)
            .await
    }

    /// Propose structural changes to the multisig
    pub async fn propose_config_change(
        &self,
        multisig: &Pubkey,
        proposer: &Keypair,
        actions: Vec<ConfigAction>,
        memo: Option<String>,
    ) -> SquadsResult<ProposalReceipt> {
        if actions.is_empty() {
            return Err(SquadsError::NoConfigActions);
        }

        let transaction_index = self.next_transaction_index(multisig).await?;
        let (transaction, _) =
            pda::get_transaction_pda(multisig, transaction_index, Some(&self.program_id));
        let create = instructions::config_transaction_create(
            *multisig,
            transaction,
            proposer.pubkey(),
            proposer.pubkey(),
            instructions::ConfigTransactionCreateArgs { actions, memo },
            Some(self.program_id),
        )?;

        self.submit_proposal(multisig, transaction_index, create, proposer)
            .await
    }

    pub async fn propose_threshold_change(
        &self,
        multisig: &Pubkey,
        proposer: &Keypair,
        new_threshold: u16,
    ) -> SquadsResult<ProposalReceipt> {
        let actions = vec![ConfigAction::ChangeThreshold { new_threshold }];
        self.propose_config_change(multisig, proposer, actions, None)
            .await
    }

    /// Replace a member's permissions (remove, then re-add)
    pub async fn propose_permission_change(
        &self,
        multisig: &Pubkey,
        proposer: &Keypair,
        member: Pubkey,
        permissions: Permissions,
    ) -> SquadsResult<ProposalReceipt> {
        let actions = ConfigAction::replace_permissions(member, permissions).to_vec();
        self.propose_config_change(multisig, proposer, actions, None)
            .await
    }

    /// Replace a member's permissions and change the threshold in one proposal
    pub async fn propose_permission_and_threshold_change(
        &self,
        multisig: &Pubkey,
        proposer: &Keypair,
        member: Pubkey,
        permissions: Permissions,
        new_threshold: u16,
    ) -> SquadsResult<ProposalReceipt> {
        let mut actions = ConfigAction::replace_permissions(member, permissions).to_vec();
        actions.push(ConfigAction::ChangeThreshold { new_threshold });
        self.propose_config_change(multisig, proposer, actions, None)
            .await
    }

    /// Vote for a proposal
    ///
    /// A second vote by the same member is rejected by the program
    /// (`AlreadyApproved`).
    pub async fn approve(
        &self,
        multisig: &Pubkey,
        transaction_index: u64,
        approver: &Keypair,
    ) -> SquadsResult<Signature> {
        let (proposal, _) =
            pda::get_proposal_pda(multisig, transaction_index, Some(&self.program_id));
        let ix = instructions::proposal_approve(
            *multisig,
            proposal,
            approver.pubkey(),
            instructions::ProposalVoteArgs::default(),
            Some(self.program_id),
        )?;

        let signature = self.send_and_confirm(&[ix], &[approver]).await?;
        tracing::info!(transaction_index, signature = %signature, "Proposal approved");
        Ok(signature)
    }

    /// Execute an approved vault transaction
    ///
    /// # Errors
    /// [`SquadsError::InsufficientApprovals`] when the proposal has not
    /// reached its threshold yet.
    pub async fn execute(
        &self,
        multisig: &Pubkey,
        transaction_index: u64,
        executor: &Keypair,
    ) -> SquadsResult<Signature> {
        let ix = self
            .vault_execute_instruction(multisig, transaction_index, executor)
            .await?;
        let signature = self
            .send_and_confirm(&[ix], &[executor])
            .await
            .map_err(|err| err.at_execution(transaction_index))?;

        tracing::info!(transaction_index, signature = %signature, "Vault transaction executed");
        Ok(signature)
    }

    /// Execute an approved vault transaction with a fixed compute budget
    ///
    /// For transactions whose cost is known up front and cannot be simulated
    /// reliably, such as those creating referral accounts.
    pub async fn execute_with_compute_limit(
        &self,
        multisig: &Pubkey,
        transaction_index: u64,
        executor: &Keypair,
        compute_limit: u32,
        priority_fee: u64,
    ) -> SquadsResult<Signature> {
        let ix = self
            .vault_execute_instruction(multisig, transaction_index, executor)
            .await?;
        let instructions = with_compute_budget(&[ix], Some(compute_limit), priority_fee);
        let signature = self
            .send_and_confirm(&instructions, &[executor])
            .await
            .map_err(|err| err.at_execution(transaction_index))?;

        tracing::info!(
            transaction_index,
            compute_limit,
            priority_fee,
            signature = %signature,
            "Vault transaction executed"
        );
        Ok(signature)
    }

    /// Execute an approved config transaction, the executor pays any rent
    pub async fn execute_config(
        &self,
        multisig: &Pubkey,
        transaction_index: u64,
        executor: &Keypair,
    ) -> SquadsResult<Signature> {
        let (proposal, _) =
            pda::get_proposal_pda(multisig, transaction_index, Some(&self.program_id));
        let (transaction, _) =
            pda::get_transaction_pda(multisig, transaction_index, Some(&self.program_id));
        let ix = instructions::config_transaction_execute(
            *multisig,
            proposal,
            transaction,
            executor.pubkey(),
            Some(executor.pubkey()),
            Some(self.program_id),
        )?;

        let signature = self
            .send_and_confirm(&[ix], &[executor])
            .await
            .map_err(|err| err.at_execution(transaction_index))?;
        tracing::info!(transaction_index, signature = %signature, "Config transaction executed");
        Ok(signature)
    }

    /// Plain lamport transfer, used to fund a vault
    pub async fn transfer_lamports(
        &self,
        from: &Keypair,
        to: &Pubkey,
        lamports: u64,
    ) -> SquadsResult<Signature> {
        let ix = solana_system_interface::instruction::transfer(&from.pubkey(), to, lamports);
        self.send_and_confirm(&[ix], &[from]).await
    }

    async fn vault_execute_instruction(
        &self,
        multisig: &Pubkey,
        transaction_index: u64,
        executor: &Keypair,
    ) -> SquadsResult<Instruction> {
        let vault_transaction = self.get_vault_transaction(multisig, transaction_index).await?;
        let remaining_accounts = vault_transaction.message.execution_account_metas()?;

        let (proposal, _) =
            pda::get_proposal_pda(multisig, transaction_index, Some(&self.program_id));
        let (transaction, _) =
            pda::get_transaction_pda(multisig, transaction_index, Some(&self.program_id));
        instructions::vault_transaction_execute(
            *multisig,
            proposal,
            transaction,
            executor.pubkey(),
            remaining_accounts,
            Some(self.program_id),
        )
    }

    /// Append `proposal_create`, optimize, submit with retries and confirm
    async fn submit_proposal(
        &self,
        multisig: &Pubkey,
        transaction_index: u64,
        create: Instruction,
        proposer: &Keypair,
    ) -> SquadsResult<ProposalReceipt> {
        let (proposal, _) =
            pda::get_proposal_pda(multisig, transaction_index, Some(&self.program_id));
        let proposal_ix = instructions::proposal_create(
            *multisig,
            proposal,
            proposer.pubkey(),
            proposer.pubkey(),
            instructions::ProposalCreateArgs {
                transaction_index,
                draft: false,
            },
            Some(self.program_id),
        )?;

        let instructions = [create, proposal_ix];
        let params = OptimizeParams::new(&instructions, proposer.pubkey())
            .with_fee_program(self.program_id);
        let optimized = build_optimized_transaction(self.rpc.as_ref(), params).await?;
        let blockhash = optimized.blockhash;
        let transaction = optimized.sign(&[proposer])?;

        let signature = self
            .send_signed(&transaction, &blockhash, Some(PROPOSAL_SUBMIT_RETRIES))
            .await
            .map_err(|err| err.at_creation(transaction_index))?;

        tracing::info!(transaction_index, signature = %signature, "Proposal created");
        Ok(ProposalReceipt {
            signature,
            transaction_index,
        })
    }

    async fn send_and_confirm(
        &self,
        instructions: &[Instruction],
        signers: &[&Keypair],
    ) -> SquadsResult<Signature> {
        let payer = signers
            .first()
            .ok_or_else(|| SquadsError::InvalidAccountData("no fee payer".to_string()))?;
        let (blockhash, _) = self.rpc.get_latest_blockhash().await?;

        let message = v0::Message::try_compile(&payer.pubkey(), instructions, &[], blockhash)?;
        let transaction = VersionedTransaction::try_new(VersionedMessage::V0(message), signers)?;

        self.send_signed(&transaction, &blockhash, None).await
    }

    async fn send_signed(
        &self,
        transaction: &VersionedTransaction,
        blockhash: &Hash,
        max_retries: Option<usize>,
    ) -> SquadsResult<Signature> {
        let signature = self.rpc.send_transaction(transaction, max_retries).await?;
        tracing::debug!(signature = %signature, "Transaction sent");
        confirm_transaction(self.rpc.as_ref(), &signature, blockhash, self.poll_interval).await
    }
}

impl<R: ?Sized> Clone for SquadsClient<R> {
    fn clone(&self) -> Self {
        Self {
            rpc: Arc::clone(&self.rpc),
            program_id: self.program_id,
            poll_interval: self.poll_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::new_rpc_client;

    #[test]
    fn test_client_creation() {
        let client = SquadsClient::new(Arc::new(new_rpc_client("http://127.0.0.1:8899")));
        assert_eq!(client.program_id(), crate::program_id());
    }

    #[test]
    fn test_client_with_custom_program_id() {
        let custom_program_id = Pubkey::new_unique();
        let client = SquadsClient::new(Arc::new(new_rpc_client("http://127.0.0.1:8899")))
            .with_program_id(custom_program_id);
        assert_eq!(client.program_id(), custom_program_id);

        let multisig = Pubkey::new_unique();
        assert_eq!(
            client.vault_pda(&multisig),
            pda::get_vault_pda(&multisig, 0, Some(&custom_program_id)).0
        );
    }
}
