//! In-memory cluster used by the integration tests
//!
//! Submitted transactions are decoded and applied to an account map with the
//! checks the Squads and referral programs perform, in the order they
//! perform them. A failing instruction leaves the map untouched.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use borsh::BorshDeserialize;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::VersionedTransaction,
};

use squad_treasury::{
    accounts::{
        AnchorAccount, ConfigTransaction, Multisig, ProgramConfig, Proposal, VaultTransaction,
    },
    config::Environment,
    error::{codes, SquadsError, SquadsResult},
    instructions::{
        instruction_discriminator, ConfigTransactionCreateArgs, MultisigCreateArgsV2,
        ProposalCreateArgs, VaultTransactionCreateArgs,
    },
    message::TransactionMessage,
    pda,
    referral::{
        accounts::{MemberStatistics, Profile, ReferralMember, Treasury},
        instructions::CreateMemberWithRewardsArgs,
        ReferralService, REFERRAL_PROGRAM_ID, TOKEN_PROGRAM_ID,
    },
    rpc::{AccountFilter, FeeSample, SignatureStatus, SolanaRpc},
    types::{ConfigAction, ProposalStatus},
    SquadsClient,
};

const NOT_A_MEMBER: u32 = 6005;
const UNAUTHORIZED: u32 = 6004;
const EMPTY_MEMBERS: u32 = 6001;
const INVALID_THRESHOLD: u32 = 6003;
const INVALID_TRANSACTION_MESSAGE: u32 = 6006;
const STALE_PROPOSAL: u32 = 6007;
const INVALID_TRANSACTION_INDEX: u32 = 6009;
const INVALID_NUMBER_OF_ACCOUNTS: u32 = 6013;
const NO_ACTIONS: u32 = 6022;
const ACCOUNT_NOT_INITIALIZED: u32 = 3012;

#[derive(Debug, Clone)]
pub struct StoredAccount {
    pub owner: Pubkey,
    pub data: Vec<u8>,
}

/// A transaction handed to `send_transaction`, successful or not
#[derive(Debug, Clone)]
pub struct SentTransaction {
    pub signature: Signature,
    pub max_retries: Option<usize>,
    /// Program id and data of every top-level instruction
    pub instructions: Vec<(Pubkey, Vec<u8>)>,
}

impl SentTransaction {
    pub fn program_ids(&self) -> Vec<Pubkey> {
        self.instructions.iter().map(|(program, _)| *program).collect()
    }

    /// Whether the transaction contains the named Anchor instruction
    pub fn calls(&self, name: &str) -> bool {
        let discriminator = instruction_discriminator(name);
        self.instructions
            .iter()
            .any(|(_, data)| data.len() >= 8 && data[..8] == discriminator)
    }
}

struct State {
    accounts: HashMap<Pubkey, StoredAccount>,
    fee_samples: Vec<FeeSample>,
    simulated_units: Option<u64>,
    simulations: usize,
    sent: Vec<SentTransaction>,
    status_script: VecDeque<SignatureStatus>,
    blockhash_valid: bool,
    blockhash_counter: u64,
    airdrops: Vec<(Pubkey, u64)>,
}

pub struct FakeCluster {
    state: Mutex<State>,
    calls: AtomicUsize,
    squads_program: Pubkey,
    referral_program: Pubkey,
}

impl FakeCluster {
    /// A cluster with the Squads program config in place
    pub fn new() -> Self {
        let cluster = Self {
            state: Mutex::new(State {
                accounts: HashMap::new(),
                fee_samples: Vec::new(),
                simulated_units: Some(50_000),
                simulations: 0,
                sent: Vec::new(),
                status_script: VecDeque::new(),
                blockhash_valid: true,
                blockhash_counter: 0,
                airdrops: Vec::new(),
            }),
            calls: AtomicUsize::new(0),
            squads_program: squad_treasury::program_id(),
            referral_program: REFERRAL_PROGRAM_ID,
        };

        let (program_config, _) = pda::get_program_config_pda(None);
        let config = ProgramConfig {
            authority: Pubkey::new_unique(),
            multisig_creation_fee: 0,
            treasury: Pubkey::new_unique(),
        };
        cluster.set_account(
            program_config,
            cluster.squads_program,
            config.to_account_data().unwrap(),
        );
        cluster
    }

    /// Number of remote calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_fee_samples(&self, samples: &[(u64, u64)]) {
        self.state.lock().unwrap().fee_samples = samples
            .iter()
            .map(|(slot, fee)| FeeSample {
                slot: *slot,
                fee: *fee,
            })
            .collect();
    }

    pub fn set_simulated_units(&self, units: Option<u64>) {
        self.state.lock().unwrap().simulated_units = units;
    }

    pub fn simulations(&self) -> usize {
        self.state.lock().unwrap().simulations
    }

    /// Statuses returned by the next status polls, `Confirmed` afterwards
    pub fn script_statuses(&self, statuses: Vec<SignatureStatus>) {
        self.state.lock().unwrap().status_script = statuses.into();
    }

    pub fn set_blockhash_valid(&self, valid: bool) {
        self.state.lock().unwrap().blockhash_valid = valid;
    }

    pub fn sent(&self) -> Vec<SentTransaction> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn last_sent(&self) -> SentTransaction {
        self.sent().pop().expect("no transaction sent")
    }

    pub fn airdrops(&self) -> Vec<(Pubkey, u64)> {
        self.state.lock().unwrap().airdrops.clone()
    }

    pub fn set_account(&self, address: Pubkey, owner: Pubkey, data: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .accounts
            .insert(address, StoredAccount { owner, data });
    }

    pub fn account<T: AnchorAccount>(&self, address: &Pubkey) -> Option<T> {
        let state = self.state.lock().unwrap();
        state
            .accounts
            .get(address)
            .map(|account| T::try_from_account_data(&account.data).unwrap())
    }

    pub fn multisig(&self, address: &Pubkey) -> Multisig {
        self.account(address).expect("multisig does not exist")
    }

    /// Store an SPL token account holding `amount`
    pub fn set_token_balance(&self, token_account: Pubkey, amount: u64) {
        let mut data = vec![0u8; 165];
        data[64..72].copy_from_slice(&amount.to_le_bytes());
        self.set_account(token_account, TOKEN_PROGRAM_ID, data);
    }

    fn process(
        &self,
        ledger: &mut HashMap<Pubkey, StoredAccount>,
        program: Pubkey,
        accounts: &[Pubkey],
        data: &[u8],
    ) -> SquadsResult<()> {
        if data.len() < 8 {
            return Ok(());
        }
        if program == self.squads_program {
            self.process_squads(ledger, accounts, data)
        } else if program == self.referral_program {
            self.process_referral(ledger, accounts, data)
        } else {
            Ok(())
        }
    }

    fn process_squads(
        &self,
        ledger: &mut HashMap<Pubkey, StoredAccount>,
        accounts: &[Pubkey],
        data: &[u8],
    ) -> SquadsResult<()> {
        let (discriminator, mut args) = data.split_at(8);
        let is = |name: &str| discriminator == &instruction_discriminator(name)[..];
        let program = self.squads_program;

        if is("multisig_create_v2") {
            let args = MultisigCreateArgsV2::deserialize(&mut args).unwrap();
            let (multisig, create_key) = (accounts[2], accounts[3]);
            let (expected, bump) = pda::get_multisig_pda(&create_key, Some(&program));
            if multisig != expected {
                return Err(SquadsError::program(codes::CONSTRAINT_SEEDS));
            }
            if ledger.contains_key(&multisig) {
                return Err(SquadsError::program(codes::ACCOUNT_ALREADY_IN_USE));
            }
            if args.members.is_empty() {
                return Err(SquadsError::program(EMPTY_MEMBERS));
            }
            let voters = args
                .members
                .iter()
                .filter(|m| m.permissions.has_vote())
                .count();
            if args.threshold == 0 || usize::from(args.threshold) > voters {
                return Err(SquadsError::program(INVALID_THRESHOLD));
            }

            let account = Multisig {
                create_key,
                config_authority: args.config_authority.unwrap_or_default(),
                threshold: args.threshold,
                time_lock: args.time_lock,
                transaction_index: 0,
                stale_transaction_index: 0,
                rent_collector: args.rent_collector,
                bump,
                members: args.members,
            };
            store(ledger, multisig, program, &account);
            return Ok(());
        }

        if is("vault_transaction_create") || is("config_transaction_create") {
            let multisig_key = accounts[0];
            let mut multisig: Multisig = load(ledger, &multisig_key)?;
            let creator = accounts[2];
            let member = multisig
                .member(&creator)
                .ok_or_else(|| SquadsError::program(NOT_A_MEMBER))?;
            if !member.permissions.has_initiate() {
                return Err(SquadsError::program(UNAUTHORIZED));
            }

            let index = multisig.transaction_index + 1;
            let (expected, bump) = pda::get_transaction_pda(&multisig_key, index, Some(&program));
            if accounts[1] != expected {
                return Err(SquadsError::program(codes::CONSTRAINT_SEEDS));
            }

            if is("vault_transaction_create") {
                let args = VaultTransactionCreateArgs::deserialize(&mut args).unwrap();
                let message = TransactionMessage::try_from_slice(&args.transaction_message)
                    .map_err(|_| SquadsError::program(INVALID_TRANSACTION_MESSAGE))?;
                let transaction = VaultTransaction {
                    multisig: multisig_key,
                    creator,
                    index,
                    bump,
                    vault_index: args.vault_index,
                    vault_bump: 0,
                    ephemeral_signer_bumps: vec![],
                    message: message.into(),
                };
                store(ledger, expected, program, &transaction);
            } else {
                let args = ConfigTransactionCreateArgs::deserialize(&mut args).unwrap();
                if args.actions.is_empty() {
                    return Err(SquadsError::program(NO_ACTIONS));
                }
                let transaction = ConfigTransaction {
                    multisig: multisig_key,
                    creator,
                    index,
                    bump,
                    actions: args.actions,
                };
                store(ledger, expected, program, &transaction);
            }

            multisig.transaction_index = index;
            store(ledger, multisig_key, program, &multisig);
            return Ok(());
        }

        if is("proposal_create") {
            let args = ProposalCreateArgs::deserialize(&mut args).unwrap();
            let multisig_key = accounts[0];
            let multisig: Multisig = load(ledger, &multisig_key)?;
            if !multisig.is_member(&accounts[2]) {
                return Err(SquadsError::program(NOT_A_MEMBER));
            }
            if args.transaction_index > multisig.transaction_index {
                return Err(SquadsError::program(INVALID_TRANSACTION_INDEX));
            }
            let (expected, bump) =
                pda::get_proposal_pda(&multisig_key, args.transaction_index, Some(&program));
            if accounts[1] != expected {
                return Err(SquadsError::program(codes::CONSTRAINT_SEEDS));
            }
            if ledger.contains_key(&expected) {
                return Err(SquadsError::program(codes::ACCOUNT_ALREADY_IN_USE));
            }

            let status = if args.draft {
                ProposalStatus::Draft { timestamp: 0 }
            } else {
                ProposalStatus::Active { timestamp: 0 }
            };
            let proposal = Proposal {
                multisig: multisig_key,
                transaction_index: args.transaction_index,
                status,
                bump,
                approved: vec![],
                rejected: vec![],
                cancelled: vec![],
            };
            store(ledger, expected, program, &proposal);
            return Ok(());
        }

        if is("proposal_approve") {
            let (multisig_key, member, proposal_key) = (accounts[0], accounts[1], accounts[2]);
            let multisig: Multisig = load(ledger, &multisig_key)?;
            let permissions = multisig
                .member(&member)
                .ok_or_else(|| SquadsError::program(NOT_A_MEMBER))?
                .permissions;
            if !permissions.has_vote() {
                return Err(SquadsError::program(UNAUTHORIZED));
            }

            let mut proposal: Proposal = load(ledger, &proposal_key)?;
            if proposal.transaction_index <= multisig.stale_transaction_index {
                return Err(SquadsError::program(STALE_PROPOSAL));
            }
            if !matches!(proposal.status, ProposalStatus::Active { .. }) {
                return Err(SquadsError::program(codes::INVALID_PROPOSAL_STATUS));
            }
            if proposal.has_approved(&member) {
                return Err(SquadsError::program(codes::ALREADY_APPROVED));
            }

            proposal.approved.push(member);
            if proposal.approvals() >= usize::from(multisig.threshold) {
                proposal.status = ProposalStatus::Approved { timestamp: 0 };
            }
            store(ledger, proposal_key, program, &proposal);
            return Ok(());
        }

        if is("vault_transaction_execute") {
            let (multisig_key, proposal_key, transaction_key, member) =
                (accounts[0], accounts[1], accounts[2], accounts[3]);
            let multisig: Multisig = load(ledger, &multisig_key)?;
            check_executor(&multisig, &member)?;

            let mut proposal: Proposal = load(ledger, &proposal_key)?;
            if !proposal.status.is_approved() {
                return Err(SquadsError::program(codes::INVALID_PROPOSAL_STATUS));
            }

            let transaction: VaultTransaction = load(ledger, &transaction_key)?;
            let message = &transaction.message;
            if accounts.len() - 4 != message.account_keys.len() {
                return Err(SquadsError::program(INVALID_NUMBER_OF_ACCOUNTS));
            }
            for ix in &message.instructions {
                let inner_program = message.account_keys[usize::from(ix.program_id_index)];
                let inner_accounts: Vec<Pubkey> = ix
                    .account_indexes
                    .iter()
                    .map(|index| message.account_keys[usize::from(*index)])
                    .collect();
                self.process(ledger, inner_program, &inner_accounts, &ix.data)?;
            }

            proposal.status = ProposalStatus::Executed { timestamp: 0 };
            store(ledger, proposal_key, program, &proposal);
            return Ok(());
        }

        if is("config_transaction_execute") {
            let (multisig_key, member, proposal_key, transaction_key) =
                (accounts[0], accounts[1], accounts[2], accounts[3]);
            let mut multisig: Multisig = load(ledger, &multisig_key)?;
            check_executor(&multisig, &member)?;

            let mut proposal: Proposal = load(ledger, &proposal_key)?;
            if !proposal.status.is_approved() {
                return Err(SquadsError::program(codes::INVALID_PROPOSAL_STATUS));
            }

            let transaction: ConfigTransaction = load(ledger, &transaction_key)?;
            for action in transaction.actions {
                match action {
                    ConfigAction::AddMember { new_member } => {
                        if multisig.is_member(&new_member.key) {
                            return Err(SquadsError::program(6000));
                        }
                        multisig.members.push(new_member);
                    }
                    ConfigAction::RemoveMember { old_member } => {
                        if !multisig.is_member(&old_member) {
                            return Err(SquadsError::program(NOT_A_MEMBER));
                        }
                        multisig.members.retain(|m| m.key != old_member);
                    }
                    ConfigAction::ChangeThreshold { new_threshold } => {
                        multisig.threshold = new_threshold;
                    }
                    ConfigAction::SetTimeLock { new_time_lock } => {
                        multisig.time_lock = new_time_lock;
                    }
                }
            }
            if multisig.threshold == 0 || usize::from(multisig.threshold) > multisig.num_voters() {
                return Err(SquadsError::program(INVALID_THRESHOLD));
            }

            multisig.stale_transaction_index = multisig.transaction_index;
            proposal.status = ProposalStatus::Executed { timestamp: 0 };
            store(ledger, multisig_key, program, &multisig);
            store(ledger, proposal_key, program, &proposal);
            return Ok(());
        }

        Ok(())
    }

    fn process_referral(
        &self,
        ledger: &mut HashMap<Pubkey, StoredAccount>,
        accounts: &[Pubkey],
        data: &[u8],
    ) -> SquadsResult<()> {
        let (discriminator, mut args) = data.split_at(8);
        let is = |name: &str| discriminator == &instruction_discriminator(name)[..];
        let program = self.referral_program;

        if is("create_member_with_rewards") {
            let args = CreateMemberWithRewardsArgs::deserialize(&mut args).unwrap();
            let (authority, organization, profile, member, treasury, mint) = (
                accounts[0],
                accounts[1],
                accounts[2],
                accounts[3],
                accounts[4],
                accounts[5],
            );
            if ledger.contains_key(&member) {
                return Err(SquadsError::program(codes::ACCOUNT_ALREADY_IN_USE));
            }

            if !ledger.contains_key(&profile) {
                let account = Profile {
                    authority,
                    bump: 0,
                    name: args.profile_name,
                };
                store(ledger, profile, program, &account);
            }
            let account = ReferralMember {
                organization,
                owner: authority,
                referrer_treasury: None,
                bump: 0,
                name: args.member_name,
            };
            store(ledger, member, program, &account);
            if !ledger.contains_key(&treasury) {
                let account = Treasury {
                    owner_profile: profile,
                    mint,
                    bump: 0,
                };
                store(ledger, treasury, program, &account);
            }
            return Ok(());
        }

        if is("create_member_statistics") {
            let (member, statistics) = (accounts[1], accounts[2]);
            let account = MemberStatistics {
                member,
                ..Default::default()
            };
            store(ledger, statistics, program, &account);
            return Ok(());
        }

        Ok(())
    }
}

fn check_executor(multisig: &Multisig, member: &Pubkey) -> SquadsResult<()> {
    let permissions = multisig
        .member(member)
        .ok_or_else(|| SquadsError::program(NOT_A_MEMBER))?
        .permissions;
    if !permissions.has_execute() {
        return Err(SquadsError::program(UNAUTHORIZED));
    }
    Ok(())
}

fn load<T: AnchorAccount>(
    ledger: &HashMap<Pubkey, StoredAccount>,
    address: &Pubkey,
) -> SquadsResult<T> {
    let account = ledger
        .get(address)
        .ok_or_else(|| SquadsError::program(ACCOUNT_NOT_INITIALIZED))?;
    T::try_from_account_data(&account.data)
}

fn store<T: AnchorAccount>(
    ledger: &mut HashMap<Pubkey, StoredAccount>,
    address: Pubkey,
    owner: Pubkey,
    value: &T,
) {
    ledger.insert(
        address,
        StoredAccount {
            owner,
            data: value.to_account_data().unwrap(),
        },
    );
}

#[async_trait]
impl SolanaRpc for FakeCluster {
    async fn get_account_data(&self, address: &Pubkey) -> SquadsResult<Option<Vec<u8>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        Ok(state.accounts.get(address).map(|account| account.data.clone()))
    }

    async fn get_program_accounts(
        &self,
        program: &Pubkey,
        filters: Vec<AccountFilter>,
    ) -> SquadsResult<Vec<(Pubkey, Vec<u8>)>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        Ok(state
            .accounts
            .iter()
            .filter(|(_, account)| account.owner == *program)
            .filter(|(_, account)| {
                filters.iter().all(|filter| {
                    account
                        .data
                        .get(filter.offset..filter.offset + filter.bytes.len())
                        .is_some_and(|bytes| bytes == filter.bytes.as_slice())
                })
            })
            .map(|(address, account)| (*address, account.data.clone()))
            .collect())
    }

    async fn get_latest_blockhash(&self) -> SquadsResult<(Hash, u64)> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        state.blockhash_counter += 1;
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&state.blockhash_counter.to_le_bytes());
        Ok((Hash::new_from_array(bytes), 1_000 + state.blockhash_counter))
    }

    async fn is_blockhash_valid(&self, _blockhash: &Hash) -> SquadsResult<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.lock().unwrap().blockhash_valid)
    }

    async fn get_recent_prioritization_fees(
        &self,
        _addresses: &[Pubkey],
    ) -> SquadsResult<Vec<FeeSample>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.lock().unwrap().fee_samples.clone())
    }

    async fn simulate_compute_units(
        &self,
        _transaction: &VersionedTransaction,
    ) -> SquadsResult<Option<u64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        state.simulations += 1;
        Ok(state.simulated_units)
    }

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
        max_retries: Option<usize>,
    ) -> SquadsResult<Signature> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let keys = transaction.message.static_account_keys();
        let signature = transaction.signatures[0];

        let mut state = self.state.lock().unwrap();
        state.sent.push(SentTransaction {
            signature,
            max_retries,
            instructions: transaction
                .message
                .instructions()
                .iter()
                .map(|ix| (keys[usize::from(ix.program_id_index)], ix.data.clone()))
                .collect(),
        });

        let mut ledger = state.accounts.clone();
        for ix in transaction.message.instructions() {
            let program = keys[usize::from(ix.program_id_index)];
            let accounts: Vec<Pubkey> = ix
                .accounts
                .iter()
                .map(|index| keys[usize::from(*index)])
                .collect();
            self.process(&mut ledger, program, &accounts, &ix.data)?;
        }
        state.accounts = ledger;
        Ok(signature)
    }

    async fn get_signature_status(&self, _signature: &Signature) -> SquadsResult<SignatureStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        Ok(state
            .status_script
            .pop_front()
            .unwrap_or(SignatureStatus::Confirmed))
    }

    async fn request_airdrop(&self, to: &Pubkey, lamports: u64) -> SquadsResult<Signature> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.state.lock().unwrap().airdrops.push((*to, lamports));
        Ok(Signature::default())
    }
}

/// Orchestrator and façade sharing one fake cluster
pub struct Harness {
    pub cluster: Arc<FakeCluster>,
    pub squads: SquadsClient<FakeCluster>,
    pub referral: ReferralService<FakeCluster>,
    pub creator: Keypair,
}

impl Harness {
    pub fn new() -> Self {
        let cluster = Arc::new(FakeCluster::new());
        let squads =
            SquadsClient::new(Arc::clone(&cluster)).with_poll_interval(Duration::from_millis(1));
        let referral = ReferralService::new(Arc::clone(&cluster), Environment::Production);
        Self {
            cluster,
            squads,
            referral,
            creator: Keypair::new(),
        }
    }

    /// A multisig with the creator and `others` new members
    pub async fn wallet(&self, others: usize, threshold: u16) -> (Pubkey, Vec<Keypair>) {
        let members: Vec<Keypair> = (0..others).map(|_| Keypair::new()).collect();
        let keys: Vec<Pubkey> = members.iter().map(|m| m.pubkey()).collect();
        let wallet = self
            .squads
            .create_wallet(&self.creator, &keys, threshold, None)
            .await
            .unwrap();
        (wallet.multisig, members)
    }

    pub fn transfer_from_vault(&self, multisig: &Pubkey, lamports: u64) -> Vec<solana_sdk::instruction::Instruction> {
        let vault = self.squads.vault_pda(multisig);
        vec![solana_system_interface::instruction::transfer(
            &vault,
            &self.creator.pubkey(),
            lamports,
        )]
    }
}
