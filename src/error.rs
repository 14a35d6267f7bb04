//! Error types for the treasury tooling
//!
//! Program failures returned by the network are translated into
//! [`SquadsError::Program`] using the Squads v4 error table, so callers see
//! `InvalidProposalStatus` instead of `custom program error: 0x1778`.

use solana_instruction_error::InstructionError;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use solana_transaction_error::TransactionError;
use thiserror::Error;

/// Result type for Squads operations
pub type SquadsResult<T> = Result<T, SquadsError>;

/// First custom error code of an Anchor program
const ANCHOR_ERROR_OFFSET: u32 = 6000;

/// Squads v4 `MultisigError` names, indexed from [`ANCHOR_ERROR_OFFSET`]
const SQUADS_ERRORS: &[&str] = &[
    "DuplicateMember",
    "EmptyMembers",
    "TooManyMembers",
    "InvalidThreshold",
    "Unauthorized",
    "NotAMember",
    "InvalidTransactionMessage",
    "StaleProposal",
    "InvalidProposalStatus",
    "InvalidTransactionIndex",
    "AlreadyApproved",
    "AlreadyRejected",
    "AlreadyCancelled",
    "InvalidNumberOfAccounts",
    "InvalidAccount",
    "RemoveLastMember",
    "NoVoters",
    "NoProposers",
    "NoExecutors",
    "InvalidStaleTransactionIndex",
    "NotSupportedForControlled",
    "TimeLockNotReleased",
    "NoActions",
    "MissingAccount",
    "InvalidMint",
    "InvalidDestination",
    "SpendingLimitExceeded",
    "DecimalsMismatch",
    "UnknownPermission",
    "ProtectedAccount",
    "TimeLockExceedsMaxAllowed",
    "IllegalAccountOwner",
    "RentReclamationDisabled",
    "InvalidRentCollector",
    "ProposalForAnotherMultisig",
    "TransactionForAnotherMultisig",
    "TransactionNotMatchingProposal",
    "TransactionNotLastInBatch",
    "BatchNotEmpty",
    "SpendingLimitInvalidAmount",
];

/// Program error codes this crate reacts to
pub mod codes {
    /// System program: the account being created already exists
    pub const ACCOUNT_ALREADY_IN_USE: u32 = 0;
    /// Anchor: a seeds constraint was violated
    pub const CONSTRAINT_SEEDS: u32 = 2006;
    /// Squads: the proposal is not in the status the instruction requires
    pub const INVALID_PROPOSAL_STATUS: u32 = 6008;
    /// Squads: the member already voted for this proposal
    pub const ALREADY_APPROVED: u32 = 6010;
}

/// Errors that can occur when driving the treasury flows
#[derive(Debug, Error)]
pub enum SquadsError {
    /// Error from the Solana client
    #[error("Solana client error: {0}")]
    ClientError(#[from] solana_client::client_error::ClientError),

    /// A submitted transaction was rejected by an on-chain program
    #[error("Program error {code} ({name})")]
    Program { code: u32, name: String },

    /// Failed to deserialize account data
    #[error("Failed to deserialize account data")]
    DeserializationError,

    /// Failed to serialize data
    #[error("Failed to serialize data: {0}")]
    SerializationError(std::io::Error),

    /// Instructions could not be compiled into a message
    #[error("Failed to compile transaction message: {0}")]
    Compile(#[from] solana_sdk::message::CompileError),

    /// Signing a transaction failed
    #[error("Failed to sign transaction: {0}")]
    Signing(#[from] solana_sdk::signer::SignerError),

    /// The stored vault transaction uses address lookup tables
    #[error("Vault transactions with address lookup tables are not supported")]
    UnsupportedLookupTables,

    /// Account not found
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Invalid account data
    #[error("Invalid account data: {0}")]
    InvalidAccountData(String),

    /// Invalid threshold
    #[error("Invalid threshold: must be between 1 and number of voting members")]
    InvalidThreshold,

    /// No voting members
    #[error("At least one member must have voting permissions")]
    NoVotingMembers,

    /// A configuration proposal without any action
    #[error("A configuration proposal needs at least one action")]
    NoConfigActions,

    /// A wallet was already created with this create key
    #[error("Account already exists: {0}")]
    AccountAlreadyExists(Pubkey),

    /// A referral name cannot be used as an address seed
    #[error("Invalid name \"{0}\": at most 32 bytes are allowed")]
    InvalidName(String),

    /// The referral member name is registered already
    #[error("Member name \"{0}\" is not available")]
    NameUnavailable(String),

    /// Execution was attempted before the proposal reached its threshold
    #[error("Proposal {0} does not have enough approvals to be executed")]
    InsufficientApprovals(u64),

    /// The transaction index was consumed by someone else in the meantime
    #[error("Transaction index {0} is stale")]
    StaleIndex(u64),

    /// The blockhash expired before the signature was confirmed
    #[error("Transaction {0} was not confirmed before its blockhash expired")]
    ConfirmationTimeout(Signature),

    /// The transaction landed but failed
    #[error("Transaction {signature} failed: {reason}")]
    TransactionFailed { signature: Signature, reason: String },

    /// No claim instructions could be built for a reward
    #[error("Failed to create claim proposal for {0}")]
    ClaimUnavailable(String),

    /// Invalid or incomplete configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Reading or writing the settings record failed
    #[error("Settings error: {0}")]
    Settings(String),
}

impl From<std::io::Error> for SquadsError {
    fn from(err: std::io::Error) -> Self {
        SquadsError::SerializationError(err)
    }
}

impl SquadsError {
    /// Build a [`SquadsError::Program`] from a raw custom error code
    pub fn program(code: u32) -> Self {
        SquadsError::Program {
            code,
            name: program_error_name(code).to_string(),
        }
    }

    /// Custom program error code, when this is a program failure
    pub fn program_code(&self) -> Option<u32> {
        match self {
            SquadsError::Program { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Reinterpret a failure of an execute instruction
    pub fn at_execution(self, transaction_index: u64) -> Self {
        match self.program_code() {
            Some(codes::INVALID_PROPOSAL_STATUS) => {
                SquadsError::InsufficientApprovals(transaction_index)
            }
            _ => self,
        }
    }

    /// Reinterpret a failure of a transaction/proposal creation instruction
    pub fn at_creation(self, transaction_index: u64) -> Self {
        match self.program_code() {
            Some(codes::CONSTRAINT_SEEDS) | Some(codes::ACCOUNT_ALREADY_IN_USE) => {
                SquadsError::StaleIndex(transaction_index)
            }
            _ => self,
        }
    }
}

/// Human readable name for a custom program error code
pub fn program_error_name(code: u32) -> &'static str {
    match code {
        codes::ACCOUNT_ALREADY_IN_USE => "AccountAlreadyInUse",
        codes::CONSTRAINT_SEEDS => "ConstraintSeeds",
        c if c >= ANCHOR_ERROR_OFFSET => SQUADS_ERRORS
            .get((c - ANCHOR_ERROR_OFFSET) as usize)
            .copied()
            .unwrap_or("Unknown"),
        _ => "Unknown",
    }
}

/// Translate a client error into a program error when the node reports one
pub fn translate_client_error(err: solana_client::client_error::ClientError) -> SquadsError {
    match err.get_transaction_error() {
        Some(TransactionError::InstructionError(_, InstructionError::Custom(code))) => {
            SquadsError::program(code)
        }
        _ => SquadsError::ClientError(err),
    }
}
