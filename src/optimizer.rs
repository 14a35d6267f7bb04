//! Fee-optimized transaction assembly
//!
//! The priority fee estimate, a compute unit simulation and a fresh blockhash
//! are fetched concurrently, then the caller's instructions are compiled with
//! compute budget instructions in front of them.

use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::{v0, AddressLookupTableAccount, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::VersionedTransaction,
};

use crate::compute::{
    estimate_priority_fee, padded_compute_limit, set_compute_unit_limit, with_compute_budget,
    DEFAULT_PRIORITY_FEE, MAX_COMPUTE_UNITS,
};
use crate::error::SquadsResult;
use crate::rpc::SolanaRpc;

/// Inputs of [`build_optimized_transaction`]
#[derive(Debug, Clone, Copy)]
pub struct OptimizeParams<'a> {
    pub instructions: &'a [Instruction],
    /// Fee payer and first signer
    pub payer: Pubkey,
    /// Program whose recent fees drive the estimate, default fee when `None`
    pub fee_program: Option<Pubkey>,
    pub lookup_tables: &'a [AddressLookupTableAccount],
}

impl<'a> OptimizeParams<'a> {
    pub fn new(instructions: &'a [Instruction], payer: Pubkey) -> Self {
        Self {
            instructions,
            payer,
            fee_program: None,
            lookup_tables: &[],
        }
    }

    pub fn with_fee_program(mut self, program: Pubkey) -> Self {
        self.fee_program = Some(program);
        self
    }
}

/// An unsigned transaction message ready to be signed and sent
#[derive(Debug, Clone)]
pub struct OptimizedTransaction {
    pub message: VersionedMessage,
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
    pub priority_fee: u64,
    pub compute_unit_limit: Option<u32>,
}

impl OptimizedTransaction {
    pub fn sign(self, signers: &[&Keypair]) -> SquadsResult<VersionedTransaction> {
        Ok(VersionedTransaction::try_new(self.message, signers)?)
    }
}

/// Wrap a message into a transaction with placeholder signatures
pub fn unsigned_transaction(message: VersionedMessage) -> VersionedTransaction {
    let num_signatures = usize::from(message.header().num_required_signatures);
    VersionedTransaction {
        signatures: vec![Signature::default(); num_signatures],
        message,
    }
}

/// Build a transaction with a tuned compute limit and priority fee
///
/// A failed simulation leaves the compute limit unset; the real failure then
/// surfaces when the transaction is submitted. A failed blockhash fetch is an
/// error.
pub async fn build_optimized_transaction<R: SolanaRpc + ?Sized>(
    rpc: &R,
    params: OptimizeParams<'_>,
) -> SquadsResult<OptimizedTransaction> {
    let fee = async {
        let Some(program) = params.fee_program else {
            return DEFAULT_PRIORITY_FEE;
        };
        match estimate_priority_fee(rpc, &program, true).await {
            Ok(Some(fee)) => fee,
            Ok(None) => DEFAULT_PRIORITY_FEE,
            Err(err) => {
                tracing::warn!(error = %err, "Priority fee estimate failed, using default");
                DEFAULT_PRIORITY_FEE
            }
        }
    };
    let units = simulate_units(rpc, &params);
    let blockhash = rpc.get_latest_blockhash();

    let (priority_fee, units, blockhash) = tokio::join!(fee, units, blockhash);
    let (blockhash, last_valid_block_height) = blockhash?;

    let compute_unit_limit = units.map(padded_compute_limit);
    tracing::info!(priority_fee, "Using priority fee");
    if let Some(limit) = compute_unit_limit {
        tracing::info!(limit, "Using CU limit");
    }

    let instructions = with_compute_budget(params.instructions, compute_unit_limit, priority_fee);
    let message = v0::Message::try_compile(
        &params.payer,
        &instructions,
        params.lookup_tables,
        blockhash,
    )?;

    Ok(OptimizedTransaction {
        message: VersionedMessage::V0(message),
        blockhash,
        last_valid_block_height,
        priority_fee,
        compute_unit_limit,
    })
}

async fn simulate_units<R: SolanaRpc + ?Sized>(
    rpc: &R,
    params: &OptimizeParams<'_>,
) -> Option<u64> {
    let mut instructions = vec![set_compute_unit_limit(MAX_COMPUTE_UNITS)];
    instructions.extend_from_slice(params.instructions);

    let message = match v0::Message::try_compile(
        &params.payer,
        &instructions,
        params.lookup_tables,
        Hash::default(),
    ) {
        Ok(message) => message,
        Err(err) => {
            tracing::warn!(error = %err, "Could not compile simulation message");
            return None;
        }
    };

    let transaction = unsigned_transaction(VersionedMessage::V0(message));
    match rpc.simulate_compute_units(&transaction).await {
        Ok(units) => units,
        Err(err) => {
            tracing::warn!(error = %err, "Simulation failed, leaving compute limit unset");
            None
        }
    }
}
