//! Priority fee estimation and compute budget instructions

use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};

use crate::error::SquadsResult;
use crate::rpc::{FeeSample, SolanaRpc};

/// Priority fee used when no estimate is available, in micro-lamports per CU
pub const DEFAULT_PRIORITY_FEE: u64 = 100;

/// Compute unit ceiling of a single transaction
pub const MAX_COMPUTE_UNITS: u32 = 1_400_000;

/// Number of most recent non-zero samples the estimate is based on
pub const FEE_SAMPLE_WINDOW: usize = 3;

/// Reduce a fee history (oldest first) to a single fee
///
/// Zero fees are ignored and only the newest [`FEE_SAMPLE_WINDOW`] samples
/// count. With `use_max` the highest of them wins; otherwise each sample is
/// weighted by its rank (1 for the oldest) and the weighted sum is divided by
/// the factorial of the window size, rounding up.
///
/// Returns `None` when there is no positive sample.
pub fn weighted_priority_fee(fees: &[u64], use_max: bool) -> Option<u64> {
    let positive: Vec<u64> = fees.iter().copied().filter(|fee| *fee > 0).collect();
    if positive.is_empty() {
        return None;
    }

    let window = &positive[positive.len().saturating_sub(FEE_SAMPLE_WINDOW)..];
    if use_max {
        return window.iter().copied().max();
    }

    let weighted: u128 = window
        .iter()
        .enumerate()
        .map(|(rank, fee)| u128::from(*fee) * (rank as u128 + 1))
        .sum();
    let divisor: u128 = (1..=window.len() as u128).product();

    u64::try_from(weighted.div_ceil(divisor)).ok()
}

/// Estimate a priority fee from the fees recently paid for `program`
pub async fn estimate_priority_fee<R: SolanaRpc + ?Sized>(
    rpc: &R,
    program: &Pubkey,
    use_max: bool,
) -> SquadsResult<Option<u64>> {
    let mut samples: Vec<FeeSample> = rpc.get_recent_prioritization_fees(&[*program]).await?;
    samples.sort_by_key(|sample| sample.slot);

    let fees: Vec<u64> = samples.iter().map(|sample| sample.fee).collect();
    let estimate = weighted_priority_fee(&fees, use_max);
    tracing::debug!(
        program = %program,
        samples = samples.len(),
        estimate = ?estimate,
        "Estimated priority fee"
    );
    Ok(estimate)
}

pub fn set_compute_unit_limit(units: u32) -> Instruction {
    ComputeBudgetInstruction::set_compute_unit_limit(units)
}

pub fn set_compute_unit_price(micro_lamports: u64) -> Instruction {
    ComputeBudgetInstruction::set_compute_unit_price(micro_lamports)
}

/// Prepend compute budget instructions: `[limit?, price, ...instructions]`
pub fn with_compute_budget(
    instructions: &[Instruction],
    compute_limit: Option<u32>,
    priority_fee: u64,
) -> Vec<Instruction> {
    let mut all = Vec::with_capacity(instructions.len() + 2);
    if let Some(limit) = compute_limit {
        all.push(set_compute_unit_limit(limit));
    }
    all.push(set_compute_unit_price(priority_fee));
    all.extend_from_slice(instructions);
    all
}

/// Simulated units plus a 10% margin, capped at [`MAX_COMPUTE_UNITS`]
pub fn padded_compute_limit(units: u64) -> u32 {
    let padded = units.saturating_mul(11).div_ceil(10);
    u32::try_from(padded)
        .unwrap_or(MAX_COMPUTE_UNITS)
        .min(MAX_COMPUTE_UNITS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk_ids::compute_budget;

    #[test]
    fn test_weighted_fee() {
        // (10 + 40 + 90) / 3! = 23.33, rounded up
        assert_eq!(weighted_priority_fee(&[10, 20, 30], false), Some(24));
        assert_eq!(weighted_priority_fee(&[10, 20, 30], true), Some(30));
    }

    #[test]
    fn test_no_positive_samples() {
        assert_eq!(weighted_priority_fee(&[], false), None);
        assert_eq!(weighted_priority_fee(&[0, 0, 0], true), None);
    }

    #[test]
    fn test_window_keeps_newest_non_zero() {
        // 1000 is older than the window, zeros are skipped
        let fees = [1000, 10, 0, 20, 30, 0];
        assert_eq!(weighted_priority_fee(&fees, false), Some(24));
        assert_eq!(weighted_priority_fee(&fees, true), Some(30));
    }

    #[test]
    fn test_short_windows() {
        assert_eq!(weighted_priority_fee(&[7], false), Some(7));
        // (5 + 2 * 8) / 2! = 10.5
        assert_eq!(weighted_priority_fee(&[5, 8], false), Some(11));
    }

    #[test]
    fn test_compute_budget_order() {
        let transfer = solana_system_interface::instruction::transfer(
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            1,
        );

        let with_limit = with_compute_budget(&[transfer.clone()], Some(200_000), 50);
        assert_eq!(with_limit.len(), 3);
        assert_eq!(with_limit[0], set_compute_unit_limit(200_000));
        assert_eq!(with_limit[1], set_compute_unit_price(50));
        assert_eq!(with_limit[2], transfer);

        let without_limit = with_compute_budget(&[transfer], None, 50);
        assert_eq!(without_limit.len(), 2);
        assert_eq!(without_limit[0].program_id, compute_budget::ID);
    }

    #[test]
    fn test_padded_compute_limit() {
        assert_eq!(padded_compute_limit(100_000), 110_000);
        assert_eq!(padded_compute_limit(101), 112);
        assert_eq!(padded_compute_limit(1_300_000), MAX_COMPUTE_UNITS);
        assert_eq!(padded_compute_limit(u64::MAX), MAX_COMPUTE_UNITS);
    }
}
