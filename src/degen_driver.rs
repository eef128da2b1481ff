// degen_driver.rs — degen claim sub-state machine
//
// A settled round whose winner opted into the degen payout carries a
// DegenClaim account: VrfRequested -> VrfReady -> Executing ->
// {ClaimedSwapped | ClaimedFallback}. The crank only acts on two edges:
// starting execution when it is the configured executor, and the
// permissionless USDC fallback once the claim times out. Everything else
// is oracle- or executor-driven and the crank just observes.

use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;

use crate::error::CrankError;
use crate::jackpot_instructions::BeginDegenArgs;
use crate::jackpot_layout::{DegenClaimAccount, DegenClaimStatus, DegenConfigAccount};

/// The crank always proposes the top-ranked candidate.
pub const DEGEN_CANDIDATE_RANK: u8 = 0;

/// What the sub-driver wants to do with an observed claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegenAction {
    /// Oracle or executor still has the ball.
    Wait,
    /// Submit `begin_degen_execution` with these args.
    Execute { args: BeginDegenArgs, token_mint: Pubkey },
    /// Submit `auto_claim_degen_fallback` with this reason.
    Fallback { reason: u8 },
    /// Terminal; nothing left to drive.
    Done,
}

/// Candidate token indices for the claim's randomness. Must match the
/// on-chain derivation bit-for-bit: sha256(randomness || pool_version_le ||
/// rank_le || nonce_le), first 4 bytes as LE u32, mod pool_len, bumping the
/// nonce until the rank lands on an index no earlier rank took.
pub fn derive_candidate_indices(
    randomness: &[u8; 32],
    pool_version: u32,
    pool_len: usize,
    count: usize,
) -> Vec<usize> {
    let mut selected = Vec::with_capacity(count);

    for rank in 0..count {
        let mut nonce: u32 = 0;

        loop {
            let mut hasher = Sha256::new();
            hasher.update(randomness);
            hasher.update(pool_version.to_le_bytes());
            hasher.update((rank as u32).to_le_bytes());
            hasher.update(nonce.to_le_bytes());
            let digest = hasher.finalize();

            let raw = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]);
            let index = (raw as usize) % pool_len;

            if !selected.contains(&index) {
                selected.push(index);
                break;
            }

            nonce = nonce.saturating_add(1);
        }
    }

    selected
}

pub fn derive_candidate_index_at_rank(
    randomness: &[u8; 32],
    pool_version: u32,
    pool_len: usize,
    rank: usize,
) -> usize {
    derive_candidate_indices(randomness, pool_version, pool_len, rank + 1)[rank]
}

/// Commitment the crank records alongside its chosen route.
pub fn route_hash(randomness: &[u8; 32], token_index: u32, min_out_raw: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(randomness);
    hasher.update(token_index.to_le_bytes());
    hasher.update(min_out_raw.to_le_bytes());
    hasher.finalize().into()
}

/// Timeout eligibility, exact at the boundary. Uses the claim's own
/// `fallback_after_ts` when the program recorded one, otherwise
/// `fulfilled_at + timeout`. `now` must come from the on-chain clock.
pub fn fallback_eligible(claim: &DegenClaimAccount, fallback_timeout_sec: u32, now: i64) -> bool {
    let deadline = if claim.fallback_after_ts != 0 {
        claim.fallback_after_ts
    } else {
        claim.fulfilled_at.saturating_add(fallback_timeout_sec as i64)
    };
    now >= deadline
}

/// Validate local preconditions and derive the rank-0 route for
/// `begin_degen_execution`. Refuses before any submission when the crank
/// wallet is not the configured executor, or when the configured pool does
/// not line up with what the claim was derived against.
pub fn prepare_execution(
    claim: &DegenClaimAccount,
    degen_config: &DegenConfigAccount,
    pool: &[Pubkey],
    pool_version: u32,
    crank_wallet: &Pubkey,
) -> Result<(BeginDegenArgs, Pubkey), CrankError> {
    if degen_config.executor != *crank_wallet {
        return Err(CrankError::Unauthorized(0));
    }
    if pool.is_empty() {
        return Err(CrankError::DerivationMismatch(
            "degen token pool is empty".to_string(),
        ));
    }
    if claim.pool_version != pool_version {
        return Err(CrankError::DerivationMismatch(format!(
            "claim pool_version {} != configured {}",
            claim.pool_version, pool_version
        )));
    }
    if claim.candidate_window == 0 {
        return Err(CrankError::DerivationMismatch(
            "claim has zero candidate window".to_string(),
        ));
    }
    if !claim.randomness_fulfilled() {
        return Err(CrankError::DerivationMismatch(
            "claim randomness not fulfilled".to_string(),
        ));
    }

    let index = derive_candidate_index_at_rank(
        &claim.randomness,
        pool_version,
        pool.len(),
        DEGEN_CANDIDATE_RANK as usize,
    );
    let token_index = index as u32;
    // Slippage floor for the swap leg is quoted by the executor service;
    // the crank commits to the route only.
    let min_out_raw = 0u64;

    let args = BeginDegenArgs {
        candidate_rank: DEGEN_CANDIDATE_RANK,
        token_index,
        min_out_raw,
        route_hash: route_hash(&claim.randomness, token_index, min_out_raw),
    };
    Ok((args, pool[index]))
}

/// Pure classification for one observed claim.
pub fn classify_claim(
    claim: &DegenClaimAccount,
    degen_config: Option<&DegenConfigAccount>,
    pool: &[Pubkey],
    pool_version: u32,
    crank_wallet: &Pubkey,
    now: i64,
) -> DegenAction {
    if claim.status.is_terminal() {
        return DegenAction::Done;
    }

    let timeout = degen_config
        .map(|c| c.fallback_timeout_sec)
        .unwrap_or(crate::jackpot_layout::DEFAULT_DEGEN_FALLBACK_TIMEOUT_SEC);

    match claim.status {
        DegenClaimStatus::VrfRequested => DegenAction::Wait,
        DegenClaimStatus::VrfReady | DegenClaimStatus::Executing => {
            if fallback_eligible(claim, timeout, now) {
                return DegenAction::Fallback {
                    reason: crate::jackpot_layout::FALLBACK_REASON_TIMEOUT,
                };
            }
            if claim.status == DegenClaimStatus::Executing {
                return DegenAction::Wait;
            }
            match degen_config {
                Some(cfg) => {
                    match prepare_execution(claim, cfg, pool, pool_version, crank_wallet) {
                        Ok((args, token_mint)) => DegenAction::Execute { args, token_mint },
                        // Not our edge to drive (another executor, stale pool
                        // config); wait for the executor or the timeout.
                        Err(_) => DegenAction::Wait,
                    }
                }
                None => DegenAction::Wait,
            }
        }
        DegenClaimStatus::ClaimedSwapped | DegenClaimStatus::ClaimedFallback => DegenAction::Done,
    }
}
