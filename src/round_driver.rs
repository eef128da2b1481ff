// round_driver.rs — round lifecycle driver for the jackpot crank
//
// Polls the program's rounds and pushes each one along
// Open -> Locked -> VrfRequested -> Settled -> Claimed (or -> Cancelled),
// submitting only the transitions the program will accept. Everything is
// resumable: state lives on-chain, the crank re-reads it every cycle, and
// a rejected submission whose precondition was already satisfied counts as
// success. Running two cranks side by side is safe for the same reason.

use anyhow::Result;
use arc_swap::ArcSwap;
use futures_util::future::join_all;
use sha2::{Digest, Sha256};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::CrankConfig;
use crate::degen_driver::{self, DegenAction};
use crate::error::CrankError;
use crate::jackpot_instructions as ix;
use crate::jackpot_layout::{ConfigAccount, DegenConfigAccount, RoundAccount, RoundStatus};
use crate::jackpot_rpc::JackpotRpc;
use crate::social_notify::{NotifyHandle, SettlementEvent};

// Custom program error codes (Anchor, declaration order from 6000).
pub const ERR_ROUND_NOT_OPEN: u32 = 6003;
pub const ERR_ROUND_NOT_LOCKED: u32 = 6004;
pub const ERR_ROUND_ALREADY_CLAIMED: u32 = 6007;
pub const ERR_UNAUTHORIZED: u32 = 6021;
pub const ERR_ROUND_NOT_CANCELLABLE: u32 = 6022;
pub const ERR_DEGEN_ALREADY_REQUESTED: u32 = 6037;
pub const ERR_DEGEN_ALREADY_CLAIMED: u32 = 6038;
pub const ERR_UNAUTHORIZED_DEGEN_EXECUTOR: u32 = 6041;
pub const ERR_INVALID_DEGEN_EXECUTION_STATE: u32 = 6042;
pub const ERR_DEGEN_FALLBACK_TOO_EARLY: u32 = 6047;

/// The transition a submission is trying to make. Determines which on-chain
/// rejection codes mean "someone else already did it".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Lock,
    RequestVrf,
    MockSettle,
    AutoClaim,
    ForceCancel,
    DegenExecute,
    DegenFallback,
}

/// What to do with one observed round this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    Wait,
    Lock,
    RequestVrf,
    MockSettle,
    AutoClaim,
    ForceCancel,
    Degen,
    Finished,
}

/// Deployment-mode switches that change classification.
#[derive(Debug, Clone, Copy)]
pub struct DriveFlags {
    pub mock_settle: bool,
    pub auto_claim: bool,
}

fn minimums_met(round: &RoundAccount, cfg: &ConfigAccount) -> bool {
    round.participants_count >= cfg.min_participants
        && round.total_tickets >= cfg.min_total_tickets
}

/// Pure classification: `(round, config, now) -> NextAction`. `now` is
/// on-chain time; `end_ts` comparison is inclusive, matching the program.
pub fn classify_round(
    round: &RoundAccount,
    cfg: &ConfigAccount,
    now: i64,
    flags: &DriveFlags,
) -> NextAction {
    match round.status {
        RoundStatus::Open => {
            // A round nobody deposited into cannot be locked or cancelled;
            // the program rejects both until the first deposit arrives.
            if round.first_deposit_ts == 0 {
                return NextAction::Wait;
            }
            if now < round.end_ts {
                return NextAction::Wait;
            }
            if minimums_met(round, cfg) {
                NextAction::Lock
            } else {
                NextAction::ForceCancel
            }
        }
        RoundStatus::Locked => {
            if flags.mock_settle {
                NextAction::MockSettle
            } else if round.has_vrf_payer() {
                // Request already in flight; wait for the oracle callback.
                NextAction::Wait
            } else {
                NextAction::RequestVrf
            }
        }
        // The oracle callback flips the round to Settled; nothing to submit.
        RoundStatus::VrfRequested => NextAction::Wait,
        RoundStatus::Settled => {
            if round.is_degen() {
                NextAction::Degen
            } else if flags.auto_claim {
                NextAction::AutoClaim
            } else {
                NextAction::Wait
            }
        }
        RoundStatus::Claimed | RoundStatus::Cancelled => NextAction::Finished,
    }
}

/// Map an on-chain rejection code onto the attempted transition.
pub fn classify_rejection(transition: Transition, code: u32) -> CrankError {
    let already_satisfied = match transition {
        Transition::Lock => code == ERR_ROUND_NOT_OPEN,
        Transition::RequestVrf | Transition::MockSettle => code == ERR_ROUND_NOT_LOCKED,
        Transition::AutoClaim => code == ERR_ROUND_ALREADY_CLAIMED,
        Transition::ForceCancel => {
            code == ERR_ROUND_NOT_OPEN || code == ERR_ROUND_NOT_CANCELLABLE
        }
        Transition::DegenExecute => {
            code == ERR_DEGEN_ALREADY_REQUESTED
                || code == ERR_DEGEN_ALREADY_CLAIMED
                || code == ERR_INVALID_DEGEN_EXECUTION_STATE
        }
        Transition::DegenFallback => {
            code == ERR_DEGEN_ALREADY_CLAIMED || code == ERR_INVALID_DEGEN_EXECUTION_STATE
        }
    };
    if already_satisfied {
        CrankError::AlreadySatisfied(code)
    } else if code == ERR_UNAUTHORIZED || code == ERR_UNAUTHORIZED_DEGEN_EXECUTOR {
        CrankError::Unauthorized(code)
    } else {
        // Includes DegenFallbackTooEarly: losing the timeout-boundary race
        // is a normal outcome, retried next cycle.
        CrankError::OnChainRejection(code)
    }
}

/// Randomness for the devnet mock-settle path. Deterministic per
/// (round, observation time, wallet) so a retried submission re-signs the
/// same bytes.
pub fn mock_randomness(round_id: u64, now: i64, wallet: &Pubkey) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(round_id.to_le_bytes());
    hasher.update(now.to_le_bytes());
    hasher.update(wallet.as_ref());
    hasher.finalize().into()
}

/// Load a keypair from a base58-encoded private key
pub fn load_wallet(private_key: &str) -> Result<Keypair> {
    let decoded = bs58::decode(private_key)
        .into_vec()
        .map_err(|e| anyhow::anyhow!("Failed to decode private key: {}", e))?;

    Keypair::try_from(&decoded[..]).map_err(|e| anyhow::anyhow!("Failed to load keypair: {}", e))
}

/// Refreshed once per cycle, shared read-only across round tasks.
pub struct ChainSnapshot {
    pub config: ConfigAccount,
    pub degen_config: Option<DegenConfigAccount>,
}

/// Everything a per-round task needs; cheap to clone behind an Arc.
struct Ctx {
    rpc: Arc<JackpotRpc>,
    wallet: Arc<Keypair>,
    program_id: Pubkey,
    vrf_program_id: Option<Pubkey>,
    oracle_queue: Option<Pubkey>,
    pool: Vec<Pubkey>,
    pool_version: u32,
    flags: DriveFlags,
    snapshot: Arc<ArcSwap<ChainSnapshot>>,
    max_retries: u32,
    confirm_deadline: Duration,
    confirm_poll: Duration,
}

/// Per-round bookkeeping kept across cycles.
#[derive(Debug, Default)]
struct RoundBook {
    strikes: u32,
    parked: bool,
    notified: bool,
}

/// What one round task reports back to the driver loop.
struct DriveOutcome {
    round_id: u64,
    terminal: bool,
    settlement: Option<SettlementEvent>,
    error: Option<CrankError>,
}

pub struct RoundDriver {
    cfg: CrankConfig,
    ctx: Arc<Ctx>,
    notifier: NotifyHandle,
    books: HashMap<u64, RoundBook>,
    next_probe: u64,
}

impl RoundDriver {
    pub async fn new(cfg: CrankConfig, notifier: NotifyHandle) -> Result<Self> {
        let program_id: Pubkey = cfg.program_id.parse()?;
        let vrf_program_id = cfg.vrf_program_id.parse().ok();
        let oracle_queue = cfg.oracle_queue.parse().ok();
        let wallet = Arc::new(load_wallet(&cfg.wallet_private_key)?);
        let pool = cfg
            .degen_token_pool
            .iter()
            .map(|m| m.parse())
            .collect::<std::result::Result<Vec<Pubkey>, _>>()?;

        let rpc = Arc::new(JackpotRpc::new(
            cfg.rpc_url.clone(),
            Duration::from_millis(cfg.request_timeout_ms),
        ));

        let chain_config = rpc
            .fetch_config(&program_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("program config account not found; wrong program id or uninitialized deployment"))?;
        let degen_config = rpc.fetch_degen_config(&program_id).await?;

        info!("🔑 Crank wallet: {}", wallet.pubkey());
        info!("🎰 Program: {} (admin {})", program_id, chain_config.admin);
        if let Some(dc) = &degen_config {
            info!(
                "🎲 Degen executor: {} (fallback timeout {}s)",
                dc.executor, dc.fallback_timeout_sec
            );
        }

        let snapshot = Arc::new(ArcSwap::from_pointee(ChainSnapshot {
            config: chain_config,
            degen_config,
        }));

        let ctx = Arc::new(Ctx {
            rpc,
            wallet,
            program_id,
            vrf_program_id,
            oracle_queue,
            pool,
            pool_version: cfg.degen_pool_version,
            flags: DriveFlags {
                mock_settle: cfg.mock_settle,
                auto_claim: cfg.auto_claim,
            },
            snapshot,
            max_retries: cfg.max_retries,
            confirm_deadline: Duration::from_millis(cfg.confirm_timeout_ms),
            confirm_poll: Duration::from_millis(cfg.confirm_poll_ms),
        });

        let next_probe = cfg.starting_round_id;
        Ok(Self {
            cfg,
            ctx,
            notifier,
            books: HashMap::new(),
            next_probe,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        info!("🚀 Crank running, polling every {}ms", self.cfg.poll_interval_ms);
        let interval = Duration::from_millis(self.cfg.poll_interval_ms);
        loop {
            if let Err(e) = self.cycle().await {
                warn!("cycle failed: {}", e);
            }
            tokio::time::sleep(interval).await;
        }
    }

    async fn cycle(&mut self) -> Result<()> {
        self.refresh_snapshot().await;
        self.discover_rounds().await?;

        let now = self.ctx.rpc.chain_unix_timestamp().await?;

        let mut handles = Vec::new();
        for (&round_id, book) in &self.books {
            if book.parked {
                continue;
            }
            let ctx = Arc::clone(&self.ctx);
            handles.push(tokio::spawn(drive_round(ctx, round_id, now)));
        }

        for joined in join_all(handles).await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("round task panicked: {}", e);
                    continue;
                }
            };
            self.absorb(outcome);
        }
        Ok(())
    }

    fn absorb(&mut self, outcome: DriveOutcome) {
        let max_strikes = self.cfg.max_strikes;
        let round_id = outcome.round_id;
        let Some(book) = self.books.get_mut(&round_id) else {
            return;
        };
        if absorb_outcome(book, outcome, &self.notifier, max_strikes) {
            debug!("round {}: terminal, dropping from live set", round_id);
            self.books.remove(&round_id);
        }
    }

    /// Keep the shared Config/DegenConfig snapshot current; on transport
    /// failure the previous snapshot stays in place.
    async fn refresh_snapshot(&self) {
        match self.ctx.rpc.fetch_config(&self.ctx.program_id).await {
            Ok(Some(config)) => {
                let degen_config = match self.ctx.rpc.fetch_degen_config(&self.ctx.program_id).await
                {
                    Ok(dc) => dc,
                    Err(e) => {
                        debug!("degen config refresh failed: {}", e);
                        self.ctx.snapshot.load().degen_config.clone()
                    }
                };
                self.ctx
                    .snapshot
                    .store(Arc::new(ChainSnapshot { config, degen_config }));
            }
            Ok(None) => warn!("program config account disappeared"),
            Err(e) => debug!("config refresh failed, keeping previous snapshot: {}", e),
        }
    }

    /// Probe round PDAs forward from the last known id. Rounds are created
    /// sequentially on-chain but terminal rounds get closed, so a missing
    /// account is not necessarily the frontier: the scan keeps probing
    /// through up to `discovery_gap_limit` consecutive gaps before stopping,
    /// which lets a restarted crank walk past closed history to the live
    /// rounds without operator help.
    async fn discover_rounds(&mut self) -> Result<()> {
        let mut scan = FrontierScan::new(self.next_probe, self.cfg.discovery_gap_limit);
        while let Some(round_id) = scan.next_probe() {
            match self
                .ctx
                .rpc
                .fetch_round(&self.ctx.program_id, round_id)
                .await?
            {
                Some(round) => {
                    scan.found();
                    if !round.status.is_terminal() {
                        info!(
                            "📋 Discovered round {} (status {:?})",
                            round_id, round.status
                        );
                        self.books.entry(round_id).or_default();
                    }
                }
                None => scan.missing(),
            }
        }
        self.next_probe = scan.frontier();
        Ok(())
    }
}

/// Frontier scan over sequential round ids, tolerant of gaps left by
/// closed-out rounds. A hit resets the gap run and moves the frontier past
/// that id; a miss burns one unit of the gap budget. Scanning stops once
/// consecutive misses exceed the budget. The frontier only advances past
/// ids that held an account, so closed gaps behind a live round are never
/// re-probed on later cycles.
#[derive(Debug)]
pub struct FrontierScan {
    next: u64,
    frontier: u64,
    gap_budget: u32,
    gaps: u32,
}

impl FrontierScan {
    pub fn new(frontier: u64, gap_budget: u32) -> Self {
        Self {
            next: frontier,
            frontier,
            gap_budget,
            gaps: 0,
        }
    }

    /// Next id to probe; `None` once the gap budget is spent.
    pub fn next_probe(&self) -> Option<u64> {
        if self.gaps > self.gap_budget {
            None
        } else {
            Some(self.next)
        }
    }

    pub fn found(&mut self) {
        self.gaps = 0;
        self.next += 1;
        self.frontier = self.next;
    }

    pub fn missing(&mut self) {
        self.gaps += 1;
        self.next += 1;
    }

    /// Where the next cycle's scan starts.
    pub fn frontier(&self) -> u64 {
        self.frontier
    }
}

/// Fold one task outcome into the round's bookkeeping. Returns true when the
/// round is terminal and should leave the live set. The `notified` flag makes
/// settlement publication exactly-once per round for this process lifetime;
/// re-delivery after a restart is absorbed by the sink's idempotency keys.
fn absorb_outcome(
    book: &mut RoundBook,
    outcome: DriveOutcome,
    notifier: &NotifyHandle,
    max_strikes: u32,
) -> bool {
    if let Some(event) = outcome.settlement {
        if !book.notified {
            book.notified = true;
            notifier.publish(event);
        }
    }

    match outcome.error {
        None => book.strikes = 0,
        Some(CrankError::AlreadySatisfied(code)) => {
            debug!(
                "round {}: transition already satisfied (code {})",
                outcome.round_id, code
            );
            book.strikes = 0;
        }
        Some(CrankError::Unauthorized(code)) => {
            error!(
                "round {}: unauthorized (code {}), parking",
                outcome.round_id, code
            );
            book.parked = true;
        }
        Some(err) => {
            book.strikes += 1;
            warn!(
                "round {}: {} (strike {}/{})",
                outcome.round_id, err, book.strikes, max_strikes
            );
            if book.strikes >= max_strikes {
                error!("round {}: too many failures, parking", outcome.round_id);
                book.parked = true;
            }
        }
    }

    outcome.terminal
}

/// Drive one round through at most one transition this cycle. The fetch at
/// the top doubles as the pre-submission re-read: classification and the
/// instruction build both work from this cycle's state, never a stale one.
async fn drive_round(ctx: Arc<Ctx>, round_id: u64, now: i64) -> DriveOutcome {
    let mut outcome = DriveOutcome {
        round_id,
        terminal: false,
        settlement: None,
        error: None,
    };

    let round = match ctx.rpc.fetch_round(&ctx.program_id, round_id).await {
        Ok(Some(round)) => round,
        Ok(None) => {
            // Account closed out; nothing left to drive.
            outcome.terminal = true;
            return outcome;
        }
        Err(e) => {
            outcome.error = Some(e);
            return outcome;
        }
    };

    let snapshot = ctx.snapshot.load_full();

    // Settled with a resolved winner: hand the event to the notifier
    // (the driver dedupes across cycles).
    if round.status >= RoundStatus::Settled
        && round.status != RoundStatus::Cancelled
        && round.winner != Pubkey::default()
    {
        outcome.settlement = Some(SettlementEvent::new(
            round_id,
            round.winner,
            round.total_usdc,
            &round.participants,
        ));
    }

    let action = classify_round(&round, &snapshot.config, now, &ctx.flags);
    debug!("round {}: status {:?} -> {:?}", round_id, round.status, action);

    let result = match action {
        NextAction::Wait => Ok(()),
        NextAction::Finished => {
            outcome.terminal = true;
            Ok(())
        }
        NextAction::Lock => {
            let ixn = ix::build_lock_round(&ctx.program_id, ctx.wallet.pubkey(), round_id);
            submit(&ctx, Transition::Lock, ixn).await
        }
        NextAction::ForceCancel => {
            if snapshot.config.admin != ctx.wallet.pubkey() {
                info!(
                    "round {}: below minimums but crank is not admin; leaving for {}",
                    round_id, snapshot.config.admin
                );
                Ok(())
            } else {
                let ixn =
                    ix::build_admin_force_cancel(&ctx.program_id, ctx.wallet.pubkey(), round_id);
                submit(&ctx, Transition::ForceCancel, ixn).await
            }
        }
        NextAction::RequestVrf => request_vrf(&ctx, round_id).await,
        NextAction::MockSettle => {
            if snapshot.config.admin != ctx.wallet.pubkey() {
                warn!(
                    "round {}: mock-settle deployment but crank is not admin",
                    round_id
                );
                Ok(())
            } else {
                let randomness = mock_randomness(round_id, now, &ctx.wallet.pubkey());
                let ixn = ix::build_mock_settle(
                    &ctx.program_id,
                    ctx.wallet.pubkey(),
                    round_id,
                    randomness,
                );
                submit(&ctx, Transition::MockSettle, ixn).await
            }
        }
        NextAction::AutoClaim => auto_claim(&ctx, &snapshot.config, &round).await,
        NextAction::Degen => drive_degen(&ctx, &snapshot, &round, now).await,
    };

    outcome.error = result.err();
    outcome
}

async fn request_vrf(ctx: &Ctx, round_id: u64) -> std::result::Result<(), CrankError> {
    let (Some(vrf_program), Some(queue)) = (ctx.vrf_program_id, ctx.oracle_queue) else {
        return Err(CrankError::DerivationMismatch(
            "VRF program id / oracle queue not configured".to_string(),
        ));
    };
    let ixn = ix::build_request_vrf(
        &ctx.program_id,
        ctx.wallet.pubkey(),
        round_id,
        queue,
        vrf_program,
    );
    submit(ctx, Transition::RequestVrf, ixn).await
}

async fn auto_claim(
    ctx: &Ctx,
    cfg: &ConfigAccount,
    round: &RoundAccount,
) -> std::result::Result<(), CrankError> {
    let winner_ata = ix::associated_token_address(&round.winner, &cfg.usdc_mint)
        .map_err(|e| CrankError::DerivationMismatch(e.to_string()))?;
    let vrf_payer_ata = if round.vrf_reimbursement_due() {
        Some(
            ix::associated_token_address(&round.vrf_payer, &cfg.usdc_mint)
                .map_err(|e| CrankError::DerivationMismatch(e.to_string()))?,
        )
    } else {
        None
    };
    let ixn = ix::build_auto_claim(
        &ctx.program_id,
        ctx.wallet.pubkey(),
        round.round_id,
        round.vault_usdc_ata,
        winner_ata,
        cfg.treasury_usdc_ata,
        vrf_payer_ata,
    )
    .map_err(|e| CrankError::DerivationMismatch(e.to_string()))?;
    submit(ctx, Transition::AutoClaim, ixn).await
}

async fn drive_degen(
    ctx: &Ctx,
    snapshot: &ChainSnapshot,
    round: &RoundAccount,
    now: i64,
) -> std::result::Result<(), CrankError> {
    let claim = match ctx
        .rpc
        .fetch_degen_claim(&ctx.program_id, round.round_id, &round.winner)
        .await?
    {
        Some(claim) => claim,
        None => {
            // Degen mode flagged but the claim account is not visible yet.
            debug!("round {}: degen claim not found, waiting", round.round_id);
            return Ok(());
        }
    };

    let action = degen_driver::classify_claim(
        &claim,
        snapshot.degen_config.as_ref(),
        &ctx.pool,
        ctx.pool_version,
        &ctx.wallet.pubkey(),
        now,
    );
    debug!(
        "round {}: degen claim {:?} -> {:?}",
        round.round_id, claim.status, action
    );

    let cfg = &snapshot.config;
    let vrf_payer = if round.vrf_reimbursement_due() {
        let ata = ix::associated_token_address(&round.vrf_payer, &cfg.usdc_mint)
            .map_err(|e| CrankError::DerivationMismatch(e.to_string()))?;
        Some((round.vrf_payer, ata))
    } else {
        None
    };

    match action {
        DegenAction::Wait | DegenAction::Done => Ok(()),
        DegenAction::Execute { args, token_mint } => {
            let executor_ata = ix::associated_token_address(&ctx.wallet.pubkey(), &cfg.usdc_mint)
                .map_err(|e| CrankError::DerivationMismatch(e.to_string()))?;
            let receiver_ata = ix::associated_token_address(&claim.winner, &token_mint)
                .map_err(|e| CrankError::DerivationMismatch(e.to_string()))?;
            let ixn = ix::build_begin_degen_execution(
                &ctx.program_id,
                ctx.wallet.pubkey(),
                round.round_id,
                claim.winner,
                &args,
                round.vault_usdc_ata,
                executor_ata,
                cfg.treasury_usdc_ata,
                vrf_payer,
                token_mint,
                receiver_ata,
            )
            .map_err(|e| CrankError::DerivationMismatch(e.to_string()))?;
            submit(ctx, Transition::DegenExecute, ixn).await
        }
        DegenAction::Fallback { reason } => {
            let winner_ata = ix::associated_token_address(&claim.winner, &cfg.usdc_mint)
                .map_err(|e| CrankError::DerivationMismatch(e.to_string()))?;
            let ixn = ix::build_auto_claim_degen_fallback(
                &ctx.program_id,
                ctx.wallet.pubkey(),
                round.round_id,
                claim.winner,
                reason,
                round.vault_usdc_ata,
                winner_ata,
                cfg.treasury_usdc_ata,
                vrf_payer,
            )
            .map_err(|e| CrankError::DerivationMismatch(e.to_string()))?;
            submit(ctx, Transition::DegenFallback, ixn).await
        }
    }
}

/// Sign with a fresh blockhash, submit, and confirm. Transport failures
/// retry up to `max_retries`; on-chain rejections are classified against the
/// attempted transition, and an already-satisfied precondition is success.
/// An unconfirmed signature fails closed; the next cycle re-reads on-chain
/// state before trying anything else.
async fn submit(
    ctx: &Ctx,
    transition: Transition,
    instruction: solana_sdk::instruction::Instruction,
) -> std::result::Result<(), CrankError> {
    let mut last_err = CrankError::Transport("no attempts made".to_string());

    for attempt in 0..ctx.max_retries {
        let blockhash = match ctx.rpc.latest_blockhash().await {
            Ok(hash) => hash,
            Err(e) => {
                last_err = e;
                continue;
            }
        };
        let tx = Transaction::new_signed_with_payer(
            &[instruction.clone()],
            Some(&ctx.wallet.pubkey()),
            &[ctx.wallet.as_ref()],
            blockhash,
        );

        match ctx.rpc.send_transaction(&tx).await {
            Ok(signature) => {
                info!("📤 {:?} submitted: {}", transition, signature);
                return match ctx
                    .rpc
                    .confirm_signature(&signature, ctx.confirm_deadline, ctx.confirm_poll)
                    .await
                {
                    Ok(()) => {
                        info!("✅ {:?} confirmed: {}", transition, signature);
                        Ok(())
                    }
                    Err(CrankError::OnChainRejection(code)) => {
                        reject_to_result(transition, code)
                    }
                    Err(e) => Err(e),
                };
            }
            Err(CrankError::OnChainRejection(code)) => {
                return reject_to_result(transition, code);
            }
            Err(e) if e.is_retryable() && attempt + 1 < ctx.max_retries => {
                debug!(
                    "{:?} attempt {} failed, retrying: {}",
                    transition, attempt, e
                );
                last_err = e;
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err)
}

fn reject_to_result(transition: Transition, code: u32) -> std::result::Result<(), CrankError> {
    match classify_rejection(transition, code) {
        CrankError::AlreadySatisfied(code) => {
            info!("{:?} already satisfied on-chain (code {})", transition, code);
            Ok(())
        }
        err => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jackpot_layout::{DEGEN_MODE_VRF_REQUESTED, DEGEN_MODE_NONE};

    fn chain_config() -> ConfigAccount {
        ConfigAccount {
            admin: Pubkey::new_from_array([1; 32]),
            usdc_mint: Pubkey::new_from_array([2; 32]),
            treasury_usdc_ata: Pubkey::new_from_array([3; 32]),
            fee_bps: 500,
            ticket_unit: 10_000,
            round_duration_sec: 300,
            min_participants: 2,
            min_total_tickets: 10,
            paused: false,
            bump: 254,
            max_deposit_per_user: 0,
        }
    }

    fn sample_round(status: RoundStatus) -> RoundAccount {
        RoundAccount {
            round_id: 42,
            status,
            bump: 255,
            start_ts: 1_700_000_000,
            end_ts: 1_700_000_300,
            first_deposit_ts: 1_700_000_010,
            vault_usdc_ata: Pubkey::new_from_array([4; 32]),
            total_usdc: 1_975_320,
            total_tickets: 197,
            participants_count: 2,
            randomness: [0; 32],
            winning_ticket: 0,
            winner: Pubkey::default(),
            participants: vec![
                Pubkey::new_from_array([5; 32]),
                Pubkey::new_from_array([6; 32]),
            ],
            vrf_payer: Pubkey::default(),
            vrf_reimbursed: false,
            degen_mode: DEGEN_MODE_NONE,
        }
    }

    fn flags() -> DriveFlags {
        DriveFlags {
            mock_settle: false,
            auto_claim: true,
        }
    }

    #[test]
    fn open_round_before_end_waits() {
        let round = sample_round(RoundStatus::Open);
        let action = classify_round(&round, &chain_config(), 1_700_000_299, &flags());
        assert_eq!(action, NextAction::Wait);
    }

    #[test]
    fn open_round_at_end_locks_when_minimums_met() {
        let round = sample_round(RoundStatus::Open);
        // boundary: now == end_ts locks
        let action = classify_round(&round, &chain_config(), 1_700_000_300, &flags());
        assert_eq!(action, NextAction::Lock);
    }

    #[test]
    fn open_round_below_minimums_cancels() {
        let mut round = sample_round(RoundStatus::Open);
        round.participants_count = 1;
        let action = classify_round(&round, &chain_config(), 1_700_000_301, &flags());
        assert_eq!(action, NextAction::ForceCancel);

        let mut round = sample_round(RoundStatus::Open);
        round.total_tickets = 9;
        let action = classify_round(&round, &chain_config(), 1_700_000_301, &flags());
        assert_eq!(action, NextAction::ForceCancel);
    }

    #[test]
    fn open_round_without_deposits_is_left_alone() {
        let mut round = sample_round(RoundStatus::Open);
        round.first_deposit_ts = 0;
        round.participants_count = 0;
        round.total_tickets = 0;
        let action = classify_round(&round, &chain_config(), 1_700_999_999, &flags());
        assert_eq!(action, NextAction::Wait);
    }

    #[test]
    fn locked_round_requests_vrf_once() {
        let round = sample_round(RoundStatus::Locked);
        let action = classify_round(&round, &chain_config(), 1_700_000_301, &flags());
        assert_eq!(action, NextAction::RequestVrf);

        // vrf_payer set means the request is already in flight
        let mut round = sample_round(RoundStatus::Locked);
        round.vrf_payer = Pubkey::new_from_array([9; 32]);
        let action = classify_round(&round, &chain_config(), 1_700_000_301, &flags());
        assert_eq!(action, NextAction::Wait);
    }

    #[test]
    fn locked_round_mock_settles_in_mock_deployments() {
        let round = sample_round(RoundStatus::Locked);
        let f = DriveFlags {
            mock_settle: true,
            auto_claim: true,
        };
        let action = classify_round(&round, &chain_config(), 1_700_000_301, &f);
        assert_eq!(action, NextAction::MockSettle);
    }

    #[test]
    fn vrf_requested_waits_for_oracle() {
        let round = sample_round(RoundStatus::VrfRequested);
        let action = classify_round(&round, &chain_config(), 1_700_000_400, &flags());
        assert_eq!(action, NextAction::Wait);
    }

    #[test]
    fn settled_round_auto_claims() {
        let round = sample_round(RoundStatus::Settled);
        let action = classify_round(&round, &chain_config(), 1_700_000_400, &flags());
        assert_eq!(action, NextAction::AutoClaim);

        let f = DriveFlags {
            mock_settle: false,
            auto_claim: false,
        };
        let action = classify_round(&round, &chain_config(), 1_700_000_400, &f);
        assert_eq!(action, NextAction::Wait);
    }

    #[test]
    fn settled_degen_round_hands_off() {
        let mut round = sample_round(RoundStatus::Settled);
        round.degen_mode = DEGEN_MODE_VRF_REQUESTED;
        let action = classify_round(&round, &chain_config(), 1_700_000_400, &flags());
        assert_eq!(action, NextAction::Degen);
    }

    #[test]
    fn terminal_rounds_are_finished() {
        for status in [RoundStatus::Claimed, RoundStatus::Cancelled] {
            let round = sample_round(status);
            let action = classify_round(&round, &chain_config(), 1_700_000_400, &flags());
            assert_eq!(action, NextAction::Finished);
        }
    }

    #[test]
    fn rejection_mapping_lock() {
        assert!(matches!(
            classify_rejection(Transition::Lock, ERR_ROUND_NOT_OPEN),
            CrankError::AlreadySatisfied(_)
        ));
        assert!(matches!(
            classify_rejection(Transition::Lock, ERR_UNAUTHORIZED),
            CrankError::Unauthorized(_)
        ));
        assert!(matches!(
            classify_rejection(Transition::Lock, 6011),
            CrankError::OnChainRejection(6011)
        ));
    }

    #[test]
    fn rejection_mapping_vrf_and_claim() {
        assert!(matches!(
            classify_rejection(Transition::RequestVrf, ERR_ROUND_NOT_LOCKED),
            CrankError::AlreadySatisfied(_)
        ));
        assert!(matches!(
            classify_rejection(Transition::MockSettle, ERR_ROUND_NOT_LOCKED),
            CrankError::AlreadySatisfied(_)
        ));
        assert!(matches!(
            classify_rejection(Transition::AutoClaim, ERR_ROUND_ALREADY_CLAIMED),
            CrankError::AlreadySatisfied(_)
        ));
    }

    #[test]
    fn rejection_mapping_degen() {
        assert!(matches!(
            classify_rejection(Transition::DegenExecute, ERR_DEGEN_ALREADY_CLAIMED),
            CrankError::AlreadySatisfied(_)
        ));
        assert!(matches!(
            classify_rejection(Transition::DegenExecute, ERR_UNAUTHORIZED_DEGEN_EXECUTOR),
            CrankError::Unauthorized(_)
        ));
        // Losing the timeout race is retried, not fatal
        assert!(matches!(
            classify_rejection(Transition::DegenFallback, ERR_DEGEN_FALLBACK_TOO_EARLY),
            CrankError::OnChainRejection(_)
        ));
        assert!(matches!(
            classify_rejection(Transition::DegenFallback, ERR_INVALID_DEGEN_EXECUTION_STATE),
            CrankError::AlreadySatisfied(_)
        ));
    }

    fn outcome(
        settlement: Option<SettlementEvent>,
        error: Option<CrankError>,
        terminal: bool,
    ) -> DriveOutcome {
        DriveOutcome {
            round_id: 42,
            terminal,
            settlement,
            error,
        }
    }

    #[test]
    fn settlement_publishes_exactly_once_across_cycles() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        let notifier = NotifyHandle::with_sender(tx);
        let winner = Pubkey::new_from_array([5; 32]);
        let other = Pubkey::new_from_array([6; 32]);
        let event = SettlementEvent::new(42, winner, 1_975_320, &[winner, other]);
        let mut book = RoundBook::default();

        // The same settled round is observed on three consecutive cycles
        for _ in 0..3 {
            absorb_outcome(&mut book, outcome(Some(event.clone()), None, false), &notifier, 5);
        }

        let delivered = rx.try_recv().expect("exactly one settlement event");
        assert_eq!(delivered.round_id, 42);
        assert_eq!(delivered.winner, winner.to_string());
        assert_eq!(delivered.participants.len(), 2);
        assert!(rx.try_recv().is_err());
        assert!(book.notified);
    }

    #[test]
    fn strikes_reset_on_success_and_park_at_the_bound() {
        let notifier = NotifyHandle::disabled();
        let mut book = RoundBook::default();

        absorb_outcome(
            &mut book,
            outcome(None, Some(CrankError::OnChainRejection(6011)), false),
            &notifier,
            3,
        );
        assert_eq!(book.strikes, 1);
        assert!(!book.parked);

        // Already-satisfied counts as success and clears the failure run
        absorb_outcome(
            &mut book,
            outcome(None, Some(CrankError::AlreadySatisfied(ERR_ROUND_NOT_OPEN)), false),
            &notifier,
            3,
        );
        assert_eq!(book.strikes, 0);

        for _ in 0..3 {
            absorb_outcome(
                &mut book,
                outcome(None, Some(CrankError::Transport("connection reset".into())), false),
                &notifier,
                3,
            );
        }
        assert!(book.parked);
    }

    #[test]
    fn unauthorized_parks_without_striking() {
        let mut book = RoundBook::default();
        absorb_outcome(
            &mut book,
            outcome(None, Some(CrankError::Unauthorized(ERR_UNAUTHORIZED)), false),
            &NotifyHandle::disabled(),
            5,
        );
        assert!(book.parked);
        assert_eq!(book.strikes, 0);
    }

    #[test]
    fn terminal_outcome_leaves_the_live_set() {
        let mut book = RoundBook::default();
        assert!(absorb_outcome(
            &mut book,
            outcome(None, None, true),
            &NotifyHandle::disabled(),
            5,
        ));
        assert!(!absorb_outcome(
            &mut book,
            outcome(None, None, false),
            &NotifyHandle::disabled(),
            5,
        ));
    }

    #[test]
    fn frontier_scan_walks_past_closed_round_gaps() {
        // Rounds 3 and 4 closed out, 5 still live
        let mut scan = FrontierScan::new(3, 3);
        assert_eq!(scan.next_probe(), Some(3));
        scan.missing();
        assert_eq!(scan.next_probe(), Some(4));
        scan.missing();
        assert_eq!(scan.next_probe(), Some(5));
        scan.found();
        assert_eq!(scan.frontier(), 6);

        // A hit resets the gap budget
        scan.missing();
        scan.missing();
        scan.missing();
        assert_eq!(scan.next_probe(), Some(9));
        scan.missing();
        assert_eq!(scan.next_probe(), None);

        // The frontier stays past the last live round, not the probed tail,
        // so a round created at id 6 next cycle is still discovered.
        assert_eq!(scan.frontier(), 6);
    }

    #[test]
    fn frontier_scan_zero_budget_stops_at_first_gap() {
        let mut scan = FrontierScan::new(1, 0);
        scan.found();
        assert_eq!(scan.next_probe(), Some(2));
        scan.missing();
        assert_eq!(scan.next_probe(), None);
        assert_eq!(scan.frontier(), 2);
    }

    #[test]
    fn mock_randomness_is_deterministic_and_keyed() {
        let wallet = Pubkey::new_from_array([7; 32]);
        let a = mock_randomness(1, 1_700_000_000, &wallet);
        let b = mock_randomness(1, 1_700_000_000, &wallet);
        assert_eq!(a, b);
        assert_ne!(a, mock_randomness(2, 1_700_000_000, &wallet));
        assert_ne!(a, mock_randomness(1, 1_700_000_001, &wallet));
        assert_ne!(a, [0u8; 32]);
    }
}
