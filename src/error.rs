// error.rs — error taxonomy for the crank
//
// Per-round failures never cross into other rounds; the driver branches on
// these classes to decide between retry, skip, and park.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrankError {
    /// Account bytes did not match the on-chain layout. Fatal for that
    /// account only; the driver skips it and logs.
    #[error("malformed {kind} account: {reason}")]
    MalformedAccount { kind: &'static str, reason: String },

    /// A derived PDA disagrees with on-chain reality (wrong program id or
    /// seeds). Configuration error; halts processing for that round.
    #[error("derivation mismatch: {0}")]
    DerivationMismatch(String),

    /// Network / RPC / timeout failure. Retried with backoff up to a bound.
    #[error("transport: {0}")]
    Transport(String),

    /// The program rejected the instruction because the transition already
    /// happened (e.g. "round not open" when locking). Success by idempotence.
    #[error("already satisfied on-chain (program error {0})")]
    AlreadySatisfied(u32),

    /// The signer is not allowed to perform this action. Fatal for the
    /// action; the crank must not retry it.
    #[error("unauthorized (program error {0})")]
    Unauthorized(u32),

    /// Any other on-chain rejection. The round is left for the next poll
    /// cycle; repeated strikes park it.
    #[error("program rejected transaction (error {0})")]
    OnChainRejection(u32),

    /// The transaction was submitted but never confirmed within the wait
    /// budget. Fail closed: state is re-read before any retry.
    #[error("transaction {0} unconfirmed within wait budget")]
    Unconfirmed(String),
}

impl CrankError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, CrankError::Transport(_))
    }
}
