// Jackpot Crank - off-chain round coordinator for the jackpot program

pub mod config;
pub mod degen_driver;
pub mod error;
pub mod jackpot_instructions;
pub mod jackpot_layout;
pub mod jackpot_pda;
pub mod jackpot_rpc;
pub mod round_driver;
pub mod social_notify;

// Re-exports for convenience
pub use config::CrankConfig;
pub use degen_driver::{classify_claim, fallback_eligible, DegenAction};
pub use error::CrankError;
pub use jackpot_layout::{
    ConfigAccount, DegenClaimAccount, DegenClaimStatus, DegenConfigAccount, ParticipantAccount,
    RoundAccount, RoundStatus,
};
pub use jackpot_rpc::JackpotRpc;
pub use round_driver::{classify_round, DriveFlags, NextAction, RoundDriver, Transition};
pub use social_notify::{spawn_notifier, NotifyHandle, SettlementEvent};
