// jackpot_pda.rs — program-derived addresses for the jackpot program
//
// Seeds must match the on-chain program exactly; a wrong derivation makes
// every subsequent submission target the wrong account and fail on-chain.
// The program id is always an explicit parameter — no ambient network state.

use solana_sdk::pubkey::Pubkey;

pub const SEED_CONFIG: &[u8] = b"cfg";
pub const SEED_ROUND: &[u8] = b"round";
pub const SEED_PARTICIPANT: &[u8] = b"p";
pub const SEED_DEGEN_CLAIM: &[u8] = b"degen_claim";
pub const SEED_DEGEN_CONFIG: &[u8] = b"degen_cfg";
pub const SEED_IDENTITY: &[u8] = b"identity";

pub fn config_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[SEED_CONFIG], program_id)
}

pub fn round_address(program_id: &Pubkey, round_id: u64) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[SEED_ROUND, &round_id.to_le_bytes()], program_id)
}

pub fn participant_address(program_id: &Pubkey, round: &Pubkey, user: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[SEED_PARTICIPANT, round.as_ref(), user.as_ref()],
        program_id,
    )
}

pub fn degen_claim_address(program_id: &Pubkey, round_id: u64, winner: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[SEED_DEGEN_CLAIM, &round_id.to_le_bytes(), winner.as_ref()],
        program_id,
    )
}

pub fn degen_config_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[SEED_DEGEN_CONFIG], program_id)
}

/// The program's identity PDA, used by the program to sign VRF CPIs.
pub fn identity_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[SEED_IDENTITY], program_id)
}
