// jackpot_layout.rs — zero-copy decoders for the jackpot program's accounts
//
// All accounts are Anchor accounts: an 8-byte discriminator
// (sha256("account:<Name>")[..8]) followed by little-endian fields at fixed
// offsets. Round is a zero-copy (#[repr(C)]) account, so it carries explicit
// padding; the others are borsh-packed in declaration order. Any change to
// field order or width on-chain is a breaking format change for this module.

use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;

use crate::error::CrankError;

pub const DISCRIMINATOR_LEN: usize = 8;
pub const PUBKEY_LEN: usize = 32;

/// Fixed capacity of the embedded participant list in a Round.
pub const MAX_PARTICIPANTS: usize = 200;

pub const CONFIG_BODY_LEN: usize = 154;
pub const CONFIG_ACCOUNT_LEN: usize = DISCRIMINATOR_LEN + CONFIG_BODY_LEN;
pub const PARTICIPANT_BODY_LEN: usize = 103;
pub const PARTICIPANT_ACCOUNT_LEN: usize = DISCRIMINATOR_LEN + PARTICIPANT_BODY_LEN;
pub const DEGEN_CONFIG_BODY_LEN: usize = 64;
pub const DEGEN_CONFIG_ACCOUNT_LEN: usize = DISCRIMINATOR_LEN + DEGEN_CONFIG_BODY_LEN;
pub const DEGEN_CLAIM_BODY_LEN: usize = 340;
pub const DEGEN_CLAIM_ACCOUNT_LEN: usize = DISCRIMINATOR_LEN + DEGEN_CLAIM_BODY_LEN;

const ROUND_PARTICIPANTS_OFFSET: usize = 168;
const ROUND_FENWICK_OFFSET: usize = ROUND_PARTICIPANTS_OFFSET + PUBKEY_LEN * MAX_PARTICIPANTS;
const ROUND_VRF_PAYER_OFFSET: usize = ROUND_FENWICK_OFFSET + 8 * (MAX_PARTICIPANTS + 1);
pub const ROUND_BODY_LEN: usize = ROUND_VRF_PAYER_OFFSET + PUBKEY_LEN + 1 + 31;
pub const ROUND_ACCOUNT_LEN: usize = DISCRIMINATOR_LEN + ROUND_BODY_LEN;

/// Clock sysvar: slot u64, epoch_start_timestamp i64, epoch u64,
/// leader_schedule_epoch u64, then unix_timestamp i64 at byte 32.
const CLOCK_UNIX_TIMESTAMP_OFFSET: usize = 32;
pub const CLOCK_ACCOUNT_LEN: usize = 40;

/// sha256("<namespace>:<name>")[..8] — Anchor's discriminator scheme.
pub(crate) fn anchor_discriminator(namespace: &str, name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(b":");
    hasher.update(name.as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

pub fn account_discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    anchor_discriminator("account", name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum RoundStatus {
    Open = 0,
    Locked = 1,
    VrfRequested = 2,
    Settled = 3,
    Claimed = 4,
    Cancelled = 5,
}

impl RoundStatus {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Open),
            1 => Some(Self::Locked),
            2 => Some(Self::VrfRequested),
            3 => Some(Self::Settled),
            4 => Some(Self::Claimed),
            5 => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Claimed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DegenClaimStatus {
    VrfRequested = 1,
    VrfReady = 2,
    Executing = 3,
    ClaimedSwapped = 4,
    ClaimedFallback = 5,
}

impl DegenClaimStatus {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::VrfRequested),
            2 => Some(Self::VrfReady),
            3 => Some(Self::Executing),
            4 => Some(Self::ClaimedSwapped),
            5 => Some(Self::ClaimedFallback),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::ClaimedSwapped | Self::ClaimedFallback)
    }
}

// Degen mode byte stashed in Round.reserved[0].
pub const DEGEN_MODE_NONE: u8 = 0;
pub const DEGEN_MODE_VRF_REQUESTED: u8 = 1;
pub const DEGEN_MODE_VRF_READY: u8 = 2;
pub const DEGEN_MODE_EXECUTING: u8 = 3;
pub const DEGEN_MODE_CLAIMED: u8 = 4;

// Fallback reasons understood by the program.
pub const FALLBACK_REASON_NO_VIABLE_ROUTE: u8 = 1;
pub const FALLBACK_REASON_TIMEOUT: u8 = 2;

/// Program default when no DegenConfig account has been initialized.
pub const DEFAULT_DEGEN_FALLBACK_TIMEOUT_SEC: u32 = 300;

/// Global protocol Config (singleton PDA, admin-mutable, crank read-only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigAccount {
    pub admin: Pubkey,
    pub usdc_mint: Pubkey,
    pub treasury_usdc_ata: Pubkey,
    pub fee_bps: u16,
    pub ticket_unit: u64,
    pub round_duration_sec: u32,
    pub min_participants: u16,
    pub min_total_tickets: u64,
    pub paused: bool,
    pub bump: u8,
    pub max_deposit_per_user: u64,
}

/// One round of the jackpot. The decoder returns exactly
/// `participants_count` live entries from the fixed-capacity array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundAccount {
    pub round_id: u64,
    pub status: RoundStatus,
    pub bump: u8,
    pub start_ts: i64,
    pub end_ts: i64,
    pub first_deposit_ts: i64,
    pub vault_usdc_ata: Pubkey,
    pub total_usdc: u64,
    pub total_tickets: u64,
    pub participants_count: u16,
    pub randomness: [u8; 32],
    pub winning_ticket: u64,
    pub winner: Pubkey,
    pub participants: Vec<Pubkey>,
    pub vrf_payer: Pubkey,
    pub vrf_reimbursed: bool,
    pub degen_mode: u8,
}

impl RoundAccount {
    /// The oracle has fulfilled the round's randomness request.
    pub fn randomness_fulfilled(&self) -> bool {
        self.randomness.iter().any(|&b| b != 0)
    }

    pub fn has_vrf_payer(&self) -> bool {
        self.vrf_payer != Pubkey::default()
    }

    /// Winner opted into the degen payout path.
    pub fn is_degen(&self) -> bool {
        self.degen_mode != DEGEN_MODE_NONE
    }

    /// VRF payer reimbursement is still owed out of the pot.
    pub fn vrf_reimbursement_due(&self) -> bool {
        self.has_vrf_payer() && !self.vrf_reimbursed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantAccount {
    pub round: Pubkey,
    pub user: Pubkey,
    pub index: u16,
    pub bump: u8,
    pub tickets_total: u64,
    pub usdc_total: u64,
    pub deposits_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegenConfigAccount {
    pub executor: Pubkey,
    pub fallback_timeout_sec: u32,
    pub bump: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegenClaimAccount {
    pub round: Pubkey,
    pub winner: Pubkey,
    pub round_id: u64,
    pub status: DegenClaimStatus,
    pub bump: u8,
    pub selected_candidate_rank: u8,
    pub fallback_reason: u8,
    pub token_index: u32,
    pub pool_version: u32,
    pub candidate_window: u8,
    pub requested_at: i64,
    pub fulfilled_at: i64,
    pub claimed_at: i64,
    pub fallback_after_ts: i64,
    pub payout_raw: u64,
    pub min_out_raw: u64,
    pub receiver_pre_balance: u64,
    pub token_mint: Pubkey,
    pub executor: Pubkey,
    pub receiver_token_ata: Pubkey,
    pub randomness: [u8; 32],
    pub route_hash: [u8; 32],
}

impl DegenClaimAccount {
    pub fn randomness_fulfilled(&self) -> bool {
        self.randomness.iter().any(|&b| b != 0)
    }
}

// Cursor helpers

fn malformed(kind: &'static str, reason: impl Into<String>) -> CrankError {
    CrankError::MalformedAccount {
        kind,
        reason: reason.into(),
    }
}

fn check_prefix<'a>(
    kind: &'static str,
    data: &'a [u8],
    min_len: usize,
) -> Result<&'a [u8], CrankError> {
    if data.len() < min_len {
        return Err(malformed(
            kind,
            format!("{} bytes, need at least {}", data.len(), min_len),
        ));
    }
    if data[..DISCRIMINATOR_LEN] != account_discriminator(kind) {
        return Err(malformed(kind, "discriminator mismatch"));
    }
    Ok(&data[DISCRIMINATOR_LEN..])
}

fn read_u8(body: &[u8], offset: &mut usize) -> u8 {
    let v = body[*offset];
    *offset += 1;
    v
}

fn read_u16(body: &[u8], offset: &mut usize) -> u16 {
    let v = u16::from_le_bytes(body[*offset..*offset + 2].try_into().unwrap());
    *offset += 2;
    v
}

fn read_u32(body: &[u8], offset: &mut usize) -> u32 {
    let v = u32::from_le_bytes(body[*offset..*offset + 4].try_into().unwrap());
    *offset += 4;
    v
}

fn read_u64(body: &[u8], offset: &mut usize) -> u64 {
    let v = u64::from_le_bytes(body[*offset..*offset + 8].try_into().unwrap());
    *offset += 8;
    v
}

fn read_i64(body: &[u8], offset: &mut usize) -> i64 {
    let v = i64::from_le_bytes(body[*offset..*offset + 8].try_into().unwrap());
    *offset += 8;
    v
}

fn read_bytes32(body: &[u8], offset: &mut usize) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&body[*offset..*offset + 32]);
    *offset += 32;
    out
}

fn read_pubkey(body: &[u8], offset: &mut usize) -> Pubkey {
    Pubkey::new_from_array(read_bytes32(body, offset))
}

impl ConfigAccount {
    pub fn decode(data: &[u8]) -> Result<Self, CrankError> {
        let body = check_prefix("Config", data, CONFIG_ACCOUNT_LEN)?;
        let mut off = 0usize;
        let admin = read_pubkey(body, &mut off);
        let usdc_mint = read_pubkey(body, &mut off);
        let treasury_usdc_ata = read_pubkey(body, &mut off);
        let fee_bps = read_u16(body, &mut off);
        let ticket_unit = read_u64(body, &mut off);
        let round_duration_sec = read_u32(body, &mut off);
        let min_participants = read_u16(body, &mut off);
        let min_total_tickets = read_u64(body, &mut off);
        let paused = match read_u8(body, &mut off) {
            0 => false,
            1 => true,
            b => return Err(malformed("Config", format!("invalid paused byte {b}"))),
        };
        let bump = read_u8(body, &mut off);
        let max_deposit_per_user = read_u64(body, &mut off);

        Ok(Self {
            admin,
            usdc_mint,
            treasury_usdc_ata,
            fee_bps,
            ticket_unit,
            round_duration_sec,
            min_participants,
            min_total_tickets,
            paused,
            bump,
            max_deposit_per_user,
        })
    }
}

impl RoundAccount {
    pub fn decode(data: &[u8]) -> Result<Self, CrankError> {
        let body = check_prefix("Round", data, ROUND_ACCOUNT_LEN)?;
        let mut off = 0usize;
        let round_id = read_u64(body, &mut off);
        let status_byte = read_u8(body, &mut off);
        let status = RoundStatus::from_byte(status_byte)
            .ok_or_else(|| malformed("Round", format!("unknown status byte {status_byte}")))?;
        let bump = read_u8(body, &mut off);
        off += 6; // repr(C) padding
        let start_ts = read_i64(body, &mut off);
        let end_ts = read_i64(body, &mut off);
        let first_deposit_ts = read_i64(body, &mut off);
        let vault_usdc_ata = read_pubkey(body, &mut off);
        let total_usdc = read_u64(body, &mut off);
        let total_tickets = read_u64(body, &mut off);
        let participants_count = read_u16(body, &mut off);
        off += 6; // repr(C) padding
        let randomness = read_bytes32(body, &mut off);
        let winning_ticket = read_u64(body, &mut off);
        let winner = read_pubkey(body, &mut off);

        if participants_count as usize > MAX_PARTICIPANTS {
            return Err(malformed(
                "Round",
                format!("participants_count {participants_count} exceeds capacity {MAX_PARTICIPANTS}"),
            ));
        }

        debug_assert_eq!(off, ROUND_PARTICIPANTS_OFFSET);
        let mut participants = Vec::with_capacity(participants_count as usize);
        for _ in 0..participants_count {
            participants.push(read_pubkey(body, &mut off));
        }

        // Only meaningful once the program has settled the round.
        if matches!(status, RoundStatus::Settled | RoundStatus::Claimed)
            && winning_ticket >= total_tickets
        {
            return Err(malformed(
                "Round",
                format!("winning_ticket {winning_ticket} >= total_tickets {total_tickets}"),
            ));
        }

        // Skip unused participant slots and the Fenwick ticket tree; the
        // crank never needs per-ticket prefix sums, only the winner the
        // program already resolved.
        off = ROUND_VRF_PAYER_OFFSET;
        let vrf_payer = read_pubkey(body, &mut off);
        let vrf_reimbursed = read_u8(body, &mut off) != 0;
        let degen_mode = read_u8(body, &mut off); // reserved[0]

        Ok(Self {
            round_id,
            status,
            bump,
            start_ts,
            end_ts,
            first_deposit_ts,
            vault_usdc_ata,
            total_usdc,
            total_tickets,
            participants_count,
            randomness,
            winning_ticket,
            winner,
            participants,
            vrf_payer,
            vrf_reimbursed,
            degen_mode,
        })
    }
}

impl ParticipantAccount {
    pub fn decode(data: &[u8]) -> Result<Self, CrankError> {
        let body = check_prefix("Participant", data, PARTICIPANT_ACCOUNT_LEN)?;
        let mut off = 0usize;
        let round = read_pubkey(body, &mut off);
        let user = read_pubkey(body, &mut off);
        let index = read_u16(body, &mut off);
        let bump = read_u8(body, &mut off);
        let tickets_total = read_u64(body, &mut off);
        let usdc_total = read_u64(body, &mut off);
        let deposits_count = read_u32(body, &mut off);

        Ok(Self {
            round,
            user,
            index,
            bump,
            tickets_total,
            usdc_total,
            deposits_count,
        })
    }
}

impl DegenConfigAccount {
    pub fn decode(data: &[u8]) -> Result<Self, CrankError> {
        let body = check_prefix("DegenConfig", data, DEGEN_CONFIG_ACCOUNT_LEN)?;
        let mut off = 0usize;
        let executor = read_pubkey(body, &mut off);
        let fallback_timeout_sec = read_u32(body, &mut off);
        let bump = read_u8(body, &mut off);

        Ok(Self {
            executor,
            fallback_timeout_sec,
            bump,
        })
    }
}

impl DegenClaimAccount {
    pub fn decode(data: &[u8]) -> Result<Self, CrankError> {
        let body = check_prefix("DegenClaim", data, DEGEN_CLAIM_ACCOUNT_LEN)?;
        let mut off = 0usize;
        let round = read_pubkey(body, &mut off);
        let winner = read_pubkey(body, &mut off);
        let round_id = read_u64(body, &mut off);
        let status_byte = read_u8(body, &mut off);
        let status = DegenClaimStatus::from_byte(status_byte)
            .ok_or_else(|| malformed("DegenClaim", format!("unknown status byte {status_byte}")))?;
        let bump = read_u8(body, &mut off);
        let selected_candidate_rank = read_u8(body, &mut off);
        let fallback_reason = read_u8(body, &mut off);
        let token_index = read_u32(body, &mut off);
        let pool_version = read_u32(body, &mut off);
        let candidate_window = read_u8(body, &mut off);
        off += 7; // explicit padding field
        let requested_at = read_i64(body, &mut off);
        let fulfilled_at = read_i64(body, &mut off);
        let claimed_at = read_i64(body, &mut off);
        let fallback_after_ts = read_i64(body, &mut off);
        let payout_raw = read_u64(body, &mut off);
        let min_out_raw = read_u64(body, &mut off);
        let receiver_pre_balance = read_u64(body, &mut off);
        let token_mint = read_pubkey(body, &mut off);
        let executor = read_pubkey(body, &mut off);
        let receiver_token_ata = read_pubkey(body, &mut off);
        let randomness = read_bytes32(body, &mut off);
        let route_hash = read_bytes32(body, &mut off);

        Ok(Self {
            round,
            winner,
            round_id,
            status,
            bump,
            selected_candidate_rank,
            fallback_reason,
            token_index,
            pool_version,
            candidate_window,
            requested_at,
            fulfilled_at,
            claimed_at,
            fallback_after_ts,
            payout_raw,
            min_out_raw,
            receiver_pre_balance,
            token_mint,
            executor,
            receiver_token_ata,
            randomness,
            route_hash,
        })
    }
}

/// Unix timestamp out of the Clock sysvar account. The crank uses chain
/// time, not local wall clock, for every timeout decision.
pub fn decode_clock_unix_timestamp(data: &[u8]) -> Result<i64, CrankError> {
    if data.len() < CLOCK_ACCOUNT_LEN {
        return Err(malformed(
            "Clock",
            format!("{} bytes, need at least {}", data.len(), CLOCK_ACCOUNT_LEN),
        ));
    }
    Ok(i64::from_le_bytes(
        data[CLOCK_UNIX_TIMESTAMP_OFFSET..CLOCK_UNIX_TIMESTAMP_OFFSET + 8]
            .try_into()
            .unwrap(),
    ))
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn pk(seed: u8) -> Pubkey {
        Pubkey::new_from_array([seed; 32])
    }

    fn sample_round() -> RoundAccount {
        RoundAccount {
            round_id: 42,
            status: RoundStatus::VrfRequested,
            bump: 254,
            start_ts: 1_700_000_000,
            end_ts: 1_700_000_600,
            first_deposit_ts: 1_700_000_030,
            vault_usdc_ata: pk(9),
            total_usdc: 1_975_320,
            total_tickets: 197,
            participants_count: 2,
            randomness: [0u8; 32],
            winning_ticket: 0,
            winner: Pubkey::default(),
            participants: vec![pk(11), pk(12)],
            vrf_payer: pk(7),
            vrf_reimbursed: false,
            degen_mode: DEGEN_MODE_NONE,
        }
    }

    #[test]
    fn account_discriminators_match_anchor() {
        // sha256("account:<Name>")[..8], precomputed.
        assert_eq!(account_discriminator("Config"), [155, 12, 170, 224, 30, 250, 204, 130]);
        assert_eq!(account_discriminator("Round"), [87, 127, 165, 51, 73, 78, 116, 174]);
        assert_eq!(account_discriminator("Participant"), [32, 142, 108, 79, 247, 179, 54, 6]);
        assert_eq!(account_discriminator("DegenClaim"), [234, 130, 179, 110, 12, 221, 188, 213]);
        assert_eq!(account_discriminator("DegenConfig"), [1, 13, 207, 202, 167, 157, 122, 103]);
    }

    #[test]
    fn layout_sizes_match_program() {
        assert_eq!(CONFIG_ACCOUNT_LEN, 162);
        assert_eq!(PARTICIPANT_ACCOUNT_LEN, 111);
        assert_eq!(DEGEN_CONFIG_ACCOUNT_LEN, 72);
        assert_eq!(DEGEN_CLAIM_ACCOUNT_LEN, 348);
        assert_eq!(ROUND_BODY_LEN, 8240);
        assert_eq!(ROUND_ACCOUNT_LEN, 8248);
    }

    #[test]
    fn round_round_trip() {
        let round = sample_round();
        let buf = encode_round(&round);
        let decoded = RoundAccount::decode(&buf).unwrap();
        assert_eq!(decoded, round);
    }

    #[test]
    fn round_round_trip_with_winner_and_tail_fields() {
        let mut round = sample_round();
        round.status = RoundStatus::Settled;
        round.randomness = [0xAB; 32];
        round.winning_ticket = 123;
        round.winner = pk(11);
        round.vrf_reimbursed = true;
        round.degen_mode = DEGEN_MODE_VRF_READY;
        let decoded = RoundAccount::decode(&encode_round(&round)).unwrap();
        assert_eq!(decoded, round);
        assert!(decoded.randomness_fulfilled());
        assert!(decoded.is_degen());
        assert!(!decoded.vrf_reimbursement_due());
    }

    #[test]
    fn round_decoder_returns_only_live_participants() {
        let round = sample_round();
        let decoded = RoundAccount::decode(&encode_round(&round)).unwrap();
        assert_eq!(decoded.participants.len(), 2);
        assert_eq!(decoded.participants, vec![pk(11), pk(12)]);
    }

    #[test]
    fn round_rejects_short_buffer() {
        let buf = encode_round(&sample_round());
        let err = RoundAccount::decode(&buf[..ROUND_ACCOUNT_LEN - 1]).unwrap_err();
        assert!(matches!(err, CrankError::MalformedAccount { kind: "Round", .. }));
    }

    #[test]
    fn round_rejects_wrong_discriminator() {
        let mut buf = encode_round(&sample_round());
        buf[0] ^= 0xFF;
        assert!(RoundAccount::decode(&buf).is_err());
    }

    #[test]
    fn round_rejects_count_over_capacity() {
        let mut buf = encode_round(&sample_round());
        let off = DISCRIMINATOR_LEN + 88;
        buf[off..off + 2].copy_from_slice(&201u16.to_le_bytes());
        let err = RoundAccount::decode(&buf).unwrap_err();
        assert!(matches!(err, CrankError::MalformedAccount { kind: "Round", .. }));
    }

    #[test]
    fn settled_round_winning_ticket_must_be_in_range() {
        let mut round = sample_round();
        round.status = RoundStatus::Settled;
        round.randomness = [0xAB; 32];
        round.winner = pk(11);

        round.winning_ticket = 196; // total_tickets - 1
        assert!(RoundAccount::decode(&encode_round(&round)).is_ok());

        round.winning_ticket = 197; // == total_tickets
        assert!(RoundAccount::decode(&encode_round(&round)).is_err());

        // A cancelled round never settles; zeroed winner fields are fine.
        round.status = RoundStatus::Cancelled;
        round.winning_ticket = 0;
        round.winner = Pubkey::default();
        round.randomness = [0u8; 32];
        assert!(RoundAccount::decode(&encode_round(&round)).is_ok());
    }

    #[test]
    fn round_rejects_unknown_status() {
        let mut buf = encode_round(&sample_round());
        buf[DISCRIMINATOR_LEN + 8] = 9;
        assert!(RoundAccount::decode(&buf).is_err());
    }

    #[test]
    fn config_round_trip() {
        let config = ConfigAccount {
            admin: pk(1),
            usdc_mint: pk(2),
            treasury_usdc_ata: pk(3),
            fee_bps: 500,
            ticket_unit: 10_000,
            round_duration_sec: 600,
            min_participants: 2,
            min_total_tickets: 10,
            paused: false,
            bump: 255,
            max_deposit_per_user: 0,
        };
        assert_eq!(ConfigAccount::decode(&encode_config(&config)).unwrap(), config);
    }

    #[test]
    fn participant_round_trip() {
        let p = ParticipantAccount {
            round: pk(4),
            user: pk(5),
            index: 17,
            bump: 253,
            tickets_total: 44,
            usdc_total: 440_000,
            deposits_count: 3,
        };
        assert_eq!(ParticipantAccount::decode(&encode_participant(&p)).unwrap(), p);
    }

    #[test]
    fn degen_config_round_trip() {
        let c = DegenConfigAccount {
            executor: pk(6),
            fallback_timeout_sec: 300,
            bump: 252,
        };
        assert_eq!(DegenConfigAccount::decode(&encode_degen_config(&c)).unwrap(), c);
    }

    #[test]
    fn degen_claim_round_trip() {
        let d = DegenClaimAccount {
            round: pk(8),
            winner: pk(11),
            round_id: 42,
            status: DegenClaimStatus::VrfReady,
            bump: 250,
            selected_candidate_rank: 0,
            fallback_reason: 0,
            token_index: 3,
            pool_version: 1,
            candidate_window: 10,
            requested_at: 1_700_000_700,
            fulfilled_at: 1_700_000_760,
            claimed_at: 0,
            fallback_after_ts: 1_700_001_060,
            payout_raw: 1_800_000,
            min_out_raw: 1_750_000,
            receiver_pre_balance: 0,
            token_mint: pk(13),
            executor: pk(14),
            receiver_token_ata: pk(15),
            randomness: [0x5A; 32],
            route_hash: [0x42; 32],
        };
        assert_eq!(DegenClaimAccount::decode(&encode_degen_claim(&d)).unwrap(), d);
    }

    #[test]
    fn status_ordering_supports_settled_gates() {
        assert!(RoundStatus::Settled >= RoundStatus::Settled);
        assert!(RoundStatus::Claimed >= RoundStatus::Settled);
        assert!(RoundStatus::VrfRequested < RoundStatus::Settled);
        assert!(RoundStatus::Claimed.is_terminal());
        assert!(RoundStatus::Cancelled.is_terminal());
        assert!(!RoundStatus::Open.is_terminal());
    }

    #[test]
    fn clock_timestamp_decodes_from_sysvar_bytes() {
        let mut data = vec![0u8; CLOCK_ACCOUNT_LEN];
        data[32..40].copy_from_slice(&1_700_000_123i64.to_le_bytes());
        assert_eq!(decode_clock_unix_timestamp(&data).unwrap(), 1_700_000_123);
        assert!(decode_clock_unix_timestamp(&data[..31]).is_err());
    }
}
