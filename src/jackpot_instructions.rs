// jackpot_instructions.rs — instruction builders for the jackpot program
//
// Every builder is pure: it derives the PDAs it can, serializes the
// discriminator + little-endian args, and returns a ready Instruction.
// Account orders must match the program's Accounts structs exactly.
//
// Optional accounts follow the Anchor convention: a `None` slot is encoded
// as a read-only meta carrying the program id itself.

use anyhow::Result;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
    sysvar::slot_hashes,
};

use crate::jackpot_layout::anchor_discriminator;
use crate::jackpot_pda;

// SPL Token program (mainnet-beta and devnet share this id).
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
pub const ASSOCIATED_TOKEN_PROGRAM_ID: &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";

/// 8-byte Anchor instruction discriminator: `sha256("global:<name>")[..8]`.
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    anchor_discriminator("global", name)
}

/// Associated token account for `owner`/`mint`. The payout destinations the
/// program enforces are all canonical ATAs, so the crank derives them instead
/// of scanning token accounts.
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Result<Pubkey> {
    let token_program = TOKEN_PROGRAM_ID.parse::<Pubkey>()?;
    let ata_program = ASSOCIATED_TOKEN_PROGRAM_ID.parse::<Pubkey>()?;
    let (address, _) = Pubkey::find_program_address(
        &[owner.as_ref(), token_program.as_ref(), mint.as_ref()],
        &ata_program,
    );
    Ok(address)
}

fn none_marker(program_id: &Pubkey) -> AccountMeta {
    AccountMeta::new_readonly(*program_id, false)
}

fn optional_meta(program_id: &Pubkey, key: Option<Pubkey>, writable: bool) -> AccountMeta {
    match key {
        Some(k) if writable => AccountMeta::new(k, false),
        Some(k) => AccountMeta::new_readonly(k, false),
        None => none_marker(program_id),
    }
}

fn data_with_round_id(name: &str, round_id: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(16);
    data.extend_from_slice(&instruction_discriminator(name));
    data.extend_from_slice(&round_id.to_le_bytes());
    data
}

/// `lock_round(round_id)` — permissionless; flips an ended Open round to Locked.
pub fn build_lock_round(program_id: &Pubkey, caller: Pubkey, round_id: u64) -> Instruction {
    let (config, _) = jackpot_pda::config_address(program_id);
    let (round, _) = jackpot_pda::round_address(program_id, round_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(caller, true),
            AccountMeta::new_readonly(config, false),
            AccountMeta::new(round, false),
        ],
        data: data_with_round_id("lock_round", round_id),
    }
}

/// `request_vrf(round_id)` — payer funds the oracle request and is recorded
/// on the round for later reimbursement.
pub fn build_request_vrf(
    program_id: &Pubkey,
    payer: Pubkey,
    round_id: u64,
    oracle_queue: Pubkey,
    vrf_program: Pubkey,
) -> Instruction {
    let (config, _) = jackpot_pda::config_address(program_id);
    let (round, _) = jackpot_pda::round_address(program_id, round_id);
    let (identity, _) = jackpot_pda::identity_address(program_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(payer, true),
            AccountMeta::new_readonly(config, false),
            AccountMeta::new(round, false),
            AccountMeta::new_readonly(identity, false),
            AccountMeta::new(oracle_queue, false),
            AccountMeta::new_readonly(vrf_program, false),
            AccountMeta::new_readonly(slot_hashes::ID, false),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
        data: data_with_round_id("request_vrf", round_id),
    }
}

/// `mock_settle(round_id, randomness)` — devnet settle path, admin only.
/// Production deployments settle through the oracle callback instead.
pub fn build_mock_settle(
    program_id: &Pubkey,
    admin: Pubkey,
    round_id: u64,
    randomness: [u8; 32],
) -> Instruction {
    let (config, _) = jackpot_pda::config_address(program_id);
    let (round, _) = jackpot_pda::round_address(program_id, round_id);
    let mut data = data_with_round_id("mock_settle", round_id);
    data.extend_from_slice(&randomness);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(admin, true),
            AccountMeta::new_readonly(config, false),
            AccountMeta::new(round, false),
        ],
        data,
    }
}

/// `claim(round_id)` — winner-signed payout of a settled plain round.
#[allow(clippy::too_many_arguments)]
pub fn build_claim(
    program_id: &Pubkey,
    winner: Pubkey,
    round_id: u64,
    vault_usdc_ata: Pubkey,
    winner_usdc_ata: Pubkey,
    treasury_usdc_ata: Pubkey,
    vrf_payer_usdc_ata: Option<Pubkey>,
) -> Result<Instruction> {
    let token_program = TOKEN_PROGRAM_ID.parse::<Pubkey>()?;
    let (config, _) = jackpot_pda::config_address(program_id);
    let (round, _) = jackpot_pda::round_address(program_id, round_id);
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(winner, true),
            AccountMeta::new_readonly(config, false),
            AccountMeta::new(round, false),
            AccountMeta::new(vault_usdc_ata, false),
            AccountMeta::new(winner_usdc_ata, false),
            AccountMeta::new(treasury_usdc_ata, false),
            optional_meta(program_id, vrf_payer_usdc_ata, true),
            AccountMeta::new_readonly(token_program, false),
        ],
        data: data_with_round_id("claim", round_id),
    })
}

/// `auto_claim(round_id)` — any caller pays out the on-chain winner. Same
/// account shape as `claim` but the signer is the caller and the payout
/// destination stays the winner's ATA.
#[allow(clippy::too_many_arguments)]
pub fn build_auto_claim(
    program_id: &Pubkey,
    caller: Pubkey,
    round_id: u64,
    vault_usdc_ata: Pubkey,
    winner_usdc_ata: Pubkey,
    treasury_usdc_ata: Pubkey,
    vrf_payer_usdc_ata: Option<Pubkey>,
) -> Result<Instruction> {
    let token_program = TOKEN_PROGRAM_ID.parse::<Pubkey>()?;
    let (config, _) = jackpot_pda::config_address(program_id);
    let (round, _) = jackpot_pda::round_address(program_id, round_id);
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(caller, true),
            AccountMeta::new_readonly(config, false),
            AccountMeta::new(round, false),
            AccountMeta::new(vault_usdc_ata, false),
            AccountMeta::new(winner_usdc_ata, false),
            AccountMeta::new(treasury_usdc_ata, false),
            optional_meta(program_id, vrf_payer_usdc_ata, true),
            AccountMeta::new_readonly(token_program, false),
        ],
        data: data_with_round_id("auto_claim", round_id),
    })
}

/// `claim_refund(round_id)` — returns a participant's deposit from a
/// cancelled round and closes the participant record.
pub fn build_claim_refund(
    program_id: &Pubkey,
    user: Pubkey,
    round_id: u64,
    vault_usdc_ata: Pubkey,
    user_usdc_ata: Pubkey,
) -> Result<Instruction> {
    let token_program = TOKEN_PROGRAM_ID.parse::<Pubkey>()?;
    let (config, _) = jackpot_pda::config_address(program_id);
    let (round, _) = jackpot_pda::round_address(program_id, round_id);
    let (participant, _) = jackpot_pda::participant_address(program_id, &round, &user);
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(user, true),
            AccountMeta::new_readonly(config, false),
            AccountMeta::new(round, false),
            AccountMeta::new(participant, false),
            AccountMeta::new(vault_usdc_ata, false),
            AccountMeta::new(user_usdc_ata, false),
            AccountMeta::new_readonly(token_program, false),
        ],
        data: data_with_round_id("claim_refund", round_id),
    })
}

/// `admin_force_cancel(round_id)` — admin-only cancel of a stuck round.
pub fn build_admin_force_cancel(program_id: &Pubkey, admin: Pubkey, round_id: u64) -> Instruction {
    let (config, _) = jackpot_pda::config_address(program_id);
    let (round, _) = jackpot_pda::round_address(program_id, round_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(admin, true),
            AccountMeta::new_readonly(config, false),
            AccountMeta::new(round, false),
        ],
        data: data_with_round_id("admin_force_cancel", round_id),
    }
}

/// Args for `begin_degen_execution`; serialized after the round id in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeginDegenArgs {
    pub candidate_rank: u8,
    pub token_index: u32,
    pub min_out_raw: u64,
    pub route_hash: [u8; 32],
}

/// `begin_degen_execution(...)` — degen executor moves a VrfReady claim into
/// Executing and commits to a route. Executor must match `DegenConfig.executor`
/// on-chain; the driver checks this locally before building.
#[allow(clippy::too_many_arguments)]
pub fn build_begin_degen_execution(
    program_id: &Pubkey,
    executor: Pubkey,
    round_id: u64,
    winner: Pubkey,
    args: &BeginDegenArgs,
    vault_usdc_ata: Pubkey,
    executor_usdc_ata: Pubkey,
    treasury_usdc_ata: Pubkey,
    vrf_payer: Option<(Pubkey, Pubkey)>,
    selected_token_mint: Pubkey,
    receiver_token_ata: Pubkey,
) -> Result<Instruction> {
    let token_program = TOKEN_PROGRAM_ID.parse::<Pubkey>()?;
    let (config, _) = jackpot_pda::config_address(program_id);
    let (degen_config, _) = jackpot_pda::degen_config_address(program_id);
    let (round, _) = jackpot_pda::round_address(program_id, round_id);
    let (degen_claim, _) = jackpot_pda::degen_claim_address(program_id, round_id, &winner);

    let mut data = data_with_round_id("begin_degen_execution", round_id);
    data.push(args.candidate_rank);
    data.extend_from_slice(&args.token_index.to_le_bytes());
    data.extend_from_slice(&args.min_out_raw.to_le_bytes());
    data.extend_from_slice(&args.route_hash);

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(executor, true),
            AccountMeta::new_readonly(config, false),
            AccountMeta::new_readonly(degen_config, false),
            AccountMeta::new(round, false),
            AccountMeta::new(degen_claim, false),
            AccountMeta::new(vault_usdc_ata, false),
            AccountMeta::new(executor_usdc_ata, false),
            AccountMeta::new(treasury_usdc_ata, false),
            optional_meta(program_id, vrf_payer.map(|(authority, _)| authority), true),
            optional_meta(program_id, vrf_payer.map(|(_, ata)| ata), true),
            AccountMeta::new_readonly(selected_token_mint, false),
            AccountMeta::new(receiver_token_ata, false),
            AccountMeta::new_readonly(token_program, false),
        ],
        data,
    })
}

/// `auto_claim_degen_fallback(round_id, fallback_reason)` — permissionless
/// USDC fallback for a degen claim whose swap never completed in time. The
/// payout always lands in the winner's ATA regardless of who signs.
#[allow(clippy::too_many_arguments)]
pub fn build_auto_claim_degen_fallback(
    program_id: &Pubkey,
    caller: Pubkey,
    round_id: u64,
    winner: Pubkey,
    fallback_reason: u8,
    vault_usdc_ata: Pubkey,
    winner_usdc_ata: Pubkey,
    treasury_usdc_ata: Pubkey,
    vrf_payer: Option<(Pubkey, Pubkey)>,
) -> Result<Instruction> {
    let token_program = TOKEN_PROGRAM_ID.parse::<Pubkey>()?;
    let (config, _) = jackpot_pda::config_address(program_id);
    let (round, _) = jackpot_pda::round_address(program_id, round_id);
    let (degen_claim, _) = jackpot_pda::degen_claim_address(program_id, round_id, &winner);

    let mut data = data_with_round_id("auto_claim_degen_fallback", round_id);
    data.push(fallback_reason);

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(caller, true),
            AccountMeta::new_readonly(config, false),
            AccountMeta::new(round, false),
            AccountMeta::new(degen_claim, false),
            AccountMeta::new(vault_usdc_ata, false),
            AccountMeta::new(winner_usdc_ata, false),
            AccountMeta::new(treasury_usdc_ata, false),
            optional_meta(program_id, vrf_payer.map(|(authority, _)| authority), true),
            optional_meta(program_id, vrf_payer.map(|(_, ata)| ata), true),
            AccountMeta::new_readonly(token_program, false),
        ],
        data,
    })
}
