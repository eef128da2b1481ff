// jackpot_rpc.rs — RPC access for the jackpot crank
//
// Thin wrapper over the nonblocking RpcClient: fetch + decode each account
// type, read the on-chain clock, submit transactions, poll confirmations.
// Every call is bounded by a timeout so one stalled RPC node cannot wedge
// the driver loop.

use std::time::Duration;

use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
    rpc_request::{RpcError, RpcResponseErrorData},
};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    instruction::InstructionError,
    pubkey::Pubkey,
    signature::Signature,
    sysvar,
    transaction::{Transaction, TransactionError},
};
use tracing::debug;

use crate::error::CrankError;
use crate::jackpot_layout::{
    decode_clock_unix_timestamp, ConfigAccount, DegenClaimAccount, DegenConfigAccount,
    RoundAccount,
};
use crate::jackpot_pda;

/// Custom Anchor error code carried by a failed instruction, if any.
pub fn custom_error_code(err: &ClientError) -> Option<u32> {
    match err.kind() {
        ClientErrorKind::TransactionError(TransactionError::InstructionError(
            _,
            InstructionError::Custom(code),
        )) => Some(*code),
        ClientErrorKind::RpcError(RpcError::RpcResponseError {
            data: RpcResponseErrorData::SendTransactionPreflightFailure(sim),
            ..
        }) => match sim.err {
            Some(TransactionError::InstructionError(_, InstructionError::Custom(code))) => {
                Some(code)
            }
            _ => None,
        },
        _ => None,
    }
}

fn map_send_error(err: ClientError) -> CrankError {
    match custom_error_code(&err) {
        Some(code) => CrankError::OnChainRejection(code),
        None => CrankError::Transport(err.to_string()),
    }
}

fn transport(err: impl std::fmt::Display) -> CrankError {
    CrankError::Transport(err.to_string())
}

pub struct JackpotRpc {
    rpc: RpcClient,
    request_timeout: Duration,
}

impl JackpotRpc {
    pub fn new(rpc_url: String, request_timeout: Duration) -> Self {
        Self {
            rpc: RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed()),
            request_timeout,
        }
    }

    async fn fetch_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, CrankError> {
        let fut = self
            .rpc
            .get_account_with_commitment(address, CommitmentConfig::confirmed());
        let response = tokio::time::timeout(self.request_timeout, fut)
            .await
            .map_err(|_| CrankError::Transport(format!("timeout fetching {address}")))?
            .map_err(transport)?;
        Ok(response.value.map(|account| account.data))
    }

    /// Global config PDA; `None` means the program is not initialized.
    pub async fn fetch_config(
        &self,
        program_id: &Pubkey,
    ) -> Result<Option<ConfigAccount>, CrankError> {
        let (address, _) = jackpot_pda::config_address(program_id);
        match self.fetch_account_data(&address).await? {
            Some(data) => Ok(Some(ConfigAccount::decode(&data)?)),
            None => Ok(None),
        }
    }

    /// Round PDA for `round_id`; `None` means the round was never started
    /// (or already closed out).
    pub async fn fetch_round(
        &self,
        program_id: &Pubkey,
        round_id: u64,
    ) -> Result<Option<RoundAccount>, CrankError> {
        let (address, _) = jackpot_pda::round_address(program_id, round_id);
        debug!("fetching round {} at {}", round_id, address);
        match self.fetch_account_data(&address).await? {
            Some(data) => Ok(Some(RoundAccount::decode(&data)?)),
            None => Ok(None),
        }
    }

    pub async fn fetch_degen_config(
        &self,
        program_id: &Pubkey,
    ) -> Result<Option<DegenConfigAccount>, CrankError> {
        let (address, _) = jackpot_pda::degen_config_address(program_id);
        match self.fetch_account_data(&address).await? {
            Some(data) => Ok(Some(DegenConfigAccount::decode(&data)?)),
            None => Ok(None),
        }
    }

    pub async fn fetch_degen_claim(
        &self,
        program_id: &Pubkey,
        round_id: u64,
        winner: &Pubkey,
    ) -> Result<Option<DegenClaimAccount>, CrankError> {
        let (address, _) = jackpot_pda::degen_claim_address(program_id, round_id, winner);
        match self.fetch_account_data(&address).await? {
            Some(data) => Ok(Some(DegenClaimAccount::decode(&data)?)),
            None => Ok(None),
        }
    }

    /// On-chain wall clock from the Clock sysvar. All timeout math uses this,
    /// never local time, so the crank agrees with the program about "now".
    pub async fn chain_unix_timestamp(&self) -> Result<i64, CrankError> {
        let data = self
            .fetch_account_data(&sysvar::clock::ID)
            .await?
            .ok_or_else(|| CrankError::Transport("clock sysvar missing".to_string()))?;
        decode_clock_unix_timestamp(&data)
    }

    pub async fn latest_blockhash(&self) -> Result<Hash, CrankError> {
        tokio::time::timeout(self.request_timeout, self.rpc.get_latest_blockhash())
            .await
            .map_err(|_| CrankError::Transport("timeout fetching blockhash".to_string()))?
            .map_err(transport)
    }

    /// Submit a signed transaction. On-chain program rejections come back as
    /// `OnChainRejection(code)` so the driver can classify them per
    /// transition; everything else is `Transport`.
    pub async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, CrankError> {
        tokio::time::timeout(self.request_timeout, self.rpc.send_transaction(tx))
            .await
            .map_err(|_| CrankError::Transport("timeout sending transaction".to_string()))?
            .map_err(map_send_error)
    }

    /// Poll a signature until it confirms, errors, or `deadline` elapses.
    pub async fn confirm_signature(
        &self,
        signature: &Signature,
        deadline: Duration,
        poll_interval: Duration,
    ) -> Result<(), CrankError> {
        let started = tokio::time::Instant::now();
        loop {
            let status = tokio::time::timeout(
                self.request_timeout,
                self.rpc.get_signature_status(signature),
            )
            .await
            .map_err(|_| CrankError::Transport("timeout polling signature".to_string()))?
            .map_err(transport)?;

            match status {
                Some(Ok(())) => return Ok(()),
                Some(Err(TransactionError::InstructionError(
                    _,
                    InstructionError::Custom(code),
                ))) => return Err(CrankError::OnChainRejection(code)),
                Some(Err(err)) => return Err(CrankError::Transport(err.to_string())),
                None => {}
            }

            if started.elapsed() >= deadline {
                return Err(CrankError::Unconfirmed(signature.to_string()));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}
