use anyhow::Result;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::env;

/// Configuration for the jackpot crank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrankConfig {
    // On-chain identity
    pub rpc_url: String,
    pub program_id: String,
    pub vrf_program_id: String,
    pub oracle_queue: String,

    // Wallet (base58 private key); validated non-empty before submission
    pub wallet_private_key: String,

    // Driver behavior
    pub poll_interval_ms: u64,     // Round poll frequency (default: 2000ms)
    pub starting_round_id: u64,    // Where round discovery starts probing
    pub discovery_gap_limit: u32,  // Consecutive closed-round gaps probed past
    pub auto_claim: bool,          // Submit auto_claim for settled rounds
    pub mock_settle: bool,         // Devnet-style deployment: settle via mock_settle
    pub max_strikes: u32,          // Failures before a round is parked

    // Submission / confirmation
    pub request_timeout_ms: u64,   // Per-RPC-call timeout (default: 10s)
    pub confirm_timeout_ms: u64,   // Total wait for a signature (default: 30s)
    pub confirm_poll_ms: u64,      // Signature status poll interval (default: 2s)
    pub max_retries: u32,          // Transport retries per submission (default: 3)

    // Degen execution
    pub degen_token_pool: Vec<String>, // Candidate mints, empty = degen disabled
    pub degen_pool_version: u32,       // Must match DegenClaim.pool_version

    // Social notifications (disabled when base URL is empty)
    pub social_api_base: String,
    pub notify_queue_size: usize,
    pub loss_post_delay_ms: u64, // Delay between successive loss posts
}

impl CrankConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env if exists

        Ok(Self {
            rpc_url: env::var("RPC_URL")
                .unwrap_or_else(|_| "https://api.mainnet-beta.solana.com".to_string()),
            program_id: env::var("JACKPOT_PROGRAM_ID").unwrap_or_default(),
            vrf_program_id: env::var("VRF_PROGRAM_ID").unwrap_or_default(),
            oracle_queue: env::var("ORACLE_QUEUE").unwrap_or_default(),

            wallet_private_key: env::var("CRANK_WALLET_PRIVATE_KEY").unwrap_or_default(),

            poll_interval_ms: env::var("POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()?,
            starting_round_id: env::var("STARTING_ROUND_ID")
                .unwrap_or_else(|_| "1".to_string())
                .parse()?,
            discovery_gap_limit: env::var("DISCOVERY_GAP_LIMIT")
                .unwrap_or_else(|_| "25".to_string())
                .parse()?,
            auto_claim: env::var("AUTO_CLAIM").unwrap_or_else(|_| "true".to_string()) == "true",
            mock_settle: env::var("MOCK_SETTLE").unwrap_or_else(|_| "false".to_string())
                == "true",
            max_strikes: env::var("MAX_STRIKES")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,

            request_timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()?,
            confirm_timeout_ms: env::var("CONFIRM_TIMEOUT_MS")
                .unwrap_or_else(|_| "30000".to_string())
                .parse()?,
            confirm_poll_ms: env::var("CONFIRM_POLL_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()?,
            max_retries: env::var("MAX_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()?,

            degen_token_pool: env::var("DEGEN_TOKEN_POOL")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            degen_pool_version: env::var("DEGEN_POOL_VERSION")
                .unwrap_or_else(|_| "1".to_string())
                .parse()?,

            social_api_base: env::var("SOCIAL_API_BASE").unwrap_or_default(),
            notify_queue_size: env::var("NOTIFY_QUEUE_SIZE")
                .unwrap_or_else(|_| "256".to_string())
                .parse()?,
            loss_post_delay_ms: env::var("LOSS_POST_DELAY_MS")
                .unwrap_or_else(|_| "500".to_string())
                .parse()?,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.program_id.parse::<Pubkey>().is_err() {
            anyhow::bail!("JACKPOT_PROGRAM_ID must be a valid pubkey");
        }
        if self.wallet_private_key.is_empty() {
            anyhow::bail!("CRANK_WALLET_PRIVATE_KEY must be set");
        }
        if !self.mock_settle {
            if self.vrf_program_id.parse::<Pubkey>().is_err() {
                anyhow::bail!("VRF_PROGRAM_ID must be a valid pubkey");
            }
            if self.oracle_queue.parse::<Pubkey>().is_err() {
                anyhow::bail!("ORACLE_QUEUE must be a valid pubkey");
            }
        }
        if self.poll_interval_ms < 250 || self.poll_interval_ms > 60_000 {
            anyhow::bail!("POLL_INTERVAL_MS must be between 250 and 60000");
        }
        if self.max_retries == 0 || self.max_retries > 10 {
            anyhow::bail!("MAX_RETRIES must be between 1 and 10");
        }
        if self.max_strikes == 0 {
            anyhow::bail!("MAX_STRIKES must be at least 1");
        }
        if self.confirm_poll_ms == 0 || self.confirm_poll_ms > self.confirm_timeout_ms {
            anyhow::bail!("CONFIRM_POLL_MS must be nonzero and below CONFIRM_TIMEOUT_MS");
        }
        for mint in &self.degen_token_pool {
            if mint.parse::<Pubkey>().is_err() {
                anyhow::bail!("DEGEN_TOKEN_POOL contains an invalid mint: {}", mint);
            }
        }
        Ok(())
    }

    pub fn degen_enabled(&self) -> bool {
        !self.degen_token_pool.is_empty()
    }

    pub fn notifications_enabled(&self) -> bool {
        !self.social_api_base.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> CrankConfig {
        CrankConfig {
            rpc_url: "http://localhost:8899".to_string(),
            program_id: Pubkey::new_from_array([1; 32]).to_string(),
            vrf_program_id: Pubkey::new_from_array([2; 32]).to_string(),
            oracle_queue: Pubkey::new_from_array([3; 32]).to_string(),
            wallet_private_key: "key".to_string(),
            poll_interval_ms: 2000,
            starting_round_id: 1,
            discovery_gap_limit: 25,
            auto_claim: true,
            mock_settle: false,
            max_strikes: 5,
            request_timeout_ms: 10_000,
            confirm_timeout_ms: 30_000,
            confirm_poll_ms: 2000,
            max_retries: 3,
            degen_token_pool: vec![],
            degen_pool_version: 1,
            social_api_base: String::new(),
            notify_queue_size: 256,
            loss_post_delay_ms: 500,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn rejects_bad_program_id() {
        let mut cfg = base_config();
        cfg.program_id = "not-a-pubkey".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_missing_wallet() {
        let mut cfg = base_config();
        cfg.wallet_private_key = String::new();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn mock_settle_skips_vrf_identity_checks() {
        let mut cfg = base_config();
        cfg.mock_settle = true;
        cfg.vrf_program_id = String::new();
        cfg.oracle_queue = String::new();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_poll_interval_out_of_bounds() {
        let mut cfg = base_config();
        cfg.poll_interval_ms = 100;
        assert!(cfg.validate().is_err());
        cfg.poll_interval_ms = 120_000;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_max_strikes() {
        let mut cfg = base_config();
        cfg.max_strikes = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_invalid_pool_mint() {
        let mut cfg = base_config();
        cfg.degen_token_pool = vec!["bogus".to_string()];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn degen_enabled_tracks_pool() {
        let mut cfg = base_config();
        assert!(!cfg.degen_enabled());
        cfg.degen_token_pool = vec![Pubkey::new_from_array([4; 32]).to_string()];
        assert!(cfg.degen_enabled());
    }
}
