// social_notify.rs — fire-and-forget settlement notifications
//
// The driver publishes a SettlementEvent per settled round; a background
// worker resolves the winner's social profile and creates "win"/"loss"
// content items over HTTP. The publish handle returns () and the channel is
// bounded, so a slow or broken social API can never stall or steer the
// round state machine.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const HTTP_TIMEOUT_SECS: u64 = 5;

/// One settled round, as handed off by the driver. Published exactly once
/// per round; the worker re-keys every item it creates so a crashed and
/// restarted crank re-delivering the event stays idempotent server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementEvent {
    pub round_id: u64,
    pub winner: String,
    pub payout_usdc: u64,
    pub participants: Vec<String>,
    pub timestamp: String, // RFC 3339, on-chain settle observation time
}

impl SettlementEvent {
    pub fn new(round_id: u64, winner: Pubkey, payout_usdc: u64, participants: &[Pubkey]) -> Self {
        Self {
            round_id,
            winner: winner.to_string(),
            payout_usdc,
            participants: participants.iter().map(|p| p.to_string()).collect(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ContentItem<'a> {
    profile: &'a str,
    event_type: &'a str,
    round_id: u64,
    idempotency_key: String,
    payout_usdc: u64,
    timestamp: &'a str,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    handle: String,
}

/// `(profile, event_type, round_id)` — the server dedupes on this.
pub fn idempotency_key(profile: &str, event_type: &str, round_id: u64) -> String {
    format!("{profile}:{event_type}:{round_id}")
}

/// Cloneable publish handle. Dropping every handle shuts the worker down
/// once the queue drains.
#[derive(Clone)]
pub struct NotifyHandle {
    tx: Option<mpsc::Sender<SettlementEvent>>,
}

impl NotifyHandle {
    /// Disabled sink; publishes are dropped silently.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Handle over a caller-owned channel, so tests can observe what a
    /// publisher delivers without spinning up the HTTP worker.
    #[cfg(test)]
    pub(crate) fn with_sender(tx: mpsc::Sender<SettlementEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Never blocks, never errors. A full queue drops the event with a
    /// warning; settlement notification is best-effort by design.
    pub fn publish(&self, event: SettlementEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(
                    "notify queue full, dropping settlement event for round {}",
                    event.round_id
                );
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                warn!(
                    "notify worker gone, dropping settlement event for round {}",
                    event.round_id
                );
            }
        }
    }
}

/// Spawn the worker and return its publish handle.
pub fn spawn_notifier(
    api_base: String,
    queue_size: usize,
    loss_post_delay: Duration,
) -> NotifyHandle {
    let (tx, rx) = mpsc::channel(queue_size);
    let client = Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .unwrap_or_default();
    tokio::spawn(worker(client, api_base, rx, loss_post_delay));
    NotifyHandle { tx: Some(tx) }
}

async fn worker(
    client: Client,
    api_base: String,
    mut rx: mpsc::Receiver<SettlementEvent>,
    loss_post_delay: Duration,
) {
    while let Some(event) = rx.recv().await {
        debug!("notifying settlement of round {}", event.round_id);

        let winner_profile = resolve_profile(&client, &api_base, &event.winner).await;
        let item = ContentItem {
            profile: &winner_profile,
            event_type: "win",
            round_id: event.round_id,
            idempotency_key: idempotency_key(&winner_profile, "win", event.round_id),
            payout_usdc: event.payout_usdc,
            timestamp: &event.timestamp,
        };
        post_with_retry(&client, &api_base, &item).await;

        for wallet in event.participants.iter().filter(|w| **w != event.winner) {
            let profile = resolve_profile(&client, &api_base, wallet).await;
            let item = ContentItem {
                profile: &profile,
                event_type: "loss",
                round_id: event.round_id,
                idempotency_key: idempotency_key(&profile, "loss", event.round_id),
                payout_usdc: 0,
                timestamp: &event.timestamp,
            };
            post_with_retry(&client, &api_base, &item).await;
            // Pace loss posts so a 200-participant round does not burst the API
            tokio::time::sleep(loss_post_delay).await;
        }
    }
    debug!("notify worker shutting down");
}

/// Wallet -> social handle; falls back to the wallet address itself when no
/// profile exists or the lookup fails.
async fn resolve_profile(client: &Client, api_base: &str, wallet: &str) -> String {
    let url = format!("{api_base}/profiles/{wallet}");
    for attempt in 0..2 {
        match client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                match resp.json::<ProfileResponse>().await {
                    Ok(profile) => return profile.handle,
                    Err(e) => {
                        debug!("bad profile payload for {}: {}", wallet, e);
                        return wallet.to_string();
                    }
                }
            }
            Ok(resp) if resp.status().as_u16() == 404 => return wallet.to_string(),
            Ok(resp) => {
                debug!("profile lookup {} -> HTTP {}", wallet, resp.status());
            }
            Err(e) => {
                debug!("profile lookup failed for {} (attempt {}): {}", wallet, attempt, e);
            }
        }
    }
    wallet.to_string()
}

/// At most one retry; failures are logged and swallowed.
async fn post_with_retry(client: &Client, api_base: &str, item: &ContentItem<'_>) {
    let url = format!("{api_base}/content");
    for attempt in 0..2 {
        match client.post(&url).json(item).send().await {
            Ok(resp) if resp.status().is_success() => return,
            Ok(resp) => {
                warn!(
                    "content post {} (round {}) -> HTTP {} (attempt {})",
                    item.event_type,
                    item.round_id,
                    resp.status(),
                    attempt
                );
            }
            Err(e) => {
                warn!(
                    "content post {} (round {}) failed (attempt {}): {}",
                    item.event_type, item.round_id, attempt, e
                );
            }
        }
    }
}
