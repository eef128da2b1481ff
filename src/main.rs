use anyhow::Result;
use jackpot_crank::{spawn_notifier, CrankConfig, NotifyHandle, RoundDriver};
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("🎰 Jackpot Crank v0.4.0");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // Load configuration
    let config = match CrankConfig::from_env() {
        Ok(cfg) => {
            info!("✅ Configuration loaded from environment");
            cfg
        }
        Err(e) => {
            error!("❌ Failed to load configuration: {}", e);
            error!("💡 Tip: Create a .env file with required settings");
            return Err(e);
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("❌ Configuration validation failed: {}", e);
        return Err(e);
    }

    print_config_summary(&config);

    // Notification sink (no-op unless a social API base is configured)
    let notifier = if config.notifications_enabled() {
        spawn_notifier(
            config.social_api_base.clone(),
            config.notify_queue_size,
            Duration::from_millis(config.loss_post_delay_ms),
        )
    } else {
        NotifyHandle::disabled()
    };

    let mut driver = RoundDriver::new(config, notifier).await?;

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("🚀 Starting round driver...");

    if let Err(e) = driver.run().await {
        error!("❌ Round driver exited: {}", e);
        return Err(e);
    }
    Ok(())
}

fn print_config_summary(config: &CrankConfig) {
    info!("⚙️  Configuration Summary:");
    info!("   RPC: {}", config.rpc_url);
    info!("   Program: {}", config.program_id);
    info!(
        "   Mode: {}",
        if config.mock_settle {
            "🧪 MOCK SETTLE (devnet-style)"
        } else {
            "🎲 ORACLE VRF"
        }
    );
    info!("   Poll interval: {}ms", config.poll_interval_ms);
    info!(
        "   Auto-claim: {}",
        if config.auto_claim { "on" } else { "off" }
    );
    info!(
        "   Degen pool: {} mints (version {})",
        config.degen_token_pool.len(),
        config.degen_pool_version
    );
    info!(
        "   Notifications: {}",
        if config.notifications_enabled() {
            config.social_api_base.as_str()
        } else {
            "disabled"
        }
    );
}
