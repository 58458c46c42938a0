use chrono::{DateTime, Timelike, Utc};
use tracing_subscriber::EnvFilter;

use guild_raid_sync::config::Config;
use guild_raid_sync::cycle;
use guild_raid_sync::sheets::SheetsClient;
use guild_raid_sync::store::RaidStore;
use guild_raid_sync::tacticus::TacticusClient;

/// Daily run time, UTC. Shortly before the in-game daily reset.
const SCHEDULE_HOUR: u32 = 8;
const SCHEDULE_MINUTE: u32 = 55;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("guild_raid_sync=info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("missing configuration: {e}");
            std::process::exit(1);
        }
    };

    let store = RaidStore::open_in_memory()?;
    let api = TacticusClient::new(config.api_key)?;
    let sink = SheetsClient::new(config.spreadsheet_id, &config.google_credentials)?;

    // An explicit season argument means a single immediate cycle.
    if let Some(season) = std::env::args().nth(1) {
        return cycle::run_cycle(&store, &api, &sink, Some(&season)).await;
    }

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let wait = until_next_run(Utc::now());
        tracing::info!("next cycle in {}s", wait.as_secs());

        // Shutdown is only honored between cycles: once the sleep elapses the
        // cycle runs to completion or failure, never half-aborted.
        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                if let Err(e) = cycle::run_cycle(&store, &api, &sink, None).await {
                    tracing::error!("cycle failed: {e:#}");
                }
            }
            _ = &mut shutdown => {
                tracing::info!("shutdown requested, exiting");
                break;
            }
        }
    }

    Ok(())
}

/// Time until the next scheduled daily run.
fn until_next_run(now: DateTime<Utc>) -> std::time::Duration {
    let today = now
        .with_hour(SCHEDULE_HOUR)
        .and_then(|t| t.with_minute(SCHEDULE_MINUTE))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    let next = if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    };
    (next - now).to_std().unwrap_or_default()
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(_) => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}
