//! Bot entry-point: loads settings, wires adapters, and runs the poll driver
//! alongside the Telegram update loop until interrupted.

use std::sync::Arc;

use color_eyre::eyre::{WrapErr, eyre};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use flightwatch::AppSettings;
use flightwatch::domain::{PollCycleDriver, PollDriverPorts, SubscriptionService, polled_origins};
use flightwatch::inbound::telegram::{CommandDispatcher, TelegramUpdates, UpdateLoopConfig};
use flightwatch::outbound::persistence::{
    DbPool, DieselSnapshotRepository, DieselSubscriptionRepository, run_pending_migrations,
};
use flightwatch::outbound::telegram::TelegramNotificationChannel;
use flightwatch::outbound::ticketing::TicketingHttpSource;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load_from_iter(std::env::args_os())
        .map_err(|error| eyre!("failed to load configuration: {error}"))?;
    info!(?settings, "configuration loaded");

    let database_url = settings.database_url()?;
    if settings.run_migrations {
        let applied = run_pending_migrations(database_url)
            .await
            .wrap_err("database migrations failed")?;
        info!(applied, "database migrations complete");
    }

    let pool = DbPool::new(settings.pool_config()?)
        .await
        .wrap_err("failed to build database pool")?;
    let snapshots = Arc::new(DieselSnapshotRepository::new(pool.clone()));
    let subscriptions = Arc::new(DieselSubscriptionRepository::new(pool));

    let token = settings.telegram_token()?;
    let api_base = settings.telegram_api_base()?;
    let channel = Arc::new(
        TelegramNotificationChannel::new(&api_base, token, settings.fetch_timeout())
            .wrap_err("failed to build Telegram channel")?,
    );
    let source = Arc::new(
        TicketingHttpSource::new(settings.ticketing_base_url()?, settings.fetch_timeout())
            .wrap_err("failed to build ticketing client")?,
    );

    let driver = Arc::new(PollCycleDriver::new(
        PollDriverPorts::new(source, snapshots.clone(), subscriptions.clone(), channel.clone()),
        polled_origins(),
        Arc::new(DefaultClock),
        settings.poll_driver_config(),
    ));
    let updates = TelegramUpdates::new(api_base, token, UpdateLoopConfig::default())
        .wrap_err("failed to build Telegram update client")?;
    let dispatcher = CommandDispatcher::new(
        SubscriptionService::new(subscriptions, snapshots),
        channel,
    );

    if let Err(error) = updates.register_commands().await {
        warn!(%error, "could not register bot commands");
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    let poller = tokio::spawn(driver.run(stopped(stop_rx.clone())));
    let bot = updates.run(&dispatcher, stopped(stop_rx));

    tokio::pin!(bot);
    let interrupted = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(error) = signal {
                error!(%error, "failed to listen for ctrl-c");
            }
            true
        }
        () = &mut bot => false,
    };

    stop_tx.send_replace(true);
    if interrupted {
        info!("shutdown requested");
        bot.await;
    } else {
        warn!("update loop exited unexpectedly");
    }

    poller.await.wrap_err("poll driver task failed")?;
    info!("shutdown complete");
    Ok(())
}

async fn stopped(mut stop: watch::Receiver<bool>) {
    if stop.wait_for(|stop| *stop).await.is_err() {
        warn!("shutdown sender dropped; stopping");
    }
}
