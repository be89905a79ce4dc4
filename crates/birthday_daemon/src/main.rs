//! Birthday reminder daemon.
//!
//! # Responsibility
//! - Load settings and initialize logging.
//! - Open the database and start the daily birthday scheduler.
//! - Stop the scheduler on Ctrl-C, letting an in-flight run finish.

mod settings;

use anyhow::{anyhow, Context};
use birthday_core::{
    init_logging, open_db, share_connection, BirthdayScheduler, SmtpMailTransport,
};
use log::info;
use settings::Settings;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is not an error.
    let _ = dotenvy::dotenv();

    let settings = Settings::load().context("failed to load settings")?;
    init_logging(&settings.logging).map_err(|err| anyhow!(err))?;

    let schedule = settings
        .schedule
        .to_config()
        .context("invalid schedule settings")?;
    let conn = open_db(&settings.database.path)
        .with_context(|| format!("failed to open database `{}`", settings.database.path))?;
    let transport = SmtpMailTransport::new(&settings.smtp, schedule.send_timeout)
        .context("failed to configure SMTP transport")?;

    info!(
        "event=daemon_start module=daemon status=ok database={} smtp_host={} smtp_port={}",
        settings.database.path, settings.smtp.host, settings.smtp.port
    );
    let handle =
        BirthdayScheduler::new(share_connection(conn), Arc::new(transport), schedule).start();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("event=daemon_stop module=daemon status=start");
    let state = handle.shutdown().await;
    info!("event=daemon_stop module=daemon status=ok scheduler_state={state:?}");
    Ok(())
}
