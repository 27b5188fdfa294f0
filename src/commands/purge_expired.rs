use tracing::info;

use crate::App;

/// One-shot sweep of expired pastes, meant to be run from cron or a timer.
/// Reads never depend on it, so skipping a run only leaves dead rows around.
pub async fn run(app: App) -> anyhow::Result<()> {
    let count = app.store.purge_expired().await?;

    if count > 0 {
        info!("deleted {count} expired pastes");
    }

    Ok(())
}
