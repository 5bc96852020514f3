//! `watch` runs the re-import loop over the registered artifact files.

use microcks_client::ConnectOptions;
use microcks_shared::config;
use microcks_shared::Result;
use tracing::info;

use crate::watcher::WatchManager;

pub async fn execute(options: &ConnectOptions) -> Result<()> {
    let registry_path = config::default_watch_path()?;
    let config_path = config::default_config_path()?;

    let (mut manager, events) = WatchManager::new(registry_path, config_path, options.clone())?;
    info!("microcks-watcher started...");
    manager.run(events).await
}
