use std::sync::Arc;

use billboard::clients::errors::Result;
use billboard::config::{ConfigBuilder, Settings};
use billboard::{scheduler, server};
use clap::Parser;
use log::info;

pub async fn run() -> Result<()> {
    let settings = Settings::parse();

    info!("Building config ...");
    let config = ConfigBuilder::new(settings).build().await?;

    info!("Scheduling billboard updates ...");
    tokio::spawn(scheduler::run_schedule(
        Arc::clone(&config.refresher),
        config.settings.trigger(),
        !config.settings.no_initial_refresh,
    ));

    let listener = server::bind(&config.settings.listen).await?;
    server::serve(listener, config.storage).await
}
