use std::sync::Arc;

use futures::stream::{StreamExt, iter};
use log::{debug, info, warn};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::clients::{
    LocalStorage, SongSource,
    entities::{SongRecord, TrendingEntry},
    errors::Result,
    source::clean_artist,
};

/// Default number of songs resolved at the same time
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Counts for one completed refresh run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub fetched: usize,
    pub resolved: usize,
    pub stored: usize,
    pub skipped: usize,
}

/// Replaces the stored song set with a freshly resolved one
pub struct Refresher<S> {
    source: Arc<S>,
    storage: Arc<LocalStorage>,
    concurrency: usize,
    // one run at a time, whoever triggers it
    running: Mutex<()>,
}

impl<S: SongSource> Refresher<S> {
    pub fn new(source: S, storage: Arc<LocalStorage>, concurrency: usize) -> Self {
        Refresher {
            source: Arc::new(source),
            storage,
            concurrency: concurrency.max(1),
            running: Mutex::new(()),
        }
    }

    pub fn storage(&self) -> &Arc<LocalStorage> {
        &self.storage
    }

    /// Runs fetch, clear, resolve and persist. Returns once every persist task has finished.
    pub async fn refresh(&self) -> Result<RefreshReport> {
        let _running = self.running.lock().await;
        info!("Starting billboard update ...");

        // Fetch before clearing so a dead chart API leaves the previous set in place
        let entries = self.source.fetch_trending().await?;
        let mut report = RefreshReport {
            fetched: entries.len(),
            ..RefreshReport::default()
        };
        debug!("Fetched {} trending songs", report.fetched);

        self.storage.clear_songs().await?;
        info!("Existing data deleted");

        let source = Arc::clone(&self.source);
        let mut resolutions = iter(entries)
            .map(move |entry| {
                let source = Arc::clone(&source);
                async move { resolve_entry(source.as_ref(), entry).await }
            })
            .buffer_unordered(self.concurrency);

        let mut persists = JoinSet::new();
        while let Some(resolution) = resolutions.next().await {
            match resolution {
                Ok(song) => {
                    report.resolved += 1;
                    let storage = Arc::clone(&self.storage);
                    persists.spawn(async move {
                        let saved = storage.save_song(&song).await;
                        (song.name, saved)
                    });
                }
                Err(e) => {
                    warn!("Skipping song: {e}");
                    report.skipped += 1;
                }
            }
        }

        while let Some(joined) = persists.join_next().await {
            match joined {
                Ok((_, Ok(()))) => report.stored += 1,
                Ok((name, Err(e))) => warn!("Failed to save {name}: {e}"),
                Err(e) => warn!("Persist task did not complete: {e}"),
            }
        }

        info!(
            "Finished billboard update. Fetched: {}, stored: {}, skipped: {}",
            report.fetched, report.stored, report.skipped
        );
        Ok(report)
    }
}

async fn resolve_entry<S: SongSource>(source: &S, entry: TrendingEntry) -> Result<SongRecord> {
    debug!("Initiate search and download for {}", entry.name);
    let artist = clean_artist(&entry.artist)?;
    let url = source
        .resolve(&entry.name, &artist)
        .await?
        .into_url(&entry.name)?;
    Ok(SongRecord {
        name: entry.name,
        artist,
        url,
    })
}
