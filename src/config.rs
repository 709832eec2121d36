use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveTime, Weekday};
use clap::Parser;
use log::debug;

use crate::clients::{LocalStorage, SourceClient, errors::Result, source::DEFAULT_API_URL};
use crate::refresh::{DEFAULT_CONCURRENCY, Refresher};
use crate::scheduler::WeeklyTrigger;

/// Runtime settings, read from flags with environment (and `.env`) fallbacks
#[derive(Parser, Debug, Clone)]
#[command(name = "billboard")]
#[command(version, about = "Weekly cache of trending songs served over HTTP", long_about = None)]
pub struct Settings {
    /// Base URL of the chart and download APIs
    #[arg(long, env = "BILLBOARD_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Database file; defaults to the user cache directory
    #[arg(long, env = "BILLBOARD_DB_PATH")]
    pub db_path: Option<PathBuf>,

    #[arg(long, env = "BILLBOARD_LISTEN", default_value = "0.0.0.0:8000")]
    pub listen: String,

    /// Day of the week for the scheduled refresh (mon, tue, wed, ...)
    #[arg(long, env = "BILLBOARD_REFRESH_WEEKDAY", default_value = "wed")]
    pub refresh_weekday: Weekday,

    /// Time of day (UTC, HH:MM) for the scheduled refresh
    #[arg(long, env = "BILLBOARD_REFRESH_TIME", default_value = "00:00", value_parser = parse_time)]
    pub refresh_time: NaiveTime,

    /// Timeout for each call to the chart and download APIs, at least 1 second
    #[arg(
        long,
        env = "BILLBOARD_REQUEST_TIMEOUT_SECS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub request_timeout_secs: u64,

    #[arg(long, env = "BILLBOARD_STORE_OPEN_TIMEOUT_MS", default_value_t = 1000)]
    pub store_open_timeout_ms: u64,

    /// Songs resolved at the same time
    #[arg(long, env = "BILLBOARD_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Skip the refresh normally run at startup
    #[arg(long, env = "BILLBOARD_NO_INITIAL_REFRESH")]
    pub no_initial_refresh: bool,
}

fn parse_time(value: &str) -> std::result::Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|e| format!("expected HH:MM, {e}"))
}

impl Settings {
    pub fn db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp")) // Fallback to /tmp if cache directory can't be determined
                .join("billboard_songs.duckdb")
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn store_open_timeout(&self) -> Duration {
        Duration::from_millis(self.store_open_timeout_ms)
    }

    pub fn trigger(&self) -> WeeklyTrigger {
        WeeklyTrigger::new(self.refresh_weekday, self.refresh_time)
    }
}

/// Wired components of a running service
pub struct Config {
    pub settings: Settings,
    pub storage: Arc<LocalStorage>,
    pub refresher: Arc<Refresher<SourceClient>>,
}

pub struct ConfigBuilder {
    settings: Settings,
    source: Option<SourceClient>,
    storage: Option<Arc<LocalStorage>>,
}

impl ConfigBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            source: None,
            storage: None,
        }
    }

    #[must_use]
    pub fn source(mut self, source: SourceClient) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn storage(mut self, storage: Arc<LocalStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Opens the store (if none was injected) and makes sure the song collection exists
    pub async fn build(self) -> Result<Config> {
        let settings = self.settings;
        let source = match self.source {
            Some(s) => s,
            None => SourceClient::new(&settings.api_url, settings.request_timeout())?,
        };
        let storage = match self.storage {
            Some(s) => s,
            None => {
                let path = settings.db_path();
                debug!("Opening database at {path:?}");
                Arc::new(LocalStorage::open(&path, settings.store_open_timeout()).await?)
            }
        };
        storage.init_db().await?;

        let refresher = Arc::new(Refresher::new(
            source,
            Arc::clone(&storage),
            settings.concurrency,
        ));
        Ok(Config {
            settings,
            storage,
            refresher,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_flags() {
        let settings = Settings::try_parse_from(["billboard"]).unwrap();
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.listen, "0.0.0.0:8000");
        assert_eq!(settings.refresh_weekday, Weekday::Wed);
        assert_eq!(settings.refresh_time, NaiveTime::MIN);
        assert_eq!(settings.store_open_timeout(), Duration::from_secs(1));
        assert_eq!(settings.concurrency, DEFAULT_CONCURRENCY);
        assert!(!settings.no_initial_refresh);
    }

    #[test]
    fn flags_override_defaults() {
        let settings = Settings::try_parse_from([
            "billboard",
            "--refresh-weekday",
            "friday",
            "--refresh-time",
            "18:30",
            "--db-path",
            "/var/lib/billboard/songs.duckdb",
            "--no-initial-refresh",
        ])
        .unwrap();
        assert_eq!(settings.refresh_weekday, Weekday::Fri);
        assert_eq!(
            settings.refresh_time,
            NaiveTime::from_hms_opt(18, 30, 0).unwrap()
        );
        assert_eq!(
            settings.db_path(),
            PathBuf::from("/var/lib/billboard/songs.duckdb")
        );
        assert!(settings.no_initial_refresh);
    }

    #[test]
    fn bad_schedule_is_rejected() {
        assert!(Settings::try_parse_from(["billboard", "--refresh-weekday", "someday"]).is_err());
        assert!(Settings::try_parse_from(["billboard", "--refresh-time", "25:00"]).is_err());
    }

    #[test]
    fn zero_request_timeout_is_rejected() {
        assert!(Settings::try_parse_from(["billboard", "--request-timeout-secs", "0"]).is_err());
        let settings =
            Settings::try_parse_from(["billboard", "--request-timeout-secs", "1"]).unwrap();
        assert_eq!(settings.request_timeout(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn builder_creates_song_collection() {
        let settings = Settings::try_parse_from(["billboard"]).unwrap();
        let storage = Arc::new(LocalStorage::in_memory().await.unwrap());
        let config = ConfigBuilder::new(settings)
            .storage(Arc::clone(&storage))
            .build()
            .await
            .unwrap();
        assert!(Arc::ptr_eq(config.refresher.storage(), &storage));
        assert!(config.storage.list_songs().await.unwrap().is_empty());
    }
}
