use std::future::Future;
use std::time::Duration;

use log::debug;
use reqwest::{Client, Url};

use crate::clients::{
    entities::{ResolveResult, TrendingEntry},
    errors::{Error, Result},
};

/// Default host serving both the chart and the download APIs
pub const DEFAULT_API_URL: &str = "http://torpedo.servegame.com:3000";

/// Remote side of a refresh run. `SourceClient` talks HTTP; tests plug in fakes.
pub trait SongSource: Send + Sync + 'static {
    /// Current trending list, in chart order
    fn fetch_trending(&self) -> impl Future<Output = Result<Vec<TrendingEntry>>> + Send;

    /// Resolve one song. `artist` must already be cleaned with [`clean_artist`].
    fn resolve(&self, name: &str, artist: &str)
    -> impl Future<Output = Result<ResolveResult>> + Send;
}

/// The chart API sends the artist as a text blob; the real name is on its second line.
pub fn clean_artist(raw: &str) -> Result<String> {
    raw.split('\n')
        .nth(1)
        .map(|line| line.trim().to_string())
        .ok_or_else(|| Error::MalformedArtistField(raw.to_string()))
}

pub struct SourceClient {
    http: Client,
    base_url: Url,
}

impl SourceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Configuration(format!("Invalid API URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Configuration(format!(
                "API URL {base_url} cannot be used as a base"
            )));
        }
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("billboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {e}")))?;
        Ok(SourceClient { http, base_url })
    }

    // Appends already-unescaped segments; the url crate percent-encodes each one
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::Configuration(format!("API URL {} cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl SongSource for SourceClient {
    async fn fetch_trending(&self) -> Result<Vec<TrendingEntry>> {
        let url = self.endpoint(&["getTopSongs"])?;
        debug!("Retrieving trending songs from {url}");

        let body = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        let songs: Vec<TrendingEntry> = serde_json::from_slice(&body)?;

        debug!("Received {} trending songs", songs.len());
        Ok(songs)
    }

    async fn resolve(&self, name: &str, artist: &str) -> Result<ResolveResult> {
        let query = format!("{name}{artist}");
        let url = self.endpoint(&["v2", "download", &query])?;
        debug!("Resolving {name} via {url}");

        // The resolver reports failures in the body, so the status code is not checked here
        let body = self.http.get(url).send().await?.bytes().await?;
        let resolved: ResolveResult = serde_json::from_slice(&body)?;
        Ok(resolved)
    }
}
