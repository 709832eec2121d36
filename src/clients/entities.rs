use serde::{Deserialize, Serialize};

use crate::clients::errors::{Error, Result};

/// Raw chart item. `artist` is still the multi-line blob the chart API sends.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TrendingEntry {
    pub name: String,
    pub artist: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub url: String,
}

impl ResolveResult {
    /// Returns the URL only when the resolver reported success and actually sent one.
    pub fn into_url(self, song: &str) -> Result<String> {
        if !self.success {
            return Err(Error::ResolveRejected(format!("{song}: success=false")));
        }
        if self.url.trim().is_empty() {
            return Err(Error::ResolveRejected(format!("{song}: empty url")));
        }
        Ok(self.url)
    }
}

/// Persisted unit, keyed by `name`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SongRecord {
    pub name: String,
    pub artist: String,
    pub url: String,
}
