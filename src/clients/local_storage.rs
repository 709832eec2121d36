use std::path::Path;
use std::time::Duration;

use async_duckdb::ClientBuilder;
use async_duckdb::duckdb::params;
use log::{debug, warn};

use crate::clients::{
    entities::SongRecord,
    errors::{Error, Result},
};

enum Table {
    Songs,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Songs => "songs",
        }
    }

    fn create_statement(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (
                name TEXT PRIMARY KEY,
                record TEXT NOT NULL
            );",
            self.as_str()
        )
    }
}

/// Embedded song collection. Every value is a JSON-encoded [`SongRecord`] keyed by its name.
pub struct LocalStorage {
    client: async_duckdb::Client,
}

impl LocalStorage {
    pub fn new(client: async_duckdb::Client) -> Self {
        LocalStorage { client }
    }

    /// Opens (or creates) the database file and its parent directories, giving up after `timeout`
    pub async fn open(path: &Path, timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::StoreUnavailable(format!("Failed to create directory {parent:?}: {e}"))
            })?;
        }
        let open = ClientBuilder::new().path(path).open();
        let client = tokio::time::timeout(timeout, open).await.map_err(|_| {
            Error::StoreUnavailable(format!("Timed out opening database at {path:?}"))
        })??;
        debug!("Opened local storage database at {path:?}");
        Ok(LocalStorage { client })
    }

    pub async fn in_memory() -> Result<Self> {
        let client = ClientBuilder::new().open().await?;
        Ok(LocalStorage { client })
    }

    pub async fn init_db(&self) -> Result<()> {
        let query = Table::Songs.create_statement();
        self.client
            .conn(move |conn| conn.execute_batch(&query))
            .await?;

        debug!("Successfully initialized local storage database");
        Ok(())
    }

    /// Drops and recreates the song collection inside one transaction
    pub async fn clear_songs(&self) -> Result<()> {
        let recreate = format!(
            "DROP TABLE IF EXISTS {}; {}",
            Table::Songs.as_str(),
            Table::Songs.create_statement()
        );

        self.client
            .conn(move |conn| {
                conn.execute_batch("BEGIN TRANSACTION;")?;
                match conn.execute_batch(&recreate) {
                    Ok(()) => conn.execute_batch("COMMIT;"),
                    Err(e) => {
                        if let Err(rollback) = conn.execute_batch("ROLLBACK;") {
                            warn!("Rollback after failed clear also failed: {rollback}");
                        }
                        Err(e)
                    }
                }
            })
            .await?;

        debug!("Existing songs deleted");
        Ok(())
    }

    /// Upserts one record; a later write for the same name replaces the earlier one
    pub async fn save_song(&self, song: &SongRecord) -> Result<()> {
        let query = format!(
            "INSERT OR REPLACE INTO {} (name, record) VALUES (?, ?);",
            Table::Songs.as_str()
        );
        let name = song.name.clone();
        let encoded = serde_json::to_string(song)?;

        self.client
            .conn(move |conn| conn.execute(&query, params![name, encoded]))
            .await?;

        debug!("Saved {} in local storage", song.name);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) async fn execute_batch(&self, sql: String) -> Result<()> {
        self.client.conn(move |conn| conn.execute_batch(&sql)).await?;
        Ok(())
    }

    /// Full scan in key order. Values that no longer decode are logged and left out.
    pub async fn list_songs(&self) -> Result<Vec<SongRecord>> {
        let table = Table::Songs.as_str();
        let exists_query =
            "SELECT count(*) FROM information_schema.tables WHERE table_name = ?;".to_string();
        let scan_query = format!("SELECT name, record FROM {table} ORDER BY name;");

        let rows = self
            .client
            .conn(move |conn| {
                let tables: i64 = conn.query_row(&exists_query, [table], |row| row.get(0))?;
                if tables == 0 {
                    return Ok(vec![]);
                }
                let mut stmt = conn.prepare(&scan_query)?;
                let mut rows = stmt.query([])?;
                let mut entries = vec![];
                while let Some(row) = rows.next()? {
                    let name: String = row.get(0)?;
                    let record: String = row.get(1)?;
                    entries.push((name, record));
                }
                Ok(entries)
            })
            .await?;

        let songs = rows
            .into_iter()
            .filter_map(
                |(name, record)| match serde_json::from_str::<SongRecord>(&record) {
                    Ok(song) => Some(song),
                    Err(e) => {
                        warn!("Error decoding stored value for key {name}: {e}");
                        None
                    }
                },
            )
            .collect();
        Ok(songs)
    }
}
