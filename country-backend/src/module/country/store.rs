//! Country table with a JSON snapshot on disk
//!
//! Records are keyed by lower-cased name. Every mutation is staged on a copy
//! of the table, persisted, and only then swapped in, so a failed write leaves
//! both memory and disk untouched.

use chrono::{DateTime, Utc};
use country_common::{Country, CountryQuery};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::query;

const SNAPSHOT_FILE: &str = "countries.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt snapshot {path:?}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("country with name '{0}' already exists")]
    Duplicate(String),
}

/// Every writable field of a country, as produced by validation or refresh
#[derive(Debug, Clone, PartialEq)]
pub struct CountryDraft {
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: u64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<Decimal>,
    pub estimated_gdp: Option<Decimal>,
    pub flag_url: Option<String>,
}

impl CountryDraft {
    fn into_country(self, id: u64, now: DateTime<Utc>) -> Country {
        Country {
            id,
            name: self.name,
            capital: self.capital,
            region: self.region,
            population: self.population,
            currency_code: self.currency_code,
            exchange_rate: self.exchange_rate,
            estimated_gdp: self.estimated_gdp,
            flag_url: self.flag_url,
            last_refreshed_at: now,
        }
    }
}

/// Outcome of writing one refresh batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchCounts {
    pub inserted: usize,
    pub updated: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Snapshot {
    next_id: u64,
    last_refresh_at: Option<DateTime<Utc>>,
    countries: Vec<Country>,
}

#[derive(Debug, Clone, Default)]
struct Table {
    next_id: u64,
    last_refresh_at: Option<DateTime<Utc>>,
    by_name: BTreeMap<String, Country>,
}

impl Table {
    fn from_snapshot(snapshot: Snapshot) -> Self {
        let max_id = snapshot.countries.iter().map(|c| c.id).max().unwrap_or(0);
        let by_name = snapshot
            .countries
            .into_iter()
            .map(|c| (name_key(&c.name), c))
            .collect();
        Self {
            next_id: snapshot.next_id.max(max_id + 1),
            last_refresh_at: snapshot.last_refresh_at,
            by_name,
        }
    }

    fn to_snapshot(&self) -> Snapshot {
        let mut countries: Vec<Country> = self.by_name.values().cloned().collect();
        countries.sort_by_key(|c| c.id);
        Snapshot {
            next_id: self.next_id,
            last_refresh_at: self.last_refresh_at,
            countries,
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        id
    }

    /// Overwrite the record matching the draft's name, or insert a new one.
    /// Returns true when a record was inserted.
    fn upsert(&mut self, draft: CountryDraft, now: DateTime<Utc>) -> bool {
        let key = name_key(&draft.name);
        match self.by_name.get(&key).map(|existing| existing.id) {
            Some(id) => {
                self.by_name.insert(key, draft.into_country(id, now));
                false
            }
            None => {
                let id = self.allocate_id();
                self.by_name.insert(key, draft.into_country(id, now));
                true
            }
        }
    }
}

/// Case-insensitive lookup key
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

pub struct CountryStore {
    snapshot_path: PathBuf,
    table: RwLock<Table>,
}

impl CountryStore {
    /// Open the store under `data_dir`, loading an existing snapshot if present
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let snapshot_path = data_dir.as_ref().join(SNAPSHOT_FILE);
        let table = load_snapshot(&snapshot_path).await?;

        info!(
            "Loaded {} countries from {:?}",
            table.by_name.len(),
            snapshot_path
        );

        Ok(Self {
            snapshot_path,
            table: RwLock::new(table),
        })
    }

    pub async fn count(&self) -> usize {
        self.table.read().await.by_name.len()
    }

    pub async fn get(&self, name: &str) -> Option<Country> {
        self.table.read().await.by_name.get(&name_key(name)).cloned()
    }

    pub async fn list(&self, query: &CountryQuery) -> Vec<Country> {
        let table = self.table.read().await;
        query::filter_and_sort(table.by_name.values(), query)
    }

    /// Up to `limit` countries with a known GDP, largest first
    pub async fn top_by_gdp(&self, limit: usize) -> Vec<Country> {
        let table = self.table.read().await;
        let mut ranked: Vec<Country> = table
            .by_name
            .values()
            .filter(|c| c.estimated_gdp.is_some())
            .cloned()
            .collect();
        ranked.sort_by(query::gdp_desc);
        ranked.truncate(limit);
        ranked
    }

    /// Completion time of the last refresh, or the newest record timestamp
    /// when no refresh has completed yet
    pub async fn last_refreshed_at(&self) -> Option<DateTime<Utc>> {
        let table = self.table.read().await;
        table.last_refresh_at.or_else(|| {
            table
                .by_name
                .values()
                .map(|c| c.last_refreshed_at)
                .max()
        })
    }

    /// Insert a new record, rejecting case-insensitive name collisions
    pub async fn insert(&self, draft: CountryDraft) -> Result<Country, StoreError> {
        let mut table = self.table.write().await;
        let key = name_key(&draft.name);
        if table.by_name.contains_key(&key) {
            return Err(StoreError::Duplicate(draft.name));
        }

        let mut staged = table.clone();
        let id = staged.allocate_id();
        let country = draft.into_country(id, Utc::now());
        staged.by_name.insert(key, country.clone());

        self.commit(&mut table, staged).await?;
        debug!("Created country {} (id {})", country.name, country.id);
        Ok(country)
    }

    /// Remove a record by case-insensitive name. Returns false if absent.
    pub async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        let mut table = self.table.write().await;
        let key = name_key(name);
        if !table.by_name.contains_key(&key) {
            return Ok(false);
        }

        let mut staged = table.clone();
        let removed = staged.by_name.remove(&key);
        self.commit(&mut table, staged).await?;

        if let Some(country) = removed {
            debug!("Deleted country {}", country.name);
        }
        Ok(true)
    }

    /// Upsert every draft and stamp the refresh marker with `refreshed_at`
    pub async fn apply_refresh(
        &self,
        drafts: Vec<CountryDraft>,
        refreshed_at: DateTime<Utc>,
    ) -> Result<BatchCounts, StoreError> {
        let mut table = self.table.write().await;
        let mut staged = table.clone();
        let mut counts = BatchCounts::default();

        for draft in drafts {
            if staged.upsert(draft, refreshed_at) {
                counts.inserted += 1;
            } else {
                counts.updated += 1;
            }
        }
        staged.last_refresh_at = Some(refreshed_at);

        self.commit(&mut table, staged).await?;
        Ok(counts)
    }

    async fn commit(&self, current: &mut Table, staged: Table) -> Result<(), StoreError> {
        save_snapshot(&self.snapshot_path, &staged.to_snapshot()).await?;
        *current = staged;
        Ok(())
    }
}

async fn load_snapshot(path: &Path) -> Result<Table, StoreError> {
    if !path.exists() {
        debug!("Snapshot file does not exist: {:?}", path);
        return Ok(Table::default());
    }

    let content = fs::read_to_string(path).await.map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let snapshot: Snapshot = serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Table::from_snapshot(snapshot))
}

async fn save_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let content = serde_json::to_string_pretty(snapshot).map_err(StoreError::Serialize)?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, content).await.map_err(io_err)?;
    fs::rename(&tmp_path, path).await.map_err(io_err)?;

    debug!("Saved {} countries to {:?}", snapshot.countries.len(), path);
    Ok(())
}
