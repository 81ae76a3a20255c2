//! Per-business "last analyzed file" memory, kept in a JSON file beside the
//! settings. Failures here are logged and swallowed: callers fall back to
//! asking the store for the latest processed file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::settings::config_dir;

pub const FRESHNESS_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    file_id: i64,
    saved_at: DateTime<Utc>,
}

pub struct RecentFiles {
    path: PathBuf,
}

impl RecentFiles {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_location() -> Self {
        Self::new(config_dir().join("recent.json"))
    }

    pub fn get(&self, business_id: &str) -> Option<i64> {
        self.get_at(business_id, Utc::now())
    }

    /// Last analyzed file for `business_id`, if remembered within the
    /// freshness window ending at `now`.
    pub fn get_at(&self, business_id: &str, now: DateTime<Utc>) -> Option<i64> {
        let entries = match self.read() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read recent files");
                return None;
            }
        };
        let entry = entries.get(business_id)?;
        if now - entry.saved_at > Duration::days(FRESHNESS_DAYS) {
            debug!(business_id, file_id = entry.file_id, "remembered file is stale");
            return None;
        }
        Some(entry.file_id)
    }

    pub fn remember(&self, business_id: &str, file_id: i64) {
        self.remember_at(business_id, file_id, Utc::now());
    }

    pub fn remember_at(&self, business_id: &str, file_id: i64, now: DateTime<Utc>) {
        let result = self.read().and_then(|mut entries| {
            entries.insert(business_id.to_string(), Entry { file_id, saved_at: now });
            self.write(&entries)
        });
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "could not save recent file");
        }
    }

    pub fn forget(&self, business_id: &str) {
        let result = self.read().and_then(|mut entries| {
            if entries.remove(business_id).is_some() {
                self.write(&entries)
            } else {
                Ok(())
            }
        });
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "could not update recent files");
        }
    }

    fn read(&self) -> Result<BTreeMap<String, Entry>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write(&self, entries: &BTreeMap<String, Entry>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, format!("{json}\n"))?;
        Ok(())
    }
}
