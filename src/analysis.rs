//! Loading a cash-flow analysis from the store.
//!
//! A load resolves the file first, then fetches records and categories
//! concurrently and joins them into a pivot. Every load is tagged with a
//! request token; `AnalysisLoader` only commits results from the most recent
//! request, so a slow, superseded load can never replace newer state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::error::{IntakeError, Result};
use crate::models::UploadedFile;
use crate::pivot::{pivot_cashflow, PivotedCashflow};
use crate::recent::RecentFiles;
use crate::store::RecordStore;

#[derive(Debug, Clone)]
pub enum LoadState<T> {
    Idle,
    Loading,
    Ready(T),
    Error(String),
}

impl<T> Default for LoadState<T> {
    fn default() -> Self {
        Self::Idle
    }
}

impl<T> LoadState<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

impl<T> From<Result<T>> for LoadState<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(v) => Self::Ready(v),
            Err(e) => Self::Error(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    seq: u64,
    pub file_id: i64,
}

/// Fetch one file's records and the category list, then pivot them.
/// Fails with `FileNotFound` if the file is missing or soft-deleted.
pub fn fetch_analysis<S: RecordStore + ?Sized>(store: &S, file_id: i64) -> Result<PivotedCashflow> {
    let file = store.get_file(file_id)?.ok_or(IntakeError::FileNotFound(file_id))?;

    // categories do not depend on records; fetch both at once
    let (records, categories) = std::thread::scope(|s| {
        let records = s.spawn(|| store.list_records(file_id));
        let categories = store.list_categories();
        let records = records
            .join()
            .unwrap_or_else(|_| Err(IntakeError::Other("record fetch panicked".to_string())));
        (records, categories)
    });
    let records = records?;
    let categories = categories?;

    debug!(file_id, records = records.len(), categories = categories.len(), "pivoting");
    Ok(pivot_cashflow(records, categories, Some(file)))
}

/// Which file to analyze for a business: the remembered one if it is fresh,
/// still live and owned by the business, otherwise the most recently
/// processed file.
pub fn resolve_file<S: RecordStore + ?Sized>(
    store: &S,
    recent: &RecentFiles,
    business_id: &str,
) -> Result<Option<UploadedFile>> {
    if let Some(file_id) = recent.get(business_id) {
        match store.get_file(file_id)? {
            Some(file) if file.business_id == business_id => {
                debug!(business_id, file_id, "using remembered file");
                return Ok(Some(file));
            }
            Some(_) => {
                warn!(business_id, file_id, "remembered file belongs to another business, falling back");
                recent.forget(business_id);
            }
            None => {
                warn!(business_id, file_id, "remembered file is gone, falling back");
                recent.forget(business_id);
            }
        }
    }
    store.latest_processed_file(business_id)
}

/// Holds the latest analysis and discards results from superseded requests.
pub struct AnalysisLoader {
    latest: AtomicU64,
    state: Mutex<LoadState<PivotedCashflow>>,
}

impl Default for AnalysisLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisLoader {
    pub fn new() -> Self {
        Self {
            latest: AtomicU64::new(0),
            state: Mutex::new(LoadState::Idle),
        }
    }

    /// Start a request for `file_id`. Any earlier outstanding request
    /// becomes stale.
    pub fn begin(&self, file_id: i64) -> RequestToken {
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut state) = self.state.lock() {
            *state = LoadState::Loading;
        }
        RequestToken { seq, file_id }
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.seq
    }

    /// Store the outcome of `token`'s request. Returns false, leaving state
    /// untouched, if a newer request has started since.
    pub fn commit(&self, token: RequestToken, result: Result<PivotedCashflow>) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        // checked under the lock so a concurrent begin() cannot interleave
        if !self.is_current(token) {
            info!(file_id = token.file_id, "discarding superseded analysis");
            return false;
        }
        *state = result.into();
        true
    }

    pub fn load<S: RecordStore + ?Sized>(&self, store: &S, file_id: i64) -> bool {
        let token = self.begin(file_id);
        let result = fetch_analysis(store, file_id);
        if let Err(e) = &result {
            warn!(file_id, error = %e, "analysis load failed");
        }
        self.commit(token, result)
    }

    /// Move the current state out, leaving the loader idle.
    pub fn take(&self) -> LoadState<PivotedCashflow> {
        self.state
            .lock()
            .map(|mut s| std::mem::take(&mut *s))
            .unwrap_or_else(|e| LoadState::Error(format!("loader lock poisoned: {e}")))
    }
}
