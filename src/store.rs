//! Record store: the read contracts the analysis and task views consume,
//! plus the soft-delete update.
//!
//! `RecordStore` is the seam between the pure transformations and storage.
//! `SqliteStore` backs it with a single rusqlite connection behind a mutex,
//! so the store is `Sync` and can be shared across the loader's fetch
//! threads.

use std::sync::Mutex;

use rusqlite::{Connection, Row};
use tracing::debug;

use crate::error::{IntakeError, Result};
use crate::models::{CashflowRecord, Category, FileStatus, SurveyResponse, Task, UploadedFile};

/// Optional filters for listing uploaded files. Deleted files are never
/// returned.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    pub owner_id: Option<String>,
    pub business_id: Option<String>,
    pub status: Option<FileStatus>,
}

pub trait RecordStore: Send + Sync {
    /// Fetch a non-deleted uploaded file by id.
    fn get_file(&self, file_id: i64) -> Result<Option<UploadedFile>>;

    /// Cash-flow records parsed from a file, ordered by year ascending.
    fn list_records(&self, file_id: i64) -> Result<Vec<CashflowRecord>>;

    /// All cash-flow categories.
    fn list_categories(&self) -> Result<Vec<Category>>;

    /// Tasks for a seller, ordered by name.
    fn list_tasks(&self, seller_id: &str) -> Result<Vec<Task>>;

    /// Non-deleted uploaded files, newest first.
    fn list_files(&self, filter: &FileFilter) -> Result<Vec<UploadedFile>>;

    fn list_responses(&self, business_id: &str) -> Result<Vec<SurveyResponse>>;

    /// Mark a file deleted. Returns false if no live file had that id.
    fn soft_delete_file(&self, file_id: i64) -> Result<bool>;

    /// Most recently processed, non-deleted file for a business.
    fn latest_processed_file(&self, business_id: &str) -> Result<Option<UploadedFile>>;
}

const FILE_COLUMNS: &str = "id, filename, status, owner_id, business_id, task_id, checksum, \
                            created_at, processed_at, is_deleted";

const NOT_DELETED: &str = "COALESCE(is_deleted, 0) = 0";

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<UploadedFile> {
    Ok(UploadedFile {
        id: row.get(0)?,
        filename: row.get(1)?,
        status: row.get(2)?,
        owner_id: row.get(3)?,
        business_id: row.get(4)?,
        task_id: row.get(5)?,
        checksum: row.get(6)?,
        created_at: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        processed_at: row.get(8)?,
        is_deleted: row.get(9)?,
    })
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Run `f` with the locked connection. Writers (importer, CLI) go through
    /// here so reads and writes share one handle.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| IntakeError::Other(format!("store lock poisoned: {e}")))?;
        f(&conn)
    }
}

impl RecordStore for SqliteStore {
    fn get_file(&self, file_id: i64) -> Result<Option<UploadedFile>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {FILE_COLUMNS} FROM uploaded_files WHERE id = ?1 AND {NOT_DELETED}");
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query_map([file_id], file_from_row)?;
            Ok(rows.next().transpose()?)
        })
    }

    fn list_records(&self, file_id: i64) -> Result<Vec<CashflowRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, source_file_id, category_id, year, amount FROM cashflow_records \
                 WHERE source_file_id = ?1 ORDER BY year, id",
            )?;
            let records = stmt
                .query_map([file_id], |row| {
                    Ok(CashflowRecord {
                        id: row.get(0)?,
                        source_file_id: row.get(1)?,
                        category_id: row.get(2)?,
                        year: row.get(3)?,
                        amount: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            debug!(file_id, count = records.len(), "fetched cashflow records");
            Ok(records)
        })
    }

    fn list_categories(&self) -> Result<Vec<Category>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, name, category_type FROM cashflow_categories ORDER BY id")?;
            let categories = stmt
                .query_map([], |row| {
                    Ok(Category {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        category_type: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(categories)
        })
    }

    fn list_tasks(&self, seller_id: &str) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, task_name, description, task_type, category, seller_id FROM tasks \
                 WHERE seller_id = ?1 ORDER BY task_name, id",
            )?;
            let tasks = stmt
                .query_map([seller_id], |row| {
                    Ok(Task {
                        task_id: row.get(0)?,
                        task_name: row.get(1)?,
                        description: row.get(2)?,
                        task_type: row.get(3)?,
                        category: row.get(4)?,
                        seller_id: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(tasks)
        })
    }

    fn list_files(&self, filter: &FileFilter) -> Result<Vec<UploadedFile>> {
        self.with_conn(|conn| {
            let mut clauses = vec![NOT_DELETED.to_string()];
            let mut params: Vec<String> = Vec::new();
            if let Some(owner) = &filter.owner_id {
                params.push(owner.clone());
                clauses.push(format!("owner_id = ?{}", params.len()));
            }
            if let Some(business) = &filter.business_id {
                params.push(business.clone());
                clauses.push(format!("business_id = ?{}", params.len()));
            }
            if let Some(status) = filter.status {
                params.push(status.key().to_string());
                clauses.push(format!("status = ?{}", params.len()));
            }
            let sql = format!(
                "SELECT {FILE_COLUMNS} FROM uploaded_files WHERE {} ORDER BY created_at DESC, id DESC",
                clauses.join(" AND ")
            );
            let mut stmt = conn.prepare(&sql)?;
            let files = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), file_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(files)
        })
    }

    fn list_responses(&self, business_id: &str) -> Result<Vec<SurveyResponse>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, business_id, task_id, value, updated_at FROM survey_responses \
                 WHERE business_id = ?1 ORDER BY id",
            )?;
            let responses = stmt
                .query_map([business_id], |row| {
                    Ok(SurveyResponse {
                        id: row.get(0)?,
                        business_id: row.get(1)?,
                        task_id: row.get(2)?,
                        value: row.get(3)?,
                        updated_at: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(responses)
        })
    }

    fn soft_delete_file(&self, file_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                &format!("UPDATE uploaded_files SET is_deleted = 1 WHERE id = ?1 AND {NOT_DELETED}"),
                [file_id],
            )?;
            Ok(changed > 0)
        })
    }

    fn latest_processed_file(&self, business_id: &str) -> Result<Option<UploadedFile>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {FILE_COLUMNS} FROM uploaded_files \
                 WHERE business_id = ?1 AND status = 'processed' AND {NOT_DELETED} \
                 ORDER BY processed_at DESC, id DESC LIMIT 1"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query_map([business_id], file_from_row)?;
            Ok(rows.next().transpose()?)
        })
    }
}

// ---------------------------------------------------------------------------
// Writes used by the importer and the CLI
// ---------------------------------------------------------------------------

pub fn insert_file(
    conn: &Connection,
    filename: &str,
    owner_id: &str,
    business_id: &str,
    task_id: Option<i64>,
    checksum: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO uploaded_files (filename, status, owner_id, business_id, task_id, checksum) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![filename, FileStatus::Uploading, owner_id, business_id, task_id, checksum],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Move a file to `status`, stamping `processed_at` when it reaches
/// `processed`.
pub fn set_file_status(conn: &Connection, file_id: i64, status: FileStatus) -> Result<()> {
    if status == FileStatus::Processed {
        conn.execute(
            "UPDATE uploaded_files SET status = ?1, processed_at = datetime('now') WHERE id = ?2",
            rusqlite::params![status, file_id],
        )?;
    } else {
        conn.execute(
            "UPDATE uploaded_files SET status = ?1 WHERE id = ?2",
            rusqlite::params![status, file_id],
        )?;
    }
    Ok(())
}

pub fn find_file_by_checksum(conn: &Connection, business_id: &str, checksum: &str) -> Result<Option<i64>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id FROM uploaded_files WHERE business_id = ?1 AND checksum = ?2 AND {NOT_DELETED} \
         AND status != 'error' LIMIT 1"
    ))?;
    let mut rows = stmt.query_map([business_id, checksum], |row| row.get::<_, i64>(0))?;
    Ok(rows.next().transpose()?)
}

pub fn find_category_id(conn: &Connection, name: &str) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM cashflow_categories WHERE lower(name) = lower(?1)")?;
    let mut rows = stmt.query_map([name.trim()], |row| row.get::<_, i64>(0))?;
    Ok(rows.next().transpose()?)
}

pub fn add_category(conn: &Connection, name: &str, category_type: crate::models::CategoryType) -> Result<i64> {
    conn.execute(
        "INSERT INTO cashflow_categories (name, category_type) VALUES (?1, ?2)",
        rusqlite::params![name.trim(), category_type],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn add_task(
    conn: &Connection,
    seller_id: &str,
    task_name: &str,
    task_type: &str,
    category: Option<&str>,
    description: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO tasks (task_name, task_type, category, description, seller_id) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![task_name, task_type, category, description, seller_id],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn task_exists(conn: &Connection, seller_id: &str, task_id: i64) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT 1 FROM tasks WHERE id = ?1 AND seller_id = ?2")?;
    Ok(stmt.exists(rusqlite::params![task_id, seller_id])?)
}

/// Insert or replace the response for (business, task).
pub fn save_response(conn: &Connection, business_id: &str, task_id: i64, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO survey_responses (business_id, task_id, value) VALUES (?1, ?2, ?3) \
         ON CONFLICT (business_id, task_id) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
        rusqlite::params![business_id, task_id, value],
    )?;
    Ok(())
}
