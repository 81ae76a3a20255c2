use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;
use crate::models::CategoryType;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cashflow_categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    category_type TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY,
    task_name TEXT NOT NULL,
    description TEXT,
    task_type TEXT NOT NULL DEFAULT 'upload',
    category TEXT,
    seller_id TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS uploaded_files (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    owner_id TEXT NOT NULL,
    business_id TEXT NOT NULL,
    task_id INTEGER,
    checksum TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    processed_at TEXT,
    is_deleted INTEGER,
    FOREIGN KEY (task_id) REFERENCES tasks(id)
);

CREATE TABLE IF NOT EXISTS cashflow_records (
    id INTEGER PRIMARY KEY,
    source_file_id INTEGER NOT NULL,
    category_id INTEGER NOT NULL,
    year INTEGER NOT NULL,
    amount REAL NOT NULL,
    FOREIGN KEY (source_file_id) REFERENCES uploaded_files(id)
);

CREATE TABLE IF NOT EXISTS survey_responses (
    id INTEGER PRIMARY KEY,
    business_id TEXT NOT NULL,
    task_id INTEGER NOT NULL,
    value TEXT,
    updated_at TEXT DEFAULT (datetime('now')),
    UNIQUE (business_id, task_id),
    FOREIGN KEY (task_id) REFERENCES tasks(id)
);

CREATE INDEX IF NOT EXISTS idx_records_file ON cashflow_records(source_file_id);
CREATE INDEX IF NOT EXISTS idx_files_business ON uploaded_files(business_id);
";

// cashflow_records.category_id has no foreign key; unmatched ids are skipped
// at analysis time.

const DEFAULT_CATEGORIES: &[(&str, CategoryType)] = &[
    ("Sales", CategoryType::Income),
    ("Service Revenue", CategoryType::Income),
    ("Interest Income", CategoryType::Income),
    ("Other Income", CategoryType::Income),
    ("Cost of Goods Sold", CategoryType::Expense),
    ("Payroll", CategoryType::Expense),
    ("Rent", CategoryType::Expense),
    ("Utilities", CategoryType::Expense),
    ("Marketing", CategoryType::Expense),
    ("Insurance", CategoryType::Expense),
    ("Professional Fees", CategoryType::Expense),
    ("Taxes", CategoryType::Expense),
    ("Loan Principal", CategoryType::Debt),
    ("Loan Interest", CategoryType::Debt),
    ("Owner Contributions", CategoryType::Other),
    ("Owner Distributions", CategoryType::Other),
];

// (task_name, task_type, category, description)
pub const DEFAULT_TASKS: &[(&str, &str, Option<&str>, &str)] = &[
    ("Profit & loss statements", "upload", Some("Financials"), "Last three fiscal years"),
    ("Balance sheets", "upload", Some("Financials"), "Last three fiscal years"),
    ("Cash-flow workbook", "upload", Some("Financials"), "Yearly cash-flow lines by category"),
    ("Business tax returns", "upload", Some("Tax"), "Federal returns, last three years"),
    ("Reason for selling", "survey", Some("About the business"), "Short answer"),
    ("Number of employees", "survey", Some("About the business"), "Full-time equivalents"),
    ("Anything else we should know", "survey", None, "Free text"),
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM cashflow_categories", [], |row| row.get(0))?;
    if count == 0 {
        for (name, category_type) in DEFAULT_CATEGORIES {
            conn.execute(
                "INSERT INTO cashflow_categories (name, category_type) VALUES (?1, ?2)",
                rusqlite::params![name, category_type],
            )?;
        }
    }
    Ok(())
}

/// Seed the onboarding checklist for a business if it has no tasks yet.
/// Returns the number of tasks inserted.
pub fn seed_tasks(conn: &Connection, seller_id: &str) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT count(*) FROM tasks WHERE seller_id = ?1",
        [seller_id],
        |row| row.get(0),
    )?;
    if count > 0 {
        return Ok(0);
    }
    for (name, task_type, category, description) in DEFAULT_TASKS {
        conn.execute(
            "INSERT INTO tasks (task_name, task_type, category, description, seller_id) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![name, task_type, category, description, seller_id],
        )?;
    }
    Ok(DEFAULT_TASKS.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["cashflow_categories", "tasks", "uploaded_files", "cashflow_records", "survey_responses"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
        let count: i64 = conn.query_row("SELECT count(*) FROM cashflow_categories", [], |r| r.get(0)).unwrap();
        assert_eq!(count as usize, DEFAULT_CATEGORIES.len());
    }

    #[test]
    fn test_seeds_every_category_type() {
        let (_dir, conn) = test_db();
        for t in ["income", "expense", "debt", "other"] {
            let n: i64 = conn.query_row(
                "SELECT count(*) FROM cashflow_categories WHERE category_type = ?1", [t], |r| r.get(0),
            ).unwrap();
            assert!(n >= 1, "no {t} categories seeded");
        }
    }

    #[test]
    fn test_seed_tasks_once_per_seller() {
        let (_dir, conn) = test_db();
        assert_eq!(seed_tasks(&conn, "seller-a").unwrap(), DEFAULT_TASKS.len());
        assert_eq!(seed_tasks(&conn, "seller-a").unwrap(), 0);
        assert_eq!(seed_tasks(&conn, "seller-b").unwrap(), DEFAULT_TASKS.len());
    }
}
