use std::collections::BTreeSet;
use std::path::Path;

use rusqlite::Connection;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{IntakeError, Result};
use crate::models::{EntityId, FileStatus, ParsedLine};
use crate::store::{find_category_id, find_file_by_checksum, insert_file, set_file_status, task_exists};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a spreadsheet amount: `1,234.50`, `$-20`, `(75.00)` for negatives.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.replace([',', '"', '$'], "");
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return inner.trim().parse::<f64>().ok().map(|v| -v);
    }
    s.parse().ok()
}

fn parse_year(raw: &str) -> Option<i32> {
    let y: i32 = raw.trim().trim_start_matches("FY").trim().parse().ok()?;
    (1900..=2200).contains(&y).then_some(y)
}

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Read cash-flow lines from a CSV. Two layouts are accepted:
///
/// * long: `category,year,amount` columns (any order, any case)
/// * wide: a category column followed by one column per year
///
/// Blank amounts are skipped; unparseable ones are an error.
pub fn parse_lines(file_path: &Path) -> Result<Vec<ParsedLine>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(file_path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_lowercase()).collect();

    let col = |name: &str| headers.iter().position(|h| h == name);
    let mut lines = Vec::new();

    if let (Some(cat), Some(year), Some(amount)) = (col("category"), col("year"), col("amount")) {
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let row = i + 2;
            let category = record.get(cat).unwrap_or("").to_string();
            if category.is_empty() {
                continue;
            }
            let year = record
                .get(year)
                .and_then(parse_year)
                .ok_or_else(|| IntakeError::Other(format!("row {row}: invalid year")))?;
            let Some(raw_amount) = record.get(amount).filter(|a| !a.is_empty()) else {
                continue;
            };
            let amount = parse_amount(raw_amount)
                .ok_or_else(|| IntakeError::Other(format!("row {row}: invalid amount {raw_amount:?}")))?;
            lines.push(ParsedLine { category, year, amount });
        }
        return Ok(lines);
    }

    let year_columns: Vec<(usize, i32)> = headers
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(i, h)| parse_year(h).map(|y| (i, y)))
        .collect();
    if year_columns.is_empty() {
        return Err(IntakeError::Other(
            "unrecognized layout: expected category/year/amount columns or year columns".to_string(),
        ));
    }

    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = i + 2;
        let category = record.get(0).unwrap_or("").to_string();
        if category.is_empty() {
            continue;
        }
        for (idx, year) in &year_columns {
            let Some(raw_amount) = record.get(*idx).filter(|a| !a.is_empty()) else {
                continue;
            };
            let amount = parse_amount(raw_amount)
                .ok_or_else(|| IntakeError::Other(format!("row {row}: invalid amount {raw_amount:?}")))?;
            lines.push(ParsedLine {
                category: category.clone(),
                year: *year,
                amount,
            });
        }
    }
    Ok(lines)
}

// ---------------------------------------------------------------------------
// import_file
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ImportResult {
    pub file_id: i64,
    pub imported: usize,
    pub skipped: usize,
    pub unknown_categories: Vec<String>,
}

/// Register `file_path` as an uploaded file for the business and parse its
/// lines into cash-flow records. The file row moves uploading -> parsing ->
/// processed, or to `error` if parsing or storing fails. Lines with unknown
/// categories are skipped, or fail the import when `strict` is set.
pub fn import_file(
    conn: &Connection,
    file_path: &Path,
    owner: &EntityId,
    business: &EntityId,
    task_id: Option<i64>,
    strict: bool,
) -> Result<ImportResult> {
    if let Some(task_id) = task_id {
        if !task_exists(conn, business.as_str(), task_id)? {
            return Err(IntakeError::UnknownTask(task_id));
        }
    }

    let checksum = compute_checksum(file_path)?;
    if let Some(existing) = find_file_by_checksum(conn, business.as_str(), &checksum)? {
        return Err(IntakeError::DuplicateFile(existing));
    }

    let filename = file_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file_path.display().to_string());
    let file_id = insert_file(conn, &filename, owner.as_str(), business.as_str(), task_id, Some(&checksum))?;
    set_file_status(conn, file_id, FileStatus::Parsing)?;

    let lines = match parse_lines(file_path) {
        Ok(lines) => lines,
        Err(e) => {
            warn!(file_id, filename = %filename, error = %e, "parse failed");
            set_file_status(conn, file_id, FileStatus::Error)?;
            return Err(e);
        }
    };

    let stored = match store_lines(conn, file_id, &lines, strict) {
        Ok(stored) => stored,
        Err(e) => {
            warn!(file_id, filename = %filename, error = %e, "storing lines failed");
            set_file_status(conn, file_id, FileStatus::Error)?;
            return Err(e);
        }
    };

    set_file_status(conn, file_id, FileStatus::Processed)?;
    info!(file_id, imported = stored.imported, skipped = stored.skipped, "import complete");

    Ok(ImportResult {
        file_id,
        imported: stored.imported,
        skipped: stored.skipped,
        unknown_categories: stored.unknown_categories,
    })
}

struct StoredLines {
    imported: usize,
    skipped: usize,
    unknown_categories: Vec<String>,
}

/// Insert the resolvable lines as records in one transaction. Nothing is
/// kept if any insert fails, or if `strict` and a category is unknown.
fn store_lines(conn: &Connection, file_id: i64, lines: &[ParsedLine], strict: bool) -> Result<StoredLines> {
    let mut imported = 0usize;
    let mut skipped = 0usize;
    let mut unknown: BTreeSet<String> = BTreeSet::new();

    let tx = conn.unchecked_transaction()?;
    for line in lines {
        let Some(category_id) = find_category_id(&tx, &line.category)? else {
            unknown.insert(line.category.clone());
            skipped += 1;
            continue;
        };
        tx.execute(
            "INSERT INTO cashflow_records (source_file_id, category_id, year, amount) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![file_id, category_id, line.year, line.amount],
        )?;
        imported += 1;
    }
    let unknown_categories: Vec<String> = unknown.into_iter().collect();
    if strict && !unknown_categories.is_empty() {
        return Err(IntakeError::UnknownCategory(unknown_categories.join(", ")));
    }
    tx.commit()?;

    Ok(StoredLines {
        imported,
        skipped,
        unknown_categories,
    })
}
