use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_configured;
use crate::error::{IntakeError, Result};
use crate::models::FileStatus;
use crate::recent::RecentFiles;
use crate::store::{FileFilter, RecordStore};

pub fn list(status: Option<String>, mine: bool) -> Result<()> {
    let (settings, store) = open_configured()?;
    let status = match status.as_deref() {
        Some(key) => Some(
            FileStatus::from_key(key).ok_or_else(|| IntakeError::Other(format!("Unknown status: {key}")))?,
        ),
        None => None,
    };
    let filter = FileFilter {
        owner_id: if mine { Some(settings.owner()?.to_string()) } else { None },
        business_id: Some(settings.business()?.to_string()),
        status,
    };
    let files = store.list_files(&filter)?;

    if files.is_empty() {
        println!("No documents.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Filename", "Status", "Task", "Uploaded", "Processed"]);
    for f in &files {
        let status = match f.status {
            FileStatus::Processed => f.status.key().green(),
            FileStatus::Error => f.status.key().red(),
            _ => f.status.key().yellow(),
        };
        table.add_row(vec![
            Cell::new(f.id),
            Cell::new(&f.filename),
            Cell::new(status),
            Cell::new(f.task_id.map(|t| t.to_string()).unwrap_or_default()),
            Cell::new(&f.created_at),
            Cell::new(f.processed_at.as_deref().unwrap_or("")),
        ]);
    }
    println!("Documents\n{table}");
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let (settings, store) = open_configured()?;
    let business = settings.business()?;
    match store.get_file(id)? {
        Some(f) if f.business_id == business.as_str() => {}
        _ => return Err(IntakeError::FileNotFound(id)),
    }
    if !store.soft_delete_file(id)? {
        return Err(IntakeError::FileNotFound(id));
    }
    let recent = RecentFiles::default_location();
    if recent.get(business.as_str()) == Some(id) {
        recent.forget(business.as_str());
    }
    println!("Deleted file {id}");
    Ok(())
}
