use std::path::Path;

use colored::Colorize;

use crate::cli::open_configured;
use crate::error::{IntakeError, Result};
use crate::importer;

pub fn run(file: &str, task: Option<i64>, strict: bool) -> Result<()> {
    let path = Path::new(file);
    if !path.exists() {
        return Err(IntakeError::Other(format!("File not found: {file}")));
    }

    let (settings, store) = open_configured()?;
    let owner = settings.owner()?;
    let business = settings.business()?;

    let result = store.with_conn(|conn| importer::import_file(conn, path, &owner, &business, task, strict))?;

    println!(
        "Imported {} lines from {} as file {}",
        result.imported,
        file,
        result.file_id
    );
    if result.skipped > 0 {
        println!(
            "{} {} lines with unknown categories: {}",
            "Skipped".yellow(),
            result.skipped,
            result.unknown_categories.join(", ")
        );
        println!("Add them with `intake categories add <name> --type <type>` and re-import.");
    }
    Ok(())
}
