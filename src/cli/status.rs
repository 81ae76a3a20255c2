use crate::cli::open_store;
use crate::error::Result;
use crate::recent::RecentFiles;
use crate::settings::load_settings;
use crate::store::{FileFilter, RecordStore};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = settings.db_path();

    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());
    println!("Business:   {}", settings.business_id.as_deref().unwrap_or("(not set)"));
    println!("Owner:      {}", settings.owner_id.as_deref().unwrap_or("(not set)"));

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `intake init` to set up.");
        return Ok(());
    }

    let store = open_store(&settings)?;
    let business = settings.business()?;
    let files = store.list_files(&FileFilter {
        business_id: Some(business.to_string()),
        ..Default::default()
    })?;
    let processed = files.iter().filter(|f| f.status == crate::models::FileStatus::Processed).count();
    let tasks = store.list_tasks(business.as_str())?.len();
    let categories = store.list_categories()?.len();

    println!();
    println!("Documents:     {} ({processed} processed)", files.len());
    println!("Tasks:         {tasks}");
    println!("Categories:    {categories}");
    match RecentFiles::default_location().get(business.as_str()) {
        Some(id) => println!("Last analyzed: file {id}"),
        None => println!("Last analyzed: (none)"),
    }
    Ok(())
}
