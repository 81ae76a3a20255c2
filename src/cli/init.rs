use std::path::PathBuf;

use crate::db::{get_connection, init_db, seed_tasks};
use crate::error::Result;
use crate::models::EntityId;
use crate::settings::{expand_data_dir, load_settings, save_settings};

pub fn run(data_dir: Option<String>, business: Option<String>, owner: Option<String>) -> Result<()> {
    let mut settings = load_settings();

    if let Some(dir) = data_dir {
        settings.data_dir = expand_data_dir(&dir);
    }

    // explicit ids are validated; never replaced by a default
    let business = match business {
        Some(raw) => EntityId::parse(&raw)?,
        None => match settings.business_id.as_deref() {
            Some(raw) => EntityId::parse(raw)?,
            None => {
                let id = EntityId::new_random();
                println!("Created business id {id}");
                id
            }
        },
    };
    let owner = match owner {
        Some(raw) => EntityId::parse(&raw)?,
        None => match settings.owner_id.as_deref() {
            Some(raw) => EntityId::parse(raw)?,
            None => EntityId::new_random(),
        },
    };
    settings.business_id = Some(business.to_string());
    settings.owner_id = Some(owner.to_string());

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;

    let conn = get_connection(&settings.db_path())?;
    init_db(&conn)?;
    let seeded = seed_tasks(&conn, business.as_str())?;

    save_settings(&settings)?;

    println!("Initialized intake at {}", resolved.display());
    println!("Business:   {business}");
    if seeded > 0 {
        println!("Added {seeded} onboarding tasks");
    }
    Ok(())
}
