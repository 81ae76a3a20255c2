use comfy_table::{Cell, Table};

use crate::cli::open_configured;
use crate::error::{IntakeError, Result};
use crate::models::CategoryType;
use crate::store::{add_category, find_category_id, RecordStore};

pub fn list() -> Result<()> {
    let (_settings, store) = open_configured()?;
    let mut categories = store.list_categories()?;
    categories.sort_by(|a, b| {
        a.category_type
            .key()
            .cmp(b.category_type.key())
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Type"]);
    for c in &categories {
        table.add_row(vec![Cell::new(c.id), Cell::new(&c.name), Cell::new(c.category_type.key())]);
    }
    println!("Categories\n{table}");
    Ok(())
}

pub fn add(name: &str, category_type: &str) -> Result<()> {
    let category_type = CategoryType::from_key(category_type).ok_or_else(|| {
        IntakeError::Other(format!(
            "Unknown category type: {category_type} (expected income, expense, debt or other)"
        ))
    })?;
    let (_settings, store) = open_configured()?;
    let id = store.with_conn(|conn| {
        if find_category_id(conn, name)?.is_some() {
            return Err(IntakeError::Other(format!("Category already exists: {name}")));
        }
        add_category(conn, name, category_type)
    })?;
    println!("Added category {name} ({}) as {id}", category_type.key());
    Ok(())
}
