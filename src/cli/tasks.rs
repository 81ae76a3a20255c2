use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_configured;
use crate::error::{IntakeError, Result};
use crate::fmt::percent;
use crate::store::{add_task, save_response, task_exists, FileFilter, RecordStore};
use crate::tasks::{aggregate, completed_count};

pub fn list() -> Result<()> {
    let (settings, store) = open_configured()?;
    let business = settings.business()?;

    let tasks = store.list_tasks(business.as_str())?;
    let files = store.list_files(&FileFilter {
        business_id: Some(business.to_string()),
        ..Default::default()
    })?;
    let responses = store.list_responses(business.as_str())?;

    let categories = aggregate(tasks, &files, &responses);
    if categories.is_empty() {
        println!("No tasks. Add one with `intake tasks add <name>`.");
        return Ok(());
    }

    for category in &categories {
        let mark = if category.is_complete { "\u{2713}".green() } else { "\u{2717}".red() };
        println!("{mark} {}", category.name.bold());
        let mut table = Table::new();
        table.set_header(vec!["ID", "Task", "Type", "Done"]);
        for t in &category.tasks {
            table.add_row(vec![
                Cell::new(t.task.task_id),
                Cell::new(&t.task.task_name),
                Cell::new(&t.task.task_type),
                Cell::new(if t.is_complete { "yes".green() } else { "no".red() }),
            ]);
        }
        println!("{table}\n");
    }

    let (done, total) = completed_count(&categories);
    println!("Completed {done} of {total} tasks ({})", percent(done, total));
    Ok(())
}

pub fn add(name: &str, category: Option<&str>, task_type: &str, description: Option<&str>) -> Result<()> {
    if !matches!(task_type, "upload" | "survey") {
        return Err(IntakeError::Other(format!(
            "Unknown task type: {task_type} (expected upload or survey)"
        )));
    }
    let (settings, store) = open_configured()?;
    let business = settings.business()?;
    let category = category.map(str::trim).filter(|c| !c.is_empty());
    let id = store.with_conn(|conn| {
        add_task(conn, business.as_str(), name, task_type, category, description)
    })?;
    println!("Added task {id}: {name}");
    Ok(())
}

pub fn respond(task_id: i64, value: &str) -> Result<()> {
    let (settings, store) = open_configured()?;
    let business = settings.business()?;
    store.with_conn(|conn| {
        if !task_exists(conn, business.as_str(), task_id)? {
            return Err(IntakeError::UnknownTask(task_id));
        }
        save_response(conn, business.as_str(), task_id, value)
    })?;
    if value.trim().is_empty() {
        println!("Cleared answer for task {task_id}");
    } else {
        println!("Saved answer for task {task_id}");
    }
    Ok(())
}
