use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::analysis::{resolve_file, AnalysisLoader};
use crate::cli::open_configured;
use crate::error::{IntakeError, Result};
use crate::fmt::{cell, money};
use crate::models::CategoryType;
use crate::pivot::PivotedCashflow;
use crate::recent::RecentFiles;
use crate::store::RecordStore;

pub fn run(file: Option<i64>) -> Result<()> {
    let (settings, store) = open_configured()?;
    let business = settings.business()?;
    let recent = RecentFiles::default_location();

    let file_id = match file {
        // another business's document reads as missing
        Some(id) => match store.get_file(id)? {
            Some(f) if f.business_id == business.as_str() => id,
            _ => return Err(IntakeError::FileNotFound(id)),
        },
        None => match resolve_file(&store, &recent, business.as_str())? {
            Some(f) => f.id,
            None => {
                println!("No processed documents yet. Import one with `intake import <file>`.");
                return Ok(());
            }
        },
    };

    let loader = AnalysisLoader::new();
    loader.load(&store, file_id);

    let state = loader.take();
    if let Some(pivot) = state.value() {
        recent.remember(business.as_str(), file_id);
        print!("{}", render(pivot));
        return Ok(());
    }
    Err(IntakeError::Other(
        state.error().unwrap_or("analysis did not complete").to_string(),
    ))
}

fn type_label(t: Option<CategoryType>) -> String {
    t.map(|t| t.key().to_string()).unwrap_or_default()
}

fn money_cell(v: f64) -> Cell {
    Cell::new(money(v)).set_alignment(CellAlignment::Right)
}

pub(crate) fn render(pivot: &PivotedCashflow) -> String {
    let mut out = String::new();
    if let Some(file) = &pivot.file {
        out.push_str(&format!("Cash-flow analysis: {} (file {})\n", file.filename, file.id));
    }
    if pivot.years.is_empty() {
        out.push_str("No cash-flow lines in this document.\n");
        return out;
    }

    let mut header = vec!["Category".to_string(), "Type".to_string()];
    header.extend(pivot.years.iter().map(|y| y.to_string()));
    header.push("Total".to_string());

    let mut table = Table::new();
    table.set_header(header);
    for name in &pivot.category_names {
        let mut row = vec![Cell::new(name), Cell::new(type_label(pivot.category_type(name)))];
        let mut total = 0.0;
        for year in &pivot.years {
            let v = pivot.amount(name, *year);
            total += v.unwrap_or(0.0);
            row.push(Cell::new(cell(v)).set_alignment(CellAlignment::Right));
        }
        row.push(money_cell(total));
        table.add_row(row);
    }
    out.push_str(&format!("{table}\n"));

    let s = &pivot.summary;
    let mut summary = Table::new();
    let mut header = vec![String::new()];
    header.extend(pivot.years.iter().map(|y| y.to_string()));
    header.push("Total".to_string());
    summary.set_header(header);

    let line = |label: Cell, by_year: &std::collections::BTreeMap<i32, f64>, total: f64| {
        let mut row = vec![label];
        for year in &pivot.years {
            row.push(money_cell(by_year.get(year).copied().unwrap_or(0.0)));
        }
        row.push(money_cell(total));
        row
    };
    summary.add_row(line(Cell::new("Income".green().bold()), &s.income_by_year, s.total_income));
    summary.add_row(line(Cell::new("Expenses".red().bold()), &s.expenses_by_year, s.total_expenses));
    let net_label = if s.total_net >= 0.0 { "Net".green().bold() } else { "Net".red().bold() };
    summary.add_row(line(Cell::new(net_label), &s.net_by_year, s.total_net));
    out.push_str(&format!("Summary\n{summary}\n"));

    let skipped = pivot
        .records
        .iter()
        .filter(|r| !pivot.categories.contains_key(&r.category_id))
        .count();
    if skipped > 0 {
        out.push_str(&format!("{} {skipped} lines with unknown categories were left out.\n", "Note:".yellow()));
    }
    out
}
