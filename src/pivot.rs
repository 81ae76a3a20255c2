//! Cash-flow pivot: reshape flat records into category x year tables and
//! derive yearly income, expense and net figures.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::warn;

use crate::models::{CashflowRecord, Category, CategoryType, UploadedFile};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CashflowSummary {
    pub income_by_year: BTreeMap<i32, f64>,
    pub expenses_by_year: BTreeMap<i32, f64>,
    pub net_by_year: BTreeMap<i32, f64>,
    pub total_income: f64,
    pub total_expenses: f64,
    pub total_net: f64,
}

#[derive(Debug, Clone)]
pub struct PivotedCashflow {
    /// category name -> year -> summed amount
    pub by_category: BTreeMap<String, BTreeMap<i32, f64>>,
    /// year -> category name -> summed amount
    pub by_year: BTreeMap<i32, BTreeMap<String, f64>>,
    pub categories: HashMap<i64, Category>,
    /// Distinct years across all input records, ascending.
    pub years: Vec<i32>,
    /// Distinct names of categories that resolved, sorted.
    pub category_names: Vec<String>,
    pub summary: CashflowSummary,
    pub records: Vec<CashflowRecord>,
    pub file: Option<UploadedFile>,
}

impl PivotedCashflow {
    /// Cell lookup for a table renderer. `None` when the category has no
    /// lines in that year.
    pub fn amount(&self, category_name: &str, year: i32) -> Option<f64> {
        self.by_category
            .get(category_name)
            .and_then(|years| years.get(&year))
            .copied()
    }

    pub fn category_type(&self, category_name: &str) -> Option<CategoryType> {
        self.categories
            .values()
            .find(|c| c.name == category_name)
            .map(|c| c.category_type)
    }
}

pub fn pivot_cashflow(
    records: Vec<CashflowRecord>,
    categories: Vec<Category>,
    file: Option<UploadedFile>,
) -> PivotedCashflow {
    let lookup: HashMap<i64, Category> = categories.into_iter().map(|c| (c.id, c)).collect();

    let years: Vec<i32> = records
        .iter()
        .map(|r| r.year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut by_category: BTreeMap<String, BTreeMap<i32, f64>> = BTreeMap::new();
    // every year gets an entry, even one whose records all fail to resolve
    let mut by_year: BTreeMap<i32, BTreeMap<String, f64>> =
        years.iter().map(|y| (*y, BTreeMap::new())).collect();
    let mut names: BTreeSet<String> = BTreeSet::new();

    for record in &records {
        let Some(category) = lookup.get(&record.category_id) else {
            warn!(
                record_id = record.id,
                category_id = record.category_id,
                "skipping cashflow record with unknown category"
            );
            continue;
        };
        *by_category
            .entry(category.name.clone())
            .or_default()
            .entry(record.year)
            .or_insert(0.0) += record.amount;
        *by_year
            .entry(record.year)
            .or_default()
            .entry(category.name.clone())
            .or_insert(0.0) += record.amount;
        names.insert(category.name.clone());
    }

    let summary = calculate_summary(&records, &lookup, &years);

    PivotedCashflow {
        by_category,
        by_year,
        categories: lookup,
        years,
        category_names: names.into_iter().collect(),
        summary,
        records,
        file,
    }
}

/// Yearly and total income/expense/net. Only `income` and `expense`
/// categories count; `debt` and `other` are left out of both sides.
pub fn calculate_summary(
    records: &[CashflowRecord],
    categories: &HashMap<i64, Category>,
    years: &[i32],
) -> CashflowSummary {
    let zeroed: BTreeMap<i32, f64> = years.iter().map(|y| (*y, 0.0)).collect();
    let mut income_by_year = zeroed.clone();
    let mut expenses_by_year = zeroed.clone();
    let mut net_by_year = zeroed;
    let mut total_income = 0.0f64;
    let mut total_expenses = 0.0f64;

    for record in records {
        let Some(category) = categories.get(&record.category_id) else {
            continue;
        };
        match category.category_type {
            CategoryType::Income => {
                *income_by_year.entry(record.year).or_insert(0.0) += record.amount;
                total_income += record.amount;
            }
            CategoryType::Expense => {
                *expenses_by_year.entry(record.year).or_insert(0.0) += record.amount;
                total_expenses += record.amount;
            }
            CategoryType::Debt | CategoryType::Other => {}
        }
    }

    for (year, net) in net_by_year.iter_mut() {
        let income = income_by_year.get(year).copied().unwrap_or(0.0);
        let expenses = expenses_by_year.get(year).copied().unwrap_or(0.0);
        *net = income - expenses;
    }

    CashflowSummary {
        income_by_year,
        expenses_by_year,
        net_by_year,
        total_income,
        total_expenses,
        total_net: total_income - total_expenses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, category_id: i64, year: i32, amount: f64) -> CashflowRecord {
        CashflowRecord {
            id,
            source_file_id: 1,
            category_id,
            year,
            amount,
        }
    }

    fn category(id: i64, name: &str, category_type: CategoryType) -> Category {
        Category {
            id,
            name: name.to_string(),
            category_type,
        }
    }

    fn sample_categories() -> Vec<Category> {
        vec![
            category(1, "Sales", CategoryType::Income),
            category(2, "Rent", CategoryType::Expense),
            category(3, "Loan Principal", CategoryType::Debt),
            category(4, "Owner Contributions", CategoryType::Other),
        ]
    }

    #[test]
    fn test_sales_and_rent_example() {
        let records = vec![record(1, 1, 2022, 100.0), record(2, 1, 2022, 50.0), record(3, 2, 2022, -30.0)];
        let pivot = pivot_cashflow(records, sample_categories(), None);

        assert_eq!(pivot.by_category["Sales"][&2022], 150.0);
        assert_eq!(pivot.by_category["Rent"][&2022], -30.0);
        assert_eq!(pivot.by_category.len(), 2);
        assert_eq!(pivot.summary.income_by_year[&2022], 150.0);
        assert_eq!(pivot.summary.expenses_by_year[&2022], -30.0);
        assert_eq!(pivot.summary.net_by_year[&2022], 180.0);
        assert_eq!(pivot.summary.total_income, 150.0);
        assert_eq!(pivot.summary.total_expenses, -30.0);
        assert_eq!(pivot.summary.total_net, 180.0);
    }

    #[test]
    fn test_years_sorted_distinct_including_unresolved() {
        let records = vec![
            record(1, 1, 2023, 1.0),
            record(2, 1, 2021, 1.0),
            record(3, 99, 2019, 1.0),
            record(4, 2, 2023, 1.0),
        ];
        let pivot = pivot_cashflow(records, sample_categories(), None);
        assert_eq!(pivot.years, vec![2019, 2021, 2023]);
        // every year has a zero-or-more entry in every summary map
        for y in &pivot.years {
            assert!(pivot.summary.income_by_year.contains_key(y));
            assert!(pivot.summary.expenses_by_year.contains_key(y));
            assert!(pivot.summary.net_by_year.contains_key(y));
        }
        assert_eq!(pivot.summary.net_by_year[&2019], 0.0);
    }

    #[test]
    fn test_year_with_only_unknown_categories_has_empty_column() {
        let records = vec![record(1, 1, 2022, 40.0), record(2, 99, 2019, 5.0)];
        let pivot = pivot_cashflow(records, sample_categories(), None);
        assert_eq!(pivot.years, vec![2019, 2022]);
        let per_year: Vec<f64> = pivot.years.iter().map(|y| pivot.by_year[y].values().sum()).collect();
        assert_eq!(per_year, vec![0.0, 40.0]);
        assert!(pivot.by_year[&2019].is_empty());
        assert_eq!(pivot.summary.income_by_year[&2019], 0.0);
    }

    #[test]
    fn test_unknown_category_contributes_nothing() {
        let records = vec![record(1, 1, 2022, 10.0), record(2, 42, 2022, 1000.0)];
        let pivot = pivot_cashflow(records, sample_categories(), None);
        assert_eq!(pivot.category_names, vec!["Sales".to_string()]);
        assert_eq!(pivot.by_year[&2022].values().sum::<f64>(), 10.0);
        assert_eq!(pivot.summary.total_income, 10.0);
        assert_eq!(pivot.summary.total_net, 10.0);
        // still carried through untouched
        assert_eq!(pivot.records.len(), 2);
    }

    #[test]
    fn test_debt_and_other_excluded_from_summary() {
        let records = vec![
            record(1, 1, 2024, 500.0),
            record(2, 3, 2024, -200.0),
            record(3, 4, 2024, 75.0),
        ];
        let pivot = pivot_cashflow(records, sample_categories(), None);
        assert_eq!(pivot.summary.total_income, 500.0);
        assert_eq!(pivot.summary.total_expenses, 0.0);
        assert_eq!(pivot.summary.total_net, 500.0);
        // but they still appear in the pivot itself
        assert_eq!(pivot.amount("Loan Principal", 2024), Some(-200.0));
        assert_eq!(pivot.amount("Owner Contributions", 2024), Some(75.0));
        assert_eq!(pivot.category_names.len(), 3);
    }

    #[test]
    fn test_views_agree_per_year() {
        let records = vec![
            record(1, 1, 2020, 12.5),
            record(2, 2, 2020, -3.25),
            record(3, 1, 2021, 7.0),
            record(4, 3, 2021, -1.0),
            record(5, 4, 2020, 2.0),
            record(6, 2, 2021, -4.5),
        ];
        let pivot = pivot_cashflow(records, sample_categories(), None);
        for y in &pivot.years {
            let from_categories: f64 = pivot.by_category.values().filter_map(|m| m.get(y)).sum();
            let from_year: f64 = pivot.by_year[y].values().sum();
            assert_eq!(from_categories, from_year, "views disagree for {y}");
            let s = &pivot.summary;
            assert_eq!(s.net_by_year[y], s.income_by_year[y] - s.expenses_by_year[y]);
        }
        let s = &pivot.summary;
        assert_eq!(s.total_net, s.total_income - s.total_expenses);
    }

    #[test]
    fn test_record_order_does_not_change_totals() {
        let records = vec![
            record(1, 1, 2020, 1.0),
            record(2, 1, 2020, 2.0),
            record(3, 2, 2021, -8.0),
            record(4, 1, 2021, 4.0),
        ];
        let mut reversed = records.clone();
        reversed.reverse();
        let a = pivot_cashflow(records, sample_categories(), None);
        let b = pivot_cashflow(reversed, sample_categories(), None);
        assert_eq!(a.by_category, b.by_category);
        assert_eq!(a.by_year, b.by_year);
        assert_eq!(a.summary, b.summary);
        assert_eq!(a.years, b.years);
    }

    #[test]
    fn test_empty_input() {
        let pivot = pivot_cashflow(vec![], sample_categories(), None);
        assert!(pivot.years.is_empty());
        assert!(pivot.category_names.is_empty());
        assert_eq!(pivot.summary, CashflowSummary::default());
        assert_eq!(pivot.categories.len(), 4);
    }

    #[test]
    fn test_category_type_lookup_by_name() {
        let pivot = pivot_cashflow(vec![record(1, 2, 2022, -1.0)], sample_categories(), None);
        assert_eq!(pivot.category_type("Rent"), Some(CategoryType::Expense));
        assert_eq!(pivot.category_type("Nope"), None);
        assert_eq!(pivot.amount("Rent", 2022), Some(-1.0));
        assert_eq!(pivot.amount("Rent", 1999), None);
    }
}
