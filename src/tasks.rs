use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::{FileStatus, SurveyResponse, Task, UploadedFile};

pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq)]
pub struct TaskStatus {
    pub task: Task,
    pub is_complete: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskCategory {
    pub name: String,
    pub tasks: Vec<TaskStatus>,
    pub is_complete: bool,
}

/// Attach a completion flag to each task. A task is complete when a
/// processed, non-deleted file references it or it has a saved response
/// with visible text. A response of only whitespace counts as empty.
pub fn resolve_completion(
    tasks: Vec<Task>,
    files: &[UploadedFile],
    responses: &[SurveyResponse],
) -> Vec<TaskStatus> {
    let uploaded: HashSet<i64> = files
        .iter()
        .filter(|f| f.status == FileStatus::Processed && !f.is_deleted())
        .filter_map(|f| f.task_id)
        .collect();
    let answered: HashSet<i64> = responses
        .iter()
        .filter(|r| r.value.as_deref().is_some_and(|v| !v.trim().is_empty()))
        .map(|r| r.task_id)
        .collect();

    tasks
        .into_iter()
        .map(|task| {
            let is_complete = uploaded.contains(&task.task_id) || answered.contains(&task.task_id);
            TaskStatus { task, is_complete }
        })
        .collect()
}

/// Bucket tasks by category, alphabetically, with "Uncategorized" last.
/// Task order inside a bucket follows the input order.
pub fn group_by_category(tasks: Vec<TaskStatus>) -> Vec<TaskCategory> {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<TaskStatus>> = HashMap::new();

    for status in tasks {
        let name = status
            .task
            .category
            .clone()
            .unwrap_or_else(|| UNCATEGORIZED.to_string());
        buckets
            .entry(name.clone())
            .or_insert_with(|| {
                order.push(name);
                Vec::new()
            })
            .push(status);
    }

    let mut categories: Vec<TaskCategory> = order
        .into_iter()
        .map(|name| {
            let tasks = buckets.remove(&name).unwrap_or_default();
            let is_complete = tasks.iter().all(|t| t.is_complete);
            TaskCategory {
                name,
                tasks,
                is_complete,
            }
        })
        .collect();

    categories.sort_by(|a, b| category_order(&a.name, &b.name));
    categories
}

/// Convenience for callers holding raw store rows.
pub fn aggregate(tasks: Vec<Task>, files: &[UploadedFile], responses: &[SurveyResponse]) -> Vec<TaskCategory> {
    group_by_category(resolve_completion(tasks, files, responses))
}

fn category_order(a: &str, b: &str) -> Ordering {
    match (a == UNCATEGORIZED, b == UNCATEGORIZED) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => locale_cmp(a, b),
    }
}

/// Dictionary-style comparison in three levels: base letters ignoring
/// accents and case, then accents, then case with lowercase first. So
/// "école" < "Équipement" < "Zoning" and "resume" < "résumé".
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    let base = |s: &str| {
        s.nfd()
            .filter(|c| !is_combining_mark(*c))
            .flat_map(char::to_lowercase)
            .collect::<String>()
    };
    let accented = |s: &str| s.nfd().flat_map(char::to_lowercase).collect::<String>();
    let case_mask = |s: &str| s.nfd().map(char::is_uppercase).collect::<Vec<_>>();

    base(a)
        .cmp(&base(b))
        .then_with(|| accented(a).cmp(&accented(b)))
        .then_with(|| case_mask(a).cmp(&case_mask(b)))
}

pub fn completed_count(categories: &[TaskCategory]) -> (usize, usize) {
    let total = categories.iter().map(|c| c.tasks.len()).sum();
    let done = categories
        .iter()
        .flat_map(|c| c.tasks.iter())
        .filter(|t| t.is_complete)
        .count();
    (done, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: i64, name: &str, category: Option<&str>) -> Task {
        Task {
            task_id: id,
            task_name: name.to_string(),
            description: None,
            task_type: "upload".to_string(),
            category: category.map(str::to_string),
            seller_id: "seller".to_string(),
        }
    }

    fn file(task_id: Option<i64>, status: FileStatus, deleted: Option<bool>) -> UploadedFile {
        UploadedFile {
            id: 1,
            filename: "doc.csv".to_string(),
            status,
            owner_id: String::new(),
            business_id: String::new(),
            task_id,
            checksum: None,
            created_at: String::new(),
            processed_at: None,
            is_deleted: deleted,
        }
    }

    fn response(task_id: i64, value: Option<&str>) -> SurveyResponse {
        SurveyResponse {
            id: task_id,
            business_id: String::new(),
            task_id,
            value: value.map(str::to_string),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_single_uncategorized_task() {
        let cats = aggregate(vec![task(1, "t1", None)], &[], &[]);
        assert_eq!(cats.len(), 1);
        assert_eq!(cats[0].name, UNCATEGORIZED);
        assert_eq!(cats[0].tasks.len(), 1);
        assert!(!cats[0].tasks[0].is_complete);
        assert!(!cats[0].is_complete);
    }

    #[test]
    fn test_processed_file_completes_task() {
        let files = vec![file(Some(1), FileStatus::Processed, None)];
        let resolved = resolve_completion(vec![task(1, "a", None), task(2, "b", None)], &files, &[]);
        assert!(resolved[0].is_complete);
        assert!(!resolved[1].is_complete);
    }

    #[test]
    fn test_unprocessed_or_deleted_file_does_not_complete() {
        let files = vec![
            file(Some(1), FileStatus::Parsing, None),
            file(Some(1), FileStatus::Error, None),
            file(Some(1), FileStatus::Processed, Some(true)),
        ];
        let resolved = resolve_completion(vec![task(1, "a", None)], &files, &[]);
        assert!(!resolved[0].is_complete);
    }

    #[test]
    fn test_response_completes_only_when_non_empty() {
        let responses = vec![response(1, Some("Retiring")), response(2, Some("  ")), response(3, None)];
        let tasks = vec![task(1, "a", None), task(2, "b", None), task(3, "c", None)];
        let flags: Vec<bool> = resolve_completion(tasks, &[], &responses)
            .into_iter()
            .map(|t| t.is_complete)
            .collect();
        assert_eq!(flags, vec![true, false, false]);
    }

    #[test]
    fn test_uncategorized_sorts_last() {
        let tasks = vec![
            task(1, "a", None),
            task(2, "b", Some("Zoning")),
            task(3, "c", Some("Financials")),
            task(4, "d", Some("Very Last Alphabetically Zzz")),
        ];
        let names: Vec<String> = aggregate(tasks, &[], &[]).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Financials", "Very Last Alphabetically Zzz", "Zoning", UNCATEGORIZED]);
    }

    #[test]
    fn test_category_complete_iff_all_tasks_complete() {
        let tasks = vec![
            TaskStatus { task: task(1, "a", Some("Tax")), is_complete: true },
            TaskStatus { task: task(2, "b", Some("Tax")), is_complete: false },
            TaskStatus { task: task(3, "c", Some("Legal")), is_complete: true },
        ];
        let cats = group_by_category(tasks);
        let legal = cats.iter().find(|c| c.name == "Legal").unwrap();
        let tax = cats.iter().find(|c| c.name == "Tax").unwrap();
        assert!(legal.is_complete);
        assert!(!tax.is_complete);
        assert_eq!(tax.tasks.len(), 2);
        assert_eq!(completed_count(&cats), (2, 3));
    }

    #[test]
    fn test_tasks_keep_input_order_within_bucket() {
        let tasks = vec![task(1, "Balance sheets", Some("Fin")), task(2, "Audits", Some("Fin"))];
        let cats = aggregate(tasks, &[], &[]);
        let ids: Vec<i64> = cats[0].tasks.iter().map(|t| t.task.task_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_locale_cmp_ignores_case_first() {
        assert_eq!(locale_cmp("apple", "Banana"), Ordering::Less);
        assert_eq!(locale_cmp("banana", "Banana"), Ordering::Less);
        assert_eq!(locale_cmp("Legal", "legal documents"), Ordering::Less);
        assert_eq!(locale_cmp("tax", "tax"), Ordering::Equal);
    }

    #[test]
    fn test_accented_categories_sort_with_their_base_letter() {
        let tasks = vec![
            task(1, "a", Some("Zoning")),
            task(2, "b", Some("\u{c9}quipement")),
            task(3, "c", None),
            task(4, "d", Some("Banking")),
            task(5, "e", Some("\u{e9}cole")),
        ];
        let names: Vec<String> = aggregate(tasks, &[], &[]).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Banking", "\u{e9}cole", "\u{c9}quipement", "Zoning", UNCATEGORIZED]);
    }

    #[test]
    fn test_locale_cmp_accent_and_case_break_ties() {
        assert_eq!(locale_cmp("resume", "r\u{e9}sum\u{e9}"), Ordering::Less);
        assert_eq!(locale_cmp("r\u{e9}sum\u{e9}", "Resume"), Ordering::Greater);
        assert_eq!(locale_cmp("\u{e9}t\u{e9}", "\u{c9}t\u{e9}"), Ordering::Less);
        // precomposed and decomposed spellings are equal
        assert_eq!(locale_cmp("caf\u{e9}", "cafe\u{301}"), Ordering::Equal);
    }

    #[test]
    fn test_empty_input_yields_no_buckets() {
        assert!(aggregate(vec![], &[], &[]).is_empty());
    }
}
