use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::{IntakeError, Result};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Business or owner identifier. Must be a UUID; anything else is rejected
/// rather than substituted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        uuid::Uuid::parse_str(trimmed)
            .map(|u| Self(u.hyphenated().to_string()))
            .map_err(|_| IntakeError::InvalidIdentifier(raw.to_string()))
    }

    pub fn new_random() -> Self {
        Self(uuid::Uuid::new_v4().hyphenated().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryType {
    Income,
    Expense,
    Debt,
    Other,
}

impl CategoryType {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Debt => "debt",
            Self::Other => "other",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_lowercase().as_str() {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            "debt" => Some(Self::Debt),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl ToSql for CategoryType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.key()))
    }
}

impl FromSql for CategoryType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Self::from_key(s).ok_or_else(|| FromSqlError::Other(format!("bad category type: {s}").into()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub category_type: CategoryType,
}

// ---------------------------------------------------------------------------
// Uploaded files and cash-flow records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Uploading,
    Parsing,
    Processed,
    Error,
    Pending,
}

impl FileStatus {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Uploading => "uploading",
            Self::Parsing => "parsing",
            Self::Processed => "processed",
            Self::Error => "error",
            Self::Pending => "pending",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "uploading" => Some(Self::Uploading),
            "parsing" => Some(Self::Parsing),
            "processed" => Some(Self::Processed),
            "error" => Some(Self::Error),
            "pending" => Some(Self::Pending),
            _ => None,
        }
    }
}

impl ToSql for FileStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.key()))
    }
}

impl FromSql for FileStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Self::from_key(s).ok_or_else(|| FromSqlError::Other(format!("bad file status: {s}").into()))
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub id: i64,
    pub filename: String,
    pub status: FileStatus,
    pub owner_id: String,
    pub business_id: String,
    pub task_id: Option<i64>,
    pub checksum: Option<String>,
    pub created_at: String,
    pub processed_at: Option<String>,
    /// NULL in storage means "not deleted".
    pub is_deleted: Option<bool>,
}

impl UploadedFile {
    pub fn is_deleted(&self) -> bool {
        self.is_deleted == Some(true)
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub struct CashflowRecord {
    pub id: i64,
    pub source_file_id: i64,
    pub category_id: i64,
    pub year: i32,
    pub amount: f64,
}

// ---------------------------------------------------------------------------
// Tasks and survey responses
// ---------------------------------------------------------------------------

#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub task_id: i64,
    pub task_name: String,
    pub description: Option<String>,
    pub task_type: String,
    pub category: Option<String>,
    pub seller_id: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyResponse {
    pub id: i64,
    pub business_id: String,
    pub task_id: i64,
    pub value: Option<String>,
    pub updated_at: String,
}

/// Intermediate representation from the CSV parser before DB insert.
#[derive(Debug, Clone)]
pub struct ParsedLine {
    pub category: String,
    pub year: i32,
    pub amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_accepts_uuid() {
        let id = EntityId::parse(" 6F9619FF-8B86-D011-B42D-00C04FC964FF ").unwrap();
        assert_eq!(id.as_str(), "6f9619ff-8b86-d011-b42d-00c04fc964ff");
    }

    #[test]
    fn test_entity_id_rejects_garbage() {
        let err = EntityId::parse("not-a-business").unwrap_err();
        assert!(matches!(err, IntakeError::InvalidIdentifier(ref s) if s == "not-a-business"));
        assert!(EntityId::parse("").is_err());
    }

    #[test]
    fn test_category_type_keys() {
        for t in [CategoryType::Income, CategoryType::Expense, CategoryType::Debt, CategoryType::Other] {
            assert_eq!(CategoryType::from_key(t.key()), Some(t));
        }
        assert_eq!(CategoryType::from_key(" Income "), Some(CategoryType::Income));
        assert_eq!(CategoryType::from_key("asset"), None);
    }

    #[test]
    fn test_file_status_unknown_key() {
        assert_eq!(FileStatus::from_key("processed"), Some(FileStatus::Processed));
        assert_eq!(FileStatus::from_key("done"), None);
    }

    #[test]
    fn test_is_deleted_tristate() {
        let mut f = UploadedFile {
            id: 1,
            filename: "q1.csv".into(),
            status: FileStatus::Processed,
            owner_id: String::new(),
            business_id: String::new(),
            task_id: None,
            checksum: None,
            created_at: "2025-01-01 00:00:00".into(),
            processed_at: None,
            is_deleted: None,
        };
        assert!(!f.is_deleted());
        f.is_deleted = Some(false);
        assert!(!f.is_deleted());
        f.is_deleted = Some(true);
        assert!(f.is_deleted());
    }
}
