use chrono::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, sqlx::FromRow, Serialize, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub date_joined: DateTime<Utc>,
}

#[derive(Debug, Deserialize, sqlx::FromRow, Serialize, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub title: String,
}

/// A note joined with the title of its category and its author's username.
#[derive(Debug, Deserialize, sqlx::FromRow, Serialize, Clone)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
    pub reminder: Option<DateTime<Utc>>,
    pub category_id: Option<i64>,
    pub category_title: Option<String>,
    pub author_id: i64,
    pub author_username: String,
}

/// Validated note fields, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteDraft {
    pub title: String,
    pub text: String,
    pub category_id: Option<i64>,
    pub reminder: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Category restriction applied by the filter page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategorySelector {
    All,
    Uncategorized,
    Titled(String),
}

impl From<&str> for CategorySelector {
    fn from(value: &str) -> Self {
        match value {
            "" | "all" => CategorySelector::All,
            "uncategorized" => CategorySelector::Uncategorized,
            title => CategorySelector::Titled(title.to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteFilter {
    pub category: CategorySelector,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}
