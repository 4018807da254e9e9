//! Validation and normalization of submitted forms.
//!
//! Field checks that need no I/O are declared with `validator`; the rest
//! (required fields, category lookup, datetime parsing, uniqueness) are done
//! here. Every failure is collected per field so the form can be shown again
//! with all of its messages at once.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use validator::{Validate, ValidationErrors};

use crate::{
    db::{CategoryRepo, UserRepo},
    model::{Note, NoteDraft},
    request::{NoteInput, RegisterInput},
};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_DATETIME: &str = "Enter a valid date/time.";
pub const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";
pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
pub const BAD_CREDENTIALS: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// Form-level messages that belong to no single field.
pub const NON_FIELD: &str = "__all__";

/// Messages keyed by field name.
#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_owned()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// A blank field reports only that it is required; format messages
    /// about the empty value are dropped.
    fn require(&mut self, field: &str, value: &str) {
        if value.is_empty() {
            self.0.insert(field.to_owned(), vec![REQUIRED.to_owned()]);
        }
    }
}

/// Outcome of cleaning a submitted form.
#[derive(Debug, Clone, PartialEq)]
pub enum Cleaned<T> {
    Valid(T),
    Invalid(FormErrors),
}

impl<T> Cleaned<T> {
    fn from_errors(errors: FormErrors, value: impl FnOnce() -> T) -> Self {
        if errors.is_empty() {
            Cleaned::Valid(value())
        } else {
            Cleaned::Invalid(errors)
        }
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut form_errors = FormErrors::default();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors.iter() {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                form_errors.add(&field.to_string(), message);
            }
        }
        form_errors
    }
}

fn declared_errors<T: Validate>(input: &T) -> FormErrors {
    input.validate().err().map(FormErrors::from).unwrap_or_default()
}

/// Parse a submitted timestamp.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM[:SS[.f]]` (with either a space or `T`
/// separator) and bare dates. Values without an offset are taken as UTC.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    const NAIVE_FORMATS: [&str; 6] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];

    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    Some(Utc.from_utc_datetime(&naive))
}

pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

impl NoteInput {
    fn normalized(&self) -> Self {
        NoteInput {
            title: self.title.trim().to_owned(),
            text: self.text.trim().to_owned(),
            category: self.category.trim().to_owned(),
            reminder: self.reminder.trim().to_owned(),
        }
    }

    /// Validate the submission. Only store failures are errors.
    pub async fn clean(&self, pool: &SqlitePool) -> Result<Cleaned<NoteDraft>, sqlx::Error> {
        let input = self.normalized();
        let mut errors = declared_errors(&input);
        errors.require("title", &input.title);
        errors.require("text", &input.text);

        let category_id = if input.category.is_empty() {
            None
        } else {
            match input.category.parse::<i64>() {
                Ok(id) => match CategoryRepo::find_by_id(pool, id).await? {
                    Some(category) => Some(category.id),
                    None => {
                        errors.add("category", INVALID_CHOICE);
                        None
                    }
                },
                Err(_) => {
                    errors.add("category", INVALID_CHOICE);
                    None
                }
            }
        };

        let reminder = if input.reminder.is_empty() {
            None
        } else {
            let parsed = parse_datetime(&input.reminder);
            if parsed.is_none() {
                errors.add("reminder", INVALID_DATETIME);
            }
            parsed
        };

        Ok(Cleaned::from_errors(errors, || NoteDraft {
            title: input.title,
            text: input.text,
            category_id,
            reminder,
        }))
    }

    /// Blank form, optionally with a category already chosen.
    pub fn blank(category_id: Option<i64>) -> Self {
        NoteInput {
            category: category_id.map(|id| id.to_string()).unwrap_or_default(),
            ..Default::default()
        }
    }
}

impl From<&Note> for NoteInput {
    fn from(note: &Note) -> Self {
        NoteInput {
            title: note.title.to_owned(),
            text: note.text.to_owned(),
            category: note.category_id.map(|id| id.to_string()).unwrap_or_default(),
            reminder: note.reminder.as_ref().map(format_datetime).unwrap_or_default(),
        }
    }
}

impl RegisterInput {
    /// Check the registration fields, including that the username is free.
    /// A valid outcome carries the trimmed input.
    pub async fn clean(&self, pool: &SqlitePool) -> Result<Cleaned<RegisterInput>, sqlx::Error> {
        let input = RegisterInput {
            username: self.username.trim().to_owned(),
            email: self.email.trim().to_owned(),
            password1: self.password1.clone(),
            password2: self.password2.clone(),
        };
        let mut errors = declared_errors(&input);
        errors.require("username", &input.username);
        errors.require("email", &input.email);
        errors.require("password1", &input.password1);
        errors.require("password2", &input.password2);

        if !input.password2.is_empty() && input.password1 != input.password2 {
            errors.add("password2", PASSWORD_MISMATCH);
        }
        if !input.username.is_empty()
            && UserRepo::find_by_username(pool, &input.username).await?.is_some()
        {
            errors.add("username", USERNAME_TAKEN);
        }

        Ok(Cleaned::from_errors(errors, || input))
    }
}
