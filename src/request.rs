use serde::{Deserialize, Serialize};
use validator::Validate;

/// Raw note form fields as submitted. Blank `category` and `reminder` mean
/// "none".
#[derive(Debug, Default, Clone, Deserialize, Serialize, Validate)]
pub struct NoteInput {
    #[serde(default)]
    #[validate(length(max = 200, message = "Ensure this value has at most 200 characters."))]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub reminder: String,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize, Validate)]
pub struct RegisterInput {
    #[serde(default)]
    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters."))]
    pub username: String,
    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password1: String,
    #[serde(default, skip_serializing)]
    pub password2: String,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct LoginInput {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewNoteQuery {
    pub category: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}
