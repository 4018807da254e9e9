use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::{
    form::FormErrors,
    model::{Category, Note},
    request::{LoginInput, NoteInput, RegisterInput},
};

/// Form values echoed back together with their errors.
#[derive(Serialize, Debug)]
pub struct FormState<T> {
    pub values: T,
    pub errors: FormErrors,
}

impl<T> FormState<T> {
    pub fn new(values: T) -> Self {
        FormState {
            values,
            errors: FormErrors::default(),
        }
    }

    pub fn with_errors(values: T, errors: FormErrors) -> Self {
        FormState { values, errors }
    }
}

/// Every page the server can show, as a JSON document tagged with `page`.
#[derive(Serialize, Debug)]
#[serde(tag = "page", rename_all = "snake_case")]
pub enum Page {
    Home {
        notes: Vec<Note>,
        categories: Vec<Category>,
    },
    NoteDetail {
        note: Note,
    },
    CategoryDetail {
        category: Category,
        notes: Vec<Note>,
    },
    Categories {
        categories: Vec<Category>,
    },
    NoteForm {
        note_id: Option<i64>,
        form: FormState<NoteInput>,
        categories: Vec<Category>,
    },
    SearchResults {
        query: String,
        notes: Vec<Note>,
    },
    FilteredResults {
        category: String,
        start_date: Option<String>,
        end_date: Option<String>,
        notes: Vec<Note>,
        categories: Vec<Category>,
    },
    Register {
        form: FormState<RegisterInput>,
    },
    Login {
        form: FormState<LoginInput>,
    },
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// `302 Found` to `location`.
pub fn redirect(location: impl Into<String>) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.into())]).into_response()
}

pub fn home_url() -> String {
    "/".to_string()
}

pub fn note_url(id: i64) -> String {
    format!("/note_{id}/")
}
