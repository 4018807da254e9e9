use std::sync::Arc;

use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Extension, Form,
};
use axum_extra::extract::cookie::CookieJar;
use rand_core::OsRng;

use crate::{
    db::{is_unique_violation, CategoryRepo, NoteRepo, UserRepo},
    error::{AppError, AppResult},
    form::{parse_datetime, Cleaned, FormErrors, BAD_CREDENTIALS, NON_FIELD, USERNAME_TAKEN},
    jwt_auth::{expired_cookie, issue_token, session_cookie, CurrentUser},
    model::{CategorySelector, NewUser, Note, NoteFilter},
    request::*,
    response::*,
    AppState,
};

type Viewer = Option<Extension<CurrentUser>>;

async fn note_or_404(data: &AppState, note_id: i64) -> AppResult<Note> {
    NoteRepo::find_by_id(&data.db, note_id)
        .await?
        .ok_or(AppError::NotFound { entity: "Note", id: note_id })
}

async fn note_form(
    data: &AppState,
    note_id: Option<i64>,
    form: FormState<NoteInput>,
) -> AppResult<Page> {
    let categories = CategoryRepo::list(&data.db).await?;
    Ok(Page::NoteForm {
        note_id,
        form,
        categories,
    })
}

pub async fn home_handler(State(data): State<Arc<AppState>>) -> AppResult<Page> {
    let notes = NoteRepo::list(&data.db).await?;
    if notes.is_empty() {
        return Err(AppError::EmptyListing("notes"));
    }
    let categories = CategoryRepo::list(&data.db).await?;
    if categories.is_empty() {
        return Err(AppError::EmptyListing("categories"));
    }
    Ok(Page::Home { notes, categories })
}

pub async fn note_detail_handler(
    State(data): State<Arc<AppState>>,
    Path(note_id): Path<i64>,
) -> AppResult<Page> {
    let note = note_or_404(&data, note_id).await?;
    Ok(Page::NoteDetail { note })
}

pub async fn category_detail_handler(
    State(data): State<Arc<AppState>>,
    Path(category_id): Path<i64>,
) -> AppResult<Page> {
    let category = CategoryRepo::find_by_id(&data.db, category_id)
        .await?
        .ok_or(AppError::NotFound {
            entity: "Category",
            id: category_id,
        })?;
    let notes = CategoryRepo::notes(&data.db, category.id).await?;
    Ok(Page::CategoryDetail { category, notes })
}

pub async fn categories_handler(State(data): State<Arc<AppState>>) -> AppResult<Page> {
    let categories = CategoryRepo::list(&data.db).await?;
    if categories.is_empty() {
        return Err(AppError::EmptyListing("categories"));
    }
    Ok(Page::Categories { categories })
}

pub async fn new_note_form_handler(
    State(data): State<Arc<AppState>>,
    viewer: Viewer,
    Query(params): Query<NewNoteQuery>,
) -> AppResult<Response> {
    if viewer.is_none() {
        return Ok(redirect(home_url()));
    }
    if let Some(category_id) = params.category {
        CategoryRepo::find_by_id(&data.db, category_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "Category",
                id: category_id,
            })?;
    }
    let form = FormState::new(NoteInput::blank(params.category));
    Ok(note_form(&data, None, form).await?.into_response())
}

pub async fn new_note_handler(
    State(data): State<Arc<AppState>>,
    viewer: Viewer,
    Form(body): Form<NoteInput>,
) -> AppResult<Response> {
    let Some(Extension(CurrentUser(user))) = viewer else {
        return Ok(redirect(home_url()));
    };

    match body.clean(&data.db).await? {
        Cleaned::Valid(draft) => {
            let note = NoteRepo::create(&data.db, user.id, &draft).await?;
            tracing::info!(note_id = note.id, author_id = user.id, "note created");
            Ok(redirect(note_url(note.id)))
        }
        Cleaned::Invalid(errors) => {
            let form = FormState::with_errors(body, errors);
            Ok(note_form(&data, None, form).await?.into_response())
        }
    }
}

pub async fn edit_note_form_handler(
    State(data): State<Arc<AppState>>,
    viewer: Viewer,
    Path(note_id): Path<i64>,
) -> AppResult<Response> {
    if viewer.is_none() {
        return Ok(redirect(note_url(note_id)));
    }
    let note = note_or_404(&data, note_id).await?;
    let form = FormState::new(NoteInput::from(&note));
    Ok(note_form(&data, Some(note.id), form).await?.into_response())
}

/// Any logged-in user may edit any note; authorship is not checked.
pub async fn edit_note_handler(
    State(data): State<Arc<AppState>>,
    viewer: Viewer,
    Path(note_id): Path<i64>,
    Form(body): Form<NoteInput>,
) -> AppResult<Response> {
    let Some(Extension(CurrentUser(user))) = viewer else {
        return Ok(redirect(note_url(note_id)));
    };
    let note = note_or_404(&data, note_id).await?;

    match body.clean(&data.db).await? {
        Cleaned::Valid(draft) => {
            NoteRepo::update(&data.db, note.id, &draft)
                .await?
                .ok_or(AppError::NotFound { entity: "Note", id: note.id })?;
            tracing::info!(note_id = note.id, editor_id = user.id, "note updated");
            Ok(redirect(note_url(note.id)))
        }
        Cleaned::Invalid(errors) => {
            let form = FormState::with_errors(body, errors);
            Ok(note_form(&data, Some(note.id), form).await?.into_response())
        }
    }
}

/// Any logged-in user may delete any note; authorship is not checked.
pub async fn delete_note_handler(
    State(data): State<Arc<AppState>>,
    viewer: Viewer,
    Path(note_id): Path<i64>,
) -> AppResult<Response> {
    let Some(Extension(CurrentUser(user))) = viewer else {
        return Ok(redirect(note_url(note_id)));
    };
    if !NoteRepo::delete(&data.db, note_id).await? {
        return Err(AppError::NotFound { entity: "Note", id: note_id });
    }
    tracing::info!(note_id, user_id = user.id, "note deleted");
    Ok(redirect(home_url()))
}

pub async fn search_notes_handler(
    State(data): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Page> {
    let notes = NoteRepo::search(&data.db, &params.query).await?;
    Ok(Page::SearchResults {
        query: params.query,
        notes,
    })
}

fn date_bound(name: &str, value: Option<&str>) -> AppResult<Option<chrono::DateTime<chrono::Utc>>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_datetime(raw)
            .map(Some)
            .ok_or_else(|| AppError::BadRequest(format!("{name}: invalid date/time {raw:?}"))),
    }
}

pub async fn filtered_results_handler(
    State(data): State<Arc<AppState>>,
    Query(params): Query<FilterQuery>,
) -> AppResult<Page> {
    let category = params.category.unwrap_or_else(|| "all".to_string());
    let filter = NoteFilter {
        category: CategorySelector::from(category.as_str()),
        start: date_bound("start_date", params.start_date.as_deref())?,
        end: date_bound("end_date", params.end_date.as_deref())?,
    };
    let notes = NoteRepo::filter(&data.db, &filter).await?;
    let categories = CategoryRepo::list(&data.db).await?;
    Ok(Page::FilteredResults {
        category,
        start_date: params.start_date,
        end_date: params.end_date,
        notes,
        categories,
    })
}

pub async fn register_form_handler() -> Page {
    Page::Register {
        form: FormState::new(RegisterInput::default()),
    }
}

fn register_page(body: RegisterInput, errors: FormErrors) -> Response {
    Page::Register {
        form: FormState::with_errors(body, errors),
    }
    .into_response()
}

pub async fn register_handler(
    State(data): State<Arc<AppState>>,
    jar: CookieJar,
    Form(body): Form<RegisterInput>,
) -> AppResult<Response> {
    let input = match body.clean(&data.db).await? {
        Cleaned::Valid(input) => input,
        Cleaned::Invalid(errors) => return Ok(register_page(body, errors)),
    };

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(input.password1.as_bytes(), &salt)?
        .to_string();

    let new_user = NewUser {
        username: input.username.to_owned(),
        email: input.email.to_owned(),
        password_hash,
    };
    // The name may have been taken since `clean` looked it up.
    let user = match UserRepo::create(&data.db, &new_user).await {
        Ok(user) => user,
        Err(err) if is_unique_violation(&err) => {
            let mut errors = FormErrors::default();
            errors.add("username", USERNAME_TAKEN);
            return Ok(register_page(input, errors));
        }
        Err(err) => return Err(err.into()),
    };
    tracing::info!(user_id = user.id, username = %user.username, "user registered");

    let token = issue_token(&user, &data.config)?;
    let jar = jar.add(session_cookie(token, &data.config));
    Ok((jar, redirect(home_url())).into_response())
}

pub async fn login_form_handler() -> Page {
    Page::Login {
        form: FormState::new(LoginInput::default()),
    }
}

pub async fn login_handler(
    State(data): State<Arc<AppState>>,
    jar: CookieJar,
    Form(body): Form<LoginInput>,
) -> AppResult<Response> {
    let user = UserRepo::find_by_username(&data.db, body.username.trim()).await?;

    let user = user.filter(|user| match PasswordHash::new(&user.password) {
        Ok(parsed_hash) => Argon2::default()
            .verify_password(body.password.as_bytes(), &parsed_hash)
            .map_or(false, |_| true),
        Err(_) => false,
    });

    let Some(user) = user else {
        let mut errors = FormErrors::default();
        errors.add(NON_FIELD, BAD_CREDENTIALS);
        return Ok(Page::Login {
            form: FormState::with_errors(body, errors),
        }
        .into_response());
    };
    tracing::info!(user_id = user.id, "user logged in");

    let token = issue_token(&user, &data.config)?;
    let jar = jar.add(session_cookie(token, &data.config));
    Ok((jar, redirect(home_url())).into_response())
}

pub async fn logout_handler(jar: CookieJar) -> Response {
    (jar.add(expired_cookie()), redirect(home_url())).into_response()
}
