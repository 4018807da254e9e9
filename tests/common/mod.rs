#![allow(dead_code)]

use std::sync::Arc;

use argon2::{password_hash::SaltString, Argon2, PasswordHasher};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use rand_core::OsRng;
use sqlx::SqlitePool;
use tower::ServiceExt;

use notes_server::{
    config::Config,
    create_router, db,
    db::{NoteRepo, UserRepo},
    jwt_auth::issue_token,
    model::{NewUser, Note, NoteDraft, User},
    AppState,
};

pub const PASSWORD: &str = "qwerty";

pub struct TestApp {
    pub state: Arc<AppState>,
    pub router: Router,
}

impl TestApp {
    pub fn pool(&self) -> &SqlitePool {
        &self.state.db
    }

    pub fn auth_cookie(&self, user: &User) -> String {
        let token = issue_token(user, &self.state.config).expect("token should be issued");
        format!("token={token}")
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        jwt_secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
        jwt_maxage_days: 28,
    }
}

/// Full router over a fresh in-memory database.
pub async fn spawn_app() -> TestApp {
    let config = test_config();
    let pool = db::create_pool(&config.database_url)
        .await
        .expect("in-memory pool should open");
    db::run_migrations(&pool)
        .await
        .expect("migrations should apply");

    let state = Arc::new(AppState { db: pool, config });
    let router = create_router(state.clone());
    TestApp { state, router }
}

/// A user whose password hash never verifies. Enough for cookie-based tests.
pub async fn create_test_user(pool: &SqlitePool, username: &str) -> User {
    UserRepo::create(
        pool,
        &NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "!".to_string(),
        },
    )
    .await
    .expect("user creation should succeed")
}

/// A user that can log in with [`PASSWORD`].
pub async fn create_user_with_password(pool: &SqlitePool, username: &str) -> User {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(PASSWORD.as_bytes(), &salt)
        .expect("hashing should succeed")
        .to_string();
    UserRepo::create(
        pool,
        &NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash,
        },
    )
    .await
    .expect("user creation should succeed")
}

pub async fn create_test_note(pool: &SqlitePool, author: &User, draft: NoteDraft) -> Note {
    NoteRepo::create(pool, author.id, &draft)
        .await
        .expect("note creation should succeed")
}

pub fn draft(title: &str) -> NoteDraft {
    NoteDraft {
        title: title.to_string(),
        text: "Test text".to_string(),
        category_id: None,
        reminder: None,
    }
}

pub async fn get(app: &TestApp, uri: &str, cookie: Option<&str>) -> Response {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    app.router
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_form(app: &TestApp, uri: &str, body: &str, cookie: Option<&str>) -> Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    app.router
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// Assert a `302 Found` to `expected`.
pub fn assert_redirect(response: &Response, expected: &str) {
    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("redirect should carry a Location header");
    assert_eq!(location, expected);
}

/// Value of the `token` cookie set by the response, if any.
pub fn session_token(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| v.strip_prefix("token="))
        .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
}
