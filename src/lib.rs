//! A small note-taking web service: notes with optional categories and
//! reminders, filtered and searched over HTTP, owned by registered users.

use sqlx::SqlitePool;

pub mod config;
pub mod db;
pub mod error;
pub mod form;
pub mod handler;
pub mod jwt_auth;
pub mod model;
pub mod request;
pub mod response;
pub mod route;

pub use route::create_router;

pub struct AppState {
    pub db: SqlitePool,
    pub config: config::Config,
}
