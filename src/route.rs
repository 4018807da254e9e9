use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use crate::{handler::*, jwt_auth::identify, AppState};

pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/category_:category_id/", get(category_detail_handler))
        .route("/note_:note_id/", get(note_detail_handler))
        .route(
            "/new_note/",
            get(new_note_form_handler).post(new_note_handler),
        )
        .route("/note_:note_id/delete/", get(delete_note_handler))
        .route(
            "/note_:note_id/edit/",
            get(edit_note_form_handler).post(edit_note_handler),
        )
        .route("/categories/", get(categories_handler))
        .route("/search/", get(search_notes_handler))
        .route("/filter/", get(filtered_results_handler))
        .route(
            "/accounts/register/",
            get(register_form_handler).post(register_handler),
        )
        .route(
            "/accounts/login/",
            get(login_form_handler).post(login_handler),
        )
        .route("/accounts/logout/", get(logout_handler))
        .layer(middleware::from_fn_with_state(app_state.clone(), identify))
        .with_state(app_state)
}
