use std::{net::SocketAddr, sync::Arc};

use axum::http::Method;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notes_server::{config::Config, create_router, db, AppState};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notes_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    let pool = match db::create_pool(&config.database_url).await {
        Ok(pool) => {
            tracing::info!("Connection to the database is successful");
            pool
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to connect to the database");
            std::process::exit(1);
        }
    };

    if let Err(err) = db::run_migrations(&pool).await {
        tracing::error!(error = %err, "Failed to run database migrations");
        std::process::exit(1);
    }

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any);

    let addr = SocketAddr::new(
        config.host.parse().expect("HOST must be a valid IP address."),
        config.port,
    );

    let app = create_router(Arc::new(AppState { db: pool, config }))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    tracing::info!(%addr, "Server started successfully");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .expect("server error");
}
