/// Server configuration loaded from environment variables.
///
/// | Env Var           | Default              |
/// |-------------------|----------------------|
/// | `DATABASE_URL`    | `sqlite://notes.db`  |
/// | `HOST`            | `0.0.0.0`            |
/// | `PORT`            | `8000`               |
/// | `JWT_SECRET`      | required             |
/// | `JWT_MAXAGE_DAYS` | `28`                 |
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_maxage_days: i64,
}

impl Config {
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is missing or empty, or if a numeric variable
    /// does not parse.
    pub fn from_env() -> Self {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://notes.db".into());
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse::<u16>()
            .expect("PORT must be a valid number.");

        let jwt_secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set.");
        assert!(!jwt_secret.is_empty(), "JWT_SECRET must not be empty.");

        let jwt_maxage_days = std::env::var("JWT_MAXAGE_DAYS")
            .unwrap_or_else(|_| "28".into())
            .parse::<i64>()
            .expect("JWT_MAXAGE_DAYS must be a valid number.");

        Self {
            database_url,
            host,
            port,
            jwt_secret,
            jwt_maxage_days,
        }
    }
}
