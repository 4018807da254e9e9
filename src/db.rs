//! SQLite pool setup and the repositories for users, categories and notes.
//!
//! Repositories return `sqlx::Error` unchanged; callers decide what a missing
//! row means.

use std::str::FromStr;

use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    QueryBuilder, Sqlite, SqlitePool,
};

use crate::model::{Category, CategorySelector, NewUser, Note, NoteDraft, NoteFilter, User};

/// Open a pool for `database_url`, creating the database file if needed.
///
/// In-memory databases live only as long as their connection, so they get a
/// single connection that is never recycled.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
    } else {
        SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
    }
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// True if `err` is a UNIQUE constraint failure (`SQLITE_CONSTRAINT_UNIQUE`).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("2067")
                || db_err.message().contains("UNIQUE constraint failed")
        }
        _ => false,
    }
}

const NOTE_SELECT: &str = "SELECT n.id, n.title, n.text, n.created_date, n.updated_date, \
     n.reminder, n.category_id, c.title AS category_title, \
     n.author_id, u.username AS author_username \
     FROM notes n \
     LEFT JOIN categories c ON c.id = n.category_id \
     JOIN users u ON u.id = n.author_id";

const NOTE_ORDER: &str = " ORDER BY n.created_date DESC, n.id DESC";

pub struct UserRepo;

impl UserRepo {
    pub async fn create(pool: &SqlitePool, input: &NewUser) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email, password, date_joined) \
             VALUES (?, ?, ?, ?) RETURNING *",
        )
        .bind(&input.username)
        .bind(input.email.to_ascii_lowercase())
        .bind(&input.password_hash)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_username(
        pool: &SqlitePool,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await
    }
}

pub struct CategoryRepo;

impl CategoryRepo {
    /// All categories, ordered by title descending.
    pub async fn list(pool: &SqlitePool) -> Result<Vec<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT id, title FROM categories ORDER BY title DESC")
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT id, title FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(pool: &SqlitePool, title: &str) -> Result<Category, sqlx::Error> {
        sqlx::query_as::<_, Category>("INSERT INTO categories (title) VALUES (?) RETURNING id, title")
            .bind(title)
            .fetch_one(pool)
            .await
    }

    /// Delete a category together with every note filed under it.
    /// Returns `true` if the category existed.
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn notes(pool: &SqlitePool, category_id: i64) -> Result<Vec<Note>, sqlx::Error> {
        let query = format!("{NOTE_SELECT} WHERE n.category_id = ?{NOTE_ORDER}");
        sqlx::query_as::<_, Note>(&query)
            .bind(category_id)
            .fetch_all(pool)
            .await
    }
}

pub struct NoteRepo;

impl NoteRepo {
    /// All notes, newest first.
    pub async fn list(pool: &SqlitePool) -> Result<Vec<Note>, sqlx::Error> {
        let query = format!("{NOTE_SELECT}{NOTE_ORDER}");
        sqlx::query_as::<_, Note>(&query).fetch_all(pool).await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Note>, sqlx::Error> {
        let query = format!("{NOTE_SELECT} WHERE n.id = ?");
        sqlx::query_as::<_, Note>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        author_id: i64,
        draft: &NoteDraft,
    ) -> Result<Note, sqlx::Error> {
        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO notes (title, text, created_date, updated_date, reminder, category_id, author_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&draft.title)
        .bind(&draft.text)
        .bind(now)
        .bind(now)
        .bind(draft.reminder)
        .bind(draft.category_id)
        .bind(author_id)
        .execute(pool)
        .await?
        .last_insert_rowid();

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Overwrite the mutable fields of a note. `created_date` is left alone.
    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        draft: &NoteDraft,
    ) -> Result<Option<Note>, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notes SET title = ?, text = ?, category_id = ?, reminder = ?, updated_date = ? \
             WHERE id = ?",
        )
        .bind(&draft.title)
        .bind(&draft.text)
        .bind(draft.category_id)
        .bind(draft.reminder)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find_by_id(pool, id).await
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Notes whose title contains `query`, ignoring case.
    ///
    /// SQLite's `lower()` folds ASCII only, so titles are folded here.
    pub async fn search(pool: &SqlitePool, query: &str) -> Result<Vec<Note>, sqlx::Error> {
        let needle = query.to_lowercase();
        let notes = Self::list(pool).await?;
        Ok(notes
            .into_iter()
            .filter(|note| note.title.to_lowercase().contains(&needle))
            .collect())
    }

    pub async fn filter(pool: &SqlitePool, filter: &NoteFilter) -> Result<Vec<Note>, sqlx::Error> {
        let mut builder = QueryBuilder::<Sqlite>::new(NOTE_SELECT);
        let mut glue = " WHERE ";

        match &filter.category {
            CategorySelector::All => {}
            CategorySelector::Uncategorized => {
                builder.push(glue).push("n.category_id IS NULL");
                glue = " AND ";
            }
            CategorySelector::Titled(title) => {
                builder.push(glue).push("c.title = ").push_bind(title.clone());
                glue = " AND ";
            }
        }

        if let Some(start) = filter.start {
            builder.push(glue).push("n.reminder >= ").push_bind(start);
            glue = " AND ";
        }
        if let Some(end) = filter.end {
            builder.push(glue).push("n.reminder <= ").push_bind(end);
        }

        builder.push(NOTE_ORDER);
        builder.build_query_as::<Note>().fetch_all(pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone};

    async fn test_pool() -> SqlitePool {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    async fn test_user(pool: &SqlitePool) -> User {
        UserRepo::create(
            pool,
            &NewUser {
                username: "user".into(),
                email: "user@example.com".into(),
                password_hash: "not-a-real-hash".into(),
            },
        )
        .await
        .unwrap()
    }

    fn draft(title: &str) -> NoteDraft {
        NoteDraft {
            title: title.into(),
            text: "Test text".into(),
            category_id: None,
            reminder: None,
        }
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn duplicate_username_is_a_unique_violation() {
        let pool = test_pool().await;
        test_user(&pool).await;

        let err = UserRepo::create(
            &pool,
            &NewUser {
                username: "user".into(),
                email: "other@example.com".into(),
                password_hash: "not-a-real-hash".into(),
            },
        )
        .await
        .unwrap_err();

        assert!(is_unique_violation(&err));
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }

    #[tokio::test]
    async fn note_with_required_fields_only() {
        let pool = test_pool().await;
        let user = test_user(&pool).await;

        let note = NoteRepo::create(&pool, user.id, &draft("Test note")).await.unwrap();

        assert_eq!(note.title, "Test note");
        assert_eq!(note.text, "Test text");
        assert_eq!(note.author_username, "user");
        assert_eq!(note.category_id, None);
        assert_eq!(note.category_title, None);
        assert_eq!(note.reminder, None);
        assert_eq!(note.created_date, note.updated_date);
    }

    #[tokio::test]
    async fn note_with_category() {
        let pool = test_pool().await;
        let user = test_user(&pool).await;
        let category = CategoryRepo::create(&pool, "Test category").await.unwrap();

        let mut input = draft("Test note");
        input.category_id = Some(category.id);
        let note = NoteRepo::create(&pool, user.id, &input).await.unwrap();

        assert_eq!(note.category_title.as_deref(), Some("Test category"));
    }

    #[tokio::test]
    async fn reminder_round_trips_exactly() {
        let pool = test_pool().await;
        let user = test_user(&pool).await;
        let reminder = at(17) + Duration::microseconds(123_456);

        let mut input = draft("Test note");
        input.reminder = Some(reminder);
        let created = NoteRepo::create(&pool, user.id, &input).await.unwrap();
        let fetched = NoteRepo::find_by_id(&pool, created.id).await.unwrap().unwrap();

        assert_eq!(fetched.reminder, Some(reminder));
    }

    #[tokio::test]
    async fn update_keeps_created_date() {
        let pool = test_pool().await;
        let user = test_user(&pool).await;
        let note = NoteRepo::create(&pool, user.id, &draft("Old")).await.unwrap();

        let updated = NoteRepo::update(&pool, note.id, &draft("New"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.id, note.id);
        assert_eq!(updated.title, "New");
        assert_eq!(updated.created_date, note.created_date);
        assert!(updated.updated_date >= note.updated_date);
    }

    #[tokio::test]
    async fn update_and_delete_of_missing_note() {
        let pool = test_pool().await;
        assert!(NoteRepo::update(&pool, 42, &draft("x")).await.unwrap().is_none());
        assert!(!NoteRepo::delete(&pool, 42).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_category_deletes_its_notes() {
        let pool = test_pool().await;
        let user = test_user(&pool).await;
        let category = CategoryRepo::create(&pool, "Doomed").await.unwrap();

        let mut filed = draft("Filed");
        filed.category_id = Some(category.id);
        let filed = NoteRepo::create(&pool, user.id, &filed).await.unwrap();
        let loose = NoteRepo::create(&pool, user.id, &draft("Loose")).await.unwrap();

        assert!(CategoryRepo::delete(&pool, category.id).await.unwrap());

        assert!(NoteRepo::find_by_id(&pool, filed.id).await.unwrap().is_none());
        assert!(NoteRepo::find_by_id(&pool, loose.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn categories_are_listed_by_title_descending() {
        let pool = test_pool().await;
        for title in ["Beta", "Alpha", "Gamma"] {
            CategoryRepo::create(&pool, title).await.unwrap();
        }

        let titles: Vec<String> = CategoryRepo::list(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();

        assert_eq!(titles, ["Gamma", "Beta", "Alpha"]);
    }

    #[tokio::test]
    async fn notes_are_listed_newest_first() {
        let pool = test_pool().await;
        let user = test_user(&pool).await;
        let first = NoteRepo::create(&pool, user.id, &draft("first")).await.unwrap();
        let second = NoteRepo::create(&pool, user.id, &draft("second")).await.unwrap();

        let ids: Vec<i64> = NoteRepo::list(&pool).await.unwrap().iter().map(|n| n.id).collect();

        assert_eq!(ids, [second.id, first.id]);
    }

    #[tokio::test]
    async fn search_ignores_case() {
        let pool = test_pool().await;
        let user = test_user(&pool).await;
        let groceries = NoteRepo::create(&pool, user.id, &draft("Buy MILK")).await.unwrap();
        let recipe = NoteRepo::create(&pool, user.id, &draft("milkshake recipe")).await.unwrap();
        NoteRepo::create(&pool, user.id, &draft("Call mom")).await.unwrap();

        let ids: Vec<i64> = NoteRepo::search(&pool, "Milk")
            .await
            .unwrap()
            .iter()
            .map(|n| n.id)
            .collect();

        assert_eq!(ids, [recipe.id, groceries.id]);
    }

    #[tokio::test]
    async fn search_folds_non_ascii_titles() {
        let pool = test_pool().await;
        let user = test_user(&pool).await;
        let ecole = NoteRepo::create(&pool, user.id, &draft("ÉCOLE notes")).await.unwrap();
        let privet = NoteRepo::create(&pool, user.id, &draft("Привет МИР")).await.unwrap();

        let hits = |notes: Vec<Note>| notes.iter().map(|n| n.id).collect::<Vec<_>>();

        assert_eq!(hits(NoteRepo::search(&pool, "école").await.unwrap()), [ecole.id]);
        assert_eq!(hits(NoteRepo::search(&pool, "мир").await.unwrap()), [privet.id]);
        assert_eq!(hits(NoteRepo::search(&pool, "ПРИВЕТ").await.unwrap()), [privet.id]);
    }

    #[tokio::test]
    async fn filter_by_category_and_dates() {
        let pool = test_pool().await;
        let user = test_user(&pool).await;
        let work = CategoryRepo::create(&pool, "Work").await.unwrap();

        let mut early = draft("early");
        early.reminder = Some(at(1));
        early.category_id = Some(work.id);
        let early = NoteRepo::create(&pool, user.id, &early).await.unwrap();

        let mut middle = draft("middle");
        middle.reminder = Some(at(10));
        let middle = NoteRepo::create(&pool, user.id, &middle).await.unwrap();

        let mut late = draft("late");
        late.reminder = Some(at(20));
        late.category_id = Some(work.id);
        let late = NoteRepo::create(&pool, user.id, &late).await.unwrap();

        let plain = NoteRepo::create(&pool, user.id, &draft("plain")).await.unwrap();

        let ids = |notes: Vec<Note>| notes.iter().map(|n| n.id).collect::<Vec<_>>();
        let run = |category: CategorySelector,
                   start: Option<DateTime<Utc>>,
                   end: Option<DateTime<Utc>>| {
            let pool = pool.clone();
            async move {
                NoteRepo::filter(&pool, &NoteFilter { category, start, end })
                    .await
                    .unwrap()
            }
        };

        assert_eq!(
            ids(run(CategorySelector::All, None, None).await),
            [plain.id, late.id, middle.id, early.id]
        );
        assert_eq!(
            ids(run(CategorySelector::Uncategorized, None, None).await),
            [plain.id, middle.id]
        );
        assert_eq!(
            ids(run(CategorySelector::Titled("Work".into()), None, None).await),
            [late.id, early.id]
        );
        assert_eq!(
            ids(run(CategorySelector::All, Some(at(1)), Some(at(10))).await),
            [middle.id, early.id]
        );
        assert_eq!(
            ids(run(CategorySelector::All, Some(at(10)), None).await),
            [late.id, middle.id]
        );
        assert_eq!(
            ids(run(CategorySelector::All, None, Some(at(10))).await),
            [middle.id, early.id]
        );
        assert_eq!(
            ids(run(CategorySelector::Titled("Work".into()), Some(at(5)), None).await),
            [late.id]
        );
        assert!(run(CategorySelector::Titled("Home".into()), None, None)
            .await
            .is_empty());
    }
}
