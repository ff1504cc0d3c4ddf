//! Code for creating the user table and fetching users from the database.
//!
//! Users only exist to partition data by owner. Authentication happens upstream of
//! this service, so a user is nothing more than an ID and an email address.

use std::{
    fmt::Display,
    sync::{Arc, Mutex},
};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{AppState, Error};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash, PartialOrd, Ord)]
pub struct UserId(i64);

impl UserId {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application, i.e. the owner of transactions, categories and goals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserId,
    /// The user's email address.
    pub email: String,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns a:
/// - [Error::InvalidEmail] if `email` does not look like an email address,
/// - [Error::DuplicateEmail] if another user already has `email`,
/// - or [Error::SqlError] if some other SQL related error occurred.
pub fn create_user(email: &str, connection: &Connection) -> Result<User, Error> {
    let email = email.trim();

    if !is_plausible_email(email) {
        return Err(Error::InvalidEmail(email.to_owned()));
    }

    connection
        .execute("INSERT INTO user (email) VALUES (?1)", (email,))
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateEmail,
            error => error.into(),
        })?;

    let id = UserId::new(connection.last_insert_rowid());

    Ok(User {
        id,
        email: email.to_owned(),
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user ([Error::NotFound]).
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserId, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, email FROM user WHERE id = :id")?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let id = UserId::new(row.get(0)?);
    let email = row.get(1)?;

    Ok(User { id, email })
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    }
}

/// The state needed for creating and fetching users.
#[derive(Debug, Clone)]
pub struct UserState {
    /// The database connection for managing users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UserState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating a user.
#[derive(Debug, Serialize, Deserialize)]
pub struct NewUserForm {
    /// The email address of the new user.
    pub email: String,
}

/// A route handler for registering a new user.
pub async fn create_user_endpoint(
    State(state): State<UserState>,
    Json(form): Json<NewUserForm>,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = create_user(&form.email, &connection)
        .inspect_err(|error| tracing::error!("could not create user: {error}"))?;

    tracing::info!("Created user {}", user.id);

    Ok((StatusCode::CREATED, Json(user)))
}

/// A route handler for fetching a single user.
pub async fn get_user_endpoint(
    State(state): State<UserState>,
    Path(user_id): Path<i64>,
) -> Result<Json<User>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_user_by_id(UserId::new(user_id), &connection).map(Json)
}

#[cfg(test)]
mod user_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        user::{UserId, create_user, create_user_table, get_user_by_id},
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        create_user_table(&connection).expect("Could not create user table");
        connection
    }

    #[test]
    fn create_user_succeeds() {
        let connection = get_test_connection();

        let user = create_user("  test@example.com ", &connection).unwrap();

        assert!(user.id.as_i64() > 0);
        assert_eq!(user.email, "test@example.com");
    }

    #[test]
    fn create_user_fails_on_invalid_email() {
        let connection = get_test_connection();

        assert_eq!(
            create_user("not-an-email", &connection),
            Err(Error::InvalidEmail("not-an-email".to_owned()))
        );
        assert_eq!(
            create_user("@example.com", &connection),
            Err(Error::InvalidEmail("@example.com".to_owned()))
        );
    }

    #[test]
    fn create_user_fails_on_duplicate_email() {
        let connection = get_test_connection();
        create_user("test@example.com", &connection).unwrap();

        let duplicate = create_user("test@example.com", &connection);

        assert_eq!(duplicate, Err(Error::DuplicateEmail));
    }

    #[test]
    fn get_user_succeeds() {
        let connection = get_test_connection();
        let inserted_user = create_user("test@example.com", &connection).unwrap();

        let selected_user = get_user_by_id(inserted_user.id, &connection);

        assert_eq!(selected_user, Ok(inserted_user));
    }

    #[test]
    fn get_user_fails_with_unknown_id() {
        let connection = get_test_connection();

        let selected_user = get_user_by_id(UserId::new(42), &connection);

        assert_eq!(selected_user, Err(Error::NotFound));
    }
}
