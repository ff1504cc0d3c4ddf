//! Route handlers for listing, creating, editing and deleting categories.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, CategoryId, Error, UserId,
    category::{
        db::{create_category, delete_category, get_categories, update_category},
        domain::{Category, CategoryName, HexColor, NewCategory},
    },
    user::get_user_by_id,
};

/// The state needed for the category endpoints.
#[derive(Debug, Clone)]
pub struct CategoryState {
    /// The database connection for managing categories.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating or editing a category.
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryForm {
    /// The display name.
    pub name: CategoryName,
    /// The chart color, picked from the name when omitted.
    #[serde(default)]
    pub color: Option<HexColor>,
    /// The weekly spending limit.
    #[serde(default)]
    pub weekly_limit: Option<Decimal>,
}

impl From<CategoryForm> for NewCategory {
    fn from(form: CategoryForm) -> Self {
        Self {
            name: form.name,
            color: form.color,
            weekly_limit: form.weekly_limit,
        }
    }
}

/// A route handler for listing a user's categories.
pub async fn list_categories_endpoint(
    State(state): State<CategoryState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Category>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(UserId::new(user_id), &connection)?;

    get_categories(user.id, &connection).map(Json)
}

/// A route handler for creating a category.
pub async fn create_category_endpoint(
    State(state): State<CategoryState>,
    Path(user_id): Path<i64>,
    Json(form): Json<CategoryForm>,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(UserId::new(user_id), &connection)?;
    let category = create_category(user.id, form.into(), &connection)?;

    tracing::info!("Created category {} for user {}", category.id, user.id);

    Ok((StatusCode::CREATED, Json(category)))
}

/// A route handler for replacing the name, color and weekly limit of a category.
pub async fn update_category_endpoint(
    State(state): State<CategoryState>,
    Path((user_id, category_id)): Path<(i64, CategoryId)>,
    Json(form): Json<CategoryForm>,
) -> Result<Json<Category>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    update_category(UserId::new(user_id), category_id, form.into(), &connection).map(Json)
}

/// A route handler for deleting a category.
pub async fn delete_category_endpoint(
    State(state): State<CategoryState>,
    Path((user_id, category_id)): Path<(i64, CategoryId)>,
) -> Result<StatusCode, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    delete_category(UserId::new(user_id), category_id, &connection)?;

    tracing::info!("Deleted category {category_id} for user {user_id}");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod category_endpoint_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use serde_json::json;

    use crate::{AppState, Category, build_router, endpoints, user::create_user};

    fn get_test_server() -> (TestServer, String) {
        let connection = Connection::open_in_memory().unwrap();
        let state = AppState::new(connection, "Etc/UTC", false).unwrap();
        let user_id = {
            let connection = state.db_connection.lock().unwrap();
            create_user("test@example.com", &connection).unwrap().id
        };
        let endpoint = endpoints::format_endpoint(endpoints::CATEGORIES, user_id.as_i64());

        (TestServer::new(build_router(state)), endpoint)
    }

    #[tokio::test]
    async fn create_category_uses_default_color() {
        let (server, endpoint) = get_test_server();

        let response = server
            .post(&endpoint)
            .json(&json!({ "name": "Transportation", "weekly_limit": "40.00" }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let category = response.json::<Category>();
        assert_eq!(category.color.as_ref(), "#4ECDC4");
        assert_eq!(category.weekly_limit, Some(dec!(40.00)));
    }

    #[tokio::test]
    async fn create_category_rejects_empty_name() {
        let (server, endpoint) = get_test_server();

        let response = server.post(&endpoint).json(&json!({ "name": "  " })).await;

        assert!(response.status_code().is_client_error());
    }

    #[tokio::test]
    async fn create_duplicate_category_is_conflict() {
        let (server, endpoint) = get_test_server();
        server
            .post(&endpoint)
            .json(&json!({ "name": "Food" }))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server.post(&endpoint).json(&json!({ "name": "Food" })).await;

        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn list_update_and_delete_category() {
        let (server, endpoint) = get_test_server();
        let created = server
            .post(&endpoint)
            .json(&json!({ "name": "Food", "color": "#123abc" }))
            .await
            .json::<Category>();

        let updated = server
            .put(&format!("{endpoint}/{}", created.id))
            .json(&json!({ "name": "Groceries", "color": "#00FF00" }))
            .await
            .json::<Category>();
        assert_eq!(updated.name.as_ref(), "Groceries");

        let categories = server.get(&endpoint).await.json::<Vec<Category>>();
        assert_eq!(categories, vec![updated]);

        server
            .delete(&format!("{endpoint}/{}", created.id))
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .delete(&format!("{endpoint}/{}", created.id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let (server, _) = get_test_server();

        let response = server
            .get(&endpoints::format_endpoint(endpoints::CATEGORIES, 999))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }
}
