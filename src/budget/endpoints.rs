//! Route handlers for budget goals and the spending summaries shown on the dashboard.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::Query;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, BudgetGoalId, Error, UserId,
    budget::{
        aggregation::{WeeklyBudgetStatus, category_totals, weekly_budget_status},
        defaults::ensure_default_budget_goals,
        goals::{
            BudgetGoal, BudgetGoalUpdate, GoalType, NewBudgetGoal, create_budget_goal,
            deactivate_budget_goal, get_active_budget_goals, update_budget_goal,
        },
    },
    timezone::local_today,
    transaction::DateRange,
    user::get_user_by_id,
};

/// The state needed for the budget endpoints.
#[derive(Debug, Clone)]
pub struct BudgetState {
    /// The database connection for reading transactions and managing goals.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for BudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The optional date window for category totals.
#[derive(Debug, Default, Deserialize)]
pub struct CategoryTotalsQuery {
    /// The earliest date to include.
    pub start: Option<Date>,
    /// The latest date to include.
    pub end: Option<Date>,
}

/// A route handler for the total spent in each of a user's categories, for the pie chart.
pub async fn category_totals_endpoint(
    State(state): State<BudgetState>,
    Path(user_id): Path<i64>,
    Query(query): Query<CategoryTotalsQuery>,
) -> Result<Json<BTreeMap<String, Decimal>>, Error> {
    let window = match (query.start, query.end) {
        (None, None) => None,
        (start, end) => Some(DateRange::new(
            start.unwrap_or(Date::MIN),
            end.unwrap_or(Date::MAX),
        )?),
    };

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(UserId::new(user_id), &connection)?;

    category_totals(user.id, window, &connection).map(Json)
}

/// A route handler for how much of each category's weekly limit has been spent.
pub async fn weekly_budget_endpoint(
    State(state): State<BudgetState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<WeeklyBudgetStatus>>, Error> {
    let today = local_today(&state.local_timezone)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(UserId::new(user_id), &connection)?;

    weekly_budget_status(user.id, today, &connection).map(Json)
}

/// The optional filter for listing budget goals.
#[derive(Debug, Default, Deserialize)]
pub struct BudgetGoalQuery {
    /// Only list goals of this type.
    pub goal_type: Option<GoalType>,
}

/// A route handler for listing a user's active budget goals.
pub async fn list_budget_goals_endpoint(
    State(state): State<BudgetState>,
    Path(user_id): Path<i64>,
    Query(query): Query<BudgetGoalQuery>,
) -> Result<Json<Vec<BudgetGoal>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(UserId::new(user_id), &connection)?;

    get_active_budget_goals(user.id, query.goal_type, &connection).map(Json)
}

/// A route handler for creating a budget goal.
pub async fn create_budget_goal_endpoint(
    State(state): State<BudgetState>,
    Path(user_id): Path<i64>,
    Json(new_goal): Json<NewBudgetGoal>,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(UserId::new(user_id), &connection)?;
    let goal = create_budget_goal(user.id, new_goal, &connection)?;

    Ok((StatusCode::CREATED, Json(goal)))
}

/// A route handler for editing a budget goal.
pub async fn update_budget_goal_endpoint(
    State(state): State<BudgetState>,
    Path((user_id, goal_id)): Path<(i64, BudgetGoalId)>,
    Json(update): Json<BudgetGoalUpdate>,
) -> Result<Json<BudgetGoal>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    update_budget_goal(UserId::new(user_id), goal_id, update, &connection).map(Json)
}

/// A route handler for deleting a budget goal. The goal is kept but marked inactive.
pub async fn delete_budget_goal_endpoint(
    State(state): State<BudgetState>,
    Path((user_id, goal_id)): Path<(i64, BudgetGoalId)>,
) -> Result<StatusCode, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    deactivate_budget_goal(UserId::new(user_id), goal_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}

/// The response body for initializing default goals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultGoals {
    /// How many goals were created, zero if the user already had category goals.
    pub created: usize,
    /// The user's active goals afterwards.
    pub goals: Vec<BudgetGoal>,
}

/// A route handler that gives a user the default category goals if they have none.
///
/// Responds with 201 Created when goals were added and 200 OK otherwise.
pub async fn initialize_default_goals_endpoint(
    State(state): State<BudgetState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(UserId::new(user_id), &connection)?;
    let created = ensure_default_budget_goals(user.id, &connection)?;
    let goals = get_active_budget_goals(user.id, None, &connection)?;

    let status = if created > 0 {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(DefaultGoals { created, goals })))
}
