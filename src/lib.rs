//! A personal finance backend for tracking spending against budgets.
//!
//! The library serves a JSON API for users, transactions, categories and budget goals.
//! Recurring transactions are expanded into concrete future instances when they are
//! created, and spending is rolled up per category for pie charts and weekly budgets.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use time::Date;
use tokio::signal;

mod app_state;
mod budget;
mod category;
mod database_id;
mod db;
mod endpoints;
mod logging;
mod money;
mod recurrence;
mod routing;
mod timezone;
mod transaction;
mod user;

pub use app_state::AppState;
pub use budget::{
    BudgetGoal, BudgetGoalUpdate, BudgetState, DEFAULT_CATEGORY_GOALS, GoalType, NewBudgetGoal,
    TimePeriod, WeeklyBudgetStatus, category_totals, create_budget_goal, deactivate_budget_goal,
    ensure_default_budget_goals, get_active_budget_goals, get_budget_goal, update_budget_goal,
    weekly_budget_status,
};
pub use category::{
    Category, CategoryName, CategoryState, FALLBACK_COLOR, HexColor, NewCategory,
    color_for_category_name, create_category, delete_category, get_categories, get_category,
    get_or_create_category, update_category,
};
pub use database_id::{BudgetGoalId, CategoryId, DatabaseId, TransactionId};
pub use db::{SchemaCapabilities, initialize as initialize_db};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use recurrence::{
    FrequencyRule, LegacyFrequency, Occurrences, UnknownFrequencyLabel, expand, next_occurrence,
    one_year_after,
};
pub use routing::build_router;
pub use transaction::{
    DateRange, LegacyProjection, MATERIALIZE_OCCURRENCE_CAP, ProjectedTransaction, Transaction,
    TransactionBuilder, TransactionSource, TransactionState, TransactionUpdate, create_transaction,
    delete_transaction, get_instances, get_transaction, project_legacy, project_recurring,
    query_transactions, update_transaction,
};
pub use user::{User, UserId, UserState, create_user, get_user_by_id};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The fields of a recurrence rule do not describe a valid schedule, e.g. an unknown
    /// frequency type or a day of the month outside 1-31.
    #[error("invalid recurrence rule: {0}")]
    InvalidFrequencyRule(String),

    /// The end date of a recurring transaction must come after its first occurrence.
    #[error("the end date {end_date} must be after the transaction date {anchor}")]
    InvalidEndDate {
        /// The date of the recurring transaction.
        anchor: Date,
        /// The rejected end date.
        end_date: Date,
    },

    /// A transaction was given both a structured recurrence rule and a legacy frequency label.
    #[error("a transaction cannot have both a recurrence rule and a legacy frequency")]
    ConflictingRecurrence,

    /// Only recurring transactions that were not generated from another transaction can be
    /// expanded into instances.
    #[error("transaction {0} is not a recurring base transaction")]
    NotRecurringBase(crate::TransactionId),

    /// The start of a date window is after its end.
    #[error("the window start {start} is after the window end {end}")]
    InvalidDateRange {
        /// The start of the window.
        start: Date,
        /// The end of the window.
        end: Date,
    },

    /// An empty string was used as a category name.
    #[error("category name cannot be empty")]
    EmptyCategoryName,

    /// A category color was not a `#RRGGBB` hex string.
    #[error("\"{0}\" is not a valid hex color, expected a string like \"#4ECDC4\"")]
    InvalidColor(String),

    /// The owner already has a category with this name.
    #[error("the category \"{0}\" already exists")]
    DuplicateCategoryName(String),

    /// The category ID used for a transaction does not refer to one of the owner's categories.
    #[error("the category ID does not refer to a valid category")]
    InvalidCategory(Option<crate::CategoryId>),

    /// An empty string was used as a budget goal name.
    #[error("budget goal name cannot be empty")]
    EmptyGoalName,

    /// The owner already has an active budget goal with this name.
    #[error("an active budget goal named \"{0}\" already exists")]
    DuplicateGoalName(String),

    /// Category budget goals must name the category they apply to.
    #[error("category budget goals require a category name")]
    MissingGoalCategory,

    /// The email address used to create a user is not valid.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// The email address is already registered to another user.
    #[error("the email address is already in use")]
    DuplicateEmail,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Tried to update a transaction that does not exist
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to update a category that does not exist
    #[error("tried to update a category that is not in the database")]
    UpdateMissingCategory,

    /// Tried to delete a category that does not exist
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// Tried to update a budget goal that does not exist
    #[error("tried to update a budget goal that is not in the database")]
    UpdateMissingBudgetGoal,

    /// Tried to delete a budget goal that does not exist
    #[error("tried to delete a budget goal that is not in the database")]
    DeleteMissingBudgetGoal,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidFrequencyRule(_)
            | Error::InvalidEndDate { .. }
            | Error::ConflictingRecurrence
            | Error::NotRecurringBase(_)
            | Error::InvalidDateRange { .. }
            | Error::EmptyCategoryName
            | Error::InvalidColor(_)
            | Error::InvalidCategory(_)
            | Error::EmptyGoalName
            | Error::MissingGoalCategory
            | Error::InvalidEmail(_) => StatusCode::BAD_REQUEST,
            Error::DuplicateCategoryName(_) | Error::DuplicateGoalName(_) | Error::DuplicateEmail => {
                StatusCode::CONFLICT
            }
            Error::NotFound
            | Error::UpdateMissingTransaction
            | Error::DeleteMissingTransaction
            | Error::UpdateMissingCategory
            | Error::DeleteMissingCategory
            | Error::UpdateMissingBudgetGoal
            | Error::DeleteMissingBudgetGoal => StatusCode::NOT_FOUND,
            Error::SqlError(_) | Error::InvalidTimezoneError(_) | Error::DatabaseLockError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Internal details are only meant for the server logs.
            tracing::error!("An unexpected error occurred: {}", self);
            "An unexpected error occurred, check the server logs for more details.".to_owned()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
