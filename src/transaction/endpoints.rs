//! Route handlers for creating, reading, editing and deleting transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::Query;
use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, CategoryId, Error, TransactionId, UserId,
    budget::ensure_default_budget_goals,
    category::{CategoryName, get_or_create_category},
    recurrence::{FrequencyRule, LegacyFrequency, one_year_after},
    timezone::local_today,
    transaction::{
        core::{
            DateRange, Transaction, TransactionSource, TransactionUpdate, delete_transaction,
            get_transaction, insert_transaction, query_legacy_bases, query_transactions,
            update_transaction,
        },
        projector::{ProjectedTransaction, project_legacy, project_recurring},
    },
    user::get_user_by_id,
};

/// The state needed for the transaction endpoints.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// Whether coarse frequency labels on older rows are projected when listing.
    pub legacy_projections: bool,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            legacy_projections: state.legacy_projections,
        }
    }
}

/// The request body for creating a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransactionForm {
    /// The date of the transaction, or the first occurrence of a recurring transaction.
    pub date: Date,
    /// Negative for expenses, positive for income.
    pub amount: Decimal,
    /// What the transaction was for.
    #[serde(default)]
    pub description: String,
    /// The ID of an existing category.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// The name of a category, created if the owner does not have it yet.
    /// Ignored when `category_id` is set.
    #[serde(default)]
    pub category: Option<CategoryName>,
    /// Makes the transaction recurring.
    #[serde(default)]
    pub frequency: Option<FrequencyRule>,
    /// The last date to generate occurrences for.
    #[serde(default)]
    pub end_date: Option<Date>,
    /// A coarse frequency label such as "monthly".
    #[serde(default)]
    pub legacy_frequency: Option<String>,
    /// Where the transaction came from.
    #[serde(default)]
    pub source: TransactionSource,
}

/// The response body for a created transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedTransaction {
    /// The stored transaction.
    pub transaction: Transaction,
    /// The IDs of the occurrences generated for a recurring transaction.
    pub instance_ids: Vec<TransactionId>,
}

/// A route handler for creating a transaction.
///
/// Recurring transactions also get one stored transaction per occurrence. Creating a
/// categorised transaction makes sure the owner has a set of default budget goals.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    Path(user_id): Path<i64>,
    Json(form): Json<NewTransactionForm>,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(UserId::new(user_id), &connection)?;

    let legacy_frequency = form
        .legacy_frequency
        .as_deref()
        .map(|label| {
            label
                .parse::<LegacyFrequency>()
                .map(|frequency| frequency.to_string())
                .map_err(|error| Error::InvalidFrequencyRule(error.to_string()))
        })
        .transpose()?;

    let mut builder = Transaction::build(user.id, form.amount, form.date, &form.description)
        .category_id(form.category_id)
        .source(form.source)
        .legacy_frequency(legacy_frequency);

    match (form.frequency, form.end_date) {
        (Some(rule), end_date) => builder = builder.recurring(rule, end_date),
        (None, Some(_)) => {
            return Err(Error::InvalidFrequencyRule(
                "an end date can only be set on a recurring transaction".to_owned(),
            ));
        }
        (None, None) => {}
    }

    builder.validate()?;

    // A category created by name must not outlive a failed insert.
    let sql_transaction =
        SqlTransaction::new_unchecked(&connection, TransactionBehavior::Immediate)?;

    if form.category_id.is_none()
        && let Some(name) = &form.category
    {
        let category = get_or_create_category(user.id, name, &sql_transaction)?;
        builder = builder.category_id(Some(category.id));
    }

    let transaction = insert_transaction(builder, &sql_transaction)
        .inspect_err(|error| tracing::error!("could not create transaction: {error}"))?;
    sql_transaction.commit()?;

    let instance_ids = if transaction.is_recurring() {
        project_recurring(&transaction, &connection)?
    } else {
        Vec::new()
    };

    if transaction.category_id.is_some()
        && let Err(error) = ensure_default_budget_goals(user.id, &connection)
    {
        tracing::warn!(
            "Could not create default budget goals for user {}: {error}",
            user.id
        );
    }

    tracing::info!(
        "Created transaction {} with {} occurrences for user {}",
        transaction.id,
        instance_ids.len(),
        user.id
    );

    Ok((
        StatusCode::CREATED,
        Json(CreatedTransaction {
            transaction,
            instance_ids,
        }),
    ))
}

/// A route handler for fetching a single transaction.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    Path((user_id, transaction_id)): Path<(i64, TransactionId)>,
) -> Result<Json<Transaction>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_transaction(UserId::new(user_id), transaction_id, &connection).map(Json)
}

/// The query parameters for listing transactions.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionListQuery {
    /// The earliest date to include, unbounded when omitted.
    pub start: Option<Date>,
    /// The latest date to include, unbounded when omitted.
    pub end: Option<Date>,
    /// Only include transactions in this category.
    pub category_id: Option<CategoryId>,
    /// Also return projections of older rows with coarse frequency labels.
    pub include_projections: Option<bool>,
}

/// The response body for listing transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionList {
    /// The stored transactions in date order.
    pub transactions: Vec<Transaction>,
    /// Read-only occurrences projected from coarse frequency labels.
    pub projections: Vec<ProjectedTransaction>,
    /// Whether some projections could not be computed.
    pub projections_truncated: bool,
}

/// A route handler for listing a user's transactions in a date range.
///
/// Projections are only computed when requested and enabled in the server
/// configuration. When no end date is given, projections stop one year from today.
pub async fn list_transactions_endpoint(
    State(state): State<TransactionState>,
    Path(user_id): Path<i64>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<TransactionList>, Error> {
    let range = DateRange::new(
        query.start.unwrap_or(Date::MIN),
        query.end.unwrap_or(Date::MAX),
    )?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(UserId::new(user_id), &connection)?;
    let transactions = query_transactions(user.id, range, query.category_id, &connection)?;

    let mut list = TransactionList {
        transactions,
        projections: Vec::new(),
        projections_truncated: false,
    };

    if !query.include_projections.unwrap_or(false) {
        return Ok(Json(list));
    }

    if !state.legacy_projections {
        tracing::debug!("Projections were requested but legacy projections are disabled");
        return Ok(Json(list));
    }

    let projection_end = match query.end {
        Some(end) => end,
        None => one_year_after(local_today(&state.local_timezone)?).unwrap_or(Date::MAX),
    };
    let projection_range = DateRange::new(range.start, projection_end.max(range.start))?;

    let bases = query_legacy_bases(user.id, projection_range.end, &connection)?;
    let projection = project_legacy(&bases, projection_range);

    list.projections = match query.category_id {
        Some(category_id) => projection
            .transactions
            .into_iter()
            .filter(|projected| projected.category_id == Some(category_id))
            .collect(),
        None => projection.transactions,
    };
    list.projections_truncated = projection.truncated;

    Ok(Json(list))
}

/// The request body for editing a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditTransactionForm {
    /// The new date.
    pub date: Date,
    /// The new amount.
    pub amount: Decimal,
    /// The new description.
    #[serde(default)]
    pub description: String,
    /// The new category, omit to remove the category.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

/// A route handler for editing the amount, date, description and category of a
/// transaction.
pub async fn update_transaction_endpoint(
    State(state): State<TransactionState>,
    Path((user_id, transaction_id)): Path<(i64, TransactionId)>,
    Json(form): Json<EditTransactionForm>,
) -> Result<Json<Transaction>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let update = TransactionUpdate {
        amount: form.amount,
        date: form.date,
        description: form.description,
        category_id: form.category_id,
    };

    update_transaction(UserId::new(user_id), transaction_id, update, &connection).map(Json)
}

/// A route handler for deleting a transaction and, for a recurring transaction, all of
/// its generated occurrences.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    Path((user_id, transaction_id)): Path<(i64, TransactionId)>,
) -> Result<StatusCode, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let instances_deleted = delete_transaction(UserId::new(user_id), transaction_id, &connection)?;

    tracing::info!(
        "Deleted transaction {transaction_id} and {instances_deleted} occurrences for user {user_id}"
    );

    Ok(StatusCode::NO_CONTENT)
}
