//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql, Transaction as SqlTransaction, TransactionBehavior, named_params,
    params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Type, ValueRef},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    CategoryId, Error, TransactionId, UserId,
    category::{delete_category_link, get_category, insert_category_link},
    money::read_amount,
    recurrence::{FrequencyColumns, FrequencyRule},
};

// ============================================================================
// MODELS
// ============================================================================

/// Where a transaction came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionSource {
    /// Entered by the user.
    #[default]
    Manual,
    /// Synced from a bank or other external feed.
    Imported,
}

impl TransactionSource {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Imported => "imported",
        }
    }
}

impl Display for TransactionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "imported" => Ok(Self::Imported),
            other => Err(format!("unknown transaction source \"{other}\"")),
        }
    }
}

impl ToSql for TransactionSource {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionSource {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|_| FromSqlError::InvalidType)
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// A transaction with a [FrequencyRule] is a recurring base. Its future occurrences are
/// stored as separate, non-recurring transactions whose `parent_transaction_id` points
/// back at the base.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The owner of the transaction.
    pub user_id: UserId,
    /// The amount of money spent (negative) or earned (positive).
    pub amount: Decimal,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The ID of the category the transaction belongs to.
    pub category_id: Option<CategoryId>,
    /// How the transaction repeats, if it is a recurring base.
    pub frequency: Option<FrequencyRule>,
    /// The last date occurrences were generated up to, if set explicitly.
    pub end_date: Option<Date>,
    /// The recurring base this transaction was generated from.
    pub parent_transaction_id: Option<TransactionId>,
    /// Whether the transaction was entered manually or imported.
    pub source: TransactionSource,
    /// A coarse frequency label from older records, e.g. "monthly".
    pub legacy_frequency: Option<String>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        user_id: UserId,
        amount: Decimal,
        date: Date,
        description: &str,
    ) -> TransactionBuilder {
        TransactionBuilder {
            user_id,
            amount,
            date,
            description: description.to_owned(),
            category_id: None,
            frequency: None,
            end_date: None,
            parent_transaction_id: None,
            source: TransactionSource::Manual,
            legacy_frequency: None,
        }
    }

    /// Whether this transaction is a recurring base.
    pub fn is_recurring(&self) -> bool {
        self.frequency.is_some()
    }
}

/// A builder for creating [Transaction] instances.
///
/// # Examples
///
/// ```ignore
/// let rent = Transaction::build(user_id, dec!(-1200), date!(2025-01-01), "Rent")
///     .category_id(Some(housing.id))
///     .recurring(FrequencyRule::monthly(1)?, None);
///
/// let rent = create_transaction(rent, &connection)?;
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The owner of the transaction.
    pub user_id: UserId,

    /// The monetary amount of the transaction.
    ///
    /// Positive values represent income, negative values represent expenses.
    pub amount: Decimal,

    /// The date when the transaction occurred, or the first occurrence of a recurring
    /// transaction.
    pub date: Date,

    /// A human-readable description of the transaction.
    pub description: String,

    /// The category of the transaction, e.g. "Groceries", "Transport", "Rent".
    pub category_id: Option<CategoryId>,

    /// The recurrence rule for a recurring base.
    pub frequency: Option<FrequencyRule>,

    /// An explicit end for the generated occurrences of a recurring base.
    pub end_date: Option<Date>,

    /// Set on instances generated from a recurring base.
    pub parent_transaction_id: Option<TransactionId>,

    /// Whether the transaction was entered manually or imported.
    pub source: TransactionSource,

    /// A coarse frequency label, only used by legacy projections.
    pub legacy_frequency: Option<String>,
}

impl TransactionBuilder {
    /// Set the category id for the transaction.
    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Make the transaction a recurring base that repeats according to `rule`.
    ///
    /// Occurrences are generated up to `end_date`, or one year after the transaction date
    /// when `end_date` is `None`.
    pub fn recurring(mut self, rule: FrequencyRule, end_date: Option<Date>) -> Self {
        self.frequency = Some(rule);
        self.end_date = end_date;
        self
    }

    /// Set where the transaction came from.
    pub fn source(mut self, source: TransactionSource) -> Self {
        self.source = source;
        self
    }

    /// Attach a coarse legacy frequency label.
    pub fn legacy_frequency(mut self, label: Option<String>) -> Self {
        self.legacy_frequency = label;
        self
    }

    pub(crate) fn parent_transaction_id(mut self, parent_id: TransactionId) -> Self {
        self.parent_transaction_id = Some(parent_id);
        self
    }

    /// Check the builder's fields without touching the database.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::ConflictingRecurrence] if both a recurrence rule and a legacy label are set,
    /// - or [Error::InvalidEndDate] if the end date is not after the transaction date.
    pub fn validate(&self) -> Result<(), Error> {
        if self.frequency.is_some() && self.legacy_frequency.is_some() {
            return Err(Error::ConflictingRecurrence);
        }

        if let Some(end_date) = self.end_date
            && end_date <= self.date
        {
            return Err(Error::InvalidEndDate {
                anchor: self.date,
                end_date,
            });
        }

        Ok(())
    }
}

/// The fields of a transaction that may be edited after it has been created.
///
/// Whether a transaction recurs is fixed when it is created.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionUpdate {
    /// The new amount.
    pub amount: Decimal,
    /// The new date.
    pub date: Date,
    /// The new description.
    pub description: String,
    /// The new category, `None` removes the transaction from its category.
    pub category_id: Option<CategoryId>,
}

/// An inclusive range of dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// The first date in the range.
    pub start: Date,
    /// The last date in the range.
    pub end: Date,
}

impl DateRange {
    /// Create a date range.
    ///
    /// # Errors
    /// Returns [Error::InvalidDateRange] if `start` is after `end`.
    pub fn new(start: Date, end: Date) -> Result<Self, Error> {
        if start > end {
            return Err(Error::InvalidDateRange { start, end });
        }

        Ok(Self { start, end })
    }

    /// Whether `date` falls inside the range.
    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const SELECT_TRANSACTION: &str = "SELECT t.id, t.user_id, t.amount, t.date, t.description, \
    l.category_id, t.frequency_type, t.week_day, t.month_day, t.year_month, t.year_day, \
    t.end_date, t.parent_transaction_id, t.source, t.legacy_frequency \
    FROM \"transaction\" t LEFT JOIN category_link l ON l.transaction_id = t.id";

/// Create a new transaction in the database from a builder.
///
/// # Errors
/// This function will return a:
/// - [Error::ConflictingRecurrence] if both a recurrence rule and a legacy label are set,
/// - [Error::InvalidEndDate] if the end date is not after the transaction date,
/// - [Error::InvalidCategory] if the category ID does not refer to one of the owner's categories,
/// - [Error::NotFound] if the owner or parent transaction does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
///
/// The row and its category link are written in one SQL transaction.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;
    let created = insert_transaction(builder, &transaction)?;
    transaction.commit()?;

    Ok(created)
}

/// Insert a transaction and its category link using the caller's SQL transaction.
///
/// Must be called inside an open SQL transaction so a failed link also discards the row.
pub(crate) fn insert_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    builder.validate()?;

    if let Some(category_id) = builder.category_id {
        get_category(builder.user_id, category_id, connection).map_err(|error| match error {
            Error::NotFound => Error::InvalidCategory(Some(category_id)),
            error => error,
        })?;
    }

    let columns = builder
        .frequency
        .map(|rule| rule.to_columns())
        .unwrap_or_default();

    let id: TransactionId = connection
        .prepare(
            "INSERT INTO \"transaction\" (user_id, amount, date, description, is_recurring,
                frequency_type, week_day, month_day, year_month, year_day, end_date,
                parent_transaction_id, source, legacy_frequency)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             RETURNING id",
        )?
        .query_row(
            params![
                builder.user_id.as_i64(),
                builder.amount.to_string(),
                builder.date,
                builder.description,
                builder.frequency.is_some(),
                columns.frequency_type,
                columns.week_day,
                columns.month_day,
                columns.year_month,
                columns.year_day,
                builder.end_date,
                builder.parent_transaction_id,
                builder.source,
                builder.legacy_frequency,
            ],
            |row| row.get(0),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::NotFound,
            error => error.into(),
        })?;

    if let Some(category_id) = builder.category_id {
        insert_category_link(id, category_id, connection)?;
    }

    Ok(Transaction {
        id,
        user_id: builder.user_id,
        amount: builder.amount,
        date: builder.date,
        description: builder.description,
        category_id: builder.category_id,
        frequency: builder.frequency,
        end_date: builder.end_date,
        parent_transaction_id: builder.parent_transaction_id,
        source: builder.source,
        legacy_frequency: builder.legacy_frequency,
    })
}

/// Retrieve one of `user_id`'s transactions by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction owned by `user_id`,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(
    user_id: UserId,
    id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "{SELECT_TRANSACTION} WHERE t.id = :id AND t.user_id = :user_id"
        ))?
        .query_one(
            named_params! {":id": id, ":user_id": user_id.as_i64()},
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Get `user_id`'s transactions dated inside `range`, optionally only those in one
/// category, sorted by date and then ID.
pub fn query_transactions(
    user_id: UserId,
    range: DateRange,
    category_id: Option<CategoryId>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    // Sort by date, and then ID to keep transaction order stable after updates
    connection
        .prepare(&format!(
            "{SELECT_TRANSACTION}
             WHERE t.user_id = :user_id
                AND t.date BETWEEN :start AND :end
                AND (:category_id IS NULL OR l.category_id = :category_id)
             ORDER BY t.date ASC, t.id ASC"
        ))?
        .query_map(
            named_params! {
                ":user_id": user_id.as_i64(),
                ":start": range.start,
                ":end": range.end,
                ":category_id": category_id,
            },
            map_transaction_row,
        )?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

/// Get the instances generated from the recurring base `parent_id`, sorted by date.
pub fn get_instances(
    parent_id: TransactionId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_TRANSACTION} WHERE t.parent_transaction_id = :parent_id
             ORDER BY t.date ASC, t.id ASC"
        ))?
        .query_map(named_params! {":parent_id": parent_id}, map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

/// Get `user_id`'s transactions that carry a legacy frequency label and start on or
/// before `until`.
pub fn query_legacy_bases(
    user_id: UserId,
    until: Date,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_TRANSACTION}
             WHERE t.user_id = :user_id
                AND t.legacy_frequency IS NOT NULL
                AND t.parent_transaction_id IS NULL
                AND t.date <= :until
             ORDER BY t.date ASC, t.id ASC"
        ))?
        .query_map(
            named_params! {":user_id": user_id.as_i64(), ":until": until},
            map_transaction_row,
        )?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

/// Edit the amount, date, description and category of one of `user_id`'s transactions.
///
/// Occurrences that were already generated from a recurring base are left as they are.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingTransaction] if the transaction does not exist,
/// - [Error::InvalidCategory] if the category is not one of the owner's categories,
/// - [Error::InvalidEndDate] if a recurring base would be moved on or after its end date,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    user_id: UserId,
    id: TransactionId,
    update: TransactionUpdate,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let existing = get_transaction(user_id, id, connection).map_err(|error| match error {
        Error::NotFound => Error::UpdateMissingTransaction,
        error => error,
    })?;

    if let Some(end_date) = existing.end_date
        && end_date <= update.date
    {
        return Err(Error::InvalidEndDate {
            anchor: update.date,
            end_date,
        });
    }

    if let Some(category_id) = update.category_id {
        get_category(user_id, category_id, connection).map_err(|error| match error {
            Error::NotFound => Error::InvalidCategory(Some(category_id)),
            error => error,
        })?;
    }

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let rows_affected = transaction.execute(
        "UPDATE \"transaction\" SET amount = ?1, date = ?2, description = ?3
         WHERE id = ?4 AND user_id = ?5",
        params![
            update.amount.to_string(),
            update.date,
            update.description,
            id,
            user_id.as_i64(),
        ],
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingTransaction);
    }

    match update.category_id {
        Some(category_id) => insert_category_link(id, category_id, &transaction)?,
        None => delete_category_link(id, &transaction)?,
    }

    transaction.commit()?;

    Ok(Transaction {
        amount: update.amount,
        date: update.date,
        description: update.description,
        category_id: update.category_id,
        ..existing
    })
}

/// Delete one of `user_id`'s transactions.
///
/// Deleting a recurring base also deletes every instance generated from it. Returns the
/// number of generated instances that were deleted alongside the transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingTransaction] if the transaction does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_transaction(
    user_id: UserId,
    id: TransactionId,
    connection: &Connection,
) -> Result<usize, Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let instances_deleted = transaction.execute(
        "DELETE FROM \"transaction\" WHERE parent_transaction_id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    let rows_affected = transaction.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        // Dropping the SQL transaction rolls back the instance deletes.
        return Err(Error::DeleteMissingTransaction);
    }

    transaction.commit()?;

    Ok(instances_deleted)
}

/// The columns of the transaction table, in the order they were introduced.
///
/// Databases created before recurring transactions were supported only have the
/// first five columns. [create_transaction_table] adds any that are missing.
const TRANSACTION_COLUMNS: &[(&str, &str)] = &[
    ("id", "INTEGER PRIMARY KEY AUTOINCREMENT"),
    (
        "user_id",
        "INTEGER NOT NULL REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE",
    ),
    ("amount", "TEXT NOT NULL"),
    ("date", "TEXT NOT NULL"),
    ("description", "TEXT NOT NULL"),
    ("is_recurring", "INTEGER NOT NULL DEFAULT 0"),
    ("frequency_type", "TEXT"),
    ("week_day", "TEXT"),
    ("month_day", "INTEGER"),
    ("year_month", "INTEGER"),
    ("year_day", "INTEGER"),
    ("end_date", "TEXT"),
    (
        "parent_transaction_id",
        "INTEGER REFERENCES \"transaction\"(id) ON DELETE CASCADE",
    ),
    ("source", "TEXT NOT NULL DEFAULT 'manual'"),
    ("legacy_frequency", "TEXT"),
];

/// Create the transaction table in the database, adding any columns missing from a
/// table created by an older version.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    let column_definitions = TRANSACTION_COLUMNS
        .iter()
        .map(|(name, definition)| format!("{name} {definition}"))
        .collect::<Vec<_>>()
        .join(",\n");

    connection.execute(
        &format!("CREATE TABLE IF NOT EXISTS \"transaction\" (\n{column_definitions}\n)"),
        (),
    )?;

    let existing_columns = get_column_names(connection, "transaction")?;

    for (name, definition) in TRANSACTION_COLUMNS {
        if existing_columns.iter().any(|column| column == name) {
            continue;
        }

        tracing::info!("Adding missing column {name} to the transaction table");
        connection.execute(
            &format!("ALTER TABLE \"transaction\" ADD COLUMN {name} {definition}"),
            (),
        )?;
    }

    connection.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date);
         CREATE INDEX IF NOT EXISTS idx_transaction_parent ON \"transaction\"(parent_transaction_id);",
    )?;

    Ok(())
}

/// The names of the columns of `table`.
pub fn get_column_names(
    connection: &Connection,
    table: &str,
) -> Result<Vec<String>, rusqlite::Error> {
    connection
        .prepare("SELECT name FROM pragma_table_info(?1)")?
        .query_map([table], |row| row.get(0))?
        .collect()
}

/// Map a database row to a Transaction.
///
/// The row must have the columns of `SELECT_TRANSACTION` in order.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let columns = FrequencyColumns {
        frequency_type: row.get(6)?,
        week_day: row.get(7)?,
        month_day: row.get(8)?,
        year_month: row.get(9)?,
        year_day: row.get(10)?,
    };
    let frequency = columns
        .into_rule()
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(error)))?;

    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        amount: read_amount(row, 2)?,
        date: row.get(3)?,
        description: row.get(4)?,
        category_id: row.get(5)?,
        frequency,
        end_date: row.get(11)?,
        parent_transaction_id: row.get(12)?,
        source: row.get(13)?,
        legacy_frequency: row.get(14)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use time::{Date, Month, Weekday, macros::date};

    use crate::{
        Error, FrequencyRule, UserId,
        category::{CategoryName, NewCategory, create_category},
        db::initialize,
        transaction::core::{
            DateRange, Transaction, TransactionSource, TransactionUpdate, create_transaction,
            delete_transaction, get_instances, get_transaction, query_legacy_bases,
            query_transactions, update_transaction,
        },
        user::create_user,
    };

    fn get_test_connection() -> (Connection, UserId) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_user("test@example.com", &conn).unwrap();
        (conn, user.id)
    }

    #[test]
    fn create_succeeds() {
        let (conn, user_id) = get_test_connection();
        let amount = dec!(-12.30);

        let transaction = create_transaction(
            Transaction::build(user_id, amount, date!(2025 - 10 - 05), "Coffee"),
            &conn,
        )
        .expect("Could not create transaction");

        assert_eq!(transaction.amount, amount);
        assert!(!transaction.is_recurring());
        assert_eq!(transaction.source, TransactionSource::Manual);
        assert_eq!(get_transaction(user_id, transaction.id, &conn), Ok(transaction));
    }

    #[test]
    fn create_recurring_stores_rule() {
        let (conn, user_id) = get_test_connection();
        let rule = FrequencyRule::weekly(Weekday::Friday);

        let transaction = create_transaction(
            Transaction::build(user_id, dec!(50), date!(2025 - 01 - 03), "Allowance")
                .recurring(rule, Some(date!(2025 - 03 - 01))),
            &conn,
        )
        .unwrap();

        let got = get_transaction(user_id, transaction.id, &conn).unwrap();
        assert_eq!(got.frequency, Some(rule));
        assert_eq!(got.end_date, Some(date!(2025 - 03 - 01)));
        assert!(got.is_recurring());
    }

    #[test]
    fn create_fails_when_end_date_is_not_after_date() {
        let (conn, user_id) = get_test_connection();
        let date = date!(2025 - 01 - 31);

        let result = create_transaction(
            Transaction::build(user_id, dec!(1), date, "")
                .recurring(FrequencyRule::monthly(31).unwrap(), Some(date)),
            &conn,
        );

        assert_eq!(
            result,
            Err(Error::InvalidEndDate {
                anchor: date,
                end_date: date
            })
        );
    }

    #[test]
    fn create_fails_with_rule_and_legacy_label() {
        let (conn, user_id) = get_test_connection();

        let result = create_transaction(
            Transaction::build(user_id, dec!(1), date!(2025 - 01 - 01), "")
                .recurring(FrequencyRule::monthly(1).unwrap(), None)
                .legacy_frequency(Some("monthly".to_owned())),
            &conn,
        );

        assert_eq!(result, Err(Error::ConflictingRecurrence));
    }

    #[test]
    fn create_fails_on_invalid_category_id() {
        let (conn, user_id) = get_test_connection();
        let category_id = Some(42);

        let result = create_transaction(
            Transaction::build(user_id, dec!(123.45), date!(2025 - 10 - 04), "")
                .category_id(category_id),
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidCategory(category_id)));
    }

    #[test]
    fn create_fails_on_another_owners_category() {
        let (conn, user_id) = get_test_connection();
        let other_user = create_user("other@example.com", &conn).unwrap();
        let category = create_category(
            other_user.id,
            NewCategory::named(CategoryName::new_unchecked("Food")),
            &conn,
        )
        .unwrap();

        let result = create_transaction(
            Transaction::build(user_id, dec!(1), date!(2025 - 10 - 04), "")
                .category_id(Some(category.id)),
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidCategory(Some(category.id))));
    }

    fn fail_category_links(conn: &Connection) {
        conn.execute_batch(
            "CREATE TRIGGER fail_category_link BEFORE INSERT ON category_link
             BEGIN SELECT RAISE(ABORT, 'category link failed'); END;",
        )
        .unwrap();
    }

    #[test]
    fn create_discards_row_when_category_link_fails() {
        let (conn, user_id) = get_test_connection();
        let food = create_category(
            user_id,
            NewCategory::named(CategoryName::new_unchecked("Food")),
            &conn,
        )
        .unwrap();
        fail_category_links(&conn);

        let result = create_transaction(
            Transaction::build(user_id, dec!(-5), date!(2025 - 03 - 01), "Lunch")
                .category_id(Some(food.id)),
            &conn,
        );

        assert!(result.is_err());
        let everything = DateRange::new(Date::MIN, Date::MAX).unwrap();
        assert_eq!(query_transactions(user_id, everything, None, &conn), Ok(vec![]));
    }

    #[test]
    fn get_transaction_of_another_owner_is_not_found() {
        let (conn, user_id) = get_test_connection();
        let other_user = create_user("other@example.com", &conn).unwrap();
        let transaction = create_transaction(
            Transaction::build(user_id, dec!(1), date!(2025 - 10 - 04), ""),
            &conn,
        )
        .unwrap();

        assert_eq!(
            get_transaction(other_user.id, transaction.id, &conn),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn query_transactions_filters_by_range_and_category() {
        let (conn, user_id) = get_test_connection();
        let food = create_category(
            user_id,
            NewCategory::named(CategoryName::new_unchecked("Food")),
            &conn,
        )
        .unwrap();
        let mut want = Vec::new();
        for day in 1..=10 {
            let category_id = (day % 2 == 0).then_some(food.id);
            let date = Date::from_calendar_date(2025, Month::March, day).unwrap();
            let transaction = create_transaction(
                Transaction::build(user_id, dec!(-5), date, "").category_id(category_id),
                &conn,
            )
            .unwrap();

            if (3..=8).contains(&day) && category_id.is_some() {
                want.push(transaction);
            }
        }

        let range = DateRange::new(date!(2025 - 03 - 03), date!(2025 - 03 - 08)).unwrap();
        let got = query_transactions(user_id, range, Some(food.id), &conn).unwrap();

        assert_eq!(got, want);
        assert_eq!(query_transactions(user_id, range, None, &conn).unwrap().len(), 6);
    }

    #[test]
    fn date_range_rejects_reversed_dates() {
        assert_eq!(
            DateRange::new(date!(2025 - 03 - 08), date!(2025 - 03 - 03)),
            Err(Error::InvalidDateRange {
                start: date!(2025 - 03 - 08),
                end: date!(2025 - 03 - 03)
            })
        );
    }

    #[test]
    fn update_changes_fields_and_category() {
        let (conn, user_id) = get_test_connection();
        let food = create_category(
            user_id,
            NewCategory::named(CategoryName::new_unchecked("Food")),
            &conn,
        )
        .unwrap();
        let transaction = create_transaction(
            Transaction::build(user_id, dec!(-5), date!(2025 - 03 - 01), "Old")
                .category_id(Some(food.id)),
            &conn,
        )
        .unwrap();

        let updated = update_transaction(
            user_id,
            transaction.id,
            TransactionUpdate {
                amount: dec!(-7.5),
                date: date!(2025 - 03 - 02),
                description: "New".to_owned(),
                category_id: None,
            },
            &conn,
        )
        .unwrap();

        assert_eq!(updated.category_id, None);
        assert_eq!(get_transaction(user_id, transaction.id, &conn), Ok(updated));
    }

    #[test]
    fn update_keeps_recurrence() {
        let (conn, user_id) = get_test_connection();
        let rule = FrequencyRule::monthly(1).unwrap();
        let transaction = create_transaction(
            Transaction::build(user_id, dec!(-5), date!(2025 - 03 - 01), "")
                .recurring(rule, None),
            &conn,
        )
        .unwrap();

        let updated = update_transaction(
            user_id,
            transaction.id,
            TransactionUpdate {
                amount: dec!(-6),
                date: date!(2025 - 03 - 01),
                description: String::new(),
                category_id: None,
            },
            &conn,
        )
        .unwrap();

        assert_eq!(updated.frequency, Some(rule));
    }

    #[test]
    fn update_missing_transaction_fails() {
        let (conn, user_id) = get_test_connection();

        let result = update_transaction(
            user_id,
            1,
            TransactionUpdate {
                amount: dec!(1),
                date: date!(2025 - 03 - 01),
                description: String::new(),
                category_id: None,
            },
            &conn,
        );

        assert_eq!(result, Err(Error::UpdateMissingTransaction));
    }

    #[test]
    fn update_keeps_old_fields_when_category_link_fails() {
        let (conn, user_id) = get_test_connection();
        let food = create_category(
            user_id,
            NewCategory::named(CategoryName::new_unchecked("Food")),
            &conn,
        )
        .unwrap();
        let transaction = create_transaction(
            Transaction::build(user_id, dec!(-5), date!(2025 - 03 - 01), "Old"),
            &conn,
        )
        .unwrap();
        fail_category_links(&conn);

        let result = update_transaction(
            user_id,
            transaction.id,
            TransactionUpdate {
                amount: dec!(-9),
                date: date!(2025 - 03 - 02),
                description: "New".to_owned(),
                category_id: Some(food.id),
            },
            &conn,
        );

        assert!(result.is_err());
        assert_eq!(get_transaction(user_id, transaction.id, &conn), Ok(transaction));
    }

    #[test]
    fn delete_base_deletes_instances() {
        let (conn, user_id) = get_test_connection();
        let base = create_transaction(
            Transaction::build(user_id, dec!(-5), date!(2025 - 03 - 01), "")
                .recurring(FrequencyRule::monthly(1).unwrap(), None),
            &conn,
        )
        .unwrap();
        for month in [Month::April, Month::May] {
            let date = Date::from_calendar_date(2025, month, 1).unwrap();
            create_transaction(
                Transaction::build(user_id, dec!(-5), date, "").parent_transaction_id(base.id),
                &conn,
            )
            .unwrap();
        }

        let instances_deleted = delete_transaction(user_id, base.id, &conn).unwrap();

        assert_eq!(instances_deleted, 2);
        assert_eq!(get_instances(base.id, &conn), Ok(vec![]));
        assert_eq!(get_transaction(user_id, base.id, &conn), Err(Error::NotFound));
    }

    #[test]
    fn delete_missing_transaction_fails() {
        let (conn, user_id) = get_test_connection();

        assert_eq!(
            delete_transaction(user_id, 1, &conn),
            Err(Error::DeleteMissingTransaction)
        );
    }

    #[test]
    fn legacy_bases_only_include_labelled_rows() {
        let (conn, user_id) = get_test_connection();
        let labelled = create_transaction(
            Transaction::build(user_id, dec!(-9.99), date!(2025 - 01 - 15), "Streaming")
                .legacy_frequency(Some("monthly".to_owned())),
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(user_id, dec!(-1), date!(2025 - 01 - 15), ""),
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(user_id, dec!(-1), date!(2025 - 06 - 15), "")
                .legacy_frequency(Some("weekly".to_owned())),
            &conn,
        )
        .unwrap();

        let got = query_legacy_bases(user_id, date!(2025 - 02 - 28), &conn).unwrap();

        assert_eq!(got, vec![labelled]);
    }
}
