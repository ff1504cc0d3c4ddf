//! Budget goals: spending targets for a year or for a single category.

use std::fmt::Display;

use rusqlite::{
    Connection, Row, ToSql, named_params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{BudgetGoalId, Error, UserId, money::read_amount};

/// What a budget goal applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    /// A limit on total spending.
    Annual,
    /// A limit on spending in one category.
    Category,
}

/// How often a budget goal's amount resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePeriod {
    /// The amount applies to each week.
    Weekly,
    /// The amount applies to each calendar month.
    Monthly,
    /// The amount applies to each calendar year.
    Yearly,
}

impl GoalType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::Category => "category",
        }
    }

    /// The time period used when a goal is created without one.
    pub fn default_time_period(&self) -> TimePeriod {
        match self {
            Self::Annual => TimePeriod::Yearly,
            Self::Category => TimePeriod::Monthly,
        }
    }
}

impl TimePeriod {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl Display for GoalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Display for TimePeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for GoalType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for GoalType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "annual" => Ok(Self::Annual),
            "category" => Ok(Self::Category),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

impl ToSql for TimePeriod {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TimePeriod {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// A spending target. Deleted goals are kept but marked inactive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetGoal {
    /// The ID of the goal.
    pub id: BudgetGoalId,
    /// The owner of the goal.
    pub user_id: UserId,
    /// Whether the goal is for total or per-category spending.
    pub goal_type: GoalType,
    /// The display name, unique among the owner's active goals.
    pub name: String,
    /// The most the owner wants to spend per `time_period`.
    pub amount: Decimal,
    /// How often the amount resets.
    pub time_period: TimePeriod,
    /// The category a category goal applies to.
    pub category_name: Option<String>,
    /// False once the goal has been deleted.
    pub is_active: bool,
    /// When the goal was created.
    pub created_at: OffsetDateTime,
    /// When the goal was last changed.
    pub updated_at: OffsetDateTime,
}

/// The fields needed to create a [BudgetGoal].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBudgetGoal {
    /// Whether the goal is for total or per-category spending.
    pub goal_type: GoalType,
    /// The display name.
    pub name: String,
    /// The target amount.
    pub amount: Decimal,
    /// Defaults to monthly for category goals and yearly for annual goals.
    #[serde(default)]
    pub time_period: Option<TimePeriod>,
    /// Required for category goals.
    #[serde(default)]
    pub category_name: Option<String>,
}

/// A partial edit of a [BudgetGoal]. Fields left as `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetGoalUpdate {
    /// The new name.
    #[serde(default)]
    pub name: Option<String>,
    /// The new amount.
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// The new time period.
    #[serde(default)]
    pub time_period: Option<TimePeriod>,
    /// The new category name.
    #[serde(default)]
    pub category_name: Option<String>,
    /// Reactivate or deactivate the goal.
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Create a budget goal for `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyGoalName] if the name is empty,
/// - [Error::MissingGoalCategory] if a category goal has no category name,
/// - [Error::DuplicateGoalName] if the owner has an active goal with the same name,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_budget_goal(
    user_id: UserId,
    new_goal: NewBudgetGoal,
    connection: &Connection,
) -> Result<BudgetGoal, Error> {
    let name = new_goal.name.trim().to_owned();

    if name.is_empty() {
        return Err(Error::EmptyGoalName);
    }

    let category_name = new_goal
        .category_name
        .map(|category_name| category_name.trim().to_owned())
        .filter(|category_name| !category_name.is_empty());

    if new_goal.goal_type == GoalType::Category && category_name.is_none() {
        return Err(Error::MissingGoalCategory);
    }

    let time_period = new_goal
        .time_period
        .unwrap_or_else(|| new_goal.goal_type.default_time_period());
    let now = OffsetDateTime::now_utc();

    connection
        .prepare(
            "INSERT INTO budget_goal
                (user_id, goal_type, name, amount, time_period, category_name, is_active,
                 created_at, updated_at)
             VALUES (:user_id, :goal_type, :name, :amount, :time_period, :category_name, 1,
                 :now, :now)
             RETURNING id, user_id, goal_type, name, amount, time_period, category_name,
                is_active, created_at, updated_at",
        )?
        .query_row(
            named_params! {
                ":user_id": user_id.as_i64(),
                ":goal_type": new_goal.goal_type,
                ":name": name,
                ":amount": new_goal.amount.to_string(),
                ":time_period": time_period,
                ":category_name": category_name,
                ":now": now,
            },
            map_budget_goal_row,
        )
        .map_err(|error| map_unique_name_error(error, &name))
}

/// Retrieve one of `user_id`'s budget goals, active or not.
///
/// # Errors
/// Returns [Error::NotFound] if the goal does not exist or belongs to another user.
pub fn get_budget_goal(
    user_id: UserId,
    goal_id: BudgetGoalId,
    connection: &Connection,
) -> Result<BudgetGoal, Error> {
    connection
        .prepare(
            "SELECT id, user_id, goal_type, name, amount, time_period, category_name,
                is_active, created_at, updated_at
             FROM budget_goal WHERE id = :id AND user_id = :user_id",
        )?
        .query_row(
            named_params! {":id": goal_id, ":user_id": user_id.as_i64()},
            map_budget_goal_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve `user_id`'s active budget goals, optionally only those of one type, in the
/// order they were created.
pub fn get_active_budget_goals(
    user_id: UserId,
    goal_type: Option<GoalType>,
    connection: &Connection,
) -> Result<Vec<BudgetGoal>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, goal_type, name, amount, time_period, category_name,
                is_active, created_at, updated_at
             FROM budget_goal
             WHERE user_id = :user_id AND is_active = 1
                AND (:goal_type IS NULL OR goal_type = :goal_type)
             ORDER BY id ASC",
        )?
        .query_map(
            named_params! {":user_id": user_id.as_i64(), ":goal_type": goal_type},
            map_budget_goal_row,
        )?
        .map(|maybe_goal| maybe_goal.map_err(Error::SqlError))
        .collect()
}

/// Count `user_id`'s active category goals.
pub fn count_active_category_goals(
    user_id: UserId,
    connection: &Connection,
) -> Result<u32, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM budget_goal
             WHERE user_id = ?1 AND goal_type = ?2 AND is_active = 1",
            (user_id.as_i64(), GoalType::Category),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Apply `update` to one of `user_id`'s budget goals.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingBudgetGoal] if the goal does not exist,
/// - [Error::EmptyGoalName] if the new name is empty,
/// - [Error::DuplicateGoalName] if the change would give the owner two active goals
///   with the same name,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_budget_goal(
    user_id: UserId,
    goal_id: BudgetGoalId,
    update: BudgetGoalUpdate,
    connection: &Connection,
) -> Result<BudgetGoal, Error> {
    let existing = get_budget_goal(user_id, goal_id, connection).map_err(|error| match error {
        Error::NotFound => Error::UpdateMissingBudgetGoal,
        error => error,
    })?;

    let name = match update.name {
        Some(name) if name.trim().is_empty() => return Err(Error::EmptyGoalName),
        Some(name) => name.trim().to_owned(),
        None => existing.name,
    };

    connection
        .prepare(
            "UPDATE budget_goal
             SET name = :name, amount = :amount, time_period = :time_period,
                category_name = :category_name, is_active = :is_active, updated_at = :now
             WHERE id = :id AND user_id = :user_id
             RETURNING id, user_id, goal_type, name, amount, time_period, category_name,
                is_active, created_at, updated_at",
        )?
        .query_row(
            named_params! {
                ":name": name,
                ":amount": update.amount.unwrap_or(existing.amount).to_string(),
                ":time_period": update.time_period.unwrap_or(existing.time_period),
                ":category_name": update.category_name.or(existing.category_name),
                ":is_active": update.is_active.unwrap_or(existing.is_active),
                ":now": OffsetDateTime::now_utc(),
                ":id": goal_id,
                ":user_id": user_id.as_i64(),
            },
            map_budget_goal_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UpdateMissingBudgetGoal,
            error => map_unique_name_error(error, &name),
        })
}

/// Soft delete one of `user_id`'s budget goals by marking it inactive.
///
/// # Errors
/// Returns [Error::DeleteMissingBudgetGoal] if the goal does not exist.
pub fn deactivate_budget_goal(
    user_id: UserId,
    goal_id: BudgetGoalId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE budget_goal SET is_active = 0, updated_at = ?1 WHERE id = ?2 AND user_id = ?3",
        (OffsetDateTime::now_utc(), goal_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingBudgetGoal);
    }

    Ok(())
}

/// Initialize the budget goal table.
///
/// Active goal names are unique per owner, inactive goals may share names.
pub fn create_budget_goal_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS budget_goal (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            goal_type TEXT NOT NULL,
            name TEXT NOT NULL,
            amount TEXT NOT NULL,
            time_period TEXT NOT NULL,
            category_name TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_budget_goal_active_name
            ON budget_goal(user_id, name) WHERE is_active = 1;",
    )?;

    Ok(())
}

fn map_unique_name_error(error: rusqlite::Error, name: &str) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            _,
        ) => Error::DuplicateGoalName(name.to_owned()),
        error => error.into(),
    }
}

fn map_budget_goal_row(row: &Row) -> Result<BudgetGoal, rusqlite::Error> {
    Ok(BudgetGoal {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        goal_type: row.get(2)?,
        name: row.get(3)?,
        amount: read_amount(row, 4)?,
        time_period: row.get(5)?,
        category_name: row.get(6)?,
        is_active: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
