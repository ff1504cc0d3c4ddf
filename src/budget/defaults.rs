//! The starter set of category budget goals given to new users.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use rust_decimal::Decimal;

use crate::{
    Error, UserId,
    budget::goals::{
        GoalType, NewBudgetGoal, TimePeriod, count_active_category_goals, create_budget_goal,
    },
};

/// The categories and monthly amounts of the default budget goals.
pub const DEFAULT_CATEGORY_GOALS: [(&str, u32); 6] = [
    ("Food & Dining", 500),
    ("Entertainment", 200),
    ("Transportation", 300),
    ("Utilities", 150),
    ("Healthcare", 100),
    ("Shopping", 250),
];

/// Give `user_id` the default monthly category goals if they have no active category goals.
///
/// Each goal is named after its category, e.g. "Food & Dining Budget". The check and the
/// inserts run in one SQL transaction, so calling this repeatedly on the same connection
/// creates the defaults at most once.
///
/// Returns the number of goals created, which is zero when the user already had
/// category goals.
///
/// # Errors
/// Returns an error if any goal could not be stored, e.g. [Error::DuplicateGoalName] when
/// an annual goal already uses one of the default names. No goals are kept in that case.
pub fn ensure_default_budget_goals(
    user_id: UserId,
    connection: &Connection,
) -> Result<usize, Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    if count_active_category_goals(user_id, &transaction)? > 0 {
        return Ok(0);
    }

    for (category_name, amount) in DEFAULT_CATEGORY_GOALS {
        create_budget_goal(
            user_id,
            NewBudgetGoal {
                goal_type: GoalType::Category,
                name: format!("{category_name} Budget"),
                amount: Decimal::from(amount),
                time_period: Some(TimePeriod::Monthly),
                category_name: Some(category_name.to_owned()),
            },
            &transaction,
        )?;
    }

    transaction.commit()?;

    tracing::info!(
        "Created {} default budget goals for user {user_id}",
        DEFAULT_CATEGORY_GOALS.len()
    );

    Ok(DEFAULT_CATEGORY_GOALS.len())
}
