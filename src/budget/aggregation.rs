//! Per-category spending totals for the pie chart and the weekly budget.

use std::collections::{BTreeMap, HashMap};

use rusqlite::{Connection, named_params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, Duration};

use crate::{
    CategoryId, Error, UserId,
    category::{Category, get_categories},
    money::read_amount,
    transaction::DateRange,
};

/// How much was spent in a category over the last week, compared to its weekly limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyBudgetStatus {
    /// The ID of the category.
    pub category_id: CategoryId,
    /// The name of the category.
    pub category_name: String,
    /// The category's weekly limit, if it has one.
    pub weekly_limit: Option<Decimal>,
    /// The sum of the absolute amounts of the category's transactions in the last week.
    pub amount_spent: Decimal,
    /// The weekly limit, or zero without a limit, minus the amount spent. May be negative.
    pub amount_remaining: Decimal,
}

/// Sum the absolute amounts of the owner's transactions per category name.
///
/// Every one of the owner's categories is in the result, with a total of zero when none
/// of its transactions fall in `window`. Without a window, all transactions are counted.
pub fn category_totals(
    user_id: UserId,
    window: Option<DateRange>,
    connection: &Connection,
) -> Result<BTreeMap<String, Decimal>, Error> {
    let categories = get_categories(user_id, connection)?;
    let amounts = get_categorised_amounts(user_id, window, connection)?;
    let totals = sum_by_category(&categories, &amounts);

    Ok(categories
        .into_iter()
        .map(|category| {
            let total = totals.get(&category.id).copied().unwrap_or_default();
            (category.name.to_string(), total)
        })
        .collect())
}

/// Compare the owner's spending over the seven days up to and including `today` with each
/// category's weekly limit.
///
/// The result has one entry per category, ordered by category name.
pub fn weekly_budget_status(
    user_id: UserId,
    today: Date,
    connection: &Connection,
) -> Result<Vec<WeeklyBudgetStatus>, Error> {
    let week_start = today.checked_sub(Duration::days(7)).unwrap_or(Date::MIN);
    let window = DateRange::new(week_start, today)?;

    let categories = get_categories(user_id, connection)?;
    let amounts = get_categorised_amounts(user_id, Some(window), connection)?;
    let totals = sum_by_category(&categories, &amounts);

    Ok(categories
        .into_iter()
        .map(|category| {
            let amount_spent = totals.get(&category.id).copied().unwrap_or_default();
            let amount_remaining = category.weekly_limit.unwrap_or_default() - amount_spent;

            WeeklyBudgetStatus {
                category_id: category.id,
                category_name: category.name.to_string(),
                weekly_limit: category.weekly_limit,
                amount_spent,
                amount_remaining,
            }
        })
        .collect())
}

/// Sum `abs(amount)` for each category, starting every category at zero.
///
/// Amounts for categories not in `categories` are ignored.
fn sum_by_category(
    categories: &[Category],
    amounts: &[(CategoryId, Decimal)],
) -> HashMap<CategoryId, Decimal> {
    let mut totals: HashMap<CategoryId, Decimal> = categories
        .iter()
        .map(|category| (category.id, Decimal::ZERO))
        .collect();

    for (category_id, amount) in amounts {
        if let Some(total) = totals.get_mut(category_id) {
            *total += amount.abs();
        }
    }

    totals
}

/// The category and amount of each of the owner's categorised transactions in `window`.
fn get_categorised_amounts(
    user_id: UserId,
    window: Option<DateRange>,
    connection: &Connection,
) -> Result<Vec<(CategoryId, Decimal)>, Error> {
    let (start, end) = match window {
        Some(window) => (window.start, window.end),
        None => (Date::MIN, Date::MAX),
    };

    connection
        .prepare(
            "SELECT l.category_id, t.amount FROM \"transaction\" t
             INNER JOIN category_link l ON l.transaction_id = t.id
             WHERE t.user_id = :user_id AND t.date BETWEEN :start AND :end",
        )?
        .query_map(
            named_params! {":user_id": user_id.as_i64(), ":start": start, ":end": end},
            |row| Ok((row.get(0)?, read_amount(row, 1)?)),
        )?
        .map(|maybe_amount| maybe_amount.map_err(Error::SqlError))
        .collect()
}
