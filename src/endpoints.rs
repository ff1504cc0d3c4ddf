//! The API endpoints URIs.
//!
//! Every resource belongs to a user, so most routes start with [USER].
//! For endpoints that take a parameter, e.g., '/api/users/{user_id}', use [format_endpoint].

/// The route for creating users.
pub const USERS: &str = "/api/users";
/// The route to access a single user.
pub const USER: &str = "/api/users/{user_id}";
/// The route to list and create a user's transactions.
pub const TRANSACTIONS: &str = "/api/users/{user_id}/transactions";
/// The route to access a single transaction.
pub const TRANSACTION: &str = "/api/users/{user_id}/transactions/{transaction_id}";
/// The route to list and create a user's categories.
pub const CATEGORIES: &str = "/api/users/{user_id}/categories";
/// The route to access a single category.
pub const CATEGORY: &str = "/api/users/{user_id}/categories/{category_id}";
/// The route to list and create a user's budget goals.
pub const BUDGET_GOALS: &str = "/api/users/{user_id}/budget_goals";
/// The route to access a single budget goal.
pub const BUDGET_GOAL: &str = "/api/users/{user_id}/budget_goals/{goal_id}";
/// The route to give a user the default category goals.
pub const DEFAULT_BUDGET_GOALS: &str = "/api/users/{user_id}/budget_goals/defaults";
/// The route for the total spent per category, i.e. the data for a pie chart.
pub const CATEGORY_TOTALS: &str = "/api/users/{user_id}/category_totals";
/// The route for spending in the last week compared to each category's weekly limit.
pub const WEEKLY_BUDGET: &str = "/api/users/{user_id}/weekly_budget";

/// Replace the first parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// Any parameters after the first are left as is, so paths with more than one
/// parameter can be formatted by calling this function repeatedly.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
