//! Application router configuration.

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::{
    AppState, Error,
    budget::{
        category_totals_endpoint, create_budget_goal_endpoint, delete_budget_goal_endpoint,
        initialize_default_goals_endpoint, list_budget_goals_endpoint,
        update_budget_goal_endpoint, weekly_budget_endpoint,
    },
    category::{
        create_category_endpoint, delete_category_endpoint, list_categories_endpoint,
        update_category_endpoint,
    },
    endpoints,
    logging::logging_middleware,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, get_transaction_endpoint,
        list_transactions_endpoint, update_transaction_endpoint,
    },
    user::{create_user_endpoint, get_user_endpoint},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let user_routes = Router::new()
        .route(endpoints::USERS, post(create_user_endpoint))
        .route(endpoints::USER, get(get_user_endpoint));

    let transaction_routes = Router::new()
        .route(
            endpoints::TRANSACTIONS,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint)
                .put(update_transaction_endpoint)
                .delete(delete_transaction_endpoint),
        );

    let category_routes = Router::new()
        .route(
            endpoints::CATEGORIES,
            get(list_categories_endpoint).post(create_category_endpoint),
        )
        .route(
            endpoints::CATEGORY,
            put(update_category_endpoint).delete(delete_category_endpoint),
        );

    let budget_routes = Router::new()
        .route(
            endpoints::BUDGET_GOALS,
            get(list_budget_goals_endpoint).post(create_budget_goal_endpoint),
        )
        .route(
            endpoints::BUDGET_GOAL,
            put(update_budget_goal_endpoint).delete(delete_budget_goal_endpoint),
        )
        .route(
            endpoints::DEFAULT_BUDGET_GOALS,
            post(initialize_default_goals_endpoint),
        )
        .route(endpoints::CATEGORY_TOTALS, get(category_totals_endpoint))
        .route(endpoints::WEEKLY_BUDGET, get(weekly_budget_endpoint));

    user_routes
        .merge(transaction_routes)
        .merge(category_routes)
        .merge(budget_routes)
        .fallback(get_404_not_found)
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

async fn get_404_not_found() -> Error {
    Error::NotFound
}
