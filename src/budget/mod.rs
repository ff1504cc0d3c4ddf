//! Budget goals and the spending totals they are compared against.

mod aggregation;
mod defaults;
mod endpoints;
mod goals;

pub use aggregation::{WeeklyBudgetStatus, category_totals, weekly_budget_status};
pub use defaults::{DEFAULT_CATEGORY_GOALS, ensure_default_budget_goals};
pub use endpoints::{
    BudgetState, category_totals_endpoint, create_budget_goal_endpoint,
    delete_budget_goal_endpoint, initialize_default_goals_endpoint, list_budget_goals_endpoint,
    update_budget_goal_endpoint, weekly_budget_endpoint,
};
pub use goals::{
    BudgetGoal, BudgetGoalUpdate, GoalType, NewBudgetGoal, TimePeriod, create_budget_goal,
    create_budget_goal_table, deactivate_budget_goal, get_active_budget_goals, get_budget_goal,
    update_budget_goal,
};
