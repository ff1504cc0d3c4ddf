//! Transaction management for the budgeting application.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Database functions for storing, querying, and managing transactions
//! - The projector that expands recurring transactions into their occurrences
//! - Route handlers for the transaction API

mod core;
mod endpoints;
mod projector;

pub use core::{
    DateRange, Transaction, TransactionBuilder, TransactionSource, TransactionUpdate,
    create_transaction, create_transaction_table, delete_transaction, get_column_names,
    get_instances, get_transaction, query_legacy_bases, query_transactions, update_transaction,
};
pub use endpoints::{
    TransactionState, create_transaction_endpoint, delete_transaction_endpoint,
    get_transaction_endpoint, list_transactions_endpoint, update_transaction_endpoint,
};
pub use projector::{
    LegacyProjection, MATERIALIZE_OCCURRENCE_CAP, ProjectedTransaction, project_legacy,
    project_recurring,
};
