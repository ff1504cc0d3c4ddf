//! Creating the application's tables and probing which features the schema supports.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error,
    budget::create_budget_goal_table,
    category::{create_category_link_table, create_category_table},
    transaction::{create_transaction_table, get_column_names},
    user::create_user_table,
};

/// Create the application's tables if they do not exist yet.
///
/// Tables created by an older version are migrated in place by adding the missing
/// columns. All tables are created in a single exclusive transaction.
///
/// # Errors
/// Returns an error if a table cannot be created or migrated.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Must be set outside of a transaction to take effect.
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_category_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_category_link_table(&transaction)?;
    create_budget_goal_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// The optional features that the database schema can support.
///
/// Detected once at startup so request handlers do not need to inspect the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchemaCapabilities {
    /// The transaction table stores coarse frequency labels for legacy projections.
    pub legacy_frequency: bool,
    /// The transaction table stores structured recurrence rules.
    pub recurrence_rules: bool,
}

impl SchemaCapabilities {
    /// Inspect the columns of the transaction table.
    ///
    /// # Errors
    /// Returns an error if the table information cannot be queried.
    pub fn detect(connection: &Connection) -> Result<Self, Error> {
        let columns = get_column_names(connection, "transaction")?;
        let has_column = |name: &str| columns.iter().any(|column| column == name);

        Ok(Self {
            legacy_frequency: has_column("legacy_frequency"),
            recurrence_rules: has_column("frequency_type") && has_column("end_date"),
        })
    }
}

#[cfg(test)]
mod db_tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{
        db::{SchemaCapabilities, initialize},
        transaction::{Transaction, create_transaction, get_column_names, get_transaction},
        user::{UserId, create_user},
    };

    #[test]
    fn initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize(&conn).unwrap();
        initialize(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare(
                "SELECT name FROM sqlite_master
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            tables,
            ["budget_goal", "category", "category_link", "transaction", "user"]
        );
    }

    #[test]
    fn initialize_enables_foreign_keys() {
        let conn = Connection::open_in_memory().unwrap();

        initialize(&conn).unwrap();

        let enabled: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn detects_full_schema() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let capabilities = SchemaCapabilities::detect(&conn).unwrap();

        assert_eq!(
            capabilities,
            SchemaCapabilities {
                legacy_frequency: true,
                recurrence_rules: true,
            }
        );
    }

    #[test]
    fn detects_missing_columns() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE \"transaction\" (id INTEGER PRIMARY KEY, amount TEXT NOT NULL)",
            (),
        )
        .unwrap();

        let capabilities = SchemaCapabilities::detect(&conn).unwrap();

        assert_eq!(capabilities, SchemaCapabilities::default());
    }

    #[test]
    fn migrates_old_transaction_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE user (id INTEGER PRIMARY KEY, email TEXT UNIQUE NOT NULL);
             INSERT INTO user (id, email) VALUES (1, 'old@example.com');
             CREATE TABLE \"transaction\" (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                amount TEXT NOT NULL,
                date TEXT NOT NULL,
                description TEXT NOT NULL
             );
             INSERT INTO \"transaction\" (id, user_id, amount, date, description)
             VALUES (1, 1, '-12.34', '2024-05-01', 'Lunch');",
        )
        .unwrap();

        initialize(&conn).unwrap();

        let columns = get_column_names(&conn, "transaction").unwrap();
        assert!(columns.iter().any(|column| column == "legacy_frequency"));
        assert!(columns.iter().any(|column| column == "parent_transaction_id"));

        let old = get_transaction(UserId::new(1), 1, &conn).unwrap();
        assert_eq!(old.amount, dec!(-12.34));
        assert_eq!(old.date, date!(2024 - 05 - 01));
        assert_eq!(old.frequency, None);
        assert_eq!(old.legacy_frequency, None);

        // New rows can be added next to the migrated ones.
        let user = create_user("new@example.com", &conn).unwrap();
        create_transaction(
            Transaction::build(user.id, dec!(1), date!(2024 - 05 - 02), "New"),
            &conn,
        )
        .unwrap();
    }
}
