//! Database operations for categories and the links between transactions and categories.

use rusqlite::{Connection, Row, named_params, params};
use rust_decimal::Decimal;

use crate::{
    CategoryId, Error, TransactionId, UserId,
    category::domain::{Category, CategoryName, HexColor, NewCategory},
    money::read_optional_amount,
};

/// Create a category for `user_id` and return it with its generated ID.
///
/// If `new_category.color` is `None`, the default color for the name is used.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateCategoryName] if the owner already has a category with the same name,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_category(
    user_id: UserId,
    new_category: NewCategory,
    connection: &Connection,
) -> Result<Category, Error> {
    let color = new_category
        .color
        .unwrap_or_else(|| HexColor::default_for(&new_category.name));

    connection
        .execute(
            "INSERT INTO category (user_id, name, color, weekly_limit) VALUES (?1, ?2, ?3, ?4)",
            params![
                user_id.as_i64(),
                new_category.name.as_ref(),
                color.as_ref(),
                new_category.weekly_limit.map(|limit| limit.to_string()),
            ],
        )
        .map_err(|error| map_unique_name_error(error, &new_category.name))?;

    let id = connection.last_insert_rowid();

    Ok(Category {
        id,
        user_id,
        name: new_category.name,
        color,
        weekly_limit: new_category.weekly_limit,
    })
}

/// Retrieve one of `user_id`'s categories by ID.
///
/// # Errors
/// Returns [Error::NotFound] if the category does not exist or belongs to another user.
pub fn get_category(
    user_id: UserId,
    category_id: CategoryId,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, color, weekly_limit FROM category
             WHERE id = :id AND user_id = :user_id;",
        )?
        .query_row(
            &[(":id", &category_id), (":user_id", &user_id.as_i64())],
            map_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve all of `user_id`'s categories ordered alphabetically by name.
pub fn get_categories(user_id: UserId, connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, color, weekly_limit FROM category
             WHERE user_id = :user_id ORDER BY name ASC;",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Find `user_id`'s category called `name`, creating it with the default color if it
/// does not exist yet.
pub fn get_or_create_category(
    user_id: UserId,
    name: &CategoryName,
    connection: &Connection,
) -> Result<Category, Error> {
    let existing = connection
        .prepare(
            "SELECT id, user_id, name, color, weekly_limit FROM category
             WHERE user_id = :user_id AND name = :name;",
        )?
        .query_row(
            named_params! {":user_id": user_id.as_i64(), ":name": name.as_ref()},
            map_row,
        );

    match existing {
        Ok(category) => Ok(category),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            let category = create_category(user_id, NewCategory::named(name.clone()), connection)?;
            tracing::info!(
                "Created category \"{}\" for user {user_id} with color {}",
                category.name,
                category.color.as_ref()
            );
            Ok(category)
        }
        Err(error) => Err(error.into()),
    }
}

/// Replace the name, color and weekly limit of one of `user_id`'s categories.
///
/// If `color` is `None`, the default color for the new name is used.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingCategory] if the category does not exist,
/// - [Error::DuplicateCategoryName] if another of the owner's categories has the new name,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_category(
    user_id: UserId,
    category_id: CategoryId,
    update: NewCategory,
    connection: &Connection,
) -> Result<Category, Error> {
    let color = update
        .color
        .unwrap_or_else(|| HexColor::default_for(&update.name));

    let rows_affected = connection
        .execute(
            "UPDATE category SET name = ?1, color = ?2, weekly_limit = ?3
             WHERE id = ?4 AND user_id = ?5",
            params![
                update.name.as_ref(),
                color.as_ref(),
                update.weekly_limit.map(|limit| limit.to_string()),
                category_id,
                user_id.as_i64(),
            ],
        )
        .map_err(|error| map_unique_name_error(error, &update.name))?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingCategory);
    }

    Ok(Category {
        id: category_id,
        user_id,
        name: update.name,
        color,
        weekly_limit: update.weekly_limit,
    })
}

/// Delete one of `user_id`'s categories.
///
/// Transactions in the category become uncategorised.
///
/// # Errors
/// Returns [Error::DeleteMissingCategory] if the category does not exist.
pub fn delete_category(
    user_id: UserId,
    category_id: CategoryId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM category WHERE id = ?1 AND user_id = ?2",
        (category_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCategory);
    }

    Ok(())
}

/// Link a transaction to a category, replacing any category it was linked to before.
///
/// # Errors
/// Returns [Error::InvalidCategory] if the category or transaction does not exist.
pub fn insert_category_link(
    transaction_id: TransactionId,
    category_id: CategoryId,
    connection: &Connection,
) -> Result<(), Error> {
    connection
        .execute(
            "INSERT INTO category_link (transaction_id, category_id) VALUES (?1, ?2)
             ON CONFLICT(transaction_id) DO UPDATE SET category_id = excluded.category_id",
            (transaction_id, category_id),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidCategory(Some(category_id)),
            error => error.into(),
        })?;

    Ok(())
}

/// Remove the category link of a transaction, if it has one.
pub fn delete_category_link(
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "DELETE FROM category_link WHERE transaction_id = ?1",
        [transaction_id],
    )?;

    Ok(())
}

/// Initialize the category table and indexes.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            color TEXT NOT NULL,
            weekly_limit TEXT,
            UNIQUE(user_id, name),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_category_user ON category(user_id);",
    )?;

    Ok(())
}

/// Initialize the table linking transactions to categories.
///
/// Must run after the transaction table has been created.
pub fn create_category_link_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category_link (
            id INTEGER PRIMARY KEY,
            transaction_id INTEGER NOT NULL UNIQUE,
            category_id INTEGER NOT NULL,
            FOREIGN KEY(transaction_id) REFERENCES \"transaction\"(id) ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_category_link_category ON category_link(category_id);",
    )?;

    Ok(())
}

fn map_unique_name_error(error: rusqlite::Error, name: &CategoryName) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            _,
        ) => Error::DuplicateCategoryName(name.to_string()),
        error => error.into(),
    }
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserId::new(row.get(1)?);
    let name = CategoryName::new_unchecked(&row.get::<_, String>(2)?);
    let raw_color: String = row.get(3)?;
    let color = HexColor::new(&raw_color).unwrap_or_else(|_| HexColor::default_for(&name));
    let weekly_limit: Option<Decimal> = read_optional_amount(row, 4)?;

    Ok(Category {
        id,
        user_id,
        name,
        color,
        weekly_limit,
    })
}
