//! Storage helpers for money amounts.
//!
//! Amounts are [Decimal]s in memory and canonical decimal strings in SQLite, so that
//! no precision is lost to floating point columns.

use std::str::FromStr;

use rusqlite::{Row, types::Type};
use rust_decimal::Decimal;

/// Read a decimal amount stored as text from column `index` of `row`.
pub(crate) fn read_amount(row: &Row, index: usize) -> Result<Decimal, rusqlite::Error> {
    let raw: String = row.get(index)?;

    Decimal::from_str(&raw).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
    })
}

/// Read a nullable decimal amount stored as text from column `index` of `row`.
pub(crate) fn read_optional_amount(
    row: &Row,
    index: usize,
) -> Result<Option<Decimal>, rusqlite::Error> {
    let raw: Option<String> = row.get(index)?;

    raw.map(|raw| {
        Decimal::from_str(&raw).map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
        })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;

    use super::{read_amount, read_optional_amount};

    #[test]
    fn amounts_keep_their_precision() {
        let connection = Connection::open_in_memory().unwrap();

        let amount = connection
            .query_row("SELECT '-1234.5678'", [], |row| read_amount(row, 0))
            .unwrap();

        assert_eq!(amount, dec!(-1234.5678));
    }

    #[test]
    fn null_amounts_are_none() {
        let connection = Connection::open_in_memory().unwrap();

        let amount = connection
            .query_row("SELECT NULL", [], |row| read_optional_amount(row, 0))
            .unwrap();

        assert_eq!(amount, None);
    }

    #[test]
    fn malformed_amounts_are_conversion_errors() {
        let connection = Connection::open_in_memory().unwrap();

        let result = connection.query_row("SELECT 'twelve'", [], |row| read_amount(row, 0));

        assert!(matches!(
            result,
            Err(rusqlite::Error::FromSqlConversionFailure(0, _, _))
        ));
    }
}
