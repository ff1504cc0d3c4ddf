//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    Error,
    db::{SchemaCapabilities, initialize},
    timezone::get_local_offset,
};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,

    /// Whether coarse frequency labels are projected when listing transactions.
    ///
    /// Only true when requested in the config and supported by the database schema.
    pub legacy_projections: bool,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models
    /// and then check once which optional features the schema supports.
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "Pacific/Auckland".
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized or `local_timezone` is not a
    /// known timezone.
    pub fn new(
        db_connection: Connection,
        local_timezone: &str,
        legacy_projections: bool,
    ) -> Result<Self, Error> {
        if get_local_offset(local_timezone).is_none() {
            return Err(Error::InvalidTimezoneError(local_timezone.to_owned()));
        }

        initialize(&db_connection)?;
        let capabilities = SchemaCapabilities::detect(&db_connection)?;

        if legacy_projections && !capabilities.legacy_frequency {
            tracing::warn!(
                "Legacy projections were requested but the transaction table has no legacy_frequency column, disabling them"
            );
        }

        let legacy_projections = legacy_projections && capabilities.legacy_frequency;
        tracing::info!("Legacy projections enabled: {legacy_projections}");

        Ok(Self {
            local_timezone: local_timezone.to_owned(),
            legacy_projections,
            db_connection: Arc::new(Mutex::new(db_connection)),
        })
    }
}
