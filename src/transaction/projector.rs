//! Turns recurring transactions into the dated transactions they imply.
//!
//! There are two modes:
//! - [project_recurring] stores one transaction per future occurrence of a recurring base.
//! - [project_legacy] builds read-only projections from coarse labels on older rows.
//!   Nothing is stored and the results only live as long as the response they are sent in.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    CategoryId, Error, TransactionId,
    recurrence::{LegacyFrequency, expand, one_year_after},
    transaction::core::{DateRange, Transaction, insert_transaction},
};

/// The most occurrences that will be generated for a single recurring transaction.
pub const MATERIALIZE_OCCURRENCE_CAP: usize = 1000;

/// Store a transaction for each occurrence of the recurring base `base` after its own date.
///
/// Occurrences are generated up to and including `base.end_date`, or one calendar year
/// after the base date if it has no end date. Each instance copies the owner, amount,
/// description, category and source of the base and points back at it through
/// `parent_transaction_id`.
///
/// The instances are inserted in a single SQL transaction: if any insert fails, none of
/// the instances are kept. The base transaction itself is not touched.
///
/// Returns the IDs of the new instances in date order.
///
/// # Errors
/// This function will return a:
/// - [Error::NotRecurringBase] if `base` has no recurrence rule or was itself generated,
/// - [Error::InvalidEndDate] if the end date is not after the base date,
/// - or [Error::SqlError] if an insert failed.
pub fn project_recurring(
    base: &Transaction,
    connection: &Connection,
) -> Result<Vec<TransactionId>, Error> {
    let Some(rule) = base.frequency else {
        return Err(Error::NotRecurringBase(base.id));
    };

    if base.parent_transaction_id.is_some() {
        return Err(Error::NotRecurringBase(base.id));
    }

    let window_end = match base.end_date {
        Some(end_date) if end_date <= base.date => {
            return Err(Error::InvalidEndDate {
                anchor: base.date,
                end_date,
            });
        }
        Some(end_date) => end_date,
        None => one_year_after(base.date).unwrap_or(Date::MAX),
    };

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;
    let mut instance_ids = Vec::new();

    for date in expand(
        base.date,
        rule,
        base.date,
        window_end,
        MATERIALIZE_OCCURRENCE_CAP,
    ) {
        let instance = insert_transaction(
            Transaction::build(base.user_id, base.amount, date, &base.description)
                .category_id(base.category_id)
                .source(base.source)
                .parent_transaction_id(base.id),
            &transaction,
        )
        .inspect_err(|error| {
            tracing::error!(
                "Could not store occurrence on {date} of transaction {}, rolling back: {error}",
                base.id
            )
        })?;

        instance_ids.push(instance.id);
    }

    transaction.commit()?;

    if instance_ids.len() == MATERIALIZE_OCCURRENCE_CAP {
        tracing::warn!(
            "Stopped generating occurrences of transaction {} at {MATERIALIZE_OCCURRENCE_CAP}",
            base.id
        );
    }

    tracing::debug!(
        "Generated {} occurrences of transaction {} up to {window_end}",
        instance_ids.len(),
        base.id
    );

    Ok(instance_ids)
}

/// A read-only occurrence of a transaction with a legacy frequency label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedTransaction {
    /// The base ID and date joined by a dash, e.g. "42-2025-03-01".
    pub id: String,
    /// The ID of the stored transaction this was projected from.
    pub parent_transaction_id: TransactionId,
    /// The date of this occurrence.
    pub date: Date,
    /// The amount copied from the base transaction.
    pub amount: Decimal,
    /// The description copied from the base transaction.
    pub description: String,
    /// The category copied from the base transaction.
    pub category_id: Option<CategoryId>,
    /// The label the occurrence was computed from.
    pub legacy_frequency: String,
}

/// The result of [project_legacy].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyProjection {
    /// The projected occurrences, grouped by base transaction and in date order within
    /// each group.
    pub transactions: Vec<ProjectedTransaction>,
    /// Set when at least one base had a label that could not be projected, so the list
    /// may be missing occurrences.
    pub truncated: bool,
}

/// Project the occurrences inside `range` of every base in `bases` that has a legacy
/// frequency label.
///
/// Unlike [project_recurring], the base date itself is included when it falls inside
/// `range`. Bases with an unrecognised label contribute only their own date and mark the
/// projection as truncated. At most [MATERIALIZE_OCCURRENCE_CAP] occurrences are
/// projected per base.
pub fn project_legacy(bases: &[Transaction], range: DateRange) -> LegacyProjection {
    let mut projection = LegacyProjection::default();

    for base in bases {
        let Some(label) = &base.legacy_frequency else {
            continue;
        };

        let project = |date: Date| ProjectedTransaction {
            id: format!("{}-{date}", base.id),
            parent_transaction_id: base.id,
            date,
            amount: base.amount,
            description: base.description.clone(),
            category_id: base.category_id,
            legacy_frequency: label.clone(),
        };

        let frequency = match label.parse::<LegacyFrequency>() {
            Ok(frequency) => frequency,
            Err(error) => {
                tracing::warn!("Stopped projecting transaction {}: {error}", base.id);

                if range.contains(base.date) {
                    projection.transactions.push(project(base.date));
                }

                projection.truncated = true;
                continue;
            }
        };

        let mut projected = 0;

        for n in 0.. {
            if projected == MATERIALIZE_OCCURRENCE_CAP {
                break;
            }

            let Some(date) = frequency.nth_occurrence(base.date, n) else {
                break;
            };

            if date > range.end {
                break;
            }

            if date >= range.start {
                projection.transactions.push(project(date));
                projected += 1;
            }
        }
    }

    projection
}
