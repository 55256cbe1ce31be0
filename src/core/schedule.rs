//! Occurrence stepping and the due-check predicate.
//!
//! All date arithmetic for recurring templates goes through [`next_occurrence`].
//! Monthly and yearly steps use chrono's calendar-month addition, which clamps to the
//! last valid day of the target month: Jan 31 + 1 month is Feb 29 in a leap year and
//! Feb 28 otherwise, and Feb 29 + 1 year is Feb 28. Because the base point is the
//! cursor, a clamped day carries forward (Jan 31, Feb 29, Mar 29, ...).

use crate::{
    core::template::RecurringTemplate,
    errors::{Error, Result},
};
use chrono::{Days, Months, NaiveDate};
use std::{fmt, str::FromStr};

/// Step between two occurrences of a recurring template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    /// Every 7 calendar days
    Weekly,
    /// Every calendar month
    Monthly,
    /// Every calendar year
    Yearly,
}

impl Frequency {
    /// Stored string form of the frequency.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Advances `date` by exactly one period, or `None` past chrono's range.
    #[must_use]
    pub fn step(self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Weekly => date.checked_add_days(Days::new(7)),
            Self::Monthly => date.checked_add_months(Months::new(1)),
            Self::Yearly => date.checked_add_months(Months::new(12)),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(format!("unknown frequency '{other}'")),
        }
    }
}

/// Computes the occurrence following the cursor.
///
/// The base point is `last_processed_date` when present, otherwise `start_date`; the
/// result is the base point advanced by one period. With no cursor the first occurrence
/// is therefore one period after the start date, never the start date itself.
///
/// # Errors
/// Returns [`Error::DateOutOfRange`] if the step leaves chrono's representable range.
pub fn next_occurrence(
    start_date: NaiveDate,
    frequency: Frequency,
    last_processed_date: Option<NaiveDate>,
) -> Result<NaiveDate> {
    let base = last_processed_date.unwrap_or(start_date);
    frequency
        .step(base)
        .ok_or(Error::DateOutOfRange { date: base, frequency })
}

/// Whether the template has an occurrence due on or before `today`.
///
/// Inactive templates and templates whose end date has already passed are never due.
///
/// # Errors
/// Propagates [`Error::DateOutOfRange`] from [`next_occurrence`].
pub fn is_due(template: &RecurringTemplate, today: NaiveDate) -> Result<bool> {
    if !template.active {
        return Ok(false);
    }

    if template.end_date.is_some_and(|end| today > end) {
        return Ok(false);
    }

    let candidate = next_occurrence(
        template.start_date,
        template.frequency,
        template.last_processed_date,
    )?;

    Ok(today >= candidate)
}
