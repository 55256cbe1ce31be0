//! Domain types for recurring templates and the transactions they generate.
//!
//! Rows read from storage are validated into a [`RecurringTemplate`] before the
//! processor touches them; a row that cannot be interpreted is rejected with
//! [`Error::MalformedTemplate`] so that a single bad record never blocks the rest.

use crate::{
    core::schedule::{self, Frequency},
    entities::recurring_transaction,
    errors::{Error, Result},
};
use chrono::NaiveDate;
use std::{fmt, str::FromStr};

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    /// Money coming in
    Income,
    /// Money going out
    Expense,
}

impl TransactionKind {
    /// Stored string form of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(format!("unknown transaction kind '{other}'")),
        }
    }
}

/// A validated recurring template.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringTemplate {
    /// Template identifier
    pub id: i64,
    /// Owner of the template
    pub user_id: String,
    /// Positive amount posted per occurrence
    pub amount: f64,
    /// Income or expense
    pub kind: TransactionKind,
    /// Category copied onto each occurrence
    pub category: String,
    /// Description copied onto each occurrence
    pub description: String,
    /// Schedule anchor
    pub start_date: NaiveDate,
    /// Step between occurrences
    pub frequency: Frequency,
    /// Inclusive last day an occurrence may fall on
    pub end_date: Option<NaiveDate>,
    /// Whether the template still generates occurrences
    pub active: bool,
    /// Newest occurrence already posted
    pub last_processed_date: Option<NaiveDate>,
}

impl RecurringTemplate {
    /// The next occurrence after the template's cursor.
    ///
    /// # Errors
    /// Returns [`Error::DateOutOfRange`] if stepping overflows.
    pub fn next_occurrence(&self) -> Result<NaiveDate> {
        schedule::next_occurrence(self.start_date, self.frequency, self.last_processed_date)
    }

    /// Builds the ledger entry for the occurrence on `date`.
    #[must_use]
    pub fn occurrence(&self, date: NaiveDate) -> NewTransaction {
        NewTransaction {
            amount: self.amount,
            kind: self.kind,
            category: self.category.clone(),
            description: self.description.clone(),
            date,
            recurring_id: Some(self.id),
        }
    }
}

impl TryFrom<recurring_transaction::Model> for RecurringTemplate {
    type Error = Error;

    fn try_from(model: recurring_transaction::Model) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedTemplate {
            id: model.id,
            reason,
        };

        let frequency = model.frequency.parse::<Frequency>().map_err(malformed)?;
        let kind = model.kind.parse::<TransactionKind>().map_err(malformed)?;

        if !model.amount.is_finite() || model.amount <= 0.0 {
            return Err(malformed(format!(
                "amount must be a positive number, got {}",
                model.amount
            )));
        }

        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            amount: model.amount,
            kind,
            category: model.category,
            description: model.description,
            start_date: model.start_date,
            frequency,
            end_date: model.end_date,
            active: model.is_active,
            last_processed_date: model.last_processed_date,
        })
    }
}

/// A concrete transaction waiting to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// Positive amount
    pub amount: f64,
    /// Income or expense
    pub kind: TransactionKind,
    /// Category
    pub category: String,
    /// Description
    pub description: String,
    /// Occurrence date
    pub date: NaiveDate,
    /// Template that produced it
    pub recurring_id: Option<i64>,
}

/// Partial update of a template. Fields left as `None` are not written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemplateUpdate {
    /// New cursor
    pub last_processed_date: Option<NaiveDate>,
    /// New active flag
    pub active: Option<bool>,
}

impl TemplateUpdate {
    /// Update that only moves the cursor.
    #[must_use]
    pub const fn advance(to: NaiveDate) -> Self {
        Self {
            last_processed_date: Some(to),
            active: None,
        }
    }

    /// Update that only flips the active flag.
    #[must_use]
    pub const fn set_active(active: bool) -> Self {
        Self {
            last_processed_date: None,
            active: Some(active),
        }
    }

    /// Whether the update carries no change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.last_processed_date.is_none() && self.active.is_none()
    }
}

/// Input for creating a template.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTemplate {
    /// Owner
    pub user_id: String,
    /// Positive amount
    pub amount: f64,
    /// Income or expense
    pub kind: TransactionKind,
    /// Category
    pub category: String,
    /// Description
    pub description: String,
    /// Schedule anchor
    pub start_date: NaiveDate,
    /// Step between occurrences
    pub frequency: Frequency,
    /// Optional inclusive end
    pub end_date: Option<NaiveDate>,
}

impl NewTemplate {
    /// Checks the amount and the date range.
    ///
    /// # Errors
    /// [`Error::InvalidAmount`] for a non-positive or non-finite amount,
    /// [`Error::InvalidDateRange`] when the end date precedes the start date.
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(Error::InvalidAmount {
                amount: self.amount,
            });
        }

        if let Some(end) = self.end_date.filter(|end| *end < self.start_date) {
            return Err(Error::InvalidDateRange {
                start: self.start_date,
                end,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{date, template_row};

    #[test]
    fn test_try_from_valid_row() {
        let row = template_row(7, "alice", date(2024, 1, 1), "monthly");
        let template = RecurringTemplate::try_from(row).unwrap();

        assert_eq!(template.id, 7);
        assert_eq!(template.frequency, Frequency::Monthly);
        assert_eq!(template.kind, TransactionKind::Expense);
        assert!(template.active);
        assert_eq!(template.next_occurrence().unwrap(), date(2024, 2, 1));
    }

    #[test]
    fn test_try_from_rejects_unknown_frequency() {
        let row = template_row(3, "alice", date(2024, 1, 1), "fortnightly");
        let err = RecurringTemplate::try_from(row).unwrap_err();
        assert!(matches!(err, Error::MalformedTemplate { id: 3, .. }));
    }

    #[test]
    fn test_try_from_rejects_unknown_kind() {
        let mut row = template_row(4, "alice", date(2024, 1, 1), "weekly");
        row.kind = "transfer".to_string();
        let err = RecurringTemplate::try_from(row).unwrap_err();
        assert!(matches!(err, Error::MalformedTemplate { id: 4, .. }));
    }

    #[test]
    fn test_try_from_rejects_bad_amount() {
        for amount in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let mut row = template_row(5, "alice", date(2024, 1, 1), "weekly");
            row.amount = amount;
            assert!(RecurringTemplate::try_from(row).is_err());
        }
    }

    #[test]
    fn test_occurrence_copies_template_fields() {
        let template =
            RecurringTemplate::try_from(template_row(9, "bob", date(2024, 1, 1), "weekly"))
                .unwrap();
        let entry = template.occurrence(date(2024, 1, 8));

        assert_eq!(entry.amount, template.amount);
        assert_eq!(entry.kind, template.kind);
        assert_eq!(entry.category, template.category);
        assert_eq!(entry.description, template.description);
        assert_eq!(entry.date, date(2024, 1, 8));
        assert_eq!(entry.recurring_id, Some(9));
    }

    #[test]
    fn test_new_template_validation() {
        let mut input = NewTemplate {
            user_id: "alice".to_string(),
            amount: 12.5,
            kind: TransactionKind::Income,
            category: "Salary".to_string(),
            description: "Paycheck".to_string(),
            start_date: date(2024, 1, 1),
            frequency: Frequency::Monthly,
            end_date: Some(date(2024, 12, 31)),
        };
        assert!(input.validate().is_ok());

        input.end_date = Some(date(2023, 12, 31));
        assert!(matches!(
            input.validate(),
            Err(Error::InvalidDateRange { .. })
        ));

        input.end_date = None;
        input.amount = -1.0;
        assert!(matches!(
            input.validate(),
            Err(Error::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_template_update_constructors() {
        assert!(TemplateUpdate::default().is_empty());
        assert_eq!(
            TemplateUpdate::advance(date(2024, 2, 1)).last_processed_date,
            Some(date(2024, 2, 1))
        );
        assert_eq!(TemplateUpdate::set_active(false).active, Some(false));
    }
}
