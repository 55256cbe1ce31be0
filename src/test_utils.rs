//! Shared test utilities.
//!
//! Provides an in-memory `SQLite` setup, an in-memory [`MemoryLedger`] with failure
//! injection for processor tests, controllable clocks, and template builders with
//! sensible defaults.

#![allow(clippy::unwrap_used)]

use crate::{
    core::{
        ledger::{Ledger, RecurringStore, TransactionStore},
        processor::Clock,
        schedule::Frequency,
        template::{NewTemplate, NewTransaction, RecurringTemplate, TemplateUpdate, TransactionKind},
    },
    entities::{recurring_transaction, transaction},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{DatabaseConnection, DbErr};
use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

/// Creates an in-memory `SQLite` database with all tables initialized.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Shorthand for a calendar date.
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// A stored template row.
///
/// # Defaults
/// * `amount`: 25.0
/// * `kind`: "expense"
/// * `category`: "Bills & Utilities"
/// * active, no cursor, no end date
pub fn template_row(
    id: i64,
    user_id: &str,
    start_date: NaiveDate,
    frequency: &str,
) -> recurring_transaction::Model {
    let now = Utc::now();
    recurring_transaction::Model {
        id,
        user_id: user_id.to_string(),
        amount: 25.0,
        kind: "expense".to_string(),
        category: "Bills & Utilities".to_string(),
        description: "Phone plan".to_string(),
        start_date,
        frequency: frequency.to_string(),
        end_date: None,
        is_active: true,
        last_processed_date: None,
        created_at: now,
        updated_at: now,
    }
}

/// A validated template built from [`template_row`] defaults.
pub fn sample_template(start_date: NaiveDate, frequency: Frequency) -> RecurringTemplate {
    RecurringTemplate::try_from(template_row(1, "test_user", start_date, frequency.as_str()))
        .unwrap()
}

/// Input for creating a monthly expense template of 25.0.
pub fn new_template(user_id: &str, start_date: NaiveDate) -> NewTemplate {
    NewTemplate {
        user_id: user_id.to_string(),
        amount: 25.0,
        kind: TransactionKind::Expense,
        category: "Bills & Utilities".to_string(),
        description: "Phone plan".to_string(),
        start_date,
        frequency: Frequency::Monthly,
        end_date: None,
    }
}

/// Clock pinned to one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Clock whose date tests can move; clones share the date.
#[derive(Debug, Clone)]
pub struct ManualClock(Arc<Mutex<NaiveDate>>);

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        Self(Arc::new(Mutex::new(today)))
    }

    pub fn set(&self, today: NaiveDate) {
        *self.0.lock().unwrap() = today;
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        *self.0.lock().unwrap()
    }
}

/// In-memory ledger using the default two-step `post_occurrence`.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    templates: Mutex<Vec<recurring_transaction::Model>>,
    transactions: Mutex<Vec<transaction::Model>>,
    failing_transactions: Mutex<HashSet<i64>>,
    failing_updates: Mutex<HashSet<i64>>,
    fail_listing: AtomicBool,
    include_inactive: AtomicBool,
    list_delay: Mutex<Option<Duration>>,
    list_calls: AtomicUsize,
}

impl MemoryLedger {
    pub fn insert(&self, row: recurring_transaction::Model) {
        self.templates.lock().unwrap().push(row);
    }

    pub fn template(&self, id: i64) -> Option<recurring_transaction::Model> {
        self.templates
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned()
    }

    pub fn transactions(&self) -> Vec<transaction::Model> {
        self.transactions.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Return inactive templates from listing too, as a stale read would.
    pub fn include_inactive_in_listing(&self) {
        self.include_inactive.store(true, Ordering::SeqCst);
    }

    pub fn fail_transactions_for(&self, template_id: i64) {
        self.failing_transactions.lock().unwrap().insert(template_id);
    }

    pub fn fail_updates_for(&self, template_id: i64) {
        self.failing_updates.lock().unwrap().insert(template_id);
    }

    pub fn delay_listing(&self, delay: Duration) {
        *self.list_delay.lock().unwrap() = Some(delay);
    }
}

fn unavailable(what: &str) -> Error {
    Error::Database(DbErr::Custom(format!("{what} unavailable")))
}

impl RecurringStore for MemoryLedger {
    async fn list_active_templates(
        &self,
        user_id: &str,
    ) -> Result<Vec<recurring_transaction::Model>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(unavailable("template listing"));
        }

        let include_inactive = self.include_inactive.load(Ordering::SeqCst);
        Ok(self
            .templates
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.user_id == user_id && (include_inactive || t.is_active))
            .cloned()
            .collect())
    }

    async fn update_template(&self, id: i64, update: TemplateUpdate) -> Result<()> {
        if self.failing_updates.lock().unwrap().contains(&id) {
            return Err(unavailable("template update"));
        }

        let mut templates = self.templates.lock().unwrap();
        let template = templates
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(Error::TemplateNotFound { id })?;

        if let Some(cursor) = update.last_processed_date {
            template.last_processed_date = Some(cursor);
        }
        if let Some(active) = update.active {
            template.is_active = active;
        }
        template.updated_at = Utc::now();
        Ok(())
    }
}

impl TransactionStore for MemoryLedger {
    async fn create_transaction(&self, user_id: &str, entry: NewTransaction) -> Result<i64> {
        if entry
            .recurring_id
            .is_some_and(|id| self.failing_transactions.lock().unwrap().contains(&id))
        {
            return Err(unavailable("transaction store"));
        }

        let mut transactions = self.transactions.lock().unwrap();
        let id = i64::try_from(transactions.len()).unwrap() + 1;
        transactions.push(transaction::Model {
            id,
            user_id: user_id.to_string(),
            amount: entry.amount,
            kind: entry.kind.as_str().to_string(),
            category: entry.category,
            description: entry.description,
            date: entry.date,
            recurring_id: entry.recurring_id,
            created_at: Utc::now(),
        });
        Ok(id)
    }
}

impl Ledger for MemoryLedger {}
