//! Storage seams used by the recurring processor.
//!
//! The processor never talks to the database directly. It reads templates through
//! [`RecurringStore`], writes transactions through [`TransactionStore`], and posts each
//! occurrence through [`Ledger::post_occurrence`]. The default posting runs the two
//! writes back to back; [`SeaOrmLedger`] overrides it to run both inside one database
//! transaction so an occurrence is either fully recorded or not at all.

use crate::{
    core::{
        recurring,
        template::{NewTransaction, TemplateUpdate},
        transaction,
    },
    entities::recurring_transaction,
    errors::{Error, Result},
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use std::future::Future;

/// Read and partially update recurring templates.
pub trait RecurringStore: Send + Sync {
    /// Active templates owned by `user_id`.
    fn list_active_templates(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<recurring_transaction::Model>>> + Send;

    /// Writes only the fields present in `update`.
    fn update_template(
        &self,
        id: i64,
        update: TemplateUpdate,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Create ledger entries.
pub trait TransactionStore: Send + Sync {
    /// Persists `entry` for `user_id` and returns the new transaction id.
    fn create_transaction(
        &self,
        user_id: &str,
        entry: NewTransaction,
    ) -> impl Future<Output = Result<i64>> + Send;
}

/// Why posting an occurrence failed.
#[derive(Debug)]
pub enum PostFailure {
    /// Nothing was written; the occurrence will be retried on the next run.
    NotRecorded(Error),
    /// The transaction exists but the cursor did not move, so the next run will
    /// generate the same occurrence again.
    CursorNotAdvanced {
        /// Id of the transaction that was written
        transaction_id: i64,
        /// Error from the cursor update
        source: Error,
    },
}

/// Both stores plus the write that records one occurrence.
pub trait Ledger: RecurringStore + TransactionStore {
    /// Creates the occurrence's transaction, then applies `update` to the template.
    fn post_occurrence(
        &self,
        user_id: &str,
        template_id: i64,
        entry: NewTransaction,
        update: TemplateUpdate,
    ) -> impl Future<Output = std::result::Result<i64, PostFailure>> + Send {
        async move {
            let transaction_id = self
                .create_transaction(user_id, entry)
                .await
                .map_err(PostFailure::NotRecorded)?;

            self.update_template(template_id, update)
                .await
                .map_err(|source| PostFailure::CursorNotAdvanced {
                    transaction_id,
                    source,
                })?;

            Ok(transaction_id)
        }
    }
}

/// [`Ledger`] backed by the `SeaORM` connection.
#[derive(Debug, Clone)]
pub struct SeaOrmLedger {
    db: DatabaseConnection,
}

impl SeaOrmLedger {
    /// Wraps an open connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl RecurringStore for SeaOrmLedger {
    async fn list_active_templates(
        &self,
        user_id: &str,
    ) -> Result<Vec<recurring_transaction::Model>> {
        recurring::list_active_templates(&self.db, user_id).await
    }

    async fn update_template(&self, id: i64, update: TemplateUpdate) -> Result<()> {
        recurring::update_template(&self.db, id, update).await
    }
}

impl TransactionStore for SeaOrmLedger {
    async fn create_transaction(&self, user_id: &str, entry: NewTransaction) -> Result<i64> {
        transaction::create_transaction(&self.db, user_id, entry)
            .await
            .map(|model| model.id)
    }
}

impl Ledger for SeaOrmLedger {
    async fn post_occurrence(
        &self,
        user_id: &str,
        template_id: i64,
        entry: NewTransaction,
        update: TemplateUpdate,
    ) -> std::result::Result<i64, PostFailure> {
        // Dropping `txn` without commit rolls both writes back
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| PostFailure::NotRecorded(e.into()))?;

        let created = transaction::create_transaction(&txn, user_id, entry)
            .await
            .map_err(PostFailure::NotRecorded)?;

        recurring::update_template(&txn, template_id, update)
            .await
            .map_err(PostFailure::NotRecorded)?;

        txn.commit()
            .await
            .map_err(|e| PostFailure::NotRecorded(e.into()))?;

        Ok(created.id)
    }
}
