//! Transaction persistence - writing and reading concrete ledger entries.
//!
//! Amounts are stored positive with the direction in `kind`. Transactions generated by
//! the recurring processor are dated on the occurrence and keep the id of the template
//! that produced them.

use crate::{
    core::template::NewTransaction,
    entities::{Transaction, transaction},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Inserts a transaction for `user_id`.
///
/// Rejects zero, negative, NaN and infinite amounts before touching the database.
pub async fn create_transaction<C>(
    db: &C,
    user_id: &str,
    entry: NewTransaction,
) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    if !entry.amount.is_finite() || entry.amount <= 0.0 {
        return Err(Error::InvalidAmount {
            amount: entry.amount,
        });
    }

    let model = transaction::ActiveModel {
        user_id: Set(user_id.to_string()),
        amount: Set(entry.amount),
        kind: Set(entry.kind.as_str().to_string()),
        category: Set(entry.category),
        description: Set(entry.description),
        date: Set(entry.date),
        recurring_id: Set(entry.recurring_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    model.insert(db).await.map_err(Into::into)
}

/// Retrieves all of a user's transactions, newest date first.
pub async fn get_transactions_for_user<C>(db: &C, user_id: &str) -> Result<Vec<transaction::Model>>
where
    C: ConnectionTrait,
{
    Transaction::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .order_by_desc(transaction::Column::Date)
        .order_by_desc(transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the transactions generated by one template, oldest occurrence first.
pub async fn get_transactions_for_template<C>(
    db: &C,
    recurring_id: i64,
) -> Result<Vec<transaction::Model>>
where
    C: ConnectionTrait,
{
    Transaction::find()
        .filter(transaction::Column::RecurringId.eq(recurring_id))
        .order_by_asc(transaction::Column::Date)
        .all(db)
        .await
        .map_err(Into::into)
}
