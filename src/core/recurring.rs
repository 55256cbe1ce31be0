//! Recurring template persistence - create, read, update and delete templates.
//!
//! These functions are generic over [`ConnectionTrait`] so they run the same way on a
//! plain connection or inside a database transaction. The processor reaches them through
//! [`crate::core::ledger::SeaOrmLedger`]; the bot commands call them directly.

use crate::{
    core::template::{NewTemplate, TemplateUpdate},
    entities::{RecurringTransaction, recurring_transaction},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, Unchanged, prelude::*};

/// Validates and inserts a new, active template with no cursor.
pub async fn create_template<C>(db: &C, input: NewTemplate) -> Result<recurring_transaction::Model>
where
    C: ConnectionTrait,
{
    input.validate()?;

    let now = Utc::now();
    let model = recurring_transaction::ActiveModel {
        user_id: Set(input.user_id),
        amount: Set(input.amount),
        kind: Set(input.kind.as_str().to_string()),
        category: Set(input.category),
        description: Set(input.description),
        start_date: Set(input.start_date),
        frequency: Set(input.frequency.as_str().to_string()),
        end_date: Set(input.end_date),
        is_active: Set(true),
        last_processed_date: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    model.insert(db).await.map_err(Into::into)
}

/// Retrieves a template by id, returning None if it doesn't exist.
pub async fn get_template_by_id<C>(db: &C, id: i64) -> Result<Option<recurring_transaction::Model>>
where
    C: ConnectionTrait,
{
    RecurringTransaction::find_by_id(id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists every template owned by the user, newest start date first.
pub async fn list_templates_for_user<C>(
    db: &C,
    user_id: &str,
) -> Result<Vec<recurring_transaction::Model>>
where
    C: ConnectionTrait,
{
    RecurringTransaction::find()
        .filter(recurring_transaction::Column::UserId.eq(user_id))
        .order_by_desc(recurring_transaction::Column::StartDate)
        .order_by_desc(recurring_transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists the user's active templates in id order.
pub async fn list_active_templates<C>(
    db: &C,
    user_id: &str,
) -> Result<Vec<recurring_transaction::Model>>
where
    C: ConnectionTrait,
{
    RecurringTransaction::find()
        .filter(recurring_transaction::Column::UserId.eq(user_id))
        .filter(recurring_transaction::Column::IsActive.eq(true))
        .order_by_asc(recurring_transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Applies a partial update. Only the fields present in `update` are written, plus
/// `updated_at`; every other column keeps its stored value.
pub async fn update_template<C>(db: &C, id: i64, update: TemplateUpdate) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut model = recurring_transaction::ActiveModel {
        id: Unchanged(id),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };

    if let Some(cursor) = update.last_processed_date {
        model.last_processed_date = Set(Some(cursor));
    }
    if let Some(active) = update.active {
        model.is_active = Set(active);
    }

    match model.update(db).await {
        Ok(_) => Ok(()),
        Err(DbErr::RecordNotUpdated | DbErr::RecordNotFound(_)) => {
            Err(Error::TemplateNotFound { id })
        }
        Err(e) => Err(e.into()),
    }
}

/// Pauses or resumes a template owned by `user_id`.
///
/// Returns false when no such template belongs to the user.
pub async fn set_template_active<C>(db: &C, id: i64, user_id: &str, active: bool) -> Result<bool>
where
    C: ConnectionTrait,
{
    let Some(existing) = get_template_by_id(db, id).await? else {
        return Ok(false);
    };
    if existing.user_id != user_id {
        return Ok(false);
    }

    update_template(db, id, TemplateUpdate::set_active(active)).await?;
    Ok(true)
}

/// Deletes a template owned by `user_id`. Transactions it generated are kept and
/// lose their back-reference.
///
/// Returns false when no such template belongs to the user.
pub async fn delete_template<C>(db: &C, id: i64, user_id: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = RecurringTransaction::delete_many()
        .filter(recurring_transaction::Column::Id.eq(id))
        .filter(recurring_transaction::Column::UserId.eq(user_id))
        .exec(db)
        .await?;

    Ok(result.rows_affected > 0)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::{template::TransactionKind, transaction};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_template_defaults() -> Result<()> {
        let db = setup_test_db().await?;

        let created = create_template(&db, new_template("alice", date(2024, 1, 1))).await?;
        assert!(created.is_active);
        assert!(created.last_processed_date.is_none());
        assert_eq!(created.frequency, "monthly");
        assert_eq!(created.kind, "expense");
        assert_eq!(created.amount, 25.0);

        let fetched = get_template_by_id(&db, created.id).await?.unwrap();
        assert_eq!(fetched.user_id, "alice");
        assert_eq!(fetched.start_date, date(2024, 1, 1));
        assert_eq!(fetched.description, created.description);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_template_rejects_invalid_input() -> Result<()> {
        let db = setup_test_db().await?;

        let mut input = new_template("alice", date(2024, 1, 1));
        input.amount = 0.0;
        assert!(matches!(
            create_template(&db, input).await,
            Err(Error::InvalidAmount { .. })
        ));

        let mut input = new_template("alice", date(2024, 5, 1));
        input.end_date = Some(date(2024, 4, 1));
        assert!(matches!(
            create_template(&db, input).await,
            Err(Error::InvalidDateRange { .. })
        ));

        assert!(list_templates_for_user(&db, "alice").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_templates_scoped_to_user() -> Result<()> {
        let db = setup_test_db().await?;

        let older = create_template(&db, new_template("alice", date(2023, 1, 1))).await?;
        let newer = create_template(&db, new_template("alice", date(2024, 1, 1))).await?;
        create_template(&db, new_template("bob", date(2024, 1, 1))).await?;

        let listed = list_templates_for_user(&db, "alice").await?;
        let ids: Vec<i64> = listed.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_active_templates_skips_paused() -> Result<()> {
        let db = setup_test_db().await?;

        let keep = create_template(&db, new_template("alice", date(2024, 1, 1))).await?;
        let paused = create_template(&db, new_template("alice", date(2024, 1, 1))).await?;
        assert!(set_template_active(&db, paused.id, "alice", false).await?);

        let active = list_active_templates(&db, "alice").await?;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, keep.id);

        assert!(set_template_active(&db, paused.id, "alice", true).await?);
        assert_eq!(list_active_templates(&db, "alice").await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_template_is_partial() -> Result<()> {
        let db = setup_test_db().await?;

        let mut input = new_template("alice", date(2024, 1, 1));
        input.end_date = Some(date(2024, 12, 1));
        let created = create_template(&db, input).await?;

        update_template(&db, created.id, TemplateUpdate::advance(date(2024, 2, 1))).await?;
        let after_cursor = get_template_by_id(&db, created.id).await?.unwrap();
        assert_eq!(after_cursor.last_processed_date, Some(date(2024, 2, 1)));
        assert!(after_cursor.is_active);
        assert_eq!(after_cursor.end_date, Some(date(2024, 12, 1)));
        assert_eq!(after_cursor.description, created.description);

        update_template(&db, created.id, TemplateUpdate::set_active(false)).await?;
        let after_flag = get_template_by_id(&db, created.id).await?.unwrap();
        assert!(!after_flag.is_active);
        assert_eq!(after_flag.last_processed_date, Some(date(2024, 2, 1)));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_missing_template() -> Result<()> {
        let db = setup_test_db().await?;
        let result = update_template(&db, 404, TemplateUpdate::set_active(false)).await;
        assert!(matches!(result, Err(Error::TemplateNotFound { id: 404 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_set_active_checks_owner() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_template(&db, new_template("alice", date(2024, 1, 1))).await?;

        assert!(!set_template_active(&db, created.id, "mallory", false).await?);
        assert!(!set_template_active(&db, 999, "alice", false).await?);
        assert!(get_template_by_id(&db, created.id).await?.unwrap().is_active);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_template_keeps_transactions() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_template(&db, new_template("alice", date(2024, 1, 1))).await?;

        let template = crate::core::template::RecurringTemplate::try_from(created.clone())?;
        let posted =
            transaction::create_transaction(&db, "alice", template.occurrence(date(2024, 2, 1)))
                .await?;
        assert_eq!(posted.recurring_id, Some(created.id));

        assert!(!delete_template(&db, created.id, "bob").await?);
        assert!(delete_template(&db, created.id, "alice").await?);
        assert!(get_template_by_id(&db, created.id).await?.is_none());

        let remaining = transaction::get_transactions_for_user(&db, "alice").await?;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].recurring_id, None);
        assert_eq!(remaining[0].kind, TransactionKind::Expense.as_str());
        Ok(())
    }
}
