//! Transaction entity - Represents a concrete ledger entry.
//!
//! Transactions posted by the recurring processor carry the `recurring_id` of the
//! template that produced them and are dated on the occurrence, not on the day
//! they were written.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the transaction
    pub user_id: String,
    /// Transaction amount (always positive, direction lives in `kind`)
    pub amount: f64,
    /// `"income"` or `"expense"`
    pub kind: String,
    /// Free-form category
    pub category: String,
    /// Human-readable description of the transaction
    pub description: String,
    /// Calendar date the transaction applies to
    pub date: Date,
    /// Template that generated this transaction, if any
    pub recurring_id: Option<i64>,
    /// When the row was written
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Generated transactions point back to their template
    #[sea_orm(
        belongs_to = "super::recurring_transaction::Entity",
        from = "Column::RecurringId",
        to = "super::recurring_transaction::Column::Id",
        on_delete = "SetNull"
    )]
    RecurringTransaction,
}

impl Related<super::recurring_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecurringTransaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
