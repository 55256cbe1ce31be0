//! Recurring transaction entity - the stored template for a repeating income or expense.
//!
//! Each template carries its schedule (`start_date`, `frequency`, optional inclusive
//! `end_date`), the cursor `last_processed_date` marking the newest occurrence already
//! posted, and the `is_active` flag that the recurring processor clears once the
//! schedule has run past its end date.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Recurring template database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recurring_transactions")]
pub struct Model {
    /// Unique identifier for the template
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the template
    pub user_id: String,
    /// Amount posted for every occurrence (always positive)
    pub amount: f64,
    /// Direction of the money: `"income"` or `"expense"`
    pub kind: String,
    /// Free-form category copied onto generated transactions
    pub category: String,
    /// Free-form description copied onto generated transactions
    pub description: String,
    /// Anchor date of the schedule; never posted itself
    pub start_date: Date,
    /// Step between occurrences: `"weekly"`, `"monthly"` or `"yearly"`
    pub frequency: String,
    /// Inclusive last day an occurrence may fall on
    pub end_date: Option<Date>,
    /// Cleared once the schedule is exhausted or paused by the user
    pub is_active: bool,
    /// Date of the newest occurrence already posted
    pub last_processed_date: Option<Date>,
    /// When the template was created
    pub created_at: DateTimeUtc,
    /// When the template was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between recurring templates and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One template generates many transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
