//! Point transaction entity - The append-only ledger of point movements.
//!
//! Each row records a signed point delta together with `balance_after`, a
//! snapshot of the account's `current_points` immediately after the entry.
//! Rows are created exactly once per ledger-affecting operation and never
//! updated or deleted; replaying them in creation order reconstructs the
//! account balance at every step.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Point transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "point_transactions")]
pub struct Model {
    /// Monotonically increasing identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Account this entry belongs to
    pub account_id: i64,
    /// Branch the movement is attributed to, when known
    pub branch_id: Option<i64>,
    /// Order that triggered the entry; doubles as the idempotency key for
    /// earn/spend entries together with `account_id` and `transaction_type`
    pub order_id: Option<i64>,
    /// Movement type: `"earn"`, `"spend"`, `"bonus"`, `"manual_add"`,
    /// `"manual_deduct"`, `"transfer_in"`, or `"transfer_out"`
    pub transaction_type: String,
    /// Signed point delta (credits positive, debits negative)
    pub points: i64,
    /// Snapshot of `current_points` immediately after this entry
    pub balance_after: i64,
    /// Human-readable description of the movement
    pub description: String,
    /// Free-form audit payload (campaign bonus breakdown, transfer reason)
    pub metadata: Option<Json>,
    /// When the entry was written
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `PointTransaction` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to one loyalty account
    #[sea_orm(
        belongs_to = "super::loyalty_account::Entity",
        from = "Column::AccountId",
        to = "super::loyalty_account::Column::Id"
    )]
    LoyaltyAccount,
}

impl Related<super::loyalty_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoyaltyAccount.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
