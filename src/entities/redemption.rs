//! Redemption entity - Records a reward consumption against an account.
//!
//! `points_spent` mirrors the magnitude of the paired `spend` ledger entry;
//! the sufficiency check guarantees it never exceeded `current_points` at
//! redemption time.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Redemption database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loyalty_redemptions")]
pub struct Model {
    /// Unique identifier for the redemption
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Account that redeemed the reward
    pub account_id: i64,
    /// Reward that was redeemed
    pub reward_id: i64,
    /// Order the redemption was applied to, if any
    pub order_id: Option<i64>,
    /// Points deducted (positive magnitude)
    pub points_spent: i64,
    /// Fulfillment status: `"pending"`, `"completed"`, or `"cancelled"`
    pub status: String,
    /// When the redemption was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `Redemption` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each redemption belongs to one loyalty account
    #[sea_orm(
        belongs_to = "super::loyalty_account::Entity",
        from = "Column::AccountId",
        to = "super::loyalty_account::Column::Id"
    )]
    LoyaltyAccount,
    /// Each redemption consumes one reward
    #[sea_orm(
        belongs_to = "super::reward::Entity",
        from = "Column::RewardId",
        to = "super::reward::Column::Id"
    )]
    Reward,
}

impl Related<super::loyalty_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoyaltyAccount.def()
    }
}

impl Related<super::reward::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reward.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
