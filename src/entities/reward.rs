//! Reward entity - Brand-scoped catalog entries redeemable for points.
//!
//! `stock_limit` is `None` for unlimited rewards; when set, `stock_used`
//! never exceeds it (enforced by the redemption engine's conditional
//! stock claim, not by readers).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Reward catalog database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loyalty_rewards")]
pub struct Model {
    /// Unique identifier for the reward
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Brand whose accounts may redeem this reward
    pub brand_id: i64,
    /// Display name
    pub name: String,
    /// Points deducted on redemption
    pub points_required: i64,
    /// Maximum number of redemptions; `None` means unlimited
    pub stock_limit: Option<i64>,
    /// Redemptions consumed so far
    pub stock_used: i64,
    /// Start of the validity window, if bounded
    pub valid_from: Option<DateTimeUtc>,
    /// End of the validity window, if bounded
    pub valid_until: Option<DateTimeUtc>,
    /// Whether the reward can currently be redeemed
    pub is_active: bool,
}

/// Defines relationships between `Reward` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One reward has many redemptions
    #[sea_orm(has_many = "super::redemption::Entity")]
    Redemptions,
}

impl Related<super::redemption::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Redemptions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
