//! Loyalty account entity - One customer's point balance with one brand.
//!
//! Each account is identified by the (`customer_id`, `brand_id`) pair and
//! carries the current balance, the monotone lifetime total, and the tier
//! derived from it. Accounts are created lazily and never hard-deleted;
//! `is_active` soft-deactivates them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Loyalty account database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loyalty_accounts")]
pub struct Model {
    /// Unique identifier for the account
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Customer this account belongs to
    pub customer_id: i64,
    /// Brand this account is scoped to (one account per customer per brand)
    pub brand_id: i64,
    /// Spendable point balance; always equals the sum of the account's
    /// ledger entries and never goes below zero
    pub current_points: i64,
    /// Total points ever earned; non-decreasing except for manual correction
    pub lifetime_points: i64,
    /// Tier level derived from `lifetime_points`: `"BRONZE"`, `"SILVER"`,
    /// `"GOLD"`, or `"PLATINUM"`
    pub tier_level: String,
    /// When the current tier expires; refreshed on every promotion
    pub tier_expiry_date: Option<DateTimeUtc>,
    /// Branch the customer's points are attributed to for reporting
    pub preferred_branch_id: Option<i64>,
    /// Soft-deactivation flag; inactive accounts are hidden, not deleted
    pub is_active: bool,
    /// When the account was created
    pub created_at: DateTimeUtc,
    /// Last balance-affecting update
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `LoyaltyAccount` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One account has many point transactions
    #[sea_orm(has_many = "super::point_transaction::Entity")]
    PointTransactions,
    /// One account has many redemptions
    #[sea_orm(has_many = "super::redemption::Entity")]
    Redemptions,
}

impl Related<super::point_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PointTransactions.def()
    }
}

impl Related<super::redemption::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Redemptions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
