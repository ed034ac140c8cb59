//! Campaign entity - Time-boxed promotional rules that grant bonus points.
//!
//! The `rules` column holds type-specific parameters as JSON and is decoded
//! at the evaluation boundary into the typed
//! [`CampaignRules`](crate::core::campaign::CampaignRules) union; it is
//! never accessed as an untyped map elsewhere.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Loyalty campaign database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loyalty_campaigns")]
pub struct Model {
    /// Unique identifier for the campaign
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Brand the campaign belongs to
    pub brand_id: i64,
    /// Display name used in transaction metadata
    pub name: String,
    /// Campaign kind: `"double_points"`, `"category_bonus"`,
    /// `"spending_goal"`, or `"welcome"`; unknown kinds yield no bonus
    pub campaign_type: String,
    /// Type-specific parameters (multiplier, bonus rate, thresholds)
    pub rules: Json,
    /// Start of the validity window (inclusive)
    pub valid_from: DateTimeUtc,
    /// End of the validity window (inclusive)
    pub valid_until: DateTimeUtc,
    /// Branch ids the campaign is limited to; empty array means all branches
    pub target_branches: Json,
    /// Tier names the campaign is limited to; empty array means all tiers
    pub target_tiers: Json,
    /// Whether the campaign is currently enabled
    pub is_active: bool,
}

/// Campaigns have no direct entity relationships; they are matched to
/// orders by brand and branch scope at evaluation time.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
