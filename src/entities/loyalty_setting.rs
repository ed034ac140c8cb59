//! Loyalty setting entity - Brand-scoped key/value policy storage.
//!
//! Known keys are `"point_rules"`, `"tier_rules"`, and `"redemption_rules"`;
//! their JSON payloads are decoded into the typed structs in
//! [`crate::core::policy`], with documented defaults when a key is absent.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Loyalty setting database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loyalty_settings")]
pub struct Model {
    /// Unique identifier for the setting row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Brand this policy applies to
    pub brand_id: i64,
    /// Policy key (`"point_rules"`, `"tier_rules"`, `"redemption_rules"`)
    pub setting_key: String,
    /// Policy payload, decoded at the boundary
    pub setting_value: Json,
}

/// Settings have no entity relationships; they are looked up by
/// (`brand_id`, `setting_key`).
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
