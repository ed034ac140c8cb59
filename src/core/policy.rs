//! Brand policy loading - point accrual, tier thresholds, redemption rules.
//!
//! Policies live in the `loyalty_settings` table as brand-scoped JSON
//! payloads under well-known keys. A missing key yields the documented
//! default; a malformed payload is logged and replaced by the default rather
//! than failing the operation that needed it.

use crate::entities::{LoyaltySetting, loyalty_setting};
use crate::errors::Result;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::warn;

/// Setting key for [`PointRules`].
pub const POINT_RULES_KEY: &str = "point_rules";
/// Setting key for [`TierRules`].
pub const TIER_RULES_KEY: &str = "tier_rules";
/// Setting key for [`RedemptionRules`].
pub const REDEMPTION_RULES_KEY: &str = "redemption_rules";

/// How orders convert into base points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointRules {
    /// Points earned per unit of currency spent
    pub points_per_currency: i64,
    /// Whether the weekday doubling below is in effect
    pub enable_double_points: bool,
    /// Weekdays on which base points are doubled, 0 = Sunday … 6 = Saturday
    pub double_points_days: Vec<u32>,
}

impl Default for PointRules {
    fn default() -> Self {
        Self {
            points_per_currency: 1,
            enable_double_points: false,
            double_points_days: Vec::new(),
        }
    }
}

impl PointRules {
    /// Whether base points double on the given weekday
    /// (0 = Sunday … 6 = Saturday).
    #[must_use]
    pub fn is_double_points_day(&self, weekday: u32) -> bool {
        self.enable_double_points && self.double_points_days.contains(&weekday)
    }
}

/// Minimum lifetime points required for each tier, ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierRules {
    /// BRONZE threshold (conventionally 0)
    pub bronze: i64,
    /// SILVER threshold
    pub silver: i64,
    /// GOLD threshold
    pub gold: i64,
    /// PLATINUM threshold
    pub platinum: i64,
}

impl Default for TierRules {
    fn default() -> Self {
        Self {
            bronze: 0,
            silver: 1000,
            gold: 5000,
            platinum: 10_000,
        }
    }
}

/// Policy for converting points into order discounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedemptionRules {
    /// Points needed per unit of discount currency
    pub points_to_currency_ratio: i64,
    /// Cap on the discount as a percentage of the order total
    pub max_discount_percent: i64,
    /// Smallest redeemable number of points
    pub min_points_to_redeem: i64,
}

impl Default for RedemptionRules {
    fn default() -> Self {
        Self {
            points_to_currency_ratio: 10,
            max_discount_percent: 50,
            min_points_to_redeem: 100,
        }
    }
}

async fn load_setting<C, T>(db: &C, brand_id: i64, key: &str) -> Result<T>
where
    C: ConnectionTrait,
    T: DeserializeOwned + Default,
{
    let row = LoyaltySetting::find()
        .filter(loyalty_setting::Column::BrandId.eq(brand_id))
        .filter(loyalty_setting::Column::SettingKey.eq(key))
        .one(db)
        .await?;

    match row {
        Some(setting) => match serde_json::from_value(setting.setting_value) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(
                    brand_id,
                    key,
                    error = %e,
                    "Malformed policy payload, using defaults"
                );
                Ok(T::default())
            }
        },
        None => Ok(T::default()),
    }
}

/// Loads the brand's point accrual rules, falling back to defaults.
pub async fn point_rules<C>(db: &C, brand_id: i64) -> Result<PointRules>
where
    C: ConnectionTrait,
{
    load_setting(db, brand_id, POINT_RULES_KEY).await
}

/// Loads the brand's tier thresholds, falling back to defaults.
pub async fn tier_rules<C>(db: &C, brand_id: i64) -> Result<TierRules>
where
    C: ConnectionTrait,
{
    load_setting(db, brand_id, TIER_RULES_KEY).await
}

/// Loads the brand's redemption policy, falling back to defaults.
pub async fn redemption_rules<C>(db: &C, brand_id: i64) -> Result<RedemptionRules>
where
    C: ConnectionTrait,
{
    load_setting(db, brand_id, REDEMPTION_RULES_KEY).await
}
