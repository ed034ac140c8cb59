//! Campaign evaluation - Selects applicable promotions and computes bonuses.
//!
//! Campaign rules are stored as JSON but never consumed as untyped maps:
//! [`CampaignRules::decode`] turns the `(campaign_type, rules)` pair into a
//! typed union at the boundary, and [`bonus_for`] is a pure function over it.
//! A malformed rules payload disqualifies that one campaign (logged, skipped)
//! without failing the earn operation it was evaluated for; an unknown
//! campaign type simply yields no bonus, keeping old servers forward
//! compatible with new campaign kinds.

use crate::core::order::OrderEvent;
use crate::core::tier::Tier;
use crate::entities::{Campaign, campaign};
use crate::errors::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Typed campaign parameters, decoded from the stored JSON blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CampaignRules {
    /// Multiplies the order's base points: bonus = base × (multiplier − 1)
    DoublePoints {
        /// Overall multiplier on base points (2 = double)
        multiplier: i64,
    },
    /// Extra points on line items in one category
    CategoryBonus {
        /// Category whose items qualify
        target_category_id: i64,
        /// Bonus as a percentage of the item subtotal
        bonus_rate_percent: i64,
    },
    /// Flat bonus when the order total reaches a threshold
    SpendingGoal {
        /// Minimum order total to qualify
        min_amount: i64,
        /// Bonus granted when the goal is met
        bonus_points: i64,
    },
    /// One-time bonus applied at account creation, never at order time
    Welcome {
        /// Points granted to the new account
        points: i64,
    },
}

#[derive(Deserialize)]
struct DoublePointsParams {
    multiplier: i64,
}

#[derive(Deserialize)]
struct CategoryBonusParams {
    target_category_id: i64,
    // Stored payloads use the shorter "bonus_rate" name
    #[serde(alias = "bonus_rate")]
    bonus_rate_percent: i64,
}

#[derive(Deserialize)]
struct SpendingGoalParams {
    min_amount: i64,
    bonus_points: i64,
}

#[derive(Deserialize)]
struct WelcomeParams {
    #[serde(alias = "welcome_points", default = "default_welcome_points")]
    points: i64,
}

const fn default_welcome_points() -> i64 {
    100
}

impl CampaignRules {
    /// Decodes the stored `(campaign_type, rules)` pair.
    ///
    /// Returns `Ok(None)` for campaign types this server does not know
    /// (forward-compatible: they contribute no bonus), and an error for a
    /// known type whose parameters do not parse.
    pub fn decode(
        campaign_type: &str,
        rules: &serde_json::Value,
    ) -> std::result::Result<Option<Self>, serde_json::Error> {
        let decoded = match campaign_type {
            "double_points" => {
                let p: DoublePointsParams = serde_json::from_value(rules.clone())?;
                Some(Self::DoublePoints {
                    multiplier: p.multiplier,
                })
            }
            "category_bonus" => {
                let p: CategoryBonusParams = serde_json::from_value(rules.clone())?;
                Some(Self::CategoryBonus {
                    target_category_id: p.target_category_id,
                    bonus_rate_percent: p.bonus_rate_percent,
                })
            }
            "spending_goal" => {
                let p: SpendingGoalParams = serde_json::from_value(rules.clone())?;
                Some(Self::SpendingGoal {
                    min_amount: p.min_amount,
                    bonus_points: p.bonus_points,
                })
            }
            "welcome" => {
                let p: WelcomeParams = serde_json::from_value(rules.clone())?;
                Some(Self::Welcome { points: p.points })
            }
            _ => None,
        };
        Ok(decoded)
    }
}

/// One campaign's contribution to an earn entry, recorded in its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignBonus {
    /// Campaign that produced the bonus
    pub campaign_id: i64,
    /// Campaign display name at evaluation time
    pub campaign_name: String,
    /// Bonus points granted
    pub bonus_points: i64,
}

/// Computes a single campaign's bonus for an order. Pure.
///
/// `base_points` is the order's base after any double-points-day doubling;
/// the `double_points` bonus is computed on that doubled base.
#[must_use]
pub fn bonus_for(rules: &CampaignRules, order: &OrderEvent, base_points: i64) -> i64 {
    match rules {
        CampaignRules::DoublePoints { multiplier } => base_points * (multiplier - 1),
        CampaignRules::CategoryBonus {
            target_category_id,
            bonus_rate_percent,
        } => order
            .items
            .iter()
            .filter(|item| item.category_id == Some(*target_category_id))
            .map(|item| item.price * item.quantity * bonus_rate_percent / 100)
            .sum(),
        CampaignRules::SpendingGoal {
            min_amount,
            bonus_points,
        } => {
            if order.total_price >= *min_amount {
                *bonus_points
            } else {
                0
            }
        }
        // Welcome bonuses are granted at account creation, not per order
        CampaignRules::Welcome { .. } => 0,
    }
}

fn branch_in_scope(campaign: &campaign::Model, branch_id: i64) -> bool {
    let targets: Vec<i64> =
        serde_json::from_value(campaign.target_branches.clone()).unwrap_or_default();
    targets.is_empty() || targets.contains(&branch_id)
}

/// Whether the campaign's tier gate admits the given account tier.
/// An empty target set admits every tier.
#[must_use]
pub fn eligible_for_tier(campaign: &campaign::Model, tier: Tier) -> bool {
    let targets: Vec<String> =
        serde_json::from_value(campaign.target_tiers.clone()).unwrap_or_default();
    targets.is_empty() || targets.iter().any(|t| t == tier.as_str())
}

/// Returns the brand's campaigns that are active, inside their validity
/// window, and in scope for the branch.
pub async fn active_campaigns<C>(
    db: &C,
    brand_id: i64,
    branch_id: i64,
    now: DateTime<Utc>,
) -> Result<Vec<campaign::Model>>
where
    C: ConnectionTrait,
{
    let candidates = Campaign::find()
        .filter(campaign::Column::BrandId.eq(brand_id))
        .filter(campaign::Column::IsActive.eq(true))
        .filter(campaign::Column::ValidFrom.lte(now))
        .filter(campaign::Column::ValidUntil.gte(now))
        .all(db)
        .await?;

    Ok(candidates
        .into_iter()
        .filter(|c| branch_in_scope(c, branch_id))
        .collect())
}

/// Returns the brand's active `welcome` campaign, if one exists.
pub async fn welcome_campaign<C>(
    db: &C,
    brand_id: i64,
    now: DateTime<Utc>,
) -> Result<Option<campaign::Model>>
where
    C: ConnectionTrait,
{
    Campaign::find()
        .filter(campaign::Column::BrandId.eq(brand_id))
        .filter(campaign::Column::CampaignType.eq("welcome"))
        .filter(campaign::Column::IsActive.eq(true))
        .filter(campaign::Column::ValidFrom.lte(now))
        .filter(campaign::Column::ValidUntil.gte(now))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Evaluates a set of campaigns against an order and sums their bonuses.
///
/// Each applicable campaign contributes independently; there is no
/// precedence or mutual exclusivity between them. Campaigns whose rules
/// fail to decode are skipped with a warning - one bad campaign must not
/// sink the earn.
#[must_use]
pub fn evaluate(
    campaigns: &[campaign::Model],
    order: &OrderEvent,
    base_points: i64,
    tier: Tier,
) -> Vec<CampaignBonus> {
    let mut bonuses = Vec::new();

    for campaign in campaigns {
        if !eligible_for_tier(campaign, tier) {
            continue;
        }

        let rules = match CampaignRules::decode(&campaign.campaign_type, &campaign.rules) {
            Ok(Some(rules)) => rules,
            Ok(None) => continue,
            Err(e) => {
                warn!(
                    campaign_id = campaign.id,
                    campaign_type = %campaign.campaign_type,
                    error = %e,
                    "Campaign rules failed to decode, skipping campaign"
                );
                continue;
            }
        };

        let bonus = bonus_for(&rules, order, base_points);
        if bonus > 0 {
            bonuses.push(CampaignBonus {
                campaign_id: campaign.id,
                campaign_name: campaign.name.clone(),
                bonus_points: bonus,
            });
        }
    }

    bonuses
}
