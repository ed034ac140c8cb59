//! Order processing - Turns completed orders into ledger movement.
//!
//! One order produces at most one `spend` entry (points used for a discount)
//! and one `earn` entry (base points plus campaign bonuses), committed
//! together with account creation and tier recomputation. Re-delivery of an
//! already-processed order is answered from the recorded entries without
//! moving the balance again.
//!
//! Base points are `total_price * points_per_currency`, doubled when the
//! order lands on a configured double-points weekday. Campaign bonuses are
//! computed on the doubled base.

use crate::core::ledger::{self, TransactionType, MAX_APPEND_ATTEMPTS, RETRY_BACKOFF_MS};
use crate::core::campaign::{self, CampaignBonus};
use crate::core::{account, policy, tier, BranchDirectory};
use crate::entities::loyalty_account;
use crate::errors::{Error, Result};
use chrono::{DateTime, Datelike, Utc};
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: i64,
    /// Menu category, when the catalog provides one
    pub category_id: Option<i64>,
    /// Unit price in minor currency units
    pub price: i64,
    pub quantity: i64,
}

/// A completed order as delivered by the ordering system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub order_id: i64,
    pub branch_id: i64,
    /// Absent for guest orders, which earn nothing
    pub customer_id: Option<i64>,
    /// Order total in minor currency units, after any discount
    pub total_price: i64,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    /// Points the customer spent on a discount for this order
    #[serde(default)]
    pub used_points: i64,
    /// The discount those points bought, for the audit trail
    #[serde(default)]
    pub discount_amount: i64,
    pub placed_at: DateTime<Utc>,
}

/// What an order did to the account, returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct EarnSummary {
    pub account_id: i64,
    pub order_id: i64,
    /// Base points after any weekday doubling
    pub base_points: i64,
    /// Per-campaign bonuses, in evaluation order
    pub campaign_bonuses: Vec<CampaignBonus>,
    /// Total credited: base plus all bonuses
    pub points_earned: i64,
    /// Points deducted for the order's discount
    pub points_spent: i64,
    pub new_balance: i64,
    pub tier_level: String,
    /// Whether this order was already processed and the summary replayed
    pub duplicate: bool,
}

/// Base points for an order: `total * points_per_currency`, doubled on a
/// configured double-points weekday (0 = Sunday).
#[must_use]
pub fn base_points(rules: &policy::PointRules, total_price: i64, placed_at: DateTime<Utc>) -> i64 {
    let base = total_price * rules.points_per_currency;
    if rules.is_double_points_day(placed_at.weekday().num_days_from_sunday()) {
        base * 2
    } else {
        base
    }
}

/// Processes a completed order end to end.
///
/// Resolves the branch to its brand, ensures the customer's account, deducts
/// any points used for a discount, credits base points and campaign bonuses,
/// and recomputes the tier, all in one atomic unit. Retries the unit on
/// balance contention.
pub async fn process_order(
    db: &DatabaseConnection,
    branches: &impl BranchDirectory,
    event: &OrderEvent,
) -> Result<EarnSummary> {
    let customer_id = event.customer_id.ok_or_else(|| Error::InvalidOrder {
        message: format!("order {} has no customer", event.order_id),
    })?;
    let brand_id = branches
        .brand_of(event.branch_id)
        .ok_or_else(|| Error::InvalidOrder {
            message: format!("unknown branch {}", event.branch_id),
        })?;
    if event.total_price < 0 {
        return Err(Error::InvalidOrder {
            message: format!("negative order total {}", event.total_price),
        });
    }
    if event.used_points < 0 {
        return Err(Error::InvalidOrder {
            message: format!("negative used_points {}", event.used_points),
        });
    }

    let mut contended_account = 0;
    for attempt in 1..=MAX_APPEND_ATTEMPTS {
        let txn = db.begin().await?;
        match process_order_in_txn(&txn, customer_id, brand_id, event).await {
            Ok(summary) => {
                txn.commit().await?;
                if summary.duplicate {
                    info!(
                        order_id = event.order_id,
                        account_id = summary.account_id,
                        "Order already processed, summary replayed"
                    );
                } else {
                    info!(
                        order_id = event.order_id,
                        account_id = summary.account_id,
                        points_earned = summary.points_earned,
                        points_spent = summary.points_spent,
                        new_balance = summary.new_balance,
                        "Order processed"
                    );
                }
                return Ok(summary);
            }
            Err(Error::Conflict { account_id }) if attempt < MAX_APPEND_ATTEMPTS => {
                contended_account = account_id;
                txn.rollback().await?;
                tokio::time::sleep(std::time::Duration::from_millis(
                    RETRY_BACKOFF_MS * u64::from(attempt),
                ))
                .await;
            }
            Err(e) => {
                txn.rollback().await?;
                return Err(e);
            }
        }
    }

    Err(Error::Conflict {
        account_id: contended_account,
    })
}

async fn process_order_in_txn<C>(
    db: &C,
    customer_id: i64,
    brand_id: i64,
    event: &OrderEvent,
) -> Result<EarnSummary>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let (mut account, _created) =
        account::ensure_account_in_txn(db, customer_id, brand_id, Some(event.branch_id), now)
            .await?;

    // An earn entry for this order means it was already fully processed.
    if let Some(existing) =
        ledger::find_order_entry(db, account.id, event.order_id, TransactionType::Earn).await?
    {
        return Ok(replay_summary(&account, event, &existing));
    }

    let mut points_spent = 0;
    if event.used_points > 0 {
        let already_spent =
            ledger::find_order_entry(db, account.id, event.order_id, TransactionType::Spend)
                .await?;
        if let Some(entry) = already_spent {
            points_spent = -entry.points;
        } else {
            let (_, refreshed) = ledger::append_in_txn(
                db,
                &account,
                Some(event.branch_id),
                TransactionType::Spend,
                -event.used_points,
                Some(event.order_id),
                format!("Points used on order {}", event.order_id),
                Some(json!({ "discount_amount": event.discount_amount })),
            )
            .await?;
            account = refreshed;
            points_spent = event.used_points;
        }
    }

    let point_rules = policy::point_rules(db, brand_id).await?;
    let base = base_points(&point_rules, event.total_price, event.placed_at);

    let campaigns = campaign::active_campaigns(db, brand_id, event.branch_id, now).await?;
    let account_tier = tier::Tier::from_level(&account.tier_level);
    let bonuses = campaign::evaluate(&campaigns, event, base, account_tier);
    let bonus_total: i64 = bonuses.iter().map(|b| b.bonus_points).sum();
    let earned = base + bonus_total;

    debug!(
        order_id = event.order_id,
        base, bonus_total, "Order points computed"
    );

    if earned > 0 {
        let (_, refreshed) = ledger::append_in_txn(
            db,
            &account,
            Some(event.branch_id),
            TransactionType::Earn,
            earned,
            Some(event.order_id),
            format!("Points earned on order {}", event.order_id),
            Some(json!({
                "base_points": base,
                "campaign_bonuses": bonuses,
            })),
        )
        .await?;
        account = refreshed;

        let tier_rules = policy::tier_rules(db, brand_id).await?;
        if let Some(promoted) = tier::update_tier_level(db, &account, &tier_rules, now).await? {
            account.tier_level = promoted.as_str().to_string();
        }
    }

    Ok(EarnSummary {
        account_id: account.id,
        order_id: event.order_id,
        base_points: base,
        campaign_bonuses: bonuses,
        points_earned: earned,
        points_spent,
        new_balance: account.current_points,
        tier_level: account.tier_level,
        duplicate: false,
    })
}

/// Rebuilds the summary of an already-processed order from its recorded
/// earn entry.
fn replay_summary(
    account: &loyalty_account::Model,
    event: &OrderEvent,
    entry: &crate::entities::point_transaction::Model,
) -> EarnSummary {
    let metadata = entry.metadata.clone().unwrap_or_default();
    let base = metadata
        .get("base_points")
        .and_then(serde_json::Value::as_i64)
        .unwrap_or(entry.points);
    let bonuses: Vec<CampaignBonus> = metadata
        .get("campaign_bonuses")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();

    EarnSummary {
        account_id: account.id,
        order_id: event.order_id,
        base_points: base,
        campaign_bonuses: bonuses,
        points_earned: entry.points,
        points_spent: event.used_points.max(0),
        new_balance: account.current_points,
        tier_level: account.tier_level.clone(),
        duplicate: true,
    }
}
