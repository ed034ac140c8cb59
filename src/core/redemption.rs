//! Redemption engine - Converts points into rewards or order discounts.
//!
//! Catalog redemption claims limited stock with a conditional UPDATE
//! (`stock_used < stock_limit` in the filter), so two racing redemptions of
//! the last unit cannot both succeed; the loser sees `StockExhausted`. The
//! stock claim, the `spend` ledger entry, and the redemption row commit as
//! one atomic unit or not at all. The points-to-currency path shares the
//! sufficiency policy but computes a capped monetary discount instead.

use crate::core::ledger::{self, TransactionType, MAX_APPEND_ATTEMPTS};
use crate::core::{account, policy};
use crate::entities::{Reward, redemption, reward};
use crate::errors::{Error, Result};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

/// Outcome of a points-to-currency feasibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionCheck {
    /// Whether the requested points can be redeemed at all
    pub can_redeem: bool,
    /// The discount the points are worth, when redeemable
    pub discount_amount: Option<i64>,
    /// Why the redemption is not possible, when it is not
    pub reason: Option<String>,
}

fn reward_window_open(reward: &reward::Model, now: chrono::DateTime<chrono::Utc>) -> bool {
    let started = reward.valid_from.is_none_or(|from| from <= now);
    let not_ended = reward.valid_until.is_none_or(|until| until >= now);
    started && not_ended
}

/// Redeems a catalog reward against an account.
///
/// Validates availability, brand scope, sufficiency, and stock, then
/// atomically claims the stock, appends the `spend` entry, and records the
/// completed redemption. Retries the unit on balance contention.
pub async fn redeem(
    db: &DatabaseConnection,
    account_id: i64,
    reward_id: i64,
    order_id: Option<i64>,
) -> Result<redemption::Model> {
    for attempt in 1..=MAX_APPEND_ATTEMPTS {
        let txn = db.begin().await?;
        match redeem_in_txn(&txn, account_id, reward_id, order_id).await {
            Ok(model) => {
                txn.commit().await?;
                info!(
                    account_id,
                    reward_id,
                    redemption_id = model.id,
                    points_spent = model.points_spent,
                    "Reward redeemed"
                );
                return Ok(model);
            }
            Err(Error::Conflict { .. }) if attempt < MAX_APPEND_ATTEMPTS => {
                txn.rollback().await?;
            }
            Err(e) => {
                txn.rollback().await?;
                return Err(e);
            }
        }
    }

    Err(Error::Conflict { account_id })
}

async fn redeem_in_txn<C>(
    db: &C,
    account_id: i64,
    reward_id: i64,
    order_id: Option<i64>,
) -> Result<redemption::Model>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let account = account::get_account(db, account_id).await?;

    let reward = Reward::find_by_id(reward_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::RewardUnavailable {
            reason: format!("reward {reward_id} does not exist"),
        })?;

    if !reward.is_active {
        return Err(Error::RewardUnavailable {
            reason: "reward is not active".to_string(),
        });
    }
    if !reward_window_open(&reward, now) {
        return Err(Error::RewardUnavailable {
            reason: "reward is outside its validity window".to_string(),
        });
    }
    if reward.brand_id != account.brand_id {
        return Err(Error::RewardUnavailable {
            reason: "reward belongs to a different brand".to_string(),
        });
    }
    if account.current_points < reward.points_required {
        return Err(Error::InsufficientPoints {
            current: account.current_points,
            required: reward.points_required,
        });
    }

    // Claim one unit of limited stock; the condition in the filter makes the
    // increment race-safe - whoever matches zero rows lost the last unit.
    if let Some(stock_limit) = reward.stock_limit {
        let claim = Reward::update_many()
            .col_expr(
                reward::Column::StockUsed,
                Expr::col(reward::Column::StockUsed).add(1),
            )
            .filter(reward::Column::Id.eq(reward.id))
            .filter(reward::Column::StockUsed.lt(stock_limit))
            .exec(db)
            .await?;
        if claim.rows_affected == 0 {
            return Err(Error::StockExhausted);
        }
    }

    ledger::append_in_txn(
        db,
        &account,
        account.preferred_branch_id,
        TransactionType::Spend,
        -reward.points_required,
        order_id,
        format!("Reward redemption: {}", reward.name),
        Some(json!({ "reward_id": reward.id })),
    )
    .await?;

    let model = redemption::ActiveModel {
        account_id: Set(account.id),
        reward_id: Set(reward.id),
        order_id: Set(order_id),
        points_spent: Set(reward.points_required),
        status: Set("completed".to_string()),
        created_at: Set(now),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Checks whether `points_to_use` can buy a discount on an order of
/// `order_total`, per the brand's redemption policy.
///
/// The discount is `points / points_to_currency_ratio`, capped at
/// `max_discount_percent` of the order total. This is a pure policy check;
/// the actual deduction happens in the order-completion flow.
pub async fn check_redemption(
    db: &DatabaseConnection,
    brand_id: i64,
    points_to_use: i64,
    order_total: i64,
) -> Result<RedemptionCheck> {
    let rules = policy::redemption_rules(db, brand_id).await?;

    // A non-positive ratio is a stored misconfiguration; treat redemption as
    // disabled for the brand rather than dividing by it.
    if rules.points_to_currency_ratio <= 0 {
        return Ok(RedemptionCheck {
            can_redeem: false,
            discount_amount: None,
            reason: Some("point redemption is not configured for this brand".to_string()),
        });
    }

    if points_to_use < rules.min_points_to_redeem {
        return Ok(RedemptionCheck {
            can_redeem: false,
            discount_amount: None,
            reason: Some(format!(
                "at least {} points are required to redeem",
                rules.min_points_to_redeem
            )),
        });
    }

    let discount = points_to_use / rules.points_to_currency_ratio;
    let cap = order_total * rules.max_discount_percent / 100;
    let capped = discount.min(cap);

    if capped <= 0 {
        return Ok(RedemptionCheck {
            can_redeem: false,
            discount_amount: None,
            reason: Some("points are worth no discount on this order".to_string()),
        });
    }

    Ok(RedemptionCheck {
        can_redeem: true,
        discount_amount: Some(capped),
        reason: None,
    })
}
