//! Account operations - Lazily created, never deleted loyalty accounts.
//!
//! An account is the (customer, brand) pair's balance row. It comes into
//! existence on the first qualifying order, a manual adjustment, or an
//! explicit ensure call; creation applies the brand's active `welcome`
//! campaign bonus inside the same atomic unit. Accounts are soft-deactivated
//! via `is_active`, never hard-deleted.

use crate::core::{campaign, ledger, policy, tier};
use crate::core::campaign::CampaignRules;
use crate::core::ledger::TransactionType;
use crate::entities::{LoyaltyAccount, loyalty_account};
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde_json::json;
use tracing::{info, warn};

/// Finds the account for a (customer, brand) pair.
pub async fn find_account<C>(
    db: &C,
    customer_id: i64,
    brand_id: i64,
) -> Result<Option<loyalty_account::Model>>
where
    C: ConnectionTrait,
{
    LoyaltyAccount::find()
        .filter(loyalty_account::Column::CustomerId.eq(customer_id))
        .filter(loyalty_account::Column::BrandId.eq(brand_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds an account by id, failing with `AccountNotFound` when absent.
pub async fn get_account<C>(db: &C, account_id: i64) -> Result<loyalty_account::Model>
where
    C: ConnectionTrait,
{
    LoyaltyAccount::find_by_id(account_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::AccountNotFound {
            id: account_id.to_string(),
        })
}

/// All of a customer's active accounts across brands.
pub async fn accounts_for_customer(
    db: &DatabaseConnection,
    customer_id: i64,
) -> Result<Vec<loyalty_account::Model>> {
    LoyaltyAccount::find()
        .filter(loyalty_account::Column::CustomerId.eq(customer_id))
        .filter(loyalty_account::Column::IsActive.eq(true))
        .order_by_asc(loyalty_account::Column::BrandId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates the (customer, brand) account if it does not exist, inside a
/// caller-owned transaction.
///
/// Creation applies the brand's active `welcome` campaign as a `bonus`
/// ledger entry and recomputes the tier, all within the same atomic unit.
/// Returns the account and whether it was created by this call.
pub async fn ensure_account_in_txn<C>(
    db: &C,
    customer_id: i64,
    brand_id: i64,
    preferred_branch_id: Option<i64>,
    now: DateTime<Utc>,
) -> Result<(loyalty_account::Model, bool)>
where
    C: ConnectionTrait,
{
    if let Some(existing) = find_account(db, customer_id, brand_id).await? {
        return Ok((existing, false));
    }

    let account = loyalty_account::ActiveModel {
        customer_id: Set(customer_id),
        brand_id: Set(brand_id),
        current_points: Set(0),
        lifetime_points: Set(0),
        tier_level: Set(tier::Tier::Bronze.as_str().to_string()),
        tier_expiry_date: Set(None),
        preferred_branch_id: Set(preferred_branch_id),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let mut account = account.insert(db).await?;

    info!(
        account_id = account.id,
        customer_id, brand_id, "Loyalty account created"
    );

    // First-time accounts receive the brand's welcome bonus, if one is live
    if let Some(welcome) = campaign::welcome_campaign(db, brand_id, now).await? {
        match CampaignRules::decode(&welcome.campaign_type, &welcome.rules) {
            Ok(Some(CampaignRules::Welcome { points })) if points > 0 => {
                let (_, refreshed) = ledger::append_in_txn(
                    db,
                    &account,
                    preferred_branch_id,
                    TransactionType::Bonus,
                    points,
                    None,
                    "Welcome bonus".to_string(),
                    Some(json!({ "campaign_id": welcome.id })),
                )
                .await?;
                account = refreshed;

                let rules = policy::tier_rules(db, brand_id).await?;
                tier::update_tier_level(db, &account, &rules, now).await?;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(
                    campaign_id = welcome.id,
                    error = %e,
                    "Welcome campaign rules failed to decode, no bonus applied"
                );
            }
        }
    }

    Ok((account, true))
}

/// Create-or-get entry point for the (customer, brand) account.
pub async fn ensure_account(
    db: &DatabaseConnection,
    customer_id: i64,
    brand_id: i64,
    preferred_branch_id: Option<i64>,
) -> Result<loyalty_account::Model> {
    let txn = db.begin().await?;
    let (account, _created) =
        ensure_account_in_txn(&txn, customer_id, brand_id, preferred_branch_id, Utc::now()).await?;
    txn.commit().await?;
    Ok(account)
}

/// Soft-deactivates an account; its ledger history is preserved.
pub async fn deactivate_account(
    db: &DatabaseConnection,
    account_id: i64,
) -> Result<loyalty_account::Model> {
    let account = get_account(db, account_id).await?;
    let mut active = account.into_active_model();
    active.is_active = Set(false);
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}
