//! Shared helpers for unit tests. Compiled only for `cfg(test)`.

use crate::config::database::create_tables;
use crate::config::settings::StaticBranchDirectory;
use crate::core::ledger::{self, TransactionType};
use crate::core::order::OrderEvent;
use crate::core::tier::Tier;
use crate::entities::{campaign, loyalty_account, loyalty_setting, reward};
use crate::errors::Result;
use chrono::{Duration, TimeZone, Utc};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use std::sync::atomic::{AtomicI64, Ordering};

static NEXT_ORDER_ID: AtomicI64 = AtomicI64::new(1000);

/// Fresh in-memory database with the full schema.
///
/// The pool is capped at one connection: each pooled connection to
/// `sqlite::memory:` would otherwise open its own empty database, and tests
/// that run tasks concurrently must all see the same tables.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);
    let db = Database::connect(options).await?;
    create_tables(&db).await?;
    Ok(db)
}

/// A BRONZE account with zero points for the (customer, brand) pair.
pub async fn create_test_account(
    db: &DatabaseConnection,
    customer_id: i64,
    brand_id: i64,
) -> Result<loyalty_account::Model> {
    let now = Utc::now();
    let account = loyalty_account::ActiveModel {
        customer_id: Set(customer_id),
        brand_id: Set(brand_id),
        current_points: Set(0),
        lifetime_points: Set(0),
        tier_level: Set(Tier::Bronze.as_str().to_string()),
        tier_expiry_date: Set(None),
        preferred_branch_id: Set(None),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    account.insert(db).await.map_err(Into::into)
}

/// An account seeded with `points` through a real ledger entry, so balance
/// replay stays consistent in tests that verify it.
pub async fn create_test_account_with_points(
    db: &DatabaseConnection,
    customer_id: i64,
    brand_id: i64,
    points: i64,
) -> Result<loyalty_account::Model> {
    let account = create_test_account(db, customer_id, brand_id).await?;
    if points > 0 {
        ledger::append(
            db,
            account.id,
            None,
            TransactionType::ManualAdd,
            points,
            None,
            "Test seed".to_string(),
            None,
        )
        .await?;
    }
    crate::core::account::get_account(db, account.id).await
}

/// Upserts a brand policy payload under the given settings key.
pub async fn set_brand_setting(
    db: &DatabaseConnection,
    brand_id: i64,
    key: &str,
    value: serde_json::Value,
) -> Result<loyalty_setting::Model> {
    let setting = loyalty_setting::ActiveModel {
        brand_id: Set(brand_id),
        setting_key: Set(key.to_string()),
        setting_value: Set(value),
        ..Default::default()
    };
    setting.insert(db).await.map_err(Into::into)
}

/// An active campaign whose validity window spans now, open to all tiers.
pub async fn create_test_campaign(
    db: &DatabaseConnection,
    brand_id: i64,
    name: &str,
    campaign_type: &str,
    rules: serde_json::Value,
    target_branches: serde_json::Value,
) -> Result<campaign::Model> {
    let now = Utc::now();
    let model = campaign::ActiveModel {
        brand_id: Set(brand_id),
        name: Set(name.to_string()),
        campaign_type: Set(campaign_type.to_string()),
        rules: Set(rules),
        valid_from: Set(now - Duration::days(1)),
        valid_until: Set(now + Duration::days(30)),
        target_branches: Set(target_branches),
        target_tiers: Set(serde_json::json!([])),
        is_active: Set(true),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// An active reward with no validity window and no stock used yet.
pub async fn create_test_reward(
    db: &DatabaseConnection,
    brand_id: i64,
    name: &str,
    points_required: i64,
    stock_limit: Option<i64>,
) -> Result<reward::Model> {
    let model = reward::ActiveModel {
        brand_id: Set(brand_id),
        name: Set(name.to_string()),
        points_required: Set(points_required),
        stock_limit: Set(stock_limit),
        stock_used: Set(0),
        valid_from: Set(None),
        valid_until: Set(None),
        is_active: Set(true),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// A plain order with a fresh order id, no items, no discount, placed on a
/// fixed Friday so default point rules are weekday-independent.
#[must_use]
pub fn test_order(customer_id: i64, branch_id: i64, total_price: i64) -> OrderEvent {
    OrderEvent {
        order_id: NEXT_ORDER_ID.fetch_add(1, Ordering::Relaxed),
        branch_id,
        customer_id: Some(customer_id),
        total_price,
        items: Vec::new(),
        used_points: 0,
        discount_amount: 0,
        placed_at: Utc
            .with_ymd_and_hms(2026, 8, 28, 12, 0, 0)
            .single()
            .unwrap_or_else(Utc::now),
    }
}

/// Branches 10 and 11 belong to brand 1, branch 20 to brand 2.
#[must_use]
pub fn test_branch_directory() -> StaticBranchDirectory {
    StaticBranchDirectory::from_pairs(&[(10, 1), (11, 1), (20, 2)])
}
