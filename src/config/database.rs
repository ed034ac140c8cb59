//! Database configuration module for the loyalty ledger.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! It provides functions for establishing database connections and creating all necessary tables
//! based on the entity definitions. The module uses `SeaORM`'s `Schema::create_table_from_entity`
//! method to automatically generate SQL statements from the entity models, plus a handful of
//! explicit unique indexes that the ledger's invariants depend on: one account per
//! (customer, brand) pair, one setting row per (brand, key), and the order idempotency
//! key on (account, order, transaction type).

use crate::entities::{
    Campaign, LoyaltyAccount, LoyaltyAccountColumn, LoyaltySetting, LoyaltySettingColumn,
    PointTransaction, PointTransactionColumn, Redemption, Reward,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

/// Gets the database URL from environment variable or returns default `SQLite` path.
///
/// This function looks for `DATABASE_URL` in the environment and falls back to
/// a default local `SQLite` file if not found.
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/loyalty_ledger.sqlite".to_string())
}

/// Establishes a connection to the `SQLite` database using the `DATABASE_URL` environment variable.
///
/// Falls back to a default local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    Database::connect(get_database_url()).await.map_err(Into::into)
}

/// Creates all necessary database tables using `SeaORM`'s schema generation from entity definitions.
///
/// This function uses the `DeriveEntityModel` macros to automatically generate proper SQL
/// statements for table creation, ensuring the database schema matches the Rust struct
/// definitions. It creates tables for accounts, point transactions, campaigns, rewards,
/// redemptions, and settings, then adds the unique indexes the ledger relies on.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let account_table = schema.create_table_from_entity(LoyaltyAccount);
    let transaction_table = schema.create_table_from_entity(PointTransaction);
    let campaign_table = schema.create_table_from_entity(Campaign);
    let reward_table = schema.create_table_from_entity(Reward);
    let redemption_table = schema.create_table_from_entity(Redemption);
    let setting_table = schema.create_table_from_entity(LoyaltySetting);

    db.execute(builder.build(&account_table)).await?;
    db.execute(builder.build(&transaction_table)).await?;
    db.execute(builder.build(&campaign_table)).await?;
    db.execute(builder.build(&reward_table)).await?;
    db.execute(builder.build(&redemption_table)).await?;
    db.execute(builder.build(&setting_table)).await?;

    // One loyalty account per (customer, brand) pair.
    let account_identity = Index::create()
        .name("idx_loyalty_accounts_customer_brand")
        .table(LoyaltyAccount)
        .col(LoyaltyAccountColumn::CustomerId)
        .col(LoyaltyAccountColumn::BrandId)
        .unique()
        .to_owned();
    db.execute(builder.build(&account_identity)).await?;

    // Order idempotency key: re-processing the same order must not append a
    // second earn/spend entry. SQLite treats NULL order_ids as distinct, so
    // entries without an order are unaffected.
    let order_dedup = Index::create()
        .name("idx_point_transactions_order_dedup")
        .table(PointTransaction)
        .col(PointTransactionColumn::AccountId)
        .col(PointTransactionColumn::OrderId)
        .col(PointTransactionColumn::TransactionType)
        .unique()
        .to_owned();
    db.execute(builder.build(&order_dedup)).await?;

    // One policy row per (brand, key).
    let setting_identity = Index::create()
        .name("idx_loyalty_settings_brand_key")
        .table(LoyaltySetting)
        .col(LoyaltySettingColumn::BrandId)
        .col(LoyaltySettingColumn::SettingKey)
        .unique()
        .to_owned();
    db.execute(builder.build(&setting_identity)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        campaign::Model as CampaignModel, loyalty_account::Model as AccountModel,
        loyalty_setting::Model as SettingModel, point_transaction::Model as TransactionModel,
        redemption::Model as RedemptionModel, reward::Model as RewardModel,
    };
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<AccountModel> = LoyaltyAccount::find().limit(1).all(&db).await?;
        let _: Vec<TransactionModel> = PointTransaction::find().limit(1).all(&db).await?;
        let _: Vec<CampaignModel> = Campaign::find().limit(1).all(&db).await?;
        let _: Vec<RewardModel> = Reward::find().limit(1).all(&db).await?;
        let _: Vec<RedemptionModel> = Redemption::find().limit(1).all(&db).await?;
        let _: Vec<SettingModel> = LoyaltySetting::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_account_identity_unique() -> Result<()> {
        use chrono::Utc;
        use sea_orm::{ActiveModelTrait, Set};

        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        let now = Utc::now();
        let account = crate::entities::loyalty_account::ActiveModel {
            customer_id: Set(1),
            brand_id: Set(1),
            current_points: Set(0),
            lifetime_points: Set(0),
            tier_level: Set("BRONZE".to_string()),
            tier_expiry_date: Set(None),
            preferred_branch_id: Set(None),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        account.insert(&db).await?;

        // Second account for the same (customer, brand) pair must be rejected
        let duplicate = crate::entities::loyalty_account::ActiveModel {
            customer_id: Set(1),
            brand_id: Set(1),
            current_points: Set(0),
            lifetime_points: Set(0),
            tier_level: Set("BRONZE".to_string()),
            tier_expiry_date: Set(None),
            preferred_branch_id: Set(None),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        assert!(duplicate.insert(&db).await.is_err());

        Ok(())
    }
}
