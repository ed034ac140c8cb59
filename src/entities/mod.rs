//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod campaign;
pub mod loyalty_account;
pub mod loyalty_setting;
pub mod point_transaction;
pub mod redemption;
pub mod reward;

// Re-export specific types to avoid conflicts
pub use campaign::{Column as CampaignColumn, Entity as Campaign, Model as CampaignModel};
pub use loyalty_account::{
    Column as LoyaltyAccountColumn, Entity as LoyaltyAccount, Model as LoyaltyAccountModel,
};
pub use loyalty_setting::{
    Column as LoyaltySettingColumn, Entity as LoyaltySetting, Model as LoyaltySettingModel,
};
pub use point_transaction::{
    Column as PointTransactionColumn, Entity as PointTransaction, Model as PointTransactionModel,
};
pub use redemption::{Column as RedemptionColumn, Entity as Redemption, Model as RedemptionModel};
pub use reward::{Column as RewardColumn, Entity as Reward, Model as RewardModel};
