//! Tier calculation - Derives a customer's loyalty tier from lifetime points.
//!
//! [`tier_for`] is a pure function of `lifetime_points` against the brand's
//! configured thresholds. It is consulted after every positive ledger append;
//! a promotion updates the stored tier and (re)sets the expiry timestamp to
//! one year out. Tiers are never downgraded automatically within that year:
//! because lifetime points are monotone, recomputing on expiry cannot demote
//! either, so expiry only refreshes the timestamp.

use crate::core::policy::TierRules;
use crate::entities::{LoyaltyAccount, loyalty_account};
use crate::errors::Result;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveModelTrait, ConnectionTrait, IntoActiveModel, Set};
use tracing::info;

/// Loyalty tier levels, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    /// Entry level, threshold 0
    Bronze,
    /// First earned tier
    Silver,
    /// Second earned tier
    Gold,
    /// Highest tier
    Platinum,
}

impl Tier {
    /// The stable string form stored in `loyalty_accounts.tier_level`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bronze => "BRONZE",
            Self::Silver => "SILVER",
            Self::Gold => "GOLD",
            Self::Platinum => "PLATINUM",
        }
    }

    /// Parses a stored tier level, defaulting unknown values to Bronze.
    #[must_use]
    pub fn from_level(level: &str) -> Self {
        match level {
            "PLATINUM" => Self::Platinum,
            "GOLD" => Self::Gold,
            "SILVER" => Self::Silver,
            _ => Self::Bronze,
        }
    }
}

/// Picks the highest tier whose threshold is at or below `lifetime_points`.
#[must_use]
pub fn tier_for(lifetime_points: i64, rules: &TierRules) -> Tier {
    if lifetime_points >= rules.platinum {
        Tier::Platinum
    } else if lifetime_points >= rules.gold {
        Tier::Gold
    } else if lifetime_points >= rules.silver {
        Tier::Silver
    } else {
        Tier::Bronze
    }
}

/// Recomputes the account's tier after a positive append and persists a
/// promotion.
///
/// Returns the new tier if the account was promoted, `None` otherwise.
/// Demotions are never applied: the stored tier wins whenever the computed
/// tier is lower (the tier keeps its validity year).
pub async fn update_tier_level<C>(
    db: &C,
    account: &loyalty_account::Model,
    rules: &TierRules,
    now: DateTime<Utc>,
) -> Result<Option<Tier>>
where
    C: ConnectionTrait,
{
    let current = Tier::from_level(&account.tier_level);
    let computed = tier_for(account.lifetime_points, rules);

    if computed <= current {
        return Ok(None);
    }

    let mut active = account.clone().into_active_model();
    active.tier_level = Set(computed.as_str().to_string());
    active.tier_expiry_date = Set(Some(now + Duration::days(365)));
    active.update(db).await?;

    info!(
        account_id = account.id,
        old = current.as_str(),
        new = computed.as_str(),
        lifetime_points = account.lifetime_points,
        "Tier promotion"
    );

    Ok(Some(computed))
}

/// Loads an account and recomputes its tier outside any append flow
/// (administrative resync).
pub async fn recalculate_tier<C>(
    db: &C,
    account_id: i64,
    rules: &TierRules,
    now: DateTime<Utc>,
) -> Result<Option<Tier>>
where
    C: ConnectionTrait,
{
    use sea_orm::EntityTrait;

    let account = LoyaltyAccount::find_by_id(account_id)
        .one(db)
        .await?
        .ok_or_else(|| crate::errors::Error::AccountNotFound {
            id: account_id.to_string(),
        })?;

    update_tier_level(db, &account, rules, now).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_account, setup_test_db};

    #[test]
    fn test_tier_for_thresholds() {
        let rules = TierRules::default();

        assert_eq!(tier_for(0, &rules), Tier::Bronze);
        assert_eq!(tier_for(999, &rules), Tier::Bronze);
        assert_eq!(tier_for(1000, &rules), Tier::Silver);
        assert_eq!(tier_for(4999, &rules), Tier::Silver);
        assert_eq!(tier_for(5000, &rules), Tier::Gold);
        assert_eq!(tier_for(10_000, &rules), Tier::Platinum);
        assert_eq!(tier_for(1_000_000, &rules), Tier::Platinum);
    }

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::Bronze < Tier::Silver);
        assert!(Tier::Silver < Tier::Gold);
        assert!(Tier::Gold < Tier::Platinum);
    }

    #[test]
    fn test_tier_string_round_trip() {
        for tier in [Tier::Bronze, Tier::Silver, Tier::Gold, Tier::Platinum] {
            assert_eq!(Tier::from_level(tier.as_str()), tier);
        }
        // Unknown stored values fall back to Bronze rather than failing
        assert_eq!(Tier::from_level("MYTHRIL"), Tier::Bronze);
    }

    #[tokio::test]
    async fn test_promotion_persists_and_sets_expiry() -> crate::errors::Result<()> {
        use sea_orm::EntityTrait;

        let db = setup_test_db().await?;
        let account = create_test_account(&db, 1, 1).await?;

        // Push lifetime points over the SILVER threshold directly
        let mut active = sea_orm::IntoActiveModel::into_active_model(account.clone());
        active.lifetime_points = Set(1500);
        let account = active.update(&db).await?;

        let now = Utc::now();
        let promoted = update_tier_level(&db, &account, &TierRules::default(), now).await?;
        assert_eq!(promoted, Some(Tier::Silver));

        let stored = LoyaltyAccount::find_by_id(account.id).one(&db).await?.ok_or(
            crate::errors::Error::AccountNotFound {
                id: account.id.to_string(),
            },
        )?;
        assert_eq!(stored.tier_level, "SILVER");
        let expiry = stored.tier_expiry_date.ok_or(crate::errors::Error::Config {
            message: "expected expiry".to_string(),
        })?;
        assert!(expiry > now + Duration::days(364));

        Ok(())
    }

    #[tokio::test]
    async fn test_no_automatic_downgrade() -> crate::errors::Result<()> {
        let db = setup_test_db().await?;
        let account = create_test_account(&db, 1, 1).await?;

        // Account holds GOLD from a previous period but lifetime points only
        // justify SILVER under the current thresholds
        let mut active = sea_orm::IntoActiveModel::into_active_model(account);
        active.tier_level = Set("GOLD".to_string());
        active.lifetime_points = Set(1200);
        let account = active.update(&db).await?;

        let changed =
            update_tier_level(&db, &account, &TierRules::default(), Utc::now()).await?;
        assert_eq!(changed, None);

        Ok(())
    }

    #[tokio::test]
    async fn test_recalculate_tier_unknown_account() -> crate::errors::Result<()> {
        let db = setup_test_db().await?;
        let result = recalculate_tier(&db, 999, &TierRules::default(), Utc::now()).await;
        assert!(matches!(
            result,
            Err(crate::errors::Error::AccountNotFound { .. })
        ));
        Ok(())
    }
}
