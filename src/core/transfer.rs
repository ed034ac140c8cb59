//! Transfer coordinator - Moves point attribution between branches.
//!
//! A transfer reattributes points from one branch to another within the same
//! brand account. It is recorded as a `transfer_out` / `transfer_in` pair in
//! a single atomic unit, so the ledger always shows both legs or neither.
//! The account's total balance is unchanged by a transfer, and neither leg
//! touches `lifetime_points`.

use crate::core::account;
use crate::core::ledger::{self, TransactionType, MAX_APPEND_ATTEMPTS, RETRY_BACKOFF_MS};
use crate::core::BranchDirectory;
use crate::entities::{loyalty_account, point_transaction};
use crate::errors::{Error, Result};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, IntoActiveModel, Set, TransactionTrait};
use serde::Serialize;
use serde_json::json;
use tracing::info;

/// The recorded legs of a completed transfer.
#[derive(Debug, Clone, Serialize)]
pub struct TransferOutcome {
    /// The debit leg at the source branch
    pub out_entry: point_transaction::Model,
    /// The credit leg at the destination branch
    pub in_entry: point_transaction::Model,
    /// The account after both legs
    pub account: loyalty_account::Model,
}

/// Moves `points` of branch attribution from `from_branch_id` to
/// `to_branch_id` on the given account.
///
/// Both branches must belong to the account's brand. The two ledger legs
/// commit together; the destination branch becomes the account's preferred
/// branch. Retries the whole unit on balance contention.
pub async fn transfer_branch_attribution(
    db: &DatabaseConnection,
    branches: &impl BranchDirectory,
    account_id: i64,
    from_branch_id: i64,
    to_branch_id: i64,
    points: i64,
    reason: Option<String>,
) -> Result<TransferOutcome> {
    if points <= 0 {
        return Err(Error::InvalidTransfer {
            message: format!("transfer amount must be positive, got {points}"),
        });
    }
    if from_branch_id == to_branch_id {
        return Err(Error::InvalidTransfer {
            message: "source and destination branch are the same".to_string(),
        });
    }

    for attempt in 1..=MAX_APPEND_ATTEMPTS {
        let txn = db.begin().await?;
        match transfer_in_txn(
            &txn,
            branches,
            account_id,
            from_branch_id,
            to_branch_id,
            points,
            reason.as_deref(),
        )
        .await
        {
            Ok(outcome) => {
                txn.commit().await?;
                info!(
                    account_id,
                    from_branch_id, to_branch_id, points, "Branch attribution transferred"
                );
                return Ok(outcome);
            }
            Err(Error::Conflict { .. }) if attempt < MAX_APPEND_ATTEMPTS => {
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

    Err(Error::Conflict { account_id })
}

async fn transfer_in_txn<C>(
    db: &C,
    branches: &impl BranchDirectory,
    account_id: i64,
    from_branch_id: i64,
    to_branch_id: i64,
    points: i64,
    reason: Option<&str>,
) -> Result<TransferOutcome>
where
    C: ConnectionTrait,
{
    let account = account::get_account(db, account_id).await?;

    for branch_id in [from_branch_id, to_branch_id] {
        match branches.brand_of(branch_id) {
            Some(brand_id) if brand_id == account.brand_id => {}
            Some(_) => {
                return Err(Error::InvalidTransfer {
                    message: format!(
                        "branch {branch_id} does not belong to brand {}",
                        account.brand_id
                    ),
                });
            }
            None => {
                return Err(Error::InvalidTransfer {
                    message: format!("unknown branch {branch_id}"),
                });
            }
        }
    }

    if account.current_points < points {
        return Err(Error::InsufficientPoints {
            current: account.current_points,
            required: points,
        });
    }

    let description = match reason {
        Some(reason) => format!("Branch transfer: {reason}"),
        None => "Branch transfer".to_string(),
    };
    let metadata = json!({
        "from_branch_id": from_branch_id,
        "to_branch_id": to_branch_id,
    });

    let (out_entry, account) = ledger::append_in_txn(
        db,
        &account,
        Some(from_branch_id),
        TransactionType::TransferOut,
        -points,
        None,
        description.clone(),
        Some(metadata.clone()),
    )
    .await?;

    // The in leg reads the balance the out leg left behind, so the pair nets
    // to zero in balance_after terms.
    let (in_entry, account) = ledger::append_in_txn(
        db,
        &account,
        Some(to_branch_id),
        TransactionType::TransferIn,
        points,
        None,
        description,
        Some(metadata),
    )
    .await?;

    let mut active = account.into_active_model();
    active.preferred_branch_id = Set(Some(to_branch_id));
    active.updated_at = Set(Utc::now());
    let account = active.update(db).await?;

    Ok(TransferOutcome {
        out_entry,
        in_entry,
        account,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::verify_balance;
    use crate::test_utils::{
        create_test_account_with_points, setup_test_db, test_branch_directory,
    };

    #[tokio::test]
    async fn test_transfer_records_both_legs() -> Result<()> {
        let db = setup_test_db().await?;
        let branches = test_branch_directory();
        let account = create_test_account_with_points(&db, 1, 1, 500).await?;

        let outcome =
            transfer_branch_attribution(&db, &branches, account.id, 10, 11, 200, None).await?;

        assert_eq!(outcome.out_entry.points, -200);
        assert_eq!(outcome.out_entry.branch_id, Some(10));
        assert_eq!(outcome.out_entry.balance_after, 300);

        assert_eq!(outcome.in_entry.points, 200);
        assert_eq!(outcome.in_entry.branch_id, Some(11));
        assert_eq!(outcome.in_entry.balance_after, 500);

        // Net balance unchanged, lifetime untouched, history replayable
        assert_eq!(outcome.account.current_points, 500);
        assert_eq!(outcome.account.lifetime_points, 500);
        assert_eq!(outcome.account.preferred_branch_id, Some(11));
        assert!(verify_balance(&db, account.id).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_rejects_nonpositive_points() -> Result<()> {
        let db = setup_test_db().await?;
        let branches = test_branch_directory();
        let account = create_test_account_with_points(&db, 1, 1, 500).await?;

        for points in [0, -50] {
            let result =
                transfer_branch_attribution(&db, &branches, account.id, 10, 11, points, None).await;
            assert!(matches!(result, Err(Error::InvalidTransfer { .. })));
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_rejects_same_branch() -> Result<()> {
        let db = setup_test_db().await?;
        let branches = test_branch_directory();
        let account = create_test_account_with_points(&db, 1, 1, 500).await?;

        let result =
            transfer_branch_attribution(&db, &branches, account.id, 10, 10, 100, None).await;
        assert!(matches!(result, Err(Error::InvalidTransfer { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_rejects_foreign_brand_branch() -> Result<()> {
        let db = setup_test_db().await?;
        let branches = test_branch_directory();
        let account = create_test_account_with_points(&db, 1, 1, 500).await?;

        // Branch 20 belongs to brand 2 in the test directory
        let result =
            transfer_branch_attribution(&db, &branches, account.id, 10, 20, 100, None).await;
        assert!(matches!(result, Err(Error::InvalidTransfer { .. })));

        let result =
            transfer_branch_attribution(&db, &branches, account.id, 99, 11, 100, None).await;
        assert!(matches!(result, Err(Error::InvalidTransfer { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_rejects_insufficient_points() -> Result<()> {
        let db = setup_test_db().await?;
        let branches = test_branch_directory();
        let account = create_test_account_with_points(&db, 1, 1, 100).await?;

        let result =
            transfer_branch_attribution(&db, &branches, account.id, 10, 11, 500, None).await;
        assert!(matches!(
            result,
            Err(Error::InsufficientPoints {
                current: 100,
                required: 500
            })
        ));

        // Neither leg was written
        let (entries, total) =
            ledger::transactions_for_account(&db, account.id, 10, 0).await?;
        assert_eq!(total, 1); // only the seed credit
        assert_eq!(entries.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_reason_in_description() -> Result<()> {
        let db = setup_test_db().await?;
        let branches = test_branch_directory();
        let account = create_test_account_with_points(&db, 1, 1, 500).await?;

        let outcome = transfer_branch_attribution(
            &db,
            &branches,
            account.id,
            10,
            11,
            50,
            Some("relocation".to_string()),
        )
        .await?;
        assert_eq!(outcome.out_entry.description, "Branch transfer: relocation");
        assert_eq!(outcome.in_entry.description, "Branch transfer: relocation");

        Ok(())
    }
}
