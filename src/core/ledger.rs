//! Transaction ledger - Append-only point movements with atomic balance updates.
//!
//! Every ledger-affecting operation funnels through [`append_in_txn`]: inside
//! one database transaction it re-reads the account, rejects anything that
//! would drive the balance negative, inserts the transaction row carrying a
//! `balance_after` snapshot, and updates the account row with a
//! compare-and-swap on `current_points`. A CAS miss means another writer got
//! in between; the public entry points roll back and retry a bounded number
//! of times before surfacing `Conflict`. Replaying an account's entries in
//! creation order therefore always reconstructs its balance exactly.

use crate::entities::{
    LoyaltyAccount, PointTransaction, loyalty_account, point_transaction,
};
use crate::errors::{Error, Result};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, info, warn};

/// How many times a conflicting append is retried before giving up.
pub const MAX_APPEND_ATTEMPTS: u32 = 3;

/// Base backoff between retries; multiplied by the attempt number.
pub(crate) const RETRY_BACKOFF_MS: u64 = 20;

/// The kind of point movement a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    /// Points earned from an order (base + campaign bonuses)
    Earn,
    /// Points spent on a discount or reward
    Spend,
    /// Promotional bonus outside an order's earn entry (welcome bonus)
    Bonus,
    /// Administrative credit
    ManualAdd,
    /// Administrative debit
    ManualDeduct,
    /// Branch re-attribution, receiving side
    TransferIn,
    /// Branch re-attribution, giving side
    TransferOut,
}

impl TransactionType {
    /// The stable string form stored in `point_transactions.transaction_type`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Earn => "earn",
            Self::Spend => "spend",
            Self::Bonus => "bonus",
            Self::ManualAdd => "manual_add",
            Self::ManualDeduct => "manual_deduct",
            Self::TransferIn => "transfer_in",
            Self::TransferOut => "transfer_out",
        }
    }

    /// Whether entries of this type carry a non-negative delta.
    #[must_use]
    pub const fn is_credit(self) -> bool {
        matches!(
            self,
            Self::Earn | Self::Bonus | Self::ManualAdd | Self::TransferIn
        )
    }

    /// Whether entries of this type grow `lifetime_points`. Transfers move
    /// attribution, not value, so they never touch the lifetime total.
    #[must_use]
    pub const fn affects_lifetime(self) -> bool {
        matches!(self, Self::Earn | Self::Bonus | Self::ManualAdd)
    }

    /// Validates that a signed delta matches this type's direction.
    pub const fn validate_points(self, points: i64) -> Result<()> {
        let ok = if self.is_credit() {
            points >= 0
        } else {
            points <= 0
        };
        if ok { Ok(()) } else { Err(Error::InvalidPoints { points }) }
    }
}

/// Looks up an existing earn/spend entry for an order - the idempotency key.
///
/// Order completion may be re-delivered; `(account_id, order_id, type)`
/// identifies the entry it would create, and finding one means the work was
/// already done.
pub async fn find_order_entry<C>(
    db: &C,
    account_id: i64,
    order_id: i64,
    transaction_type: TransactionType,
) -> Result<Option<point_transaction::Model>>
where
    C: ConnectionTrait,
{
    PointTransaction::find()
        .filter(point_transaction::Column::AccountId.eq(account_id))
        .filter(point_transaction::Column::OrderId.eq(order_id))
        .filter(point_transaction::Column::TransactionType.eq(transaction_type.as_str()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Appends one ledger entry inside a caller-owned transaction.
///
/// Validates the sign contract, rejects `InsufficientPoints` when the delta
/// would push the balance below zero, inserts the row with its
/// `balance_after` snapshot, and compare-and-swaps the account row against
/// the balance the caller observed. Returns the inserted entry together with
/// the refreshed account; on [`Error::Conflict`] the caller must roll back
/// the whole transaction.
#[allow(clippy::too_many_arguments)]
pub async fn append_in_txn<C>(
    db: &C,
    account: &loyalty_account::Model,
    branch_id: Option<i64>,
    transaction_type: TransactionType,
    points: i64,
    order_id: Option<i64>,
    description: String,
    metadata: Option<serde_json::Value>,
) -> Result<(point_transaction::Model, loyalty_account::Model)>
where
    C: ConnectionTrait,
{
    transaction_type.validate_points(points)?;

    let new_balance = account.current_points + points;
    if new_balance < 0 {
        return Err(Error::InsufficientPoints {
            current: account.current_points,
            required: -points,
        });
    }

    let lifetime_delta = if transaction_type.affects_lifetime() {
        points
    } else {
        0
    };
    let now = Utc::now();

    let entry = point_transaction::ActiveModel {
        account_id: Set(account.id),
        branch_id: Set(branch_id),
        order_id: Set(order_id),
        transaction_type: Set(transaction_type.as_str().to_string()),
        points: Set(points),
        balance_after: Set(new_balance),
        description: Set(description),
        metadata: Set(metadata),
        created_at: Set(now),
        ..Default::default()
    };
    let entry = entry.insert(db).await?;

    // CAS on current_points: if another writer moved the balance since the
    // caller read it, zero rows match and the whole unit must be retried.
    let update = LoyaltyAccount::update_many()
        .col_expr(loyalty_account::Column::CurrentPoints, Expr::value(new_balance))
        .col_expr(
            loyalty_account::Column::LifetimePoints,
            Expr::value(account.lifetime_points + lifetime_delta),
        )
        .col_expr(loyalty_account::Column::UpdatedAt, Expr::value(now))
        .filter(loyalty_account::Column::Id.eq(account.id))
        .filter(loyalty_account::Column::CurrentPoints.eq(account.current_points))
        .exec(db)
        .await?;

    if update.rows_affected == 0 {
        warn!(
            account_id = account.id,
            expected_balance = account.current_points,
            "Balance moved under us, append must be retried"
        );
        return Err(Error::Conflict {
            account_id: account.id,
        });
    }

    let refreshed = LoyaltyAccount::find_by_id(account.id)
        .one(db)
        .await?
        .ok_or_else(|| Error::AccountNotFound {
            id: account.id.to_string(),
        })?;

    debug!(
        account_id = account.id,
        transaction_id = entry.id,
        transaction_type = transaction_type.as_str(),
        points,
        balance_after = new_balance,
        "Ledger entry appended"
    );

    Ok((entry, refreshed))
}

/// Appends one ledger entry as its own atomic unit, with bounded retry.
///
/// This is the single-operation entry point (manual adjustments, welcome
/// bonuses issued outside an order flow). Earn/spend entries carrying an
/// order id are de-duplicated: re-delivery returns the existing entry
/// without touching the balance.
#[allow(clippy::too_many_arguments)]
pub async fn append(
    db: &DatabaseConnection,
    account_id: i64,
    branch_id: Option<i64>,
    transaction_type: TransactionType,
    points: i64,
    order_id: Option<i64>,
    description: String,
    metadata: Option<serde_json::Value>,
) -> Result<point_transaction::Model> {
    transaction_type.validate_points(points)?;

    for attempt in 1..=MAX_APPEND_ATTEMPTS {
        let txn = db.begin().await?;

        let account = LoyaltyAccount::find_by_id(account_id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::AccountNotFound {
                id: account_id.to_string(),
            })?;

        if let Some(order_id) = order_id {
            if matches!(
                transaction_type,
                TransactionType::Earn | TransactionType::Spend
            ) {
                if let Some(existing) =
                    find_order_entry(&txn, account_id, order_id, transaction_type).await?
                {
                    txn.commit().await?;
                    info!(
                        account_id,
                        order_id,
                        transaction_id = existing.id,
                        "Duplicate order entry, returning existing"
                    );
                    return Ok(existing);
                }
            }
        }

        let result = append_in_txn(
            &txn,
            &account,
            branch_id,
            transaction_type,
            points,
            order_id,
            description.clone(),
            metadata.clone(),
        )
        .await;

        match result {
            Ok((entry, _)) => {
                txn.commit().await?;
                return Ok(entry);
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

/// Records an administrative point correction (`manual_add` for positive
/// deltas, `manual_deduct` for negative ones).
pub async fn manual_adjust(
    db: &DatabaseConnection,
    account_id: i64,
    branch_id: Option<i64>,
    points: i64,
    description: String,
) -> Result<point_transaction::Model> {
    if points == 0 {
        return Err(Error::InvalidPoints { points });
    }
    let transaction_type = if points > 0 {
        TransactionType::ManualAdd
    } else {
        TransactionType::ManualDeduct
    };

    append(
        db,
        account_id,
        branch_id,
        transaction_type,
        points,
        None,
        description,
        None,
    )
    .await
}

/// Returns a page of an account's ledger, newest first, plus the total count.
pub async fn transactions_for_account(
    db: &DatabaseConnection,
    account_id: i64,
    limit: u64,
    offset: u64,
) -> Result<(Vec<point_transaction::Model>, u64)> {
    let filter = point_transaction::Column::AccountId.eq(account_id);

    let total = PointTransaction::find().filter(filter.clone()).count(db).await?;

    let transactions = PointTransaction::find()
        .filter(filter)
        .order_by_desc(point_transaction::Column::CreatedAt)
        .order_by_desc(point_transaction::Column::Id)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await?;

    Ok((transactions, total))
}

/// Audit check: replays the account's ledger in creation order and verifies
/// every `balance_after` snapshot plus the terminal `current_points`.
pub async fn verify_balance(db: &DatabaseConnection, account_id: i64) -> Result<bool> {
    let account = LoyaltyAccount::find_by_id(account_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::AccountNotFound {
            id: account_id.to_string(),
        })?;

    let entries = PointTransaction::find()
        .filter(point_transaction::Column::AccountId.eq(account_id))
        .order_by_asc(point_transaction::Column::Id)
        .all(db)
        .await?;

    let mut running = 0i64;
    for entry in &entries {
        running += entry.points;
        if entry.balance_after != running {
            warn!(
                account_id,
                transaction_id = entry.id,
                snapshot = entry.balance_after,
                replayed = running,
                "Ledger snapshot diverges from replay"
            );
            return Ok(false);
        }
    }

    if running != account.current_points {
        warn!(
            account_id,
            replayed = running,
            current_points = account.current_points,
            "Account balance diverges from ledger sum"
        );
        return Ok(false);
    }

    Ok(true)
}
