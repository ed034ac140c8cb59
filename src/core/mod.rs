//! Core business logic - framework-agnostic ledger, campaign, tier,
//! redemption, and transfer operations.
//!
//! Every balance-affecting operation in this module runs as a single atomic
//! unit: one database transaction that appends the ledger entry (or entries)
//! and updates the account row via compare-and-swap on `current_points`.
//! Conflicting writers are retried a bounded number of times before
//! surfacing [`Error::Conflict`](crate::errors::Error::Conflict).

pub mod account;
pub mod campaign;
pub mod ledger;
pub mod order;
pub mod policy;
pub mod redemption;
pub mod tier;
pub mod transfer;

/// Branch → brand lookup, owned by the menu subsystem and consumed here.
///
/// The ledger needs to know which brand a branch belongs to in order to
/// resolve the loyalty account for an order and to reject cross-brand
/// transfers. The production implementation is
/// [`StaticBranchDirectory`](crate::config::settings::StaticBranchDirectory),
/// seeded from config.toml; tests build one from literal pairs.
pub trait BranchDirectory {
    /// Returns the brand a branch belongs to, or `None` if the branch is
    /// unknown.
    fn brand_of(&self, branch_id: i64) -> Option<i64>;
}
