//! Unified error types and result handling for the loyalty ledger.
//!
//! Every fallible operation in the crate returns [`Result`]. The error enum
//! distinguishes client-caused failures (insufficient points, unknown
//! account, invalid transfer) from system-caused ones (storage errors), so
//! the API layer can map them to the right status codes.

use thiserror::Error;

/// All errors the loyalty ledger can produce.
#[derive(Debug, Error)]
pub enum Error {
    /// Operation referenced a customer/brand pair with no loyalty account
    /// and no auto-create path.
    #[error("Loyalty account not found: {id}")]
    AccountNotFound {
        /// The account id (or customer/brand pair) that was looked up
        id: String,
    },

    /// A spend, redemption, or transfer would drive the balance negative.
    #[error("Insufficient points: have {current}, need {required}")]
    InsufficientPoints {
        /// Points currently on the account
        current: i64,
        /// Points the operation required
        required: i64,
    },

    /// The requested reward is inactive or outside its validity window.
    #[error("Reward unavailable: {reason}")]
    RewardUnavailable {
        /// Why the reward cannot be redeemed right now
        reason: String,
    },

    /// The reward's limited stock has been fully consumed.
    #[error("Reward stock exhausted")]
    StockExhausted,

    /// Branch re-attribution request is malformed (same source and
    /// destination, or branches of different brands).
    #[error("Invalid transfer: {message}")]
    InvalidTransfer {
        /// What made the transfer invalid
        message: String,
    },

    /// A points amount whose sign or magnitude violates the transaction
    /// type contract (for example a negative `earn`, or zero points).
    #[error("Invalid points amount: {points}")]
    InvalidPoints {
        /// The offending signed amount
        points: i64,
    },

    /// An order-completion event that cannot be processed (no customer
    /// attached, or a branch unknown to the directory).
    #[error("Invalid order: {message}")]
    InvalidOrder {
        /// What made the order unprocessable
        message: String,
    },

    /// Optimistic concurrency control lost the race too many times.
    /// The caller may retry the whole operation.
    #[error("Concurrent update conflict on account {account_id}")]
    Conflict {
        /// Account whose balance row was contended
        account_id: i64,
    },

    /// Configuration file or settings payload problem.
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description
        message: String,
    },

    /// Underlying storage failure; the atomic unit has been rolled back.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O error (config file reads, socket binding).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error was caused by the client's request rather than
    /// a system failure. Used by the API layer for status-code mapping.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::AccountNotFound { .. }
                | Self::InsufficientPoints { .. }
                | Self::RewardUnavailable { .. }
                | Self::StockExhausted
                | Self::InvalidTransfer { .. }
                | Self::InvalidPoints { .. }
                | Self::InvalidOrder { .. }
        )
    }
}

/// Convenience `Result` type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(
            Error::InsufficientPoints {
                current: 10,
                required: 50
            }
            .is_client_error()
        );
        assert!(
            Error::AccountNotFound {
                id: "7".to_string()
            }
            .is_client_error()
        );
        assert!(Error::StockExhausted.is_client_error());
        assert!(!Error::Conflict { account_id: 1 }.is_client_error());
        assert!(
            !Error::Config {
                message: "bad".to_string()
            }
            .is_client_error()
        );
    }

    #[test]
    fn test_error_display() {
        let err = Error::InsufficientPoints {
            current: 100,
            required: 250,
        };
        assert_eq!(err.to_string(), "Insufficient points: have 100, need 250");
    }
}
