//! Error types for the settlecore engines.
//!
//! All errors use the `SC_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Lifecycle / registry errors
//! - 2xx: Balance and custody errors
//! - 3xx: Atomic swap errors
//! - 4xx: Pool errors
//! - 5xx: Routing errors
//! - 9xx: General / internal errors
//!
//! Every variant is returned before any state is mutated, so callers can
//! treat an error as "nothing happened" and decide whether to retry.

use thiserror::Error;

use crate::VenueId;

/// Central error enum for all settlecore operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettleError {
    // =================================================================
    // Lifecycle / Registry Errors (1xx)
    // =================================================================
    /// The registry has not been initialized yet.
    #[error("SC_ERR_100: Not initialized")]
    NotInitialized,

    /// The registry or pool already exists.
    #[error("SC_ERR_101: Already initialized")]
    AlreadyInitialized,

    /// The requested swap, pool or venue does not exist.
    #[error("SC_ERR_102: Not found: {what}")]
    NotFound { what: String },

    /// The caller is not the participant, initiator or admin the operation requires.
    #[error("SC_ERR_103: Not authorized")]
    NotAuthorized,

    // =================================================================
    // Balance / Custody Errors (2xx)
    // =================================================================
    /// An amount that must be positive was zero.
    #[error("SC_ERR_200: Amount must be greater than zero")]
    ZeroAmount,

    /// The source account lacks enough unencumbered balance.
    #[error("SC_ERR_201: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u64, available: u64 },

    /// Two coins of different assets were combined.
    #[error("SC_ERR_202: Asset mismatch: expected {expected}, got {actual}")]
    AssetMismatch { expected: String, actual: String },

    /// An intermediate product or sum could not be represented.
    #[error("SC_ERR_203: Arithmetic overflow")]
    ArithmeticOverflow,

    // =================================================================
    // Swap Errors (3xx)
    // =================================================================
    /// The swap was already completed or cancelled.
    #[error("SC_ERR_300: Swap already completed or cancelled")]
    AlreadyTerminal,

    /// The swap timeout has passed; only the initiator's cancel remains.
    #[error("SC_ERR_301: Swap expired")]
    SwapExpired,

    /// The swap cannot be cancelled before its timeout.
    #[error("SC_ERR_302: Swap not expired yet")]
    SwapNotExpired,

    // =================================================================
    // Pool Errors (4xx)
    // =================================================================
    /// Output fell below the caller's minimum.
    #[error("SC_ERR_400: Slippage exceeded: min {min_amount_out}, got {amount_out}")]
    SlippageExceeded { min_amount_out: u64, amount_out: u64 },

    /// The trade would drain a reserve or the reserve is empty.
    #[error("SC_ERR_401: Insufficient liquidity")]
    InsufficientLiquidity,

    // =================================================================
    // Routing Errors (5xx)
    // =================================================================
    /// The venue id is not part of the registry.
    #[error("SC_ERR_500: Invalid venue id: {0}")]
    InvalidVenueId(VenueId),

    /// No enabled venue returned a positive output.
    #[error("SC_ERR_501: No routes found")]
    NoRoutesFound,

    /// The venue is disabled, has no liquidity or rejected execution.
    #[error("SC_ERR_502: Venue unavailable: {0}")]
    VenueUnavailable(VenueId),

    /// More fees requested than the registry has on its books.
    #[error("SC_ERR_503: Insufficient fees: requested {requested}, available {available}")]
    InsufficientFees { requested: u64, available: u64 },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("SC_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("SC_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid fee, empty venue list, etc.).
    #[error("SC_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// Ledger balances plus engine custody no longer equal minted supply.
    #[error("SC_ERR_903: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },
}

impl SettleError {
    /// Shorthand for [`SettleError::NotFound`].
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, SettleError>;

impl From<serde_json::Error> for SettleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = SettleError::not_found("swap:3");
        let msg = format!("{err}");
        assert!(msg.starts_with("SC_ERR_102"), "Got: {msg}");
        assert!(msg.contains("swap:3"));
    }

    #[test]
    fn insufficient_balance_display() {
        let err = SettleError::InsufficientBalance {
            needed: 100,
            available: 50,
        };
        let msg = format!("{err}");
        assert!(msg.contains("SC_ERR_201"));
        assert!(msg.contains("100"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn venue_errors_show_venue() {
        let msg = format!("{}", SettleError::VenueUnavailable(VenueId(4)));
        assert!(msg.contains("venue:4"));
    }

    #[test]
    fn all_errors_have_sc_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(SettleError::NotInitialized),
            Box::new(SettleError::AlreadyTerminal),
            Box::new(SettleError::SwapExpired),
            Box::new(SettleError::SwapNotExpired),
            Box::new(SettleError::NoRoutesFound),
            Box::new(SettleError::Internal("test".into())),
            Box::new(SettleError::SlippageExceeded {
                min_amount_out: 10,
                amount_out: 9,
            }),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("SC_ERR_"),
                "Error missing SC_ERR_ prefix: {msg}"
            );
        }
    }
}
