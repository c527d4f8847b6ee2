//! Unified error handling for storefront operations.
//!
//! Every public operation returns `Result<T, StorefrontError>`. The variants
//! match what the user is told: a transient network notice, the server's
//! reason for declining, a redirect for a role-gated action, a local input
//! problem caught before any request was made, or a checkout that stopped
//! after placing some orders. See [`crate::notice`] for the
//! translation into user-visible notices.

use thiserror::Error;

use farmerspot_core::Role;

use crate::api::{ApiError, Order};

/// Storefront-level error type.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Transport failure or unreadable response. Local state is untouched.
    #[error("Network error: {0}")]
    Network(String),

    /// The server understood the request but declined it.
    #[error("{0}")]
    MutationRejected(String),

    /// Role-gated action attempted without the required role.
    #[error("Requires {required} access")]
    Authorization {
        /// Role the action needs.
        required: Role,
        /// Where the caller should be sent instead.
        redirect_to: &'static str,
    },

    /// Input rejected locally, no request was made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Checkout failed part way. The orders in `placed` exist on the server;
    /// retrying the whole checkout would place them again.
    #[error("Placed {} order(s) before checkout stopped: {source}", .placed.len())]
    PartialCheckout {
        placed: Vec<Order>,
        #[source]
        source: Box<StorefrontError>,
    },
}

impl StorefrontError {
    /// Whether retrying the same operation might succeed.
    ///
    /// A partial checkout never is: some of its orders already exist.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Redirect target for authorization failures.
    #[must_use]
    pub const fn redirect(&self) -> Option<&'static str> {
        match self {
            Self::Authorization { redirect_to, .. } => Some(redirect_to),
            _ => None,
        }
    }
}

impl From<ApiError> for StorefrontError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Rejected { message, .. } => Self::MutationRejected(message),
            other => Self::Network(other.to_string()),
        }
    }
}

/// Convenience alias.
pub type Result<T, E = StorefrontError> = std::result::Result<T, E>;
