//! Admin authorization.
//!
//! An [`Authority`] names the single account allowed to run admin
//! operations on an engine. [`Authority::authorize`] is the only way to
//! obtain an [`AdminToken`], and admin mutations take the token by value,
//! so they cannot be reached without the check having passed first.

use serde::{Deserialize, Serialize};

use crate::{AccountId, Result, SettleError};

/// The stored admin of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    admin: AccountId,
}

impl Authority {
    #[must_use]
    pub fn new(admin: AccountId) -> Self {
        Self { admin }
    }

    #[must_use]
    pub fn admin(&self) -> AccountId {
        self.admin
    }

    /// Check `caller` against the stored admin.
    ///
    /// # Errors
    /// Returns `NotAuthorized` if `caller` is anyone else.
    pub fn authorize(&self, caller: AccountId) -> Result<AdminToken> {
        if caller != self.admin {
            return Err(SettleError::NotAuthorized);
        }
        Ok(AdminToken { admin: self.admin })
    }
}

/// Proof that the caller passed [`Authority::authorize`].
#[derive(Debug)]
pub struct AdminToken {
    admin: AccountId,
}

impl AdminToken {
    #[must_use]
    pub fn admin(&self) -> AccountId {
        self.admin
    }
}
