//! Signed-in identity and role gating.
//!
//! One writer (the login/logout flow), many readers. Readers get a cloned
//! [`SessionIdentity`]; nothing outside this module can change it.

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::info;

use farmerspot_core::{Role, UserId};

use crate::api::UserProfile;
use crate::error::{Result, StorefrontError};
use crate::query_cache::{QueryCache, QueryKey, keys};

/// Where guests are sent when an action needs an identity.
pub const LOGIN_REDIRECT: &str = "/auth";

/// Where signed-in users are sent when their role does not fit.
pub const SHOP_REDIRECT: &str = "/shop";

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    /// User ID.
    pub user_id: UserId,
    /// Account role.
    pub role: Role,
    /// Name shown in navigation.
    pub display_name: String,
}

impl From<UserProfile> for SessionIdentity {
    fn from(profile: UserProfile) -> Self {
        Self {
            user_id: profile.id,
            role: profile.user_type,
            display_name: profile.name,
        }
    }
}

/// Shared session state. Clones observe the same identity.
#[derive(Debug, Clone, Default)]
pub struct Session {
    identity: Arc<RwLock<Option<SessionIdentity>>>,
}

impl Session {
    /// A session with nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A session already signed in as `identity`.
    #[must_use]
    pub fn signed_in(identity: SessionIdentity) -> Self {
        Self {
            identity: Arc::new(RwLock::new(Some(identity))),
        }
    }

    /// The current identity, if any.
    #[must_use]
    pub fn identity(&self) -> Option<SessionIdentity> {
        self.identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current role; `Guest` when nobody is signed in.
    #[must_use]
    pub fn role(&self) -> Role {
        self.identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(Role::Guest, |identity| identity.role)
    }

    /// Whether the current role is exactly `role`.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.role() == role
    }

    /// Whether anybody is signed in.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.role() != Role::Guest
    }

    /// Whether the signed-in user is `user_id` (a farmer viewing their own listing).
    #[must_use]
    pub fn is_owner(&self, user_id: &UserId) -> bool {
        self.identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|identity| &identity.user_id == user_id)
    }

    /// The identity, provided it has `role`.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Authorization` redirecting guests to the login
    /// page and everyone else back to the shop.
    pub fn require_role(&self, role: Role) -> Result<SessionIdentity> {
        match self.identity() {
            Some(identity) if identity.role == role => Ok(identity),
            Some(_) => Err(StorefrontError::Authorization {
                required: role,
                redirect_to: SHOP_REDIRECT,
            }),
            None => Err(StorefrontError::Authorization {
                required: role,
                redirect_to: LOGIN_REDIRECT,
            }),
        }
    }

    /// Record a successful login or signup.
    pub fn sign_in(&self, identity: SessionIdentity) {
        info!(user_id = %identity.user_id, role = %identity.role, "Signed in");
        *self.identity.write().unwrap_or_else(PoisonError::into_inner) = Some(identity);
    }

    /// Clear the identity and drop every identity-scoped query.
    pub async fn sign_out(&self, cache: &QueryCache) {
        let previous = self
            .identity
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        for key in keys::IDENTITY_SCOPED {
            cache.invalidate(&QueryKey::root(key)).await;
        }

        if let Some(identity) = previous {
            info!(user_id = %identity.user_id, "Signed out");
        }
    }
}
