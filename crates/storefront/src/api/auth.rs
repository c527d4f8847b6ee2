//! Login and signup endpoints.
//!
//! Session issuance belongs to the remote API; these calls only exchange
//! credentials for the user record that seeds [`crate::session::SessionIdentity`].

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::instrument;

use farmerspot_core::Role;

use super::{ApiClient, ApiError, UserProfile};

/// Registration details for a new account.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub phone: String,
    pub user_type: Role,
    pub latitude: f64,
    pub longitude: f64,
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("phone", &self.phone)
            .field("user_type", &self.user_type)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignupBody<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
    phone: &'a str,
    user_type: Role,
    latitude: f64,
    longitude: f64,
}

impl ApiClient {
    /// Exchange credentials for the user record.
    ///
    /// Emails are matched case-insensitively, so they are lowercased first.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` for invalid credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<UserProfile, ApiError> {
        let email = email.trim().to_lowercase();
        let body = LoginBody {
            email: &email,
            password: password.expose_secret(),
        };
        self.post(&["user", "login"], &body).await
    }

    /// Register a new account and return its user record.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` if the server declines the registration.
    #[instrument(skip(self, account), fields(email = %account.email))]
    pub async fn signup(&self, account: &NewAccount) -> Result<UserProfile, ApiError> {
        let email = account.email.trim().to_lowercase();
        let body = SignupBody {
            name: &account.name,
            email: &email,
            password: account.password.expose_secret(),
            phone: &account.phone,
            user_type: account.user_type,
            latitude: account.latitude,
            longitude: account.longitude,
        };
        self.post(&["user", "signup"], &body).await
    }
}
