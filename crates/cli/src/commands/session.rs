//! Session commands.

use farmerspot_storefront::Storefront;

use super::{CommandError, Credentials, emit};

/// Log in with the given credentials and print the identity.
///
/// # Errors
///
/// Returns `CommandError::MissingCredentials` if either credential is absent,
/// or the login failure.
pub async fn login(storefront: &Storefront, credentials: &Credentials) -> Result<(), CommandError> {
    let (Some(email), Some(password)) = (&credentials.email, &credentials.password) else {
        return Err(CommandError::MissingCredentials);
    };

    let identity = storefront.login(email, password).await?;
    tracing::info!(user_id = %identity.user_id, role = %identity.role, "Logged in");
    emit(&identity)
}
