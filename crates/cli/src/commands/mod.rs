//! Command implementations.

pub mod cart;
pub mod catalog;
pub mod orders;
pub mod session;

use std::io::Write;

use secrecy::SecretString;
use serde::Serialize;
use thiserror::Error;

use farmerspot_storefront::api::ApiError;
use farmerspot_storefront::config::StorefrontConfig;
use farmerspot_storefront::{Storefront, StorefrontError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The HTTP client could not be built.
    #[error("Client error: {0}")]
    Client(#[from] ApiError),

    /// The storefront declined or failed the operation.
    #[error(transparent)]
    Storefront(#[from] StorefrontError),

    /// Email or password not given.
    #[error("Missing credentials: pass --email/--password or set FARMERSPOT_EMAIL/FARMERSPOT_PASSWORD")]
    MissingCredentials,

    /// Argument could not be parsed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Writing output failed.
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    /// Serializing output failed.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Credentials from flags or environment.
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<SecretString>,
}

/// Build the storefront context.
///
/// # Errors
///
/// Returns `CommandError::Client` if the HTTP client cannot be built.
pub fn connect(config: StorefrontConfig) -> Result<Storefront, CommandError> {
    Ok(Storefront::new(config)?)
}

/// Write `value` to stdout as pretty JSON.
fn emit(value: &impl Serialize) -> Result<(), CommandError> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
