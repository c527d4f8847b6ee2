//! Server side of the cart, as the synchronization core sees it.

use std::future::Future;

use farmerspot_core::{ItemId, UserId};

use super::snapshot::CartLine;
use crate::api::{ApiClient, ApiError};

/// Persistence calls the cart core relies on.
///
/// Implemented by [`ApiClient`]; tests substitute scripted backends.
pub trait CartBackend: Send + Sync + 'static {
    /// Fetch every line of the user's cart.
    fn fetch_cart(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Vec<CartLine>, ApiError>> + Send;

    /// Add units of an item.
    fn add_line(
        &self,
        user_id: &UserId,
        item_id: &ItemId,
        quantity: u32,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Set an item's count (never zero).
    fn set_line(
        &self,
        user_id: &UserId,
        item_id: &ItemId,
        count: u32,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Drop an item's line.
    fn remove_line(
        &self,
        user_id: &UserId,
        item_id: &ItemId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

impl CartBackend for ApiClient {
    async fn fetch_cart(&self, user_id: &UserId) -> Result<Vec<CartLine>, ApiError> {
        self.get_cart(user_id).await
    }

    async fn add_line(
        &self,
        user_id: &UserId,
        item_id: &ItemId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        self.add_to_cart(user_id, item_id, quantity).await
    }

    async fn set_line(&self, user_id: &UserId, item_id: &ItemId, count: u32) -> Result<(), ApiError> {
        self.update_cart(user_id, item_id, count).await
    }

    async fn remove_line(&self, user_id: &UserId, item_id: &ItemId) -> Result<(), ApiError> {
        self.remove_from_cart(user_id, item_id).await
    }
}
