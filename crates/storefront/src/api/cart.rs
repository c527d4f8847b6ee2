//! Cart endpoints (never cached - mutable state).

use serde::Serialize;
use serde::de::IgnoredAny;
use tracing::instrument;

use farmerspot_core::{ItemId, UserId};

use super::{ApiClient, ApiError};
use crate::cart::CartLine;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CartLineBody<'a> {
    user_id: &'a UserId,
    item_id: &'a ItemId,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<u32>,
}

impl ApiClient {
    /// Fetch the full cart of a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server declines it.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_cart(&self, user_id: &UserId) -> Result<Vec<CartLine>, ApiError> {
        let lines: Option<Vec<CartLine>> = self.get(&["cart", user_id.as_str()]).await?;
        Ok(lines.unwrap_or_default())
    }

    /// Add `count` units of an item to a user's cart.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` if the item is unavailable.
    #[instrument(skip(self), fields(user_id = %user_id, item_id = %item_id))]
    pub async fn add_to_cart(
        &self,
        user_id: &UserId,
        item_id: &ItemId,
        count: u32,
    ) -> Result<(), ApiError> {
        let body = CartLineBody {
            user_id,
            item_id,
            count: Some(count),
        };
        self.post::<_, IgnoredAny>(&["cart", "add"], &body).await?;
        Ok(())
    }

    /// Set the quantity of an item already in the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server declines it.
    #[instrument(skip(self), fields(user_id = %user_id, item_id = %item_id))]
    pub async fn update_cart(
        &self,
        user_id: &UserId,
        item_id: &ItemId,
        count: u32,
    ) -> Result<(), ApiError> {
        let body = CartLineBody {
            user_id,
            item_id,
            count: Some(count),
        };
        self.post::<_, IgnoredAny>(&["cart", "update"], &body).await?;
        Ok(())
    }

    /// Remove an item from the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server declines it.
    #[instrument(skip(self), fields(user_id = %user_id, item_id = %item_id))]
    pub async fn remove_from_cart(&self, user_id: &UserId, item_id: &ItemId) -> Result<(), ApiError> {
        let body = CartLineBody {
            user_id,
            item_id,
            count: None,
        };
        self.post::<_, IgnoredAny>(&["cart", "remove"], &body).await?;
        Ok(())
    }
}
