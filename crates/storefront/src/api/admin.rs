//! Admin pricing and listing endpoints.
//!
//! The server re-checks `adminId`; role gating on this side only keeps
//! non-admin sessions from issuing the calls.

use serde::Serialize;
use serde::de::IgnoredAny;
use tracing::instrument;

use farmerspot_core::{ItemId, Price, UserId};

use super::{ApiClient, ApiError, BulkPriceSummary, PriceChange, PriceUpdate};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PriceBody<'a> {
    item_id: &'a ItemId,
    admin_id: &'a UserId,
    price: Price,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkPriceBody<'a> {
    admin_id: &'a UserId,
    updates: &'a [PriceUpdate],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteItemBody<'a> {
    item_id: &'a ItemId,
    admin_id: &'a UserId,
}

impl ApiClient {
    /// Change the price of one item.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` if the caller is not an admin or the item
    /// does not exist.
    #[instrument(skip(self), fields(item_id = %item_id, price = %price))]
    pub async fn update_item_price(
        &self,
        admin_id: &UserId,
        item_id: &ItemId,
        price: Price,
    ) -> Result<PriceChange, ApiError> {
        let body = PriceBody {
            item_id,
            admin_id,
            price,
        };
        self.post(&["admin", "updatePrice"], &body).await
    }

    /// Change the prices of many items at once.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server declines it.
    #[instrument(skip(self, updates), fields(count = updates.len()))]
    pub async fn bulk_update_prices(
        &self,
        admin_id: &UserId,
        updates: &[PriceUpdate],
    ) -> Result<BulkPriceSummary, ApiError> {
        let body = BulkPriceBody { admin_id, updates };
        let summary: Option<BulkPriceSummary> =
            self.post(&["admin", "bulkUpdatePrices"], &body).await?;
        Ok(summary.unwrap_or_default())
    }

    /// Delete a listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server declines it.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn delete_item(&self, admin_id: &UserId, item_id: &ItemId) -> Result<(), ApiError> {
        let body = DeleteItemBody { item_id, admin_id };
        self.post::<_, IgnoredAny>(&["admin", "deleteItem"], &body)
            .await?;
        Ok(())
    }
}
