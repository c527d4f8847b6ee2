//! Catalog, search and user lookup endpoints.

use tracing::{instrument, warn};

use farmerspot_core::{ItemId, UserId};

use super::{ApiClient, ApiError, Item, UserProfile};

impl ApiClient {
    /// List all catalog items.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server declines it.
    #[instrument(skip(self))]
    pub async fn list_items(&self) -> Result<Vec<Item>, ApiError> {
        let items: Option<Vec<Item>> = self.get(&["items"]).await?;
        Ok(items.unwrap_or_default())
    }

    /// Get a single catalog item.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` if the item no longer exists.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn get_item(&self, item_id: &ItemId) -> Result<Item, ApiError> {
        self.get(&["item", item_id.as_str()]).await
    }

    /// Get the public profile of a user (e.g., the farmer behind a listing).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the user does not exist.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_user(&self, user_id: &UserId) -> Result<UserProfile, ApiError> {
        self.get(&["user", user_id.as_str()]).await
    }

    /// Full-text search over the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server declines it.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<Item>, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let items: Option<Vec<Item>> = self.get(&["search", query]).await?;
        Ok(items.unwrap_or_default())
    }

    /// Product-name suggestions for a partial query.
    ///
    /// Suggestions are best effort: any failure yields an empty list.
    #[instrument(skip(self))]
    pub async fn autocomplete(&self, query: &str) -> Vec<String> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        match self
            .get::<Option<Vec<String>>>(&["search", "autocomplete", query])
            .await
        {
            Ok(suggestions) => suggestions.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Autocomplete failed");
                Vec::new()
            }
        }
    }
}
