//! Review endpoints.

use tracing::instrument;

use farmerspot_core::{ItemId, OrderId, UserId};

use super::{ApiClient, ApiError, Review, ReviewEligibility};

impl ApiClient {
    /// Submit a review.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` if the order was already reviewed or is
    /// not delivered yet.
    #[instrument(skip(self, review), fields(order_id = %review.order_id))]
    pub async fn create_review(&self, review: &Review) -> Result<Review, ApiError> {
        self.post(&["review", "create"], review).await
    }

    /// Reviews of a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server declines it.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn product_reviews(&self, product_id: &ItemId) -> Result<Vec<Review>, ApiError> {
        let reviews: Option<Vec<Review>> = self
            .get(&["review", "product", product_id.as_str()])
            .await?;
        Ok(reviews.unwrap_or_default())
    }

    /// Reviews received by a farmer.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server declines it.
    #[instrument(skip(self), fields(farmer_id = %farmer_id))]
    pub async fn farmer_reviews(&self, farmer_id: &UserId) -> Result<Vec<Review>, ApiError> {
        let reviews: Option<Vec<Review>> = self
            .get(&["review", "farmer", farmer_id.as_str()])
            .await?;
        Ok(reviews.unwrap_or_default())
    }

    /// Whether a customer may review an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server declines it.
    #[instrument(skip(self), fields(order_id = %order_id, customer_id = %customer_id))]
    pub async fn can_review_order(
        &self,
        order_id: &OrderId,
        customer_id: &UserId,
    ) -> Result<ReviewEligibility, ApiError> {
        self.get(&[
            "review",
            "can-review",
            order_id.as_str(),
            customer_id.as_str(),
        ])
        .await
    }
}
