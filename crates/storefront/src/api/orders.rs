//! Order endpoints.

use tracing::instrument;

use farmerspot_core::{OrderId, OrderStatus, UserId};

use super::types::{Cancellation, StatusChange};
use super::{ApiClient, ApiError, FarmerStats, NewOrder, Order};

impl ApiClient {
    /// Place an order with a single farmer.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server declines it.
    #[instrument(skip(self, order), fields(farmer_id = %order.farmer_id))]
    pub async fn create_order(&self, order: &NewOrder) -> Result<Order, ApiError> {
        self.post(&["orders", "create"], order).await
    }

    /// Orders placed by a customer.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server declines it.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn customer_orders(&self, customer_id: &UserId) -> Result<Vec<Order>, ApiError> {
        let orders: Option<Vec<Order>> = self
            .get(&["orders", "customer", customer_id.as_str()])
            .await?;
        Ok(orders.unwrap_or_default())
    }

    /// Orders received by a farmer.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server declines it.
    #[instrument(skip(self), fields(farmer_id = %farmer_id))]
    pub async fn farmer_orders(&self, farmer_id: &UserId) -> Result<Vec<Order>, ApiError> {
        let orders: Option<Vec<Order>> =
            self.get(&["orders", "farmer", farmer_id.as_str()]).await?;
        Ok(orders.unwrap_or_default())
    }

    /// Dashboard aggregates for a farmer.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server declines it.
    #[instrument(skip(self), fields(farmer_id = %farmer_id))]
    pub async fn farmer_stats(&self, farmer_id: &UserId) -> Result<FarmerStats, ApiError> {
        let stats: Option<FarmerStats> = self
            .get(&["orders", "farmer", farmer_id.as_str(), "stats"])
            .await?;
        Ok(stats.unwrap_or_default())
    }

    /// A single order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` if the order does not exist.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: &OrderId) -> Result<Order, ApiError> {
        self.get(&["orders", order_id.as_str()]).await
    }

    /// Move an order to a new status.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` if the transition is not allowed.
    #[instrument(skip(self, note), fields(order_id = %order_id, status = %status))]
    pub async fn update_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
        note: &str,
    ) -> Result<Order, ApiError> {
        let body = StatusChange { status, note };
        self.patch(&["orders", order_id.as_str(), "status"], &body)
            .await
    }

    /// Cancel an order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` if the order can no longer be cancelled.
    #[instrument(skip(self, reason), fields(order_id = %order_id))]
    pub async fn cancel_order(&self, order_id: &OrderId, reason: &str) -> Result<Order, ApiError> {
        let body = Cancellation { reason };
        self.post(&["orders", order_id.as_str(), "cancel"], &body)
            .await
    }
}
