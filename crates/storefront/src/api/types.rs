//! Wire types for the remote storefront API.
//!
//! Field names follow the API's camelCase JSON; document IDs arrive as `_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use farmerspot_core::{ItemId, OrderId, OrderStatus, Price, ReviewId, Role, UserId};

/// Uniform response wrapper used by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    /// 200 on success, anything else is a business failure.
    pub status_code: u16,
    /// Human-readable outcome; carries the failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Payload.
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// A successful envelope around `data`.
    pub fn ok(data: T) -> Self {
        Self {
            status_code: super::STATUS_OK,
            message: Some("Success".to_string()),
            data: Some(data),
        }
    }

    /// A failed envelope with a reason.
    pub fn rejected(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: Some(message.into()),
            data: None,
        }
    }
}

// =============================================================================
// Users
// =============================================================================

/// A user record as returned by login, signup and profile lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// User ID.
    #[serde(rename = "_id")]
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Account type.
    #[serde(default)]
    pub user_type: Role,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

// =============================================================================
// Catalog
// =============================================================================

/// A catalog listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Item ID.
    #[serde(rename = "_id")]
    pub id: ItemId,
    /// Product name.
    pub name: String,
    /// Price per kilogram.
    pub price: Price,
    /// Image URLs, first one is the cover.
    #[serde(default)]
    pub images: Vec<String>,
    /// Farmer who listed the item.
    pub listed_by: UserId,
    /// When the item was listed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listed_at: Option<DateTime<Utc>>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Kilograms in stock, when the farmer tracks it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
}

// =============================================================================
// Orders
// =============================================================================

/// A single product line inside an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Product ordered.
    pub product_id: ItemId,
    /// Product name at order time.
    pub name: String,
    /// Unit price at order time.
    pub price: Price,
    /// Kilograms ordered.
    pub quantity: u32,
    /// `price * quantity`.
    pub subtotal: Price,
}

/// An order placed with a single farmer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order ID.
    #[serde(rename = "_id")]
    pub id: OrderId,
    /// Buyer.
    pub customer_id: UserId,
    /// Seller.
    pub farmer_id: UserId,
    /// Ordered products.
    #[serde(default)]
    pub items: Vec<OrderItem>,
    /// Sum of subtotals plus delivery.
    pub total_amount: Price,
    /// Lifecycle status.
    #[serde(default)]
    pub status: OrderStatus,
    /// Payment method chosen at checkout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    /// Delivery fee.
    #[serde(default)]
    pub delivery_fee: Price,
    /// Free-form notes from the customer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Request body for creating an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub customer_id: UserId,
    pub farmer_id: UserId,
    pub items: Vec<OrderItem>,
    pub total_amount: Price,
    pub payment_method: String,
    pub delivery_address: String,
    pub delivery_fee: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Body for a farmer status change.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct StatusChange<'a> {
    pub status: OrderStatus,
    pub note: &'a str,
}

/// Body for a customer cancellation.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Cancellation<'a> {
    pub reason: &'a str,
}

/// Aggregates shown on the farmer dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FarmerStats {
    pub total_orders: u32,
    pub pending_orders: u32,
    pub completed_orders: u32,
    pub total_revenue: Price,
}

// =============================================================================
// Reviews
// =============================================================================

/// A product review left by a customer after delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Review ID (absent on submission).
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ReviewId>,
    pub order_id: OrderId,
    pub customer_id: UserId,
    pub product_id: ItemId,
    pub farmer_id: UserId,
    /// Star rating, 1 to 5.
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

/// Whether a customer may review an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEligibility {
    pub can_review: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// =============================================================================
// Admin
// =============================================================================

/// Result of a single price change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceChange {
    pub old_price: Price,
    pub new_price: Price,
}

/// One entry of a bulk price update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdate {
    pub item_id: ItemId,
    pub price: Price,
}

/// Outcome of a bulk price update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BulkPriceSummary {
    /// Number of items whose price changed.
    pub updated: u32,
    /// Items the server could not update.
    pub failed: Vec<ItemId>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_item_from_api_json() {
        let json = r#"{
            "_id": "65a1",
            "name": "Yam",
            "price": 1200,
            "images": ["https://cdn/yam.jpg"],
            "listedBy": "f-9",
            "listedAt": "2024-03-01T10:00:00.000Z",
            "__v": 0
        }"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, ItemId::new("65a1"));
        assert_eq!(item.price, Price::from_naira(1200));
        assert_eq!(item.listed_by, UserId::new("f-9"));
        assert!(item.listed_at.is_some());
        assert!(item.stock.is_none());
    }

    #[test]
    fn test_user_type_maps_to_role() {
        let json = r#"{"_id":"u1","name":"Ada","userType":"farmer"}"#;
        let user: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(user.user_type, Role::Farmer);
    }

    #[test]
    fn test_order_defaults() {
        let json = r#"{
            "_id": "o1",
            "customerId": "c1",
            "farmerId": "f1",
            "totalAmount": 500
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.items.is_empty());
        assert_eq!(order.delivery_fee, Price::ZERO);
    }

    #[test]
    fn test_review_serializes_without_id() {
        let review = Review {
            id: None,
            order_id: OrderId::new("o1"),
            customer_id: UserId::new("c1"),
            product_id: ItemId::new("i1"),
            farmer_id: UserId::new("f1"),
            rating: 5,
            comment: "Fresh".to_string(),
        };
        let value = serde_json::to_value(&review).unwrap();
        assert!(value.get("_id").is_none());
        assert_eq!(value["orderId"], "o1");
    }
}
