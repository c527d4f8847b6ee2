//! Role and status enums for users and orders.

use serde::{Deserialize, Serialize};

/// Role of the current session.
///
/// The remote API reports this as the user's `userType`. `Guest` is never sent
/// by the API; it stands for "no identity".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Not signed in.
    #[default]
    Guest,
    /// Buyer: owns a cart, places orders, writes reviews.
    Customer,
    /// Seller: lists items and fulfills orders.
    Farmer,
    /// Administrator: manages prices and listings.
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Guest => write!(f, "guest"),
            Self::Customer => write!(f, "customer"),
            Self::Farmer => write!(f, "farmer"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "guest" => Ok(Self::Guest),
            "customer" => Ok(Self::Customer),
            "farmer" => Ok(Self::Farmer),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// Order lifecycle status.
///
/// Farmers advance an order one step at a time; customers may cancel while it
/// is still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Pending,
        Self::Confirmed,
        Self::Preparing,
        Self::Ready,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// The status a farmer moves this order to next, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Confirmed),
            Self::Confirmed => Some(Self::Preparing),
            Self::Preparing => Some(Self::Ready),
            Self::Ready => Some(Self::Shipped),
            Self::Shipped => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled => None,
        }
    }

    /// Whether the order has reached the end of its lifecycle.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether a customer may still cancel.
    #[must_use]
    pub const fn can_cancel(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether the customer may review the order's products.
    #[must_use]
    pub const fn can_review(self) -> bool {
        matches!(self, Self::Delivered)
    }

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [Role::Guest, Role::Customer, Role::Farmer, Role::Admin] {
            assert_eq!(role.to_string().parse::<Role>(), Ok(role));
        }
        assert_eq!("Farmer".parse::<Role>(), Ok(Role::Farmer));
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_farmer_progression_reaches_delivered() {
        let mut status = OrderStatus::Pending;
        let mut steps = 0;
        while let Some(next) = status.next() {
            status = next;
            steps += 1;
        }
        assert_eq!(status, OrderStatus::Delivered);
        assert_eq!(steps, 5);
        assert!(OrderStatus::Cancelled.next().is_none());
    }

    #[test]
    fn test_customer_permissions() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(!OrderStatus::Confirmed.can_cancel());
        assert!(OrderStatus::Delivered.can_review());
        assert!(!OrderStatus::Shipped.can_review());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&OrderStatus::Preparing).unwrap();
        assert_eq!(json, "\"preparing\"");
        assert_eq!("shipped".parse::<OrderStatus>(), Ok(OrderStatus::Shipped));
    }
}
