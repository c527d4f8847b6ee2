//! Order dashboards and checkout grouping.
//!
//! Checkout splits a cart into one order per farmer; dashboards summarize and
//! filter the orders a customer has placed.

use serde::Serialize;

use farmerspot_core::{OrderStatus, Price, UserId};

use crate::api::{Item, NewOrder, Order, OrderItem};

/// Counts shown at the top of the customer dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrderStats {
    pub total: usize,
    pub pending: usize,
    pub delivered: usize,
    pub cancelled: usize,
}

impl OrderStats {
    /// Tally `orders` by status.
    #[must_use]
    pub fn from_orders(orders: &[Order]) -> Self {
        orders.iter().fold(
            Self {
                total: orders.len(),
                ..Self::default()
            },
            |mut stats, order| {
                match order.status {
                    OrderStatus::Pending => stats.pending += 1,
                    OrderStatus::Delivered => stats.delivered += 1,
                    OrderStatus::Cancelled => stats.cancelled += 1,
                    _ => {}
                }
                stats
            },
        )
    }
}

/// Orders with `status`, or every order when `status` is `None` ("all").
#[must_use]
pub fn filter_by_status(orders: &[Order], status: Option<OrderStatus>) -> Vec<&Order> {
    orders
        .iter()
        .filter(|order| status.is_none_or(|wanted| order.status == wanted))
        .collect()
}

/// A cart line resolved against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutLine {
    pub item: Item,
    pub quantity: u32,
}

/// One farmer's share of a checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub farmer_id: UserId,
    pub items: Vec<OrderItem>,
}

impl OrderDraft {
    /// Sum of the line subtotals.
    #[must_use]
    pub fn total_amount(&self) -> Price {
        self.items.iter().map(|item| item.subtotal).sum()
    }

    /// The request body for placing this draft.
    #[must_use]
    pub fn into_new_order(
        self,
        customer_id: UserId,
        payment_method: &str,
        delivery_address: &str,
        notes: Option<String>,
    ) -> NewOrder {
        let total_amount = self.total_amount();
        NewOrder {
            customer_id,
            farmer_id: self.farmer_id,
            items: self.items,
            total_amount,
            payment_method: payment_method.to_string(),
            delivery_address: delivery_address.to_string(),
            delivery_fee: Price::ZERO,
            notes,
        }
    }
}

/// Split checkout lines into one draft per farmer.
///
/// Drafts appear in the order their farmer first appears in `lines`; lines
/// keep their relative order within a draft.
#[must_use]
pub fn group_by_farmer(lines: &[CheckoutLine]) -> Vec<OrderDraft> {
    let mut drafts: Vec<OrderDraft> = Vec::new();

    for line in lines.iter().filter(|line| line.quantity > 0) {
        let order_item = OrderItem {
            product_id: line.item.id.clone(),
            name: line.item.name.clone(),
            price: line.item.price,
            quantity: line.quantity,
            subtotal: line.item.price * line.quantity,
        };

        match drafts
            .iter_mut()
            .find(|draft| draft.farmer_id == line.item.listed_by)
        {
            Some(draft) => draft.items.push(order_item),
            None => drafts.push(OrderDraft {
                farmer_id: line.item.listed_by.clone(),
                items: vec![order_item],
            }),
        }
    }

    drafts
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use farmerspot_core::{ItemId, OrderId};

    use super::*;

    fn item(id: &str, farmer: &str, naira: u64) -> Item {
        Item {
            id: ItemId::new(id),
            name: format!("Item {id}"),
            price: Price::from_naira(naira),
            images: Vec::new(),
            listed_by: UserId::new(farmer),
            listed_at: None,
            description: None,
            category: None,
            stock: None,
        }
    }

    fn order(id: &str, status: OrderStatus) -> Order {
        Order {
            id: OrderId::new(id),
            customer_id: UserId::new("c1"),
            farmer_id: UserId::new("f1"),
            items: Vec::new(),
            total_amount: Price::ZERO,
            status,
            payment_method: None,
            delivery_fee: Price::ZERO,
            notes: None,
            created_at: None,
        }
    }

    #[test]
    fn test_group_by_farmer() {
        let lines = vec![
            CheckoutLine { item: item("yam", "f1", 1200), quantity: 2 },
            CheckoutLine { item: item("rice", "f2", 800), quantity: 1 },
            CheckoutLine { item: item("beans", "f1", 500), quantity: 3 },
        ];

        let drafts = group_by_farmer(&lines);

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].farmer_id, UserId::new("f1"));
        assert_eq!(drafts[0].items.len(), 2);
        assert_eq!(drafts[0].total_amount(), Price::from_naira(2400 + 1500));
        assert_eq!(drafts[1].total_amount(), Price::from_naira(800));
    }

    #[test]
    fn test_draft_into_new_order() {
        let drafts = group_by_farmer(&[CheckoutLine { item: item("yam", "f1", 1000), quantity: 2 }]);
        let draft = drafts.into_iter().next().unwrap();

        let order = draft.into_new_order(UserId::new("c1"), "cash", "1 Market Rd", None);

        assert_eq!(order.total_amount, Price::from_naira(2000));
        assert_eq!(order.delivery_fee, Price::ZERO);
        assert_eq!(order.items[0].subtotal, Price::from_naira(2000));
    }

    #[test]
    fn test_stats_and_filter() {
        let orders = vec![
            order("1", OrderStatus::Pending),
            order("2", OrderStatus::Delivered),
            order("3", OrderStatus::Pending),
            order("4", OrderStatus::Cancelled),
            order("5", OrderStatus::Shipped),
        ];

        let stats = OrderStats::from_orders(&orders);
        assert_eq!(
            stats,
            OrderStats { total: 5, pending: 2, delivered: 1, cancelled: 1 }
        );

        assert_eq!(filter_by_status(&orders, Some(OrderStatus::Pending)).len(), 2);
        assert_eq!(filter_by_status(&orders, None).len(), 5);
        assert!(filter_by_status(&orders, Some(OrderStatus::Ready)).is_empty());
    }
}
