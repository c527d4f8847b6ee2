//! Checkout, fulfilment and reviews across customer and farmer sessions.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use farmerspot_core::{ItemId, OrderId, OrderStatus, Price, UserId};
use farmerspot_integration_tests::{CUSTOMER_EMAIL, FARMER_EMAIL, FakeApi, password};
use farmerspot_storefront::orders::OrderStats;
use farmerspot_storefront::{CheckoutDetails, Storefront, StorefrontError};

fn details() -> CheckoutDetails {
    CheckoutDetails {
        payment_method: "cash".to_string(),
        delivery_address: "12 Market Road, Ibadan".to_string(),
        notes: None,
    }
}

async fn customer(api: &FakeApi) -> Storefront {
    let storefront = api.storefront();
    storefront.login(CUSTOMER_EMAIL, &password()).await.unwrap();
    storefront
}

async fn farmer(api: &FakeApi) -> Storefront {
    let storefront = api.storefront();
    storefront.login(FARMER_EMAIL, &password()).await.unwrap();
    storefront
}

/// Place a single order for two yams from farmer `f1`.
async fn place_yam_order(api: &FakeApi, storefront: &Storefront) -> OrderId {
    api.seed_cart("c1", &[("yam", 2)]);
    storefront.cart().refresh().await.unwrap();
    let lines = storefront.checkout_lines().await.unwrap();
    let orders = storefront.place_orders(&lines, &details()).await.unwrap();
    orders[0].id.clone()
}

#[tokio::test]
async fn test_checkout_splits_orders_by_farmer() {
    let api = FakeApi::start().await;
    api.seed_cart("c1", &[("yam", 2), ("plantain", 1), ("rice", 3)]);
    let storefront = customer(&api).await;

    let lines = storefront.checkout_lines().await.unwrap();
    assert_eq!(lines.len(), 3);

    let orders = storefront.place_orders(&lines, &details()).await.unwrap();

    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].farmer_id, UserId::new("f1"));
    assert_eq!(orders[0].items.len(), 2);
    assert_eq!(orders[0].total_amount, Price::from_naira(2 * 1200 + 3 * 800));
    assert_eq!(orders[1].farmer_id, UserId::new("f2"));
    assert_eq!(orders[1].total_amount, Price::from_naira(600));
    assert!(orders.iter().all(|o| o.status == OrderStatus::Pending));
    assert_eq!(storefront.cart().count(), 0);

    let mine = storefront.my_orders().await.unwrap();
    assert_eq!(OrderStats::from_orders(&mine).pending, 2);
}

#[tokio::test]
async fn test_checkout_failure_reports_placed_orders() {
    let api = FakeApi::start().await;
    api.seed_cart("c1", &[("yam", 2), ("plantain", 1)]);
    api.close_farm("f2");
    let storefront = customer(&api).await;
    assert!(storefront.my_orders().await.unwrap().is_empty());

    let lines = storefront.checkout_lines().await.unwrap();
    let err = storefront.place_orders(&lines, &details()).await.unwrap_err();

    let StorefrontError::PartialCheckout { placed, source } = err else {
        panic!("expected a partial checkout, got {err:?}");
    };
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].farmer_id, UserId::new("f1"));
    assert_eq!(source.to_string(), "Farmer is not accepting orders");
    assert_eq!(api.order_status(&placed[0].id), Some(OrderStatus::Pending));

    // The orders query was invalidated; the cart was not cleared.
    assert_eq!(storefront.my_orders().await.unwrap().len(), 1);
    assert_eq!(storefront.cart().count(), 3);
}

#[tokio::test]
async fn test_first_order_failure_is_returned_as_is() {
    let api = FakeApi::start().await;
    api.seed_cart("c1", &[("yam", 2)]);
    api.close_farm("f1");
    let storefront = customer(&api).await;

    let lines = storefront.checkout_lines().await.unwrap();
    let err = storefront.place_orders(&lines, &details()).await.unwrap_err();

    assert!(matches!(err, StorefrontError::MutationRejected(ref m) if m == "Farmer is not accepting orders"));
    assert_eq!(storefront.cart().count(), 2);
}

#[tokio::test]
async fn test_empty_checkout_is_invalid() {
    let api = FakeApi::start().await;
    let storefront = customer(&api).await;

    let lines = storefront.checkout_lines().await.unwrap();
    let err = storefront.place_orders(&lines, &details()).await.unwrap_err();

    assert!(matches!(err, StorefrontError::InvalidInput(_)));
}

#[tokio::test]
async fn test_farmer_advances_and_customer_sees_update() {
    let api = FakeApi::start().await;
    let buyer = customer(&api).await;
    let order_id = place_yam_order(&api, &buyer).await;
    // Prime the customer's order cache before the farmer acts.
    assert_eq!(buyer.my_orders().await.unwrap()[0].status, OrderStatus::Pending);

    let seller = farmer(&api).await;
    assert_eq!(seller.farmer_orders().await.unwrap().len(), 1);
    let advanced = seller.advance_order(&order_id, "Packed").await.unwrap();
    assert_eq!(advanced.status, OrderStatus::Confirmed);
    assert_eq!(api.order_status(&order_id), Some(OrderStatus::Confirmed));

    // The farmer's own dashboard was invalidated by the mutation.
    let stats = seller.farmer_stats().await.unwrap();
    assert_eq!(stats.total_orders, 1);
    assert_eq!(stats.pending_orders, 0);

    // Separate sessions keep separate caches until they invalidate.
    assert_eq!(buyer.my_orders().await.unwrap()[0].status, OrderStatus::Pending);
    buyer.cache().invalidate_all().await;
    assert_eq!(buyer.my_orders().await.unwrap()[0].status, OrderStatus::Confirmed);
}

#[tokio::test]
async fn test_cancel_only_while_pending() {
    let api = FakeApi::start().await;
    let buyer = customer(&api).await;
    let first = place_yam_order(&api, &buyer).await;
    let second = place_yam_order(&api, &buyer).await;

    let cancelled = buyer.cancel_order(&first, "Changed my mind").await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    farmer(&api).await.advance_order(&second, "").await.unwrap();
    let err = buyer.cancel_order(&second, "Too late").await.unwrap_err();
    assert!(matches!(err, StorefrontError::InvalidInput(_)));
    assert_eq!(api.order_status(&second), Some(OrderStatus::Confirmed));
}

#[tokio::test]
async fn test_advance_stops_at_delivered() {
    let api = FakeApi::start().await;
    let buyer = customer(&api).await;
    let order_id = place_yam_order(&api, &buyer).await;
    let seller = farmer(&api).await;

    let mut status = OrderStatus::Pending;
    while let Some(next) = status.next() {
        status = seller.advance_order(&order_id, "").await.unwrap().status;
        assert_eq!(status, next);
    }
    assert_eq!(status, OrderStatus::Delivered);

    let err = seller.advance_order(&order_id, "").await.unwrap_err();
    assert!(matches!(err, StorefrontError::InvalidInput(_)));
}

#[tokio::test]
async fn test_review_requires_delivery() {
    let api = FakeApi::start().await;
    let buyer = customer(&api).await;
    let order_id = place_yam_order(&api, &buyer).await;
    let yam = ItemId::new("yam");

    let err = buyer
        .submit_review(&order_id, &yam, 5, "Lovely")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Order has not been delivered yet");

    let seller = farmer(&api).await;
    while api.order_status(&order_id) != Some(OrderStatus::Delivered) {
        seller.advance_order(&order_id, "").await.unwrap();
    }

    let review = buyer
        .submit_review(&order_id, &yam, 5, "  Lovely yams  ")
        .await
        .unwrap();
    assert!(review.id.is_some());
    assert_eq!(review.farmer_id, UserId::new("f1"));
    assert_eq!(review.comment, "Lovely yams");

    assert_eq!(buyer.product_reviews(&yam).await.unwrap().len(), 1);
    assert_eq!(buyer.farmer_reviews(&UserId::new("f1")).await.unwrap().len(), 1);

    let again = buyer
        .submit_review(&order_id, &yam, 4, "Still lovely")
        .await
        .unwrap_err();
    assert!(matches!(again, StorefrontError::MutationRejected(_)));
}

#[tokio::test]
async fn test_order_operations_are_role_gated() {
    let api = FakeApi::start().await;
    let buyer = customer(&api).await;
    let order_id = place_yam_order(&api, &buyer).await;

    let err = buyer.advance_order(&order_id, "").await.unwrap_err();
    assert_eq!(err.redirect(), Some("/shop"));

    let seller = farmer(&api).await;
    assert!(seller.my_orders().await.is_err());
    assert!(seller.cancel_order(&order_id, "").await.is_err());

    let guest = api.storefront();
    let err = guest.farmer_orders().await.unwrap_err();
    assert_eq!(err.redirect(), Some("/auth"));
}
