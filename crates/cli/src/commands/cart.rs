//! Cart commands.
//!
//! Each mutation logs the cart count as the observer sees it, so optimistic
//! changes and rollbacks are visible in the log.

use serde::Serialize;

use farmerspot_core::ItemId;
use farmerspot_storefront::Storefront;
use farmerspot_storefront::cart::{CartLine, SubscriptionGuard};

use super::{CommandError, emit};

#[derive(Serialize)]
struct CartView<'a> {
    lines: &'a [CartLine],
    count: u32,
}

fn watch(storefront: &Storefront) -> SubscriptionGuard {
    storefront
        .cart()
        .subscribe(|n| tracing::info!(count = n.new_count, "Cart count changed"))
        .guard()
}

fn print_cart(storefront: &Storefront) -> Result<(), CommandError> {
    let snapshot = storefront.cart().snapshot();
    emit(&CartView {
        lines: snapshot.lines(),
        count: storefront.cart().count(),
    })
}

/// Print the cart.
///
/// # Errors
///
/// Returns the fetch error.
pub async fn show(storefront: &Storefront) -> Result<(), CommandError> {
    storefront.cart().refresh().await?;
    print_cart(storefront)
}

/// Add units of an item.
///
/// # Errors
///
/// Returns the server's rejection or a network error.
pub async fn add(storefront: &Storefront, item_id: &str, quantity: u32) -> Result<(), CommandError> {
    let _watch = watch(storefront);
    storefront
        .cart()
        .add_item(&ItemId::new(item_id), quantity)
        .await?;
    print_cart(storefront)
}

/// Set an item's count.
///
/// # Errors
///
/// Returns the server's rejection or a network error, after rollback.
pub async fn set(storefront: &Storefront, item_id: &str, count: u32) -> Result<(), CommandError> {
    let _watch = watch(storefront);
    storefront
        .cart()
        .update_quantity(&ItemId::new(item_id), count)
        .await?;
    print_cart(storefront)
}

/// Remove an item.
///
/// # Errors
///
/// Returns the server's rejection or a network error, after rollback.
pub async fn remove(storefront: &Storefront, item_id: &str) -> Result<(), CommandError> {
    let _watch = watch(storefront);
    storefront.cart().remove_item(&ItemId::new(item_id)).await?;
    print_cart(storefront)
}
