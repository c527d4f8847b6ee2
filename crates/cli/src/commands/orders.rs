//! Order dashboard commands.

use farmerspot_core::{OrderStatus, Role};
use farmerspot_storefront::Storefront;
use farmerspot_storefront::api::Order;
use farmerspot_storefront::orders::{OrderStats, filter_by_status};

use super::{CommandError, emit};

async fn orders_for_role(storefront: &Storefront) -> Result<Vec<Order>, CommandError> {
    let orders = if storefront.session().has_role(Role::Farmer) {
        storefront.farmer_orders().await?
    } else {
        storefront.my_orders().await?
    };
    Ok(orders)
}

/// List orders, optionally filtered by status.
///
/// # Errors
///
/// Returns `CommandError::InvalidArgument` for an unknown status, or the
/// fetch error.
pub async fn list(storefront: &Storefront, status: Option<&str>) -> Result<(), CommandError> {
    let status = status
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(CommandError::InvalidArgument)?;

    let orders = orders_for_role(storefront).await?;
    emit(&filter_by_status(&orders, status))
}

/// Print order counts. Farmers get the server-side aggregates.
///
/// # Errors
///
/// Returns the fetch error.
pub async fn stats(storefront: &Storefront) -> Result<(), CommandError> {
    if storefront.session().has_role(Role::Farmer) {
        return emit(&storefront.farmer_stats().await?);
    }
    let orders = storefront.my_orders().await?;
    emit(&OrderStats::from_orders(&orders))
}
