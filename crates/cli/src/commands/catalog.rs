//! Catalog commands.

use serde::Serialize;

use farmerspot_core::ItemId;
use farmerspot_storefront::Storefront;
use farmerspot_storefront::api::Item;

use super::{CommandError, emit};

#[derive(Serialize)]
struct ItemRow<'a> {
    id: &'a ItemId,
    name: &'a str,
    price: String,
}

impl<'a> From<&'a Item> for ItemRow<'a> {
    fn from(item: &'a Item) -> Self {
        Self {
            id: &item.id,
            name: &item.name,
            price: item.price.per_kg(),
        }
    }
}

fn emit_rows(items: &[Item]) -> Result<(), CommandError> {
    let rows: Vec<ItemRow<'_>> = items.iter().map(ItemRow::from).collect();
    emit(&rows)
}

/// List every item.
///
/// # Errors
///
/// Returns the fetch error.
pub async fn list(storefront: &Storefront) -> Result<(), CommandError> {
    let items = storefront.items().await?;
    emit_rows(&items)
}

/// Show one item with its reviews.
///
/// # Errors
///
/// Returns the fetch error.
pub async fn show(storefront: &Storefront, item_id: &str) -> Result<(), CommandError> {
    let item_id = ItemId::new(item_id);
    let item = storefront.item(&item_id).await?;
    let reviews = storefront.product_reviews(&item_id).await?;
    emit(&serde_json::json!({ "item": item, "reviews": reviews }))
}

/// Search items; falls back to suggestions when nothing matches.
///
/// # Errors
///
/// Returns the search error.
pub async fn search(storefront: &Storefront, query: &str) -> Result<(), CommandError> {
    let items = storefront.search(query).await?;
    if items.is_empty() {
        let suggestions = storefront.autocomplete(query).await;
        tracing::info!(query, suggestions = suggestions.len(), "No results");
        return emit(&serde_json::json!({ "results": [], "suggestions": suggestions }));
    }
    emit_rows(&items)
}
