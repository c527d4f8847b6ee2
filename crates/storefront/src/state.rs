//! Storefront context shared by every view of a session.
//!
//! [`Storefront`] owns the API client, query cache, session and cart. It is
//! created when the session starts and passed to whatever needs it; clones
//! share the same state.

use std::sync::Arc;

use secrecy::SecretString;
use tracing::{info, instrument, warn};

use farmerspot_core::{ItemId, OrderId, Price, Role, UserId};

use crate::api::{
    ApiClient, ApiError, BulkPriceSummary, FarmerStats, Item, NewAccount, Order, PriceChange,
    PriceUpdate, Review, UserProfile,
};
use crate::cart::CartSync;
use crate::config::StorefrontConfig;
use crate::error::{Result, StorefrontError};
use crate::notice;
use crate::orders::{CheckoutLine, group_by_farmer};
use crate::query_cache::{QueryCache, QueryKey, keys};
use crate::session::{Session, SessionIdentity};

/// Number of listings on the landing page's explore strip.
pub const EXPLORE_LIMIT: usize = 4;

/// Checkout details entered by the customer.
#[derive(Debug, Clone)]
pub struct CheckoutDetails {
    pub payment_method: String,
    pub delivery_address: String,
    pub notes: Option<String>,
}

/// Storefront context.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    api: ApiClient,
    cache: QueryCache,
    session: Session,
    cart: CartSync,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("api", &self.inner.api.base_url().as_str())
            .field("session", &self.inner.session.identity())
            .field("cart", &self.inner.cart)
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Create a context with nobody signed in.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config.api)?;
        let cache = QueryCache::new(&config.query_cache);
        let session = Session::new();
        let cart = CartSync::new(api.clone(), session.clone(), cache.clone());

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                api,
                cache,
                session,
                cart,
            }),
        })
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the remote API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the query cache.
    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.inner.cache
    }

    /// Get a reference to the session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Get a reference to the cart.
    #[must_use]
    pub fn cart(&self) -> &CartSync {
        &self.inner.cart
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Log in and load the customer's cart.
    ///
    /// # Errors
    ///
    /// Returns `MutationRejected` for bad credentials, `Network` otherwise.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<SessionIdentity> {
        let profile = self.inner.api.login(email, password).await?;
        Ok(self.start_session(profile).await)
    }

    /// Register and sign in as the new account.
    ///
    /// # Errors
    ///
    /// Returns `MutationRejected` if the server declines the registration.
    #[instrument(skip(self, account), fields(email = %account.email))]
    pub async fn signup(&self, account: &NewAccount) -> Result<SessionIdentity> {
        let profile = self.inner.api.signup(account).await?;
        Ok(self.start_session(profile).await)
    }

    async fn start_session(&self, profile: UserProfile) -> SessionIdentity {
        let identity = SessionIdentity::from(profile);
        // Anything cached for a previous identity is stale now.
        self.inner.session.sign_out(&self.inner.cache).await;
        self.inner.cart.reset();
        self.inner.session.sign_in(identity.clone());
        notice::set_sentry_user(&identity.user_id, &identity.display_name);

        if identity.role == Role::Customer {
            if let Err(e) = self.inner.cart.refresh().await {
                warn!(error = %e, "Initial cart load failed");
            }
        }
        identity
    }

    /// Sign out, drop identity-scoped queries and forget the cart.
    pub async fn logout(&self) {
        self.inner.session.sign_out(&self.inner.cache).await;
        self.inner.cart.reset();
        notice::clear_sentry_user();
    }

    /// Profile of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `Authorization` for guests, or the fetch error.
    pub async fn profile(&self) -> Result<UserProfile> {
        let identity = self.signed_in()?;
        let key = QueryKey::root(keys::PROFILE).with(identity.user_id.as_str());
        let api = &self.inner.api;
        Ok(self
            .inner
            .cache
            .fetch_or_cached(&key, || api.get_user(&identity.user_id))
            .await?)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Every listing.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn items(&self) -> Result<Vec<Item>> {
        let api = &self.inner.api;
        Ok(self
            .inner
            .cache
            .fetch_or_cached(&QueryKey::root(keys::ITEMS), || api.list_items())
            .await?)
    }

    /// The first few listings for the landing page.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn explore(&self) -> Result<Vec<Item>> {
        let api = &self.inner.api;
        Ok(self
            .inner
            .cache
            .fetch_or_cached(&QueryKey::root(keys::EXPLORE), || async {
                let mut items = api.list_items().await?;
                items.truncate(EXPLORE_LIMIT);
                Ok::<_, ApiError>(items)
            })
            .await?)
    }

    /// One listing.
    ///
    /// # Errors
    ///
    /// Returns `MutationRejected` if the item does not exist.
    pub async fn item(&self, item_id: &ItemId) -> Result<Item> {
        let key = QueryKey::root(keys::ITEM).with(item_id.as_str());
        let api = &self.inner.api;
        Ok(self
            .inner
            .cache
            .fetch_or_cached(&key, || api.get_item(item_id))
            .await?)
    }

    /// Full-text search.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn search(&self, query: &str) -> Result<Vec<Item>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let key = QueryKey::root(keys::SEARCH).with(query);
        let api = &self.inner.api;
        Ok(self
            .inner
            .cache
            .fetch_or_cached(&key, || api.search(query))
            .await?)
    }

    /// Search suggestions; empty on any failure.
    pub async fn autocomplete(&self, query: &str) -> Vec<String> {
        self.inner.api.autocomplete(query.trim()).await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Resolve the current cart against the catalog.
    ///
    /// # Errors
    ///
    /// Returns `Authorization` for non-customers, or a fetch error.
    pub async fn checkout_lines(&self) -> Result<Vec<CheckoutLine>> {
        self.require(Role::Customer)?;
        let snapshot = self.inner.cart.snapshot();
        let mut lines = Vec::with_capacity(snapshot.len());
        for line in snapshot.lines() {
            lines.push(CheckoutLine {
                item: self.item(&line.item_id).await?,
                quantity: line.count,
            });
        }
        Ok(lines)
    }

    /// Place one order per farmer for `lines`.
    ///
    /// Orders are placed one at a time and the first failure stops the rest.
    /// On success the cart is cleared locally. After a failure the cart is
    /// kept, but the orders query is still invalidated if anything was placed.
    ///
    /// # Errors
    ///
    /// - `Authorization` for non-customers
    /// - `InvalidInput` when there is nothing to order
    /// - `MutationRejected`/`Network` from the server when the first order fails
    /// - `PartialCheckout` carrying the placed orders when a later one fails
    #[instrument(skip(self, lines, details), fields(lines = lines.len()))]
    pub async fn place_orders(
        &self,
        lines: &[CheckoutLine],
        details: &CheckoutDetails,
    ) -> Result<Vec<Order>> {
        let identity = self.require(Role::Customer)?;
        let drafts = group_by_farmer(lines);
        if drafts.is_empty() {
            return Err(StorefrontError::InvalidInput("your cart is empty".to_string()));
        }

        let mut placed = Vec::with_capacity(drafts.len());
        let mut failure = None;
        for draft in drafts {
            let order = draft.into_new_order(
                identity.user_id.clone(),
                &details.payment_method,
                &details.delivery_address,
                details.notes.clone(),
            );
            match self.inner.api.create_order(&order).await {
                Ok(created) => placed.push(created),
                Err(e) => {
                    failure = Some(StorefrontError::from(e));
                    break;
                }
            }
        }

        if let Some(err) = failure {
            if placed.is_empty() {
                return Err(err);
            }
            self.inner.cache.invalidate(&QueryKey::root(keys::ORDERS)).await;
            warn!(placed = placed.len(), error = %err, "Checkout stopped part way");
            return Err(StorefrontError::PartialCheckout {
                placed,
                source: Box::new(err),
            });
        }

        self.inner
            .cache
            .invalidate_many(&[QueryKey::root(keys::CART), QueryKey::root(keys::ORDERS)])
            .await;
        self.inner.cart.reset();
        info!(orders = placed.len(), "Orders placed");
        Ok(placed)
    }

    /// Orders placed by the signed-in customer.
    ///
    /// # Errors
    ///
    /// Returns `Authorization` for non-customers, or the fetch error.
    pub async fn my_orders(&self) -> Result<Vec<Order>> {
        let identity = self.require(Role::Customer)?;
        let key = QueryKey::new([keys::ORDERS, "customer", identity.user_id.as_str()]);
        let api = &self.inner.api;
        Ok(self
            .inner
            .cache
            .fetch_or_cached(&key, || api.customer_orders(&identity.user_id))
            .await?)
    }

    /// Orders received by the signed-in farmer.
    ///
    /// # Errors
    ///
    /// Returns `Authorization` for non-farmers, or the fetch error.
    pub async fn farmer_orders(&self) -> Result<Vec<Order>> {
        let identity = self.require(Role::Farmer)?;
        let key = QueryKey::new([keys::ORDERS, "farmer", identity.user_id.as_str()]);
        let api = &self.inner.api;
        Ok(self
            .inner
            .cache
            .fetch_or_cached(&key, || api.farmer_orders(&identity.user_id))
            .await?)
    }

    /// Dashboard aggregates for the signed-in farmer.
    ///
    /// # Errors
    ///
    /// Returns `Authorization` for non-farmers, or the fetch error.
    pub async fn farmer_stats(&self) -> Result<FarmerStats> {
        let identity = self.require(Role::Farmer)?;
        let key = QueryKey::new([keys::ORDERS, "farmer", identity.user_id.as_str(), "stats"]);
        let api = &self.inner.api;
        Ok(self
            .inner
            .cache
            .fetch_or_cached(&key, || api.farmer_stats(&identity.user_id))
            .await?)
    }

    /// Move one of the farmer's orders to its next status.
    ///
    /// # Errors
    ///
    /// - `Authorization` for non-farmers
    /// - `InvalidInput` when the order is already delivered or cancelled
    /// - `MutationRejected`/`Network` from the server
    #[instrument(skip(self, note), fields(order_id = %order_id))]
    pub async fn advance_order(&self, order_id: &OrderId, note: &str) -> Result<Order> {
        self.require(Role::Farmer)?;
        let order = self.inner.api.get_order(order_id).await?;
        let next = order.status.next().ok_or_else(|| {
            StorefrontError::InvalidInput(format!("order is already {}", order.status))
        })?;

        let updated = self
            .inner
            .api
            .update_order_status(order_id, next, note)
            .await?;
        self.inner.cache.invalidate(&QueryKey::root(keys::ORDERS)).await;
        Ok(updated)
    }

    /// Cancel one of the customer's pending orders.
    ///
    /// # Errors
    ///
    /// - `Authorization` for non-customers
    /// - `InvalidInput` once the order has left `pending`
    /// - `MutationRejected`/`Network` from the server
    #[instrument(skip(self, reason), fields(order_id = %order_id))]
    pub async fn cancel_order(&self, order_id: &OrderId, reason: &str) -> Result<Order> {
        self.require(Role::Customer)?;
        let order = self.inner.api.get_order(order_id).await?;
        if !order.status.can_cancel() {
            return Err(StorefrontError::InvalidInput(format!(
                "a {} order can no longer be cancelled",
                order.status
            )));
        }

        let cancelled = self.inner.api.cancel_order(order_id, reason).await?;
        self.inner.cache.invalidate(&QueryKey::root(keys::ORDERS)).await;
        Ok(cancelled)
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    /// Review a product from a delivered order.
    ///
    /// # Errors
    ///
    /// - `Authorization` for non-customers
    /// - `InvalidInput` for a rating outside 1 to 5
    /// - `MutationRejected` when the server says the order cannot be reviewed
    #[instrument(skip(self, comment), fields(order_id = %order_id, product_id = %product_id))]
    pub async fn submit_review(
        &self,
        order_id: &OrderId,
        product_id: &ItemId,
        rating: u8,
        comment: &str,
    ) -> Result<Review> {
        let identity = self.require(Role::Customer)?;
        if !(1..=5).contains(&rating) {
            return Err(StorefrontError::InvalidInput(
                "rating must be between 1 and 5".to_string(),
            ));
        }

        let eligibility = self
            .inner
            .api
            .can_review_order(order_id, &identity.user_id)
            .await?;
        if !eligibility.can_review {
            return Err(StorefrontError::MutationRejected(
                eligibility
                    .reason
                    .unwrap_or_else(|| "This order cannot be reviewed".to_string()),
            ));
        }

        let order = self.inner.api.get_order(order_id).await?;
        let review = Review {
            id: None,
            order_id: order_id.clone(),
            customer_id: identity.user_id,
            product_id: product_id.clone(),
            farmer_id: order.farmer_id,
            rating,
            comment: comment.trim().to_string(),
        };

        let created = self.inner.api.create_review(&review).await?;
        self.inner.cache.invalidate(&QueryKey::root(keys::REVIEWS)).await;
        Ok(created)
    }

    /// Reviews of a product.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn product_reviews(&self, product_id: &ItemId) -> Result<Vec<Review>> {
        let key = QueryKey::new([keys::REVIEWS, "product", product_id.as_str()]);
        let api = &self.inner.api;
        Ok(self
            .inner
            .cache
            .fetch_or_cached(&key, || api.product_reviews(product_id))
            .await?)
    }

    /// Reviews received by a farmer.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn farmer_reviews(&self, farmer_id: &UserId) -> Result<Vec<Review>> {
        let key = QueryKey::new([keys::REVIEWS, "farmer", farmer_id.as_str()]);
        let api = &self.inner.api;
        Ok(self
            .inner
            .cache
            .fetch_or_cached(&key, || api.farmer_reviews(farmer_id))
            .await?)
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// Change one item's price.
    ///
    /// # Errors
    ///
    /// Returns `Authorization` for non-admins, or the server error.
    #[instrument(skip(self), fields(item_id = %item_id, price = %price))]
    pub async fn update_item_price(&self, item_id: &ItemId, price: Price) -> Result<PriceChange> {
        let identity = self.require(Role::Admin)?;
        let change = self
            .inner
            .api
            .update_item_price(&identity.user_id, item_id, price)
            .await?;
        self.invalidate_item(item_id).await;
        Ok(change)
    }

    /// Change many prices at once.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty batch, `Authorization` for
    /// non-admins, or the server error.
    #[instrument(skip(self, updates), fields(count = updates.len()))]
    pub async fn bulk_update_prices(&self, updates: &[PriceUpdate]) -> Result<BulkPriceSummary> {
        let identity = self.require(Role::Admin)?;
        if updates.is_empty() {
            return Err(StorefrontError::InvalidInput("no price updates given".to_string()));
        }

        let summary = self
            .inner
            .api
            .bulk_update_prices(&identity.user_id, updates)
            .await?;
        self.inner
            .cache
            .invalidate_many(&[
                QueryKey::root(keys::ITEM),
                QueryKey::root(keys::ITEMS),
                QueryKey::root(keys::EXPLORE),
            ])
            .await;
        Ok(summary)
    }

    /// Delete a listing.
    ///
    /// # Errors
    ///
    /// Returns `Authorization` for non-admins, or the server error.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn delete_item(&self, item_id: &ItemId) -> Result<()> {
        let identity = self.require(Role::Admin)?;
        self.inner
            .api
            .delete_item(&identity.user_id, item_id)
            .await?;
        self.invalidate_item(item_id).await;
        Ok(())
    }

    async fn invalidate_item(&self, item_id: &ItemId) {
        self.inner
            .cache
            .invalidate_many(&[
                QueryKey::root(keys::ITEM).with(item_id.as_str()),
                QueryKey::root(keys::ITEMS),
                QueryKey::root(keys::EXPLORE),
            ])
            .await;
    }

    fn signed_in(&self) -> Result<SessionIdentity> {
        self.inner
            .session
            .identity()
            .ok_or(StorefrontError::Authorization {
                required: Role::Customer,
                redirect_to: crate::session::LOGIN_REDIRECT,
            })
    }

    fn require(&self, role: Role) -> Result<SessionIdentity> {
        self.inner.session.require_role(role)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn storefront() -> Storefront {
        Storefront::new(StorefrontConfig::for_api_url("http://127.0.0.1:9").unwrap()).unwrap()
    }

    fn sign_in(storefront: &Storefront, role: Role) {
        storefront.session().sign_in(SessionIdentity {
            user_id: UserId::new("u1"),
            role,
            display_name: "Ada".to_string(),
        });
    }

    #[tokio::test]
    async fn test_role_gated_operations_fail_before_any_request() {
        let storefront = storefront();

        let err = storefront.my_orders().await.unwrap_err();
        assert_eq!(err.redirect(), Some(crate::session::LOGIN_REDIRECT));

        sign_in(&storefront, Role::Customer);
        let err = storefront
            .update_item_price(&ItemId::new("a"), Price::from_naira(10))
            .await
            .unwrap_err();
        assert_eq!(err.redirect(), Some(crate::session::SHOP_REDIRECT));

        let err = storefront.farmer_stats().await.unwrap_err();
        assert!(matches!(err, StorefrontError::Authorization { required: Role::Farmer, .. }));
    }

    #[tokio::test]
    async fn test_review_rating_is_validated_locally() {
        let storefront = storefront();
        sign_in(&storefront, Role::Customer);

        let err = storefront
            .submit_review(&OrderId::new("o1"), &ItemId::new("a"), 6, "great")
            .await
            .unwrap_err();
        assert!(matches!(err, StorefrontError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_empty_checkout_is_invalid() {
        let storefront = storefront();
        sign_in(&storefront, Role::Customer);
        let details = CheckoutDetails {
            payment_method: "cash".to_string(),
            delivery_address: "1 Market Rd".to_string(),
            notes: None,
        };

        let err = storefront.place_orders(&[], &details).await.unwrap_err();
        assert!(matches!(err, StorefrontError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_empty_bulk_update_is_invalid() {
        let storefront = storefront();
        sign_in(&storefront, Role::Admin);
        let err = storefront.bulk_update_prices(&[]).await.unwrap_err();
        assert!(matches!(err, StorefrontError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let storefront = storefront();
        sign_in(&storefront, Role::Customer);
        storefront.logout().await;
        assert!(!storefront.session().is_logged_in());
        assert_eq!(storefront.cart().count(), 0);
    }
}
