//! Integration test harness for the Farmerspot storefront client.
//!
//! [`FakeApi`] serves an in-memory imitation of the remote storefront API
//! with `axum` on an ephemeral port. Tests point a real
//! [`Storefront`](farmerspot_storefront::Storefront) at it and drive the
//! reqwest client end to end.
//!
//! # Seed data
//!
//! | ID | Kind | Notes |
//! |---|---|---|
//! | `c1` | customer | `ada@example.com` / `secret` |
//! | `f1`, `f2` | farmers | `bola@example.com`, `chidi@example.com` / `secret` |
//! | `a1` | admin | `admin@example.com` / `secret` |
//! | `yam`, `rice` | items by `f1` | in stock |
//! | `plantain` | item by `f2` | in stock |
//! | `beans` | item by `f2` | out of stock, cart adds are declined |
//!
//! # Example
//!
//! ```rust,ignore
//! let api = FakeApi::start().await;
//! let storefront = api.storefront();
//! storefront.login(CUSTOMER_EMAIL, &password()).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;

use farmerspot_core::{ItemId, OrderId, OrderStatus, Price, ReviewId, Role, UserId};
use farmerspot_storefront::Storefront;
use farmerspot_storefront::api::{
    FarmerStats, Item, NewOrder, Order, PriceUpdate, Review, UserProfile,
};
use farmerspot_storefront::cart::CartLine;
use farmerspot_storefront::config::StorefrontConfig;

pub const CUSTOMER_EMAIL: &str = "ada@example.com";
pub const FARMER_EMAIL: &str = "bola@example.com";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const PASSWORD: &str = "secret";

/// The shared seed password.
#[must_use]
pub fn password() -> SecretString {
    SecretString::from(PASSWORD)
}

struct Account {
    profile: UserProfile,
    password: String,
}

#[derive(Default)]
struct World {
    accounts: Vec<Account>,
    items: Vec<Item>,
    carts: HashMap<UserId, Vec<CartLine>>,
    orders: Vec<Order>,
    reviews: Vec<Review>,
    hits: HashMap<String, usize>,
    rejections: Vec<String>,
    closed_farms: HashSet<UserId>,
}

#[derive(Default)]
struct Shared {
    world: Mutex<World>,
    cart_writes_down: AtomicBool,
}

impl Shared {
    fn world(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

type AppState = Arc<Shared>;

/// Handle to a running fake API.
pub struct FakeApi {
    base_url: String,
    shared: AppState,
}

impl FakeApi {
    /// Seed the fake data and start serving on an ephemeral port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    #[allow(clippy::unwrap_used)]
    pub async fn start() -> Self {
        let shared = Arc::new(Shared::default());
        seed(&mut shared.world());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(Arc::clone(&shared));
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            base_url: format!("http://{addr}"),
            shared,
        }
    }

    /// Origin to use as `API_URL`.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// A fresh storefront context pointed at this server.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[allow(clippy::unwrap_used)]
    #[must_use]
    pub fn storefront(&self) -> Storefront {
        let config = StorefrontConfig::for_api_url(&self.base_url).unwrap();
        Storefront::new(config).unwrap()
    }

    /// Server-side cart of a user.
    #[must_use]
    pub fn cart_of(&self, user_id: &str) -> Vec<CartLine> {
        self.shared
            .world()
            .carts
            .get(&UserId::new(user_id))
            .cloned()
            .unwrap_or_default()
    }

    /// Put lines straight into a user's server-side cart.
    pub fn seed_cart(&self, user_id: &str, lines: &[(&str, u32)]) {
        self.shared.world().carts.insert(
            UserId::new(user_id),
            lines
                .iter()
                .map(|(item, count)| CartLine::new(*item, *count))
                .collect(),
        );
    }

    /// Number of requests served for a route name (e.g. `"items"`).
    #[must_use]
    pub fn hits(&self, route: &str) -> usize {
        self.shared.world().hits.get(route).copied().unwrap_or(0)
    }

    /// Make cart writes answer `503` without an envelope.
    pub fn set_cart_writes_down(&self, down: bool) {
        self.shared.cart_writes_down.store(down, Ordering::SeqCst);
    }

    /// Decline the next cart write with `message`.
    pub fn reject_next_cart_write(&self, message: &str) {
        self.shared.world().rejections.push(message.to_string());
    }

    /// Decline every new order for `farmer_id`.
    pub fn close_farm(&self, farmer_id: &str) {
        self.shared.world().closed_farms.insert(UserId::new(farmer_id));
    }

    /// Server-side status of an order.
    #[must_use]
    pub fn order_status(&self, order_id: &OrderId) -> Option<OrderStatus> {
        self.shared
            .world()
            .orders
            .iter()
            .find(|order| &order.id == order_id)
            .map(|order| order.status)
    }

    /// Current server-side price of an item.
    #[must_use]
    pub fn price_of(&self, item_id: &str) -> Option<Price> {
        let item_id = ItemId::new(item_id);
        self.shared
            .world()
            .items
            .iter()
            .find(|item| item.id == item_id)
            .map(|item| item.price)
    }
}

fn seed(world: &mut World) {
    let accounts = [
        ("c1", "Ada", Role::Customer, CUSTOMER_EMAIL),
        ("f1", "Bola", Role::Farmer, FARMER_EMAIL),
        ("f2", "Chidi", Role::Farmer, "chidi@example.com"),
        ("a1", "Admin", Role::Admin, ADMIN_EMAIL),
    ];
    world.accounts = accounts
        .into_iter()
        .map(|(id, name, role, email)| Account {
            profile: UserProfile {
                id: UserId::new(id),
                name: name.to_string(),
                user_type: role,
                email: Some(email.to_string()),
                phone: None,
            },
            password: PASSWORD.to_string(),
        })
        .collect();

    let items = [
        ("yam", "Yam", 1200, "f1", Some(10)),
        ("rice", "Rice", 800, "f1", None),
        ("plantain", "Plantain", 600, "f2", Some(5)),
        ("beans", "Beans", 500, "f2", Some(0)),
    ];
    world.items = items
        .into_iter()
        .map(|(id, name, naira, farmer, stock)| Item {
            id: ItemId::new(id),
            name: name.to_string(),
            price: Price::from_naira(naira),
            images: vec![format!("https://cdn.example.com/{id}.jpg")],
            listed_by: UserId::new(farmer),
            listed_at: None,
            description: None,
            category: Some("produce".to_string()),
            stock,
        })
        .collect();
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/user/login", post(login))
        .route("/user/signup", post(signup))
        .route("/user/{id}", get(user))
        .route("/items", get(items))
        .route("/item/{id}", get(item))
        .route("/search/{q}", get(search))
        .route("/search/autocomplete/{q}", get(autocomplete))
        .route("/cart/{user_id}", get(cart))
        .route("/cart/add", post(cart_add))
        .route("/cart/update", post(cart_update))
        .route("/cart/remove", post(cart_remove))
        .route("/orders/create", post(create_order))
        .route("/orders/customer/{id}", get(customer_orders))
        .route("/orders/farmer/{id}", get(farmer_orders))
        .route("/orders/farmer/{id}/stats", get(farmer_stats))
        .route("/orders/{id}", get(order))
        .route("/orders/{id}/status", patch(order_status))
        .route("/orders/{id}/cancel", post(cancel_order))
        .route("/review/create", post(create_review))
        .route("/review/product/{id}", get(product_reviews))
        .route("/review/farmer/{id}", get(farmer_reviews))
        .route("/review/can-review/{order_id}/{customer_id}", get(can_review))
        .route("/admin/updatePrice", post(update_price))
        .route("/admin/bulkUpdatePrices", post(bulk_update_prices))
        .route("/admin/deleteItem", post(delete_item))
        .with_state(state)
}

// =============================================================================
// Envelope helpers
// =============================================================================

fn ok(data: impl Serialize) -> Response {
    Json(json!({ "statusCode": 200, "message": "Success", "data": data })).into_response()
}

fn declined(status: u16, message: &str) -> Response {
    Json(json!({ "statusCode": status, "message": message, "data": null })).into_response()
}

fn count_hit(world: &mut World, route: &str) {
    *world.hits.entry(route.to_string()).or_insert(0) += 1;
}

// =============================================================================
// Users
// =============================================================================

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

async fn login(State(state): State<AppState>, Json(body): Json<Credentials>) -> Response {
    let world = state.world();
    world
        .accounts
        .iter()
        .find(|a| a.profile.email.as_deref() == Some(body.email.as_str()))
        .filter(|a| a.password == body.password)
        .map_or_else(
            || declined(401, "Invalid email or password"),
            |a| ok(&a.profile),
        )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Signup {
    name: String,
    email: String,
    password: String,
    user_type: Role,
}

async fn signup(State(state): State<AppState>, Json(body): Json<Signup>) -> Response {
    let mut world = state.world();
    if world
        .accounts
        .iter()
        .any(|a| a.profile.email.as_deref() == Some(body.email.as_str()))
    {
        return declined(409, "Email already registered");
    }
    let profile = UserProfile {
        id: UserId::new(uuid::Uuid::new_v4().to_string()),
        name: body.name,
        user_type: body.user_type,
        email: Some(body.email),
        phone: None,
    };
    world.accounts.push(Account {
        profile: profile.clone(),
        password: body.password,
    });
    ok(profile)
}

async fn user(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let world = state.world();
    world
        .accounts
        .iter()
        .find(|a| a.profile.id.as_str() == id)
        .map_or_else(|| declined(404, "User not found"), |a| ok(&a.profile))
}

// =============================================================================
// Catalog
// =============================================================================

async fn items(State(state): State<AppState>) -> Response {
    let mut world = state.world();
    count_hit(&mut world, "items");
    ok(&world.items)
}

async fn item(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let mut world = state.world();
    count_hit(&mut world, "item");
    world
        .items
        .iter()
        .find(|item| item.id.as_str() == id)
        .map_or_else(|| declined(404, "Item not found"), ok)
}

async fn search(State(state): State<AppState>, Path(q): Path<String>) -> Response {
    let world = state.world();
    let q = q.to_lowercase();
    let found: Vec<&Item> = world
        .items
        .iter()
        .filter(|item| item.name.to_lowercase().contains(&q))
        .collect();
    ok(found)
}

async fn autocomplete(State(state): State<AppState>, Path(q): Path<String>) -> Response {
    let world = state.world();
    let q = q.to_lowercase();
    let names: Vec<&str> = world
        .items
        .iter()
        .filter(|item| item.name.to_lowercase().starts_with(&q))
        .map(|item| item.name.as_str())
        .collect();
    ok(names)
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartWrite {
    user_id: UserId,
    item_id: ItemId,
    count: Option<u32>,
}

async fn cart(State(state): State<AppState>, Path(user_id): Path<String>) -> Response {
    let world = state.world();
    ok(world.carts.get(&UserId::new(user_id)).cloned().unwrap_or_default())
}

/// Shared gatekeeping for cart writes: outage, scripted rejection, stock.
fn check_cart_write(state: &Shared, world: &mut World, body: &CartWrite) -> Option<Response> {
    if state.cart_writes_down.load(Ordering::SeqCst) {
        return Some((StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response());
    }
    if !world.rejections.is_empty() {
        let message = world.rejections.remove(0);
        return Some(declined(400, &message));
    }
    match world.items.iter().find(|item| item.id == body.item_id) {
        None => Some(declined(404, "Item not found")),
        Some(item) if item.stock == Some(0) => Some(declined(400, "out of stock")),
        Some(_) => None,
    }
}

async fn cart_add(State(state): State<AppState>, Json(body): Json<CartWrite>) -> Response {
    let mut world = state.world();
    if let Some(response) = check_cart_write(&state, &mut world, &body) {
        return response;
    }
    let quantity = body.count.unwrap_or(1);
    let lines = world.carts.entry(body.user_id).or_default();
    match lines.iter_mut().find(|line| line.item_id == body.item_id) {
        Some(line) => line.count += quantity,
        None => lines.push(CartLine::new(body.item_id, quantity)),
    }
    ok("Added")
}

async fn cart_update(State(state): State<AppState>, Json(body): Json<CartWrite>) -> Response {
    let mut world = state.world();
    if let Some(response) = check_cart_write(&state, &mut world, &body) {
        return response;
    }
    let count = body.count.unwrap_or(0);
    let lines = world.carts.entry(body.user_id).or_default();
    if count == 0 {
        lines.retain(|line| line.item_id != body.item_id);
    } else if let Some(line) = lines.iter_mut().find(|line| line.item_id == body.item_id) {
        line.count = count;
    } else {
        lines.push(CartLine::new(body.item_id, count));
    }
    ok("Updated")
}

async fn cart_remove(State(state): State<AppState>, Json(body): Json<CartWrite>) -> Response {
    let mut world = state.world();
    if state.cart_writes_down.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response();
    }
    if !world.rejections.is_empty() {
        let message = world.rejections.remove(0);
        return declined(400, &message);
    }
    if let Some(lines) = world.carts.get_mut(&body.user_id) {
        lines.retain(|line| line.item_id != body.item_id);
    }
    ok("Removed")
}

// =============================================================================
// Orders
// =============================================================================

async fn create_order(State(state): State<AppState>, Json(body): Json<NewOrder>) -> Response {
    let mut world = state.world();
    if body.items.is_empty() {
        return declined(400, "Order has no items");
    }
    if world.closed_farms.contains(&body.farmer_id) {
        return declined(400, "Farmer is not accepting orders");
    }
    let order = Order {
        id: OrderId::new(uuid::Uuid::new_v4().to_string()),
        customer_id: body.customer_id,
        farmer_id: body.farmer_id,
        items: body.items,
        total_amount: body.total_amount,
        status: OrderStatus::Pending,
        payment_method: Some(body.payment_method),
        delivery_fee: body.delivery_fee,
        notes: body.notes,
        created_at: None,
    };
    world.orders.push(order.clone());
    ok(order)
}

async fn customer_orders(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let world = state.world();
    let orders: Vec<&Order> = world
        .orders
        .iter()
        .filter(|o| o.customer_id.as_str() == id)
        .collect();
    ok(orders)
}

async fn farmer_orders(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let world = state.world();
    let orders: Vec<&Order> = world
        .orders
        .iter()
        .filter(|o| o.farmer_id.as_str() == id)
        .collect();
    ok(orders)
}

async fn farmer_stats(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let world = state.world();
    let mine: Vec<&Order> = world
        .orders
        .iter()
        .filter(|o| o.farmer_id.as_str() == id)
        .collect();
    let count = |wanted: OrderStatus| {
        u32::try_from(mine.iter().filter(|o| o.status == wanted).count()).unwrap_or(u32::MAX)
    };
    ok(FarmerStats {
        total_orders: u32::try_from(mine.len()).unwrap_or(u32::MAX),
        pending_orders: count(OrderStatus::Pending),
        completed_orders: count(OrderStatus::Delivered),
        total_revenue: mine
            .iter()
            .filter(|o| o.status == OrderStatus::Delivered)
            .map(|o| o.total_amount)
            .sum(),
    })
}

async fn order(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let world = state.world();
    world
        .orders
        .iter()
        .find(|o| o.id.as_str() == id)
        .map_or_else(|| declined(404, "Order not found"), ok)
}

#[derive(Deserialize)]
struct StatusBody {
    status: OrderStatus,
}

async fn order_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> Response {
    let mut world = state.world();
    let Some(order) = world.orders.iter_mut().find(|o| o.id.as_str() == id) else {
        return declined(404, "Order not found");
    };
    if order.status.next() != Some(body.status) {
        return declined(400, "Invalid status transition");
    }
    order.status = body.status;
    ok(order.clone())
}

async fn cancel_order(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let mut world = state.world();
    let Some(order) = world.orders.iter_mut().find(|o| o.id.as_str() == id) else {
        return declined(404, "Order not found");
    };
    if order.status != OrderStatus::Pending {
        return declined(400, "Only pending orders can be cancelled");
    }
    order.status = OrderStatus::Cancelled;
    ok(order.clone())
}

// =============================================================================
// Reviews
// =============================================================================

fn review_block(world: &World, order_id: &str, customer_id: &str) -> Option<&'static str> {
    let Some(order) = world.orders.iter().find(|o| o.id.as_str() == order_id) else {
        return Some("Order not found");
    };
    if order.customer_id.as_str() != customer_id {
        return Some("This is not your order");
    }
    if !order.status.can_review() {
        return Some("Order has not been delivered yet");
    }
    if world.reviews.iter().any(|r| r.order_id.as_str() == order_id) {
        return Some("Order already reviewed");
    }
    None
}

async fn create_review(State(state): State<AppState>, Json(body): Json<Review>) -> Response {
    let mut world = state.world();
    if let Some(reason) = review_block(&world, body.order_id.as_str(), body.customer_id.as_str()) {
        return declined(400, reason);
    }
    let review = Review {
        id: Some(ReviewId::new(uuid::Uuid::new_v4().to_string())),
        ..body
    };
    world.reviews.push(review.clone());
    ok(review)
}

async fn product_reviews(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let world = state.world();
    let reviews: Vec<&Review> = world
        .reviews
        .iter()
        .filter(|r| r.product_id.as_str() == id)
        .collect();
    ok(reviews)
}

async fn farmer_reviews(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let world = state.world();
    let reviews: Vec<&Review> = world
        .reviews
        .iter()
        .filter(|r| r.farmer_id.as_str() == id)
        .collect();
    ok(reviews)
}

async fn can_review(
    State(state): State<AppState>,
    Path((order_id, customer_id)): Path<(String, String)>,
) -> Response {
    let world = state.world();
    match review_block(&world, &order_id, &customer_id) {
        None => ok(json!({ "canReview": true })),
        Some(reason) => ok(json!({ "canReview": false, "reason": reason })),
    }
}

// =============================================================================
// Admin
// =============================================================================

fn is_admin(world: &World, admin_id: &UserId) -> bool {
    world
        .accounts
        .iter()
        .any(|a| &a.profile.id == admin_id && a.profile.user_type == Role::Admin)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceBody {
    item_id: ItemId,
    admin_id: UserId,
    price: Price,
}

async fn update_price(State(state): State<AppState>, Json(body): Json<PriceBody>) -> Response {
    let mut world = state.world();
    if !is_admin(&world, &body.admin_id) {
        return declined(403, "Admin access required");
    }
    let Some(item) = world.items.iter_mut().find(|i| i.id == body.item_id) else {
        return declined(404, "Item not found");
    };
    let old_price = item.price;
    item.price = body.price;
    ok(json!({ "oldPrice": old_price, "newPrice": body.price }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkBody {
    admin_id: UserId,
    updates: Vec<PriceUpdate>,
}

async fn bulk_update_prices(State(state): State<AppState>, Json(body): Json<BulkBody>) -> Response {
    let mut world = state.world();
    if !is_admin(&world, &body.admin_id) {
        return declined(403, "Admin access required");
    }
    let mut updated = 0_u32;
    let mut failed = Vec::new();
    for update in body.updates {
        match world.items.iter_mut().find(|i| i.id == update.item_id) {
            Some(item) => {
                item.price = update.price;
                updated += 1;
            }
            None => failed.push(update.item_id),
        }
    }
    ok(json!({ "updated": updated, "failed": failed }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteBody {
    item_id: ItemId,
    admin_id: UserId,
}

async fn delete_item(State(state): State<AppState>, Json(body): Json<DeleteBody>) -> Response {
    let mut world = state.world();
    if !is_admin(&world, &body.admin_id) {
        return declined(403, "Admin access required");
    }
    let before = world.items.len();
    world.items.retain(|i| i.id != body.item_id);
    if world.items.len() == before {
        return declined(404, "Item not found");
    }
    ok("Deleted")
}
