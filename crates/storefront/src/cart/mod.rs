//! Cart synchronization core.
//!
//! [`CartSync`] keeps the authoritative local view of the signed-in
//! customer's cart: the snapshot of lines, the total unit count, and the
//! observers that re-render when the count changes.
//!
//! # Mutation policy
//!
//! - `add_item` waits for the server before touching the snapshot; stock can
//!   go stale while a listing is on screen.
//! - `update_quantity` and `remove_item` apply locally first, broadcast, then
//!   persist. A failure restores the line and broadcasts the restored total.
//! - Mutations of the same item are persisted in issuance order. The newest
//!   one decides what the line shows once it settles.
//! - A persist runs on its own task, so dropping the caller's future does not
//!   strand a line in the pending state.
//! - An add accepted after a refresh already replaced its line cannot be
//!   placed exactly; the cart refetches instead of counting it twice.
//!
//! Every change of the total produces exactly one notification, delivered
//! after the state change so observers reading [`CartSync::count`] see the new
//! value. Every successful mutation invalidates the `cart` query key.

mod backend;
mod mutation;
mod observers;
mod snapshot;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{Instrument, debug, instrument, warn};

use farmerspot_core::{ItemId, Role, UserId};

use crate::api::ApiClient;
use crate::error::{Result, StorefrontError};
use crate::query_cache::{QueryCache, QueryKey, keys};
use crate::session::Session;

pub use backend::CartBackend;
pub use mutation::{Mutation, MutationKind, MutationState};
pub use observers::{CartNotification, ObserverRegistry, Subscription, SubscriptionGuard};
pub use snapshot::{CartLine, CartSnapshot};

use mutation::{Ledger, Reconcile, Ticket};

#[derive(Debug, Default)]
struct CartState {
    snapshot: CartSnapshot,
    /// Total last broadcast; always equals `snapshot.total()` outside a lock.
    count: u32,
    ledger: Ledger,
    next_revision: u64,
    /// Bumped by `reset`; settles from an older epoch are ignored.
    epoch: u64,
}

struct Inner<B> {
    backend: B,
    session: Session,
    cache: QueryCache,
    state: Mutex<CartState>,
    observers: ObserverRegistry,
}

/// Cart synchronization core.
///
/// Cheaply cloneable; clones share the same cart.
pub struct CartSync<B: CartBackend = ApiClient> {
    inner: Arc<Inner<B>>,
}

impl<B: CartBackend> Clone for CartSync<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: CartBackend> std::fmt::Debug for CartSync<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartSync")
            .field("count", &self.count())
            .field("observers", &self.inner.observers.len())
            .finish_non_exhaustive()
    }
}

impl<B: CartBackend> CartSync<B> {
    /// Create an empty cart bound to `session`.
    pub fn new(backend: B, session: Session, cache: QueryCache) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                session,
                cache,
                state: Mutex::new(CartState::default()),
                observers: ObserverRegistry::new(),
            }),
        }
    }

    /// Last known total number of units. No network; 0 before the first load.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.lock().count
    }

    /// Copy of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.lock().snapshot.clone()
    }

    /// Units of `item_id` in the cart, 0 when absent.
    #[must_use]
    pub fn line_count(&self, item_id: &ItemId) -> u32 {
        self.lock().snapshot.count_of(item_id)
    }

    /// Whether `item_id` has a line (item cards switch from "ADD" to
    /// quantity controls).
    #[must_use]
    pub fn contains(&self, item_id: &ItemId) -> bool {
        self.lock().snapshot.contains(item_id)
    }

    /// Whether `item_id` has a mutation waiting for the server.
    #[must_use]
    pub fn is_pending(&self, item_id: &ItemId) -> bool {
        self.lock().ledger.is_pending(item_id)
    }

    /// Register an observer for every later count change.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(CartNotification) + Send + Sync + 'static,
    {
        self.inner.observers.subscribe(observer)
    }

    /// Fetch the full cart and replace the local snapshot.
    ///
    /// Broadcasts only when the total changed.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Network` if the fetch fails; the previous
    /// snapshot and count are kept. Returns `StorefrontError::Authorization`
    /// when no customer is signed in.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<CartSnapshot> {
        let user_id = self.customer()?;
        let epoch = self.lock().epoch;

        let lines = self
            .inner
            .backend
            .fetch_cart(&user_id)
            .await
            .map_err(|e| {
                warn!(error = %e, "Cart fetch failed");
                StorefrontError::Network(e.to_string())
            })?;
        let fetched = CartSnapshot::from_lines(lines);

        {
            let mut state = self.lock();
            if state.epoch != epoch {
                debug!("Cart was reset during fetch, discarding result");
                return Ok(fetched);
            }
            state.ledger.rebase(|item_id| {
                fetched
                    .position(item_id)
                    .and_then(|index| fetched.lines().get(index).cloned().map(|line| (index, line)))
            });
            state.snapshot = fetched.clone();
            self.publish_if_changed(&mut state);
        }
        self.inner.observers.flush();

        debug!(lines = fetched.len(), total = fetched.total(), "Cart refreshed");
        Ok(fetched)
    }

    /// Add `quantity` units of an item once the server accepts.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when `quantity` is 0 (no request is made)
    /// - `MutationRejected` with the server's reason; the snapshot is untouched
    /// - `Network` when the server is unreachable
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn add_item(&self, item_id: &ItemId, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Err(StorefrontError::InvalidInput(
                "quantity must be at least 1".to_string(),
            ));
        }
        let user_id = self.customer()?;
        let (mutation, ticket) = self.issue(item_id, MutationKind::Add { quantity });
        self.run(user_id, mutation, ticket).await
    }

    /// Set an item's count, optimistically.
    ///
    /// A count of 0 is exactly [`Self::remove_item`].
    ///
    /// # Errors
    ///
    /// Returns `MutationRejected` or `Network` after the line has been rolled
    /// back to its prior count.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn update_quantity(&self, item_id: &ItemId, new_count: u32) -> Result<()> {
        if new_count == 0 {
            return self.remove_item(item_id).await;
        }
        let user_id = self.customer()?;
        let (mutation, ticket) = self.issue(item_id, MutationKind::Update { count: new_count });
        self.run(user_id, mutation, ticket).await
    }

    /// Remove an item's line, optimistically.
    ///
    /// # Errors
    ///
    /// Returns `MutationRejected` or `Network` after the line has been
    /// restored at its original position.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn remove_item(&self, item_id: &ItemId) -> Result<()> {
        let user_id = self.customer()?;
        let (mutation, ticket) = self.issue(item_id, MutationKind::Remove);
        self.run(user_id, mutation, ticket).await
    }

    /// Forget the local cart (logout, or after checkout).
    ///
    /// Broadcasts 0 if the count was not already 0. Mutations still in flight
    /// complete against the server but no longer touch local state.
    pub fn reset(&self) {
        {
            let mut state = self.lock();
            state.snapshot = CartSnapshot::new();
            state.ledger.clear();
            state.epoch = state.epoch.wrapping_add(1);
            self.publish_if_changed(&mut state);
        }
        self.inner.observers.flush();
    }

    fn customer(&self) -> Result<UserId> {
        self.inner
            .session
            .require_role(Role::Customer)
            .map(|identity| identity.user_id)
    }

    /// Apply the local effect of a new mutation and queue it behind earlier
    /// mutations of the same item.
    fn issue(&self, item_id: &ItemId, kind: MutationKind) -> (Mutation, Ticket) {
        let issued = {
            let mut state = self.lock();
            state.next_revision = state.next_revision.wrapping_add(1);
            let revision = state.next_revision;

            let previous = if kind.is_optimistic() {
                let target = kind.apply(state.snapshot.count_of(item_id));
                state.snapshot.set(item_id, target)
            } else {
                state
                    .snapshot
                    .position(item_id)
                    .and_then(|index| state.snapshot.lines().get(index).cloned().map(|line| (index, line)))
            };

            let ticket = state.ledger.issue(item_id, revision, previous);
            self.publish_if_changed(&mut state);
            (Mutation::new(item_id.clone(), kind, revision, state.epoch), ticket)
        };
        self.inner.observers.flush();

        debug!(revision = issued.0.revision(), mutation = %kind, "Cart mutation pending");
        issued
    }

    /// Persist on a detached task and wait for its outcome.
    async fn run(&self, user_id: UserId, mutation: Mutation, ticket: Ticket) -> Result<()> {
        let this = self.clone();
        let task = tokio::spawn(
            async move { this.persist(&user_id, mutation, ticket).await }.in_current_span(),
        );
        task.await.map_err(|e| {
            warn!(error = %e, "Cart persist task failed");
            StorefrontError::Network(e.to_string())
        })?
    }

    /// Send a mutation to the server and reconcile the snapshot with the
    /// outcome.
    async fn persist(&self, user_id: &UserId, mut mutation: Mutation, ticket: Ticket) -> Result<()> {
        let Ticket { predecessor, done } = ticket;
        if let Some(predecessor) = predecessor {
            // Err only means the predecessor's task went away; order is kept
            // either way.
            predecessor.await.ok();
        }

        let backend = &self.inner.backend;
        let item_id = mutation.item_id();
        let outcome = match mutation.kind() {
            MutationKind::Add { quantity } => backend.add_line(user_id, item_id, quantity).await,
            MutationKind::Update { count } => backend.set_line(user_id, item_id, count).await,
            MutationKind::Remove => backend.remove_line(user_id, item_id).await,
        };
        done.send(()).ok();

        let refetch = {
            let mut state = self.lock();
            if state.epoch == mutation.epoch() {
                let (line, refetch) = match state.ledger.settle(&mutation, outcome.is_ok()) {
                    Reconcile::Keep => (None, false),
                    Reconcile::Show(line) => (Some(line), false),
                    Reconcile::Refetch(line) => (Some(line), true),
                };
                if let Some(line) = line {
                    state.snapshot.restore(mutation.item_id(), line);
                    self.publish_if_changed(&mut state);
                }
                refetch
            } else {
                false
            }
        };
        self.inner.observers.flush();

        if refetch {
            debug!(revision = mutation.revision(), "Add raced a refresh, refetching cart");
            if let Err(e) = self.refresh().await {
                warn!(error = %e, "Cart refetch after add failed");
            }
        }

        match outcome {
            Ok(()) => {
                let settled = mutation.commit();
                debug!(revision = mutation.revision(), state = ?settled, "Cart mutation settled");
                self.inner.cache.invalidate(&QueryKey::root(keys::CART)).await;
                Ok(())
            }
            Err(e) => {
                let settled = mutation.roll_back();
                warn!(
                    revision = mutation.revision(),
                    state = ?settled,
                    error = %e,
                    "Cart mutation failed"
                );
                Err(e.into())
            }
        }
    }

    /// Queue a notification if the snapshot total moved. Must be followed by
    /// `observers.flush()` once the lock is released.
    fn publish_if_changed(&self, state: &mut CartState) {
        let total = state.snapshot.total();
        if total != state.count {
            state.count = total;
            self.inner
                .observers
                .publish(CartNotification { new_count: total });
        }
    }

    fn lock(&self) -> MutexGuard<'_, CartState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
