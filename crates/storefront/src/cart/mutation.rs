//! Per-mutation state machine and the per-item in-flight ledger.
//!
//! A mutation starts `Pending` when its local effect is applied and ends
//! either `Committed` (server accepted) or `RolledBack` (server declined or
//! was unreachable). Same-item mutations are persisted one after another in
//! the order they were issued; the newest one decides what the line shows
//! once it settles.

use std::collections::HashMap;
use std::fmt;

use tokio::sync::oneshot;

use farmerspot_core::ItemId;

use super::snapshot::CartLine;

/// What a mutation asks the server to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Add units (not applied locally until the server accepts).
    Add { quantity: u32 },
    /// Set the line to an exact count.
    Update { count: u32 },
    /// Drop the line.
    Remove,
}

impl MutationKind {
    /// Whether the local snapshot changes before the server answers.
    #[must_use]
    pub const fn is_optimistic(self) -> bool {
        !matches!(self, Self::Add { .. })
    }

    /// The line count once the server has applied this mutation on top of
    /// `confirmed`.
    #[must_use]
    pub const fn apply(self, confirmed: u32) -> u32 {
        match self {
            Self::Add { quantity } => confirmed.saturating_add(quantity),
            Self::Update { count } => count,
            Self::Remove => 0,
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add { quantity } => write!(f, "add {quantity}"),
            Self::Update { count } => write!(f, "update to {count}"),
            Self::Remove => f.write_str("remove"),
        }
    }
}

/// Lifecycle of one mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Pending,
    Committed,
    RolledBack,
}

impl MutationState {
    /// Whether the mutation has settled.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Line state as `(position, line)`, `None` when the item is absent.
pub(crate) type LineState = Option<(usize, CartLine)>;

/// One issued mutation.
#[derive(Debug)]
pub struct Mutation {
    item_id: ItemId,
    kind: MutationKind,
    revision: u64,
    epoch: u64,
    state: MutationState,
}

impl Mutation {
    pub(crate) const fn new(item_id: ItemId, kind: MutationKind, revision: u64, epoch: u64) -> Self {
        Self {
            item_id,
            kind,
            revision,
            epoch,
            state: MutationState::Pending,
        }
    }

    /// Item the mutation targets.
    #[must_use]
    pub const fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    /// Requested change.
    #[must_use]
    pub const fn kind(&self) -> MutationKind {
        self.kind
    }

    /// Issuance order among mutations of the same cart.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> MutationState {
        self.state
    }

    /// `Pending → Committed`. Settled mutations do not move again.
    pub(crate) fn commit(&mut self) -> MutationState {
        if self.state == MutationState::Pending {
            self.state = MutationState::Committed;
        }
        self.state
    }

    /// `Pending → RolledBack`. Settled mutations do not move again.
    pub(crate) fn roll_back(&mut self) -> MutationState {
        if self.state == MutationState::Pending {
            self.state = MutationState::RolledBack;
        }
        self.state
    }
}

/// In-flight bookkeeping for one item.
#[derive(Debug)]
struct InFlight {
    /// Line as the server last acknowledged it.
    confirmed: LineState,
    /// Revision of the newest mutation issued for the item.
    latest: u64,
    /// Resolves when the newest mutation's persist call has finished.
    tail: Option<oneshot::Receiver<()>>,
    /// Newest revision issued before the last refresh replaced `confirmed`.
    /// The fetched line may or may not include those mutations.
    rebased_through: Option<u64>,
    /// An accepted `Add` could not be placed relative to fetched data.
    uncertain: bool,
}

/// Ticket handed to a newly issued mutation.
#[derive(Debug)]
pub(crate) struct Ticket {
    /// Wait on this before calling the server.
    pub predecessor: Option<oneshot::Receiver<()>>,
    /// Fire (or drop) once the server call finished.
    pub done: oneshot::Sender<()>,
}

/// How a settled mutation changes the visible line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Reconcile {
    /// A newer mutation of the same item is still pending; leave the line.
    Keep,
    /// Show this line state.
    Show(LineState),
    /// Show this line state, then fetch the cart: an accepted add raced a
    /// refresh and the line may be off by its quantity.
    Refetch(LineState),
}

/// Ledger of items with mutations in flight.
#[derive(Debug, Default)]
pub(crate) struct Ledger {
    items: HashMap<ItemId, InFlight>,
}

impl Ledger {
    /// Register a mutation for `item_id`.
    ///
    /// `current` is the line state before the mutation touched the snapshot;
    /// it becomes the confirmed state when nothing else is in flight.
    pub fn issue(&mut self, item_id: &ItemId, revision: u64, current: LineState) -> Ticket {
        let (done, receiver) = oneshot::channel();
        let entry = self
            .items
            .entry(item_id.clone())
            .or_insert_with(|| InFlight {
                confirmed: current,
                latest: revision,
                tail: None,
                rebased_through: None,
                uncertain: false,
            });
        entry.latest = revision;
        let predecessor = entry.tail.replace(receiver);

        Ticket { predecessor, done }
    }

    /// Record the server's outcome for `mutation`.
    ///
    /// On success the confirmed line advances. When `mutation` is the newest
    /// for its item the ledger entry is closed and the confirmed line is what
    /// the snapshot must show.
    pub fn settle(&mut self, mutation: &Mutation, accepted: bool) -> Reconcile {
        let Some(entry) = self.items.get_mut(mutation.item_id()) else {
            return Reconcile::Keep;
        };

        let kind = mutation.kind();
        let raced_refresh = entry
            .rebased_through
            .is_some_and(|through| mutation.revision() <= through);

        if accepted && raced_refresh && matches!(kind, MutationKind::Add { .. }) {
            entry.uncertain = true;
        } else if accepted {
            let position = entry
                .confirmed
                .as_ref()
                .map(|(index, _)| *index);
            let current = entry.confirmed.as_ref().map_or(0, |(_, line)| line.count);
            let next = kind.apply(current);
            entry.confirmed = (next > 0).then(|| {
                (
                    position.unwrap_or(usize::MAX),
                    CartLine::new(mutation.item_id().clone(), next),
                )
            });
            // An absolute count settles any earlier doubt.
            if !matches!(kind, MutationKind::Add { .. }) {
                entry.uncertain = false;
            }
        }

        if entry.latest != mutation.revision() {
            return Reconcile::Keep;
        }

        match self.items.remove(mutation.item_id()) {
            Some(entry) if entry.uncertain => Reconcile::Refetch(entry.confirmed),
            Some(entry) => Reconcile::Show(entry.confirmed),
            None => Reconcile::Keep,
        }
    }

    /// Replace the confirmed state of in-flight items with fresh server data.
    ///
    /// Mutations issued so far may have reached the server before or after
    /// the fetch; absolute ones still settle exactly, adds trigger a refetch.
    pub fn rebase(&mut self, fetched: impl Fn(&ItemId) -> LineState) {
        for (item_id, entry) in &mut self.items {
            entry.confirmed = fetched(item_id);
            entry.rebased_through = Some(entry.latest);
        }
    }

    /// Whether the item has mutations in flight.
    pub fn is_pending(&self, item_id: &ItemId) -> bool {
        self.items.contains_key(item_id)
    }

    /// Forget every in-flight item.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ItemId {
        ItemId::new(s)
    }

    fn line(s: &str, count: u32) -> LineState {
        Some((0, CartLine::new(s, count)))
    }

    #[test]
    fn test_state_transitions_are_one_way() {
        let mut mutation = Mutation::new(id("a"), MutationKind::Remove, 1, 0);
        assert_eq!(mutation.state(), MutationState::Pending);
        assert_eq!(mutation.commit(), MutationState::Committed);
        assert_eq!(mutation.roll_back(), MutationState::Committed);
        assert!(mutation.state().is_settled());
    }

    #[test]
    fn test_kind_apply() {
        assert_eq!(MutationKind::Add { quantity: 2 }.apply(3), 5);
        assert_eq!(MutationKind::Update { count: 7 }.apply(3), 7);
        assert_eq!(MutationKind::Remove.apply(3), 0);
        assert!(!MutationKind::Add { quantity: 1 }.is_optimistic());
        assert!(MutationKind::Remove.is_optimistic());
    }

    #[test]
    fn test_single_failure_restores_confirmed() {
        let mut ledger = Ledger::default();
        let _ticket = ledger.issue(&id("a"), 1, line("a", 2));
        let mutation = Mutation::new(id("a"), MutationKind::Update { count: 5 }, 1, 0);

        assert_eq!(ledger.settle(&mutation, false), Reconcile::Show(line("a", 2)));
        assert!(!ledger.is_pending(&id("a")));
    }

    #[test]
    fn test_older_failure_defers_to_newer_mutation() {
        let mut ledger = Ledger::default();
        let first = ledger.issue(&id("a"), 1, line("a", 2));
        assert!(first.predecessor.is_none());
        let second = ledger.issue(&id("a"), 2, line("a", 5));
        assert!(second.predecessor.is_some());

        let older = Mutation::new(id("a"), MutationKind::Update { count: 5 }, 1, 0);
        let newer = Mutation::new(id("a"), MutationKind::Update { count: 6 }, 2, 0);

        assert_eq!(ledger.settle(&older, false), Reconcile::Keep);
        assert_eq!(ledger.settle(&newer, true), Reconcile::Show(line("a", 6)));
    }

    #[test]
    fn test_newer_failure_restores_older_success() {
        let mut ledger = Ledger::default();
        let _first = ledger.issue(&id("a"), 1, line("a", 2));
        let _second = ledger.issue(&id("a"), 2, line("a", 5));

        let older = Mutation::new(id("a"), MutationKind::Update { count: 5 }, 1, 0);
        let newer = Mutation::new(id("a"), MutationKind::Remove, 2, 0);

        assert_eq!(ledger.settle(&older, true), Reconcile::Keep);
        assert_eq!(ledger.settle(&newer, false), Reconcile::Show(line("a", 5)));
    }

    #[test]
    fn test_accepted_add_on_absent_item() {
        let mut ledger = Ledger::default();
        let _ticket = ledger.issue(&id("b"), 1, None);
        let add = Mutation::new(id("b"), MutationKind::Add { quantity: 1 }, 1, 0);

        match ledger.settle(&add, true) {
            Reconcile::Show(Some((_, line))) => assert_eq!(line, CartLine::new("b", 1)),
            other => panic!("unexpected reconcile: {other:?}"),
        }
    }

    #[test]
    fn test_add_settled_after_refresh_asks_for_refetch() {
        let mut ledger = Ledger::default();
        let _ticket = ledger.issue(&id("a"), 1, line("a", 2));
        // The fetch already counted the add.
        ledger.rebase(|_| line("a", 3));
        let add = Mutation::new(id("a"), MutationKind::Add { quantity: 1 }, 1, 0);

        assert_eq!(ledger.settle(&add, true), Reconcile::Refetch(line("a", 3)));
        assert!(!ledger.is_pending(&id("a")));
    }

    #[test]
    fn test_update_after_refresh_settles_exactly() {
        let mut ledger = Ledger::default();
        let _first = ledger.issue(&id("a"), 1, line("a", 2));
        ledger.rebase(|_| line("a", 3));
        let _second = ledger.issue(&id("a"), 2, line("a", 3));

        let add = Mutation::new(id("a"), MutationKind::Add { quantity: 1 }, 1, 0);
        let update = Mutation::new(id("a"), MutationKind::Update { count: 6 }, 2, 0);

        assert_eq!(ledger.settle(&add, true), Reconcile::Keep);
        assert_eq!(ledger.settle(&update, true), Reconcile::Show(line("a", 6)));
    }

    #[test]
    fn test_add_issued_after_refresh_applies() {
        let mut ledger = Ledger::default();
        let _first = ledger.issue(&id("a"), 1, line("a", 2));
        ledger.rebase(|_| line("a", 2));
        let _second = ledger.issue(&id("a"), 2, line("a", 2));

        let update = Mutation::new(id("a"), MutationKind::Update { count: 2 }, 1, 0);
        let add = Mutation::new(id("a"), MutationKind::Add { quantity: 2 }, 2, 0);

        assert_eq!(ledger.settle(&update, true), Reconcile::Keep);
        assert_eq!(ledger.settle(&add, true), Reconcile::Show(line("a", 4)));
    }
}
