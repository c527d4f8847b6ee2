//! Local mirror of the server-side cart.

use serde::{Deserialize, Serialize};

use farmerspot_core::ItemId;

/// One cart entry: an item and how many units of it.
///
/// A line never holds a zero count; zero means "absent".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Item in the cart.
    #[serde(rename = "item")]
    pub item_id: ItemId,
    /// Units of the item.
    pub count: u32,
}

impl CartLine {
    /// Create a cart line.
    #[must_use]
    pub fn new(item_id: impl Into<ItemId>, count: u32) -> Self {
        Self {
            item_id: item_id.into(),
            count,
        }
    }
}

/// The full set of cart lines, unique by item, in server order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartSnapshot {
    lines: Vec<CartLine>,
}

impl CartSnapshot {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a snapshot from server lines.
    ///
    /// Zero-count lines are dropped and duplicate items are merged by summing
    /// their counts, keeping the position of the first occurrence.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut snapshot = Self::new();
        for line in lines {
            if line.count == 0 {
                continue;
            }
            match snapshot.position(&line.item_id) {
                Some(index) => {
                    if let Some(existing) = snapshot.lines.get_mut(index) {
                        existing.count = existing.count.saturating_add(line.count);
                    }
                }
                None => snapshot.lines.push(line),
            }
        }
        snapshot
    }

    /// The lines in order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Number of distinct items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of all line counts.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.lines
            .iter()
            .fold(0_u32, |acc, line| acc.saturating_add(line.count))
    }

    /// Count of an item, 0 when absent.
    #[must_use]
    pub fn count_of(&self, item_id: &ItemId) -> u32 {
        self.lines
            .iter()
            .find(|line| &line.item_id == item_id)
            .map_or(0, |line| line.count)
    }

    /// Whether the item has a line.
    #[must_use]
    pub fn contains(&self, item_id: &ItemId) -> bool {
        self.position(item_id).is_some()
    }

    /// Index of the item's line.
    #[must_use]
    pub fn position(&self, item_id: &ItemId) -> Option<usize> {
        self.lines.iter().position(|line| &line.item_id == item_id)
    }

    /// Set an item's count, returning the previous line state.
    ///
    /// A count of 0 removes the line; a new item is appended.
    pub(crate) fn set(&mut self, item_id: &ItemId, count: u32) -> Option<(usize, CartLine)> {
        let previous = self
            .position(item_id)
            .and_then(|index| self.lines.get(index).cloned().map(|line| (index, line)));

        match (previous.as_ref(), count) {
            (Some((index, _)), 0) => {
                self.lines.remove(*index);
            }
            (Some((index, _)), count) => {
                if let Some(line) = self.lines.get_mut(*index) {
                    line.count = count;
                }
            }
            (None, 0) => {}
            (None, count) => self.lines.push(CartLine::new(item_id.clone(), count)),
        }

        previous
    }

    /// Put a line back where it was before an optimistic change.
    ///
    /// `previous` is the value `set` returned; `None` means the item was
    /// absent, so any line for it is removed.
    pub(crate) fn restore(&mut self, item_id: &ItemId, previous: Option<(usize, CartLine)>) {
        match previous {
            Some((index, line)) => {
                if let Some(current) = self.position(item_id) {
                    self.lines.remove(current);
                }
                let index = index.min(self.lines.len());
                self.lines.insert(index, line);
            }
            None => {
                self.set(item_id, 0);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn id(s: &str) -> ItemId {
        ItemId::new(s)
    }

    #[test]
    fn test_from_lines_drops_zero_and_merges_duplicates() {
        let snapshot = CartSnapshot::from_lines([
            CartLine::new("a", 2),
            CartLine::new("b", 0),
            CartLine::new("c", 1),
            CartLine::new("a", 3),
        ]);
        assert_eq!(
            snapshot.lines(),
            &[CartLine::new("a", 5), CartLine::new("c", 1)]
        );
        assert_eq!(snapshot.total(), 6);
    }

    #[test]
    fn test_set_zero_removes_line() {
        let mut snapshot = CartSnapshot::from_lines([CartLine::new("a", 2)]);
        let previous = snapshot.set(&id("a"), 0);
        assert!(snapshot.is_empty());
        assert_eq!(previous, Some((0, CartLine::new("a", 2))));
    }

    #[test]
    fn test_restore_puts_line_back_in_place() {
        let mut snapshot = CartSnapshot::from_lines([
            CartLine::new("a", 1),
            CartLine::new("b", 2),
            CartLine::new("c", 3),
        ]);
        let previous = snapshot.set(&id("b"), 0);
        assert_eq!(snapshot.len(), 2);

        snapshot.restore(&id("b"), previous);
        assert_eq!(snapshot.position(&id("b")), Some(1));
        assert_eq!(snapshot.total(), 6);
    }

    #[test]
    fn test_restore_absent_removes_new_line() {
        let mut snapshot = CartSnapshot::new();
        let previous = snapshot.set(&id("x"), 4);
        assert_eq!(snapshot.count_of(&id("x")), 4);

        snapshot.restore(&id("x"), previous);
        assert!(!snapshot.contains(&id("x")));
    }

    #[test]
    fn test_wire_format() {
        let json = r#"[{"item":"a","count":2}]"#;
        let snapshot: CartSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.count_of(&id("a")), 2);
    }
}
