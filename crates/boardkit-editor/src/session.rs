//! Per-editor state that is not document content: selection and clipboard.

use boardkit_core::{ItemId, Point, Rect};
use std::collections::BTreeSet;

use crate::model::{BoardItem, Document};

/// Copied items together with the reference point they were copied at
#[derive(Debug, Clone, PartialEq)]
pub struct Clipboard {
    pub items: Vec<BoardItem>,
    pub origin: Point,
}

impl Clipboard {
    /// Fresh copies with new ids, shifted by `offset`.
    pub fn instantiate(&self, offset: Point) -> Vec<BoardItem> {
        self.items
            .iter()
            .map(|item| {
                let mut copy = item.clone();
                copy.id = ItemId::new();
                copy.locked = false;
                copy.translate(offset);
                copy
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    selection: BTreeSet<ItemId>,
    clipboard: Option<Clipboard>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &BTreeSet<ItemId> {
        &self.selection
    }

    pub fn selected_ids(&self) -> Vec<ItemId> {
        self.selection.iter().copied().collect()
    }

    pub fn is_selected(&self, id: ItemId) -> bool {
        self.selection.contains(&id)
    }

    pub fn has_selection(&self) -> bool {
        !self.selection.is_empty()
    }

    /// Returns true if the selection changed.
    pub fn select(&mut self, ids: impl IntoIterator<Item = ItemId>, add: bool) -> bool {
        let ids: BTreeSet<ItemId> = ids.into_iter().collect();
        let next = if add {
            self.selection.union(&ids).copied().collect()
        } else {
            ids
        };
        let changed = next != self.selection;
        self.selection = next;
        changed
    }

    pub fn toggle(&mut self, id: ItemId) {
        if !self.selection.remove(&id) {
            self.selection.insert(id);
        }
    }

    pub fn clear_selection(&mut self) -> bool {
        let changed = !self.selection.is_empty();
        self.selection.clear();
        changed
    }

    /// Drops ids that no longer exist, e.g. after undo.
    pub fn retain_existing(&mut self, doc: &Document) -> bool {
        let before = self.selection.len();
        self.selection.retain(|id| doc.contains(*id));
        before != self.selection.len()
    }

    /// Selected items that are not locked.
    pub fn unlocked_selection(&self, doc: &Document) -> Vec<ItemId> {
        self.selection
            .iter()
            .filter(|id| doc.item(**id).is_some_and(|i| !i.locked))
            .copied()
            .collect()
    }

    /// Combined bounds of the selected items.
    pub fn selection_bounds(&self, doc: &Document) -> Option<Rect> {
        self.selection
            .iter()
            .filter_map(|id| doc.item(*id).and_then(BoardItem::bounds))
            .reduce(|a, b| a.union(&b))
    }

    pub fn clipboard(&self) -> Option<&Clipboard> {
        self.clipboard.as_ref()
    }

    pub fn set_clipboard(&mut self, clipboard: Clipboard) {
        self.clipboard = Some(clipboard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Hole, ItemData};

    #[test]
    fn test_select_replace_and_add() {
        let mut session = Session::new();
        let (a, b) = (ItemId::new(), ItemId::new());
        assert!(session.select([a], false));
        assert!(session.select([b], true));
        assert_eq!(session.selection().len(), 2);
        assert!(session.select([b], false));
        assert!(!session.is_selected(a));
        assert!(!session.select([b], true));
    }

    #[test]
    fn test_clipboard_instantiates_new_ids() {
        let item = BoardItem::new(ItemData::Hole(Hole {
            position: Point::new(1.0, 1.0),
            diameter: 1.0,
        }));
        let clipboard = Clipboard { items: vec![item.clone()], origin: Point::ORIGIN };
        let copies = clipboard.instantiate(Point::new(0.5, 0.5));
        assert_eq!(copies.len(), 1);
        assert_ne!(copies[0].id, item.id);
        assert_eq!(copies[0].vertices(), vec![Point::new(1.5, 1.5)]);
    }
}
