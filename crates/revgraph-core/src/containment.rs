//! # Containment Lists
//!
//! The one ownership-bearing relation kind. A `ContainmentList` is bound to
//! its owner at construction; adding an item stamps the item's container
//! back-reference, removing it clears the stamp.
//!
//! Invariant: every identifier held by a list belongs to an item whose
//! `container()` is the list's owner. It holds as soon as `add`/`remove`
//! return.

use crate::{EntityId, RevgraphError};

/// Anything that can sit inside a `ContainmentList`.
pub trait Contained {
    /// Identity of the item.
    fn id(&self) -> EntityId;

    /// The entity that owns this item, if any.
    fn container(&self) -> Option<EntityId>;

    /// Overwrite the container back-reference.
    ///
    /// Only `ContainmentList` and the resolver call this; everything else
    /// goes through `add`/`remove` so the invariant holds.
    fn set_container(&mut self, container: Option<EntityId>);
}

/// Ordered, duplicate-free list of owned children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainmentList {
    owner: EntityId,
    items: Vec<EntityId>,
}

impl ContainmentList {
    /// Create an empty list owned by `owner`.
    #[must_use]
    pub fn new(owner: EntityId) -> Self {
        Self {
            owner,
            items: Vec::new(),
        }
    }

    /// The entity this list belongs to.
    #[must_use]
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Append `item` and stamp its container.
    ///
    /// Returns `Ok(false)` if the item was already present (the stamp is
    /// still refreshed). An entity can never contain itself.
    ///
    /// The caller is responsible for taking the item out of its previous
    /// owner's list; `EntityStore::attach` does both.
    pub fn add<C: Contained + ?Sized>(&mut self, item: &mut C) -> Result<bool, RevgraphError> {
        let id = item.id();
        if id == self.owner {
            return Err(RevgraphError::ContainmentCycle {
                owner: self.owner,
                child: id,
            });
        }
        item.set_container(Some(self.owner));
        if self.items.contains(&id) {
            return Ok(false);
        }
        self.items.push(id);
        Ok(true)
    }

    /// Remove `item` and clear its container if it still points here.
    ///
    /// Returns `false` if the item was not in the list.
    pub fn remove<C: Contained + ?Sized>(&mut self, item: &mut C) -> bool {
        let removed = self.forget(item.id());
        if item.container() == Some(self.owner) {
            item.set_container(None);
        }
        removed
    }

    /// Drop an identifier without touching the item itself.
    ///
    /// Used when the item has already been re-stamped by its new owner.
    pub(crate) fn forget(&mut self, id: EntityId) -> bool {
        match self.items.iter().position(|item| *item == id) {
            Some(pos) => {
                self.items.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Replace the identifier list wholesale (resolution only).
    ///
    /// Duplicates and the owner itself are discarded. Children are stamped
    /// afterwards by `EntityStore::restamp_containment`.
    pub(crate) fn restore(&mut self, ids: Vec<EntityId>) {
        self.items.clear();
        for id in ids {
            if id != self.owner && !self.items.contains(&id) {
                self.items.push(id);
            }
        }
    }

    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.items.contains(&id)
    }

    /// Identifiers in insertion order.
    #[must_use]
    pub fn ids(&self) -> &[EntityId] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.items.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Item {
        id: EntityId,
        container: Option<EntityId>,
    }

    impl Item {
        fn new(n: u128) -> Self {
            Self {
                id: EntityId::from_u128(n),
                container: None,
            }
        }
    }

    impl Contained for Item {
        fn id(&self) -> EntityId {
            self.id
        }
        fn container(&self) -> Option<EntityId> {
            self.container
        }
        fn set_container(&mut self, container: Option<EntityId>) {
            self.container = container;
        }
    }

    #[test]
    fn add_stamps_container() {
        let owner = EntityId::from_u128(1);
        let mut list = ContainmentList::new(owner);
        let mut item = Item::new(2);

        assert!(list.add(&mut item).expect("add"));
        assert_eq!(item.container, Some(owner));
        assert_eq!(list.ids(), &[item.id]);
    }

    #[test]
    fn add_twice_keeps_one_entry() {
        let mut list = ContainmentList::new(EntityId::from_u128(1));
        let mut item = Item::new(2);

        assert!(list.add(&mut item).expect("add"));
        assert!(!list.add(&mut item).expect("add again"));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn remove_clears_container() {
        let owner = EntityId::from_u128(1);
        let mut list = ContainmentList::new(owner);
        let mut item = Item::new(2);
        list.add(&mut item).expect("add");

        assert!(list.remove(&mut item));
        assert!(list.is_empty());
        assert_eq!(item.container, None);
    }

    #[test]
    fn remove_leaves_foreign_container_alone() {
        let first = EntityId::from_u128(1);
        let second = EntityId::from_u128(3);
        let mut old_list = ContainmentList::new(first);
        let mut new_list = ContainmentList::new(second);
        let mut item = Item::new(2);

        old_list.add(&mut item).expect("add");
        new_list.add(&mut item).expect("re-add");
        // Stale entry in the old list: removing it must not clobber the new owner.
        assert!(old_list.remove(&mut item));
        assert_eq!(item.container, Some(second));
    }

    #[test]
    fn move_between_owners_points_at_new_owner() {
        let first = EntityId::from_u128(1);
        let second = EntityId::from_u128(3);
        let mut old_list = ContainmentList::new(first);
        let mut new_list = ContainmentList::new(second);
        let mut item = Item::new(2);

        old_list.add(&mut item).expect("add");
        old_list.remove(&mut item);
        new_list.add(&mut item).expect("add");

        assert_eq!(item.container, Some(second));
        assert!(!old_list.contains(item.id));
        assert!(new_list.contains(item.id));
    }

    #[test]
    fn owner_cannot_contain_itself() {
        let mut list = ContainmentList::new(EntityId::from_u128(1));
        let mut item = Item::new(1);
        let result = list.add(&mut item);
        assert!(matches!(result, Err(RevgraphError::ContainmentCycle { .. })));
        assert!(list.is_empty());
        assert_eq!(item.container, None);
    }

    #[test]
    fn removing_absent_item_is_noop() {
        let mut list = ContainmentList::new(EntityId::from_u128(1));
        let mut item = Item::new(2);
        assert!(!list.remove(&mut item));
    }

    #[test]
    fn restore_drops_duplicates_and_owner() {
        let owner = EntityId::from_u128(1);
        let mut list = ContainmentList::new(owner);
        let a = EntityId::from_u128(2);
        let b = EntityId::from_u128(3);
        list.restore(vec![a, b, a, owner]);
        assert_eq!(list.ids(), &[a, b]);
    }
}
