//! # Identity Index
//!
//! Fast id lookups for the merge step. The index is rebuilt from scratch at
//! the start of every sync by sorting the collection's ids and grouping
//! consecutive equals, keeping one representative per id; there is no
//! incremental maintenance between syncs.

use rustc_hash::FxHashSet;

use crate::collection::CardList;
use crate::model::CardId;

/// Distinct card identities of one collection.
#[derive(Debug, Clone, Default)]
pub struct IdentityIndex {
    ids: FxHashSet<CardId>,
}

impl IdentityIndex {
    /// Build the index from a collection view. Duplicate ids in the view
    /// collapse to a single representative.
    pub fn build(list: &CardList) -> Self {
        let mut sorted: Vec<CardId> = list.iter().cloned().collect();
        sorted.sort_unstable();
        sorted.dedup();
        Self {
            ids: sorted.into_iter().collect(),
        }
    }

    pub fn contains(&self, id: &CardId) -> bool {
        self.ids.contains(id)
    }

    /// Record a newly merged identity so later pages of the same sync see it.
    pub fn insert(&mut self, id: CardId) -> bool {
        self.ids.insert(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_collapses_duplicates() {
        let list = CardList::from_ids(vec![
            CardId::new("b"),
            CardId::new("a"),
            CardId::new("b"),
            CardId::new("a"),
        ]);
        let index = IdentityIndex::build(&list);
        assert_eq!(index.len(), 2);
        assert!(index.contains(&CardId::new("a")));
        assert!(!index.contains(&CardId::new("c")));
    }

    #[test]
    fn test_insert_is_visible() {
        let mut index = IdentityIndex::build(&CardList::new());
        assert!(index.is_empty());
        assert!(index.insert(CardId::new("x")));
        assert!(!index.insert(CardId::new("x")));
        assert!(index.contains(&CardId::new("x")));
    }
}
