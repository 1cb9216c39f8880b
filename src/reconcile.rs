//! # Reconciliation
//!
//! Merges upstream snapshots into the local catalog. Set reconciliation runs
//! first over the eagerly fetched snapshot; card reconciliation then
//! consumes streamed pages strictly sequentially — pages may arrive in any
//! order, and the id-based upsert makes the merge commutative and idempotent
//! across orders, but the merge itself never runs concurrently with itself.
//! Entities are never deleted: a set whose code vanished upstream is
//! detached and returned to the caller with its member view intact.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::collection::CardList;
use crate::fetch::PageResult;
use crate::index::IdentityIndex;
use crate::model::{Card, CardArena, CardId, SetCode, SetRecord};
use crate::sets::{CardSet, SetCollection};

/// Counts and detached sets from one set reconciliation pass.
#[derive(Debug, Default)]
pub struct SetReconcileOutcome {
    pub added: usize,
    pub updated: usize,
    /// Sets present locally but absent from the remote snapshot, removed
    /// from the current collection with their member views untouched.
    pub obsolete: Vec<CardSet>,
}

/// Merge a remote set snapshot into the current set collection.
///
/// A record whose code matches an existing set updates it in place;
/// otherwise a new set is inserted. Local sets whose code is absent from the
/// snapshot are detached and returned — their cards stay reachable and may
/// be re-homed after the card merge.
pub fn reconcile_sets(sets: &mut SetCollection, snapshot: &[SetRecord]) -> SetReconcileOutcome {
    let mut outcome = SetReconcileOutcome::default();

    for record in snapshot {
        let code = SetCode::new(record.code());
        match sets.find_by_code_mut(&code) {
            Some(existing) => {
                existing.apply_record(record);
                outcome.updated += 1;
            }
            None => {
                sets.push(CardSet::from_record(record));
                outcome.added += 1;
            }
        }
    }

    let remote: FxHashSet<&str> = snapshot.iter().map(|record| record.code()).collect();
    let obsolete_codes: Vec<SetCode> = sets
        .codes()
        .filter(|code| !remote.contains(code.as_str()))
        .cloned()
        .collect();
    for code in obsolete_codes {
        if let Some(set) = sets.remove_by_code(&code) {
            tracing::info!(code = %set.code, "set no longer present upstream, detaching");
            outcome.obsolete.push(set);
        }
    }

    outcome
}

/// Counts from one card reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardReconcileOutcome {
    pub added: usize,
    pub updated: usize,
    /// Cards whose set code resolved to no current set; they live in the
    /// global collection only.
    pub orphans: usize,
    pub failed_pages: usize,
}

/// Merge streamed card pages into the catalog. Single writer: the caller
/// must drain the page stream on one thread.
///
/// A record whose id is unknown becomes a new card, appended to the arena,
/// the global collection, and the member view of the set its code names (the
/// global collection only when no such set exists). A known id updates the
/// existing card in place.
pub fn reconcile_cards(
    arena: &mut CardArena,
    cards: &mut CardList,
    sets: &mut SetCollection,
    pages: impl IntoIterator<Item = PageResult>,
) -> CardReconcileOutcome {
    let mut outcome = CardReconcileOutcome::default();
    let mut index = IdentityIndex::build(cards);
    let positions: FxHashMap<SetCode, usize> = sets
        .iter()
        .enumerate()
        .map(|(position, set)| (set.code.clone(), position))
        .collect();

    for page in pages {
        if page.failed {
            outcome.failed_pages += 1;
        }
        for record in &page.records {
            let id = CardId::new(record.id());
            if index.contains(&id) {
                if let Some(card) = arena.get_mut(&id) {
                    card.apply_record(record);
                }
                outcome.updated += 1;
            } else {
                let card = Card::from_record(record);
                let position = card
                    .set_code
                    .as_ref()
                    .and_then(|code| positions.get(code))
                    .copied();
                let id = arena.insert(card);
                cards.append(id.clone());
                index.insert(id.clone());
                match position.and_then(|position| sets.get_mut(position)) {
                    Some(set) => set.members.append(id),
                    None => {
                        tracing::debug!(card = %id, "no current set for card, keeping as orphan");
                        outcome.orphans += 1;
                    }
                }
                outcome.added += 1;
            }
        }
        tracing::debug!(
            url = %page.request.url,
            records = page.records.len(),
            "merged page"
        );
    }

    outcome
}

/// Re-home the members of detached sets. Each card moves into the current
/// set its own set code names, if one exists and does not already hold it;
/// otherwise it stays reachable only through the detached set's view.
///
/// Returns how many cards were re-homed.
pub fn rehome_obsolete_cards(
    arena: &CardArena,
    sets: &mut SetCollection,
    obsolete: &[CardSet],
) -> usize {
    let mut moved = 0;
    for stale in obsolete {
        for id in stale.members.iter() {
            let Some(code) = arena.get(id).and_then(|card| card.set_code.clone()) else {
                continue;
            };
            if let Some(current) = sets.find_by_code_mut(&code) {
                if !current.members.contains_id(id) {
                    current.members.append(id.clone());
                    moved += 1;
                }
            }
        }
        if !stale.members.is_empty() {
            tracing::info!(
                code = %stale.code,
                members = stale.members.len(),
                "processed detached set members"
            );
        }
    }
    moved
}
