#[path = "../src/test_support.rs"]
mod test_support;

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use test_support::{scryfall_card_with, scryfall_set};

use mtgmirror::fetch::{PageRequest, PageResult};
use mtgmirror::model::{CardRecord, SetRecord};
use mtgmirror::reconcile::{reconcile_cards, reconcile_sets};
use mtgmirror::store::CatalogRoot;
use serde_json::json;

fn pages() -> Vec<Vec<CardRecord>> {
    vec![
        vec![
            scryfall_card_with("a1", "a", json!({ "name": "Alpha One", "power": "1" })),
            scryfall_card_with("a2", "a", json!({ "name": "Alpha Two" })),
        ],
        vec![scryfall_card_with("b1", "b", json!({ "name": "Beta One" }))],
        vec![
            // A page-boundary overlap: a1 appears again with the same data.
            scryfall_card_with("a1", "a", json!({ "name": "Alpha One", "power": "1" })),
            scryfall_card_with("b2", "b", json!({ "name": "Beta Two" })),
        ],
    ]
}

fn snapshot() -> Vec<SetRecord> {
    vec![scryfall_set("a", "Alpha", 2), scryfall_set("b", "Beta", 2)]
}

fn merge_in_order(order: &[usize]) -> CatalogRoot {
    let mut root = CatalogRoot::default();
    reconcile_sets(&mut root.sets, &snapshot());
    let all = pages();
    let stream: Vec<PageResult> = order
        .iter()
        .map(|&index| PageResult {
            request: PageRequest::new(format!("stub://page/{index}")),
            records: all[index].clone(),
            failed: false,
        })
        .collect();
    reconcile_cards(&mut root.arena, &mut root.cards, &mut root.sets, stream);
    root
}

/// Order-insensitive fingerprint of a root: distinct ids with their resolved
/// names and stats, plus each set's member id set.
fn fingerprint(
    root: &CatalogRoot,
) -> (
    BTreeMap<String, (Option<String>, Option<f64>)>,
    BTreeMap<String, BTreeSet<String>>,
) {
    let cards = root
        .cards
        .unique_by_id()
        .iter()
        .map(|id| {
            let card = root.arena.get(id).unwrap();
            (id.to_string(), (card.name.clone(), card.power_num))
        })
        .collect();
    let members = root
        .sets
        .iter()
        .map(|set| {
            (
                set.code.to_string(),
                set.members.iter().map(|id| id.to_string()).collect(),
            )
        })
        .collect();
    (cards, members)
}

#[test]
fn merge_is_independent_of_page_order() {
    let orders: &[&[usize]] = &[
        &[0, 1, 2],
        &[0, 2, 1],
        &[1, 0, 2],
        &[1, 2, 0],
        &[2, 0, 1],
        &[2, 1, 0],
    ];

    let baseline = fingerprint(&merge_in_order(orders[0]));
    for order in &orders[1..] {
        let other = fingerprint(&merge_in_order(order));
        assert_eq!(baseline, other, "page order {order:?} diverged");
    }
}

#[test]
fn merge_produces_no_duplicate_ids() {
    for order in [&[0usize, 1, 2][..], &[2, 1, 0][..]] {
        let root = merge_in_order(order);
        assert_eq!(root.cards.len(), root.cards.unique_by_id().len());
        for set in root.sets.iter() {
            assert_eq!(set.members.len(), set.members.unique_by_id().len());
        }
    }
}

#[test]
fn overlapping_record_collapses_to_one_card() {
    // a1 arrives on two pages; whichever merges first inserts, the other
    // only updates.
    for order in [&[0usize, 1, 2][..], &[2, 1, 0][..]] {
        let root = merge_in_order(order);
        assert_eq!(root.cards.unique_by_id().len(), 4);
        let a1 = root
            .cards
            .ids()
            .iter()
            .find(|id| id.as_str() == "a1")
            .and_then(|id| root.arena.get(id))
            .unwrap();
        assert_eq!(a1.power_num, Some(1.0));
    }
}
