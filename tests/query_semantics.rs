#[path = "../src/test_support.rs"]
mod test_support;

use test_support::scryfall_card_with;

use mtgmirror::model::{Card, CardArena};
use mtgmirror::query::Diagnostic;
use mtgmirror::{CardList, Query};
use serde_json::json;

struct Fixture {
    arena: CardArena,
    cards: CardList,
}

fn fixture() -> Fixture {
    let mut arena = CardArena::new();
    let mut cards = CardList::new();

    let records = vec![
        scryfall_card_with(
            "mongrel",
            "od",
            json!({
                "name": "Wild Mongrel",
                "type_line": "Creature — Dog",
                "colors": ["G"],
                "color_identity": ["R", "G"],
                "power": "2",
                "toughness": "2",
                "cmc": 2.0,
                "rarity": "common"
            }),
        ),
        scryfall_card_with(
            "bolt",
            "lea",
            json!({
                "name": "Lightning Bolt",
                "type_line": "Instant",
                "colors": ["R"],
                "color_identity": ["R"],
                "cmc": 1.0,
                "rarity": "common"
            }),
        ),
        scryfall_card_with(
            "akki",
            "chk",
            json!({
                "name": "Akki Lavarunner // Tok-Tok, Volcano Born",
                "layout": "flip",
                "rarity": "rare",
                "card_faces": [
                    {"name": "Akki Lavarunner", "type_line": "Creature — Goblin", "power": "1", "toughness": "1"},
                    {"name": "Tok-Tok, Volcano Born", "type_line": "Legendary Creature — Goblin Shaman", "power": "2", "toughness": "2"}
                ]
            }),
        ),
    ];

    for record in &records {
        let id = arena.insert(Card::from_record(record));
        cards.append(id);
    }
    Fixture { arena, cards }
}

#[test]
fn list_attribute_semantics() {
    let Fixture { arena, cards } = fixture();

    // colors = ["R", "G"] on the entity: a single shared element is enough
    // for fuzzy, exact needs the whole set.
    let fuzzy = cards.where_matches(&arena, &Query::new().list("color_identity", ["G"]));
    assert_eq!(ids(&fuzzy.hits), vec!["mongrel"]);

    let exact = cards.where_exactly(&arena, &Query::new().list("color_identity", ["G"]));
    assert!(exact.hits.is_empty());

    let exact = cards.where_exactly(&arena, &Query::new().list("color_identity", ["G", "R"]));
    assert_eq!(ids(&exact.hits), vec!["mongrel"]);
}

#[test]
fn numeric_attribute_semantics() {
    let Fixture { arena, cards } = fixture();

    // power_num = 2 for the mongrel: fuzzy accepts query >= attribute.
    let hits = cards.where_matches(&arena, &Query::new().number("power", 3.0));
    assert!(ids(&hits.hits).contains(&"mongrel".to_string()));

    let hits = cards.where_matches(&arena, &Query::new().number("power", 1.0));
    assert!(!ids(&hits.hits).contains(&"mongrel".to_string()));

    let hits = cards.where_exactly(&arena, &Query::new().number("power", 2.0));
    assert!(ids(&hits.hits).contains(&"mongrel".to_string()));
}

#[test]
fn null_term_returns_everything_with_one_diagnostic() {
    let Fixture { arena, cards } = fixture();

    let result = cards.where_matches(&arena, &Query::new().null("colors"));
    assert_eq!(result.hits.len(), cards.len());
    assert_eq!(
        result.diagnostics,
        vec![Diagnostic::NullTerm {
            key: "colors".to_string()
        }]
    );
}

#[test]
fn unknown_key_is_dropped_not_fatal() {
    let Fixture { arena, cards } = fixture();

    // `flavor` belongs to the magicthegathering.io schema; the sampled
    // entity is Scryfall-shaped.
    let result = cards.where_matches(
        &arena,
        &Query::new().text("flavor", "goblin").text("name", "bolt"),
    );
    assert_eq!(ids(&result.hits), vec!["bolt"]);
    assert_eq!(
        result.diagnostics,
        vec![Diagnostic::UnknownKey {
            key: "flavor".to_string()
        }]
    );
}

#[test]
fn face_fallback_and_search_all_faces() {
    let Fixture { arena, cards } = fixture();

    // The flip card has no top-level type_line; the first face answers by
    // default, so only all-faces search sees the legendary back side.
    let first_face = cards.where_matches(&arena, &Query::new().text("type_line", "goblin"));
    assert!(ids(&first_face.hits).contains(&"akki".to_string()));

    let back_side = cards.where_matches(&arena, &Query::new().text("type_line", "legendary"));
    assert!(!ids(&back_side.hits).contains(&"akki".to_string()));

    let back_side = cards.where_matches(
        &arena,
        &Query::new().text("type_line", "legendary").search_all_faces(),
    );
    assert!(ids(&back_side.hits).contains(&"akki".to_string()));
}

#[test]
fn invert_flips_the_verdict() {
    let Fixture { arena, cards } = fixture();

    let noncreatures = cards.where_matches(
        &arena,
        &Query::new().text("type_line", "creature").invert(),
    );
    assert_eq!(ids(&noncreatures.hits), vec!["bolt"]);
}

#[test]
fn fuzzy_or_combines_terms() {
    let Fixture { arena, cards } = fixture();

    let either = cards.where_matches(
        &arena,
        &Query::new().text("name", "bolt").text("name", "mongrel"),
    );
    let mut found = ids(&either.hits);
    found.sort();
    assert_eq!(found, vec!["bolt", "mongrel"]);
}

#[test]
fn exact_and_combines_terms() {
    let Fixture { arena, cards } = fixture();

    let both = cards.where_exactly(
        &arena,
        &Query::new()
            .text("rarity", "common")
            .text("name", "lightning bolt"),
    );
    assert_eq!(ids(&both.hits), vec!["bolt"]);
}

fn ids(list: &CardList) -> Vec<String> {
    list.iter().map(|id| id.to_string()).collect()
}
