//! # Card Collections
//!
//! Ordered, identity-aware views over the card arena. A `CardList` holds
//! `CardId` references with multiplicity, so the same printing can appear
//! four times in a deck while the arena owns a single card object. All
//! algebra is functional in style: operations return new lists and leave the
//! receiver untouched.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rustc_hash::FxHashSet;

use crate::model::{Card, CardArena, CardId};
use crate::query::{card_matches, validate_terms, MatchMode, Query, QueryResult};

/// How many cards of each rarity a booster pack draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackSpec {
    pub commons: usize,
    pub uncommons: usize,
    pub rares: usize,
}

impl Default for PackSpec {
    fn default() -> Self {
        Self {
            commons: 11,
            uncommons: 3,
            rares: 1,
        }
    }
}

/// An ordered list of card references with multiplicity.
///
/// Lists carry their own identity: two lists are equal when they are the
/// same list, not when they hold the same cards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardList {
    id: Uuid,
    pub name: String,
    ids: Vec<CardId>,
}

impl PartialEq for CardList {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CardList {}

impl Default for CardList {
    fn default() -> Self {
        Self::new()
    }
}

impl CardList {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            ids: Vec::new(),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::new()
        }
    }

    pub fn from_ids(ids: Vec<CardId>) -> Self {
        Self {
            ids,
            ..Self::new()
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[CardId] {
        &self.ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &CardId> {
        self.ids.iter()
    }

    /// Resolve the list against the arena, skipping ids the arena no longer
    /// holds.
    pub fn cards<'a>(&'a self, arena: &'a CardArena) -> impl Iterator<Item = &'a Card> + 'a {
        self.ids.iter().filter_map(|id| arena.get(id))
    }

    pub fn get(&self, index: usize) -> Option<&CardId> {
        self.ids.get(index)
    }

    pub fn contains_id(&self, id: &CardId) -> bool {
        self.ids.contains(id)
    }

    pub fn append(&mut self, id: CardId) {
        self.ids.push(id);
    }

    pub fn extend(&mut self, ids: impl IntoIterator<Item = CardId>) {
        self.ids.extend(ids);
    }

    pub fn insert(&mut self, index: usize, id: CardId) {
        self.ids.insert(index, id);
    }

    /// Remove the first occurrence of an id. Returns whether one was found.
    pub fn remove_id(&mut self, id: &CardId) -> bool {
        if let Some(pos) = self.ids.iter().position(|c| c == id) {
            self.ids.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Ordered concatenation; multiplicity is preserved.
    pub fn union(&self, other: &CardList) -> CardList {
        let mut ids = self.ids.clone();
        ids.extend(other.ids.iter().cloned());
        CardList::from_ids(ids)
    }

    /// Multiset difference by identity: every occurrence of an id present in
    /// `other` is removed, regardless of its count there.
    pub fn difference(&self, other: &CardList) -> CardList {
        let removed: FxHashSet<&CardId> = other.ids.iter().collect();
        CardList::from_ids(
            self.ids
                .iter()
                .filter(|id| !removed.contains(id))
                .cloned()
                .collect(),
        )
    }

    /// Each element replicated `count` times, used for deck construction.
    pub fn repeat(&self, count: usize) -> CardList {
        let mut ids = Vec::with_capacity(self.ids.len() * count);
        for id in &self.ids {
            for _ in 0..count {
                ids.push(id.clone());
            }
        }
        CardList::from_ids(ids)
    }

    /// Keep the first occurrence of every distinct id.
    pub fn unique_by_id(&self) -> CardList {
        let mut seen = FxHashSet::default();
        CardList::from_ids(
            self.ids
                .iter()
                .filter(|id| seen.insert((*id).clone()))
                .cloned()
                .collect(),
        )
    }

    /// Keep the first occurrence of every distinct card name. Cards without
    /// a resolvable name dedupe by id instead.
    pub fn unique_by_name(&self, arena: &CardArena) -> CardList {
        let mut seen = FxHashSet::default();
        CardList::from_ids(
            self.ids
                .iter()
                .filter(|id| {
                    let key = arena
                        .get(id)
                        .and_then(|card| card.name.clone())
                        .unwrap_or_else(|| id.as_str().to_string());
                    seen.insert(key)
                })
                .cloned()
                .collect(),
        )
    }

    /// Random sample of `count` elements. Without replacement when the list
    /// is large enough; an undersized list degrades to sampling with
    /// replacement rather than failing.
    pub fn random_sample<R: Rng>(
        &self,
        rng: &mut R,
        count: usize,
        with_replacement: bool,
    ) -> CardList {
        if self.ids.is_empty() {
            return CardList::new();
        }
        if with_replacement || count > self.ids.len() {
            CardList::from_ids(
                (0..count)
                    .filter_map(|_| self.ids.choose(rng).cloned())
                    .collect(),
            )
        } else {
            CardList::from_ids(self.ids.choose_multiple(rng, count).cloned().collect())
        }
    }

    pub fn random_card<R: Rng>(&self, rng: &mut R) -> Option<&CardId> {
        self.ids.choose(rng)
    }

    /// Draw a booster-style pack: fixed counts per rarity bucket, with a
    /// 1-in-8 chance of upgrading each rare slot to a mythic when the list
    /// holds any mythics.
    pub fn booster_pack<R: Rng>(&self, arena: &CardArena, rng: &mut R, spec: PackSpec) -> CardList {
        let commons = self.with_rarity(arena, &["common"]);
        let uncommons = self.with_rarity(arena, &["uncommon"]);
        let rares = self.with_rarity(arena, &["rare"]);
        let mythics = self.with_rarity(arena, &["mythic", "mythic rare"]);

        let mut pack = commons.random_sample(rng, spec.commons, false);
        pack.extend(uncommons.random_sample(rng, spec.uncommons, false).ids);

        for _ in 0..spec.rares {
            let bucket = if !mythics.is_empty() && rng.gen_range(0..8) == 0 {
                &mythics
            } else {
                &rares
            };
            pack.extend(bucket.random_sample(rng, 1, false).ids);
        }
        pack
    }

    fn with_rarity(&self, arena: &CardArena, rarities: &[&str]) -> CardList {
        CardList::from_ids(
            self.ids
                .iter()
                .filter(|id| {
                    arena
                        .get(id)
                        .and_then(|card| card.rarity.as_deref())
                        .map(|r| rarities.iter().any(|want| r.eq_ignore_ascii_case(want)))
                        .unwrap_or(false)
                })
                .cloned()
                .collect(),
        )
    }

    /// New list of the cards for which the predicate holds.
    pub fn filtered<F>(&self, arena: &CardArena, mut predicate: F) -> CardList
    where
        F: FnMut(&Card) -> bool,
    {
        CardList::from_ids(
            self.ids
                .iter()
                .filter(|id| arena.get(id).map(&mut predicate).unwrap_or(false))
                .cloned()
                .collect(),
        )
    }

    /// New list sorted by a projection of the cards.
    pub fn sorted_by_key<K, F>(&self, arena: &CardArena, mut key: F) -> CardList
    where
        K: Ord,
        F: FnMut(&Card) -> K,
    {
        let mut ids = self.ids.clone();
        ids.sort_by_cached_key(|id| arena.get(id).map(&mut key));
        CardList::from_ids(ids)
    }

    /// Fuzzy query: keep the cards for which ANY effective term matches.
    /// Dropped terms are reported as diagnostics; a query whose terms all
    /// drop filters nothing.
    pub fn where_matches(&self, arena: &CardArena, query: &Query) -> QueryResult<CardList> {
        self.run_query(arena, query, MatchMode::Fuzzy)
    }

    /// Exact query: keep the cards for which EVERY effective term matches.
    pub fn where_exactly(&self, arena: &CardArena, query: &Query) -> QueryResult<CardList> {
        self.run_query(arena, query, MatchMode::Exact)
    }

    fn run_query(&self, arena: &CardArena, query: &Query, mode: MatchMode) -> QueryResult<CardList> {
        let sample = self.ids.first().and_then(|id| arena.get(id));
        let (terms, diagnostics) = validate_terms(query, sample);
        for diagnostic in &diagnostics {
            tracing::warn!(%diagnostic, "dropped query term");
        }

        if terms.is_empty() {
            return QueryResult {
                hits: self.clone_contents(),
                diagnostics,
            };
        }

        let hits = self.filtered(arena, |card| {
            let verdict = card_matches(card, mode, &terms, query.searches_all_faces());
            verdict != query.is_inverted()
        });
        QueryResult { hits, diagnostics }
    }

    fn clone_contents(&self) -> CardList {
        CardList::from_ids(self.ids.clone())
    }

    /// Group by converted mana cost; bucket keys are the cost values.
    pub fn grouped_by_mana_value(&self, arena: &CardArena) -> BTreeMap<String, CardList> {
        self.grouped_by(arena, |card| format!("{}", card.cmc.unwrap_or(0.0)))
    }

    /// Group by type category. A card matching several categories lands in
    /// the highest-priority one: creature > land > enchantment > artifact,
    /// then instants, sorceries and planeswalkers, then everything else.
    pub fn grouped_by_type(&self, arena: &CardArena) -> BTreeMap<String, CardList> {
        self.grouped_by(arena, |card| type_bucket(card).to_string())
    }

    /// Group by color identity, canonicalized to a sorted concatenated
    /// symbol string (`"GR"`, never `"RG"`); colorless cards group under "".
    pub fn grouped_by_color_identity(&self, arena: &CardArena) -> BTreeMap<String, CardList> {
        self.grouped_by(arena, |card| {
            let mut symbols: Vec<&str> = card
                .color_identity
                .as_deref()
                .unwrap_or(&[])
                .iter()
                .map(String::as_str)
                .collect();
            symbols.sort_unstable();
            symbols.concat()
        })
    }

    /// Group by raw card id.
    pub fn grouped_by_id(&self) -> BTreeMap<String, CardList> {
        let mut groups: BTreeMap<String, CardList> = BTreeMap::new();
        for id in &self.ids {
            groups
                .entry(id.as_str().to_string())
                .or_insert_with(CardList::new)
                .append(id.clone());
        }
        groups
    }

    fn grouped_by<F>(&self, arena: &CardArena, mut key: F) -> BTreeMap<String, CardList>
    where
        F: FnMut(&Card) -> String,
    {
        let mut groups: BTreeMap<String, CardList> = BTreeMap::new();
        for id in &self.ids {
            if let Some(card) = arena.get(id) {
                groups
                    .entry(key(card))
                    .or_insert_with(CardList::new)
                    .append(id.clone());
            }
        }
        groups
    }

    /// Only the creatures of this list.
    pub fn creatures(&self, arena: &CardArena) -> CardList {
        self.filtered(arena, |card| has_type(card, "creature"))
    }

    /// Only the cards that are not creatures.
    pub fn noncreatures(&self, arena: &CardArena) -> CardList {
        self.filtered(arena, |card| !has_type(card, "creature"))
    }

    /// Only the lands of this list.
    pub fn lands(&self, arena: &CardArena) -> CardList {
        self.filtered(arena, |card| has_type(card, "land"))
    }

    /// Only the basic lands of this list.
    pub fn basic_lands(&self, arena: &CardArena) -> CardList {
        self.filtered(arena, |card| has_type(card, "basic land"))
    }

    /// Only the instants of this list.
    pub fn instants(&self, arena: &CardArena) -> CardList {
        self.filtered(arena, |card| has_type(card, "instant"))
    }

    /// Only the sorceries of this list.
    pub fn sorceries(&self, arena: &CardArena) -> CardList {
        self.filtered(arena, |card| has_type(card, "sorcery"))
    }

    /// Only the enchantments of this list.
    pub fn enchantments(&self, arena: &CardArena) -> CardList {
        self.filtered(arena, |card| has_type(card, "enchantment"))
    }

    /// Only the artifacts of this list.
    pub fn artifacts(&self, arena: &CardArena) -> CardList {
        self.filtered(arena, |card| has_type(card, "artifact"))
    }

    /// Only the planeswalkers of this list.
    pub fn planeswalkers(&self, arena: &CardArena) -> CardList {
        self.filtered(arena, |card| has_type(card, "planeswalker"))
    }

    /// Summed converted mana cost of the list.
    pub fn mana_value_total(&self, arena: &CardArena) -> f64 {
        self.cards(arena).filter_map(|card| card.cmc).sum()
    }

    /// Average converted mana cost; zero for an empty list.
    pub fn mana_value_average(&self, arena: &CardArena) -> f64 {
        if self.ids.is_empty() {
            0.0
        } else {
            self.mana_value_total(arena) / self.ids.len() as f64
        }
    }

    /// Count of each colored mana symbol (W/U/B/R/G) across the list's mana
    /// costs, reading the first face of transform cards without a top-level
    /// cost.
    pub fn mana_symbol_counts(&self, arena: &CardArena) -> BTreeMap<char, usize> {
        let mut counts: BTreeMap<char, usize> =
            ['W', 'U', 'B', 'R', 'G'].iter().map(|&c| (c, 0)).collect();
        for card in self.cards(arena) {
            let cost = card.mana_cost.as_deref().or_else(|| {
                if card.layout.as_deref() == Some("transform") {
                    card.faces.first().and_then(|face| face.mana_cost.as_deref())
                } else {
                    None
                }
            });
            if let Some(cost) = cost {
                for (symbol, count) in counts.iter_mut() {
                    *count += cost.chars().filter(|c| c == symbol).count();
                }
            }
        }
        counts
    }
}

/// Whether the card's type text or type list names a category, in either
/// upstream schema.
fn has_type(card: &Card, needle: &str) -> bool {
    card.type_text()
        .map(|t| t.to_lowercase().contains(needle))
        .unwrap_or(false)
        || card
            .types
            .as_deref()
            .map(|types| types.iter().any(|t| t.eq_ignore_ascii_case(needle)))
            .unwrap_or(false)
}

fn type_bucket(card: &Card) -> &'static str {
    let has = |needle: &str| has_type(card, needle);

    if has("creature") {
        "creatures"
    } else if has("land") {
        "lands"
    } else if has("enchantment") {
        "enchantments"
    } else if has("artifact") {
        "artifacts"
    } else if has("instant") {
        "instants"
    } else if has("sorcery") {
        "sorceries"
    } else if has("planeswalker") {
        "planeswalkers"
    } else {
        "other"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CardRecord;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn seed_card(arena: &mut CardArena, value: serde_json::Value) -> CardId {
        let record: CardRecord = serde_json::from_value(value).unwrap();
        arena.insert(Card::from_record(&record))
    }

    fn seed(arena: &mut CardArena, id: &str, name: &str, type_line: &str, rarity: &str) -> CardId {
        seed_card(
            arena,
            json!({
                "id": id,
                "scryfall_uri": format!("https://scryfall.com/card/{id}"),
                "name": name,
                "type_line": type_line,
                "rarity": rarity,
                "cmc": 2.0,
                "set": "tst"
            }),
        )
    }

    #[test]
    fn test_union_preserves_multiplicity() {
        let mut arena = CardArena::new();
        let a = seed(&mut arena, "a", "Alpha", "Creature", "common");
        let b = seed(&mut arena, "b", "Beta", "Instant", "common");

        let left = CardList::from_ids(vec![a.clone(), a.clone()]);
        let right = CardList::from_ids(vec![b.clone()]);
        let both = left.union(&right);
        assert_eq!(both.len(), 3);
        assert_eq!(both.ids(), &[a.clone(), a, b]);
    }

    #[test]
    fn test_difference_removes_by_id_not_count() {
        let mut arena = CardArena::new();
        let a = seed(&mut arena, "a", "Alpha", "Creature", "common");
        let b = seed(&mut arena, "b", "Beta", "Instant", "common");

        let deck = CardList::from_ids(vec![a.clone(), a.clone(), b.clone()]);
        let pulled = CardList::from_ids(vec![a]);
        let rest = deck.difference(&pulled);
        assert_eq!(rest.ids(), &[b]);
    }

    #[test]
    fn test_repeat_replicates_each_element() {
        let mut arena = CardArena::new();
        let a = seed(&mut arena, "a", "Alpha", "Creature", "common");
        let playset = CardList::from_ids(vec![a.clone()]).repeat(4);
        assert_eq!(playset.len(), 4);
        assert!(playset.iter().all(|id| id == &a));
    }

    #[test]
    fn test_unique_by_id_keeps_first_occurrence() {
        let mut arena = CardArena::new();
        let a = seed(&mut arena, "a", "Alpha", "Creature", "common");
        let b = seed(&mut arena, "b", "Beta", "Instant", "common");

        let list = CardList::from_ids(vec![a.clone(), b.clone(), a.clone()]);
        assert_eq!(list.unique_by_id().ids(), &[a, b]);
    }

    #[test]
    fn test_unique_by_name() {
        let mut arena = CardArena::new();
        let a = seed(&mut arena, "a", "Alpha", "Creature", "common");
        let reprint = seed(&mut arena, "a2", "Alpha", "Creature", "common");
        let b = seed(&mut arena, "b", "Beta", "Instant", "common");

        let list = CardList::from_ids(vec![a.clone(), reprint, b.clone()]);
        assert_eq!(list.unique_by_name(&arena).ids(), &[a, b]);
    }

    #[test]
    fn test_random_sample_degrades_to_replacement() {
        let mut arena = CardArena::new();
        let a = seed(&mut arena, "a", "Alpha", "Creature", "common");
        let list = CardList::from_ids(vec![a]);

        let mut rng = StdRng::seed_from_u64(11);
        let sample = list.random_sample(&mut rng, 3, false);
        assert_eq!(sample.len(), 3);
    }

    #[test]
    fn test_booster_pack_composition() {
        let mut arena = CardArena::new();
        let mut list = CardList::new();
        for i in 0..20 {
            list.append(seed(&mut arena, &format!("c{i}"), "Common", "Creature", "common"));
        }
        for i in 0..6 {
            list.append(seed(&mut arena, &format!("u{i}"), "Uncommon", "Creature", "uncommon"));
        }
        for i in 0..4 {
            list.append(seed(&mut arena, &format!("r{i}"), "Rare", "Creature", "rare"));
        }
        list.append(seed(&mut arena, "m0", "Mythic", "Creature", "mythic"));

        let mut rng = StdRng::seed_from_u64(7);
        let pack = list.booster_pack(&arena, &mut rng, PackSpec::default());
        assert_eq!(pack.len(), 15);

        let rarities: Vec<String> = pack
            .cards(&arena)
            .map(|card| card.rarity.clone().unwrap())
            .collect();
        assert_eq!(rarities.iter().filter(|r| *r == "common").count(), 11);
        assert_eq!(rarities.iter().filter(|r| *r == "uncommon").count(), 3);
        assert_eq!(
            rarities
                .iter()
                .filter(|r| *r == "rare" || *r == "mythic")
                .count(),
            1
        );
    }

    #[test]
    fn test_type_filters() {
        let mut arena = CardArena::new();
        let dryad = seed(&mut arena, "d", "Dryad Arbor", "Land Creature — Forest Dryad", "uncommon");
        let island = seed(&mut arena, "i", "Island", "Basic Land — Island", "common");
        let list = CardList::from_ids(vec![dryad.clone(), island.clone()]);

        assert_eq!(list.creatures(&arena).ids(), &[dryad.clone()]);
        assert_eq!(list.lands(&arena).len(), 2);
        assert_eq!(list.basic_lands(&arena).ids(), &[island.clone()]);
        assert_eq!(list.noncreatures(&arena).ids(), &[island]);
    }

    #[test]
    fn test_grouped_by_type_priority() {
        let mut arena = CardArena::new();
        // A creature land must land in the creatures bucket, not lands.
        let dryad = seed(&mut arena, "d", "Dryad Arbor", "Land Creature — Forest Dryad", "uncommon");
        let island = seed(&mut arena, "i", "Island", "Basic Land — Island", "common");
        let rancor = seed(&mut arena, "r", "Rancor", "Enchantment — Aura", "common");

        let list = CardList::from_ids(vec![dryad.clone(), island.clone(), rancor.clone()]);
        let groups = list.grouped_by_type(&arena);
        assert_eq!(groups["creatures"].ids(), &[dryad]);
        assert_eq!(groups["lands"].ids(), &[island]);
        assert_eq!(groups["enchantments"].ids(), &[rancor]);
    }

    #[test]
    fn test_grouped_by_color_identity_sorts_symbols() {
        let mut arena = CardArena::new();
        let gruul = seed_card(
            &mut arena,
            json!({
                "id": "g",
                "scryfall_uri": "https://scryfall.com/card/g",
                "name": "Wild Cantor",
                "color_identity": ["R", "G"],
                "set": "gpt"
            }),
        );
        let list = CardList::from_ids(vec![gruul]);
        let groups = list.grouped_by_color_identity(&arena);
        assert!(groups.contains_key("GR"));
    }

    #[test]
    fn test_mana_symbol_counts() {
        let mut arena = CardArena::new();
        let id = seed_card(
            &mut arena,
            json!({
                "id": "s",
                "scryfall_uri": "https://scryfall.com/card/s",
                "name": "Wild Mongrel",
                "mana_cost": "{1}{G}",
                "set": "od"
            }),
        );
        let list = CardList::from_ids(vec![id.clone(), id]);
        let counts = list.mana_symbol_counts(&arena);
        assert_eq!(counts[&'G'], 2);
        assert_eq!(counts[&'R'], 0);
    }

    #[test]
    fn test_where_matches_inverted() {
        let mut arena = CardArena::new();
        let a = seed(&mut arena, "a", "Alpha", "Creature — Dog", "common");
        let b = seed(&mut arena, "b", "Beta", "Instant", "common");
        let list = CardList::from_ids(vec![a, b.clone()]);

        let result = list.where_matches(&arena, &Query::new().text("type_line", "creature").invert());
        assert_eq!(result.hits.ids(), &[b]);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_query_with_all_terms_dropped_filters_nothing() {
        let mut arena = CardArena::new();
        let a = seed(&mut arena, "a", "Alpha", "Creature", "common");
        let b = seed(&mut arena, "b", "Beta", "Instant", "common");
        let list = CardList::from_ids(vec![a, b]);

        let result = list.where_matches(&arena, &Query::new().null("colors"));
        assert_eq!(result.hits.len(), 2);
        assert_eq!(result.diagnostics.len(), 1);
    }
}
