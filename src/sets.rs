//! # Set Collections
//!
//! A `CardSet` composes the set's scalar attributes with an embedded member
//! view: the member list holds the same card identities as the global
//! collection, so a card updated through the arena is updated everywhere at
//! once. `SetCollection` is the ordered list of current sets, queryable with
//! the same fuzzy/exact engine as cards.

use serde::{Deserialize, Serialize};

use crate::collection::CardList;
use crate::model::{SetCode, SetRecord, Source};
use crate::query::{compare, AttrValue, Diagnostic, MatchMode, Query, QueryResult, Term};

/// Set attribute keys valid for Scryfall-shaped sets.
const SCRYFALL_SET_KEYS: &[&str] = &[
    "id", "code", "name", "uri", "scryfall_uri", "search_uri", "set_type", "released_at", "block",
    "block_code", "parent_set_code", "card_count", "printed_size", "digital", "foil_only",
    "nonfoil_only", "icon_svg_uri",
];

/// Set attribute keys valid for magicthegathering.io-shaped sets.
const MTGIO_SET_KEYS: &[&str] = &[
    "code", "name", "type", "border", "release_date", "gatherer_code", "old_code",
    "magic_cards_info_code", "block", "online_only", "booster",
];

/// A mirrored set: scalar attributes plus the member view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardSet {
    pub code: SetCode,
    pub source: Option<Source>,
    pub name: Option<String>,
    pub set_type: Option<String>,
    pub released_at: Option<String>,
    pub release_date: Option<String>,
    pub block: Option<String>,
    pub block_code: Option<String>,
    pub parent_set_code: Option<String>,
    pub card_count: Option<u64>,
    pub printed_size: Option<u64>,
    pub digital: Option<bool>,
    pub foil_only: Option<bool>,
    pub nonfoil_only: Option<bool>,
    pub online_only: Option<bool>,
    pub icon_svg_uri: Option<String>,
    pub uri: Option<String>,
    pub scryfall_uri: Option<String>,
    pub search_uri: Option<String>,
    pub scryfall_id: Option<String>,
    pub border: Option<String>,
    pub gatherer_code: Option<String>,
    pub old_code: Option<String>,
    pub magic_cards_info_code: Option<String>,
    pub booster: Option<serde_json::Value>,

    /// Member view over the card arena. Shared identities with the global
    /// collection, never copies.
    pub members: CardList,
}

impl CardSet {
    /// Construct a set from an upstream record with an empty member view.
    pub fn from_record(record: &SetRecord) -> Self {
        let mut set = CardSet {
            code: SetCode::new(record.code()),
            members: CardList::new(),
            ..Default::default()
        };
        set.apply_record(record);
        set
    }

    /// Overwrite the scalar attributes with the fields carried by an
    /// incoming record. The member view is left untouched.
    pub fn apply_record(&mut self, record: &SetRecord) {
        match record {
            SetRecord::Scryfall(r) => {
                self.source = Some(Source::Scryfall);
                self.code = SetCode::new(&r.code);
                self.scryfall_id = r.id.clone();
                self.name = r.name.clone();
                self.uri = r.uri.clone();
                self.scryfall_uri = Some(r.scryfall_uri.clone());
                self.search_uri = r.search_uri.clone();
                self.set_type = r.set_type.clone();
                self.released_at = r.released_at.clone();
                self.block = r.block.clone();
                self.block_code = r.block_code.clone();
                self.parent_set_code = r.parent_set_code.clone();
                self.card_count = r.card_count;
                self.printed_size = r.printed_size;
                self.digital = r.digital;
                self.foil_only = r.foil_only;
                self.nonfoil_only = r.nonfoil_only;
                self.icon_svg_uri = r.icon_svg_uri.clone();
            }
            SetRecord::MtgIo(r) => {
                self.source = Some(Source::MtgIo);
                self.code = SetCode::new(&r.code);
                self.name = r.name.clone();
                self.set_type = r.set_type.clone();
                self.border = r.border.clone();
                self.release_date = r.release_date.clone();
                self.gatherer_code = r.gatherer_code.clone();
                self.old_code = r.old_code.clone();
                self.magic_cards_info_code = r.magic_cards_info_code.clone();
                self.block = r.block.clone();
                self.online_only = r.online_only;
                self.booster = r.booster.clone();
            }
        }
    }

    fn attr(&self, key: &str) -> Option<AttrValue<'_>> {
        fn text(v: &Option<String>) -> Option<AttrValue<'_>> {
            v.as_deref().map(AttrValue::Text)
        }

        match key {
            "code" => Some(AttrValue::Text(self.code.as_str())),
            "id" => self.scryfall_id.as_deref().map(AttrValue::Text),
            "name" => text(&self.name),
            "set_type" => text(&self.set_type),
            "type" => text(&self.set_type),
            "released_at" => text(&self.released_at),
            "release_date" => text(&self.release_date),
            "block" => text(&self.block),
            "block_code" => text(&self.block_code),
            "parent_set_code" => text(&self.parent_set_code),
            "icon_svg_uri" => text(&self.icon_svg_uri),
            "uri" => text(&self.uri),
            "scryfall_uri" => text(&self.scryfall_uri),
            "search_uri" => text(&self.search_uri),
            "border" => text(&self.border),
            "gatherer_code" => text(&self.gatherer_code),
            "old_code" => text(&self.old_code),
            "magic_cards_info_code" => text(&self.magic_cards_info_code),
            "card_count" => self.card_count.map(|n| AttrValue::Number(n as f64)),
            "printed_size" => self.printed_size.map(|n| AttrValue::Number(n as f64)),
            "digital" => self.digital.map(AttrValue::Bool),
            "foil_only" => self.foil_only.map(AttrValue::Bool),
            "nonfoil_only" => self.nonfoil_only.map(AttrValue::Bool),
            "online_only" => self.online_only.map(AttrValue::Bool),
            _ => None,
        }
    }

    fn schema_contains(&self, key: &str) -> bool {
        match self.source {
            Some(Source::Scryfall) => SCRYFALL_SET_KEYS.contains(&key),
            Some(Source::MtgIo) => MTGIO_SET_KEYS.contains(&key),
            None => SCRYFALL_SET_KEYS.contains(&key) || MTGIO_SET_KEYS.contains(&key),
        }
    }

    fn matches(&self, mode: MatchMode, terms: &[&Term]) -> bool {
        match mode {
            MatchMode::Fuzzy => terms.iter().any(|term| {
                self.attr(&term.key)
                    .map(|attr| compare(&attr, &term.value, MatchMode::Fuzzy))
                    .unwrap_or(false)
            }),
            MatchMode::Exact => terms.iter().all(|term| {
                self.attr(&term.key)
                    .map(|attr| compare(&attr, &term.value, MatchMode::Exact))
                    .unwrap_or(false)
            }),
        }
    }
}

/// Ordered collection of the current sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetCollection {
    sets: Vec<CardSet>,
}

impl SetCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CardSet> {
        self.sets.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CardSet> {
        self.sets.iter_mut()
    }

    pub fn get(&self, index: usize) -> Option<&CardSet> {
        self.sets.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut CardSet> {
        self.sets.get_mut(index)
    }

    pub fn push(&mut self, set: CardSet) {
        self.sets.push(set);
    }

    pub fn extend(&mut self, sets: impl IntoIterator<Item = CardSet>) {
        self.sets.extend(sets);
    }

    pub fn codes(&self) -> impl Iterator<Item = &SetCode> {
        self.sets.iter().map(|set| &set.code)
    }

    pub fn find_by_code(&self, code: &SetCode) -> Option<&CardSet> {
        self.sets.iter().find(|set| &set.code == code)
    }

    pub fn find_by_code_mut(&mut self, code: &SetCode) -> Option<&mut CardSet> {
        self.sets.iter_mut().find(|set| &set.code == code)
    }

    pub fn position_of_code(&self, code: &SetCode) -> Option<usize> {
        self.sets.iter().position(|set| &set.code == code)
    }

    /// Remove and return the set with the given code, if present.
    pub fn remove_by_code(&mut self, code: &SetCode) -> Option<CardSet> {
        let pos = self.position_of_code(code)?;
        Some(self.sets.remove(pos))
    }

    /// Fuzzy query over set attributes; terms combine with OR.
    pub fn where_matches(&self, query: &Query) -> QueryResult<Vec<&CardSet>> {
        self.run_query(query, MatchMode::Fuzzy)
    }

    /// Exact query over set attributes; terms combine with AND.
    pub fn where_exactly(&self, query: &Query) -> QueryResult<Vec<&CardSet>> {
        self.run_query(query, MatchMode::Exact)
    }

    fn run_query(&self, query: &Query, mode: MatchMode) -> QueryResult<Vec<&CardSet>> {
        let (terms, diagnostics) = self.validate_terms(query);
        for diagnostic in &diagnostics {
            tracing::warn!(%diagnostic, "dropped query term");
        }

        if terms.is_empty() {
            return QueryResult {
                hits: self.sets.iter().collect(),
                diagnostics,
            };
        }

        let hits = self
            .sets
            .iter()
            .filter(|set| set.matches(mode, &terms) != query.is_inverted())
            .collect();
        QueryResult { hits, diagnostics }
    }

    fn validate_terms<'q>(&self, query: &'q Query) -> (Vec<&'q Term>, Vec<Diagnostic>) {
        let mut effective = Vec::with_capacity(query.terms().len());
        let mut diagnostics = Vec::new();

        if self.sets.is_empty() && !query.terms().is_empty() {
            diagnostics.push(Diagnostic::EmptySelection);
        }

        for term in query.terms() {
            let empty = match &term.value {
                crate::query::TermValue::Null => true,
                crate::query::TermValue::Text(s) => s.is_empty(),
                crate::query::TermValue::List(l) => l.is_empty(),
                _ => false,
            };
            if empty {
                diagnostics.push(Diagnostic::NullTerm {
                    key: term.key.clone(),
                });
                continue;
            }
            if let Some(sample) = self.sets.first() {
                if !sample.schema_contains(&term.key) {
                    diagnostics.push(Diagnostic::UnknownKey {
                        key: term.key.clone(),
                    });
                    continue;
                }
            }
            effective.push(term);
        }

        (effective, diagnostics)
    }
}
