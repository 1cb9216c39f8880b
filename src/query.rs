//! # Query Engine
//!
//! Fuzzy and exact attribute matching over mirrored entities. A query is a
//! set of `(attribute key, expected value)` terms plus two flags: `invert`
//! (keep the non-matching entities) and `search_all_faces` (extend the
//! first-face fallback to every face of a multi-faced card).
//!
//! Fuzzy terms combine with OR and match loosely: substring for text,
//! non-empty intersection for lists, `query >= attribute` for numbers. Exact
//! terms combine with AND and match completely: full case-insensitive
//! equality for text, order-insensitive set equality for lists, `==` for
//! numbers. Booleans match by identity in both modes.
//!
//! Query misuse never fails a query. Invalid terms are dropped and reported
//! as [`Diagnostic`] values returned alongside the results.

use std::collections::HashSet;
use std::fmt;

use crate::model::{Card, CardFace, Source};

/// Expected value of a query term.
#[derive(Debug, Clone, PartialEq)]
pub enum TermValue {
    Text(String),
    List(Vec<String>),
    Number(f64),
    Bool(bool),
    /// Explicitly null. Unsupported and always dropped with a diagnostic;
    /// exists so callers can surface the misuse instead of silently skipping
    /// the key.
    Null,
}

/// A single `(key, expected value)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub key: String,
    pub value: TermValue,
}

/// An attribute-matching query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    terms: Vec<Term>,
    invert: bool,
    search_all_faces: bool,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text term.
    pub fn text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.terms.push(Term {
            key: key.into(),
            value: TermValue::Text(value.into()),
        });
        self
    }

    /// Add a list term.
    pub fn list<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.terms.push(Term {
            key: key.into(),
            value: TermValue::List(values.into_iter().map(Into::into).collect()),
        });
        self
    }

    /// Add a numeric term.
    pub fn number(mut self, key: impl Into<String>, value: f64) -> Self {
        self.terms.push(Term {
            key: key.into(),
            value: TermValue::Number(value),
        });
        self
    }

    /// Add a boolean term.
    pub fn boolean(mut self, key: impl Into<String>, value: bool) -> Self {
        self.terms.push(Term {
            key: key.into(),
            value: TermValue::Bool(value),
        });
        self
    }

    /// Add an explicitly null term.
    pub fn null(mut self, key: impl Into<String>) -> Self {
        self.terms.push(Term {
            key: key.into(),
            value: TermValue::Null,
        });
        self
    }

    /// Keep the entities that do NOT match.
    pub fn invert(mut self) -> Self {
        self.invert = true;
        self
    }

    /// Search every face of a multi-faced card instead of falling back to the
    /// first face only.
    pub fn search_all_faces(mut self) -> Self {
        self.search_all_faces = true;
        self
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn is_inverted(&self) -> bool {
        self.invert
    }

    pub fn searches_all_faces(&self) -> bool {
        self.search_all_faces
    }
}

/// How terms are compared and combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Loose comparison, terms combined with OR (`where`).
    Fuzzy,
    /// Complete comparison, terms combined with AND (`where_exactly`).
    Exact,
}

/// A dropped-term or misuse report produced during query validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The expected value was null or empty; null searches are unsupported.
    NullTerm { key: String },
    /// The key does not exist in the sampled entity's schema.
    UnknownKey { key: String },
    /// The key cannot be searched directly (the faces sub-records).
    UnsearchableKey { key: String },
    /// The collection being searched holds no entities.
    EmptySelection,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::NullTerm { key } => {
                write!(f, "ignoring null or empty value for key {key}")
            }
            Diagnostic::UnknownKey { key } => {
                write!(f, "ignoring unrecognized key {key}")
            }
            Diagnostic::UnsearchableKey { key } => {
                write!(f, "ignoring key {key}: searching it directly is not supported")
            }
            Diagnostic::EmptySelection => write!(f, "searching an empty collection"),
        }
    }
}

/// Query hits plus the diagnostics gathered while validating the terms.
#[derive(Debug, Clone)]
pub struct QueryResult<T> {
    pub hits: T,
    pub diagnostics: Vec<Diagnostic>,
}

/// A typed view of one entity attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttrValue<'a> {
    Text(&'a str),
    List(&'a [String]),
    Number(f64),
    Bool(bool),
}

/// Card attribute keys valid for Scryfall-shaped entities.
const SCRYFALL_CARD_KEYS: &[&str] = &[
    "id", "name", "layout", "uri", "scryfall_uri", "cmc", "type_line", "oracle_text", "mana_cost",
    "power", "toughness", "loyalty", "colors", "color_indicator", "color_identity", "legalities",
    "reserved", "foil", "nonfoil", "oversized", "digital", "reprint", "edhrec_rank", "set",
    "set_name", "collector_number", "image_uris", "rarity", "flavor_text", "artist",
    "border_color", "frame", "watermark", "lang", "power_num", "toughness_num", "loyalty_num",
    "card_faces",
];

/// Card attribute keys valid for magicthegathering.io-shaped entities.
const MTGIO_CARD_KEYS: &[&str] = &[
    "id", "name", "layout", "mana_cost", "cmc", "colors", "color_identity", "names", "type",
    "supertypes", "subtypes", "types", "rarity", "text", "flavor", "artist", "number", "power",
    "toughness", "loyalty", "multiverse_id", "release_date", "printings", "image_url", "set",
    "set_name", "legalities", "rulings", "foreign_names", "power_num", "toughness_num",
    "loyalty_num",
];

/// Whether a key exists in the card schema of the given source.
pub fn schema_contains(source: Option<Source>, key: &str) -> bool {
    match source {
        Some(Source::Scryfall) => SCRYFALL_CARD_KEYS.contains(&key),
        Some(Source::MtgIo) => MTGIO_CARD_KEYS.contains(&key),
        None => SCRYFALL_CARD_KEYS.contains(&key) || MTGIO_CARD_KEYS.contains(&key),
    }
}

/// Validate a query against a sampled entity, returning the effective terms
/// and the diagnostics for every dropped one.
pub fn validate_terms<'q>(
    query: &'q Query,
    sample: Option<&Card>,
) -> (Vec<&'q Term>, Vec<Diagnostic>) {
    let mut effective = Vec::with_capacity(query.terms().len());
    let mut diagnostics = Vec::new();

    if sample.is_none() && !query.terms().is_empty() {
        diagnostics.push(Diagnostic::EmptySelection);
    }

    for term in query.terms() {
        let empty = match &term.value {
            TermValue::Null => true,
            TermValue::Text(s) => s.is_empty(),
            TermValue::List(l) => l.is_empty(),
            _ => false,
        };
        if empty {
            diagnostics.push(Diagnostic::NullTerm {
                key: term.key.clone(),
            });
            continue;
        }
        if term.key == "card_faces" || term.key == "faces" {
            diagnostics.push(Diagnostic::UnsearchableKey {
                key: term.key.clone(),
            });
            continue;
        }
        if let Some(card) = sample {
            if !schema_contains(card.source, &term.key) {
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

/// Evaluate the effective terms of a query against one card.
///
/// Fuzzy mode succeeds when any term matches; exact mode requires every term
/// to match. Terms resolve against the primary attributes, falling back to
/// the faces when the primary attribute is absent: the first face by
/// default, every face with `search_all_faces`.
pub fn card_matches(card: &Card, mode: MatchMode, terms: &[&Term], all_faces: bool) -> bool {
    match mode {
        MatchMode::Fuzzy => terms.iter().any(|term| {
            term_candidates(card, term, all_faces)
                .iter()
                .any(|attr| compare(attr, &term.value, MatchMode::Fuzzy))
        }),
        MatchMode::Exact => terms.iter().all(|term| {
            let candidates = term_candidates(card, term, all_faces);
            !candidates.is_empty()
                && candidates
                    .iter()
                    .any(|attr| compare(attr, &term.value, MatchMode::Exact))
        }),
    }
}

fn term_candidates<'a>(card: &'a Card, term: &Term, all_faces: bool) -> Vec<AttrValue<'a>> {
    if let Some(attr) = resolve_card_attr(card, &term.key, &term.value) {
        return vec![attr];
    }
    if card.faces.is_empty() {
        return Vec::new();
    }
    if all_faces {
        card.faces
            .iter()
            .filter_map(|face| resolve_face_attr(face, &term.key, &term.value))
            .collect()
    } else {
        resolve_face_attr(&card.faces[0], &term.key, &term.value)
            .into_iter()
            .collect()
    }
}

/// Resolve a card attribute for a term. Numeric terms against a string stat
/// fall through to the derived `<key>_num` attribute, so `power = 3` compares
/// against `power_num`.
fn resolve_card_attr<'a>(card: &'a Card, key: &str, value: &TermValue) -> Option<AttrValue<'a>> {
    let direct = card_attr(card, key);
    if matches!(value, TermValue::Number(_)) && !matches!(direct, Some(AttrValue::Number(_))) {
        if let Some(num) = card_attr(card, &format!("{key}_num")) {
            return Some(num);
        }
    }
    direct
}

fn resolve_face_attr<'a>(
    face: &'a CardFace,
    key: &str,
    value: &TermValue,
) -> Option<AttrValue<'a>> {
    let direct = face_attr(face, key);
    if matches!(value, TermValue::Number(_)) && !matches!(direct, Some(AttrValue::Number(_))) {
        if let Some(num) = face_attr(face, &format!("{key}_num")) {
            return Some(num);
        }
    }
    direct
}

fn card_attr<'a>(card: &'a Card, key: &str) -> Option<AttrValue<'a>> {
    let text = |v: &'a Option<String>| v.as_deref().map(AttrValue::Text);
    let list = |v: &'a Option<Vec<String>>| v.as_deref().map(AttrValue::List);
    let number = |v: &Option<f64>| v.map(AttrValue::Number);
    let boolean = |v: &Option<bool>| v.map(AttrValue::Bool);

    match key {
        "id" => Some(AttrValue::Text(card.id.as_str())),
        "set" => card.set_code.as_ref().map(|c| AttrValue::Text(c.as_str())),
        "set_name" => text(&card.set_name),
        "name" => text(&card.name),
        "layout" => text(&card.layout),
        "mana_cost" => text(&card.mana_cost),
        "rarity" => text(&card.rarity),
        "artist" => text(&card.artist),
        "power" => text(&card.power),
        "toughness" => text(&card.toughness),
        "loyalty" => text(&card.loyalty),
        "uri" => text(&card.uri),
        "scryfall_uri" => text(&card.scryfall_uri),
        "type_line" => text(&card.type_line),
        "oracle_text" => text(&card.oracle_text),
        "flavor_text" => text(&card.flavor_text),
        "collector_number" => text(&card.collector_number),
        "border_color" => text(&card.border_color),
        "frame" => text(&card.frame),
        "watermark" => text(&card.watermark),
        "lang" => text(&card.lang),
        "type" => text(&card.card_type),
        "text" => text(&card.text),
        "flavor" => text(&card.flavor),
        "number" => text(&card.number),
        "release_date" => text(&card.release_date),
        "image_url" => text(&card.image_url),
        "cmc" => number(&card.cmc),
        "edhrec_rank" => number(&card.edhrec_rank),
        "multiverse_id" => number(&card.multiverse_id),
        "power_num" => number(&card.power_num),
        "toughness_num" => number(&card.toughness_num),
        "loyalty_num" => number(&card.loyalty_num),
        "colors" => list(&card.colors),
        "color_identity" => list(&card.color_identity),
        "color_indicator" => list(&card.color_indicator),
        "names" => list(&card.names),
        "types" => list(&card.types),
        "supertypes" => list(&card.supertypes),
        "subtypes" => list(&card.subtypes),
        "printings" => list(&card.printings),
        "reserved" => boolean(&card.reserved),
        "foil" => boolean(&card.foil),
        "nonfoil" => boolean(&card.nonfoil),
        "oversized" => boolean(&card.oversized),
        "digital" => boolean(&card.digital),
        "reprint" => boolean(&card.reprint),
        _ => None,
    }
}

fn face_attr<'a>(face: &'a CardFace, key: &str) -> Option<AttrValue<'a>> {
    let text = |v: &'a Option<String>| v.as_deref().map(AttrValue::Text);
    let list = |v: &'a Option<Vec<String>>| v.as_deref().map(AttrValue::List);
    let number = |v: &Option<f64>| v.map(AttrValue::Number);

    match key {
        "name" => text(&face.name),
        "mana_cost" => text(&face.mana_cost),
        "type_line" => text(&face.type_line),
        "oracle_text" => text(&face.oracle_text),
        "power" => text(&face.power),
        "toughness" => text(&face.toughness),
        "loyalty" => text(&face.loyalty),
        "colors" => list(&face.colors),
        "color_indicator" => list(&face.color_indicator),
        "power_num" => number(&face.power_num),
        "toughness_num" => number(&face.toughness_num),
        "loyalty_num" => number(&face.loyalty_num),
        _ => None,
    }
}

/// Compare one attribute against one expected value.
pub(crate) fn compare(attr: &AttrValue<'_>, value: &TermValue, mode: MatchMode) -> bool {
    match (attr, value, mode) {
        (AttrValue::List(attr), TermValue::List(query), MatchMode::Fuzzy) => {
            query.iter().any(|v| attr.contains(v))
        }
        (AttrValue::List(attr), TermValue::List(query), MatchMode::Exact) => {
            let attr: HashSet<&str> = attr.iter().map(String::as_str).collect();
            let query: HashSet<&str> = query.iter().map(String::as_str).collect();
            attr == query
        }
        (AttrValue::Text(attr), TermValue::Text(query), MatchMode::Fuzzy) => {
            attr.to_lowercase().contains(&query.to_lowercase())
        }
        (AttrValue::Text(attr), TermValue::Text(query), MatchMode::Exact) => {
            attr.to_lowercase() == query.to_lowercase()
        }
        (AttrValue::Bool(attr), TermValue::Bool(query), _) => attr == query,
        (AttrValue::Number(attr), TermValue::Number(query), MatchMode::Fuzzy) => query >= attr,
        (AttrValue::Number(attr), TermValue::Number(query), MatchMode::Exact) => query == attr,
        _ => false,
    }
}
