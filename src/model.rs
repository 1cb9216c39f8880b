//! # Data Model
//!
//! Core data structures for the mirrored catalog: cards, card faces, and the
//! owning card arena. A card is constructed from an upstream JSON record and
//! carries the superset of both upstream schemas as optional fields; the
//! source shape is resolved at construction time from a discriminant in the
//! payload (`scryfall_uri` present means Scryfall, anything else is
//! magicthegathering.io).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashMap;

/// Stable, opaque card identifier assigned by the upstream catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardId(String);

impl CardId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Natural key of a set, e.g. `khm` or `10E`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SetCode(String);

impl SetCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which upstream API produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    Scryfall,
    MtgIo,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Scryfall => write!(f, "scryfall"),
            Source::MtgIo => write!(f, "mtgio"),
        }
    }
}

/// Characters stripped from `power`/`toughness`/`loyalty` strings before
/// numeric parsing. Upstream uses them for variable or special stats
/// (`1+*`, `X`, `∞`).
const STAT_MARKERS: &[char] = &['+', '*', '∞', '?', '²', 'X'];

/// Derive the numeric form of a printed stat string.
///
/// Marker characters are stripped and the remainder parsed; a string that is
/// empty after stripping derives to zero, an unparseable remainder derives to
/// `None`, and an absent stat stays absent.
pub fn derived_stat(value: Option<&str>) -> Option<f64> {
    let value = value?;
    let stripped: String = value.chars().filter(|c| !STAT_MARKERS.contains(c)).collect();
    if stripped.is_empty() {
        Some(0.0)
    } else {
        stripped.trim().parse().ok()
    }
}

/// One printed side of a multi-faced card. Faces carry a partial subset of
/// the card attributes; absent fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardFace {
    pub name: Option<String>,
    pub mana_cost: Option<String>,
    pub type_line: Option<String>,
    pub oracle_text: Option<String>,
    pub colors: Option<Vec<String>>,
    pub color_indicator: Option<Vec<String>>,
    pub power: Option<String>,
    pub toughness: Option<String>,
    pub loyalty: Option<String>,
    pub image_uris: Option<BTreeMap<String, String>>,
    pub power_num: Option<f64>,
    pub toughness_num: Option<f64>,
    pub loyalty_num: Option<f64>,
}

impl CardFace {
    fn from_record(record: &FaceRecord) -> Self {
        let mut face = Self {
            name: record.name.clone(),
            mana_cost: record.mana_cost.clone(),
            type_line: record.type_line.clone(),
            oracle_text: record.oracle_text.clone(),
            colors: record.colors.clone(),
            color_indicator: record.color_indicator.clone(),
            power: record.power.clone(),
            toughness: record.toughness.clone(),
            loyalty: record.loyalty.clone(),
            image_uris: record.image_uris.clone(),
            power_num: None,
            toughness_num: None,
            loyalty_num: None,
        };
        face.recompute_derived();
        face
    }

    fn recompute_derived(&mut self) {
        self.power_num = derived_stat(self.power.as_deref());
        self.toughness_num = derived_stat(self.toughness.as_deref());
        self.loyalty_num = derived_stat(self.loyalty.as_deref());
    }
}

/// A mirrored card.
///
/// Every attribute is optional because the two upstream schemas only overlap
/// partially; the `source` discriminant records which shape populated the
/// card. Derived numeric stats are recomputed on construction and on every
/// update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub source: Option<Source>,
    pub set_code: Option<SetCode>,
    pub set_name: Option<String>,

    pub name: Option<String>,
    pub layout: Option<String>,
    pub mana_cost: Option<String>,
    pub cmc: Option<f64>,
    pub colors: Option<Vec<String>>,
    pub color_identity: Option<Vec<String>>,
    pub rarity: Option<String>,
    pub artist: Option<String>,
    pub power: Option<String>,
    pub toughness: Option<String>,
    pub loyalty: Option<String>,
    pub legalities: Option<serde_json::Value>,

    // Scryfall-only attributes.
    pub uri: Option<String>,
    pub scryfall_uri: Option<String>,
    pub type_line: Option<String>,
    pub oracle_text: Option<String>,
    pub flavor_text: Option<String>,
    pub collector_number: Option<String>,
    pub image_uris: Option<BTreeMap<String, String>>,
    pub color_indicator: Option<Vec<String>>,
    pub faces: Vec<CardFace>,
    pub reserved: Option<bool>,
    pub foil: Option<bool>,
    pub nonfoil: Option<bool>,
    pub oversized: Option<bool>,
    pub digital: Option<bool>,
    pub reprint: Option<bool>,
    pub edhrec_rank: Option<f64>,
    pub border_color: Option<String>,
    pub frame: Option<String>,
    pub watermark: Option<String>,
    pub lang: Option<String>,

    // magicthegathering.io-only attributes.
    pub card_type: Option<String>,
    pub types: Option<Vec<String>>,
    pub supertypes: Option<Vec<String>>,
    pub subtypes: Option<Vec<String>>,
    pub names: Option<Vec<String>>,
    pub text: Option<String>,
    pub flavor: Option<String>,
    pub number: Option<String>,
    pub multiverse_id: Option<f64>,
    pub release_date: Option<String>,
    pub printings: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub rulings: Option<serde_json::Value>,
    pub foreign_names: Option<serde_json::Value>,

    pub power_num: Option<f64>,
    pub toughness_num: Option<f64>,
    pub loyalty_num: Option<f64>,
}

impl Card {
    /// Construct a card from an upstream record, resolving the source shape
    /// and computing the derived numeric stats.
    pub fn from_record(record: &CardRecord) -> Self {
        let mut card = Card {
            id: CardId::new(record.id()),
            ..Default::default()
        };
        card.apply_record(record);
        card
    }

    /// Overwrite this card's attributes with the fields carried by an
    /// incoming record of the same identity. Fields exclusive to the other
    /// upstream schema are left untouched; derived numerics and face
    /// sub-records are recomputed.
    pub fn apply_record(&mut self, record: &CardRecord) {
        match record {
            CardRecord::Scryfall(r) => self.apply_scryfall(r),
            CardRecord::MtgIo(r) => self.apply_mtgio(r),
        }
        self.recompute_derived();
    }

    fn apply_scryfall(&mut self, r: &ScryfallCard) {
        self.source = Some(Source::Scryfall);
        self.set_code = r.set.clone().map(SetCode::new);
        self.set_name = r.set_name.clone();
        self.name = r.name.clone();
        self.layout = r.layout.clone();
        self.mana_cost = r.mana_cost.clone();
        self.cmc = r.cmc;
        self.colors = r.colors.clone();
        self.color_identity = r.color_identity.clone();
        self.rarity = r.rarity.clone();
        self.artist = r.artist.clone();
        self.power = r.power.clone();
        self.toughness = r.toughness.clone();
        self.loyalty = r.loyalty.clone();
        self.legalities = r.legalities.clone();
        self.uri = r.uri.clone();
        self.scryfall_uri = Some(r.scryfall_uri.clone());
        self.type_line = r.type_line.clone();
        self.oracle_text = r.oracle_text.clone();
        self.flavor_text = r.flavor_text.clone();
        self.collector_number = r.collector_number.clone();
        self.image_uris = r.image_uris.clone();
        self.color_indicator = r.color_indicator.clone();
        self.faces = r
            .card_faces
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .map(CardFace::from_record)
            .collect();
        self.reserved = r.reserved;
        self.foil = r.foil;
        self.nonfoil = r.nonfoil;
        self.oversized = r.oversized;
        self.digital = r.digital;
        self.reprint = r.reprint;
        self.edhrec_rank = r.edhrec_rank;
        self.border_color = r.border_color.clone();
        self.frame = r.frame.clone();
        self.watermark = r.watermark.clone();
        self.lang = r.lang.clone();
    }

    fn apply_mtgio(&mut self, r: &MtgIoCard) {
        self.source = Some(Source::MtgIo);
        self.set_code = r.set.clone().map(SetCode::new);
        self.set_name = r.set_name.clone();
        self.name = r.name.clone();
        self.layout = r.layout.clone();
        self.mana_cost = r.mana_cost.clone();
        self.cmc = r.cmc;
        self.colors = r.colors.clone();
        self.color_identity = r.color_identity.clone();
        self.rarity = r.rarity.clone();
        self.artist = r.artist.clone();
        self.power = r.power.clone();
        self.toughness = r.toughness.clone();
        self.loyalty = r.loyalty.clone();
        self.legalities = r.legalities.clone();
        self.card_type = r.card_type.clone();
        self.types = r.types.clone();
        self.supertypes = r.supertypes.clone();
        self.subtypes = r.subtypes.clone();
        self.names = r.names.clone();
        self.text = r.text.clone();
        self.flavor = r.flavor.clone();
        self.number = r.number.clone();
        self.multiverse_id = r.multiverse_id;
        self.release_date = r.release_date.clone();
        self.printings = r.printings.clone();
        self.image_url = r.image_url.clone();
        self.rulings = r.rulings.clone();
        self.foreign_names = r.foreign_names.clone();
        self.faces = Vec::new();
    }

    fn recompute_derived(&mut self) {
        self.power_num = derived_stat(self.power.as_deref());
        self.toughness_num = derived_stat(self.toughness.as_deref());
        self.loyalty_num = derived_stat(self.loyalty.as_deref());
        for face in &mut self.faces {
            face.recompute_derived();
        }
    }

    /// The type text of the card, regardless of which upstream produced it.
    pub fn type_text(&self) -> Option<&str> {
        self.type_line.as_deref().or(self.card_type.as_deref())
    }
}

/// Single owner of all card objects in a catalog root. The global collection
/// and every set member view hold `CardId` references into this arena.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardArena {
    cards: FxHashMap<CardId, Card>,
}

impl CardArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &CardId) -> Option<&Card> {
        self.cards.get(id)
    }

    pub fn get_mut(&mut self, id: &CardId) -> Option<&mut Card> {
        self.cards.get_mut(id)
    }

    /// Insert a card, returning its id. An existing card with the same id is
    /// replaced.
    pub fn insert(&mut self, card: Card) -> CardId {
        let id = card.id.clone();
        self.cards.insert(id.clone(), card);
        id
    }

    pub fn contains(&self, id: &CardId) -> bool {
        self.cards.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CardId, &Card)> {
        self.cards.iter()
    }
}

/// A face sub-record as it appears inside a Scryfall card payload.
#[derive(Debug, Clone, Deserialize)]
pub struct FaceRecord {
    pub name: Option<String>,
    pub mana_cost: Option<String>,
    pub type_line: Option<String>,
    pub oracle_text: Option<String>,
    pub colors: Option<Vec<String>>,
    pub color_indicator: Option<Vec<String>>,
    pub power: Option<String>,
    pub toughness: Option<String>,
    pub loyalty: Option<String>,
    pub image_uris: Option<BTreeMap<String, String>>,
}

/// Raw Scryfall card payload. `scryfall_uri` is the shape discriminant and is
/// required; everything else is defensively optional.
#[derive(Debug, Clone, Deserialize)]
pub struct ScryfallCard {
    pub id: String,
    pub scryfall_uri: String,
    pub uri: Option<String>,
    pub name: Option<String>,
    pub layout: Option<String>,
    pub mana_cost: Option<String>,
    pub cmc: Option<f64>,
    pub type_line: Option<String>,
    pub oracle_text: Option<String>,
    pub flavor_text: Option<String>,
    pub colors: Option<Vec<String>>,
    pub color_identity: Option<Vec<String>>,
    pub color_indicator: Option<Vec<String>>,
    pub card_faces: Option<Vec<FaceRecord>>,
    pub power: Option<String>,
    pub toughness: Option<String>,
    pub loyalty: Option<String>,
    pub rarity: Option<String>,
    pub artist: Option<String>,
    pub set: Option<String>,
    pub set_name: Option<String>,
    pub collector_number: Option<String>,
    pub image_uris: Option<BTreeMap<String, String>>,
    pub legalities: Option<serde_json::Value>,
    pub reserved: Option<bool>,
    pub foil: Option<bool>,
    pub nonfoil: Option<bool>,
    pub oversized: Option<bool>,
    pub digital: Option<bool>,
    pub reprint: Option<bool>,
    pub edhrec_rank: Option<f64>,
    pub border_color: Option<String>,
    pub frame: Option<String>,
    pub watermark: Option<String>,
    pub lang: Option<String>,
}

/// Raw magicthegathering.io card payload.
#[derive(Debug, Clone, Deserialize)]
pub struct MtgIoCard {
    pub id: String,
    pub name: Option<String>,
    pub layout: Option<String>,
    #[serde(rename = "manaCost")]
    pub mana_cost: Option<String>,
    pub cmc: Option<f64>,
    pub colors: Option<Vec<String>>,
    #[serde(rename = "colorIdentity")]
    pub color_identity: Option<Vec<String>>,
    pub names: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub card_type: Option<String>,
    pub supertypes: Option<Vec<String>>,
    pub subtypes: Option<Vec<String>>,
    pub types: Option<Vec<String>>,
    pub rarity: Option<String>,
    pub text: Option<String>,
    pub flavor: Option<String>,
    pub artist: Option<String>,
    pub number: Option<String>,
    pub power: Option<String>,
    pub toughness: Option<String>,
    pub loyalty: Option<String>,
    #[serde(rename = "multiverseid")]
    pub multiverse_id: Option<f64>,
    #[serde(rename = "releaseDate")]
    pub release_date: Option<String>,
    pub printings: Option<Vec<String>>,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    pub set: Option<String>,
    #[serde(rename = "setName")]
    pub set_name: Option<String>,
    pub legalities: Option<serde_json::Value>,
    pub rulings: Option<serde_json::Value>,
    #[serde(rename = "foreignNames")]
    pub foreign_names: Option<serde_json::Value>,
}

/// A card record as decoded from either upstream. Deserialization tries the
/// Scryfall shape first; payloads without `scryfall_uri` fall through to the
/// magicthegathering.io shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CardRecord {
    Scryfall(ScryfallCard),
    MtgIo(MtgIoCard),
}

impl CardRecord {
    pub fn id(&self) -> &str {
        match self {
            CardRecord::Scryfall(r) => &r.id,
            CardRecord::MtgIo(r) => &r.id,
        }
    }

    pub fn set_code(&self) -> Option<&str> {
        match self {
            CardRecord::Scryfall(r) => r.set.as_deref(),
            CardRecord::MtgIo(r) => r.set.as_deref(),
        }
    }
}

/// Raw Scryfall set payload, discriminated the same way as cards.
#[derive(Debug, Clone, Deserialize)]
pub struct ScryfallSet {
    pub code: String,
    pub scryfall_uri: String,
    pub id: Option<String>,
    pub name: Option<String>,
    pub uri: Option<String>,
    pub search_uri: Option<String>,
    pub set_type: Option<String>,
    pub released_at: Option<String>,
    pub block: Option<String>,
    pub block_code: Option<String>,
    pub parent_set_code: Option<String>,
    pub card_count: Option<u64>,
    pub printed_size: Option<u64>,
    pub digital: Option<bool>,
    pub foil_only: Option<bool>,
    pub nonfoil_only: Option<bool>,
    pub icon_svg_uri: Option<String>,
}

/// Raw magicthegathering.io set payload.
#[derive(Debug, Clone, Deserialize)]
pub struct MtgIoSet {
    pub code: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub set_type: Option<String>,
    pub border: Option<String>,
    #[serde(rename = "releaseDate")]
    pub release_date: Option<String>,
    #[serde(rename = "gathererCode")]
    pub gatherer_code: Option<String>,
    #[serde(rename = "oldCode")]
    pub old_code: Option<String>,
    #[serde(rename = "magicCardsInfoCode")]
    pub magic_cards_info_code: Option<String>,
    pub block: Option<String>,
    #[serde(rename = "onlineOnly")]
    pub online_only: Option<bool>,
    pub booster: Option<serde_json::Value>,
}

/// A set record as decoded from either upstream.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SetRecord {
    Scryfall(ScryfallSet),
    MtgIo(MtgIoSet),
}

impl SetRecord {
    pub fn code(&self) -> &str {
        match self {
            SetRecord::Scryfall(r) => &r.code,
            SetRecord::MtgIo(r) => &r.code,
        }
    }
}
