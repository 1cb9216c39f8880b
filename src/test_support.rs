//! Shared builders for integration tests: canned upstream records and a
//! stubbed catalog source that serves them without touching the network.

use std::collections::HashSet;

use anyhow::{anyhow, Result};
use serde_json::json;

use mtgmirror::fetch::PageRequest;
use mtgmirror::model::{CardRecord, SetRecord, Source};
use mtgmirror::sets::SetCollection;
use mtgmirror::upstream::UpstreamCatalog;

#[allow(dead_code)]
pub fn scryfall_card(id: &str, name: &str, set: &str) -> CardRecord {
    scryfall_card_with(id, set, json!({ "name": name }))
}

/// A Scryfall-shaped card record with extra attributes merged in.
#[allow(dead_code)]
pub fn scryfall_card_with(id: &str, set: &str, extra: serde_json::Value) -> CardRecord {
    let mut value = json!({
        "id": id,
        "scryfall_uri": format!("https://scryfall.com/card/{id}"),
        "set": set,
        "rarity": "common"
    });
    if let (Some(base), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
        for (key, entry) in extra {
            base.insert(key.clone(), entry.clone());
        }
    }
    serde_json::from_value(value).unwrap()
}

#[allow(dead_code)]
pub fn scryfall_set(code: &str, name: &str, card_count: u64) -> SetRecord {
    serde_json::from_value(json!({
        "code": code,
        "scryfall_uri": format!("https://scryfall.com/sets/{code}"),
        "name": name,
        "set_type": "expansion",
        "card_count": card_count
    }))
    .unwrap()
}

#[allow(dead_code)]
pub fn mtgio_card(id: &str, name: &str, set: &str) -> CardRecord {
    serde_json::from_value(json!({
        "id": id,
        "name": name,
        "set": set,
        "rarity": "Common"
    }))
    .unwrap()
}

#[allow(dead_code)]
pub fn mtgio_set(code: &str, name: &str) -> SetRecord {
    serde_json::from_value(json!({
        "code": code,
        "name": name,
        "type": "expansion"
    }))
    .unwrap()
}

/// An upstream that serves canned sets and pages. Pages are addressed by
/// index through stub URLs; listed indexes fail with a transport error.
#[allow(dead_code)]
pub struct StubUpstream {
    pub source: Source,
    pub sets: Vec<SetRecord>,
    pub pages: Vec<Vec<CardRecord>>,
    pub failing: HashSet<usize>,
}

#[allow(dead_code)]
impl StubUpstream {
    pub fn scryfall(sets: Vec<SetRecord>, pages: Vec<Vec<CardRecord>>) -> Self {
        Self {
            source: Source::Scryfall,
            sets,
            pages,
            failing: HashSet::new(),
        }
    }

    pub fn mtgio(sets: Vec<SetRecord>, pages: Vec<Vec<CardRecord>>) -> Self {
        Self {
            source: Source::MtgIo,
            sets,
            pages,
            failing: HashSet::new(),
        }
    }

    pub fn with_failing_page(mut self, index: usize) -> Self {
        self.failing.insert(index);
        self
    }
}

impl UpstreamCatalog for StubUpstream {
    fn source(&self) -> Source {
        self.source
    }

    fn set_snapshot(&self) -> Result<Vec<SetRecord>> {
        Ok(self.sets.clone())
    }

    fn card_pages(&self, _sets: &SetCollection) -> Result<Vec<PageRequest>> {
        Ok((0..self.pages.len())
            .map(|index| PageRequest::new(format!("stub://page/{index}")))
            .collect())
    }

    fn fetch_page(&self, request: &PageRequest) -> Result<Vec<CardRecord>> {
        let index: usize = request
            .url
            .rsplit('/')
            .next()
            .and_then(|part| part.parse().ok())
            .ok_or_else(|| anyhow!("malformed stub url {}", request.url))?;
        if self.failing.contains(&index) {
            return Err(anyhow!("stub transport failure for page {index}"));
        }
        self.pages
            .get(index)
            .cloned()
            .ok_or_else(|| anyhow!("no stub page {index}"))
    }
}
