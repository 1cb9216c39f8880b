//! # Upstream Catalogs
//!
//! The two remote catalog sources behind one trait: Scryfall and
//! magicthegathering.io. Both expose a flat set snapshot fetched eagerly and
//! paginated card listings whose page count is computable up front — per set
//! for Scryfall (175 records a page), globally for magicthegathering.io (100
//! records a page, total from the `Total-Count` response header). Scryfall
//! additionally offers bulk downloads that substitute for the paginated card
//! fetch.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use serde::Deserialize;

use crate::fetch::PageRequest;
use crate::model::{CardRecord, SetRecord, Source};
use crate::sets::SetCollection;

pub const SCRYFALL_SETS_URL: &str = "https://api.scryfall.com/sets";
pub const SCRYFALL_BULK_DATA_URL: &str = "https://api.scryfall.com/bulk-data";
pub const SCRYFALL_PAGE_SIZE: u64 = 175;

pub const MTGIO_SETS_URL: &str = "https://api.magicthegathering.io/v1/sets/";
pub const MTGIO_CARDS_URL: &str = "https://api.magicthegathering.io/v1/cards";
pub const MTGIO_PAGE_SIZE: u64 = 100;

/// magicthegathering.io rejects requests without a browser user agent.
const MTGIO_USER_AGENT: &str = "Mozilla/5.0";

/// A remote catalog source the sync engine can mirror.
pub trait UpstreamCatalog: Send + Sync {
    /// Which schema this source produces.
    fn source(&self) -> Source;

    /// Fetch the full set snapshot. Small payload, fetched eagerly; a
    /// failure here is fatal to the sync since nothing can be reconciled
    /// without it.
    fn set_snapshot(&self) -> Result<Vec<SetRecord>>;

    /// Enumerate the card page requests for the current set collection.
    fn card_pages(&self, sets: &SetCollection) -> Result<Vec<PageRequest>>;

    /// Fetch and parse one card page.
    fn fetch_page(&self, request: &PageRequest) -> Result<Vec<CardRecord>>;
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ScryfallList<T> {
    #[serde(default)]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct MtgIoSetList {
    #[serde(default)]
    sets: Vec<SetRecord>,
}

#[derive(Debug, Deserialize)]
struct MtgIoCardList {
    #[serde(default)]
    cards: Vec<CardRecord>,
}

/// One entry of Scryfall's bulk-data listing.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkEntry {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
    pub download_uri: Option<String>,
    pub updated_at: Option<String>,
    pub size: Option<u64>,
}

/// Build the Scryfall card search pages for a set collection: one request
/// per `ceil(card_count / 175)` pages per set.
pub fn scryfall_page_urls(sets: &SetCollection) -> Vec<PageRequest> {
    let mut pages = Vec::new();
    for set in sets.iter() {
        let count = set.card_count.unwrap_or(0);
        let last_page = count.div_ceil(SCRYFALL_PAGE_SIZE);
        for page in 1..=last_page {
            pages.push(PageRequest::new(format!(
                "https://api.scryfall.com/cards/search?include_extras=true&order=set&page={page}&q=e%3A{code}&unique=prints",
                code = set.code
            )));
        }
    }
    pages
}

/// Build the magicthegathering.io card pages for a total record count:
/// `ceil(total / 100)` global pages.
pub fn mtgio_page_urls(total: u64) -> Vec<PageRequest> {
    (1..=total.div_ceil(MTGIO_PAGE_SIZE))
        .map(|page| PageRequest::new(format!("{MTGIO_CARDS_URL}?page={page}")))
        .collect()
}

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("building http client")
}

/// The Scryfall REST API.
pub struct ScryfallApi {
    client: Client,
}

impl ScryfallApi {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }

    /// List the available bulk downloads.
    pub fn bulk_entries(&self) -> Result<Vec<BulkEntry>> {
        let list: ScryfallList<BulkEntry> = self
            .client
            .get(SCRYFALL_BULK_DATA_URL)
            .send()
            .and_then(|response| response.error_for_status())
            .with_context(|| format!("requesting {SCRYFALL_BULK_DATA_URL}"))?
            .json()
            .context("decoding bulk-data listing")?;
        Ok(list.data)
    }

    /// Download one bulk entry: a single large JSON array of card records
    /// that substitutes for the paginated card fetch.
    pub fn download_bulk(&self, entry: &BulkEntry) -> Result<Vec<CardRecord>> {
        let uri = entry
            .download_uri
            .as_deref()
            .ok_or_else(|| anyhow!("bulk entry has no download uri"))?;
        self.client
            .get(uri)
            .send()
            .and_then(|response| response.error_for_status())
            .with_context(|| format!("requesting {uri}"))?
            .json()
            .context("decoding bulk card data")
    }
}

impl UpstreamCatalog for ScryfallApi {
    fn source(&self) -> Source {
        Source::Scryfall
    }

    fn set_snapshot(&self) -> Result<Vec<SetRecord>> {
        let list: ScryfallList<SetRecord> = self
            .client
            .get(SCRYFALL_SETS_URL)
            .send()
            .and_then(|response| response.error_for_status())
            .with_context(|| format!("requesting {SCRYFALL_SETS_URL}"))?
            .json()
            .context("decoding set snapshot")?;
        Ok(list.data)
    }

    fn card_pages(&self, sets: &SetCollection) -> Result<Vec<PageRequest>> {
        Ok(scryfall_page_urls(sets))
    }

    fn fetch_page(&self, request: &PageRequest) -> Result<Vec<CardRecord>> {
        let list: ScryfallList<CardRecord> = self
            .client
            .get(&request.url)
            .send()
            .and_then(|response| response.error_for_status())
            .with_context(|| format!("requesting {}", request.url))?
            .json()
            .context("decoding card page")?;
        Ok(list.data)
    }
}

/// The magicthegathering.io REST API.
pub struct MtgIoApi {
    client: Client,
}

impl MtgIoApi {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }

    /// Probe the total card count from the `Total-Count` header.
    pub fn total_cards(&self) -> Result<u64> {
        let response = self
            .client
            .get(MTGIO_CARDS_URL)
            .header(USER_AGENT, MTGIO_USER_AGENT)
            .send()
            .and_then(|response| response.error_for_status())
            .with_context(|| format!("requesting {MTGIO_CARDS_URL}"))?;
        response
            .headers()
            .get("Total-Count")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
            .ok_or_else(|| anyhow!("missing or malformed Total-Count header"))
    }
}

impl UpstreamCatalog for MtgIoApi {
    fn source(&self) -> Source {
        Source::MtgIo
    }

    fn set_snapshot(&self) -> Result<Vec<SetRecord>> {
        let list: MtgIoSetList = self
            .client
            .get(MTGIO_SETS_URL)
            .header(USER_AGENT, MTGIO_USER_AGENT)
            .send()
            .and_then(|response| response.error_for_status())
            .with_context(|| format!("requesting {MTGIO_SETS_URL}"))?
            .json()
            .context("decoding set snapshot")?;
        Ok(list.sets)
    }

    fn card_pages(&self, _sets: &SetCollection) -> Result<Vec<PageRequest>> {
        Ok(mtgio_page_urls(self.total_cards()?))
    }

    fn fetch_page(&self, request: &PageRequest) -> Result<Vec<CardRecord>> {
        let list: MtgIoCardList = self
            .client
            .get(&request.url)
            .header(USER_AGENT, MTGIO_USER_AGENT)
            .send()
            .and_then(|response| response.error_for_status())
            .with_context(|| format!("requesting {}", request.url))?
            .json()
            .context("decoding card page")?;
        Ok(list.cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sets::CardSet;
    use serde_json::json;

    fn scryfall_set(code: &str, card_count: u64) -> CardSet {
        CardSet::from_record(
            &serde_json::from_value(json!({
                "code": code,
                "scryfall_uri": format!("https://scryfall.com/sets/{code}"),
                "name": code.to_uppercase(),
                "card_count": card_count
            }))
            .unwrap(),
        )
    }

    #[test]
    fn test_scryfall_page_math() {
        let mut sets = SetCollection::new();
        sets.push(scryfall_set("od", 350));
        sets.push(scryfall_set("tor", 176));
        sets.push(scryfall_set("jud", 0));

        let pages = scryfall_page_urls(&sets);
        // 350/175 = 2 pages, 176/175 = 2 pages, empty set contributes none.
        assert_eq!(pages.len(), 4);
        assert!(pages[0].url.contains("page=1"));
        assert!(pages[0].url.contains("q=e%3Aod"));
        assert!(pages[3].url.contains("q=e%3Ator"));
    }

    #[test]
    fn test_mtgio_page_math() {
        assert_eq!(mtgio_page_urls(0).len(), 0);
        assert_eq!(mtgio_page_urls(1).len(), 1);
        assert_eq!(mtgio_page_urls(100).len(), 1);
        assert_eq!(mtgio_page_urls(101).len(), 2);
        let pages = mtgio_page_urls(250);
        assert_eq!(pages.len(), 3);
        assert!(pages[2].url.ends_with("page=3"));
    }

    #[test]
    fn test_page_payload_shapes() {
        let scryfall: ScryfallList<CardRecord> = serde_json::from_value(json!({
            "object": "list",
            "has_more": false,
            "data": [{
                "id": "c1",
                "scryfall_uri": "https://scryfall.com/card/c1",
                "name": "Wild Mongrel",
                "set": "od"
            }]
        }))
        .unwrap();
        assert_eq!(scryfall.data.len(), 1);

        let mtgio: MtgIoCardList = serde_json::from_value(json!({
            "cards": [{
                "id": "c2",
                "name": "Wild Mongrel",
                "set": "OD"
            }]
        }))
        .unwrap();
        assert_eq!(mtgio.cards.len(), 1);
    }
}
