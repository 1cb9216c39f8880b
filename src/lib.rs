//! # mtgmirror
//!
//! A local mirror of the Scryfall and magicthegathering.io card catalogs.
//!
//! The crate keeps one catalog root per upstream source eventually
//! consistent across repeated incremental syncs: set snapshots merge first,
//! card pages stream through a bounded, paced fetch pool and merge
//! sequentially by id, sets that vanished upstream are detached and their
//! cards re-homed. On top of the mirrored collections sits an
//! attribute-matching query layer for deck building, statistics and list
//! algebra.

pub mod collection;
pub mod config;
pub mod fetch;
pub mod index;
pub mod integrity;
pub mod model;
pub mod query;
pub mod reconcile;
pub mod sets;
pub mod store;
pub mod upstream;

use std::sync::Arc;

use anyhow::Result;

// Re-export main types for convenience
pub use collection::{CardList, PackSpec};
pub use config::SyncTuning;
pub use fetch::{FetchOrchestrator, PageRequest, PageResult};
pub use index::IdentityIndex;
pub use integrity::{IntegrityReport, IntegrityViolation};
pub use model::{Card, CardArena, CardFace, CardId, CardRecord, SetCode, SetRecord, Source};
pub use query::{Diagnostic, MatchMode, Query, QueryResult, TermValue};
pub use reconcile::{CardReconcileOutcome, SetReconcileOutcome};
pub use sets::{CardSet, SetCollection};
pub use store::{CatalogRoot, CatalogStore, MemoryStore};
pub use upstream::{MtgIoApi, ScryfallApi, UpstreamCatalog};

const SCRYFALL_ROOT: &str = "scryfall";
const MTGIO_ROOT: &str = "mtgio";

fn root_name(source: Source) -> &'static str {
    match source {
        Source::Scryfall => SCRYFALL_ROOT,
        Source::MtgIo => MTGIO_ROOT,
    }
}

/// Counts reported by one sync run. Partial outcomes (failed pages, orphan
/// cards) surface here rather than as errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub sets_added: usize,
    pub sets_updated: usize,
    /// Codes of the sets detached as obsolete during this run.
    pub obsolete_codes: Vec<SetCode>,
    pub cards_added: usize,
    pub cards_updated: usize,
    pub orphans: usize,
    pub failed_pages: usize,
    /// Cards moved from detached sets into a current set of the same code.
    pub rehomed: usize,
}

/// Main API for the mirrored catalog.
///
/// Owns one working root per upstream source plus the store handle. Sync
/// operations mutate the working root and commit it to the store only after
/// the full reconciliation pass; an interrupted sync leaves the working root
/// however far the merge progressed and the store at its last commit.
pub struct Mirror {
    store: Box<dyn CatalogStore>,
    scryfall: CatalogRoot,
    mtgio: CatalogRoot,
    tuning: SyncTuning,
}

impl Mirror {
    /// Open the mirror over a store, loading (or creating) both roots.
    pub fn open<S>(store: S) -> Result<Self>
    where
        S: CatalogStore + 'static,
    {
        Self::open_with_tuning(store, SyncTuning::default())
    }

    pub fn open_with_tuning<S>(mut store: S, tuning: SyncTuning) -> Result<Self>
    where
        S: CatalogStore + 'static,
    {
        let scryfall = store.load_root(SCRYFALL_ROOT)?;
        let mtgio = store.load_root(MTGIO_ROOT)?;
        Ok(Self {
            store: Box::new(store),
            scryfall,
            mtgio,
            tuning,
        })
    }

    pub fn scryfall(&self) -> &CatalogRoot {
        &self.scryfall
    }

    pub fn mtgio(&self) -> &CatalogRoot {
        &self.mtgio
    }

    pub fn root(&self, source: Source) -> &CatalogRoot {
        match source {
            Source::Scryfall => &self.scryfall,
            Source::MtgIo => &self.mtgio,
        }
    }

    pub fn root_mut(&mut self, source: Source) -> &mut CatalogRoot {
        match source {
            Source::Scryfall => &mut self.scryfall,
            Source::MtgIo => &mut self.mtgio,
        }
    }

    pub fn tuning(&self) -> &SyncTuning {
        &self.tuning
    }

    /// Run a full incremental sync against an upstream: reconcile the set
    /// snapshot, stream and merge the card pages, re-home the members of
    /// detached sets, then commit and pack.
    pub fn sync(&mut self, upstream: Arc<dyn UpstreamCatalog>) -> Result<SyncOutcome> {
        let source = upstream.source();
        let tuning = self.tuning.clone();
        tracing::info!(%source, "starting catalog sync");

        let snapshot = upstream.set_snapshot()?;
        let root = self.root_mut(source);
        let set_outcome = reconcile::reconcile_sets(&mut root.sets, &snapshot);

        let pages = upstream.card_pages(&root.sets)?;
        tracing::info!(
            sets = root.sets.len(),
            pages = pages.len(),
            "set snapshot reconciled"
        );

        let orchestrator = FetchOrchestrator::new(Arc::clone(&upstream), tuning);
        let stream = orchestrator.stream(pages);
        let card_outcome =
            reconcile::reconcile_cards(&mut root.arena, &mut root.cards, &mut root.sets, stream);
        let rehomed =
            reconcile::rehome_obsolete_cards(&root.arena, &mut root.sets, &set_outcome.obsolete);

        let outcome = SyncOutcome {
            sets_added: set_outcome.added,
            sets_updated: set_outcome.updated,
            obsolete_codes: set_outcome
                .obsolete
                .iter()
                .map(|set| set.code.clone())
                .collect(),
            cards_added: card_outcome.added,
            cards_updated: card_outcome.updated,
            orphans: card_outcome.orphans,
            failed_pages: card_outcome.failed_pages,
            rehomed,
        };

        self.commit_root(source)?;
        self.store.pack()?;
        tracing::info!(
            cards_added = outcome.cards_added,
            cards_updated = outcome.cards_updated,
            failed_pages = outcome.failed_pages,
            "catalog sync complete"
        );
        Ok(outcome)
    }

    /// Merge a bulk download — one large array of card records — through the
    /// same reconciliation as the paginated path, then commit and pack. The
    /// set collection is left as-is; records naming no current set become
    /// orphans.
    pub fn merge_bulk(&mut self, source: Source, records: Vec<CardRecord>) -> Result<SyncOutcome> {
        tracing::info!(%source, records = records.len(), "merging bulk card data");
        let root = self.root_mut(source);
        let page = PageResult {
            request: PageRequest::new("bulk:all-cards"),
            records,
            failed: false,
        };
        let card_outcome = reconcile::reconcile_cards(
            &mut root.arena,
            &mut root.cards,
            &mut root.sets,
            std::iter::once(page),
        );

        let outcome = SyncOutcome {
            cards_added: card_outcome.added,
            cards_updated: card_outcome.updated,
            orphans: card_outcome.orphans,
            ..SyncOutcome::default()
        };

        self.commit_root(source)?;
        self.store.pack()?;
        Ok(outcome)
    }

    /// Run the on-demand integrity verification over one root.
    pub fn verify(&self, source: Source) -> IntegrityReport {
        integrity::verify_root(self.root(source))
    }

    /// Commit both working roots to the store.
    pub fn commit(&mut self) -> Result<()> {
        self.store.commit(SCRYFALL_ROOT, &self.scryfall)?;
        self.store.commit(MTGIO_ROOT, &self.mtgio)?;
        Ok(())
    }

    /// Discard uncommitted changes in both working roots, reloading the last
    /// committed state.
    pub fn abort(&mut self) -> Result<()> {
        self.scryfall = self.store.abort(SCRYFALL_ROOT)?;
        self.mtgio = self.store.abort(MTGIO_ROOT)?;
        Ok(())
    }

    /// Compact the underlying store.
    pub fn pack(&mut self) -> Result<()> {
        self.store.pack()
    }

    fn commit_root(&mut self, source: Source) -> Result<()> {
        let name = root_name(source);
        match source {
            Source::Scryfall => self.store.commit(name, &self.scryfall),
            Source::MtgIo => self.store.commit(name, &self.mtgio),
        }
    }
}
