//! # Fetch Orchestrator
//!
//! Bounded-concurrency, paced, paginated fetch. Page requests are dispatched
//! by a single coordinator at a fixed minimum interval, regardless of worker
//! availability, onto a pool of blocking workers. Completions drain in
//! arrival order and stream to the caller as soon as each page is parsed, so
//! later network I/O overlaps with earlier merge work.
//!
//! A failed page is logged and degrades to an empty result with a failure
//! marker; it never aborts the run or other in-flight requests. There are no
//! retries.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver};

use crate::config::SyncTuning;
use crate::model::CardRecord;
use crate::upstream::UpstreamCatalog;

/// One page of an upstream catalog to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub url: String,
}

impl PageRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// The outcome of one page request, streamed in completion order.
#[derive(Debug)]
pub struct PageResult {
    pub request: PageRequest,
    pub records: Vec<CardRecord>,
    /// The request failed and `records` is the empty degradation of it.
    pub failed: bool,
}

/// Streams catalog pages through a bounded worker pool.
pub struct FetchOrchestrator {
    upstream: Arc<dyn UpstreamCatalog>,
    tuning: SyncTuning,
}

impl FetchOrchestrator {
    pub fn new(upstream: Arc<dyn UpstreamCatalog>, tuning: SyncTuning) -> Self {
        Self { upstream, tuning }
    }

    /// Dispatch the given pages and return a stream of their results in
    /// completion order. The stream ends once every page has completed.
    pub fn stream(&self, pages: Vec<PageRequest>) -> PageStream {
        let (job_tx, job_rx) = unbounded::<PageRequest>();
        let (result_tx, result_rx) = unbounded::<PageResult>();

        let mut handles = Vec::with_capacity(self.tuning.workers + 1);
        for _ in 0..self.tuning.workers.max(1) {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let upstream = Arc::clone(&self.upstream);
            handles.push(thread::spawn(move || {
                for request in job_rx.iter() {
                    let result = match upstream.fetch_page(&request) {
                        Ok(records) => PageResult {
                            request,
                            records,
                            failed: false,
                        },
                        Err(error) => {
                            tracing::warn!(
                                url = %request.url,
                                %error,
                                "page request failed, treating as empty"
                            );
                            PageResult {
                                request,
                                records: Vec::new(),
                                failed: true,
                            }
                        }
                    };
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            }));
        }
        // The stream must close once the workers finish, so the orchestrator
        // keeps no sender of its own.
        drop(job_rx);
        drop(result_tx);

        let interval = self.tuning.dispatch_interval;
        let total = pages.len();
        handles.push(thread::spawn(move || {
            for (dispatched, request) in pages.into_iter().enumerate() {
                if job_tx.send(request).is_err() {
                    break;
                }
                tracing::debug!(dispatched = dispatched + 1, total, "dispatched page request");
                if !interval.is_zero() {
                    thread::sleep(interval);
                }
            }
        }));

        PageStream {
            rx: result_rx,
            handles,
        }
    }
}

/// Iterator over page results in completion order.
pub struct PageStream {
    rx: Receiver<PageResult>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl Iterator for PageStream {
    type Item = PageResult;

    fn next(&mut self) -> Option<PageResult> {
        self.rx.recv().ok()
    }
}

impl Drop for PageStream {
    fn drop(&mut self) {
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SetRecord, Source};
    use crate::sets::SetCollection;
    use anyhow::{anyhow, Result};
    use serde_json::json;
    use std::collections::HashSet;

    struct SlowPages {
        pages: usize,
        failing: HashSet<usize>,
    }

    impl UpstreamCatalog for SlowPages {
        fn source(&self) -> Source {
            Source::Scryfall
        }

        fn set_snapshot(&self) -> Result<Vec<SetRecord>> {
            Ok(Vec::new())
        }

        fn card_pages(&self, _sets: &SetCollection) -> Result<Vec<PageRequest>> {
            Ok((0..self.pages)
                .map(|i| PageRequest::new(format!("stub://page/{i}")))
                .collect())
        }

        fn fetch_page(&self, request: &PageRequest) -> Result<Vec<CardRecord>> {
            let index: usize = request
                .url
                .rsplit('/')
                .next()
                .unwrap()
                .parse()
                .map_err(|_| anyhow!("bad stub url"))?;
            if self.failing.contains(&index) {
                return Err(anyhow!("stub transport failure"));
            }
            // Earlier pages take longer, so completion order differs from
            // dispatch order.
            std::thread::sleep(std::time::Duration::from_millis(
                (self.pages - index) as u64 * 5,
            ));
            let record = json!({
                "id": format!("card-{index}"),
                "scryfall_uri": "https://scryfall.com/card",
                "name": format!("Card {index}"),
                "set": "tst"
            });
            Ok(vec![serde_json::from_value(record).unwrap()])
        }
    }

    #[test]
    fn test_all_pages_complete() {
        let upstream = Arc::new(SlowPages {
            pages: 6,
            failing: HashSet::new(),
        });
        let orchestrator =
            FetchOrchestrator::new(upstream.clone(), SyncTuning::unpaced());
        let pages = upstream.card_pages(&SetCollection::new()).unwrap();

        let results: Vec<PageResult> = orchestrator.stream(pages).collect();
        assert_eq!(results.len(), 6);
        assert!(results.iter().all(|page| !page.failed));

        let urls: HashSet<String> = results.iter().map(|p| p.request.url.clone()).collect();
        assert_eq!(urls.len(), 6);
    }

    #[test]
    fn test_failed_page_degrades_to_empty() {
        let upstream = Arc::new(SlowPages {
            pages: 3,
            failing: HashSet::from([1]),
        });
        let orchestrator =
            FetchOrchestrator::new(upstream.clone(), SyncTuning::unpaced());
        let pages = upstream.card_pages(&SetCollection::new()).unwrap();

        let results: Vec<PageResult> = orchestrator.stream(pages).collect();
        assert_eq!(results.len(), 3);

        let failed: Vec<&PageResult> = results.iter().filter(|p| p.failed).collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].records.is_empty());
        assert_eq!(results.iter().filter(|p| !p.failed).count(), 2);
    }

    #[test]
    fn test_single_worker_still_drains_everything() {
        let upstream = Arc::new(SlowPages {
            pages: 4,
            failing: HashSet::new(),
        });
        let tuning = SyncTuning {
            workers: 1,
            ..SyncTuning::unpaced()
        };
        let orchestrator = FetchOrchestrator::new(upstream.clone(), tuning);
        let pages = upstream.card_pages(&SetCollection::new()).unwrap();

        let results: Vec<PageResult> = orchestrator.stream(pages).collect();
        assert_eq!(results.len(), 4);
    }
}
