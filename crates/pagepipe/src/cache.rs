//! Pipelining page cache.
//!
//! `PagedResultCache` answers page requests for one table. A request inside
//! the buffered window with the same sort/filter signature is sliced from
//! memory; anything else goes to the transport with an over-fetched range
//! (page length times the pipe factor) so the next few pages are hits.
//!
//! ## Ordering
//!
//! The window lock is never held across a fetch. Each fetch takes a sequence
//! number when it is planned and installs its payload only if no newer fetch
//! has installed first. A superseded response is still returned to its
//! caller, which drops it by echo.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::PipeConfig;
use crate::policy::{decide, Decision};
use crate::transport::Transport;
use crate::types::{PageRequest, PageResponse, PipeResult};
use crate::window::{CacheWindow, WindowSnapshot};

/// Page cache for one table, in front of a transport.
pub struct PagedResultCache<T: Transport> {
    transport: T,
    config: PipeConfig,
    window: Mutex<CacheWindow>,
    hits: AtomicU64,
    misses: AtomicU64,
    failures: AtomicU64,
    discarded: AtomicU64,
}

impl<T: Transport> PagedResultCache<T> {
    /// Create a cache with an empty window.
    pub fn new(transport: T, config: PipeConfig) -> Self {
        Self {
            transport,
            config,
            window: Mutex::new(CacheWindow::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    /// Resolve one page request, from memory when possible.
    ///
    /// On a transport error the window is left exactly as it was.
    pub async fn resolve(&self, request: &PageRequest) -> PipeResult<PageResponse> {
        request.validate()?;

        let (plan, seq) = {
            let mut window = self.window.lock().await;
            match decide(&window, request, &self.config) {
                Decision::Hit(page) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(
                        "Cache hit: start={} length={} echo={}",
                        request.display_start,
                        request.display_length,
                        request.echo
                    );
                    return Ok(page);
                }
                Decision::Miss(plan) => (plan, window.issue_seq()),
            }
        };

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            "Cache miss: start={} length={} echo={}; fetching start={} span={} (factor {}, seq {})",
            request.display_start,
            request.display_length,
            request.echo,
            plan.start,
            plan.span,
            plan.factor,
            seq
        );

        let payload = match self.transport.fetch(&plan.query(request)).await {
            Ok(payload) => payload,
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Page fetch failed (echo {}): {e}", request.echo);
                return Err(e);
            }
        };

        let page = payload.slice(plan.offset_of(request), request.display_length, request.echo);

        let mut window = self.window.lock().await;
        if !window.install(seq, &plan, request, payload) {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                "Discarded stale payload (seq {seq}, window at seq {})",
                window.applied_seq()
            );
        }

        Ok(page)
    }

    /// Drop the buffered rows so the next request goes to the server.
    pub async fn invalidate(&self) {
        self.window.lock().await.reset();
        tracing::debug!("Cache window invalidated");
    }

    /// Diagnostic view of the window.
    pub async fn snapshot(&self) -> WindowSnapshot {
        self.window.lock().await.snapshot()
    }

    /// Full payload currently buffered, untrimmed.
    pub async fn buffered(&self) -> Option<PageResponse> {
        self.window.lock().await.response().cloned()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }

    pub fn config(&self) -> &PipeConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

/// Counters since the cache was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Requests answered from memory.
    pub hits: u64,
    /// Requests that went to the transport.
    pub misses: u64,
    /// Misses whose fetch failed.
    pub failures: u64,
    /// Fetched payloads not installed because a newer fetch won.
    pub discarded: u64,
}

impl CacheStats {
    /// Fraction of requests served from memory, 0.0 when idle.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
