//! The buffered row window kept for one table.

use serde::Serialize;

use crate::policy::FetchPlan;
use crate::types::{PageLength, PageResponse, PageRequest, Signature};

/// Which part of the filtered result set is buffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WindowState {
    /// Nothing fetched yet, or invalidated.
    Empty,
    /// Rows `[lower, upper)` were requested from the server.
    Partial { lower: usize, upper: usize },
    /// The whole filtered result set is buffered.
    Complete,
}

/// Buffered rows plus the sort/filter context they were fetched under.
///
/// Payloads are installed wholesale and only when they belong to the newest
/// fetch issued so far; older fetches that complete late are dropped.
#[derive(Debug, Clone)]
pub struct CacheWindow {
    state: WindowState,
    buffered_length: Option<PageLength>,
    signature: Signature,
    response: Option<PageResponse>,
    issued_seq: u64,
    applied_seq: u64,
}

impl Default for CacheWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheWindow {
    /// Create an empty window.
    pub fn new() -> Self {
        Self {
            state: WindowState::Empty,
            buffered_length: None,
            signature: Signature::default(),
            response: None,
            issued_seq: 0,
            applied_seq: 0,
        }
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    /// Offset of the first buffered row.
    pub fn lower(&self) -> Option<usize> {
        match self.state {
            WindowState::Empty => None,
            WindowState::Partial { lower, .. } => Some(lower),
            WindowState::Complete => Some(0),
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Full, untrimmed payload of the installed fetch.
    pub fn response(&self) -> Option<&PageResponse> {
        self.response.as_ref()
    }

    /// Page length of the request that filled the window.
    pub fn buffered_length(&self) -> Option<PageLength> {
        self.buffered_length
    }

    /// Filtered row count reported by the last installed payload.
    pub fn known_total_filtered(&self) -> Option<usize> {
        self.response.as_ref().map(|r| r.total_filtered)
    }

    pub fn applied_seq(&self) -> u64 {
        self.applied_seq
    }

    /// Reserve the sequence number for a new fetch.
    pub(crate) fn issue_seq(&mut self) -> u64 {
        self.issued_seq += 1;
        self.issued_seq
    }

    /// Replace the window with a fetched payload.
    ///
    /// Returns `false`, leaving the window untouched, when a newer fetch
    /// has already been installed.
    pub(crate) fn install(
        &mut self,
        seq: u64,
        plan: &FetchPlan,
        request: &PageRequest,
        payload: PageResponse,
    ) -> bool {
        if seq <= self.applied_seq {
            return false;
        }
        self.state = match plan.window_state() {
            // A server that caps its page size sends fewer rows than planned
            // while more exist; the window ends at the last row received.
            WindowState::Partial { lower, upper } => {
                let received = lower.saturating_add(payload.rows.len());
                if received < upper && received < payload.total_filtered {
                    WindowState::Partial {
                        lower,
                        upper: received,
                    }
                } else {
                    WindowState::Partial { lower, upper }
                }
            }
            state => state,
        };
        self.buffered_length = Some(request.display_length);
        self.signature = request.signature();
        self.response = Some(payload);
        self.applied_seq = seq;
        true
    }

    /// Drop all buffered rows. Fetches already in flight will not install.
    pub(crate) fn reset(&mut self) {
        self.state = WindowState::Empty;
        self.buffered_length = None;
        self.signature = Signature::default();
        self.response = None;
        self.applied_seq = self.issued_seq;
    }

    /// Point-in-time view for diagnostics.
    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            state: self.state,
            buffered_length: self.buffered_length,
            signature: self.signature.clone(),
            buffered_rows: self.response.as_ref().map_or(0, |r| r.rows.len()),
            total_records: self.response.as_ref().map(|r| r.total_records),
            total_filtered: self.known_total_filtered(),
            applied_seq: self.applied_seq,
        }
    }
}

/// Diagnostic copy of a window's bookkeeping, without the rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSnapshot {
    pub state: WindowState,
    pub buffered_length: Option<PageLength>,
    pub signature: Signature,
    pub buffered_rows: usize,
    pub total_records: Option<usize>,
    pub total_filtered: Option<usize>,
    pub applied_seq: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::FetchPlan;
    use serde_json::json;

    fn payload(rows: usize) -> PageResponse {
        PageResponse {
            echo: 0,
            total_records: 500,
            total_filtered: 500,
            rows: (0..rows).map(|i| json!([i])).collect(),
        }
    }

    fn plan(start: usize, span: PageLength) -> FetchPlan {
        FetchPlan {
            start,
            span,
            factor: 6,
        }
    }

    #[test]
    fn test_new_window_is_empty() {
        let window = CacheWindow::new();
        assert_eq!(window.state(), WindowState::Empty);
        assert_eq!(window.lower(), None);
        assert!(window.response().is_none());
        assert_eq!(window.snapshot().buffered_rows, 0);
    }

    #[test]
    fn test_install_sets_bounds() {
        let mut window = CacheWindow::new();
        let request = PageRequest::new(0, PageLength::Rows(25));
        let seq = window.issue_seq();
        assert!(window.install(seq, &plan(0, PageLength::Rows(150)), &request, payload(150)));

        assert_eq!(
            window.state(),
            WindowState::Partial {
                lower: 0,
                upper: 150
            }
        );
        assert_eq!(window.buffered_length(), Some(PageLength::Rows(25)));
        assert_eq!(window.known_total_filtered(), Some(500));
    }

    #[test]
    fn test_install_all_marks_complete() {
        let mut window = CacheWindow::new();
        let request = PageRequest::new(0, PageLength::All);
        let seq = window.issue_seq();
        window.install(seq, &plan(0, PageLength::All), &request, payload(500));
        assert_eq!(window.state(), WindowState::Complete);
        assert_eq!(window.lower(), Some(0));
    }

    #[test]
    fn test_older_fetch_does_not_install() {
        let mut window = CacheWindow::new();
        let request = PageRequest::new(0, PageLength::Rows(25));
        let first = window.issue_seq();
        let second = window.issue_seq();

        assert!(window.install(second, &plan(100, PageLength::Rows(150)), &request, payload(150)));
        assert!(!window.install(first, &plan(0, PageLength::Rows(150)), &request, payload(150)));

        assert_eq!(window.lower(), Some(100));
        assert_eq!(window.applied_seq(), second);
    }

    #[test]
    fn test_reset_blocks_in_flight_fetches() {
        let mut window = CacheWindow::new();
        let request = PageRequest::new(0, PageLength::Rows(25));
        let in_flight = window.issue_seq();
        window.reset();

        assert!(!window.install(in_flight, &plan(0, PageLength::Rows(150)), &request, payload(150)));
        assert_eq!(window.state(), WindowState::Empty);

        let fresh = window.issue_seq();
        assert!(window.install(fresh, &plan(0, PageLength::Rows(150)), &request, payload(150)));
    }

    #[test]
    fn test_snapshot_serializes_state_tag() {
        let mut window = CacheWindow::new();
        let request = PageRequest::new(0, PageLength::Rows(25));
        let seq = window.issue_seq();
        window.install(seq, &plan(0, PageLength::Rows(150)), &request, payload(150));

        let v = serde_json::to_value(window.snapshot()).unwrap();
        assert_eq!(v["state"]["state"], "partial");
        assert_eq!(v["state"]["lower"], 0);
        assert_eq!(v["state"]["upper"], 150);
        assert_eq!(v["buffered_rows"], 150);
    }

    #[test]
    fn test_capped_payload_narrows_upper_bound() {
        let mut window = CacheWindow::new();
        let request = PageRequest::new(100, PageLength::Rows(25));
        let seq = window.issue_seq();
        window.install(seq, &plan(100, PageLength::Rows(150)), &request, payload(100));

        assert_eq!(
            window.state(),
            WindowState::Partial {
                lower: 100,
                upper: 200
            }
        );
    }

    #[test]
    fn test_short_payload_at_end_keeps_planned_bound() {
        let mut window = CacheWindow::new();
        let request = PageRequest::new(450, PageLength::Rows(25));
        let seq = window.issue_seq();
        window.install(seq, &plan(450, PageLength::Rows(150)), &request, payload(50));

        assert_eq!(
            window.state(),
            WindowState::Partial {
                lower: 450,
                upper: 600
            }
        );
    }
}
