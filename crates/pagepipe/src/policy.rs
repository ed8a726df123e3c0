//! Hit/miss decision and over-fetch planning.

use crate::config::PipeConfig;
use crate::transport::FetchQuery;
use crate::types::{PageLength, PageRequest, PageResponse};
use crate::window::{CacheWindow, WindowState};

/// How many page lengths one round trip fetches for a request of `length`.
pub fn pipe_factor(config: &PipeConfig, length: PageLength) -> usize {
    match length {
        PageLength::All => config.large_factor,
        PageLength::Rows(n) if n == config.default_page_size => config.default_factor,
        PageLength::Rows(n) if n > config.large_page_threshold => config.large_factor,
        PageLength::Rows(_) => config.other_factor,
    }
}

/// One past the last row the request wants, never beyond the rows known to exist.
///
/// `None` for "all" requests.
pub fn request_end(window: &CacheWindow, request: &PageRequest) -> Option<usize> {
    let length = request.display_length.rows()?;
    let end = request.display_start.saturating_add(length);
    Some(match window.known_total_filtered() {
        Some(total) if total < end => total,
        _ => end,
    })
}

/// Row range to request from the server on a miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPlan {
    /// First row to fetch.
    pub start: usize,
    /// Rows to fetch from `start`; `All` omits paging from the query.
    pub span: PageLength,
    /// Pipe factor the span was computed with.
    pub factor: usize,
}

impl FetchPlan {
    /// Window state once this plan's payload is installed.
    pub fn window_state(&self) -> WindowState {
        match self.span {
            PageLength::All => WindowState::Complete,
            PageLength::Rows(n) => WindowState::Partial {
                lower: self.start,
                upper: self.start.saturating_add(n),
            },
        }
    }

    /// Wire query for this plan, carrying the request's echo and sort/filter fields.
    pub fn query(&self, request: &PageRequest) -> FetchQuery {
        let (start, length) = match self.span {
            PageLength::All => (None, None),
            PageLength::Rows(n) => (Some(self.start), Some(n)),
        };
        FetchQuery {
            start,
            length,
            echo: request.echo,
            sort: request.sort.clone(),
            search: request.search.clone().filter(|s| !s.is_empty()),
            params: request.params.clone(),
        }
    }

    /// Position of the request's first row inside the fetched payload.
    pub fn offset_of(&self, request: &PageRequest) -> usize {
        request.display_start.saturating_sub(self.start)
    }
}

/// Outcome of checking a request against the window.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Served from the buffer; the page is already sliced and echo-stamped.
    Hit(PageResponse),
    /// The server must be asked for this range.
    Miss(FetchPlan),
}

/// Decide whether `request` can be answered from `window`.
pub fn decide(window: &CacheWindow, request: &PageRequest, config: &PipeConfig) -> Decision {
    let factor = pipe_factor(config, request.display_length);
    let same_signature = *window.signature() == request.signature();

    let in_window = match (window.state(), request.display_length) {
        (WindowState::Empty, _) => false,
        (WindowState::Complete, _) => true,
        (WindowState::Partial { .. }, PageLength::All) => false,
        (WindowState::Partial { lower, upper }, PageLength::Rows(_)) => {
            let end = request_end(window, request).unwrap_or(upper);
            request.display_start >= lower && end <= upper
        }
    };

    if same_signature && in_window {
        if let (Some(lower), Some(buffered)) = (window.lower(), window.response()) {
            let offset = request.display_start - lower;
            return Decision::Hit(buffered.slice(offset, request.display_length, request.echo));
        }
    }

    Decision::Miss(plan_fetch(window, request, factor, same_signature))
}

fn plan_fetch(
    window: &CacheWindow,
    request: &PageRequest,
    factor: usize,
    same_signature: bool,
) -> FetchPlan {
    let length = match request.display_length {
        PageLength::All => {
            return FetchPlan {
                start: 0,
                span: PageLength::All,
                factor,
            }
        }
        PageLength::Rows(n) => n,
    };

    // Paging backwards past the window, or re-sorting a populated one, keeps
    // lookback rows in front of the requested page.
    let lookback = match window.lower() {
        Some(lower) => request.display_start < lower || !same_signature,
        None => false,
    };
    let start = if lookback {
        request
            .display_start
            .saturating_sub(factor.saturating_sub(1).saturating_mul(length))
    } else {
        request.display_start
    };

    // `start + span` must stay representable.
    let span = length.saturating_mul(factor).min(usize::MAX - start);

    FetchPlan {
        start,
        span: PageLength::Rows(span),
        factor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SortDirection;
    use serde_json::json;

    fn filled(plan: FetchPlan, request: &PageRequest, total: usize) -> CacheWindow {
        let rows = match plan.span {
            PageLength::Rows(n) => n.min(total.saturating_sub(plan.start)),
            PageLength::All => total,
        };
        let payload = PageResponse {
            echo: request.echo,
            total_records: total,
            total_filtered: total,
            rows: (plan.start..plan.start + rows).map(|i| json!([i])).collect(),
        };
        let mut window = CacheWindow::new();
        let seq = window.issue_seq();
        window.install(seq, &plan, request, payload);
        window
    }

    fn miss(decision: Decision) -> FetchPlan {
        match decision {
            Decision::Miss(plan) => plan,
            Decision::Hit(_) => panic!("expected a miss"),
        }
    }

    fn hit(decision: Decision) -> PageResponse {
        match decision {
            Decision::Hit(page) => page,
            Decision::Miss(plan) => panic!("expected a hit, got {plan:?}"),
        }
    }

    #[test]
    fn test_pipe_factor_tiers() {
        let config = PipeConfig::default();
        assert_eq!(pipe_factor(&config, PageLength::Rows(25)), 6);
        assert_eq!(pipe_factor(&config, PageLength::Rows(10)), 4);
        assert_eq!(pipe_factor(&config, PageLength::Rows(49)), 4);
        assert_eq!(pipe_factor(&config, PageLength::Rows(50)), 2);
        assert_eq!(pipe_factor(&config, PageLength::Rows(100)), 2);
        assert_eq!(pipe_factor(&config, PageLength::All), 2);
    }

    #[test]
    fn test_default_size_wins_over_large_threshold() {
        let config = PipeConfig {
            default_page_size: 100,
            ..PipeConfig::default()
        };
        assert_eq!(pipe_factor(&config, PageLength::Rows(100)), 6);
    }

    #[test]
    fn test_empty_window_misses_without_lookback() {
        let config = PipeConfig::default();
        let window = CacheWindow::new();
        let request = PageRequest::new(100, PageLength::Rows(25));

        let plan = miss(decide(&window, &request, &config));
        assert_eq!(plan.start, 100);
        assert_eq!(plan.span, PageLength::Rows(150));
    }

    #[test]
    fn test_request_end_clamps_to_known_total() {
        let request = PageRequest::new(0, PageLength::Rows(25));
        let window = filled(
            FetchPlan {
                start: 0,
                span: PageLength::Rows(150),
                factor: 6,
            },
            &request,
            40,
        );
        let late = PageRequest::new(30, PageLength::Rows(25));
        assert_eq!(request_end(&window, &late), Some(40));
        assert_eq!(request_end(&CacheWindow::new(), &late), Some(55));
        assert_eq!(request_end(&window, &PageRequest::new(0, PageLength::All)), None);
    }

    #[test]
    fn test_forward_past_window_misses_without_lookback() {
        let config = PipeConfig::default();
        let request = PageRequest::new(0, PageLength::Rows(25));
        let window = filled(
            FetchPlan {
                start: 0,
                span: PageLength::Rows(150),
                factor: 6,
            },
            &request,
            1000,
        );

        let plan = miss(decide(&window, &PageRequest::new(150, PageLength::Rows(25)), &config));
        assert_eq!(plan.start, 150);
        assert_eq!(plan.window_state(), WindowState::Partial { lower: 150, upper: 300 });
    }

    #[test]
    fn test_backward_past_window_shifts_start() {
        let config = PipeConfig::default();
        let request = PageRequest::new(300, PageLength::Rows(25));
        let window = filled(
            FetchPlan {
                start: 300,
                span: PageLength::Rows(150),
                factor: 6,
            },
            &request,
            1000,
        );

        let plan = miss(decide(&window, &PageRequest::new(275, PageLength::Rows(25)), &config));
        assert_eq!(plan.start, 275 - 5 * 25);

        let near_top = miss(decide(&window, &PageRequest::new(50, PageLength::Rows(25)), &config));
        assert_eq!(near_top.start, 0);
    }

    #[test]
    fn test_signature_change_misses_inside_window() {
        let config = PipeConfig::default();
        let request = PageRequest::new(0, PageLength::Rows(25)).sorted_by(0, SortDirection::Asc);
        let window = filled(
            FetchPlan {
                start: 0,
                span: PageLength::Rows(150),
                factor: 6,
            },
            &request,
            1000,
        );

        let resorted = PageRequest::new(25, PageLength::Rows(25)).sorted_by(1, SortDirection::Desc);
        let plan = miss(decide(&window, &resorted, &config));
        assert_eq!(plan.start, 0);

        let searched = PageRequest::new(0, PageLength::Rows(25))
            .sorted_by(0, SortDirection::Asc)
            .with_search("camp");
        assert!(matches!(decide(&window, &searched, &config), Decision::Miss(_)));
    }

    #[test]
    fn test_hit_slices_relative_to_lower() {
        let config = PipeConfig::default();
        let request = PageRequest::new(150, PageLength::Rows(25));
        let window = filled(
            FetchPlan {
                start: 150,
                span: PageLength::Rows(150),
                factor: 6,
            },
            &request,
            1000,
        );

        let page = hit(decide(&window, &PageRequest::new(200, PageLength::Rows(25)).with_echo(8), &config));
        assert_eq!(page.echo, 8);
        assert_eq!(page.rows.len(), 25);
        assert_eq!(page.rows[0], json!([200]));
        assert_eq!(page.rows[24], json!([224]));
    }

    #[test]
    fn test_length_increase_past_upper_misses() {
        let config = PipeConfig::default();
        let request = PageRequest::new(0, PageLength::Rows(25));
        let window = filled(
            FetchPlan {
                start: 0,
                span: PageLength::Rows(150),
                factor: 6,
            },
            &request,
            1000,
        );

        assert!(matches!(
            decide(&window, &PageRequest::new(0, PageLength::Rows(100)), &config),
            Decision::Hit(_)
        ));
        let plan = miss(decide(&window, &PageRequest::new(100, PageLength::Rows(100)), &config));
        assert_eq!(plan.span, PageLength::Rows(200));
    }

    #[test]
    fn test_all_request_plans_unpaged_fetch() {
        let config = PipeConfig::default();
        let request = PageRequest::new(0, PageLength::Rows(25));
        let window = filled(
            FetchPlan {
                start: 0,
                span: PageLength::Rows(150),
                factor: 6,
            },
            &request,
            1000,
        );

        let plan = miss(decide(&window, &PageRequest::new(0, PageLength::All), &config));
        assert_eq!(plan.span, PageLength::All);
        assert_eq!(plan.window_state(), WindowState::Complete);

        let query = plan.query(&PageRequest::new(0, PageLength::All).with_echo(3));
        assert_eq!(query.start, None);
        assert_eq!(query.length, None);
        assert_eq!(query.echo, 3);
    }

    #[test]
    fn test_complete_window_hits_any_range() {
        let config = PipeConfig::default();
        let request = PageRequest::new(0, PageLength::All);
        let window = filled(
            FetchPlan {
                start: 0,
                span: PageLength::All,
                factor: 2,
            },
            &request,
            300,
        );

        let page = hit(decide(&window, &PageRequest::new(280, PageLength::Rows(50)), &config));
        assert_eq!(page.rows.len(), 20);
        assert_eq!(page.rows[0], json!([280]));

        let again = hit(decide(&window, &PageRequest::new(10, PageLength::All), &config));
        assert_eq!(again.rows.len(), 290);
    }

    #[test]
    fn test_huge_length_keeps_bounds_ordered() {
        let config = PipeConfig::default();
        let request = PageRequest::new(1, PageLength::Rows(usize::MAX));

        let plan = miss(decide(&CacheWindow::new(), &request, &config));
        assert_eq!(plan.start, 1);
        assert_eq!(plan.span, PageLength::Rows(usize::MAX - 1));
        match plan.window_state() {
            WindowState::Partial { lower, upper } => {
                assert_eq!(lower, 1);
                assert_eq!(upper, usize::MAX);
            }
            other => panic!("expected a partial window, got {other:?}"),
        }
    }
}
