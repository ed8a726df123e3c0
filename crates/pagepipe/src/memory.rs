//! In-process result sets.
//!
//! `MemoryTable` answers a `FetchQuery` the way a paging server does:
//! search, then sort, then slice. `MemoryTransport` wraps one behind the
//! `Transport` trait and records every query it receives.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::transport::{FetchQuery, Transport};
use crate::types::{PageResponse, PipeResult, SortColumn, SortDirection};

const DISTRICTS: &[&str] = &["Banda Aceh", "Lhokseumawe", "Meulaboh", "Sabang", "Langsa"];
const KINDS: &[&str] = &["Shelter", "Clinic", "Warehouse", "School", "Water point"];

/// A table of rows, each row an array of JSON cells.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    rows: Vec<Vec<Value>>,
}

impl MemoryTable {
    pub fn new(rows: Vec<Vec<Value>>) -> Self {
        Self { rows }
    }

    /// Deterministic facility register with `count` rows:
    /// `[id, name, district, capacity]`.
    pub fn generate(count: usize) -> Self {
        let rows = (0..count)
            .map(|i| {
                vec![
                    json!(i + 1),
                    json!(format!("{} {:03}", KINDS[i % KINDS.len()], i + 1)),
                    json!(DISTRICTS[(i * 7) % DISTRICTS.len()]),
                    json!((i * 37) % 500),
                ]
            })
            .collect();
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Evaluate a query: filter on the search term, sort, then page.
    pub fn query(&self, query: &FetchQuery) -> PageResponse {
        let mut matched: Vec<&Vec<Value>> = match query.search.as_deref() {
            Some(term) if !term.is_empty() => {
                let needle = term.to_lowercase();
                self.rows
                    .iter()
                    .filter(|row| row.iter().any(|cell| cell_text(cell).contains(&needle)))
                    .collect()
            }
            _ => self.rows.iter().collect(),
        };

        if !query.sort.is_empty() {
            matched.sort_by(|a, b| compare_rows(a, b, &query.sort));
        }

        let total_filtered = matched.len();
        let start = query.start.unwrap_or(0).min(total_filtered);
        let end = match query.length {
            Some(n) => start.saturating_add(n).min(total_filtered),
            None => total_filtered,
        };

        PageResponse {
            echo: query.echo,
            total_records: self.rows.len(),
            total_filtered,
            rows: matched[start..end]
                .iter()
                .map(|row| Value::Array((*row).clone()))
                .collect(),
        }
    }
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.to_lowercase(),
        other => other.to_string().to_lowercase(),
    }
}

fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(x), Some(y)) => cell_text(x).cmp(&cell_text(y)),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_rows(a: &[Value], b: &[Value], sort: &[SortColumn]) -> Ordering {
    for col in sort {
        let ord = compare_cells(a.get(col.column), b.get(col.column));
        let ord = match col.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Transport serving a `MemoryTable` in process.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    table: Mutex<MemoryTable>,
    queries: Mutex<Vec<FetchQuery>>,
    fetches: AtomicUsize,
}

impl MemoryTransport {
    pub fn new(table: MemoryTable) -> Self {
        Self {
            table: Mutex::new(table),
            queries: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Number of fetches served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(AtomicOrdering::SeqCst)
    }

    /// Every query received, oldest first.
    pub async fn queries(&self) -> Vec<FetchQuery> {
        self.queries.lock().await.clone()
    }

    pub async fn last_query(&self) -> Option<FetchQuery> {
        self.queries.lock().await.last().cloned()
    }

    /// Swap the served rows, as if the server-side data changed.
    pub async fn replace_table(&self, table: MemoryTable) {
        *self.table.lock().await = table;
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn fetch(&self, query: &FetchQuery) -> PipeResult<PageResponse> {
        self.fetches.fetch_add(1, AtomicOrdering::SeqCst);
        self.queries.lock().await.push(query.clone());
        Ok(self.table.lock().await.query(query))
    }
}
