//! Core data types for page requests, server payloads, and errors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Number of rows a page request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageLength {
    /// A fixed number of rows.
    Rows(usize),
    /// Every row of the filtered result set.
    All,
}

impl PageLength {
    /// Row count, or `None` for [`PageLength::All`].
    pub fn rows(self) -> Option<usize> {
        match self {
            PageLength::Rows(n) => Some(n),
            PageLength::All => None,
        }
    }

    pub fn is_all(self) -> bool {
        matches!(self, PageLength::All)
    }
}

impl fmt::Display for PageLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageLength::Rows(n) => write!(f, "{n}"),
            PageLength::All => f.write_str("all"),
        }
    }
}

impl FromStr for PageLength {
    type Err = PipeError;

    /// Accepts a positive integer, `all`, or the grid-control sentinel `-1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") || s == "-1" {
            return Ok(PageLength::All);
        }
        match s.parse::<usize>() {
            Ok(0) => Err(PipeError::InvalidRequest(
                "page length must be greater than zero".to_string(),
            )),
            Ok(n) => Ok(PageLength::Rows(n)),
            Err(_) => Err(PipeError::InvalidRequest(format!(
                "invalid page length: {s:?} (expected a number or 'all')"
            ))),
        }
    }
}

/// Sort direction of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = PipeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(PipeError::InvalidRequest(format!(
                "invalid sort direction: {other:?} (expected 'asc' or 'desc')"
            ))),
        }
    }
}

/// One entry of a multi-column sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortColumn {
    pub column: usize,
    pub direction: SortDirection,
}

impl SortColumn {
    pub fn new(column: usize, direction: SortDirection) -> Self {
        Self { column, direction }
    }
}

/// A request for one page of rows from a table.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    /// Zero-based offset of the first row wanted.
    pub display_start: usize,
    pub display_length: PageLength,
    /// Correlation token reflected unchanged in the response.
    pub echo: u64,
    /// Sort columns in priority order.
    pub sort: Vec<SortColumn>,
    /// Free-text filter.
    pub search: Option<String>,
    /// Extra filter parameters forwarded verbatim to the server.
    pub params: Vec<(String, String)>,
}

impl PageRequest {
    /// Create an unsorted, unfiltered request.
    pub fn new(display_start: usize, display_length: PageLength) -> Self {
        Self {
            display_start,
            display_length,
            echo: 0,
            sort: Vec::new(),
            search: None,
            params: Vec::new(),
        }
    }

    pub fn with_echo(mut self, echo: u64) -> Self {
        self.echo = echo;
        self
    }

    /// Append a sort column (lower priority than any already present).
    pub fn sorted_by(mut self, column: usize, direction: SortDirection) -> Self {
        self.sort.push(SortColumn::new(column, direction));
        self
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// The sort/filter fields that decide whether a buffered window is still valid.
    pub fn signature(&self) -> Signature {
        Signature {
            sort: self.sort.clone(),
            search: self
                .search
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            params: self.params.clone(),
        }
    }

    /// Reject requests no server could answer.
    pub fn validate(&self) -> PipeResult<()> {
        if self.display_length == PageLength::Rows(0) {
            return Err(PipeError::InvalidRequest(
                "page length must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Sort/filter context of a request, independent of offset, length and echo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Signature {
    pub sort: Vec<SortColumn>,
    /// Empty search terms normalise to `None`.
    pub search: Option<String>,
    pub params: Vec<(String, String)>,
}

/// Server payload for one page, in the grid control's wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResponse {
    #[serde(rename = "sEcho", default, deserialize_with = "lenient_u64")]
    pub echo: u64,
    /// Rows before filtering.
    #[serde(rename = "iTotalRecords", deserialize_with = "lenient_usize")]
    pub total_records: usize,
    /// Rows after filtering.
    #[serde(rename = "iTotalDisplayRecords", deserialize_with = "lenient_usize")]
    pub total_filtered: usize,
    /// Row representations, opaque to the cache.
    #[serde(rename = "aaData", default)]
    pub rows: Vec<Value>,
}

impl PageResponse {
    /// Copy of this payload holding at most `length` rows from `offset`.
    ///
    /// Offsets past the end yield an empty page rather than an error.
    pub fn slice(&self, offset: usize, length: PageLength, echo: u64) -> PageResponse {
        let start = offset.min(self.rows.len());
        let end = match length {
            PageLength::Rows(n) => start.saturating_add(n).min(self.rows.len()),
            PageLength::All => self.rows.len(),
        };
        PageResponse {
            echo,
            total_records: self.total_records,
            total_filtered: self.total_filtered,
            rows: self.rows[start..end].to_vec(),
        }
    }
}

/// Servers disagree on whether counters are numbers or numeric strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberRepr {
    Number(u64),
    Text(String),
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberRepr::deserialize(deserializer)? {
        NumberRepr::Number(n) => Ok(n),
        NumberRepr::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("expected a number, got {s:?}"))),
    }
}

fn lenient_usize<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let n = lenient_u64(deserializer)?;
    usize::try_from(n).map_err(<D::Error as serde::de::Error>::custom)
}

/// Errors that can occur while resolving pages.
#[derive(thiserror::Error, Debug)]
pub enum PipeError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed payload: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type.
pub type PipeResult<T> = Result<T, PipeError>;
