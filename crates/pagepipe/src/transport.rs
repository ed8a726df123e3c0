//! Transport abstraction between the cache and the server holding the rows.
//!
//! Defines the `Transport` trait and `FetchQuery`, the exact range and
//! sort/filter context sent to the server, with its grid-control wire
//! encoding.

use std::sync::Arc;

use async_trait::async_trait;

use crate::types::{PageResponse, PipeResult, SortColumn, SortDirection};

/// Something that can answer a page query, usually a remote endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the rows described by `query`.
    async fn fetch(&self, query: &FetchQuery) -> PipeResult<PageResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn fetch(&self, query: &FetchQuery) -> PipeResult<PageResponse> {
        (**self).fetch(query).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn fetch(&self, query: &FetchQuery) -> PipeResult<PageResponse> {
        (**self).fetch(query).await
    }
}

/// A server query: row range plus sort/filter context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchQuery {
    /// First row; `None` means no paging.
    pub start: Option<usize>,
    /// Row count; `None` means every row.
    pub length: Option<usize>,
    pub echo: u64,
    pub sort: Vec<SortColumn>,
    pub search: Option<String>,
    /// Caller parameters forwarded verbatim.
    pub params: Vec<(String, String)>,
}

impl FetchQuery {
    /// Encode as grid-control query parameters.
    ///
    /// Paging parameters are left out entirely for unpaged queries.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut out = vec![("sEcho".to_string(), self.echo.to_string())];
        if let Some(start) = self.start {
            out.push(("iDisplayStart".to_string(), start.to_string()));
        }
        if let Some(length) = self.length {
            out.push(("iDisplayLength".to_string(), length.to_string()));
        }
        if !self.sort.is_empty() {
            out.push(("iSortingCols".to_string(), self.sort.len().to_string()));
            for (i, col) in self.sort.iter().enumerate() {
                out.push((format!("iSortCol_{i}"), col.column.to_string()));
                out.push((format!("sSortDir_{i}"), col.direction.as_str().to_string()));
            }
        }
        if let Some(search) = &self.search {
            out.push(("sSearch".to_string(), search.clone()));
        }
        out.extend(self.params.iter().cloned());
        out
    }

    /// Decode grid-control query parameters, as a server receives them.
    ///
    /// Unknown keys are kept in `params`; malformed numbers are ignored.
    pub fn from_params<I>(params: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut query = FetchQuery::default();
        let mut sort_count: Option<usize> = None;
        let mut sort_cols: Vec<(usize, usize)> = Vec::new();
        let mut sort_dirs: Vec<(usize, SortDirection)> = Vec::new();

        for (key, value) in params {
            match key.as_str() {
                "sEcho" => query.echo = value.trim().parse().unwrap_or(0),
                "iDisplayStart" => query.start = value.trim().parse().ok(),
                // -1 is the grid control's "show all" sentinel.
                "iDisplayLength" => query.length = value.trim().parse().ok(),
                "iSortingCols" => sort_count = value.trim().parse().ok(),
                "sSearch" => {
                    query.search = Some(value).filter(|s| !s.is_empty());
                }
                _ => {
                    if let Some(i) = indexed(&key, "iSortCol_") {
                        if let Ok(col) = value.trim().parse() {
                            sort_cols.push((i, col));
                        }
                    } else if let Some(i) = indexed(&key, "sSortDir_") {
                        if let Ok(dir) = value.parse() {
                            sort_dirs.push((i, dir));
                        }
                    } else {
                        query.params.push((key, value));
                    }
                }
            }
        }

        sort_cols.sort_by_key(|(i, _)| *i);
        let limit = sort_count.unwrap_or(sort_cols.len());
        query.sort = sort_cols
            .into_iter()
            .filter(|(i, _)| *i < limit)
            .map(|(i, column)| {
                let direction = sort_dirs
                    .iter()
                    .find(|(j, _)| *j == i)
                    .map_or(SortDirection::Asc, |(_, d)| *d);
                SortColumn::new(column, direction)
            })
            .collect();
        if query.start.is_none() {
            query.length = None;
        }
        query
    }
}

fn indexed(key: &str, prefix: &str) -> Option<usize> {
    key.strip_prefix(prefix)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_to_params_paged() {
        let query = FetchQuery {
            start: Some(0),
            length: Some(150),
            echo: 4,
            sort: vec![
                SortColumn::new(2, SortDirection::Desc),
                SortColumn::new(0, SortDirection::Asc),
            ],
            search: Some("water".to_string()),
            params: pairs(&[("status", "open")]),
        };
        assert_eq!(
            query.to_params(),
            pairs(&[
                ("sEcho", "4"),
                ("iDisplayStart", "0"),
                ("iDisplayLength", "150"),
                ("iSortingCols", "2"),
                ("iSortCol_0", "2"),
                ("sSortDir_0", "desc"),
                ("iSortCol_1", "0"),
                ("sSortDir_1", "asc"),
                ("sSearch", "water"),
                ("status", "open"),
            ])
        );
    }

    #[test]
    fn test_to_params_unpaged_omits_range() {
        let query = FetchQuery {
            echo: 1,
            ..FetchQuery::default()
        };
        let params = query.to_params();
        assert!(params.iter().all(|(k, _)| k != "iDisplayStart" && k != "iDisplayLength"));
        assert_eq!(params, pairs(&[("sEcho", "1")]));
    }

    #[test]
    fn test_from_params_reads_grid_keys() {
        let query = FetchQuery::from_params(pairs(&[
            ("sEcho", "12"),
            ("iColumns", "4"),
            ("iDisplayStart", "50"),
            ("iDisplayLength", "25"),
            ("iSortingCols", "1"),
            ("iSortCol_0", "3"),
            ("sSortDir_0", "desc"),
            ("iSortCol_1", "1"),
            ("sSearch", ""),
        ]));
        assert_eq!(query.echo, 12);
        assert_eq!(query.start, Some(50));
        assert_eq!(query.length, Some(25));
        assert_eq!(query.sort, vec![SortColumn::new(3, SortDirection::Desc)]);
        assert_eq!(query.search, None);
        assert_eq!(query.params, pairs(&[("iColumns", "4")]));
    }

    #[test]
    fn test_from_params_show_all_sentinel() {
        let query = FetchQuery::from_params(pairs(&[
            ("iDisplayStart", "0"),
            ("iDisplayLength", "-1"),
        ]));
        assert_eq!(query.start, Some(0));
        assert_eq!(query.length, None);
    }

    #[test]
    fn test_params_survive_encoding() {
        let query = FetchQuery {
            start: Some(25),
            length: Some(100),
            echo: 9,
            sort: vec![SortColumn::new(1, SortDirection::Desc)],
            search: Some("flood".to_string()),
            params: pairs(&[("district", "north")]),
        };
        assert_eq!(FetchQuery::from_params(query.to_params()), query);
    }
}
