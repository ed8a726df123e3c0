//! Parsers for sort, length and pass-through parameter arguments.

use pagepipe::{PageLength, SortColumn, SortDirection};

use crate::error::{CliError, CliResult};

/// Parse `COLUMN[:asc|desc]`; the direction defaults to ascending.
pub fn parse_sort(spec: &str) -> CliResult<SortColumn> {
    let spec = spec.trim();
    let (column, direction) = match spec.split_once(':') {
        Some((col, dir)) => (col, dir),
        None => (spec, "asc"),
    };
    let column = column
        .trim()
        .parse::<usize>()
        .map_err(|_| CliError::InvalidSort(spec.to_string()))?;
    let direction = direction
        .parse::<SortDirection>()
        .map_err(|_| CliError::InvalidSort(spec.to_string()))?;
    Ok(SortColumn::new(column, direction))
}

/// Parse a comma- or space-separated list of sort specs.
pub fn parse_sort_list(specs: &str) -> CliResult<Vec<SortColumn>> {
    specs
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(parse_sort)
        .collect()
}

pub fn parse_length(raw: &str) -> CliResult<PageLength> {
    Ok(raw.parse::<PageLength>()?)
}

/// Parse `KEY=VALUE`.
pub fn parse_param(raw: &str) -> CliResult<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(CliError::InvalidParam(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sort() {
        assert_eq!(
            parse_sort("2:desc").unwrap(),
            SortColumn::new(2, SortDirection::Desc)
        );
        assert_eq!(parse_sort("0").unwrap(), SortColumn::new(0, SortDirection::Asc));
        assert_eq!(
            parse_sort(" 1:ASC ").unwrap(),
            SortColumn::new(1, SortDirection::Asc)
        );
        assert!(matches!(parse_sort("name"), Err(CliError::InvalidSort(_))));
        assert!(matches!(parse_sort("1:up"), Err(CliError::InvalidSort(_))));
    }

    #[test]
    fn test_parse_sort_list() {
        assert_eq!(
            parse_sort_list("3:desc, 0").unwrap(),
            vec![
                SortColumn::new(3, SortDirection::Desc),
                SortColumn::new(0, SortDirection::Asc)
            ]
        );
        assert!(parse_sort_list("").unwrap().is_empty());
        assert!(parse_sort_list("1,x").is_err());
    }

    #[test]
    fn test_parse_length() {
        assert_eq!(parse_length("50").unwrap(), PageLength::Rows(50));
        assert_eq!(parse_length("all").unwrap(), PageLength::All);
        assert!(matches!(parse_length("0"), Err(CliError::Pipe(_))));
    }

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("district=Banda Aceh").unwrap(),
            ("district".to_string(), "Banda Aceh".to_string())
        );
        assert_eq!(
            parse_param("empty=").unwrap(),
            ("empty".to_string(), String::new())
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=x").is_err());
    }
}
