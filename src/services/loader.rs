use std::collections::HashSet;

use ::csv::{ReaderBuilder, Trim};
use once_cell::sync::Lazy;
use polars::prelude::*;
use tracing::{debug, warn};

use crate::error::LoadError;

const BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];
const SNIFF_LINES: usize = 10;

/// Cell texts read as missing. Matched exactly, so `none` or `na` stay values.
static NULL_MARKERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND",
        "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
    ]
    .into_iter()
    .collect()
});

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Skips sniffing when set.
    pub delimiter: Option<u8>,
    pub max_size: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub frame: DataFrame,
    pub delimiter: u8,
    pub skipped_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Float,
    Text,
}

/// Parses delimited UTF-8 text with a header row into a table.
///
/// Rows with more fields than the header are skipped, shorter rows are
/// padded with missing cells and blank lines are ignored.
pub fn load_csv(data: &[u8], options: &LoadOptions) -> Result<LoadedTable, LoadError> {
    if let Some(limit) = options.max_size {
        if data.len() > limit {
            return Err(LoadError::TooLarge { size: Some(data.len()), limit });
        }
    }

    let data = data.strip_prefix(BOM).unwrap_or(data);
    let text = std::str::from_utf8(data)
        .map_err(|e| LoadError::Encoding { offset: e.valid_up_to() })?;
    if text.trim().is_empty() {
        return Err(LoadError::Empty);
    }

    let delimiter = options.delimiter.unwrap_or_else(|| detect_delimiter(text));
    debug!("Using delimiter {:?}", delimiter as char);

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::None)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| LoadError::Parse(format!("Failed to read header row: {}", e)))?
        .clone();
    if headers.is_empty() {
        return Err(LoadError::MissingHeader);
    }

    let names = unique_column_names(headers.iter());
    let n_cols = names.len();
    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); n_cols];
    let mut skipped_rows = 0;

    for (idx, result) in reader.records().enumerate() {
        // Data rows start on line 2.
        let line = idx + 2;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping unreadable row at line {}: {}", line, e);
                skipped_rows += 1;
                continue;
            }
        };

        if record.len() == 1 && record.get(0).map_or(true, str::is_empty) {
            continue;
        }
        if record.len() > n_cols {
            warn!(
                "Skipping row at line {}: expected {} fields, got {}",
                line,
                n_cols,
                record.len()
            );
            skipped_rows += 1;
            continue;
        }

        for (col_idx, column) in columns.iter_mut().enumerate() {
            let cell = record
                .get(col_idx)
                .filter(|value| !is_missing_marker(value))
                .map(str::to_string);
            column.push(cell);
        }
    }

    let series: Vec<Series> = names
        .iter()
        .zip(columns)
        .map(|(name, cells)| build_series(name, cells))
        .collect();

    let frame = DataFrame::new(series)
        .map_err(|e| LoadError::Parse(format!("Failed to create DataFrame: {}", e)))?;

    Ok(LoadedTable {
        frame,
        delimiter,
        skipped_rows,
    })
}

/// Picks the candidate delimiter that appears most consistently across the
/// first lines. Falls back to a comma.
pub fn detect_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();

    let mut best_delimiter = b',';
    let mut best_score = 0.0f64;

    if sample.is_empty() {
        return best_delimiter;
    }

    for &delimiter in &DELIMITER_CANDIDATES {
        let counts: Vec<f64> = sample
            .iter()
            .map(|line| count_unquoted(line, delimiter) as f64)
            .collect();

        let avg = counts.iter().sum::<f64>() / counts.len() as f64;
        let variance = counts.iter().map(|&x| (x - avg).powi(2)).sum::<f64>() / counts.len() as f64;
        let score = avg / (1.0 + variance.sqrt());

        if score > best_score {
            best_score = score;
            best_delimiter = delimiter;
        }
    }

    best_delimiter
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for byte in line.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if byte == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

pub fn is_missing_marker(value: &str) -> bool {
    NULL_MARKERS.contains(value)
}

/// Blank names become `col_<index>`; repeats get a numeric suffix.
fn unique_column_names<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut existing_names = HashSet::new();
    headers
        .enumerate()
        .map(|(idx, raw)| {
            let base = if raw.trim().is_empty() {
                format!("col_{}", idx)
            } else {
                raw.to_string()
            };

            let mut name = base.clone();
            let mut counter = 1;
            while !existing_names.insert(name.clone()) {
                name = format!("{}_{}", base, counter);
                counter += 1;
            }
            name
        })
        .collect()
}

fn detect_column_type(cells: &[Option<String>]) -> ColumnKind {
    let mut present = cells.iter().flatten().map(|s| s.trim()).peekable();
    if present.peek().is_none() {
        return ColumnKind::Text;
    }

    let mut kind = ColumnKind::Integer;
    for value in present {
        if kind == ColumnKind::Integer && value.parse::<i64>().is_err() {
            kind = ColumnKind::Float;
        }
        if kind == ColumnKind::Float && value.parse::<f64>().is_err() {
            return ColumnKind::Text;
        }
    }
    kind
}

fn build_series(name: &str, cells: Vec<Option<String>>) -> Series {
    match detect_column_type(&cells) {
        ColumnKind::Integer => {
            let nums: Vec<Option<i64>> = cells
                .iter()
                .map(|cell| cell.as_deref().and_then(|s| s.trim().parse().ok()))
                .collect();
            Series::new(name, nums)
        }
        ColumnKind::Float => {
            let nums: Vec<Option<f64>> = cells
                .iter()
                .map(|cell| cell.as_deref().and_then(|s| s.trim().parse().ok()))
                .collect();
            Series::new(name, nums)
        }
        ColumnKind::Text => Series::new(name, cells),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(csv: &str) -> LoadedTable {
        load_csv(csv.as_bytes(), &LoadOptions::default()).unwrap()
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a,b,c\nd,e,f"), b',');
        assert_eq!(detect_delimiter("a;b;c\nd;e;f"), b';');
        assert_eq!(detect_delimiter("a\tb\tc\nd\te\tf"), b'\t');
        assert_eq!(detect_delimiter("a|b\nc|d"), b'|');
        assert_eq!(detect_delimiter("single\nvalue"), b',');
    }

    #[test]
    fn quoted_delimiters_do_not_count() {
        let csv = "name;city\n\"Doe, Jane\";\"Paris, FR\"\n\"Roe, Rick\";\"Oslo, NO\"\n";
        assert_eq!(detect_delimiter(csv), b';');

        let table = load(csv);
        assert_eq!(table.delimiter, b';');
        assert_eq!(table.frame.width(), 2);
        assert_eq!(table.frame.height(), 2);
    }

    #[test]
    fn rows_with_extra_fields_are_skipped() {
        let table = load("a,b\n1,2\n3,4,5\n6,7\n");
        assert_eq!(table.frame.height(), 2);
        assert_eq!(table.skipped_rows, 1);
    }

    #[test]
    fn short_rows_are_padded_with_missing() {
        let table = load("a,b\nx,y\nz\n");
        assert_eq!(table.frame.height(), 2);
        assert_eq!(table.frame.column("b").unwrap().null_count(), 1);
        assert_eq!(table.skipped_rows, 0);
    }

    #[test]
    fn blank_lines_are_ignored() {
        let table = load("a,b\nx,y\n\n\nz,w\n");
        assert_eq!(table.frame.height(), 2);
        assert_eq!(table.skipped_rows, 0);
    }

    #[test]
    fn infers_numeric_columns() {
        let table = load("id,score,label\n1,1.5,a\n2,2,b\n3,NA,7\n");
        let frame = &table.frame;
        assert_eq!(frame.column("id").unwrap().dtype(), &DataType::Int64);
        assert_eq!(frame.column("score").unwrap().dtype(), &DataType::Float64);
        assert_eq!(frame.column("score").unwrap().null_count(), 1);
        assert_eq!(frame.column("label").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn strips_bom_and_dedupes_headers() {
        let mut bytes = BOM.to_vec();
        bytes.extend_from_slice(b"q,q,\n1,2,3\n");
        let table = load_csv(&bytes, &LoadOptions::default()).unwrap();
        assert_eq!(table.frame.get_column_names(), vec!["q", "q_1", "col_2"]);
    }

    #[test]
    fn header_only_file_loads_with_zero_rows() {
        let table = load("a,b\n");
        assert_eq!(table.frame.height(), 0);
        assert_eq!(table.frame.width(), 2);
    }

    #[test]
    fn rejects_empty_and_non_utf8_input() {
        assert_eq!(load_csv(b"  \n", &LoadOptions::default()).unwrap_err(), LoadError::Empty);
        assert_eq!(
            load_csv(b"a,b\n\xff,1\n", &LoadOptions::default()).unwrap_err(),
            LoadError::Encoding { offset: 4 }
        );
    }

    #[test]
    fn enforces_size_limit() {
        let options = LoadOptions { max_size: Some(4), ..Default::default() };
        assert_eq!(
            load_csv(b"a,b\n1,2\n", &options).unwrap_err(),
            LoadError::TooLarge { size: Some(8), limit: 4 }
        );
    }

    #[test]
    fn only_exact_na_markers_are_missing() {
        let table = load("q\nnone\nnone\nna\nyes\nNone\n<NA>\n");
        let q = table.frame.column("q").unwrap();
        assert_eq!(q.len(), 6);
        assert_eq!(q.null_count(), 2);
        assert!(!is_missing_marker("none"));
        assert!(!is_missing_marker("na"));
        assert!(!is_missing_marker("NAN"));
        assert!(is_missing_marker("#N/A N/A"));
    }

    #[test]
    fn explicit_delimiter_overrides_sniffing() {
        let options = LoadOptions { delimiter: Some(b'|'), ..Default::default() };
        let table = load_csv(b"a,b|c\n1,2|3\n", &options).unwrap();
        assert_eq!(table.frame.get_column_names(), vec!["a,b", "c"]);
    }
}
