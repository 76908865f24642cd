use crate::table::error::TableError;
use crate::table::row::{Row, Table};
use csv::{ReaderBuilder, StringRecord};
use std::path::Path;
use tracing::debug;

/// Column layout and dialect of an input table.
#[derive(Debug, Clone)]
pub struct TableOptions {
    pub delimiter: u8,
    pub time_column: String,
    /// Required category column; None when the run does not split by protocol.
    pub protocol_column: Option<String>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            time_column: "Time".to_string(),
            protocol_column: None,
        }
    }
}

/// Load a delimited table with a header row, keeping only the columns we need.
///
/// Expected shape (Wireshark "Export Packet Dissections" as CSV):
/// "No.","Time","Source","Destination","Protocol","Length","Info"
/// "1","0.000000","10.0.0.2","10.0.0.1","DNS","84","Standard query ..."
///
/// Missing required columns are fatal. Short records are tolerated; the
/// absent cells read as blank and are dropped later during normalization.
pub fn load_table(path: &Path, opts: &TableOptions) -> Result<Table, TableError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(opts.delimiter)
        .flexible(true)
        .has_headers(true)
        .from_path(path)
        .map_err(|source| TableError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let headers = reader
        .headers()
        .map_err(|source| TableError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();

    if headers.is_empty() {
        return Err(TableError::EmptyHeader {
            path: path.to_path_buf(),
        });
    }

    let time_idx = column_index(path, &headers, &opts.time_column)?;
    let protocol_idx = match &opts.protocol_column {
        Some(name) => Some(column_index(path, &headers, name)?),
        None => None,
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| TableError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

        // Header occupies line 1, so fall back to a running count past it.
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(rows.len() + 2);

        let time = record.get(time_idx).unwrap_or("").to_string();
        let protocol = protocol_idx
            .and_then(|idx| record.get(idx))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        rows.push(Row {
            line,
            time,
            protocol,
        });
    }

    debug!(path = %path.display(), rows = rows.len(), "loaded table");
    Ok(Table { rows })
}

fn column_index(path: &Path, headers: &StringRecord, name: &str) -> Result<usize, TableError> {
    headers
        .iter()
        .position(|h| normalize_header(h) == name)
        .ok_or_else(|| TableError::MissingColumn {
            path: path.to_path_buf(),
            column: name.to_string(),
            found: headers.iter().map(|h| normalize_header(h).to_string()).collect(),
        })
}

/// Excel-produced exports often lead with a UTF-8 BOM on the first header.
fn normalize_header(h: &str) -> &str {
    h.trim_start_matches('\u{feff}').trim()
}
