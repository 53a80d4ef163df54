// 📂 Tabular I/O - Reference and input ingestion, result export
// The core only ever sees an already-parsed RawTable; every file/encoding
// concern lives here

use crate::pipeline::OutputRecord;
use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use log::{debug, info};
use std::fs;
use std::path::Path;

// Attempted in priority order when reading the uploaded input file
const ENCODINGS_TO_TRY: &[TextEncoding] = &[TextEncoding::Utf8, TextEncoding::Latin1];
const DELIMITERS_TO_TRY: &[u8] = &[b',', b';', b'\t'];

// A parse only counts as successful when one of these spellings shows up in
// the header row; a wrong delimiter can parse cleanly but produces garbage
// headers
const EXPECTED_NAME_HEADERS: &[&str] = &[
    "NomEtablissement",
    "nomEtablissement",
    "nom_etablissement",
];

// ============================================================================
// RAW TABLE
// ============================================================================

/// An already-parsed, already-delimiter-resolved tabular structure.
/// Rows are padded to header width so cell access never goes out of range.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell contents, empty string for anything out of range
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }
}

// ============================================================================
// TEXT DECODING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextEncoding {
    Utf8,
    Latin1,
}

impl TextEncoding {
    fn name(&self) -> &str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin1",
        }
    }

    /// Decode bytes, `None` when the bytes are not valid for this encoding.
    /// Latin-1 is a total mapping: every byte is the code point of the same
    /// value, so it always succeeds and serves as the fallback.
    fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            TextEncoding::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

// ============================================================================
// LOADERS
// ============================================================================

/// Load the reference directory: semicolon-delimited by convention, UTF-8
/// with a Latin-1 fallback. Any failure here is fatal and the pipeline must
/// never start.
pub fn load_reference(path: &Path) -> Result<RawTable> {
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read reference file: {:?}", path))?;

    let text = TextEncoding::Utf8
        .decode(&bytes)
        .or_else(|| TextEncoding::Latin1.decode(&bytes))
        .with_context(|| format!("Failed to decode reference file: {:?}", path))?;

    let table = parse_table(&text, b';')
        .with_context(|| format!("Failed to parse reference file: {:?}", path))?;

    if table.headers.is_empty() || table.is_empty() {
        bail!("Reference file is empty: {:?}", path);
    }

    info!(
        "loaded reference file {:?}: {} rows, {} columns",
        path,
        table.row_count(),
        table.headers.len()
    );
    Ok(table)
}

/// Load the uploaded input file with unknown encoding and delimiter.
///
/// Tries every (encoding × delimiter) combination in priority order and
/// accepts the first parse whose header row contains one of the expected
/// establishment-name spellings. Exhausting all combinations is fatal.
pub fn load_input(path: &Path) -> Result<RawTable> {
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read input file: {:?}", path))?;

    let mut last_error = String::from("no combination attempted");

    for encoding in ENCODINGS_TO_TRY {
        let Some(text) = encoding.decode(&bytes) else {
            last_error = format!("input is not valid {}", encoding.name());
            continue;
        };

        for &delimiter in DELIMITERS_TO_TRY {
            let table = match parse_table(&text, delimiter) {
                Ok(table) => table,
                Err(e) => {
                    last_error = format!(
                        "parse error with encoding '{}', delimiter '{}': {}",
                        encoding.name(),
                        delimiter as char,
                        e
                    );
                    continue;
                }
            };

            if has_expected_header(&table.headers) {
                info!(
                    "read input file {:?} with encoding '{}' and delimiter '{}'",
                    path,
                    encoding.name(),
                    delimiter as char
                );
                return Ok(table);
            }

            debug!(
                "parsed input with encoding '{}', delimiter '{}', but expected columns are absent",
                encoding.name(),
                delimiter as char
            );
            last_error = "could not find expected columns after parsing".to_string();
        }
    }

    bail!(
        "Failed to read input file {:?} with all attempted encodings and delimiters. Last error: {}",
        path,
        last_error
    );
}

fn has_expected_header(headers: &[String]) -> bool {
    headers
        .iter()
        .any(|h| EXPECTED_NAME_HEADERS.contains(&h.as_str()))
}

/// Parse delimiter-separated text into a RawTable, padding short rows and
/// truncating long ones to header width
fn parse_table(text: &str, delimiter: u8) -> Result<RawTable> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read header row")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let width = headers.len();
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result.context("Failed to read record")?;
        let mut row: Vec<String> = record.iter().map(|c| c.to_string()).collect();
        row.resize(width, String::new());
        rows.push(row);
    }

    Ok(RawTable { headers, rows })
}

// ============================================================================
// EXPORT
// ============================================================================

/// Write the result table as comma-delimited CSV with a header row.
/// Column order is fixed by the OutputRecord field order.
pub fn write_output(path: &Path, records: &[OutputRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create output file: {:?}", path))?;

    for record in records {
        writer
            .serialize(record)
            .context("Failed to write output record")?;
    }

    writer.flush().context("Failed to flush output file")?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
