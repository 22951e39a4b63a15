//! Loading the published EFOS taxpayer list.
//!
//! The published file is a loosely structured CSV: a few title rows, then a
//! header, then one row per taxpayer. The encoding and the separator vary
//! between releases, so both are detected rather than assumed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use csv::{ReaderBuilder, StringRecord, Trim};
use lazy_static::lazy_static;
use tracing::{debug, info, warn};

use crate::error::ReferenceError;
use crate::models::config::ReferenceConfig;

use super::Blacklist;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const DELIMITERS: [u8; 4] = [b',', b';', b'|', b'\t'];

lazy_static! {
    static ref CACHE: Mutex<HashMap<ReferenceConfig, Arc<Blacklist>>> =
        Mutex::new(HashMap::new());
}

/// Load the blacklist, degrading any failure into an unusable list.
pub fn load(config: &ReferenceConfig) -> Blacklist {
    match try_load(config) {
        Ok(list) => {
            info!("{} ({})", list.status(), config.path.display());
            list
        }
        Err(e) => {
            warn!("Blacklist unavailable: {}", e);
            Blacklist::unavailable(e.to_string()).with_source(&config.path)
        }
    }
}

/// Load the blacklist once per configuration for the whole process.
pub fn load_cached(config: &ReferenceConfig) -> Arc<Blacklist> {
    let mut cache = match CACHE.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    if let Some(list) = cache.get(config) {
        debug!("Blacklist cache hit: {}", config.path.display());
        return Arc::clone(list);
    }

    let list = Arc::new(load(config));
    cache.insert(config.clone(), Arc::clone(&list));
    list
}

/// Drop every cached list so the next load re-reads the file.
pub fn clear_cache() {
    match CACHE.lock() {
        Ok(mut guard) => guard.clear(),
        Err(poisoned) => poisoned.into_inner().clear(),
    }
}

/// Load the blacklist, reporting why it could not be read.
pub fn try_load(config: &ReferenceConfig) -> Result<Blacklist, ReferenceError> {
    if !config.path.exists() {
        return Err(ReferenceError::NotFound(config.path.clone()));
    }

    let bytes = std::fs::read(&config.path)?;
    let text = decode(&bytes);
    Ok(parse_listing(&text, config)?.with_source(&config.path))
}

/// Decode as UTF-8 (BOM stripped), falling back to Latin-1.
pub fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            debug!("Reference file is not UTF-8, decoding as Latin-1");
            // Latin-1 maps every byte to the code point of the same value.
            bytes.iter().map(|&b| b as char).collect()
        }
    }
}

/// Parse the decoded listing into a blacklist.
pub fn parse_listing(text: &str, config: &ReferenceConfig) -> Result<Blacklist, ReferenceError> {
    let header = find_header(text, config).ok_or_else(|| ReferenceError::ColumnsNotFound {
        tax_id: config.tax_id_marker.clone(),
        status: config.status_marker.clone(),
    })?;

    debug!(
        "Reference header at line {} (separator {:?}, RFC column {}, status column {})",
        header.line + 1,
        header.delimiter as char,
        header.tax_id_column,
        header.status_column
    );

    let body = text
        .lines()
        .skip(header.line + 1)
        .collect::<Vec<_>>()
        .join("\n");
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(header.delimiter)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(body.as_bytes());

    let listed_marker = config.listed_marker.to_uppercase();
    let mut rfcs = Vec::new();
    let mut skipped = 0usize;

    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                debug!("Skipping malformed reference row: {}", e);
                skipped += 1;
                continue;
            }
        };

        let (Some(rfc), Some(status)) = (
            record.get(header.tax_id_column),
            record.get(header.status_column),
        ) else {
            skipped += 1;
            continue;
        };

        if !rfc.is_empty() && status.to_uppercase().contains(&listed_marker) {
            rfcs.push(rfc.to_string());
        }
    }

    if skipped > 0 {
        warn!("Skipped {} malformed reference rows", skipped);
    }

    Ok(Blacklist::from_rfcs(rfcs))
}

struct Header {
    line: usize,
    delimiter: u8,
    tax_id_column: usize,
    status_column: usize,
}

/// Search the first non-empty lines for a row naming both columns.
fn find_header(text: &str, config: &ReferenceConfig) -> Option<Header> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .take(config.max_skipped_rows + 1)
        .find_map(|(line_no, line)| {
            let delimiter = detect_delimiter(line);
            let fields = split_line(line, delimiter)?;
            let tax_id_column = find_column(&fields, &config.tax_id_marker)?;
            let status_column = find_column(&fields, &config.status_marker)?;

            Some(Header {
                line: line_no,
                delimiter,
                tax_id_column,
                status_column,
            })
        })
}

/// The separator that splits the line into the most fields.
fn detect_delimiter(line: &str) -> u8 {
    let mut best = DELIMITERS[0];
    let mut best_count = 0;

    for delimiter in DELIMITERS {
        let count = split_line(line, delimiter).map(|r| r.len()).unwrap_or(0);
        if count > best_count {
            best = delimiter;
            best_count = count;
        }
    }

    best
}

fn split_line(line: &str, delimiter: u8) -> Option<StringRecord> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(line.as_bytes());

    let mut record = StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => Some(record),
        _ => None,
    }
}

/// Index of the first header containing `marker`, case-insensitively.
fn find_column(headers: &StringRecord, marker: &str) -> Option<usize> {
    let marker = marker.to_uppercase();
    headers
        .iter()
        .position(|header| header.to_uppercase().contains(&marker))
}
