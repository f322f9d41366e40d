//! CSV row extraction
//!
//! Header names are used verbatim (trimmed), so a row whose header lacks an
//! exact `email` column simply has no email and is dropped by validation.

use csv::{ReaderBuilder, Trim};

use super::record::RosterRecord;
use crate::{Error, Result};

pub(super) fn read_records(bytes: &[u8]) -> Result<Vec<RosterRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(bytes);

    let headers = reader.headers().map_err(Error::file_read)?.clone();

    let mut records = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let row = result.map_err(Error::file_read)?;
        if row.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        let line = row
            .position()
            .map(|pos| pos.line())
            .unwrap_or(index as u64 + 2);

        let mut record = RosterRecord::new(line);
        for (column, value) in headers.iter().zip(row.iter()) {
            if column.is_empty() {
                continue;
            }
            record.insert(column, value);
        }
        records.push(record);
    }

    Ok(records)
}
