//! XLSX row extraction
//!
//! Only the first sheet is read and its first row must name an `email`
//! column (case-insensitive). Unlike CSV, a missing email header fails the
//! whole file before any record is produced.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};

use super::record::{RosterRecord, EMAIL_COLUMN, PASSWORD_COLUMN};
use crate::{Error, Result};

pub(super) fn read_records(bytes: &[u8]) -> Result<Vec<RosterRecord>> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).map_err(Error::file_read)?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::FileRead("workbook contains no sheets".to_string()))?
        .map_err(Error::file_read)?;

    let mut rows = range.rows();
    let header: Vec<String> = match rows.next() {
        Some(row) => row.iter().map(cell_text).collect(),
        None => return Err(Error::MissingColumn(EMAIL_COLUMN.to_string())),
    };

    let email_col = find_column(&header, EMAIL_COLUMN)
        .ok_or_else(|| Error::MissingColumn(EMAIL_COLUMN.to_string()))?;
    let password_col = find_column(&header, PASSWORD_COLUMN);

    // Range coordinates are relative to the first used cell
    let first_row = range.start().map(|(row, _)| row as u64 + 1).unwrap_or(1);

    let mut records = Vec::new();
    for (offset, row) in rows.enumerate() {
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        if cells.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        let mut record = RosterRecord::new(first_row + offset as u64 + 1);
        for (index, column) in header.iter().enumerate() {
            let key = if index == email_col {
                EMAIL_COLUMN
            } else if Some(index) == password_col {
                PASSWORD_COLUMN
            } else if column.is_empty() || is_canonical(column) {
                // Duplicate email/password headers never shadow the located columns
                continue;
            } else {
                column.as_str()
            };
            let value = cells.get(index).cloned().unwrap_or_default();
            record.insert(key, value);
        }
        records.push(record);
    }

    Ok(records)
}

fn find_column(header: &[String], name: &str) -> Option<usize> {
    header
        .iter()
        .position(|column| column.trim().eq_ignore_ascii_case(name))
}

fn is_canonical(column: &str) -> bool {
    let column = column.trim();
    column.eq_ignore_ascii_case(EMAIL_COLUMN) || column.eq_ignore_ascii_case(PASSWORD_COLUMN)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(value) => value.trim().to_string(),
        // Numeric cells holding whole numbers (e.g. numeric passwords) lose
        // their trailing ".0"
        Data::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
            format!("{}", *value as i64)
        }
        other => other.to_string().trim().to_string(),
    }
}
