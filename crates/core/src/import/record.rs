//! Raw roster record

use std::collections::BTreeMap;

pub const EMAIL_COLUMN: &str = "email";
pub const PASSWORD_COLUMN: &str = "password";

/// One data row as extracted from a file: column name to cell text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterRecord {
    /// 1-based line (CSV) or row (XLSX) in the source file
    pub line: u64,
    fields: BTreeMap<String, String>,
}

impl RosterRecord {
    pub fn new(line: u64) -> Self {
        Self {
            line,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    pub fn email(&self) -> Option<&str> {
        self.get(EMAIL_COLUMN)
    }

    pub fn password(&self) -> Option<&str> {
        self.get(PASSWORD_COLUMN)
    }
}
