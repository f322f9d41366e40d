//! Member model definitions

use serde::{Deserialize, Serialize};

/// A person known to the backend (student, staff member or user account)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub display_name: String,
}

impl Identity {
    /// Create a new identity whose display name defaults to the email
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        let email = email.into();
        Self {
            id: id.into(),
            display_name: email.clone(),
            email,
        }
    }

    /// Set the display name
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

/// A validated request to add one member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRequest {
    /// Trimmed, lower-cased email
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl MembershipRequest {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

/// Authoritative result of a bulk import as reported by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    pub added: Vec<Identity>,
    pub skipped_emails: Vec<String>,
}

impl ImportOutcome {
    /// Build an outcome, dropping skipped emails that also appear as added.
    ///
    /// Added and skipped emails are disjoint; an email reported in both
    /// lists counts as added.
    pub fn new(added: Vec<Identity>, skipped_emails: Vec<String>) -> Self {
        let skipped_emails = skipped_emails
            .into_iter()
            .filter(|email| {
                !added
                    .iter()
                    .any(|identity| identity.email.eq_ignore_ascii_case(email))
            })
            .collect();

        Self {
            added,
            skipped_emails,
        }
    }

    pub fn added_count(&self) -> usize {
        self.added.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped_emails.len()
    }
}
