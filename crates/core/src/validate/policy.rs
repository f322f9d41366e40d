//! Validation policy and record normalization

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

use crate::import::RosterRecord;
use crate::member::MembershipRequest;
use crate::{Error, Result};

/// Minimum password length accepted for new accounts
pub const MIN_PASSWORD_LEN: usize = 6;

lazy_static! {
    static ref EMAIL_SHAPE: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid");
}

/// Basic `user@domain.tld` shape check
pub fn is_plausible_email(email: &str) -> bool {
    EMAIL_SHAPE.is_match(email)
}

/// Rule applied to the normalized email
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailRule {
    /// Any plausible `user@domain.tld`
    Plausible,
    /// Plausible and ending with the given suffix (e.g. `@gmail.com`)
    RequireSuffix(String),
}

/// Rule applied to the password column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRule {
    /// Passwords are not sent; any password column is ignored
    Ignore,
    /// Sent when present and non-empty, checked for length then
    Optional { min_len: usize },
    /// Every request must carry a password of at least `min_len` characters
    Required { min_len: usize },
}

/// Why a record was dropped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("email is missing")]
    MissingEmail,
    #[error("'{0}' is not a valid email address")]
    MalformedEmail(String),
    #[error("'{email}' must end with {suffix}")]
    DisallowedDomain { email: String, suffix: String },
    #[error("password is missing")]
    MissingPassword,
    #[error("password must be at least {min_len} characters")]
    PasswordTooShort { min_len: usize },
}

/// One validation policy per call site.
///
/// Single-add and bulk-add intentionally use different presets; see
/// [`ValidationPolicy::single_enrollment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    pub email: EmailRule,
    pub password: PasswordRule,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::bulk_enrollment()
    }
}

impl ValidationPolicy {
    /// Staff adding existing students to a class from a file
    pub fn bulk_enrollment() -> Self {
        Self {
            email: EmailRule::Plausible,
            password: PasswordRule::Ignore,
        }
    }

    /// Staff adding a single student by email; stricter than the bulk path
    pub fn single_enrollment() -> Self {
        Self {
            email: EmailRule::RequireSuffix("@gmail.com".to_string()),
            password: PasswordRule::Ignore,
        }
    }

    /// Admin creating accounts from a file
    pub fn user_creation() -> Self {
        Self {
            email: EmailRule::Plausible,
            password: PasswordRule::Required {
                min_len: MIN_PASSWORD_LEN,
            },
        }
    }

    pub fn with_email_rule(mut self, rule: EmailRule) -> Self {
        self.email = rule;
        self
    }

    pub fn with_password_rule(mut self, rule: PasswordRule) -> Self {
        self.password = rule;
        self
    }

    /// Trim, lower-case and check one email against this policy
    pub fn check_email(&self, raw: &str) -> std::result::Result<String, Rejection> {
        let email = raw.trim().to_lowercase();
        if email.is_empty() {
            return Err(Rejection::MissingEmail);
        }
        if !is_plausible_email(&email) {
            return Err(Rejection::MalformedEmail(email));
        }
        if let EmailRule::RequireSuffix(suffix) = &self.email {
            if !email.ends_with(&suffix.to_lowercase()) {
                return Err(Rejection::DisallowedDomain {
                    email,
                    suffix: suffix.clone(),
                });
            }
        }
        Ok(email)
    }

    fn check_password(
        &self,
        raw: Option<&str>,
    ) -> std::result::Result<Option<String>, Rejection> {
        let password = raw.filter(|p| !p.is_empty());
        match (self.password, password) {
            (PasswordRule::Ignore, _) => Ok(None),
            (PasswordRule::Optional { .. }, None) => Ok(None),
            (PasswordRule::Required { .. }, None) => Err(Rejection::MissingPassword),
            (
                PasswordRule::Optional { min_len } | PasswordRule::Required { min_len },
                Some(password),
            ) => {
                if password.chars().count() < min_len {
                    Err(Rejection::PasswordTooShort { min_len })
                } else {
                    Ok(Some(password.to_string()))
                }
            }
        }
    }

    /// Normalize one record into a request
    pub fn check_record(
        &self,
        record: &RosterRecord,
    ) -> std::result::Result<MembershipRequest, Rejection> {
        let email = self.check_email(record.email().ok_or(Rejection::MissingEmail)?)?;
        let password = self.check_password(record.password())?;
        Ok(MembershipRequest { email, password })
    }

    /// Validate a single email typed by the user
    pub fn request_for_email(&self, email: &str) -> Result<MembershipRequest> {
        self.request_for(email, None)
    }

    /// Validate a single email and password typed by the user
    pub fn request_for(&self, email: &str, password: Option<&str>) -> Result<MembershipRequest> {
        let invalid = |rejection: Rejection| Error::InvalidInput(rejection.to_string());
        let email = self.check_email(email).map_err(invalid)?;
        let password = self.check_password(password).map_err(invalid)?;
        Ok(MembershipRequest { email, password })
    }

    /// Normalize a batch, preserving row order and duplicates.
    ///
    /// Fails with `NoValidRows` when nothing survives.
    pub fn normalize(&self, records: &[RosterRecord]) -> Result<Vec<MembershipRequest>> {
        let mut requests = Vec::with_capacity(records.len());
        for record in records {
            match self.check_record(record) {
                Ok(request) => requests.push(request),
                Err(rejection) => {
                    debug!(line = record.line, %rejection, "Dropping roster row");
                }
            }
        }

        info!(
            kept = requests.len(),
            dropped = records.len() - requests.len(),
            "Normalized roster rows"
        );

        if requests.is_empty() {
            return Err(Error::NoValidRows {
                checked: records.len(),
            });
        }
        Ok(requests)
    }
}
