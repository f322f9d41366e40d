//! Validate module
//!
//! Filters raw records into well-formed membership requests under a
//! configurable policy.

mod policy;

pub use policy::{is_plausible_email, EmailRule, PasswordRule, Rejection, ValidationPolicy};
