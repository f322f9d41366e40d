//! Member module
//!
//! Identities, normalized membership requests and import outcomes.

mod model;
mod summary;

pub use model::*;
pub use summary::MemberKind;
