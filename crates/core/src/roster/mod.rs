//! Roster module
//!
//! The client-side view of a class or user list.

mod state;

pub use state::RosterState;
