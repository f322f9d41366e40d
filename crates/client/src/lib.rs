//! Roster Client - membership API access for the import workflow
//!
//! This crate wires the extraction and validation in `roster-core` to the
//! backend's membership endpoints and keeps the client-side roster in sync.

mod auth;
mod client;
mod config;
mod controller;
mod error;
mod poller;
mod target;

pub use auth::{AuthContext, AuthSubscription, AuthUser};
pub use client::{HttpMembershipClient, MembershipApi};
pub use config::ClientConfig;
pub use controller::{ImportReport, RosterController};
pub use error::{ClientError, Result};
pub use poller::{PollHandle, Poller};
pub use target::{BulkImportBody, ImportTarget, NewAccount};
