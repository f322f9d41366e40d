//! Roster targets and their wire shapes
//!
//! Each caller of the membership API gets its own variant, so the request
//! body shape is decided by the type rather than by a loosely-typed object.

use roster_core::member::{MemberKind, MembershipRequest};
use roster_core::validate::ValidationPolicy;
use serde::Serialize;
use urlencoding::encode;

/// The collection a roster view manages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    /// Staff member managing the students of one class
    ClassRoster { class_id: String, staff_id: String },
    /// Admin managing user accounts
    Accounts,
}

/// An account to create in an admin bulk import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
}

/// JSON body of a bulk import request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BulkImportBody {
    Enrollment {
        #[serde(rename = "studentEmails")]
        student_emails: Vec<String>,
    },
    Accounts {
        users: Vec<NewAccount>,
    },
}

/// JSON body of a single-add request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub(crate) enum AddMemberBody {
    Enrollment {
        #[serde(rename = "studentEmail")]
        student_email: String,
    },
    Account(NewAccount),
}

impl ImportTarget {
    pub fn class_roster(class_id: impl Into<String>, staff_id: impl Into<String>) -> Self {
        Self::ClassRoster {
            class_id: class_id.into(),
            staff_id: staff_id.into(),
        }
    }

    pub fn kind(&self) -> MemberKind {
        match self {
            Self::ClassRoster { .. } => MemberKind::Student,
            Self::Accounts => MemberKind::User,
        }
    }

    /// Policy applied to uploaded files
    pub fn bulk_policy(&self) -> ValidationPolicy {
        match self {
            Self::ClassRoster { .. } => ValidationPolicy::bulk_enrollment(),
            Self::Accounts => ValidationPolicy::user_creation(),
        }
    }

    /// Policy applied to a single typed-in member
    pub fn single_policy(&self) -> ValidationPolicy {
        match self {
            Self::ClassRoster { .. } => ValidationPolicy::single_enrollment(),
            Self::Accounts => ValidationPolicy::user_creation(),
        }
    }

    pub(crate) fn list_path(&self) -> String {
        match self {
            Self::ClassRoster { class_id, .. } => format!("/classes/{}/students", encode(class_id)),
            Self::Accounts => "/admin/users".to_string(),
        }
    }

    pub(crate) fn add_path(&self) -> String {
        match self {
            Self::ClassRoster { class_id, staff_id } => format!(
                "/staff/{}/classes/{}/students",
                encode(staff_id),
                encode(class_id)
            ),
            Self::Accounts => "/admin/users".to_string(),
        }
    }

    pub(crate) fn bulk_path(&self) -> String {
        format!("{}/bulk", self.add_path())
    }

    pub(crate) fn member_path(&self, member_id: &str) -> String {
        format!("{}/{}", self.list_path(), encode(member_id))
    }

    pub fn bulk_body(&self, requests: &[MembershipRequest]) -> BulkImportBody {
        match self {
            Self::ClassRoster { .. } => BulkImportBody::Enrollment {
                student_emails: requests.iter().map(|r| r.email.clone()).collect(),
            },
            Self::Accounts => BulkImportBody::Accounts {
                users: requests.iter().map(new_account).collect(),
            },
        }
    }

    pub(crate) fn add_body(&self, request: &MembershipRequest) -> AddMemberBody {
        match self {
            Self::ClassRoster { .. } => AddMemberBody::Enrollment {
                student_email: request.email.clone(),
            },
            Self::Accounts => AddMemberBody::Account(new_account(request)),
        }
    }
}

fn new_account(request: &MembershipRequest) -> NewAccount {
    NewAccount {
        email: request.email.clone(),
        password: request.password.clone().unwrap_or_default(),
    }
}
