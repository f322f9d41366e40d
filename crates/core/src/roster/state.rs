//! In-memory roster state

use crate::member::Identity;

/// Ordered members of one class or user list.
///
/// Mutated only by an initial fetch, a single-add success, a bulk-import
/// success or a delete success. Every mutation bumps the revision, so a
/// fetch that started before a local change can be recognised as stale.
#[derive(Debug, Clone, Default)]
pub struct RosterState {
    members: Vec<Identity>,
    revision: u64,
}

impl PartialEq for RosterState {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl Eq for RosterState {}

impl RosterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_members(members: Vec<Identity>) -> Self {
        Self {
            members,
            revision: 0,
        }
    }

    /// Counter bumped by every mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn members(&self) -> &[Identity] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Identity> {
        self.members.iter().find(|m| m.id == id)
    }

    pub fn contains_email(&self, email: &str) -> bool {
        self.members
            .iter()
            .any(|m| m.email.eq_ignore_ascii_case(email))
    }

    /// Replace everything with a freshly fetched list
    pub fn replace(&mut self, members: Vec<Identity>) {
        self.members = members;
        self.revision += 1;
    }

    /// Replace with a fetched list only if nothing changed since `revision`
    /// was read. Returns false (and keeps the current members) when stale.
    pub fn replace_if_unchanged(&mut self, revision: u64, members: Vec<Identity>) -> bool {
        if self.revision != revision {
            return false;
        }
        self.replace(members);
        true
    }

    /// Record a single-add success
    pub fn push(&mut self, member: Identity) {
        self.members.push(member);
        self.revision += 1;
    }

    /// Append bulk-import results after the existing members, in order.
    ///
    /// No deduplication happens here; the backend reports duplicates as
    /// skipped emails.
    pub fn append(&mut self, added: impl IntoIterator<Item = Identity>) {
        self.members.extend(added);
        self.revision += 1;
    }

    pub fn remove_by_id(&mut self, id: &str) -> Option<Identity> {
        let index = self.members.iter().position(|m| m.id == id)?;
        self.revision += 1;
        Some(self.members.remove(index))
    }

    pub fn remove_by_email(&mut self, email: &str) -> Option<Identity> {
        let index = self
            .members
            .iter()
            .position(|m| m.email.eq_ignore_ascii_case(email))?;
        self.revision += 1;
        Some(self.members.remove(index))
    }
}
