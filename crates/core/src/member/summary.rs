//! User-facing wording for import outcomes

use super::model::ImportOutcome;

/// Which kind of member an import creates; drives the summary wording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// Existing accounts enrolled into a class
    Student,
    /// New accounts created by an admin
    User,
}

impl MemberKind {
    fn noun(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::User => "user",
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Self::Student => "added",
            Self::User => "created",
        }
    }

    fn skip_reason(self) -> &'static str {
        match self {
            Self::Student => "already enrolled or invalid",
            Self::User => "already exists or invalid",
        }
    }

    /// Generic message used when a failed submission carries no detail
    pub fn failure_fallback(self) -> &'static str {
        match self {
            Self::Student => "Failed to add students. Please try again.",
            Self::User => "Failed to create users. Please try again.",
        }
    }
}

fn counted(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

impl ImportOutcome {
    /// Human-readable summary, e.g.
    /// "1 student added successfully. 1 email skipped (already enrolled or invalid)."
    pub fn summary(&self, kind: MemberKind) -> String {
        let added = self.added_count();
        let skipped = self.skipped_count();

        let mut parts = Vec::with_capacity(2);
        if added > 0 || skipped == 0 {
            parts.push(format!(
                "{} {} successfully.",
                counted(added, kind.noun()),
                kind.verb()
            ));
        }
        if skipped > 0 {
            parts.push(format!(
                "{} skipped ({}).",
                counted(skipped, "email"),
                kind.skip_reason()
            ));
        }
        parts.join(" ")
    }
}
