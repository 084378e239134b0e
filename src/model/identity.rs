//! Report identity: the `(type, id)` pair used for "don't show again".

use std::fmt;

/// Classifies a report for consent tracking.
///
/// Written as `type:id` on the command line and in `tattle-id` directives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub kind: String,
    pub id: String,
}

impl Identity {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Parse `type:id`. Both halves must be non-empty after trimming.
    pub fn parse(s: &str) -> Option<Self> {
        let (kind, id) = s.split_once(':')?;
        let (kind, id) = (kind.trim(), id.trim());
        if kind.is_empty() || id.is_empty() {
            return None;
        }
        Some(Self::new(kind, id))
    }

    /// JSON pointer to this identity's "show" flag in the persistent store.
    pub fn show_pointer(&self) -> String {
        format!(
            "/$show/{}/{}",
            escape_pointer(&self.kind),
            escape_pointer(&self.id)
        )
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}
