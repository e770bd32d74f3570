//! Shared outcome types.

use std::fmt;

/// What a mutating operation did to the remote resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Resource was created
    Created,
    /// Resource was updated
    Modified,
    /// Remote state already matched
    NoChange,
    /// Resource was removed
    Removed,
}

impl Outcome {
    /// Check if the outcome represents a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoChange)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::NoChange => "no change",
            Self::Removed => "removed",
        };
        f.write_str(text)
    }
}
