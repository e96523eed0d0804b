/// Approval state definitions
///
/// A drafted event moves through these states between being posted to the
/// chat and appearing on the calendar.
use std::fmt;

/// Where a drafted event stands in the approval flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApprovalState {
    /// Summary was posted to the chat and is waiting for an admin reaction
    Posted,

    /// An admin approved the draft; publishing is in flight
    Approved,

    /// The calendar accepted the event
    Published,
}

impl ApprovalState {
    /// Returns true once nothing further can happen to the draft
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Published)
    }

    /// Returns true if the next state is reachable from this one
    ///
    /// `Approved → Posted` is the rollback taken when publishing fails and
    /// the draft is kept for another attempt.
    pub fn can_transition_to(&self, next: ApprovalState) -> bool {
        matches!(
            (self, next),
            (Self::Posted, Self::Approved)
                | (Self::Approved, Self::Published)
                | (Self::Approved, Self::Posted)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Posted => "posted",
            Self::Approved => "approved",
            Self::Published => "published",
        }
    }
}

impl fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
