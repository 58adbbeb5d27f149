/// Page state definitions for tracking crawl progress
///
/// This module defines all possible states a URL can be in during one crawl run.
use crate::MirrorError;
use std::fmt;

/// Represents the current state of a URL in the crawl process
///
/// ```text
/// queued -> fetching -> rendering -> rewriting -> persisted
///              |            |            |
///              +------------+------------+-----> skipped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Active States =====
    /// URL is in the frontier waiting to be visited
    Queued,

    /// Renderer is navigating to the URL
    Fetching,

    /// Navigation succeeded; waiting for content and expanding disclosures
    Rendering,

    /// Links and images are being rewritten
    Rewriting,

    // ===== Terminal States =====
    /// Page was written to disk and recorded as visited
    Persisted,

    /// Page failed (bad status, timeout, processing error); never retried
    Skipped,
}

impl PageState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Persisted | Self::Skipped)
    }

    /// Returns true if the state machine allows moving to `next`
    pub fn can_transition_to(&self, next: PageState) -> bool {
        matches!(
            (*self, next),
            (Self::Queued, Self::Fetching)
                | (Self::Fetching, Self::Rendering)
                | (Self::Rendering, Self::Rewriting)
                | (Self::Rewriting, Self::Persisted)
                | (Self::Fetching | Self::Rendering | Self::Rewriting, Self::Skipped)
        )
    }

    /// Moves to `next`, rejecting transitions the state machine does not allow
    pub fn transition(&mut self, next: PageState) -> Result<(), MirrorError> {
        if !self.can_transition_to(next) {
            return Err(MirrorError::InvalidTransition {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }

    /// Short lowercase label used in log lines and the manifest
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Rendering => "rendering",
            Self::Rewriting => "rewriting",
            Self::Persisted => "persisted",
            Self::Skipped => "skipped",
        }
    }

    /// Returns all possible page states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Queued,
            Self::Fetching,
            Self::Rendering,
            Self::Rewriting,
            Self::Persisted,
            Self::Skipped,
        ]
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
