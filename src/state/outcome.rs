/// Outcome classification for visited targets
///
/// Derived from the final status of a visit and whether a file was written.
use std::fmt;

/// What happened when a target was visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VisitOutcome {
    // ===== Success States =====
    /// A 200 response was written to disk
    Written,

    /// A 304 response; the file from the earlier visit stands
    NotModified,

    /// A 301 response; the location was queued ahead of everything else
    Redirected,

    // ===== Error States =====
    /// Status 999: the destination clashes with an existing file or directory
    Conflict,

    /// A 4xx response
    ClientError,

    /// A 5xx response, including application failures
    ServerError,

    // ===== Special States =====
    /// Any other status; recorded but nothing written
    Other,
}

impl VisitOutcome {
    pub fn from_visit(status: u16, wrote_file: bool) -> Self {
        match status {
            200 if wrote_file => Self::Written,
            304 => Self::NotModified,
            301 => Self::Redirected,
            999 => Self::Conflict,
            400..=499 => Self::ClientError,
            500..=599 => Self::ServerError,
            _ => Self::Other,
        }
    }

    /// Returns true if this represents a per-target failure
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Conflict | Self::ClientError | Self::ServerError)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Written => "written",
            Self::NotModified => "not_modified",
            Self::Redirected => "redirected",
            Self::Conflict => "conflict",
            Self::ClientError => "client_error",
            Self::ServerError => "server_error",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for VisitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
