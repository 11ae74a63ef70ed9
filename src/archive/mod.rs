//! Read access to the mailing-list archive.
//!
//! The archive is an append-only git repository in the public-inbox style:
//! every new message lands as one new file in one new commit on a single
//! tracked branch. The [`Archive`] trait is the seam the scan engine works
//! against; [`GitArchive`] is the gix-backed implementation reading a local
//! mirror.

pub mod git;

pub use git::GitArchive;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to open archive: {0}")]
    Open(#[from] gix::open::Error),
    #[error("branch `{0}` has no resolvable head")]
    UnresolvedBranch(String),
    #[error("{0}")]
    Other(String),
}

/// Half-open revision range `(from, to]` along the tracked branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevRange {
    pub from: String,
    pub to: String,
}

/// A line-oriented stream of incremental diff output.
pub type DiffLines<'a> = Box<dyn Iterator<Item = Result<String, ArchiveError>> + 'a>;

pub trait Archive {
    /// Resolve the current tip of the given branch.
    fn resolve_head(&self, branch: &str) -> Result<String, ArchiveError>;

    /// Stream the incremental diff for `range` in chronological order.
    ///
    /// Each file added in the range corresponds to exactly one new message;
    /// the stream carries unified-diff hunks whose added lines reassemble
    /// into the raw message text.
    fn stream_diff(&self, range: &RevRange) -> Result<DiffLines<'_>, ArchiveError>;
}

impl<T: Archive + ?Sized> Archive for &T {
    fn resolve_head(&self, branch: &str) -> Result<String, ArchiveError> {
        (**self).resolve_head(branch)
    }

    fn stream_diff(&self, range: &RevRange) -> Result<DiffLines<'_>, ArchiveError> {
        (**self).stream_diff(range)
    }
}
