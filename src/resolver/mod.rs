mod remote;

use thiserror::Error;

use crate::{
    cancel::{Cancellation, Cancelled},
    model::{ParseError, ResolvedRevision},
};

pub use remote::RemoteRevisionResolver;

/// Maps a revision specifier of a repository to a concrete commit.
pub trait RevisionResolver {
    /// Resolves `specifier` for the repository at `url`.
    ///
    /// [`ResolvedRevision::DefaultBranch`] means the clone's own checkout is
    /// wanted. A [`ResolvedRevision::Commit`] must exist in the repository.
    fn resolve(
        &self,
        url: &str,
        specifier: &str,
        cancel: &Cancellation,
    ) -> Result<ResolvedRevision, ResolveError>;
}

impl<F> RevisionResolver for F
where
    F: Fn(&str, &str) -> Result<ResolvedRevision, ResolveError>,
{
    fn resolve(
        &self,
        url: &str,
        specifier: &str,
        cancel: &Cancellation,
    ) -> Result<ResolvedRevision, ResolveError> {
        cancel.check()?;
        self(url, specifier)
    }
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Invalid revision specifier: {0}")]
    Parse(#[from] ParseError),
    #[error("Revision {specifier} was not found")]
    ReferenceNotFound { specifier: String },
    #[error("Pull request {number} was not found")]
    PullRequestNotFound { number: u64 },
    #[error("Abbreviated commit {prefix} is ambiguous, candidates: {}", .candidates.join(", "))]
    AmbiguousCommit {
        prefix: String,
        candidates: Vec<String>,
    },
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
