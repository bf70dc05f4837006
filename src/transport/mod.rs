mod git;
pub mod memory;

use std::path::Path;

use git2::{ErrorClass, ErrorCode};
use thiserror::Error;

use crate::cancel::{Cancellation, Cancelled};

pub use memory::MemoryTransport;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),
    #[error("Commit {commit_hash} was not found in the repository")]
    CommitNotFound { commit_hash: String },
    #[error("Repository {url} was not found")]
    RepositoryNotFound { url: String },
    #[error("Destination {path} already exists and is not an empty directory")]
    DestinationExists { path: String },
    #[error("Destination lock cannot be acquired: {0}")]
    Lock(#[from] crate::flock::Error),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

impl TransportError {
    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Git(error) => {
                matches!(
                    error.class(),
                    ErrorClass::Net | ErrorClass::Http | ErrorClass::Ssh | ErrorClass::Ssl
                ) && !matches!(error.code(), ErrorCode::Auth | ErrorCode::Certificate)
            }
            _ => false,
        }
    }
}

/// The three primitives the installer needs from a version control backend.
pub trait Transport {
    type Handle;

    /// Clones `url` into `dst` and materializes the default branch.
    fn clone_with_checkout(
        &self,
        url: &str,
        dst: &Path,
        cancel: &Cancellation,
    ) -> Result<Self::Handle, TransportError>;

    /// Clones `url` into `dst` without materializing any working tree.
    fn clone_without_checkout(
        &self,
        url: &str,
        dst: &Path,
        cancel: &Cancellation,
    ) -> Result<Self::Handle, TransportError>;

    /// Hard resets the working tree of `handle` to `commit_hash`.
    fn checkout_commit(
        &self,
        handle: &Self::Handle,
        commit_hash: &str,
        cancel: &Cancellation,
    ) -> Result<(), TransportError>;
}

impl<T> Transport for &T
where
    T: Transport + ?Sized,
{
    type Handle = T::Handle;

    fn clone_with_checkout(
        &self,
        url: &str,
        dst: &Path,
        cancel: &Cancellation,
    ) -> Result<Self::Handle, TransportError> {
        (**self).clone_with_checkout(url, dst, cancel)
    }

    fn clone_without_checkout(
        &self,
        url: &str,
        dst: &Path,
        cancel: &Cancellation,
    ) -> Result<Self::Handle, TransportError> {
        (**self).clone_without_checkout(url, dst, cancel)
    }

    fn checkout_commit(
        &self,
        handle: &Self::Handle,
        commit_hash: &str,
        cancel: &Cancellation,
    ) -> Result<(), TransportError> {
        (**self).checkout_commit(handle, commit_hash, cancel)
    }
}
