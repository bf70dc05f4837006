use std::path::Path;

use git2::{
    build::CheckoutBuilder, CheckoutNotificationType, Commit, Oid, Repository, ResetType,
};
use log::{debug, warn};

use crate::{cancel::Cancellation, transport::TransportError};

use super::{map_git_error, remote::RemoteAccess};

/// Refspecs fetched when the wanted commit is not reachable from the cloned
/// branches, e.g. the head of a pull request.
const FALLBACK_REFSPECS: &[&str] = &[
    "+refs/heads/*:refs/remotes/origin/*",
    "+refs/tags/*:refs/tags/*",
    "+refs/pull/*/head:refs/remotes/origin/pull/*",
    "+refs/merge-requests/*/head:refs/remotes/origin/merge-requests/*",
];

/// A freshly cloned repository.
pub struct GitRepository {
    git_repo: Repository,
}

impl std::fmt::Debug for GitRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepository")
            .field("workdir", &self.workdir())
            .finish()
    }
}

impl GitRepository {
    pub fn new(git_repo: Repository) -> GitRepository {
        GitRepository { git_repo }
    }

    pub fn repository(&self) -> &Repository {
        &self.git_repo
    }

    pub fn workdir(&self) -> &Path {
        self.git_repo
            .workdir()
            .unwrap_or_else(|| self.git_repo.path())
    }

    /// Detaches HEAD at `commit_hash` and hard resets the index and the
    /// working tree to it. The commit is fetched first if the clone does not
    /// contain it.
    pub fn checkout_commit(
        &self,
        access: &RemoteAccess,
        commit_hash: &str,
        cancel: &Cancellation,
    ) -> Result<(), TransportError> {
        let commit = self.find_or_fetch_commit(access, commit_hash, cancel)?;

        debug!(
            "Checking out {} in {}",
            commit.id(),
            self.workdir().display()
        );

        self.git_repo.set_head_detached(commit.id())?;

        let mut checkout = CheckoutBuilder::new();
        checkout
            .force()
            .notify_on(CheckoutNotificationType::UPDATED)
            .notify(|_, _, _, _, _| !cancel.is_cancelled());

        self.git_repo
            .reset(commit.as_object(), ResetType::Hard, Some(&mut checkout))
            .map_err(|e| map_git_error(e, cancel))?;

        Ok(())
    }

    fn find_commit(&self, revision: &str) -> Option<Commit<'_>> {
        self.git_repo
            .revparse_single(revision)
            .and_then(|object| object.peel_to_commit())
            .ok()
    }

    fn find_or_fetch_commit(
        &self,
        access: &RemoteAccess,
        commit_hash: &str,
        cancel: &Cancellation,
    ) -> Result<Commit<'_>, TransportError> {
        if let Some(commit) = self.find_commit(commit_hash) {
            return Ok(commit);
        }
        cancel.check()?;

        let mut remote = self.git_repo.find_remote("origin")?;

        // Only a full hash can be requested from the remote directly.
        if Oid::from_str(commit_hash).is_ok() && commit_hash.len() == 40 {
            debug!("Commit {} is not in the clone, fetching it", commit_hash);
            match remote.fetch(&[commit_hash], Some(&mut access.fetch_options(cancel)), None) {
                Ok(()) => {
                    if let Some(commit) = self.find_commit(commit_hash) {
                        return Ok(commit);
                    }
                }
                Err(error) => {
                    cancel.check()?;
                    warn!(
                        "Failed to fetch a single commit {}, falling back to a full fetch: {}",
                        commit_hash, error
                    );
                }
            }
        }

        remote
            .fetch(
                FALLBACK_REFSPECS,
                Some(&mut access.fetch_options(cancel)),
                None,
            )
            .map_err(|e| map_git_error(e, cancel))?;

        self.find_commit(commit_hash)
            .ok_or_else(|| TransportError::CommitNotFound {
                commit_hash: commit_hash.to_owned(),
            })
    }
}
