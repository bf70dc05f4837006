mod remote;
mod repository;

use std::path::Path;

use git2::{
    build::{CheckoutBuilder, RepoBuilder},
    CheckoutNotificationType,
};
use log::trace;

use crate::{
    cancel::{Cancellation, Cancelled},
    transport::TransportError,
};

pub use remote::RemoteAccess;
pub use repository::GitRepository;

/// Clones through libgit2 with full history.
#[derive(Debug, Clone, Default)]
pub struct GitTransport {
    access: RemoteAccess,
}

impl GitTransport {
    pub fn new(access: RemoteAccess) -> Self {
        GitTransport { access }
    }

    pub fn access(&self) -> &RemoteAccess {
        &self.access
    }

    /// Clones `url` into `dst`. With `checkout` unset no working tree is
    /// materialized; the caller is expected to check out a commit afterwards.
    pub fn clone_repository(
        &self,
        url: &str,
        dst: &Path,
        checkout: bool,
        cancel: &Cancellation,
    ) -> Result<GitRepository, TransportError> {
        cancel.check()?;

        let mut checkout_builder = CheckoutBuilder::new();
        if checkout {
            checkout_builder
                .notify_on(CheckoutNotificationType::UPDATED)
                .notify(|_, _, _, _, _| !cancel.is_cancelled());
        } else {
            // GIT_CHECKOUT_NONE
            checkout_builder.dry_run();
        }

        let mut repo_builder = RepoBuilder::new();
        repo_builder
            .fetch_options(self.access.fetch_options(cancel))
            .with_checkout(checkout_builder);

        trace!(
            "Cloning {} into {} (checkout: {})",
            url,
            dst.display(),
            checkout
        );
        let repo = repo_builder
            .clone(url, dst)
            .map_err(|e| map_git_error(e, cancel))?;

        Ok(GitRepository::new(repo))
    }

    pub fn checkout_commit(
        &self,
        repository: &GitRepository,
        commit_hash: &str,
        cancel: &Cancellation,
    ) -> Result<(), TransportError> {
        repository.checkout_commit(&self.access, commit_hash, cancel)
    }
}

/// libgit2 reports an aborted callback as a plain error; surface it as a
/// cancellation when the token tripped.
pub(crate) fn map_git_error(error: git2::Error, cancel: &Cancellation) -> TransportError {
    if cancel.is_cancelled() {
        TransportError::Cancelled(Cancelled)
    } else {
        TransportError::Git(error)
    }
}
