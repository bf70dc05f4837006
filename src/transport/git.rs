use std::path::Path;

use crate::{
    cancel::Cancellation,
    git::{GitRepository, GitTransport},
};

use super::{Transport, TransportError};

impl Transport for GitTransport {
    type Handle = GitRepository;

    fn clone_with_checkout(
        &self,
        url: &str,
        dst: &Path,
        cancel: &Cancellation,
    ) -> Result<GitRepository, TransportError> {
        self.clone_repository(url, dst, true, cancel)
    }

    fn clone_without_checkout(
        &self,
        url: &str,
        dst: &Path,
        cancel: &Cancellation,
    ) -> Result<GitRepository, TransportError> {
        self.clone_repository(url, dst, false, cancel)
    }

    fn checkout_commit(
        &self,
        handle: &GitRepository,
        commit_hash: &str,
        cancel: &Cancellation,
    ) -> Result<(), TransportError> {
        GitTransport::checkout_commit(self, handle, commit_hash, cancel)
    }
}
