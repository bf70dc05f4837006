use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    cancel::Cancellation,
    git::GitTransport,
    install::{InstallError, InstallOptions, Installer},
    model::{ParseError, RepositorySource, ResolvedRevision},
    resolver::{RemoteRevisionResolver, ResolveError, RevisionResolver},
};

mod builder;

pub use builder::RepofetchBuilder;

/// Installs git repositories over the network with libgit2.
pub struct Repofetch {
    installer: Installer<RemoteRevisionResolver, GitTransport>,
    timeout: Option<Duration>,
    install_dir: PathBuf,
}

impl Repofetch {
    pub fn builder() -> RepofetchBuilder {
        RepofetchBuilder::default()
    }

    pub fn options(&self) -> &InstallOptions {
        self.installer.options()
    }

    /// Directory a repository is installed into when no destination is given.
    pub fn default_destination(&self, url: &str) -> Result<PathBuf, ParseError> {
        let source = RepositorySource::new(url)?;
        Ok(self.install_dir.join(source.name()))
    }

    /// Checks out `url` at `specifier` into `dst`.
    ///
    /// An empty specifier installs the tip of the default branch.
    pub fn install(
        &self,
        url: &str,
        dst: impl AsRef<Path>,
        specifier: &str,
    ) -> Result<(), InstallError> {
        self.install_cancellable(url, dst, specifier, &Cancellation::new())
    }

    /// Same as [`Repofetch::install`], aborting when `cancel` trips.
    pub fn install_cancellable(
        &self,
        url: &str,
        dst: impl AsRef<Path>,
        specifier: &str,
        cancel: &Cancellation,
    ) -> Result<(), InstallError> {
        self.installer
            .install(url, dst.as_ref(), specifier, &self.deadline(cancel))
    }

    /// Resolves `specifier` without cloning anything.
    pub fn resolve(
        &self,
        url: &str,
        specifier: &str,
        cancel: &Cancellation,
    ) -> Result<ResolvedRevision, ResolveError> {
        self.installer
            .resolver()
            .resolve(url, specifier, &self.deadline(cancel))
    }

    fn deadline(&self, cancel: &Cancellation) -> Cancellation {
        match self.timeout {
            Some(timeout) => cancel.with_timeout(timeout),
            None => cancel.clone(),
        }
    }
}
