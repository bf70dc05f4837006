use std::{
    ffi::OsStr,
    fmt::Display,
    path::{Path, PathBuf},
    time::Duration,
};

use log::{debug, info, warn};
use tempfile::TempDir;
use thiserror::Error;

use crate::{
    cancel::Cancellation,
    flock::FileLock,
    model::ResolvedRevision,
    resolver::{ResolveError, RevisionResolver},
    transport::{Transport, TransportError},
};

/// Step of an install that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Resolve,
    Clone,
    Checkout,
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Resolve => f.write_str("resolve"),
            Phase::Clone => f.write_str("clone"),
            Phase::Checkout => f.write_str("checkout"),
        }
    }
}

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Error resolving revision {specifier:?} of repository ({url}): {source}")]
    Resolve {
        url: String,
        specifier: String,
        #[source]
        source: ResolveError,
    },
    #[error("Error downloading repository ({url}): {source}")]
    Clone {
        url: String,
        #[source]
        source: TransportError,
    },
    #[error("Error checking out revision {revision} of repository ({url}): {source}")]
    Checkout {
        url: String,
        revision: String,
        #[source]
        source: TransportError,
    },
}

impl InstallError {
    pub fn phase(&self) -> Phase {
        match self {
            InstallError::Resolve { .. } => Phase::Resolve,
            InstallError::Clone { .. } => Phase::Clone,
            InstallError::Checkout { .. } => Phase::Checkout,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            InstallError::Resolve { url, .. }
            | InstallError::Clone { url, .. }
            | InstallError::Checkout { url, .. } => url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    /// Clone into a temporary sibling of the destination and move it in place
    /// only once the checkout succeeded.
    pub staging: bool,
    /// Hold an exclusive lock next to the destination for the whole install.
    pub lock: bool,
    /// Extra clone attempts after a transient failure.
    pub retries: u32,
    /// Delay before the first retry, doubled for every following one.
    pub backoff: Duration,
}

impl Default for InstallOptions {
    fn default() -> Self {
        InstallOptions {
            staging: true,
            lock: false,
            retries: 0,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Resolves a revision and materializes it with the cheapest clone strategy.
pub struct Installer<R, T> {
    resolver: R,
    transport: T,
    options: InstallOptions,
}

impl<R, T> Installer<R, T>
where
    R: RevisionResolver,
    T: Transport,
{
    pub fn new(resolver: R, transport: T) -> Self {
        Installer {
            resolver,
            transport,
            options: InstallOptions::default(),
        }
    }

    pub fn with_options(mut self, options: InstallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &InstallOptions {
        &self.options
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Installs `url` at `specifier` into `dst`.
    ///
    /// The specifier is resolved before anything is downloaded or written:
    /// a resolution failure leaves `dst` untouched.
    pub fn install(
        &self,
        url: &str,
        dst: &Path,
        specifier: &str,
        cancel: &Cancellation,
    ) -> Result<(), InstallError> {
        debug!("Resolving revision {:?} of {}", specifier, url);
        let resolved = self
            .resolver
            .resolve(url, specifier, cancel)
            .map_err(|source| InstallError::Resolve {
                url: url.to_owned(),
                specifier: specifier.to_owned(),
                source,
            })?;

        self.fetch_and_checkout(url, dst, &resolved, cancel)
    }

    /// Clones `url` into `dst` and checks out `resolved`.
    ///
    /// The default branch is materialized by the clone itself. An explicit
    /// commit is cloned without checkout and then checked out exactly once.
    pub fn fetch_and_checkout(
        &self,
        url: &str,
        dst: &Path,
        resolved: &ResolvedRevision,
        cancel: &Cancellation,
    ) -> Result<(), InstallError> {
        let clone_error = |source: TransportError| InstallError::Clone {
            url: url.to_owned(),
            source,
        };

        let _lock = if self.options.lock {
            Some(lock_destination(dst, cancel).map_err(clone_error)?)
        } else {
            None
        };

        ensure_destination_available(dst).map_err(clone_error)?;

        let auto_checkout = resolved.is_default_branch();
        debug!(
            "Cloning {} into {} ({})",
            url,
            dst.display(),
            if auto_checkout {
                "with checkout"
            } else {
                "without checkout"
            }
        );
        let (target, handle) = self
            .clone_with_retries(url, dst, auto_checkout, cancel)
            .map_err(clone_error)?;

        if let Some(commit_hash) = resolved.commit_hash() {
            debug!(
                "Checking out {} in {}",
                commit_hash,
                target.path().display()
            );
            self.transport
                .checkout_commit(&handle, commit_hash, cancel)
                .map_err(|source| InstallError::Checkout {
                    url: url.to_owned(),
                    revision: commit_hash.to_owned(),
                    source,
                })?;
        }
        drop(handle);

        target.persist(dst).map_err(clone_error)?;

        info!("Installed {} at {} into {}", url, resolved, dst.display());
        Ok(())
    }

    fn clone_into(
        &self,
        url: &str,
        dst: &Path,
        auto_checkout: bool,
        cancel: &Cancellation,
    ) -> Result<T::Handle, TransportError> {
        if auto_checkout {
            self.transport.clone_with_checkout(url, dst, cancel)
        } else {
            self.transport.clone_without_checkout(url, dst, cancel)
        }
    }

    fn clone_with_retries(
        &self,
        url: &str,
        dst: &Path,
        auto_checkout: bool,
        cancel: &Cancellation,
    ) -> Result<(CloneTarget, T::Handle), TransportError> {
        let mut attempt = 0;
        loop {
            let target = CloneTarget::prepare(dst, self.options.staging)?;
            match self.clone_into(url, target.path(), auto_checkout, cancel) {
                Ok(handle) => return Ok((target, handle)),
                Err(error) if error.is_transient() && attempt < self.options.retries => {
                    let delay = self.options.backoff.saturating_mul(1 << attempt.min(16));
                    attempt += 1;
                    warn!(
                        "Error downloading {} (attempt {} of {}), retrying in {:?}: {}",
                        url,
                        attempt,
                        self.options.retries + 1,
                        delay,
                        error
                    );
                    target.discard()?;
                    cancel.sleep(delay)?;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Where a clone is written to.
enum CloneTarget {
    Direct(PathBuf),
    /// Removed on drop unless persisted.
    Staged(TempDir),
}

impl CloneTarget {
    fn prepare(dst: &Path, staging: bool) -> Result<CloneTarget, TransportError> {
        if !staging {
            return Ok(CloneTarget::Direct(dst.to_path_buf()));
        }
        let (parent, name) = split_destination(dst)?;
        std::fs::create_dir_all(parent)?;
        let staging_dir = tempfile::Builder::new()
            .prefix(&format!(".{}.", name.to_string_lossy()))
            .suffix(".staging")
            .tempdir_in(parent)?;
        debug!("Staging clone in {}", staging_dir.path().display());
        Ok(CloneTarget::Staged(staging_dir))
    }

    fn path(&self) -> &Path {
        match self {
            CloneTarget::Direct(path) => path,
            CloneTarget::Staged(dir) => dir.path(),
        }
    }

    /// Throws away a failed attempt so the next one starts from scratch.
    fn discard(self) -> Result<(), TransportError> {
        match self {
            CloneTarget::Direct(path) if path.is_dir() => {
                for entry in path.read_dir()? {
                    let entry = entry?.path();
                    if entry.is_dir() {
                        std::fs::remove_dir_all(&entry)?;
                    } else {
                        std::fs::remove_file(&entry)?;
                    }
                }
                Ok(())
            }
            CloneTarget::Direct(_) => Ok(()),
            CloneTarget::Staged(dir) => Ok(dir.close()?),
        }
    }

    fn persist(self, dst: &Path) -> Result<(), TransportError> {
        match self {
            CloneTarget::Direct(_) => Ok(()),
            CloneTarget::Staged(dir) => {
                if dst.exists() {
                    // Checked to be empty before cloning.
                    std::fs::remove_dir(dst).map_err(|_| TransportError::DestinationExists {
                        path: dst.display().to_string(),
                    })?;
                }
                std::fs::rename(dir.path(), dst)?;
                // Moved away, nothing left to remove on drop.
                let _ = dir.keep();
                Ok(())
            }
        }
    }
}

fn split_destination(dst: &Path) -> Result<(&Path, &OsStr), TransportError> {
    let name = dst.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("destination {} has no directory name", dst.display()),
        )
    })?;
    let parent = match dst.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok((parent, name))
}

fn ensure_destination_available(dst: &Path) -> Result<(), TransportError> {
    if dst.exists() && (!dst.is_dir() || dst.read_dir()?.next().is_some()) {
        return Err(TransportError::DestinationExists {
            path: dst.display().to_string(),
        });
    }
    Ok(())
}

fn lock_destination(dst: &Path, cancel: &Cancellation) -> Result<FileLock, TransportError> {
    let (parent, name) = split_destination(dst)?;
    std::fs::create_dir_all(parent)?;
    let path = parent.join(format!(".{}.lock", name.to_string_lossy()));
    debug!("Acquiring a lock on {}", path.display());
    let lock = FileLock::new(&path, cancel)?;
    debug!("Acquired a lock on {}", lock.path().display());
    Ok(lock)
}
