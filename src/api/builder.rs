use std::{error::Error, path::PathBuf, time::Duration};

use home::home_dir;

use crate::{
    config::RepofetchConfig,
    git::{GitTransport, RemoteAccess},
    install::{InstallOptions, Installer},
    resolver::RemoteRevisionResolver,
    Repofetch,
};

#[derive(Default)]
pub struct RepofetchBuilder {
    timeout: Option<Duration>,
    retries: Option<u32>,
    backoff: Option<Duration>,
    staging: Option<bool>,
    lock: Option<bool>,
    install_dir: Option<PathBuf>,
    known_hosts: Option<PathBuf>,
}

impl RepofetchBuilder {
    /// Starts from loaded configuration; later calls override it.
    pub fn config(self, config: RepofetchConfig) -> Self {
        let RepofetchConfig {
            timeout,
            install_dir,
            options,
        } = config;
        RepofetchBuilder {
            timeout,
            retries: Some(options.retries),
            backoff: Some(options.backoff),
            staging: Some(options.staging),
            lock: Some(options.lock),
            install_dir,
            ..self
        }
    }

    /// Deadline for a whole install, resolution included.
    ///
    /// No deadline by default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Extra clone attempts after a transient network failure.
    ///
    /// Defaults to 0.
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Delay before the first retry, doubled for every following one.
    ///
    /// Defaults to 500ms.
    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Clone into a temporary directory and move it to the destination only
    /// when the checkout succeeded.
    ///
    /// Enabled by default.
    pub fn staging(mut self, staging: bool) -> Self {
        self.staging = Some(staging);
        self
    }

    /// Serialize installs into the same destination with a lock file.
    ///
    /// Disabled by default.
    pub fn lock(mut self, lock: bool) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Parent directory of installs without an explicit destination.
    ///
    /// Defaults to `$HOME/.repofetch/checkouts`.
    pub fn install_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.install_dir = Some(path.into());
        self
    }

    /// Known hosts file used to accept SSH host keys.
    ///
    /// Defaults to `/etc/ssh/ssh_known_hosts`.
    pub fn known_hosts(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts = Some(path.into());
        self
    }

    pub fn try_build(self) -> Result<Repofetch, Box<dyn Error + Send + Sync>> {
        let Self {
            timeout,
            retries,
            backoff,
            staging,
            lock,
            install_dir,
            known_hosts,
        } = self;

        let install_dir = match install_dir {
            Some(install_dir) => install_dir,
            None => default_install_dir()?,
        };

        let access = match known_hosts {
            Some(path) => RemoteAccess::new().known_hosts(path),
            None => RemoteAccess::new(),
        };

        let defaults = InstallOptions::default();
        let options = InstallOptions {
            staging: staging.unwrap_or(defaults.staging),
            lock: lock.unwrap_or(defaults.lock),
            retries: retries.unwrap_or(defaults.retries),
            backoff: backoff.unwrap_or(defaults.backoff),
        };

        let installer = Installer::new(
            RemoteRevisionResolver::new(access.clone()),
            GitTransport::new(access),
        )
        .with_options(options);

        Ok(Repofetch {
            installer,
            timeout,
            install_dir,
        })
    }
}

fn default_install_dir() -> Result<PathBuf, Box<dyn Error + Send + Sync>> {
    let mut install_dir =
        home_dir().ok_or("Could not find home dir. Please define $HOME env variable.")?;
    install_dir.push(".repofetch/checkouts");
    Ok(install_dir)
}
