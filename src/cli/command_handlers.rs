use std::{error::Error, path::PathBuf};

use log::info;

use crate::{cancel::Cancellation, Repofetch};

/// Handler to install command
pub fn do_install(
    repofetch: &Repofetch,
    url: &str,
    destination: Option<&str>,
    revision: &str,
    cancel: &Cancellation,
) -> Result<PathBuf, Box<dyn Error + Send + Sync>> {
    let destination = match destination {
        Some(destination) => PathBuf::from(destination),
        None => repofetch.default_destination(url)?,
    };
    repofetch.install_cancellable(url, &destination, revision, cancel)?;
    info!("Installed {} into {}", url, destination.display());
    Ok(destination)
}

/// Handler to resolve command. Returns the commit hash, empty for the
/// default branch.
pub fn do_resolve(
    repofetch: &Repofetch,
    url: &str,
    specifier: &str,
    cancel: &Cancellation,
) -> Result<String, Box<dyn Error + Send + Sync>> {
    let revision = repofetch.resolve(url, specifier, cancel)?;
    Ok(revision.as_str().to_owned())
}
