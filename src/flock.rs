use std::{
    fs::File,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use fs4::fs_std::FileExt;
use log::debug;
use thiserror::Error;

use crate::cancel::{Cancellation, Cancelled};

const LOCK_TIMEOUT: Duration = Duration::from_secs(300);

/// Exclusive advisory lock, released on drop.
#[derive(Debug)]
pub struct FileLock {
    _file: File,
    path: PathBuf,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl FileLock {
    pub fn new(path: &Path, cancel: &Cancellation) -> Result<Self, Error> {
        let file = File::create(path)?;
        let start = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(_) => {
                    return Ok(Self {
                        _file: file,
                        path: path.to_path_buf(),
                    });
                }
                Err(error)
                    if error.raw_os_error() == fs4::lock_contended_error().raw_os_error()
                        && start.elapsed() < LOCK_TIMEOUT =>
                {
                    debug!("Failed to acquire a lock on {}, retrying", path.display());
                    cancel.sleep(Duration::from_secs(1))?;
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
