//! In-process transport backed by registered file trees.
//!
//! Useful to exercise an installer without network or libgit2: clones write
//! the registered files to disk so working trees can be compared.

use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, PoisonError,
    },
};

use dashmap::DashMap;
use git2::{ErrorClass, ErrorCode};
use log::trace;

use crate::cancel::Cancellation;

use super::{Transport, TransportError};

pub type FileTree = BTreeMap<PathBuf, Vec<u8>>;

/// A remote repository: commits by hash and the tip of the default branch.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    default_branch: Option<String>,
    commits: HashMap<String, FileTree>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_commit<P, C>(
        mut self,
        commit_hash: impl Into<String>,
        files: impl IntoIterator<Item = (P, C)>,
    ) -> Self
    where
        P: Into<PathBuf>,
        C: Into<Vec<u8>>,
    {
        let tree = files
            .into_iter()
            .map(|(path, content)| (path.into(), content.into()))
            .collect();
        self.commits.insert(commit_hash.into(), tree);
        self
    }

    pub fn with_default_branch(mut self, commit_hash: impl Into<String>) -> Self {
        self.default_branch = Some(commit_hash.into());
        self
    }

    pub fn tree(&self, commit_hash: &str) -> Option<&FileTree> {
        self.commits.get(commit_hash)
    }

    /// Looks a commit up by full hash or by a unique prefix.
    fn find(&self, revision: &str) -> Option<&FileTree> {
        if let Some(tree) = self.commits.get(revision) {
            return Some(tree);
        }
        let mut matches = self
            .commits
            .iter()
            .filter(|(hash, _)| hash.starts_with(revision));
        match (matches.next(), matches.next()) {
            (Some((_, tree)), None) => Some(tree),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    CloneWithCheckout { url: String, dst: PathBuf },
    CloneWithoutCheckout { url: String, dst: PathBuf },
    CheckoutCommit { dst: PathBuf, commit_hash: String },
}

#[derive(Debug, Clone)]
pub struct MemoryCheckout {
    url: String,
    path: PathBuf,
}

impl MemoryCheckout {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Default)]
pub struct MemoryTransport {
    repositories: DashMap<String, MemoryRepository>,
    calls: Mutex<Vec<TransportCall>>,
    transient_failures: AtomicUsize,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_repository(&self, url: impl Into<String>, repository: MemoryRepository) {
        self.repositories.insert(url.into(), repository);
    }

    /// The next `count` clones fail with a network error.
    pub fn fail_next_clones(&self, count: usize) {
        self.transient_failures.store(count, Ordering::SeqCst);
    }

    /// Files of `commit_hash` in the repository registered for `url`.
    pub fn repository_tree(&self, url: &str, commit_hash: &str) -> Option<FileTree> {
        self.repositories
            .get(url)
            .and_then(|entry| entry.value().tree(commit_hash).cloned())
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: TransportCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn take_transient_failure(&self) -> bool {
        self.transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn repository(&self, url: &str) -> Result<MemoryRepository, TransportError> {
        self.repositories
            .get(url)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| TransportError::RepositoryNotFound {
                url: url.to_owned(),
            })
    }

    fn clone_into(
        &self,
        url: &str,
        dst: &Path,
        checkout: bool,
        cancel: &Cancellation,
    ) -> Result<MemoryCheckout, TransportError> {
        cancel.check()?;
        if checkout {
            self.record(TransportCall::CloneWithCheckout {
                url: url.to_owned(),
                dst: dst.to_path_buf(),
            });
        } else {
            self.record(TransportCall::CloneWithoutCheckout {
                url: url.to_owned(),
                dst: dst.to_path_buf(),
            });
        }

        if self.take_transient_failure() {
            return Err(git2::Error::new(
                ErrorCode::GenericError,
                ErrorClass::Net,
                "connection reset by peer",
            )
            .into());
        }

        let repository = self.repository(url)?;

        if dst.exists() && (!dst.is_dir() || dst.read_dir()?.next().is_some()) {
            return Err(TransportError::DestinationExists {
                path: dst.display().to_string(),
            });
        }
        std::fs::create_dir_all(dst)?;

        if checkout {
            let tip = repository.default_branch.as_deref().unwrap_or("HEAD");
            let tree = repository
                .find(tip)
                .ok_or_else(|| TransportError::CommitNotFound {
                    commit_hash: tip.to_owned(),
                })?;
            write_tree(dst, tree)?;
        }

        Ok(MemoryCheckout {
            url: url.to_owned(),
            path: dst.to_path_buf(),
        })
    }
}

impl Transport for MemoryTransport {
    type Handle = MemoryCheckout;

    fn clone_with_checkout(
        &self,
        url: &str,
        dst: &Path,
        cancel: &Cancellation,
    ) -> Result<MemoryCheckout, TransportError> {
        self.clone_into(url, dst, true, cancel)
    }

    fn clone_without_checkout(
        &self,
        url: &str,
        dst: &Path,
        cancel: &Cancellation,
    ) -> Result<MemoryCheckout, TransportError> {
        self.clone_into(url, dst, false, cancel)
    }

    fn checkout_commit(
        &self,
        handle: &MemoryCheckout,
        commit_hash: &str,
        cancel: &Cancellation,
    ) -> Result<(), TransportError> {
        cancel.check()?;
        self.record(TransportCall::CheckoutCommit {
            dst: handle.path.clone(),
            commit_hash: commit_hash.to_owned(),
        });

        let repository = self.repository(&handle.url)?;
        let tree = repository
            .find(commit_hash)
            .ok_or_else(|| TransportError::CommitNotFound {
                commit_hash: commit_hash.to_owned(),
            })?;

        for entry in handle.path.read_dir()? {
            let path = entry?.path();
            if path.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
        }
        write_tree(&handle.path, tree)
    }
}

fn write_tree(root: &Path, tree: &FileTree) -> Result<(), TransportError> {
    for (path, content) in tree {
        let target = root.join(path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        trace!("Writing {}", target.display());
        std::fs::write(&target, content)?;
    }
    Ok(())
}
