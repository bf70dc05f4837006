use std::collections::{BTreeSet, HashMap};

use git2::{Direction, Oid, Remote};
use log::{debug, info};

use crate::{
    cancel::Cancellation,
    git::RemoteAccess,
    model::{ResolvedRevision, RevisionSpecifier},
};

use super::{ResolveError, RevisionResolver};

const PEELED_SUFFIX: &str = "^{}";

/// Resolves specifiers against the references a remote advertises, without
/// downloading any object.
#[derive(Debug, Clone, Default)]
pub struct RemoteRevisionResolver {
    access: RemoteAccess,
}

impl RemoteRevisionResolver {
    pub fn new(access: RemoteAccess) -> Self {
        RemoteRevisionResolver { access }
    }

    /// Lists the references advertised by `url`.
    pub fn list_references(
        &self,
        url: &str,
        cancel: &Cancellation,
    ) -> Result<RemoteReferences, ResolveError> {
        cancel.check()?;
        debug!("Listing references of {}", url);

        let mut remote = Remote::create_detached(url)?;
        let connection = remote
            .connect_auth(Direction::Fetch, Some(self.access.callbacks(cancel)), None)
            .map_err(|error| match cancel.check() {
                Err(cancelled) => ResolveError::Cancelled(cancelled),
                Ok(()) => anyhow::Error::new(error)
                    .context(format!("Could not connect to {url}"))
                    .into(),
            })?;
        let references = RemoteReferences::new(
            connection
                .list()?
                .iter()
                .map(|head| (head.name().to_owned(), head.oid())),
        );

        cancel.check()?;
        Ok(references)
    }
}

impl RevisionResolver for RemoteRevisionResolver {
    fn resolve(
        &self,
        url: &str,
        specifier: &str,
        cancel: &Cancellation,
    ) -> Result<ResolvedRevision, ResolveError> {
        let specifier = RevisionSpecifier::parse(specifier)?;
        let resolved = match &specifier {
            RevisionSpecifier::DefaultBranch => ResolvedRevision::DefaultBranch,
            RevisionSpecifier::Commit(hash) => {
                info!(
                    "Commit {} of {} is used as is, its existence is only checked at checkout",
                    hash, url
                );
                ResolvedRevision::commit(hash.clone())
            }
            _ => self
                .list_references(url, cancel)?
                .resolve(&specifier)?,
        };
        info!("Resolved {} of {} to {}", specifier, url, resolved);
        Ok(resolved)
    }
}

/// References advertised by a remote. Annotated tags resolve to the commit
/// they point to when the remote advertises the peeled value.
#[derive(Debug, Clone, Default)]
pub struct RemoteReferences {
    targets: HashMap<String, Oid>,
    peeled: HashMap<String, Oid>,
}

impl RemoteReferences {
    pub fn new(heads: impl IntoIterator<Item = (String, Oid)>) -> Self {
        let mut references = RemoteReferences::default();
        for (name, oid) in heads {
            match name.strip_suffix(PEELED_SUFFIX) {
                Some(base) => references.peeled.insert(base.to_owned(), oid),
                None => references.targets.insert(name, oid),
            };
        }
        references
    }

    /// Commit a fully qualified reference name points to.
    pub fn get(&self, name: &str) -> Option<Oid> {
        self.peeled
            .get(name)
            .or_else(|| self.targets.get(name))
            .copied()
    }

    pub fn resolve(&self, specifier: &RevisionSpecifier) -> Result<ResolvedRevision, ResolveError> {
        match specifier {
            RevisionSpecifier::DefaultBranch => Ok(ResolvedRevision::DefaultBranch),
            RevisionSpecifier::Commit(hash) => Ok(ResolvedRevision::commit(hash.clone())),
            RevisionSpecifier::PullRequest(number) => self
                .get(&format!("refs/pull/{number}/head"))
                .or_else(|| self.get(&format!("refs/merge-requests/{number}/head")))
                .map(|oid| ResolvedRevision::commit(oid.to_string()))
                .ok_or(ResolveError::PullRequestNotFound { number: *number }),
            RevisionSpecifier::AbbreviatedCommit(_) => match self.find_named(specifier) {
                Some(oid) => Ok(ResolvedRevision::commit(oid.to_string())),
                None => self.expand_prefix(&specifier.commit_prefix().unwrap_or_default()),
            },
            RevisionSpecifier::Version(_) | RevisionSpecifier::Name(_) => self
                .find_named(specifier)
                .map(|oid| ResolvedRevision::commit(oid.to_string()))
                .ok_or_else(|| ResolveError::ReferenceNotFound {
                    specifier: specifier.to_string(),
                }),
        }
    }

    fn find_named(&self, specifier: &RevisionSpecifier) -> Option<Oid> {
        let names = specifier.reference_names();
        ["refs/tags/", "refs/heads/"].iter().find_map(|namespace| {
            names
                .iter()
                .find_map(|name| self.get(&format!("{namespace}{name}")))
        })
    }

    fn expand_prefix(&self, prefix: &str) -> Result<ResolvedRevision, ResolveError> {
        let candidates: BTreeSet<String> = self
            .targets
            .values()
            .chain(self.peeled.values())
            .map(Oid::to_string)
            .filter(|hash| hash.starts_with(prefix))
            .collect();

        match candidates.len() {
            0 => {
                // Not a reference tip: full history is cloned, so the
                // checkout can still expand it locally.
                info!(
                    "Commit {} is not advertised by the remote, its existence is only checked at checkout",
                    prefix
                );
                Ok(ResolvedRevision::commit(prefix))
            }
            1 => Ok(ResolvedRevision::commit(
                candidates.into_iter().next().unwrap_or_default(),
            )),
            _ => Err(ResolveError::AmbiguousCommit {
                prefix: prefix.to_owned(),
                candidates: candidates.into_iter().collect(),
            }),
        }
    }
}
