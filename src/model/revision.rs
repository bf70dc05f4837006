use std::{
    fmt::{Display, Write},
    sync::OnceLock,
};

use regex_lite::Regex;

use super::ParseError;

/// A caller supplied revision, classified by its lexical form.
///
/// Classification never contacts the remote: a resolver decides what the
/// specifier actually points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionSpecifier {
    /// Empty specifier, the tip of the default branch.
    DefaultBranch,
    /// `PR-<number>`.
    PullRequest(u64),
    /// A full 40 digit commit hash, lowercased.
    Commit(String),
    /// 7 to 39 hex digits, as written. May also be a reference name, see
    /// [`RevisionSpecifier::commit_prefix`] for the hash form.
    AbbreviatedCommit(String),
    /// A release tag such as `1.4.1` or `v1.4.1`.
    Version(String),
    /// Any other branch or tag name.
    Name(String),
}

fn pull_request_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?i)pr-(?P<number>[0-9]+)$").expect("valid regex"))
}

fn commit_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-fA-F]{40}$").expect("valid regex"))
}

fn abbreviated_commit_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-fA-F]{7,39}$").expect("valid regex"))
}

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^v?[0-9]+(\.[0-9]+){1,2}([-+][0-9A-Za-z.+-]+)?$").expect("valid regex")
    })
}

impl RevisionSpecifier {
    pub fn parse(specifier: &str) -> Result<RevisionSpecifier, ParseError> {
        let specifier = specifier.trim();

        if specifier.is_empty() {
            return Ok(RevisionSpecifier::DefaultBranch);
        }

        if let Some(number) = pull_request_regex()
            .captures(specifier)
            .and_then(|c| c.name("number"))
        {
            let number = number
                .as_str()
                .parse::<u64>()
                .map_err(|e| ParseError::PullRequestNumber(specifier.to_owned(), e))?;
            return Ok(RevisionSpecifier::PullRequest(number));
        }

        if commit_regex().is_match(specifier) {
            return Ok(RevisionSpecifier::Commit(specifier.to_ascii_lowercase()));
        }

        if abbreviated_commit_regex().is_match(specifier) {
            return Ok(RevisionSpecifier::AbbreviatedCommit(specifier.to_owned()));
        }

        if version_regex().is_match(specifier) {
            return Ok(RevisionSpecifier::Version(specifier.to_owned()));
        }

        Ok(RevisionSpecifier::Name(specifier.to_owned()))
    }

    /// Lowercased hash prefix of an abbreviated commit.
    pub fn commit_prefix(&self) -> Option<String> {
        match self {
            RevisionSpecifier::AbbreviatedCommit(value) => Some(value.to_ascii_lowercase()),
            _ => None,
        }
    }

    /// Reference names (without the `refs/...` prefix) this specifier may
    /// refer to, in lookup order.
    pub fn reference_names(&self) -> Vec<String> {
        match self {
            RevisionSpecifier::Version(version) => match version.strip_prefix('v') {
                Some(bare) => vec![version.clone(), bare.to_owned()],
                None => vec![version.clone(), format!("v{version}")],
            },
            RevisionSpecifier::Name(name) => vec![name.clone()],
            RevisionSpecifier::AbbreviatedCommit(prefix) => vec![prefix.clone()],
            RevisionSpecifier::DefaultBranch
            | RevisionSpecifier::PullRequest(_)
            | RevisionSpecifier::Commit(_) => Vec::new(),
        }
    }
}

impl Display for RevisionSpecifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RevisionSpecifier::DefaultBranch => f.write_char('*'),
            RevisionSpecifier::PullRequest(number) => write!(f, "PR-{number}"),
            RevisionSpecifier::Commit(value)
            | RevisionSpecifier::AbbreviatedCommit(value)
            | RevisionSpecifier::Version(value)
            | RevisionSpecifier::Name(value) => f.write_str(value),
        }
    }
}

/// Outcome of revision resolution.
///
/// `DefaultBranch` is the empty sentinel: the clone's own checkout is
/// accepted as is and no explicit checkout follows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ResolvedRevision {
    #[default]
    DefaultBranch,
    Commit(String),
}

impl ResolvedRevision {
    pub fn commit(hash: impl Into<String>) -> ResolvedRevision {
        ResolvedRevision::Commit(hash.into())
    }

    pub fn is_default_branch(&self) -> bool {
        self == &Self::DefaultBranch
    }

    pub fn commit_hash(&self) -> Option<&str> {
        match self {
            ResolvedRevision::DefaultBranch => None,
            ResolvedRevision::Commit(hash) => Some(hash),
        }
    }

    /// Wire form: the empty string for the default branch, the hash otherwise.
    pub fn as_str(&self) -> &str {
        self.commit_hash().unwrap_or("")
    }
}

impl From<&str> for ResolvedRevision {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            ResolvedRevision::DefaultBranch
        } else {
            ResolvedRevision::Commit(value.to_owned())
        }
    }
}

impl From<String> for ResolvedRevision {
    fn from(value: String) -> Self {
        if value.is_empty() {
            ResolvedRevision::DefaultBranch
        } else {
            ResolvedRevision::Commit(value)
        }
    }
}

impl Display for ResolvedRevision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolvedRevision::DefaultBranch => f.write_str("HEAD"),
            ResolvedRevision::Commit(hash) => f.write_str(hash),
        }
    }
}
