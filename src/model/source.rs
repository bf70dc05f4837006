use std::fmt::Display;

use super::ParseError;

/// Remote location of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositorySource {
    url: String,
}

impl RepositorySource {
    pub fn new(url: impl Into<String>) -> Result<RepositorySource, ParseError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(ParseError::EmptyUrl);
        }
        Ok(RepositorySource { url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Directory name for a checkout of this repository: the last path
    /// segment of the url without a `.git` suffix.
    pub fn name(&self) -> &str {
        let trimmed = self.url.trim_end_matches('/');
        let last = trimmed
            .rsplit(['/', ':'])
            .next()
            .filter(|segment| !segment.is_empty())
            .unwrap_or(trimmed);
        last.strip_suffix(".git").unwrap_or(last)
    }
}

impl Display for RepositorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}
