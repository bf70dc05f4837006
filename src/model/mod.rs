use std::num::ParseIntError;
use thiserror::Error;

mod revision;
mod source;

pub use revision::{ResolvedRevision, RevisionSpecifier};
pub use source::RepositorySource;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Repository url is empty")]
    EmptyUrl,
    #[error("Invalid pull request number in `{0}`: {1}")]
    PullRequestNumber(String, ParseIntError),
}
