mod common;

use common::Fixture;
use pretty_assertions::assert_eq;
use repofetch::{
    Cancellation, RemoteRevisionResolver, ResolveError, ResolvedRevision, RevisionResolver,
};

fn resolve(fixture: &Fixture, specifier: &str) -> Result<ResolvedRevision, ResolveError> {
    RemoteRevisionResolver::default().resolve(&fixture.url(), specifier, &Cancellation::new())
}

#[test]
fn list_references() {
    let fixture = Fixture::new();
    let references = RemoteRevisionResolver::default()
        .list_references(&fixture.url(), &Cancellation::new())
        .unwrap();

    assert_eq!(references.get("refs/heads/main"), Some(fixture.third));
    assert_eq!(references.get("refs/heads/feature"), Some(fixture.feature));
    assert_eq!(references.get("refs/tags/2.0.0"), Some(fixture.second));
    assert_eq!(
        references.get("refs/pull/7/head"),
        Some(fixture.pull_request)
    );
}

#[test]
fn resolve_default_branch() {
    let fixture = Fixture::new();
    assert_eq!(
        resolve(&fixture, "").unwrap(),
        ResolvedRevision::DefaultBranch
    );
}

#[test]
fn resolve_versions() {
    let fixture = Fixture::new();
    let first = ResolvedRevision::commit(fixture.first.to_string());
    let second = ResolvedRevision::commit(fixture.second.to_string());

    assert_eq!(resolve(&fixture, "v1.0.0").unwrap(), first);
    assert_eq!(resolve(&fixture, "1.0.0").unwrap(), first);
    assert_eq!(resolve(&fixture, "2.0.0").unwrap(), second);
    assert_eq!(resolve(&fixture, "v2.0.0").unwrap(), second);
}

#[test]
fn resolve_branches() {
    let fixture = Fixture::new();
    assert_eq!(
        resolve(&fixture, "feature").unwrap(),
        ResolvedRevision::commit(fixture.feature.to_string())
    );
    assert_eq!(
        resolve(&fixture, "main").unwrap(),
        ResolvedRevision::commit(fixture.third.to_string())
    );
}

#[test]
fn resolve_hex_looking_branch() {
    let fixture = Fixture::new();
    fixture.upstream.branch("CAFEBABE", fixture.first);

    assert_eq!(
        resolve(&fixture, "CAFEBABE").unwrap(),
        ResolvedRevision::commit(fixture.first.to_string())
    );
}

#[test]
fn resolve_pull_request() {
    let fixture = Fixture::new();
    assert_eq!(
        resolve(&fixture, "PR-7").unwrap(),
        ResolvedRevision::commit(fixture.pull_request.to_string())
    );
    assert!(matches!(
        resolve(&fixture, "pr-8"),
        Err(ResolveError::PullRequestNotFound { number: 8 })
    ));
}

#[test]
fn resolve_commits() {
    let fixture = Fixture::new();
    let full = fixture.first.to_string();

    assert_eq!(
        resolve(&fixture, &full).unwrap(),
        ResolvedRevision::commit(full.clone())
    );
    assert_eq!(
        resolve(&fixture, &full[..10]).unwrap(),
        ResolvedRevision::commit(full.clone())
    );
    assert_eq!(
        resolve(&fixture, &full.to_uppercase()).unwrap(),
        ResolvedRevision::commit(full)
    );
}

#[test]
fn resolve_missing_reference() {
    let fixture = Fixture::new();
    assert!(matches!(
        resolve(&fixture, "does-not-exist"),
        Err(ResolveError::ReferenceNotFound { .. })
    ));
}

#[test]
fn resolve_cancelled() {
    let fixture = Fixture::new();
    let cancel = Cancellation::new();
    cancel.cancel();

    let result = RemoteRevisionResolver::default().resolve(&fixture.url(), "main", &cancel);

    assert!(matches!(result, Err(ResolveError::Cancelled(_))));
}

#[test]
fn resolve_unreachable_remote() {
    let dir = tempfile::TempDir::new().unwrap();
    let url = dir.path().join("missing").to_str().unwrap().to_owned();

    let error = RemoteRevisionResolver::default()
        .resolve(&url, "main", &Cancellation::new())
        .unwrap_err();

    assert!(matches!(error, ResolveError::Other(_)), "{error:?}");
    assert!(error.to_string().starts_with("Could not connect to"));
}
