#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use git2::{IndexAddOption, Oid, Repository, RepositoryInitOptions, Signature};
use tempfile::TempDir;

pub type Tree = BTreeMap<PathBuf, Vec<u8>>;

/// A local repository acting as the remote.
pub struct Upstream {
    dir: TempDir,
    repo: Repository,
}

impl Upstream {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let mut options = RepositoryInitOptions::new();
        options.initial_head("main");
        let repo = Repository::init_opts(dir.path(), &options).unwrap();
        Upstream { dir, repo }
    }

    pub fn url(&self) -> String {
        self.dir.path().to_str().unwrap().to_owned()
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    pub fn write(&self, path: &str, content: &str) {
        let path = self.dir.path().join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn remove(&self, path: &str) {
        fs::remove_file(self.dir.path().join(path)).unwrap();
    }

    /// Commits the working tree on top of HEAD and advances the current branch.
    pub fn commit_all(&self, message: &str) -> Oid {
        self.commit_to(Some("HEAD"), message)
    }

    /// Commits the working tree on top of HEAD without moving any branch,
    /// e.g. for a pull request head.
    pub fn commit_detached(&self, message: &str) -> Oid {
        self.commit_to(None, message)
    }

    fn commit_to(&self, update_ref: Option<&str>, message: &str) -> Oid {
        let mut index = self.repo.index().unwrap();
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .unwrap();
        index
            .update_all(["*"].iter(), None)
            .unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = self.repo.find_tree(tree_id).unwrap();

        let sig = Signature::now("repofetch", "repofetch@example.com").unwrap();
        let parents = match self.repo.head() {
            Ok(head) => vec![self.repo.find_commit(head.target().unwrap()).unwrap()],
            Err(_) => vec![],
        };
        let parents = parents.iter().collect::<Vec<_>>();
        self.repo
            .commit(update_ref, &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    pub fn tag_lightweight(&self, name: &str, commit: Oid) {
        let object = self.repo.find_object(commit, None).unwrap();
        self.repo.tag_lightweight(name, &object, false).unwrap();
    }

    pub fn tag_annotated(&self, name: &str, commit: Oid) {
        let object = self.repo.find_object(commit, None).unwrap();
        let sig = Signature::now("repofetch", "repofetch@example.com").unwrap();
        self.repo.tag(name, &object, &sig, name, false).unwrap();
    }

    pub fn branch(&self, name: &str, commit: Oid) {
        let commit = self.repo.find_commit(commit).unwrap();
        self.repo.branch(name, &commit, false).unwrap();
    }

    pub fn reference(&self, name: &str, commit: Oid) {
        self.repo.reference(name, commit, false, "test").unwrap();
    }

    /// Files of `commit`, as a checkout would lay them out.
    pub fn tree_of(&self, commit: Oid) -> Tree {
        let tree = self.repo.find_commit(commit).unwrap().tree().unwrap();
        let mut files = Tree::new();
        tree.walk(git2::TreeWalkMode::PreOrder, |root, entry| {
            if let Some(git2::ObjectType::Blob) = entry.kind() {
                let blob = self.repo.find_blob(entry.id()).unwrap();
                let path = PathBuf::from(root).join(entry.name().unwrap());
                files.insert(path, blob.content().to_vec());
            }
            git2::TreeWalkResult::Ok
        })
        .unwrap();
        files
    }
}

/// Files of a working tree, `.git` excluded.
pub fn read_tree(root: &Path) -> Tree {
    fn walk(root: &Path, dir: &Path, files: &mut Tree) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.file_name().is_some_and(|name| name == ".git") {
                continue;
            }
            if path.is_dir() {
                walk(root, &path, files);
            } else {
                let relative = path.strip_prefix(root).unwrap().to_path_buf();
                files.insert(relative, fs::read(&path).unwrap());
            }
        }
    }
    let mut files = Tree::new();
    walk(root, root, &mut files);
    files
}

pub fn head_commit(path: &Path) -> Oid {
    Repository::open(path)
        .unwrap()
        .head()
        .unwrap()
        .target()
        .unwrap()
}

/// Upstream with history:
///
/// ```text
/// first (v1.0.0) - second (2.0.0, annotated) - third (main)
///          \ feature       \ refs/pull/7/head (not on any branch)
/// ```
pub struct Fixture {
    pub upstream: Upstream,
    pub first: Oid,
    pub second: Oid,
    pub third: Oid,
    pub feature: Oid,
    pub pull_request: Oid,
}

impl Fixture {
    pub fn new() -> Self {
        let upstream = Upstream::new();

        upstream.write("README.md", "first");
        upstream.write("src/lib.rs", "pub fn one() {}");
        let first = upstream.commit_all("first");
        upstream.tag_lightweight("v1.0.0", first);

        upstream.write("README.md", "second");
        upstream.write("docs/guide.md", "guide");
        let second = upstream.commit_all("second");
        upstream.tag_annotated("2.0.0", second);

        upstream.write("src/pr.rs", "pub fn pr() {}");
        let pull_request = upstream.commit_detached("pull request");
        upstream.reference("refs/pull/7/head", pull_request);
        upstream.remove("src/pr.rs");

        upstream.write("README.md", "third");
        upstream.remove("docs/guide.md");
        let third = upstream.commit_all("third");

        // feature branches off the first commit without touching the checkout
        let feature = {
            let repo = upstream.repo();
            let sig = Signature::now("repofetch", "repofetch@example.com").unwrap();
            let base = repo.find_commit(first).unwrap();
            let base_tree = base.tree().unwrap();
            let mut builder = repo.treebuilder(Some(&base_tree)).unwrap();
            let blob = repo.blob(b"feature").unwrap();
            builder.insert("FEATURE.md", blob, 0o100644).unwrap();
            let tree = repo.find_tree(builder.write().unwrap()).unwrap();
            let feature = repo
                .commit(None, &sig, &sig, "feature", &tree, &[&base])
                .unwrap();
            feature
        };
        upstream.branch("feature", feature);

        Fixture {
            upstream,
            first,
            second,
            third,
            feature,
            pull_request,
        }
    }

    pub fn url(&self) -> String {
        self.upstream.url()
    }
}
