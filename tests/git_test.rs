// Copyright 2025 Transpire Team.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Module checkouts against a local upstream repository.
//!
//! Every test returns early when `git` is not on PATH.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;
use transpire::*;

fn has_git() -> bool {
    which::which("git").is_ok()
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=Transpire Test",
            "-c",
            "user.email=test@example.org",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

/// A non-bare upstream repository on branch `main`.
struct Upstream {
    dir: TempDir,
}

impl Upstream {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        git(dir.path(), &["init", "-q", "-b", "main"]);
        Self { dir }
    }

    fn url(&self) -> String {
        format!("file://{}", self.dir.path().display())
    }

    fn commit(&self, path: &str, content: &str) -> String {
        let file = self.dir.path().join(path);
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, content).unwrap();
        git(self.dir.path(), &["add", "-A"]);
        git(self.dir.path(), &["commit", "-q", "-m", path]);
        git(self.dir.path(), &["rev-parse", "HEAD"])
    }

    fn source(&self) -> RemoteSource {
        RemoteSource {
            branch: Some("main".to_string()),
            ..RemoteSource::new(self.url())
        }
    }
}

fn cache() -> (TempDir, RepoCache) {
    let dir = TempDir::new().unwrap();
    let cache = RepoCache::new(dir.path().join("modules"));
    (dir, cache)
}

fn read(dir: &Path, file: &str) -> String {
    fs::read_to_string(dir.join(file)).unwrap()
}

#[tokio::test]
async fn test_clone_and_refresh() {
    if !has_git() {
        return;
    }
    let upstream = Upstream::new();
    let first = upstream.commit("README", "one");
    let (_dir, cache) = cache();
    let source = upstream.source();

    let checkout = cache.resolve(&source, None).await.unwrap();
    assert_eq!(checkout.commit, first);
    assert_eq!(checkout.path, cache.checkout_dir(&source.git));
    assert_eq!(read(&checkout.path, "README"), "one");

    // Resolving again without upstream changes is stable.
    let again = cache.resolve(&source, None).await.unwrap();
    assert_eq!(again.commit, first);

    // Local edits and untracked files are discarded on refresh.
    fs::write(checkout.path.join("README"), "local edit").unwrap();
    fs::write(checkout.path.join("untracked"), "junk").unwrap();
    let second = upstream.commit("README", "two");

    let refreshed = cache.resolve(&source, None).await.unwrap();
    assert_eq!(refreshed.commit, second);
    assert_eq!(read(&refreshed.path, "README"), "two");
    assert!(!refreshed.path.join("untracked").exists());
}

#[tokio::test]
async fn test_broken_checkout_is_recloned() {
    if !has_git() {
        return;
    }
    let upstream = Upstream::new();
    let commit = upstream.commit("README", "one");
    let (_dir, cache) = cache();
    let source = upstream.source();

    let checkout = cache.resolve(&source, None).await.unwrap();
    git(
        &checkout.path,
        &["remote", "set-url", "origin", "file:///nonexistent/transpire"],
    );

    let recovered = cache.resolve(&source, None).await.unwrap();
    assert_eq!(recovered.commit, commit);
    assert_eq!(
        git(&recovered.path, &["remote", "get-url", "origin"]),
        upstream.url()
    );
}

#[tokio::test]
async fn test_pinned_commit() {
    if !has_git() {
        return;
    }
    let upstream = Upstream::new();
    let pinned = upstream.commit("README", "one");
    let latest = upstream.commit("README", "two");
    let (_dir, cache) = cache();
    let source = upstream.source();

    // Pinned on first clone.
    let checkout = cache.resolve(&source, Some(&pinned)).await.unwrap();
    assert_eq!(checkout.commit, pinned);
    assert_eq!(read(&checkout.path, "README"), "one");

    // And back to the branch head, then pinned again on an existing checkout.
    let head = cache.resolve(&source, None).await.unwrap();
    assert_eq!(head.commit, latest);
    let again = cache.resolve(&source, Some(&pinned)).await.unwrap();
    assert_eq!(again.commit, pinned);
}

#[tokio::test]
async fn test_unreachable_repository() {
    if !has_git() {
        return;
    }
    let (dir, cache) = cache();
    let missing = format!("file://{}", dir.path().join("nope").display());
    let source = RemoteSource::new(missing.clone());

    match cache.resolve(&source, None).await {
        Err(TranspireError::ModuleResolution { repository, .. }) => {
            assert_eq!(repository, missing);
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_build_git_module() {
    if !has_git() {
        return;
    }
    let upstream = Upstream::new();
    let commit = upstream.commit(
        "deploy/.transpire.yaml",
        r#"
name: remote-app
namespace: remote
images:
  - { name: web, path: web }
objects:
  - deployment: { name: web, moduleImage: web, ports: [8080] }
"#,
    );

    let root = TempDir::new().unwrap();
    let config = ClusterConfig::from_toml_str(
        &format!(
            r#"
cache_dir = "{cache}"

[secrets]
provider = "vault"

[secrets.vault]
kvstore = "kvv2"

[defaults]
registry = "harbor.example.org/apps"

[argocd]
repo_url = "https://github.com/example/cluster.git"

[modules.remote-app]
git = "{url}"
branch = "main"
dir = "deploy"
"#,
            cache = root.path().join("cache").display(),
            url = upstream.url(),
        ),
        root.path(),
    )
    .unwrap();
    let builder = ClusterBuilder::new(Arc::new(config));

    let module = builder.load_module("remote-app", None).await.unwrap();
    assert_eq!(module.revision(), Some(commit.as_str()));
    assert_eq!(module.namespace(), "remote");

    let images = transpire::infrastructure::ci::image_builds(&module).await.unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(
        images[0].tags,
        vec![
            "harbor.example.org/apps/remote-app/web:latest".to_string(),
            format!("harbor.example.org/apps/remote-app/web:{}", commit),
        ]
    );

    let out: PathBuf = root.path().join("out");
    let writer = ManifestWriter::new(
        &out,
        Postprocessor::new(SecretsProvider::from_config(builder.config()).unwrap(), false),
    );
    let report = builder.build(&writer, None).await.unwrap();
    assert!(report.is_success());

    let deployment =
        fs::read_to_string(out.join("remote-app/web_Deployment_remote.yaml")).unwrap();
    assert!(deployment.contains(&format!("remote-app/web:{}", commit)));
}
