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

//! Local cache of remote module repositories.

use crate::domain::config::{ClusterConfig, RemoteSource};
use crate::infrastructure::process;
use crate::shared::error::{Result, TranspireError};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// A checkout on disk and the commit it is at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCheckout {
    pub path: PathBuf,
    pub commit: String,
}

/// Keeps one working copy per repository URL under `root`.
///
/// Not synchronized: callers resolving the same repository concurrently hold a
/// [`RepoLocks`] guard around the resolution.
#[derive(Debug, Clone)]
pub struct RepoCache {
    root: PathBuf,
}

impl RepoCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &ClusterConfig) -> Self {
        Self::new(config.cache_dir().join("modules"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory name for a repository URL.
    ///
    /// The URL is normalized first (surrounding whitespace, trailing `/` and a
    /// trailing `.git` are dropped) and then every byte that is not an ASCII
    /// letter or digit is percent-encoded.
    pub fn cache_key(url: &str) -> String {
        let mut normalized = url.trim().trim_end_matches('/');
        normalized = normalized.strip_suffix(".git").unwrap_or(normalized);
        utf8_percent_encode(normalized, NON_ALPHANUMERIC).to_string()
    }

    pub fn checkout_dir(&self, url: &str) -> PathBuf {
        self.root.join(Self::cache_key(url))
    }

    /// Bring the cached checkout of `source` up to date and return it.
    ///
    /// A checkout that cannot be refreshed is treated as corrupt: it is
    /// removed and cloned again once. Only a failure of that clone is
    /// reported.
    #[tracing::instrument(skip(self, source), fields(repository = %source.git), err)]
    pub async fn resolve(
        &self,
        source: &RemoteSource,
        pinned: Option<&str>,
    ) -> Result<ResolvedCheckout> {
        let dir = self.checkout_dir(&source.git);

        if dir.join(".git").exists() {
            if let Err(e) = refresh(&dir, source.branch.as_deref(), pinned).await {
                warn!(
                    "Refreshing {} failed, re-cloning: {}",
                    dir.display(),
                    e
                );
                self.clone_fresh(&dir, source, pinned).await?;
            }
        } else {
            self.clone_fresh(&dir, source, pinned).await?;
        }

        let commit = git(&dir, ["rev-parse", "HEAD"])
            .await
            .map_err(|e| TranspireError::module_resolution(&source.git, e.to_string()))?
            .trim()
            .to_string();
        info!("Resolved {} at {}", source.git, commit);

        Ok(ResolvedCheckout { path: dir, commit })
    }

    async fn clone_fresh(
        &self,
        dir: &Path,
        source: &RemoteSource,
        pinned: Option<&str>,
    ) -> Result<()> {
        let resolution_error = |e: TranspireError| TranspireError::module_resolution(&source.git, e.to_string());

        if dir.exists() {
            tokio::fs::remove_dir_all(dir).await?;
        }
        tokio::fs::create_dir_all(&self.root).await?;

        let mut args = vec![
            "clone".to_string(),
            "--depth".to_string(),
            "1".to_string(),
            "--single-branch".to_string(),
        ];
        if let Some(branch) = &source.branch {
            args.extend(["--branch".to_string(), branch.clone()]);
        }
        args.push(source.git.clone());
        args.push(dir.to_string_lossy().into_owned());

        debug!("Cloning {} into {}", source.git, dir.display());
        process::run("git", &args, None, None)
            .await
            .map_err(resolution_error)?;

        if let Some(commit) = pinned {
            checkout_pinned(dir, commit).await.map_err(resolution_error)?;
            clean(dir).await.map_err(resolution_error)?;
        }
        Ok(())
    }
}

async fn git<I, S>(dir: &Path, args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    process::run("git", args, Some(dir), None).await
}

async fn refresh(dir: &Path, branch: Option<&str>, pinned: Option<&str>) -> Result<()> {
    match pinned {
        Some(commit) => checkout_pinned(dir, commit).await?,
        None => {
            git(dir, ["fetch", "--depth", "1", "origin", branch.unwrap_or("HEAD")]).await?;
            git(dir, ["reset", "--hard", "FETCH_HEAD"]).await?;
        }
    }
    clean(dir).await
}

/// Pinned commits need history; a shallow checkout is deepened once and later
/// refreshes fetch normally.
async fn checkout_pinned(dir: &Path, commit: &str) -> Result<()> {
    let shallow = git(dir, ["rev-parse", "--is-shallow-repository"]).await?;
    if shallow.trim() == "true" {
        git(dir, ["fetch", "--unshallow", "origin"]).await?;
    } else {
        git(dir, ["fetch", "origin"]).await?;
    }
    git(dir, ["reset", "--hard", commit]).await?;
    Ok(())
}

async fn clean(dir: &Path) -> Result<()> {
    git(dir, ["clean", "-ffdx"]).await?;
    Ok(())
}

/// Per-repository async locks.
#[derive(Debug, Default, Clone)]
pub struct RepoLocks {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl RepoLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of the checkout of `url`.
    pub async fn acquire(&self, url: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(RepoCache::cache_key(url))
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cache_key_normalization() {
        let a = RepoCache::cache_key("https://github.com/example/app.git");
        let b = RepoCache::cache_key("  https://github.com/example/app/ ");
        let c = RepoCache::cache_key("https://github.com/example/app");
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a, "https%3A%2F%2Fgithub%2Ecom%2Fexample%2Fapp");
        assert_ne!(a, RepoCache::cache_key("https://github.com/example/app2"));
    }

    #[test]
    fn test_cache_key_encodes_unreserved_punctuation() {
        assert_eq!(
            RepoCache::cache_key("git@host:my-org/app_v1.2~x"),
            "git%40host%3Amy%2Dorg%2Fapp%5Fv1%2E2%7Ex"
        );
    }

    #[test]
    fn test_checkout_dir_is_under_root() {
        let cache = RepoCache::new("/tmp/cache");
        let dir = cache.checkout_dir("https://github.com/example/app.git");
        assert_eq!(dir.parent(), Some(Path::new("/tmp/cache")));
    }

    #[tokio::test]
    async fn test_locks_serialize_same_repository() {
        let locks = RepoLocks::new();
        let guard = locks.acquire("https://github.com/example/app.git").await;

        let other = locks.clone();
        let same = tokio::time::timeout(
            Duration::from_millis(50),
            other.acquire("https://github.com/example/app"),
        )
        .await;
        assert!(same.is_err());

        let different = tokio::time::timeout(
            Duration::from_millis(50),
            other.acquire("https://github.com/example/other"),
        )
        .await;
        assert!(different.is_ok());

        drop(guard);
        let same = tokio::time::timeout(
            Duration::from_millis(50),
            other.acquire("https://github.com/example/app"),
        )
        .await;
        assert!(same.is_ok());
    }
}
