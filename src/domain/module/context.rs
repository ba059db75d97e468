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

//! Dynamically scoped build context.
//!
//! Code running underneath [`with_context`] can ask which module it is being
//! built for and read the cluster configuration without threading either
//! through every call. The context is task-local, so concurrent evaluations
//! never observe each other and a nested scope restores the outer value when
//! it exits.

use crate::domain::config::ClusterConfig;
use crate::shared::error::{Result, TranspireError};
use std::future::Future;
use std::sync::Arc;

/// Identity of the module currently being evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: String,
    pub namespace: String,
    pub revision: Option<String>,
}

impl ModuleInfo {
    pub fn new(name: impl Into<String>, namespace: Option<String>) -> Self {
        let name = name.into();
        let namespace = namespace.unwrap_or_else(|| name.clone());
        Self {
            name,
            namespace,
            revision: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildContext {
    pub module: Arc<ModuleInfo>,
    pub config: Arc<ClusterConfig>,
}

tokio::task_local! {
    static BUILD_CONTEXT: BuildContext;
}

/// Run `fut` with `module` and `config` bound as the current build context.
pub async fn with_context<F>(module: Arc<ModuleInfo>, config: Arc<ClusterConfig>, fut: F) -> F::Output
where
    F: Future,
{
    BUILD_CONTEXT
        .scope(BuildContext { module, config }, fut)
        .await
}

/// Synchronous counterpart of [`with_context`].
pub fn with_context_sync<R>(
    module: Arc<ModuleInfo>,
    config: Arc<ClusterConfig>,
    f: impl FnOnce() -> R,
) -> R {
    BUILD_CONTEXT.sync_scope(BuildContext { module, config }, f)
}

pub fn current_context() -> Result<BuildContext> {
    BUILD_CONTEXT
        .try_with(Clone::clone)
        .map_err(|_| TranspireError::ContextUnavailable("build context"))
}

pub fn current_module() -> Result<Arc<ModuleInfo>> {
    BUILD_CONTEXT
        .try_with(|ctx| ctx.module.clone())
        .map_err(|_| TranspireError::ContextUnavailable("current module"))
}

pub fn global_config() -> Result<Arc<ClusterConfig>> {
    BUILD_CONTEXT
        .try_with(|ctx| ctx.config.clone())
        .map_err(|_| TranspireError::ContextUnavailable("cluster configuration"))
}

pub fn current_namespace() -> Result<String> {
    current_module().map(|module| module.namespace.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::cluster::tests::MINIMAL;

    fn config() -> Arc<ClusterConfig> {
        Arc::new(ClusterConfig::from_toml_str(MINIMAL, ".").unwrap())
    }

    fn module(name: &str) -> Arc<ModuleInfo> {
        Arc::new(ModuleInfo::new(name, None))
    }

    #[test]
    fn test_read_outside_scope_fails() {
        assert!(matches!(
            current_module(),
            Err(TranspireError::ContextUnavailable(_))
        ));
        assert!(global_config().is_err());
        assert!(current_namespace().is_err());
    }

    #[test]
    fn test_namespace_defaults_to_name() {
        let info = ModuleInfo::new("echo", None);
        assert_eq!(info.namespace, "echo");
        let info = ModuleInfo::new("echo", Some("web".to_string()));
        assert_eq!(info.namespace, "web");
    }

    #[tokio::test]
    async fn test_scope_binds_module() {
        let name = with_context(module("alpha"), config(), async {
            current_module().unwrap().name.clone()
        })
        .await;
        assert_eq!(name, "alpha");
        assert!(current_module().is_err());
    }

    #[tokio::test]
    async fn test_concurrent_scopes_are_isolated() {
        let cfg = config();
        let first = with_context(module("alpha"), cfg.clone(), async {
            tokio::task::yield_now().await;
            let seen = current_module().unwrap().name.clone();
            tokio::task::yield_now().await;
            seen
        });
        let second = with_context(module("beta"), cfg, async {
            tokio::task::yield_now().await;
            current_module().unwrap().name.clone()
        });
        let (a, b) = tokio::join!(first, second);
        assert_eq!(a, "alpha");
        assert_eq!(b, "beta");
    }

    #[tokio::test]
    async fn test_nested_scope_restores_outer() {
        let cfg = config();
        let (inner, outer) = with_context(module("outer"), cfg.clone(), async move {
            let inner = with_context(module("inner"), cfg, async {
                current_module().unwrap().name.clone()
            })
            .await;
            (inner, current_module().unwrap().name.clone())
        })
        .await;
        assert_eq!(inner, "inner");
        assert_eq!(outer, "outer");
    }

    #[test]
    fn test_sync_scope() {
        let ns = with_context_sync(
            Arc::new(ModuleInfo::new("echo", Some("web".into()))),
            config(),
            current_namespace,
        )
        .unwrap();
        assert_eq!(ns, "web");
    }
}
