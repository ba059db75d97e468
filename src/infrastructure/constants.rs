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

/// Module file and output layout
pub const BASE_DIR: &str = "base";
pub const MANIFEST_EXTENSION: &str = "yaml";

/// Resource labels
pub const LABEL_DEPLOYMENT_SELECTOR: &str = "transpire.ocf.io/deployment";
pub const LABEL_PART_OF: &str = "app.kubernetes.io/part-of";
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "transpire";

/// Container defaults
pub const CONTAINER_NAME_MAIN: &str = "main";
pub const IMAGE_PULL_POLICY_IF_NOT_PRESENT: &str = "IfNotPresent";
pub const DEFAULT_IMAGE_TAG: &str = "latest";

/// Ingress annotations
pub const ANNOTATION_CLUSTER_ISSUER: &str = "cert-manager.io/cluster-issuer";
pub const ANNOTATION_FORCE_SSL_REDIRECT: &str = "ingress.kubernetes.io/force-ssl-redirect";
pub const PATH_TYPE_PREFIX: &str = "Prefix";

/// ArgoCD
pub const ARGOPROJ_API_VERSION: &str = "argoproj.io/v1alpha1";
pub const ARGOCD_APPLICATION_KIND: &str = "Application";
pub const ARGOCD_DESTINATION_SERVER: &str = "https://kubernetes.default.svc";

/// CI workflow images
pub const GIT_IMAGE: &str = "alpine/git:latest";
pub const BUILDKIT_IMAGE: &str = "moby/buildkit:latest";
pub const CI_WORKSPACE: &str = "/workspace";
pub const CI_SERVICE_ACCOUNT: &str = "transpire-ci";
