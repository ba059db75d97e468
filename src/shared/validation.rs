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

use regex::Regex;
use std::sync::OnceLock;

fn dns_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").expect("DNS label regex is valid")
    })
}

/// RFC 1123 label, the format Kubernetes requires for namespaces and most names.
pub fn is_valid_dns_name(name: &str) -> bool {
    dns_label_regex().is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_dns_names() {
        assert!(is_valid_dns_name("echoserver"));
        assert!(is_valid_dns_name("a"));
        assert!(is_valid_dns_name("kube-prometheus-2"));
    }

    #[test]
    fn test_invalid_dns_names() {
        assert!(!is_valid_dns_name(""));
        assert!(!is_valid_dns_name("Echo"));
        assert!(!is_valid_dns_name("-leading"));
        assert!(!is_valid_dns_name("trailing-"));
        assert!(!is_valid_dns_name("under_score"));
        assert!(!is_valid_dns_name(&"a".repeat(64)));
    }
}
