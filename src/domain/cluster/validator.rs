// Copyright 2025 JiangLong.
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

use crate::domain::config::ClusterSpec;
use crate::shared::error::{KubeError, Result};
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use tracing::warn;

const VERSION_PATTERN: &str = r"^\d+\.\d+(\.\d+)?$";

/// A non-fatal finding about a cluster specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintIssue {
    pub field: String,
    pub message: String,
}

impl LintIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for LintIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Advisory checks run before an apply.
///
/// Nothing here blocks a reconcile; the reconciler still passes these values
/// through to the provider, which has the final say.
pub struct ClusterSpecValidator {
    version: Regex,
}

impl ClusterSpecValidator {
    pub fn new() -> Result<Self> {
        let version = Regex::new(VERSION_PATTERN)
            .map_err(|e| KubeError::config_error(format!("Invalid version pattern: {}", e)))?;
        Ok(Self { version })
    }

    pub fn lint(&self, spec: &ClusterSpec) -> Vec<LintIssue> {
        let mut issues = Vec::new();

        for (field, value) in [
            ("name", &spec.name),
            ("resourceGroup", &spec.resource_group),
            ("location", &spec.location),
        ] {
            if value.trim().is_empty() {
                issues.push(LintIssue::new(field, "is empty"));
            }
        }

        if spec.ssh_public_key.trim().is_empty() {
            issues.push(LintIssue::new(
                "sshPublicKey",
                "is empty; the provider may reject the linux profile",
            ));
        }

        if spec.version.is_empty() {
            issues.push(LintIssue::new("version", "is empty"));
        } else if !self.version.is_match(&spec.version) {
            issues.push(LintIssue::new(
                "version",
                format!("'{}' does not look like a Kubernetes version", spec.version),
            ));
        }

        if spec.agent_pools.is_empty() {
            issues.push(LintIssue::new("agentPools", "no agent pools defined"));
        }

        let mut seen = HashSet::new();
        for pool in &spec.agent_pools {
            if !seen.insert(pool.name.as_str()) {
                issues.push(LintIssue::new(
                    format!("agentPools[{}]", pool.name),
                    "duplicate pool name",
                ));
            }
            if pool.replicas == 0 {
                issues.push(LintIssue::new(
                    format!("agentPools[{}].replicas", pool.name),
                    "pool has no nodes",
                ));
            }
        }

        issues
    }

    /// Lints and reports every issue as a warning. Returns the issue count.
    pub fn warn(&self, spec: &ClusterSpec) -> usize {
        let issues = self.lint(spec);
        for issue in &issues {
            warn!(cluster = %spec.name, field = %issue.field, "{}", issue.message);
        }
        issues.len()
    }
}
