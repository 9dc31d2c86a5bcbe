//! Capability policy: what a host is willing to let a program do.
//!
//! A [`Policy`] is resolved once per run, before the first statement
//! executes. A capability is granted iff it appears in `allow` and does not
//! appear in `deny`; `deny` always wins. Enforcement walks every capability
//! a program declared with `cap ... = true` and fails the whole run with
//! `E_CAP_DENIED` if any of them isn't granted — a program never gets to
//! start executing with a capability it thinks it has but doesn't.

use a0_diagnostics::{Diagnostic, ErrorCode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
}

fn default_version() -> u32 {
    1
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            version: default_version(),
            allow: Vec::new(),
            deny: Vec::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("invalid policy document: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl Policy {
    /// A policy that grants nothing. The default when a host runs a program
    /// without supplying `--policy`.
    pub fn empty() -> Self {
        Policy::default()
    }

    /// A policy that grants every capability a program might declare. Used
    /// by test fixtures and by a host's explicit `--allow-all` override.
    pub fn allow_all(caps: &[&str]) -> Self {
        Policy {
            version: default_version(),
            allow: caps.iter().map(|s| s.to_string()).collect(),
            deny: Vec::new(),
        }
    }

    pub fn from_json(s: &str) -> Result<Self, PolicyError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn is_granted(&self, cap: &str) -> bool {
        self.allow.iter().any(|a| a == cap) && !self.deny.iter().any(|d| d == cap)
    }

    /// Checks every declared capability against this policy. Returns one
    /// `E_CAP_DENIED` diagnostic per capability the program needs but the
    /// policy doesn't grant; an empty result means the run may proceed.
    pub fn enforce(&self, declared_caps: &HashSet<String>) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        let mut caps: Vec<&String> = declared_caps.iter().collect();
        caps.sort();
        for cap in caps {
            if !self.is_granted(cap) {
                diags.push(Diagnostic::error(
                    ErrorCode::ECapDenied,
                    format!("capability `{cap}` was declared but is not granted by policy"),
                    None,
                ));
            }
        }
        diags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_policy_denies_everything() {
        let policy = Policy::empty();
        assert!(!policy.is_granted("fs.read"));
    }

    #[test]
    fn deny_wins_over_allow() {
        let policy = Policy {
            version: 1,
            allow: vec!["fs.read".to_string()],
            deny: vec!["fs.read".to_string()],
        };
        assert!(!policy.is_granted("fs.read"));
    }

    #[test]
    fn enforce_reports_every_ungranted_capability() {
        let policy = Policy {
            version: 1,
            allow: vec!["fs.read".to_string()],
            deny: vec![],
        };
        let mut declared = HashSet::new();
        declared.insert("fs.read".to_string());
        declared.insert("sh.exec".to_string());
        let diags = policy.enforce(&declared);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, ErrorCode::ECapDenied);
        assert!(diags[0].message.contains("sh.exec"));
    }

    #[test]
    fn parses_from_json() {
        let policy = Policy::from_json(r#"{"allow": ["fs.read"], "deny": []}"#).unwrap();
        assert!(policy.is_granted("fs.read"));
    }

    #[test]
    fn allow_all_grants_every_listed_capability() {
        let policy = Policy::allow_all(&["fs.read", "fs.write"]);
        assert!(policy.is_granted("fs.read"));
        assert!(policy.is_granted("fs.write"));
        assert!(!policy.is_granted("sh.exec"));
    }
}
