//! Static allow/deny lists for specific SQL files.
//!
//! Entries are relative paths such as `ox_doorlock/sql/default.sql`. A file
//! matches an entry when its normalized relative path equals the entry or ends
//! with it on a path-component boundary, so the lists work regardless of how
//! deep the resource sits below the scan root or which separator the platform
//! uses.

use serde::{Deserialize, Serialize};

/// Serializable form of the allow/deny lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathPolicySpec {
    /// Files that are never executed
    #[serde(default)]
    pub blacklist: Vec<String>,
    /// Files that are executed even when classification would drop them
    #[serde(default)]
    pub whitelist: Vec<String>,
}

/// Normalized allow/deny lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathPolicy {
    blacklist: Vec<String>,
    whitelist: Vec<String>,
}

impl PathPolicy {
    /// Normalizes every entry of `spec`. Empty entries are dropped.
    pub fn from_spec(spec: &PathPolicySpec) -> Self {
        let normalize_all = |entries: &[String]| {
            entries
                .iter()
                .map(|entry| normalize_policy_path(entry))
                .filter(|entry| !entry.is_empty())
                .collect()
        };
        Self {
            blacklist: normalize_all(&spec.blacklist),
            whitelist: normalize_all(&spec.whitelist),
        }
    }

    /// True if `relative_path` is on the blacklist.
    pub fn is_blacklisted(&self, relative_path: &str) -> bool {
        let path = normalize_policy_path(relative_path);
        self.blacklist.iter().any(|entry| path_matches(&path, entry))
    }

    /// True if `relative_path` is on the whitelist.
    pub fn is_whitelisted(&self, relative_path: &str) -> bool {
        let path = normalize_policy_path(relative_path);
        self.whitelist.iter().any(|entry| path_matches(&path, entry))
    }

    /// Normalized blacklist entries.
    pub fn blacklist(&self) -> &[String] {
        &self.blacklist
    }

    /// Normalized whitelist entries.
    pub fn whitelist(&self) -> &[String] {
        &self.whitelist
    }
}

/// Lower-cases a path, converts separators to `/` and drops empty and `.`
/// components.
pub fn normalize_policy_path(path: &str) -> String {
    path.replace('\\', "/")
        .to_lowercase()
        .split('/')
        .filter(|component| !component.is_empty() && *component != ".")
        .collect::<Vec<_>>()
        .join("/")
}

fn path_matches(path: &str, entry: &str) -> bool {
    path == entry
        || path
            .strip_suffix(entry)
            .is_some_and(|prefix| prefix.ends_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> PathPolicy {
        PathPolicy::from_spec(&PathPolicySpec {
            blacklist: vec!["ox_doorlock/sql/default.sql".to_string()],
            whitelist: vec!["ox_doorlock\\sql\\ox_doorlock.sql".to_string()],
        })
    }

    #[test]
    fn test_normalize_policy_path() {
        assert_eq!(
            normalize_policy_path(".\\Resources\\[ox]\\OX_DOORLOCK\\sql\\Default.SQL"),
            "resources/[ox]/ox_doorlock/sql/default.sql"
        );
        assert_eq!(normalize_policy_path("/a//b/./c.sql"), "a/b/c.sql");
    }

    #[test]
    fn test_blacklist_matches_nested_resource() {
        let policy = policy();
        assert!(policy.is_blacklisted("ox_doorlock/sql/default.sql"));
        assert!(policy.is_blacklisted("resources/[ox]/ox_doorlock/sql/default.sql"));
        assert!(policy.is_blacklisted("resources\\[ox]\\OX_DOORLOCK\\sql\\default.sql"));
    }

    #[test]
    fn test_suffix_requires_component_boundary() {
        let policy = policy();
        assert!(!policy.is_blacklisted("my_ox_doorlock/sql/default.sql"));
        assert!(!policy.is_blacklisted("ox_doorlock/sql/default.sql.bak"));
    }

    #[test]
    fn test_whitelist_normalized() {
        let policy = policy();
        assert_eq!(policy.whitelist(), ["ox_doorlock/sql/ox_doorlock.sql"]);
        assert!(policy.is_whitelisted("resources/ox_doorlock/sql/ox_doorlock.sql"));
        assert!(!policy.is_whitelisted("resources/ox_doorlock/sql/default.sql"));
    }
}
