//! Framework detection tables and file policy, as data.
//!
//! # Module Structure
//! - `builtin`: the baked-in FiveM tables
//! - `policy`: blacklist/whitelist path matching
//!
//! A [`RuleSetSpec`] is the plain, serializable description of the tables.
//! [`RuleSet::compile`] turns it into the immutable form the classifier and
//! filter are constructed with, so tests and users can substitute their own
//! tables without touching global state.

pub mod builtin;
pub mod policy;

use crate::Result;
use crate::error::DbSetupError;
use crate::models::Framework;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use policy::{PathPolicy, PathPolicySpec, normalize_policy_path};

/// Keyword and pattern lists for one framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSpec {
    /// Framework the profile detects
    pub framework: Framework,
    /// Substrings matched against the lower-cased file name
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Regular expressions matched case-insensitively against file content
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Strong ESX signals evaluated before any other rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EsxOverrideSpec {
    /// Regular expressions that mark content as ESX on their own
    #[serde(default)]
    pub signals: Vec<String>,
    /// File names that are ESX when the content mentions "esx" anywhere
    #[serde(default)]
    pub file_names: Vec<String>,
    /// Substrings that mark a line as ESX
    #[serde(default)]
    pub line_markers: Vec<String>,
}

/// Serializable description of all classification and filtering rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSetSpec {
    /// Framework profiles in filename-keyword precedence order
    pub profiles: Vec<ProfileSpec>,
    /// ESX override data
    #[serde(default)]
    pub esx_override: EsxOverrideSpec,
    /// Blacklist and whitelist
    #[serde(default)]
    pub policy: PathPolicySpec,
    /// Characters inspected by the fallback content scan
    #[serde(default = "default_scan_chars")]
    pub fallback_scan_chars: usize,
}

const fn default_scan_chars() -> usize {
    builtin::FALLBACK_SCAN_CHARS
}

impl RuleSetSpec {
    /// The built-in FiveM tables.
    pub fn builtin() -> Self {
        builtin::spec()
    }

    /// Reads a JSON rule file.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be read, or a serialization
    /// error if it is not a valid rule description.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            DbSetupError::io(format!("Failed to read rule file {}", path.display()), e)
        })?;
        serde_json::from_str(&text).map_err(|e| DbSetupError::Serialization {
            context: format!("Invalid rule file {}", path.display()),
            source: e,
        })
    }

    /// Pretty-printed JSON form.
    ///
    /// # Errors
    /// Returns a serialization error if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| DbSetupError::Serialization {
            context: "Rule table serialization".to_string(),
            source: e,
        })
    }
}

/// Compiled keyword and pattern lists for one framework.
#[derive(Debug, Clone)]
pub struct FrameworkProfile {
    framework: Framework,
    keywords: Vec<String>,
    patterns: Vec<Regex>,
}

impl FrameworkProfile {
    fn compile(spec: &ProfileSpec) -> Result<Self> {
        if !spec.framework.is_concrete() {
            return Err(DbSetupError::rules(format!(
                "profile for '{}' is not allowed; only concrete frameworks have profiles",
                spec.framework
            )));
        }
        Ok(Self {
            framework: spec.framework,
            keywords: spec
                .keywords
                .iter()
                .map(|keyword| keyword.to_lowercase())
                .filter(|keyword| !keyword.is_empty())
                .collect(),
            patterns: compile_patterns(&spec.patterns)?,
        })
    }

    /// Framework this profile detects.
    pub const fn framework(&self) -> Framework {
        self.framework
    }

    /// Lower-cased filename keywords.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// True if the lower-cased file name contains any keyword.
    pub fn matches_name(&self, lower_name: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| lower_name.contains(keyword.as_str()))
    }

    /// True if any content pattern matches.
    pub fn matches_content(&self, content: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(content))
    }
}

/// Compiled ESX override data.
#[derive(Debug, Clone, Default)]
pub struct EsxOverride {
    signals: Vec<Regex>,
    file_names: Vec<String>,
    line_markers: Vec<String>,
}

impl EsxOverride {
    fn compile(spec: &EsxOverrideSpec) -> Result<Self> {
        Ok(Self {
            signals: compile_patterns(&spec.signals)?,
            file_names: spec.file_names.iter().map(|n| n.to_lowercase()).collect(),
            line_markers: spec
                .line_markers
                .iter()
                .map(|m| m.to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        })
    }

    /// True if any strong signal pattern matches the content.
    pub fn matches_signal(&self, content: &str) -> bool {
        self.signals.iter().any(|signal| signal.is_match(content))
    }

    /// True if the lower-cased name is a known ESX file and the content
    /// mentions esx.
    pub fn matches_named_file(&self, lower_name: &str, lower_content: &str) -> bool {
        self.file_names.iter().any(|name| name == lower_name) && lower_content.contains("esx")
    }

    /// True if any line of the lower-cased content contains a line marker.
    pub fn matches_line_marker(&self, lower_content: &str) -> bool {
        lower_content.lines().any(|line| {
            self.line_markers
                .iter()
                .any(|marker| line.contains(marker.as_str()))
        })
    }
}

/// Immutable, compiled rule tables.
#[derive(Debug, Clone)]
pub struct RuleSet {
    profiles: Vec<FrameworkProfile>,
    esx_override: EsxOverride,
    policy: PathPolicy,
    fallback_scan_chars: usize,
}

impl RuleSet {
    /// Compiles a rule description.
    ///
    /// # Errors
    /// Returns a rules error if a pattern is not a valid regular expression,
    /// a profile names `other`/`unknown`, or a framework has two profiles.
    pub fn compile(spec: &RuleSetSpec) -> Result<Self> {
        let mut profiles: Vec<FrameworkProfile> = Vec::with_capacity(spec.profiles.len());
        for profile_spec in &spec.profiles {
            if profiles
                .iter()
                .any(|existing| existing.framework == profile_spec.framework)
            {
                return Err(DbSetupError::rules(format!(
                    "duplicate profile for '{}'",
                    profile_spec.framework
                )));
            }
            profiles.push(FrameworkProfile::compile(profile_spec)?);
        }

        Ok(Self {
            profiles,
            esx_override: EsxOverride::compile(&spec.esx_override)?,
            policy: PathPolicy::from_spec(&spec.policy),
            fallback_scan_chars: spec.fallback_scan_chars,
        })
    }

    /// Compiles the built-in FiveM tables.
    ///
    /// # Errors
    /// Only fails if the built-in tables themselves are broken.
    pub fn builtin() -> Result<Self> {
        Self::compile(&RuleSetSpec::builtin())
    }

    /// Profiles in precedence order.
    pub fn profiles(&self) -> &[FrameworkProfile] {
        &self.profiles
    }

    /// Profile for `framework`, if one exists.
    pub fn profile(&self, framework: Framework) -> Option<&FrameworkProfile> {
        self.profiles.iter().find(|p| p.framework == framework)
    }

    /// Filename keywords of `framework` (empty for `other`/`unknown`).
    pub fn keywords(&self, framework: Framework) -> &[String] {
        match self.profile(framework) {
            Some(profile) => profile.keywords(),
            None => &[],
        }
    }

    /// ESX override data.
    pub const fn esx_override(&self) -> &EsxOverride {
        &self.esx_override
    }

    /// Blacklist and whitelist.
    pub const fn policy(&self) -> &PathPolicy {
        &self.policy
    }

    /// Characters inspected by the fallback content scan.
    pub const fn fallback_scan_chars(&self) -> usize {
        self.fallback_scan_chars
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| DbSetupError::rules(format!("invalid pattern '{}': {}", pattern, e)))
        })
        .collect()
}

/// Built-in rules, compiled once per test binary.
#[cfg(test)]
pub(crate) fn shared_builtin() -> std::sync::Arc<RuleSet> {
    use std::sync::{Arc, OnceLock};

    static RULES: OnceLock<Arc<RuleSet>> = OnceLock::new();
    Arc::clone(RULES.get_or_init(|| Arc::new(RuleSet::builtin().unwrap())))
}
