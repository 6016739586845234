//! Selection of the SQL files to execute for a target framework.
//!
//! Every discovered file gets a [`PlannedFile`] verdict. The execution set is
//! the included files in discovery order followed by whitelisted files that
//! the classification rules dropped. The blacklist always wins, including
//! over the whitelist and for every target. Target [`Framework::Other`]
//! includes every other file without classifying anything.

use crate::classifier::Classifier;
use crate::models::{Framework, SqlFile};
use crate::rules::RuleSet;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Why a file was included in or excluded from the execution set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// Target is `other`; everything not blacklisted runs
    RunAll,
    /// Classified as ESX while the target is not ESX
    ForeignEsx,
    /// Classified as a different concrete framework
    ForeignClassification,
    /// File name carries another framework's keyword
    ForeignKeyword,
    /// File name carries a target keyword
    TargetKeyword,
    /// File name carries no framework keyword at all
    Generic,
    /// Classified as the target framework
    Matched,
    /// Classification found nothing; included on the benefit of the doubt
    Unclassified,
    /// No inclusion rule applied
    NoMatch,
    /// On the static blacklist
    Blacklisted,
    /// Re-added from the static whitelist
    Whitelisted,
    /// Same path already listed earlier
    Duplicate,
}

impl Reason {
    /// Short human-readable description.
    pub const fn describe(self) -> &'static str {
        match self {
            Self::RunAll => "run all",
            Self::ForeignEsx => "ESX file, target is not ESX",
            Self::ForeignClassification => "classified as another framework",
            Self::ForeignKeyword => "name names another framework",
            Self::TargetKeyword => "name names the target framework",
            Self::Generic => "framework-agnostic name",
            Self::Matched => "classified as target framework",
            Self::Unclassified => "unclassified, included",
            Self::NoMatch => "no inclusion rule applied",
            Self::Blacklisted => "blacklisted",
            Self::Whitelisted => "whitelisted",
            Self::Duplicate => "duplicate path",
        }
    }
}

/// Filter verdict for one discovered file.
#[derive(Debug, Clone)]
pub struct PlannedFile {
    /// The file
    pub file: SqlFile,
    /// Classifier result; `None` when classification was skipped
    pub classification: Option<Framework>,
    /// Whether the file is in the execution set
    pub included: bool,
    /// Deciding rule
    pub reason: Reason,
}

/// Verdicts for every discovered file, in discovery order.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    /// Target framework the plan was built for
    pub target: Framework,
    /// One entry per discovered file
    pub entries: Vec<PlannedFile>,
}

impl ExecutionPlan {
    /// Included entries in execution order: rule-included files in
    /// discovery order, then whitelisted additions in discovery order.
    pub fn execution_entries(&self) -> Vec<PlannedFile> {
        let ruled = self
            .entries
            .iter()
            .filter(|entry| entry.included && entry.reason != Reason::Whitelisted);
        let whitelisted = self
            .entries
            .iter()
            .filter(|entry| entry.included && entry.reason == Reason::Whitelisted);
        ruled.chain(whitelisted).cloned().collect()
    }

    /// Files to execute, in execution order.
    pub fn execution_set(&self) -> Vec<SqlFile> {
        self.execution_entries()
            .into_iter()
            .map(|entry| entry.file)
            .collect()
    }

    /// Number of files in the execution set.
    pub fn included_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.included).count()
    }
}

/// Applies classification and the allow/deny lists to discovered files.
#[derive(Debug, Clone)]
pub struct FileFilter {
    classifier: Classifier,
    rules: Arc<RuleSet>,
}

impl FileFilter {
    /// Creates a filter over the given rule tables.
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self {
            classifier: Classifier::new(Arc::clone(&rules)),
            rules,
        }
    }

    /// Classifier used for the verdicts.
    pub const fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Ordered, de-duplicated execution set for `target`.
    pub fn filter(&self, files: &[SqlFile], target: Framework) -> Vec<SqlFile> {
        self.evaluate(files, target).execution_set()
    }

    /// Builds a verdict for every file.
    pub fn evaluate(&self, files: &[SqlFile], target: Framework) -> ExecutionPlan {
        let mut seen: HashSet<&str> = HashSet::with_capacity(files.len());
        let mut entries: Vec<PlannedFile> = Vec::with_capacity(files.len());

        for file in files {
            if !seen.insert(file.relative_path()) {
                entries.push(PlannedFile {
                    file: file.clone(),
                    classification: None,
                    included: false,
                    reason: Reason::Duplicate,
                });
                continue;
            }

            let entry = if target == Framework::Other {
                PlannedFile {
                    file: file.clone(),
                    classification: None,
                    included: true,
                    reason: Reason::RunAll,
                }
            } else {
                self.verdict(file, target)
            };
            entries.push(entry);
        }

        self.apply_policy(&mut entries);

        for entry in &entries {
            debug!(
                "{} -> {} ({})",
                entry.file.relative_path(),
                if entry.included { "run" } else { "skip" },
                entry.reason.describe()
            );
        }

        ExecutionPlan { target, entries }
    }

    fn verdict(&self, file: &SqlFile, target: Framework) -> PlannedFile {
        let classification = self.classifier.classify(file);
        let name = file.file_name().to_lowercase();

        let (included, reason) = if classification == Framework::Esx && target != Framework::Esx {
            (false, Reason::ForeignEsx)
        } else if classification.is_concrete() && classification != target {
            (false, Reason::ForeignClassification)
        } else if self.has_foreign_keyword(&name, target) {
            (false, Reason::ForeignKeyword)
        } else if self.has_target_keyword(&name, target) {
            (true, Reason::TargetKeyword)
        } else if !self.has_any_keyword(&name) {
            (true, Reason::Generic)
        } else if classification == target {
            (true, Reason::Matched)
        } else if classification == Framework::Unknown {
            (true, Reason::Unclassified)
        } else {
            (false, Reason::NoMatch)
        };

        PlannedFile {
            file: file.clone(),
            classification: Some(classification),
            included,
            reason,
        }
    }

    fn apply_policy(&self, entries: &mut [PlannedFile]) {
        let policy = self.rules.policy();

        for entry in entries.iter_mut() {
            if entry.reason == Reason::Duplicate {
                continue;
            }
            let path = entry.file.relative_path();
            if policy.is_blacklisted(path) {
                entry.included = false;
                entry.reason = Reason::Blacklisted;
            } else if !entry.included && policy.is_whitelisted(path) {
                entry.included = true;
                entry.reason = Reason::Whitelisted;
            }
        }
    }

    /// Another framework's keyword appears in the name. Plain substring
    /// test: `qb` inside `qbx_core.sql` counts as a QBCore keyword.
    fn has_foreign_keyword(&self, name: &str, target: Framework) -> bool {
        self.rules
            .profiles()
            .iter()
            .filter(|profile| profile.framework() != target)
            .any(|profile| profile.matches_name(name))
    }

    fn has_target_keyword(&self, name: &str, target: Framework) -> bool {
        self.rules
            .profile(target)
            .is_some_and(|profile| profile.matches_name(name))
    }

    fn has_any_keyword(&self, name: &str) -> bool {
        self.rules
            .profiles()
            .iter()
            .any(|profile| profile.matches_name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{PathPolicySpec, RuleSetSpec, shared_builtin};
    use proptest::prelude::*;

    fn filter() -> FileFilter {
        FileFilter::new(shared_builtin())
    }

    fn names(files: &[SqlFile]) -> Vec<&str> {
        files.iter().map(SqlFile::relative_path).collect()
    }

    fn scenario_files() -> Vec<SqlFile> {
        vec![
            SqlFile::from_content(
                "a_players.sql",
                "CREATE TABLE IF NOT EXISTS `players` (citizenid VARCHAR(50));",
            ),
            SqlFile::from_content("esx_users.sql", "ALTER TABLE users ADD COLUMN phone INT;"),
            SqlFile::from_content(
                "b_playerdata.sql",
                "ALTER TABLE players ADD COLUMN metadata TEXT;",
            ),
        ]
    }

    #[test]
    fn test_qbcore_scenario_excludes_esx() {
        let result = filter().filter(&scenario_files(), Framework::QbCore);
        assert_eq!(names(&result), ["a_players.sql", "b_playerdata.sql"]);
    }

    #[test]
    fn test_other_returns_everything_unclassified() {
        let files = scenario_files();
        let plan = filter().evaluate(&files, Framework::Other);
        assert!(plan.entries.iter().all(|e| e.classification.is_none()));
        assert!(plan.entries.iter().all(|e| e.reason == Reason::RunAll));
        assert_eq!(names(&plan.execution_set()), names(&files));
    }

    #[test]
    fn test_other_still_applies_blacklist() {
        let mut files = scenario_files();
        files.push(SqlFile::from_content(
            "resources/[ox]/ox_doorlock/sql/default.sql",
            "INSERT INTO ox_doorlock VALUES (1);",
        ));
        files.push(SqlFile::from_content(
            "resources/[ox]/ox_doorlock/sql/ox_doorlock.sql",
            "SELECT 1;",
        ));

        let plan = filter().evaluate(&files, Framework::Other);
        assert_eq!(plan.entries[3].reason, Reason::Blacklisted);
        assert!(!plan.entries[3].included);
        assert_eq!(plan.entries[4].reason, Reason::RunAll);
        assert_eq!(
            names(&plan.execution_set()),
            [
                "a_players.sql",
                "esx_users.sql",
                "b_playerdata.sql",
                "resources/[ox]/ox_doorlock/sql/ox_doorlock.sql"
            ]
        );
    }

    #[test]
    fn test_esx_target_keeps_esx_files() {
        let result = filter().filter(&scenario_files(), Framework::Esx);
        assert_eq!(names(&result), ["esx_users.sql"]);
    }

    #[test]
    fn test_foreign_keyword_rejected() {
        let files = vec![SqlFile::from_content("ox_stash.sql", "SELECT 1;")];
        let plan = filter().evaluate(&files, Framework::QbCore);
        assert!(!plan.entries[0].included);
        assert_eq!(plan.entries[0].reason, Reason::ForeignClassification);

        let files = vec![SqlFile::from_content("box_ox_notes.sql", "SELECT 1;")];
        let plan = filter().evaluate(&files, Framework::Esx);
        assert!(!plan.entries[0].included);
    }

    #[test]
    fn test_qbx_target_rejects_names_with_qb_keyword() {
        let files = vec![
            SqlFile::from_content("qbx_core.sql", "CREATE TABLE bans (id INT);"),
            SqlFile::from_content("qb-shops.sql", "CREATE TABLE shops (id INT);"),
            SqlFile::from_content("install.sql", "CREATE TABLE qbx_properties (id INT);"),
        ];
        let plan = filter().evaluate(&files, Framework::Qbx);

        assert_eq!(plan.entries[0].classification, Some(Framework::Qbx));
        assert!(!plan.entries[0].included);
        assert_eq!(plan.entries[0].reason, Reason::ForeignKeyword);
        assert!(!plan.entries[1].included);
        assert_eq!(plan.entries[1].reason, Reason::ForeignClassification);
        assert!(plan.entries[2].included);
        assert_eq!(names(&plan.execution_set()), ["install.sql"]);
    }

    #[test]
    fn test_qbcore_target_rejects_qbx_named_files() {
        let files = vec![SqlFile::from_content("qbx_core.sql", "CREATE TABLE bans (id INT);")];
        assert!(filter().filter(&files, Framework::QbCore).is_empty());
    }

    #[test]
    fn test_unknown_classification_included() {
        let files = vec![SqlFile::from_content(
            "weather.sql",
            "CREATE TABLE weather_state (id INT);",
        )];
        let plan = filter().evaluate(&files, Framework::Ox);
        assert!(plan.entries[0].included);
        assert_eq!(plan.entries[0].classification, Some(Framework::Unknown));
        assert_eq!(plan.entries[0].reason, Reason::Generic);
    }

    #[test]
    fn test_blacklist_excludes_matching_file() {
        let files = vec![
            SqlFile::from_content("resources/[ox]/ox_doorlock/sql/default.sql", "SELECT 1;"),
            SqlFile::from_content("resources/[ox]/ox_doorlock/sql/community_mrpd.sql", ""),
        ];
        let plan = filter().evaluate(&files, Framework::Ox);
        assert!(plan.entries.iter().all(|e| e.reason == Reason::Blacklisted));
        assert!(plan.execution_set().is_empty());
    }

    #[test]
    fn test_whitelist_readds_after_filtering() {
        let files = vec![
            SqlFile::from_content("resources/ox_doorlock/sql/ox_doorlock.sql", "SELECT 1;"),
            SqlFile::from_content("resources/qb-core/qbcore.sql", "SELECT 1;"),
        ];
        // For a QBCore target the ox_doorlock file would be rejected by its name.
        let plan = filter().evaluate(&files, Framework::QbCore);
        assert_eq!(plan.entries[0].reason, Reason::Whitelisted);
        assert_eq!(
            names(&plan.execution_set()),
            [
                "resources/qb-core/qbcore.sql",
                "resources/ox_doorlock/sql/ox_doorlock.sql"
            ]
        );
    }

    #[test]
    fn test_blacklist_wins_over_whitelist() {
        let mut spec = RuleSetSpec::builtin();
        spec.policy = PathPolicySpec {
            blacklist: vec!["shared/both.sql".to_string()],
            whitelist: vec!["shared/both.sql".to_string()],
        };
        let filter = FileFilter::new(Arc::new(RuleSet::compile(&spec).unwrap()));
        let files = vec![
            SqlFile::from_content("shared/both.sql", "SELECT 1;"),
            SqlFile::from_content("shared/esx_both.sql", "SELECT 1;"),
        ];

        for target in [Framework::QbCore, Framework::Esx, Framework::Ox] {
            let result = filter.filter(&files, target);
            assert!(!names(&result).contains(&"shared/both.sql"));
        }
    }

    #[test]
    fn test_duplicates_removed() {
        let files = vec![
            SqlFile::from_content("a.sql", "SELECT 1;"),
            SqlFile::from_content("a.sql", "SELECT 1;"),
        ];
        let plan = filter().evaluate(&files, Framework::QbCore);
        assert_eq!(plan.entries[1].reason, Reason::Duplicate);
        assert_eq!(plan.execution_set().len(), 1);
    }

    fn arbitrary_files() -> impl Strategy<Value = Vec<SqlFile>> {
        let name = prop_oneof![
            Just("qb_"),
            Just("qbx_"),
            Just("ox_"),
            Just("esx_"),
            Just(""),
        ];
        let content = prop_oneof![
            Just("SELECT 1;"),
            Just("CREATE TABLE players (id INT);"),
            Just("CREATE TABLE ox_stashes (id INT);"),
            Just("CREATE TABLE IF NOT EXISTS items (name TEXT);"),
            Just("UPDATE users SET job = 'police';"),
        ];
        prop::collection::vec((name, "[a-z]{1,6}", content), 0..12).prop_map(|entries| {
            entries
                .into_iter()
                .enumerate()
                .map(|(i, (prefix, stem, content))| {
                    SqlFile::from_content(format!("r{}/{}{}.sql", i, prefix, stem), content)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_filter_is_idempotent(files in arbitrary_files(), target_index in 0usize..5) {
            let target = Framework::TARGETS[target_index];
            let f = filter();
            let first = f.filter(&files, target);
            let second = f.filter(&files, target);
            prop_assert_eq!(names(&first), names(&second));
        }

        #[test]
        fn prop_other_is_passthrough(files in arbitrary_files()) {
            let f = filter();
            let policy = f.classifier().rules().policy();
            prop_assume!(files.iter().all(|file| !policy.is_blacklisted(file.relative_path())));

            let result = f.filter(&files, Framework::Other);
            prop_assert_eq!(names(&result), names(&files));
        }

        #[test]
        fn prop_esx_files_never_run_for_other_targets(
            files in arbitrary_files(),
            target_index in 0usize..3,
        ) {
            let target = Framework::TARGETS[target_index];
            let f = filter();
            for file in f.filter(&files, target) {
                prop_assert_ne!(f.classifier().classify(&file), Framework::Esx);
            }
        }
    }
}
