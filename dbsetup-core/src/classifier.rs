//! Best-effort framework classification of SQL files.
//!
//! Rules are applied in strict precedence order and the first hit wins:
//!
//! 1. ESX override: strong ESX phrases, `items` table inserts/creates, the
//!    known ESX file names with an "esx" mention, any ESX profile pattern, or
//!    a `database.items` line.
//! 2. A file name containing `qbx`.
//! 3. Any QBX content pattern.
//! 4. Content matching both the QBCore and the OX pattern sets (QBX is the
//!    QBCore/OX hybrid).
//! 5. Filename keywords of every framework except QBX.
//! 6. Patterns of every framework except QBX against the first
//!    `fallback_scan_chars` characters of the content.
//! 7. Otherwise [`Framework::Unknown`].
//!
//! Both false positives and false negatives are possible; classification
//! never fails.

use crate::models::{Framework, SqlFile};
use crate::rules::RuleSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Classifies SQL files against an immutable [`RuleSet`].
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Arc<RuleSet>,
}

impl Classifier {
    /// Creates a classifier over the given rule tables.
    pub const fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    /// Rule tables in use.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Classifies a file by name and content.
    ///
    /// Unreadable content is treated as empty, so only the name-based rules
    /// can match for it.
    pub fn classify(&self, file: &SqlFile) -> Framework {
        let content = match file.content() {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    "Could not read {} for classification: {}",
                    file.relative_path(),
                    e
                );
                ""
            }
        };
        let framework = self.classify_text(file.file_name(), content);
        debug!("Classified {} as {}", file.relative_path(), framework);
        framework
    }

    /// Classifies a file name and its content. Pure and deterministic.
    pub fn classify_text(&self, file_name: &str, content: &str) -> Framework {
        let name = file_name.to_lowercase();
        let lower_content = content.to_lowercase();

        if self.is_esx_override(&name, content, &lower_content) {
            return Framework::Esx;
        }

        if name.contains("qbx") {
            return Framework::Qbx;
        }

        if self.matches_content(Framework::Qbx, content) {
            return Framework::Qbx;
        }

        if self.matches_content(Framework::QbCore, content)
            && self.matches_content(Framework::Ox, content)
        {
            return Framework::Qbx;
        }

        if let Some(profile) = self
            .rules
            .profiles()
            .iter()
            .filter(|p| p.framework() != Framework::Qbx)
            .find(|p| p.matches_name(&name))
        {
            return profile.framework();
        }

        let head = leading_chars(content, self.rules.fallback_scan_chars());
        self.rules
            .profiles()
            .iter()
            .filter(|p| p.framework() != Framework::Qbx)
            .find(|p| p.matches_content(head))
            .map_or(Framework::Unknown, |p| p.framework())
    }

    fn is_esx_override(&self, name: &str, content: &str, lower_content: &str) -> bool {
        let esx = self.rules.esx_override();
        esx.matches_signal(content)
            || esx.matches_named_file(name, lower_content)
            || self.matches_content(Framework::Esx, content)
            || esx.matches_line_marker(lower_content)
    }

    fn matches_content(&self, framework: Framework, content: &str) -> bool {
        self.rules
            .profile(framework)
            .is_some_and(|profile| profile.matches_content(content))
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters.
fn leading_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
