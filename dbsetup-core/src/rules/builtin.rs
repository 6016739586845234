//! Built-in FiveM framework tables.
//!
//! Profiles are listed in filename-keyword precedence order: qbcore, qbx, ox,
//! esx. Every content pattern is compiled case-insensitively.

use super::{EsxOverrideSpec, PathPolicySpec, ProfileSpec, RuleSetSpec};
use crate::models::Framework;

/// Characters of content inspected by the classifier's fallback scan.
pub const FALLBACK_SCAN_CHARS: usize = 4096;

const QBCORE_KEYWORDS: &[&str] = &["qbcore", "qb"];
const QBX_KEYWORDS: &[&str] = &["qbx"];
const OX_KEYWORDS: &[&str] = &["ox", "oxcore"];
const ESX_KEYWORDS: &[&str] = &["esx"];

const QBCORE_PATTERNS: &[&str] = &[
    r"\bqbcore_",
    r"\bqb_",
    r"\bplayers\b",
    r"\bplayer_vehicles\b",
    r"INSERT INTO `players`",
    r"INSERT INTO `player_vehicles`",
    r"CREATE TABLE IF NOT EXISTS `players`",
    r"CREATE TABLE IF NOT EXISTS `player_vehicles`",
    r"JSON_",
    r"qbcore framework",
    r"-- QBCore",
    r"\bmetadata\b",
    r"\binventory\b",
    r"\bplayer_outfits\b",
    r"\bplayer_houses\b",
    r"\bplayer_motels\b",
    r"\bplayer_gangs\b",
    r"\bplayer_contacts\b",
    r"\bplayer_.*",
    r"\btrunkitems\b",
    r"\bgloveboxitems\b",
];

// QBX is the QBCore fork built on OX resources: an explicit qbx marker, or
// ox-style and qb-style names in the same file.
const QBX_PATTERNS: &[&str] = &[
    r"\bqbx_",
    r"\bqbx\b",
    r"-- QBX",
    r"QBX",
    r"(?s)\b(?:ox_inventory|ox_doorlock)\b.*\b(?:qbcore|qb_)",
    r"(?s)\b(?:qbcore|qb_).*\b(?:ox_inventory|ox_doorlock)\b",
];

const OX_PATTERNS: &[&str] = &[
    r"\box_",
    r"\boxcore_",
    r"\box_inventory\b",
    r"\box_doorlock\b",
    r"INSERT INTO `ox_inventory`",
    r"INSERT INTO `ox_doorlock`",
    r"CREATE TABLE IF NOT EXISTS `ox_inventory`",
    r"CREATE TABLE IF NOT EXISTS `ox_doorlock`",
    r"-- OX",
    r"\box_[a-z0-9_]+",
    r"\bowned_keys\b",
    r"\bowned_doors\b",
    r"\bdoorlock\b",
    r"\binventory\b",
];

const ESX_PATTERNS: &[&str] = &[
    r"\besx_",
    r"\busers\b",
    r"\bowned_vehicles\b",
    r"\baddon_account_data\b",
    r"\bdatastore_data\b",
    r"\bjobs\b",
    r"\bjob_grades\b",
    r"INSERT INTO `users`",
    r"INSERT INTO `owned_vehicles`",
    r"INSERT INTO `addon_account_data`",
    r"INSERT INTO `datastore_data`",
    r"CREATE TABLE IF NOT EXISTS `users`",
    r"CREATE TABLE IF NOT EXISTS `owned_vehicles`",
    r"-- ESX",
    r"\besx_[a-z0-9_]+",
    r#"INSERT IGNORE [`"]?items[`"]?"#,
    r#"CREATE TABLE IF NOT EXISTS [`"]?items[`"]?"#,
    r#"ALTER TABLE [`"]?items[`"]?"#,
    r"--.*esx",
    r"--.*item limit",
    r"--.*item weight",
    r"--.*es_extended",
    r"\baddon_inventory_items\b",
    r"\bowned_properties\b",
    r"\buser_licenses\b",
    r"\buser_vehicles\b",
    r"\buser_inventory\b",
    r"\buser_accounts\b",
    r"\buser_.*",
    r"\bproperty\b",
    r"\bphone_users_contacts\b",
];

// Strong ESX signals checked before anything else. Migrations touching an
// `items` table are attributed to ESX.
const ESX_SIGNALS: &[&str] = &[
    r"only for esx|esx where|esx only|es_extended",
    r#"insert\s+(?:ignore\s+)?(?:into\s+)?[`"]?items\b[`"]?"#,
    r#"create\s+table\s+if\s+not\s+exists\s+[`"]?items\b[`"]?"#,
];

const ESX_FILE_NAMES: &[&str] = &["items_limit.sql", "items_weight.sql"];

const ESX_LINE_MARKERS: &[&str] = &["database.items"];

const BLACKLIST: &[&str] = &[
    "ox_doorlock/sql/default.sql",
    "ox_doorlock/sql/community_mrpd.sql",
];

const WHITELIST: &[&str] = &["ox_doorlock/sql/ox_doorlock.sql"];

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

fn profile(framework: Framework, keywords: &[&str], patterns: &[&str]) -> ProfileSpec {
    ProfileSpec {
        framework,
        keywords: owned(keywords),
        patterns: owned(patterns),
    }
}

/// Builds the built-in rule tables.
pub fn spec() -> RuleSetSpec {
    RuleSetSpec {
        profiles: vec![
            profile(Framework::QbCore, QBCORE_KEYWORDS, QBCORE_PATTERNS),
            profile(Framework::Qbx, QBX_KEYWORDS, QBX_PATTERNS),
            profile(Framework::Ox, OX_KEYWORDS, OX_PATTERNS),
            profile(Framework::Esx, ESX_KEYWORDS, ESX_PATTERNS),
        ],
        esx_override: EsxOverrideSpec {
            signals: owned(ESX_SIGNALS),
            file_names: owned(ESX_FILE_NAMES),
            line_markers: owned(ESX_LINE_MARKERS),
        },
        policy: PathPolicySpec {
            blacklist: owned(BLACKLIST),
            whitelist: owned(WHITELIST),
        },
        fallback_scan_chars: FALLBACK_SCAN_CHARS,
    }
}
