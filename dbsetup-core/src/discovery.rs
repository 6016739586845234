//! Recursive discovery of SQL files and `server.cfg` files.

use crate::Result;
use crate::error::DbSetupError;
use crate::models::SqlFile;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Name of the FiveM server configuration file.
pub const SERVER_CFG: &str = "server.cfg";

/// Finds every `*.sql` file below `root`.
///
/// The extension match is case-insensitive. Entries are visited in file-name
/// order within each directory, so repeated runs see the same order.
/// Unreadable entries are logged and skipped.
///
/// # Errors
/// Returns an I/O error if `root` does not exist or is not a directory.
pub fn discover_sql_files(root: &Path) -> Result<Vec<SqlFile>> {
    let root = root.canonicalize().map_err(|e| {
        DbSetupError::io(format!("Scan root {} is not accessible", root.display()), e)
    })?;
    if !root.is_dir() {
        return Err(DbSetupError::io(
            format!("Scan root {} is not a directory", root.display()),
            std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
        ));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if entry.file_type().is_file() && has_sql_extension(entry.path()) {
            debug!("Found {}", entry.path().display());
            files.push(SqlFile::new(entry.into_path(), &root));
        }
    }

    info!("Discovered {} SQL files under {}", files.len(), root.display());
    Ok(files)
}

fn has_sql_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("sql"))
}

/// Finds `server.cfg` files below `start`, moving one directory up at a time
/// until a level yields at least one file or `max_levels` ancestors have
/// been searched.
///
/// Each level is searched recursively, so a hit can be anywhere below that
/// ancestor. Returns the files of the first level that has any, in walk
/// order.
pub fn find_server_cfg_upward(start: &Path, max_levels: usize) -> Vec<PathBuf> {
    let mut current = start
        .canonicalize()
        .unwrap_or_else(|_| start.to_path_buf());

    for level in 0..=max_levels {
        let found = find_server_cfgs(&current);
        if !found.is_empty() {
            return found;
        }
        let Some(parent) = current.parent().map(Path::to_path_buf) else {
            break;
        };
        if level < max_levels {
            info!(
                "No {} found in {}, searching {}",
                SERVER_CFG,
                current.display(),
                parent.display()
            );
        }
        current = parent;
    }
    Vec::new()
}

fn find_server_cfgs(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == SERVER_CFG)
        .map(walkdir::DirEntry::into_path)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "SELECT 1;").unwrap();
    }

    #[test]
    fn test_discover_sql_files_sorted_and_relative() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("resources/qb-core/qbcore.sql"));
        touch(&dir.path().join("resources/[ox]/ox_inventory/sql/install.SQL"));
        touch(&dir.path().join("b.sql"));
        touch(&dir.path().join("a.sql"));
        touch(&dir.path().join("notes.txt"));
        touch(&dir.path().join("resources/readme.sql.bak"));

        let files = discover_sql_files(dir.path()).unwrap();
        let relative: Vec<&str> = files.iter().map(SqlFile::relative_path).collect();
        assert_eq!(
            relative,
            [
                "a.sql",
                "b.sql",
                "resources/[ox]/ox_inventory/sql/install.SQL",
                "resources/qb-core/qbcore.sql",
            ]
        );
        assert!(files.iter().all(|f| f.path().is_absolute()));
        assert_eq!(files[2].file_name(), "install.SQL");
    }

    #[test]
    fn test_discover_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_sql_files(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, DbSetupError::Io { .. }));
        assert!(!err.is_setup_failure());
    }

    #[test]
    fn test_discover_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_sql_files(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_find_server_cfg_in_subtree() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("txData/default/server.cfg"));

        let found = find_server_cfg_upward(dir.path(), 0);
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("txData/default/server.cfg"));
    }

    #[test]
    fn test_find_server_cfg_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("server.cfg"));
        let nested = dir.path().join("resources/[standalone]/mod");
        fs::create_dir_all(&nested).unwrap();

        assert!(find_server_cfg_upward(&nested, 1).is_empty());
        let found = find_server_cfg_upward(&nested, 3);
        assert_eq!(found.len(), 1);
    }
}
