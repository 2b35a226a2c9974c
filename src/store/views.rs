//! The persistent view store.
//!
//! Each view occupies one `<base>.logsql` file under the store directory,
//! where `<base>` is the lower-cased dotted view name joined with `_`.
//! Content is a single PipeQL program terminated by a newline.
//!
//! Concurrency: a `parking_lot::RwLock` serialises access within the
//! process; a sibling `<base>.lock` file created with `create_new`
//! excludes writers in other processes. The lock file is removed by a
//! scoped guard on every exit path. An orphan `.lock` indicates a crashed
//! writer and must be removed administratively.
//!
//! Writes go through a temp file in the same directory followed by an
//! atomic rename, so a concurrent reader observes either the old or the
//! new content, never a torn file.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tempfile::NamedTempFile;

use super::error::StoreError;

const VIEW_EXTENSION: &str = ".logsql";
const LOCK_EXTENSION: &str = ".lock";

/// Options for [`ViewStore::save`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewOptions {
    /// Replace an existing view instead of failing.
    pub or_replace: bool,
    /// Succeed without writing when the view already exists.
    pub if_not_exists: bool,
}

/// Directory-backed store of named PipeQL fragments.
#[derive(Debug)]
pub struct ViewStore {
    dir: PathBuf,
    lock: RwLock<()>,
}

impl ViewStore {
    /// Creates a store bound to the given directory.
    ///
    /// The directory is created lazily on the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        let display = dir.to_string_lossy();
        if display.trim().is_empty() || display.contains('\0') {
            return Err(StoreError::InvalidName {
                reason: "invalid views directory".to_string(),
            });
        }
        Ok(Self {
            dir,
            lock: RwLock::new(()),
        })
    }

    /// Returns the store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the dotted display form of a view name.
    pub fn display_name(parts: &[String]) -> String {
        parts.join(".")
    }

    /// Persists a view, atomically replacing any previous content.
    ///
    /// Returns the path of the stored `.logsql` file. With `if_not_exists`
    /// an existing view is left untouched and the call succeeds; without
    /// `or_replace` an existing view is an error.
    pub fn save(
        &self,
        parts: &[String],
        query: &str,
        opts: ViewOptions,
    ) -> Result<PathBuf, StoreError> {
        let name = sanitize_view_file_name(parts)?;
        let _guard = self.lock.write();

        fs::create_dir_all(&self.dir)
            .map_err(|err| StoreError::io("ensure views directory", err))?;

        let _lock_file = LockFile::acquire(self.lock_path(&name), &name.display)?;

        let view_path = self.view_path(&name);
        match fs::metadata(&view_path) {
            Ok(meta) => {
                if meta.is_dir() {
                    return Err(StoreError::UnexpectedDirectory {
                        name: name.display,
                    });
                }
                if opts.if_not_exists {
                    return Ok(view_path);
                }
                if !opts.or_replace {
                    return Err(StoreError::AlreadyExists {
                        name: name.display,
                    });
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(StoreError::io(
                    format!("stat view {}", name.display),
                    err,
                ));
            }
        }

        let mut tmp = NamedTempFile::new_in(&self.dir)
            .map_err(|err| StoreError::io(format!("create temp file for view {}", name.display), err))?;
        tmp.write_all(query.as_bytes())
            .map_err(|err| StoreError::io(format!("write view {}", name.display), err))?;
        if !query.ends_with('\n') {
            tmp.write_all(b"\n")
                .map_err(|err| StoreError::io(format!("finalize view {}", name.display), err))?;
        }
        tmp.flush()
            .map_err(|err| StoreError::io(format!("flush view {}", name.display), err))?;
        tmp.persist(&view_path).map_err(|err| {
            StoreError::io(format!("replace view {}", name.display), err.error)
        })?;

        Ok(view_path)
    }

    /// Loads a view's stored query, with the trailing newline stripped.
    ///
    /// Returns `Ok(None)` when the view does not exist.
    pub fn load(&self, parts: &[String]) -> Result<Option<String>, StoreError> {
        let name = sanitize_view_file_name(parts)?;
        let _guard = self.lock.read();

        let view_path = self.view_path(&name);
        match fs::metadata(&view_path) {
            Ok(meta) if meta.is_dir() => {
                return Err(StoreError::UnexpectedDirectory {
                    name: name.display,
                });
            }
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(StoreError::io(
                    format!("stat view {}", name.display),
                    err,
                ));
            }
        }

        let data = fs::read_to_string(&view_path)
            .map_err(|err| StoreError::io(format!("read view {}", name.display), err))?;
        let query = data.trim_end_matches(['\r', '\n']);
        if query.trim().is_empty() {
            return Err(StoreError::Empty { name: name.display });
        }
        Ok(Some(query.to_string()))
    }

    /// Removes a view.
    ///
    /// With `if_exists` a missing view (or a missing store directory) is
    /// not an error.
    pub fn remove(&self, parts: &[String], if_exists: bool) -> Result<(), StoreError> {
        let name = sanitize_view_file_name(parts)?;
        let _guard = self.lock.write();

        let _lock_file = match LockFile::acquire(self.lock_path(&name), &name.display) {
            Ok(lock_file) => lock_file,
            Err(StoreError::Io { source, .. })
                if source.kind() == io::ErrorKind::NotFound =>
            {
                // Store directory is absent, so the view cannot exist.
                if if_exists {
                    return Ok(());
                }
                return Err(StoreError::NotFound { name: name.display });
            }
            Err(err) => return Err(err),
        };

        let view_path = self.view_path(&name);
        match fs::metadata(&view_path) {
            Ok(meta) if meta.is_dir() => {
                return Err(StoreError::UnexpectedDirectory {
                    name: name.display,
                });
            }
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                if if_exists {
                    return Ok(());
                }
                return Err(StoreError::NotFound { name: name.display });
            }
            Err(err) => {
                return Err(StoreError::io(
                    format!("stat view {}", name.display),
                    err,
                ));
            }
        }

        fs::remove_file(&view_path)
            .map_err(|err| StoreError::io(format!("remove view {}", name.display), err))
    }

    /// Lists stored view base names, sorted.
    pub fn list_views(&self) -> Result<Vec<String>, StoreError> {
        let _guard = self.lock.read();
        let mut views: Vec<String> = self.read_view_entries()?.into_iter().collect();
        views.sort();
        Ok(views)
    }

    /// Returns all stored views as `base name → query`, in name order.
    pub fn view_definitions(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let _guard = self.lock.read();
        let mut definitions = BTreeMap::new();
        for base in self.read_view_entries()? {
            let view_path = self.dir.join(format!("{base}{VIEW_EXTENSION}"));
            let data = fs::read_to_string(&view_path)
                .map_err(|err| StoreError::io(format!("read view {base}"), err))?;
            let query = data.trim_end_matches(['\r', '\n']);
            if query.trim().is_empty() {
                return Err(StoreError::Empty { name: base });
            }
            definitions.insert(base, query.to_string());
        }
        Ok(definitions)
    }

    fn read_view_entries(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::io("list views", err)),
        };
        let mut views = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| StoreError::io("list views", err))?;
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(true) {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some(base) = file_name.strip_suffix(VIEW_EXTENSION) else {
                continue;
            };
            if base.is_empty() {
                continue;
            }
            views.push(base.to_string());
        }
        Ok(views)
    }

    fn view_path(&self, name: &ViewFileName) -> PathBuf {
        self.dir.join(format!("{}{VIEW_EXTENSION}", name.base))
    }

    fn lock_path(&self, name: &ViewFileName) -> PathBuf {
        self.dir.join(format!("{}{LOCK_EXTENSION}", name.base))
    }
}

/// Sanitised on-disk naming for a view.
struct ViewFileName {
    /// File base name: lower-cased parts joined with `_`.
    base: String,
    /// Dotted display form for diagnostics.
    display: String,
}

fn sanitize_view_file_name(parts: &[String]) -> Result<ViewFileName, StoreError> {
    if parts.is_empty() {
        return Err(StoreError::InvalidName {
            reason: "view name is missing".to_string(),
        });
    }
    let mut sanitized = Vec::with_capacity(parts.len());
    for part in parts {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            return Err(StoreError::InvalidName {
                reason: "view name contains empty part".to_string(),
            });
        }
        if let Some(bad) = trimmed.chars().find(|&ch| !is_safe_view_char(ch)) {
            return Err(StoreError::InvalidName {
                reason: format!("invalid character {bad:?} in view name {trimmed:?}"),
            });
        }
        sanitized.push(trimmed.to_lowercase());
    }
    Ok(ViewFileName {
        base: sanitized.join("_"),
        display: ViewStore::display_name(parts),
    })
}

fn is_safe_view_char(ch: char) -> bool {
    ch.is_alphabetic() || ch.is_numeric() || ch == '_' || ch == '-'
}

/// Scoped holder of a view's `.lock` file.
///
/// Dropping the guard closes and removes the lock file; removal failures
/// are logged, not raised, since the write itself already finished.
struct LockFile {
    path: PathBuf,
    file: Option<fs::File>,
}

impl LockFile {
    fn acquire(path: PathBuf, display: &str) -> Result<Self, StoreError> {
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => Ok(Self {
                path,
                file: Some(file),
            }),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                Err(StoreError::Locked {
                    name: display.to_string(),
                })
            }
            Err(err) => Err(StoreError::io(
                format!("create lock for view {display}"),
                err,
            )),
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        drop(self.file.take());
        if let Err(err) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), %err, "failed to remove lock file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn name(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_save_writes_newline_terminated_file_and_releases_lock() {
        let dir = tempdir().unwrap();
        let store = ViewStore::new(dir.path()).unwrap();
        let path = store
            .save(&name(&["error_logs"]), "level:error", ViewOptions::default())
            .unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "level:error\n");
        assert!(!dir.path().join("error_logs.lock").exists());
    }

    #[test]
    fn test_save_keeps_existing_trailing_newline() {
        let dir = tempdir().unwrap();
        let store = ViewStore::new(dir.path()).unwrap();
        let path = store
            .save(&name(&["v"]), "level:error\n", ViewOptions::default())
            .unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "level:error\n");
    }

    #[test]
    fn test_save_existing_requires_or_replace() {
        let dir = tempdir().unwrap();
        let store = ViewStore::new(dir.path()).unwrap();
        store
            .save(&name(&["v"]), "a:1", ViewOptions::default())
            .unwrap();

        let err = store
            .save(&name(&["v"]), "b:2", ViewOptions::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));

        store
            .save(
                &name(&["v"]),
                "b:2",
                ViewOptions {
                    or_replace: true,
                    ..ViewOptions::default()
                },
            )
            .unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("v.logsql")).unwrap(),
            "b:2\n"
        );
    }

    #[test]
    fn test_save_if_not_exists_leaves_content_untouched() {
        let dir = tempdir().unwrap();
        let store = ViewStore::new(dir.path()).unwrap();
        fs::write(dir.path().join("v.logsql"), "original\n").unwrap();

        store
            .save(
                &name(&["v"]),
                "replacement",
                ViewOptions {
                    if_not_exists: true,
                    ..ViewOptions::default()
                },
            )
            .unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("v.logsql")).unwrap(),
            "original\n"
        );
        assert!(!dir.path().join("v.lock").exists());
    }

    #[test]
    fn test_save_fails_while_locked() {
        let dir = tempdir().unwrap();
        let store = ViewStore::new(dir.path()).unwrap();
        fs::write(dir.path().join("v.lock"), "held").unwrap();

        let err = store
            .save(&name(&["v"]), "a:1", ViewOptions::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::Locked { .. }));
        assert_eq!(err.code(), 423);
        // The foreign lock file must not be removed by the failed attempt.
        assert!(dir.path().join("v.lock").exists());
    }

    #[test]
    fn test_load_round_trips_saved_query() {
        let dir = tempdir().unwrap();
        let store = ViewStore::new(dir.path()).unwrap();
        store
            .save(&name(&["v"]), "* | fields level", ViewOptions::default())
            .unwrap();
        assert_eq!(
            store.load(&name(&["v"])).unwrap().as_deref(),
            Some("* | fields level")
        );
    }

    #[test]
    fn test_load_missing_returns_none() {
        let dir = tempdir().unwrap();
        let store = ViewStore::new(dir.path()).unwrap();
        assert_eq!(store.load(&name(&["missing"])).unwrap(), None);
    }

    #[test]
    fn test_load_rejects_empty_content() {
        let dir = tempdir().unwrap();
        let store = ViewStore::new(dir.path()).unwrap();
        fs::write(dir.path().join("v.logsql"), "\n").unwrap();
        assert!(matches!(
            store.load(&name(&["v"])).unwrap_err(),
            StoreError::Empty { .. }
        ));
    }

    #[test]
    fn test_remove_deletes_view_and_lock() {
        let dir = tempdir().unwrap();
        let store = ViewStore::new(dir.path()).unwrap();
        store
            .save(&name(&["v"]), "a:1", ViewOptions::default())
            .unwrap();
        store.remove(&name(&["v"]), false).unwrap();
        assert!(!dir.path().join("v.logsql").exists());
        assert!(!dir.path().join("v.lock").exists());
    }

    #[test]
    fn test_remove_missing() {
        let dir = tempdir().unwrap();
        let store = ViewStore::new(dir.path()).unwrap();
        store.remove(&name(&["missing"]), true).unwrap();
        let err = store.remove(&name(&["missing"]), false).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(err.code(), 404);
    }

    #[test]
    fn test_remove_missing_directory() {
        let dir = tempdir().unwrap();
        let store = ViewStore::new(dir.path().join("never_created")).unwrap();
        store.remove(&name(&["v"]), true).unwrap();
        assert!(store.remove(&name(&["v"]), false).is_err());
    }

    #[test]
    fn test_remove_fails_while_locked() {
        let dir = tempdir().unwrap();
        let store = ViewStore::new(dir.path()).unwrap();
        store
            .save(&name(&["v"]), "a:1", ViewOptions::default())
            .unwrap();
        fs::write(dir.path().join("v.lock"), "held").unwrap();
        assert!(matches!(
            store.remove(&name(&["v"]), false).unwrap_err(),
            StoreError::Locked { .. }
        ));
    }

    #[test]
    fn test_list_and_definitions_sorted() {
        let dir = tempdir().unwrap();
        let store = ViewStore::new(dir.path()).unwrap();
        store
            .save(&name(&["zeta"]), "z:1", ViewOptions::default())
            .unwrap();
        store
            .save(&name(&["alpha"]), "a:1", ViewOptions::default())
            .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(store.list_views().unwrap(), vec!["alpha", "zeta"]);
        let defs = store.view_definitions().unwrap();
        assert_eq!(
            defs.into_iter().collect::<Vec<_>>(),
            vec![
                ("alpha".to_string(), "a:1".to_string()),
                ("zeta".to_string(), "z:1".to_string()),
            ]
        );
    }

    #[test]
    fn test_list_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let store = ViewStore::new(dir.path().join("never_created")).unwrap();
        assert!(store.list_views().unwrap().is_empty());
        assert!(store.view_definitions().unwrap().is_empty());
    }

    #[test]
    fn test_dotted_names_map_to_joined_files() {
        let dir = tempdir().unwrap();
        let store = ViewStore::new(dir.path()).unwrap();
        let path = store
            .save(&name(&["App", "Errors"]), "level:error", ViewOptions::default())
            .unwrap();
        assert!(path.ends_with("app_errors.logsql"));
        assert_eq!(
            store.load(&name(&["app", "errors"])).unwrap().as_deref(),
            Some("level:error")
        );
    }

    #[test]
    fn test_invalid_view_names_rejected() {
        let dir = tempdir().unwrap();
        let store = ViewStore::new(dir.path()).unwrap();
        for parts in [vec![], name(&["  "]), name(&["a/b"]), name(&["a.b"])] {
            assert!(matches!(
                store.save(&parts, "q", ViewOptions::default()).unwrap_err(),
                StoreError::InvalidName { .. }
            ));
        }
    }
}
