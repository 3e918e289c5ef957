use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use super::error::Result;
use super::settings::{DiscardScope, SidecarCase, Settings};
use super::store::RecordStore;

/// Aggregate outcome of a discard run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscardReport {
    /// Image files removed from disk
    pub deleted: usize,
    /// Image files that were already gone
    pub skipped: usize,
    /// Image files that could not be removed
    pub failed: usize,
    /// Raw sidecars removed alongside their images
    pub sidecars: usize,
}

impl DiscardReport {
    /// Records cleared from the store (every processed record is)
    pub fn records(&self) -> usize {
        self.deleted + self.skipped + self.failed
    }
}

/// What a confirmed discard did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardOutcome {
    Done(DiscardReport),
    /// The number of marked records no longer matches what was confirmed;
    /// nothing was touched
    Changed(usize),
}

/// Which raw files count as an image's sidecar: same folder, same base name,
/// one of the raw extensions.
#[derive(Debug, Clone)]
pub struct SidecarPolicy {
    extensions: Vec<String>,
    case: SidecarCase,
}

impl SidecarPolicy {
    pub fn new(extensions: Vec<String>, case: SidecarCase) -> Self {
        Self { extensions, case }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.raw_extensions.clone(), settings.sidecar_case)
    }

    /// Candidate sidecar paths for `image`. With exact matching these may not exist.
    pub fn sidecars_for(&self, image: &Path) -> Vec<PathBuf> {
        let exact: Vec<PathBuf> = self
            .extensions
            .iter()
            .map(|ext| image.with_extension(ext))
            .filter(|candidate| candidate != image)
            .collect();

        if self.case == SidecarCase::Exact {
            return exact;
        }

        let (Some(folder), Some(stem)) = (image.parent(), image.file_stem()) else {
            return exact;
        };
        let entries = match fs::read_dir(folder) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("⚠️  Can't list {} for sidecars: {}", folder.display(), e);
                return exact;
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.as_path() != image && path.file_stem() == Some(stem))
            .filter(|path| {
                path.extension()
                    .map(|ext| ext.to_string_lossy())
                    .is_some_and(|ext| {
                        self.extensions
                            .iter()
                            .any(|allowed| allowed.eq_ignore_ascii_case(&ext))
                    })
            })
            .collect()
    }
}

enum Removal {
    Removed,
    Missing,
    Failed,
}

fn remove(path: &Path) -> Removal {
    match fs::remove_file(path) {
        Ok(()) => Removal::Removed,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Removal::Missing,
        Err(e) => {
            warn!("⚠️  Could not delete {}: {}", path.display(), e);
            Removal::Failed
        }
    }
}

/// Deletes every image marked DELETE, its raw sidecars and its record.
///
/// Best effort and irreversible: a file that can't be removed is counted
/// and the batch carries on. Storage errors abort the run.
pub struct DiscardExecutor<'a> {
    store: &'a RecordStore,
    sidecars: &'a SidecarPolicy,
}

impl<'a> DiscardExecutor<'a> {
    pub fn new(store: &'a RecordStore, sidecars: &'a SidecarPolicy) -> Self {
        Self { store, sidecars }
    }

    /// Discard the marked records of `folder` (or of every folder, per `scope`)
    pub fn run(&self, scope: DiscardScope, folder: &str) -> Result<DiscardReport> {
        let marked = self.store.marked_for_delete(scope, folder)?;
        let mut report = DiscardReport::default();

        for record in &marked {
            let image = Path::new(&record.folder).join(&record.filename);

            match remove(&image) {
                Removal::Removed => report.deleted += 1,
                Removal::Missing => report.skipped += 1,
                Removal::Failed => report.failed += 1,
            }

            for sidecar in self.sidecars.sidecars_for(&image) {
                if let Removal::Removed = remove(&sidecar) {
                    report.sidecars += 1;
                }
            }

            self.store.delete(&record.folder, &record.filename)?;
        }

        info!(
            "🗑️  Discard complete: {} deleted, {} already gone, {} failed, {} sidecars",
            report.deleted, report.skipped, report.failed, report.sidecars
        );
        Ok(report)
    }

    /// Like `run`, but only when exactly `confirmed` records are still marked
    pub fn run_confirmed(
        &self,
        scope: DiscardScope,
        folder: &str,
        confirmed: usize,
    ) -> Result<DiscardOutcome> {
        let marked = self.store.count_marked(scope, folder)?;
        if marked != confirmed {
            warn!("⚠️  {} files confirmed for discard but {} are marked", confirmed, marked);
            return Ok(DiscardOutcome::Changed(marked));
        }

        self.run(scope, folder).map(DiscardOutcome::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::catalog::folder_key;
    use crate::state::data::{DeleteAction, Rotation};

    fn exact_arw() -> SidecarPolicy {
        SidecarPolicy::new(vec!["ARW".to_string()], SidecarCase::Exact)
    }

    #[test]
    fn test_discard_removes_marked_image_sidecar_and_record() {
        let dir = tempfile::tempdir().unwrap();
        let folder = folder_key(dir.path());
        for name in ["a.jpg", "a.ARW", "b.jpg", "b.ARW"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let store = RecordStore::open_in_memory().unwrap();
        store.ensure(&folder, &["a.jpg", "b.jpg"]).unwrap();
        store.update(&folder, "a.jpg", DeleteAction::Delete, Rotation::NONE).unwrap();
        store.update(&folder, "b.jpg", DeleteAction::Keep, Rotation::NONE).unwrap();

        let policy = exact_arw();
        let report = DiscardExecutor::new(&store, &policy)
            .run(DiscardScope::Folder, &folder)
            .unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(report.sidecars, 1);
        assert_eq!(report.records(), 1);
        assert!(!dir.path().join("a.jpg").exists());
        assert!(!dir.path().join("a.ARW").exists());
        assert!(dir.path().join("b.jpg").exists());
        assert!(dir.path().join("b.ARW").exists());
        assert!(store.get(&folder, "a.jpg").is_err());
        assert_eq!(store.get(&folder, "b.jpg").unwrap().delete_action, DeleteAction::Keep);
    }

    #[test]
    fn test_missing_image_still_clears_record() {
        let dir = tempfile::tempdir().unwrap();
        let folder = folder_key(dir.path());
        let store = RecordStore::open_in_memory().unwrap();
        store.ensure(&folder, &["gone.jpg"]).unwrap();
        store.update(&folder, "gone.jpg", DeleteAction::Delete, Rotation::NONE).unwrap();

        let policy = exact_arw();
        let report = DiscardExecutor::new(&store, &policy)
            .run(DiscardScope::Folder, &folder)
            .unwrap();

        assert_eq!(report.deleted, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(store.count(&folder).unwrap(), 0);
    }

    #[test]
    fn test_failed_removal_does_not_abort_batch() {
        let dir = tempfile::tempdir().unwrap();
        let folder = folder_key(dir.path());
        // remove_file refuses directories
        fs::create_dir(dir.path().join("a.jpg")).unwrap();
        fs::write(dir.path().join("b.jpg"), b"x").unwrap();
        let store = RecordStore::open_in_memory().unwrap();
        store.ensure(&folder, &["a.jpg", "b.jpg"]).unwrap();
        store.update(&folder, "a.jpg", DeleteAction::Delete, Rotation::NONE).unwrap();
        store.update(&folder, "b.jpg", DeleteAction::Delete, Rotation::NONE).unwrap();

        let policy = exact_arw();
        let report = DiscardExecutor::new(&store, &policy)
            .run(DiscardScope::Folder, &folder)
            .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.deleted, 1);
        assert!(dir.path().join("a.jpg").is_dir());
        assert!(!dir.path().join("b.jpg").exists());
        assert_eq!(store.count(&folder).unwrap(), 0);
    }

    #[test]
    fn test_confirmed_count_must_still_match() {
        let dir = tempfile::tempdir().unwrap();
        let folder = folder_key(dir.path());
        for name in ["a.jpg", "b.jpg"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let store = RecordStore::open_in_memory().unwrap();
        store.ensure(&folder, &["a.jpg", "b.jpg"]).unwrap();
        store.update(&folder, "a.jpg", DeleteAction::Delete, Rotation::NONE).unwrap();
        let confirmed = store.count_marked(DiscardScope::Folder, &folder).unwrap();

        store.update(&folder, "b.jpg", DeleteAction::Delete, Rotation::NONE).unwrap();

        let policy = exact_arw();
        let executor = DiscardExecutor::new(&store, &policy);
        let outcome = executor
            .run_confirmed(DiscardScope::Folder, &folder, confirmed)
            .unwrap();
        assert_eq!(outcome, DiscardOutcome::Changed(2));
        assert!(dir.path().join("a.jpg").exists());
        assert!(dir.path().join("b.jpg").exists());
        assert_eq!(store.count(&folder).unwrap(), 2);

        let outcome = executor.run_confirmed(DiscardScope::Folder, &folder, 2).unwrap();
        let DiscardOutcome::Done(report) = outcome else {
            panic!("expected the discard to run, got {:?}", outcome);
        };
        assert_eq!(report.deleted, 2);
        assert_eq!(store.count(&folder).unwrap(), 0);
    }

    #[test]
    fn test_exact_case_leaves_lowercase_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let folder = folder_key(dir.path());
        fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        fs::write(dir.path().join("a.arw"), b"x").unwrap();
        let store = RecordStore::open_in_memory().unwrap();
        store.ensure(&folder, &["a.jpg"]).unwrap();
        store.update(&folder, "a.jpg", DeleteAction::Delete, Rotation::NONE).unwrap();

        let policy = exact_arw();
        let report = DiscardExecutor::new(&store, &policy)
            .run(DiscardScope::Folder, &folder)
            .unwrap();

        assert_eq!(report.sidecars, 0);
        assert!(dir.path().join("a.arw").exists());
    }

    #[test]
    fn test_any_case_matches_lowercase_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.JPG", "a.arw", "ab.arw"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let policy = SidecarPolicy::new(vec!["ARW".to_string()], SidecarCase::Any);
        let sidecars = policy.sidecars_for(&dir.path().join("a.JPG"));
        assert_eq!(sidecars, vec![dir.path().join("a.arw")]);
    }

    #[test]
    fn test_scope_limits_discard_to_folder() {
        let one = tempfile::tempdir().unwrap();
        let two = tempfile::tempdir().unwrap();
        fs::write(one.path().join("a.jpg"), b"x").unwrap();
        fs::write(two.path().join("b.jpg"), b"x").unwrap();
        let (key_one, key_two) = (folder_key(one.path()), folder_key(two.path()));

        let store = RecordStore::open_in_memory().unwrap();
        store.ensure(&key_one, &["a.jpg"]).unwrap();
        store.ensure(&key_two, &["b.jpg"]).unwrap();
        store.update(&key_one, "a.jpg", DeleteAction::Delete, Rotation::NONE).unwrap();
        store.update(&key_two, "b.jpg", DeleteAction::Delete, Rotation::NONE).unwrap();

        let policy = exact_arw();
        let executor = DiscardExecutor::new(&store, &policy);

        let report = executor.run(DiscardScope::Folder, &key_one).unwrap();
        assert_eq!(report.deleted, 1);
        assert!(two.path().join("b.jpg").exists());

        let report = executor.run(DiscardScope::All, &key_one).unwrap();
        assert_eq!(report.deleted, 1);
        assert!(!two.path().join("b.jpg").exists());
    }

    #[test]
    fn test_unset_is_never_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let folder = folder_key(dir.path());
        fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        let store = RecordStore::open_in_memory().unwrap();
        store.ensure(&folder, &["a.jpg"]).unwrap();

        let policy = exact_arw();
        let report = DiscardExecutor::new(&store, &policy)
            .run(DiscardScope::Folder, &folder)
            .unwrap();

        assert_eq!(report, DiscardReport::default());
        assert!(dir.path().join("a.jpg").exists());
    }
}
