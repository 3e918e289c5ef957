use log::{debug, info};
use std::path::{Path, PathBuf};

use super::annotation::AnnotationController;
use super::catalog::{folder_key, Catalog, CatalogEntry};
use super::error::Result;
use super::store::RecordStore;

/// Cursor over the catalog of the open folder: `(page, active_index)`.
///
/// Every transition persists the record under the old cursor before the
/// cursor changes, then loads the persisted state of the new active record
/// into the AnnotationController.
#[derive(Debug, Default)]
pub struct Navigator {
    folder: Option<PathBuf>,
    page: usize,
    active_index: Option<usize>,
    items: Vec<CatalogEntry>,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to `folder`, resetting the cursor to (0, 0)
    pub fn open(
        &mut self,
        folder: PathBuf,
        catalog: &Catalog,
        store: &RecordStore,
        annotation: &mut AnnotationController,
    ) -> Result<()> {
        self.save(store, annotation)?;

        let items = catalog.open(store, &folder, 0)?;
        info!("📂 Opened {} ({} images on first page)", folder.display(), items.len());

        self.active_index = if items.is_empty() { None } else { Some(0) };
        self.items = items;
        self.page = 0;
        self.folder = Some(folder);
        self.load_active(store, annotation)
    }

    /// Re-read the current page without persisting anything.
    ///
    /// Used after records were removed underneath the cursor (discard).
    /// The cursor is clamped to what still exists.
    pub fn reload(
        &mut self,
        catalog: &Catalog,
        store: &RecordStore,
        annotation: &mut AnnotationController,
    ) -> Result<()> {
        let Some(folder) = self.folder.as_deref() else {
            return Ok(());
        };

        let pages = catalog.page_count(store, folder)?;
        let page = self.page.min(pages.saturating_sub(1));
        let items = catalog.open(store, folder, page)?;

        self.active_index = match (self.active_index, items.len()) {
            (_, 0) => None,
            (Some(index), len) => Some(index.min(len - 1)),
            (None, _) => Some(0),
        };
        self.items = items;
        self.page = page;
        self.load_active(store, annotation)
    }

    /// Persist the active record and refresh its marker in the listing
    pub fn save(&mut self, store: &RecordStore, annotation: &AnnotationController) -> Result<()> {
        let (Some(folder), Some(index)) = (self.folder.as_deref(), self.active_index) else {
            return Ok(());
        };

        let entry = &mut self.items[index];
        annotation.save(store, &folder_key(folder), &entry.filename)?;
        entry.delete_action = annotation.delete_action();
        Ok(())
    }

    /// Advance one image, crossing into the next page at the end of this one.
    /// On the last image of the last page the cursor stays put.
    /// Returns whether the cursor moved.
    pub fn next(
        &mut self,
        catalog: &Catalog,
        store: &RecordStore,
        annotation: &mut AnnotationController,
    ) -> Result<bool> {
        let (Some(folder), Some(index)) = (self.folder.clone(), self.active_index) else {
            return Ok(false);
        };

        self.save(store, annotation)?;

        if index + 1 < self.items.len() {
            self.active_index = Some(index + 1);
        } else {
            let items = catalog.open(store, &folder, self.page + 1)?;
            if items.is_empty() {
                debug!("Already at the last image of {}", folder.display());
                return Ok(false);
            }
            self.page += 1;
            self.items = items;
            self.active_index = Some(0);
        }

        self.load_active(store, annotation)?;
        Ok(true)
    }

    /// Step back one image, crossing into the previous page at index 0.
    /// Does nothing on the first image of the first page.
    /// Returns whether the cursor moved.
    pub fn previous(
        &mut self,
        catalog: &Catalog,
        store: &RecordStore,
        annotation: &mut AnnotationController,
    ) -> Result<bool> {
        let (Some(folder), Some(index)) = (self.folder.clone(), self.active_index) else {
            return Ok(false);
        };
        if index == 0 && self.page == 0 {
            return Ok(false);
        }

        self.save(store, annotation)?;

        if index > 0 {
            self.active_index = Some(index - 1);
        } else {
            let items = catalog.open(store, &folder, self.page - 1)?;
            if items.is_empty() {
                return Ok(false);
            }
            self.page -= 1;
            self.active_index = Some(items.len() - 1);
            self.items = items;
        }

        self.load_active(store, annotation)?;
        Ok(true)
    }

    /// Make `filename` on the current page active. Unknown names are ignored.
    pub fn jump(
        &mut self,
        filename: &str,
        store: &RecordStore,
        annotation: &mut AnnotationController,
    ) -> Result<bool> {
        let Some(position) = self.items.iter().position(|entry| entry.filename == filename) else {
            return Ok(false);
        };

        self.save(store, annotation)?;
        self.active_index = Some(position);
        self.load_active(store, annotation)?;
        Ok(true)
    }

    fn load_active(&self, store: &RecordStore, annotation: &mut AnnotationController) -> Result<()> {
        match (self.folder.as_deref(), self.active()) {
            (Some(folder), Some(entry)) => {
                let record = store.get(&folder_key(folder), &entry.filename)?;
                annotation.load_for(&record);
            }
            _ => annotation.clear(),
        }
        Ok(())
    }

    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active_index
    }

    pub fn active(&self) -> Option<&CatalogEntry> {
        self.active_index.and_then(|index| self.items.get(index))
    }

    /// Entries of the current page
    pub fn items(&self) -> &[CatalogEntry] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::annotation::RotateOutcome;
    use crate::state::data::DeleteAction;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        catalog: Catalog,
        store: RecordStore,
        annotation: AnnotationController,
        navigator: Navigator,
    }

    impl Fixture {
        fn with_images(count: usize, page_size: usize) -> Self {
            let dir = tempfile::tempdir().unwrap();
            for i in 0..count {
                fs::write(dir.path().join(format!("img_{:03}.jpg", i)), b"").unwrap();
            }
            let mut fixture = Fixture {
                dir,
                catalog: Catalog::new(page_size, vec!["jpg".to_string()]),
                store: RecordStore::open_in_memory().unwrap(),
                annotation: AnnotationController::new(),
                navigator: Navigator::new(),
            };
            let folder = fixture.dir.path().to_path_buf();
            fixture
                .navigator
                .open(folder, &fixture.catalog, &fixture.store, &mut fixture.annotation)
                .unwrap();
            fixture
        }

        fn next(&mut self) -> bool {
            self.navigator
                .next(&self.catalog, &self.store, &mut self.annotation)
                .unwrap()
        }

        fn previous(&mut self) -> bool {
            self.navigator
                .previous(&self.catalog, &self.store, &mut self.annotation)
                .unwrap()
        }

        fn cursor(&self) -> (usize, Option<usize>) {
            (self.navigator.page(), self.navigator.active_index())
        }

        fn active_name(&self) -> String {
            self.navigator.active().unwrap().filename.clone()
        }

        fn stored(&self, filename: &str) -> crate::state::data::FileRecord {
            self.store
                .get(&folder_key(self.dir.path()), filename)
                .unwrap()
        }
    }

    #[test]
    fn test_open_starts_at_first_image() {
        let fixture = Fixture::with_images(3, 25);
        assert_eq!(fixture.cursor(), (0, Some(0)));
        assert_eq!(fixture.active_name(), "img_000.jpg");
        assert!(fixture.annotation.is_loaded());
    }

    #[test]
    fn test_crossing_page_boundaries() {
        let mut fixture = Fixture::with_images(30, 25);

        for _ in 0..25 {
            assert!(fixture.next());
        }
        assert_eq!(fixture.cursor(), (1, Some(0)));
        assert_eq!(fixture.active_name(), "img_025.jpg");
        assert_eq!(fixture.navigator.items().len(), 5);

        assert!(fixture.previous());
        assert_eq!(fixture.cursor(), (0, Some(24)));
        assert_eq!(fixture.active_name(), "img_024.jpg");
    }

    #[test]
    fn test_next_stays_on_last_image() {
        let mut fixture = Fixture::with_images(4, 2);
        for _ in 0..3 {
            assert!(fixture.next());
        }
        assert_eq!(fixture.cursor(), (1, Some(1)));

        assert!(!fixture.next());
        assert_eq!(fixture.cursor(), (1, Some(1)));
        assert_eq!(fixture.active_name(), "img_003.jpg");
    }

    #[test]
    fn test_previous_on_first_image_is_noop() {
        let mut fixture = Fixture::with_images(3, 25);
        fixture.annotation.set_delete_action(DeleteAction::Delete);

        assert!(!fixture.previous());
        assert_eq!(fixture.cursor(), (0, Some(0)));
        assert_eq!(fixture.stored("img_000.jpg").delete_action, DeleteAction::Unset);
    }

    #[test]
    fn test_state_is_saved_before_moving() {
        let mut fixture = Fixture::with_images(3, 25);
        fixture.annotation.set_delete_action(DeleteAction::Delete);
        if let RotateOutcome::Applied(generation) = fixture.annotation.rotate(90) {
            fixture.annotation.settle(generation);
        }

        assert!(fixture.next());
        let saved = fixture.stored("img_000.jpg");
        assert_eq!(saved.delete_action, DeleteAction::Delete);
        assert_eq!(saved.rotation.degrees(), 90);

        // The newly active record's own state is what got loaded
        assert_eq!(fixture.annotation.delete_action(), DeleteAction::Unset);
        assert_eq!(fixture.annotation.rotation().degrees(), 0);

        // Listing marker for the file just left is refreshed
        assert_eq!(fixture.navigator.items()[0].delete_action, DeleteAction::Delete);

        assert!(fixture.previous());
        assert_eq!(fixture.annotation.delete_action(), DeleteAction::Delete);
        assert_eq!(fixture.annotation.rotation().degrees(), 90);
    }

    #[test]
    fn test_jump_saves_and_loads() {
        let mut fixture = Fixture::with_images(5, 25);
        fixture.annotation.set_delete_action(DeleteAction::Keep);

        assert!(fixture
            .navigator
            .jump("img_003.jpg", &fixture.store, &mut fixture.annotation)
            .unwrap());
        assert_eq!(fixture.cursor(), (0, Some(3)));
        assert_eq!(fixture.stored("img_000.jpg").delete_action, DeleteAction::Keep);

        assert!(!fixture
            .navigator
            .jump("missing.jpg", &fixture.store, &mut fixture.annotation)
            .unwrap());
        assert_eq!(fixture.cursor(), (0, Some(3)));
    }

    #[test]
    fn test_empty_folder_has_nothing_active() {
        let mut fixture = Fixture::with_images(0, 25);
        assert_eq!(fixture.cursor(), (0, None));
        assert!(fixture.navigator.active().is_none());
        assert!(!fixture.annotation.is_loaded());

        assert!(!fixture.next());
        assert!(!fixture.previous());
        assert!(!fixture
            .navigator
            .jump("img_000.jpg", &fixture.store, &mut fixture.annotation)
            .unwrap());
    }

    #[test]
    fn test_opening_another_folder_saves_and_resets() {
        let mut fixture = Fixture::with_images(3, 2);
        fixture.next();
        fixture.next();
        fixture.annotation.set_delete_action(DeleteAction::Delete);

        let other = tempfile::tempdir().unwrap();
        fs::write(other.path().join("x.jpg"), b"").unwrap();
        fixture
            .navigator
            .open(
                other.path().to_path_buf(),
                &fixture.catalog,
                &fixture.store,
                &mut fixture.annotation,
            )
            .unwrap();

        assert_eq!(fixture.stored("img_002.jpg").delete_action, DeleteAction::Delete);
        assert_eq!(fixture.cursor(), (0, Some(0)));
        assert_eq!(fixture.active_name(), "x.jpg");
    }

    #[test]
    fn test_reload_clamps_after_records_vanish() {
        let mut fixture = Fixture::with_images(3, 2);
        fixture.next();
        fixture.next();
        assert_eq!(fixture.cursor(), (1, Some(0)));

        let key = folder_key(fixture.dir.path());
        fs::remove_file(fixture.dir.path().join("img_002.jpg")).unwrap();
        fixture.store.delete(&key, "img_002.jpg").unwrap();

        fixture
            .navigator
            .reload(&fixture.catalog, &fixture.store, &mut fixture.annotation)
            .unwrap();
        assert_eq!(fixture.cursor(), (0, Some(0)));
        assert_eq!(fixture.active_name(), "img_000.jpg");
    }
}
