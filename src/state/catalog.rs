use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::data::DeleteAction;
use super::error::Result;
use super::settings::Settings;
use super::store::RecordStore;

/// One row of a catalog page
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub filename: String,
    /// Absolute path to the image file
    pub path: PathBuf,
    /// Decision as stored when the page was materialized
    pub delete_action: DeleteAction,
}

/// Key under which a folder's records are stored
pub fn folder_key(folder: &Path) -> String {
    folder.to_string_lossy().into_owned()
}

/// Paginated view of a folder's images, backed by the RecordStore.
#[derive(Debug, Clone)]
pub struct Catalog {
    page_size: usize,
    image_extensions: Vec<String>,
}

impl Catalog {
    pub fn new(page_size: usize, image_extensions: Vec<String>) -> Self {
        Self {
            page_size: page_size.max(1),
            image_extensions,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.page_size, settings.image_extensions.clone())
    }

    /// Check if a path has one of the image extensions (case-insensitive)
    fn is_image(&self, path: &Path) -> bool {
        match path.extension() {
            Some(extension) => {
                let ext = extension.to_string_lossy();
                self.image_extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(&ext))
            }
            None => false,
        }
    }

    /// Filenames of the images directly inside `folder`, sorted by name.
    /// Subdirectories are not descended into.
    pub fn scan(&self, folder: &Path) -> Result<Vec<String>> {
        let mut filenames = Vec::new();

        for entry in WalkDir::new(folder)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                // The folder itself can't be read
                Err(e) if e.depth() == 0 => return Err(std::io::Error::from(e).into()),
                Err(e) => {
                    warn!("⚠️  Skipping unreadable entry in {}: {}", folder.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.is_image(entry.path()) {
                continue;
            }

            match entry.file_name().to_str() {
                Some(name) => filenames.push(name.to_string()),
                None => warn!("⚠️  Skipping non UTF-8 filename: {}", entry.path().display()),
            }
        }

        Ok(filenames)
    }

    /// Seed records for any new images in `folder`, then return page `page`.
    ///
    /// An empty folder, or a page past the end, gives an empty list.
    pub fn open(&self, store: &RecordStore, folder: &Path, page: usize) -> Result<Vec<CatalogEntry>> {
        let key = folder_key(folder);
        let filenames = self.scan(folder)?;
        let seeded = store.ensure(&key, &filenames)?;
        if seeded > 0 {
            debug!("🔍 Found {} new images in {}", seeded, folder.display());
        }

        let records = store.page_records(&key, page * self.page_size, self.page_size)?;
        Ok(records
            .into_iter()
            .map(|record| CatalogEntry {
                path: folder.join(&record.filename),
                filename: record.filename,
                delete_action: record.delete_action,
            })
            .collect())
    }

    /// Number of pages the folder's records span (0 when it has none)
    pub fn page_count(&self, store: &RecordStore, folder: &Path) -> Result<usize> {
        let count = store.count(&folder_key(folder))?;
        Ok(count.div_ceil(self.page_size))
    }
}
