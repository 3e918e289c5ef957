/// Display copy of the active picture
///
/// The JPEG is decoded and scaled once per image (off the UI thread);
/// rotation is applied to the scaled copy whenever it changes.
use iced::widget::image::Handle;
use image::{imageops, imageops::FilterType, RgbaImage};
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::state::data::Rotation;

/// Decoded, display-sized picture
#[derive(Clone)]
pub struct Preview {
    pub path: PathBuf,
    image: Arc<RgbaImage>,
}

impl Preview {
    /// Copy of the picture turned counter-clockwise by `rotation`
    pub fn rotated(&self, rotation: Rotation) -> RgbaImage {
        match rotation.degrees() {
            90 => imageops::rotate270(self.image.as_ref()),
            180 => imageops::rotate180(self.image.as_ref()),
            270 => imageops::rotate90(self.image.as_ref()),
            _ => self.image.as_ref().clone(),
        }
    }

    /// iced image handle for the rotated picture
    pub fn handle(&self, rotation: Rotation) -> Handle {
        let rotated = self.rotated(rotation);
        Handle::from_rgba(rotated.width(), rotated.height(), rotated.into_raw())
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

impl std::fmt::Debug for Preview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preview")
            .field("path", &self.path)
            .field("dimensions", &self.dimensions())
            .finish()
    }
}

/// Load and scale a picture for display
pub async fn load_preview(path: PathBuf, height: u32) -> Result<Preview, String> {
    // Spawn blocking because decoding is CPU-intensive
    tokio::task::spawn_blocking(move || load_preview_blocking(&path, height))
        .await
        .map_err(|e| format!("Task join error: {}", e))?
}

/// Blocking version of preview loading
fn load_preview_blocking(path: &Path, height: u32) -> Result<Preview, String> {
    let decoded = image::open(path)
        .map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;

    // Only ever scale down
    let scaled = if decoded.height() > height {
        decoded.resize(u32::MAX, height, FilterType::Triangle)
    } else {
        decoded
    };

    debug!(
        "📸 Preview ready: {} ({}x{})",
        path.display(),
        scaled.width(),
        scaled.height()
    );

    Ok(Preview {
        path: path.to_path_buf(),
        image: Arc::new(scaled.to_rgba8()),
    })
}
