//! Storage layout for bench reference data and measurement folders.
//!
//! Everything lives under a single root directory (`./data` by default):
//!
//! ```text
//! data/
//!   reference/
//!     reference.json        4x8 reference distances
//!     w.png r.png g.png b.png
//!   measurement_z1_10.0_z2_20.0_20250101_120000/
//!     z1_w.jpg ... z2_b.jpg
//!     focal_z1_10.00_z2_20.00.csv
//! ```

use crate::filter_channel::FilterChannel;
use crate::focal_reference::FocalReference;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default root directory, relative to the working directory
pub const DEFAULT_ROOT: &str = "data";

/// Storage manager for reference data and measurement output.
#[derive(Debug, Clone)]
pub struct ConfigStorage {
    /// Root directory for all bench data
    root_path: PathBuf,
}

impl ConfigStorage {
    /// Create a new storage rooted at `./data`
    pub fn new() -> Self {
        Self::with_path(PathBuf::from(DEFAULT_ROOT))
    }

    /// Create a new storage with custom root path
    pub fn with_path(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Get the root path
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Directory holding the reference distances and reference images
    pub fn reference_dir(&self) -> PathBuf {
        self.root_path.join("reference")
    }

    fn reference_path(&self) -> PathBuf {
        self.reference_dir().join("reference.json")
    }

    /// Path of the reference image for one filter, e.g. `reference/w.png`
    pub fn reference_image_path(&self, channel: FilterChannel) -> PathBuf {
        self.reference_dir().join(format!("{}.png", channel.code()))
    }

    /// Get the stored reference.
    ///
    /// Returns None if no reference exists.
    /// Returns Some(Err) if the file exists but cannot be loaded.
    pub fn get_reference(&self) -> Option<Result<FocalReference, std::io::Error>> {
        let path = self.reference_path();

        if !path.exists() {
            return None;
        }

        Some(FocalReference::load_from_file(&path))
    }

    /// Save the reference, replacing any previous one.
    ///
    /// Creates the reference directory if it doesn't exist.
    /// Returns the path where the reference was saved.
    pub fn save_reference(&self, reference: &FocalReference) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(self.reference_dir())?;

        let path = self.reference_path();
        reference.save_to_file(&path)?;
        info!("Saved reference to {}", path.display());
        Ok(path)
    }

    /// Remove the reference images, creating the directory if needed.
    ///
    /// `reference.json` and sub-directories are left alone, so the stored
    /// reference survives until a complete capture replaces it.
    /// Returns the number of files removed.
    pub fn clear_reference_dir(&self) -> std::io::Result<usize> {
        let dir = self.reference_dir();
        std::fs::create_dir_all(&dir)?;

        let reference = self.reference_path();
        let mut removed = 0;
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() && path != reference {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }

        Ok(removed)
    }

    /// Path of a measurement folder with the given name
    pub fn measurement_dir(&self, name: &str) -> PathBuf {
        self.root_path.join(name)
    }
}

impl Default for ConfigStorage {
    fn default() -> Self {
        Self::new()
    }
}
