//! Persistence of references, reference images and measurement output.

use image::ImageError;
use shared::config_storage::ConfigStorage;
use shared::filter_channel::{CapturePlane, FilterChannel};
use shared::focal_reference::FocalReference;
use shared::image_proc::{load_rgb_frame, save_rgb_frame, RgbFrame};
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::analysis::PlaneCapture;
use super::run::MeasurementRun;
use super::table::write_sections;

/// Side length of the black frame written for a failed capture
pub const BLANK_FRAME_SIZE: usize = 1080;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image error at {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: ImageError,
    },

    #[error("table error at {}: {source}", path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn image(path: &Path, source: ImageError) -> Self {
        StoreError::Image {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Reference persistence used by the acquisition sequencer.
pub trait MeasurementStore {
    /// Stored reference, or `None` if no reference has been captured.
    fn load_reference(&self) -> Result<Option<FocalReference>, StoreError>;

    /// Replace the stored reference. Returns where it was written.
    fn save_reference(&mut self, reference: &FocalReference) -> Result<PathBuf, StoreError>;

    /// Discard reference images of a previous capture.
    fn prepare_reference_images(&mut self) -> Result<(), StoreError>;

    fn save_reference_frame(
        &mut self,
        channel: FilterChannel,
        frame: &RgbFrame,
    ) -> Result<PathBuf, StoreError>;
}

/// Store backed by the bench data directory.
#[derive(Debug, Clone, Default)]
pub struct FileStore {
    storage: ConfigStorage,
}

impl FileStore {
    pub fn new(storage: ConfigStorage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &ConfigStorage {
        &self.storage
    }

    /// Load a saved reference image.
    pub fn load_reference_frame(&self, channel: FilterChannel) -> Result<RgbFrame, StoreError> {
        let path = self.storage.reference_image_path(channel);
        load_rgb_frame(&path).map_err(|e| StoreError::image(&path, e))
    }
}

impl MeasurementStore for FileStore {
    fn load_reference(&self) -> Result<Option<FocalReference>, StoreError> {
        self.storage
            .get_reference()
            .transpose()
            .map_err(|e| StoreError::io(&self.storage.reference_dir(), e))
    }

    fn save_reference(&mut self, reference: &FocalReference) -> Result<PathBuf, StoreError> {
        self.storage
            .save_reference(reference)
            .map_err(|e| StoreError::io(&self.storage.reference_dir(), e))
    }

    fn prepare_reference_images(&mut self) -> Result<(), StoreError> {
        let removed = self
            .storage
            .clear_reference_dir()
            .map_err(|e| StoreError::io(&self.storage.reference_dir(), e))?;
        if removed > 0 {
            info!("Removed {removed} previous reference images");
        }
        Ok(())
    }

    fn save_reference_frame(
        &mut self,
        channel: FilterChannel,
        frame: &RgbFrame,
    ) -> Result<PathBuf, StoreError> {
        let path = self.storage.reference_image_path(channel);
        save_rgb_frame(frame, &path).map_err(|e| StoreError::image(&path, e))?;
        Ok(path)
    }
}

/// Store holding everything in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    reference: Option<FocalReference>,
    frames: Vec<(FilterChannel, RgbFrame)>,
    reference_saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reference(reference: FocalReference) -> Self {
        Self {
            reference: Some(reference),
            ..Self::default()
        }
    }

    pub fn reference(&self) -> Option<&FocalReference> {
        self.reference.as_ref()
    }

    /// Reference frames saved since the last clear.
    pub fn reference_frames(&self) -> &[(FilterChannel, RgbFrame)] {
        &self.frames
    }

    pub fn reference_saves(&self) -> usize {
        self.reference_saves
    }
}

impl MeasurementStore for MemoryStore {
    fn load_reference(&self) -> Result<Option<FocalReference>, StoreError> {
        Ok(self.reference)
    }

    fn save_reference(&mut self, reference: &FocalReference) -> Result<PathBuf, StoreError> {
        self.reference = Some(*reference);
        self.reference_saves += 1;
        Ok(PathBuf::from("memory://reference"))
    }

    fn prepare_reference_images(&mut self) -> Result<(), StoreError> {
        self.frames.clear();
        Ok(())
    }

    fn save_reference_frame(
        &mut self,
        channel: FilterChannel,
        frame: &RgbFrame,
    ) -> Result<PathBuf, StoreError> {
        self.frames.push((channel, frame.clone()));
        Ok(PathBuf::from(format!("memory://reference/{}", channel.code())))
    }
}

/// `z{1|2}_{w|r|g|b}.jpg`
pub fn image_file_name(plane: CapturePlane, channel: FilterChannel) -> String {
    format!("{plane}_{}.jpg", channel.code())
}

/// `focal_z1_{z1:.2}_z2_{z2:.2}.csv`
pub fn table_file_name(z1: f64, z2: f64) -> String {
    format!("focal_z1_{z1:.2}_z2_{z2:.2}.csv")
}

/// Files written by [`save_measurement`].
#[derive(Debug, Clone, PartialEq)]
pub struct SavedMeasurement {
    pub dir: PathBuf,
    pub images: Vec<PathBuf>,
    pub table: PathBuf,
}

/// Write the eight plane images into `dir`.
///
/// A filter without a captured frame is written as a black frame.
pub fn save_frames(run: &MeasurementRun, dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let (height, width) = [&run.z1, &run.z2]
        .into_iter()
        .flat_map(|plane| {
            FilterChannel::ALL
                .into_iter()
                .filter_map(move |c| plane.frame(c))
        })
        .map(|frame| (frame.height(), frame.width()))
        .next()
        .unwrap_or((BLANK_FRAME_SIZE, BLANK_FRAME_SIZE));
    let blank = RgbFrame::zeros(height, width);

    let mut written = Vec::with_capacity(8);
    for plane in [&run.z1, &run.z2] {
        for channel in FilterChannel::ALL {
            let path = dir.join(image_file_name(plane.plane, channel));
            let frame = plane.frame(channel).unwrap_or_else(|| {
                warn!("No {} frame at {}, writing a blank image", channel, plane.plane);
                &blank
            });
            save_rgb_frame(frame, &path).map_err(|e| StoreError::image(&path, e))?;
            written.push(path);
        }
    }

    Ok(written)
}

/// Write the per-filter result tables into `dir` as one sectioned CSV file.
pub fn save_tables(run: &MeasurementRun, dir: &Path) -> Result<PathBuf, StoreError> {
    let path = dir.join(table_file_name(run.z1.position_mm, run.z2.position_mm));
    let file = File::create(&path).map_err(|e| StoreError::io(&path, e))?;

    let sections: Vec<(String, _)> = run
        .reports
        .iter()
        .map(|report| (report.channel.section_name(), &report.table))
        .collect();
    write_sections(file, &sections).map_err(|source| StoreError::Table {
        path: path.clone(),
        source,
    })?;

    Ok(path)
}

/// Save images and tables of a run into `dir`, creating it if needed.
pub fn save_measurement(run: &MeasurementRun, dir: &Path) -> Result<SavedMeasurement, StoreError> {
    std::fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    let images = save_frames(run, dir)?;
    let table = save_tables(run, dir)?;
    info!(
        "Saved {} images and {} to {}",
        images.len(),
        table.display(),
        dir.display()
    );

    Ok(SavedMeasurement {
        dir: dir.to_path_buf(),
        images,
        table,
    })
}

/// Load the saved images of one plane. Unreadable images are left empty.
pub fn load_plane(dir: &Path, plane: CapturePlane, position_mm: f64) -> PlaneCapture {
    let mut capture = PlaneCapture::new(plane, position_mm);
    for channel in FilterChannel::ALL {
        let path = dir.join(image_file_name(plane, channel));
        match load_rgb_frame(&path) {
            Ok(frame) => capture.set_frame(channel, frame),
            Err(e) => warn!("Skipping {}: {e}", path.display()),
        }
    }
    capture
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focal_measurement::analysis::measure_distances;
    use crate::focal_measurement::focal::Mode;
    use crate::focal_measurement::test_support::grid_frame;
    use chrono::Local;
    use shared::focal_reference::DistanceVector;
    use shared::image_proc::DetectionConfig;
    use tempfile::TempDir;

    fn sample_run(missing: Option<FilterChannel>) -> MeasurementRun {
        let mut z1 = PlaneCapture::new(CapturePlane::Z1, 10.0);
        let mut z2 = PlaneCapture::new(CapturePlane::Z2, 20.0);
        for channel in FilterChannel::ALL {
            if Some(channel) != missing {
                z1.set_frame(channel, grid_frame(48));
            }
            z2.set_frame(channel, grid_frame(32));
        }

        let y0 = measure_distances(&grid_frame(40), &DetectionConfig::default()).unwrap();
        let reference = FocalReference::new([y0; 4]);
        MeasurementRun::analyze(
            &reference,
            z1,
            z2,
            Mode::One,
            &DetectionConfig::default(),
            Local::now(),
        )
    }

    #[test]
    fn test_file_names() {
        assert_eq!(image_file_name(CapturePlane::Z2, FilterChannel::Red), "z2_r.jpg");
        assert_eq!(table_file_name(10.0, 22.456), "focal_z1_10.00_z2_22.46.csv");
    }

    #[test]
    fn test_save_measurement_with_failed_filter() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("run");
        let run = sample_run(Some(FilterChannel::Green));

        let saved = save_measurement(&run, &dir).unwrap();

        assert_eq!(saved.images.len(), 8);
        assert!(saved.images.iter().all(|p| p.exists()));
        assert!(saved.table.ends_with("focal_z1_10.00_z2_20.00.csv"));

        let blank = load_rgb_frame(dir.join("z1_g.jpg")).unwrap();
        assert_eq!((blank.height(), blank.width()), (160, 160));

        let text = std::fs::read_to_string(&saved.table).unwrap();
        let sections: Vec<&str> = text
            .lines()
            .filter(|line| line.starts_with("Filter_"))
            .collect();
        assert_eq!(sections, ["Filter_W", "Filter_R", "Filter_G", "Filter_B"]);
        let lines: Vec<&str> = text.lines().collect();
        let green = lines.iter().position(|l| *l == "Filter_G").unwrap();
        assert_eq!(lines[green + 1], "Error");
        assert_eq!(lines[green + 2], "no frame captured at z1");
    }

    #[test]
    fn test_save_measurement_without_any_frames() {
        let temp_dir = TempDir::new().unwrap();
        let reference = FocalReference::new([DistanceVector([9.0; 8]); 4]);
        let run = MeasurementRun::analyze(
            &reference,
            PlaneCapture::new(CapturePlane::Z1, 10.0),
            PlaneCapture::new(CapturePlane::Z2, 20.0),
            Mode::Two,
            &DetectionConfig::default(),
            Local::now(),
        );
        assert_eq!(run.successes(), 0);

        let saved = save_measurement(&run, temp_dir.path()).unwrap();

        assert_eq!(saved.images.len(), 8);
        for path in &saved.images {
            let blank = load_rgb_frame(path).unwrap();
            assert_eq!((blank.height(), blank.width()), (BLANK_FRAME_SIZE, BLANK_FRAME_SIZE));
        }

        let text = std::fs::read_to_string(&saved.table).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        for channel in FilterChannel::ALL {
            let section = lines
                .iter()
                .position(|l| *l == channel.section_name())
                .unwrap();
            assert_eq!(lines[section + 1], "Error");
        }
        assert_eq!(lines.iter().filter(|l| **l == "Error").count(), 4);
    }

    #[test]
    fn test_saved_images_reload_for_analysis() {
        let temp_dir = TempDir::new().unwrap();
        let run = sample_run(None);
        save_measurement(&run, temp_dir.path()).unwrap();

        let z1 = load_plane(temp_dir.path(), CapturePlane::Z1, 10.0);
        assert_eq!(z1.captured(), 4);

        let missing = load_plane(&temp_dir.path().join("absent"), CapturePlane::Z2, 20.0);
        assert_eq!(missing.captured(), 0);
    }

    #[test]
    fn test_file_store_reference_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = FileStore::new(ConfigStorage::with_path(temp_dir.path().to_path_buf()));
        assert_eq!(store.load_reference().unwrap(), None);

        store.prepare_reference_images().unwrap();
        let frame = grid_frame(40);
        let path = store.save_reference_frame(FilterChannel::Blue, &frame).unwrap();
        assert!(path.ends_with("reference/b.png"));
        assert_eq!(store.load_reference_frame(FilterChannel::Blue).unwrap(), frame);

        let reference = FocalReference::new([DistanceVector([9.0; 8]); 4]);
        store.save_reference(&reference).unwrap();
        assert_eq!(store.load_reference().unwrap(), Some(reference));

        store.prepare_reference_images().unwrap();
        assert!(store.load_reference_frame(FilterChannel::Blue).is_err());
        assert_eq!(store.load_reference().unwrap(), Some(reference));
    }

    #[test]
    fn test_corrupt_reference_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(ConfigStorage::with_path(temp_dir.path().to_path_buf()));
        std::fs::create_dir_all(store.storage().reference_dir()).unwrap();
        std::fs::write(store.storage().reference_dir().join("reference.json"), "[1, 2]").unwrap();

        assert!(matches!(store.load_reference(), Err(StoreError::Io { .. })));
    }
}
