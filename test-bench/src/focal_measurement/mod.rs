//! Focal length measurement on the lens bench.
//!
//! A measurement images the 3x3 spot grid through four color filters at a
//! reference plane and at two axial planes. Spot distances to the grid centre
//! at the three planes give the focal length of the lens under test.
//!
//! - **config**: timing and illumination settings
//! - **analysis**: frame to distance vector to per-filter focal result
//! - **focal**: focal length formulas and measurement modes
//! - **table**: fixed-schema result tables
//! - **run**: results of a complete two-plane measurement
//! - **sequencer**: drives hardware and camera through reference and measurement runs
//! - **store**: reference persistence, image and table output

pub mod analysis;
pub mod config;
pub mod focal;
pub mod run;
pub mod sequencer;
pub mod store;
pub mod table;

pub use analysis::{
    analyze_filter, analyze_planes, measure_distances, FilterFailure, FilterOutcome, FilterReport,
    MeasureError, PlaneCapture,
};
pub use config::AcquisitionConfig;
pub use focal::{compute_focal, round_to, FocalComputation, FocalError, FocalResult, Mode, Subset};
pub use run::{suggested_folder_name, MeasurementRun};
pub use sequencer::{
    AcquisitionError, AcquisitionSequencer, CancelHandle, ReferenceCapture, SequencerState,
};
pub use store::{
    load_plane, save_frames, save_measurement, save_tables, FileStore, MeasurementStore,
    MemoryStore, SavedMeasurement, StoreError,
};
pub use table::{ResultTable, TableRow};
