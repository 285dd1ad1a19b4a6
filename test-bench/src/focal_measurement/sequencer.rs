//! Acquisition sequencer
//!
//! Drives the bench through a reference capture or a two-plane measurement:
//!
//! ```text
//! Idle -> HomingReference -> PerFilterCapture(reference) -> Teardown -> Done
//! Idle -> AwaitPosition(z1) -> PerFilterCapture(z1)
//!      -> AwaitPosition(z2) -> PerFilterCapture(z2) -> Teardown -> Done
//! ```
//!
//! Each call blocks until the sequence finishes; run it on a worker thread and
//! stop it through a [`CancelHandle`]. Cancellation is honoured between filter
//! captures and while waiting for the stage. Whenever a sequence stops early the
//! illumination is switched off, the stage is sent home without waiting and the
//! white filter is selected.

use chrono::Local;
use hardware::BenchHardware;
use shared::camera_interface::CameraInterface;
use shared::filter_channel::{CapturePlane, FilterChannel};
use shared::focal_reference::{DistanceVector, FocalReference};
use shared::image_proc::DetectionConfig;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::analysis::{measure_distances, PlaneCapture};
use super::config::{secs, AcquisitionConfig};
use super::focal::Mode;
use super::run::MeasurementRun;
use super::store::{MeasurementStore, StoreError};

/// Run-level acquisition failure
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("no reference stored; capture a reference first")]
    ReferenceMissing,

    #[error("stage did not report {target_mm} mm within {timeout:?} (last report: {last_mm:?})")]
    PositionTimeout {
        target_mm: f64,
        timeout: Duration,
        last_mm: Option<f64>,
    },

    #[error("acquisition cancelled")]
    Cancelled,

    #[error("hardware error: {0}")]
    Hardware(String),

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("reference capture incomplete: {} of 4 filters failed", .failures.len())]
    ReferenceIncomplete {
        failures: Vec<(FilterChannel, String)>,
    },
}

/// Shared flag that asks a running sequence to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    HomingReference,
    AwaitPosition(CapturePlane),
    PerFilterCapture(CapturePlane),
    Teardown,
    Done,
}

impl fmt::Display for SequencerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequencerState::Idle => write!(f, "idle"),
            SequencerState::HomingReference => write!(f, "homing for reference"),
            SequencerState::AwaitPosition(plane) => write!(f, "awaiting position {plane}"),
            SequencerState::PerFilterCapture(plane) => write!(f, "capturing {plane}"),
            SequencerState::Teardown => write!(f, "teardown"),
            SequencerState::Done => write!(f, "done"),
        }
    }
}

/// A freshly captured and stored reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceCapture {
    pub reference: FocalReference,
    pub location: PathBuf,
}

/// Sequences bench hardware, camera and store through acquisition runs.
pub struct AcquisitionSequencer<B, C, S> {
    bench: B,
    camera: C,
    store: S,
    config: AcquisitionConfig,
    detection: DetectionConfig,
    state: SequencerState,
    cancel: CancelHandle,
}

impl<B, C, S> AcquisitionSequencer<B, C, S>
where
    B: BenchHardware,
    C: CameraInterface,
    S: MeasurementStore,
{
    pub fn new(
        bench: B,
        camera: C,
        store: S,
        config: AcquisitionConfig,
        detection: DetectionConfig,
    ) -> Self {
        Self {
            bench,
            camera,
            store,
            config,
            detection,
            state: SequencerState::Idle,
            cancel: CancelHandle::default(),
        }
    }

    /// Share an existing cancel flag, e.g. one already wired to a stop button.
    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle for cancelling from another thread. The flag is cleared when a run starts.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn bench(&self) -> &B {
        &self.bench
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_parts(self) -> (B, C, S) {
        (self.bench, self.camera, self.store)
    }

    /// Capture and store the reference distances of every filter at the home position.
    ///
    /// The stored reference is only replaced when all four filters produce a
    /// valid spot grid.
    pub fn run_reference(&mut self) -> Result<ReferenceCapture, AcquisitionError> {
        self.cancel.reset();
        info!("Starting reference capture");
        let outcome = self.capture_reference();
        self.finish(outcome)
    }

    /// Capture both planes and compute focal results for every filter.
    ///
    /// Positions are sorted so `z1` is the smaller one. Fails with
    /// [`AcquisitionError::ReferenceMissing`] before touching the hardware when no
    /// reference is stored. Per-filter failures are recorded in the returned run.
    pub fn run_measurement(
        &mut self,
        z1: f64,
        z2: f64,
        mode: Mode,
    ) -> Result<MeasurementRun, AcquisitionError> {
        self.cancel.reset();
        let (z1, z2) = if z1 <= z2 { (z1, z2) } else { (z2, z1) };

        let reference = self
            .store
            .load_reference()?
            .ok_or(AcquisitionError::ReferenceMissing)?;

        let started = Local::now();
        info!("Starting measurement at z1={z1} mm, z2={z2} mm, mode {mode}");
        let outcome = self.capture_planes(z1, z2);
        let (first, second) = self.finish(outcome)?;

        let run = MeasurementRun::analyze(&reference, first, second, mode, &self.detection, started);
        info!(
            "Measurement finished: {} of {} filters produced a result",
            run.successes(),
            run.reports.len()
        );
        Ok(run)
    }

    fn capture_reference(&mut self) -> Result<ReferenceCapture, AcquisitionError> {
        self.transition(SequencerState::HomingReference);
        let target = self.bench.move_to_absolute(0.0).map_err(hardware_error)?;
        self.wait_for_position(target)?;
        std::thread::sleep(secs(self.config.home_delay_secs));

        self.illuminate()?;
        std::thread::sleep(secs(self.config.warmup_secs));
        self.store.prepare_reference_images()?;

        self.transition(SequencerState::PerFilterCapture(CapturePlane::Reference));
        let mut vectors: [Option<DistanceVector>; 4] = [None; 4];
        let mut failures = Vec::new();

        for channel in FilterChannel::ALL {
            self.check_cancelled()?;
            self.select_filter(channel)?;
            std::thread::sleep(secs(self.config.reference_settle_secs));

            let frame = match self.camera.capture_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Reference capture failed for filter {channel}: {e}");
                    failures.push((channel, e.to_string()));
                    continue;
                }
            };
            let path = self.store.save_reference_frame(channel, &frame)?;
            debug!("Saved reference frame {}", path.display());

            match measure_distances(&frame, &self.detection) {
                Ok(distances) => vectors[channel.index()] = Some(distances),
                Err(e) => {
                    warn!("Reference detection failed for filter {channel}: {e}");
                    failures.push((channel, e.to_string()));
                }
            }
        }

        self.transition(SequencerState::Teardown);
        self.bench.set_enabled(false).map_err(hardware_error)?;
        self.select_filter(FilterChannel::White)?;

        let [Some(w), Some(r), Some(g), Some(b)] = vectors else {
            return Err(AcquisitionError::ReferenceIncomplete { failures });
        };
        let reference = FocalReference::new([w, r, g, b]);
        let location = self.store.save_reference(&reference)?;
        info!("Reference stored at {}", location.display());

        Ok(ReferenceCapture {
            reference,
            location,
        })
    }

    fn capture_planes(
        &mut self,
        z1: f64,
        z2: f64,
    ) -> Result<(PlaneCapture, PlaneCapture), AcquisitionError> {
        self.illuminate()?;
        let first = self.capture_plane(CapturePlane::Z1, z1)?;
        let second = self.capture_plane(CapturePlane::Z2, z2)?;

        self.transition(SequencerState::Teardown);
        self.bench.set_enabled(false).map_err(hardware_error)?;
        self.bench.move_to_absolute(0.0).map_err(hardware_error)?;
        self.select_filter(FilterChannel::White)?;

        Ok((first, second))
    }

    fn capture_plane(
        &mut self,
        plane: CapturePlane,
        position_mm: f64,
    ) -> Result<PlaneCapture, AcquisitionError> {
        self.transition(SequencerState::AwaitPosition(plane));
        let target = self.bench.move_to_absolute(position_mm).map_err(hardware_error)?;
        self.wait_for_position(target)?;

        self.transition(SequencerState::PerFilterCapture(plane));
        let mut capture = PlaneCapture::new(plane, position_mm);
        for channel in FilterChannel::ALL {
            self.check_cancelled()?;
            self.select_filter(channel)?;
            std::thread::sleep(secs(self.config.run_settle_secs));

            match self.camera.capture_frame() {
                Ok(frame) => capture.set_frame(channel, frame),
                Err(e) => warn!("Capture failed for filter {channel} at {plane}: {e}"),
            }
            std::thread::sleep(secs(self.config.post_capture_secs));
        }

        Ok(capture)
    }

    /// Poll the stage until it reports exactly `target_mm`.
    ///
    /// Polls every `poll_interval_ms` and gives up after `position_timeout_secs`.
    fn wait_for_position(&mut self, target_mm: f64) -> Result<(), AcquisitionError> {
        let timeout = self.config.position_timeout();
        let interval = self.config.poll_interval();
        let start = Instant::now();
        let mut last_mm = None;

        loop {
            self.check_cancelled()?;

            if let Some(position) = self.bench.current_position_mm().map_err(hardware_error)? {
                last_mm = Some(position);
                if position == target_mm {
                    debug!("Stage reached {target_mm} mm after {:?}", start.elapsed());
                    return Ok(());
                }
            }

            if start.elapsed() >= timeout {
                return Err(AcquisitionError::PositionTimeout {
                    target_mm,
                    timeout,
                    last_mm,
                });
            }

            std::thread::sleep(interval);
        }
    }

    fn illuminate(&mut self) -> Result<(), AcquisitionError> {
        self.bench.set_enabled(true).map_err(hardware_error)?;
        self.bench
            .set_intensity(self.config.led_intensity)
            .map_err(hardware_error)
    }

    fn select_filter(&mut self, channel: FilterChannel) -> Result<(), AcquisitionError> {
        let color = self.bench.select(channel).map_err(hardware_error)?;
        debug!("Filter {channel} selected ({color})");
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), AcquisitionError> {
        if self.cancel.is_cancelled() {
            Err(AcquisitionError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn transition(&mut self, next: SequencerState) {
        info!("Sequencer: {} -> {}", self.state, next);
        self.state = next;
    }

    fn finish<T>(&mut self, outcome: Result<T, AcquisitionError>) -> Result<T, AcquisitionError> {
        match outcome {
            Ok(value) => {
                self.transition(SequencerState::Done);
                Ok(value)
            }
            Err(e) => {
                warn!("Acquisition stopped: {e}");
                self.make_safe();
                self.transition(SequencerState::Idle);
                Err(e)
            }
        }
    }

    /// Light off, stage sent home and white filter, logging rather than
    /// propagating failures. The stage move is not awaited.
    fn make_safe(&mut self) {
        if let Err(e) = self.bench.set_enabled(false) {
            warn!("Failed to switch illumination off: {e}");
        }
        if let Err(e) = self.bench.move_to_absolute(0.0) {
            warn!("Failed to send stage home: {e}");
        }
        if let Err(e) = self.bench.select(FilterChannel::White) {
            warn!("Failed to select white filter: {e}");
        }
    }
}

fn hardware_error(message: String) -> AcquisitionError {
    AcquisitionError::Hardware(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focal_measurement::analysis::{FilterFailure, FilterOutcome};
    use crate::focal_measurement::store::{FileStore, MemoryStore};
    use crate::focal_measurement::test_support::{grid_frame, GRID_FRAME_SIZE};
    use approx::assert_abs_diff_eq;
    use hardware::mock::{Arrival, BenchEvent, MockBench};
    use hardware::{FilterWheel, Illuminator, MotionStage};
    use shared::config_storage::ConfigStorage;
    use shared::camera_interface::mock::MockCameraInterface;
    use shared::camera_interface::CameraConfig;
    use shared::image_proc::RgbFrame;
    use tempfile::TempDir;

    type TestSequencer = AcquisitionSequencer<MockBench, MockCameraInterface, MemoryStore>;

    fn camera(frames: Vec<Option<RgbFrame>>) -> MockCameraInterface {
        let config = CameraConfig {
            width: GRID_FRAME_SIZE,
            height: GRID_FRAME_SIZE,
        };
        MockCameraInterface::new(config, frames)
    }

    fn reference_store() -> MemoryStore {
        let vector = measure_distances(&grid_frame(40), &DetectionConfig::default()).unwrap();
        MemoryStore::with_reference(FocalReference::new([vector; 4]))
    }

    /// Four frames of a 48 px grid, then four of a 32 px grid.
    fn plane_frames() -> Vec<Option<RgbFrame>> {
        let mut frames = vec![Some(grid_frame(48)); 4];
        frames.extend(vec![Some(grid_frame(32)); 4]);
        frames
    }

    fn sequencer(bench: MockBench, camera: MockCameraInterface, store: MemoryStore) -> TestSequencer {
        AcquisitionSequencer::new(
            bench,
            camera,
            store,
            AcquisitionConfig::immediate(),
            DetectionConfig::default(),
        )
    }

    fn assert_safe(bench: &MockBench) {
        assert!(!bench.light_on());
        assert_eq!(bench.filter(), FilterChannel::White);
    }

    /// Teardown commands issued after a run stops early.
    fn assert_ends_safe(bench: &MockBench) {
        assert_safe(bench);
        let events = bench.events();
        assert_eq!(
            events[events.len() - 3..],
            [
                BenchEvent::Light(false),
                BenchEvent::Move(0.0),
                BenchEvent::Filter(FilterChannel::White)
            ]
        );
    }

    /// Bench whose stage raises the cancel flag after a number of position polls.
    struct CancellingBench {
        inner: MockBench,
        cancel: CancelHandle,
        polls_before_cancel: usize,
    }

    impl MotionStage for CancellingBench {
        fn move_to_absolute(&mut self, position_mm: f64) -> Result<f64, String> {
            self.inner.move_to_absolute(position_mm)
        }

        fn current_position_mm(&mut self) -> Result<Option<f64>, String> {
            if self.polls_before_cancel == 0 {
                self.cancel.cancel();
            } else {
                self.polls_before_cancel -= 1;
            }
            self.inner.current_position_mm()
        }
    }

    impl Illuminator for CancellingBench {
        fn set_enabled(&mut self, enabled: bool) -> Result<(), String> {
            self.inner.set_enabled(enabled)
        }

        fn set_intensity(&mut self, level: u8) -> Result<(), String> {
            self.inner.set_intensity(level)
        }
    }

    impl FilterWheel for CancellingBench {
        fn select(&mut self, channel: FilterChannel) -> Result<&'static str, String> {
            self.inner.select(channel)
        }
    }

    #[test]
    fn test_reference_capture() {
        let mut seq = sequencer(
            MockBench::new(),
            camera(vec![Some(grid_frame(40)); 4]),
            MemoryStore::new(),
        );

        let capture = seq.run_reference().unwrap();

        let expected = measure_distances(&grid_frame(40), &DetectionConfig::default()).unwrap();
        assert_eq!(capture.reference, FocalReference::new([expected; 4]));
        assert_eq!(seq.store().reference(), Some(&capture.reference));
        assert_eq!(seq.store().reference_frames().len(), 4);
        assert_eq!(seq.state(), SequencerState::Done);
        assert_eq!(seq.bench().events()[0], BenchEvent::Move(0.0));
        assert_eq!(seq.bench().intensity(), 10);
        assert_safe(seq.bench());
    }

    #[test]
    fn test_incomplete_reference_keeps_previous() {
        let previous = reference_store();
        let stored = *previous.reference().unwrap();
        let frames = vec![
            Some(grid_frame(40)),
            None,
            Some(grid_frame(40)),
            Some(RgbFrame::zeros(GRID_FRAME_SIZE, GRID_FRAME_SIZE)),
        ];
        let mut seq = sequencer(MockBench::new(), camera(frames), previous);

        let err = seq.run_reference().unwrap_err();

        let AcquisitionError::ReferenceIncomplete { failures } = err else {
            panic!("expected incomplete reference, got {err:?}");
        };
        let failed: Vec<FilterChannel> = failures.iter().map(|(c, _)| *c).collect();
        assert_eq!(failed, [FilterChannel::Red, FilterChannel::Blue]);
        assert_eq!(seq.store().reference(), Some(&stored));
        assert_eq!(seq.store().reference_saves(), 0);
        assert_eq!(seq.state(), SequencerState::Idle);
        assert_safe(seq.bench());
    }

    #[test]
    fn test_measurement_without_reference_never_moves() {
        let mut seq = sequencer(MockBench::new(), camera(plane_frames()), MemoryStore::new());

        let err = seq.run_measurement(10.0, 20.0, Mode::One).unwrap_err();

        assert!(matches!(err, AcquisitionError::ReferenceMissing));
        assert!(seq.bench().events().is_empty());
        assert_eq!(seq.camera().frame_count(), 0);
    }

    #[test]
    fn test_measurement_end_to_end() {
        let mut seq = sequencer(MockBench::new(), camera(plane_frames()), reference_store());

        // Reversed positions are normalised
        let run = seq.run_measurement(20.0, 10.0, Mode::One).unwrap();

        assert_eq!(run.z1.position_mm, 10.0);
        assert_eq!(run.z2.position_mm, 20.0);
        assert_eq!(run.successes(), 4);
        for report in &run.reports {
            let result = report.result().unwrap();
            assert_abs_diff_eq!(result.focal_effective, 25.0, epsilon = 1e-9);
            assert_abs_diff_eq!(result.err_focal_effective, 0.0, epsilon = 1e-9);
            assert_abs_diff_eq!(result.delta_f, 0.0, epsilon = 1e-9);
        }

        let events = seq.bench().events();
        let filters = |from: usize| -> Vec<BenchEvent> { events[from..from + 4].to_vec() };
        let all_filters: Vec<BenchEvent> = FilterChannel::ALL.map(BenchEvent::Filter).to_vec();
        assert_eq!(events[..3], [BenchEvent::Light(true), BenchEvent::Intensity(10), BenchEvent::Move(10.0)]);
        assert_eq!(filters(3), all_filters);
        assert_eq!(events[7], BenchEvent::Move(20.0));
        assert_eq!(filters(8), all_filters);
        assert_eq!(
            events[12..],
            [
                BenchEvent::Light(false),
                BenchEvent::Move(0.0),
                BenchEvent::Filter(FilterChannel::White)
            ]
        );
        assert_eq!(seq.state(), SequencerState::Done);
    }

    #[test]
    fn test_capture_failure_is_recorded_per_filter() {
        let mut frames = plane_frames();
        frames[1] = None;
        let mut seq = sequencer(MockBench::new(), camera(frames), reference_store());

        let run = seq.run_measurement(10.0, 20.0, Mode::One).unwrap();

        assert_eq!(run.successes(), 3);
        assert_eq!(run.z1.captured(), 3);
        let red = run.report(FilterChannel::Red).unwrap();
        assert_eq!(
            red.outcome,
            FilterOutcome::Failed(FilterFailure::MissingFrame {
                plane: CapturePlane::Z1
            })
        );
    }

    #[test]
    fn test_position_timeout_makes_safe() {
        let config = AcquisitionConfig {
            poll_interval_ms: 1,
            position_timeout_secs: 0.01,
            ..AcquisitionConfig::immediate()
        };
        let mut seq = AcquisitionSequencer::new(
            MockBench::new().with_arrival(Arrival::Never),
            camera(plane_frames()),
            reference_store(),
            config,
            DetectionConfig::default(),
        );

        let err = seq.run_measurement(10.0, 20.0, Mode::One).unwrap_err();

        assert!(matches!(
            err,
            AcquisitionError::PositionTimeout {
                target_mm,
                last_mm: None,
                ..
            } if target_mm == 10.0
        ));
        assert_eq!(seq.camera().frame_count(), 0);
        assert_eq!(seq.state(), SequencerState::Idle);
        assert_ends_safe(seq.bench());
    }

    #[test]
    fn test_hardware_failure_makes_safe() {
        let mut seq = sequencer(
            MockBench::new().with_failing_moves(),
            camera(plane_frames()),
            reference_store(),
        );

        let err = seq.run_measurement(10.0, 20.0, Mode::One).unwrap_err();

        assert!(matches!(err, AcquisitionError::Hardware(_)));
        assert_eq!(
            seq.bench().events().last(),
            Some(&BenchEvent::Filter(FilterChannel::White))
        );
        assert_safe(seq.bench());
    }

    #[test]
    fn test_cancel_while_waiting_for_stage() {
        let config = AcquisitionConfig {
            poll_interval_ms: 1,
            position_timeout_secs: 30.0,
            ..AcquisitionConfig::immediate()
        };
        let cancel = CancelHandle::default();
        let bench = CancellingBench {
            inner: MockBench::new().with_arrival(Arrival::Never),
            cancel: cancel.clone(),
            polls_before_cancel: 3,
        };
        let mut seq = AcquisitionSequencer::new(
            bench,
            camera(plane_frames()),
            reference_store(),
            config,
            DetectionConfig::default(),
        )
        .with_cancel_handle(cancel);

        let result = seq.run_measurement(10.0, 20.0, Mode::One);

        assert!(matches!(result, Err(AcquisitionError::Cancelled)));
        assert!(seq.cancel_handle().is_cancelled());
        assert_eq!(seq.camera().frame_count(), 0);
        assert_eq!(seq.state(), SequencerState::Idle);
        assert_ends_safe(&seq.bench().inner);
    }

    #[test]
    fn test_sequencer_runs_on_worker_thread() {
        let mut seq = sequencer(MockBench::new(), camera(plane_frames()), reference_store());
        let cancel = seq.cancel_handle();

        let worker = std::thread::spawn(move || {
            let result = seq.run_measurement(10.0, 20.0, Mode::One);
            (result, seq.into_parts())
        });

        let (result, (bench, _, _)) = worker.join().unwrap();
        assert_eq!(result.unwrap().successes(), 4);
        assert!(!cancel.is_cancelled());
        assert_safe(&bench);
    }

    #[test]
    fn test_failed_capture_keeps_stored_reference_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = FileStore::new(ConfigStorage::with_path(temp_dir.path().to_path_buf()));
        let previous = FocalReference::new([DistanceVector([10.0; 8]); 4]);
        store.save_reference(&previous).unwrap();

        let frames = vec![
            Some(grid_frame(40)),
            None,
            Some(grid_frame(40)),
            Some(grid_frame(40)),
        ];
        let mut seq = AcquisitionSequencer::new(
            MockBench::new(),
            camera(frames),
            store,
            AcquisitionConfig::immediate(),
            DetectionConfig::default(),
        );

        let err = seq.run_reference().unwrap_err();

        assert!(matches!(err, AcquisitionError::ReferenceIncomplete { .. }));
        assert_eq!(seq.store().load_reference().unwrap(), Some(previous));

        // The kept reference still allows a measurement
        let (bench, _, store) = seq.into_parts();
        let mut seq = AcquisitionSequencer::new(
            bench,
            camera(plane_frames()),
            store,
            AcquisitionConfig::immediate(),
            DetectionConfig::default(),
        );
        assert!(seq.run_measurement(10.0, 20.0, Mode::One).is_ok());
    }

    #[test]
    fn test_stale_cancel_is_cleared_on_start() {
        let mut seq = sequencer(MockBench::new(), camera(plane_frames()), reference_store());
        seq.cancel_handle().cancel();

        // A cancel issued before the run starts is cleared
        assert!(seq.run_measurement(10.0, 20.0, Mode::One).is_ok());
        assert!(!seq.cancel_handle().is_cancelled());
    }
}
