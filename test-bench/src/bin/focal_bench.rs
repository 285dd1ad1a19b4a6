//! Focal length bench runner.
//!
//! Captures references and two-plane measurements through the bench
//! controller, and re-analyzes saved measurement folders offline.
//!
//! Frames come from a directory of images (`--frames`), played back in name
//! order; use `--sensor-frames` when they are full sensor images that still
//! need the bench window applied.

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use hardware::bench::{BenchController, StepTable, DEFAULT_BAUD};
use hardware::BenchHardware;
use shared::camera_interface::replay::ReplayCamera;
use shared::camera_interface::{CameraInterface, SensorWindow, WindowedCamera};
use shared::config_storage::ConfigStorage;
use shared::filter_channel::{CapturePlane, FilterChannel};
use shared::focal_reference::{DistanceVector, FocalReference};
use shared::image_proc::{load_rgb_frame, DetectionConfig};
use std::path::{Path, PathBuf};
use test_bench::focal_measurement::{
    load_plane, measure_distances, save_measurement, save_tables, AcquisitionConfig,
    AcquisitionSequencer, FileStore, MeasurementRun, MeasurementStore, Mode,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Lens focal length bench")]
struct Cli {
    #[arg(
        long,
        default_value = "data",
        help = "Data directory holding the reference and measurement folders"
    )]
    data_dir: PathBuf,

    #[command(flatten)]
    detection: DetectionConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture a new reference at the home position
    Reference {
        #[command(flatten)]
        bench: BenchArgs,
    },

    /// Run an automatic two-plane measurement
    Measure {
        #[command(flatten)]
        bench: BenchArgs,

        #[command(flatten)]
        planes: PlaneArgs,

        #[arg(long, help = "Save images and tables after the run")]
        save: bool,

        #[arg(long, help = "Output folder name (defaults to one derived from z1, z2 and time)")]
        name: Option<String>,
    },

    /// Re-analyze a saved measurement folder against the stored reference
    Analyze {
        #[arg(long, help = "Measurement folder holding z1_*.jpg and z2_*.jpg")]
        dir: PathBuf,

        #[command(flatten)]
        planes: PlaneArgs,

        #[arg(long, help = "Write the result table into the folder")]
        write_table: bool,
    },

    /// Recompute the stored reference from saved reference images
    RebuildReference {
        #[arg(long, help = "Folder with w.png, r.png, g.png and b.png (defaults to the reference folder)")]
        dir: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct BenchArgs {
    #[arg(short, long, help = "Serial port of the bench controller")]
    port: String,

    #[arg(long, default_value_t = DEFAULT_BAUD, help = "Serial baud rate")]
    baud: u32,

    #[arg(long, default_value = "steps.csv", help = "CSV table mapping millimeters to motor steps")]
    steps_table: PathBuf,

    #[arg(long, help = "Stage speed setting to send after connecting")]
    speed: Option<u32>,

    #[arg(long, help = "Directory of frames to play back as the camera")]
    frames: PathBuf,

    #[arg(long, help = "Frames are full sensor images; crop and mirror to the bench window")]
    sensor_frames: bool,

    #[command(flatten)]
    acquisition: AcquisitionConfig,
}

#[derive(Args, Debug)]
struct PlaneArgs {
    #[arg(long, help = "First plane position in mm")]
    z1: f64,

    #[arg(long, help = "Second plane position in mm")]
    z2: f64,

    #[arg(
        long,
        default_value = "1",
        help = "Measurement mode (1, 2 or 3)",
        long_help = "Measurement mode:\n  \
            1: both planes between principal planes and focal point (or negative lens)\n  \
            2: z1 inside, z2 beyond the focal point\n  \
            3: both planes beyond the focal point"
    )]
    mode: Mode,
}

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let storage = ConfigStorage::with_path(cli.data_dir.clone());

    match cli.command {
        Command::Reference { bench } => run_reference(bench, storage, cli.detection),
        Command::Measure {
            bench,
            planes,
            save,
            name,
        } => run_measure(bench, planes, save, name, storage, cli.detection),
        Command::Analyze {
            dir,
            planes,
            write_table,
        } => run_analyze(&dir, planes, write_table, storage, &cli.detection),
        Command::RebuildReference { dir } => rebuild_reference(dir, storage, &cli.detection),
    }
}

fn open_bench(args: &BenchArgs) -> Result<(impl BenchHardware, Box<dyn CameraInterface>)> {
    let steps = StepTable::from_path(&args.steps_table)
        .with_context(|| format!("Failed to load step table {}", args.steps_table.display()))?;
    info!("Loaded {} step table entries", steps.len());

    let mut bench = BenchController::connect(&args.port, args.baud, steps)
        .with_context(|| format!("Failed to open bench controller on {}", args.port))?;
    if let Some(speed) = args.speed {
        bench.set_speed(speed).context("Failed to set stage speed")?;
    }

    let replay = ReplayCamera::from_directory(&args.frames)
        .map_err(|e| anyhow!("Failed to open frames in {}: {e}", args.frames.display()))?;
    let camera: Box<dyn CameraInterface> = if args.sensor_frames {
        Box::new(WindowedCamera::new(replay, SensorWindow::BENCH))
    } else {
        Box::new(replay)
    };
    info!("Using camera {}", camera.name());

    Ok((bench, camera))
}

fn run_reference(args: BenchArgs, storage: ConfigStorage, detection: DetectionConfig) -> Result<()> {
    let (bench, camera) = open_bench(&args)?;
    let mut sequencer = AcquisitionSequencer::new(
        bench,
        camera,
        FileStore::new(storage),
        args.acquisition,
        detection,
    );

    let capture = sequencer.run_reference()?;
    info!("Reference saved to {}", capture.location.display());
    for channel in FilterChannel::ALL {
        info!("{channel}: {:?}", capture.reference.for_channel(channel).values());
    }
    Ok(())
}

fn run_measure(
    args: BenchArgs,
    planes: PlaneArgs,
    save: bool,
    name: Option<String>,
    storage: ConfigStorage,
    detection: DetectionConfig,
) -> Result<()> {
    let (bench, camera) = open_bench(&args)?;
    let mut sequencer = AcquisitionSequencer::new(
        bench,
        camera,
        FileStore::new(storage.clone()),
        args.acquisition,
        detection,
    );

    let run = sequencer.run_measurement(planes.z1, planes.z2, planes.mode)?;
    report(&run);

    if save {
        let name = name.unwrap_or_else(|| run.suggested_folder_name());
        let dir = storage.measurement_dir(&name);
        let saved = save_measurement(&run, &dir)
            .with_context(|| format!("Failed to save measurement to {}", dir.display()))?;
        info!("Results written to {}", saved.table.display());
    }
    Ok(())
}

fn run_analyze(
    dir: &Path,
    planes: PlaneArgs,
    write_table: bool,
    storage: ConfigStorage,
    detection: &DetectionConfig,
) -> Result<()> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let reference = FileStore::new(storage)
        .load_reference()?
        .context("No reference stored; capture or rebuild one first")?;

    let (z1, z2) = if planes.z1 <= planes.z2 {
        (planes.z1, planes.z2)
    } else {
        (planes.z2, planes.z1)
    };
    let run = MeasurementRun::analyze(
        &reference,
        load_plane(dir, CapturePlane::Z1, z1),
        load_plane(dir, CapturePlane::Z2, z2),
        planes.mode,
        detection,
        Local::now(),
    );
    report(&run);

    if write_table {
        let path = save_tables(&run, dir)?;
        info!("Results written to {}", path.display());
    }
    Ok(())
}

fn rebuild_reference(
    dir: Option<PathBuf>,
    storage: ConfigStorage,
    detection: &DetectionConfig,
) -> Result<()> {
    let mut store = FileStore::new(storage);
    let mut vectors = [DistanceVector([0.0; 8]); 4];

    for channel in FilterChannel::ALL {
        let frame = match &dir {
            Some(dir) => {
                let path = dir.join(format!("{}.png", channel.code()));
                load_rgb_frame(&path)
                    .with_context(|| format!("Failed to load {}", path.display()))?
            }
            None => store.load_reference_frame(channel)?,
        };
        vectors[channel.index()] = measure_distances(&frame, detection)
            .with_context(|| format!("Reference image for filter {channel} is unusable"))?;
    }

    let location = store.save_reference(&FocalReference::new(vectors))?;
    info!("Reference rebuilt at {}", location.display());
    Ok(())
}

fn report(run: &MeasurementRun) {
    info!(
        "z1 = {} mm, z2 = {} mm, dz = {} mm, mode {} ({})",
        run.z1.position_mm,
        run.z2.position_mm,
        run.dz(),
        run.mode,
        run.mode.description()
    );
    for report in &run.reports {
        match report.result() {
            Some(_) => {
                for line in report.summary().lines() {
                    info!("[{}] {line}", report.channel.section_name());
                }
            }
            None => error!("[{}] {}", report.channel.section_name(), report.summary()),
        }
    }
    if run.successes() == 0 {
        error!("No filter produced a focal length");
    }
}
