//! Driver for the bench microcontroller
//!
//! A single serial link controls the axial stepper stage, the filter
//! selector and the illumination LED. [`BenchController`] speaks the line
//! protocol over any `Read + Write` transport and implements the
//! [`MotionStage`], [`Illuminator`] and [`FilterWheel`] traits.

mod protocol;
mod step_table;

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use shared::filter_channel::FilterChannel;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{FilterWheel, Illuminator, MotionStage, MAX_INTENSITY};

pub use protocol::{parse_position_line, BenchCommand, POSITION_PREFIX};
pub use step_table::{round_to_table_precision, StepTable, StepTableError};

/// Default baud rate of the bench controller.
pub const DEFAULT_BAUD: u32 = 115_200;

/// Read timeout of the serial link; bounds a single position poll.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// The controller resets when the port opens and ignores input meanwhile.
const RESET_DELAY: Duration = Duration::from_secs(2);

/// Unterminated input beyond this is discarded.
const MAX_PENDING: usize = 4096;

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    StepTable(#[from] StepTableError),

    #[error("illumination intensity {0} outside 1..=10")]
    InvalidIntensity(u8),
}

/// Open the controller's serial port and wait out its reset.
pub fn open_serial(path: &str, baud: u32) -> Result<Box<dyn SerialPort>, BenchError> {
    info!("Opening bench controller on {path} at {baud} bps");

    let port = serialport::new(path, baud).timeout(READ_TIMEOUT).open()?;
    std::thread::sleep(RESET_DELAY);

    Ok(port)
}

/// Bench controller over a byte transport.
pub struct BenchController<T: Read + Write> {
    transport: T,
    steps: StepTable,
    pending: Vec<u8>,
}

impl BenchController<Box<dyn SerialPort>> {
    /// Connect over a serial port.
    pub fn connect(path: &str, baud: u32, steps: StepTable) -> Result<Self, BenchError> {
        let port = open_serial(path, baud)?;
        Ok(Self::new(port, steps))
    }
}

impl<T: Read + Write> BenchController<T> {
    pub fn new(transport: T, steps: StepTable) -> Self {
        Self {
            transport,
            steps,
            pending: Vec::new(),
        }
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Write one command line.
    pub fn send(&mut self, command: BenchCommand) -> Result<(), BenchError> {
        debug!("bench <- {command}");
        self.transport.write_all(command.encode().as_bytes())?;
        self.transport.flush()?;
        Ok(())
    }

    pub fn set_speed(&mut self, speed: u32) -> Result<(), BenchError> {
        self.send(BenchCommand::Speed(speed))
    }

    /// Read whatever the controller has sent and return the latest position report.
    ///
    /// Performs at most one read. Returns `Ok(None)` when no complete position
    /// line arrived, including when the read timed out.
    pub fn poll_position_steps(&mut self) -> Result<Option<u32>, BenchError> {
        let mut buffer = [0u8; 256];
        let read = match self.transport.read(&mut buffer) {
            Ok(n) => n,
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => 0,
            Err(e) => return Err(e.into()),
        };
        self.pending.extend_from_slice(&buffer[..read]);

        let mut latest = None;
        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            let text = String::from_utf8_lossy(&line);
            match parse_position_line(&text) {
                Some(steps) => latest = Some(steps),
                None if text.trim().is_empty() => {}
                None => debug!("bench -> {}", text.trim()),
            }
        }

        if self.pending.len() > MAX_PENDING {
            warn!(
                "Discarding {} bytes of unterminated controller output",
                self.pending.len()
            );
            self.pending.clear();
        }

        Ok(latest)
    }
}

impl<T: Read + Write> MotionStage for BenchController<T> {
    fn move_to_absolute(&mut self, position_mm: f64) -> Result<f64, String> {
        let steps = self
            .steps
            .mm_to_steps(position_mm)
            .map_err(|e| format!("Stage move failed: {e}"))?;
        self.send(BenchCommand::Goto { steps })
            .map_err(|e| format!("Stage move failed: {e}"))?;

        let target = self
            .steps
            .steps_to_mm(steps)
            .unwrap_or_else(|| round_to_table_precision(position_mm.abs()));
        info!("Moving stage to {target} mm ({steps} steps)");
        Ok(target)
    }

    fn current_position_mm(&mut self) -> Result<Option<f64>, String> {
        let steps = self
            .poll_position_steps()
            .map_err(|e| format!("Stage position read failed: {e}"))?;
        Ok(steps.and_then(|s| self.steps.steps_to_mm(s)))
    }
}

impl<T: Read + Write> Illuminator for BenchController<T> {
    fn set_enabled(&mut self, enabled: bool) -> Result<(), String> {
        let command = if enabled {
            BenchCommand::LightOn
        } else {
            BenchCommand::LightOff
        };
        self.send(command)
            .map_err(|e| format!("Illumination switch failed: {e}"))
    }

    fn set_intensity(&mut self, level: u8) -> Result<(), String> {
        if !(1..=MAX_INTENSITY).contains(&level) {
            return Err(BenchError::InvalidIntensity(level).to_string());
        }
        self.send(BenchCommand::Intensity(level))
            .map_err(|e| format!("Illumination intensity failed: {e}"))
    }
}

impl<T: Read + Write> FilterWheel for BenchController<T> {
    fn select(&mut self, channel: FilterChannel) -> Result<&'static str, String> {
        self.send(BenchCommand::Filter(channel))
            .map_err(|e| format!("Filter select failed: {e}"))?;
        Ok(channel.display_color())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// In-memory transport: each read returns the next queued chunk, or times
    /// out when the queue is empty.
    #[derive(Default)]
    struct LoopbackTransport {
        incoming: VecDeque<Vec<u8>>,
        written: Vec<u8>,
    }

    impl LoopbackTransport {
        fn with_chunks(chunks: &[&str]) -> Self {
            Self {
                incoming: chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
                written: Vec::new(),
            }
        }
    }

    impl Read for LoopbackTransport {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.incoming.pop_front() {
                Some(chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    Ok(n)
                }
                None => Err(std::io::Error::new(ErrorKind::TimedOut, "timed out")),
            }
        }
    }

    impl Write for LoopbackTransport {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn steps() -> StepTable {
        StepTable::from_pairs(vec![(0.0, 0), (10.0, 2000), (20.0, 4000)]).unwrap()
    }

    fn written(controller: BenchController<LoopbackTransport>) -> String {
        String::from_utf8(controller.into_transport().written).unwrap()
    }

    #[test]
    fn test_move_sends_goto_and_returns_target() {
        let mut controller = BenchController::new(LoopbackTransport::default(), steps());
        let target = controller.move_to_absolute(-10.0).unwrap();
        assert_eq!(target, 10.0);
        assert_eq!(written(controller), "g2000\n");
    }

    #[test]
    fn test_move_to_unknown_position_fails_without_sending() {
        let mut controller = BenchController::new(LoopbackTransport::default(), steps());
        assert!(controller.move_to_absolute(7.0).is_err());
        assert_eq!(written(controller), "");
    }

    #[test]
    fn test_position_lines_split_across_reads() {
        let transport =
            LoopbackTransport::with_chunks(&["READY\nPOS:20", "00\n", "POS:-4000\nPOS:1"]);
        let mut controller = BenchController::new(transport, steps());

        assert_eq!(controller.current_position_mm().unwrap(), None);
        assert_eq!(controller.current_position_mm().unwrap(), Some(10.0));
        assert_eq!(controller.current_position_mm().unwrap(), Some(20.0));
        // Timed out read with a dangling partial line
        assert_eq!(controller.current_position_mm().unwrap(), None);
    }

    #[test]
    fn test_unmapped_steps_report_none() {
        let transport = LoopbackTransport::with_chunks(&["POS:1234\n"]);
        let mut controller = BenchController::new(transport, steps());
        assert_eq!(controller.current_position_mm().unwrap(), None);
    }

    #[test]
    fn test_light_and_filter_commands() {
        let mut controller = BenchController::new(LoopbackTransport::default(), steps());
        controller.set_enabled(true).unwrap();
        controller.set_intensity(10).unwrap();
        assert_eq!(controller.select(FilterChannel::Blue).unwrap(), "#4231DC");
        controller.set_enabled(false).unwrap();
        controller.set_speed(2).unwrap();

        assert_eq!(written(controller), "on\nled10\nf:b\noff\nv2\n");
    }

    #[test]
    fn test_intensity_out_of_range() {
        let mut controller = BenchController::new(LoopbackTransport::default(), steps());
        assert!(controller.set_intensity(0).is_err());
        assert!(controller.set_intensity(11).is_err());
        assert_eq!(written(controller), "");
    }
}
