//! Focal length measurement for the lens bench.
//!
//! Builds on the image processing in `shared` and the hardware traits in
//! `hardware`; the `focal_bench` binary wires them to the serial controller.

pub mod focal_measurement;
