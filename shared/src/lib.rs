//! Shared components for the focal bench crates.
//!
//! This crate contains the image processing pipeline, camera abstraction,
//! filter channel types and storage layout that are used by both the
//! hardware drivers and the measurement application.

pub mod algo;
pub mod camera_interface;
pub mod config_storage;
pub mod filter_channel;
pub mod focal_reference;
pub mod image_proc;
