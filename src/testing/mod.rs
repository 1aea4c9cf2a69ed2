//! Testing utilities for crabcaps
//!
//! Synthetic camera and AR frameworks for exercising aggregation, reporting
//! and upload flows without device hardware.

pub mod synthetic_platform;

pub use synthetic_platform::{SyntheticArPlatform, SyntheticCamera, SyntheticCameraPlatform};
