//! crabcaps: camera, AR and capture capability inventory
//!
//! This crate enumerates a device's cameras through a platform backend,
//! aggregates per-camera capabilities concurrently, probes AR framework
//! support, and shares the result as an anonymized JSON report.
//!
//! # Features
//! - Concurrent capability aggregation with observable progress
//! - AR availability polling with a bounded timeout
//! - Capability report serialization tolerant of older clients
//! - Report upload with duplicate detection, and a browsable path tree
//! - Synthetic platforms for offline testing
//!
//! # Usage
//! ```rust,no_run
//! use crabcaps::testing::{SyntheticArPlatform, SyntheticCameraPlatform};
//! use crabcaps::{CapabilityModel, CapsConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), crabcaps::CapsError> {
//! let model = CapabilityModel::new(
//!     Arc::new(SyntheticCameraPlatform::flagship()),
//!     Arc::new(SyntheticArPlatform::supported()),
//!     CapsConfig::default().aggregator,
//! );
//! let snapshot = model.refresh().await?;
//! println!("{} cameras", snapshot.devices.len());
//! # Ok(())
//! # }
//! ```
pub mod capabilities;
pub mod config;
pub mod errors;
pub mod format;
pub mod platform;
pub mod remote;
pub mod report;
pub mod tree;
pub mod types;

// Testing utilities - synthetic platforms for offline testing
pub mod testing;

// Re-exports for convenience
pub use capabilities::{CapabilityModel, CapabilitySnapshot, Notice, RefreshPhase};
pub use config::CapsConfig;
pub use errors::CapsError;
pub use platform::{ArPlatform, CameraPlatform, PlatformError};
pub use remote::{DataBrowser, UploadResult, Uploader};
pub use report::CapabilityReport;
pub use tree::PathTree;
pub use types::{ArAvailability, ArSupportStatus, DeviceCapabilityRecord, DeviceIdentity};

/// Refresh `model` and build the report for the device it describes
pub async fn collect_report<C, A>(
    model: &CapabilityModel<C, A>,
) -> Result<CapabilityReport, CapsError>
where
    C: CameraPlatform,
    A: ArPlatform,
{
    let snapshot = model.refresh().await?;
    let identity = model.camera().identity();
    Ok(CapabilityReport::build(&identity, &snapshot))
}

/// Initialize logging for the capability tools
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "crabcaps=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        native_backend: cfg!(feature = "native"),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Built with the desktop camera backend
    pub native_backend: bool,
}
