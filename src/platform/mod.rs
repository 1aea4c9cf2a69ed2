//! Platform backend seams
//!
//! Camera and AR frameworks are reached through the [`CameraPlatform`] and
//! [`ArPlatform`] traits. Every call is blocking; the aggregator moves them
//! onto the blocking pool.

use crate::types::{
    ArAvailability, DeviceIdentity, DynamicRange, Extension, ImageCaptureCapabilities,
    SensorCharacteristics, VideoQuality,
};
use thiserror::Error;

#[cfg(feature = "native")]
pub mod native;

#[cfg(feature = "native")]
pub use native::NativeCameraPlatform;

/// First SDK level exposing physical sensors behind a logical camera
pub const SDK_PHYSICAL_CAMERAS: u32 = 28;

/// First SDK level exposing the legacy extension bitmask
pub const SDK_CAMERA_EXTENSIONS: u32 = 31;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("camera service unavailable: {0}")]
    CameraUnavailable(String),
    #[error("illegal argument: {0}")]
    IllegalArgument(String),
    #[error("illegal state: {0}")]
    IllegalState(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("backend failure: {0}")]
    Backend(String),
}

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Camera framework queries, keyed by the platform's camera identifier
pub trait CameraPlatform: Send + Sync + 'static {
    fn sdk_level(&self) -> u32;

    fn identity(&self) -> DeviceIdentity;

    fn camera_ids(&self) -> PlatformResult<Vec<String>>;

    fn characteristics(&self, camera_id: &str) -> PlatformResult<SensorCharacteristics>;

    /// Physical sensors multiplexed behind a logical camera
    fn physical_camera_ids(&self, camera_id: &str) -> PlatformResult<Vec<String>>;

    /// Extensions advertised through the legacy capability bitmask
    fn legacy_extensions(&self, camera_id: &str) -> PlatformResult<Vec<Extension>>;

    /// Extension availability through the newer query API. Some vendor
    /// firmware fails here with [`PlatformError::IllegalState`].
    fn extension_available(&self, camera_id: &str, extension: Extension) -> PlatformResult<bool>;

    fn extension_strength_available(
        &self,
        camera_id: &str,
        extension: Extension,
    ) -> PlatformResult<bool>;

    /// Supported recording qualities, in the platform's native low-to-high order
    fn video_qualities(
        &self,
        camera_id: &str,
        range: DynamicRange,
    ) -> PlatformResult<Vec<VideoQuality>>;

    fn image_capture_capabilities(
        &self,
        camera_id: &str,
    ) -> PlatformResult<ImageCaptureCapabilities>;
}

/// AR framework queries
pub trait ArPlatform: Send + Sync + 'static {
    fn check_availability(&self) -> PlatformResult<ArAvailability>;

    fn open_session(&self) -> PlatformResult<Box<dyn ArSession>>;
}

pub trait ArSession: Send {
    fn is_depth_supported(&self) -> PlatformResult<bool>;

    fn close(self: Box<Self>);
}

/// AR backend for hosts without an AR runtime
#[derive(Debug, Default, Clone, Copy)]
pub struct NoArPlatform;

impl ArPlatform for NoArPlatform {
    fn check_availability(&self) -> PlatformResult<ArAvailability> {
        Ok(ArAvailability::UnsupportedDeviceNotCapable)
    }

    fn open_session(&self) -> PlatformResult<Box<dyn ArSession>> {
        Err(PlatformError::Unsupported(
            "no AR runtime on this host".to_string(),
        ))
    }
}
