//! Desktop camera backend over nokhwa
//!
//! Desktop capture stacks expose no logical/physical split, vendor extensions
//! or optics data, so those queries report empty results. Qualities are
//! derived from the highest resolution the device negotiates.

use super::{CameraPlatform, PlatformError, PlatformResult};
use crate::types::{
    DeviceIdentity, DynamicRange, Extension, ImageCaptureCapabilities, LensFacing, OutputFormat,
    Resolution, SensorCharacteristics, VideoQuality,
};
use nokhwa::{
    pixel_format::RgbFormat,
    query,
    utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType},
    Camera,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct NativeCameraPlatform;

impl NativeCameraPlatform {
    pub fn new() -> Self {
        Self
    }

    fn highest_resolution(&self, camera_id: &str) -> PlatformResult<Resolution> {
        let index = camera_id
            .parse::<u32>()
            .map_err(|_| PlatformError::IllegalArgument(format!("Invalid camera id: {}", camera_id)))?;

        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);
        let camera = Camera::new(CameraIndex::Index(index), requested)
            .map_err(|e| PlatformError::CameraUnavailable(format!("Failed to open camera: {}", e)))?;

        let resolution = camera.resolution();
        Ok(Resolution::new(resolution.width_x, resolution.height_y))
    }
}

fn qualities_up_to(height: u32) -> Vec<VideoQuality> {
    [
        (480, VideoQuality::Sd),
        (720, VideoQuality::Hd),
        (1080, VideoQuality::Fhd),
        (2160, VideoQuality::Uhd),
    ]
    .into_iter()
    .filter(|(min_height, _)| height >= *min_height)
    .map(|(_, quality)| quality)
    .collect()
}

impl CameraPlatform for NativeCameraPlatform {
    fn sdk_level(&self) -> u32 {
        0
    }

    fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(std::env::consts::OS, std::env::consts::ARCH, 0)
            .with_release(env!("CARGO_PKG_VERSION"))
    }

    fn camera_ids(&self) -> PlatformResult<Vec<String>> {
        let cameras = query(ApiBackend::Auto).map_err(|e| {
            PlatformError::CameraUnavailable(format!("Failed to query cameras: {}", e))
        })?;

        log::debug!("nokhwa reported {} cameras", cameras.len());
        Ok(cameras
            .into_iter()
            .map(|info| info.index().to_string())
            .collect())
    }

    fn characteristics(&self, camera_id: &str) -> PlatformResult<SensorCharacteristics> {
        let pixel_array = match self.highest_resolution(camera_id) {
            Ok(resolution) => Some(resolution),
            Err(e) => {
                log::warn!("Could not read resolution for camera {}: {}", camera_id, e);
                None
            }
        };

        Ok(SensorCharacteristics {
            facing: LensFacing::External,
            focal_lengths: Vec::new(),
            physical_size: None,
            pixel_array,
        })
    }

    fn physical_camera_ids(&self, _camera_id: &str) -> PlatformResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn legacy_extensions(&self, _camera_id: &str) -> PlatformResult<Vec<Extension>> {
        Ok(Vec::new())
    }

    fn extension_available(&self, _camera_id: &str, _extension: Extension) -> PlatformResult<bool> {
        Ok(false)
    }

    fn extension_strength_available(
        &self,
        _camera_id: &str,
        _extension: Extension,
    ) -> PlatformResult<bool> {
        Ok(false)
    }

    fn video_qualities(
        &self,
        camera_id: &str,
        range: DynamicRange,
    ) -> PlatformResult<Vec<VideoQuality>> {
        if range != DynamicRange::Sdr {
            return Ok(Vec::new());
        }
        let resolution = self.highest_resolution(camera_id)?;
        Ok(qualities_up_to(resolution.height))
    }

    fn image_capture_capabilities(
        &self,
        _camera_id: &str,
    ) -> PlatformResult<ImageCaptureCapabilities> {
        Ok(ImageCaptureCapabilities {
            capture_process_progress: false,
            postview: false,
            output_formats: vec![OutputFormat::Jpeg],
        })
    }
}
