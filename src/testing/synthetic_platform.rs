//! Synthetic camera and AR platforms
//!
//! Programmable stand-ins for the platform frameworks, modelled on a
//! three-sensor flagship phone. Faults seen on real vendor firmware can be
//! injected per camera so aggregation can be exercised without hardware.

use crate::platform::{ArPlatform, ArSession, CameraPlatform, PlatformError, PlatformResult};
use crate::types::{
    ArAvailability, DeviceIdentity, DynamicRange, Extension, ImageCaptureCapabilities, LensFacing,
    OutputFormat, Resolution, SensorCharacteristics, SensorSize, VideoQuality,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One logical camera exposed by [`SyntheticCameraPlatform`]
#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    pub id: String,
    pub characteristics: SensorCharacteristics,
    pub physical_ids: Vec<String>,
    /// Extensions listed in the legacy bitmask
    pub legacy_extensions: Vec<Extension>,
    /// Extensions the newer query API reports as available
    pub extensions: Vec<Extension>,
    /// Extensions whose strength can be adjusted
    pub strength_extensions: Vec<Extension>,
    /// Extensions whose availability query fails with an illegal-state error
    pub broken_extensions: Vec<Extension>,
    /// Qualities per dynamic range, lowest first like the platform reports them
    pub video_qualities: BTreeMap<DynamicRange, Vec<VideoQuality>>,
    pub image_capture: ImageCaptureCapabilities,
    /// Physical sensor lookups fail with an illegal-argument error
    pub physical_lookup_fails: bool,
    /// The legacy extension bitmask cannot be read
    pub legacy_lookup_fails: bool,
    /// Extensions whose strength query fails
    pub failing_strength: Vec<Extension>,
}

impl SyntheticCamera {
    pub fn new(id: impl Into<String>, facing: LensFacing) -> Self {
        Self {
            id: id.into(),
            characteristics: SensorCharacteristics {
                facing,
                ..SensorCharacteristics::default()
            },
            physical_ids: Vec::new(),
            legacy_extensions: Vec::new(),
            extensions: Vec::new(),
            strength_extensions: Vec::new(),
            broken_extensions: Vec::new(),
            video_qualities: BTreeMap::new(),
            image_capture: ImageCaptureCapabilities::default(),
            physical_lookup_fails: false,
            legacy_lookup_fails: false,
            failing_strength: Vec::new(),
        }
    }

    pub fn with_optics(mut self, focal_lengths: &[f32], sensor: SensorSize, pixels: Resolution) -> Self {
        self.characteristics.focal_lengths = focal_lengths.to_vec();
        self.characteristics.physical_size = Some(sensor);
        self.characteristics.pixel_array = Some(pixels);
        self
    }

    pub fn with_physical_ids(mut self, ids: &[&str]) -> Self {
        self.physical_ids = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn with_extensions(mut self, legacy: &[Extension], current: &[Extension]) -> Self {
        self.legacy_extensions = legacy.to_vec();
        self.extensions = current.to_vec();
        self
    }

    pub fn with_strength(mut self, extensions: &[Extension]) -> Self {
        self.strength_extensions = extensions.to_vec();
        self
    }

    pub fn with_broken_extension(mut self, extension: Extension) -> Self {
        self.broken_extensions.push(extension);
        self
    }

    pub fn with_qualities(mut self, range: DynamicRange, low_to_high: &[VideoQuality]) -> Self {
        self.video_qualities.insert(range, low_to_high.to_vec());
        self
    }

    pub fn with_image_capture(mut self, caps: ImageCaptureCapabilities) -> Self {
        self.image_capture = caps;
        self
    }

    pub fn with_failing_physical_lookup(mut self) -> Self {
        self.physical_lookup_fails = true;
        self
    }

    pub fn with_failing_legacy_extensions(mut self) -> Self {
        self.legacy_lookup_fails = true;
        self
    }

    pub fn with_failing_strength(mut self, extension: Extension) -> Self {
        self.failing_strength.push(extension);
        self
    }
}

/// In-memory camera framework
#[derive(Debug)]
pub struct SyntheticCameraPlatform {
    identity: DeviceIdentity,
    sdk_level: u32,
    cameras: Vec<SyntheticCamera>,
    physical: BTreeMap<String, SensorCharacteristics>,
    unavailable: AtomicBool,
    query_delay: Duration,
    queries: AtomicUsize,
}

impl SyntheticCameraPlatform {
    pub fn new(identity: DeviceIdentity) -> Self {
        let sdk_level = identity.sdk;
        Self {
            identity,
            sdk_level,
            cameras: Vec::new(),
            physical: BTreeMap::new(),
            unavailable: AtomicBool::new(false),
            query_delay: Duration::ZERO,
            queries: AtomicUsize::new(0),
        }
    }

    pub fn with_camera(mut self, camera: SyntheticCamera) -> Self {
        self.cameras.push(camera);
        self
    }

    pub fn with_physical_sensor(mut self, id: impl Into<String>, chars: SensorCharacteristics) -> Self {
        self.physical.insert(id.into(), chars);
        self
    }

    pub fn with_sdk_level(mut self, sdk_level: u32) -> Self {
        self.sdk_level = sdk_level;
        self
    }

    /// Every enumeration fails as if the camera service were busy
    pub fn unavailable(self) -> Self {
        self.set_available(false);
        self
    }

    /// Toggle the busy camera service between refreshes
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Block each per-camera query for `delay`, emulating slow vendor calls
    pub fn with_query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = delay;
        self
    }

    /// Number of per-camera queries served so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn camera(&self, camera_id: &str) -> PlatformResult<&SyntheticCamera> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if !self.query_delay.is_zero() {
            std::thread::sleep(self.query_delay);
        }
        self.cameras
            .iter()
            .find(|c| c.id == camera_id)
            .ok_or_else(|| PlatformError::IllegalArgument(format!("Unknown camera id: {}", camera_id)))
    }

    /// Three rear sensors behind logical camera `0`, one front camera `1`.
    /// The vendor extension library on camera `0` breaks on HDR queries.
    pub fn flagship() -> Self {
        let identity = DeviceIdentity::new("google", "Pixel 8 Pro", 34)
            .with_release("14")
            .with_security_patch("2024-01-05")
            .with_fingerprint("google/husky/husky:14/UD1A.231105.004/11010374:user/release-keys");

        let rear_sensor = SensorSize {
            width: 9.8,
            height: 7.4,
        };

        let rear = SyntheticCamera::new("0", LensFacing::Back)
            .with_optics(&[6.9, 2.2, 18.0], rear_sensor, Resolution::new(8160, 6144))
            .with_physical_ids(&["2", "3", "4"])
            .with_extensions(
                &[Extension::Auto, Extension::Bokeh, Extension::Hdr, Extension::Night],
                &[Extension::Auto, Extension::Bokeh, Extension::Night],
            )
            .with_strength(&[Extension::Bokeh])
            .with_broken_extension(Extension::Hdr)
            .with_qualities(
                DynamicRange::Sdr,
                &[VideoQuality::Sd, VideoQuality::Hd, VideoQuality::Fhd, VideoQuality::Uhd],
            )
            .with_qualities(
                DynamicRange::Hlg10Bit,
                &[VideoQuality::Hd, VideoQuality::Fhd, VideoQuality::Uhd],
            )
            .with_image_capture(ImageCaptureCapabilities {
                capture_process_progress: true,
                postview: true,
                output_formats: vec![OutputFormat::Jpeg, OutputFormat::JpegUltraHdr],
            });

        let front = SyntheticCamera::new("1", LensFacing::Front)
            .with_optics(
                &[2.74],
                SensorSize {
                    width: 4.5,
                    height: 3.4,
                },
                Resolution::new(3648, 2736),
            )
            .with_extensions(
                &[Extension::FaceRetouch],
                &[Extension::Auto, Extension::FaceRetouch],
            )
            .with_qualities(
                DynamicRange::Sdr,
                &[VideoQuality::Sd, VideoQuality::Hd, VideoQuality::Fhd],
            )
            .with_image_capture(ImageCaptureCapabilities {
                capture_process_progress: false,
                postview: false,
                output_formats: vec![OutputFormat::Jpeg],
            });

        let physical = |facing: LensFacing, focal: f32, pixels: Resolution| SensorCharacteristics {
            facing,
            focal_lengths: vec![focal],
            physical_size: Some(rear_sensor),
            pixel_array: Some(pixels),
        };

        Self::new(identity)
            .with_camera(rear)
            .with_camera(front)
            .with_physical_sensor("2", physical(LensFacing::Back, 6.9, Resolution::new(8160, 6144)))
            .with_physical_sensor("3", physical(LensFacing::Back, 2.2, Resolution::new(4080, 3072)))
            .with_physical_sensor("4", physical(LensFacing::Back, 18.0, Resolution::new(4080, 3072)))
    }
}

impl CameraPlatform for SyntheticCameraPlatform {
    fn sdk_level(&self) -> u32 {
        self.sdk_level
    }

    fn identity(&self) -> DeviceIdentity {
        self.identity.clone()
    }

    fn camera_ids(&self) -> PlatformResult<Vec<String>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PlatformError::CameraUnavailable(
                "camera service is busy".to_string(),
            ));
        }
        Ok(self.cameras.iter().map(|c| c.id.clone()).collect())
    }

    fn characteristics(&self, camera_id: &str) -> PlatformResult<SensorCharacteristics> {
        if let Some(chars) = self.physical.get(camera_id) {
            return Ok(chars.clone());
        }
        self.camera(camera_id).map(|c| c.characteristics.clone())
    }

    fn physical_camera_ids(&self, camera_id: &str) -> PlatformResult<Vec<String>> {
        let camera = self.camera(camera_id)?;
        if camera.physical_lookup_fails {
            return Err(PlatformError::IllegalArgument(format!(
                "no physical camera table for {}",
                camera_id
            )));
        }
        Ok(camera.physical_ids.clone())
    }

    fn legacy_extensions(&self, camera_id: &str) -> PlatformResult<Vec<Extension>> {
        let camera = self.camera(camera_id)?;
        if camera.legacy_lookup_fails {
            return Err(PlatformError::Backend(format!(
                "extension characteristics unavailable for camera {}",
                camera_id
            )));
        }
        Ok(camera.legacy_extensions.clone())
    }

    fn extension_available(&self, camera_id: &str, extension: Extension) -> PlatformResult<bool> {
        let camera = self.camera(camera_id)?;
        if camera.broken_extensions.contains(&extension) {
            return Err(PlatformError::IllegalState(format!(
                "vendor library initialised {} with the wrong mode constant",
                extension.label()
            )));
        }
        Ok(camera.extensions.contains(&extension))
    }

    fn extension_strength_available(
        &self,
        camera_id: &str,
        extension: Extension,
    ) -> PlatformResult<bool> {
        let camera = self.camera(camera_id)?;
        if camera.failing_strength.contains(&extension) {
            return Err(PlatformError::Backend(format!(
                "strength query for {} rejected",
                extension.label()
            )));
        }
        Ok(camera.strength_extensions.contains(&extension))
    }

    fn video_qualities(
        &self,
        camera_id: &str,
        range: DynamicRange,
    ) -> PlatformResult<Vec<VideoQuality>> {
        self.camera(camera_id)
            .map(|c| c.video_qualities.get(&range).cloned().unwrap_or_default())
    }

    fn image_capture_capabilities(
        &self,
        camera_id: &str,
    ) -> PlatformResult<ImageCaptureCapabilities> {
        self.camera(camera_id).map(|c| c.image_capture.clone())
    }
}

/// In-memory AR framework
#[derive(Debug)]
pub struct SyntheticArPlatform {
    availability: ArAvailability,
    transient_polls: AtomicU32,
    depth: PlatformResult<bool>,
    session_fails: bool,
    polls: AtomicU32,
    sessions_opened: Arc<AtomicUsize>,
    sessions_closed: Arc<AtomicUsize>,
}

impl SyntheticArPlatform {
    pub fn new(availability: ArAvailability) -> Self {
        Self {
            availability,
            transient_polls: AtomicU32::new(0),
            depth: Ok(false),
            session_fails: false,
            polls: AtomicU32::new(0),
            sessions_opened: Arc::new(AtomicUsize::new(0)),
            sessions_closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Installed runtime with depth support
    pub fn supported() -> Self {
        Self::new(ArAvailability::SupportedInstalled).with_depth(Ok(true))
    }

    /// Report `UnknownChecking` for the first `polls` checks
    pub fn with_transient_polls(self, polls: u32) -> Self {
        self.transient_polls.store(polls, Ordering::SeqCst);
        self
    }

    /// Never leave `UnknownChecking`
    pub fn forever_transient() -> Self {
        Self::new(ArAvailability::UnknownChecking)
    }

    pub fn with_depth(mut self, depth: PlatformResult<bool>) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_failing_sessions(mut self) -> Self {
        self.session_fails = true;
        self
    }

    pub fn poll_count(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.sessions_closed.load(Ordering::SeqCst)
    }
}

impl ArPlatform for SyntheticArPlatform {
    fn check_availability(&self) -> PlatformResult<ArAvailability> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.transient_polls.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_polls.store(remaining - 1, Ordering::SeqCst);
            return Ok(ArAvailability::UnknownChecking);
        }
        Ok(self.availability)
    }

    fn open_session(&self) -> PlatformResult<Box<dyn ArSession>> {
        if self.session_fails {
            return Err(PlatformError::Unsupported(
                "AR session could not be created".to_string(),
            ));
        }
        self.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SyntheticArSession {
            depth: self.depth.clone(),
            closed: Arc::clone(&self.sessions_closed),
        }))
    }
}

struct SyntheticArSession {
    depth: PlatformResult<bool>,
    closed: Arc<AtomicUsize>,
}

impl ArSession for SyntheticArSession {
    fn is_depth_supported(&self) -> PlatformResult<bool> {
        self.depth.clone()
    }

    fn close(self: Box<Self>) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flagship_layout() {
        let platform = SyntheticCameraPlatform::flagship();
        assert_eq!(platform.camera_ids().unwrap(), vec!["0", "1"]);
        assert_eq!(platform.physical_camera_ids("0").unwrap(), vec!["2", "3", "4"]);
        assert_eq!(
            platform.characteristics("3").unwrap().focal_lengths,
            vec![2.2]
        );
        assert_eq!(platform.identity().sdk, 34);
    }

    #[test]
    fn test_broken_extension_raises_illegal_state() {
        let platform = SyntheticCameraPlatform::flagship();
        assert!(matches!(
            platform.extension_available("0", Extension::Hdr),
            Err(PlatformError::IllegalState(_))
        ));
        assert_eq!(platform.extension_available("1", Extension::Hdr), Ok(false));
    }

    #[test]
    fn test_unavailable_platform() {
        let platform = SyntheticCameraPlatform::flagship().unavailable();
        assert!(matches!(
            platform.camera_ids(),
            Err(PlatformError::CameraUnavailable(_))
        ));
    }

    #[test]
    fn test_transient_ar_polls_count_down() {
        let ar = SyntheticArPlatform::supported().with_transient_polls(2);
        assert_eq!(ar.check_availability(), Ok(ArAvailability::UnknownChecking));
        assert_eq!(ar.check_availability(), Ok(ArAvailability::UnknownChecking));
        assert_eq!(ar.check_availability(), Ok(ArAvailability::SupportedInstalled));
        assert_eq!(ar.poll_count(), 3);
    }

    #[test]
    fn test_ar_sessions_are_counted() {
        let ar = SyntheticArPlatform::supported();
        let session = ar.open_session().unwrap();
        assert_eq!(session.is_depth_supported(), Ok(true));
        session.close();
        assert_eq!(ar.sessions_opened(), 1);
        assert_eq!(ar.sessions_closed(), 1);
    }
}
