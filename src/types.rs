//! Core data types for camera, capture and AR capability records.

use crate::format::{field_of_view, megapixels};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Direction a lens faces, mapped from the platform's raw facing constant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LensFacing {
    Front,
    Back,
    External,
    Unknown,
}

impl LensFacing {
    pub fn from_raw(raw: Option<i32>) -> Self {
        match raw {
            Some(0) => LensFacing::Front,
            Some(1) => LensFacing::Back,
            Some(2) => LensFacing::External,
            _ => LensFacing::Unknown,
        }
    }

    pub fn raw(&self) -> Option<i32> {
        match self {
            LensFacing::Front => Some(0),
            LensFacing::Back => Some(1),
            LensFacing::External => Some(2),
            LensFacing::Unknown => None,
        }
    }

    /// Ordering key for the published device list: the raw value negated,
    /// unknown facing counted as -1.
    pub fn sort_key(&self) -> i32 {
        self.raw().map(|raw| -raw).unwrap_or(-1)
    }

    pub fn label(&self) -> &'static str {
        match self {
            LensFacing::Front => "Front Facing",
            LensFacing::Back => "Rear Facing",
            LensFacing::External => "External",
            LensFacing::Unknown => "Unknown",
        }
    }

    pub fn json_label(&self) -> &'static str {
        match self {
            LensFacing::Front => "front",
            LensFacing::Back => "rear",
            LensFacing::External => "external",
            LensFacing::Unknown => "unknown",
        }
    }

    pub fn from_json_label(label: &str) -> Self {
        match label {
            "front" => LensFacing::Front,
            "rear" => LensFacing::Back,
            "external" => LensFacing::External,
            _ => LensFacing::Unknown,
        }
    }
}

/// Pixel dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Physical sensor dimensions in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSize {
    pub width: f32,
    pub height: f32,
}

/// Raw characteristics a camera backend reports for one sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorCharacteristics {
    pub facing: LensFacing,
    pub focal_lengths: Vec<f32>,
    pub physical_size: Option<SensorSize>,
    pub pixel_array: Option<Resolution>,
}

impl Default for SensorCharacteristics {
    fn default() -> Self {
        Self {
            facing: LensFacing::Unknown,
            focal_lengths: Vec::new(),
            physical_size: None,
            pixel_array: None,
        }
    }
}

impl SensorCharacteristics {
    pub fn min_focal_length(&self) -> f32 {
        self.focal_lengths
            .iter()
            .copied()
            .reduce(f32::min)
            .unwrap_or(0.0)
    }

    /// Horizontal field of view in degrees, formatted with one decimal at most
    pub fn field_of_view(&self) -> String {
        let size = self.physical_size.unwrap_or(SensorSize {
            width: 0.0,
            height: 0.0,
        });
        field_of_view(self.min_focal_length(), size.height)
    }

    pub fn megapixels(&self) -> String {
        megapixels(self.pixel_array)
    }
}

/// Derived, display-ready view of a sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSummary {
    pub camera_id: String,
    pub facing: LensFacing,
    pub fov: String,
    pub resolution: Option<Resolution>,
    pub megapixels: String,
}

impl SensorSummary {
    pub fn from_characteristics(camera_id: impl Into<String>, chars: &SensorCharacteristics) -> Self {
        Self {
            camera_id: camera_id.into(),
            facing: chars.facing,
            fov: chars.field_of_view(),
            resolution: chars.pixel_array,
            megapixels: chars.megapixels(),
        }
    }
}

/// Video color/brightness encoding modes queried for recording support
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DynamicRange {
    Sdr,
    Hlg10Bit,
    Hdr10,
    Hdr10Plus,
    DolbyVision10Bit,
    DolbyVision8Bit,
}

impl DynamicRange {
    pub const ALL: [DynamicRange; 6] = [
        DynamicRange::Sdr,
        DynamicRange::Hlg10Bit,
        DynamicRange::Hdr10,
        DynamicRange::Hdr10Plus,
        DynamicRange::DolbyVision10Bit,
        DynamicRange::DolbyVision8Bit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DynamicRange::Sdr => "SDR",
            DynamicRange::Hlg10Bit => "HLG",
            DynamicRange::Hdr10 => "HDR10",
            DynamicRange::Hdr10Plus => "HDR10+",
            DynamicRange::DolbyVision10Bit => "Dolby Vision 10-bit",
            DynamicRange::DolbyVision8Bit => "Dolby Vision 8-bit",
        }
    }

    /// Member name of the quality array in an uploaded report
    pub fn report_key(&self) -> &'static str {
        match self {
            DynamicRange::Sdr => "video_qualities",
            DynamicRange::Hlg10Bit => "hlg_video_qualities",
            DynamicRange::Hdr10 => "hdr_10_video_qualities",
            DynamicRange::Hdr10Plus => "hdr_10_plus_video_qualities",
            DynamicRange::DolbyVision10Bit => "dolby_vision_10_bit_video_qualities",
            DynamicRange::DolbyVision8Bit => "dolby_vision_8_bit_video_qualities",
        }
    }
}

/// Recording quality tiers, declared lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoQuality {
    Sd,
    Hd,
    Fhd,
    Uhd,
    Unknown,
}

impl VideoQuality {
    pub fn label(&self) -> &'static str {
        match self {
            VideoQuality::Sd => "SD",
            VideoQuality::Hd => "HD",
            VideoQuality::Fhd => "FHD",
            VideoQuality::Uhd => "UHD",
            VideoQuality::Unknown => "Unknown",
        }
    }
}

/// Still image output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Jpeg,
    Raw,
    RawJpeg,
    JpegUltraHdr,
    Unknown,
}

impl OutputFormat {
    pub fn label(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Raw => "RAW",
            OutputFormat::RawJpeg => "RAW + JPEG",
            OutputFormat::JpegUltraHdr => "Ultra HDR",
            OutputFormat::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCaptureCapabilities {
    pub capture_process_progress: bool,
    pub postview: bool,
    pub output_formats: Vec<OutputFormat>,
}

impl ImageCaptureCapabilities {
    pub fn labels(&self) -> Vec<String> {
        let mut labels = Vec::new();
        if self.capture_process_progress {
            labels.push("Capture Process Progress".to_string());
        }
        if self.postview {
            labels.push("Postview".to_string());
        }
        labels.extend(
            self.output_formats
                .iter()
                .map(|format| format!("Output Format: {}", format.label())),
        );
        labels
    }
}

/// Computational photography modes checked on every device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Extension {
    Auto,
    Bokeh,
    Hdr,
    Night,
    FaceRetouch,
}

impl Extension {
    pub const ALL: [Extension; 5] = [
        Extension::Auto,
        Extension::Bokeh,
        Extension::Hdr,
        Extension::Night,
        Extension::FaceRetouch,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Extension::Auto => "Auto",
            Extension::Bokeh => "Bokeh",
            Extension::Hdr => "HDR",
            Extension::Night => "Night",
            Extension::FaceRetouch => "Face Retouch",
        }
    }

    pub fn json_key(&self) -> &'static str {
        match self {
            Extension::Auto => "auto",
            Extension::Bokeh => "bokeh",
            Extension::Hdr => "hdr",
            Extension::Night => "night",
            Extension::FaceRetouch => "face_retouch",
        }
    }
}

/// Tri-state availability of one extension. `None` means unknown or not yet checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionAvailability {
    pub extension: Extension,
    pub camera2: Option<bool>,
    pub camerax: Option<bool>,
    pub strength: Option<bool>,
}

impl ExtensionAvailability {
    pub fn unknown(extension: Extension) -> Self {
        Self {
            extension,
            camera2: None,
            camerax: None,
            strength: None,
        }
    }
}

/// Everything known about one camera after (or during) an aggregation pass.
///
/// Each sub-query owns one `Option` slot; `None` means the query has not
/// reported yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCapabilityRecord {
    pub sensor: SensorSummary,
    pub physical_sensors: Option<Vec<SensorSummary>>,
    pub extensions: Option<BTreeMap<Extension, ExtensionAvailability>>,
    pub video_qualities: Option<BTreeMap<DynamicRange, Vec<VideoQuality>>>,
    pub image_capture: Option<ImageCaptureCapabilities>,
}

impl DeviceCapabilityRecord {
    pub fn new(sensor: SensorSummary) -> Self {
        Self {
            sensor,
            physical_sensors: None,
            extensions: None,
            video_qualities: None,
            image_capture: None,
        }
    }

    pub fn camera_id(&self) -> &str {
        &self.sensor.camera_id
    }

    pub fn facing(&self) -> LensFacing {
        self.sensor.facing
    }

    pub fn is_complete(&self) -> bool {
        self.physical_sensors.is_some()
            && self.extensions.is_some()
            && self.video_qualities.is_some()
            && self.image_capture.is_some()
    }

    /// Quality labels for one dynamic range, highest first
    pub fn quality_labels(&self, range: DynamicRange) -> Vec<String> {
        self.video_qualities
            .as_ref()
            .and_then(|qualities| qualities.get(&range))
            .map(|list| list.iter().map(|q| q.label().to_string()).collect())
            .unwrap_or_default()
    }

    pub fn extension(&self, extension: Extension) -> ExtensionAvailability {
        self.extensions
            .as_ref()
            .and_then(|map| map.get(&extension).copied())
            .unwrap_or_else(|| ExtensionAvailability::unknown(extension))
    }
}

/// AR framework availability, mirroring the states the AR runtime reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArAvailability {
    UnknownChecking,
    UnknownError,
    UnknownTimedOut,
    UnsupportedDeviceNotCapable,
    SupportedNotInstalled,
    SupportedApkTooOld,
    SupportedInstalled,
}

impl ArAvailability {
    /// Only a check still in flight is worth polling again
    pub fn is_transient(&self) -> bool {
        matches!(self, ArAvailability::UnknownChecking)
    }

    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            ArAvailability::SupportedNotInstalled
                | ArAvailability::SupportedApkTooOld
                | ArAvailability::SupportedInstalled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArAvailability::UnknownChecking => "UNKNOWN_CHECKING",
            ArAvailability::UnknownError => "UNKNOWN_ERROR",
            ArAvailability::UnknownTimedOut => "UNKNOWN_TIMED_OUT",
            ArAvailability::UnsupportedDeviceNotCapable => "UNSUPPORTED_DEVICE_NOT_CAPABLE",
            ArAvailability::SupportedNotInstalled => "SUPPORTED_NOT_INSTALLED",
            ArAvailability::SupportedApkTooOld => "SUPPORTED_APK_TOO_OLD",
            ArAvailability::SupportedInstalled => "SUPPORTED_INSTALLED",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArSupportStatus {
    pub availability: Option<ArAvailability>,
    pub depth_supported: Option<bool>,
}

/// Identity of the device a report describes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub brand: String,
    pub model: String,
    pub sdk: u32,
    pub release: String,
    pub security_patch: String,
    pub fingerprint: String,
}

impl DeviceIdentity {
    pub fn new(brand: impl Into<String>, model: impl Into<String>, sdk: u32) -> Self {
        Self {
            brand: brand.into(),
            model: model.into(),
            sdk,
            release: String::new(),
            security_patch: String::new(),
            fingerprint: String::new(),
        }
    }

    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = release.into();
        self
    }

    pub fn with_security_patch(mut self, patch: impl Into<String>) -> Self {
        self.security_patch = patch.into();
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = fingerprint.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lens_facing_sort_key() {
        assert_eq!(LensFacing::External.sort_key(), -2);
        assert_eq!(LensFacing::Back.sort_key(), -1);
        assert_eq!(LensFacing::Unknown.sort_key(), -1);
        assert_eq!(LensFacing::Front.sort_key(), 0);
    }

    #[test]
    fn test_lens_facing_labels_roundtrip() {
        for facing in [
            LensFacing::Front,
            LensFacing::Back,
            LensFacing::External,
            LensFacing::Unknown,
        ] {
            assert_eq!(LensFacing::from_json_label(facing.json_label()), facing);
            assert_eq!(LensFacing::from_raw(facing.raw()), facing);
        }
    }

    #[test]
    fn test_image_capture_labels() {
        let caps = ImageCaptureCapabilities {
            capture_process_progress: true,
            postview: false,
            output_formats: vec![OutputFormat::Jpeg, OutputFormat::JpegUltraHdr],
        };
        assert_eq!(
            caps.labels(),
            vec![
                "Capture Process Progress",
                "Output Format: JPEG",
                "Output Format: Ultra HDR",
            ]
        );
    }

    #[test]
    fn test_record_completeness() {
        let summary = SensorSummary::from_characteristics("0", &SensorCharacteristics::default());
        let mut record = DeviceCapabilityRecord::new(summary);
        assert!(!record.is_complete());
        assert_eq!(record.extension(Extension::Night), ExtensionAvailability::unknown(Extension::Night));

        record.physical_sensors = Some(Vec::new());
        record.extensions = Some(BTreeMap::new());
        record.video_qualities = Some(BTreeMap::new());
        record.image_capture = Some(ImageCaptureCapabilities::default());
        assert!(record.is_complete());
    }

    #[test]
    fn test_ar_availability_states() {
        assert!(ArAvailability::UnknownChecking.is_transient());
        assert!(!ArAvailability::UnknownTimedOut.is_transient());
        assert!(!ArAvailability::SupportedInstalled.is_transient());
        assert!(ArAvailability::SupportedApkTooOld.is_supported());
        assert!(!ArAvailability::UnsupportedDeviceNotCapable.is_supported());
        assert_eq!(
            serde_json::to_string(&ArAvailability::SupportedInstalled).unwrap(),
            "\"SUPPORTED_INSTALLED\""
        );
    }
}
