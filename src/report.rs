//! Capability report wire format
//!
//! A report is one JSON object: device identity members, an `arcore` member,
//! and one member per camera id. There is no version field, so parsing
//! tolerates missing members and skips members it cannot interpret.

use crate::capabilities::CapabilitySnapshot;
use crate::errors::CapsError;
use crate::types::{
    DeviceCapabilityRecord, DeviceIdentity, DynamicRange, Extension, Resolution, SensorSummary,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const HEADER_KEYS: [&str; 7] = [
    "device_brand",
    "device_model",
    "device_sdk",
    "device_release",
    "device_security",
    "build_fingerprint",
    "arcore",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArReport {
    pub arcore_support: Option<String>,
    pub depth_support: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorReport {
    pub lens_facing: String,
    pub fov: String,
    /// `"<width>x<height>"`
    pub resolution: Option<String>,
}

impl SensorReport {
    fn from_summary(summary: &SensorSummary) -> Self {
        Self {
            lens_facing: summary.facing.json_label().to_string(),
            fov: summary.fov.clone(),
            resolution: summary.resolution.map(format_resolution),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionReport {
    pub camera2: Option<bool>,
    pub camerax: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraReport {
    #[serde(flatten)]
    pub sensor: SensorReport,
    pub physical_sensors: Vec<SensorReport>,
    pub video_qualities: Vec<String>,
    pub hlg_video_qualities: Vec<String>,
    pub hdr_10_video_qualities: Vec<String>,
    pub hdr_10_plus_video_qualities: Vec<String>,
    pub dolby_vision_10_bit_video_qualities: Vec<String>,
    pub dolby_vision_8_bit_video_qualities: Vec<String>,
    pub image_capture_capabilities: Vec<String>,
    pub extensions: BTreeMap<String, ExtensionReport>,
}

impl CameraReport {
    pub fn from_record(record: &DeviceCapabilityRecord) -> Self {
        let mut report = Self {
            sensor: SensorReport::from_summary(&record.sensor),
            physical_sensors: record
                .physical_sensors
                .iter()
                .flatten()
                .map(SensorReport::from_summary)
                .collect(),
            image_capture_capabilities: record
                .image_capture
                .as_ref()
                .map(|caps| caps.labels())
                .unwrap_or_default(),
            extensions: Extension::ALL
                .iter()
                .map(|&extension| {
                    let availability = record.extension(extension);
                    (
                        extension.json_key().to_string(),
                        ExtensionReport {
                            camera2: availability.camera2,
                            camerax: availability.camerax,
                        },
                    )
                })
                .collect(),
            ..Self::default()
        };

        for range in DynamicRange::ALL {
            *report.qualities_mut(range) = record.quality_labels(range);
        }
        report
    }

    pub fn qualities(&self, range: DynamicRange) -> &[String] {
        match range {
            DynamicRange::Sdr => &self.video_qualities,
            DynamicRange::Hlg10Bit => &self.hlg_video_qualities,
            DynamicRange::Hdr10 => &self.hdr_10_video_qualities,
            DynamicRange::Hdr10Plus => &self.hdr_10_plus_video_qualities,
            DynamicRange::DolbyVision10Bit => &self.dolby_vision_10_bit_video_qualities,
            DynamicRange::DolbyVision8Bit => &self.dolby_vision_8_bit_video_qualities,
        }
    }

    fn qualities_mut(&mut self, range: DynamicRange) -> &mut Vec<String> {
        match range {
            DynamicRange::Sdr => &mut self.video_qualities,
            DynamicRange::Hlg10Bit => &mut self.hlg_video_qualities,
            DynamicRange::Hdr10 => &mut self.hdr_10_video_qualities,
            DynamicRange::Hdr10Plus => &mut self.hdr_10_plus_video_qualities,
            DynamicRange::DolbyVision10Bit => &mut self.dolby_vision_10_bit_video_qualities,
            DynamicRange::DolbyVision8Bit => &mut self.dolby_vision_8_bit_video_qualities,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapabilityReport {
    pub device_brand: String,
    pub device_model: String,
    pub device_sdk: u32,
    pub device_release: String,
    pub device_security: String,
    pub build_fingerprint: String,
    pub arcore: ArReport,
    #[serde(flatten)]
    pub cameras: BTreeMap<String, CameraReport>,
}

impl CapabilityReport {
    /// Build a report from the published device list of a snapshot
    pub fn build(identity: &DeviceIdentity, snapshot: &CapabilitySnapshot) -> Self {
        Self {
            device_brand: identity.brand.clone(),
            device_model: identity.model.clone(),
            device_sdk: identity.sdk,
            device_release: identity.release.clone(),
            device_security: identity.security_patch.clone(),
            build_fingerprint: identity.fingerprint.clone(),
            arcore: ArReport {
                arcore_support: snapshot.ar.availability.map(|a| a.as_str().to_string()),
                depth_support: snapshot.ar.depth_supported,
            },
            cameras: snapshot
                .devices
                .iter()
                .map(|record| (record.camera_id().to_string(), CameraReport::from_record(record)))
                .collect(),
        }
    }

    /// Serialize with 4-space indentation
    pub fn to_json_pretty(&self) -> Result<String, CapsError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        String::from_utf8(buf).map_err(|e| CapsError::Io(std::io::Error::other(e)))
    }

    /// Parse a report produced by any client version
    pub fn parse(json: &str) -> Result<Self, CapsError> {
        let value: Value = serde_json::from_str(json)?;
        let object = match value {
            Value::Object(object) => object,
            other => {
                return Err(CapsError::Report(serde::de::Error::custom(format!(
                    "expected a JSON object, found {}",
                    json_type(&other)
                ))))
            }
        };

        let string = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let arcore = object
            .get("arcore")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        let cameras = object
            .iter()
            .filter(|(key, value)| !HEADER_KEYS.contains(&key.as_str()) && value.is_object())
            .filter_map(|(key, value)| match serde_json::from_value::<CameraReport>(value.clone()) {
                Ok(camera) => Some((key.clone(), camera)),
                Err(e) => {
                    log::debug!("Skipping unreadable report member {}: {}", key, e);
                    None
                }
            })
            .collect();

        Ok(Self {
            device_brand: string("device_brand"),
            device_model: string("device_model"),
            device_sdk: object
                .get("device_sdk")
                .and_then(Value::as_u64)
                .and_then(|sdk| u32::try_from(sdk).ok())
                .unwrap_or_default(),
            device_release: string("device_release"),
            device_security: string("device_security"),
            build_fingerprint: string("build_fingerprint"),
            arcore,
            cameras,
        })
    }
}

pub fn format_resolution(resolution: Resolution) -> String {
    format!("{}x{}", resolution.width, resolution.height)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
