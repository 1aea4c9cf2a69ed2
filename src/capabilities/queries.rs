//! Per-device capability sub-queries
//!
//! Each query is a blocking function producing a [`DeviceUpdate`] for exactly
//! one slot of a [`DeviceCapabilityRecord`]. Failures are downgraded here so a
//! query never aborts its siblings.

use crate::platform::{CameraPlatform, PlatformError, SDK_CAMERA_EXTENSIONS, SDK_PHYSICAL_CAMERAS};
use crate::types::{
    DeviceCapabilityRecord, DynamicRange, Extension, ExtensionAvailability,
    ImageCaptureCapabilities, SensorSummary, VideoQuality,
};
use std::collections::BTreeMap;
use std::fmt;

/// Transient message for the user; never fatal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    PhysicalCamerasUnavailable { camera_id: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::PhysicalCamerasUnavailable { camera_id } => {
                write!(f, "Unable to retrieve physical cameras for camera {}", camera_id)
            }
        }
    }
}

/// Result of one sub-query, applied to the matching record slot
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceUpdate {
    PhysicalSensors(Vec<SensorSummary>),
    Extensions(BTreeMap<Extension, ExtensionAvailability>),
    VideoQualities(BTreeMap<DynamicRange, Vec<VideoQuality>>),
    ImageCapture(ImageCaptureCapabilities),
}

impl DeviceUpdate {
    pub fn apply(&self, record: &mut DeviceCapabilityRecord) {
        match self {
            DeviceUpdate::PhysicalSensors(sensors) => {
                record.physical_sensors = Some(sensors.clone())
            }
            DeviceUpdate::Extensions(extensions) => record.extensions = Some(extensions.clone()),
            DeviceUpdate::VideoQualities(qualities) => {
                record.video_qualities = Some(qualities.clone())
            }
            DeviceUpdate::ImageCapture(caps) => record.image_capture = Some(caps.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubQueryOutcome {
    pub camera_id: String,
    pub update: DeviceUpdate,
    pub notice: Option<Notice>,
}

impl SubQueryOutcome {
    fn new(camera_id: &str, update: DeviceUpdate) -> Self {
        Self {
            camera_id: camera_id.to_string(),
            update,
            notice: None,
        }
    }
}

/// Enumerate physical sensors behind a logical camera.
///
/// Skipped (empty) below [`SDK_PHYSICAL_CAMERAS`]. An illegal-argument failure
/// anywhere in the enumeration discards the whole set and raises a notice.
pub fn physical_sensors<C: CameraPlatform + ?Sized>(
    camera: &C,
    camera_id: &str,
    enabled: bool,
) -> SubQueryOutcome {
    if !enabled || camera.sdk_level() < SDK_PHYSICAL_CAMERAS {
        log::debug!("Skipping physical sensor enumeration for camera {}", camera_id);
        return SubQueryOutcome::new(camera_id, DeviceUpdate::PhysicalSensors(Vec::new()));
    }

    let sensors = camera.physical_camera_ids(camera_id).and_then(|ids| {
        ids.into_iter()
            .map(|id| {
                camera
                    .characteristics(&id)
                    .map(|chars| SensorSummary::from_characteristics(id, &chars))
            })
            .collect::<Result<Vec<_>, _>>()
    });

    match sensors {
        Ok(sensors) => {
            log::debug!(
                "Camera {} exposes {} physical sensors",
                camera_id,
                sensors.len()
            );
            SubQueryOutcome::new(camera_id, DeviceUpdate::PhysicalSensors(sensors))
        }
        Err(PlatformError::IllegalArgument(msg)) => {
            log::warn!(
                "Unable to retrieve physical cameras for {}: {}",
                camera_id,
                msg
            );
            SubQueryOutcome {
                camera_id: camera_id.to_string(),
                update: DeviceUpdate::PhysicalSensors(Vec::new()),
                notice: Some(Notice::PhysicalCamerasUnavailable {
                    camera_id: camera_id.to_string(),
                }),
            }
        }
        Err(e) => {
            log::warn!("Physical sensor enumeration failed for {}: {}", camera_id, e);
            SubQueryOutcome::new(camera_id, DeviceUpdate::PhysicalSensors(Vec::new()))
        }
    }
}

/// Cross-check every known extension against the legacy bitmask and the newer query API
pub fn extensions<C: CameraPlatform + ?Sized>(camera: &C, camera_id: &str) -> SubQueryOutcome {
    let legacy = if camera.sdk_level() >= SDK_CAMERA_EXTENSIONS {
        camera.legacy_extensions(camera_id).unwrap_or_else(|e| {
            log::warn!("Error getting camera extensions for {}: {}", camera_id, e);
            Vec::new()
        })
    } else {
        Vec::new()
    };

    let availability = Extension::ALL
        .iter()
        .map(|&extension| {
            let camerax = match camera.extension_available(camera_id, extension) {
                Ok(available) => Some(available),
                Err(PlatformError::IllegalState(msg)) => {
                    log::warn!(
                        "Extension query for {} on camera {} hit a vendor bug: {}",
                        extension.label(),
                        camera_id,
                        msg
                    );
                    None
                }
                Err(e) => {
                    log::warn!(
                        "Extension query for {} on camera {} failed: {}",
                        extension.label(),
                        camera_id,
                        e
                    );
                    None
                }
            };

            let strength = match camerax {
                Some(true) => camera
                    .extension_strength_available(camera_id, extension)
                    .map_err(|e| {
                        log::warn!(
                            "Strength query for {} on camera {} failed: {}",
                            extension.label(),
                            camera_id,
                            e
                        )
                    })
                    .ok(),
                Some(false) => Some(false),
                None => None,
            };

            (
                extension,
                ExtensionAvailability {
                    extension,
                    camera2: Some(legacy.contains(&extension)),
                    camerax,
                    strength,
                },
            )
        })
        .collect();

    SubQueryOutcome::new(camera_id, DeviceUpdate::Extensions(availability))
}

/// Supported recording qualities for every dynamic range, highest first
pub fn video_qualities<C: CameraPlatform + ?Sized>(camera: &C, camera_id: &str) -> SubQueryOutcome {
    let qualities = DynamicRange::ALL
        .iter()
        .map(|&range| {
            let mut list = camera.video_qualities(camera_id, range).unwrap_or_else(|e| {
                log::warn!(
                    "Video quality query for {} on camera {} failed: {}",
                    range.label(),
                    camera_id,
                    e
                );
                Vec::new()
            });
            list.reverse();
            (range, list)
        })
        .collect();

    SubQueryOutcome::new(camera_id, DeviceUpdate::VideoQualities(qualities))
}

pub fn image_capture<C: CameraPlatform + ?Sized>(camera: &C, camera_id: &str) -> SubQueryOutcome {
    let caps = camera
        .image_capture_capabilities(camera_id)
        .unwrap_or_else(|e| {
            log::warn!("Image capture query on camera {} failed: {}", camera_id, e);
            ImageCaptureCapabilities::default()
        });

    SubQueryOutcome::new(camera_id, DeviceUpdate::ImageCapture(caps))
}
