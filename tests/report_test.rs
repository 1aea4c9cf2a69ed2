//! Capability report wire format

use crabcaps::capabilities::CapabilityModel;
use crabcaps::config::AggregatorConfig;
use crabcaps::report::CapabilityReport;
use crabcaps::testing::{SyntheticArPlatform, SyntheticCameraPlatform};
use serde_json::{json, Value};
use std::sync::Arc;

async fn flagship_report() -> CapabilityReport {
    let model = CapabilityModel::new(
        Arc::new(SyntheticCameraPlatform::flagship()),
        Arc::new(SyntheticArPlatform::supported()),
        AggregatorConfig::default(),
    );
    crabcaps::collect_report(&model).await.unwrap()
}

#[tokio::test]
async fn test_report_header_members() {
    let report = flagship_report().await;
    let value: Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();

    assert_eq!(value["device_brand"], "google");
    assert_eq!(value["device_model"], "Pixel 8 Pro");
    assert_eq!(value["device_sdk"], 34);
    assert_eq!(value["device_release"], "14");
    assert_eq!(value["device_security"], "2024-01-05");
    assert!(value["build_fingerprint"]
        .as_str()
        .unwrap()
        .starts_with("google/husky"));
    assert_eq!(
        value["arcore"],
        json!({"arcore_support": "SUPPORTED_INSTALLED", "depth_support": true})
    );
}

#[tokio::test]
async fn test_report_camera_members() {
    let report = flagship_report().await;
    let value: Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();

    let rear = &value["0"];
    assert_eq!(rear["lens_facing"], "rear");
    assert_eq!(rear["fov"], "143");
    assert_eq!(rear["resolution"], "8160x6144");
    assert_eq!(rear["video_qualities"], json!(["UHD", "FHD", "HD", "SD"]));
    assert_eq!(rear["hlg_video_qualities"], json!(["UHD", "FHD", "HD"]));
    assert_eq!(rear["dolby_vision_8_bit_video_qualities"], json!([]));
    assert_eq!(
        rear["image_capture_capabilities"],
        json!([
            "Capture Process Progress",
            "Postview",
            "Output Format: JPEG",
            "Output Format: Ultra HDR"
        ])
    );

    let physical = rear["physical_sensors"].as_array().unwrap();
    assert_eq!(physical.len(), 3);
    assert_eq!(
        physical[1],
        json!({"lens_facing": "rear", "fov": "143", "resolution": "4080x3072"})
    );

    assert_eq!(rear["extensions"]["hdr"], json!({"camera2": true, "camerax": null}));
    assert_eq!(rear["extensions"]["bokeh"], json!({"camera2": true, "camerax": true}));
    assert_eq!(
        rear["extensions"]["face_retouch"],
        json!({"camera2": false, "camerax": false})
    );

    assert_eq!(value["1"]["lens_facing"], "front");
    assert_eq!(value["1"]["physical_sensors"], json!([]));
}

#[tokio::test]
async fn test_report_survives_reparse() {
    let report = flagship_report().await;
    let parsed = CapabilityReport::parse(&report.to_json_pretty().unwrap()).unwrap();
    assert_eq!(parsed, report);
}

#[test]
fn test_parse_report_from_older_client() {
    let json = r#"{
        "device_brand": "samsung",
        "device_model": "SM-S918B",
        "device_sdk": 33,
        "build_fingerprint": "samsung/dm3q/dm3q:13",
        "0": {
            "lens_facing": "rear",
            "fov": "77.3",
            "video_qualities": ["UHD", "FHD"],
            "extensions": {"night": {"camera2": true}}
        }
    }"#;

    let report = CapabilityReport::parse(json).unwrap();
    assert_eq!(report.device_model, "SM-S918B");
    assert_eq!(report.device_release, "");
    assert_eq!(report.arcore.arcore_support, None);

    let camera = &report.cameras["0"];
    assert_eq!(camera.sensor.resolution, None);
    assert_eq!(camera.video_qualities, vec!["UHD", "FHD"]);
    assert!(camera.physical_sensors.is_empty());
    assert_eq!(camera.extensions["night"].camera2, Some(true));
    assert_eq!(camera.extensions["night"].camerax, None);
}
