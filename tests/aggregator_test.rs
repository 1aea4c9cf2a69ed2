//! Capability aggregation over the synthetic flagship device

use crabcaps::capabilities::{CapabilityModel, Notice, RefreshPhase};
use crabcaps::config::AggregatorConfig;
use crabcaps::errors::CapsError;
use crabcaps::testing::{SyntheticArPlatform, SyntheticCamera, SyntheticCameraPlatform};
use crabcaps::types::{
    ArAvailability, DeviceIdentity, DynamicRange, Extension, LensFacing, VideoQuality,
};
use std::sync::Arc;
use std::time::Duration;

fn fast_config() -> AggregatorConfig {
    AggregatorConfig {
        ar_poll_interval_ms: 5,
        ar_poll_timeout_ms: 100,
        query_physical_sensors: true,
    }
}

fn flagship_model() -> CapabilityModel<SyntheticCameraPlatform, SyntheticArPlatform> {
    CapabilityModel::new(
        Arc::new(SyntheticCameraPlatform::flagship()),
        Arc::new(SyntheticArPlatform::supported()),
        fast_config(),
    )
}

#[tokio::test]
async fn test_flagship_refresh_publishes_sorted_complete_records() {
    let model = flagship_model();
    let snapshot = model.refresh().await.unwrap();

    assert_eq!(snapshot.phase, RefreshPhase::Complete);
    assert_eq!(snapshot.generation, 1);
    assert!(snapshot.pending.is_empty());

    let ids: Vec<_> = snapshot.devices.iter().map(|d| d.camera_id()).collect();
    assert_eq!(ids, vec!["0", "1"]);
    assert!(snapshot.devices.iter().all(|d| d.is_complete()));

    let rear = snapshot.device("0").unwrap();
    assert_eq!(rear.facing(), LensFacing::Back);
    assert_eq!(rear.sensor.fov, "143");
    assert_eq!(rear.sensor.megapixels, "50.1");

    let front = snapshot.device("1").unwrap();
    assert_eq!(front.sensor.fov, "95.6");
    assert_eq!(front.sensor.megapixels, "10");
}

#[tokio::test]
async fn test_rear_facing_sorts_before_front_and_external() {
    let platform = SyntheticCameraPlatform::new(DeviceIdentity::new("acme", "one", 34))
        .with_camera(SyntheticCamera::new("a", LensFacing::Front))
        .with_camera(SyntheticCamera::new("b", LensFacing::External))
        .with_camera(SyntheticCamera::new("c", LensFacing::Unknown))
        .with_camera(SyntheticCamera::new("d", LensFacing::Back));

    let model = CapabilityModel::new(
        Arc::new(platform),
        Arc::new(SyntheticArPlatform::new(ArAvailability::UnsupportedDeviceNotCapable)),
        fast_config(),
    );
    let snapshot = model.refresh().await.unwrap();

    let ids: Vec<_> = snapshot.devices.iter().map(|d| d.camera_id()).collect();
    assert_eq!(ids, vec!["b", "c", "d", "a"]);
}

#[tokio::test]
async fn test_physical_sensors_of_logical_camera() {
    let snapshot = flagship_model().refresh().await.unwrap();

    let rear = snapshot.device("0").unwrap();
    let physical = rear.physical_sensors.as_ref().unwrap();
    let fovs: Vec<_> = physical.iter().map(|s| s.fov.as_str()).collect();
    assert_eq!(fovs, vec!["87.3", "143", "40.1"]);

    let front = snapshot.device("1").unwrap();
    assert_eq!(front.physical_sensors.as_deref(), Some(&[][..]));
}

#[tokio::test]
async fn test_vendor_extension_bug_downgrades_to_unknown() {
    let snapshot = flagship_model().refresh().await.unwrap();
    let rear = snapshot.device("0").unwrap();

    let hdr = rear.extension(Extension::Hdr);
    assert_eq!(hdr.camera2, Some(true));
    assert_eq!(hdr.camerax, None);
    assert_eq!(hdr.strength, None);

    let bokeh = rear.extension(Extension::Bokeh);
    assert_eq!(
        (bokeh.camera2, bokeh.camerax, bokeh.strength),
        (Some(true), Some(true), Some(true))
    );

    let night = rear.extension(Extension::Night);
    assert_eq!(night.strength, Some(false));

    let retouch = rear.extension(Extension::FaceRetouch);
    assert_eq!(
        (retouch.camera2, retouch.camerax, retouch.strength),
        (Some(false), Some(false), Some(false))
    );
}

#[tokio::test]
async fn test_extension_lookup_failures_downgrade_per_field() {
    let camera = SyntheticCamera::new("0", LensFacing::Back)
        .with_extensions(&[Extension::Night], &[Extension::Night, Extension::Bokeh])
        .with_strength(&[Extension::Night])
        .with_failing_strength(Extension::Bokeh)
        .with_failing_legacy_extensions();
    let model = CapabilityModel::new(
        Arc::new(SyntheticCameraPlatform::new(DeviceIdentity::new("acme", "One", 34)).with_camera(camera)),
        Arc::new(SyntheticArPlatform::supported()),
        fast_config(),
    );

    let snapshot = model.refresh().await.unwrap();
    let record = snapshot.device("0").unwrap();

    let night = record.extension(Extension::Night);
    assert_eq!(
        (night.camera2, night.camerax, night.strength),
        (Some(false), Some(true), Some(true))
    );

    let bokeh = record.extension(Extension::Bokeh);
    assert_eq!(
        (bokeh.camera2, bokeh.camerax, bokeh.strength),
        (Some(false), Some(true), None)
    );
}

#[tokio::test]
async fn test_video_qualities_are_listed_highest_first() {
    let snapshot = flagship_model().refresh().await.unwrap();
    let rear = snapshot.device("0").unwrap();

    assert_eq!(
        rear.quality_labels(DynamicRange::Sdr),
        vec!["UHD", "FHD", "HD", "SD"]
    );
    assert_eq!(
        rear.quality_labels(DynamicRange::Hlg10Bit),
        vec!["UHD", "FHD", "HD"]
    );
    assert!(rear.quality_labels(DynamicRange::Hdr10).is_empty());

    let qualities = rear.video_qualities.as_ref().unwrap();
    assert_eq!(qualities.len(), DynamicRange::ALL.len());
    assert_eq!(qualities[&DynamicRange::Sdr][0], VideoQuality::Uhd);
}

#[tokio::test]
async fn test_old_sdk_skips_physical_and_legacy_extension_queries() {
    let platform = SyntheticCameraPlatform::flagship().with_sdk_level(27);
    let model = CapabilityModel::new(
        Arc::new(platform),
        Arc::new(SyntheticArPlatform::supported()),
        fast_config(),
    );
    let snapshot = model.refresh().await.unwrap();
    let rear = snapshot.device("0").unwrap();

    assert_eq!(rear.physical_sensors.as_deref(), Some(&[][..]));
    assert_eq!(rear.extension(Extension::Bokeh).camera2, Some(false));
    assert_eq!(rear.extension(Extension::Bokeh).camerax, Some(true));
    assert!(model.poll_notice().await.is_none());
}

#[tokio::test]
async fn test_physical_lookup_failure_raises_notice() {
    let platform = SyntheticCameraPlatform::new(DeviceIdentity::new("acme", "one", 34)).with_camera(
        SyntheticCamera::new("0", LensFacing::Back)
            .with_physical_ids(&["5"])
            .with_failing_physical_lookup(),
    );
    let model = CapabilityModel::new(
        Arc::new(platform),
        Arc::new(SyntheticArPlatform::supported()),
        fast_config(),
    );

    let snapshot = model.refresh().await.unwrap();
    assert_eq!(
        snapshot.device("0").unwrap().physical_sensors.as_deref(),
        Some(&[][..])
    );

    let notice = model.poll_notice().await.unwrap();
    assert_eq!(
        notice,
        Notice::PhysicalCamerasUnavailable {
            camera_id: "0".to_string()
        }
    );
    assert_eq!(
        notice.to_string(),
        "Unable to retrieve physical cameras for camera 0"
    );
    assert!(model.poll_notice().await.is_none());
}

#[tokio::test]
async fn test_camera_unavailable_keeps_previous_devices() {
    let model = flagship_model();
    model.refresh().await.unwrap();

    model.camera().set_available(false);
    let err = model.refresh().await.unwrap_err();
    assert!(matches!(err, CapsError::CameraUnavailable(_)));

    let snapshot = model.snapshot();
    assert_eq!(snapshot.devices.len(), 2);
    assert_eq!(snapshot.phase, RefreshPhase::Complete);
    assert_eq!(snapshot.generation, 2);
    assert_eq!(
        snapshot.ar.availability,
        Some(ArAvailability::SupportedInstalled)
    );

    model.camera().set_available(true);
    assert_eq!(model.refresh().await.unwrap().generation, 3);
}

#[tokio::test]
async fn test_camera_unavailable_on_first_refresh() {
    let model = CapabilityModel::new(
        Arc::new(SyntheticCameraPlatform::flagship().unavailable()),
        Arc::new(SyntheticArPlatform::supported()),
        fast_config(),
    );

    assert!(matches!(
        model.refresh().await,
        Err(CapsError::CameraUnavailable(_))
    ));
    let snapshot = model.snapshot();
    assert!(snapshot.devices.is_empty());
    assert_eq!(snapshot.phase, RefreshPhase::Idle);
}

#[tokio::test]
async fn test_overlapping_refresh_is_rejected() {
    let platform = SyntheticCameraPlatform::flagship().with_query_delay(Duration::from_millis(50));
    let model = CapabilityModel::new(
        Arc::new(platform),
        Arc::new(SyntheticArPlatform::supported()),
        fast_config(),
    );

    let (first, second) = tokio::join!(model.refresh(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        model.refresh().await
    });

    assert!(first.is_ok());
    assert!(matches!(second, Err(CapsError::RefreshInProgress)));
    assert_eq!(model.snapshot().generation, 1);
}

#[tokio::test]
async fn test_dropped_refresh_restores_phase() {
    let platform = SyntheticCameraPlatform::flagship().with_query_delay(Duration::from_millis(100));
    let model = CapabilityModel::new(
        Arc::new(platform),
        Arc::new(SyntheticArPlatform::supported()),
        fast_config(),
    );

    let interrupted = tokio::time::timeout(Duration::from_millis(150), model.refresh()).await;
    assert!(interrupted.is_err());

    let snapshot = model.snapshot();
    assert_eq!(snapshot.phase, RefreshPhase::Idle);
    assert!(snapshot.pending.is_empty());
    assert!(snapshot.devices.is_empty());

    let completed = model.refresh().await.unwrap();
    assert_eq!(completed.phase, RefreshPhase::Complete);
    assert_eq!(completed.devices.len(), 2);
}

#[tokio::test]
async fn test_refresh_replaces_records_wholesale() {
    let model = flagship_model();
    let first = model.refresh().await.unwrap();
    let queries_after_first = model.camera().query_count();

    let second = model.refresh().await.unwrap();
    assert_eq!(first.devices, second.devices);
    assert_eq!(second.generation, 2);
    assert_eq!(model.camera().query_count(), queries_after_first * 2);
}

#[tokio::test]
async fn test_subscribers_observe_completion() {
    let model = flagship_model();
    let mut rx = model.subscribe();
    assert_eq!(rx.borrow().phase, RefreshPhase::Idle);

    model.refresh().await.unwrap();

    assert!(rx.has_changed().unwrap());
    let seen = rx.borrow_and_update().clone();
    assert_eq!(seen.phase, RefreshPhase::Complete);
    assert_eq!(seen.devices.len(), 2);
}

#[tokio::test]
async fn test_ar_probe_waits_out_transient_status() {
    let ar = Arc::new(SyntheticArPlatform::supported().with_transient_polls(3));
    let model = CapabilityModel::new(
        Arc::new(SyntheticCameraPlatform::flagship()),
        Arc::clone(&ar),
        fast_config(),
    );

    let snapshot = model.refresh().await.unwrap();
    assert_eq!(
        snapshot.ar.availability,
        Some(ArAvailability::SupportedInstalled)
    );
    assert_eq!(snapshot.ar.depth_supported, Some(true));
    assert_eq!(ar.poll_count(), 4);
    assert_eq!(ar.sessions_opened(), 2);
    assert_eq!(ar.sessions_closed(), 2);
}

#[tokio::test]
async fn test_ar_probe_times_out() {
    let ar = Arc::new(SyntheticArPlatform::forever_transient());
    let model = CapabilityModel::new(
        Arc::new(SyntheticCameraPlatform::flagship()),
        Arc::clone(&ar),
        AggregatorConfig {
            ar_poll_interval_ms: 10,
            ar_poll_timeout_ms: 50,
            query_physical_sensors: true,
        },
    );

    let snapshot = model.refresh().await.unwrap();
    assert_eq!(snapshot.ar.availability, Some(ArAvailability::UnknownTimedOut));
    assert_eq!(snapshot.ar.depth_supported, None);
    assert!(ar.poll_count() >= 2);
}

#[tokio::test]
async fn test_platform_timed_out_status_is_settled() {
    let ar = Arc::new(SyntheticArPlatform::new(ArAvailability::UnknownTimedOut));
    let model = CapabilityModel::new(
        Arc::new(SyntheticCameraPlatform::flagship()),
        Arc::clone(&ar),
        AggregatorConfig {
            ar_poll_interval_ms: 200,
            ar_poll_timeout_ms: 0,
            query_physical_sensors: true,
        },
    );

    let snapshot = tokio::time::timeout(Duration::from_secs(5), model.refresh())
        .await
        .expect("refresh should not wait on a settled AR status")
        .unwrap();
    assert_eq!(snapshot.ar.availability, Some(ArAvailability::UnknownTimedOut));
    assert_eq!(snapshot.ar.depth_supported, None);
    assert_eq!(ar.poll_count(), 1);
}

#[tokio::test]
async fn test_ar_session_failure_marks_device_not_capable() {
    let ar = Arc::new(SyntheticArPlatform::supported().with_failing_sessions());
    let model = CapabilityModel::new(
        Arc::new(SyntheticCameraPlatform::flagship()),
        Arc::clone(&ar),
        fast_config(),
    );

    let snapshot = model.refresh().await.unwrap();
    assert_eq!(
        snapshot.ar.availability,
        Some(ArAvailability::UnsupportedDeviceNotCapable)
    );
    assert_eq!(snapshot.ar.depth_supported, Some(false));
    assert_eq!(ar.sessions_closed(), 0);
}

#[tokio::test]
async fn test_ar_not_installed_skips_depth_check() {
    let ar = Arc::new(SyntheticArPlatform::new(ArAvailability::SupportedNotInstalled));
    let model = CapabilityModel::new(
        Arc::new(SyntheticCameraPlatform::flagship()),
        Arc::clone(&ar),
        fast_config(),
    );

    let snapshot = model.refresh().await.unwrap();
    assert_eq!(snapshot.ar.depth_supported, None);
    assert_eq!(ar.sessions_opened(), 1);
}
