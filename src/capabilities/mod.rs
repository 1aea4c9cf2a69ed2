//! Capability aggregation
//!
//! A refresh fans out four sub-queries per camera plus one AR probe, merges
//! each result into a per-refresh set of records as it lands, and publishes
//! progress through a [`tokio::sync::watch`] channel. The sorted device list
//! replaces the previous one only when every sub-query has joined.

pub mod ar;
pub mod queries;

pub use ar::{await_availability, probe_ar};
pub use queries::{DeviceUpdate, Notice, SubQueryOutcome};

use crate::config::AggregatorConfig;
use crate::errors::CapsError;
use crate::platform::{ArPlatform, CameraPlatform, PlatformError};
use crate::types::{
    ArSupportStatus, DeviceCapabilityRecord, SensorCharacteristics, SensorSummary,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RefreshPhase {
    Idle,
    /// Fan-out launched, no sub-query finished yet
    Refreshing,
    /// Some sub-queries finished; `pending` holds incremental state
    Partial,
    /// Device list published
    Complete,
}

/// Observable aggregation state
#[derive(Debug, Clone, Serialize)]
pub struct CapabilitySnapshot {
    pub phase: RefreshPhase,
    /// Last published list, sorted for display
    pub devices: Vec<DeviceCapabilityRecord>,
    /// Records of the refresh in flight, keyed by camera id
    pub pending: BTreeMap<String, DeviceCapabilityRecord>,
    pub ar: ArSupportStatus,
    /// Number of refreshes started
    pub generation: u64,
}

impl Default for CapabilitySnapshot {
    fn default() -> Self {
        Self {
            phase: RefreshPhase::Idle,
            devices: Vec::new(),
            pending: BTreeMap::new(),
            ar: ArSupportStatus::default(),
            generation: 0,
        }
    }
}

impl CapabilitySnapshot {
    pub fn device(&self, camera_id: &str) -> Option<&DeviceCapabilityRecord> {
        self.devices.iter().find(|d| d.camera_id() == camera_id)
    }
}

/// Back-facing cameras first (raw facing negated, ascending), then by id
pub fn sort_devices(devices: &mut [DeviceCapabilityRecord]) {
    devices.sort_by(|a, b| {
        a.facing()
            .sort_key()
            .cmp(&b.facing().sort_key())
            .then_with(|| a.camera_id().cmp(b.camera_id()))
    });
}

pub struct CapabilityModel<C: CameraPlatform, A: ArPlatform> {
    camera: Arc<C>,
    ar: Arc<A>,
    config: AggregatorConfig,
    state: watch::Sender<CapabilitySnapshot>,
    notice_sender: mpsc::UnboundedSender<Notice>,
    notice_receiver: Mutex<mpsc::UnboundedReceiver<Notice>>,
    refresh_lock: Mutex<()>,
}

impl<C: CameraPlatform, A: ArPlatform> CapabilityModel<C, A> {
    pub fn new(camera: Arc<C>, ar: Arc<A>, config: AggregatorConfig) -> Self {
        let (state, _) = watch::channel(CapabilitySnapshot::default());
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            camera,
            ar,
            config,
            state,
            notice_sender: tx,
            notice_receiver: Mutex::new(rx),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn camera(&self) -> &Arc<C> {
        &self.camera
    }

    pub fn subscribe(&self) -> watch::Receiver<CapabilitySnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> CapabilitySnapshot {
        self.state.borrow().clone()
    }

    /// Next pending user notice (non-blocking)
    pub async fn poll_notice(&self) -> Option<Notice> {
        let mut rx = self.notice_receiver.lock().await;
        rx.try_recv().ok()
    }

    /// Run one aggregation pass.
    ///
    /// Fails with [`CapsError::RefreshInProgress`] while another pass runs, and
    /// with [`CapsError::CameraUnavailable`] when the camera service cannot be
    /// reached; in that case the last published device list stays in place
    /// while the AR result of this pass is still published.
    pub async fn refresh(&self) -> Result<CapabilitySnapshot, CapsError> {
        let _guard = self
            .refresh_lock
            .try_lock()
            .map_err(|_| CapsError::RefreshInProgress)?;

        let mut pass = PassGuard {
            state: &self.state,
            previous_phase: self.state.borrow().phase,
            finished: false,
        };
        self.state.send_modify(|s| {
            s.phase = RefreshPhase::Refreshing;
            s.pending.clear();
            s.ar = ArSupportStatus::default();
            s.generation += 1;
        });
        log::info!("Starting capability refresh #{}", self.state.borrow().generation);

        let ar_task = async {
            let status = probe_ar(&self.ar, &self.config).await;
            self.state.send_modify(|s| s.ar = status);
        };

        let (_, devices) = tokio::join!(ar_task, self.collect_devices());

        match devices {
            Ok(devices) => {
                log::info!("Capability refresh complete: {} cameras", devices.len());
                pass.finished = true;
                self.state.send_modify(|s| {
                    s.devices = devices;
                    s.pending.clear();
                    s.phase = RefreshPhase::Complete;
                });
                Ok(self.snapshot())
            }
            Err(e) => {
                log::error!("Capability refresh aborted: {}", e);
                Err(e)
            }
        }
    }

    async fn collect_devices(&self) -> Result<Vec<DeviceCapabilityRecord>, CapsError> {
        let camera = Arc::clone(&self.camera);
        let headers = tokio::task::spawn_blocking(move || read_headers(camera.as_ref()))
            .await
            .map_err(|e| CapsError::Platform(PlatformError::Backend(e.to_string())))??;

        let mut records: BTreeMap<String, DeviceCapabilityRecord> = headers
            .into_iter()
            .map(|summary| (summary.camera_id.clone(), DeviceCapabilityRecord::new(summary)))
            .collect();

        let pending = records.clone();
        self.state.send_modify(|s| s.pending = pending);

        let mut set = JoinSet::new();
        for camera_id in records.keys() {
            self.spawn_queries(&mut set, camera_id);
        }

        while let Some(joined) = set.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::error!("Capability sub-query failed to complete: {}", e);
                    continue;
                }
            };

            if let Some(notice) = outcome.notice.clone() {
                let _ = self.notice_sender.send(notice);
            }
            if let Some(record) = records.get_mut(&outcome.camera_id) {
                outcome.update.apply(record);
            }
            self.state.send_modify(|s| {
                if let Some(record) = s.pending.get_mut(&outcome.camera_id) {
                    outcome.update.apply(record);
                }
                s.phase = RefreshPhase::Partial;
            });
        }

        let mut devices: Vec<_> = records.into_values().collect();
        sort_devices(&mut devices);
        Ok(devices)
    }

    fn spawn_queries(&self, set: &mut JoinSet<SubQueryOutcome>, camera_id: &str) {
        let physical_enabled = self.config.query_physical_sensors;

        let (camera, id) = (Arc::clone(&self.camera), camera_id.to_string());
        set.spawn_blocking(move || queries::physical_sensors(camera.as_ref(), &id, physical_enabled));

        let (camera, id) = (Arc::clone(&self.camera), camera_id.to_string());
        set.spawn_blocking(move || queries::extensions(camera.as_ref(), &id));

        let (camera, id) = (Arc::clone(&self.camera), camera_id.to_string());
        set.spawn_blocking(move || queries::video_qualities(camera.as_ref(), &id));

        let (camera, id) = (Arc::clone(&self.camera), camera_id.to_string());
        set.spawn_blocking(move || queries::image_capture(camera.as_ref(), &id));
    }
}

/// Puts the phase back and drops pending records unless the pass finished,
/// whether it failed or its future was dropped.
struct PassGuard<'a> {
    state: &'a watch::Sender<CapabilitySnapshot>,
    previous_phase: RefreshPhase,
    finished: bool,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let phase = self.previous_phase;
        self.state.send_modify(|s| {
            s.pending.clear();
            s.phase = phase;
        });
    }
}

/// Enumerate cameras and read each one's characteristics.
///
/// Camera-unavailable failures abort the pass; any other characteristics
/// failure leaves that camera with unknown optics.
fn read_headers<C: CameraPlatform + ?Sized>(camera: &C) -> Result<Vec<SensorSummary>, CapsError> {
    let ids = camera.camera_ids().map_err(|e| match e {
        PlatformError::CameraUnavailable(msg) => CapsError::CameraUnavailable(msg),
        other => CapsError::Platform(other),
    })?;

    let mut headers = Vec::with_capacity(ids.len());
    for id in ids {
        let chars = match camera.characteristics(&id) {
            Ok(chars) => chars,
            Err(PlatformError::CameraUnavailable(msg)) => {
                return Err(CapsError::CameraUnavailable(msg))
            }
            Err(e) => {
                log::warn!("Could not read characteristics for camera {}: {}", id, e);
                SensorCharacteristics::default()
            }
        };
        log::debug!("Camera {} faces {:?}", id, chars.facing);
        headers.push(SensorSummary::from_characteristics(id, &chars));
    }

    Ok(headers)
}
