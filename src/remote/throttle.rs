//! One-action-per-interval throttle for uploads and exports

use chrono::{DateTime, Utc};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug)]
pub struct ActionThrottle {
    interval: Duration,
    /// Keeps the last action time across process runs when set
    state_file: Option<PathBuf>,
    last: Mutex<Option<DateTime<Utc>>>,
}

impl ActionThrottle {
    /// In-memory throttle. A zero interval never throttles.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state_file: None,
            last: Mutex::new(None),
        }
    }

    /// Throttle whose last action time is read from and written to `state_file`
    pub fn persisted(interval: Duration, state_file: impl Into<PathBuf>) -> Self {
        let state_file = state_file.into();
        let last = fs::read_to_string(&state_file)
            .ok()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
            .map(|at| at.with_timezone(&Utc));

        Self {
            interval,
            state_file: Some(state_file),
            last: Mutex::new(last),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Record an action at the current time, or return how long to wait when
    /// the previous one was less than one interval ago.
    pub fn try_begin(&self) -> Result<(), Duration> {
        self.try_begin_at(Utc::now())
    }

    /// Same as [`try_begin`](Self::try_begin) at an explicit time. The gap is
    /// measured in both directions so a clock moved backwards still throttles.
    pub fn try_begin_at(&self, now: DateTime<Utc>) -> Result<(), Duration> {
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if !self.interval.is_zero() {
            if let Some(previous) = *last {
                let gap = (now - previous).abs().to_std().unwrap_or(Duration::ZERO);
                if gap < self.interval {
                    let remaining = self.interval - gap;
                    log::info!("Rate limited, retry in {}s", remaining.as_secs().max(1));
                    return Err(remaining);
                }
            }
        }

        *last = Some(now);
        if let Some(path) = &self.state_file {
            if let Err(e) = fs::write(path, now.to_rfc3339()) {
                log::warn!("Could not persist action time to {:?}: {}", path, e);
            }
        }
        Ok(())
    }
}
