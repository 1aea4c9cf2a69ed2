//! AR framework availability and depth support probing

use crate::config::AggregatorConfig;
use crate::platform::{ArPlatform, PlatformError, PlatformResult};
use crate::types::{ArAvailability, ArSupportStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

async fn blocking<A, T, F>(ar: &Arc<A>, f: F) -> PlatformResult<T>
where
    A: ArPlatform,
    T: Send + 'static,
    F: FnOnce(&A) -> PlatformResult<T> + Send + 'static,
{
    let ar = Arc::clone(ar);
    tokio::task::spawn_blocking(move || f(ar.as_ref()))
        .await
        .map_err(|e| PlatformError::Backend(format!("AR task failed: {}", e)))?
}

/// Poll availability until it leaves `UnknownChecking`.
///
/// With no `timeout` this polls forever when the runtime never settles. When
/// the bound is reached the result is [`ArAvailability::UnknownTimedOut`].
pub async fn await_availability<A: ArPlatform>(
    ar: &Arc<A>,
    interval: Duration,
    timeout: Option<Duration>,
) -> PlatformResult<ArAvailability> {
    let deadline = timeout.map(|t| Instant::now() + t);
    let mut polls = 0u32;

    loop {
        let status = blocking(ar, |ar| ar.check_availability()).await?;
        polls += 1;

        if !status.is_transient() {
            log::debug!("AR availability settled on {} after {} polls", status.as_str(), polls);
            return Ok(status);
        }

        if let Some(deadline) = deadline {
            if Instant::now() + interval > deadline {
                log::warn!("AR availability still transient after {} polls, giving up", polls);
                return Ok(ArAvailability::UnknownTimedOut);
            }
        }

        tokio::time::sleep(interval).await;
    }
}

/// Full AR probe: availability, depth support and a throwaway session check
pub async fn probe_ar<A: ArPlatform>(ar: &Arc<A>, config: &AggregatorConfig) -> ArSupportStatus {
    let status =
        match await_availability(ar, config.ar_poll_interval(), config.ar_poll_timeout()).await {
            Ok(status) => Some(status),
            Err(e) => {
                log::error!("Error awaiting AR availability: {}", e);
                None
            }
        };

    let depth_supported = if status == Some(ArAvailability::SupportedInstalled) {
        let depth = blocking(ar, |ar| {
            let session = ar.open_session()?;
            let supported = session.is_depth_supported();
            session.close();
            supported
        })
        .await;

        Some(depth.unwrap_or_else(|e| {
            log::error!("Error checking depth mode status: {}", e);
            false
        }))
    } else {
        None
    };

    let availability = match blocking(ar, |ar| ar.open_session().map(|session| session.close())).await
    {
        Ok(()) => status,
        Err(e) => {
            log::error!("Error opening AR session: {}", e);
            Some(ArAvailability::UnsupportedDeviceNotCapable)
        }
    };

    log::info!(
        "AR support: {} (depth: {:?})",
        availability.map(|a| a.as_str()).unwrap_or("unknown"),
        depth_supported
    );

    ArSupportStatus {
        availability,
        depth_supported,
    }
}
