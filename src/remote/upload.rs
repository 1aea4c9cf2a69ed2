//! Report upload flow

use super::auth::{sign_in_if_needed, Authenticator, IntegrityVerifier};
use super::store::DocumentStore;
use super::throttle::ActionThrottle;
use super::run_blocking;
use crate::config::RemoteConfig;
use crate::errors::CapsError;
use crate::report::CapabilityReport;
use crate::types::DeviceIdentity;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Document ids are the local upload time
pub const DOCUMENT_ID_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum UploadResult {
    Uploading,
    Success,
    /// An identical report already exists; nothing was written
    DuplicateData,
    IntegrityFailure,
    SignInFailure(String),
    UploadFailure(String),
    /// Another upload ran less than the configured interval ago; seconds left
    RateLimited(u64),
}

impl UploadResult {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            UploadResult::IntegrityFailure
                | UploadResult::SignInFailure(_)
                | UploadResult::UploadFailure(_)
                | UploadResult::RateLimited(_)
        )
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            UploadResult::SignInFailure(message) | UploadResult::UploadFailure(message) => {
                Some(message)
            }
            _ => None,
        }
    }
}

/// Collection holding every report for one device build
pub fn collection_path(config: &RemoteConfig, identity: &DeviceIdentity) -> String {
    format!(
        "{}/{}/{}/{}/{}",
        config.collection_root,
        identity.brand.to_uppercase(),
        identity.model.to_uppercase(),
        identity.sdk,
        config.node_marker
    )
}

pub struct Uploader<S, A, V>
where
    S: DocumentStore,
    A: Authenticator,
    V: IntegrityVerifier,
{
    store: Arc<S>,
    auth: Arc<A>,
    verifier: Arc<V>,
    config: RemoteConfig,
    throttle: ActionThrottle,
}

impl<S, A, V> Uploader<S, A, V>
where
    S: DocumentStore,
    A: Authenticator,
    V: IntegrityVerifier,
{
    pub fn new(store: Arc<S>, auth: Arc<A>, verifier: Arc<V>, config: RemoteConfig) -> Self {
        let throttle = ActionThrottle::new(config.min_action_interval());
        Self {
            store,
            auth,
            verifier,
            config,
            throttle,
        }
    }

    /// Replace the in-memory throttle, e.g. with one persisted across runs
    pub fn with_throttle(mut self, throttle: ActionThrottle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Verify, sign in, check for duplicates, then store the report.
    /// At most one upload starts per `min_action_interval_secs`.
    pub async fn upload(&self, identity: &DeviceIdentity, report: &CapabilityReport) -> UploadResult {
        if let Err(wait) = self.throttle.try_begin() {
            return UploadResult::RateLimited(wait.as_secs().max(1));
        }

        match run_blocking(&self.verifier, |verifier| verifier.verify()).await {
            Ok(true) => {}
            Ok(false) => {
                log::warn!("Integrity check rejected this device");
                return UploadResult::IntegrityFailure;
            }
            Err(e) => return UploadResult::UploadFailure(e.to_string()),
        }

        if let Err(e) = run_blocking(&self.auth, |auth| sign_in_if_needed(auth)).await {
            log::warn!("Sign-in failed: {}", e);
            return UploadResult::SignInFailure(e.to_string());
        }

        let collection = collection_path(&self.config, identity);
        match self.store_report(&collection, report).await {
            Ok(result) => result,
            Err(e) => {
                log::error!("Upload to {} failed: {}", collection, e);
                UploadResult::UploadFailure(e.to_string())
            }
        }
    }

    async fn store_report(
        &self,
        collection: &str,
        report: &CapabilityReport,
    ) -> Result<UploadResult, CapsError> {
        let content = report.to_json_pretty()?;

        if !self.config.allow_duplicate_uploads {
            let listed = collection.to_string();
            let existing = run_blocking(&self.store, move |store| store.list(&listed)).await?;
            let duplicate = existing
                .iter()
                .any(|doc| doc.content == content || same_report(&doc.content, report));
            if duplicate {
                log::info!("Identical report already stored in {}", collection);
                return Ok(UploadResult::DuplicateData);
            }
        }

        let document_id = chrono::Local::now().format(DOCUMENT_ID_FORMAT).to_string();
        let path = format!("{}/{}", collection, document_id);
        let written = path.clone();
        run_blocking(&self.store, move |store| store.put(&written, &content)).await?;

        log::info!("Uploaded capability report to {}", path);
        Ok(UploadResult::Success)
    }
}

fn same_report(stored: &str, report: &CapabilityReport) -> bool {
    CapabilityReport::parse(stored)
        .map(|parsed| parsed == *report)
        .unwrap_or(false)
}
