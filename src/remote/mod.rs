//! Crowd-sourced report storage: upload, sign-in, and browsing

pub mod auth;
pub mod browser;
pub mod store;
pub mod throttle;
pub mod upload;

pub use auth::{
    sign_in_if_needed, AnonymousAuthenticator, Authenticator, IntegrityVerifier, TrustingVerifier,
};
pub use browser::{BrowseState, DataBrowser};
pub use store::{DirectoryDocumentStore, Document, DocumentStore, MemoryDocumentStore};
pub use throttle::ActionThrottle;
pub use upload::{collection_path, UploadResult, Uploader};

use crate::errors::CapsError;
use std::sync::Arc;

/// Run a blocking store/auth call on the blocking pool
pub(crate) async fn run_blocking<T, R, F>(shared: &Arc<T>, f: F) -> Result<R, CapsError>
where
    T: Send + Sync + 'static,
    R: Send + 'static,
    F: FnOnce(&T) -> Result<R, CapsError> + Send + 'static,
{
    let shared = Arc::clone(shared);
    tokio::task::spawn_blocking(move || f(shared.as_ref()))
        .await
        .map_err(|e| CapsError::store(format!("Blocking task failed: {}", e)))?
}
