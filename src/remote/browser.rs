//! Browsing previously uploaded reports as a path tree

use super::auth::{sign_in_if_needed, Authenticator};
use super::run_blocking;
use super::store::DocumentStore;
use super::throttle::ActionThrottle;
use crate::config::RemoteConfig;
use crate::errors::CapsError;
use crate::tree::PathTree;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseState {
    NotLoaded,
    /// Built tree; a failed sign-in yields a single error node
    Loaded(PathTree),
    /// The listing itself failed
    LoadFailed(String),
}

pub struct DataBrowser<S: DocumentStore, A: Authenticator> {
    store: Arc<S>,
    auth: Arc<A>,
    config: RemoteConfig,
    state: BrowseState,
    last_populated: Option<Instant>,
    export_throttle: ActionThrottle,
}

impl<S: DocumentStore, A: Authenticator> DataBrowser<S, A> {
    pub fn new(store: Arc<S>, auth: Arc<A>, config: RemoteConfig) -> Self {
        let export_throttle = ActionThrottle::new(config.min_action_interval());
        Self {
            store,
            auth,
            config,
            state: BrowseState::NotLoaded,
            last_populated: None,
            export_throttle,
        }
    }

    pub fn with_export_throttle(mut self, throttle: ActionThrottle) -> Self {
        self.export_throttle = throttle;
        self
    }

    pub fn state(&self) -> &BrowseState {
        &self.state
    }

    pub fn tree(&self) -> Option<&PathTree> {
        match &self.state {
            BrowseState::Loaded(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn load_error(&self) -> Option<&str> {
        match &self.state {
            BrowseState::LoadFailed(message) => Some(message),
            _ => None,
        }
    }

    /// Sign in, list every report document and rebuild the tree
    pub async fn populate(&mut self) -> &BrowseState {
        self.state = BrowseState::NotLoaded;
        self.last_populated = Some(Instant::now());

        if let Err(e) = run_blocking(&self.auth, |auth| sign_in_if_needed(auth)).await {
            log::warn!("Sign-in failed while browsing: {}", e);
            self.state = BrowseState::Loaded(PathTree::error(&e.to_string()));
            return &self.state;
        }

        self.state = match self.fetch_tree().await {
            Ok(tree) => BrowseState::Loaded(tree),
            Err(e) => {
                log::error!("Failed to list reports: {}", e);
                BrowseState::LoadFailed(e.to_string())
            }
        };
        &self.state
    }

    async fn fetch_tree(&self) -> Result<PathTree, CapsError> {
        let marker = self.config.node_marker.clone();
        let group = marker.clone();
        let documents = run_blocking(&self.store, move |store| store.list_group(&group)).await?;
        log::info!("Loaded {} report documents", documents.len());
        Ok(PathTree::from_documents(
            documents.into_iter().map(|doc| (doc.path, doc.content)),
            &marker,
        ))
    }

    /// Download every report and write it to `out`: a zip archive when the
    /// name ends in `.zip`, a directory tree otherwise. At most one export
    /// starts per `min_action_interval_secs`. Returns the number written.
    pub async fn export(&self, out: &Path) -> Result<usize, CapsError> {
        if let Err(wait) = self.export_throttle.try_begin() {
            return Err(CapsError::RateLimited(wait.as_secs().max(1)));
        }

        run_blocking(&self.auth, |auth| sign_in_if_needed(auth)).await?;
        let tree = self.fetch_tree().await?;

        let out: PathBuf = out.to_path_buf();
        tokio::task::spawn_blocking(move || {
            if out.extension().and_then(|e| e.to_str()) == Some("zip") {
                tree.write_zip(&out)
            } else {
                tree.write_to_dir(&out)
            }
        })
        .await
        .map_err(|e| CapsError::store(format!("Export task failed: {}", e)))?
    }

    /// Repopulate only when a tree is shown and it is older than the
    /// configured interval. Returns whether a reload ran.
    pub async fn populate_if_stale(&mut self) -> bool {
        let stale = matches!(self.state, BrowseState::Loaded(_))
            && self
                .last_populated
                .map(|at| at.elapsed() > self.config.repopulate_interval())
                .unwrap_or(true);

        if stale {
            self.populate().await;
        }
        stale
    }
}
