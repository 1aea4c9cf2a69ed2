//! Remote document store seam and two local implementations
//!
//! Document paths alternate collection and document segments, e.g.
//! `CameraData/GOOGLE/PIXEL 8/34/CameraDataNode/2024-01-05_10-00-00`.

use crate::errors::CapsError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub path: String,
    pub content: String,
}

impl Document {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Name of the collection directly holding this document
    pub fn collection_name(&self) -> Option<&str> {
        let (parent, _) = self.path.rsplit_once('/')?;
        Some(parent.rsplit('/').next().unwrap_or(parent))
    }
}

pub trait DocumentStore: Send + Sync + 'static {
    /// Documents directly inside `collection`
    fn list(&self, collection: &str) -> Result<Vec<Document>, CapsError>;

    /// Documents from every collection named `group`, anywhere in the store
    fn list_group(&self, group: &str) -> Result<Vec<Document>, CapsError>;

    fn put(&self, path: &str, content: &str) -> Result<(), CapsError>;
}

fn validate_path(path: &str) -> Result<(), CapsError> {
    let bad_segment = path
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if bad_segment || !path.contains('/') {
        return Err(CapsError::store(format!("Invalid document path: {:?}", path)));
    }
    Ok(())
}

/// Process-local store, used by tests and offline runs
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<BTreeMap<String, String>>,
    failure: Option<String>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation fails with `message`, like an unreachable backend
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
            failure: Some(message.into()),
        }
    }

    pub fn with_document(self, path: &str, content: &str) -> Self {
        if let Ok(mut documents) = self.documents.write() {
            documents.insert(path.to_string(), content.to_string());
        }
        self
    }

    pub fn len(&self) -> usize {
        self.documents.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> Result<(), CapsError> {
        match &self.failure {
            Some(message) => Err(CapsError::store(message.clone())),
            None => Ok(()),
        }
    }

    fn filtered<F>(&self, keep: F) -> Result<Vec<Document>, CapsError>
    where
        F: Fn(&Document) -> bool,
    {
        self.check()?;
        let documents = self
            .documents
            .read()
            .map_err(|_| CapsError::store("document lock poisoned"))?;

        Ok(documents
            .iter()
            .map(|(path, content)| Document::new(path.clone(), content.clone()))
            .filter(|doc| keep(doc))
            .collect())
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn list(&self, collection: &str) -> Result<Vec<Document>, CapsError> {
        let collection = collection.trim_end_matches('/');
        self.filtered(|doc| {
            doc.path
                .rsplit_once('/')
                .map(|(parent, _)| parent == collection)
                .unwrap_or(false)
        })
    }

    fn list_group(&self, group: &str) -> Result<Vec<Document>, CapsError> {
        self.filtered(|doc| doc.collection_name() == Some(group))
    }

    fn put(&self, path: &str, content: &str) -> Result<(), CapsError> {
        self.check()?;
        validate_path(path)?;
        let mut documents = self
            .documents
            .write()
            .map_err(|_| CapsError::store("document lock poisoned"))?;
        documents.insert(path.to_string(), content.to_string());
        Ok(())
    }
}

/// Store laid out on disk as `<root>/<path>.json`
#[derive(Debug, Clone)]
pub struct DirectoryDocumentStore {
    root: PathBuf,
}

impl DirectoryDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_file(&self, path: &str) -> PathBuf {
        self.root.join(format!("{}.json", path))
    }

    fn read_document(&self, file: &Path) -> Result<Option<Document>, CapsError> {
        if file.extension().and_then(|e| e.to_str()) != Some("json") {
            return Ok(None);
        }
        let Ok(relative) = file.with_extension("").strip_prefix(&self.root).map(Path::to_path_buf)
        else {
            return Ok(None);
        };

        let path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let content = fs::read_to_string(file)?;
        Ok(Some(Document::new(path, content)))
    }
}

impl DocumentStore for DirectoryDocumentStore {
    fn list(&self, collection: &str) -> Result<Vec<Document>, CapsError> {
        let dir = self.root.join(collection.trim_end_matches('/'));
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut documents = Vec::new();
        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| CapsError::store(e.to_string()))?;
            if entry.file_type().is_file() {
                documents.extend(self.read_document(entry.path())?);
            }
        }
        Ok(documents)
    }

    fn list_group(&self, group: &str) -> Result<Vec<Document>, CapsError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut documents = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| CapsError::store(e.to_string()))?;
            let in_group = entry
                .path()
                .parent()
                .and_then(Path::file_name)
                .map(|name| name == group)
                .unwrap_or(false);

            if entry.file_type().is_file() && in_group {
                documents.extend(self.read_document(entry.path())?);
            }
        }
        Ok(documents)
    }

    fn put(&self, path: &str, content: &str) -> Result<(), CapsError> {
        validate_path(path)?;
        let file = self.document_file(path);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file, content)?;
        log::debug!("Stored document {:?}", file);
        Ok(())
    }
}
