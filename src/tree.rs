//! Path tree for browsing uploaded reports
//!
//! Flat `/`-delimited document paths are folded into an arena of nodes.
//! Parents are arena indices, so the tree owns every node exactly once.

use crate::errors::CapsError;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Component, Path};
use zip::write::FileOptions;
use zip::ZipWriter;

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathNode {
    pub name: String,
    /// Document payload; present on leaves
    pub content: Option<String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl PathNode {
    fn new(name: &str, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            content: None,
            children: Vec::new(),
            parent,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_leaf(&self) -> bool {
        self.content.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathTree {
    nodes: Vec<PathNode>,
    marker: Option<String>,
}

impl Default for PathTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PathTree {
    pub const ROOT: NodeId = 0;

    pub fn new() -> Self {
        Self {
            nodes: vec![PathNode::new("", None)],
            marker: None,
        }
    }

    /// A tree that drops `marker` segments following another segment
    pub fn with_marker(marker: impl Into<String>) -> Self {
        Self {
            marker: Some(marker.into()),
            ..Self::new()
        }
    }

    /// Build a tree from `(path, content)` pairs
    pub fn from_documents<I, P, S>(documents: I, marker: &str) -> Self
    where
        I: IntoIterator<Item = (P, S)>,
        P: AsRef<str>,
        S: Into<String>,
    {
        let mut tree = Self::with_marker(marker);
        for (path, content) in documents {
            tree.insert(path.as_ref(), content);
        }
        tree
    }

    /// Split a path, dropping one marker segment after every kept segment
    fn segments<'a>(&self, path: &'a str) -> Vec<&'a str> {
        let mut raw = path.split('/');
        let mut segments = Vec::new();

        if let Some(first) = raw.next() {
            segments.push(first);
        }
        while let Some(segment) = raw.next() {
            if self.marker.as_deref() == Some(segment) {
                match raw.next() {
                    Some(next) => segments.push(next),
                    None => break,
                }
            } else {
                segments.push(segment);
            }
        }
        segments
    }

    /// Child of `parent` named `name`, created when missing. The name is used
    /// verbatim, `/` included.
    pub fn child_or_insert(&mut self, parent: NodeId, name: &str) -> NodeId {
        if let Some(existing) = self.child_by_name(parent, name) {
            return existing;
        }
        let id = self.nodes.len();
        self.nodes.push(PathNode::new(name, Some(parent)));
        self.nodes[parent].children.push(id);
        id
    }

    /// Insert one document. Existing nodes are reused by name; the node at the
    /// end of the path keeps the first content it was given.
    pub fn insert(&mut self, path: &str, content: impl Into<String>) -> NodeId {
        let mut current = Self::ROOT;
        for segment in self.segments(path) {
            current = self.child_or_insert(current, segment);
        }

        if current != Self::ROOT && self.nodes[current].content.is_none() {
            self.nodes[current].content = Some(content.into());
        }
        current
    }

    /// A tree whose only node reports `message`
    pub fn error(message: &str) -> Self {
        let mut tree = Self::new();
        tree.child_or_insert(Self::ROOT, &format!("Error: {}", message));
        tree
    }

    pub fn root(&self) -> &PathNode {
        &self.nodes[Self::ROOT]
    }

    pub fn node(&self, id: NodeId) -> Option<&PathNode> {
        self.nodes.get(id)
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &PathNode)> + '_ {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
            .iter()
            .map(move |&child| (child, &self.nodes[child]))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    pub fn child_by_name(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.nodes
            .get(id)?
            .children
            .iter()
            .copied()
            .find(|&child| self.nodes[child].name == name)
    }

    /// Resolve a `/`-separated path from the root; empty segments are ignored
    pub fn find(&self, path: &str) -> Option<NodeId> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(Self::ROOT, |current, segment| {
                self.child_by_name(current, segment)
            })
    }

    /// Node ids from the root down to `id`, both included
    fn lineage(&self, id: NodeId) -> Vec<NodeId> {
        let mut lineage = Vec::new();
        let mut current = Some(id).filter(|&id| id < self.nodes.len());
        while let Some(node) = current {
            lineage.push(node);
            current = self.nodes[node].parent;
        }
        lineage.reverse();
        lineage
    }

    /// Ancestor names joined together, with `/` after every node without content
    pub fn absolute_path(&self, id: NodeId) -> String {
        let mut path = String::new();
        for node in self.lineage(id).into_iter().map(|n| &self.nodes[n]) {
            path.push_str(&node.name);
            if node.content.is_none() {
                path.push('/');
            }
        }
        path
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    /// Leaves in depth-first insertion order
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![Self::ROOT];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.is_leaf() {
                leaves.push(id);
            }
            stack.extend(node.children.iter().rev());
        }
        leaves
    }

    /// Export path of a leaf relative to the output root. `None` when a
    /// segment is empty, `.` or `..`, or the path would not stay below the root.
    fn export_path(&self, id: NodeId) -> Option<String> {
        let names: Vec<&str> = self
            .lineage(id)
            .into_iter()
            .skip(1)
            .map(|n| self.nodes[n].name.as_str())
            .collect();
        let relative = names.join("/");

        let bad_segment = relative
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
        let escapes = Path::new(&relative)
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if relative.is_empty() || bad_segment || escapes {
            log::warn!("Skipping document with unsafe path {:?}", relative);
            return None;
        }
        Some(relative)
    }

    /// Leaves that can be exported, with their relative paths
    fn exportable_leaves(&self) -> Vec<(NodeId, String)> {
        self.leaves()
            .into_iter()
            .filter_map(|id| self.export_path(id).map(|path| (id, path)))
            .collect()
    }

    /// Indented listing, directories suffixed with `/`
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut stack: Vec<(NodeId, usize)> = self.nodes[Self::ROOT]
            .children
            .iter()
            .rev()
            .map(|&child| (child, 0))
            .collect();

        while let Some((id, depth)) = stack.pop() {
            let node = &self.nodes[id];
            out.push_str(&"  ".repeat(depth));
            out.push_str(&node.name);
            if !node.children.is_empty() || !node.is_leaf() {
                out.push('/');
            }
            out.push('\n');
            stack.extend(node.children.iter().rev().map(|&child| (child, depth + 1)));
        }
        out
    }

    /// Write every leaf to `<dir>/<path>.json`
    pub fn write_to_dir(&self, dir: &Path) -> Result<usize, CapsError> {
        let leaves = self.exportable_leaves();
        for (id, path) in &leaves {
            let file = dir.join(format!("{}.json", path));
            if let Some(parent) = file.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&file, self.nodes[*id].content.as_deref().unwrap_or_default())?;
        }
        log::info!("Exported {} documents to {:?}", leaves.len(), dir);
        Ok(leaves.len())
    }

    /// Write every leaf as `<path>.json` into a zip archive at `file`
    pub fn write_zip(&self, file: &Path) -> Result<usize, CapsError> {
        if let Some(parent) = file.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut zip = ZipWriter::new(File::create(file)?);
        let options =
            FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);

        let leaves = self.exportable_leaves();
        for (id, path) in &leaves {
            zip.start_file(format!("{}.json", path), options)
                .map_err(zip_error)?;
            zip.write_all(self.nodes[*id].content.as_deref().unwrap_or_default().as_bytes())?;
        }
        zip.finish().map_err(zip_error)?;

        log::info!("Archived {} documents to {:?}", leaves.len(), file);
        Ok(leaves.len())
    }
}

fn zip_error(e: zip::result::ZipError) -> CapsError {
    CapsError::Io(std::io::Error::other(e))
}
