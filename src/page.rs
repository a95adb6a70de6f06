//! Live page model
//!
//! An in-process document tree standing in for the player page. The
//! embedding host (webview bridge, test harness) owns building and
//! mutating the tree; the pipeline only locates nodes and listens for
//! mutations. Mutating operations broadcast `MutationRecord`s to all
//! subscribers, mirroring subtree mutation observation.
//!
//! Node ids are never reused. Removing a node detaches its whole
//! subtree; detached nodes stay addressable but report no text content,
//! so a stale handle fails soft instead of resolving to the wrong node.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::selector::Selector;

/// Opaque handle to one node in a `Page`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Rendered bounding box of an element
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// What kind of mutation occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Text content of a node changed
    CharacterData,
    /// Children were added to or removed from a node
    ChildList,
}

/// One mutation notification. `target` is the node whose text changed,
/// or the parent whose child list changed.
#[derive(Debug, Clone, Copy)]
pub struct MutationRecord {
    pub target: NodeId,
    pub kind: MutationKind,
}

#[derive(Debug)]
struct NodeData {
    tag: String,
    classes: Vec<String>,
    text: String,
    rect: Option<Rect>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attached: bool,
}

struct Document {
    nodes: Vec<NodeData>,
}

impl Document {
    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    fn mark_subtree(&mut self, id: NodeId, attached: bool) {
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            self.nodes[n.0].attached = attached;
            stack.extend(self.nodes[n.0].children.iter().copied());
        }
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        out.push_str(&node.text);
        for child in &node.children {
            self.collect_text(*child, out);
        }
    }

    fn walk_document_order(&self, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        for child in &self.node(id).children {
            self.walk_document_order(*child, out);
        }
    }
}

/// Shared handle to a live document tree
#[derive(Clone)]
pub struct Page {
    inner: Arc<PageInner>,
}

struct PageInner {
    doc: RwLock<Document>,
    mutations: broadcast::Sender<MutationRecord>,
}

/// Mutation fan-out buffer. The observer reads full snapshots, not
/// diffs, so overruns only cost a redundant re-read.
const MUTATION_CHANNEL_CAPACITY: usize = 64;

impl Page {
    /// Create an empty page with an attached root element
    pub fn new() -> Self {
        let root = NodeData {
            tag: "body".to_string(),
            classes: Vec::new(),
            text: String::new(),
            rect: None,
            parent: None,
            children: Vec::new(),
            attached: true,
        };
        let (mutations, _) = broadcast::channel(MUTATION_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(PageInner {
                doc: RwLock::new(Document { nodes: vec![root] }),
                mutations,
            }),
        }
    }

    /// The always-attached document root
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Create a detached element. Attach it with `append_child`.
    pub fn create_element(&self, tag: &str) -> NodeId {
        let mut doc = self.inner.doc.write();
        let id = NodeId(doc.nodes.len());
        doc.nodes.push(NodeData {
            tag: tag.to_string(),
            classes: Vec::new(),
            text: String::new(),
            rect: None,
            parent: None,
            children: Vec::new(),
            attached: false,
        });
        id
    }

    /// Convenience: create an element with a class list in one call
    pub fn create_element_with_classes(&self, tag: &str, classes: &[&str]) -> NodeId {
        let id = self.create_element(tag);
        let mut doc = self.inner.doc.write();
        doc.node_mut(id).classes = classes.iter().map(|c| c.to_string()).collect();
        id
    }

    /// Set the rendered bounding box, used for video elements
    pub fn set_rect(&self, id: NodeId, rect: Rect) {
        self.inner.doc.write().node_mut(id).rect = Some(rect);
    }

    /// Attach `child` under `parent`. The child subtree becomes attached
    /// if the parent is. Emits a child-list mutation on the parent.
    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        {
            let mut doc = self.inner.doc.write();
            debug_assert!(doc.node(child).parent.is_none(), "node already has a parent");
            doc.node_mut(child).parent = Some(parent);
            doc.node_mut(parent).children.push(child);
            if doc.node(parent).attached {
                doc.mark_subtree(child, true);
            }
        }
        self.emit(MutationRecord {
            target: parent,
            kind: MutationKind::ChildList,
        });
    }

    /// Replace the node's own text. Emits a character-data mutation.
    pub fn set_text(&self, id: NodeId, text: &str) {
        self.inner.doc.write().node_mut(id).text = text.to_string();
        self.emit(MutationRecord {
            target: id,
            kind: MutationKind::CharacterData,
        });
    }

    /// Detach a node and its subtree from the document. Emits a
    /// child-list mutation on the former parent.
    pub fn remove(&self, id: NodeId) {
        let parent = {
            let mut doc = self.inner.doc.write();
            let parent = doc.node(id).parent;
            if let Some(p) = parent {
                doc.node_mut(p).children.retain(|c| *c != id);
            }
            doc.node_mut(id).parent = None;
            doc.mark_subtree(id, false);
            parent
        };
        if let Some(p) = parent {
            self.emit(MutationRecord {
                target: p,
                kind: MutationKind::ChildList,
            });
        }
    }

    /// Whether the node is currently part of the document
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.inner.doc.read().node(id).attached
    }

    /// Whether `node` is `ancestor` or lies within its subtree
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let doc = self.inner.doc.read();
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = doc.node(n).parent;
        }
        false
    }

    /// Full concatenated text of the node's subtree, or `None` once the
    /// node has been detached.
    pub fn text_content(&self, id: NodeId) -> Option<String> {
        let doc = self.inner.doc.read();
        if !doc.node(id).attached {
            return None;
        }
        let mut out = String::new();
        doc.collect_text(id, &mut out);
        Some(out)
    }

    /// All attached nodes matching `selector`, in document order
    pub fn query_all(&self, selector: &Selector) -> Vec<NodeId> {
        let doc = self.inner.doc.read();
        let mut order = Vec::new();
        doc.walk_document_order(NodeId(0), &mut order);
        order
            .into_iter()
            .filter(|id| {
                let node = doc.node(*id);
                node.attached && selector.matches(&node.tag, &node.classes)
            })
            .collect()
    }

    /// All attached video elements with their rects, in document order
    pub fn videos(&self) -> Vec<(NodeId, Rect)> {
        let doc = self.inner.doc.read();
        let mut order = Vec::new();
        doc.walk_document_order(NodeId(0), &mut order);
        order
            .into_iter()
            .filter_map(|id| {
                let node = doc.node(id);
                if node.attached && node.tag == "video" {
                    Some((id, node.rect.unwrap_or_default()))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Subscribe to mutation notifications
    pub fn subscribe(&self) -> broadcast::Receiver<MutationRecord> {
        self.inner.mutations.subscribe()
    }

    fn emit(&self, record: MutationRecord) {
        // No receivers is fine; the pipeline may not be observing yet.
        let _ = self.inner.mutations.send(record);
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}
