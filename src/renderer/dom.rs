//! DOM-like node tree.
//!
//! Views render into a small retained tree of elements, text nodes and
//! comment anchors. Nodes are shared handles (`Rc<RefCell<Node>>`) with a weak
//! parent link, so a node can be moved between parents (content projection,
//! embedded view insertion) without ownership cycles.
//!
//! Every mutation goes through a [`Document`], which counts node creations,
//! insertions, removals and writes. Tests use [`Document::stats`] to observe
//! that an unchanged pass performs no DOM work.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::error::{HookResult, RenderError, Result};
use crate::types::Value;

/// Shared node handle.
pub type NodeRef = Rc<RefCell<Node>>;

/// DOM event listener.
///
/// Using `Rc<dyn Fn>` so the dispatcher can clone the listener list and
/// release the node borrow before calling user code.
pub type Listener = Rc<dyn Fn(&Value) -> HookResult>;

// =============================================================================
// Node
// =============================================================================

/// Element payload.
#[derive(Debug, Clone, Default)]
pub struct ElementData {
    pub tag: String,
    /// Attributes in declaration order.
    pub attrs: Vec<(String, String)>,
    /// Non-attribute properties (bound values that are not directive inputs).
    pub properties: IndexMap<String, Value>,
}

/// What a node is.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
    Comment(String),
}

/// A node in the tree.
pub struct Node {
    kind: NodeKind,
    parent: Weak<RefCell<Node>>,
    children: Vec<NodeRef>,
    listeners: Vec<(u64, String, Listener)>,
}

impl Node {
    fn new(kind: NodeKind) -> NodeRef {
        Rc::new(RefCell::new(Node {
            kind,
            parent: Weak::new(),
            children: Vec::new(),
            listeners: Vec::new(),
        }))
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element(_))
    }

    /// Tag name for elements.
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element(el) => Some(&el.tag),
            _ => None,
        }
    }

    /// Static and bound attributes, in order.
    pub fn attributes(&self) -> &[(String, String)] {
        match &self.kind {
            NodeKind::Element(el) => &el.attrs,
            _ => &[],
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes()
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        match &self.kind {
            NodeKind::Element(el) => el.properties.get(name),
            _ => None,
        }
    }

    /// Text content of a text or comment node.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(t) | NodeKind::Comment(t) => Some(t),
            NodeKind::Element(_) => None,
        }
    }

    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeRef> {
        self.parent.upgrade()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind)
            .field("children", &self.children.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

// =============================================================================
// Document
// =============================================================================

/// Counters for DOM work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DomStats {
    /// Nodes created.
    pub created: usize,
    /// Nodes inserted or moved.
    pub inserts: usize,
    /// Nodes detached.
    pub removals: usize,
    /// Attribute, property and text writes.
    pub writes: usize,
}

/// Owner of all DOM mutations for one render tree.
#[derive(Debug, Default)]
pub struct Document {
    stats: Cell<DomStats>,
    next_listener: Cell<u64>,
}

impl Document {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> DomStats {
        self.stats.get()
    }

    pub fn reset_stats(&self) {
        self.stats.set(DomStats::default());
    }

    fn bump(&self, f: impl FnOnce(&mut DomStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    pub fn create_element(&self, tag: &str) -> NodeRef {
        self.bump(|s| s.created += 1);
        log::trace!("create <{tag}>");
        Node::new(NodeKind::Element(ElementData {
            tag: tag.to_string(),
            ..Default::default()
        }))
    }

    pub fn create_text(&self, text: &str) -> NodeRef {
        self.bump(|s| s.created += 1);
        Node::new(NodeKind::Text(text.to_string()))
    }

    pub fn create_comment(&self, text: &str) -> NodeRef {
        self.bump(|s| s.created += 1);
        Node::new(NodeKind::Comment(text.to_string()))
    }

    // -------------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------------

    pub fn append_child(&self, parent: &NodeRef, child: &NodeRef) {
        self.insert_before(parent, child, None);
    }

    /// Insert `child` into `parent` before `reference`.
    ///
    /// A `reference` that is not a child of `parent` appends. Inserting a
    /// node that already has a parent moves it.
    pub fn insert_before(&self, parent: &NodeRef, child: &NodeRef, reference: Option<&NodeRef>) {
        if Rc::ptr_eq(parent, child) {
            log::warn!("refusing to insert a node into itself");
            return;
        }
        detach(child);

        let mut p = parent.borrow_mut();
        let position = reference
            .and_then(|r| p.children.iter().position(|c| Rc::ptr_eq(c, r)))
            .unwrap_or(p.children.len());
        p.children.insert(position, child.clone());
        child.borrow_mut().parent = Rc::downgrade(parent);
        self.bump(|s| s.inserts += 1);
    }

    /// Detach a node from its parent (no-op when already detached).
    pub fn remove(&self, node: &NodeRef) {
        if detach(node) {
            self.bump(|s| s.removals += 1);
        }
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Set an attribute, keeping its original position when it already exists.
    pub fn set_attribute(&self, node: &NodeRef, name: &str, value: &str) {
        let mut n = node.borrow_mut();
        if let NodeKind::Element(el) = &mut n.kind {
            match el.attrs.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value.to_string(),
                None => el.attrs.push((name.to_string(), value.to_string())),
            }
            log::trace!("attr {}.{name} = {value:?}", el.tag);
            self.bump(|s| s.writes += 1);
        }
    }

    pub fn remove_attribute(&self, node: &NodeRef, name: &str) {
        let mut n = node.borrow_mut();
        if let NodeKind::Element(el) = &mut n.kind {
            let before = el.attrs.len();
            el.attrs.retain(|(k, _)| k != name);
            if el.attrs.len() != before {
                self.bump(|s| s.writes += 1);
            }
        }
    }

    pub fn set_property(&self, node: &NodeRef, name: &str, value: Value) {
        let mut n = node.borrow_mut();
        if let NodeKind::Element(el) = &mut n.kind {
            log::trace!("prop {}.{name} = {value:?}", el.tag);
            el.properties.insert(name.to_string(), value);
            self.bump(|s| s.writes += 1);
        }
    }

    /// Replace the content of a text or comment node.
    pub fn set_text(&self, node: &NodeRef, text: &str) {
        let mut n = node.borrow_mut();
        match &mut n.kind {
            NodeKind::Text(t) | NodeKind::Comment(t) => {
                log::trace!("text {t:?} -> {text:?}");
                *t = text.to_string();
                self.bump(|s| s.writes += 1);
            }
            NodeKind::Element(_) => {}
        }
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    /// Register a listener; returns an id for [`Document::remove_listener`].
    pub fn add_listener(&self, node: &NodeRef, event: &str, listener: Listener) -> u64 {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        node.borrow_mut()
            .listeners
            .push((id, event.to_string(), listener));
        id
    }

    pub fn remove_listener(&self, node: &NodeRef, id: u64) {
        node.borrow_mut().listeners.retain(|(l, _, _)| *l != id);
    }

    /// Invoke every listener for `event` on `node`, in registration order.
    ///
    /// Returns how many listeners ran. The first failing listener stops the
    /// dispatch.
    pub fn dispatch_event(&self, node: &NodeRef, event: &str, payload: &Value) -> Result<usize> {
        let listeners: Vec<Listener> = node
            .try_borrow()
            .map_err(|_| RenderError::Reentrant(format!("node listening for `{event}`")))?
            .listeners
            .iter()
            .filter(|(_, name, _)| name == event)
            .map(|(_, _, l)| l.clone())
            .collect();

        for listener in &listeners {
            listener(payload).map_err(|source| RenderError::Listener {
                event: event.to_string(),
                source,
            })?;
        }
        Ok(listeners.len())
    }
}

/// Remove `node` from its parent's child list. Returns true if it was attached.
fn detach(node: &NodeRef) -> bool {
    let parent = node.borrow().parent.upgrade();
    let Some(parent) = parent else { return false };
    parent
        .borrow_mut()
        .children
        .retain(|c| !Rc::ptr_eq(c, node));
    node.borrow_mut().parent = Weak::new();
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_before_moves_nodes() {
        let doc = Document::new();
        let ul = doc.create_element("ul");
        let a = doc.create_text("a");
        let b = doc.create_text("b");
        doc.append_child(&ul, &b);
        doc.insert_before(&ul, &a, Some(&b));
        let texts: Vec<String> = ul
            .borrow()
            .children()
            .iter()
            .map(|c| c.borrow().text().unwrap_or("").to_string())
            .collect();
        assert_eq!(texts, ["a", "b"]);

        // Moving to another parent detaches from the first
        let ol = doc.create_element("ol");
        doc.append_child(&ol, &a);
        assert_eq!(ul.borrow().children().len(), 1);
        assert!(Rc::ptr_eq(&a.borrow().parent().unwrap(), &ol));
    }

    #[test]
    fn test_attribute_keeps_position() {
        let doc = Document::new();
        let div = doc.create_element("div");
        doc.set_attribute(&div, "class", "a");
        doc.set_attribute(&div, "title", "t");
        doc.set_attribute(&div, "class", "b");
        assert_eq!(
            div.borrow().attributes(),
            &[
                ("class".to_string(), "b".to_string()),
                ("title".to_string(), "t".to_string())
            ]
        );
        doc.remove_attribute(&div, "class");
        assert_eq!(div.borrow().attribute("class"), None);
    }

    #[test]
    fn test_stats_count_work() {
        let doc = Document::new();
        let div = doc.create_element("div");
        let text = doc.create_text("");
        doc.append_child(&div, &text);
        doc.set_text(&text, "x");
        doc.remove(&text);
        doc.remove(&text);
        assert_eq!(
            doc.stats(),
            DomStats {
                created: 2,
                inserts: 1,
                removals: 1,
                writes: 1
            }
        );
        doc.reset_stats();
        assert_eq!(doc.stats(), DomStats::default());
    }

    #[test]
    fn test_dispatch_event() {
        let doc = Document::new();
        let button = doc.create_element("button");
        let clicks = Rc::new(Cell::new(0));
        let counter = clicks.clone();
        let id = doc.add_listener(
            &button,
            "click",
            Rc::new(move |_| {
                counter.set(counter.get() + 1);
                Ok(())
            }),
        );
        assert_eq!(doc.dispatch_event(&button, "click", &Value::Null).unwrap(), 1);
        assert_eq!(doc.dispatch_event(&button, "keyup", &Value::Null).unwrap(), 0);
        doc.remove_listener(&button, id);
        assert_eq!(doc.dispatch_event(&button, "click", &Value::Null).unwrap(), 0);
        assert_eq!(clicks.get(), 1);
    }

    #[test]
    fn test_listener_error_propagates() {
        let doc = Document::new();
        let button = doc.create_element("button");
        doc.add_listener(&button, "click", Rc::new(|_| Err("nope".into())));
        let err = doc.dispatch_event(&button, "click", &Value::Null).unwrap_err();
        assert!(matches!(err, RenderError::Listener { ref event, .. } if event == "click"));
    }
}
