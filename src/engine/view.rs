//! Views and their slot arrays.
//!
//! A view owns one slot per declaration, in declaration order. Slots are
//! allocated only while the view's program runs in creation mode and never
//! move afterwards, so every later instruction can address them by index.
//!
//! ```text
//! <child some-directive></child>!
//!
//! slot 0: Element   <child>
//! slot 1: Directive ChildComponent   (host 0)
//! slot 2: Directive SomeDirective    (host 0)
//! slot 3: Text      "!"
//! ```
//!
//! Component views are owned by the directive slot of their component;
//! embedded views are owned by their container.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;

use super::container::LContainer;
use super::query::{InheritedQuery, QueryList};
use crate::definition::{DirectiveDef, DirectiveRef, Pipe, PipeDef};
use crate::error::{RenderError, Result};
use crate::renderer::{Document, NodeRef};
use crate::types::{Cleanup, HookState, SimpleChanges, Value, ViewFlags};

thread_local! {
    /// Counter for view ids (query entries are tagged with them).
    static NEXT_VIEW_ID: Cell<usize> = const { Cell::new(0) };
}

fn next_view_id() -> usize {
    NEXT_VIEW_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    })
}

// =============================================================================
// View Paths
// =============================================================================

/// Where a view sits inside its component view: one step per enclosing
/// container, as (container slot, current index of the embedded view).
///
/// Indices are shared with the container and renumbered on insert and
/// remove, so an ordering derived from a path always reflects DOM order.
#[derive(Clone, Default)]
pub(crate) struct ViewPath(Vec<(usize, Rc<Cell<usize>>)>);

impl ViewPath {
    pub(crate) fn child(&self, container: usize, position: Rc<Cell<usize>>) -> Self {
        let mut steps = self.0.clone();
        steps.push((container, position));
        Self(steps)
    }

    /// Sort key of slot `slot` of the view at this path.
    pub(crate) fn order(&self, slot: usize) -> Vec<usize> {
        let mut key = Vec::with_capacity(self.0.len() * 2 + 1);
        for (container, position) in &self.0 {
            key.push(*container);
            key.push(position.get());
        }
        key.push(slot);
        key
    }
}

// =============================================================================
// Placement
// =============================================================================

/// Something that occupies a position in the DOM.
#[derive(Clone)]
pub(crate) enum Placed {
    Node(NodeRef),
    /// A container: its embedded views' nodes followed by its anchor.
    Container(Rc<RefCell<LContainer>>),
    /// Nodes spliced in by a projection point.
    Projection(Vec<Placed>),
}

impl Placed {
    /// Concrete nodes, in DOM order.
    pub(crate) fn flatten_into(&self, out: &mut Vec<NodeRef>) {
        match self {
            Placed::Node(node) => out.push(node.clone()),
            Placed::Projection(items) => {
                for item in items {
                    item.flatten_into(out);
                }
            }
            Placed::Container(container) => match container.try_borrow() {
                Ok(container) => container.flatten_into(out),
                Err(_) => log::warn!("container busy while flattening; only its anchor is placed"),
            },
        }
    }

    pub(crate) fn flatten(&self) -> Vec<NodeRef> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }
}

/// Where a view's root nodes go.
pub(crate) enum Host {
    /// Appended to a component's host element.
    Element(NodeRef),
    /// Inserted before `reference` (or the anchor) in the anchor's parent.
    Anchor {
        anchor: NodeRef,
        reference: Option<NodeRef>,
    },
    /// Left detached (the synthetic root view).
    Detached,
}

// =============================================================================
// Slots
// =============================================================================

pub(crate) struct ElementSlot {
    pub(crate) node: NodeRef,
    pub(crate) tag: String,
    pub(crate) attrs: Vec<(String, String)>,
    /// Directive slots hosted here, component first.
    pub(crate) directives: Vec<usize>,
    pub(crate) component: Option<usize>,
    /// Top-level children declared inside a component host.
    pub(crate) content: Rc<RefCell<Vec<Placed>>>,
}

pub(crate) struct DirectiveSlot {
    pub(crate) def: Rc<DirectiveDef>,
    pub(crate) instance: DirectiveRef,
    /// The instance wrapped once, so queries and locals share one identity.
    pub(crate) handle: Value,
    pub(crate) host: usize,
    pub(crate) state: HookState,
    pub(crate) changes: SimpleChanges,
    /// Last value written per internal input name.
    pub(crate) inputs: IndexMap<String, Value>,
    pub(crate) component_view: Option<Box<View>>,
    pub(crate) content_queries: Vec<QueryList>,
}

pub(crate) struct ContainerSlot {
    pub(crate) anchor: NodeRef,
    pub(crate) container: Rc<RefCell<LContainer>>,
    pub(crate) directives: Vec<usize>,
}

pub(crate) struct PipeSlot {
    pub(crate) def: Rc<PipeDef>,
    pub(crate) instance: Box<dyn Pipe>,
}

pub(crate) enum Slot {
    Element(ElementSlot),
    Text(NodeRef),
    Container(ContainerSlot),
    Directive(DirectiveSlot),
    Local(Value),
    Query(QueryList),
    Pipe(PipeSlot),
    ProjectionDef(Vec<Vec<Placed>>),
    Projection,
}

impl Slot {
    fn kind(&self) -> &'static str {
        match self {
            Slot::Element(_) => "element",
            Slot::Text(_) => "text",
            Slot::Container(_) => "container",
            Slot::Directive(_) => "directive",
            Slot::Local(_) => "local",
            Slot::Query(_) => "query",
            Slot::Pipe(_) => "pipe",
            Slot::ProjectionDef(_) => "projection definition",
            Slot::Projection => "projection",
        }
    }
}

// =============================================================================
// View
// =============================================================================

pub(crate) struct View {
    pub(crate) id: usize,
    pub(crate) name: String,
    pub(crate) doc: Rc<Document>,
    pub(crate) flags: ViewFlags,
    pub(crate) host: Host,
    pub(crate) slots: Vec<Slot>,
    /// Binding memory, consumed in program order every pass.
    pub(crate) bindings: Vec<Option<Value>>,
    /// Directive slots passed to `refresh` during the current pass.
    pub(crate) refreshed: Vec<usize>,
    pub(crate) cleanup: Vec<Cleanup>,
    pub(crate) roots: Vec<Placed>,
    /// Component whose template declared this view (listener target).
    pub(crate) component: Option<DirectiveRef>,
    /// Projectable content handed in by the host element.
    pub(crate) content: Rc<RefCell<Vec<Placed>>>,
    /// View queries visible here: declared in this view or inherited from the
    /// declaring view of an embedded view.
    pub(crate) queries: Vec<QueryList>,
    /// Content queries of directives whose host encloses the container this
    /// embedded view belongs to.
    pub(crate) content_queries: Vec<InheritedQuery>,
    pub(crate) path: ViewPath,
}

impl View {
    pub(crate) fn new(doc: Rc<Document>, name: impl Into<String>, host: Host) -> Self {
        let view = Self {
            id: next_view_id(),
            name: name.into(),
            doc,
            flags: ViewFlags::empty(),
            host,
            slots: Vec::new(),
            bindings: Vec::new(),
            refreshed: Vec::new(),
            cleanup: Vec::new(),
            roots: Vec::new(),
            component: None,
            content: Rc::new(RefCell::new(Vec::new())),
            queries: Vec::new(),
            content_queries: Vec::new(),
            path: ViewPath::default(),
        };
        log::debug!("view {}#{} allocated", view.name, view.id);
        view
    }

    pub(crate) fn is_created(&self) -> bool {
        self.flags.contains(ViewFlags::CREATED)
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.flags.contains(ViewFlags::DESTROYED)
    }

    /// Place a root node according to the view's host.
    pub(crate) fn insert_root(&mut self, placed: Placed) {
        let nodes = placed.flatten();
        self.roots.push(placed);
        match &self.host {
            Host::Element(host) => {
                for node in &nodes {
                    self.doc.append_child(host, node);
                }
            }
            Host::Anchor { anchor, reference } => {
                // A detached anchor means the container itself is content
                // waiting for projection; flattening picks the nodes up then.
                let Some(parent) = anchor.borrow().parent() else { return };
                let reference = reference.as_ref().unwrap_or(anchor);
                for node in &nodes {
                    self.doc.insert_before(&parent, node, Some(reference));
                }
            }
            Host::Detached => {}
        }
    }

    /// Root nodes in DOM order.
    pub(crate) fn root_nodes(&self) -> Vec<NodeRef> {
        let mut out = Vec::new();
        for root in &self.roots {
            root.flatten_into(&mut out);
        }
        out
    }

    // -------------------------------------------------------------------------
    // Slot access
    // -------------------------------------------------------------------------

    pub(crate) fn slot(&self, index: usize) -> Result<&Slot> {
        self.slots.get(index).ok_or(RenderError::SlotOutOfRange(index))
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Result<&mut Slot> {
        self.slots
            .get_mut(index)
            .ok_or(RenderError::SlotOutOfRange(index))
    }

    pub(crate) fn element(&self, index: usize) -> Result<&ElementSlot> {
        match self.slot(index)? {
            Slot::Element(el) => Ok(el),
            _ => Err(RenderError::SlotType {
                index,
                expected: "an element",
            }),
        }
    }

    pub(crate) fn element_mut(&mut self, index: usize) -> Result<&mut ElementSlot> {
        match self.slot_mut(index)? {
            Slot::Element(el) => Ok(el),
            _ => Err(RenderError::SlotType {
                index,
                expected: "an element",
            }),
        }
    }

    pub(crate) fn directive(&self, index: usize) -> Result<&DirectiveSlot> {
        match self.slot(index)? {
            Slot::Directive(dir) => Ok(dir),
            _ => Err(RenderError::SlotType {
                index,
                expected: "a directive",
            }),
        }
    }

    pub(crate) fn directive_mut(&mut self, index: usize) -> Result<&mut DirectiveSlot> {
        match self.slot_mut(index)? {
            Slot::Directive(dir) => Ok(dir),
            _ => Err(RenderError::SlotType {
                index,
                expected: "a directive",
            }),
        }
    }

    /// Directive slots hosted by an element or container slot.
    pub(crate) fn hosted_directives(&self, index: usize) -> Result<&[usize]> {
        match self.slot(index)? {
            Slot::Element(el) => Ok(&el.directives),
            Slot::Container(c) => Ok(&c.directives),
            _ => Err(RenderError::SlotType {
                index,
                expected: "an element or container",
            }),
        }
    }

    /// The DOM node behind an element, text or container slot.
    pub(crate) fn node(&self, index: usize) -> Result<NodeRef> {
        match self.slot(index)? {
            Slot::Element(el) => Ok(el.node.clone()),
            Slot::Text(node) => Ok(node.clone()),
            Slot::Container(c) => Ok(c.anchor.clone()),
            other => {
                log::debug!("slot {index} is a {}, not a node", other.kind());
                Err(RenderError::SlotType {
                    index,
                    expected: "a node",
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_ids_are_unique() {
        let doc = Document::new();
        let a = View::new(doc.clone(), "a", Host::Detached);
        let b = View::new(doc, "b", Host::Detached);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_roots_follow_host() {
        let doc = Document::new();
        let host = doc.create_element("my-comp");
        let mut view = View::new(doc.clone(), "MyComp", Host::Element(host.clone()));
        let p = doc.create_element("p");
        view.insert_root(Placed::Node(p.clone()));
        assert_eq!(host.borrow().children().len(), 1);
        assert_eq!(view.root_nodes().len(), 1);
    }

    #[test]
    fn test_roots_go_before_anchor() {
        let doc = Document::new();
        let ul = doc.create_element("ul");
        let anchor = doc.create_comment("container");
        doc.append_child(&ul, &anchor);

        let mut view = View::new(
            doc.clone(),
            "row",
            Host::Anchor {
                anchor: anchor.clone(),
                reference: None,
            },
        );
        let li = doc.create_element("li");
        view.insert_root(Placed::Node(li.clone()));
        let children = ul.borrow().children().to_vec();
        assert!(Rc::ptr_eq(&children[0], &li));
        assert!(Rc::ptr_eq(&children[1], &anchor));
    }

    #[test]
    fn test_detached_anchor_defers_placement() {
        let doc = Document::new();
        let anchor = doc.create_comment("container");
        let mut view = View::new(
            doc.clone(),
            "row",
            Host::Anchor {
                anchor,
                reference: None,
            },
        );
        let li = doc.create_element("li");
        view.insert_root(Placed::Node(li.clone()));
        assert!(li.borrow().parent().is_none());
        assert_eq!(view.root_nodes().len(), 1);
    }

    #[test]
    fn test_slot_type_errors() {
        let doc = Document::new();
        let mut view = View::new(doc.clone(), "v", Host::Detached);
        view.slots.push(Slot::Text(doc.create_text("x")));
        assert!(view.node(0).is_ok());
        assert!(matches!(
            view.element(0),
            Err(RenderError::SlotType { index: 0, .. })
        ));
        assert!(matches!(view.slot(3), Err(RenderError::SlotOutOfRange(3))));
    }
}
