//! The instruction set.
//!
//! A view program is an ordinary Rust closure that drives a [`ViewCtx`]:
//!
//! ```ignore
//! |rt, ctx: &mut MyComponent| {
//!     if rt.creation_mode() {
//!         rt.element_start(0, ElementDecl::new("div").attrs(&["class", "my-app"]))?;
//!         rt.text(1, None)?;
//!         rt.element_end()?;
//!     }
//!     rt.text_binding(1, interpolation1("Hello ", &ctx.name, "!"))
//! }
//! ```
//!
//! Declaring instructions (`element_start`, `text`, `container`, `query`,
//! `pipe`, `projection_def`, `projection`) are valid only in creation mode and
//! must address the next free slot. Binding instructions consume binding
//! cells in program order and touch the DOM only when a value changes.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use super::change_detection::Pass;
use super::deferred;
use super::lifecycle;
use super::query::{Candidate, QueryList};
use super::registry;
use super::view::{DirectiveSlot, ElementSlot, Placed, Slot, View};
use crate::definition::{DirectiveDef, DirectiveRef, NodeInjector};
use crate::error::{BoxError, HookResult, RenderError, Result};
use crate::renderer::NodeRef;
use crate::types::{HookState, SimpleChange, SimpleChanges, Value};

// =============================================================================
// Element Declarations
// =============================================================================

/// Static description of an element: tag, attributes, directives, locals.
#[derive(Debug, Clone)]
pub struct ElementDecl {
    tag: String,
    attrs: Vec<String>,
    directives: Vec<Rc<DirectiveDef>>,
    locals: Vec<String>,
    resolve: bool,
}

impl ElementDecl {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: Vec::new(),
            directives: Vec::new(),
            locals: Vec::new(),
            resolve: false,
        }
    }

    /// Host element of a component: its tag plus the component itself.
    pub fn component(def: &Rc<DirectiveDef>) -> Self {
        let tag = def.tag().unwrap_or(def.name());
        Self::new(tag).directive(def)
    }

    /// Flat `[name, value, name, value, ...]` attribute list.
    pub fn attrs(mut self, flat: &[&str]) -> Self {
        self.attrs.extend(flat.iter().map(|s| s.to_string()));
        self
    }

    pub fn directive(mut self, def: &Rc<DirectiveDef>) -> Self {
        self.directives.push(def.clone());
        self
    }

    pub fn directives(mut self, defs: &[Rc<DirectiveDef>]) -> Self {
        self.directives.extend(defs.iter().cloned());
        self
    }

    /// Flat `[local, export, local, export, ...]` list. An empty export names
    /// the element (or its component).
    pub fn locals(mut self, flat: &[&str]) -> Self {
        self.locals.extend(flat.iter().map(|s| s.to_string()));
        self
    }

    /// Also instantiate every registered directive whose selector matches.
    pub fn resolve(mut self) -> Self {
        self.resolve = true;
        self
    }
}

// =============================================================================
// View Context
// =============================================================================

/// Execution context of one view program run.
pub struct ViewCtx<'a> {
    pub(crate) view: &'a mut View,
    pass: Pass,
    creation: bool,
    cursor: usize,
    /// Element slots started but not yet ended, outermost first.
    pub(crate) open: Vec<usize>,
    pub(crate) open_container: Option<usize>,
}

impl<'a> ViewCtx<'a> {
    pub(crate) fn new(view: &'a mut View, pass: Pass) -> Self {
        let creation = !view.is_created();
        Self {
            view,
            pass,
            creation,
            cursor: 0,
            open: Vec::new(),
            open_container: None,
        }
    }

    /// True during the view's first run.
    pub fn creation_mode(&self) -> bool {
        self.creation
    }

    /// True during a check-no-changes pass.
    pub fn checking(&self) -> bool {
        self.pass == Pass::Check
    }

    pub(crate) fn pass(&self) -> Pass {
        self.pass
    }

    pub(crate) fn expect_next(&self, index: usize, instruction: &'static str) -> Result<()> {
        if !self.creation {
            return Err(RenderError::NotInCreationMode(instruction));
        }
        let expected = self.view.slots.len();
        if index != expected {
            return Err(RenderError::SlotOrder { expected, got: index });
        }
        Ok(())
    }

    /// Validate the end of a program run.
    pub(crate) fn finish(&self) -> Result<()> {
        if !self.open.is_empty() {
            return Err(RenderError::UnclosedElements(self.open.len()));
        }
        if let Some(index) = self.open_container {
            return Err(RenderError::UnclosedContainerRefresh(index));
        }
        let allocated = self.view.bindings.len();
        if !self.creation && self.cursor != allocated {
            return Err(RenderError::BindingCount {
                allocated,
                used: self.cursor,
            });
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Binding memory
    // -------------------------------------------------------------------------

    /// Claim the next binding cell. Cells are allocated in creation mode only.
    pub(crate) fn next_binding(&mut self) -> Result<usize> {
        let index = self.cursor;
        self.cursor += 1;
        if index >= self.view.bindings.len() {
            if !self.creation {
                return Err(RenderError::BindingCount {
                    allocated: self.view.bindings.len(),
                    used: self.cursor,
                });
            }
            self.view.bindings.push(None);
        }
        Ok(index)
    }

    pub(crate) fn binding(&self, index: usize) -> Option<&Value> {
        self.view.bindings.get(index).and_then(Option::as_ref)
    }

    /// Compare against the next cell and record the value if it changed.
    ///
    /// In a check pass a change is an error instead.
    pub(crate) fn bind(&mut self, value: &Value) -> Result<bool> {
        let index = self.next_binding()?;
        let previous = self.view.bindings[index].as_ref();
        if previous.is_some_and(|p| p.same(value)) {
            return Ok(false);
        }
        if self.checking() {
            return Err(RenderError::ExpressionChanged {
                index,
                previous: previous.map_or_else(|| "<unset>".to_string(), |v| format!("{v:?}")),
                current: format!("{value:?}"),
            });
        }
        self.view.bindings[index] = Some(value.clone());
        Ok(true)
    }

    /// Allocate `count` binding cells up front and skip past them.
    pub fn reserve_bindings(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            self.next_binding()?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Creation instructions
    // -------------------------------------------------------------------------

    /// Create an element at `index`, followed by its directive slots and
    /// then its local slots. Leaves the element open for children.
    pub fn element_start(&mut self, index: usize, decl: ElementDecl) -> Result<()> {
        self.expect_next(index, "element_start")?;
        for (kind, list) in [("attribute", &decl.attrs), ("local", &decl.locals)] {
            if list.len() % 2 != 0 {
                return Err(RenderError::MalformedPairs {
                    kind,
                    len: list.len(),
                });
            }
        }

        let attrs: Vec<(String, String)> = decl
            .attrs
            .chunks(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();

        let mut directives = decl.directives;
        if decl.resolve {
            for def in registry::directives_for(&decl.tag, &attrs) {
                if !directives.iter().any(|d| Rc::ptr_eq(d, &def)) {
                    directives.push(def);
                }
            }
        }
        // Stable: components first, otherwise declaration order.
        directives.sort_by_key(|d| !d.is_component());

        let doc = self.view.doc.clone();
        let node = doc.create_element(&decl.tag);
        for (name, value) in &attrs {
            doc.set_attribute(&node, name, value);
        }

        self.view.slots.push(Slot::Element(ElementSlot {
            node: node.clone(),
            tag: decl.tag,
            attrs,
            directives: Vec::new(),
            component: None,
            content: Rc::new(RefCell::new(Vec::new())),
        }));
        self.place(Placed::Node(node.clone()))?;
        self.open.push(index);

        let injector = NodeInjector {
            document: doc,
            node,
            template: None,
            container: None,
        };
        self.instantiate_directives(index, directives.into_iter(), &injector)?;
        self.declare_locals(index, &decl.locals)
    }

    /// Close the innermost open element.
    pub fn element_end(&mut self) -> Result<()> {
        if !self.creation {
            return Err(RenderError::NotInCreationMode("element_end"));
        }
        self.open.pop().ok_or(RenderError::UnbalancedElementEnd)?;
        Ok(())
    }

    /// Create a text node at `index`, optionally with static content.
    pub fn text(&mut self, index: usize, value: Option<&str>) -> Result<()> {
        self.expect_next(index, "text")?;
        let node = self.view.doc.create_text(value.unwrap_or(""));
        self.view.slots.push(Slot::Text(node.clone()));
        self.place(Placed::Node(node))
    }

    pub(crate) fn instantiate_directives(
        &mut self,
        host: usize,
        defs: impl Iterator<Item = Rc<DirectiveDef>>,
        injector: &NodeInjector,
    ) -> Result<()> {
        for def in defs {
            let factory = def
                .factory
                .as_ref()
                .ok_or_else(|| RenderError::MissingFactory(def.name().to_string()))?;
            if def.is_component() && !def.has_template() {
                return Err(RenderError::MissingTemplate(def.name().to_string()));
            }

            let instance = factory(injector);
            let handle = Value::opaque(Rc::new(instance.clone()));
            let content_queries = def
                .content_queries()
                .iter()
                .cloned()
                .map(QueryList::new)
                .collect();

            let slot = self.view.slots.len();
            log::trace!("slot {slot}: {} on slot {host}", def.name());
            self.view.slots.push(Slot::Directive(DirectiveSlot {
                def: def.clone(),
                instance,
                handle: handle.clone(),
                host,
                state: HookState::empty(),
                changes: SimpleChanges::new(),
                inputs: IndexMap::new(),
                component_view: None,
                content_queries,
            }));
            match self.view.slot_mut(host)? {
                Slot::Element(el) => {
                    el.directives.push(slot);
                    if def.is_component() && el.component.is_none() {
                        el.component = Some(slot);
                    }
                }
                Slot::Container(c) => c.directives.push(slot),
                _ => {}
            }

            self.offer_to_queries(
                host,
                Candidate::Directive {
                    tag: def.type_tag(),
                    handle: &handle,
                },
            );
        }
        Ok(())
    }

    fn declare_locals(&mut self, host: usize, flat: &[String]) -> Result<()> {
        for pair in flat.chunks(2) {
            let (name, export) = (&pair[0], &pair[1]);
            let value = self.resolve_export(host, export)?;
            self.view.slots.push(Slot::Local(value.clone()));
            self.offer_to_queries(host, Candidate::Local { name, value: &value });
        }
        Ok(())
    }

    fn resolve_export(&self, host: usize, export: &str) -> Result<Value> {
        let el = self.view.element(host)?;
        if export.is_empty() {
            return match el.component {
                Some(dir) => Ok(self.view.directive(dir)?.handle.clone()),
                None => Ok(Value::opaque(Rc::new(el.node.clone()))),
            };
        }
        for &dir in &el.directives {
            let slot = self.view.directive(dir)?;
            if slot.def.export_as() == Some(export) {
                return Ok(slot.handle.clone());
            }
        }
        Err(RenderError::UnknownExport {
            element: host,
            name: export.to_string(),
        })
    }

    /// Put newly created nodes where they belong: into the innermost open
    /// element, into a component host's projectable content, or at the
    /// view's root.
    pub(crate) fn place(&mut self, placed: Placed) -> Result<()> {
        let Some(&parent) = self.open.last() else {
            self.view.insert_root(placed);
            return Ok(());
        };
        let el = self.view.element(parent)?;
        if el.component.is_some() {
            el.content.borrow_mut().push(placed);
        } else {
            let parent_node = el.node.clone();
            for node in placed.flatten() {
                self.view.doc.append_child(&parent_node, &node);
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Update instructions
    // -------------------------------------------------------------------------

    /// Set a text node's content when the value changes.
    pub fn text_binding(&mut self, index: usize, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if !self.bind(&value)? {
            return Ok(());
        }
        let node = match self.view.slot(index)? {
            Slot::Text(node) => node.clone(),
            _ => {
                return Err(RenderError::SlotType {
                    index,
                    expected: "a text node",
                });
            }
        };
        self.view.doc.set_text(&node, &value.stringify());
        Ok(())
    }

    /// Bind `name` on the element or container at `index`.
    ///
    /// Directive inputs with that public name receive the value; otherwise it
    /// is written as a DOM property of the element.
    pub fn property(&mut self, index: usize, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if !self.bind(&value)? {
            return Ok(());
        }

        let directives = self.view.hosted_directives(index)?.to_vec();
        let mut delivered = false;
        for dir in directives {
            let slot = self.view.directive_mut(dir)?;
            let Some(internal) = slot.def.inputs().get(name).cloned() else {
                continue;
            };
            delivered = true;
            slot.instance.borrow_dyn()?.set_input(&internal, value.clone());
            if slot.def.tracks_changes() {
                let previous = slot.inputs.get(&internal).cloned();
                let first_change = previous.is_none();
                slot.changes.insert(
                    internal.clone(),
                    SimpleChange {
                        previous: previous.unwrap_or_default(),
                        current: value.clone(),
                        first_change,
                    },
                );
            }
            slot.inputs.insert(internal, value.clone());
        }
        if delivered {
            return Ok(());
        }

        match self.view.slot(index)? {
            Slot::Element(el) => {
                if !el.directives.is_empty() {
                    log::warn!("no directive on <{}> has an input `{name}`; writing a DOM property", el.tag);
                }
                let node = el.node.clone();
                self.view.doc.set_property(&node, name, value);
            }
            _ => log::warn!("no directive on container slot {index} has an input `{name}`"),
        }
        Ok(())
    }

    /// Bind an attribute; nullish values remove it.
    pub fn attribute(&mut self, index: usize, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if !self.bind(&value)? {
            return Ok(());
        }
        let node = self.view.element(index)?.node.clone();
        if value.is_nullish() {
            self.view.doc.remove_attribute(&node, name);
        } else {
            self.view.doc.set_attribute(&node, name, &value.stringify());
        }
        Ok(())
    }

    /// Subscribe the declaring component `T` to `event` on the element at
    /// `index`: a directive output with that public name if one exists,
    /// otherwise DOM events dispatched on the element.
    pub fn listen<T: 'static>(
        &mut self,
        index: usize,
        event: &str,
        handler: impl Fn(&mut T, &Value) -> HookResult + 'static,
    ) -> Result<()> {
        if !self.creation {
            return Err(RenderError::NotInCreationMode("listen"));
        }
        let target = self
            .view
            .component
            .clone()
            .ok_or_else(|| RenderError::NoContext(event.to_string()))?;
        let handler = Rc::new(handler);
        let name = event.to_string();
        let callback = move |value: &Value| -> HookResult {
            let deliver = {
                let (target, handler, value) = (target.clone(), handler.clone(), value.clone());
                move || -> HookResult {
                    target
                        .with_mut(|component: &mut T| (*handler)(component, &value))
                        .map_err(|err| Box::new(err) as BoxError)?
                }
            };
            // Emitted from a child hook while our template still holds the
            // component: deliver once the template returns.
            if target.is_busy() {
                deferred::defer(target.clone(), &name, Box::new(deliver));
                return Ok(());
            }
            deliver()
        };

        for dir in self.view.hosted_directives(index)?.to_vec() {
            let slot = self.view.directive(dir)?;
            let Some(internal) = slot.def.outputs().get(event) else {
                continue;
            };
            let emitter = slot.instance.borrow_dyn()?.output(internal);
            if let Some(emitter) = emitter {
                let id = emitter.subscribe(callback);
                self.view
                    .cleanup
                    .push(Box::new(move || emitter.unsubscribe(id)));
                return Ok(());
            }
            log::warn!("{} declares output `{event}` but exposes no emitter", slot.def.name());
        }

        let node = self.view.element(index)?.node.clone();
        let doc = self.view.doc.clone();
        let id = doc.add_listener(&node, event, Rc::new(callback));
        self.view
            .cleanup
            .push(Box::new(move || doc.remove_listener(&node, id)));
        Ok(())
    }

    /// Run the host-binding function of the directive at `directive`.
    pub fn host_bindings(&mut self, directive: usize, element: usize) -> Result<()> {
        let slot = self.view.directive(directive)?;
        if slot.host != element {
            return Err(RenderError::HostMismatch { directive, element });
        }
        let def = slot.def.clone();
        match def.host_bindings.as_ref() {
            Some(host_bindings) => host_bindings(self, directive, element),
            None => Ok(()),
        }
    }

    /// Mark a directive as refreshed in this pass and fire its init-phase
    /// hooks (`on_changes`, `on_init`, `do_check`).
    pub fn refresh(&mut self, directive: usize, element: usize) -> Result<()> {
        if self.view.directive(directive)?.host != element {
            return Err(RenderError::HostMismatch { directive, element });
        }
        self.view.refreshed.push(directive);
        if self.checking() {
            return Ok(());
        }
        lifecycle::init_hooks(self.view.directive_mut(directive)?)
    }

    // -------------------------------------------------------------------------
    // Loads
    // -------------------------------------------------------------------------

    /// The DOM node of an element, text or container slot.
    pub fn load_element(&self, index: usize) -> Result<NodeRef> {
        self.view.node(index)
    }

    /// The instance in a directive slot.
    pub fn load_directive(&self, index: usize) -> Result<DirectiveRef> {
        Ok(self.view.directive(index)?.instance.clone())
    }

    /// The value of a local reference slot.
    pub fn load_local(&self, index: usize) -> Result<Value> {
        match self.view.slot(index)? {
            Slot::Local(value) => Ok(value.clone()),
            _ => Err(RenderError::SlotType {
                index,
                expected: "a local reference",
            }),
        }
    }

    /// Borrow the directive in slot `index` as a `T`.
    pub fn with_directive<T: 'static, R>(
        &self,
        index: usize,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R> {
        self.view.directive(index)?.instance.with_mut(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::view::Host;
    use crate::renderer::{Document, inner_html};

    fn run(view: &mut View, pass: Pass, program: impl FnOnce(&mut ViewCtx<'_>) -> Result<()>) -> Result<()> {
        let mut rt = ViewCtx::new(view, pass);
        program(&mut rt)?;
        rt.finish()?;
        view.flags.insert(crate::types::ViewFlags::CREATED);
        Ok(())
    }

    fn host_view() -> (Rc<Document>, NodeRef, View) {
        let doc = Document::new();
        let host = doc.create_element("my-component");
        let view = View::new(doc.clone(), "MyComponent", Host::Element(host.clone()));
        (doc, host, view)
    }

    #[test]
    fn test_dom_structure() {
        let (_, host, mut view) = host_view();
        run(&mut view, Pass::Update, |rt| {
            rt.element_start(0, ElementDecl::new("div").attrs(&["class", "my-app", "title", "Hello"]))?;
            rt.text(1, Some("Hello "))?;
            rt.element_start(2, ElementDecl::new("b"))?;
            rt.text(3, Some("World"))?;
            rt.element_end()?;
            rt.text(4, Some("!"))?;
            rt.element_end()
        })
        .unwrap();
        assert_eq!(
            inner_html(&host),
            r#"<div class="my-app" title="Hello">Hello <b>World</b>!</div>"#
        );
    }

    #[test]
    fn test_slot_order_is_enforced() {
        let (_, _, mut view) = host_view();
        let err = run(&mut view, Pass::Update, |rt| rt.text(1, None)).unwrap_err();
        assert!(matches!(err, RenderError::SlotOrder { expected: 0, got: 1 }));
    }

    #[test]
    fn test_declarations_rejected_after_creation() {
        let (_, _, mut view) = host_view();
        run(&mut view, Pass::Update, |rt| rt.text(0, None)).unwrap();
        let err = run(&mut view, Pass::Update, |rt| rt.text(1, None)).unwrap_err();
        assert!(matches!(err, RenderError::NotInCreationMode("text")));
    }

    #[test]
    fn test_unclosed_and_unbalanced_elements() {
        let (_, _, mut view) = host_view();
        let err = run(&mut view, Pass::Update, |rt| rt.element_start(0, ElementDecl::new("p"))).unwrap_err();
        assert!(matches!(err, RenderError::UnclosedElements(1)));

        let (_, _, mut view) = host_view();
        let err = run(&mut view, Pass::Update, |rt| rt.element_end()).unwrap_err();
        assert!(matches!(err, RenderError::UnbalancedElementEnd));
    }

    #[test]
    fn test_odd_attribute_list() {
        let (_, _, mut view) = host_view();
        let err = run(&mut view, Pass::Update, |rt| {
            rt.element_start(0, ElementDecl::new("p").attrs(&["title"]))
        })
        .unwrap_err();
        assert!(matches!(err, RenderError::MalformedPairs { kind: "attribute", len: 1 }));
    }

    #[test]
    fn test_text_binding_writes_only_on_change() {
        let (doc, host, mut view) = host_view();
        let program = |name: &'static str| {
            move |rt: &mut ViewCtx<'_>| {
                if rt.creation_mode() {
                    rt.text(0, None)?;
                }
                rt.text_binding(0, name)
            }
        };
        run(&mut view, Pass::Update, program("a")).unwrap();
        assert_eq!(inner_html(&host), "a");

        doc.reset_stats();
        run(&mut view, Pass::Update, program("a")).unwrap();
        assert_eq!(doc.stats().writes, 0);

        run(&mut view, Pass::Update, program("b")).unwrap();
        assert_eq!(inner_html(&host), "b");
        assert_eq!(doc.stats().writes, 1);
    }

    #[test]
    fn test_binding_count_mismatch() {
        let (_, _, mut view) = host_view();
        run(&mut view, Pass::Update, |rt| {
            rt.text(0, None)?;
            rt.text_binding(0, "x")
        })
        .unwrap();
        let err = run(&mut view, Pass::Update, |_| Ok(())).unwrap_err();
        assert!(matches!(err, RenderError::BindingCount { allocated: 1, used: 0 }));

        let err = run(&mut view, Pass::Update, |rt| {
            rt.text_binding(0, "x")?;
            rt.text_binding(0, "y")
        })
        .unwrap_err();
        assert!(matches!(err, RenderError::BindingCount { allocated: 1, used: 2 }));
    }

    #[test]
    fn test_check_pass_reports_changes() {
        let (_, _, mut view) = host_view();
        run(&mut view, Pass::Update, |rt| {
            rt.text(0, None)?;
            rt.text_binding(0, "x")
        })
        .unwrap();
        run(&mut view, Pass::Check, |rt| rt.text_binding(0, "x")).unwrap();
        let err = run(&mut view, Pass::Check, |rt| rt.text_binding(0, "y")).unwrap_err();
        assert!(matches!(err, RenderError::ExpressionChanged { index: 0, .. }));
    }

    #[test]
    fn test_attribute_binding_removes_on_null() {
        let (_, host, mut view) = host_view();
        let program = |value: Value| {
            move |rt: &mut ViewCtx<'_>| {
                if rt.creation_mode() {
                    rt.element_start(0, ElementDecl::new("span"))?;
                    rt.element_end()?;
                }
                rt.attribute(0, "title", value)
            }
        };
        run(&mut view, Pass::Update, program(Value::from("hi"))).unwrap();
        assert_eq!(inner_html(&host), r#"<span title="hi"></span>"#);
        run(&mut view, Pass::Update, program(Value::Null)).unwrap();
        assert_eq!(inner_html(&host), "<span></span>");
    }

    #[test]
    fn test_element_local_and_property() {
        let (_, _, mut view) = host_view();
        run(&mut view, Pass::Update, |rt| {
            rt.element_start(0, ElementDecl::new("input").locals(&["user", ""]))?;
            rt.element_end()?;
            rt.property(0, "value", "abc")
        })
        .unwrap();
        let rt = ViewCtx::new(&mut view, Pass::Update);
        let local = rt.load_local(1).unwrap();
        let node = local.downcast::<NodeRef>().unwrap();
        assert_eq!(node.borrow().property("value"), Some(&Value::from("abc")));
        assert!(matches!(rt.load_local(0), Err(RenderError::SlotType { index: 0, .. })));
    }

    #[test]
    fn test_unknown_export() {
        let (_, _, mut view) = host_view();
        let err = run(&mut view, Pass::Update, |rt| {
            rt.element_start(0, ElementDecl::new("form").locals(&["f", "ngForm"]))
        })
        .unwrap_err();
        assert!(matches!(err, RenderError::UnknownExport { element: 0, .. }));
    }
}
