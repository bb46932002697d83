//! Containers and embedded views.
//!
//! A container is a comment anchor plus an ordered list of embedded views,
//! each instantiated from a [`TemplateRef`] with its own context value.
//! Structural directives declared on the container receive a
//! [`ViewContainerRef`] and decide which views exist; the declaring view
//! refreshes them between `container_refresh_start` and
//! `container_refresh_end`.
//!
//! Embedded templates never close over their parent's state. They receive a
//! [`Scope`] instead: the declaring component, the view's own context, any
//! named locals, and the parent scope for template variables of enclosing
//! embedded views.
//!
//! ```text
//! <ul>                      slot 0  Element
//!   <li *for="let item">    slot 1  Container (anchor)
//!                           slot 2  ForOf directive (host 1)
//! </ul>
//!
//! container_refresh_start(1); refresh(2, 1); container_refresh_end(&scope)
//! ```

use std::any::Any;
use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use super::change_detection::{refresh_view, Pass};
use super::instructions::ViewCtx;
use super::lifecycle::destroy_view;
use super::query::{InheritedQuery, QueryList};
use super::view::{ContainerSlot, Host, Placed, Slot, View, ViewPath};
use crate::definition::{DirectiveDef, DirectiveRef, NodeInjector, TypeTag};
use crate::error::{RenderError, Result};
use crate::renderer::{Document, NodeRef};
use crate::types::Value;

// =============================================================================
// Templates
// =============================================================================

type EmbeddedProgram = dyn Fn(&mut ViewCtx<'_>, &Scope<'_>) -> Result<()>;

/// An embedded view program.
#[derive(Clone)]
pub struct TemplateRef {
    name: Rc<str>,
    program: Rc<EmbeddedProgram>,
}

impl TemplateRef {
    pub fn new(
        name: &str,
        program: impl Fn(&mut ViewCtx<'_>, &Scope<'_>) -> Result<()> + 'static,
    ) -> Self {
        Self {
            name: Rc::from(name),
            program: Rc::new(program),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ptr_eq(a: &TemplateRef, b: &TemplateRef) -> bool {
        Rc::ptr_eq(&a.program, &b.program)
    }
}

impl fmt::Debug for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TemplateRef({})", self.name)
    }
}

// =============================================================================
// Scope
// =============================================================================

/// Variables visible to an embedded template.
pub struct Scope<'a> {
    component: &'a dyn Any,
    component_name: &'static str,
    context: Value,
    locals: Vec<(String, Value)>,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    /// Root scope for templates declared by `component`'s view.
    pub fn new<T: Any>(component: &'a T) -> Self {
        Self {
            component,
            component_name: TypeTag::of::<T>().name(),
            context: Value::Undefined,
            locals: Vec::new(),
            parent: None,
        }
    }

    /// Add a named local (e.g. a `#ref` loaded in the declaring view).
    pub fn with_local(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.locals.push((name.to_string(), value.into()));
        self
    }

    /// Scope for one embedded view of a container declared here.
    pub fn child(&self, context: impl Into<Value>) -> Scope<'_> {
        Scope {
            component: self.component,
            component_name: self.component_name,
            context: context.into(),
            locals: Vec::new(),
            parent: Some(self),
        }
    }

    /// The declaring component.
    pub fn component<T: Any>(&self) -> Result<&'a T> {
        self.component
            .downcast_ref::<T>()
            .ok_or(RenderError::TypeMismatch {
                expected: TypeTag::of::<T>().name(),
                actual: self.component_name,
            })
    }

    /// This view's context value.
    pub fn context(&self) -> &Value {
        &self.context
    }

    /// `context.$implicit`, the value bound by `let item`.
    pub fn implicit(&self) -> Value {
        self.context.get("$implicit")
    }

    pub fn parent(&self) -> Option<&'a Scope<'a>> {
        self.parent
    }

    /// Look a local up here, then in enclosing scopes.
    pub fn local(&self, name: &str) -> Option<&Value> {
        self.locals
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .or_else(|| self.parent.and_then(|p| p.local(name)))
    }

    /// Number of enclosing scopes.
    pub fn depth(&self) -> usize {
        self.parent.map_or(0, |p| p.depth() + 1)
    }
}

// =============================================================================
// Container State
// =============================================================================

pub(crate) struct EmbeddedView {
    pub(crate) view: View,
    pub(crate) template: TemplateRef,
    pub(crate) context: Value,
    /// Current index in the container, shared with the view's path.
    position: Rc<Cell<usize>>,
}

pub(crate) struct LContainer {
    pub(crate) doc: Rc<Document>,
    pub(crate) anchor: NodeRef,
    pub(crate) template: Option<TemplateRef>,
    pub(crate) component: Option<DirectiveRef>,
    pub(crate) queries: Vec<QueryList>,
    pub(crate) content_queries: Vec<InheritedQuery>,
    /// Path of the declaring view and the container's slot in it.
    pub(crate) path: ViewPath,
    pub(crate) slot: usize,
    pub(crate) views: Vec<EmbeddedView>,
}

impl LContainer {
    fn renumber(&self) {
        for (i, embedded) in self.views.iter().enumerate() {
            embedded.position.set(i);
        }
    }

    /// Nodes of every rendered view, then the anchor.
    pub(crate) fn flatten_into(&self, out: &mut Vec<NodeRef>) {
        for embedded in &self.views {
            if embedded.view.is_created() {
                out.extend(embedded.view.root_nodes());
            }
        }
        out.push(self.anchor.clone());
    }

    /// First node after view `index`, if any later view is rendered.
    fn reference_for(&self, index: usize) -> Option<NodeRef> {
        self.views[index + 1..]
            .iter()
            .filter(|e| e.view.is_created())
            .find_map(|e| e.view.root_nodes().into_iter().next())
    }
}

/// Handle through which structural directives manage a container's views.
#[derive(Clone)]
pub struct ViewContainerRef {
    inner: Rc<RefCell<LContainer>>,
}

impl ViewContainerRef {
    fn borrow_mut(&self) -> Result<std::cell::RefMut<'_, LContainer>> {
        self.inner
            .try_borrow_mut()
            .map_err(|_| RenderError::Reentrant("view container".to_string()))
    }

    fn borrow(&self) -> Result<Ref<'_, LContainer>> {
        self.inner
            .try_borrow()
            .map_err(|_| RenderError::Reentrant("view container".to_string()))
    }

    /// Queue an embedded view at `index` (default: the end).
    ///
    /// The view renders at the container's next refresh.
    pub fn create_embedded_view(
        &self,
        template: &TemplateRef,
        context: impl Into<Value>,
        index: Option<usize>,
    ) -> Result<usize> {
        let mut container = self.borrow_mut()?;
        let len = container.views.len();
        let index = index.unwrap_or(len);
        if index > len {
            return Err(RenderError::ViewIndexOutOfRange { index, len });
        }

        let mut view = View::new(
            container.doc.clone(),
            template.name(),
            Host::Anchor {
                anchor: container.anchor.clone(),
                reference: None,
            },
        );
        let position = Rc::new(Cell::new(index));
        view.component = container.component.clone();
        view.queries = container.queries.clone();
        view.content_queries = container.content_queries.clone();
        view.path = container.path.child(container.slot, position.clone());

        container.views.insert(
            index,
            EmbeddedView {
                view,
                template: template.clone(),
                context: context.into(),
                position,
            },
        );
        container.renumber();
        Ok(index)
    }

    /// Destroy the view at `index` and detach its nodes.
    pub fn remove(&self, index: usize) -> Result<()> {
        let mut embedded = {
            let mut container = self.borrow_mut()?;
            let len = container.views.len();
            if index >= len {
                return Err(RenderError::ViewIndexOutOfRange { index, len });
            }
            let embedded = container.views.remove(index);
            container.renumber();
            embedded
        };
        destroy_view(&mut embedded.view)
    }

    /// Destroy every view. All views are torn down even if a hook fails;
    /// the first failure is returned.
    pub fn clear(&self) -> Result<()> {
        let views = std::mem::take(&mut self.borrow_mut()?.views);
        let mut first_error = None;
        for mut embedded in views {
            if let Err(err) = destroy_view(&mut embedded.view) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Number of views. Fails while the container is being refreshed.
    pub fn len(&self) -> Result<usize> {
        Ok(self.borrow()?.views.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn context(&self, index: usize) -> Result<Option<Value>> {
        Ok(self.borrow()?.views.get(index).map(|e| e.context.clone()))
    }

    /// Replace a view's context; the new value is visible at the next refresh.
    pub fn set_context(&self, index: usize, context: impl Into<Value>) -> Result<()> {
        let mut container = self.borrow_mut()?;
        let len = container.views.len();
        let embedded = container
            .views
            .get_mut(index)
            .ok_or(RenderError::ViewIndexOutOfRange { index, len })?;
        embedded.context = context.into();
        Ok(())
    }

    /// The template declared with the container.
    pub fn template_ref(&self) -> Result<Option<TemplateRef>> {
        Ok(self.borrow()?.template.clone())
    }

    pub fn anchor(&self) -> Result<NodeRef> {
        Ok(self.borrow()?.anchor.clone())
    }
}

impl fmt::Debug for ViewContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(c) => write!(f, "ViewContainerRef({} views)", c.views.len()),
            Err(_) => f.write_str("ViewContainerRef(<busy>)"),
        }
    }
}

// =============================================================================
// Instructions
// =============================================================================

impl ViewCtx<'_> {
    /// Declare a container anchor at `index`, followed by one slot per
    /// directive. Directives get the container and template through their
    /// [`NodeInjector`].
    pub fn container(
        &mut self,
        index: usize,
        directives: &[Rc<DirectiveDef>],
        template: Option<TemplateRef>,
    ) -> Result<()> {
        self.expect_next(index, "container")?;

        let doc = self.view.doc.clone();
        let anchor = doc.create_comment("container");
        let container = Rc::new(RefCell::new(LContainer {
            doc: doc.clone(),
            anchor: anchor.clone(),
            template: template.clone(),
            component: self.view.component.clone(),
            queries: self.view.queries.clone(),
            content_queries: self.content_queries_within(&self.open),
            path: self.view.path.clone(),
            slot: index,
            views: Vec::new(),
        }));

        self.view.slots.push(Slot::Container(ContainerSlot {
            anchor: anchor.clone(),
            container: container.clone(),
            directives: Vec::new(),
        }));
        self.place(Placed::Container(container.clone()))?;

        let injector = NodeInjector {
            document: doc,
            node: anchor,
            template,
            container: Some(ViewContainerRef { inner: container }),
        };
        self.instantiate_directives(index, directives.iter().cloned(), &injector)?;
        Ok(())
    }

    /// Handle to the container declared at `index`.
    pub fn view_container(&self, index: usize) -> Result<ViewContainerRef> {
        match self.view.slot(index)? {
            Slot::Container(c) => Ok(ViewContainerRef {
                inner: c.container.clone(),
            }),
            _ => Err(RenderError::SlotType {
                index,
                expected: "a container",
            }),
        }
    }

    /// Begin refreshing the container at `index`.
    pub fn container_refresh_start(&mut self, index: usize) -> Result<()> {
        if let Some(open) = self.open_container {
            return Err(RenderError::NestedContainerRefresh(open));
        }
        if !matches!(self.view.slot(index)?, Slot::Container(_)) {
            return Err(RenderError::SlotType {
                index,
                expected: "a container",
            });
        }
        self.open_container = Some(index);
        Ok(())
    }

    /// Render and refresh every embedded view of the open container.
    ///
    /// Each view runs with `scope.child(context)`; views created since the
    /// last pass run their creation pass here.
    pub fn container_refresh_end(&mut self, scope: &Scope<'_>) -> Result<()> {
        let index = self
            .open_container
            .take()
            .ok_or(RenderError::NoContainerRefresh)?;
        let container = match self.view.slot(index)? {
            Slot::Container(c) => c.container.clone(),
            _ => {
                return Err(RenderError::SlotType {
                    index,
                    expected: "a container",
                });
            }
        };
        let pass = self.pass();

        let mut state = container
            .try_borrow_mut()
            .map_err(|_| RenderError::Reentrant(format!("container {index}")))?;
        for i in 0..state.views.len() {
            if !state.views[i].view.is_created() {
                if pass == Pass::Check {
                    continue;
                }
                let next = state.reference_for(i);
                if let Host::Anchor { reference, .. } = &mut state.views[i].view.host {
                    *reference = next;
                }
            }

            let embedded = &mut state.views[i];
            let child = scope.child(embedded.context.clone());
            let template = embedded.template.clone();
            refresh_view(&mut embedded.view, pass, &mut |rt: &mut ViewCtx<'_>| {
                (template.program)(rt, &child)
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Comp {
        salutation: &'static str,
    }

    #[test]
    fn test_scope_chain() {
        let comp = Comp { salutation: "Hello" };
        let root = Scope::new(&comp).with_local("foo", "ul");
        let item = Value::object([("$implicit", Value::from("one"))]);
        let outer = root.child(item);
        let inner = outer.child(Value::object([("$implicit", Value::from("11"))]));

        assert_eq!(inner.component::<Comp>().unwrap().salutation, "Hello");
        assert_eq!(inner.implicit(), Value::from("11"));
        assert_eq!(inner.parent().unwrap().implicit(), Value::from("one"));
        assert_eq!(inner.local("foo"), Some(&Value::from("ul")));
        assert_eq!(inner.local("bar"), None);
        assert_eq!(inner.depth(), 2);
    }

    #[test]
    fn test_scope_component_type_mismatch() {
        let comp = Comp { salutation: "Hi" };
        let scope = Scope::new(&comp);
        assert!(matches!(
            scope.component::<String>(),
            Err(RenderError::TypeMismatch { expected: "String", actual: "Comp" })
        ));
    }

    fn detached_container() -> ViewContainerRef {
        let doc = Document::new();
        let anchor = doc.create_comment("container");
        ViewContainerRef {
            inner: Rc::new(RefCell::new(LContainer {
                doc,
                anchor,
                template: None,
                component: None,
                queries: Vec::new(),
                content_queries: Vec::new(),
                path: ViewPath::default(),
                slot: 0,
                views: Vec::new(),
            })),
        }
    }

    #[test]
    fn test_view_container_bookkeeping() {
        let vcr = detached_container();
        let template = TemplateRef::new("row", |_, _| Ok(()));
        assert_eq!(vcr.create_embedded_view(&template, 1, None).unwrap(), 0);
        assert_eq!(vcr.create_embedded_view(&template, 0, Some(0)).unwrap(), 0);
        assert_eq!(vcr.len().unwrap(), 2);
        assert_eq!(vcr.context(0).unwrap(), Some(Value::from(0)));
        assert_eq!(vcr.context(1).unwrap(), Some(Value::from(1)));

        vcr.set_context(1, 5).unwrap();
        assert_eq!(vcr.context(1).unwrap(), Some(Value::from(5)));

        assert!(matches!(
            vcr.create_embedded_view(&template, 9, Some(7)),
            Err(RenderError::ViewIndexOutOfRange { index: 7, len: 2 })
        ));
        vcr.remove(0).unwrap();
        assert_eq!(vcr.len().unwrap(), 1);
        assert!(matches!(
            vcr.remove(3),
            Err(RenderError::ViewIndexOutOfRange { .. })
        ));
        vcr.clear().unwrap();
        assert!(vcr.is_empty().unwrap());
    }

    #[test]
    fn test_positions_follow_inserts_and_removes() {
        let vcr = detached_container();
        let template = TemplateRef::new("row", |_, _| Ok(()));
        vcr.create_embedded_view(&template, "b", None).unwrap();
        vcr.create_embedded_view(&template, "a", Some(0)).unwrap();
        vcr.create_embedded_view(&template, "c", None).unwrap();

        let orders = |vcr: &ViewContainerRef| -> Vec<Vec<usize>> {
            let container = vcr.inner.borrow();
            container.views.iter().map(|e| e.view.path.order(0)).collect()
        };
        assert_eq!(orders(&vcr), vec![vec![0, 0, 0], vec![0, 1, 0], vec![0, 2, 0]]);

        vcr.remove(0).unwrap();
        assert_eq!(orders(&vcr), vec![vec![0, 0, 0], vec![0, 1, 0]]);
        assert_eq!(vcr.context(0).unwrap(), Some(Value::from("b")));
    }

    #[test]
    fn test_reads_during_refresh_report_reentrancy() {
        let vcr = detached_container();
        let _busy = vcr.inner.borrow_mut();
        assert!(matches!(vcr.len(), Err(RenderError::Reentrant(_))));
        assert!(matches!(vcr.context(0), Err(RenderError::Reentrant(_))));
        assert!(matches!(vcr.template_ref(), Err(RenderError::Reentrant(_))));
        assert!(matches!(vcr.anchor(), Err(RenderError::Reentrant(_))));
    }
}
