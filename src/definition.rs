//! Definition objects - static descriptors for components, directives and pipes.
//!
//! A definition is built once per type and shared (`Rc`) by every instance.
//! Nothing is discovered by reflection: the selector, inputs, outputs,
//! factory and template are all supplied explicitly through the builders.
//!
//! ```ignore
//! let def = DirectiveDef::component::<Greeting>("greeting")
//!     .factory(|_| Greeting::default())
//!     .input("name", "name")
//!     .template(|rt, ctx: &mut Greeting| {
//!         if rt.creation_mode() {
//!             rt.text(0, None)?;
//!         }
//!         rt.text_binding(0, interpolation1("Hello ", ctx.name.clone(), "!"))
//!     })
//!     .build()?;
//! ```

use std::any::{Any, TypeId};
use std::cell::{RefCell, RefMut};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::engine::{QuerySpec, TemplateRef, ViewContainerRef, ViewCtx};
use crate::error::{BoxError, HookResult, RenderError, Result, SelectorError};
use crate::renderer::{Document, NodeRef};
use crate::selector::CssSelector;
use crate::types::{SimpleChanges, Value};

// =============================================================================
// Type Tags
// =============================================================================

/// Opaque type identity plus a display name.
#[derive(Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: short_name(std::any::type_name::<T>()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// =============================================================================
// Directive Trait
// =============================================================================

/// Upcast helper so trait objects can be downcast to their concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn any_type_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn any_type_name(&self) -> &'static str {
        short_name(std::any::type_name::<T>())
    }
}

fn short_name(full: &'static str) -> &'static str {
    full.rsplit("::").next().unwrap_or(full)
}

/// A component or directive instance.
///
/// Every hook has a no-op default; implement only the ones you need.
/// Hooks return [`HookResult`]; an error aborts the current pass.
pub trait Directive: AsAny {
    /// Receive a bound input, addressed by its internal name.
    fn set_input(&mut self, name: &str, value: Value) {
        let _ = (name, value);
    }

    /// Look up an output emitter by internal name.
    fn output(&self, name: &str) -> Option<EventEmitter> {
        let _ = name;
        None
    }

    /// Called before `on_init`/`do_check` with the inputs written since the
    /// last call. Only fires for definitions built with [`on_changes_feature`].
    fn on_changes(&mut self, changes: &SimpleChanges) -> HookResult {
        let _ = changes;
        Ok(())
    }

    fn on_init(&mut self) -> HookResult {
        Ok(())
    }

    fn do_check(&mut self) -> HookResult {
        Ok(())
    }

    fn after_content_init(&mut self) -> HookResult {
        Ok(())
    }

    fn after_content_checked(&mut self) -> HookResult {
        Ok(())
    }

    fn after_view_init(&mut self) -> HookResult {
        Ok(())
    }

    fn after_view_checked(&mut self) -> HookResult {
        Ok(())
    }

    fn on_destroy(&mut self) -> HookResult {
        Ok(())
    }
}

pub(crate) fn downcast_ref<T: Any>(directive: &dyn Directive) -> Option<&T> {
    AsAny::as_any(directive).downcast_ref::<T>()
}

pub(crate) fn downcast_mut<T: Any>(directive: &mut dyn Directive) -> Option<&mut T> {
    AsAny::as_any_mut(directive).downcast_mut::<T>()
}

// =============================================================================
// Directive Handles
// =============================================================================

/// Shared handle to a live directive instance.
#[derive(Clone)]
pub struct DirectiveRef {
    cell: Rc<RefCell<dyn Directive>>,
    tag: TypeTag,
}

impl DirectiveRef {
    pub fn new<T: Directive>(instance: T) -> Self {
        Self {
            cell: Rc::new(RefCell::new(instance)),
            tag: TypeTag::of::<T>(),
        }
    }

    pub fn type_tag(&self) -> TypeTag {
        self.tag
    }

    pub fn is<T: Any>(&self) -> bool {
        self.tag.is::<T>()
    }

    pub fn ptr_eq(a: &DirectiveRef, b: &DirectiveRef) -> bool {
        Rc::ptr_eq(&a.cell, &b.cell)
    }

    /// Read the instance as a `T`.
    pub fn with<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        let guard = self
            .cell
            .try_borrow()
            .map_err(|_| RenderError::Reentrant(self.tag.name.to_string()))?;
        downcast_ref::<T>(&*guard)
            .map(f)
            .ok_or_else(|| self.mismatch::<T>())
    }

    /// Mutate the instance as a `T`.
    pub fn with_mut<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let mut guard = self.borrow_dyn()?;
        match downcast_mut::<T>(&mut *guard) {
            Some(instance) => Ok(f(instance)),
            None => Err(self.mismatch::<T>()),
        }
    }

    /// Recover a handle stored in a [`Value`] (query results, local refs).
    pub fn from_value(value: &Value) -> Option<DirectiveRef> {
        value.downcast::<DirectiveRef>().map(|rc| (*rc).clone())
    }

    pub(crate) fn borrow_dyn(&self) -> Result<RefMut<'_, dyn Directive>> {
        self.cell
            .try_borrow_mut()
            .map_err(|_| RenderError::Reentrant(self.tag.name.to_string()))
    }

    /// Currently borrowed (its template or a hook is running).
    pub(crate) fn is_busy(&self) -> bool {
        self.cell.try_borrow_mut().is_err()
    }

    fn mismatch<T: Any>(&self) -> RenderError {
        RenderError::TypeMismatch {
            expected: TypeTag::of::<T>().name,
            actual: self.tag.name,
        }
    }
}

impl fmt::Debug for DirectiveRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DirectiveRef({})", self.tag.name)
    }
}

// =============================================================================
// Outputs
// =============================================================================

type Subscriber = Rc<dyn Fn(&Value) -> HookResult>;

/// Output channel of a directive.
///
/// Clones share the same subscriber list.
#[derive(Clone, Default)]
pub struct EventEmitter {
    inner: Rc<RefCell<EmitterState>>,
}

#[derive(Default)]
struct EmitterState {
    next_id: u64,
    subscribers: Vec<(u64, Subscriber)>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber; returns an id for [`EventEmitter::unsubscribe`].
    pub fn subscribe(&self, handler: impl Fn(&Value) -> HookResult + 'static) -> u64 {
        let mut state = self.inner.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        state.subscribers.push((id, Rc::new(handler)));
        id
    }

    pub fn unsubscribe(&self, id: u64) {
        self.inner
            .borrow_mut()
            .subscribers
            .retain(|(sub, _)| *sub != id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Deliver a value to every subscriber in subscription order.
    /// Stops at the first failing subscriber.
    pub fn emit(&self, value: impl Into<Value>) -> HookResult {
        let value = value.into();
        let subscribers: Vec<Subscriber> = self
            .inner
            .borrow()
            .subscribers
            .iter()
            .map(|(_, s)| s.clone())
            .collect();
        for subscriber in subscribers {
            subscriber(&value)?;
        }
        Ok(())
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventEmitter({} subscribers)", self.subscriber_count())
    }
}

// =============================================================================
// Node Injector
// =============================================================================

/// What a factory may ask for about the node it is created on.
pub struct NodeInjector {
    pub(crate) document: Rc<Document>,
    pub(crate) node: NodeRef,
    pub(crate) template: Option<TemplateRef>,
    pub(crate) container: Option<ViewContainerRef>,
}

impl NodeInjector {
    /// The host element (or the comment anchor for container directives).
    pub fn element(&self) -> &NodeRef {
        &self.node
    }

    pub fn document(&self) -> &Rc<Document> {
        &self.document
    }

    /// The embedded template, for directives declared on a container.
    pub fn template_ref(&self) -> Option<TemplateRef> {
        self.template.clone()
    }

    /// The container, for directives declared on a container.
    pub fn view_container_ref(&self) -> Option<ViewContainerRef> {
        self.container.clone()
    }
}

// =============================================================================
// Directive Definitions
// =============================================================================

pub(crate) type Factory = Box<dyn Fn(&NodeInjector) -> DirectiveRef>;
pub(crate) type TemplateFn = Box<dyn Fn(&mut ViewCtx<'_>, &mut dyn Directive) -> Result<()>>;
pub(crate) type HostBindingsFn = Box<dyn Fn(&mut ViewCtx<'_>, usize, usize) -> Result<()>>;

/// Post-definition decorator, applied in order when the definition is built.
pub type Feature = fn(&mut DirectiveDef);

/// Turn on input change recording so `on_changes` fires.
pub fn on_changes_feature(def: &mut DirectiveDef) {
    def.track_changes = true;
}

/// Static descriptor of a component or directive type.
pub struct DirectiveDef {
    type_tag: TypeTag,
    selector: CssSelector,
    tag: Option<String>,
    pub(crate) factory: Option<Factory>,
    pub(crate) template: Option<TemplateFn>,
    pub(crate) host_bindings: Option<HostBindingsFn>,
    inputs: IndexMap<String, String>,
    outputs: IndexMap<String, String>,
    content_queries: Vec<QuerySpec>,
    export_as: Option<String>,
    feature_count: usize,
    track_changes: bool,
}

impl DirectiveDef {
    /// Start a component definition; `tag` is the host element name.
    pub fn component<T: Directive>(tag: &str) -> DirectiveDefBuilder<T> {
        DirectiveDefBuilder::new(Some(tag.to_string()), tag.to_string())
    }

    /// Start a directive definition matched by `selector`.
    pub fn directive<T: Directive>(selector: &str) -> DirectiveDefBuilder<T> {
        DirectiveDefBuilder::new(None, selector.to_string())
    }

    pub fn type_tag(&self) -> TypeTag {
        self.type_tag
    }

    pub fn name(&self) -> &'static str {
        self.type_tag.name
    }

    pub fn selector(&self) -> &CssSelector {
        &self.selector
    }

    /// Host tag name (components only).
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn is_component(&self) -> bool {
        self.tag.is_some()
    }

    /// Public input name -> internal name.
    pub fn inputs(&self) -> &IndexMap<String, String> {
        &self.inputs
    }

    /// Public output name -> internal name.
    pub fn outputs(&self) -> &IndexMap<String, String> {
        &self.outputs
    }

    pub fn content_queries(&self) -> &[QuerySpec] {
        &self.content_queries
    }

    pub fn export_as(&self) -> Option<&str> {
        self.export_as.as_deref()
    }

    pub fn set_export_as(&mut self, name: impl Into<String>) {
        self.export_as = Some(name.into());
    }

    pub fn tracks_changes(&self) -> bool {
        self.track_changes
    }

    pub fn has_template(&self) -> bool {
        self.template.is_some()
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    pub fn matches(&self, tag: &str, attrs: &[(String, String)]) -> bool {
        self.selector.matches(tag, attrs)
    }

    /// Run the component template against an instance.
    pub(crate) fn render(&self, rt: &mut ViewCtx<'_>, instance: &DirectiveRef) -> Result<()> {
        let template = self
            .template
            .as_ref()
            .ok_or_else(|| RenderError::MissingTemplate(self.name().to_string()))?;
        let mut guard = instance.borrow_dyn()?;
        template(rt, &mut *guard)
    }
}

impl fmt::Debug for DirectiveDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectiveDef")
            .field("type", &self.type_tag)
            .field("selector", &self.selector.to_string())
            .field("tag", &self.tag)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("export_as", &self.export_as)
            .finish_non_exhaustive()
    }
}

/// Typed builder for [`DirectiveDef`].
pub struct DirectiveDefBuilder<T> {
    tag: Option<String>,
    selector: String,
    factory: Option<Factory>,
    template: Option<TemplateFn>,
    host_bindings: Option<HostBindingsFn>,
    inputs: IndexMap<String, String>,
    outputs: IndexMap<String, String>,
    features: Vec<Feature>,
    content_queries: Vec<QuerySpec>,
    export_as: Option<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Directive> DirectiveDefBuilder<T> {
    fn new(tag: Option<String>, selector: String) -> Self {
        Self {
            tag,
            selector,
            factory: None,
            template: None,
            host_bindings: None,
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            features: Vec::new(),
            content_queries: Vec::new(),
            export_as: None,
            _marker: PhantomData,
        }
    }

    /// Override the selector (components default to their tag).
    pub fn selector(mut self, selector: &str) -> Self {
        self.selector = selector.to_string();
        self
    }

    pub fn factory(mut self, factory: impl Fn(&NodeInjector) -> T + 'static) -> Self {
        self.factory = Some(Box::new(move |injector| DirectiveRef::new(factory(injector))));
        self
    }

    /// The view program, run in creation mode once and in update mode on
    /// every pass.
    pub fn template(
        mut self,
        template: impl Fn(&mut ViewCtx<'_>, &mut T) -> Result<()> + 'static,
    ) -> Self {
        self.template = Some(Box::new(move |rt, instance| {
            let actual = AsAny::any_type_name(instance);
            match downcast_mut::<T>(instance) {
                Some(ctx) => template(rt, ctx),
                None => Err(RenderError::TypeMismatch {
                    expected: TypeTag::of::<T>().name,
                    actual,
                }),
            }
        }));
        self
    }

    /// Called by the host view with `(directive_slot, host_element_slot)`.
    pub fn host_bindings(
        mut self,
        host_bindings: impl Fn(&mut ViewCtx<'_>, usize, usize) -> Result<()> + 'static,
    ) -> Self {
        self.host_bindings = Some(Box::new(host_bindings));
        self
    }

    pub fn input(mut self, public: &str, internal: &str) -> Self {
        self.inputs.insert(public.to_string(), internal.to_string());
        self
    }

    pub fn output(mut self, public: &str, internal: &str) -> Self {
        self.outputs.insert(public.to_string(), internal.to_string());
        self
    }

    pub fn feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }

    /// Declare a content query; instances expose it through
    /// [`ViewCtx::content_query`] in declaration order.
    pub fn content_query(mut self, query: QuerySpec) -> Self {
        self.content_queries.push(query);
        self
    }

    pub fn export_as(mut self, name: &str) -> Self {
        self.export_as = Some(name.to_string());
        self
    }

    /// Parse the selector and apply features.
    pub fn build(self) -> std::result::Result<Rc<DirectiveDef>, SelectorError> {
        let selector = CssSelector::parse(&self.selector)?;
        let mut def = DirectiveDef {
            type_tag: TypeTag::of::<T>(),
            selector,
            tag: self.tag,
            factory: self.factory,
            template: self.template,
            host_bindings: self.host_bindings,
            inputs: self.inputs,
            outputs: self.outputs,
            content_queries: self.content_queries,
            export_as: self.export_as,
            feature_count: self.features.len(),
            track_changes: false,
        };
        for feature in &self.features {
            feature(&mut def);
        }
        Ok(Rc::new(def))
    }
}

// =============================================================================
// Pipes
// =============================================================================

/// A named value transform.
pub trait Pipe: AsAny {
    fn transform(&mut self, value: &Value, args: &[Value]) -> std::result::Result<Value, BoxError>;

    fn on_destroy(&mut self) -> HookResult {
        Ok(())
    }
}

pub(crate) type PipeFactory = Box<dyn Fn() -> Box<dyn Pipe>>;

/// Static descriptor of a pipe type.
pub struct PipeDef {
    type_tag: TypeTag,
    name: String,
    pure: bool,
    pub(crate) factory: Option<PipeFactory>,
}

impl PipeDef {
    /// Start a pipe definition. Pipes are pure unless stated otherwise.
    pub fn new<P: Pipe>(name: &str) -> PipeDefBuilder<P> {
        PipeDefBuilder {
            name: name.to_string(),
            pure: true,
            factory: None,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_tag(&self) -> TypeTag {
        self.type_tag
    }

    pub fn is_pure(&self) -> bool {
        self.pure
    }
}

impl fmt::Debug for PipeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipeDef")
            .field("name", &self.name)
            .field("type", &self.type_tag)
            .field("pure", &self.pure)
            .finish()
    }
}

pub struct PipeDefBuilder<P> {
    name: String,
    pure: bool,
    factory: Option<PipeFactory>,
    _marker: PhantomData<fn() -> P>,
}

impl<P: Pipe> PipeDefBuilder<P> {
    pub fn factory(mut self, factory: impl Fn() -> P + 'static) -> Self {
        self.factory = Some(Box::new(move || Box::new(factory()) as Box<dyn Pipe>));
        self
    }

    pub fn pure(mut self, pure: bool) -> Self {
        self.pure = pure;
        self
    }

    pub fn build(self) -> Rc<PipeDef> {
        Rc::new(PipeDef {
            type_tag: TypeTag::of::<P>(),
            name: self.name,
            pure: self.pure,
            factory: self.factory,
        })
    }
}
