//! Mount API - Root component lifecycle.
//!
//! This module is the entry point for rendering a component tree. A root
//! component gets a synthetic host view holding its host element; every
//! pass starts there.
//!
//! # Example
//!
//! ```ignore
//! use spark_view::pipeline::render_component;
//!
//! let mut handle = render_component(&MyApp::def())?;
//! assert_eq!(handle.html(), "<p>Hello</p>");
//!
//! handle.with_instance(|app: &mut MyApp| app.name = "World".into())?;
//! handle.detect_changes()?;
//!
//! handle.destroy()?;
//! ```

use std::any::Any;
use std::rc::Rc;

use super::config::dev_mode;
use crate::definition::{DirectiveDef, DirectiveRef};
use crate::engine::{destroy_view, refresh_view, ElementDecl, Host, Pass, View, ViewCtx};
use crate::error::{RenderError, Result};
use crate::renderer::{inner_html, Document, NodeRef};

// =============================================================================
// Component Handle
// =============================================================================

/// Handle returned by [`render_component`].
///
/// Owns the whole view tree. Dropping the handle destroys it (best effort);
/// call [`ComponentHandle::destroy`] to observe teardown errors.
pub struct ComponentHandle {
    view: Option<View>,
    def: Rc<DirectiveDef>,
    doc: Rc<Document>,
    host: NodeRef,
    instance: DirectiveRef,
}

impl ComponentHandle {
    /// Run an update pass over the whole tree, followed by a
    /// check-no-changes pass in dev mode.
    pub fn detect_changes(&mut self) -> Result<()> {
        self.run(Pass::Update)?;
        if dev_mode() {
            self.check_no_changes()?;
        }
        Ok(())
    }

    /// Verify that no binding would change. Fires no hooks.
    pub fn check_no_changes(&mut self) -> Result<()> {
        self.run(Pass::Check)
    }

    fn run(&mut self, pass: Pass) -> Result<()> {
        let view = self.view.as_mut().ok_or(RenderError::Destroyed)?;
        refresh_view(view, pass, &mut host_program(self.def.clone()))
    }

    /// Serialized content of the host element.
    pub fn html(&self) -> String {
        inner_html(&self.host)
    }

    /// The host element (`<my-app>`).
    pub fn host(&self) -> &NodeRef {
        &self.host
    }

    pub fn document(&self) -> &Rc<Document> {
        &self.doc
    }

    pub fn instance(&self) -> &DirectiveRef {
        &self.instance
    }

    /// Mutate the root component between passes.
    pub fn with_instance<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        self.instance.with_mut(f)
    }

    pub fn is_destroyed(&self) -> bool {
        self.view.is_none()
    }

    /// Destroy the tree: `on_destroy` hooks, pipe teardown, cleanups.
    pub fn destroy(mut self) -> Result<()> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<()> {
        match self.view.take() {
            Some(mut view) => destroy_view(&mut view),
            None => Ok(()),
        }
    }
}

impl Drop for ComponentHandle {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            log::warn!("error while destroying {}: {err}", self.def.name());
        }
    }
}

// =============================================================================
// Render Functions
// =============================================================================

/// Render `def` as a root component into a fresh document.
pub fn render_component(def: &Rc<DirectiveDef>) -> Result<ComponentHandle> {
    render_component_in(Document::new(), def)
}

/// Render `def` as a root component into `doc` and run the first pass.
pub fn render_component_in(doc: Rc<Document>, def: &Rc<DirectiveDef>) -> Result<ComponentHandle> {
    if !def.is_component() {
        return Err(RenderError::MissingTemplate(def.name().to_string()));
    }
    let mut view = View::new(doc.clone(), format!("{}Host", def.name()), Host::Detached);
    refresh_view(&mut view, Pass::Update, &mut host_program(def.clone()))?;

    let host = view.node(0)?;
    let instance = view.directive(1)?.instance.clone();
    log::debug!("mounted {}", def.name());

    let mut handle = ComponentHandle {
        view: Some(view),
        def: def.clone(),
        doc,
        host,
        instance,
    };
    if dev_mode() {
        handle.check_no_changes()?;
    }
    Ok(handle)
}

/// Run a pass over `handle`'s tree.
pub fn detect_changes(handle: &mut ComponentHandle) -> Result<()> {
    handle.detect_changes()
}

/// Host view program: the host element with the root component on it.
fn host_program(def: Rc<DirectiveDef>) -> impl FnMut(&mut ViewCtx<'_>) -> Result<()> {
    move |rt: &mut ViewCtx<'_>| {
        if rt.creation_mode() {
            rt.element_start(0, ElementDecl::component(&def))?;
            rt.element_end()?;
        }
        rt.host_bindings(1, 0)?;
        rt.refresh(1, 0)
    }
}
