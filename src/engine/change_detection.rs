//! Change detection passes.
//!
//! A pass over a view runs its program, then walks the directives the
//! program refreshed:
//!
//! ```text
//! program (init hooks fire at each `refresh`)
//!   -> content hooks      (refresh order)
//!   -> component views    (refresh order, recursive)
//!   -> view hooks         (refresh order)
//! ```
//!
//! A check pass runs the same walk with hooks suppressed and every binding
//! required to be unchanged.
//!
//! A creation pass that fails is rolled back, so the next pass starts the
//! view over instead of tripping on half-allocated slots.

use super::deferred::flush_deferred;
use super::instructions::ViewCtx;
use super::lifecycle::{content_hooks, discard_partial_view, view_hooks};
use super::view::{Host, View};
use crate::error::{RenderError, Result};
use crate::types::ViewFlags;

/// Which kind of pass is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Normal pass: write changes and fire hooks.
    Update,
    /// Verification pass: no hooks, any binding change is an error.
    Check,
}

/// A view program bound to its context (component instance or scope).
pub(crate) type Program<'p> = dyn FnMut(&mut ViewCtx<'_>) -> Result<()> + 'p;

/// Run one pass over `view` and everything it refreshes.
pub(crate) fn refresh_view(view: &mut View, pass: Pass, program: &mut Program<'_>) -> Result<()> {
    if view.is_destroyed() {
        return Err(RenderError::Destroyed);
    }
    if pass == Pass::Check && !view.is_created() {
        return Ok(());
    }
    let first = !view.is_created();
    log::debug!(
        "{pass:?} pass over {}#{}{}",
        view.name,
        view.id,
        if first { " (creation)" } else { "" }
    );

    view.refreshed.clear();
    view.flags.set(ViewFlags::CHECKING, pass == Pass::Check);
    let outcome = {
        let mut rt = ViewCtx::new(view, pass);
        program(&mut rt).and_then(|()| rt.finish())
    };
    if let Err(err) = outcome {
        view.flags.remove(ViewFlags::CHECKING);
        if first {
            discard_partial_view(view);
        }
        return Err(err);
    }
    view.flags.insert(ViewFlags::CREATED);
    flush_deferred()?;

    let refreshed = std::mem::take(&mut view.refreshed);
    if pass == Pass::Update {
        for &dir in &refreshed {
            content_hooks(view.directive_mut(dir)?)?;
        }
    }
    for &dir in &refreshed {
        refresh_component_view(view, dir, pass)?;
    }
    if pass == Pass::Update {
        for &dir in &refreshed {
            view_hooks(view.directive_mut(dir)?)?;
        }
    }
    view.flags.remove(ViewFlags::CHECKING);
    Ok(())
}

/// Refresh the view of the component in slot `dir`, creating it on first use.
fn refresh_component_view(view: &mut View, dir: usize, pass: Pass) -> Result<()> {
    let slot = view.directive(dir)?;
    if !slot.def.is_component() {
        return Ok(());
    }
    let host = view.element(slot.host)?;
    let (host_node, content) = (host.node.clone(), host.content.clone());
    let doc = view.doc.clone();

    let slot = view.directive_mut(dir)?;
    let def = slot.def.clone();
    let instance = slot.instance.clone();
    let child = slot.component_view.get_or_insert_with(|| {
        let mut child = View::new(doc, def.name(), Host::Element(host_node));
        child.component = Some(instance.clone());
        child.content = content;
        Box::new(child)
    });
    refresh_view(child, pass, &mut |rt: &mut ViewCtx<'_>| def.render(rt, &instance))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::definition::{Directive, DirectiveDef};
    use crate::engine::ElementDecl;
    use crate::error::HookResult;
    use crate::renderer::Document;

    thread_local! {
        static EVENTS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    }

    fn record(event: &str) -> HookResult {
        EVENTS.with(|e| e.borrow_mut().push(event.to_string()));
        Ok(())
    }

    struct Leaf;
    impl Directive for Leaf {
        fn on_init(&mut self) -> HookResult {
            record("init")
        }
        fn do_check(&mut self) -> HookResult {
            record("check")
        }
        fn after_content_init(&mut self) -> HookResult {
            record("content init")
        }
        fn after_content_checked(&mut self) -> HookResult {
            record("content check")
        }
        fn after_view_init(&mut self) -> HookResult {
            record("view init")
        }
        fn after_view_checked(&mut self) -> HookResult {
            record("view check")
        }
    }

    fn leaf_def() -> Rc<DirectiveDef> {
        DirectiveDef::component::<Leaf>("leaf")
            .factory(|_| Leaf)
            .template(|rt, _: &mut Leaf| {
                if rt.creation_mode() {
                    rt.text(0, Some("leaf"))?;
                }
                Ok(())
            })
            .build()
            .unwrap()
    }

    fn run(view: &mut View, pass: Pass, def: &Rc<DirectiveDef>) -> Result<()> {
        let def = def.clone();
        refresh_view(view, pass, &mut |rt: &mut ViewCtx<'_>| {
            if rt.creation_mode() {
                rt.element_start(0, ElementDecl::component(&def))?;
                rt.element_end()?;
            }
            rt.refresh(1, 0)
        })
    }

    #[test]
    fn test_hook_order_and_check_pass() {
        EVENTS.with(|e| e.borrow_mut().clear());
        let def = leaf_def();
        let doc = Document::new();
        let mut view = View::new(doc, "host", Host::Detached);

        run(&mut view, Pass::Update, &def).unwrap();
        run(&mut view, Pass::Update, &def).unwrap();
        run(&mut view, Pass::Check, &def).unwrap();

        let events = EVENTS.with(|e| e.borrow().clone());
        assert_eq!(
            events,
            vec![
                "init",
                "check",
                "content init",
                "content check",
                "view init",
                "view check",
                "check",
                "content check",
                "view check",
            ]
        );
    }

    #[test]
    fn test_destroyed_view_refuses_passes() {
        let def = leaf_def();
        let doc = Document::new();
        let mut view = View::new(doc, "host", Host::Detached);
        run(&mut view, Pass::Update, &def).unwrap();
        super::super::lifecycle::destroy_view(&mut view).unwrap();
        assert!(matches!(
            run(&mut view, Pass::Update, &def),
            Err(RenderError::Destroyed)
        ));
    }

    #[test]
    fn test_failed_creation_is_retried() {
        let doc = Document::new();
        let host = doc.create_element("my-app");
        let mut view = View::new(doc, "flaky", Host::Element(host.clone()));
        let fail = std::cell::Cell::new(true);
        let mut program = |rt: &mut ViewCtx<'_>| -> Result<()> {
            if rt.creation_mode() {
                rt.element_start(0, ElementDecl::new("p"))?;
                rt.text(1, Some("hi"))?;
                rt.element_end()?;
                if fail.get() {
                    return Err(RenderError::expression("not ready"));
                }
            }
            Ok(())
        };

        let err = refresh_view(&mut view, Pass::Update, &mut program).unwrap_err();
        assert!(matches!(err, RenderError::Expression(_)));
        assert!(!view.is_created());
        assert_eq!(crate::renderer::inner_html(&host), "");

        // Same error again rather than a slot-order complaint.
        let err = refresh_view(&mut view, Pass::Update, &mut program).unwrap_err();
        assert!(matches!(err, RenderError::Expression(_)));

        fail.set(false);
        refresh_view(&mut view, Pass::Update, &mut program).unwrap();
        assert!(view.is_created());
        assert_eq!(crate::renderer::inner_html(&host), "<p>hi</p>");
    }

    #[test]
    fn test_check_skips_uncreated_views() {
        let def = leaf_def();
        let doc = Document::new();
        let mut view = View::new(doc, "host", Host::Detached);
        run(&mut view, Pass::Check, &def).unwrap();
        assert!(!view.is_created());
    }
}
