//! Lifecycle hook dispatch and view teardown.
//!
//! Hook state lives in each directive slot's [`HookState`] flags, so an
//! "init" hook fires once per instance and its "checked" sibling every pass.

use super::view::{DirectiveSlot, Slot, View};
use crate::error::{Hook, RenderError, Result};
use crate::types::{HookState, ViewFlags};

// =============================================================================
// Hooks
// =============================================================================

/// `on_changes` (when recorded), `on_init` (first time), `do_check`.
pub(crate) fn init_hooks(slot: &mut DirectiveSlot) -> Result<()> {
    let name = slot.def.name();
    let mut instance = slot.instance.borrow_dyn()?;

    if slot.def.tracks_changes() && !slot.changes.is_empty() {
        let changes = std::mem::take(&mut slot.changes);
        instance
            .on_changes(&changes)
            .map_err(|e| RenderError::hook(name, Hook::OnChanges, e))?;
    }
    if !slot.state.contains(HookState::INIT) {
        instance
            .on_init()
            .map_err(|e| RenderError::hook(name, Hook::OnInit, e))?;
        slot.state.insert(HookState::INIT);
    }
    instance
        .do_check()
        .map_err(|e| RenderError::hook(name, Hook::DoCheck, e))
}

/// `after_content_init` (first time), then `after_content_checked`.
pub(crate) fn content_hooks(slot: &mut DirectiveSlot) -> Result<()> {
    let name = slot.def.name();
    let mut instance = slot.instance.borrow_dyn()?;
    if !slot.state.contains(HookState::CONTENT_INIT) {
        instance
            .after_content_init()
            .map_err(|e| RenderError::hook(name, Hook::AfterContentInit, e))?;
        slot.state.insert(HookState::CONTENT_INIT);
    }
    instance
        .after_content_checked()
        .map_err(|e| RenderError::hook(name, Hook::AfterContentChecked, e))
}

/// `after_view_init` (first time), then `after_view_checked`.
pub(crate) fn view_hooks(slot: &mut DirectiveSlot) -> Result<()> {
    let name = slot.def.name();
    let mut instance = slot.instance.borrow_dyn()?;
    if !slot.state.contains(HookState::VIEW_INIT) {
        instance
            .after_view_init()
            .map_err(|e| RenderError::hook(name, Hook::AfterViewInit, e))?;
        slot.state.insert(HookState::VIEW_INIT);
    }
    instance
        .after_view_checked()
        .map_err(|e| RenderError::hook(name, Hook::AfterViewChecked, e))
}

// =============================================================================
// Teardown
// =============================================================================

/// Tear a view down: child views and `on_destroy` hooks in slot order,
/// pipe teardown, cleanups, query entries, then its DOM nodes.
///
/// Every step runs even when an earlier one fails; the first failure is
/// returned.
pub(crate) fn destroy_view(view: &mut View) -> Result<()> {
    if view.is_destroyed() {
        return Ok(());
    }
    let result = teardown(view, false);
    view.flags.insert(ViewFlags::DESTROYED);
    log::debug!("view {}#{} destroyed", view.name, view.id);
    result
}

/// Undo a creation pass that failed partway so the next pass starts over.
///
/// Only instances that already received `on_init` get `on_destroy`.
/// Teardown errors are logged; the caller reports the original failure.
pub(crate) fn discard_partial_view(view: &mut View) {
    if let Err(err) = teardown(view, true) {
        log::warn!("error while discarding {}#{}: {err}", view.name, view.id);
    }
    view.slots.clear();
    view.bindings.clear();
    view.roots.clear();
    view.refreshed.clear();
    log::debug!("view {}#{} reset after a failed creation pass", view.name, view.id);
}

fn teardown(view: &mut View, partial: bool) -> Result<()> {
    let mut first_error: Option<RenderError> = None;
    let mut note = |result: Result<()>| {
        if let Err(err) = result {
            log::warn!("error while destroying a view: {err}");
            first_error.get_or_insert(err);
        }
    };

    for slot in view.slots.iter_mut() {
        match slot {
            Slot::Directive(dir) => {
                if let Some(child) = dir.component_view.as_mut() {
                    note(destroy_view(child));
                }
                if partial && !dir.state.contains(HookState::INIT) {
                    continue;
                }
                let name = dir.def.name();
                note(dir.instance.borrow_dyn().and_then(|mut instance| {
                    instance
                        .on_destroy()
                        .map_err(|e| RenderError::hook(name, Hook::OnDestroy, e))
                }));
            }
            Slot::Container(c) => match c.container.try_borrow_mut() {
                Ok(mut container) => {
                    let views = std::mem::take(&mut container.views);
                    drop(container);
                    for mut embedded in views {
                        note(destroy_view(&mut embedded.view));
                    }
                }
                Err(_) => note(Err(RenderError::Reentrant("view container".to_string()))),
            },
            Slot::Pipe(pipe) => {
                let result = pipe.instance.on_destroy().map_err(|source| RenderError::Pipe {
                    pipe: pipe.def.name().to_string(),
                    source,
                });
                note(result);
            }
            _ => {}
        }
    }

    for cleanup in view.cleanup.drain(..) {
        cleanup();
    }
    for query in &view.queries {
        query.remove_view(view.id);
    }
    for inherited in &view.content_queries {
        inherited.list.remove_view(view.id);
    }
    for node in view.root_nodes() {
        view.doc.remove(&node);
    }

    first_error.map_or(Ok(()), Err)
}
