//! Definition Registry - Directive and pipe lookup.
//!
//! Views normally receive their directive and pipe definitions explicitly.
//! The registry is the optional alternative:
//! - Directives: matched against an element's tag and attributes
//!   (`ElementDecl::resolve`)
//! - Pipes: looked up by name (`ViewCtx::pipe_named`)
//!
//! Registration order is preserved, so matching is deterministic.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::definition::{DirectiveDef, PipeDef, TypeTag};

// =============================================================================
// Registry State
// =============================================================================

thread_local! {
    /// Directive definitions by type, in registration order.
    static DIRECTIVES: RefCell<IndexMap<TypeTag, Rc<DirectiveDef>>> = RefCell::new(IndexMap::new());

    /// Pipe definitions by name.
    static PIPES: RefCell<IndexMap<String, Rc<PipeDef>>> = RefCell::new(IndexMap::new());
}

// =============================================================================
// Registration
// =============================================================================

/// Register a directive or component. Re-registering a type replaces its
/// definition in place.
pub fn register_directive(def: Rc<DirectiveDef>) {
    log::debug!("registering directive {} ({})", def.name(), def.selector());
    DIRECTIVES.with(|map| {
        map.borrow_mut().insert(def.type_tag(), def);
    });
}

/// Register a pipe under its name, replacing any pipe of the same name.
pub fn register_pipe(def: Rc<PipeDef>) {
    PIPES.with(|map| {
        if let Some(previous) = map.borrow_mut().insert(def.name().to_string(), def) {
            log::warn!("pipe `{}` registered twice; the later definition wins", previous.name());
        }
    });
}

// =============================================================================
// Lookups
// =============================================================================

/// Every registered definition whose selector matches, components first.
pub fn directives_for(tag: &str, attrs: &[(String, String)]) -> Vec<Rc<DirectiveDef>> {
    let mut matched: Vec<Rc<DirectiveDef>> = DIRECTIVES.with(|map| {
        map.borrow()
            .values()
            .filter(|def| def.matches(tag, attrs))
            .cloned()
            .collect()
    });
    matched.sort_by_key(|def| !def.is_component());
    matched
}

/// Look a pipe up by name.
pub fn pipe(name: &str) -> Option<Rc<PipeDef>> {
    PIPES.with(|map| map.borrow().get(name).cloned())
}

/// Number of registered directives.
pub fn directive_count() -> usize {
    DIRECTIVES.with(|map| map.borrow().len())
}

// =============================================================================
// Reset (for testing)
// =============================================================================

/// Forget every registered definition (for testing).
pub fn reset_registry() {
    DIRECTIVES.with(|map| map.borrow_mut().clear());
    PIPES.with(|map| map.borrow_mut().clear());
}
