//! View Engine - Slot arrays, instructions and change detection.
//!
//! The engine executes view programs:
//! - View: slot array + binding memory, one per component instance or
//!   embedded template instantiation
//! - Instructions: the `ViewCtx` vocabulary programs are written in
//! - Change detection: update/check passes and lifecycle hook ordering
//! - Containers, projection, queries, pipes, pure functions
//! - Registry: optional directive/pipe lookup
//!
//! # Architecture
//!
//! Views are NOT trees of objects. They are flat slot arrays addressed by
//! declaration order:
//!
//! ```text
//! <div class="my-app">Hello <b>World</b>!</div>
//!
//! slot 0: Element <div>      bindings: []
//! slot 1: Text "Hello "
//! slot 2: Element <b>
//! slot 3: Text "World"
//! slot 4: Text "!"
//! ```
//!
//! The creation pass appends slots; every later pass addresses the same
//! indices and only consumes binding cells.

mod change_detection;
mod container;
mod deferred;
mod instructions;
mod interpolation;
mod lifecycle;
mod pipe;
mod projection;
mod pure_function;
mod query;
mod registry;
mod view;

pub(crate) use change_detection::refresh_view;
pub(crate) use lifecycle::destroy_view;
pub(crate) use view::{Host, View};

pub use change_detection::Pass;
pub use container::{Scope, TemplateRef, ViewContainerRef};
pub use instructions::{ElementDecl, ViewCtx};
pub use interpolation::*;
pub use query::{Cardinality, QueryList, QueryPredicate, QuerySpec};
pub use registry::*;
