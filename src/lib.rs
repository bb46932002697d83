//! # spark-view
//!
//! Incremental view-rendering runtime for instruction-based component
//! templates.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for
//! reactive settings and query change notification.
//!
//! ## Architecture
//!
//! A template is compiled ahead of time into a view program: a closure that
//! drives a [`ViewCtx`]. The program runs once in creation mode to build the
//! view's slot array and DOM nodes, and again on every change detection pass
//! to compare bindings against their last values and patch only what changed.
//!
//! ```text
//! DirectiveDef ─▶ render_component ─▶ View (slots + bindings) ─▶ Document
//!                        │                      │
//!                 detect_changes          component views,
//!                                         containers, projection
//! ```
//!
//! ## Modules
//!
//! - [`types`] - `Value`, change records, view/hook flags
//! - [`definition`] - component, directive and pipe definitions
//! - [`selector`] - CSS selectors for directive matching and projection
//! - [`engine`] - slot arrays, instructions, change detection
//! - [`renderer`] - the in-memory document and HTML serialization
//! - [`pipeline`] - root mounting and runtime settings

pub mod definition;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod renderer;
pub mod selector;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use definition::{
    on_changes_feature, Directive, DirectiveDef, DirectiveDefBuilder, DirectiveRef, EventEmitter,
    Feature, NodeInjector, Pipe, PipeDef, PipeDefBuilder, TypeTag,
};

pub use engine::{
    directive_count, directives_for, interpolation1, interpolation2, interpolation3,
    interpolation4, interpolation5, interpolation6, interpolation7, interpolation8,
    interpolation_v, register_directive, register_pipe, reset_registry, Cardinality, ElementDecl,
    Pass, QueryList, QueryPredicate, QuerySpec, Scope, TemplateRef, ViewContainerRef, ViewCtx,
};

pub use error::{BoxError, HookResult, RenderError, Result, SelectorError};

pub use pipeline::{
    detect_changes, dev_mode, dev_mode_signal, load_from_env, render_component,
    render_component_in, set_dev_mode, ComponentHandle,
};

pub use renderer::{inner_html, to_html, Document, DomStats, NodeRef};

pub use selector::CssSelector;
