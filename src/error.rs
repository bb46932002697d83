//! Error types for the view engine.
//!
//! Two families:
//! - [`SelectorError`] - malformed selector text, raised while a definition is built
//! - [`RenderError`] - everything that can go wrong while a view program runs

use std::fmt;

use thiserror::Error;

/// Boxed error produced by user code (hooks, expressions, pipe transforms).
pub type BoxError = Box<dyn std::error::Error + 'static>;

/// Engine result type.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Result type returned by lifecycle hooks and listeners.
pub type HookResult = std::result::Result<(), BoxError>;

// =============================================================================
// Selector Errors
// =============================================================================

/// A selector string that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unexpected character {ch:?} at offset {offset} in {selector:?}")]
    UnexpectedChar {
        selector: String,
        ch: char,
        offset: usize,
    },

    #[error("unterminated attribute selector in {0:?}")]
    UnterminatedAttribute(String),

    #[error("unterminated :not() in {0:?}")]
    UnterminatedNot(String),

    #[error("empty selector group in {0:?}")]
    EmptyGroup(String),
}

// =============================================================================
// Lifecycle Hook Names
// =============================================================================

/// Identifies a lifecycle hook in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    OnChanges,
    OnInit,
    DoCheck,
    AfterContentInit,
    AfterContentChecked,
    AfterViewInit,
    AfterViewChecked,
    OnDestroy,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Hook::OnChanges => "on_changes",
            Hook::OnInit => "on_init",
            Hook::DoCheck => "do_check",
            Hook::AfterContentInit => "after_content_init",
            Hook::AfterContentChecked => "after_content_checked",
            Hook::AfterViewInit => "after_view_init",
            Hook::AfterViewChecked => "after_view_checked",
            Hook::OnDestroy => "on_destroy",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Render Errors
// =============================================================================

/// Errors raised while creating, refreshing or destroying views.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("slot {got} declared out of order (next free slot is {expected})")]
    SlotOrder { expected: usize, got: usize },

    #[error("`{0}` is only valid during the creation pass")]
    NotInCreationMode(&'static str),

    #[error("slot {0} is out of range")]
    SlotOutOfRange(usize),

    #[error("slot {index} does not hold {expected}")]
    SlotType { index: usize, expected: &'static str },

    #[error("`{0}` has no factory")]
    MissingFactory(String),

    #[error("no pipe named `{0}` is registered")]
    UnknownPipe(String),

    #[error("component `{0}` has no template")]
    MissingTemplate(String),

    #[error("element end without matching element start")]
    UnbalancedElementEnd,

    #[error("{0} element(s) left open at the end of the creation pass")]
    UnclosedElements(usize),

    #[error("flat {kind} list has odd length {len}")]
    MalformedPairs { kind: &'static str, len: usize },

    #[error("no directive on slot {element} is exported as `{name}`")]
    UnknownExport { element: usize, name: String },

    #[error("directive in slot {directive} is not hosted by slot {element}")]
    HostMismatch { directive: usize, element: usize },

    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error("binding count mismatch: creation allocated {allocated}, update used {used}")]
    BindingCount { allocated: usize, used: usize },

    #[error("expression changed after it was checked: binding {index} was {previous:?}, now {current:?}")]
    ExpressionChanged {
        index: usize,
        previous: String,
        current: String,
    },

    #[error("{directive}: {hook} failed: {source}")]
    Hook {
        directive: String,
        hook: Hook,
        source: BoxError,
    },

    #[error("listener for `{event}` failed: {source}")]
    Listener { event: String, source: BoxError },

    #[error("pipe `{pipe}` failed: {source}")]
    Pipe { pipe: String, source: BoxError },

    #[error("expression failed: {0}")]
    Expression(BoxError),

    #[error("`{0}` is already borrowed")]
    Reentrant(String),

    #[error("instance is a `{actual}`, not a `{expected}`")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("container refresh already in progress for slot {0}")]
    NestedContainerRefresh(usize),

    #[error("container refresh end without a matching start")]
    NoContainerRefresh,

    #[error("container refresh for slot {0} was never ended")]
    UnclosedContainerRefresh(usize),

    #[error("projection bucket {bucket} out of range ({len} buckets)")]
    BucketOutOfRange { bucket: usize, len: usize },

    #[error("embedded view index {index} out of range ({len} views)")]
    ViewIndexOutOfRange { index: usize, len: usize },

    #[error("view has been destroyed")]
    Destroyed,

    #[error("view has no component context to deliver `{0}` to")]
    NoContext(String),
}

impl RenderError {
    /// Wrap a failure raised by a binding expression.
    pub fn expression(err: impl Into<BoxError>) -> Self {
        RenderError::Expression(err.into())
    }

    pub(crate) fn hook(directive: &str, hook: Hook, source: BoxError) -> Self {
        RenderError::Hook {
            directive: directive.to_string(),
            hook,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_error_message() {
        let err = RenderError::hook("LifecycleComp", Hook::AfterViewInit, "boom".into());
        assert_eq!(err.to_string(), "LifecycleComp: after_view_init failed: boom");
    }

    #[test]
    fn test_selector_error_converts() {
        let err: RenderError = SelectorError::Empty.into();
        assert!(matches!(err, RenderError::Selector(SelectorError::Empty)));
        assert_eq!(err.to_string(), "empty selector");
    }
}
