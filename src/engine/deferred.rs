//! Output deliveries addressed to a busy component.
//!
//! A child's init hooks run at `refresh`, inside its parent's template,
//! while the parent instance is mutably borrowed. An output the child emits
//! there cannot reach the parent yet, so it waits here until the template
//! holding the parent returns.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::definition::DirectiveRef;
use crate::error::{HookResult, RenderError, Result};

pub(crate) type Delivery = Box<dyn FnOnce() -> HookResult>;

struct Pending {
    target: DirectiveRef,
    event: String,
    deliver: Delivery,
}

thread_local! {
    static PENDING: RefCell<VecDeque<Pending>> = const { RefCell::new(VecDeque::new()) };
}

/// Queue a delivery until `target` is free.
pub(crate) fn defer(target: DirectiveRef, event: &str, deliver: Delivery) {
    log::trace!("deferring `{event}` to busy {target:?}");
    PENDING.with(|queue| {
        queue.borrow_mut().push_back(Pending {
            target,
            event: event.to_string(),
            deliver,
        })
    });
}

/// Deliver queued events whose target is free again, in arrival order.
/// Events for still-busy targets stay queued.
pub(crate) fn flush_deferred() -> Result<()> {
    let mut waiting = VecDeque::new();
    let result = loop {
        let Some(next) = PENDING.with(|queue| queue.borrow_mut().pop_front()) else {
            break Ok(());
        };
        if next.target.is_busy() {
            waiting.push_back(next);
            continue;
        }
        if let Err(source) = (next.deliver)() {
            break Err(RenderError::Listener {
                event: next.event,
                source,
            });
        }
    };

    PENDING.with(|queue| {
        let mut queue = queue.borrow_mut();
        while let Some(pending) = waiting.pop_back() {
            queue.push_front(pending);
        }
    });
    result
}

#[cfg(test)]
pub(crate) fn pending_count() -> usize {
    PENDING.with(|queue| queue.borrow().len())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::definition::Directive;

    struct Sink;
    impl Directive for Sink {}

    #[test]
    fn test_waits_while_target_is_borrowed() {
        let target = DirectiveRef::new(Sink);
        let delivered = Rc::new(Cell::new(0));

        let guard = target.borrow_dyn().unwrap();
        let count = delivered.clone();
        defer(
            target.clone(),
            "ready",
            Box::new(move || {
                count.set(count.get() + 1);
                Ok(())
            }),
        );
        flush_deferred().unwrap();
        assert_eq!(delivered.get(), 0);
        assert_eq!(pending_count(), 1);

        drop(guard);
        flush_deferred().unwrap();
        assert_eq!(delivered.get(), 1);
        assert_eq!(pending_count(), 0);
    }

    #[test]
    fn test_failed_delivery_reports_event() {
        let target = DirectiveRef::new(Sink);
        defer(target, "ready", Box::new(|| Err("nope".into())));
        let err = flush_deferred().unwrap_err();
        assert!(matches!(&err, RenderError::Listener { event, .. } if event == "ready"));
        assert_eq!(pending_count(), 0);
    }
}
