//! Pipe instructions.
//!
//! `pipe` instantiates a pipe into a slot during creation. `pipe_bindN`
//! feeds it a value plus N - 1 arguments; pure pipes are memoized on the
//! identity of those inputs, impure pipes transform on every pass.
//!
//! ```ignore
//! // {{ name | myPipe:size | myPurePipe:size }}
//! let inner = rt.pipe_bind2(2, &ctx.name, ctx.size)?;
//! let outer = rt.pipe_bind2(1, inner, ctx.size)?;
//! rt.text_binding(0, interpolation1("", outer, ""))?;
//! ```

use std::rc::Rc;

use super::instructions::ViewCtx;
use super::registry;
use super::view::{PipeSlot, Slot};
use crate::definition::PipeDef;
use crate::error::{RenderError, Result};
use crate::types::Value;

impl ViewCtx<'_> {
    /// Instantiate `def` into slot `index`.
    pub fn pipe(&mut self, index: usize, def: &Rc<PipeDef>) -> Result<()> {
        self.expect_next(index, "pipe")?;
        let factory = def
            .factory
            .as_ref()
            .ok_or_else(|| RenderError::MissingFactory(def.name().to_string()))?;
        let instance = factory();
        log::trace!("slot {index}: pipe `{}`", def.name());
        self.view.slots.push(Slot::Pipe(PipeSlot {
            def: def.clone(),
            instance,
        }));
        Ok(())
    }

    /// Instantiate the registered pipe called `name` into slot `index`.
    pub fn pipe_named(&mut self, index: usize, name: &str) -> Result<()> {
        let def = registry::pipe(name).ok_or_else(|| RenderError::UnknownPipe(name.to_string()))?;
        self.pipe(index, &def)
    }

    pub fn pipe_bind1(&mut self, index: usize, value: impl Into<Value>) -> Result<Value> {
        self.pipe_bind_v(index, &[value.into()])
    }

    pub fn pipe_bind2(
        &mut self,
        index: usize,
        value: impl Into<Value>,
        arg0: impl Into<Value>,
    ) -> Result<Value> {
        self.pipe_bind_v(index, &[value.into(), arg0.into()])
    }

    pub fn pipe_bind3(
        &mut self,
        index: usize,
        value: impl Into<Value>,
        arg0: impl Into<Value>,
        arg1: impl Into<Value>,
    ) -> Result<Value> {
        self.pipe_bind_v(index, &[value.into(), arg0.into(), arg1.into()])
    }

    pub fn pipe_bind4(
        &mut self,
        index: usize,
        value: impl Into<Value>,
        arg0: impl Into<Value>,
        arg1: impl Into<Value>,
        arg2: impl Into<Value>,
    ) -> Result<Value> {
        self.pipe_bind_v(index, &[value.into(), arg0.into(), arg1.into(), arg2.into()])
    }

    /// `[value, arg0, arg1, ...]` in one list.
    pub fn pipe_bind_v(&mut self, index: usize, inputs: &[Value]) -> Result<Value> {
        if inputs.is_empty() {
            return Err(RenderError::MalformedPairs {
                kind: "pipe input",
                len: 0,
            });
        }
        if self.pipe_slot(index)?.def.is_pure() {
            return self.memoize(inputs, |rt| rt.transform(index, inputs));
        }
        // Impure pipes still own their cells so addressing stays stable.
        for _ in 0..=inputs.len() {
            self.next_binding()?;
        }
        self.transform(index, inputs)
    }

    fn pipe_slot(&mut self, index: usize) -> Result<&mut PipeSlot> {
        match self.view.slot_mut(index)? {
            Slot::Pipe(pipe) => Ok(pipe),
            _ => Err(RenderError::SlotType {
                index,
                expected: "a pipe",
            }),
        }
    }

    fn transform(&mut self, index: usize, inputs: &[Value]) -> Result<Value> {
        let slot = self.pipe_slot(index)?;
        let Some((value, args)) = inputs.split_first() else {
            return Err(RenderError::MalformedPairs {
                kind: "pipe input",
                len: 0,
            });
        };
        slot.instance
            .transform(value, args)
            .map_err(|source| RenderError::Pipe {
                pipe: slot.def.name().to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::definition::Pipe;
    use crate::engine::change_detection::Pass;
    use crate::engine::view::{Host, View};
    use crate::error::BoxError;
    use crate::renderer::Document;
    use crate::types::ViewFlags;

    thread_local! {
        static CALLS: Cell<u32> = const { Cell::new(0) };
    }

    struct Repeat;
    impl Pipe for Repeat {
        fn transform(&mut self, value: &Value, args: &[Value]) -> std::result::Result<Value, BoxError> {
            CALLS.with(|c| c.set(c.get() + 1));
            let times = args.first().and_then(Value::as_f64).unwrap_or(1.0) as usize;
            Ok(Value::from(value.stringify().repeat(times)))
        }
    }

    struct Failing;
    impl Pipe for Failing {
        fn transform(&mut self, _: &Value, _: &[Value]) -> std::result::Result<Value, BoxError> {
            Err("nope".into())
        }
    }

    fn run(view: &mut View, size: u32, def: &Rc<PipeDef>) -> Result<Value> {
        let mut rt = ViewCtx::new(view, Pass::Update);
        if rt.creation_mode() {
            rt.pipe(0, def)?;
        }
        let value = rt.pipe_bind2(0, "ab", size)?;
        rt.finish()?;
        view.flags.insert(ViewFlags::CREATED);
        Ok(value)
    }

    #[test]
    fn test_pure_and_impure_pipes() {
        let pure = PipeDef::new::<Repeat>("repeat").factory(|| Repeat).build();
        let impure = PipeDef::new::<Repeat>("repeat").factory(|| Repeat).pure(false).build();

        for (def, expected_calls) in [(pure, 2), (impure, 3)] {
            CALLS.with(|c| c.set(0));
            let mut view = View::new(Document::new(), "v", Host::Detached);
            assert_eq!(run(&mut view, 2, &def).unwrap(), Value::from("abab"));
            assert_eq!(run(&mut view, 2, &def).unwrap(), Value::from("abab"));
            assert_eq!(run(&mut view, 3, &def).unwrap(), Value::from("ababab"));
            assert_eq!(CALLS.with(Cell::get), expected_calls);
            assert_eq!(view.bindings.len(), 3);
        }
    }

    #[test]
    fn test_transform_errors_name_the_pipe() {
        let def = PipeDef::new::<Failing>("failing").factory(|| Failing).build();
        let mut view = View::new(Document::new(), "v", Host::Detached);
        let err = run(&mut view, 1, &def).unwrap_err();
        assert!(matches!(err, RenderError::Pipe { ref pipe, .. } if pipe == "failing"));
    }

    #[test]
    fn test_missing_factory() {
        let def = PipeDef::new::<Failing>("failing").build();
        let mut view = View::new(Document::new(), "v", Host::Detached);
        assert!(matches!(
            run(&mut view, 1, &def),
            Err(RenderError::MissingFactory(_))
        ));
    }
}
