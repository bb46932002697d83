//! Pure functions: memoized literal builders.
//!
//! `[a, b]` or `{k: v}` in a template would produce a fresh identity on every
//! pass and always look changed. A pure function keeps its arguments and its
//! last result in binding cells (N + 1 of them) and recomputes only when an
//! argument changes by identity.
//!
//! ```ignore
//! // <my-comp [names]="['Nancy', customName]">
//! let names = rt.pure_function1(|v| Value::array([Value::from("Nancy"), v.clone()]), &ctx.custom_name)?;
//! rt.property(0, "names", names)?;
//! ```

use super::instructions::ViewCtx;
use crate::error::Result;
use crate::types::Value;

impl ViewCtx<'_> {
    /// Return the cached result when every argument is unchanged, otherwise
    /// recompute and store. Consumes `args.len() + 1` binding cells.
    pub(crate) fn memoize(
        &mut self,
        args: &[Value],
        compute: impl FnOnce(&mut Self) -> Result<Value>,
    ) -> Result<Value> {
        let mut cells = Vec::with_capacity(args.len());
        let mut changed = false;
        for arg in args {
            let cell = self.next_binding()?;
            changed |= !self.binding(cell).is_some_and(|previous| previous.same(arg));
            cells.push(cell);
        }
        let result_cell = self.next_binding()?;

        if !changed {
            if let Some(cached) = self.binding(result_cell) {
                return Ok(cached.clone());
            }
        }

        let value = compute(self)?;
        // A check pass must not disturb the memory it verifies; the fresh
        // value then fails the binding that consumes it.
        if self.checking() {
            return Ok(value);
        }
        for (cell, arg) in cells.into_iter().zip(args) {
            self.view.bindings[cell] = Some(arg.clone());
        }
        self.view.bindings[result_cell] = Some(value.clone());
        Ok(value)
    }

    /// A constant computed once.
    pub fn pure_function0(&mut self, f: impl FnOnce() -> Value) -> Result<Value> {
        self.memoize(&[], |_| Ok(f()))
    }

    /// Any number of arguments.
    pub fn pure_function_v(
        &mut self,
        f: impl FnOnce(&[Value]) -> Value,
        args: &[Value],
    ) -> Result<Value> {
        self.memoize(args, |_| Ok(f(args)))
    }
}

macro_rules! pure_functions {
    ($($name:ident($($arg:ident),+);)*) => {
        impl ViewCtx<'_> {
            $(
                pub fn $name(
                    &mut self,
                    f: impl FnOnce($(pure_functions!(@ref $arg)),+) -> Value,
                    $($arg: impl Into<Value>),+
                ) -> Result<Value> {
                    $(let $arg: Value = $arg.into();)+
                    let args = [$($arg.clone()),+];
                    self.memoize(&args, |_| Ok(f($(&$arg),+)))
                }
            )*
        }
    };
    (@ref $arg:ident) => { &Value };
}

pure_functions! {
    pure_function1(a);
    pure_function2(a, b);
    pure_function3(a, b, c);
    pure_function4(a, b, c, d);
    pure_function5(a, b, c, d, e);
    pure_function6(a, b, c, d, e, g);
    pure_function7(a, b, c, d, e, g, h);
    pure_function8(a, b, c, d, e, g, h, i);
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::engine::change_detection::Pass;
    use crate::engine::view::{Host, View};
    use crate::renderer::Document;
    use crate::types::ViewFlags;

    fn pass(view: &mut View, mode: Pass, program: impl FnOnce(&mut ViewCtx<'_>) -> Result<Value>) -> Result<Value> {
        let mut rt = ViewCtx::new(view, mode);
        let value = program(&mut rt)?;
        rt.finish()?;
        view.flags.insert(ViewFlags::CREATED);
        Ok(value)
    }

    fn literal(rt: &mut ViewCtx<'_>, name: &str, calls: &Cell<u32>) -> Result<Value> {
        rt.pure_function1(
            |v| {
                calls.set(calls.get() + 1);
                Value::array([Value::from("Nancy"), v.clone()])
            },
            name,
        )
    }

    #[test]
    fn test_reuses_result_until_argument_changes() {
        let doc = Document::new();
        let mut view = View::new(doc, "v", Host::Detached);
        let calls = Cell::new(0);

        let first = pass(&mut view, Pass::Update, |rt| literal(rt, "Bess", &calls)).unwrap();
        let second = pass(&mut view, Pass::Update, |rt| literal(rt, "Bess", &calls)).unwrap();
        assert!(first.same(&second));
        assert_eq!(calls.get(), 1);
        assert_eq!(view.bindings.len(), 2);

        let third = pass(&mut view, Pass::Update, |rt| literal(rt, "George", &calls)).unwrap();
        assert!(!third.same(&second));
        assert_eq!(third.at(1), Value::from("George"));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_nested_literals_recompute_from_the_leaf() {
        let doc = Document::new();
        let mut view = View::new(doc, "v", Host::Detached);
        let build = |rt: &mut ViewCtx<'_>, duration: f64| -> Result<Value> {
            let leaf = rt.pure_function1(
                |v| Value::object([("opacity", Value::from(1)), ("duration", v.clone())]),
                duration,
            )?;
            let actions = rt.pure_function1(|v| Value::array([Value::Null, v.clone()]), leaf)?;
            rt.pure_function2(
                |a, b| Value::object([("animation", a.clone()), ("actions", b.clone())]),
                "slide",
                actions,
            )
        };

        let a = pass(&mut view, Pass::Update, |rt| build(rt, 100.0)).unwrap();
        let b = pass(&mut view, Pass::Update, |rt| build(rt, 100.0)).unwrap();
        assert!(a.same(&b));

        let c = pass(&mut view, Pass::Update, |rt| build(rt, 200.0)).unwrap();
        assert!(!c.same(&b));
        assert_eq!(c.get("actions").at(1).get("duration"), Value::from(200));
    }

    #[test]
    fn test_variadic_form() {
        let doc = Document::new();
        let mut view = View::new(doc, "v", Host::Detached);
        let args: Vec<Value> = "abcdefghi".chars().map(|c| Value::from(c.to_string())).collect();
        let value = pass(&mut view, Pass::Update, |rt| {
            rt.pure_function_v(
                |v| {
                    let mut parts = vec![Value::from("start-")];
                    parts.extend_from_slice(&v[..5]);
                    parts.push(Value::from("-middle-"));
                    parts.extend_from_slice(&v[5..]);
                    parts.push(Value::from("-end"));
                    Value::array(parts)
                },
                &args,
            )
        })
        .unwrap();
        assert_eq!(value.len(), 12);
        assert_eq!(value.stringify().replace(',', ""), "start-abcde-middle-fghi-end");
        assert_eq!(view.bindings.len(), 10);
    }

    #[test]
    fn test_check_pass_leaves_memory_untouched() {
        let doc = Document::new();
        let mut view = View::new(doc, "v", Host::Detached);
        let calls = Cell::new(0);
        let original = pass(&mut view, Pass::Update, |rt| literal(rt, "Bess", &calls)).unwrap();
        let fresh = pass(&mut view, Pass::Check, |rt| literal(rt, "Ned", &calls)).unwrap();
        assert!(!fresh.same(&original));
        let again = pass(&mut view, Pass::Update, |rt| literal(rt, "Bess", &calls)).unwrap();
        assert!(again.same(&original));
    }
}
