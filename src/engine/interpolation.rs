//! String interpolation: `prefix{{v0}}i0{{v1}}...suffix`.
//!
//! Values stringify with [`Value::stringify`], so `null` and `undefined`
//! render as nothing. The result is a plain string value; the binding that
//! consumes it decides whether the DOM needs a write.

use crate::error::{RenderError, Result};
use crate::types::Value;

macro_rules! interpolation {
    ($(#[$meta:meta])* $name:ident($v0:ident $(, $sep:ident, $v:ident)*)) => {
        $(#[$meta])*
        pub fn $name(
            prefix: &str,
            $v0: impl Into<Value>,
            $($sep: &str, $v: impl Into<Value>,)*
            suffix: &str,
        ) -> Value {
            let mut out = String::from(prefix);
            out.push_str(&$v0.into().stringify());
            $(
                out.push_str($sep);
                out.push_str(&$v.into().stringify());
            )*
            out.push_str(suffix);
            Value::from(out)
        }
    };
}

interpolation!(
    /// `{{v0}}` between a prefix and a suffix.
    interpolation1(v0)
);
interpolation!(interpolation2(v0, i0, v1));
interpolation!(interpolation3(v0, i0, v1, i1, v2));
interpolation!(interpolation4(v0, i0, v1, i1, v2, i2, v3));
interpolation!(interpolation5(v0, i0, v1, i1, v2, i2, v3, i3, v4));
interpolation!(interpolation6(v0, i0, v1, i1, v2, i2, v3, i3, v4, i4, v5));
interpolation!(interpolation7(v0, i0, v1, i1, v2, i2, v3, i3, v4, i4, v5, i5, v6));
interpolation!(
    /// The largest fixed form; use [`interpolation_v`] beyond eight values.
    interpolation8(v0, i0, v1, i1, v2, i2, v3, i3, v4, i4, v5, i5, v6, i6, v7)
);

/// Variadic form over `[prefix, v0, i0, v1, ..., suffix]`.
///
/// Even positions are static text, odd positions are values, so the list
/// must have odd length.
pub fn interpolation_v(parts: &[Value]) -> Result<Value> {
    if parts.len() % 2 == 0 {
        return Err(RenderError::MalformedPairs {
            kind: "interpolation",
            len: parts.len(),
        });
    }
    let out: String = parts.iter().map(Value::stringify).collect();
    Ok(Value::from(out))
}
