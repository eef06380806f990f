//! Degrade-to-zero policy for callers that must always have something to draw.
//!
//! The compiler reports every failure precisely. A live view, however, should
//! show an inert default (a flat plane, an empty isosurface) instead of a
//! blank error state while the user is still typing. These helpers substitute
//! the canonical zero tree after a failure and keep the original error for
//! display.

use log::warn;
use mathwgsl_core::Expr;

use crate::compile::{compile, Fragment};
use crate::{Bindings, CompileError};

/// Result of [`compile_or_zero`].
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    /// The compiled formula, or the zero fragment after a failure.
    pub fragment: Fragment,
    /// Why the formula was replaced, if it was.
    pub error: Option<CompileError>,
}

impl Compiled {
    /// Whether the zero expression was substituted.
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

/// Compiles `expr`, substituting [`Expr::zero`] if that fails.
///
/// ```
/// use mathwgsl_core::Expr;
/// use mathwgsl_wgsl::{compile_or_zero, Bindings, CompileError};
///
/// let out = compile_or_zero(&Expr::ident("w"), &Bindings::new());
/// assert_eq!(out.fragment.as_str(), "0.0");
/// assert_eq!(out.error, Some(CompileError::UnresolvedIdentifier("w".into())));
/// ```
pub fn compile_or_zero(expr: &Expr, bindings: &Bindings) -> Compiled {
    match compile(expr, bindings) {
        Ok(fragment) => Compiled {
            fragment,
            error: None,
        },
        Err(err) => {
            warn!("{err}; drawing the zero expression instead");
            let fragment =
                compile(&Expr::zero(), bindings).unwrap_or_else(|_| Fragment::new("0.0"));
            Compiled {
                fragment,
                error: Some(err),
            }
        }
    }
}

/// Parses MathJSON text, substituting [`Expr::zero`] if it is malformed.
pub fn parse_or_zero(input: &str) -> Expr {
    Expr::parse(input).unwrap_or_else(|err| {
        warn!("{err}; using the zero expression instead");
        Expr::zero()
    })
}
