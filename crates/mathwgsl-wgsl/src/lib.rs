//! # mathwgsl-wgsl
//!
//! Compiles MathJSON expression trees into WGSL.
//!
//! The compiler is a pure function of an [`Expr`](mathwgsl_core::Expr) and a
//! [`Bindings`] table:
//!
//! - identifiers resolve only through the table's **vars**, spliced verbatim
//! - application names resolve through the table's **overrides** first, then
//!   the built-in [`library`] of operators and functions
//! - children compile left to right and fill their parent's template
//!
//! Every failure is a typed [`CompileError`]; nothing panics and no partial
//! output escapes. Callers that must always draw something use
//! [`compile_or_zero`], which substitutes the zero tree after a failure.
//!
//! ## Example
//!
//! ```
//! use mathwgsl_core::Expr;
//! use mathwgsl_wgsl::{compile, function_module, Linkage, PlotMode};
//!
//! // x^2 + y^2 + z^2 = 1, drawn as an isosurface
//! let expr = Expr::parse(
//!     r#"["Equal", ["Add", ["Square", "x"], ["Square", "y"], ["Square", "z"]], 1]"#,
//! ).unwrap();
//!
//! let mode = PlotMode::Implicit;
//! let body = compile(&expr, &mode.bindings()).unwrap();
//! assert_eq!(
//!     body.as_str(),
//!     "(((pos.x * pos.x) + (pos.y * pos.y) + (pos.z * pos.z)) - 1.0)",
//! );
//!
//! let module = function_module(&body, mode.domain(), Linkage::Linked);
//! assert!(module.contains("@export fn f(pos: vec3<f32>) -> f32"));
//! ```
//!
//! ## Modules
//!
//! | Module        | Contents |
//! |---------------|----------|
//! | [`library`]   | Built-in emission rules (`Add`, `Sqrt`, `Arctan2`, ...) |
//! | [`bindings`]  | [`Bindings`] tables and [`PlotMode`] presets |
//! | [`template`]  | [`Template`] operand-slot templates for overrides |
//! | [`module`]    | Function, gradient and sampler assembly |
//! | [`fallback`]  | Degrade-to-zero helpers |

use thiserror::Error;

pub mod bindings;
pub mod compile;
pub mod cond;
pub mod fallback;
pub mod library;
pub mod module;
pub mod template;

pub use bindings::{Bindings, PlotMode};
pub use compile::{compile, Fragment, MAX_DEPTH};
pub use cond::CompareOp;
pub use fallback::{compile_or_zero, parse_or_zero, Compiled};
pub use library::{lookup, Arity, Emit, Precedence, Rule};
pub use module::{function_module, sampler_module, Domain, Gradient, GradientMode, Linkage, Sample};
pub use template::{Template, TemplateError};

// ============================================================================
// Errors
// ============================================================================

/// Why an expression could not be compiled.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// An identifier has no binding.
    #[error("unresolved identifier '{0}'")]
    UnresolvedIdentifier(String),

    /// An application name is neither overridden nor built in.
    #[error("unknown function '{0}'")]
    UnknownApplication(String),

    /// A node has the wrong number of children for its rule.
    #[error("'{name}' takes {expected} operand(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: Arity,
        got: usize,
    },

    /// A node that is not a literal, identifier or application.
    #[error("unrecognized node: {0}")]
    UnrecognizedNode(String),

    /// A literal with no finite `f32` representation.
    #[error("literal {0} cannot be represented as f32")]
    NonFiniteLiteral(f64),

    /// The tree is nested deeper than [`MAX_DEPTH`].
    #[error("expression nested deeper than {0} levels")]
    TooDeep(usize),
}
