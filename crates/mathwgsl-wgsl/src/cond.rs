//! WGSL helpers for comparisons.
//!
//! Formulas only carry scalars, so a relation such as `x < y` evaluates to
//! `1.0` (true) or `0.0` (false) via WGSL's `select`.

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// Less than (`<`).
    Lt,
    /// Less than or equal (`<=`).
    Le,
    /// Greater than (`>`).
    Gt,
    /// Greater than or equal (`>=`).
    Ge,
    /// Equal (`==`).
    Eq,
    /// Not equal (`!=`).
    Ne,
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Le => write!(f, "<="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Ge => write!(f, ">="),
            CompareOp::Eq => write!(f, "=="),
            CompareOp::Ne => write!(f, "!="),
        }
    }
}

/// Emits a boolean comparison: `(a < b)`.
pub fn emit_compare(op: CompareOp, left: &str, right: &str) -> String {
    format!("({left} {op} {right})")
}

/// Converts a WGSL `bool` into `1.0` / `0.0`.
pub fn bool_to_scalar(cond: &str) -> String {
    format!("select(0.0, 1.0, {cond})")
}
