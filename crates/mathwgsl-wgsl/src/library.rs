//! Built-in operator and function table.
//!
//! Maps MathJSON canonical heads (`Add`, `Sqrt`, `Arctan2`, ...) to WGSL
//! emission rules. The core arithmetic set also answers to lowercase aliases
//! (`add`, `sqrt`, ...). Supporting a new function means adding a row to
//! [`BUILTINS`]; nothing here is configurable at runtime. Callers that need a
//! different meaning for a name use a binding override instead.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::cond::CompareOp;
use crate::template::Piece::{self, Slot, Text};

// ============================================================================
// Rules
// ============================================================================

/// How many operands a rule accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// Exactly this many.
    Exact(usize),
    /// This many or more.
    AtLeast(usize),
    /// Anywhere from the first count to the second, inclusive.
    Between(usize, usize),
}

impl Arity {
    /// Whether `n` operands satisfy this arity.
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exact(k) => n == k,
            Arity::AtLeast(k) => n >= k,
            Arity::Between(lo, hi) => lo <= n && n <= hi,
        }
    }

    /// Smallest accepted operand count.
    pub fn min(self) -> usize {
        match self {
            Arity::Exact(k) | Arity::AtLeast(k) | Arity::Between(k, _) => k,
        }
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arity::Exact(k) => write!(f, "exactly {k}"),
            Arity::AtLeast(k) => write!(f, "at least {k}"),
            Arity::Between(lo, hi) => write!(f, "{lo} to {hi}"),
        }
    }
}

/// Binding strength of emitted WGSL, lowest first.
///
/// Used to decide where an operand needs parentheses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Precedence {
    /// `a + b`, `a - b`
    Additive,
    /// `a * b`, `a / b`
    Multiplicative,
    /// `-a`
    Unary,
    /// Literals, identifiers, calls, parenthesized text.
    Atom,
}

/// How a rule turns compiled operands into WGSL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emit {
    /// Left-associative infix chain: `a + b + c`.
    Infix(&'static str, Precedence),
    /// Prefix operator on a single operand: `-a`.
    Prefix(&'static str),
    /// Builtin call with all operands: `atan2(a, b)`.
    Call(&'static str),
    /// Binary builtin folded over a variadic list: `max(max(a, b), c)`.
    Fold(&'static str),
    /// Fixed text with operand slots. Operands that are not atoms arrive
    /// parenthesized, and the rendered text is treated as an atom.
    Template(&'static [Piece<&'static str>]),
    /// One template per accepted operand count, starting at the minimum.
    Overloaded(&'static [&'static [Piece<&'static str>]]),
    /// Relation, emitted as `select(0.0, 1.0, (a op b))`.
    Compare(CompareOp),
}

/// Emission rule for one library entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub arity: Arity,
    pub emit: Emit,
}

/// A library row: every name that maps to one rule.
#[derive(Debug, Clone, Copy)]
pub struct Builtin {
    pub names: &'static [&'static str],
    pub rule: Rule,
}

const fn exact(n: usize, emit: Emit) -> Rule {
    Rule {
        arity: Arity::Exact(n),
        emit,
    }
}

const fn between(lo: usize, hi: usize, emit: Emit) -> Rule {
    Rule {
        arity: Arity::Between(lo, hi),
        emit,
    }
}

const fn at_least(n: usize, emit: Emit) -> Rule {
    Rule {
        arity: Arity::AtLeast(n),
        emit,
    }
}

macro_rules! builtin {
    ([$($name:literal),+], $rule:expr) => {
        Builtin {
            names: &[$($name),+],
            rule: $rule,
        }
    };
}

// ============================================================================
// Table
// ============================================================================

/// Every built-in rule.
pub const BUILTINS: &[Builtin] = &[
    // Arithmetic
    builtin!(["Add", "add"], at_least(2, Emit::Infix("+", Precedence::Additive))),
    builtin!(["Subtract", "subtract"], exact(2, Emit::Infix("-", Precedence::Additive))),
    builtin!(["Multiply", "multiply"], at_least(2, Emit::Infix("*", Precedence::Multiplicative))),
    builtin!(["Divide", "divide"], exact(2, Emit::Infix("/", Precedence::Multiplicative))),
    builtin!(["Rational"], exact(2, Emit::Infix("/", Precedence::Multiplicative))),
    builtin!(["Negate", "negate"], exact(1, Emit::Prefix("-"))),
    builtin!(["Delimiter"], exact(1, Emit::Template(&[Slot(0)]))),
    // Powers and roots
    builtin!(["Power", "power", "pow"], exact(2, Emit::Call("pow"))),
    builtin!(["Square"], exact(1, Emit::Template(&[Text("("), Slot(0), Text(" * "), Slot(0), Text(")")]))),
    builtin!(["Sqrt", "sqrt"], exact(1, Emit::Call("sqrt"))),
    builtin!(["Root"], exact(2, Emit::Template(&[Text("pow("), Slot(0), Text(", 1.0 / "), Slot(1), Text(")")]))),
    // Exp/log
    builtin!(["Exp", "exp"], exact(1, Emit::Call("exp"))),
    builtin!(["Ln", "ln"], exact(1, Emit::Call("log"))),
    // `["Log", x]` is base 10, `["Log", x, b]` is base `b`.
    builtin!(["Log"], between(1, 2, Emit::Overloaded(&[
        &[Text("(log("), Slot(0), Text(") / log(10.0))")],
        &[Text("(log("), Slot(0), Text(") / log("), Slot(1), Text("))")],
    ]))),
    builtin!(["Lg", "log10"], exact(1, Emit::Template(&[Text("(log("), Slot(0), Text(") / log(10.0))")]))),
    builtin!(["Lb", "log2"], exact(1, Emit::Call("log2"))),
    // Trig
    builtin!(["Sin", "sin"], exact(1, Emit::Call("sin"))),
    builtin!(["Cos", "cos"], exact(1, Emit::Call("cos"))),
    builtin!(["Tan", "tan"], exact(1, Emit::Call("tan"))),
    builtin!(["Sec"], exact(1, Emit::Template(&[Text("(1.0 / cos("), Slot(0), Text("))")]))),
    builtin!(["Csc"], exact(1, Emit::Template(&[Text("(1.0 / sin("), Slot(0), Text("))")]))),
    builtin!(["Cot"], exact(1, Emit::Template(&[Text("(1.0 / tan("), Slot(0), Text("))")]))),
    builtin!(["Arcsin", "asin"], exact(1, Emit::Call("asin"))),
    builtin!(["Arccos", "acos"], exact(1, Emit::Call("acos"))),
    builtin!(["Arctan", "atan"], exact(1, Emit::Call("atan"))),
    builtin!(["Arctan2", "atan2"], exact(2, Emit::Call("atan2"))),
    builtin!(["Sinh"], exact(1, Emit::Call("sinh"))),
    builtin!(["Cosh"], exact(1, Emit::Call("cosh"))),
    builtin!(["Tanh"], exact(1, Emit::Call("tanh"))),
    builtin!(["Arsinh"], exact(1, Emit::Call("asinh"))),
    builtin!(["Arcosh"], exact(1, Emit::Call("acosh"))),
    builtin!(["Artanh"], exact(1, Emit::Call("atanh"))),
    // Common math
    builtin!(["Abs", "abs"], exact(1, Emit::Call("abs"))),
    builtin!(["Sign"], exact(1, Emit::Call("sign"))),
    builtin!(["Floor"], exact(1, Emit::Call("floor"))),
    builtin!(["Ceil", "Ceiling"], exact(1, Emit::Call("ceil"))),
    builtin!(["Round"], exact(1, Emit::Call("round"))),
    builtin!(["Truncate"], exact(1, Emit::Call("trunc"))),
    builtin!(["FractionalPart"], exact(1, Emit::Call("fract"))),
    // Floored modulo, matching the CAS rather than WGSL's truncating `%`.
    builtin!(["Mod"], exact(2, Emit::Template(&[Text("("), Slot(0), Text(" - "), Slot(1), Text(" * floor("), Slot(0), Text(" / "), Slot(1), Text("))")]))),
    builtin!(["Min"], at_least(2, Emit::Fold("min"))),
    builtin!(["Max"], at_least(2, Emit::Fold("max"))),
    builtin!(["Clamp"], exact(3, Emit::Call("clamp"))),
    // Relations
    builtin!(["Equal"], exact(2, Emit::Compare(CompareOp::Eq))),
    builtin!(["NotEqual"], exact(2, Emit::Compare(CompareOp::Ne))),
    builtin!(["Less"], exact(2, Emit::Compare(CompareOp::Lt))),
    builtin!(["LessEqual"], exact(2, Emit::Compare(CompareOp::Le))),
    builtin!(["Greater"], exact(2, Emit::Compare(CompareOp::Gt))),
    builtin!(["GreaterEqual"], exact(2, Emit::Compare(CompareOp::Ge))),
];

fn index() -> &'static HashMap<&'static str, Rule> {
    static INDEX: OnceLock<HashMap<&'static str, Rule>> = OnceLock::new();
    INDEX.get_or_init(|| {
        let map: HashMap<_, _> = BUILTINS
            .iter()
            .flat_map(|b| b.names.iter().map(move |&name| (name, b.rule)))
            .collect();
        log::debug!("indexed {} builtin names", map.len());
        map
    })
}

/// Looks up the emission rule for an application name.
pub fn lookup(name: &str) -> Option<Rule> {
    index().get(name).copied()
}

/// Iterates over every name the library answers to.
pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().flat_map(|b| b.names.iter().copied())
}
