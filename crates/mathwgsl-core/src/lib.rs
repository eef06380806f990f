//! # mathwgsl-core
//!
//! Expression trees for the mathwgsl shader compiler.
//!
//! Formulas arrive from an external computer-algebra engine as
//! [MathJSON](https://cortexjs.io/math-json/): numbers, symbol strings and
//! `[head, arg1, arg2, ...]` arrays. This crate decodes that into a small,
//! closed [`Expr`] tree that backends (see `mathwgsl-wgsl`) pattern-match
//! exhaustively. Nothing about function names is hardcoded here; whether
//! `"Sin"` or `"Equal"` means anything is up to the backend and the caller's
//! bindings.
//!
//! ## Node shapes
//!
//! | MathJSON input            | [`Expr`] variant        |
//! |---------------------------|-------------------------|
//! | `3.5`, `{"num": "3.5"}`   | [`Expr::Literal`]       |
//! | `"x"`, `{"sym": "x"}`     | [`Expr::Identifier`]    |
//! | `["Add", "x", 1]`         | [`Expr::Application`]   |
//! | anything else             | [`Expr::Foreign`]       |
//!
//! Decoding never fails on a well-formed JSON value: shapes the compiler
//! cannot use are kept as [`Expr::Foreign`] so the failure surfaces at compile
//! time with a typed error instead of disappearing during decoding.
//!
//! ## Example
//!
//! ```
//! use mathwgsl_core::Expr;
//!
//! let expr = Expr::parse(r#"["Add", ["Multiply", 2, "x"], "y"]"#).unwrap();
//! match &expr {
//!     Expr::Application(name, args) => {
//!         assert_eq!(name, "Add");
//!         assert_eq!(args.len(), 2);
//!         assert_eq!(args[1], Expr::ident("y"));
//!     }
//!     _ => panic!("expected an application"),
//! }
//! assert!(expr.identifiers().contains("x"));
//! ```

use std::collections::BTreeSet;

use serde_json::Value;
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Error decoding MathJSON text.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The input is not valid JSON.
    #[error("invalid MathJSON: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Expression tree
// ============================================================================

/// A node of a symbolic expression tree.
///
/// The tree is owned and therefore finite and acyclic. Arity is not stored:
/// `Application("Sqrt", ..)` carries whatever children the source had, and the
/// backend decides whether that count is acceptable.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric constant.
    Literal(f64),
    /// Bare symbol: a free variable or a zero-argument constant like `Pi`.
    Identifier(String),
    /// Canonical operation name plus its ordered operands.
    Application(String, Vec<Expr>),
    /// A node the decoder could not classify, with a short description of
    /// what it was (e.g. `string 'hello'`). Backends reject it.
    Foreign(String),
}

impl Expr {
    /// Numeric literal node.
    pub fn lit(n: f64) -> Self {
        Expr::Literal(n)
    }

    /// Identifier node.
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Identifier(name.into())
    }

    /// Application node.
    pub fn apply(name: impl Into<String>, args: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Application(name.into(), args.into_iter().collect())
    }

    /// The canonical zero-literal tree.
    ///
    /// Used as the inert stand-in when a formula cannot be parsed or compiled,
    /// so the view still shows something (a flat plane or an empty surface).
    pub fn zero() -> Self {
        Expr::Literal(0.0)
    }

    /// Parses MathJSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Json`] if `input` is not valid JSON. Valid JSON
    /// always decodes; see [`Expr::from_json`].
    ///
    /// ```
    /// use mathwgsl_core::{Expr, ParseError};
    ///
    /// assert_eq!(Expr::parse("2").unwrap(), Expr::lit(2.0));
    /// assert!(matches!(Expr::parse("[\"Add\", 1"), Err(ParseError::Json(_))));
    /// ```
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_str(input)?;
        Ok(Self::from_json(&value))
    }

    /// Decodes a MathJSON value.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Number(n) => match n.as_f64() {
                Some(v) => Expr::Literal(v),
                None => Expr::Foreign(format!("number {n}")),
            },
            Value::String(s) => decode_symbol(s),
            Value::Array(items) => decode_function(items),
            Value::Object(map) => {
                if let Some(num) = map.get("num") {
                    match num {
                        Value::String(s) => match parse_number(s) {
                            Some(v) => Expr::Literal(v),
                            None => Expr::Foreign(format!("number '{s}'")),
                        },
                        Value::Number(_) => Self::from_json(num),
                        _ => Expr::Foreign("malformed number object".to_string()),
                    }
                } else if let Some(sym) = map.get("sym") {
                    match sym {
                        Value::String(s) => decode_symbol(s),
                        _ => Expr::Foreign("malformed symbol object".to_string()),
                    }
                } else if let Some(func) = map.get("fn") {
                    match func {
                        Value::Array(items) => decode_function(items),
                        _ => Expr::Foreign("malformed function object".to_string()),
                    }
                } else if map.contains_key("str") {
                    Expr::Foreign("string".to_string())
                } else if map.contains_key("dict") {
                    Expr::Foreign("dictionary".to_string())
                } else {
                    Expr::Foreign("object".to_string())
                }
            }
            Value::Bool(b) => Expr::Foreign(format!("boolean {b}")),
            Value::Null => Expr::Foreign("null".to_string()),
        }
    }

    /// Encodes the tree back into canonical MathJSON.
    ///
    /// Non-finite literals use the `{"num": ...}` object form since plain
    /// JSON numbers cannot represent them. [`Expr::Foreign`] nodes have lost
    /// their original shape and encode as MathJSON `["Error", "'...'"]`.
    pub fn to_json(&self) -> Value {
        match self {
            Expr::Literal(n) => {
                if n.is_nan() {
                    serde_json::json!({ "num": "NaN" })
                } else if n.is_infinite() {
                    let s = if *n > 0.0 { "+Infinity" } else { "-Infinity" };
                    serde_json::json!({ "num": s })
                } else if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    Value::from(*n as i64)
                } else {
                    Value::from(*n)
                }
            }
            Expr::Identifier(name) => Value::String(name.clone()),
            Expr::Application(name, args) => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().map(Expr::to_json));
                Value::Array(items)
            }
            Expr::Foreign(desc) => {
                serde_json::json!(["Error", format!("'{desc}'")])
            }
        }
    }
}

fn decode_symbol(s: &str) -> Expr {
    if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
        Expr::Foreign(format!("string {s}"))
    } else {
        Expr::Identifier(s.to_string())
    }
}

fn decode_function(items: &[Value]) -> Expr {
    match items.split_first() {
        None => Expr::Foreign("empty list".to_string()),
        Some((Value::String(head), args)) => {
            Expr::Application(head.clone(), args.iter().map(Expr::from_json).collect())
        }
        Some(_) => Expr::Foreign("application with a computed head".to_string()),
    }
}

/// Parses the string payload of a `{"num": ...}` object.
fn parse_number(s: &str) -> Option<f64> {
    match s {
        "NaN" => Some(f64::NAN),
        "Infinity" | "+Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        // Arbitrary-precision literals may carry a trailing `n`.
        _ => s.trim_end_matches('n').parse().ok(),
    }
}

// ============================================================================
// Display (compact MathJSON)
// ============================================================================

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

// ============================================================================
// Introspection
// ============================================================================

impl Expr {
    /// Returns every identifier referenced in the tree.
    ///
    /// Useful for deciding which bindings a formula needs before compiling it.
    ///
    /// ```
    /// use mathwgsl_core::Expr;
    ///
    /// let expr = Expr::parse(r#"["Add", ["Sin", "x"], ["Multiply", "y", "t"]]"#).unwrap();
    /// let ids = expr.identifiers();
    /// assert_eq!(ids.into_iter().collect::<Vec<_>>(), ["t", "x", "y"]);
    /// ```
    pub fn identifiers(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.walk(&mut |e| {
            if let Expr::Identifier(name) = e {
                out.insert(name.as_str());
            }
        });
        out
    }

    /// Returns every application name used in the tree.
    pub fn applications(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.walk(&mut |e| {
            if let Expr::Application(name, _) = e {
                out.insert(name.as_str());
            }
        });
        out
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        match self {
            Expr::Application(_, args) => 1 + args.iter().map(Expr::depth).max().unwrap_or(0),
            _ => 1,
        }
    }

    fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        if let Expr::Application(_, args) = self {
            for arg in args {
                arg.walk(visit);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Expr {
        Expr::parse(input).unwrap()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse("42"), Expr::lit(42.0));
        assert_eq!(parse("-1.5"), Expr::lit(-1.5));
        assert_eq!(parse(r#"{"num": "0.25"}"#), Expr::lit(0.25));
        assert_eq!(parse(r#"{"num": "12n"}"#), Expr::lit(12.0));
        assert_eq!(parse(r#"{"num": "-Infinity"}"#), Expr::lit(f64::NEG_INFINITY));
        assert!(matches!(parse(r#"{"num": "NaN"}"#), Expr::Literal(n) if n.is_nan()));
    }

    #[test]
    fn test_symbols() {
        assert_eq!(parse(r#""x""#), Expr::ident("x"));
        assert_eq!(parse(r#"{"sym": "Pi"}"#), Expr::ident("Pi"));
    }

    #[test]
    fn test_functions() {
        assert_eq!(
            parse(r#"["Sqrt", ["Add", "x", 1]]"#),
            Expr::apply("Sqrt", [Expr::apply("Add", [Expr::ident("x"), Expr::lit(1.0)])])
        );
        assert_eq!(
            parse(r#"{"fn": ["Negate", "y"]}"#),
            Expr::apply("Negate", [Expr::ident("y")])
        );
        assert_eq!(parse(r#"["Pi"]"#), Expr::apply("Pi", []));
    }

    #[test]
    fn test_foreign() {
        assert!(matches!(parse("null"), Expr::Foreign(_)));
        assert!(matches!(parse("true"), Expr::Foreign(_)));
        assert!(matches!(parse("[]"), Expr::Foreign(_)));
        assert!(matches!(parse(r#""'hello'""#), Expr::Foreign(_)));
        assert!(matches!(parse(r#"[["Derivative", "f"], "x"]"#), Expr::Foreign(_)));
        assert!(matches!(parse(r#"{"str": "hi"}"#), Expr::Foreign(_)));
        assert!(matches!(parse(r#"{"dict": {}}"#), Expr::Foreign(_)));
        assert!(matches!(parse(r#"{"num": "abc"}"#), Expr::Foreign(_)));
    }

    #[test]
    fn test_foreign_nested_in_application() {
        let expr = parse(r#"["Add", "x", null]"#);
        match expr {
            Expr::Application(_, args) => assert!(matches!(args[1], Expr::Foreign(_))),
            _ => panic!("expected application"),
        }
    }

    #[test]
    fn test_invalid_json() {
        assert!(Expr::parse("").is_err());
        assert!(Expr::parse("[\"Add\",").is_err());
    }

    #[test]
    fn test_display() {
        let expr = parse(r#"["Add", "x", 2, 0.5]"#);
        assert_eq!(expr.to_string(), r#"["Add","x",2,0.5]"#);
        assert_eq!(Expr::lit(f64::INFINITY).to_string(), r#"{"num":"+Infinity"}"#);
    }

    #[test]
    fn test_json_roundtrip() {
        let src = r#"["Equal", ["Power", "x", 2], ["Multiply", -3, ["Sin", "t"]]]"#;
        let expr = parse(src);
        assert_eq!(Expr::from_json(&expr.to_json()), expr);
    }

    #[test]
    fn test_introspection() {
        let expr = parse(r#"["Add", ["Sin", "x"], ["Cos", ["Multiply", "x", "y"]]]"#);
        assert_eq!(expr.identifiers().len(), 2);
        assert!(expr.applications().contains("Cos"));
        assert_eq!(expr.applications().len(), 4);
        assert_eq!(expr.depth(), 4);
        assert_eq!(Expr::zero().depth(), 1);
    }
}

// ============================================================================
// Property-based tests (proptest)
// ============================================================================
