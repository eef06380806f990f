//! The expression-to-WGSL compiler.

use log::trace;
use mathwgsl_core::Expr;
use num_traits::Float;

use crate::bindings::Bindings;
use crate::cond;
use crate::library::{self, Emit, Precedence};
use crate::template;
use crate::CompileError;

/// Trees nested deeper than this are rejected instead of risking the stack.
pub const MAX_DEPTH: usize = 256;

// ============================================================================
// Output
// ============================================================================

/// A compiled WGSL expression.
///
/// Pure (no side effects), typed `f32`, ready to sit after `return`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fragment {
    code: String,
}

impl Fragment {
    pub(crate) fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }

    /// The WGSL text.
    pub fn as_str(&self) -> &str {
        &self.code
    }

    pub fn into_string(self) -> String {
        self.code
    }
}

impl std::fmt::Display for Fragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.code)
    }
}

impl AsRef<str> for Fragment {
    fn as_ref(&self) -> &str {
        &self.code
    }
}

/// Emitted text plus how tightly it binds.
struct Emitted {
    code: String,
    prec: Precedence,
}

impl Emitted {
    fn atom(code: String) -> Self {
        Self {
            code,
            prec: Precedence::Atom,
        }
    }

    /// Text safe to splice where only an atom may go.
    fn grouped(self) -> String {
        if self.prec < Precedence::Atom {
            format!("({})", self.code)
        } else {
            self.code
        }
    }
}

// ============================================================================
// Code generation
// ============================================================================

/// Compiles an expression tree to a WGSL fragment.
///
/// Identifiers resolve only through `bindings`. An application name resolves
/// through a binding override first and the built-in library second, so a
/// caller can give even structural names like `Equal` a different meaning.
///
/// # Errors
///
/// - [`CompileError::UnresolvedIdentifier`] if an identifier has no binding
/// - [`CompileError::UnknownApplication`] if a name is neither overridden nor built in
/// - [`CompileError::ArityMismatch`] if a node has the wrong number of children
/// - [`CompileError::UnrecognizedNode`] for [`Expr::Foreign`] nodes
/// - [`CompileError::NonFiniteLiteral`] for literals outside the `f32` range
/// - [`CompileError::TooDeep`] past [`MAX_DEPTH`] levels of nesting
///
/// ```
/// use mathwgsl_core::Expr;
/// use mathwgsl_wgsl::{compile, Bindings};
///
/// let bindings = Bindings::new().var("x", "pos.x").var("y", "pos.y");
/// let expr = Expr::parse(r#"["Add", "x", "y"]"#).unwrap();
/// assert_eq!(compile(&expr, &bindings).unwrap().as_str(), "pos.x + pos.y");
/// ```
pub fn compile(expr: &Expr, bindings: &Bindings) -> Result<Fragment, CompileError> {
    let out = emit(expr, bindings, 1)?;
    trace!("compiled {expr} -> {}", out.code);
    Ok(Fragment::new(out.code))
}

fn emit(expr: &Expr, bindings: &Bindings, depth: usize) -> Result<Emitted, CompileError> {
    if depth > MAX_DEPTH {
        return Err(CompileError::TooDeep(MAX_DEPTH));
    }
    match expr {
        Expr::Literal(n) => emit_literal(*n),
        Expr::Identifier(name) => bindings
            .lookup_var(name)
            .map(|text| Emitted::atom(text.to_string()))
            .ok_or_else(|| CompileError::UnresolvedIdentifier(name.clone())),
        Expr::Application(name, args) => emit_application(name, args, bindings, depth),
        Expr::Foreign(desc) => Err(CompileError::UnrecognizedNode(desc.clone())),
    }
}

fn emit_literal(n: f64) -> Result<Emitted, CompileError> {
    let v = n as f32;
    if !v.is_finite() {
        return Err(CompileError::NonFiniteLiteral(n));
    }
    let prec = if v.is_sign_negative() {
        Precedence::Unary
    } else {
        Precedence::Atom
    };
    Ok(Emitted {
        code: format_float(v),
        prec,
    })
}

fn emit_application(
    name: &str,
    args: &[Expr],
    bindings: &Bindings,
    depth: usize,
) -> Result<Emitted, CompileError> {
    if let Some(template) = bindings.lookup_override(name) {
        if template.arity() != args.len() {
            return Err(CompileError::ArityMismatch {
                name: name.to_string(),
                expected: library::Arity::Exact(template.arity()),
                got: args.len(),
            });
        }
        let args = emit_args(args, bindings, depth)?;
        let args: Vec<String> = args.into_iter().map(Emitted::grouped).collect();
        return Ok(Emitted::atom(template.render(&args)));
    }

    let rule =
        library::lookup(name).ok_or_else(|| CompileError::UnknownApplication(name.to_string()))?;
    if !rule.arity.accepts(args.len()) {
        return Err(CompileError::ArityMismatch {
            name: name.to_string(),
            expected: rule.arity,
            got: args.len(),
        });
    }
    let args = emit_args(args, bindings, depth)?;

    Ok(match rule.emit {
        Emit::Infix(op, prec) => {
            let mut code = String::new();
            for (i, arg) in args.into_iter().enumerate() {
                // Same-precedence operands on the right only need grouping
                // when the operator is not associative.
                let needs_parens = arg.prec < prec
                    || (i > 0 && arg.prec == prec && matches!(op, "-" | "/"));
                if i > 0 {
                    code.push_str(&format!(" {op} "));
                }
                if needs_parens {
                    code.push_str(&format!("({})", arg.code));
                } else {
                    code.push_str(&arg.code);
                }
            }
            Emitted { code, prec }
        }
        Emit::Prefix(op) => {
            let inner = args.into_iter().next().map(Emitted::grouped).unwrap_or_default();
            // Never emit `--`, which WGSL lexes as decrement.
            let code = if inner.starts_with(op) {
                format!("{op}({inner})")
            } else {
                format!("{op}{inner}")
            };
            Emitted {
                code,
                prec: Precedence::Unary,
            }
        }
        Emit::Call(func) => {
            let list: Vec<String> = args.into_iter().map(|a| a.code).collect();
            Emitted::atom(format!("{func}({})", list.join(", ")))
        }
        Emit::Fold(func) => {
            let mut iter = args.into_iter().map(|a| a.code);
            let first = iter.next().unwrap_or_default();
            Emitted::atom(iter.fold(first, |acc, next| format!("{func}({acc}, {next})")))
        }
        Emit::Template(pieces) => {
            let args: Vec<String> = args.into_iter().map(Emitted::grouped).collect();
            Emitted::atom(template::render(pieces, &args))
        }
        Emit::Overloaded(forms) => {
            let pieces = forms
                .get(args.len() - rule.arity.min())
                .copied()
                .unwrap_or_default();
            let args: Vec<String> = args.into_iter().map(Emitted::grouped).collect();
            Emitted::atom(template::render(pieces, &args))
        }
        Emit::Compare(op) => {
            let mut iter = args.into_iter().map(|a| a.code);
            let l = iter.next().unwrap_or_default();
            let r = iter.next().unwrap_or_default();
            Emitted::atom(cond::bool_to_scalar(&cond::emit_compare(op, &l, &r)))
        }
    })
}

/// Compiles operands left to right.
fn emit_args(
    args: &[Expr],
    bindings: &Bindings,
    depth: usize,
) -> Result<Vec<Emitted>, CompileError> {
    args.iter()
        .map(|arg| emit(arg, bindings, depth + 1))
        .collect()
}

/// Formats a number as a WGSL float literal (`2.0`, `0.5`).
pub(crate) fn format_float<F: Float + std::fmt::Display>(n: F) -> String {
    if n.fract() == F::zero() {
        format!("{:.1}", n)
    } else {
        format!("{}", n)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{Arity, BUILTINS};
    use crate::Template;
    use proptest::prelude::*;

    fn xy() -> Bindings {
        Bindings::new().var("x", "pos.x").var("y", "pos.y")
    }

    fn compile_json(input: &str, bindings: &Bindings) -> Result<String, CompileError> {
        let expr = Expr::parse(input).unwrap();
        compile(&expr, bindings).map(Fragment::into_string)
    }

    fn ok(input: &str) -> String {
        compile_json(input, &xy()).unwrap()
    }

    #[test]
    fn test_addition_of_bound_vars() {
        let expr = Expr::apply("add", [Expr::ident("x"), Expr::ident("y")]);
        assert_eq!(compile(&expr, &xy()).unwrap().as_str(), "pos.x + pos.y");
    }

    #[test]
    fn test_radial_distance() {
        let expr = Expr::apply(
            "sqrt",
            [Expr::apply(
                "add",
                [
                    Expr::apply("multiply", [Expr::ident("x"), Expr::ident("x")]),
                    Expr::apply("multiply", [Expr::ident("y"), Expr::ident("y")]),
                ],
            )],
        );
        assert_eq!(
            compile(&expr, &xy()).unwrap().as_str(),
            "sqrt(pos.x * pos.x + pos.y * pos.y)"
        );
    }

    #[test]
    fn test_equal_override() {
        let bindings = xy().override_with("Equal", Template::parse("({0} - {1})").unwrap());
        assert_eq!(
            compile_json(r#"["Equal", ["Sin", "x"], "y"]"#, &bindings).unwrap(),
            "(sin(pos.x) - pos.y)"
        );
        // Without the override, Equal is a relation.
        assert_eq!(
            ok(r#"["Equal", ["Sin", "x"], "y"]"#),
            "select(0.0, 1.0, (sin(pos.x) == pos.y))"
        );
    }

    #[test]
    fn test_override_groups_compound_operands() {
        let bindings = xy().override_with("Equal", Template::parse("({0} - {1})").unwrap());
        assert_eq!(
            compile_json(r#"["Equal", "x", ["Add", "y", 1]]"#, &bindings).unwrap(),
            "(pos.x - (pos.y + 1.0))"
        );
    }

    #[test]
    fn test_override_takes_precedence() {
        let bindings = xy().override_with("Sqrt", Template::parse("custom({0})").unwrap());
        assert_eq!(compile_json(r#"["Sqrt", "x"]"#, &bindings).unwrap(), "custom(pos.x)");
        assert_eq!(ok(r#"["Sqrt", "x"]"#), "sqrt(pos.x)");
    }

    #[test]
    fn test_override_arity() {
        let bindings = xy().override_with("Equal", Template::parse("({0} - {1})").unwrap());
        assert_eq!(
            compile_json(r#"["Equal", "x", "y", "x"]"#, &bindings),
            Err(CompileError::ArityMismatch {
                name: "Equal".to_string(),
                expected: Arity::Exact(2),
                got: 3,
            })
        );
    }

    #[test]
    fn test_override_for_unknown_name() {
        let bindings = xy().override_with("Hypot", Template::parse("length(vec2<f32>({0}, {1}))").unwrap());
        assert_eq!(
            compile_json(r#"["Hypot", "x", "y"]"#, &bindings).unwrap(),
            "length(vec2<f32>(pos.x, pos.y))"
        );
    }

    #[test]
    fn test_unresolved_identifier() {
        assert_eq!(
            compile_json(r#"["Add", "x", "w"]"#, &xy()),
            Err(CompileError::UnresolvedIdentifier("w".to_string()))
        );
    }

    #[test]
    fn test_unknown_application() {
        assert_eq!(
            compile_json(r#"["Zeta", "x"]"#, &xy()),
            Err(CompileError::UnknownApplication("Zeta".to_string()))
        );
    }

    #[test]
    fn test_sqrt_two_children() {
        let expr = Expr::apply("sqrt", [Expr::ident("x"), Expr::ident("y")]);
        assert_eq!(
            compile(&expr, &xy()),
            Err(CompileError::ArityMismatch {
                name: "sqrt".to_string(),
                expected: Arity::Exact(1),
                got: 2,
            })
        );
    }

    #[test]
    fn test_arity_checked_before_children() {
        // The unbound `w` would fail too; the arity error wins.
        let expr = Expr::apply("Sqrt", [Expr::ident("w"), Expr::ident("w")]);
        assert!(matches!(
            compile(&expr, &xy()),
            Err(CompileError::ArityMismatch { .. })
        ));
    }

    #[test]
    fn test_every_builtin_rejects_wrong_arity() {
        let bindings = xy();
        for builtin in BUILTINS {
            let wrong = match builtin.rule.arity {
                Arity::Exact(n) => vec![n + 1, n.saturating_sub(1)],
                Arity::AtLeast(n) => vec![n - 1],
                Arity::Between(lo, hi) => vec![hi + 1, lo.saturating_sub(1)],
            };
            for name in builtin.names {
                for count in &wrong {
                    if builtin.rule.arity.accepts(*count) {
                        continue;
                    }
                    let expr = Expr::apply(*name, vec![Expr::ident("x"); *count]);
                    assert_eq!(
                        compile(&expr, &bindings),
                        Err(CompileError::ArityMismatch {
                            name: name.to_string(),
                            expected: builtin.rule.arity,
                            got: *count,
                        }),
                        "{name} with {count} operands"
                    );
                }
            }
        }
    }

    #[test]
    fn test_foreign_node() {
        assert_eq!(
            compile_json(r#"["Add", "x", null]"#, &xy()),
            Err(CompileError::UnrecognizedNode("null".to_string()))
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(ok("0"), "0.0");
        assert_eq!(ok("42"), "42.0");
        assert_eq!(ok("0.5"), "0.5");
        assert_eq!(ok("-3"), "-3.0");
        assert_eq!(ok(r#"["Multiply", "x", -2]"#), "pos.x * -2.0");
        assert_eq!(
            compile_json(r#"{"num": "+Infinity"}"#, &xy()),
            Err(CompileError::NonFiniteLiteral(f64::INFINITY))
        );
        assert!(matches!(
            compile_json("1e300", &xy()),
            Err(CompileError::NonFiniteLiteral(_))
        ));
    }

    #[test]
    fn test_precedence() {
        assert_eq!(ok(r#"["Multiply", ["Add", "x", 1], "y"]"#), "(pos.x + 1.0) * pos.y");
        assert_eq!(ok(r#"["Add", ["Multiply", "x", 2], "y"]"#), "pos.x * 2.0 + pos.y");
        assert_eq!(ok(r#"["Subtract", "x", ["Subtract", "y", 1]]"#), "pos.x - (pos.y - 1.0)");
        assert_eq!(ok(r#"["Subtract", ["Subtract", "x", "y"], 1]"#), "pos.x - pos.y - 1.0");
        assert_eq!(ok(r#"["Divide", "x", ["Multiply", "y", 2]]"#), "pos.x / (pos.y * 2.0)");
        assert_eq!(ok(r#"["Add", "x", "y", 1, 2]"#), "pos.x + pos.y + 1.0 + 2.0");
    }

    #[test]
    fn test_negation() {
        assert_eq!(ok(r#"["Negate", "x"]"#), "-pos.x");
        assert_eq!(ok(r#"["Negate", ["Add", "x", "y"]]"#), "-(pos.x + pos.y)");
        assert_eq!(ok(r#"["Negate", ["Negate", "x"]]"#), "-(-pos.x)");
        assert_eq!(ok(r#"["Negate", -1]"#), "-(-1.0)");
        assert_eq!(ok(r#"["Multiply", ["Negate", "x"], "y"]"#), "-pos.x * pos.y");
    }

    #[test]
    fn test_functions() {
        assert_eq!(ok(r#"["Power", "x", 2]"#), "pow(pos.x, 2.0)");
        assert_eq!(ok(r#"["Square", ["Add", "x", 1]]"#), "((pos.x + 1.0) * (pos.x + 1.0))");
        assert_eq!(ok(r#"["Root", "x", 3]"#), "pow(pos.x, 1.0 / 3.0)");
        assert_eq!(ok(r#"["Log", "x"]"#), "(log(pos.x) / log(10.0))");
        assert_eq!(ok(r#"["Log", "x", 2]"#), "(log(pos.x) / log(2.0))");
        assert_eq!(
            ok(r#"["Log", ["Add", "x", 1], "y"]"#),
            "(log((pos.x + 1.0)) / log(pos.y))"
        );
        assert_eq!(
            compile_json(r#"["Log", "x", 2, 3]"#, &xy()),
            Err(CompileError::ArityMismatch {
                name: "Log".to_string(),
                expected: Arity::Between(1, 2),
                got: 3,
            })
        );
        assert_eq!(ok(r#"["Arctan2", "y", "x"]"#), "atan2(pos.y, pos.x)");
        assert_eq!(ok(r#"["Max", "x", "y", 0]"#), "max(max(pos.x, pos.y), 0.0)");
        assert_eq!(ok(r#"["Delimiter", ["Add", "x", 1]]"#), "(pos.x + 1.0)");
        assert_eq!(ok(r#"["Delimiter", "x"]"#), "pos.x");
        assert_eq!(
            ok(r#"["Mod", "x", 2]"#),
            "(pos.x - 2.0 * floor(pos.x / 2.0))"
        );
    }

    #[test]
    fn test_substitution_is_verbatim() {
        let bindings = Bindings::new().var("t", "time()").var("x", "-pos.x");
        assert_eq!(compile_json(r#""t""#, &bindings).unwrap(), "time()");
        assert_eq!(compile_json(r#"["Sin", "t"]"#, &bindings).unwrap(), "sin(time())");
        assert_eq!(compile_json(r#"["Negate", "x"]"#, &bindings).unwrap(), "-(-pos.x)");
    }

    #[test]
    fn test_namespaces_are_independent() {
        // `Sin` as a variable does not shadow `Sin` as a function.
        let bindings = xy().var("Sin", "0.5");
        assert_eq!(compile_json(r#"["Sin", "Sin"]"#, &bindings).unwrap(), "sin(0.5)");
    }

    #[test]
    fn test_too_deep() {
        let mut expr = Expr::ident("x");
        for _ in 0..MAX_DEPTH {
            expr = Expr::apply("Negate", [expr]);
        }
        assert_eq!(compile(&expr, &xy()), Err(CompileError::TooDeep(MAX_DEPTH)));
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1.0f32), "1.0");
        assert_eq!(format_float(0.1f32), "0.1");
        assert_eq!(format_float(-0.0f32), "-0.0");
        assert_eq!(format_float(2.5f64), "2.5");
    }

    /// Well-formed trees over bound identifiers and arithmetic builtins.
    fn tree_strategy() -> impl Strategy<Value = Expr> {
        let leaf = prop_oneof![
            prop::sample::select(vec!["x", "y"]).prop_map(Expr::ident),
            (-100i32..100).prop_map(|n| Expr::lit(n as f64 / 4.0)),
        ];
        leaf.prop_recursive(5, 64, 3, |inner| {
            prop_oneof![
                (prop::sample::select(vec!["Add", "Multiply", "Max"]), prop::collection::vec(inner.clone(), 2..4))
                    .prop_map(|(name, args)| Expr::apply(name, args)),
                (prop::sample::select(vec!["Subtract", "Divide", "Power", "Less"]), inner.clone(), inner.clone())
                    .prop_map(|(name, a, b)| Expr::apply(name, [a, b])),
                (prop::sample::select(vec!["Negate", "Sqrt", "Sin", "Square", "Abs"]), inner)
                    .prop_map(|(name, a)| Expr::apply(name, [a])),
            ]
        })
    }

    proptest! {
        /// Compiling twice gives byte-identical output
        #[test]
        fn compile_is_deterministic(expr in tree_strategy()) {
            let a = compile(&expr, &xy()).unwrap();
            let b = compile(&expr, &xy()).unwrap();
            prop_assert_eq!(a, b);
        }

        /// Output never contains the decrement token and parentheses balance
        #[test]
        fn output_is_well_formed(expr in tree_strategy()) {
            let code = compile(&expr, &xy()).unwrap().into_string();
            prop_assert!(!code.contains("--"), "{}", code);
            let mut depth = 0i32;
            for c in code.chars() {
                match c {
                    '(' => depth += 1,
                    ')' => depth -= 1,
                    _ => {}
                }
                prop_assert!(depth >= 0);
            }
            prop_assert_eq!(depth, 0);
        }

        /// A bound identifier compiles to exactly its substitution text
        #[test]
        fn substitution_verbatim(text in "[a-z][a-z0-9_.()]{0,12}") {
            let bindings = Bindings::new().var("v", text.clone());
            prop_assert_eq!(compile(&Expr::ident("v"), &bindings).unwrap().into_string(), text);
        }

        /// Arbitrary names and shapes never panic
        #[test]
        fn never_panics(name in "[A-Za-z]{1,8}", argc in 0usize..4) {
            let expr = Expr::apply(name, vec![Expr::ident("x"); argc]);
            let _ = compile(&expr, &xy());
        }
    }
}
