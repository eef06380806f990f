//! Shader assembly around compiled fragments.
//!
//! A [`Fragment`] is only an expression. The renderer samples a function
//! `f(pos)` over a grid, and for implicit surfaces also its gradient `df(pos)`
//! for normals. This module produces those functions. [`Linkage::Linked`]
//! emits `@link`/`@export` declarations for a module linker that resolves
//! external functions such as `time()` by name. [`Linkage::Standalone`] emits
//! plain WGSL and leaves the external functions to the caller.

use crate::compile::{format_float, Fragment};

/// Coordinate space a function is sampled over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    /// `pos: vec2<f32>`
    Plane,
    /// `pos: vec3<f32>`
    Space,
}

impl Domain {
    /// Number of coordinate axes.
    pub fn axes(self) -> usize {
        match self {
            Domain::Plane => 2,
            Domain::Space => 3,
        }
    }

    /// WGSL vector type of `pos`.
    pub fn vec_type(self) -> &'static str {
        match self {
            Domain::Plane => "vec2<f32>",
            Domain::Space => "vec3<f32>",
        }
    }

    fn index_type(self) -> &'static str {
        match self {
            Domain::Plane => "vec2<u32>",
            Domain::Space => "vec3<u32>",
        }
    }

    /// Type of the modulus used to unpack a flat grid index.
    fn modulus_type(self) -> &'static str {
        match self {
            Domain::Plane => "u32",
            Domain::Space => "vec2<u32>",
        }
    }
}

/// How external functions are declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Linkage {
    /// `@link` declarations and `@export` entry points.
    Linked,
    /// Plain WGSL functions.
    Standalone,
}

/// Emits the sampled function `f(pos) -> f32` with `fragment` as its body.
///
/// ```
/// use mathwgsl_core::Expr;
/// use mathwgsl_wgsl::{compile, function_module, Bindings, Domain, Linkage};
///
/// let bindings = Bindings::new().var("x", "pos.x");
/// let body = compile(&Expr::parse(r#"["Sin", "x"]"#).unwrap(), &bindings).unwrap();
/// let src = function_module(&body, Domain::Plane, Linkage::Standalone);
/// assert_eq!(src, "fn f(pos: vec2<f32>) -> f32 {\n    return sin(pos.x);\n}\n");
/// ```
pub fn function_module(fragment: &Fragment, domain: Domain, linkage: Linkage) -> String {
    let signature = format!("fn f(pos: {}) -> f32", domain.vec_type());
    let body = format!("{{\n    return {fragment};\n}}\n");
    match linkage {
        Linkage::Linked => {
            format!("@link fn time() -> f32 {{}}\n\n@export {signature} {body}")
        }
        Linkage::Standalone => format!("{signature} {body}"),
    }
}

// ============================================================================
// Gradient
// ============================================================================

/// Finite-difference formula used by [`Gradient`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GradientMode {
    /// `f(p + h) - f(p - h) / 2h` per axis.
    ///
    /// Operator precedence divides only the second sample by `2h`, so this
    /// is not the true gradient. Existing renders were produced with it.
    #[default]
    Unbalanced,
    /// `(f(p + h) - f(p - h)) / 2h` per axis: the central difference.
    Central,
}

/// Emits `df(pos)`, a finite-difference gradient of `f(pos)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gradient {
    pub mode: GradientMode,
    /// Offset `h` along each axis.
    pub step: f32,
}

impl Default for Gradient {
    fn default() -> Self {
        Self {
            mode: GradientMode::default(),
            step: 0.0001,
        }
    }
}

impl Gradient {
    pub fn new(mode: GradientMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// WGSL for one gradient component.
    fn component(&self, domain: Domain, axis: usize) -> String {
        let offset: Vec<String> = (0..domain.axes())
            .map(|i| {
                if i == axis {
                    format_float(self.step)
                } else {
                    "0.0".to_string()
                }
            })
            .collect();
        let offset = format!("{}({})", domain.vec_type(), offset.join(", "));
        let denom = format_float(self.step * 2.0);
        let (fwd, back) = (format!("f(pos + {offset})"), format!("f(pos - {offset})"));
        match self.mode {
            GradientMode::Unbalanced => format!("{fwd} - {back} / {denom}"),
            GradientMode::Central => format!("({fwd} - {back}) / {denom}"),
        }
    }

    /// Emits the gradient function for `domain`.
    pub fn module(&self, domain: Domain, linkage: Linkage) -> String {
        let ty = domain.vec_type();
        let components: Vec<String> = (0..domain.axes())
            .map(|axis| format!("        {},\n", self.component(domain, axis)))
            .collect();
        let body = format!(
            "fn df(pos: {ty}) -> {ty} {{\n    return {ty}(\n{}    );\n}}\n",
            components.concat()
        );
        match linkage {
            Linkage::Linked => format!("@link fn f(pos: {ty}) -> f32 {{}}\n\n@export {body}"),
            Linkage::Standalone => body,
        }
    }
}

// ============================================================================
// Grid sampling
// ============================================================================

/// What a sampler entry point returns at each grid point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sample {
    /// `f(pos)`: the scalar field.
    Values,
    /// `df(pos)`: gradients, for surface normals.
    Normals,
}

/// Emits a linked entry point `main(index: u32)` that maps a flat grid index
/// into the `[rangeMin(), rangeMax()]` box and samples `f` or `df` there.
///
/// Grid size, range and index unpacking are all linked in by the renderer.
pub fn sampler_module(domain: Domain, sample: Sample) -> String {
    let n = domain.axes();
    let ty = domain.vec_type();
    let uty = domain.index_type();
    let mty = domain.modulus_type();
    let (callee, ret) = match sample {
        Sample::Values => ("f", "f32"),
        Sample::Normals => ("df", ty),
    };
    let ones = vec!["1u"; n].join(", ");

    format!(
        "@link fn {callee}(pos: {ty}) -> {ret} {{}}\n\
         \n\
         @link fn size() -> {uty} {{}}\n\
         @link fn rangeMin() -> {ty} {{}}\n\
         @link fn rangeMax() -> {ty} {{}}\n\
         @link fn sizeToModulus{n}(size: {uty}) -> {mty} {{}}\n\
         @link fn unpackIndex{n}(i: u32, modulus: {mty}) -> {uty} {{}}\n\
         \n\
         @export fn main(index: u32) -> {ret} {{\n\
         \x20   let cell = unpackIndex{n}(index, sizeToModulus{n}(size()));\n\
         \x20   var pos: {ty} = {ty}(cell) / {ty}(size() - {uty}({ones}));\n\
         \x20   pos = pos * (rangeMax() - rangeMin()) + rangeMin();\n\
         \x20   return {callee}(pos);\n\
         }}\n"
    )
}
