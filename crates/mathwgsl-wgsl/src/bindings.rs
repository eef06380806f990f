//! Per-compile binding tables.
//!
//! A [`Bindings`] holds two flat, independent namespaces:
//!
//! - **vars**: identifier -> WGSL text spliced verbatim (`x` -> `pos.x`)
//! - **overrides**: application name -> [`Template`] that replaces the
//!   built-in rule for that name (`Equal` -> `({0} - {1})`)
//!
//! Tables are cheap to build, so a new formula or a new rendering mode simply
//! builds a new one. They also deserialize from JSON:
//!
//! ```
//! use mathwgsl_wgsl::Bindings;
//!
//! let bindings: Bindings = serde_json::from_str(r#"{
//!     "vars": { "x": "pos.x", "t": "time()" },
//!     "overrides": { "Equal": "({0} - {1})" }
//! }"#).unwrap();
//! assert_eq!(bindings.lookup_var("t"), Some("time()"));
//! assert_eq!(bindings.lookup_override("Equal").unwrap().arity(), 2);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::module::Domain;
use crate::template::Piece::{Slot, Text};
use crate::template::Template;

/// Identifier and override bindings for one compile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Bindings {
    vars: BTreeMap<String, String>,
    overrides: BTreeMap<String, Template>,
}

impl Bindings {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds an identifier to WGSL text.
    pub fn var(mut self, name: impl Into<String>, wgsl: impl Into<String>) -> Self {
        self.insert_var(name, wgsl);
        self
    }

    /// Overrides an application name with a template.
    pub fn override_with(mut self, name: impl Into<String>, template: Template) -> Self {
        self.insert_override(name, template);
        self
    }

    /// Binds an identifier in place; returns the previous text, if any.
    pub fn insert_var(
        &mut self,
        name: impl Into<String>,
        wgsl: impl Into<String>,
    ) -> Option<String> {
        self.vars.insert(name.into(), wgsl.into())
    }

    /// Overrides an application name in place; returns the previous template.
    pub fn insert_override(
        &mut self,
        name: impl Into<String>,
        template: Template,
    ) -> Option<Template> {
        self.overrides.insert(name.into(), template)
    }

    /// Adds `Pi`, `ExponentialE` and `Tau` as numeric substitutions.
    ///
    /// Existing bindings for those names are kept.
    pub fn with_constants(mut self) -> Self {
        for (name, value) in [
            ("Pi", std::f64::consts::PI),
            ("ExponentialE", std::f64::consts::E),
            ("Tau", std::f64::consts::TAU),
        ] {
            self.vars
                .entry(name.to_string())
                .or_insert_with(|| format!("{value:.10}"));
        }
        self
    }

    /// Copies every entry of `other` into `self`, replacing duplicates.
    pub fn merge(&mut self, other: Bindings) {
        self.vars.extend(other.vars);
        self.overrides.extend(other.overrides);
    }

    /// WGSL text bound to an identifier.
    pub fn lookup_var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Override template for an application name.
    pub fn lookup_override(&self, name: &str) -> Option<&Template> {
        self.overrides.get(name)
    }

    /// Iterates over identifier bindings in name order.
    pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterates over overrides in name order.
    pub fn overrides(&self) -> impl Iterator<Item = (&str, &Template)> {
        self.overrides.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// ============================================================================
// Plot modes
// ============================================================================

/// The calculator's two ways of drawing a formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotMode {
    /// Height field `z = f(x, y)`, sampled over a plane.
    Surface,
    /// Isosurface of `f(x, y, z) = g(x, y, z)`, sampled over a volume.
    Implicit,
}

impl PlotMode {
    /// Default bindings for this mode.
    ///
    /// Both modes read coordinates from `pos`, time from a linked `time()`
    /// function, and bind the constants of [`Bindings::with_constants`].
    /// Implicit mode also turns `Equal` into a signed difference so the
    /// surface is the zero set of `f - g`.
    pub fn bindings(self) -> Bindings {
        let surface = Bindings::new()
            .var("x", "pos.x")
            .var("y", "pos.y")
            .var("t", "time()")
            .with_constants();
        match self {
            PlotMode::Surface => surface,
            PlotMode::Implicit => surface
                .var("z", "pos.z")
                .override_with("Equal", difference()),
        }
    }

    /// Sampling domain of the compiled function.
    pub fn domain(self) -> Domain {
        match self {
            PlotMode::Surface => Domain::Plane,
            PlotMode::Implicit => Domain::Space,
        }
    }
}

/// `({0} - {1})`, assembled from pieces so no parse can fail.
fn difference() -> Template {
    Template::from_pieces(
        "({0} - {1})",
        vec![
            Text("(".to_string()),
            Slot(0),
            Text(" - ".to_string()),
            Slot(1),
            Text(")".to_string()),
        ],
    )
}
