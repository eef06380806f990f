//! Slot templates: WGSL text with `{0}`, `{1}`, ... operand holes.
//!
//! The built-in library spells its templates as static [`Piece`] slices; caller
//! overrides are parsed from strings with [`Template::parse`]. Both render
//! through the same routine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest slot index a parsed template may use.
pub const MAX_SLOT: usize = 255;

/// Error parsing an override template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// `{` at the given byte offset is never closed.
    #[error("unclosed '{{' at offset {0}")]
    UnclosedSlot(usize),
    /// Slot contents are not a decimal index up to [`MAX_SLOT`].
    #[error("invalid slot '{{{0}}}'")]
    BadSlot(String),
    /// `}` at the given byte offset has no matching `{`.
    #[error("unmatched '}}' at offset {0}")]
    StrayBrace(usize),
    /// A slot index below the highest one is never used.
    #[error("slot {{{0}}} is never used")]
    MissingSlot(usize),
}

/// One piece of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Piece<S> {
    /// Literal WGSL text.
    Text(S),
    /// Operand hole, filled with the compiled child at this index.
    Slot(usize),
}

/// Renders pieces against compiled operands.
pub(crate) fn render<S: AsRef<str>>(pieces: &[Piece<S>], args: &[String]) -> String {
    let mut out = String::new();
    for piece in pieces {
        match piece {
            Piece::Text(text) => out.push_str(text.as_ref()),
            Piece::Slot(i) => {
                if let Some(arg) = args.get(*i) {
                    out.push_str(arg);
                }
            }
        }
    }
    out
}

/// Number of operands a piece list consumes: highest slot index plus one.
pub(crate) fn slot_count<S>(pieces: &[Piece<S>]) -> usize {
    pieces
        .iter()
        .filter_map(|p| match p {
            Piece::Slot(i) => Some(i.saturating_add(1)),
            Piece::Text(_) => None,
        })
        .max()
        .unwrap_or(0)
}

/// A caller-supplied emission template, e.g. `({0} - {1})`.
///
/// Operands are numbered from zero. Literal braces are written `{{` and `}}`.
/// Every index up to the highest one must appear at least once, so
/// [`Template::arity`] is exactly the number of children a node needs. Slot
/// indices above [`MAX_SLOT`] are rejected.
///
/// The rendered text is spliced into its parent as a single operand, so it
/// should be self-delimiting (wrapped in parentheses or a call).
///
/// ```
/// use mathwgsl_wgsl::Template;
///
/// let t = Template::parse("({0} - {1})").unwrap();
/// assert_eq!(t.arity(), 2);
/// assert_eq!(t.render(&["a".to_string(), "b".to_string()]), "(a - b)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Template {
    source: String,
    pieces: Vec<Piece<String>>,
    arity: usize,
}

impl Template {
    /// Parses a template string.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut pieces = Vec::new();
        let mut text = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            match c {
                '{' if chars.next_if(|&(_, c)| c == '{').is_some() => text.push('{'),
                '{' => {
                    let mut index = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((_, c)) => index.push(c),
                            None => return Err(TemplateError::UnclosedSlot(offset)),
                        }
                    }
                    let slot = index
                        .trim()
                        .parse::<usize>()
                        .ok()
                        .filter(|&slot| slot <= MAX_SLOT)
                        .ok_or_else(|| TemplateError::BadSlot(index.clone()))?;
                    if !text.is_empty() {
                        pieces.push(Piece::Text(std::mem::take(&mut text)));
                    }
                    pieces.push(Piece::Slot(slot));
                }
                '}' if chars.next_if(|&(_, c)| c == '}').is_some() => text.push('}'),
                '}' => return Err(TemplateError::StrayBrace(offset)),
                _ => text.push(c),
            }
        }
        if !text.is_empty() {
            pieces.push(Piece::Text(text));
        }

        let arity = slot_count(&pieces);
        for i in 0..arity {
            if !pieces.contains(&Piece::Slot(i)) {
                return Err(TemplateError::MissingSlot(i));
            }
        }

        Ok(Self {
            source: source.to_string(),
            pieces,
            arity,
        })
    }

    /// Builds a template from pieces already known to be well formed.
    pub(crate) fn from_pieces(source: &str, pieces: Vec<Piece<String>>) -> Self {
        Self {
            source: source.to_string(),
            arity: slot_count(&pieces),
            pieces,
        }
    }

    /// Number of operands this template takes.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// The template as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Fills the slots with `args`.
    ///
    /// Callers are expected to pass exactly [`Template::arity`] operands; the
    /// compiler checks this before rendering.
    pub fn render(&self, args: &[String]) -> String {
        render(&self.pieces, args)
    }
}

impl std::str::FromStr for Template {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Template {
    type Error = TemplateError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Template> for String {
    fn from(t: Template) -> Self {
        t.source
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}
