use std::fmt;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

/// Where a line of the document came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: Arc<Path>,
    /// 1-based line number within `file`
    pub line: usize,
}

impl Location {
    pub fn new(file: Arc<Path>, line: usize) -> Self {
        Self { file, line }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// One line of the document, tagged with its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub text: String,
    pub location: Location,
    /// Include nesting of the file the line was read from (0 for the top-level input)
    pub depth: usize,
}

/// A user macro registered by `define ... endmacro`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDefinition {
    pub name: String,
    pub parameters: Vec<String>,
    /// Raw body text, trimmed once at definition time
    pub body: String,
    /// Line holding the `define` keyword
    pub location: Location,
}

/// Macros implemented natively rather than by a definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// Concatenates its expanded arguments; the result is not re-scanned
    Glue,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "glue" => Some(Builtin::Glue),
            _ => None,
        }
    }
}

/// Result of looking a name up in the macro table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    Found(&'a MacroDefinition),
    Builtin(Builtin),
    NotFound,
}

/// Stand-in for protected text in [`Fragment::scan`]
const MASK: char = '#';

/// Expanded text together with the view of it that the scanner reads
///
/// `scan` has the same byte length as `text`. Text produced by `glue` is
/// masked out of it, so it never forms a call, a parameter name, a
/// parenthesis or an argument separator, and is never trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    text: String,
    scan: String,
}

impl Fragment {
    /// Text that is scanned as written
    pub fn plain(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            scan: text.to_owned(),
        }
    }

    /// Text that is never scanned again
    pub fn literal(text: String) -> Self {
        let scan = MASK.to_string().repeat(text.len());
        Self { text, scan }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn scan(&self) -> &str {
        &self.scan
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Copy of a byte range found by scanning `self.scan()`
    pub fn slice(&self, range: Range<usize>) -> Self {
        Self {
            text: self.text[range.clone()].to_owned(),
            scan: self.scan[range].to_owned(),
        }
    }

    pub fn push(&mut self, other: &Fragment) {
        self.text.push_str(&other.text);
        self.scan.push_str(&other.scan);
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// A parsed call, consumed as soon as it is expanded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation<'a> {
    pub name: &'a str,
    /// Argument values after trimming and unwrapping, before expansion
    pub arguments: Vec<Fragment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_fragment_is_masked() {
        let mut fragment = Fragment::plain("f(");
        fragment.push(&Fragment::literal("a, b)".to_string()));
        assert_eq!(fragment.as_str(), "f(a, b)");
        assert_eq!(fragment.scan(), "f(#####");
        assert_eq!(fragment.len(), fragment.scan().len());
    }

    #[test]
    fn test_slice_keeps_text_and_mask_aligned() {
        let mut fragment = Fragment::plain("x ");
        fragment.push(&Fragment::literal("ü".to_string()));
        fragment.push(&Fragment::plain(" y"));
        let middle = fragment.slice(2..4);
        assert_eq!(middle.as_str(), "ü");
        assert_eq!(middle.scan(), "##");
    }
}
