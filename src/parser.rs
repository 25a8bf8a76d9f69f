use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "src/xpd.pest"]
pub struct XpdParser;

/// Failure of the lexer on a span of text
pub type ScanError = Box<pest::error::Error<Rule>>;

/// What a lexeme of scanned text is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexemeKind {
    /// ASCII identifier bounded by non-word characters on both sides
    Identifier,
    /// Any other run of word characters (numbers, words in other scripts)
    Word,
    /// Everything between words
    Other,
}

/// A piece of scanned text, with its byte range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lexeme<'a> {
    pub kind: LexemeKind,
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

/// The part of a `define` line up to the parameter list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefineHeader<'a> {
    pub name: &'a str,
    /// Byte offset of the `(` opening the parameter list
    pub open: usize,
}

/// Why a `define` line has no usable header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    MissingName,
    MissingParameters(String),
}

impl XpdParser {
    /// Split `input` into lexemes covering all of it, in order
    pub fn lexemes(input: &str) -> Result<Vec<Lexeme<'_>>, ScanError> {
        let mut pairs = XpdParser::parse(Rule::text, input)?;

        Ok(pairs
            .next()
            .into_iter()
            .flat_map(|text| text.into_inner())
            .filter_map(|pair| {
                let kind = match pair.as_rule() {
                    Rule::identifier => LexemeKind::Identifier,
                    Rule::word => LexemeKind::Word,
                    Rule::other => LexemeKind::Other,
                    _ => return None,
                };
                let span = pair.as_span();
                Some(Lexeme {
                    kind,
                    text: span.as_str(),
                    start: span.start(),
                    end: span.end(),
                })
            })
            .collect())
    }

    /// Identifier words of `input`, in order
    ///
    /// Words are maximal runs, so `xfoo` never yields `foo` and `1foo` yields nothing.
    pub fn identifiers(input: &str) -> Result<Vec<Lexeme<'_>>, ScanError> {
        let mut lexemes = XpdParser::lexemes(input)?;
        lexemes.retain(|lexeme| lexeme.kind == LexemeKind::Identifier);
        Ok(lexemes)
    }

    pub fn is_identifier(input: &str) -> bool {
        XpdParser::parse(Rule::lone_identifier, input).is_ok()
    }

    /// Path named by an `include "path"` line, with escapes resolved
    ///
    /// Returns `None` unless the whole line has exactly that shape.
    pub fn include_path(line: &str) -> Option<String> {
        let directive = XpdParser::parse(Rule::include_directive, line).ok()?.next()?;
        let path = directive
            .into_inner()
            .find(|pair| pair.as_rule() == Rule::path)?;

        let mut resolved = String::new();
        for piece in path.into_inner() {
            match piece.as_rule() {
                Rule::path_chars => resolved.push_str(piece.as_str()),
                Rule::escape => resolved.push(unescape(piece.as_str())),
                _ => {}
            }
        }
        Some(resolved)
    }

    /// Whether `define` is the first token of `line`
    pub fn starts_with_define(line: &str) -> bool {
        XpdParser::parse(Rule::define_keyword, line).is_ok()
    }

    /// Parse the name and locate the parameter list of a `define` line
    pub fn define_header(line: &str) -> Result<DefineHeader<'_>, HeaderError> {
        if let Ok(mut pairs) = XpdParser::parse(Rule::define_header, line) {
            let mut name = None;
            let mut open = None;
            for pair in pairs.next().into_iter().flat_map(|header| header.into_inner()) {
                match pair.as_rule() {
                    Rule::identifier => name = Some(pair.as_str()),
                    Rule::open_paren => open = Some(pair.as_span().start()),
                    _ => {}
                }
            }
            if let (Some(name), Some(open)) = (name, open) {
                return Ok(DefineHeader { name, open });
            }
        }

        let name = XpdParser::parse(Rule::define_name, line)
            .ok()
            .and_then(|mut pairs| pairs.next())
            .and_then(|pair| {
                pair.into_inner()
                    .find(|inner| inner.as_rule() == Rule::identifier)
                    .map(|inner| inner.as_str().to_owned())
            });

        match name {
            Some(name) => Err(HeaderError::MissingParameters(name)),
            None => Err(HeaderError::MissingName),
        }
    }

    /// Byte range of the first standalone `endmacro` in `input`
    pub fn find_endmacro(input: &str) -> Result<Option<(usize, usize)>, ScanError> {
        Ok(XpdParser::identifiers(input)?
            .into_iter()
            .find(|word| word.text == "endmacro")
            .map(|word| (word.start, word.end)))
    }
}

fn unescape(escape: &str) -> char {
    match escape.chars().nth(1) {
        Some('n') => '\n',
        Some('t') => '\t',
        Some(c) => c,
        None => '\\',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(input: &str) -> Vec<&str> {
        XpdParser::identifiers(input)
            .unwrap()
            .into_iter()
            .map(|word| word.text)
            .collect()
    }

    #[test]
    fn test_identifiers_split_on_word_boundaries() {
        assert_eq!(
            words("foo(bar, 1baz) _q9+x"),
            vec!["foo", "bar", "_q9", "x"]
        );
    }

    #[test]
    fn test_identifier_offsets() {
        let found = XpdParser::identifiers("  ab(c)").unwrap();
        assert_eq!(
            found[0],
            Lexeme {
                kind: LexemeKind::Identifier,
                text: "ab",
                start: 2,
                end: 4
            }
        );
        assert_eq!(found[1].start, 5);
    }

    #[test]
    fn test_non_ascii_letters_are_word_characters() {
        assert!(words("héllo wörld").is_empty());
        assert_eq!(words("héllo(x) llo(y) naïve_"), vec!["x", "llo", "y"]);
        assert_eq!(words("日本foo bar日本"), Vec::<&str>::new());
    }

    #[test]
    fn test_lexemes_cover_the_input() {
        let input = "a1 héllo, 2b(c)";
        let lexemes = XpdParser::lexemes(input).unwrap();
        let kinds: Vec<_> = lexemes.iter().map(|l| (l.kind, l.text)).collect();
        assert_eq!(
            kinds,
            vec![
                (LexemeKind::Identifier, "a1"),
                (LexemeKind::Other, " "),
                (LexemeKind::Word, "héllo"),
                (LexemeKind::Other, ", "),
                (LexemeKind::Word, "2b"),
                (LexemeKind::Other, "("),
                (LexemeKind::Identifier, "c"),
                (LexemeKind::Other, ")"),
            ]
        );
        let joined: String = lexemes.iter().map(|l| l.text).collect();
        assert_eq!(joined, input);
    }

    #[test]
    fn test_is_identifier() {
        assert!(XpdParser::is_identifier("abc_1"));
        assert!(XpdParser::is_identifier("_"));
        assert!(!XpdParser::is_identifier("1abc"));
        assert!(!XpdParser::is_identifier("a b"));
        assert!(!XpdParser::is_identifier(""));
    }

    #[test]
    fn test_include_path() {
        assert_eq!(
            XpdParser::include_path("include \"lib/a.txt\""),
            Some("lib/a.txt".to_string())
        );
        assert_eq!(
            XpdParser::include_path("  \tinclude   \"a b\"  "),
            Some("a b".to_string())
        );
        assert_eq!(
            XpdParser::include_path(r#"include "a\"b\\c\td""#),
            Some("a\"b\\c\td".to_string())
        );
    }

    #[test]
    fn test_include_path_rejects_other_shapes() {
        assert_eq!(XpdParser::include_path("include \"a\" trailing"), None);
        assert_eq!(XpdParser::include_path("x include \"a\""), None);
        assert_eq!(XpdParser::include_path("included \"a\""), None);
        assert_eq!(XpdParser::include_path("include a.txt"), None);
        assert_eq!(XpdParser::include_path("include \"unterminated"), None);
    }

    #[test]
    fn test_starts_with_define() {
        assert!(XpdParser::starts_with_define("define m() x endmacro"));
        assert!(XpdParser::starts_with_define("   define"));
        assert!(!XpdParser::starts_with_define("defined(x)"));
        assert!(!XpdParser::starts_with_define("a define b"));
    }

    #[test]
    fn test_define_header() {
        let header = XpdParser::define_header("define wrap(x) [x] endmacro").unwrap();
        assert_eq!(header.name, "wrap");
        assert_eq!(header.open, 11);

        let header = XpdParser::define_header("  define m  (a)").unwrap();
        assert_eq!(header.name, "m");
        assert_eq!(header.open, 12);
    }

    #[test]
    fn test_define_header_errors() {
        assert_eq!(
            XpdParser::define_header("define"),
            Err(HeaderError::MissingName)
        );
        assert_eq!(
            XpdParser::define_header("define (a)"),
            Err(HeaderError::MissingName)
        );
        assert_eq!(
            XpdParser::define_header("define the term"),
            Err(HeaderError::MissingParameters("the".to_string()))
        );
    }

    #[test]
    fn test_find_endmacro() {
        let find = |input| XpdParser::find_endmacro(input).unwrap();
        assert_eq!(find("a b endmacro c"), Some((4, 12)));
        assert_eq!(find("endmacros xendmacro"), None);
        assert_eq!(find("x)endmacro"), Some((2, 10)));
        assert_eq!(find("endmacroé"), None);
    }
}
