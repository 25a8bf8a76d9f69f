use crate::ast::{Location, MacroDefinition, SourceLine};
use crate::delimiter::matching_close;
use crate::error::ExpandError;
use crate::parser::{HeaderError, XpdParser};
use crate::source::SourceStream;

/// Words that can never name a macro
const RESERVED: &[&str] = &["define", "include", "endmacro", "glue"];

/// A definition read from the document, plus any text after its `endmacro`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDefinition {
    pub definition: MacroDefinition,
    /// Non-blank text following `endmacro` on the same line
    pub trailing: Option<String>,
}

/// Parse the definition starting at `header`, reading body lines from `stream`
///
/// The body must end within the file holding the header.
pub fn parse_definition(
    header: &SourceLine,
    stream: &mut SourceStream<'_>,
) -> Result<ParsedDefinition, ExpandError> {
    let location = &header.location;
    let text = header.text.as_str();

    let parsed = XpdParser::define_header(text).map_err(|err| {
        let reason = match err {
            HeaderError::MissingName => "expected a macro name after 'define'".to_string(),
            HeaderError::MissingParameters(name) => {
                format!("expected '(' after macro name '{name}'")
            }
        };
        malformed(location, reason)
    })?;
    let name = parsed.name;
    if RESERVED.contains(&name) {
        return Err(malformed(
            location,
            format!("'{name}' is reserved and cannot name a macro"),
        ));
    }

    let close =
        matching_close(text, parsed.open).map_err(|_| ExpandError::UnbalancedDelimiter {
            location: location.clone(),
            construct: format!("parameter list of macro '{name}'"),
        })?;
    let parameters = parse_parameters(&text[parsed.open + 1..close], location)?;

    let mut body = Vec::new();
    let mut segment = text[close + 1..].to_string();
    let mut segment_location = location.clone();
    let trailing = loop {
        let found = XpdParser::find_endmacro(&segment)
            .map_err(|source| ExpandError::scan(&segment_location, source))?;
        let (content, rest) = match found {
            Some((start, end)) => (&segment[..start], Some(&segment[end..])),
            None => (segment.as_str(), None),
        };
        check_nested(content, &segment_location, name)?;
        body.push(content.to_owned());

        if let Some(rest) = rest {
            break Some(rest.to_owned()).filter(|rest| !rest.trim().is_empty());
        }

        let Some(line) = stream.next_line_in_file() else {
            return Err(ExpandError::UnterminatedDefinition {
                location: location.clone(),
                name: name.to_owned(),
            });
        };
        segment = line.text;
        segment_location = line.location;
    };

    let definition = MacroDefinition {
        name: name.to_owned(),
        parameters,
        body: body.join("\n").trim().to_owned(),
        location: location.clone(),
    };
    tracing::debug!(
        name = %definition.name,
        parameters = definition.parameters.len(),
        at = %definition.location,
        "macro defined"
    );

    Ok(ParsedDefinition {
        definition,
        trailing,
    })
}

fn parse_parameters(list: &str, location: &Location) -> Result<Vec<String>, ExpandError> {
    if list.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut parameters: Vec<String> = Vec::new();
    for raw in list.split(',') {
        let parameter = raw.trim();
        if !XpdParser::is_identifier(parameter) {
            return Err(malformed(
                location,
                format!("'{parameter}' is not a valid parameter name"),
            ));
        }
        if parameters.iter().any(|seen| seen == parameter) {
            return Err(malformed(
                location,
                format!("parameter '{parameter}' is listed more than once"),
            ));
        }
        parameters.push(parameter.to_owned());
    }
    Ok(parameters)
}

/// Definitions may not contain includes or other definitions
fn check_nested(content: &str, location: &Location, name: &str) -> Result<(), ExpandError> {
    let construct = if XpdParser::include_path(content).is_some() {
        "include"
    } else if XpdParser::starts_with_define(content) {
        "define"
    } else {
        return Ok(());
    };

    Err(ExpandError::IllegalNestedConstruct {
        location: location.clone(),
        name: name.to_owned(),
        construct,
    })
}

fn malformed(location: &Location, reason: String) -> ExpandError {
    ExpandError::MalformedDefinitionHeader {
        location: location.clone(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryReader;
    use std::path::Path;

    fn parse(document: &str) -> Result<ParsedDefinition, ExpandError> {
        let reader = MemoryReader::new().with_file("doc.txt", document);
        let mut stream = SourceStream::open(&reader, Path::new("doc.txt"), 10)?;
        let header = stream.next_line().expect("document has a header line");
        parse_definition(&header, &mut stream)
    }

    #[test]
    fn test_same_line_definition() {
        let parsed = parse("define m() body endmacro").unwrap();
        assert_eq!(parsed.definition.name, "m");
        assert!(parsed.definition.parameters.is_empty());
        assert_eq!(parsed.definition.body, "body");
        assert_eq!(parsed.trailing, None);
    }

    #[test]
    fn test_multi_line_body_matches_same_line() {
        let multi = parse("define m()\n  body\nendmacro").unwrap();
        let single = parse("define m() body endmacro").unwrap();
        assert_eq!(multi.definition.body, single.definition.body);
    }

    #[test]
    fn test_body_keeps_inner_layout() {
        let parsed = parse("define block(a, b)\n  first a\n    second b (x)\n  endmacro").unwrap();
        assert_eq!(parsed.definition.parameters, vec!["a", "b"]);
        assert_eq!(parsed.definition.body, "first a\n    second b (x)");
    }

    #[test]
    fn test_trailing_text_after_endmacro() {
        let parsed = parse("define m(x) [x] endmacro m(1)").unwrap();
        assert_eq!(parsed.definition.body, "[x]");
        assert_eq!(parsed.trailing.as_deref(), Some(" m(1)"));

        let parsed = parse("define m(x) [x] endmacro   ").unwrap();
        assert_eq!(parsed.trailing, None);
    }

    #[test]
    fn test_endmacro_must_be_a_whole_word() {
        let parsed = parse("define m() endmacros xendmacro\nendmacro").unwrap();
        assert_eq!(parsed.definition.body, "endmacros xendmacro");
    }

    #[test]
    fn test_parameters_are_trimmed() {
        let parsed = parse("define m( a ,\tb ) a b endmacro").unwrap();
        assert_eq!(parsed.definition.parameters, vec!["a", "b"]);
    }

    #[test]
    fn test_missing_parenthesis() {
        let err = parse("define m body endmacro").unwrap_err();
        assert!(matches!(err, ExpandError::MalformedDefinitionHeader { .. }));
    }

    #[test]
    fn test_missing_name() {
        let err = parse("define (a) x endmacro").unwrap_err();
        assert!(matches!(err, ExpandError::MalformedDefinitionHeader { .. }));
    }

    #[test]
    fn test_bad_parameters() {
        for header in [
            "define m(a,) x endmacro",
            "define m(1a) x endmacro",
            "define m(a b) x endmacro",
            "define m((a)) x endmacro",
            "define m(a, a) x endmacro",
        ] {
            let err = parse(header).unwrap_err();
            assert!(
                matches!(err, ExpandError::MalformedDefinitionHeader { .. }),
                "{header}: {err}"
            );
        }
    }

    #[test]
    fn test_reserved_names() {
        let err = parse("define glue(a) a endmacro").unwrap_err();
        assert!(matches!(err, ExpandError::MalformedDefinitionHeader { .. }));
    }

    #[test]
    fn test_unbalanced_parameter_list() {
        let err = parse("define m(a, b\nendmacro").unwrap_err();
        assert!(matches!(err, ExpandError::UnbalancedDelimiter { .. }));
    }

    #[test]
    fn test_unterminated_definition() {
        let err = parse("define m(a)\n a\n b").unwrap_err();
        assert!(
            matches!(err, ExpandError::UnterminatedDefinition { ref name, ref location } if name == "m" && location.line == 1)
        );
    }

    #[test]
    fn test_nested_define_is_rejected() {
        let err = parse("define m()\n  define n() x endmacro\nendmacro").unwrap_err();
        assert!(matches!(
            err,
            ExpandError::IllegalNestedConstruct { construct: "define", ref location, .. } if location.line == 2
        ));

        let err = parse("define m() define n() x endmacro").unwrap_err();
        assert!(matches!(
            err,
            ExpandError::IllegalNestedConstruct { construct: "define", .. }
        ));
    }

    #[test]
    fn test_include_inside_definition_is_rejected() {
        let err = parse("define m()\ninclude \"x.txt\"\nendmacro").unwrap_err();
        assert!(matches!(
            err,
            ExpandError::IllegalNestedConstruct { construct: "include", .. }
        ));
    }

    #[test]
    fn test_definition_stays_in_one_file() {
        let reader = MemoryReader::new()
            .with_file("main.txt", "include \"inc.txt\"\nendmacro")
            .with_file("inc.txt", "define m()\nbody");
        let mut stream = SourceStream::open(&reader, Path::new("main.txt"), 10).unwrap();
        let directive = stream.next_line().unwrap();
        stream.include("inc.txt", &directive).unwrap();
        let header = stream.next_line().unwrap();

        let err = parse_definition(&header, &mut stream).unwrap_err();
        assert!(matches!(err, ExpandError::UnterminatedDefinition { .. }));
    }
}
