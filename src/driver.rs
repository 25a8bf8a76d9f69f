use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::ast::{Location, MacroDefinition, SourceLine};
use crate::config::Config;
use crate::definition::parse_definition;
use crate::error::ExpandError;
use crate::parser::XpdParser;
use crate::processor::{Expander, MacroTable};
use crate::source::{SourceReader, SourceStream, split_lines};

/// One step of the document once `include` and `define` lines are matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matched {
    /// An `include` line; the lines of the included file come next
    Include { path: String, location: Location },
    Define(MacroDefinition),
    /// A line (or the rest of a line after `endmacro`) left for expansion
    Text(SourceLine),
}

impl fmt::Display for Matched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matched::Include { path, location } => write!(f, "{location}: include {path:?}"),
            Matched::Define(definition) => write!(
                f,
                "{}: define {}({}) {:?}",
                definition.location,
                definition.name,
                definition.parameters.join(", "),
                definition.body
            ),
            Matched::Text(line) => write!(f, "{}: text {:?}", line.location, line.text),
        }
    }
}

/// Splits a source stream into includes, definitions and text lines
struct Matcher<'r> {
    stream: SourceStream<'r>,
    /// Text after an `endmacro`, handed out before the next line
    queued: Option<SourceLine>,
}

impl<'r> Matcher<'r> {
    fn new(stream: SourceStream<'r>) -> Self {
        Self {
            stream,
            queued: None,
        }
    }

    fn next_matched(&mut self) -> Result<Option<Matched>, ExpandError> {
        if let Some(line) = self.queued.take() {
            return Ok(Some(Matched::Text(line)));
        }
        let Some(line) = self.stream.next_line() else {
            return Ok(None);
        };

        if let Some(path) = XpdParser::include_path(&line.text) {
            self.stream.include(&path, &line)?;
            return Ok(Some(Matched::Include {
                path,
                location: line.location,
            }));
        }

        if XpdParser::starts_with_define(&line.text) {
            let parsed = parse_definition(&line, &mut self.stream)?;
            self.queued = parsed.trailing.map(|text| SourceLine { text, ..line });
            return Ok(Some(Matched::Define(parsed.definition)));
        }

        Ok(Some(Matched::Text(line)))
    }
}

/// Lines waiting for the end of a call that spans them
#[derive(Debug, Default)]
struct Pending {
    text: String,
    location: Option<Location>,
}

impl Pending {
    fn push(&mut self, text: &str, location: &Location) {
        if self.location.is_none() {
            self.location = Some(location.clone());
        } else {
            self.text.push('\n');
        }
        self.text.push_str(text);
    }

    fn take(&mut self) -> Option<(String, Location)> {
        let location = self.location.take()?;
        Some((std::mem::take(&mut self.text), location))
    }
}

/// Write every lexeme of every line of `source`, one per output line
///
/// Only `source` itself is read; `include` lines are not followed.
pub fn write_lexemes<W: Write>(
    name: &Path,
    source: &str,
    out: &mut W,
) -> Result<(), ExpandError> {
    let file: Arc<Path> = Arc::from(name);
    for (index, line) in split_lines(source).iter().enumerate() {
        let location = Location::new(file.clone(), index + 1);
        let lexemes =
            XpdParser::lexemes(line).map_err(|source| ExpandError::scan(&location, source))?;
        for lexeme in lexemes {
            writeln!(out, "{location}: {:?} {:?}", lexeme.kind, lexeme.text)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Drives a whole document through includes, definitions, and expansion
///
/// Output is written line by line as soon as each line (or each group of
/// lines holding a multi-line call) is expanded, so a failing run may leave
/// the output of earlier lines behind.
pub struct Processor<R: SourceReader> {
    reader: R,
    config: Config,
    table: MacroTable,
}

impl<R: SourceReader> Processor<R> {
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, Config::default())
    }

    pub fn with_config(reader: R, config: Config) -> Self {
        Self {
            reader,
            config,
            table: MacroTable::new(),
        }
    }

    /// Macros defined by the most recent run
    pub fn table(&self) -> &MacroTable {
        &self.table
    }

    /// Expand the file at `path` into `out`
    pub fn run<W: Write>(&mut self, path: &Path, out: &mut W) -> Result<(), ExpandError> {
        let stream = SourceStream::open(&self.reader, path, self.config.max_include_depth)?;
        Self::drive(stream, &mut self.table, &self.config, out)
    }

    /// Expand an in-memory document named `name` into `out`
    ///
    /// Includes are resolved relative to `name`.
    pub fn run_source<W: Write>(
        &mut self,
        name: &Path,
        source: &str,
        out: &mut W,
    ) -> Result<(), ExpandError> {
        let stream = SourceStream::from_lines(
            &self.reader,
            name,
            split_lines(source),
            self.config.max_include_depth,
        );
        Self::drive(stream, &mut self.table, &self.config, out)
    }

    /// Expand an in-memory document and collect the output
    pub fn expand_str(&mut self, name: &Path, source: &str) -> Result<String, ExpandError> {
        let mut out = Vec::new();
        self.run_source(name, source, &mut out)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Write the document as matched steps, one per line, without expanding calls
    ///
    /// Includes are followed and definitions parsed, but nothing is registered.
    pub fn write_matched<W: Write>(
        &self,
        name: &Path,
        source: &str,
        out: &mut W,
    ) -> Result<(), ExpandError> {
        let stream = SourceStream::from_lines(
            &self.reader,
            name,
            split_lines(source),
            self.config.max_include_depth,
        );
        let mut matcher = Matcher::new(stream);
        while let Some(matched) = matcher.next_matched()? {
            writeln!(out, "{matched}")?;
        }
        out.flush()?;
        Ok(())
    }

    fn drive<W: Write>(
        stream: SourceStream<'_>,
        table: &mut MacroTable,
        config: &Config,
        out: &mut W,
    ) -> Result<(), ExpandError> {
        *table = MacroTable::new();
        let mut matcher = Matcher::new(stream);
        let mut pending = Pending::default();

        while let Some(matched) = matcher.next_matched()? {
            match matched {
                Matched::Include { .. } => {}
                Matched::Define(definition) => table.define(definition, config.redefinition)?,
                Matched::Text(line) => Self::text_line(&line, &mut pending, table, config, out)?,
            }
        }

        // Whatever is left holds a call that never closed; expanding it reports that
        if let Some((text, location)) = pending.take() {
            Self::emit(&text, &location, table, config, out)?;
        }
        out.flush()?;
        Ok(())
    }

    fn text_line<W: Write>(
        line: &SourceLine,
        pending: &mut Pending,
        table: &MacroTable,
        config: &Config,
        out: &mut W,
    ) -> Result<(), ExpandError> {
        let endmacro = XpdParser::find_endmacro(&line.text)
            .map_err(|source| ExpandError::scan(&line.location, source))?;
        if endmacro.is_some() {
            return Err(ExpandError::UnmatchedEndmacro {
                location: line.location.clone(),
            });
        }

        pending.push(&line.text, &line.location);
        let expander = Expander::new(table, config.max_expansion_depth);
        let at = pending.location.as_ref().unwrap_or(&line.location);
        if expander.has_open_call(&pending.text, at)? {
            return Ok(());
        }

        match pending.take() {
            Some((text, location)) => Self::emit(&text, &location, table, config, out),
            None => Ok(()),
        }
    }

    fn emit<W: Write>(
        text: &str,
        location: &Location,
        table: &MacroTable,
        config: &Config,
        out: &mut W,
    ) -> Result<(), ExpandError> {
        let expanded = Expander::new(table, config.max_expansion_depth).expand(text, location)?;
        out.write_all(expanded.as_bytes())?;
        out.write_all(b"\n")?;
        Ok(())
    }
}
