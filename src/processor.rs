use std::collections::HashMap;

use crate::ast::{Builtin, Fragment, Invocation, Location, Lookup, MacroDefinition};
use crate::config::Redefinition;
use crate::delimiter::{matching_close, split_arguments};
use crate::error::ExpandError;
use crate::parser::XpdParser;

/// Registry of macro definitions (stores raw, unexpanded bodies)
#[derive(Debug, Default, Clone)]
pub struct MacroTable(HashMap<String, MacroDefinition>);

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition, applying `policy` if the name is taken
    pub fn define(
        &mut self,
        definition: MacroDefinition,
        policy: Redefinition,
    ) -> Result<(), ExpandError> {
        if let Some(previous) = self.0.get(&definition.name) {
            match policy {
                Redefinition::Reject => {
                    return Err(ExpandError::Redefinition {
                        location: definition.location,
                        name: definition.name,
                        previous: previous.location.clone(),
                    });
                }
                Redefinition::Replace => tracing::warn!(
                    name = %definition.name,
                    at = %definition.location,
                    previous = %previous.location,
                    "macro redefined, replacing the previous definition"
                ),
            }
        }
        self.0.insert(definition.name.clone(), definition);
        Ok(())
    }

    /// Get a user definition by name
    pub fn get(&self, name: &str) -> Option<&MacroDefinition> {
        self.0.get(name)
    }

    /// Resolve a name, built-ins first
    pub fn lookup(&self, name: &str) -> Lookup<'_> {
        if let Some(builtin) = Builtin::from_name(name) {
            return Lookup::Builtin(builtin);
        }
        match self.0.get(name) {
            Some(definition) => Lookup::Found(definition),
            None => Lookup::NotFound,
        }
    }

    /// Check if a name can be called
    pub fn is_defined(&self, name: &str) -> bool {
        !matches!(self.lookup(name), Lookup::NotFound)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What a call found by the scanner resolves to
#[derive(Clone, Copy)]
enum Callee<'a> {
    Macro(&'a MacroDefinition),
    Builtin(Builtin),
}

/// A call found in a span of text
struct Candidate<'a> {
    name: &'a str,
    start: usize,
    open: usize,
    callee: Callee<'a>,
}

/// Macro expander with recursive, arguments-first expansion
pub struct Expander<'t> {
    table: &'t MacroTable,
    max_depth: usize,
}

impl<'t> Expander<'t> {
    pub fn new(table: &'t MacroTable, max_depth: usize) -> Self {
        Self { table, max_depth }
    }

    /// Expand all calls in `text` (main entry point)
    ///
    /// `at` is the location reported by errors raised inside `text`.
    pub fn expand(&self, text: &str, at: &Location) -> Result<String, ExpandError> {
        let expanded = self.expand_with_depth(&Fragment::plain(text), at, 0)?;
        Ok(expanded.into_string())
    }

    /// Whether `text` ends inside the argument list of a call
    ///
    /// Such text needs more lines before it can be expanded.
    pub fn has_open_call(&self, text: &str, at: &Location) -> Result<bool, ExpandError> {
        let mut resume = 0;
        for candidate in self.candidates(text, at)? {
            if candidate.start < resume {
                continue;
            }
            match matching_close(text, candidate.open) {
                Ok(close) => resume = close + 1,
                Err(_) => return Ok(true),
            }
        }
        Ok(false)
    }

    /// Calls to known macros in `scan`, in order of appearance
    fn candidates<'a>(
        &'a self,
        scan: &'a str,
        at: &Location,
    ) -> Result<Vec<Candidate<'a>>, ExpandError> {
        let words =
            XpdParser::identifiers(scan).map_err(|source| ExpandError::scan(at, source))?;
        Ok(words
            .into_iter()
            .filter(|word| scan[word.end..].starts_with('('))
            .filter_map(|word| {
                let callee = match self.table.lookup(word.text) {
                    Lookup::Found(definition) => Callee::Macro(definition),
                    Lookup::Builtin(builtin) => Callee::Builtin(builtin),
                    Lookup::NotFound => return None,
                };
                Some(Candidate {
                    name: word.text,
                    start: word.start,
                    open: word.end,
                    callee,
                })
            })
            .collect())
    }

    fn expand_with_depth(
        &self,
        fragment: &Fragment,
        at: &Location,
        depth: usize,
    ) -> Result<Fragment, ExpandError> {
        let scan = fragment.scan();
        let mut result = Fragment::default();
        let mut copied = 0;

        for candidate in self.candidates(scan, at)? {
            // Identifiers inside an already expanded call
            if candidate.start < copied {
                continue;
            }

            let close = matching_close(scan, candidate.open).map_err(|_| {
                ExpandError::UnbalancedDelimiter {
                    location: at.clone(),
                    construct: format!("call to macro '{}'", candidate.name),
                }
            })?;
            let interior = fragment.slice(candidate.open + 1..close);
            let invocation = Invocation {
                name: candidate.name,
                arguments: split_arguments(interior.scan())
                    .into_iter()
                    .map(|range| interior.slice(range))
                    .collect(),
            };

            let expansion = match candidate.callee {
                Callee::Macro(definition) => {
                    self.expand_definition(definition, invocation, at, depth)?
                }
                Callee::Builtin(Builtin::Glue) => self.expand_glue(invocation, at, depth)?,
            };

            result.push(&fragment.slice(copied..candidate.start));
            result.push(&expansion);
            copied = close + 1;
        }

        result.push(&fragment.slice(copied..fragment.len()));
        Ok(result)
    }

    fn check_depth(&self, name: &str, at: &Location, depth: usize) -> Result<(), ExpandError> {
        if depth >= self.max_depth {
            return Err(ExpandError::ExpansionTooDeep {
                location: at.clone(),
                name: name.to_owned(),
                limit: self.max_depth,
            });
        }
        Ok(())
    }

    /// Expand a user macro call - core recursive logic
    fn expand_definition(
        &self,
        definition: &MacroDefinition,
        invocation: Invocation<'_>,
        at: &Location,
        depth: usize,
    ) -> Result<Fragment, ExpandError> {
        self.check_depth(&definition.name, at, depth)?;
        if invocation.arguments.len() != definition.parameters.len() {
            return Err(ExpandError::ArityMismatch {
                location: at.clone(),
                name: definition.name.clone(),
                expected: definition.parameters.len(),
                found: invocation.arguments.len(),
            });
        }
        tracing::trace!(name = invocation.name, depth, "expanding macro");

        let values = self.expand_arguments(&invocation.arguments, at, depth + 1)?;
        let body = substitute(definition, &values, at)?;
        // Rescan: the substituted body may contain or construct further calls
        self.expand_with_depth(&body, at, depth + 1)
    }

    /// `glue(a, b, ...)` concatenates its expanded arguments
    ///
    /// The result is literal: no later scan looks into it, even after it is
    /// bound to a parameter and substituted into a body.
    fn expand_glue(
        &self,
        invocation: Invocation<'_>,
        at: &Location,
        depth: usize,
    ) -> Result<Fragment, ExpandError> {
        self.check_depth(invocation.name, at, depth)?;
        let values = self.expand_arguments(&invocation.arguments, at, depth + 1)?;
        let glued: String = values.iter().map(Fragment::as_str).collect();
        Ok(Fragment::literal(glued))
    }

    /// Recursively expand call arguments before they are bound
    fn expand_arguments(
        &self,
        arguments: &[Fragment],
        at: &Location,
        depth: usize,
    ) -> Result<Vec<Fragment>, ExpandError> {
        arguments
            .iter()
            .map(|argument| self.expand_with_depth(argument, at, depth))
            .collect()
    }
}

/// Replace whole-word parameter names in the body with their values
fn substitute(
    definition: &MacroDefinition,
    values: &[Fragment],
    at: &Location,
) -> Result<Fragment, ExpandError> {
    let body = Fragment::plain(&definition.body);
    if definition.parameters.is_empty() {
        return Ok(body);
    }

    let mut result = Fragment::default();
    let mut copied = 0;
    let words = XpdParser::identifiers(&definition.body)
        .map_err(|source| ExpandError::scan(at, source))?;
    for word in words {
        let Some(index) = definition
            .parameters
            .iter()
            .position(|parameter| parameter == word.text)
        else {
            continue;
        };
        result.push(&body.slice(copied..word.start));
        result.push(&values[index]);
        copied = word.end;
    }
    result.push(&body.slice(copied..body.len()));
    Ok(result)
}
