use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::ast::Location;
use crate::parser::ScanError;

/// Fatal errors of an expansion run
///
/// Every variant except [`ExpandError::Output`] names the file and line of the
/// offending construct.
#[derive(Debug, Error)]
pub enum ExpandError {
    #[error("{location}: unbalanced parenthesis in {construct}")]
    UnbalancedDelimiter { location: Location, construct: String },

    #[error("{location}: cannot include \"{}\": {source}", path.display())]
    IncludeNotFound {
        location: Location,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{location}: including \"{}\" exceeds the maximum include depth of {limit}", path.display())]
    IncludeTooDeep {
        location: Location,
        path: PathBuf,
        limit: usize,
    },

    #[error("{location}: malformed macro definition: {reason}")]
    MalformedDefinitionHeader { location: Location, reason: String },

    #[error("{location}: definition of macro '{name}' has no matching 'endmacro'")]
    UnterminatedDefinition { location: Location, name: String },

    #[error("{location}: '{construct}' is not allowed inside the definition of macro '{name}'")]
    IllegalNestedConstruct {
        location: Location,
        name: String,
        construct: &'static str,
    },

    #[error("{location}: macro '{name}' expects {expected} argument(s), found {found}")]
    ArityMismatch {
        location: Location,
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("{location}: expanding macro '{name}' exceeds the maximum expansion depth of {limit}")]
    ExpansionTooDeep {
        location: Location,
        name: String,
        limit: usize,
    },

    #[error("{location}: cannot scan text")]
    Scan {
        location: Location,
        #[source]
        source: ScanError,
    },

    #[error("{location}: macro '{name}' is already defined at {previous}")]
    Redefinition {
        location: Location,
        name: String,
        previous: Location,
    },

    #[error("{location}: 'endmacro' without a matching 'define'")]
    UnmatchedEndmacro { location: Location },

    #[error("cannot read \"{}\": {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write output: {0}")]
    Output(#[from] io::Error),
}

impl ExpandError {
    pub(crate) fn scan(location: &Location, source: ScanError) -> Self {
        Self::Scan {
            location: location.clone(),
            source,
        }
    }

    /// Location of the offending construct, if the error has one
    pub fn location(&self) -> Option<&Location> {
        match self {
            Self::UnbalancedDelimiter { location, .. }
            | Self::IncludeNotFound { location, .. }
            | Self::IncludeTooDeep { location, .. }
            | Self::MalformedDefinitionHeader { location, .. }
            | Self::UnterminatedDefinition { location, .. }
            | Self::IllegalNestedConstruct { location, .. }
            | Self::ArityMismatch { location, .. }
            | Self::ExpansionTooDeep { location, .. }
            | Self::Scan { location, .. }
            | Self::Redefinition { location, .. }
            | Self::UnmatchedEndmacro { location } => Some(location),
            Self::Read { .. } | Self::Output(_) => None,
        }
    }
}
