//! Text macro expander: `include "file"`, `define name(params) body endmacro`,
//! and `name(args)` calls, expanded arguments-first.

pub mod ast;
pub mod config;
pub mod definition;
pub mod delimiter;
pub mod driver;
pub mod error;
pub mod parser;
pub mod processor;
pub mod source;

pub use ast::{Builtin, Fragment, Invocation, Location, Lookup, MacroDefinition, SourceLine};
pub use config::{Config, Redefinition};
pub use driver::{Matched, Processor};
pub use error::ExpandError;
pub use processor::{Expander, MacroTable};
pub use source::{FileReader, MemoryReader, SourceReader};
