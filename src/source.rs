use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::ast::{Location, SourceLine};
use crate::error::ExpandError;

/// Capability to load a named file as lines
pub trait SourceReader {
    fn read_lines(&self, path: &Path) -> io::Result<Vec<String>>;
}

impl<R: SourceReader + ?Sized> SourceReader for &R {
    fn read_lines(&self, path: &Path) -> io::Result<Vec<String>> {
        (**self).read_lines(path)
    }
}

/// Reads files from the file system
#[derive(Debug, Default, Clone, Copy)]
pub struct FileReader;

impl SourceReader for FileReader {
    fn read_lines(&self, path: &Path) -> io::Result<Vec<String>> {
        let text = std::fs::read_to_string(path)?;
        Ok(split_lines(&text))
    }
}

/// Serves files from memory, keyed by path
#[derive(Debug, Default, Clone)]
pub struct MemoryReader(HashMap<PathBuf, String>);

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.0.insert(path.into(), text.into());
    }

    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }
}

impl SourceReader for MemoryReader {
    fn read_lines(&self, path: &Path) -> io::Result<Vec<String>> {
        self.0
            .get(path)
            .map(|text| split_lines(text))
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }
}

/// Split text on `\n` and `\r\n`
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_owned).collect()
}

struct Frame {
    file: Arc<Path>,
    lines: std::vec::IntoIter<String>,
    line: usize,
    depth: usize,
}

impl Frame {
    fn new(file: Arc<Path>, lines: Vec<String>, depth: usize) -> Self {
        Self {
            file,
            lines: lines.into_iter(),
            line: 0,
            depth,
        }
    }

    fn next_line(&mut self) -> Option<SourceLine> {
        let text = self.lines.next()?;
        self.line += 1;
        Some(SourceLine {
            text,
            location: Location::new(self.file.clone(), self.line),
            depth: self.depth,
        })
    }
}

/// The document as a stack of partially read files
///
/// Including a file pushes its lines in front of the rest of the including
/// file; a file is popped once its lines are exhausted.
pub struct SourceStream<'r> {
    reader: &'r dyn SourceReader,
    frames: Vec<Frame>,
    max_depth: usize,
}

impl<'r> SourceStream<'r> {
    /// Start a stream at the top-level file `path`
    pub fn open(
        reader: &'r dyn SourceReader,
        path: &Path,
        max_depth: usize,
    ) -> Result<Self, ExpandError> {
        let lines = reader.read_lines(path).map_err(|source| ExpandError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_lines(reader, path, lines, max_depth))
    }

    /// Start a stream at an already loaded top-level document
    pub fn from_lines(
        reader: &'r dyn SourceReader,
        name: &Path,
        lines: Vec<String>,
        max_depth: usize,
    ) -> Self {
        Self {
            reader,
            frames: vec![Frame::new(Arc::from(name), lines, 0)],
            max_depth,
        }
    }

    /// Next line of the document, leaving exhausted files
    pub fn next_line(&mut self) -> Option<SourceLine> {
        loop {
            let frame = self.frames.last_mut()?;
            if let Some(line) = frame.next_line() {
                return Some(line);
            }
            tracing::debug!(file = %frame.file.display(), "end of file");
            self.frames.pop();
        }
    }

    /// Next line of the current file only; `None` once that file is exhausted
    pub fn next_line_in_file(&mut self) -> Option<SourceLine> {
        self.frames.last_mut()?.next_line()
    }

    /// Splice the file named by the include directive on `directive`
    pub fn include(&mut self, path: &str, directive: &SourceLine) -> Result<(), ExpandError> {
        let resolved = resolve(&directive.location.file, path);
        let depth = directive.depth + 1;
        if depth > self.max_depth {
            return Err(ExpandError::IncludeTooDeep {
                location: directive.location.clone(),
                path: resolved,
                limit: self.max_depth,
            });
        }

        let lines = self
            .reader
            .read_lines(&resolved)
            .map_err(|source| ExpandError::IncludeNotFound {
                location: directive.location.clone(),
                path: resolved.clone(),
                source,
            })?;

        tracing::debug!(
            from = %directive.location,
            file = %resolved.display(),
            depth,
            lines = lines.len(),
            "including file"
        );
        self.frames
            .push(Frame::new(Arc::from(resolved.as_path()), lines, depth));
        Ok(())
    }
}

/// Resolve an include path against the directory of the including file
fn resolve(including: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match including.parent() {
        Some(dir) => dir.join(path),
        None => path.to_path_buf(),
    }
}
