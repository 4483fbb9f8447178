//! Source file spans and locations

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A unique identifier for a source file
#[derive(Copy, Clone, Debug, Display, Hash, Eq, PartialEq, Serialize, Deserialize, Default)]
#[display("file#{_0}")]
pub struct FileId(pub u32);

impl FileId {
    /// Create a file id from its raw index
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

/// A byte offset span in a source file
#[derive(Copy, Clone, Debug, Display, Hash, Eq, PartialEq, Serialize, Deserialize, Default)]
#[display("{start}..{end}")]
pub struct Span {
    /// Inclusive start offset
    pub start: u32,
    /// Exclusive end offset
    pub end: u32,
}

impl Span {
    /// Create a span from its offsets
    #[must_use]
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Byte range covered by this span
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }

    /// Length in bytes, zero for a reversed span
    #[must_use]
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Whether the span covers no bytes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// A span with associated file
#[derive(Copy, Clone, Debug, Display, Hash, Eq, PartialEq, Serialize, Deserialize, Default)]
#[display("{file}:{span}")]
pub struct FileSpan {
    /// File the span points into
    pub file: FileId,
    /// Offsets inside that file
    pub span: Span,
}

impl FileSpan {
    /// Create a file span
    #[must_use]
    pub fn new(file: FileId, span: Span) -> Self {
        Self { file, span }
    }

    /// Byte range inside the file
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.span.range()
    }
}

/// A registered source file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Display name, usually the path given on the command line
    pub name: String,
    /// Source text, when it is available
    #[serde(default)]
    pub text: Option<String>,
}

/// Names (and optionally text) of every file a design tree points into
///
/// `FileId(n)` refers to the `n`th registered file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    /// Create an empty source map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file and return its id
    pub fn add(&mut self, name: impl Into<String>, text: Option<String>) -> FileId {
        let id = FileId(self.files.len() as u32);
        self.files.push(SourceFile {
            name: name.into(),
            text,
        });
        id
    }

    /// Look up a registered file
    #[must_use]
    pub fn get(&self, file: FileId) -> Option<&SourceFile> {
        self.files.get(file.0 as usize)
    }

    /// Display name for a file, falling back to its numeric id
    #[must_use]
    pub fn name(&self, file: FileId) -> String {
        self.get(file)
            .map_or_else(|| file.to_string(), |source| source.name.clone())
    }

    /// Iterate over all files in registration order
    pub fn iter(&self) -> impl Iterator<Item = (FileId, &SourceFile)> {
        self.files
            .iter()
            .enumerate()
            .map(|(idx, file)| (FileId(idx as u32), file))
    }

    /// Number of registered files
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no file has been registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_display() {
        let span = FileSpan::new(FileId(2), Span::new(4, 9));
        assert_eq!(span.to_string(), "file#2:4..9");
        assert_eq!(span.range(), 4..9);
        assert_eq!(span.span.len(), 5);
    }

    #[test]
    fn test_reversed_span_is_empty() {
        let span = Span::new(20, 5);
        assert_eq!(span.len(), 0);
        assert!(span.is_empty());
    }

    #[test]
    fn test_source_map_names() {
        let mut map = SourceMap::new();
        let top = map.add("top.sv", None);
        assert_eq!(top, FileId(0));
        assert_eq!(map.name(top), "top.sv");
        assert_eq!(map.name(FileId(7)), "file#7");
    }
}
