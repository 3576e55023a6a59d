//! Source file cache for diagnostic rendering.

use crate::span::{FileId, Location, Span};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A cached source file with precomputed line starts.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: FileId,
    pub path: PathBuf,
    pub source: String,
    line_starts: Vec<u32>,
}

impl SourceFile {
    fn new(id: FileId, path: PathBuf, source: String) -> Self {
        let line_starts = compute_line_starts(&source);
        Self {
            id,
            path,
            source,
            line_starts,
        }
    }

    /// 1-indexed line and column for a byte offset.
    pub fn line_column(&self, offset: u32) -> (u32, u32) {
        let offset = offset.min(self.source.len() as u32);
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let line_start = self.line_starts[line_idx];
        ((line_idx + 1) as u32, (offset - line_start + 1).max(1))
    }

    /// Text of a 1-indexed line without its line terminator.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        let idx = (line as usize).checked_sub(1)?;
        let start = *self.line_starts.get(idx)? as usize;
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&e| e as usize)
            .unwrap_or(self.source.len());
        Some(
            self.source[start..end]
                .trim_end_matches('\n')
                .trim_end_matches('\r'),
        )
    }

    pub fn slice(&self, start: u32, end: u32) -> Option<&str> {
        self.source.get(start as usize..end as usize)
    }
}

fn compute_line_starts(source: &str) -> Vec<u32> {
    std::iter::once(0)
        .chain(
            source
                .char_indices()
                .filter(|&(_, c)| c == '\n')
                .map(|(i, _)| (i + 1) as u32),
        )
        .collect()
}

/// Cache of source files, keyed by `FileId` and by path.
#[derive(Debug, Default)]
pub struct SourceCache {
    files: HashMap<FileId, SourceFile>,
    path_to_id: HashMap<PathBuf, FileId>,
    next_id: u32,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, returning its id. Re-adding a path returns the existing id.
    pub fn add_file(&mut self, path: impl AsRef<Path>, source: String) -> FileId {
        let path = path.as_ref().to_path_buf();
        if let Some(&id) = self.path_to_id.get(&path) {
            return id;
        }

        let id = FileId(self.next_id);
        self.next_id += 1;
        self.files
            .insert(id, SourceFile::new(id, path.clone(), source));
        self.path_to_id.insert(path, id);
        id
    }

    pub fn get_file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(&id)
    }

    pub fn location(&self, span: Span) -> Option<Location> {
        if span.is_dummy() {
            return None;
        }
        let file = self.files.get(&span.file_id)?;
        let (line, column) = file.line_column(span.start);
        Some(Location {
            file: file.path.to_string_lossy().into_owned(),
            line,
            column,
        })
    }

    pub fn source_text(&self, span: Span) -> Option<&str> {
        if span.is_dummy() {
            return None;
        }
        self.files.get(&span.file_id)?.slice(span.start, span.end)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
