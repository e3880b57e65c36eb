//! Script sources: the provider abstraction for reading scripts and the
//! [`SourceMap`] that owns script text and maps byte offsets back to
//! line/column positions.

use crate::error::{DslError, ErrorCode, Position, SourceSpan};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Trait that abstracts file I/O for script loading.
///
/// The default [`FileSystemProvider`] delegates to `std::fs`;
/// [`InMemoryProvider`] serves scripts from a map, for tests and embedding.
pub trait SourceProvider {
    /// Read the source text for a given path.
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error>;

    /// Canonicalize a path so the same script given twice is loaded once.
    fn canonicalize(&self, path: &Path) -> Result<PathBuf, std::io::Error>;
}

/// Default filesystem-backed source provider.
pub struct FileSystemProvider;

impl SourceProvider for FileSystemProvider {
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error> {
        std::fs::read_to_string(path)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf, std::io::Error> {
        path.canonicalize()
    }
}

/// In-memory source provider.
///
/// Maps paths to script text. Canonicalization normalizes the path without
/// requiring filesystem access.
pub struct InMemoryProvider {
    files: HashMap<PathBuf, String>,
}

impl InMemoryProvider {
    pub fn new(files: HashMap<PathBuf, String>) -> Self {
        Self {
            files: files
                .into_iter()
                .map(|(p, s)| (Self::normalize_path(&p), s))
                .collect(),
        }
    }

    /// Normalize a path by resolving `.` and `..` components without
    /// touching the filesystem.
    fn normalize_path(path: &Path) -> PathBuf {
        let mut components = Vec::new();
        for component in path.components() {
            match component {
                std::path::Component::CurDir => {}
                std::path::Component::ParentDir => {
                    if !components.is_empty() {
                        components.pop();
                    }
                }
                other => components.push(other),
            }
        }
        components.iter().collect()
    }
}

impl SourceProvider for InMemoryProvider {
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error> {
        let normalized = Self::normalize_path(path);
        self.files.get(&normalized).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found in memory: {}", normalized.display()),
            )
        })
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf, std::io::Error> {
        let normalized = Self::normalize_path(path);
        if self.files.contains_key(&normalized) {
            Ok(normalized)
        } else {
            Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!(
                    "path not found in memory provider: {}",
                    normalized.display()
                ),
            ))
        }
    }
}

/// Index of a script inside a [`SourceMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScriptId(pub usize);

/// One named script and its line index.
#[derive(Debug, Clone)]
pub struct Script {
    name: String,
    text: String,
    /// Byte offset of the first character of every line.
    line_starts: Vec<usize>,
}

impl Script {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Script {
            name: name.into(),
            text,
            line_starts,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Convert a byte offset into a 1-based line/column position.
    /// Offsets past the end clamp to the end of the text.
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let line_start = self.line_starts[line_idx];
        let column = self
            .text
            .get(line_start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(0);
        Position {
            line: u32::try_from(line_idx + 1).unwrap_or(u32::MAX),
            column: u32::try_from(column + 1).unwrap_or(u32::MAX),
        }
    }

    pub fn span(&self, begin: usize, end: usize) -> SourceSpan {
        SourceSpan {
            file: self.name.clone(),
            begin: self.position(begin),
            end: self.position(end),
        }
    }
}

/// All scripts of one compilation job, in the order they were added.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    scripts: Vec<Script>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, text: impl Into<String>) -> ScriptId {
        self.scripts.push(Script::new(name, text));
        ScriptId(self.scripts.len() - 1)
    }

    pub fn get(&self, id: ScriptId) -> Option<&Script> {
        self.scripts.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ScriptId, &Script)> {
        self.scripts.iter().enumerate().map(|(i, s)| (ScriptId(i), s))
    }

    /// Read every path through `provider`, skipping paths that canonicalize
    /// to an already loaded script.
    pub fn load(paths: &[PathBuf], provider: &dyn SourceProvider) -> Result<Self, DslError> {
        let mut map = SourceMap::new();
        let mut seen: HashSet<PathBuf> = HashSet::new();
        for path in paths {
            let canon = provider.canonicalize(path).map_err(|e| {
                DslError::new(
                    ErrorCode::Source,
                    format!("cannot open script '{}': {}", path.display(), e),
                )
            })?;
            if !seen.insert(canon) {
                continue;
            }
            let text = provider.read_source(path).map_err(|e| {
                DslError::new(
                    ErrorCode::Source,
                    format!("cannot read script '{}': {}", path.display(), e),
                )
            })?;
            map.add(path.to_string_lossy(), text);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_path_resolves_dot_and_dotdot() {
        let p = Path::new("/a/b/../c/./d");
        let normalized = InMemoryProvider::normalize_path(p);
        assert_eq!(normalized, PathBuf::from("/a/c/d"));
    }

    #[test]
    fn in_memory_read_source_not_found() {
        let provider = InMemoryProvider::new(HashMap::new());
        let err = provider.read_source(Path::new("/missing.dsl")).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn load_skips_duplicate_paths() {
        let mut files = HashMap::new();
        files.insert(PathBuf::from("/m/a.dsl"), "Module A;".to_string());
        files.insert(PathBuf::from("/m/b.dsl"), "Module B;".to_string());
        let provider = InMemoryProvider::new(files);
        let paths = vec![
            PathBuf::from("/m/a.dsl"),
            PathBuf::from("/m/x/../a.dsl"),
            PathBuf::from("/m/b.dsl"),
        ];
        let map = SourceMap::load(&paths, &provider).unwrap();
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn load_reports_missing_script() {
        let provider = InMemoryProvider::new(HashMap::new());
        let err = SourceMap::load(&[PathBuf::from("/nope.dsl")], &provider).unwrap_err();
        assert_eq!(err.code, ErrorCode::Source);
        assert!(err.message.contains("nope.dsl"));
    }

    #[test]
    fn position_counts_lines_and_characters() {
        let script = Script::new("s.dsl", "Module A\n  Entity Ä;\n");
        assert_eq!(script.position(0), Position { line: 1, column: 1 });
        assert_eq!(script.position(9), Position { line: 2, column: 1 });
        // "  Entity " is 9 chars; 'Ä' is two bytes, ';' follows it.
        let semi = script.text().find(';').unwrap();
        assert_eq!(script.position(semi), Position { line: 2, column: 11 });
    }
}
