//! Scanner Framework
//!
//! A scanner reads one source file and reports what it recognizes as typed
//! [`ScanEvent`]s with file/line provenance. Events reference their parents
//! by name (tree name, and tree + branch name + value variable for notes) so
//! the loader never needs to track a "current" tree or branch.
//!
//! Within one file a scanner must emit a tree before any of its branches and
//! a branch before any of its comments or assignments.

pub mod ttree;

use crate::Result;
use crate::sources::SourcePath;
use std::collections::VecDeque;
use std::path::Path;

pub use ttree::TTreeScanner;

/// One recognized occurrence in a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A file was opened for scanning
    FileSeen { filename: String },
    /// A tree declaration
    TreeFound {
        tree_name: String,
        tree_title: String,
        tvar_name: String,
        filename: String,
        line: u32,
    },
    /// A branch declaration on a known tree
    BranchFound {
        tree_name: String,
        branch_name: String,
        leaf_def: String,
        value_var: String,
        filename: String,
        line: u32,
    },
    /// A comment on a line mentioning a branch value variable
    CommentFound {
        tree_name: String,
        branch_name: String,
        value_var: String,
        text: String,
        filename: String,
        line: u32,
    },
    /// An assignment to a branch value variable
    AssignFound {
        tree_name: String,
        branch_name: String,
        value_var: String,
        text: String,
        filename: String,
        line: u32,
    },
}

impl ScanEvent {
    /// Entity name used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            ScanEvent::FileSeen { .. } => "file",
            ScanEvent::TreeFound { .. } => "tree",
            ScanEvent::BranchFound { .. } => "branch",
            ScanEvent::CommentFound { .. } => "comment",
            ScanEvent::AssignFound { .. } => "assignment",
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            ScanEvent::FileSeen { filename }
            | ScanEvent::TreeFound { filename, .. }
            | ScanEvent::BranchFound { filename, .. }
            | ScanEvent::CommentFound { filename, .. }
            | ScanEvent::AssignFound { filename, .. } => filename,
        }
    }

    /// Line of the occurrence; `None` for `FileSeen`
    pub fn line(&self) -> Option<u32> {
        match self {
            ScanEvent::FileSeen { .. } => None,
            ScanEvent::TreeFound { line, .. }
            | ScanEvent::BranchFound { line, .. }
            | ScanEvent::CommentFound { line, .. }
            | ScanEvent::AssignFound { line, .. } => Some(*line),
        }
    }
}

/// Trait for source scanners
///
/// Each scanner is responsible for:
/// 1. Identifying files it can read
/// 2. Recognizing trees, branches, comments and assignments
/// 3. Emitting them in dependency order
pub trait Scanner {
    /// Get the scanner name (for display)
    fn name(&self) -> &str;

    /// Check if this scanner can handle a file
    fn can_handle(&self, path: &Path) -> bool;

    /// Scan one file's content; `filename` is recorded as provenance
    fn scan_source(&self, filename: &str, content: &str) -> Result<Vec<ScanEvent>>;
}

/// Registry of scanners
#[derive(Default)]
pub struct ScannerRegistry {
    scanners: Vec<Box<dyn Scanner>>,
}

impl ScannerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scanner
    pub fn register(&mut self, scanner: Box<dyn Scanner>) {
        self.scanners.push(scanner);
    }

    /// Find the first scanner that can handle a file
    pub fn find_scanner(&self, path: &Path) -> Option<&dyn Scanner> {
        self.scanners
            .iter()
            .find(|s| s.can_handle(path))
            .map(|s| s.as_ref())
    }

    /// Lazily scan `files` in order
    pub fn scan(&self, files: Vec<SourcePath>) -> ScanStream<'_> {
        ScanStream {
            registry: self,
            files: files.into_iter(),
            pending: VecDeque::new(),
            done: false,
        }
    }
}

/// Create a registry with the built-in scanners
pub fn default_registry() -> ScannerRegistry {
    let mut registry = ScannerRegistry::new();
    registry.register(Box::new(TTreeScanner::default()));
    registry
}

/// Lazy sequence of events over a list of files.
///
/// Each file is read only when the events of the previous one are drained.
/// The first error ends the stream.
pub struct ScanStream<'a> {
    registry: &'a ScannerRegistry,
    files: std::vec::IntoIter<SourcePath>,
    pending: VecDeque<ScanEvent>,
    done: bool,
}

impl ScanStream<'_> {
    fn scan_next_file(&mut self) -> Option<Result<()>> {
        for source in self.files.by_ref() {
            let Some(scanner) = self.registry.find_scanner(&source.path) else {
                tracing::debug!("No scanner for {}, skipping", source.path.display());
                continue;
            };
            let content = match source.read() {
                Ok(content) => content,
                Err(e) => return Some(Err(e)),
            };
            tracing::debug!("Scanning {} with {}", source.filename, scanner.name());
            return Some(
                scanner
                    .scan_source(&source.filename, &content)
                    .map(|events| self.pending.extend(events)),
            );
        }
        None
    }
}

impl Iterator for ScanStream<'_> {
    type Item = Result<ScanEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            match self.scan_next_file() {
                Some(Ok(())) => continue,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    return None;
                }
            }
        }
    }
}
