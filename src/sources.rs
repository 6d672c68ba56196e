//! Source selection
//!
//! Files to scan come either from a list file (one path per line) or from
//! walking directories. Walks honour `.gitignore`/`.ignore` files plus a set
//! of default and user-supplied exclude patterns.

use crate::{Error, Result};
use ignore::WalkBuilder;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Path, PathBuf};

/// A file to scan and the name recorded for it in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePath {
    pub path: PathBuf,
    pub filename: String,
}

impl SourcePath {
    pub fn new(path: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            filename: filename.into(),
        }
    }

    /// Use the path as given for both reading and provenance
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let filename = path.to_string_lossy().into_owned();
        Self { path, filename }
    }

    /// Read the file, replacing invalid UTF-8 rather than failing on it
    pub fn read(&self) -> Result<String> {
        let bytes = std::fs::read(&self.path).map_err(|source| Error::Read {
            path: self.path.clone(),
            source,
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Read a list file naming one source per line.
///
/// Blank lines and lines starting with `#` are skipped. Paths are recorded
/// exactly as written.
pub fn read_file_list(list: &Path) -> Result<Vec<SourcePath>> {
    let contents = std::fs::read_to_string(list).map_err(|source| Error::Read {
        path: list.to_path_buf(),
        source,
    })?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(SourcePath::from_path)
        .collect())
}

/// Exclude patterns applied on top of ignore files during a walk
pub struct ExcludeFilter {
    inner: Gitignore,
}

impl ExcludeFilter {
    pub fn new(root: &Path, extra_excludes: &[String]) -> Self {
        let mut builder = GitignoreBuilder::new(root);

        // Build output and VCS metadata never holds tree definitions
        let defaults = [
            "target/", "build/", "out/", ".git/", ".svn/",
            "*.root", "*.db", "*.o", "*.so", "*.a", "*.pyc",
        ];
        for pattern in defaults {
            builder.add_line(None, pattern).ok();
        }

        for pattern in extra_excludes {
            if let Err(e) = builder.add_line(None, pattern) {
                tracing::warn!("Ignoring invalid exclude pattern '{}': {}", pattern, e);
            }
        }

        Self {
            inner: builder.build().unwrap_or_else(|_| Gitignore::empty()),
        }
    }

    pub fn is_excluded(&self, path: &Path, is_dir: bool) -> bool {
        self.inner.matched_path_or_any_parents(path, is_dir).is_ignore()
    }
}

/// Provenance name of a walked file: its path below `root`, `/`-separated
fn relative_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Walk `root` in file-name order and keep files accepted by `accept`.
///
/// Files are read through their full path but recorded relative to `root`.
pub fn walk<F>(root: &Path, extra_excludes: &[String], accept: F) -> Result<Vec<SourcePath>>
where
    F: Fn(&Path) -> bool,
{
    if root.is_file() {
        return Ok(if accept(root) {
            vec![SourcePath::from_path(root)]
        } else {
            Vec::new()
        });
    }

    let filter = ExcludeFilter::new(root, extra_excludes);
    let mut sources = Vec::new();
    let walker = WalkBuilder::new(root)
        .require_git(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    for entry in walker {
        let entry = entry.map_err(|e| Error::Io(std::io::Error::other(e)))?;
        let path = entry.path();
        let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
        if is_dir || filter.is_excluded(path, false) || !accept(path) {
            continue;
        }
        sources.push(SourcePath::new(path, relative_name(root, path)));
    }

    tracing::debug!("Found {} source files under {}", sources.len(), root.display());
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::UrlTemplate;

    fn is_cc(path: &Path) -> bool {
        path.extension().is_some_and(|e| e == "cc")
    }

    #[test]
    fn test_read_file_list_skips_blank_and_comments() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("files.txt");
        std::fs::write(&list, "./a.cc\n\n# old\n  ./b/c.cc  \n").unwrap();

        let sources = read_file_list(&list).unwrap();
        let names: Vec<_> = sources.iter().map(|s| s.filename.as_str()).collect();
        assert_eq!(names, vec!["./a.cc", "./b/c.cc"]);
    }

    #[test]
    fn test_missing_list_is_read_error() {
        let err = read_file_list(Path::new("/nonexistent/files.txt")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn test_walk_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::create_dir_all(root.join("build")).unwrap();
        std::fs::create_dir_all(root.join("skipme")).unwrap();
        std::fs::write(root.join("b.cc"), "").unwrap();
        std::fs::write(root.join("a.cc"), "").unwrap();
        std::fs::write(root.join("notes.txt"), "").unwrap();
        std::fs::write(root.join("sub/c.cc"), "").unwrap();
        std::fs::write(root.join("build/gen.cc"), "").unwrap();
        std::fs::write(root.join("skipme/d.cc"), "").unwrap();

        let sources = walk(root, &["skipme/".to_string()], is_cc).unwrap();
        let names: Vec<_> = sources.iter().map(|s| s.filename.as_str()).collect();
        assert_eq!(names, vec!["a.cc", "b.cc", "sub/c.cc"]);
        assert!(sources.iter().all(|s| s.path.starts_with(root)));
    }

    #[test]
    fn test_walk_records_names_below_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("Selection")).unwrap();
        std::fs::write(root.join("Selection/a.cc"), "").unwrap();

        let sources = walk(root, &[], |_| true).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].filename, "Selection/a.cc");
        assert_eq!(sources[0].path, root.join("Selection/a.cc"));
        assert_eq!(
            UrlTemplate::default().render(&sources[0].filename, 7),
            "https://github.com/ubneutrinos/searchingfornues/blob/v30genie/Selection/a.cc#L7"
        );
    }

    #[test]
    fn test_walk_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("x.cc");
        std::fs::write(&file, "").unwrap();
        assert_eq!(walk(&file, &[], is_cc).unwrap().len(), 1);
    }
}
