//! Data model - the five entities extracted from a scan
//!
//! - `SourceFile`: a scanned file, identified by its filename
//! - `Tree`: a declared `TTree` and the variable holding it
//! - `Branch`: one leaf definition of a tree and its value variable
//! - `SourceComment`: a comment on a line mentioning a branch value variable
//! - `SourceAssign`: an assignment to a branch value variable
//!
//! Rows are written once and never updated.

use serde::Serialize;
use std::fmt;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(
    /// Surrogate key of a `srcfile` row
    FileId
);
row_id!(
    /// Surrogate key of a `tree` row
    TreeId
);
row_id!(
    /// Surrogate key of a `branch` row
    BranchId
);
row_id!(CommentId);
row_id!(AssignId);

/// A (file, line) pair recording where something was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub filename: String,
    /// 1-based line number
    pub line: u32,
}

impl Location {
    pub fn new(filename: impl Into<String>, line: u32) -> Self {
        Self {
            filename: filename.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.filename, self.line)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    pub id: FileId,
    pub filename: String,
}

/// A declared tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tree {
    pub id: TreeId,
    /// Name of the tree inside the ROOT file
    pub name: String,
    /// Human-readable title; empty for trees that are only extended
    pub title: String,
    /// C++ variable holding the tree
    pub tvar_name: String,
    pub file_id: FileId,
    pub line: u32,
}

/// One leaf definition belonging to a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branch {
    pub id: BranchId,
    pub tree_id: TreeId,
    pub name: String,
    /// Raw leaf definition text, e.g. `run/I`
    pub leaf_def: String,
    /// C++ variable holding the branch value
    pub value_var: String,
    pub file_id: FileId,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceComment {
    pub id: CommentId,
    pub text: String,
    pub branch_id: BranchId,
    pub file_id: FileId,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceAssign {
    pub id: AssignId,
    pub text: String,
    pub branch_id: BranchId,
    pub file_id: FileId,
    pub line: u32,
}

/// Fields of a tree row before it has an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTree<'a> {
    pub name: &'a str,
    pub title: &'a str,
    pub tvar_name: &'a str,
    pub file_id: FileId,
    pub line: u32,
}

/// Fields of a branch row before it has an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBranch<'a> {
    pub tree_id: TreeId,
    pub name: &'a str,
    pub leaf_def: &'a str,
    pub value_var: &'a str,
    pub file_id: FileId,
    pub line: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let loc = Location::new("Selection/a.cc", 42);
        assert_eq!(loc.to_string(), "Selection/a.cc:42");
    }

    #[test]
    fn test_ids_order_by_value() {
        assert!(TreeId(1) < TreeId(2));
        assert_eq!(BranchId(7).to_string(), "7");
    }
}
