//! SQLite storage implementation

use std::path::Path;
use rusqlite::{Connection, params, OptionalExtension};
use crate::Result;
use crate::model::{
    AssignId, Branch, BranchId, CommentId, FileId, Location, NewBranch, NewTree, SourceAssign,
    SourceComment, SourceFile, Tree, TreeId,
};
use crate::report::{ReportBranch, ReportNote, ReportRow};
use super::schema;

/// SQLite-backed storage for the extracted tree tables
pub struct TreeStore {
    conn: Connection,
}

impl TreeStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.create_schema()?;
        Ok(store)
    }

    /// Remove any existing database at `path` and open a fresh one.
    ///
    /// Every scan starts from an empty store; there is no merge with a
    /// previous run.
    pub fn create(path: &Path) -> Result<Self> {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!("Removed previous database {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Self::open(path)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.create_schema()?;
        Ok(store)
    }

    /// Create all tables and indexes if absent
    pub fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(schema::PRAGMAS)?;
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Source File Operations ==========

    /// Return the id registered for `filename`, inserting it on first use
    pub fn insert_source_file(&self, filename: &str) -> Result<FileId> {
        if let Some(id) = self.find_source_file(filename)? {
            return Ok(id);
        }
        self.conn.execute("INSERT INTO srcfile (filename) VALUES (?1)", [filename])?;
        Ok(FileId(self.conn.last_insert_rowid()))
    }

    /// Look up a file id by filename
    pub fn find_source_file(&self, filename: &str) -> Result<Option<FileId>> {
        self.conn
            .query_row(
                "SELECT fileid FROM srcfile WHERE filename = ?1",
                [filename],
                |row| row.get(0).map(FileId),
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn get_source_file(&self, id: FileId) -> Result<Option<SourceFile>> {
        self.conn
            .query_row(
                "SELECT fileid, filename FROM srcfile WHERE fileid = ?1",
                [id.0],
                |row| {
                    Ok(SourceFile {
                        id: FileId(row.get(0)?),
                        filename: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// All source files in id order
    pub fn source_files(&self) -> Result<Vec<SourceFile>> {
        let mut stmt = self.conn.prepare("SELECT fileid, filename FROM srcfile ORDER BY fileid")?;
        let files = stmt
            .query_map([], |row| {
                Ok(SourceFile {
                    id: FileId(row.get(0)?),
                    filename: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }

    // ========== Tree Operations ==========

    pub fn insert_tree(&self, tree: &NewTree<'_>) -> Result<TreeId> {
        self.conn.execute(
            r#"
            INSERT INTO tree (treename, treetitle, tvarname, fileid, fileline)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![tree.name, tree.title, tree.tvar_name, tree.file_id.0, tree.line],
        )?;
        Ok(TreeId(self.conn.last_insert_rowid()))
    }

    pub fn get_tree(&self, id: TreeId) -> Result<Option<Tree>> {
        self.conn
            .query_row(
                "SELECT treeid, treename, treetitle, tvarname, fileid, fileline FROM tree WHERE treeid = ?1",
                [id.0],
                Self::row_to_tree,
            )
            .optional()
            .map_err(Into::into)
    }

    /// All trees in declaration order
    pub fn trees(&self) -> Result<Vec<Tree>> {
        let mut stmt = self.conn.prepare(
            "SELECT treeid, treename, treetitle, tvarname, fileid, fileline FROM tree ORDER BY treeid",
        )?;
        let trees = stmt
            .query_map([], Self::row_to_tree)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(trees)
    }

    fn row_to_tree(row: &rusqlite::Row) -> rusqlite::Result<Tree> {
        Ok(Tree {
            id: TreeId(row.get(0)?),
            name: row.get(1)?,
            title: row.get(2)?,
            tvar_name: row.get(3)?,
            file_id: FileId(row.get(4)?),
            line: row.get(5)?,
        })
    }

    // ========== Branch Operations ==========

    pub fn insert_branch(&self, branch: &NewBranch<'_>) -> Result<BranchId> {
        self.conn.execute(
            r#"
            INSERT INTO branch (treeid, branchname, bleafdef, bvalvarname, fileid, fileline)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                branch.tree_id.0,
                branch.name,
                branch.leaf_def,
                branch.value_var,
                branch.file_id.0,
                branch.line,
            ],
        )?;
        Ok(BranchId(self.conn.last_insert_rowid()))
    }

    pub fn get_branch(&self, id: BranchId) -> Result<Option<Branch>> {
        self.conn
            .query_row(
                "SELECT branchid, treeid, branchname, bleafdef, bvalvarname, fileid, fileline FROM branch WHERE branchid = ?1",
                [id.0],
                Self::row_to_branch,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Branches of a tree in declaration order
    pub fn branches_of(&self, tree: TreeId) -> Result<Vec<Branch>> {
        let mut stmt = self.conn.prepare(
            "SELECT branchid, treeid, branchname, bleafdef, bvalvarname, fileid, fileline FROM branch WHERE treeid = ?1 ORDER BY branchid",
        )?;
        let branches = stmt
            .query_map([tree.0], Self::row_to_branch)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(branches)
    }

    fn row_to_branch(row: &rusqlite::Row) -> rusqlite::Result<Branch> {
        Ok(Branch {
            id: BranchId(row.get(0)?),
            tree_id: TreeId(row.get(1)?),
            name: row.get(2)?,
            leaf_def: row.get(3)?,
            value_var: row.get(4)?,
            file_id: FileId(row.get(5)?),
            line: row.get(6)?,
        })
    }

    // ========== Comment / Assignment Operations ==========

    pub fn insert_comment(&self, text: &str, branch: BranchId, file: FileId, line: u32) -> Result<CommentId> {
        self.conn.execute(
            "INSERT INTO srccomment (commenttext, branchid, fileid, fileline) VALUES (?1, ?2, ?3, ?4)",
            params![text, branch.0, file.0, line],
        )?;
        Ok(CommentId(self.conn.last_insert_rowid()))
    }

    pub fn insert_assign(&self, text: &str, branch: BranchId, file: FileId, line: u32) -> Result<AssignId> {
        self.conn.execute(
            "INSERT INTO srcassign (assigntext, branchid, fileid, fileline) VALUES (?1, ?2, ?3, ?4)",
            params![text, branch.0, file.0, line],
        )?;
        Ok(AssignId(self.conn.last_insert_rowid()))
    }

    pub fn comments_of(&self, branch: BranchId) -> Result<Vec<SourceComment>> {
        let mut stmt = self.conn.prepare(
            "SELECT commentid, commenttext, branchid, fileid, fileline FROM srccomment WHERE branchid = ?1 ORDER BY commentid",
        )?;
        let comments = stmt
            .query_map([branch.0], |row| {
                Ok(SourceComment {
                    id: CommentId(row.get(0)?),
                    text: row.get(1)?,
                    branch_id: BranchId(row.get(2)?),
                    file_id: FileId(row.get(3)?),
                    line: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(comments)
    }

    pub fn assigns_of(&self, branch: BranchId) -> Result<Vec<SourceAssign>> {
        let mut stmt = self.conn.prepare(
            "SELECT assignid, assigntext, branchid, fileid, fileline FROM srcassign WHERE branchid = ?1 ORDER BY assignid",
        )?;
        let assigns = stmt
            .query_map([branch.0], |row| {
                Ok(SourceAssign {
                    id: AssignId(row.get(0)?),
                    text: row.get(1)?,
                    branch_id: BranchId(row.get(2)?),
                    file_id: FileId(row.get(3)?),
                    line: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(assigns)
    }

    // ========== Report Operations ==========

    /// Rows of the joined tree/branch/note view, shared by all exporters
    pub fn report_rows(&self) -> Result<Vec<ReportRow>> {
        let mut stmt = self.conn.prepare(schema::SELECT_REPORT_ROWS)?;
        let rows = stmt
            .query_map([], Self::row_to_report)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn row_to_report(row: &rusqlite::Row) -> rusqlite::Result<ReportRow> {
        let location = |file: usize, line: usize| -> rusqlite::Result<Location> {
            let filename: Option<String> = row.get(file)?;
            Ok(Location::new(filename.unwrap_or_default(), row.get(line)?))
        };

        let branch_name: Option<String> = row.get(7)?;
        let branch = match branch_name {
            Some(name) => Some(ReportBranch {
                location: location(5, 6)?,
                name,
                leaf_def: row.get(8)?,
                value_var: row.get(9)?,
            }),
            None => None,
        };

        let kind: Option<i64> = row.get(10)?;
        let note = match kind {
            Some(_) => Some(ReportNote {
                text: row.get(11)?,
                location: location(12, 13)?,
            }),
            None => None,
        };
        let (comment, assign) = match kind {
            Some(0) => (note, None),
            _ => (None, note),
        };

        Ok(ReportRow {
            tree_location: location(0, 1)?,
            tree_name: row.get(2)?,
            tree_title: row.get(3)?,
            tvar_name: row.get(4)?,
            branch,
            comment,
            assign,
        })
    }

    // ========== Integrity ==========

    /// Number of rows whose foreign keys do not resolve
    pub fn orphan_count(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(schema::SELECT_ORPHAN_COUNT, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn count(&self, table: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn count_source_files(&self) -> Result<usize> {
        self.count("srcfile")
    }

    pub fn count_trees(&self) -> Result<usize> {
        self.count("tree")
    }

    pub fn count_branches(&self) -> Result<usize> {
        self.count("branch")
    }

    pub fn count_comments(&self) -> Result<usize> {
        self.count("srccomment")
    }

    pub fn count_assigns(&self) -> Result<usize> {
        self.count("srcassign")
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        Ok(DbStats {
            source_files: self.count_source_files()?,
            trees: self.count_trees()?,
            branches: self.count_branches()?,
            comments: self.count_comments()?,
            assigns: self.count_assigns()?,
            orphans: self.orphan_count()?,
        })
    }

    // ========== Bulk Operations ==========

    /// Begin a transaction for bulk operations
    pub fn begin_transaction(&mut self) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", [])?;
        Ok(())
    }

    /// Commit a transaction
    pub fn commit(&mut self) -> Result<()> {
        self.conn.execute("COMMIT", [])?;
        Ok(())
    }

    /// Rollback a transaction
    pub fn rollback(&mut self) -> Result<()> {
        self.conn.execute("ROLLBACK", [])?;
        Ok(())
    }
}

/// Database statistics
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DbStats {
    pub source_files: usize,
    pub trees: usize,
    pub branches: usize,
    pub comments: usize,
    pub assigns: usize,
    pub orphans: usize,
}

impl DbStats {
    /// Label/value pairs in display order
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Source files", self.source_files.to_string()),
            ("Trees", self.trees.to_string()),
            ("Branches", self.branches.to_string()),
            ("Comments", self.comments.to_string()),
            ("Assignments", self.assigns.to_string()),
            ("Orphan rows", self.orphans.to_string()),
        ]
    }
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        for (label, value) in self.rows() {
            writeln!(f, "  {}: {}", label, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree<'a>(name: &'a str, file_id: FileId, line: u32) -> NewTree<'a> {
        NewTree {
            name,
            title: "Title",
            tvar_name: "_tree",
            file_id,
            line,
        }
    }

    fn branch<'a>(tree_id: TreeId, name: &'a str, file_id: FileId, line: u32) -> NewBranch<'a> {
        NewBranch {
            tree_id,
            name,
            leaf_def: "x/I",
            value_var: "_x",
            file_id,
            line,
        }
    }

    #[test]
    fn test_source_file_dedup() {
        let store = TreeStore::open_in_memory().unwrap();

        let a = store.insert_source_file("a.cc").unwrap();
        let b = store.insert_source_file("b.cc").unwrap();
        let a_again = store.insert_source_file("a.cc").unwrap();

        assert_eq!(a, a_again);
        assert_ne!(a, b);
        assert_eq!(store.count_source_files().unwrap(), 2);
        assert_eq!(store.get_source_file(b).unwrap().unwrap().filename, "b.cc");
        let names: Vec<_> = store.source_files().unwrap().into_iter().map(|f| f.filename).collect();
        assert_eq!(names, vec!["a.cc", "b.cc"]);
    }

    #[test]
    fn test_create_schema_is_idempotent() {
        let store = TreeStore::open_in_memory().unwrap();
        store.insert_source_file("a.cc").unwrap();
        store.create_schema().unwrap();
        store.create_schema().unwrap();
        assert_eq!(store.count_source_files().unwrap(), 1);
    }

    #[test]
    fn test_ids_follow_insertion_order() {
        let store = TreeStore::open_in_memory().unwrap();
        let f = store.insert_source_file("a.cc").unwrap();

        let t1 = store.insert_tree(&tree("A", f, 1)).unwrap();
        let t2 = store.insert_tree(&tree("B", f, 2)).unwrap();
        assert!(t1 < t2);

        let names: Vec<_> = store.trees().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(store.get_tree(t2).unwrap().unwrap().line, 2);
        assert!(store.get_tree(TreeId(42)).unwrap().is_none());
    }

    #[test]
    fn test_branch_and_notes_crud() {
        let store = TreeStore::open_in_memory().unwrap();
        let f = store.insert_source_file("a.cc").unwrap();
        let t = store.insert_tree(&tree("Events", f, 10)).unwrap();
        let b = store.insert_branch(&branch(t, "run", f, 12)).unwrap();
        store.insert_comment("_x = 0; // run number", b, f, 20).unwrap();
        store.insert_assign("_x = 0; // run number", b, f, 20).unwrap();

        let stored = store.get_branch(b).unwrap().unwrap();
        assert_eq!(stored.tree_id, t);
        assert_eq!(stored.line, 12);
        assert_eq!(store.branches_of(t).unwrap().len(), 1);
        assert_eq!(store.comments_of(b).unwrap()[0].line, 20);
        assert_eq!(store.assigns_of(b).unwrap()[0].text, "_x = 0; // run number");
        assert_eq!(store.orphan_count().unwrap(), 0);
    }

    #[test]
    fn test_foreign_keys_are_enforced() {
        let store = TreeStore::open_in_memory().unwrap();
        let f = store.insert_source_file("a.cc").unwrap();
        let result = store.insert_branch(&branch(TreeId(99), "run", f, 1));
        assert!(result.is_err());
    }

    #[test]
    fn test_report_rows_outer_join() {
        let store = TreeStore::open_in_memory().unwrap();
        let f = store.insert_source_file("a.cc").unwrap();
        let g = store.insert_source_file("b.cc").unwrap();

        store.insert_tree(&tree("Empty", f, 1)).unwrap();
        let t = store.insert_tree(&tree("Events", f, 5)).unwrap();
        store.insert_branch(&branch(t, "quiet", f, 6)).unwrap();
        let noisy = store.insert_branch(&branch(t, "noisy", f, 7)).unwrap();
        store.insert_assign("_y = 1;", noisy, g, 30).unwrap();
        store.insert_comment("// y", noisy, g, 29).unwrap();

        let rows = store.report_rows().unwrap();
        assert_eq!(rows.len(), 4);

        assert_eq!(rows[0].tree_name, "Empty");
        assert!(rows[0].branch.is_none());
        assert!(rows[0].comment.is_none() && rows[0].assign.is_none());

        assert_eq!(rows[1].branch.as_ref().unwrap().name, "quiet");
        assert!(rows[1].comment.is_none() && rows[1].assign.is_none());

        // comments sort before assignments for the same branch
        let c = rows[2].comment.as_ref().unwrap();
        assert_eq!(c.location, Location::new("b.cc", 29));
        assert!(rows[2].assign.is_none());
        let a = rows[3].assign.as_ref().unwrap();
        assert_eq!(a.text, "_y = 1;");
        assert!(rows[3].comment.is_none());
    }

    #[test]
    fn test_orphan_count_finds_dangling_rows() {
        let store = TreeStore::open_in_memory().unwrap();
        let f = store.insert_source_file("a.cc").unwrap();
        let t = store.insert_tree(&tree("Events", f, 1)).unwrap();
        let b = store.insert_branch(&branch(t, "run", f, 2)).unwrap();
        assert_eq!(store.orphan_count().unwrap(), 0);

        store.conn.execute_batch("PRAGMA foreign_keys = OFF;").unwrap();
        store
            .conn
            .execute(
                "INSERT INTO branch (treeid, branchname, bleafdef, bvalvarname, fileid, fileline) VALUES (99, 'lost', 'lost/I', '_lost', ?1, 3)",
                params![f.0],
            )
            .unwrap();
        store
            .conn
            .execute(
                "INSERT INTO srccomment (commenttext, branchid, fileid, fileline) VALUES ('// run', ?1, NULL, 4)",
                params![b.0],
            )
            .unwrap();

        assert_eq!(store.orphan_count().unwrap(), 2);
        assert_eq!(store.stats().unwrap().orphans, 2);
    }

    #[test]
    fn test_report_rows_tolerate_missing_file() {
        let store = TreeStore::open_in_memory().unwrap();
        let f = store.insert_source_file("a.cc").unwrap();
        let t = store.insert_tree(&tree("Events", f, 1)).unwrap();
        let b = store.insert_branch(&branch(t, "run", f, 2)).unwrap();

        store.conn.execute_batch("PRAGMA foreign_keys = OFF;").unwrap();
        store
            .conn
            .execute(
                "INSERT INTO srcassign (assigntext, branchid, fileid, fileline) VALUES ('_run = 1;', ?1, NULL, 4)",
                params![b.0],
            )
            .unwrap();
        store.conn.execute("UPDATE branch SET fileid = NULL", []).unwrap();

        let rows = store.report_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tree_location, Location::new("a.cc", 1));
        assert_eq!(rows[0].branch.as_ref().unwrap().location, Location::new("", 2));
        assert_eq!(rows[0].assign.as_ref().unwrap().location, Location::new("", 4));
    }

    #[test]
    fn test_create_discards_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("treeinfo.db");

        {
            let store = TreeStore::open(&path).unwrap();
            store.insert_source_file("old.cc").unwrap();
        }
        let store = TreeStore::create(&path).unwrap();
        assert_eq!(store.count_source_files().unwrap(), 0);
    }

    #[test]
    fn test_stats() {
        let store = TreeStore::open_in_memory().unwrap();
        let f = store.insert_source_file("a.cc").unwrap();
        let t = store.insert_tree(&tree("Events", f, 5)).unwrap();
        store.insert_branch(&branch(t, "run", f, 6)).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.source_files, 1);
        assert_eq!(stats.trees, 1);
        assert_eq!(stats.branches, 1);
        assert_eq!(stats.orphans, 0);
        assert!(stats.to_string().contains("Branches: 1"));
    }
}
