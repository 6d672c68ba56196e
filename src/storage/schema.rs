//! Database schema definitions

/// Pragmas applied to every connection
pub const PRAGMAS: &str = "PRAGMA foreign_keys = ON;";

/// SQL to create the srcfile table
pub const CREATE_SRCFILE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS srcfile (
    fileid INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT NOT NULL UNIQUE
)
"#;

/// SQL to create the tree table
pub const CREATE_TREE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS tree (
    treeid INTEGER PRIMARY KEY AUTOINCREMENT,
    treename TEXT NOT NULL,
    treetitle TEXT NOT NULL DEFAULT '',
    tvarname TEXT NOT NULL,
    fileid INTEGER REFERENCES srcfile(fileid),
    fileline INTEGER NOT NULL
)
"#;

/// SQL to create the branch table
pub const CREATE_BRANCH_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS branch (
    branchid INTEGER PRIMARY KEY AUTOINCREMENT,
    treeid INTEGER REFERENCES tree(treeid),
    branchname TEXT NOT NULL,
    bleafdef TEXT NOT NULL,
    bvalvarname TEXT NOT NULL,
    fileid INTEGER REFERENCES srcfile(fileid),
    fileline INTEGER NOT NULL
)
"#;

/// SQL to create the srccomment table
/// Comments found on lines that mention a branch value variable
pub const CREATE_SRCCOMMENT_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS srccomment (
    commentid INTEGER PRIMARY KEY AUTOINCREMENT,
    commenttext TEXT NOT NULL,
    branchid INTEGER REFERENCES branch(branchid),
    fileid INTEGER REFERENCES srcfile(fileid),
    fileline INTEGER NOT NULL
)
"#;

/// SQL to create the srcassign table
pub const CREATE_SRCASSIGN_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS srcassign (
    assignid INTEGER PRIMARY KEY AUTOINCREMENT,
    assigntext TEXT NOT NULL,
    branchid INTEGER REFERENCES branch(branchid),
    fileid INTEGER REFERENCES srcfile(fileid),
    fileline INTEGER NOT NULL
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_tree_name ON tree(treename)",
    "CREATE INDEX IF NOT EXISTS idx_branch_tree ON branch(treeid)",
    "CREATE INDEX IF NOT EXISTS idx_srccomment_branch ON srccomment(branchid)",
    "CREATE INDEX IF NOT EXISTS idx_srcassign_branch ON srcassign(branchid)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_SRCFILE_TABLE,
        CREATE_TREE_TABLE,
        CREATE_BRANCH_TABLE,
        CREATE_SRCCOMMENT_TABLE,
        CREATE_SRCASSIGN_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}

/// Outer join from tree through branch to the union of comments and
/// assignments. One row per (tree, branch, comment|assign) combination;
/// trees without branches and branches without notes yield a single row.
/// A missing source file yields a NULL filename rather than dropping the row.
pub const SELECT_REPORT_ROWS: &str = r#"
SELECT
    tf.filename, t.fileline, t.treename, t.treetitle, t.tvarname,
    bf.filename, b.fileline, b.branchname, b.bleafdef, b.bvalvarname,
    n.kind, n.text, nf.filename, n.fileline
FROM tree t
LEFT JOIN srcfile tf ON tf.fileid = t.fileid
LEFT JOIN branch b ON b.treeid = t.treeid
LEFT JOIN srcfile bf ON bf.fileid = b.fileid
LEFT JOIN (
    SELECT 0 AS kind, commentid AS noteid, commenttext AS text, branchid, fileid, fileline
    FROM srccomment
    UNION ALL
    SELECT 1 AS kind, assignid AS noteid, assigntext AS text, branchid, fileid, fileline
    FROM srcassign
) n ON n.branchid = b.branchid
LEFT JOIN srcfile nf ON nf.fileid = n.fileid
ORDER BY t.treeid, b.branchid, n.kind, n.noteid
"#;

/// Counts rows whose foreign keys do not resolve to a parent row
pub const SELECT_ORPHAN_COUNT: &str = r#"
SELECT
    (SELECT COUNT(*) FROM tree t
        WHERE t.fileid IS NULL
           OR NOT EXISTS (SELECT 1 FROM srcfile f WHERE f.fileid = t.fileid))
  + (SELECT COUNT(*) FROM branch b
        WHERE b.treeid IS NULL OR b.fileid IS NULL
           OR NOT EXISTS (SELECT 1 FROM tree t WHERE t.treeid = b.treeid)
           OR NOT EXISTS (SELECT 1 FROM srcfile f WHERE f.fileid = b.fileid))
  + (SELECT COUNT(*) FROM srccomment c
        WHERE c.branchid IS NULL OR c.fileid IS NULL
           OR NOT EXISTS (SELECT 1 FROM branch b WHERE b.branchid = c.branchid)
           OR NOT EXISTS (SELECT 1 FROM srcfile f WHERE f.fileid = c.fileid))
  + (SELECT COUNT(*) FROM srcassign a
        WHERE a.branchid IS NULL OR a.fileid IS NULL
           OR NOT EXISTS (SELECT 1 FROM branch b WHERE b.branchid = a.branchid)
           OR NOT EXISTS (SELECT 1 FROM srcfile f WHERE f.fileid = a.fileid))
"#;
