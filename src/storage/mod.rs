//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - srcfile(fileid, filename)
//! - tree(treeid, treename, treetitle, tvarname, fileid, fileline)
//! - branch(branchid, treeid, branchname, bleafdef, bvalvarname, fileid, fileline)
//! - srccomment(commentid, commenttext, branchid, fileid, fileline)
//! - srcassign(assignid, assigntext, branchid, fileid, fileline)

pub mod schema;
pub mod sqlite;

pub use sqlite::{TreeStore, DbStats};
