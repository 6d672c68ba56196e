//! Loader - resolves scan events into store rows
//!
//! Every event names its parents. The loader maps those names to surrogate
//! ids and writes rows in event order. A reference to a tree or branch that
//! has not been seen is fatal: [`load`] rolls the whole run back rather than
//! leave a store with broken references.
//!
//! Tree names are resolved preferring a declaration in the same file, then
//! the most recent declaration in any file.

use std::collections::HashMap;
use crate::{Error, Result};
use crate::model::{BranchId, FileId, NewBranch, NewTree, TreeId};
use crate::scanner::ScanEvent;
use crate::storage::TreeStore;

/// Counts of rows written by one load
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct LoadStats {
    pub files: usize,
    pub trees: usize,
    pub branches: usize,
    pub comments: usize,
    pub assigns: usize,
    /// Tree declarations whose name was already declared earlier in the run
    pub duplicate_trees: usize,
}

impl std::fmt::Display for LoadStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} files, {} trees, {} branches, {} comments, {} assignments",
            self.files, self.trees, self.branches, self.comments, self.assigns
        )?;
        if self.duplicate_trees > 0 {
            write!(f, " ({} duplicate tree names)", self.duplicate_trees)?;
        }
        Ok(())
    }
}

/// A branch is identified by its tree, its name and the variable it fills
type BranchKey = (TreeId, String, String);

/// Writes events into a store, one at a time
pub struct Loader<'a> {
    store: &'a TreeStore,
    files: HashMap<String, FileId>,
    trees_in_file: HashMap<(String, FileId), TreeId>,
    latest_tree: HashMap<String, TreeId>,
    branches: HashMap<BranchKey, BranchId>,
    stats: LoadStats,
}

impl<'a> Loader<'a> {
    pub fn new(store: &'a TreeStore) -> Self {
        Self {
            store,
            files: HashMap::new(),
            trees_in_file: HashMap::new(),
            latest_tree: HashMap::new(),
            branches: HashMap::new(),
            stats: LoadStats::default(),
        }
    }

    /// Apply one event. References are resolved before anything is written.
    pub fn apply(&mut self, event: &ScanEvent) -> Result<()> {
        match event {
            ScanEvent::FileSeen { filename } => {
                self.file_id(filename, event)?;
            }
            ScanEvent::TreeFound {
                tree_name,
                tree_title,
                tvar_name,
                filename,
                line,
            } => {
                let file_id = self.file_id(filename, event)?;
                if let Some(previous) = self.latest_tree.get(tree_name) {
                    tracing::warn!(
                        "{}:{}: tree '{}' already declared (tree id {}); later branches resolve to this declaration",
                        filename, line, tree_name, previous
                    );
                    self.stats.duplicate_trees += 1;
                }
                let id = self.store.insert_tree(&NewTree {
                    name: tree_name,
                    title: tree_title,
                    tvar_name,
                    file_id,
                    line: *line,
                })?;
                tracing::debug!("{}:{}: tree {} -> {}", filename, line, tree_name, id);
                self.trees_in_file.insert((tree_name.clone(), file_id), id);
                self.latest_tree.insert(tree_name.clone(), id);
                self.stats.trees += 1;
            }
            ScanEvent::BranchFound {
                tree_name,
                branch_name,
                leaf_def,
                value_var,
                filename,
                line,
            } => {
                let file_id = self.file_id(filename, event)?;
                let tree_id = self
                    .resolve_tree(tree_name, file_id)
                    .ok_or_else(|| Error::UnknownTree {
                        tree: tree_name.clone(),
                        file: filename.clone(),
                        line: *line,
                    })?;
                let id = self.store.insert_branch(&NewBranch {
                    tree_id,
                    name: branch_name,
                    leaf_def,
                    value_var,
                    file_id,
                    line: *line,
                })?;
                self.branches
                    .insert((tree_id, branch_name.clone(), value_var.clone()), id);
                self.stats.branches += 1;
            }
            ScanEvent::CommentFound {
                tree_name,
                branch_name,
                value_var,
                text,
                filename,
                line,
            } => {
                let file_id = self.file_id(filename, event)?;
                let branch_id =
                    self.resolve_branch(tree_name, branch_name, value_var, file_id, filename, *line)?;
                self.store.insert_comment(text, branch_id, file_id, *line)?;
                self.stats.comments += 1;
            }
            ScanEvent::AssignFound {
                tree_name,
                branch_name,
                value_var,
                text,
                filename,
                line,
            } => {
                let file_id = self.file_id(filename, event)?;
                let branch_id =
                    self.resolve_branch(tree_name, branch_name, value_var, file_id, filename, *line)?;
                self.store.insert_assign(text, branch_id, file_id, *line)?;
                self.stats.assigns += 1;
            }
        }
        Ok(())
    }

    /// Statistics so far
    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    pub fn finish(self) -> LoadStats {
        self.stats
    }

    fn file_id(&mut self, filename: &str, event: &ScanEvent) -> Result<FileId> {
        if filename.is_empty() {
            return Err(Error::MissingFilename {
                entity: event.kind(),
                line: event.line().unwrap_or(0),
            });
        }
        if let Some(id) = self.files.get(filename) {
            return Ok(*id);
        }
        let id = self.store.insert_source_file(filename)?;
        self.files.insert(filename.to_string(), id);
        self.stats.files += 1;
        Ok(id)
    }

    fn resolve_tree(&self, tree_name: &str, file_id: FileId) -> Option<TreeId> {
        self.trees_in_file
            .get(&(tree_name.to_string(), file_id))
            .or_else(|| self.latest_tree.get(tree_name))
            .copied()
    }

    fn resolve_branch(
        &self,
        tree_name: &str,
        branch_name: &str,
        value_var: &str,
        file_id: FileId,
        filename: &str,
        line: u32,
    ) -> Result<BranchId> {
        self.resolve_tree(tree_name, file_id)
            .and_then(|tree_id| {
                self.branches
                    .get(&(tree_id, branch_name.to_string(), value_var.to_string()))
            })
            .copied()
            .ok_or_else(|| Error::UnknownBranch {
                tree: tree_name.to_string(),
                branch: branch_name.to_string(),
                file: filename.to_string(),
                line,
            })
    }
}

/// Load a whole event sequence in one transaction.
///
/// The first error, from the scanner or from resolution, rolls back every
/// row written by this call and is returned.
pub fn load<I>(store: &mut TreeStore, events: I) -> Result<LoadStats>
where
    I: IntoIterator<Item = Result<ScanEvent>>,
{
    store.begin_transaction()?;
    let result = {
        let mut loader = Loader::new(store);
        match events.into_iter().try_for_each(|event| loader.apply(&event?)) {
            Ok(()) => Ok(loader.finish()),
            Err(e) => Err(e),
        }
    };

    match result {
        Ok(stats) => {
            store.commit()?;
            tracing::info!("Loaded {}", stats);
            Ok(stats)
        }
        Err(e) => {
            tracing::error!("Load aborted: {}", e);
            store.rollback()?;
            Err(e)
        }
    }
}
