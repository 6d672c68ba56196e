//! ROOT TTree scanner
//!
//! Recognizes the line-level idioms used to build ROOT trees in C++:
//!
//! - `tree = tfs->make<TTree>("name", "title")` or `tree = new TTree("name", "title")`
//! - `tree->Branch("name", &var, "leaf/D")` and its array, class and object forms
//! - comments and assignments on lines mentioning a branch value variable
//!
//! Each file is read in three passes (trees, branches, then notes) so that
//! every event's parent has been emitted before it.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;
use regex::Regex;
use crate::{Error, Result};
use super::{ScanEvent, Scanner};

/// Extensions handled unless configured otherwise
pub const DEFAULT_EXTENSIONS: &[&str] = &["cc", "cxx", "cpp", "c", "h", "hh", "hpp", "hxx", "C"];

static TTREE_MAKE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\w+) *= *\w+ *-> *make *< *TTree *> *\( *"(\w+)" *"#).unwrap()
});

static TTREE_NEW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\w+) *= *new *TTree *\( *"(\w+)" *"#).unwrap());

static TTREE_TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^, *"(.*)" *\)"#).unwrap());

static BRANCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\w+) *-> *Branch *\( *"(\w+)" *"#).unwrap());

// var, "leaf/T"
static BRANCH_LEAF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^, *&?([\w.]+) *, *"(\w+/?\w?)" *[,)]"#).unwrap());

// array, "leaf[n]/T"
static BRANCH_ARRAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^, *([\w.]+) *, *"(\w+\[\w+\]/?\w?)" *[,)]"#).unwrap());

// "ClassName", &var
static BRANCH_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^, *("[^"]+") *, *&?([\w.]+) *[,)]"#).unwrap());

// &object
static BRANCH_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^, *&?([\w.]+) *[,)]"#).unwrap());

static STRING_LITERAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(?:[^"\\]|\\.)*""#).unwrap());

static IDENT_CHAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_]\w*(?:\.[A-Za-z_]\w*)*").unwrap());

/// Scanner for C++ sources that create ROOT trees
pub struct TTreeScanner {
    extensions: Vec<String>,
}

impl Default for TTreeScanner {
    fn default() -> Self {
        Self::with_extensions(DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()))
    }
}

impl TTreeScanner {
    /// Create a scanner handling the given file extensions (without dot)
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
        }
    }
}

/// Parsed arguments of a `->Branch(` call after the branch name
#[derive(Debug, PartialEq, Eq)]
struct BranchArgs {
    value_var: String,
    leaf_def: String,
}

fn parse_branch_args(branch_name: &str, rest: &str) -> Option<BranchArgs> {
    if let Some(c) = BRANCH_LEAF_RE
        .captures(rest)
        .or_else(|| BRANCH_ARRAY_RE.captures(rest))
    {
        return Some(BranchArgs {
            value_var: c[1].to_string(),
            leaf_def: c[2].to_string(),
        });
    }
    if let Some(c) = BRANCH_CLASS_RE.captures(rest) {
        return Some(BranchArgs {
            value_var: c[2].to_string(),
            leaf_def: format!("{} ({})", branch_name, &c[1]),
        });
    }
    BRANCH_OBJECT_RE.captures(rest).map(|c| BranchArgs {
        value_var: c[1].to_string(),
        leaf_def: format!("{} (object)", branch_name),
    })
}

/// Identifiers on a line outside string literals, including dotted member
/// chains and their prefixes
fn line_tokens(line: &str) -> Vec<String> {
    let code = STRING_LITERAL_RE.replace_all(line, "\"\"");
    let mut seen = HashSet::new();
    let mut tokens = Vec::new();
    for m in IDENT_CHAIN_RE.find_iter(&code) {
        let chain = m.as_str();
        let mut candidates: Vec<&str> = chain.split('.').collect();
        candidates.extend(chain.match_indices('.').map(|(i, _)| &chain[..i]));
        candidates.push(chain);
        for c in candidates {
            if seen.insert(c) {
                tokens.push(c.to_string());
            }
        }
    }
    tokens
}

/// Branch reachable from a value variable
#[derive(Debug, Clone, PartialEq, Eq)]
struct BranchKey {
    tree_name: String,
    branch_name: String,
}

/// Comment and assignment patterns for one value variable
struct NotePatterns {
    comment: Regex,
    assign: Regex,
}

impl NotePatterns {
    fn for_var(var: &str) -> Result<Self> {
        let var = regex::escape(var);
        let build = |pattern: String| {
            Regex::new(&pattern).map_err(|e| Error::Config(format!("bad pattern for {}: {}", var, e)))
        };
        Ok(Self {
            comment: build(format!("{}.*/[/*]", var))?,
            assign: build(format!("{}[^=]*=[^=]", var))?,
        })
    }
}

impl Scanner for TTreeScanner {
    fn name(&self) -> &str {
        "ttree"
    }

    fn can_handle(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }

    fn scan_source(&self, filename: &str, content: &str) -> Result<Vec<ScanEvent>> {
        let mut events = vec![ScanEvent::FileSeen {
            filename: filename.to_string(),
        }];
        let numbered = || content.lines().zip(1u32..);

        // Pass 1: tree declarations
        let mut tree_by_tvar: HashMap<String, String> = HashMap::new();
        for (line, lineno) in numbered() {
            let Some(c) = TTREE_MAKE_RE
                .captures(line)
                .or_else(|| TTREE_NEW_RE.captures(line))
            else {
                continue;
            };
            let tvar_name = c[1].to_string();
            let tree_name = c[2].to_string();
            let end = c.get(0).map_or(line.len(), |m| m.end());
            let tree_title = TTREE_TITLE_RE
                .captures(&line[end..])
                .map(|t| t[1].to_string())
                .unwrap_or_else(|| line.trim().to_string());

            tree_by_tvar.insert(tvar_name.clone(), tree_name.clone());
            events.push(ScanEvent::TreeFound {
                tree_name,
                tree_title,
                tvar_name,
                filename: filename.to_string(),
                line: lineno,
            });
        }

        // Pass 2: branches
        let mut branches_by_var: HashMap<String, Vec<BranchKey>> = HashMap::new();
        let mut var_order: Vec<String> = Vec::new();
        for (line, lineno) in numbered() {
            let Some(c) = BRANCH_RE.captures(line) else {
                continue;
            };
            let tvar_name = &c[1];
            let branch_name = c[2].to_string();
            let end = c.get(0).map_or(line.len(), |m| m.end());
            let args = parse_branch_args(&branch_name, &line[end..]).ok_or_else(|| {
                Error::UnrecognizedBranch {
                    file: filename.to_string(),
                    line: lineno,
                    text: line.trim().to_string(),
                }
            })?;

            // A tree that is only read and extended here has no declaration
            // in this file; record it under its variable name.
            let tree_name = match tree_by_tvar.get(tvar_name) {
                Some(name) => name.clone(),
                None => {
                    tracing::debug!("{}:{}: ghost tree '{}'", filename, lineno, tvar_name);
                    tree_by_tvar.insert(tvar_name.to_string(), tvar_name.to_string());
                    events.push(ScanEvent::TreeFound {
                        tree_name: tvar_name.to_string(),
                        tree_title: String::new(),
                        tvar_name: tvar_name.to_string(),
                        filename: filename.to_string(),
                        line: lineno,
                    });
                    tvar_name.to_string()
                }
            };

            if !branches_by_var.contains_key(&args.value_var) {
                var_order.push(args.value_var.clone());
            }
            let key = BranchKey {
                tree_name: tree_name.clone(),
                branch_name: branch_name.clone(),
            };
            let keys = branches_by_var.entry(args.value_var.clone()).or_default();
            if !keys.contains(&key) {
                keys.push(key);
            }
            events.push(ScanEvent::BranchFound {
                tree_name,
                branch_name,
                leaf_def: args.leaf_def,
                value_var: args.value_var,
                filename: filename.to_string(),
                line: lineno,
            });
        }

        if branches_by_var.is_empty() {
            return Ok(events);
        }

        // Pass 3: comments and assignments
        let mut patterns: HashMap<&str, NotePatterns> = HashMap::new();
        for var in &var_order {
            patterns.insert(var.as_str(), NotePatterns::for_var(var)?);
        }
        for (raw, lineno) in numbered() {
            let line = raw.trim();
            if line.starts_with('#') {
                continue;
            }
            for token in line_tokens(line) {
                let (Some(keys), Some(p)) =
                    (branches_by_var.get(&token), patterns.get(token.as_str()))
                else {
                    continue;
                };
                let is_comment = p.comment.is_match(line);
                let is_assign = p.assign.is_match(line);
                for key in keys {
                    if is_comment {
                        events.push(ScanEvent::CommentFound {
                            tree_name: key.tree_name.clone(),
                            branch_name: key.branch_name.clone(),
                            value_var: token.clone(),
                            text: line.to_string(),
                            filename: filename.to_string(),
                            line: lineno,
                        });
                    }
                    if is_assign {
                        events.push(ScanEvent::AssignFound {
                            tree_name: key.tree_name.clone(),
                            branch_name: key.branch_name.clone(),
                            value_var: token.clone(),
                            text: line.to_string(),
                            filename: filename.to_string(),
                            line: lineno,
                        });
                    }
                }
            }
        }

        Ok(events)
    }
}
