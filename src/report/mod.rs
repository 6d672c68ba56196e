//! Report exporters
//!
//! Both exporters render the same joined view of the store: one row per
//! (tree, branch, comment | assignment) combination. Filenames replace the
//! internal file ids.

pub mod csv;
pub mod html;

use crate::model::Location;
use crate::{Error, Result};
use serde::Serialize;
use std::str::FromStr;

pub use self::csv::{write_csv, write_csv_file};
pub use html::{write_html, write_html_file};

/// Default link target for source locations
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://github.com/ubneutrinos/searchingfornues/blob/v30genie/{file}#L{line}";

/// One row of the joined tree/branch/note view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub tree_location: Location,
    pub tree_name: String,
    pub tree_title: String,
    pub tvar_name: String,
    pub branch: Option<ReportBranch>,
    pub comment: Option<ReportNote>,
    pub assign: Option<ReportNote>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportBranch {
    pub location: Location,
    pub name: String,
    pub leaf_def: String,
    pub value_var: String,
}

/// A comment or assignment line attached to a branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportNote {
    pub text: String,
    pub location: Location,
}

/// Builds source-browser links from `{file}` and `{line}` placeholders.
///
/// ```
/// use treeinfo::UrlTemplate;
///
/// let t: UrlTemplate = "https://example.org/src/{file}#L{line}".parse().unwrap();
/// assert_eq!(t.render("./a/b.cc", 7), "https://example.org/src/a/b.cc#L7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    template: String,
}

impl UrlTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains("{file}") {
            return Err(Error::InvalidTemplate(format!(
                "'{}' has no {{file}} placeholder",
                template
            )));
        }
        Ok(Self { template })
    }

    /// Expand the template for one source location.
    ///
    /// A leading `./` is dropped from the filename so list-file paths map
    /// onto repository-relative URLs.
    pub fn render(&self, filename: &str, line: u32) -> String {
        let file = filename.strip_prefix("./").unwrap_or(filename);
        self.template
            .replace("{file}", file)
            .replace("{line}", &line.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }
}

impl Default for UrlTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_URL_TEMPLATE.to_string(),
        }
    }
}

impl FromStr for UrlTemplate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}
