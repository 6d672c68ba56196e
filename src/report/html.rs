//! HTML exporter
//!
//! Renders the joined store as a single static `<table>`. Every source
//! location becomes a link built from the configured [`UrlTemplate`].

use std::io::Write;
use std::path::Path;
use crate::{Error, Result};
use crate::model::Location;
use crate::report::{ReportNote, ReportRow, UrlTemplate};
use crate::storage::TreeStore;

const STYLE: &str = r#"<style>
table, th, td {
  border-collapse: collapse;
  white-space: pre-line;
  border: 1px solid;
}
</style>
"#;

/// Column titles of the HTML table
pub const HTML_HEADER: [&str; 10] = [
    "Tree Location",
    "Tree Name",
    "Tree Title",
    "Tree Variable",
    "Branch Location",
    "Branch Name",
    "Leaf Def.",
    "Branch Value Variable",
    "Source File Comment",
    "Source File Assignment",
];

/// Write the joined store as an HTML table, returning the number of data rows
pub fn write_html<W: Write>(store: &TreeStore, template: &UrlTemplate, mut out: W) -> Result<usize> {
    let rows = store.report_rows()?;

    out.write_all(STYLE.as_bytes())?;
    out.write_all(b"<table>\n")?;
    out.write_all(th_row(&HTML_HEADER[..]).as_bytes())?;
    for row in &rows {
        out.write_all(td_row(cells(row, template).as_slice()).as_bytes())?;
    }
    out.write_all(b"</table>\n")?;
    out.flush()?;
    Ok(rows.len())
}

/// Write the HTML export to `path`
pub fn write_html_file(store: &TreeStore, template: &UrlTemplate, path: &Path) -> Result<usize> {
    let file = std::fs::File::create(path).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })?;
    let count = write_html(store, template, std::io::BufWriter::new(file))?;
    tracing::info!("Wrote {} rows to {}", count, path.display());
    Ok(count)
}

/// Escape text for use in HTML element content
pub fn escape(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// Anchor linking a location to the source browser; empty when the file is unknown
pub fn source_link(location: &Location, template: &UrlTemplate) -> String {
    if location.filename.is_empty() {
        return String::new();
    }
    format!(
        r#"<a href="{}">{}</a>"#,
        html_escape::encode_double_quoted_attribute(&template.render(&location.filename, location.line)),
        escape(&location.to_string())
    )
}

fn note_cell(note: Option<&ReportNote>, template: &UrlTemplate) -> String {
    match note {
        Some(n) => format!("{} {}", source_link(&n.location, template), escape(&n.text)),
        None => String::new(),
    }
}

fn cells(row: &ReportRow, template: &UrlTemplate) -> Vec<String> {
    let mut cells = vec![
        source_link(&row.tree_location, template),
        escape(&row.tree_name),
        escape(&row.tree_title),
        escape(&row.tvar_name),
    ];
    match &row.branch {
        Some(b) => cells.extend([
            source_link(&b.location, template),
            escape(&b.name),
            escape(&b.leaf_def),
            escape(&b.value_var),
        ]),
        None => cells.extend(std::iter::repeat_n(String::new(), 4)),
    }
    cells.push(note_cell(row.comment.as_ref(), template));
    cells.push(note_cell(row.assign.as_ref(), template));
    cells
}

fn td_row<S: AsRef<str>>(cells: &[S]) -> String {
    let inner: Vec<&str> = cells.iter().map(|c| c.as_ref()).collect();
    format!("<tr><td>{}</td></tr>\n", inner.join("</td>\n<td>"))
}

fn th_row<S: AsRef<str>>(cells: &[S]) -> String {
    let inner: Vec<&str> = cells.iter().map(|c| c.as_ref()).collect();
    format!("<tr><th>{}</th></tr>\n", inner.join("</th>\n<th>"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewBranch, NewTree};

    fn render(store: &TreeStore, template: &UrlTemplate) -> (usize, String) {
        let mut buf = Vec::new();
        let count = write_html(store, template, &mut buf).unwrap();
        (count, String::from_utf8(buf).unwrap())
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"a<b && "c">'d'"#), r#"a&lt;b &amp;&amp; "c"&gt;'d'"#);
    }

    #[test]
    fn test_link_attribute_is_quoted() {
        let template = UrlTemplate::new(r#"https://example.org/{file}?q="x"&l={line}"#).unwrap();
        let link = source_link(&Location::new("a.cc", 3), &template);
        assert_eq!(
            link,
            r#"<a href="https://example.org/a.cc?q=&quot;x&quot;&amp;l=3">a.cc:3</a>"#
        );
        let link = source_link(&Location::new("<b>.cc", 3), &template);
        assert!(link.ends_with(">&lt;b&gt;.cc:3</a>"));
        assert_eq!(source_link(&Location::new("", 3), &template), "");
    }

    #[test]
    fn test_empty_store_renders_header_only() {
        let store = TreeStore::open_in_memory().unwrap();
        let (count, html) = render(&store, &UrlTemplate::default());
        assert_eq!(count, 0);
        assert_eq!(html.matches("<table>").count(), 1);
        assert_eq!(html.matches("<tr>").count(), 1);
        assert!(html.contains("<th>Leaf Def.</th>"));
    }

    #[test]
    fn test_locations_are_linked() {
        let store = TreeStore::open_in_memory().unwrap();
        let f = store.insert_source_file("./src/a.cc").unwrap();
        let t = store
            .insert_tree(&NewTree { name: "T", title: "Title", tvar_name: "tv", file_id: f, line: 10 })
            .unwrap();
        let b = store
            .insert_branch(&NewBranch {
                tree_id: t,
                name: "nu_e",
                leaf_def: "nu_e/F",
                value_var: "_nu_e",
                file_id: f,
                line: 12,
            })
            .unwrap();
        store.insert_comment("float _nu_e; // energy <GeV>", b, f, 3).unwrap();

        let template = UrlTemplate::new("https://example.org/{file}?line={line}").unwrap();
        let (count, html) = render(&store, &template);
        assert_eq!(count, 1);
        assert!(html.contains(r#"<a href="https://example.org/src/a.cc?line=10">./src/a.cc:10</a>"#));
        assert!(html.contains(r#"<a href="https://example.org/src/a.cc?line=12">./src/a.cc:12</a>"#));
        assert!(html.contains("energy &lt;GeV&gt;"));
        assert_eq!(html.matches("<tr>").count(), 2);
    }
}
