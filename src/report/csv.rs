//! CSV exporter

use std::io::Write;
use std::path::Path;
use crate::{Error, Result};
use crate::report::{ReportNote, ReportRow};
use crate::storage::TreeStore;

/// Fixed column order of the CSV export
pub const CSV_HEADER: [&str; 16] = [
    "tree_file",
    "tree_line",
    "tree_name",
    "tree_title",
    "tree_variable",
    "branch_file",
    "branch_line",
    "branch_name",
    "leaf_def",
    "branch_value_variable",
    "comment_text",
    "comment_file",
    "comment_line",
    "assign_text",
    "assign_file",
    "assign_line",
];

/// Write the joined store as CSV, returning the number of data rows
pub fn write_csv<W: Write>(store: &TreeStore, out: W) -> Result<usize> {
    let rows = store.report_rows()?;
    let mut wrt = ::csv::Writer::from_writer(out);
    wrt.write_record(CSV_HEADER)?;
    for row in &rows {
        wrt.write_record(record(row))?;
    }
    wrt.flush()?;
    Ok(rows.len())
}

/// Write the CSV export to `path`
pub fn write_csv_file(store: &TreeStore, path: &Path) -> Result<usize> {
    let file = std::fs::File::create(path).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })?;
    let count = write_csv(store, std::io::BufWriter::new(file))?;
    tracing::info!("Wrote {} rows to {}", count, path.display());
    Ok(count)
}

fn record(row: &ReportRow) -> Vec<String> {
    let mut fields = vec![
        row.tree_location.filename.clone(),
        row.tree_location.line.to_string(),
        row.tree_name.clone(),
        row.tree_title.clone(),
        row.tvar_name.clone(),
    ];
    match &row.branch {
        Some(b) => fields.extend([
            b.location.filename.clone(),
            b.location.line.to_string(),
            b.name.clone(),
            b.leaf_def.clone(),
            b.value_var.clone(),
        ]),
        None => fields.extend(std::iter::repeat_n(String::new(), 5)),
    }
    push_note(&mut fields, row.comment.as_ref());
    push_note(&mut fields, row.assign.as_ref());
    fields
}

fn push_note(fields: &mut Vec<String>, note: Option<&ReportNote>) {
    match note {
        Some(n) => fields.extend([
            n.text.clone(),
            n.location.filename.clone(),
            n.location.line.to_string(),
        ]),
        None => fields.extend(std::iter::repeat_n(String::new(), 3)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewBranch, NewTree};

    fn export(store: &TreeStore) -> (usize, String) {
        let mut buf = Vec::new();
        let count = write_csv(store, &mut buf).unwrap();
        (count, String::from_utf8(buf).unwrap())
    }

    #[test]
    fn test_header_only_for_empty_store() {
        let store = TreeStore::open_in_memory().unwrap();
        let (count, text) = export(&store);
        assert_eq!(count, 0);
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("tree_file,tree_line,tree_name"));
    }

    #[test]
    fn test_tree_without_branches_has_empty_fields() {
        let store = TreeStore::open_in_memory().unwrap();
        let f = store.insert_source_file("a.cc").unwrap();
        store
            .insert_tree(&NewTree { name: "T", title: "Title", tvar_name: "tv", file_id: f, line: 3 })
            .unwrap();

        let (count, text) = export(&store);
        assert_eq!(count, 1);
        let data = text.lines().nth(1).unwrap();
        assert_eq!(data, "a.cc,3,T,Title,tv,,,,,,,,,,,");
    }

    #[test]
    fn test_fields_are_quoted() {
        let store = TreeStore::open_in_memory().unwrap();
        let f = store.insert_source_file("a.cc").unwrap();
        let t = store
            .insert_tree(&NewTree { name: "T", title: "a, b", tvar_name: "tv", file_id: f, line: 3 })
            .unwrap();
        let b = store
            .insert_branch(&NewBranch {
                tree_id: t,
                name: "obj",
                leaf_def: "obj (\"std::vector<int>\")",
                value_var: "_v",
                file_id: f,
                line: 4,
            })
            .unwrap();
        store.insert_assign("_v = x;", b, f, 9).unwrap();

        let (_, text) = export(&store);
        let mut rdr = ::csv::Reader::from_reader(text.as_bytes());
        let rec = rdr.records().next().unwrap().unwrap();
        assert_eq!(&rec[3], "a, b");
        assert_eq!(&rec[8], "obj (\"std::vector<int>\")");
        assert_eq!(&rec[10], "");
        assert_eq!(&rec[13], "_v = x;");
        assert_eq!(&rec[15], "9");
    }
}
