use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct CountRow {
    #[tabled(rename = "Entity")]
    pub entity: String,
    #[tabled(rename = "Rows")]
    pub rows: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<CountRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, entity: &str, rows: &str) {
        self.rows.push(CountRow {
            entity: entity.to_string(),
            rows: rows.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table<S: AsRef<str>>(stats: &[(&str, S)]) -> String {
    let mut builder = TableBuilder::new();
    for (entity, rows) in stats {
        builder.add_row(entity, rows.as_ref());
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_is_blank() {
        assert!(TableBuilder::new().build().is_empty());
    }

    #[test]
    fn test_stats_table_lists_rows() {
        let table = stats_table(&[("Trees", "3"), ("Branches", "41")]);
        assert!(table.contains("Entity"));
        assert!(table.contains("Branches"));
        assert!(table.contains("41"));
    }
}
