/// A decoded file: header names discovered at fetch time plus raw string cells.
///
/// Rows may be shorter than the header; missing cells read as empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Index of the first column whose name equals any candidate, tried in candidate order.
    pub fn find_column(&self, candidates: &[&str]) -> Option<(usize, &str)> {
        candidates.iter().find_map(|candidate| {
            self.columns
                .iter()
                .position(|c| c == candidate)
                .map(|idx| (idx, self.columns[idx].as_str()))
        })
    }
}
