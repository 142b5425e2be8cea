use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Raw sheet contents: rows of cells in document order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetTable {
    rows: Vec<Vec<String>>,
}

impl SheetTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self { rows: rows.into_iter().map(|row| row.into_iter().map(Into::into).collect()).collect() }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Rows strictly below `header_row`, paired with their 1-based sheet row number.
    pub fn rows_below(&self, header_row: usize) -> impl Iterator<Item = (usize, &[String])> {
        self.rows
            .iter()
            .enumerate()
            .skip(header_row.saturating_add(1))
            .map(|(index, row)| (index + 1, row.as_slice()))
    }

    pub fn header(&self, header_row: usize) -> Option<HeaderMap> {
        self.row(header_row).map(HeaderMap::from_cells)
    }
}

/// Column name to index mapping resolved once from a header row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderMap {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl HeaderMap {
    pub fn from_cells(cells: &[String]) -> Self {
        let names: Vec<String> = cells.iter().map(|cell| cell.trim().to_owned()).collect();
        let mut positions = HashMap::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            if !name.is_empty() {
                positions.entry(name.clone()).or_insert(index);
            }
        }
        Self { names, positions }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name.trim()).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Non-empty column names in sheet order, duplicates removed.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names
            .iter()
            .enumerate()
            .filter(|(index, name)| self.positions.get(name.as_str()) == Some(index))
            .map(|(_, name)| name.as_str())
    }
}

/// Removes every whitespace character, including the non-breaking spaces
/// spreadsheets use as thousands separators.
pub fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|ch| !ch.is_whitespace()).collect()
}
