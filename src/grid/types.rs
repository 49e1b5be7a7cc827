use std::collections::BTreeMap;

/// One concept across all survey years. `cells` holds only the years where
/// a source code exists; an absent year is an empty cell, never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRow {
    /// 1-based position, reassigned whenever rows are added or removed.
    pub row: u32,
    pub concept: String,
    pub required: bool,
    pub cells: BTreeMap<i32, String>,
}

impl GridRow {
    pub fn new(concept: impl Into<String>) -> Self {
        GridRow {
            row: 0,
            concept: concept.into(),
            required: false,
            cells: BTreeMap::new(),
        }
    }

    pub fn code(&self, year: i32) -> Option<&str> {
        self.cells.get(&year).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// The concept × year matrix of source codes. Once the merger has run this
/// is the frozen contract the materializer consumes.
#[derive(Debug, Clone)]
pub struct Grid {
    /// All years spanned by the grid, sorted ascending.
    pub years: Vec<i32>,
    pub rows: Vec<GridRow>,
}

impl Grid {
    pub fn new(mut years: Vec<i32>) -> Self {
        years.sort_unstable();
        years.dedup();
        Grid {
            years,
            rows: Vec::new(),
        }
    }

    pub fn find(&self, concept: &str) -> Option<&GridRow> {
        self.rows.iter().find(|r| r.concept == concept)
    }

    /// Reassign 1-based row numbers in current order.
    pub fn renumber(&mut self) {
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.row = (i + 1) as u32;
        }
    }
}
