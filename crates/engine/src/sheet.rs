use gridfilter_core::CellRange;
use rustc_hash::FxHashMap;

use crate::catalog::TypedValue;
use crate::cell::{Cell, CellValue, NumberFormat};
use crate::dbdata::{DbCollection, DbRangeId};
use crate::filter::{evaluate_query, RowView};
use crate::query::QueryParam;
use crate::scenario::ScenarioStore;
use crate::sort::{sort_rows, SortParam, SortUndoItem};
use crate::validation::{ListSource, ResolvedList, ValidationStore};

/// One worksheet: cell storage plus the ranges, validations and scenarios
/// attached to it. This is the cell/document accessor the popup reads from.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    cells: FxHashMap<(usize, usize), Cell>,
    pub rows: usize,
    pub cols: usize,
    pub db_ranges: DbCollection,
    pub validations: ValidationStore,
    pub scenarios: ScenarioStore,
    /// Sort order and filter visibility (data space <-> view space)
    pub row_view: RowView,
}

impl Sheet {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            name: "Sheet1".to_string(),
            cells: FxHashMap::default(),
            rows,
            cols,
            db_ranges: DbCollection::default(),
            validations: ValidationStore::default(),
            scenarios: ScenarioStore::default(),
            row_view: RowView::new(rows),
        }
    }

    /// Set a cell from user input (numbers are detected, blanks clear the cell).
    pub fn set_value(&mut self, row: usize, col: usize, value: &str) {
        let value = CellValue::from_input(value);
        if value.is_empty() {
            self.clear_value(row, col);
            return;
        }
        self.cells.entry((row, col)).or_default().value = value;
    }

    pub fn set_number(&mut self, row: usize, col: usize, n: f64) {
        self.cells.entry((row, col)).or_default().value = CellValue::Number(n);
    }

    /// Clear the value but keep the number format.
    fn clear_value(&mut self, row: usize, col: usize) {
        if let Some(cell) = self.cells.get_mut(&(row, col)) {
            cell.value = CellValue::Empty;
        }
    }

    pub fn clear_cell(&mut self, row: usize, col: usize) {
        self.cells.remove(&(row, col));
    }

    pub fn set_number_format(&mut self, row: usize, col: usize, number_format: NumberFormat) {
        self.cells.entry((row, col)).or_default().format.number_format = number_format;
    }

    pub fn get_cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn get_value(&self, row: usize, col: usize) -> CellValue {
        self.cells
            .get(&(row, col))
            .map(|c| c.value.clone())
            .unwrap_or_default()
    }

    /// Rendered string as the grid shows it (number format applied).
    pub fn get_display(&self, row: usize, col: usize) -> String {
        self.cells
            .get(&(row, col))
            .map(|c| c.display())
            .unwrap_or_default()
    }

    pub fn get_number(&self, row: usize, col: usize) -> Option<f64> {
        self.cells.get(&(row, col)).and_then(|c| c.value.as_number())
    }

    pub fn is_empty_cell(&self, row: usize, col: usize) -> bool {
        self.cells
            .get(&(row, col))
            .map_or(true, |c| c.value.is_empty())
    }

    /// Typed rendering used for filter candidate lists; None for blank cells.
    pub fn typed_value(&self, row: usize, col: usize) -> Option<TypedValue> {
        let cell = self.cells.get(&(row, col))?;
        match &cell.value {
            CellValue::Empty => None,
            CellValue::Text(s) => Some(TypedValue::text(s.clone())),
            CellValue::Number(n) => Some(TypedValue::number(cell.display(), *n, cell.is_date())),
        }
    }

    /// Guess whether the first row of `area` is a column header: every
    /// non-empty cell in it is text, and the next row holds a non-text cell.
    pub fn has_col_header(&self, area: &CellRange) -> bool {
        if area.start_row == area.end_row {
            return false;
        }
        let first = area.start_row;
        let mut any_text = false;
        for col in area.start_col..=area.end_col {
            match self.get_value(first, col) {
                CellValue::Text(_) => any_text = true,
                CellValue::Empty => {}
                CellValue::Number(_) => return false,
            }
        }
        any_text && (area.start_col..=area.end_col).any(|col| !self.get_value(first + 1, col).is_text())
    }

    /// Resolve the list-validation items offered for a cell.
    pub fn get_list_items(&self, row: usize, col: usize) -> Option<ResolvedList> {
        let rule = self.validations.get(row, col)?;
        let mut items = match &rule.source {
            ListSource::Inline(values) => values.clone(),
            ListSource::Range(range) => range
                .cells()
                .filter(|&(r, c)| !self.is_empty_cell(r, c))
                .map(|(r, c)| self.get_display(r, c))
                .collect(),
        };
        if rule.sorted {
            items.sort_by_key(|s| s.to_lowercase());
        }
        Some(ResolvedList::from_items(items))
    }

    /// Header cells of autofilter-enabled ranges carry a drop-down button.
    pub fn has_autofilter_button(&self, row: usize, col: usize) -> bool {
        self.db_ranges.iter().any(|(_, db)| db.has_autofilter_button(row, col))
    }

    /// Re-evaluate row visibility for a database range using `param`.
    pub fn apply_query(&mut self, id: DbRangeId, param: &QueryParam) {
        let Some(db) = self.db_ranges.get(id) else {
            return;
        };
        let area = db.area();
        let mask = evaluate_query(param, &area, |row, col| self.typed_value(row, col));
        self.row_view.apply_filter_range(area.start_row, &mask);
    }

    /// Reorder rows according to `param`; returns the undo snapshot.
    pub fn apply_sort(&mut self, param: &SortParam) -> SortUndoItem {
        let (order, undo) = sort_rows(&self.row_view, param, |row, col| self.get_value(row, col));
        self.row_view.apply_sort(order);
        undo
    }
}
