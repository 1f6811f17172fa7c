//! Sort parameters and row sorting
//!
//! Sorting produces a new `RowView` permutation; cell storage never moves.
//!
//! # Invariants
//! - Header row (first row of the area, when flagged) never moves
//! - Rows outside the area stay in place
//! - Visibility is preserved (sorting doesn't unhide rows)
//! - Stable: equal keys keep their current view order
//! - Blanks sort last in both directions

use std::cmp::Ordering;

use gridfilter_core::CellRange;
use serde::{Deserialize, Serialize};

use crate::cell::CellValue;
use crate::filter::RowView;

/// Number of sort keys a parameter carries.
pub const SORT_KEY_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKeyState {
    pub do_sort: bool,
    /// Absolute column
    pub field: usize,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortParam {
    pub area: CellRange,
    pub has_header: bool,
    /// Rows are reordered (column sorting is not supported)
    pub by_row: bool,
    pub case_sensitive: bool,
    /// "item2" < "item10"
    pub natural: bool,
    /// Formats travel with their rows
    pub include_pattern: bool,
    pub in_place: bool,
    pub keys: [SortKeyState; SORT_KEY_COUNT],
}

impl SortParam {
    pub fn new(area: CellRange) -> Self {
        Self {
            area,
            has_header: true,
            by_row: true,
            case_sensitive: false,
            natural: false,
            include_pattern: true,
            in_place: true,
            keys: [SortKeyState::default(); SORT_KEY_COUNT],
        }
    }

    /// Single-column sort as issued by the filter popup: key 0 is forced onto
    /// `col`, every other key is switched off. None when `col` lies outside
    /// the area.
    pub fn for_column(&self, col: usize, ascending: bool, has_header: bool) -> Option<SortParam> {
        if !self.area.contains_col(col) {
            return None;
        }
        let mut param = self.clone();
        param.has_header = has_header;
        param.by_row = true;
        param.case_sensitive = false;
        param.natural = false;
        param.include_pattern = true;
        param.in_place = true;
        param.keys[0] = SortKeyState {
            do_sort: true,
            field: col,
            ascending,
        };
        for key in param.keys.iter_mut().skip(1) {
            key.do_sort = false;
        }
        Some(param)
    }

    pub fn active_keys(&self) -> impl Iterator<Item = &SortKeyState> {
        self.keys.iter().filter(|k| k.do_sort)
    }
}

/// Undo item for sort operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortUndoItem {
    /// Row order before this sort
    pub previous_row_order: Vec<usize>,
}

/// Numbers(0) < Text(1) < Blank(2)
fn type_rank(value: &CellValue) -> u8 {
    match value {
        CellValue::Number(_) => 0,
        CellValue::Text(_) => 1,
        CellValue::Empty => 2,
    }
}

/// Compare strings with embedded digit runs ordered numerically.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();
    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let mut left = String::new();
                while let Some(c) = a.peek().copied().filter(char::is_ascii_digit) {
                    left.push(c);
                    a.next();
                }
                let mut right = String::new();
                while let Some(c) = b.peek().copied().filter(char::is_ascii_digit) {
                    right.push(c);
                    b.next();
                }
                let left = left.trim_start_matches('0');
                let right = right.trim_start_matches('0');
                let ord = left.len().cmp(&right.len()).then_with(|| left.cmp(right));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                a.next();
                b.next();
            }
        }
    }
}

fn compare_text(a: &str, b: &str, param: &SortParam) -> Ordering {
    let (a, b) = if param.case_sensitive {
        (a.to_string(), b.to_string())
    } else {
        (a.to_lowercase(), b.to_lowercase())
    };
    if param.natural {
        natural_cmp(&a, &b)
    } else {
        a.cmp(&b)
    }
}

fn compare_values(a: &CellValue, b: &CellValue, key: &SortKeyState, param: &SortParam) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        // Blanks stay last even when descending
        if a.is_empty() || b.is_empty() {
            return rank;
        }
        return if key.ascending { rank } else { rank.reverse() };
    }
    let ord = match (a, b) {
        (CellValue::Number(x), CellValue::Number(y)) => x.total_cmp(y),
        (CellValue::Text(x), CellValue::Text(y)) => compare_text(x, y, param),
        _ => Ordering::Equal,
    };
    if key.ascending {
        ord
    } else {
        ord.reverse()
    }
}

/// Sort the rows of `param.area` by its active keys.
///
/// `value_at` returns the value of (data_row, col). Returns the new row
/// order to apply via `RowView::apply_sort`, plus the undo snapshot.
pub fn sort_rows<F>(row_view: &RowView, param: &SortParam, value_at: F) -> (Vec<usize>, SortUndoItem)
where
    F: Fn(usize, usize) -> CellValue,
{
    let current_order = row_view.row_order();
    let undo = SortUndoItem {
        previous_row_order: current_order.to_vec(),
    };

    let data_start = param.area.start_row + usize::from(param.has_header);
    let data_end = param.area.end_row;
    let keys: Vec<SortKeyState> = param.active_keys().copied().collect();
    if keys.is_empty() || data_start > data_end {
        return (current_order.to_vec(), undo);
    }
    let in_range = |data_row: usize| data_row >= data_start && data_row <= data_end;

    // (key values, view_row); sort_by is stable so ties keep view order
    let mut sortable: Vec<(Vec<CellValue>, usize)> = current_order
        .iter()
        .enumerate()
        .filter(|&(_, &data_row)| in_range(data_row))
        .map(|(view_row, &data_row)| {
            let values = keys.iter().map(|k| value_at(data_row, k.field)).collect();
            (values, view_row)
        })
        .collect();

    sortable.sort_by(|(a, _), (b, _)| {
        keys.iter()
            .zip(a.iter().zip(b.iter()))
            .map(|(key, (x, y))| compare_values(x, y, key, param))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });

    let mut sorted = sortable.into_iter().map(|(_, view_row)| current_order[view_row]);
    let new_order = current_order
        .iter()
        .map(|&data_row| {
            if in_range(data_row) {
                sorted.next().unwrap_or(data_row)
            } else {
                data_row
            }
        })
        .collect();

    log::info!(
        "sorted rows {}..={} by {} key(s)",
        data_start,
        data_end,
        keys.len()
    );
    (new_order, undo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    fn setup() -> (RowView, SortParam, FxHashMap<(usize, usize), CellValue>) {
        let row_view = RowView::new(8);
        let param = SortParam::new(CellRange::new(0, 0, 6, 1));
        let mut values = FxHashMap::default();
        values.insert((0, 0), CellValue::Text("Qty".into()));
        values.insert((1, 0), CellValue::Number(30.0));
        values.insert((2, 0), CellValue::Number(10.0));
        values.insert((3, 0), CellValue::Text("n/a".into()));
        values.insert((5, 0), CellValue::Number(10.0));
        values.insert((6, 0), CellValue::Number(20.0));
        // Row 4 is blank, row 7 is outside the area
        values.insert((7, 0), CellValue::Number(1.0));
        (row_view, param, values)
    }

    #[test]
    fn test_for_column_forces_single_key() {
        let mut base = SortParam::new(CellRange::new(0, 0, 6, 3));
        base.keys[1] = SortKeyState { do_sort: true, field: 2, ascending: true };
        base.case_sensitive = true;

        let param = base.for_column(1, false, true).unwrap();
        assert_eq!(param.keys[0], SortKeyState { do_sort: true, field: 1, ascending: false });
        assert!(!param.keys[1].do_sort && !param.keys[2].do_sort);
        assert!(!param.case_sensitive);
        assert_eq!(param.active_keys().count(), 1);

        assert!(base.for_column(9, true, true).is_none());
    }

    #[test]
    fn test_ascending_blanks_last_header_fixed() {
        let (row_view, base, values) = setup();
        let param = base.for_column(0, true, true).unwrap();
        let (order, undo) = sort_rows(&row_view, &param, |r, c| {
            values.get(&(r, c)).cloned().unwrap_or_default()
        });
        // 10 (row 2), 10 (row 5), 20, 30, text, blank; row 7 untouched
        assert_eq!(order, vec![0, 2, 5, 6, 1, 3, 4, 7]);
        assert_eq!(undo.previous_row_order, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_descending_keeps_blanks_last() {
        let (row_view, base, values) = setup();
        let param = base.for_column(0, false, true).unwrap();
        let (order, _) = sort_rows(&row_view, &param, |r, c| {
            values.get(&(r, c)).cloned().unwrap_or_default()
        });
        // text, 30, 20, 10 (row 2), 10 (row 5), blank
        assert_eq!(order, vec![0, 3, 1, 6, 2, 5, 4, 7]);
    }

    #[test]
    fn test_sort_preserves_visibility() {
        let (mut row_view, base, values) = setup();
        row_view.apply_filter_range(0, &[true, true, false, true, true, true, true, true]);
        let param = base.for_column(0, true, true).unwrap();
        let (order, _) = sort_rows(&row_view, &param, |r, c| {
            values.get(&(r, c)).cloned().unwrap_or_default()
        });
        row_view.apply_sort(order);
        assert!(!row_view.is_data_row_visible(2));
        assert_eq!(row_view.visible_count(), 7);
        assert_eq!(row_view.view_to_data(0), Some(0));
    }

    #[test]
    fn test_natural_compare() {
        assert_eq!(natural_cmp("item2", "item10"), Ordering::Less);
        assert_eq!(natural_cmp("item010", "item10"), Ordering::Equal);
        assert_eq!(natural_cmp("a", "b"), Ordering::Less);
        assert_eq!("item2".cmp("item10"), Ordering::Greater);
    }
}
