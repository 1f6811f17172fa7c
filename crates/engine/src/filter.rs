//! Row visibility - view layer plus query evaluation
//!
//! `RowView` maps between:
//! - View space (what the user sees, affected by sort/filter)
//! - Data space (canonical storage, row 0..N-1)
//!
//! Key invariants:
//! - visible_mask is indexed by DATA row (not view row)
//! - Sorting never changes visibility, filtering never changes order
//! - The header row of a filtered range is always visible

use gridfilter_core::CellRange;
use rustc_hash::FxHashSet;

use crate::catalog::TypedValue;
use crate::query::{Connector, ItemKind, QueryEntry, QueryOp, QueryParam};

// =============================================================================
// RowView
// =============================================================================

/// Row view layer: maps between view space and data space
#[derive(Debug, Clone, Default)]
pub struct RowView {
    /// view_row -> data_row (identity until sorted)
    row_order: Vec<usize>,
    /// data_row -> view_row, rebuilt whenever row_order changes
    data_to_view_map: Vec<usize>,
    /// true = visible, indexed by data row
    visible_mask: Vec<bool>,
    /// Visible view rows in order
    visible_rows: Vec<usize>,
}

impl RowView {
    pub fn new(row_count: usize) -> Self {
        Self {
            row_order: (0..row_count).collect(),
            data_to_view_map: (0..row_count).collect(),
            visible_mask: vec![true; row_count],
            visible_rows: (0..row_count).collect(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_order.len()
    }

    pub fn visible_count(&self) -> usize {
        self.visible_rows.len()
    }

    pub fn view_to_data(&self, view_row: usize) -> Option<usize> {
        self.row_order.get(view_row).copied()
    }

    /// None if the data row is hidden by a filter
    pub fn data_to_view(&self, data_row: usize) -> Option<usize> {
        if self.is_data_row_visible(data_row) {
            self.data_to_view_map.get(data_row).copied()
        } else {
            None
        }
    }

    pub fn is_data_row_visible(&self, data_row: usize) -> bool {
        self.visible_mask.get(data_row).copied().unwrap_or(false)
    }

    pub fn visible_rows(&self) -> &[usize] {
        &self.visible_rows
    }

    pub fn is_filtered(&self) -> bool {
        self.visible_count() < self.row_count()
    }

    /// Non-identity order?
    pub fn is_sorted(&self) -> bool {
        self.row_order.iter().enumerate().any(|(i, &d)| i != d)
    }

    pub fn row_order(&self) -> &[usize] {
        &self.row_order
    }

    pub fn visible_mask(&self) -> &[bool] {
        &self.visible_mask
    }

    fn rebuild_inverse_map(&mut self) {
        self.data_to_view_map.resize(self.row_order.len(), 0);
        for (view_row, &data_row) in self.row_order.iter().enumerate() {
            if let Some(slot) = self.data_to_view_map.get_mut(data_row) {
                *slot = view_row;
            }
        }
    }

    fn rebuild_visible_cache(&mut self) {
        let mask = &self.visible_mask;
        self.visible_rows = self
            .row_order
            .iter()
            .enumerate()
            .filter(|&(_, &data_row)| mask.get(data_row).copied().unwrap_or(false))
            .map(|(view_row, _)| view_row)
            .collect();
    }

    /// Apply a sort permutation (new_view_row -> data_row)
    pub fn apply_sort(&mut self, permutation: Vec<usize>) {
        self.row_order = permutation;
        self.rebuild_inverse_map();
        self.rebuild_visible_cache();
    }

    pub fn clear_sort(&mut self) {
        self.row_order = (0..self.row_order.len()).collect();
        self.rebuild_inverse_map();
        self.rebuild_visible_cache();
    }

    /// Replace visibility for the data rows `first_row..first_row + mask.len()`.
    /// Rows outside that span keep their current state.
    pub fn apply_filter_range(&mut self, first_row: usize, mask: &[bool]) {
        for (offset, &visible) in mask.iter().enumerate() {
            if let Some(slot) = self.visible_mask.get_mut(first_row + offset) {
                *slot = visible;
            }
        }
        self.rebuild_visible_cache();
    }

    pub fn clear_filter(&mut self) {
        self.visible_mask = vec![true; self.row_order.len()];
        self.rebuild_visible_cache();
    }
}

// =============================================================================
// Query evaluation
// =============================================================================

/// Compiled form of one active entry.
struct EntryPredicate<'a> {
    entry: &'a QueryEntry,
    /// Normalized item strings for Equal / NotEqual
    strings: FxHashSet<String>,
    /// Minimum (TopN) or maximum (BottomN) value that still passes
    threshold: Option<f64>,
}

fn normalize(s: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        s.to_string()
    } else {
        s.to_lowercase()
    }
}

/// Parse the N of a ranking entry ("10", or a value item).
fn ranking_count(entry: &QueryEntry) -> usize {
    entry
        .first_item()
        .and_then(|item| item.as_number())
        .filter(|n| n.is_finite() && *n > 0.0)
        .map_or(0, |n| n as usize)
}

/// Threshold value for ranking operators, from the column's numbers.
fn ranking_threshold(entry: &QueryEntry, mut numbers: Vec<f64>) -> Option<f64> {
    if numbers.is_empty() {
        return None;
    }
    let count = match entry.op {
        QueryOp::TopN | QueryOp::BottomN => ranking_count(entry),
        _ => {
            let percent = ranking_count(entry).min(100);
            (numbers.len() * percent).div_ceil(100)
        }
    };
    if count == 0 {
        return None;
    }
    let count = count.min(numbers.len());
    numbers.sort_by(|a, b| a.total_cmp(b));
    match entry.op {
        QueryOp::TopN | QueryOp::TopPercent => numbers.get(numbers.len() - count).copied(),
        _ => numbers.get(count - 1).copied(),
    }
}

impl<'a> EntryPredicate<'a> {
    fn compile<F>(entry: &'a QueryEntry, param: &QueryParam, data_rows: &[usize], value_at: &F) -> Self
    where
        F: Fn(usize, usize) -> Option<TypedValue>,
    {
        let strings = match entry.op {
            QueryOp::Equal | QueryOp::NotEqual => entry
                .items
                .iter()
                .map(|item| normalize(&item.string, param.case_sensitive))
                .collect(),
            _ => FxHashSet::default(),
        };
        let threshold = if entry.op.is_ranking() {
            let numbers: Vec<f64> = data_rows
                .iter()
                .filter_map(|&row| value_at(row, entry.field).and_then(|v| v.value))
                .collect();
            ranking_threshold(entry, numbers)
        } else {
            None
        };
        Self { entry, strings, threshold }
    }

    fn matches(&self, cell: Option<&TypedValue>, case_sensitive: bool) -> bool {
        let entry = self.entry;
        let Some(cell) = cell else {
            // Blank cells only satisfy the emptiness test and the negations
            return matches!(
                entry.op,
                QueryOp::IsEmpty | QueryOp::NotEqual | QueryOp::DoesNotContain
            );
        };
        let text = normalize(&cell.text, case_sensitive);
        match entry.op {
            QueryOp::Equal => {
                self.strings.contains(&text)
                    || entry.items.iter().any(|item| match (item.kind, cell.value) {
                        (ItemKind::ByValue, Some(v)) => item.value.0 == v,
                        _ => false,
                    })
            }
            QueryOp::NotEqual => !self.strings.contains(&text),
            QueryOp::Less | QueryOp::LessEqual | QueryOp::Greater | QueryOp::GreaterEqual => {
                let Some(item) = entry.first_item() else {
                    return false;
                };
                let ordering = match (cell.value, item.as_number()) {
                    (Some(a), Some(b)) => a.partial_cmp(&b),
                    _ => Some(text.cmp(&normalize(&item.string, case_sensitive))),
                };
                let Some(ordering) = ordering else {
                    return false;
                };
                match entry.op {
                    QueryOp::Less => ordering.is_lt(),
                    QueryOp::LessEqual => ordering.is_le(),
                    QueryOp::Greater => ordering.is_gt(),
                    _ => ordering.is_ge(),
                }
            }
            QueryOp::TopN | QueryOp::TopPercent => match (self.threshold, cell.value) {
                (Some(t), Some(v)) => v >= t,
                _ => false,
            },
            QueryOp::BottomN | QueryOp::BottomPercent => match (self.threshold, cell.value) {
                (Some(t), Some(v)) => v <= t,
                _ => false,
            },
            QueryOp::Contains
            | QueryOp::DoesNotContain
            | QueryOp::BeginsWith
            | QueryOp::EndsWith => {
                let needle = entry
                    .first_item()
                    .map(|item| normalize(&item.string, case_sensitive))
                    .unwrap_or_default();
                match entry.op {
                    QueryOp::Contains => text.contains(&needle),
                    QueryOp::DoesNotContain => !text.contains(&needle),
                    QueryOp::BeginsWith => text.starts_with(&needle),
                    _ => text.ends_with(&needle),
                }
            }
            QueryOp::IsEmpty => false,
            QueryOp::IsNotEmpty => true,
        }
    }
}

/// Evaluate `param` over `area`, one flag per row of the area (true = visible).
///
/// Active entries are folded left to right: AND narrows, OR widens. With a
/// header, the first row is always visible and excluded from rankings.
pub fn evaluate_query<F>(param: &QueryParam, area: &CellRange, value_at: F) -> Vec<bool>
where
    F: Fn(usize, usize) -> Option<TypedValue>,
{
    let rows: Vec<usize> = (area.start_row..=area.end_row).collect();
    let data_rows: &[usize] = if param.has_header && !rows.is_empty() {
        &rows[1..]
    } else {
        &rows
    };

    let predicates: Vec<EntryPredicate> = param
        .active_entries()
        .map(|entry| EntryPredicate::compile(entry, param, data_rows, &value_at))
        .collect();

    rows.iter()
        .enumerate()
        .map(|(i, &row)| {
            if param.has_header && i == 0 {
                return true;
            }
            let mut visible: Option<bool> = None;
            for predicate in &predicates {
                let cell = value_at(row, predicate.entry.field);
                let hit = predicate.matches(cell.as_ref(), param.case_sensitive);
                visible = Some(match (visible, predicate.entry.connector) {
                    (None, _) => hit,
                    (Some(acc), Connector::And) => acc && hit,
                    (Some(acc), Connector::Or) => acc || hit,
                });
            }
            visible.unwrap_or(true)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryItem;
    use rustc_hash::FxHashMap;

    #[test]
    fn test_row_view_identity() {
        let view = RowView::new(5);
        assert_eq!(view.row_count(), 5);
        assert_eq!(view.visible_count(), 5);
        for i in 0..5 {
            assert_eq!(view.view_to_data(i), Some(i));
            assert_eq!(view.data_to_view(i), Some(i));
        }
        assert!(!view.is_sorted());
        assert!(!view.is_filtered());
    }

    #[test]
    fn test_row_view_sort_keeps_visibility() {
        let mut view = RowView::new(5);
        view.apply_filter_range(0, &[true, false, true, false, true]);
        view.apply_sort(vec![4, 3, 2, 1, 0]);

        assert!(view.is_sorted());
        assert_eq!(view.view_to_data(0), Some(4));
        assert_eq!(view.data_to_view(4), Some(0));
        assert_eq!(view.data_to_view(1), None);
        assert_eq!(view.visible_rows(), &[0, 2, 4]);

        view.clear_sort();
        assert!(!view.is_sorted());
    }

    #[test]
    fn test_apply_filter_range_touches_only_span() {
        let mut view = RowView::new(6);
        view.apply_filter_range(2, &[false, true, false]);
        assert_eq!(view.visible_mask(), &[true, true, false, true, false, true]);

        view.clear_filter();
        assert!(!view.is_filtered());
    }

    fn column(values: &[&str]) -> FxHashMap<(usize, usize), TypedValue> {
        let mut map = FxHashMap::default();
        for (row, s) in values.iter().enumerate() {
            if s.is_empty() {
                continue;
            }
            let value = match s.parse::<f64>() {
                Ok(n) => TypedValue::number(s.to_string(), n, false),
                Err(_) => TypedValue::text(s.to_string()),
            };
            map.insert((row, 0), value);
        }
        map
    }

    fn evaluate(param: &QueryParam, values: &[&str]) -> Vec<bool> {
        let cells = column(values);
        let area = CellRange::new(0, 0, values.len() - 1, 0);
        evaluate_query(param, &area, |r, c| cells.get(&(r, c)).cloned())
    }

    fn add(param: &mut QueryParam, field: usize) -> &mut QueryEntry {
        let entry = param.find_entry_by_field(field, true).unwrap().unwrap();
        entry.active = true;
        entry
    }

    #[test]
    fn test_no_entries_shows_everything() {
        let param = QueryParam::new(4);
        assert_eq!(evaluate(&param, &["H", "a", "", "b"]), vec![true; 4]);
    }

    #[test]
    fn test_equal_set_case_insensitive() {
        let mut param = QueryParam::new(4);
        add(&mut param, 0).set_equal_items(vec![QueryItem::string("apple"), QueryItem::string("Pear")]);
        let mask = evaluate(&param, &["Fruit", "Apple", "pear", "Plum", ""]);
        assert_eq!(mask, vec![true, true, true, false, false]);

        param.case_sensitive = true;
        let mask = evaluate(&param, &["Fruit", "Apple", "Pear", "Plum"]);
        assert_eq!(mask, vec![true, false, true, false]);
    }

    #[test]
    fn test_empty_tests() {
        let mut param = QueryParam::new(4);
        add(&mut param, 0).set_query_by_empty();
        assert_eq!(evaluate(&param, &["H", "x", "", "y"]), vec![true, false, true, false]);

        add(&mut param, 0).set_query_by_non_empty();
        assert_eq!(evaluate(&param, &["H", "x", "", "y"]), vec![true, true, false, true]);
    }

    #[test]
    fn test_top_n_uses_ranking() {
        let mut param = QueryParam::new(4);
        add(&mut param, 0).set_top_n(2);
        let mask = evaluate(&param, &["N", "5", "40", "text", "7", "40"]);
        // Top two values are 40 and 40
        assert_eq!(mask, vec![true, false, true, false, false, true]);
    }

    #[test]
    fn test_bottom_percent() {
        let mut param = QueryParam::new(4);
        let entry = add(&mut param, 0);
        entry.op = QueryOp::BottomPercent;
        entry.items = vec![QueryItem::value(50.0)];
        let mask = evaluate(&param, &["N", "1", "2", "3", "4"]);
        assert_eq!(mask, vec![true, true, true, false, false]);
    }

    #[test]
    fn test_connectors_fold_left_to_right() {
        let mut param = QueryParam::new(4);
        param.has_header = false;
        let first = add(&mut param, 0);
        first.op = QueryOp::Greater;
        first.items = vec![QueryItem::value(10.0)];

        // Second entry on the same column via a raw slot (OR chain)
        let second = param.entry_mut(1).unwrap();
        second.field = 0;
        second.active = true;
        second.connector = Connector::Or;
        second.op = QueryOp::Equal;
        second.items = vec![QueryItem::string("3")];

        let mask = evaluate(&param, &["3", "20", "5", "11"]);
        assert_eq!(mask, vec![true, true, false, true]);

        param.entry_mut(1).unwrap().connector = Connector::And;
        let mask = evaluate(&param, &["3", "20", "5", "11"]);
        assert_eq!(mask, vec![false, false, false, false]);
    }

    #[test]
    fn test_text_operators() {
        let mut param = QueryParam::new(4);
        let entry = add(&mut param, 0);
        entry.op = QueryOp::BeginsWith;
        entry.items = vec![QueryItem::string("ap")];
        let mask = evaluate(&param, &["H", "Apple", "grape", "apricot"]);
        assert_eq!(mask, vec![true, true, false, true]);

        let entry = add(&mut param, 0);
        entry.op = QueryOp::Contains;
        entry.items = vec![QueryItem::string("AP")];
        let mask = evaluate(&param, &["H", "Apple", "grape", "kiwi"]);
        assert_eq!(mask, vec![true, true, true, false]);
    }
}
