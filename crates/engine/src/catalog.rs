//! Filter Entry Catalog - distinct candidate values for a filter popup

use gridfilter_core::CellRange;
use rustc_hash::FxHashSet;

use crate::sheet::Sheet;

/// Rendered cell value, with the number behind it when there is one.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    /// String as the grid renders it
    pub text: String,
    pub value: Option<f64>,
    /// Cell format is in the date/time category
    pub is_date: bool,
}

impl TypedValue {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            value: None,
            is_date: false,
        }
    }

    pub fn number(text: impl Into<String>, value: f64, is_date: bool) -> Self {
        Self {
            text: text.into(),
            value: Some(value),
            is_date,
        }
    }
}

/// Candidate Value Set for one column. Rebuilt on every popup open.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterEntries {
    /// Distinct renderings in first-seen order
    pub values: Vec<TypedValue>,
    pub has_dates: bool,
}

impl FilterEntries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Large candidate lists let the host show a busy indicator while populating.
    pub fn needs_busy_indicator(&self, threshold: usize) -> bool {
        self.values.len() > threshold
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypedValue> {
        self.values.iter()
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|v| v.text.as_str())
    }
}

/// Scan column `col` of `area` once and collect its distinct renderings.
///
/// Rows are visited in view order, so after a sort the candidates follow
/// what the grid shows. Blank cells are skipped. Duplicates are detected on the rendered string,
/// case-insensitively unless `case_sensitive`; the first rendering seen wins.
pub fn collect_distinct_values(
    sheet: &Sheet,
    col: usize,
    area: &CellRange,
    include_header: bool,
    case_sensitive: bool,
) -> FilterEntries {
    let mut entries = FilterEntries::default();
    if !area.contains_col(col) {
        return entries;
    }

    let first_row = if include_header {
        area.start_row
    } else {
        area.start_row + 1
    };

    let data_rows = first_row..=area.end_row;
    let mut seen: FxHashSet<String> = FxHashSet::default();
    for row in sheet.row_view.row_order().iter().copied().filter(|row| data_rows.contains(row)) {
        let Some(value) = sheet.typed_value(row, col) else {
            continue;
        };
        let key = if case_sensitive {
            value.text.clone()
        } else {
            value.text.to_lowercase()
        };
        if !seen.insert(key) {
            continue;
        }
        entries.has_dates |= value.is_date;
        entries.values.push(value);
    }

    log::debug!(
        "collected {} distinct values for column {} (dates: {})",
        entries.len(),
        col,
        entries.has_dates
    );
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{DateStyle, NumberFormat};

    fn fruit_sheet() -> Sheet {
        let mut sheet = Sheet::new(10, 2);
        sheet.set_value(0, 0, "Fruit");
        sheet.set_value(1, 0, "Banana");
        sheet.set_value(2, 0, "apple");
        sheet.set_value(3, 0, "Banana");
        sheet.set_value(4, 0, "Apple");
        sheet.set_value(6, 0, "Cherry");
        sheet
    }

    #[test]
    fn test_first_seen_order_without_header() {
        let sheet = fruit_sheet();
        let area = CellRange::new(0, 0, 6, 1);
        let entries = collect_distinct_values(&sheet, 0, &area, false, false);

        let texts: Vec<&str> = entries.texts().collect();
        assert_eq!(texts, vec!["Banana", "apple", "Cherry"]);
        assert!(!entries.has_dates);
    }

    #[test]
    fn test_case_sensitive_keeps_variants() {
        let sheet = fruit_sheet();
        let area = CellRange::new(0, 0, 6, 1);
        let entries = collect_distinct_values(&sheet, 0, &area, true, true);

        let texts: Vec<&str> = entries.texts().collect();
        assert_eq!(texts, vec!["Fruit", "Banana", "apple", "Apple", "Cherry"]);
    }

    #[test]
    fn test_dates_are_flagged() {
        let mut sheet = Sheet::new(5, 1);
        sheet.set_value(0, 0, "When");
        sheet.set_number(1, 0, 45366.0);
        sheet.set_number_format(1, 0, NumberFormat::Date(DateStyle::Iso));
        sheet.set_number(2, 0, 3.0);

        let entries = collect_distinct_values(&sheet, 0, &CellRange::new(0, 0, 4, 0), false, false);
        assert!(entries.has_dates);
        assert_eq!(entries.values[0].text, "2024-03-15");
        assert!(entries.values[0].is_date);
        assert!(!entries.values[1].is_date);
    }

    #[test]
    fn test_empty_range_and_busy_threshold() {
        let sheet = Sheet::new(5, 1);
        let entries = collect_distinct_values(&sheet, 0, &CellRange::new(0, 0, 4, 0), false, false);
        assert!(entries.is_empty());

        let mut sheet = Sheet::new(200, 1);
        for row in 1..200 {
            sheet.set_number(row, 0, row as f64);
        }
        let entries = collect_distinct_values(&sheet, 0, &CellRange::new(0, 0, 199, 0), false, false);
        assert_eq!(entries.len(), 199);
        assert!(entries.needs_busy_indicator(100));
        assert!(!entries.needs_busy_indicator(500));
    }

    #[test]
    fn test_column_outside_area() {
        let sheet = fruit_sheet();
        let entries = collect_distinct_values(&sheet, 1, &CellRange::new(0, 0, 6, 0), false, false);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_candidates_follow_sorted_view() {
        let mut sheet = fruit_sheet();
        sheet.row_view.apply_sort(vec![0, 6, 5, 4, 3, 2, 1, 7, 8, 9]);

        let entries = collect_distinct_values(&sheet, 0, &CellRange::new(0, 0, 6, 0), false, false);
        assert_eq!(entries.texts().collect::<Vec<_>>(), vec!["Cherry", "Apple", "Banana"]);
    }
}
