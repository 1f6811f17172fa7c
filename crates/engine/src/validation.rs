//! List validation - the drop-down lists offered by the data-select popup
//!
//! ## Case Sensitivity
//!
//! - **Current value pre-selection**: case-sensitive. "Yes" != "yes".
//! - **Sorted lists**: ordered case-insensitively.

use std::collections::BTreeMap;

use gridfilter_core::CellRange;
use serde::{Deserialize, Serialize};

/// Items beyond this count are dropped from a resolved list.
pub const MAX_LIST_ITEMS: usize = 10_000;

/// Where a list validation takes its allowed values from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ListSource {
    /// Comma-separated values typed into the rule
    Inline(Vec<String>),
    /// Values read from a cell range
    Range(CellRange),
}

/// A list validation attached to a range of cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub source: ListSource,
    /// Show the drop-down button beside the cell.
    pub show_dropdown: bool,
    /// Offer the items in ascending order instead of source order.
    pub sorted: bool,
}

impl ValidationRule {
    pub fn new(source: ListSource) -> Self {
        Self {
            source,
            show_dropdown: true,
            sorted: false,
        }
    }

    pub fn list_inline(values: Vec<String>) -> Self {
        Self::new(ListSource::Inline(values))
    }

    pub fn list_range(range: CellRange) -> Self {
        Self::new(ListSource::Range(range))
    }

    pub fn with_show_dropdown(mut self, show: bool) -> Self {
        self.show_dropdown = show;
        self
    }

    pub fn with_sorted(mut self, sorted: bool) -> Self {
        self.sorted = sorted;
        self
    }
}

/// A resolved list, ready for the popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedList {
    /// Trimmed items, at most `MAX_LIST_ITEMS`.
    pub items: Vec<String>,
    /// Set when items were dropped at the cap.
    pub is_truncated: bool,
}

impl ResolvedList {
    /// Trim every item and apply the cap.
    pub fn from_items(raw_items: Vec<String>) -> Self {
        let mut items: Vec<String> = raw_items.into_iter().map(|s| s.trim().to_string()).collect();
        let is_truncated = items.len() > MAX_LIST_ITEMS;
        if is_truncated {
            items.truncate(MAX_LIST_ITEMS);
        }
        Self { items, is_truncated }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Index of the item equal to `value` (case-sensitive, trimmed).
    pub fn position(&self, value: &str) -> Option<usize> {
        let trimmed = value.trim();
        self.items.iter().position(|item| item == trimmed)
    }

    pub fn contains(&self, value: &str) -> bool {
        self.position(value).is_some()
    }
}

/// Validation rules of a sheet, keyed by range. The first range (in range
/// order) containing a cell supplies its rule.
#[derive(Debug, Clone, Default)]
pub struct ValidationStore {
    rules: BTreeMap<CellRange, ValidationRule>,
}

impl ValidationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any rule for this exact range.
    pub fn set(&mut self, range: CellRange, rule: ValidationRule) {
        self.rules.insert(range, rule);
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&ValidationRule> {
        self.rules
            .iter()
            .find(|(range, _)| range.contains(row, col))
            .map(|(_, rule)| rule)
    }

    /// Whether the cell shows a list drop-down button.
    pub fn has_dropdown(&self, row: usize, col: usize) -> bool {
        self.get(row, col).is_some_and(|rule| rule.show_dropdown)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
