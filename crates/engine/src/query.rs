//! Query Model - the filter predicates attached to a database range
//!
//! A `QueryParam` is a fixed-capacity, index-addressable list of `QueryEntry`
//! slots. Active entries are kept contiguous from slot 0 and are combined in
//! index order by their connector (the connector of the first active entry is
//! ignored).
//!
//! The autofilter UI only understands "simple chains": one active entry per
//! field, every connector after the first is AND, no regex, filtering in
//! place. Anything else is reset before the UI edits it.

use ordered_float::OrderedFloat;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Default number of filter slots per parameter.
pub const DEFAULT_MAX_ENTRIES: usize = 8;

/// Comparison performed by a query entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryOp {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    /// Largest N values (N = first item)
    TopN,
    /// Smallest N values (N = first item)
    BottomN,
    TopPercent,
    BottomPercent,
    Contains,
    DoesNotContain,
    BeginsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
}

impl QueryOp {
    /// Operators that compare against the column's numeric ranking.
    pub fn is_ranking(&self) -> bool {
        matches!(
            self,
            QueryOp::TopN | QueryOp::BottomN | QueryOp::TopPercent | QueryOp::BottomPercent
        )
    }
}

/// How an entry combines with the result of the entries before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Connector {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    #[default]
    ByString,
    ByValue,
    ByDate,
}

/// One value predicate of an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryItem {
    pub kind: ItemKind,
    pub string: String,
    pub value: OrderedFloat<f64>,
}

impl QueryItem {
    pub fn string(s: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::ByString,
            string: s.into(),
            value: OrderedFloat(0.0),
        }
    }

    pub fn value(v: f64) -> Self {
        Self {
            kind: ItemKind::ByValue,
            string: String::new(),
            value: OrderedFloat(v),
        }
    }

    /// Date item: rendered string plus the serial date value.
    pub fn date(s: impl Into<String>, serial: f64) -> Self {
        Self {
            kind: ItemKind::ByDate,
            string: s.into(),
            value: OrderedFloat(serial),
        }
    }

    /// Numeric interpretation of the item, if it has one.
    pub fn as_number(&self) -> Option<f64> {
        match self.kind {
            ItemKind::ByValue | ItemKind::ByDate => Some(self.value.0),
            ItemKind::ByString => self.string.trim().parse().ok(),
        }
    }
}

/// A single filter predicate over one column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryEntry {
    pub field: usize,
    pub op: QueryOp,
    pub connector: Connector,
    pub items: Vec<QueryItem>,
    pub active: bool,
}

impl Default for QueryEntry {
    fn default() -> Self {
        Self {
            field: 0,
            op: QueryOp::Equal,
            connector: Connector::And,
            items: Vec::new(),
            active: false,
        }
    }
}

impl QueryEntry {
    /// Reset to an unused slot.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn first_item(&self) -> Option<&QueryItem> {
        self.items.first()
    }

    pub fn set_query_by_empty(&mut self) {
        self.op = QueryOp::IsEmpty;
        self.items.clear();
    }

    pub fn set_query_by_non_empty(&mut self) {
        self.op = QueryOp::IsNotEmpty;
        self.items.clear();
    }

    /// Largest `count` values; stored as a string item the way the UI writes it.
    pub fn set_top_n(&mut self, count: usize) {
        self.op = QueryOp::TopN;
        self.items.clear();
        self.items.push(QueryItem::string(count.to_string()));
    }

    /// Equal-set predicate: a row passes when it matches any item.
    pub fn set_equal_items(&mut self, items: Vec<QueryItem>) {
        self.op = QueryOp::Equal;
        self.items = items;
    }

    /// True for a TopN entry whose count is exactly `count`.
    pub fn is_top_n(&self, count: usize) -> bool {
        self.op == QueryOp::TopN
            && self
                .first_item()
                .is_some_and(|item| item.string.trim() == count.to_string())
    }
}

/// Ordered, fixed-capacity set of query entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryParam {
    entries: Vec<QueryEntry>,
    /// Filter in place (false = copy results elsewhere)
    pub in_place: bool,
    pub regex: bool,
    pub case_sensitive: bool,
    pub has_header: bool,
}

impl Default for QueryParam {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl QueryParam {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: vec![QueryEntry::default(); capacity.max(1)],
            in_place: true,
            regex: false,
            case_sensitive: false,
            has_header: true,
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Grow or shrink to `capacity` slots. Never drops an active entry: the
    /// result keeps at least every slot up to the last active one.
    pub fn set_capacity(&mut self, capacity: usize) {
        let used = self.entries.iter().rposition(|e| e.active).map_or(0, |i| i + 1);
        self.entries.resize_with(capacity.max(used).max(1), QueryEntry::default);
    }

    pub fn entry(&self, index: usize) -> Option<&QueryEntry> {
        self.entries.get(index)
    }

    pub fn entry_mut(&mut self, index: usize) -> Result<&mut QueryEntry, QueryError> {
        let capacity = self.entries.len();
        self.entries
            .get_mut(index)
            .ok_or(QueryError::IndexOutOfRange { index, capacity })
    }

    pub fn entries(&self) -> &[QueryEntry] {
        &self.entries
    }

    pub fn active_entries(&self) -> impl Iterator<Item = &QueryEntry> {
        self.entries.iter().filter(|e| e.active)
    }

    pub fn active_count(&self) -> usize {
        self.active_entries().count()
    }

    /// Active entry for `field`, read-only.
    pub fn find_entry(&self, field: usize) -> Option<&QueryEntry> {
        self.entries.iter().find(|e| e.active && e.field == field)
    }

    /// Linear scan for the active entry of `field`.
    ///
    /// With `create_if_absent`, an unused slot is cleared, assigned to `field`
    /// and returned (still inactive; the caller activates it). Fails with
    /// `TooManyConditions` when no slot is free.
    pub fn find_entry_by_field(
        &mut self,
        field: usize,
        create_if_absent: bool,
    ) -> Result<Option<&mut QueryEntry>, QueryError> {
        if let Some(idx) = self.entries.iter().position(|e| e.active && e.field == field) {
            return Ok(Some(&mut self.entries[idx]));
        }
        if !create_if_absent {
            return Ok(None);
        }
        let capacity = self.entries.len();
        let free = self
            .entries
            .iter()
            .position(|e| !e.active)
            .ok_or(QueryError::TooManyConditions { capacity })?;
        let entry = &mut self.entries[free];
        entry.clear();
        entry.field = field;
        Ok(Some(entry))
    }

    /// Remove the entry for `field` and close the gap.
    ///
    /// Returns false when the field had no active entry.
    pub fn remove_entry_by_field(&mut self, field: usize) -> bool {
        let Some(idx) = self.entries.iter().position(|e| e.active && e.field == field) else {
            return false;
        };
        self.entries.remove(idx);
        self.entries.push(QueryEntry::default());
        self.compact();
        true
    }

    /// Move active entries to the front, keeping their relative order.
    fn compact(&mut self) {
        let capacity = self.entries.len();
        let (active, _): (Vec<_>, Vec<_>) = self.entries.drain(..).partition(|e| e.active);
        self.entries = active;
        self.entries.resize_with(capacity, QueryEntry::default);
    }

    /// Whether the autofilter UI can edit this parameter without losing meaning.
    pub fn is_simple_chain(&self) -> bool {
        if !self.in_place || self.regex {
            return false;
        }
        let mut seen: FxHashSet<usize> = FxHashSet::default();
        for (i, entry) in self.active_entries().enumerate() {
            if i > 0 && entry.connector != Connector::And {
                return false;
            }
            if !seen.insert(entry.field) {
                return false;
            }
        }
        true
    }

    /// Slot the single-select list writes to for `field`:
    /// `(position, found)` where `position` is the field's entry, or the slot
    /// right after the last active entry.
    pub fn position_for_field(&self, field: usize) -> (usize, bool) {
        let mut position = 0;
        for (i, entry) in self.entries.iter().enumerate() {
            if !entry.active {
                continue;
            }
            if entry.field == field {
                return (i, true);
            }
            position = i + 1;
        }
        (position, false)
    }

    /// Drop every entry and return to a plain in-place, non-regex filter.
    pub fn clear_all(&mut self) {
        for entry in &mut self.entries {
            entry.clear();
        }
        self.in_place = true;
        self.regex = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn equal_entry(param: &mut QueryParam, field: usize, value: &str) {
        let entry = param.find_entry_by_field(field, true).unwrap().unwrap();
        entry.active = true;
        entry.set_equal_items(vec![QueryItem::string(value)]);
    }

    #[test]
    fn test_find_creates_in_first_free_slot() {
        let mut param = QueryParam::new(4);
        equal_entry(&mut param, 3, "A");
        equal_entry(&mut param, 1, "B");

        assert_eq!(param.entry(0).unwrap().field, 3);
        assert_eq!(param.entry(1).unwrap().field, 1);
        assert_eq!(param.active_count(), 2);

        // Existing entry is reused, not duplicated
        equal_entry(&mut param, 3, "C");
        assert_eq!(param.active_count(), 2);
        assert_eq!(param.find_entry(3).unwrap().items, vec![QueryItem::string("C")]);
    }

    #[test]
    fn test_find_without_create_returns_none() {
        let mut param = QueryParam::new(2);
        assert!(param.find_entry_by_field(5, false).unwrap().is_none());
        assert_eq!(param.active_count(), 0);
    }

    #[test]
    fn test_find_at_capacity_is_too_many_conditions() {
        let mut param = QueryParam::new(2);
        equal_entry(&mut param, 0, "x");
        equal_entry(&mut param, 1, "y");

        let err = param.find_entry_by_field(2, true).unwrap_err();
        assert_eq!(err, QueryError::TooManyConditions { capacity: 2 });

        // Fields that already have an entry still resolve
        assert!(param.find_entry_by_field(1, true).unwrap().is_some());
    }

    #[test]
    fn test_set_capacity_keeps_active_entries() {
        let mut param = QueryParam::new(8);
        equal_entry(&mut param, 0, "x");
        equal_entry(&mut param, 1, "y");
        equal_entry(&mut param, 2, "z");

        param.set_capacity(2);
        assert_eq!(param.capacity(), 3);
        assert_eq!(param.active_count(), 3);

        param.remove_entry_by_field(1);
        param.set_capacity(2);
        assert_eq!(param.capacity(), 2);
        assert_eq!(
            param.find_entry_by_field(4, true).unwrap_err(),
            QueryError::TooManyConditions { capacity: 2 }
        );

        param.set_capacity(0);
        assert_eq!(param.capacity(), 2);
        param.clear_all();
        param.set_capacity(0);
        assert_eq!(param.capacity(), 1);
    }

    #[test]
    fn test_remove_compacts_entries() {
        let mut param = QueryParam::new(4);
        equal_entry(&mut param, 0, "a");
        equal_entry(&mut param, 1, "b");
        equal_entry(&mut param, 2, "c");

        assert!(param.remove_entry_by_field(1));
        assert!(param.find_entry(1).is_none());
        assert_eq!(param.capacity(), 4);

        let fields: Vec<usize> = param.entries().iter().take(2).map(|e| e.field).collect();
        assert_eq!(fields, vec![0, 2]);
        assert!(param.entries()[0].active && param.entries()[1].active);
        assert!(!param.entries()[2].active && !param.entries()[3].active);

        assert!(!param.remove_entry_by_field(9));
    }

    #[test]
    fn test_simple_chain_rules() {
        let mut param = QueryParam::new(4);
        assert!(param.is_simple_chain());

        equal_entry(&mut param, 0, "a");
        equal_entry(&mut param, 1, "b");
        assert!(param.is_simple_chain());

        param.entry_mut(1).unwrap().connector = Connector::Or;
        assert!(!param.is_simple_chain());
        param.entry_mut(1).unwrap().connector = Connector::And;

        // Connector of the first entry does not matter
        param.entry_mut(0).unwrap().connector = Connector::Or;
        assert!(param.is_simple_chain());

        param.regex = true;
        assert!(!param.is_simple_chain());
        param.regex = false;

        param.in_place = false;
        assert!(!param.is_simple_chain());
        param.in_place = true;

        // Same field twice
        let dup = param.entry_mut(2).unwrap();
        dup.field = 0;
        dup.active = true;
        assert!(!param.is_simple_chain());
    }

    #[test]
    fn test_position_for_field() {
        let mut param = QueryParam::new(3);
        assert_eq!(param.position_for_field(4), (0, false));

        equal_entry(&mut param, 4, "x");
        equal_entry(&mut param, 2, "y");
        assert_eq!(param.position_for_field(2), (1, true));
        assert_eq!(param.position_for_field(7), (2, false));
    }

    #[test]
    fn test_clear_all_resets_flags() {
        let mut param = QueryParam::new(3);
        equal_entry(&mut param, 1, "x");
        param.regex = true;
        param.in_place = false;

        param.clear_all();
        assert_eq!(param.active_count(), 0);
        assert!(param.in_place);
        assert!(!param.regex);
        assert_eq!(param.capacity(), 3);
    }

    #[test]
    fn test_top_n_detection() {
        let mut entry = QueryEntry::default();
        entry.set_top_n(10);
        assert!(entry.is_top_n(10));
        assert!(!entry.is_top_n(5));

        entry.set_query_by_empty();
        assert_eq!(entry.op, QueryOp::IsEmpty);
        assert!(entry.items.is_empty());
    }

    #[test]
    fn test_param_serde_round_trip() {
        let mut param = QueryParam::new(3);
        equal_entry(&mut param, 2, "Apple");
        let json = serde_json::to_string(&param).unwrap();
        let back: QueryParam = serde_json::from_str(&json).unwrap();
        assert_eq!(back, param);
    }
}
