//! Database ranges - named data areas that own a query and a sort parameter

use gridfilter_core::CellRange;
use serde::{Deserialize, Serialize};

use crate::query::QueryParam;
use crate::sort::SortParam;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DbRangeId(pub usize);

/// A named rectangular data range (the "DBData" of the filter workflow).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbRange {
    pub name: String,
    area: CellRange,
    pub has_header: bool,
    /// Header cells carry autofilter buttons
    pub autofilter: bool,
    query_param: QueryParam,
    sort_param: SortParam,
}

impl DbRange {
    pub fn new(name: impl Into<String>, area: CellRange) -> Self {
        Self {
            name: name.into(),
            area,
            has_header: true,
            autofilter: false,
            query_param: QueryParam::default(),
            sort_param: SortParam::new(area),
        }
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self.query_param.has_header = has_header;
        self.sort_param.has_header = has_header;
        self
    }

    pub fn with_autofilter(mut self, autofilter: bool) -> Self {
        self.autofilter = autofilter;
        self
    }

    pub fn area(&self) -> CellRange {
        self.area
    }

    /// Rows below the header
    pub fn data_area(&self) -> CellRange {
        let mut area = self.area;
        if self.has_header && area.start_row < area.end_row {
            area.start_row += 1;
        }
        area
    }

    pub fn header_row(&self) -> Option<usize> {
        self.has_header.then_some(self.area.start_row)
    }

    /// Copy of the current query parameter; edits go through `set_query_param`.
    pub fn query_param(&self) -> QueryParam {
        self.query_param.clone()
    }

    pub fn query(&self) -> &QueryParam {
        &self.query_param
    }

    pub fn set_query_param(&mut self, param: QueryParam) {
        self.query_param = param;
    }

    pub fn sort_param(&self) -> &SortParam {
        &self.sort_param
    }

    pub fn set_sort_param(&mut self, param: SortParam) {
        self.sort_param = param;
    }

    pub fn has_autofilter_button(&self, row: usize, col: usize) -> bool {
        self.autofilter && self.header_row() == Some(row) && self.area.contains_col(col)
    }

    /// Column has an active entry (button drawn in its "filtered" state).
    pub fn is_autofilter_active(&self, col: usize) -> bool {
        self.query_param.find_entry(col).is_some()
    }
}

/// All database ranges of a sheet.
#[derive(Debug, Clone, Default)]
pub struct DbCollection {
    ranges: Vec<DbRange>,
}

impl DbCollection {
    pub fn insert(&mut self, range: DbRange) -> DbRangeId {
        self.ranges.push(range);
        DbRangeId(self.ranges.len() - 1)
    }

    pub fn get(&self, id: DbRangeId) -> Option<&DbRange> {
        self.ranges.get(id.0)
    }

    pub fn get_mut(&mut self, id: DbRangeId) -> Option<&mut DbRange> {
        self.ranges.get_mut(id.0)
    }

    /// The range containing the cell, if any. Ranges inserted first win.
    pub fn at_cursor(&self, row: usize, col: usize) -> Option<DbRangeId> {
        self.ranges
            .iter()
            .position(|db| db.area.contains(row, col))
            .map(DbRangeId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DbRangeId, &DbRange)> {
        self.ranges.iter().enumerate().map(|(i, db)| (DbRangeId(i), db))
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
