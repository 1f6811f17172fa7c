//! Collaborators the popup controller talks to.
//!
//! The controller never reaches for globals: every launch and commit gets a
//! `ViewContext` carrying the sheet and the services that sort, re-filter,
//! open dialogs and report status.

use std::collections::VecDeque;
use std::fmt;

use gridfilter_core::{CellAddr, CellRange};
use gridfilter_engine::sort::SortUndoItem;
use gridfilter_engine::{DbRangeId, QueryParam, Sheet, SortParam};

/// User-visible notification (status bar / message box).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    TooManyConditions { capacity: usize },
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyConditions { capacity } => {
                write!(f, "Too many conditions (at most {capacity})")
            }
        }
    }
}

/// Call the host makes back into the controller while a service is running,
/// e.g. a focus change that asks every popup to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewRequest {
    CloseAll,
    /// Row selected in the open popup
    Select(usize),
}

/// Services consumed by the popup controller.
pub trait FilterServices {
    /// Reorder rows of a database range.
    fn sort(&mut self, sheet: &mut Sheet, db: DbRangeId, param: &SortParam);

    /// Persist `param` onto the range and recompute row visibility.
    fn query(&mut self, sheet: &mut Sheet, db: DbRangeId, param: &QueryParam);

    /// Open the standard filter dialog pre-seeded with `area`.
    fn open_filter_dialog(&mut self, db: DbRangeId, area: CellRange, cursor: CellAddr);

    fn status_message(&mut self, message: StatusMessage);

    fn enter_busy(&mut self) {}

    fn leave_busy(&mut self) {}

    /// Write user input into a cell.
    fn enter_data(&mut self, sheet: &mut Sheet, cell: CellAddr, value: &str);

    fn use_scenario(&mut self, sheet: &mut Sheet, name: &str);

    /// Reentrant calls queued while the last service ran.
    fn drain_requests(&mut self) -> Vec<ViewRequest> {
        Vec::new()
    }
}

/// Everything a popup operation may touch.
pub struct ViewContext<'a> {
    pub sheet: &'a mut Sheet,
    pub services: &'a mut dyn FilterServices,
}

impl<'a> ViewContext<'a> {
    pub fn new(sheet: &'a mut Sheet, services: &'a mut dyn FilterServices) -> Self {
        Self { sheet, services }
    }
}

/// Services backed directly by the engine. Records what it was asked to do
/// so hosts can mirror it (undo, redraw) and tests can inspect it.
#[derive(Debug, Default)]
pub struct EngineServices {
    pub sorts: Vec<(DbRangeId, SortParam)>,
    pub sort_undo: Vec<SortUndoItem>,
    pub queries: Vec<DbRangeId>,
    pub dialogs: Vec<(DbRangeId, CellRange, CellAddr)>,
    pub messages: Vec<StatusMessage>,
    /// Busy indicator nesting depth
    pub busy_depth: usize,
    /// Times the busy indicator was raised
    pub busy_shown: usize,
    requests: VecDeque<ViewRequest>,
}

impl EngineServices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reentrant call, delivered on the next `drain_requests`.
    pub fn push_request(&mut self, request: ViewRequest) {
        self.requests.push_back(request);
    }
}

impl FilterServices for EngineServices {
    fn sort(&mut self, sheet: &mut Sheet, db: DbRangeId, param: &SortParam) {
        let Some(range) = sheet.db_ranges.get_mut(db) else {
            return;
        };
        range.set_sort_param(param.clone());
        let undo = sheet.apply_sort(param);
        self.sort_undo.push(undo);
        self.sorts.push((db, param.clone()));
    }

    fn query(&mut self, sheet: &mut Sheet, db: DbRangeId, param: &QueryParam) {
        let Some(range) = sheet.db_ranges.get_mut(db) else {
            return;
        };
        range.set_query_param(param.clone());
        sheet.apply_query(db, param);
        self.queries.push(db);
    }

    fn open_filter_dialog(&mut self, db: DbRangeId, area: CellRange, cursor: CellAddr) {
        self.dialogs.push((db, area, cursor));
    }

    fn status_message(&mut self, message: StatusMessage) {
        log::warn!("{}", message);
        self.messages.push(message);
    }

    fn enter_busy(&mut self) {
        self.busy_depth += 1;
        self.busy_shown += 1;
    }

    fn leave_busy(&mut self) {
        self.busy_depth = self.busy_depth.saturating_sub(1);
    }

    fn enter_data(&mut self, sheet: &mut Sheet, cell: CellAddr, value: &str) {
        sheet.set_value(cell.row, cell.col, value);
    }

    fn use_scenario(&mut self, sheet: &mut Sheet, name: &str) {
        if !sheet.scenarios.set_active(name) {
            log::debug!("scenario {:?} not found", name);
        }
    }

    fn drain_requests(&mut self) -> Vec<ViewRequest> {
        self.requests.drain(..).collect()
    }
}
