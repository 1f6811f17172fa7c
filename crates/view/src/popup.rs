//! Popup controller state machine
//!
//! One controller owns at most one popup: the autofilter checklist, the
//! single-select autofilter list, the data-select (validity) list or the
//! scenario list.
//!
//! ```text
//! Closed -> Initializing -> Open -> Committing -> Closed
//!                            |
//!                            +----> Closed (cancel)
//! ```
//!
//! Hosts deliver reentrant calls (a focus change that closes every popup, a
//! selection fired while the list is being filled) through
//! `FilterServices::drain_requests`. They are replayed while the controller
//! is still `Initializing` or `Committing`, so the guards see them exactly
//! as a nested synchronous callback would.

use gridfilter_config::{PopupStyle, Settings};
use gridfilter_core::{CellAddr, CellRange};
use gridfilter_engine::{
    collect_distinct_values, DbRange, DbRangeId, FilterEntries, QueryError, QueryOp, QueryParam, SelectionState,
    SpecialAction, TypedValue,
};

use crate::actions::{self, AutoFilterMode, FilterChoice};
use crate::context::{StatusMessage, ViewContext, ViewRequest};
use crate::events::{EventCollector, GuardReason, IgnoreReason, PopupEvent, PopupKind};

/// Rows moved by PageUp/PageDown
const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PopupState {
    #[default]
    Closed,
    /// Filling the popup; selection callbacks are ignored
    Initializing,
    Open,
    /// A commit handler is running; the popup must not be destroyed
    Committing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    AutoFilter,
    DataSelect,
    Scenario,
}

/// One row of a single-select list.
#[derive(Debug, Clone, PartialEq)]
pub enum ListRow {
    /// Fixed autofilter entry (Top 10, Standard Filter, Empty, Not Empty)
    Action(SpecialAction),
    Value(TypedValue),
}

impl ListRow {
    pub fn label(&self) -> &str {
        match self {
            Self::Action(SpecialAction::Top10) => "Top 10",
            Self::Action(SpecialAction::Custom) => "Standard Filter...",
            Self::Action(SpecialAction::Empty) => "Empty",
            Self::Action(SpecialAction::NotEmpty) => "Not Empty",
            Self::Value(value) => &value.text,
        }
    }
}

/// Open checklist for one autofilter column.
#[derive(Debug, Clone)]
pub struct ChecklistPopup {
    pub db: DbRangeId,
    /// Header cell the button belongs to
    pub cell: CellAddr,
    pub candidates: FilterEntries,
    pub selection: SelectionState,
    pub cursor: usize,
}

#[derive(Debug, Clone)]
pub struct ListPopup {
    pub mode: ListMode,
    pub cell: CellAddr,
    /// Owning range for autofilter lists
    pub db: Option<DbRangeId>,
    pub rows: Vec<ListRow>,
    pub selected: Option<usize>,
}

impl ListPopup {
    fn kind(&self) -> PopupKind {
        match self.mode {
            ListMode::AutoFilter => PopupKind::AutoFilterList,
            ListMode::DataSelect => PopupKind::DataSelect,
            ListMode::Scenario => PopupKind::Scenario,
        }
    }
}

#[derive(Debug, Clone)]
pub enum PopupContent {
    Checklist(ChecklistPopup),
    List(ListPopup),
}

impl PopupContent {
    pub fn kind(&self) -> PopupKind {
        match self {
            Self::Checklist(_) => PopupKind::AutoFilterChecklist,
            Self::List(list) => list.kind(),
        }
    }

    pub fn cell(&self) -> CellAddr {
        match self {
            Self::Checklist(popup) => popup.cell,
            Self::List(list) => list.cell,
        }
    }

    fn row_count(&self) -> usize {
        match self {
            Self::Checklist(popup) => popup.candidates.len(),
            Self::List(list) => list.rows.len(),
        }
    }
}

/// Key modifiers for event handling
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyModifiers {
    pub control: bool,
    pub alt: bool,
    pub shift: bool,
    pub platform: bool, // Cmd on macOS
}

/// Result of routing a key to the popup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Key handled, popup still open
    Consumed,
    /// Popup committed and closed
    Committed,
    /// Popup closed without committing
    Cancelled,
    /// Not for the popup, pass to the grid
    NotConsumed,
}

#[derive(Debug, Default)]
pub struct PopupController {
    settings: Settings,
    state: PopupState,
    content: Option<PopupContent>,
    /// Set by cancel and popup-mode-end; blocks any trailing selection
    cancelled: bool,
    events: EventCollector,
}

impl PopupController {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> PopupState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == PopupState::Open
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn content(&self) -> Option<&PopupContent> {
        self.content.as_ref()
    }

    pub fn checklist(&self) -> Option<&ChecklistPopup> {
        match &self.content {
            Some(PopupContent::Checklist(popup)) => Some(popup),
            _ => None,
        }
    }

    pub fn list(&self) -> Option<&ListPopup> {
        match &self.content {
            Some(PopupContent::List(list)) => Some(list),
            _ => None,
        }
    }

    pub fn events(&self) -> &EventCollector {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<PopupEvent> {
        self.events.take()
    }

    // ------------------------------------------------------------------
    // Launch
    // ------------------------------------------------------------------

    /// Open the autofilter popup for the header cell at (row, col).
    ///
    /// Returns false (and shows nothing) when the cell carries no autofilter
    /// button.
    pub fn launch_autofilter(&mut self, cx: &mut ViewContext<'_>, row: usize, col: usize) -> bool {
        let Some(db_id) = cx.sheet.db_ranges.at_cursor(row, col) else {
            log::debug!("no database range at ({}, {})", row, col);
            return false;
        };
        let Some(db) = cx.sheet.db_ranges.get(db_id) else {
            return false;
        };
        if !db.has_autofilter_button(row, col) {
            log::debug!("({}, {}) has no autofilter button", row, col);
            return false;
        }
        if !self.begin_launch() {
            return false;
        }

        let area = db.area();
        let param = self.configured_param(db);
        let candidates = collect_distinct_values(cx.sheet, col, &area, !db.has_header, param.case_sensitive);
        let busy = candidates.needs_busy_indicator(self.settings.busy_threshold);
        if busy {
            cx.services.enter_busy();
        }

        let cell = CellAddr::new(row, col);
        let content = match self.settings.popup_style {
            PopupStyle::Checklist => {
                let selection = SelectionState::derive(param.find_entry(col), &candidates, self.settings.top_count);
                PopupContent::Checklist(ChecklistPopup {
                    db: db_id,
                    cell,
                    candidates,
                    selection,
                    cursor: 0,
                })
            }
            PopupStyle::List => {
                let selected = preselect_list_row(&param, col, &candidates, self.settings.top_count);
                let mut rows = vec![
                    ListRow::Action(SpecialAction::Top10),
                    ListRow::Action(SpecialAction::Custom),
                    ListRow::Action(SpecialAction::Empty),
                    ListRow::Action(SpecialAction::NotEmpty),
                ];
                rows.extend(candidates.values.into_iter().map(ListRow::Value));
                PopupContent::List(ListPopup {
                    mode: ListMode::AutoFilter,
                    cell,
                    db: Some(db_id),
                    rows,
                    selected: Some(selected),
                })
            }
        };
        self.content = Some(content);
        self.process_requests(cx);

        if busy {
            cx.services.leave_busy();
        }
        self.finish_launch()
    }

    /// Open the validity list of the cell at (row, col).
    ///
    /// Nothing is shown when the cell has no list validation with a
    /// drop-down, or when the list resolves to no items.
    pub fn launch_data_select(&mut self, cx: &mut ViewContext<'_>, row: usize, col: usize) -> bool {
        if !cx.sheet.validations.has_dropdown(row, col) {
            return false;
        }
        let Some(list) = cx.sheet.get_list_items(row, col) else {
            return false;
        };
        if list.is_empty() {
            log::debug!("validity list at ({}, {}) is empty", row, col);
            return false;
        }
        if !self.begin_launch() {
            return false;
        }

        let current = cx.sheet.get_display(row, col);
        let selected = list.position(&current);
        let rows = list
            .items
            .into_iter()
            .map(|item| ListRow::Value(TypedValue::text(item)))
            .collect();
        self.content = Some(PopupContent::List(ListPopup {
            mode: ListMode::DataSelect,
            cell: CellAddr::new(row, col),
            db: None,
            rows,
            selected,
        }));
        self.process_requests(cx);
        self.finish_launch()
    }

    /// Open the list of scenarios defined over `range`.
    pub fn launch_scenario(&mut self, cx: &mut ViewContext<'_>, range: CellRange) -> bool {
        let scenarios: Vec<(String, bool)> = cx
            .sheet
            .scenarios
            .for_range(&range)
            .map(|s| (s.name.clone(), s.active))
            .collect();
        if scenarios.is_empty() {
            return false;
        }
        if !self.begin_launch() {
            return false;
        }

        let selected = scenarios.iter().position(|(_, active)| *active).unwrap_or(0);
        let rows = scenarios
            .into_iter()
            .map(|(name, _)| ListRow::Value(TypedValue::text(name)))
            .collect();
        self.content = Some(PopupContent::List(ListPopup {
            mode: ListMode::Scenario,
            cell: CellAddr::new(range.start_row, range.end_col),
            db: None,
            rows,
            selected: Some(selected),
        }));
        self.process_requests(cx);
        self.finish_launch()
    }

    /// Destroy any open popup and enter `Initializing`. Refused while a
    /// popup is still being filled or committed.
    fn begin_launch(&mut self) -> bool {
        match self.state {
            PopupState::Initializing => {
                self.suppress_close(GuardReason::Initializing);
                return false;
            }
            PopupState::Committing => {
                self.suppress_close(GuardReason::InSelect);
                return false;
            }
            PopupState::Open => {
                if let Some(old) = self.content.take() {
                    log::debug!("replacing open {:?} popup at {:?}", old.kind(), old.cell());
                    self.events.push(PopupEvent::Replaced {
                        kind: old.kind(),
                        cell: old.cell(),
                    });
                }
            }
            PopupState::Closed => {}
        }
        self.state = PopupState::Initializing;
        self.cancelled = false;
        true
    }

    fn finish_launch(&mut self) -> bool {
        let Some(content) = &self.content else {
            self.state = PopupState::Closed;
            return false;
        };
        let (kind, cell) = (content.kind(), content.cell());
        if self.cancelled {
            // Focus went away while the popup was being filled
            self.events.push(PopupEvent::Cancelled { kind, cell });
            self.close();
            return false;
        }
        self.state = PopupState::Open;
        log::debug!("{:?} popup open at {:?}", kind, cell);
        self.events.push(PopupEvent::Opened {
            kind,
            cell,
            candidates: content.row_count(),
        });
        true
    }

    // ------------------------------------------------------------------
    // Editing an open popup
    // ------------------------------------------------------------------

    /// Flip the checkbox of candidate `index`.
    pub fn toggle_member(&mut self, index: usize) -> Option<bool> {
        if self.state != PopupState::Open {
            return None;
        }
        match &mut self.content {
            Some(PopupContent::Checklist(popup)) => {
                popup.cursor = index.min(popup.candidates.len().saturating_sub(1));
                popup.selection.toggle(index)
            }
            _ => None,
        }
    }

    /// Check or uncheck every candidate ("Select All").
    pub fn set_all(&mut self, checked: bool) {
        if self.state != PopupState::Open {
            return;
        }
        if let Some(PopupContent::Checklist(popup)) = &mut self.content {
            popup.selection.set_all(checked);
        }
    }

    /// Move the cursor (checklist) or highlighted row (list), clamped.
    pub fn move_cursor(&mut self, delta: isize) {
        if self.state != PopupState::Open {
            return;
        }
        let Some(content) = &mut self.content else {
            return;
        };
        let count = content.row_count();
        if count == 0 {
            return;
        }
        let current = match content {
            PopupContent::Checklist(popup) => popup.cursor,
            PopupContent::List(list) => match list.selected {
                Some(row) => row,
                // Nothing highlighted yet: the first move lands on row 0
                None => {
                    list.selected = Some(0);
                    return;
                }
            },
        };
        let target = current.saturating_add_signed(delta).min(count - 1);
        match content {
            PopupContent::Checklist(popup) => popup.cursor = target,
            PopupContent::List(list) => list.selected = Some(target),
        }
    }

    fn move_to(&mut self, row: usize) {
        if let Some(content) = &mut self.content {
            let target = row.min(content.row_count().saturating_sub(1));
            match content {
                PopupContent::Checklist(popup) => popup.cursor = target,
                PopupContent::List(list) => list.selected = Some(target),
            }
        }
    }

    // ------------------------------------------------------------------
    // Commit
    // ------------------------------------------------------------------

    /// OK / Enter: commit the checklist's members, or the list's
    /// highlighted row.
    pub fn commit(&mut self, cx: &mut ViewContext<'_>) -> bool {
        match &self.content {
            Some(PopupContent::List(list)) => match list.selected {
                Some(row) => self.select(cx, row),
                None => false,
            },
            _ => self.select_action(cx, AutoFilterMode::Normal),
        }
    }

    /// Run a checklist menu action. `Normal` commits the checked members.
    ///
    /// Returns true when the popup committed and closed.
    pub fn select_action(&mut self, cx: &mut ViewContext<'_>, mode: AutoFilterMode) -> bool {
        if !self.accepts_select() {
            return false;
        }
        let Some(PopupContent::Checklist(popup)) = &self.content else {
            return false;
        };
        let (db, cell) = (popup.db, popup.cell);

        let choice = match mode {
            AutoFilterMode::SortAscending | AutoFilterMode::SortDescending => {
                self.state = PopupState::Committing;
                self.run_sort(cx, db, cell.col, mode == AutoFilterMode::SortAscending);
                return self.finish_commit(cx);
            }
            AutoFilterMode::Custom => {
                self.state = PopupState::Committing;
                self.run_custom(cx, db, cell);
                return self.finish_commit(cx);
            }
            AutoFilterMode::Normal => {
                if popup.selection.is_all_checked() {
                    FilterChoice::AllMembers
                } else if popup.selection.checked_count() == 0 && !self.settings.allow_empty_set {
                    log::debug!("nothing checked; commit refused");
                    self.events.push(PopupEvent::EmptySetRejected { cell });
                    return false;
                } else {
                    let items = popup
                        .selection
                        .checked_indices()
                        .filter_map(|i| popup.candidates.values.get(i))
                        .map(actions::item_for)
                        .collect();
                    FilterChoice::Members(items)
                }
            }
            AutoFilterMode::Top10 => FilterChoice::Top(self.settings.top_count),
            AutoFilterMode::Empty => FilterChoice::Empty,
            AutoFilterMode::NonEmpty => FilterChoice::NotEmpty,
        };

        self.state = PopupState::Committing;
        self.run_filter(cx, db, cell.col, choice, actions::commit_checklist);
        self.finish_commit(cx)
    }

    /// Pick row `index` of a single-select list.
    ///
    /// Returns true when the popup committed and closed.
    pub fn select(&mut self, cx: &mut ViewContext<'_>, index: usize) -> bool {
        if !self.accepts_select() {
            return false;
        }
        let Some(PopupContent::List(list)) = &self.content else {
            return false;
        };
        let Some(row) = list.rows.get(index).cloned() else {
            return false;
        };
        let (mode, cell, db) = (list.mode, list.cell, list.db);

        self.state = PopupState::Committing;
        match (mode, row) {
            (ListMode::AutoFilter, row) => {
                let Some(db) = db else {
                    return self.finish_commit(cx);
                };
                let choice = match row {
                    ListRow::Action(SpecialAction::Custom) => {
                        self.run_custom(cx, db, cell);
                        return self.finish_commit(cx);
                    }
                    ListRow::Action(SpecialAction::Top10) => FilterChoice::Top(self.settings.top_count),
                    ListRow::Action(SpecialAction::Empty) => FilterChoice::Empty,
                    ListRow::Action(SpecialAction::NotEmpty) => FilterChoice::NotEmpty,
                    ListRow::Value(value) => FilterChoice::Members(vec![actions::item_for(&value)]),
                };
                self.run_filter(cx, db, cell.col, choice, actions::exec_list_filter);
            }
            (ListMode::DataSelect, ListRow::Value(value)) => {
                if value.text.is_empty() {
                    log::debug!("empty validity entry ignored");
                } else {
                    cx.services.enter_data(cx.sheet, cell, &value.text);
                    self.events.push(PopupEvent::ValueEntered { cell, value: value.text });
                }
            }
            (ListMode::Scenario, ListRow::Value(value)) => {
                log::info!("applying scenario {:?}", value.text);
                cx.services.use_scenario(cx.sheet, &value.text);
                self.events.push(PopupEvent::ScenarioApplied { name: value.text });
            }
            (_, ListRow::Action(_)) => {}
        }
        self.finish_commit(cx)
    }

    /// Rewrite a copy of the range's query parameter and hand it to the
    /// services. On failure the stored parameter stays untouched.
    fn run_filter(
        &mut self,
        cx: &mut ViewContext<'_>,
        db: DbRangeId,
        col: usize,
        choice: FilterChoice,
        apply: fn(&mut QueryParam, usize, FilterChoice) -> Result<(), QueryError>,
    ) {
        let Some(range) = cx.sheet.db_ranges.get(db) else {
            return;
        };
        let mut param = self.configured_param(range);
        let mode = choice.mode();
        match apply(&mut param, col, choice) {
            Ok(()) => {
                log::info!("filter on column {} set to {:?} ({} active)", col, mode, param.active_count());
                cx.services.query(cx.sheet, db, &param);
                self.events.push(PopupEvent::QueryChanged { db, field: col, mode });
            }
            Err(QueryError::TooManyConditions { capacity }) => {
                log::warn!("too many conditions for column {} (capacity {})", col, capacity);
                cx.services.status_message(StatusMessage::TooManyConditions { capacity });
                self.events.push(PopupEvent::TooManyConditions { field: col, capacity });
            }
            Err(e) => log::warn!("filter on column {} not applied: {}", col, e),
        }
    }

    /// Working copy of a range's query parameter with the configured
    /// capacity; a parameter without conditions also takes the configured
    /// case sensitivity.
    fn configured_param(&self, range: &DbRange) -> QueryParam {
        let mut param = range.query_param();
        param.set_capacity(self.settings.max_entries);
        if param.active_count() == 0 {
            param.case_sensitive = self.settings.case_sensitive;
        }
        param
    }

    fn run_sort(&mut self, cx: &mut ViewContext<'_>, db: DbRangeId, col: usize, ascending: bool) {
        let Some(range) = cx.sheet.db_ranges.get(db) else {
            return;
        };
        let sort_area = range.sort_param().area;
        let has_header = cx.sheet.has_col_header(&sort_area);
        let Some(param) = range.sort_param().for_column(col, ascending, has_header) else {
            log::debug!("column {} outside sort area {:?}", col, sort_area);
            return;
        };
        log::info!("sorting column {} {}", col, if ascending { "ascending" } else { "descending" });
        cx.services.sort(cx.sheet, db, &param);
        self.events.push(PopupEvent::SortRequested { db, col, ascending });
    }

    fn run_custom(&mut self, cx: &mut ViewContext<'_>, db: DbRangeId, cell: CellAddr) {
        let Some(range) = cx.sheet.db_ranges.get(db) else {
            return;
        };
        let area = range.area();
        log::info!("opening standard filter dialog for {:?}", area);
        cx.services.open_filter_dialog(db, area, cell);
        self.events.push(PopupEvent::CustomDialogRequested { db, area });
    }

    fn finish_commit(&mut self, cx: &mut ViewContext<'_>) -> bool {
        self.process_requests(cx);
        self.close();
        true
    }

    // ------------------------------------------------------------------
    // Cancel and external close
    // ------------------------------------------------------------------

    /// Escape: dismiss without touching the query model.
    pub fn cancel(&mut self) -> bool {
        if self.state != PopupState::Open {
            return false;
        }
        self.cancelled = true;
        if let Some(content) = &self.content {
            self.events.push(PopupEvent::Cancelled {
                kind: content.kind(),
                cell: content.cell(),
            });
        }
        self.close();
        true
    }

    /// Click outside the popup / close-all request. Refused while the popup
    /// is being filled or a commit is running. Returns true when a popup was
    /// closed.
    pub fn click_extern(&mut self) -> bool {
        match self.state {
            PopupState::Initializing => {
                self.suppress_close(GuardReason::Initializing);
                false
            }
            PopupState::Committing => {
                self.suppress_close(GuardReason::InSelect);
                false
            }
            PopupState::Open => self.cancel(),
            PopupState::Closed => false,
        }
    }

    /// The popup lost focus. Marks it cancelled; an open popup closes now,
    /// one still being filled closes as soon as filling ends.
    pub fn popup_mode_end(&mut self) {
        match self.state {
            PopupState::Open => {
                self.cancel();
            }
            PopupState::Initializing | PopupState::Committing => self.cancelled = true,
            PopupState::Closed => {}
        }
    }

    fn suppress_close(&mut self, reason: GuardReason) {
        log::debug!("close request suppressed ({:?})", reason);
        self.events.push(PopupEvent::CloseSuppressed { reason });
    }

    fn accepts_select(&mut self) -> bool {
        let reason = match self.state {
            PopupState::Open if !self.cancelled => return true,
            PopupState::Open => IgnoreReason::Cancelled,
            PopupState::Initializing => IgnoreReason::Initializing,
            PopupState::Committing => IgnoreReason::Committing,
            PopupState::Closed => IgnoreReason::Closed,
        };
        log::debug!("selection ignored ({:?})", reason);
        self.events.push(PopupEvent::SelectIgnored { reason });
        false
    }

    fn close(&mut self) {
        if let Some(content) = self.content.take() {
            self.events.push(PopupEvent::Closed {
                kind: content.kind(),
                cell: content.cell(),
            });
        }
        self.state = PopupState::Closed;
    }

    /// Replay reentrant host calls against the current state.
    fn process_requests(&mut self, cx: &mut ViewContext<'_>) {
        for request in cx.services.drain_requests() {
            match request {
                ViewRequest::CloseAll => {
                    self.click_extern();
                }
                ViewRequest::Select(index) => {
                    self.select(cx, index);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Keyboard
    // ------------------------------------------------------------------

    /// Handle a key event while a popup is open.
    pub fn handle_key(&mut self, cx: &mut ViewContext<'_>, key: &str, modifiers: KeyModifiers) -> KeyOutcome {
        if self.state != PopupState::Open {
            return KeyOutcome::NotConsumed;
        }
        // Let the grid handle Ctrl+X and friends
        if modifiers.control || modifiers.alt || modifiers.platform {
            return KeyOutcome::NotConsumed;
        }

        match key {
            "escape" | "tab" => {
                self.cancel();
                KeyOutcome::Cancelled
            }
            "enter" => {
                if self.commit(cx) {
                    KeyOutcome::Committed
                } else {
                    KeyOutcome::Consumed
                }
            }
            "space" => {
                if let Some(cursor) = self.checklist().map(|p| p.cursor) {
                    self.toggle_member(cursor);
                }
                KeyOutcome::Consumed
            }
            "up" => {
                self.move_cursor(-1);
                KeyOutcome::Consumed
            }
            "down" => {
                self.move_cursor(1);
                KeyOutcome::Consumed
            }
            "pageup" => {
                self.move_cursor(-(PAGE_SIZE as isize));
                KeyOutcome::Consumed
            }
            "pagedown" => {
                self.move_cursor(PAGE_SIZE as isize);
                KeyOutcome::Consumed
            }
            "home" => {
                self.move_to(0);
                KeyOutcome::Consumed
            }
            "end" => {
                self.move_to(usize::MAX);
                KeyOutcome::Consumed
            }
            _ => KeyOutcome::NotConsumed,
        }
    }
}

/// Row highlighted when the autofilter list opens: the current Equal value,
/// the Top 10 / Empty / Not Empty action, Standard Filter for anything the
/// list cannot show, else the first row.
fn preselect_list_row(param: &QueryParam, col: usize, candidates: &FilterEntries, top_count: usize) -> usize {
    const TOP10: usize = 0;
    const CUSTOM: usize = 1;
    const EMPTY: usize = 2;
    const NOT_EMPTY: usize = 3;
    const FIRST_VALUE: usize = 4;

    if !param.is_simple_chain() {
        return CUSTOM;
    }
    let Some(entry) = param.find_entry(col) else {
        return 0;
    };
    match entry.op {
        QueryOp::Equal => {
            let value = entry.first_item().map(|item| item.string.as_str()).unwrap_or_default();
            if value.is_empty() || entry.items.len() > 1 {
                return CUSTOM;
            }
            candidates
                .texts()
                .position(|text| text == value)
                .map_or(0, |i| FIRST_VALUE + i)
        }
        QueryOp::TopN if entry.is_top_n(top_count) => TOP10,
        QueryOp::IsEmpty => EMPTY,
        QueryOp::IsNotEmpty => NOT_EMPTY,
        _ => CUSTOM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EngineServices;
    use gridfilter_engine::{DbRange, QueryItem, Sheet};

    fn sheet() -> Sheet {
        let mut sheet = Sheet::new(6, 3);
        sheet.set_value(0, 0, "Name");
        sheet.set_value(0, 1, "Qty");
        for (row, (name, qty)) in [("Ann", "3"), ("Bob", "5"), ("ann", "7"), ("Cy", "")].iter().enumerate() {
            sheet.set_value(row + 1, 0, name);
            sheet.set_value(row + 1, 1, qty);
        }
        sheet
            .db_ranges
            .insert(DbRange::new("Data", CellRange::new(0, 0, 4, 1)).with_autofilter(true));
        sheet
    }

    fn list_settings() -> Settings {
        Settings {
            popup_style: PopupStyle::List,
            ..Settings::default()
        }
    }

    #[test]
    fn test_launch_requires_button() {
        let mut sheet = sheet();
        let mut services = EngineServices::new();
        let mut cx = ViewContext::new(&mut sheet, &mut services);
        let mut popup = PopupController::new(Settings::default());

        assert!(!popup.launch_autofilter(&mut cx, 2, 0));
        assert!(!popup.launch_autofilter(&mut cx, 0, 2));
        assert_eq!(popup.state(), PopupState::Closed);
        assert!(popup.take_events().is_empty());

        assert!(popup.launch_autofilter(&mut cx, 0, 0));
        assert!(popup.is_open());
        let checklist = popup.checklist().unwrap();
        // "ann" folds into "Ann"
        assert_eq!(checklist.candidates.texts().collect::<Vec<_>>(), vec!["Ann", "Bob", "Cy"]);
        assert!(checklist.selection.is_all_checked());
    }

    #[test]
    fn test_relaunch_replaces_open_popup() {
        let mut sheet = sheet();
        let mut services = EngineServices::new();
        let mut cx = ViewContext::new(&mut sheet, &mut services);
        let mut popup = PopupController::new(Settings::default());

        popup.launch_autofilter(&mut cx, 0, 0);
        popup.take_events();
        popup.launch_autofilter(&mut cx, 0, 1);

        let events = popup.take_events();
        assert!(matches!(events[0], PopupEvent::Replaced { cell, .. } if cell == CellAddr::new(0, 0)));
        assert!(matches!(events[1], PopupEvent::Opened { cell, candidates: 3, .. } if cell == CellAddr::new(0, 1)));
        assert_eq!(popup.checklist().unwrap().cell.col, 1);
    }

    #[test]
    fn test_toggle_and_keys() {
        let mut sheet = sheet();
        let mut services = EngineServices::new();
        let mut cx = ViewContext::new(&mut sheet, &mut services);
        let mut popup = PopupController::new(Settings::default());
        popup.launch_autofilter(&mut cx, 0, 0);

        let none = KeyModifiers::default();
        assert_eq!(popup.handle_key(&mut cx, "down", none), KeyOutcome::Consumed);
        assert_eq!(popup.handle_key(&mut cx, "space", none), KeyOutcome::Consumed);
        assert!(!popup.checklist().unwrap().selection.is_checked(1));
        assert_eq!(popup.handle_key(&mut cx, "end", none), KeyOutcome::Consumed);
        assert_eq!(popup.checklist().unwrap().cursor, 2);

        let ctrl = KeyModifiers {
            control: true,
            ..KeyModifiers::default()
        };
        assert_eq!(popup.handle_key(&mut cx, "enter", ctrl), KeyOutcome::NotConsumed);
        assert_eq!(popup.handle_key(&mut cx, "enter", none), KeyOutcome::Committed);
        assert_eq!(popup.state(), PopupState::Closed);

        let param = cx.sheet.db_ranges.get(DbRangeId(0)).unwrap().query_param();
        let entry = param.find_entry(0).unwrap();
        let items: Vec<&str> = entry.items.iter().map(|i| i.string.as_str()).collect();
        assert_eq!(items, vec!["Ann", "Cy"]);
    }

    #[test]
    fn test_empty_set_rejected() {
        let mut sheet = sheet();
        let mut services = EngineServices::new();
        let mut cx = ViewContext::new(&mut sheet, &mut services);
        let mut popup = PopupController::new(Settings::default());
        popup.launch_autofilter(&mut cx, 0, 0);

        popup.set_all(false);
        assert!(!popup.commit(&mut cx));
        assert!(popup.is_open());
        assert!(popup
            .events()
            .events()
            .iter()
            .any(|e| matches!(e, PopupEvent::EmptySetRejected { .. })));
    }

    #[test]
    fn test_list_preselects_current_value() {
        let mut sheet = sheet();
        let mut param = sheet.db_ranges.get(DbRangeId(0)).unwrap().query_param();
        let entry = param.find_entry_by_field(0, true).unwrap().unwrap();
        entry.active = true;
        entry.set_equal_items(vec![QueryItem::string("Bob")]);
        sheet.db_ranges.get_mut(DbRangeId(0)).unwrap().set_query_param(param);

        let mut services = EngineServices::new();
        let mut cx = ViewContext::new(&mut sheet, &mut services);
        let mut popup = PopupController::new(list_settings());
        popup.launch_autofilter(&mut cx, 0, 0);

        let list = popup.list().unwrap();
        assert_eq!(list.rows.len(), 4 + 3);
        assert_eq!(list.selected, Some(5));
        assert_eq!(list.rows[5].label(), "Bob");
        assert_eq!(list.rows[1].label(), "Standard Filter...");

        // Other column: no entry, first row
        popup.launch_autofilter(&mut cx, 0, 1);
        assert_eq!(popup.list().unwrap().selected, Some(0));
    }

    #[test]
    fn test_preselect_special_rows() {
        let entries = FilterEntries::default();
        let mut param = QueryParam::new(4);
        assert_eq!(preselect_list_row(&param, 0, &entries, 10), 0);

        let entry = param.find_entry_by_field(0, true).unwrap().unwrap();
        entry.active = true;
        entry.set_top_n(10);
        assert_eq!(preselect_list_row(&param, 0, &entries, 10), 0);

        param.find_entry_by_field(0, false).unwrap().unwrap().set_query_by_non_empty();
        assert_eq!(preselect_list_row(&param, 0, &entries, 10), 3);

        param.find_entry_by_field(0, false).unwrap().unwrap().op = QueryOp::Greater;
        assert_eq!(preselect_list_row(&param, 0, &entries, 10), 1);

        param.find_entry_by_field(0, false).unwrap().unwrap().set_query_by_empty();
        param.regex = true;
        assert_eq!(preselect_list_row(&param, 0, &entries, 10), 1);
    }

    #[test]
    fn test_popup_mode_end_cancels() {
        let mut sheet = sheet();
        let mut services = EngineServices::new();
        let mut cx = ViewContext::new(&mut sheet, &mut services);
        let mut popup = PopupController::new(Settings::default());
        popup.launch_autofilter(&mut cx, 0, 0);

        popup.popup_mode_end();
        assert!(popup.is_cancelled());
        assert_eq!(popup.state(), PopupState::Closed);
        assert!(!popup.commit(&mut cx));
        assert_eq!(popup.events().ignored_selects(), vec![IgnoreReason::Closed]);
    }
}
