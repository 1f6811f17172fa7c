//! Grid event dispatcher
//!
//! Turns pixel-level mouse and keyboard input into grid actions: hit-tests
//! the drop-down buttons, range-finder frames, fill handle and page breaks,
//! launches popups and tracks drags until the button is released.
//!
//! A left button press is resolved in this order:
//! 1. any open popup is closed (click outside)
//! 2. range-finder frame (corners resize, edges move)
//! 3. fill handle of the marked range
//! 4. page break (page break preview only)
//! 5. autofilter button, then list-validation button (single click, not
//!    while editing a formula)
//! 6. scenario button
//! 7. plain cell selection

use gridfilter_config::Settings;
use gridfilter_core::{CellAddr, CellRange, Point, Rect};
use gridfilter_engine::Sheet;

use crate::context::ViewContext;
use crate::popup::{KeyModifiers, KeyOutcome, PopupController, PopupState};

/// Pixel layout of the grid: column widths and a uniform row height.
#[derive(Debug, Clone)]
pub struct GridMetrics {
    default_column_width: i32,
    column_widths: Vec<Option<i32>>,
    row_height: i32,
}

impl GridMetrics {
    pub fn new(settings: &Settings) -> Self {
        Self {
            default_column_width: settings.default_column_width.max(1),
            column_widths: Vec::new(),
            row_height: settings.row_height.max(1),
        }
    }

    pub fn set_column_width(&mut self, col: usize, width: i32) {
        if self.column_widths.len() <= col {
            self.column_widths.resize(col + 1, None);
        }
        self.column_widths[col] = Some(width.max(1));
    }

    pub fn column_width(&self, col: usize) -> i32 {
        self.column_widths
            .get(col)
            .copied()
            .flatten()
            .unwrap_or(self.default_column_width)
    }

    pub fn row_height(&self) -> i32 {
        self.row_height
    }

    fn column_x(&self, col: usize) -> i32 {
        (0..col).fold(0, |x, c| x.saturating_add(self.column_width(c)))
    }

    fn row_y(&self, row: usize) -> i32 {
        i32::try_from(row).unwrap_or(i32::MAX).saturating_mul(self.row_height)
    }

    pub fn cell_rect(&self, row: usize, col: usize) -> Rect {
        Rect::new(self.column_x(col), self.row_y(row), self.column_width(col), self.row_height)
    }

    pub fn range_rect(&self, range: &CellRange) -> Rect {
        self.cell_rect(range.start_row, range.start_col)
            .union(&self.cell_rect(range.end_row, range.end_col))
    }

    /// Column under `x` among the first `cols` columns.
    pub fn col_at(&self, x: i32, cols: usize) -> Option<usize> {
        if x < 0 {
            return None;
        }
        let mut right: i32 = 0;
        for col in 0..cols {
            right = right.saturating_add(self.column_width(col));
            if x < right {
                return Some(col);
            }
            if right == i32::MAX {
                break;
            }
        }
        None
    }

    /// Cell under a pixel position within a `rows` x `cols` grid; None
    /// outside it.
    pub fn cell_at(&self, p: Point, rows: usize, cols: usize) -> Option<(usize, usize)> {
        if p.y < 0 {
            return None;
        }
        let row = (p.y / self.row_height) as usize;
        if row >= rows {
            return None;
        }
        Some((row, self.col_at(p.x, cols)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// What a mouse press landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    /// Outside the sheet, or consumed by closing a popup
    None,
    AutoFilterButton(CellAddr),
    ListValidationButton(CellAddr),
    ScenarioButton(CellRange),
    /// Frame of a formula reference; `corner` set means resize
    RangeFinder { index: usize, corner: Option<Corner> },
    FillHandle,
    /// Index into the row page breaks
    PageBreak(usize),
    Cell(CellAddr),
}

/// Mouse drag in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    None,
    Selecting {
        anchor: (usize, usize),
        current: (usize, usize),
    },
    RangeFinder {
        index: usize,
        corner: Option<Corner>,
        anchor: (usize, usize),
        current: (usize, usize),
    },
    Fill {
        source: CellRange,
        current: (usize, usize),
    },
    PageBreak {
        index: usize,
        current: usize,
    },
}

/// Outcome of a finished drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragResult {
    Selection(CellRange),
    /// Formula reference `index` now points at `range`
    RangeFinder { index: usize, range: CellRange },
    /// `source` should be extended over `target`
    Fill { source: CellRange, target: CellRange },
    /// Row page break `index` moved to sit above `row`
    PageBreak { index: usize, row: usize },
}

#[derive(Debug, Clone)]
pub struct GridDispatcher {
    pub metrics: GridMetrics,
    autofilter_button_size: i32,
    fill_handle_size: i32,
    hit_tolerance: i32,
    /// Cursor cell; the list-validation button is drawn beside it
    pub cursor: CellAddr,
    /// Marked range; the fill handle sits at its bottom-right corner
    pub marked: CellRange,
    /// References of the formula being edited, in drawing order
    pub range_finder: Vec<CellRange>,
    /// Rows that start a new printed page
    pub row_breaks: Vec<usize>,
    pub page_break_mode: bool,
    drag: DragState,
}

impl GridDispatcher {
    pub fn new(settings: &Settings) -> Self {
        Self {
            metrics: GridMetrics::new(settings),
            autofilter_button_size: settings.autofilter_button_size.max(1),
            fill_handle_size: settings.fill_handle_size.max(1),
            hit_tolerance: settings.hit_tolerance.max(0),
            cursor: CellAddr::new(0, 0),
            marked: CellRange::single(0, 0),
            range_finder: Vec::new(),
            row_breaks: Vec::new(),
            page_break_mode: false,
            drag: DragState::None,
        }
    }

    pub fn drag(&self) -> DragState {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        self.drag != DragState::None
    }

    // ------------------------------------------------------------------
    // Button geometry
    // ------------------------------------------------------------------

    /// Drop-down glyph in the bottom-right corner of a header cell.
    pub fn autofilter_button_rect(&self, row: usize, col: usize) -> Rect {
        let cell = self.metrics.cell_rect(row, col);
        let size = self.autofilter_button_size.min(cell.height).min(cell.width);
        Rect::new(cell.right() - size, cell.bottom() - size, size, size)
    }

    /// Button just right of the cell, aligned to its bottom edge.
    pub fn list_validation_button_rect(&self, row: usize, col: usize) -> Rect {
        let cell = self.metrics.cell_rect(row, col);
        let size = self.autofilter_button_size.min(cell.height);
        Rect::new(cell.right(), cell.bottom() - size, size, size)
    }

    /// Scenario button over the range's last column: above the range, or
    /// below it when the range starts in the first row.
    pub fn scenario_button_rect(&self, range: &CellRange) -> Rect {
        let height = self.autofilter_button_size;
        let top_cell = self.metrics.cell_rect(range.start_row, range.end_col);
        let y = if range.start_row == 0 {
            self.metrics.cell_rect(range.end_row, range.end_col).bottom()
        } else {
            top_cell.y - height
        };
        Rect::new(top_cell.x, y, top_cell.width, height)
    }

    /// Square centred on the marked range's bottom-right corner.
    pub fn fill_handle_rect(&self) -> Rect {
        let range = self.metrics.range_rect(&self.marked);
        let half = self.fill_handle_size / 2;
        Rect::new(
            range.right() - half,
            range.bottom() - half,
            self.fill_handle_size,
            self.fill_handle_size,
        )
        .inflate(self.hit_tolerance)
    }

    // ------------------------------------------------------------------
    // Hit-testing
    // ------------------------------------------------------------------

    fn hit_range_finder(&self, p: Point) -> Option<HitTarget> {
        let tol = self.hit_tolerance;
        // Last drawn frame wins
        for (index, range) in self.range_finder.iter().enumerate().rev() {
            let rect = self.metrics.range_rect(range);
            let outer = rect.inflate(tol);
            let inner = rect.inflate(-tol);
            if !outer.contains(p) || (inner.width > 0 && inner.height > 0 && inner.contains(p)) {
                continue;
            }
            let near = |a: i32, b: i32| a.abs_diff(b) <= tol.unsigned_abs();
            let (left, right) = (near(p.x, rect.x), near(p.x, rect.right()));
            let (top, bottom) = (near(p.y, rect.y), near(p.y, rect.bottom()));
            let corner = match (left, right, top, bottom) {
                (true, _, true, _) => Some(Corner::TopLeft),
                (_, true, true, _) => Some(Corner::TopRight),
                (true, _, _, true) => Some(Corner::BottomLeft),
                (_, true, _, true) => Some(Corner::BottomRight),
                _ => None,
            };
            return Some(HitTarget::RangeFinder { index, corner });
        }
        None
    }

    fn hit_page_break(&self, p: Point) -> Option<HitTarget> {
        if !self.page_break_mode {
            return None;
        }
        self.row_breaks
            .iter()
            .position(|&row| p.y.abs_diff(self.metrics.row_y(row)) <= self.hit_tolerance.unsigned_abs())
            .map(HitTarget::PageBreak)
    }

    fn hit_scenario_button(&self, sheet: &Sheet, p: Point) -> Option<HitTarget> {
        sheet
            .scenarios
            .button_ranges()
            .into_iter()
            .find(|range| self.scenario_button_rect(range).contains(p))
            .map(HitTarget::ScenarioButton)
    }

    /// Resolve what a press at `p` lands on. Drop-down buttons are only
    /// considered when `buttons` is set (single left click, no formula
    /// editing).
    pub fn hit_test(&self, sheet: &Sheet, p: Point, buttons: bool) -> HitTarget {
        if let Some(hit) = self.hit_range_finder(p) {
            return hit;
        }
        if self.fill_handle_rect().contains(p) {
            return HitTarget::FillHandle;
        }
        if let Some(hit) = self.hit_page_break(p) {
            return hit;
        }

        let cell = self.metrics.cell_at(p, sheet.rows, sheet.cols);

        if buttons {
            if let Some((row, col)) = cell {
                if sheet.has_autofilter_button(row, col) && self.autofilter_button_rect(row, col).contains(p) {
                    return HitTarget::AutoFilterButton(CellAddr::new(row, col));
                }
            }
            let (row, col) = (self.cursor.row, self.cursor.col);
            if sheet.validations.has_dropdown(row, col) && self.list_validation_button_rect(row, col).contains(p) {
                return HitTarget::ListValidationButton(self.cursor);
            }
        }
        if let Some(hit) = self.hit_scenario_button(sheet, p) {
            return hit;
        }

        match cell {
            Some((row, col)) => HitTarget::Cell(CellAddr::new(row, col)),
            None => HitTarget::None,
        }
    }

    // ------------------------------------------------------------------
    // Mouse
    // ------------------------------------------------------------------

    pub fn mouse_button_down(
        &mut self,
        cx: &mut ViewContext<'_>,
        popup: &mut PopupController,
        p: Point,
        button: MouseButton,
        clicks: u32,
        formula_mode: bool,
    ) -> HitTarget {
        popup.click_extern();
        if popup.state() != PopupState::Closed {
            // A guarded popup swallowed the click
            return HitTarget::None;
        }

        if button != MouseButton::Left {
            let hit = match self.metrics.cell_at(p, cx.sheet.rows, cx.sheet.cols) {
                Some((row, col)) => HitTarget::Cell(CellAddr::new(row, col)),
                None => HitTarget::None,
            };
            if let HitTarget::Cell(addr) = hit {
                if !self.marked.contains(addr.row, addr.col) {
                    self.set_cursor(addr);
                }
            }
            return hit;
        }

        let buttons = clicks == 1 && !formula_mode;
        let hit = self.hit_test(cx.sheet, p, buttons);
        log::debug!("mouse down at ({}, {}) -> {:?}", p.x, p.y, hit);

        match hit {
            HitTarget::AutoFilterButton(addr) => {
                popup.launch_autofilter(cx, addr.row, addr.col);
            }
            HitTarget::ListValidationButton(addr) => {
                popup.launch_data_select(cx, addr.row, addr.col);
            }
            HitTarget::ScenarioButton(range) => {
                popup.launch_scenario(cx, range);
            }
            HitTarget::RangeFinder { index, corner } => {
                let at = self.clamped_cell(cx.sheet, p);
                self.drag = DragState::RangeFinder {
                    index,
                    corner,
                    anchor: at,
                    current: at,
                };
            }
            HitTarget::FillHandle => {
                self.drag = DragState::Fill {
                    source: self.marked,
                    current: (self.marked.end_row, self.marked.end_col),
                };
            }
            HitTarget::PageBreak(index) => {
                let current = self.row_breaks.get(index).copied().unwrap_or(0);
                self.drag = DragState::PageBreak { index, current };
            }
            HitTarget::Cell(addr) => {
                self.set_cursor(addr);
                self.drag = DragState::Selecting {
                    anchor: (addr.row, addr.col),
                    current: (addr.row, addr.col),
                };
            }
            HitTarget::None => {}
        }
        hit
    }

    pub fn mouse_move(&mut self, sheet: &Sheet, p: Point) {
        let at = self.clamped_cell(sheet, p);
        match &mut self.drag {
            DragState::None => {}
            DragState::Selecting { current, .. }
            | DragState::RangeFinder { current, .. }
            | DragState::Fill { current, .. } => *current = at,
            DragState::PageBreak { current, .. } => {
                // Snap to the nearest row boundary
                let h = self.metrics.row_height();
                *current = (p.y.max(0).saturating_add(h / 2) / h) as usize;
            }
        }
        if let DragState::Selecting { anchor, current } = self.drag {
            self.marked = CellRange::new(anchor.0, anchor.1, current.0, current.1);
        }
    }

    pub fn mouse_button_up(&mut self, sheet: &Sheet, p: Point) -> Option<DragResult> {
        self.mouse_move(sheet, p);
        let drag = std::mem::take(&mut self.drag);
        let result = match drag {
            DragState::None => return None,
            DragState::Selecting { anchor, current } => {
                DragResult::Selection(CellRange::new(anchor.0, anchor.1, current.0, current.1))
            }
            DragState::RangeFinder {
                index,
                corner,
                anchor,
                current,
            } => {
                let range = self.range_finder.get(index).copied()?;
                let moved = reshape_reference(range, corner, anchor, current);
                self.range_finder[index] = moved;
                DragResult::RangeFinder { index, range: moved }
            }
            DragState::Fill { source, current } => {
                let target = fill_target(source, current)?;
                self.marked = CellRange::new(
                    source.start_row.min(target.start_row),
                    source.start_col.min(target.start_col),
                    source.end_row.max(target.end_row),
                    source.end_col.max(target.end_col),
                );
                DragResult::Fill { source, target }
            }
            DragState::PageBreak { index, current } => {
                let slot = self.row_breaks.get_mut(index)?;
                *slot = current.max(1);
                DragResult::PageBreak { index, row: *slot }
            }
        };
        log::debug!("drag finished: {:?}", result);
        Some(result)
    }

    /// Abandon a drag without producing a result.
    pub fn cancel_drag(&mut self) -> bool {
        std::mem::take(&mut self.drag) != DragState::None
    }

    fn clamped_cell(&self, sheet: &Sheet, p: Point) -> (usize, usize) {
        let last_col = sheet.cols.saturating_sub(1);
        let row = (p.y.max(0) / self.metrics.row_height()) as usize;
        let col = self.metrics.col_at(p.x.max(0), sheet.cols).unwrap_or(last_col);
        (row.min(sheet.rows.saturating_sub(1)), col)
    }

    fn set_cursor(&mut self, addr: CellAddr) {
        self.cursor = addr;
        self.marked = CellRange::single(addr.row, addr.col);
    }

    // ------------------------------------------------------------------
    // Keyboard
    // ------------------------------------------------------------------

    /// Route a key: to the open popup first, then grid shortcuts.
    pub fn key_input(
        &mut self,
        cx: &mut ViewContext<'_>,
        popup: &mut PopupController,
        key: &str,
        modifiers: KeyModifiers,
    ) -> KeyOutcome {
        if popup.is_open() {
            return popup.handle_key(cx, key, modifiers);
        }
        match key {
            "down" if modifiers.alt && !modifiers.control && !modifiers.platform => {
                let (row, col) = (self.cursor.row, self.cursor.col);
                let opened = if cx.sheet.has_autofilter_button(row, col) {
                    popup.launch_autofilter(cx, row, col)
                } else {
                    popup.launch_data_select(cx, row, col)
                };
                if opened {
                    KeyOutcome::Consumed
                } else {
                    KeyOutcome::NotConsumed
                }
            }
            "escape" if self.cancel_drag() => KeyOutcome::Consumed,
            _ => KeyOutcome::NotConsumed,
        }
    }

    /// Focus left the popup window.
    pub fn popup_focus_lost(&mut self, popup: &mut PopupController) {
        popup.popup_mode_end();
    }
}

/// Move (no corner) or resize (dragged corner) a reference range.
fn reshape_reference(
    range: CellRange,
    corner: Option<Corner>,
    anchor: (usize, usize),
    current: (usize, usize),
) -> CellRange {
    match corner {
        None => {
            let shift = |v: usize, from: usize, to: usize| (v + to).saturating_sub(from);
            let start_row = shift(range.start_row, anchor.0, current.0);
            let start_col = shift(range.start_col, anchor.1, current.1);
            CellRange::new(
                start_row,
                start_col,
                start_row + range.row_count() - 1,
                start_col + range.col_count() - 1,
            )
        }
        Some(Corner::TopLeft) => CellRange::new(current.0, current.1, range.end_row, range.end_col),
        Some(Corner::TopRight) => CellRange::new(current.0, range.start_col, range.end_row, current.1),
        Some(Corner::BottomLeft) => CellRange::new(range.start_row, current.1, current.0, range.end_col),
        Some(Corner::BottomRight) => CellRange::new(range.start_row, range.start_col, current.0, current.1),
    }
}

/// Cells the fill handle covers beyond `source`, locked to the axis with the
/// larger movement (rows win ties). None when the pointer stayed inside.
fn fill_target(source: CellRange, current: (usize, usize)) -> Option<CellRange> {
    let (row, col) = current;
    let rows_out = if row > source.end_row {
        row - source.end_row
    } else {
        source.start_row.saturating_sub(row)
    };
    let cols_out = if col > source.end_col {
        col - source.end_col
    } else {
        source.start_col.saturating_sub(col)
    };
    if rows_out == 0 && cols_out == 0 {
        return None;
    }
    let target = if rows_out >= cols_out {
        if row > source.end_row {
            CellRange::new(source.end_row + 1, source.start_col, row, source.end_col)
        } else {
            CellRange::new(row, source.start_col, source.start_row - 1, source.end_col)
        }
    } else if col > source.end_col {
        CellRange::new(source.start_row, source.end_col + 1, source.end_row, col)
    } else {
        CellRange::new(source.start_row, col, source.end_row, source.start_col - 1)
    };
    Some(target)
}
