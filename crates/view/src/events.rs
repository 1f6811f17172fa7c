//! Popup event log.
//!
//! The controller records what happened during a popup's life so hosts can
//! react (status bar, redraw) and tests can check ordering and guard
//! behaviour without a UI.

use gridfilter_core::{CellAddr, CellRange};
use gridfilter_engine::DbRangeId;

use crate::actions::AutoFilterMode;

/// Which popup surface an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupKind {
    /// Multi-select checklist with sort and filter actions
    AutoFilterChecklist,
    /// Single-select autofilter list
    AutoFilterList,
    /// Validity list of a cell
    DataSelect,
    /// Scenarios sharing one range
    Scenario,
}

/// Guard that refused an external close request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardReason {
    Initializing,
    InSelect,
}

/// Why a selection callback was dropped instead of committing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Initializing,
    /// Another selection is still being committed
    Committing,
    Cancelled,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PopupEvent {
    /// Popup populated and shown.
    Opened {
        kind: PopupKind,
        cell: CellAddr,
        /// Number of rows offered (candidates, list items or scenarios)
        candidates: usize,
    },

    /// An older popup was destroyed to make room for a new request.
    Replaced { kind: PopupKind, cell: CellAddr },

    /// The query parameter of a database range was rewritten.
    QueryChanged {
        db: DbRangeId,
        field: usize,
        mode: AutoFilterMode,
    },

    SortRequested {
        db: DbRangeId,
        col: usize,
        ascending: bool,
    },

    /// Custom filter handed off to the filter dialog collaborator.
    CustomDialogRequested { db: DbRangeId, area: CellRange },

    /// A validity list entry was written into a cell.
    ValueEntered { cell: CellAddr, value: String },

    ScenarioApplied { name: String },

    /// Commit refused: every filter slot is taken by another field.
    TooManyConditions { field: usize, capacity: usize },

    /// Checklist commit with nothing checked while empty sets are disallowed.
    EmptySetRejected { cell: CellAddr },

    /// Popup dismissed without touching the query model.
    Cancelled { kind: PopupKind, cell: CellAddr },

    /// Popup torn down (after commit or cancel).
    Closed { kind: PopupKind, cell: CellAddr },

    CloseSuppressed { reason: GuardReason },

    SelectIgnored { reason: IgnoreReason },
}

/// Simple event collector, drained by the host after each input event.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<PopupEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: PopupEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[PopupEvent] {
        &self.events
    }

    /// Hand out everything recorded so far and start over.
    pub fn take(&mut self) -> Vec<PopupEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Filter to query mutations as `(db, field, mode)`.
    pub fn query_changes(&self) -> Vec<(DbRangeId, usize, AutoFilterMode)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                PopupEvent::QueryChanged { db, field, mode } => Some((*db, *field, *mode)),
                _ => None,
            })
            .collect()
    }

    /// Filter to refused close requests.
    pub fn suppressed_closes(&self) -> Vec<GuardReason> {
        self.events
            .iter()
            .filter_map(|e| match e {
                PopupEvent::CloseSuppressed { reason } => Some(*reason),
                _ => None,
            })
            .collect()
    }

    /// Filter to dropped selection callbacks.
    pub fn ignored_selects(&self) -> Vec<IgnoreReason> {
        self.events
            .iter()
            .filter_map(|e| match e {
                PopupEvent::SelectIgnored { reason } => Some(*reason),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_collector_filtering() {
        let mut collector = EventCollector::new();
        let cell = CellAddr::new(0, 3);

        collector.push(PopupEvent::Opened {
            kind: PopupKind::AutoFilterChecklist,
            cell,
            candidates: 3,
        });
        collector.push(PopupEvent::CloseSuppressed {
            reason: GuardReason::InSelect,
        });
        collector.push(PopupEvent::QueryChanged {
            db: DbRangeId(0),
            field: 3,
            mode: AutoFilterMode::Normal,
        });
        collector.push(PopupEvent::Closed {
            kind: PopupKind::AutoFilterChecklist,
            cell,
        });

        assert_eq!(collector.len(), 4);
        assert_eq!(collector.query_changes(), vec![(DbRangeId(0), 3, AutoFilterMode::Normal)]);
        assert_eq!(collector.suppressed_closes(), vec![GuardReason::InSelect]);
        assert!(collector.ignored_selects().is_empty());

        let drained = collector.take();
        assert_eq!(drained.len(), 4);
        assert!(collector.is_empty());
    }
}
