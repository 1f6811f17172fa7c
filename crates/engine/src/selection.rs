//! Selection State - which candidates start out checked in an open popup

use rustc_hash::FxHashSet;

use crate::catalog::FilterEntries;
use crate::query::{QueryEntry, QueryOp};

/// Fixed filter menu actions that stand for a whole-column predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialAction {
    Top10,
    Empty,
    NotEmpty,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// No (active) entry: every candidate is shown
    All,
    /// Equal entry: the checked candidates are its items
    Members,
    /// Any other operator: no candidate checked, this action is current
    Special(SpecialAction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    checked: Vec<bool>,
    pub mode: SelectionMode,
}

impl SelectionState {
    /// Derive the initial state from the column's current entry.
    ///
    /// Linear in the candidate count: the entry's items go into a set once.
    pub fn derive(entry: Option<&QueryEntry>, candidates: &FilterEntries, top_count: usize) -> Self {
        let count = candidates.len();
        let Some(entry) = entry.filter(|e| e.active) else {
            return Self {
                checked: vec![true; count],
                mode: SelectionMode::All,
            };
        };

        let special = match entry.op {
            QueryOp::Equal => None,
            QueryOp::TopN if entry.is_top_n(top_count) => Some(SpecialAction::Top10),
            QueryOp::IsEmpty => Some(SpecialAction::Empty),
            QueryOp::IsNotEmpty => Some(SpecialAction::NotEmpty),
            _ => Some(SpecialAction::Custom),
        };
        if let Some(action) = special {
            return Self {
                checked: vec![false; count],
                mode: SelectionMode::Special(action),
            };
        }

        let members: FxHashSet<&str> = entry.items.iter().map(|item| item.string.as_str()).collect();
        Self {
            checked: candidates.texts().map(|text| members.contains(text)).collect(),
            mode: SelectionMode::Members,
        }
    }

    pub fn len(&self) -> usize {
        self.checked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checked.is_empty()
    }

    pub fn is_checked(&self, index: usize) -> bool {
        self.checked.get(index).copied().unwrap_or(false)
    }

    /// Flip one candidate; returns the new state, None when out of range.
    pub fn toggle(&mut self, index: usize) -> Option<bool> {
        let slot = self.checked.get_mut(index)?;
        *slot = !*slot;
        self.mode = SelectionMode::Members;
        Some(*slot)
    }

    pub fn set(&mut self, index: usize, checked: bool) {
        if let Some(slot) = self.checked.get_mut(index) {
            *slot = checked;
            self.mode = SelectionMode::Members;
        }
    }

    pub fn set_all(&mut self, checked: bool) {
        self.checked.iter_mut().for_each(|c| *c = checked);
        self.mode = SelectionMode::Members;
    }

    pub fn checked_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.checked
            .iter()
            .enumerate()
            .filter(|(_, &checked)| checked)
            .map(|(i, _)| i)
    }

    pub fn checked_count(&self) -> usize {
        self.checked.iter().filter(|&&c| c).count()
    }

    pub fn is_all_checked(&self) -> bool {
        self.checked.iter().all(|&c| c)
    }

    /// The special action flagged as current, if any.
    pub fn current_action(&self) -> Option<SpecialAction> {
        match self.mode {
            SelectionMode::Special(action) => Some(action),
            _ => None,
        }
    }
}
