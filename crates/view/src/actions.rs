//! Commit actions: how a popup choice rewrites a query parameter.
//!
//! Both functions work on a caller-owned copy of the parameter. On error the
//! copy is left half-written and must be discarded; the range's stored
//! parameter is only replaced after `Ok`.

use gridfilter_engine::{Connector, QueryEntry, QueryError, QueryItem, QueryParam, SpecialAction, TypedValue};

/// Menu action chosen in an autofilter popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AutoFilterMode {
    /// Equal-set of the checked members (or a single list value)
    Normal,
    Top10,
    /// Hand off to the standard filter dialog
    Custom,
    Empty,
    NonEmpty,
    SortAscending,
    SortDescending,
}

impl AutoFilterMode {
    pub fn from_special(action: SpecialAction) -> Self {
        match action {
            SpecialAction::Top10 => Self::Top10,
            SpecialAction::Empty => Self::Empty,
            SpecialAction::NotEmpty => Self::NonEmpty,
            SpecialAction::Custom => Self::Custom,
        }
    }

    pub fn is_sort(&self) -> bool {
        matches!(self, Self::SortAscending | Self::SortDescending)
    }
}

/// Predicate to write for one column.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterChoice {
    /// Every candidate is wanted: drop the column's entry
    AllMembers,
    /// Equal-set of these items
    Members(Vec<QueryItem>),
    Top(usize),
    Empty,
    NotEmpty,
}

impl FilterChoice {
    pub fn mode(&self) -> AutoFilterMode {
        match self {
            Self::AllMembers | Self::Members(_) => AutoFilterMode::Normal,
            Self::Top(_) => AutoFilterMode::Top10,
            Self::Empty => AutoFilterMode::Empty,
            Self::NotEmpty => AutoFilterMode::NonEmpty,
        }
    }
}

/// Query item for a candidate: dates keep their serial, everything else
/// matches on the rendered string.
pub fn item_for(value: &TypedValue) -> QueryItem {
    match value.value {
        Some(serial) if value.is_date => QueryItem::date(value.text.clone(), serial),
        _ => QueryItem::string(value.text.clone()),
    }
}

/// Replace a parameter the popup cannot represent with an empty simple one.
/// Returns true when a reset happened.
pub fn reset_if_complex(param: &mut QueryParam) -> bool {
    if param.is_simple_chain() {
        return false;
    }
    log::debug!("existing filter is not a simple AND chain; starting over");
    param.clear_all();
    true
}

fn write_choice(entry: &mut QueryEntry, field: usize, choice: FilterChoice) {
    entry.active = true;
    entry.field = field;
    entry.connector = Connector::And;
    match choice {
        FilterChoice::Members(items) => entry.set_equal_items(items),
        FilterChoice::Top(count) => entry.set_top_n(count),
        FilterChoice::Empty => entry.set_query_by_empty(),
        FilterChoice::NotEmpty => entry.set_query_by_non_empty(),
        FilterChoice::AllMembers => {}
    }
}

/// Checklist commit for column `field`.
pub fn commit_checklist(param: &mut QueryParam, field: usize, choice: FilterChoice) -> Result<(), QueryError> {
    reset_if_complex(param);
    if choice == FilterChoice::AllMembers {
        param.remove_entry_by_field(field);
        return Ok(());
    }
    let capacity = param.capacity();
    let entry = param
        .find_entry_by_field(field, true)?
        .ok_or(QueryError::TooManyConditions { capacity })?;
    write_choice(entry, field, choice);
    Ok(())
}

/// Single-select list commit for column `field`.
///
/// Writes into the field's existing slot, or the slot right after the last
/// active entry; fails when that slot is beyond capacity.
pub fn exec_list_filter(param: &mut QueryParam, field: usize, choice: FilterChoice) -> Result<(), QueryError> {
    reset_if_complex(param);
    if choice == FilterChoice::AllMembers {
        param.remove_entry_by_field(field);
        return Ok(());
    }
    let (position, _) = param.position_for_field(field);
    let capacity = param.capacity();
    if position >= capacity {
        return Err(QueryError::TooManyConditions { capacity });
    }
    let entry = param.entry_mut(position)?;
    entry.clear();
    write_choice(entry, field, choice);
    Ok(())
}
