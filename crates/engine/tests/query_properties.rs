// Property-based tests for the query model, candidate catalog and selection derivation.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashSet;

use gridfilter_core::CellRange;
use gridfilter_engine::catalog::{collect_distinct_values, FilterEntries, TypedValue};
use gridfilter_engine::filter::evaluate_query;
use gridfilter_engine::query::{QueryItem, QueryParam};
use gridfilter_engine::selection::{SelectionMode, SelectionState};
use gridfilter_engine::Sheet;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Op {
    Add(usize, String),
    Remove(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0usize..6, "[A-C]").prop_map(|(f, v)| Op::Add(f, v)),
        1 => (0usize..6).prop_map(Op::Remove),
    ]
}

/// Short cell text: mostly letters, sometimes numbers, sometimes blank.
fn arb_cell() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "[a-dA-D]{1,2}",
        1 => "[0-9]{1,2}",
        1 => Just(String::new()),
    ]
}

fn apply(param: &mut QueryParam, op: &Op) {
    match op {
        Op::Add(field, value) => {
            if let Ok(Some(entry)) = param.find_entry_by_field(*field, true) {
                entry.active = true;
                entry.set_equal_items(vec![QueryItem::string(value.clone())]);
            }
        }
        Op::Remove(field) => {
            param.remove_entry_by_field(*field);
        }
    }
}

fn is_contiguous(param: &QueryParam) -> bool {
    let active = param.active_count();
    param.entries().iter().take(active).all(|e| e.active)
}

// ---------------------------------------------------------------------------
// Query model
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn remove_leaves_no_entry_and_no_gaps(
        ops in prop::collection::vec(arb_op(), 0..24),
        field in 0usize..6,
    ) {
        let mut param = QueryParam::new(4);
        for op in &ops {
            apply(&mut param, op);
            prop_assert!(is_contiguous(&param), "gap after {:?}", op);
            prop_assert!(param.active_count() <= param.capacity());
        }

        param.remove_entry_by_field(field);
        prop_assert!(param.find_entry_by_field(field, false).unwrap().is_none());
        prop_assert!(is_contiguous(&param));
        prop_assert_eq!(param.capacity(), 4);
    }
}

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn generated_params_are_simple_chains(ops in prop::collection::vec(arb_op(), 0..24)) {
        let mut param = QueryParam::new(8);
        for op in &ops {
            apply(&mut param, op);
        }
        // Only find/remove were used: one entry per field, all AND
        prop_assert!(param.is_simple_chain());
        let fields: HashSet<usize> = param.active_entries().map(|e| e.field).collect();
        prop_assert_eq!(fields.len(), param.active_count());
    }
}

// ---------------------------------------------------------------------------
// Selection derivation
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn equal_selection_is_exact_set_membership(
        candidates in prop::collection::hash_set("[a-f]{1,2}", 0..20),
        items in prop::collection::vec("[a-f]{1,2}", 0..10),
    ) {
        let entries = FilterEntries {
            values: candidates.iter().map(|c| TypedValue::text(c.clone())).collect(),
            has_dates: false,
        };
        let mut param = QueryParam::new(8);
        let entry = param.find_entry_by_field(0, true).unwrap().unwrap();
        entry.active = true;
        entry.set_equal_items(items.iter().map(|s| QueryItem::string(s.clone())).collect());

        let state = SelectionState::derive(param.find_entry(0), &entries, 10);
        prop_assert_eq!(state.mode, SelectionMode::Members);

        let item_set: HashSet<&str> = items.iter().map(|s| s.as_str()).collect();
        for (i, value) in entries.values.iter().enumerate() {
            prop_assert_eq!(state.is_checked(i), item_set.contains(value.text.as_str()));
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog and evaluation
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn catalog_is_distinct_in_first_seen_order(cells in prop::collection::vec(arb_cell(), 1..40)) {
        let mut sheet = Sheet::new(cells.len() + 1, 1);
        sheet.set_value(0, 0, "Header");
        for (i, text) in cells.iter().enumerate() {
            sheet.set_value(i + 1, 0, text);
        }
        let area = CellRange::new(0, 0, cells.len(), 0);
        let entries = collect_distinct_values(&sheet, 0, &area, false, true);

        let mut expected: Vec<String> = Vec::new();
        for i in 1..=cells.len() {
            let shown = sheet.get_display(i, 0);
            if !shown.is_empty() && !expected.contains(&shown) {
                expected.push(shown);
            }
        }
        let texts: Vec<String> = entries.texts().map(str::to_string).collect();
        prop_assert_eq!(texts, expected);
    }
}

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn header_row_always_visible(
        cells in prop::collection::vec(arb_cell(), 1..30),
        ops in prop::collection::vec(arb_op(), 0..6),
    ) {
        let mut sheet = Sheet::new(cells.len() + 1, 6);
        for (i, text) in cells.iter().enumerate() {
            sheet.set_value(i + 1, 0, text);
        }
        let mut param = QueryParam::new(8);
        for op in &ops {
            apply(&mut param, op);
        }
        let area = CellRange::new(0, 0, cells.len(), 5);
        let mask = evaluate_query(&param, &area, |r, c| sheet.typed_value(r, c));

        prop_assert_eq!(mask.len(), cells.len() + 1);
        prop_assert!(mask[0]);
        if param.active_count() == 0 {
            prop_assert!(mask.iter().all(|&v| v));
        }
    }
}
