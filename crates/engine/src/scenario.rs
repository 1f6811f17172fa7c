//! Scenarios - named alternative value sets sharing one cell range

use gridfilter_core::CellRange;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub range: CellRange,
    /// Currently applied scenario for its range
    pub active: bool,
    /// Draw the selection button at the range's top-right corner
    pub show_button: bool,
}

impl Scenario {
    pub fn new(name: impl Into<String>, range: CellRange) -> Self {
        Self {
            name: name.into(),
            range,
            active: false,
            show_button: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScenarioStore {
    scenarios: Vec<Scenario>,
}

impl ScenarioStore {
    pub fn add(&mut self, scenario: Scenario) {
        self.scenarios.push(scenario);
    }

    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    /// Scenarios defined over exactly `range`, in insertion order.
    pub fn for_range(&self, range: &CellRange) -> impl Iterator<Item = &Scenario> + '_ {
        let range = *range;
        self.scenarios.iter().filter(move |s| s.range == range)
    }

    /// Distinct ranges that carry a scenario button.
    pub fn button_ranges(&self) -> Vec<CellRange> {
        let mut ranges: Vec<CellRange> = Vec::new();
        for scenario in self.scenarios.iter().filter(|s| s.show_button) {
            if !ranges.contains(&scenario.range) {
                ranges.push(scenario.range);
            }
        }
        ranges
    }

    /// Make `name` the active scenario of its range. Returns false if unknown.
    pub fn set_active(&mut self, name: &str) -> bool {
        let Some(range) = self.get(name).map(|s| s.range) else {
            return false;
        };
        for scenario in self.scenarios.iter_mut().filter(|s| s.range == range) {
            scenario.active = scenario.name == name;
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_active_is_exclusive_per_range() {
        let area = CellRange::new(2, 1, 4, 3);
        let other = CellRange::new(10, 0, 12, 0);
        let mut store = ScenarioStore::default();
        store.add(Scenario::new("Best", area));
        store.add(Scenario::new("Worst", area));
        store.add(Scenario::new("Elsewhere", other));

        assert!(store.set_active("Elsewhere"));
        assert!(store.set_active("Best"));
        assert!(store.set_active("Worst"));
        assert!(!store.get("Best").unwrap().active);
        assert!(store.get("Worst").unwrap().active);
        assert!(store.get("Elsewhere").unwrap().active);
        assert!(!store.set_active("Missing"));

        let names: Vec<&str> = store.for_range(&area).map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Best", "Worst"]);
        assert_eq!(store.button_ranges(), vec![area, other]);
    }
}
