//! Filter engine: query model, candidate catalogs, sort and row visibility.

pub mod catalog;
pub mod cell;
pub mod dbdata;
pub mod error;
pub mod filter;
pub mod query;
pub mod scenario;
pub mod selection;
pub mod sheet;
pub mod sort;
pub mod validation;

pub use catalog::{collect_distinct_values, FilterEntries, TypedValue};
pub use dbdata::{DbCollection, DbRange, DbRangeId};
pub use error::QueryError;
pub use query::{Connector, ItemKind, QueryEntry, QueryItem, QueryOp, QueryParam};
pub use selection::{SelectionMode, SelectionState, SpecialAction};
pub use sheet::Sheet;
pub use sort::{SortKeyState, SortParam};
