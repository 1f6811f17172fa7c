//! Headless interaction layer for the autofilter, data-select and scenario
//! popups: popup lifecycle, commit actions and grid mouse/keyboard routing.

pub mod actions;
pub mod context;
pub mod dispatcher;
pub mod events;
pub mod popup;

pub use actions::AutoFilterMode;
pub use context::{EngineServices, FilterServices, StatusMessage, ViewContext, ViewRequest};
pub use dispatcher::{DragResult, GridDispatcher, GridMetrics, HitTarget, MouseButton};
pub use events::{EventCollector, PopupEvent, PopupKind};
pub use popup::{KeyModifiers, KeyOutcome, ListMode, ListRow, PopupController, PopupState};
