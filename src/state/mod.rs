//! Application state: the analysis data model, the pure event reducer, and
//! the store that owns the single mutable `AppState`.

mod frame;
mod reducer;
mod store;

pub use frame::{AnalysisFrame, AnalysisReport, EmotionPoint};
pub use reducer::{reduce, AppEvent, AppState, ConnectionState, HISTORY_CAP, TIMELINE_CAP};
pub use store::StateStore;
