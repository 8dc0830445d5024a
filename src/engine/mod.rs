//! Reducer-based state engine: events in, commands out.

pub mod events;
pub mod reducer;
pub mod state;

pub use events::{Event, JobEvent, ScenarioEvent, StrategyEvent};
pub use reducer::{reduce, Command, ReducerOutput};
pub use state::AppState;
